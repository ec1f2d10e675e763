//! Table Mutation Protocol
//!
//! 把引擎结果翻译成存储写操作：快照读 → 纯计算 → 同集合原子批量写。
//! 批量写 (delete-then-recreate) 走单条事务，保证不出现新旧桌共存的
//! 撕裂状态；它不保证跨客户端串行化，见各方法的竞态说明。

use rand::rngs::StdRng;
use rand::SeedableRng;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use thiserror::Error;

use super::engine::{self, DistributionStats, MoveError};
use super::index::MembershipIndex;
use crate::db::models::SeatingTable;
use crate::db::repository::{
    ParticipantRepository, RepoError, SettingsRepository, TableRepository,
};
use crate::utils::AppError;

/// Seating operation failure
#[derive(Debug, Error)]
pub enum SeatingError {
    /// 校验失败 (结构化返回，不是异常)
    #[error(transparent)]
    Move(#[from] MoveError),

    /// 存储失败，向上传播；重试由调用方/UI 负责
    #[error(transparent)]
    Store(#[from] RepoError),
}

impl From<SeatingError> for AppError {
    fn from(err: SeatingError) -> Self {
        match err {
            SeatingError::Move(MoveError::TableNotFound(id)) => {
                AppError::not_found(format!("Table {id} not found"))
            }
            SeatingError::Move(e) => AppError::business_rule(e.to_string()),
            SeatingError::Store(e) => AppError::from(e),
        }
    }
}

/// Seating service, the store side of the mutation protocol
#[derive(Clone)]
pub struct SeatingService {
    participants: ParticipantRepository,
    tables: TableRepository,
    settings: SettingsRepository,
}

impl SeatingService {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            participants: ParticipantRepository::new(db.clone()),
            tables: TableRepository::new(db.clone()),
            settings: SettingsRepository::new(db),
        }
    }

    /// Assign every unassigned participant, keeping seated ones in place.
    ///
    /// 已知竞态 (接受，不在本核心解决)：两个客户端同时读到"还没有桌子"
    /// 的快照，各自算出一套完整分配并提交，会留下两套重叠的桌子和
    /// 重复入座。生产级方案需要单一执笔者或存储端 CAS 原语，超出范围。
    pub async fn assign_all(&self) -> Result<Vec<SeatingTable>, SeatingError> {
        let participants = self.participants.find_all().await?;
        let settings = self.settings.get_or_init().await?;
        let snapshot = self.tables.find_all().await?;

        let result = engine::assign(&participants, &settings, &snapshot);
        self.tables.replace_all(&snapshot, &result).await?;

        tracing::info!(
            tables = result.len(),
            seated = result.iter().map(|t| t.members.len()).sum::<usize>(),
            "Assignment committed"
        );
        Ok(result)
    }

    /// Admin bulk reassignment: discard the current layout and assign
    /// everyone from scratch
    pub async fn reassign_all(&self) -> Result<Vec<SeatingTable>, SeatingError> {
        let participants = self.participants.find_all().await?;
        let settings = self.settings.get_or_init().await?;
        let snapshot = self.tables.find_all().await?;

        let result = engine::assign(&participants, &settings, &[]);
        self.tables.replace_all(&snapshot, &result).await?;

        tracing::info!(tables = result.len(), "Full reassignment committed");
        Ok(result)
    }

    /// Admin shuffle: uniform random permutation, fresh table identities
    pub async fn shuffle_all(&self) -> Result<Vec<SeatingTable>, SeatingError> {
        let settings = self.settings.get_or_init().await?;
        let snapshot = self.tables.find_all().await?;

        let mut rng = StdRng::from_entropy();
        let result = engine::shuffle(&snapshot, settings.max_people_per_table, &mut rng);
        self.tables.replace_all(&snapshot, &result).await?;

        tracing::info!(tables = result.len(), "Shuffle committed");
        Ok(result)
    }

    /// Admin clear: delete every table in the snapshot
    pub async fn clear_all(&self) -> Result<(), SeatingError> {
        let snapshot = self.tables.find_all().await?;
        self.tables.replace_all(&snapshot, &[]).await?;

        tracing::info!(cleared = snapshot.len(), "Tables cleared");
        Ok(())
    }

    /// Move one member; writes only the two affected table documents.
    ///
    /// 软容量保证：满桌检查只针对本次快照。两个客户端并发把不同用户
    /// 移进同一桌，都可能通过检查并一起把桌子挤爆，接受为已知弱点。
    pub async fn move_member(
        &self,
        user_id: &str,
        from_table_id: &str,
        to_table_id: &str,
    ) -> Result<Vec<SeatingTable>, SeatingError> {
        let settings = self.settings.get_or_init().await?;
        let snapshot = self.tables.find_all().await?;

        let result = engine::move_member(
            &snapshot,
            user_id,
            from_table_id,
            to_table_id,
            settings.max_people_per_table,
        )?;

        let from = result
            .iter()
            .find(|t| t.key().as_deref() == Some(from_table_id))
            .ok_or_else(|| RepoError::Database("Move result lost source table".into()))?;
        let to = result
            .iter()
            .find(|t| t.key().as_deref() == Some(to_table_id))
            .ok_or_else(|| RepoError::Database("Move result lost destination table".into()))?;
        self.tables.write_pair(from, to).await?;

        tracing::info!(user_id, from_table_id, to_table_id, "Member moved");
        Ok(result)
    }

    /// Session-exit hook: remove the departing user from their table,
    /// deleting the table if it empties.
    ///
    /// 失败只记日志不向外抛: 离场永远不能被桌子清理错误挡住。
    pub async fn leave(&self, user_id: &str) {
        if let Err(e) = self.try_leave(user_id).await {
            tracing::warn!(
                user_id,
                error = %e,
                "Table cleanup on departure failed; departure proceeds"
            );
        }
    }

    async fn try_leave(&self, user_id: &str) -> Result<(), RepoError> {
        let snapshot = self.tables.find_all().await?;
        let index = MembershipIndex::from_tables(&snapshot);

        let Some(table_key) = index.table_of(user_id).map(str::to_string) else {
            return Ok(());
        };
        let Some(mut table) = snapshot
            .into_iter()
            .find(|t| t.key().as_deref() == Some(table_key.as_str()))
        else {
            return Ok(());
        };

        table.members.retain(|m| m.user_id != user_id);
        if table.members.is_empty() {
            self.tables.delete(&table_key).await?;
            tracing::info!(user_id, table = %table_key, "Departure emptied table, deleted");
        } else {
            self.tables.update(&table).await?;
            tracing::info!(user_id, table = %table_key, "Departing member removed");
        }
        Ok(())
    }

    /// Table the user is currently seated at, from a fresh snapshot
    pub async fn membership(&self, user_id: &str) -> Result<Option<SeatingTable>, SeatingError> {
        let snapshot = self.tables.find_all().await?;
        Ok(snapshot.into_iter().find(|t| t.contains(user_id)))
    }

    /// Optimal distribution stats for the current head count and cap
    pub async fn stats(&self) -> Result<DistributionStats, SeatingError> {
        let participants = self.participants.find_all().await?;
        let settings = self.settings.get_or_init().await?;
        Ok(engine::distribution_stats(
            participants.len() as u32,
            settings.max_people_per_table,
        ))
    }
}
