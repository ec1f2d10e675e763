//! Seating Table Repository
//!
//! 承载变更协议的存储端：全量 delete-then-recreate 和两桌移动写
//! 都在单条 SurrealDB 事务里完成 (要么全部提交要么全不提交)。
//! 事务只防"撕裂"写，不防并发写，并发写语义见 SeatingService 的说明。

use super::{BaseRepository, RepoError, RepoResult};
use crate::db::models::{MemberSnapshot, SeatingTable, TABLE_COLLECTION};
use serde::Serialize;
use surrealdb::{RecordId, Surreal};
use surrealdb::engine::local::Db;

/// CONTENT 载荷：CREATE/UPDATE type::thing(..) 时 id 由语句给出，
/// 内容里不能再带 id 字段
#[derive(Debug, Serialize)]
struct TableContent {
    name: String,
    ordinal: u32,
    members: Vec<MemberSnapshot>,
}

impl From<&SeatingTable> for TableContent {
    fn from(t: &SeatingTable) -> Self {
        Self {
            name: t.name.clone(),
            ordinal: t.ordinal,
            members: t.members.clone(),
        }
    }
}

#[derive(Clone)]
pub struct TableRepository {
    base: BaseRepository,
}

impl TableRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Current collection snapshot, in creation order
    pub async fn find_all(&self) -> RepoResult<Vec<SeatingTable>> {
        let tables: Vec<SeatingTable> = self
            .base
            .db()
            .query("SELECT * FROM seating_table ORDER BY ordinal")
            .await?
            .take(0)?;
        Ok(tables)
    }

    /// Find one table by record key ("t1", "t2", ...)
    pub async fn find_by_id(&self, key: &str) -> RepoResult<Option<SeatingTable>> {
        let table: Option<SeatingTable> = self.base.db().select((TABLE_COLLECTION, key)).await?;
        Ok(table)
    }

    /// Atomic batch: delete every table that existed in the snapshot,
    /// recreate every table of the result in one transaction.
    ///
    /// 只删除快照里见过的桌子，不做集合级全删；并发客户端新建的
    /// 桌子不会被这里顺带清掉 (它们属于另一场竞争，见协议说明)。
    pub async fn replace_all(
        &self,
        snapshot: &[SeatingTable],
        result: &[SeatingTable],
    ) -> RepoResult<()> {
        let mut sql = String::from("BEGIN TRANSACTION;");
        sql.push_str(" DELETE seating_table WHERE id IN $snapshot_ids;");
        for i in 0..result.len() {
            sql.push_str(&format!(
                " CREATE type::thing('seating_table', $key{i}) CONTENT $content{i};"
            ));
        }
        sql.push_str(" COMMIT TRANSACTION;");

        let snapshot_ids: Vec<RecordId> = snapshot.iter().filter_map(|t| t.id.clone()).collect();
        let mut query = self.base.db().query(sql).bind(("snapshot_ids", snapshot_ids));
        for (i, table) in result.iter().enumerate() {
            let key = table
                .key()
                .ok_or_else(|| RepoError::Validation("Result table missing id".into()))?;
            query = query
                .bind((format!("key{i}"), key))
                .bind((format!("content{i}"), TableContent::from(table)));
        }

        query.await?.check()?;
        Ok(())
    }

    /// Two-document write for a member move, one transaction
    pub async fn write_pair(
        &self,
        first: &SeatingTable,
        second: &SeatingTable,
    ) -> RepoResult<()> {
        let key_a = first
            .key()
            .ok_or_else(|| RepoError::Validation("Table missing id".into()))?;
        let key_b = second
            .key()
            .ok_or_else(|| RepoError::Validation("Table missing id".into()))?;

        self.base
            .db()
            .query(
                "BEGIN TRANSACTION; \
                 UPDATE type::thing('seating_table', $key_a) CONTENT $content_a; \
                 UPDATE type::thing('seating_table', $key_b) CONTENT $content_b; \
                 COMMIT TRANSACTION;",
            )
            .bind(("key_a", key_a))
            .bind(("content_a", TableContent::from(first)))
            .bind(("key_b", key_b))
            .bind(("content_b", TableContent::from(second)))
            .await?
            .check()?;
        Ok(())
    }

    /// Overwrite a single table document
    pub async fn update(&self, table: &SeatingTable) -> RepoResult<()> {
        let key = table
            .key()
            .ok_or_else(|| RepoError::Validation("Table missing id".into()))?;
        let _: Option<SeatingTable> = self
            .base
            .db()
            .update((TABLE_COLLECTION, key))
            .content(TableContent::from(table))
            .await?;
        Ok(())
    }

    /// Delete a single table document
    pub async fn delete(&self, key: &str) -> RepoResult<bool> {
        let deleted: Option<SeatingTable> =
            self.base.db().delete((TABLE_COLLECTION, key)).await?;
        Ok(deleted.is_some())
    }
}
