//! 后台任务
//!
//! # 任务列表
//!
//! - 成员索引刷新器: 订阅消息总线的 Sync 通知，桌子集合每次变更后
//!   从最新快照整体重建 [`MembershipIndex`] 缓存。不做增量修补。

use shared::message::{EventType, SyncPayload};
use tokio::sync::broadcast::error::RecvError;

use crate::core::ServerState;
use crate::db::models::TABLE_COLLECTION;
use crate::db::repository::TableRepository;
use crate::seating::MembershipIndex;

/// 启动成员索引刷新任务
pub fn spawn_membership_refresher(state: ServerState) {
    tokio::spawn(async move {
        run_membership_refresher(state).await;
    });
    tracing::debug!("Membership index refresher started in background");
}

async fn run_membership_refresher(state: ServerState) {
    let mut rx = state.message_bus.subscribe();
    let shutdown = state.message_bus.shutdown_token().clone();
    let tables = TableRepository::new(state.db.clone());

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::debug!("Membership index refresher stopping");
                break;
            }
            msg = rx.recv() => match msg {
                Ok(msg) if msg.event_type == EventType::Sync => {
                    let Ok(payload) = msg.parse_payload::<SyncPayload>() else {
                        continue;
                    };
                    if payload.resource == TABLE_COLLECTION {
                        rebuild_index(&state, &tables).await;
                    }
                }
                Ok(_) => {}
                // Lagged: 错过的通知无所谓，重建本来就是全量的
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Membership refresher lagged, rebuilding");
                    rebuild_index(&state, &tables).await;
                }
                Err(RecvError::Closed) => break,
            }
        }
    }
}

async fn rebuild_index(state: &ServerState, tables: &TableRepository) {
    match tables.find_all().await {
        Ok(snapshot) => {
            let index = MembershipIndex::from_tables(&snapshot);
            if let Ok(mut guard) = state.membership.write() {
                *guard = index;
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Membership index rebuild failed, keeping stale cache");
        }
    }
}
