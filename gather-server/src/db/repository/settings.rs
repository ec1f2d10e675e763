//! Settings Repository
//!
//! 单文档集合：settings:global。

use super::{BaseRepository, RepoResult};
use crate::db::models::{SeatingSettings, SettingsUpdate};
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const TABLE: &str = "settings";
const KEY: &str = "global";

#[derive(Clone)]
pub struct SettingsRepository {
    base: BaseRepository,
}

impl SettingsRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Read the shared settings, initializing defaults on first access
    pub async fn get_or_init(&self) -> RepoResult<SeatingSettings> {
        let existing: Option<SeatingSettings> = self.base.db().select((TABLE, KEY)).await?;
        if let Some(settings) = existing {
            return Ok(settings);
        }

        let created: Option<SeatingSettings> = self
            .base
            .db()
            .upsert((TABLE, KEY))
            .content(SeatingSettings::default())
            .await?;
        Ok(created.unwrap_or_default())
    }

    /// Field-level merge update; absent fields keep their stored value
    pub async fn update_merge(&self, patch: SettingsUpdate) -> RepoResult<SeatingSettings> {
        // Make sure the document exists before merging into it
        let _ = self.get_or_init().await?;

        let updated: Option<SeatingSettings> =
            self.base.db().upsert((TABLE, KEY)).merge(patch).await?;
        Ok(updated.unwrap_or_default())
    }
}
