//! Participant Repository

use super::{BaseRepository, RepoResult};
use crate::db::models::{GeoPoint, Participant, ParticipantCreate, ParticipantUpdate};
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const TABLE: &str = "participant";

#[derive(Clone)]
pub struct ParticipantRepository {
    base: BaseRepository,
}

impl ParticipantRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find all participants, oldest first
    pub async fn find_all(&self) -> RepoResult<Vec<Participant>> {
        let participants: Vec<Participant> = self
            .base
            .db()
            .query("SELECT * FROM participant ORDER BY created_at, id")
            .await?
            .take(0)?;
        Ok(participants)
    }

    /// Find one participant by record key
    pub async fn find_by_id(&self, key: &str) -> RepoResult<Option<Participant>> {
        let participant: Option<Participant> = self.base.db().select((TABLE, key)).await?;
        Ok(participant)
    }

    /// Sign-in upsert: creates the record on first sign-in, merges
    /// the identity fields on every later one (existing profile
    /// fields such as gender/preferences are preserved)
    pub async fn upsert(&self, key: &str, data: ParticipantCreate) -> RepoResult<Participant> {
        let participant: Option<Participant> =
            self.base.db().upsert((TABLE, key)).merge(data).await?;
        participant.ok_or_else(|| super::RepoError::Database("Upsert returned nothing".into()))
    }

    /// Field-level merge update: only fields present in the payload
    /// overwrite stored values
    pub async fn update_merge(
        &self,
        key: &str,
        data: ParticipantUpdate,
    ) -> RepoResult<Option<Participant>> {
        let participant: Option<Participant> =
            self.base.db().update((TABLE, key)).merge(data).await?;
        Ok(participant)
    }

    /// Set or clear the participant's location
    ///
    /// 定位失败/拒绝时调用方传 None，降级为"无位置"而不是报错。
    pub async fn set_location(
        &self,
        key: &str,
        location: Option<GeoPoint>,
    ) -> RepoResult<Option<Participant>> {
        let mut response = self
            .base
            .db()
            .query("UPDATE type::thing('participant', $key) SET location = $location")
            .bind(("key", key.to_string()))
            .bind(("location", location))
            .await?;
        let participant: Option<Participant> = response.take(0)?;
        Ok(participant)
    }

    /// Delete a participant record
    pub async fn delete(&self, key: &str) -> RepoResult<bool> {
        let deleted: Option<Participant> = self.base.db().delete((TABLE, key)).await?;
        Ok(deleted.is_some())
    }
}
