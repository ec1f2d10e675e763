//! Repository Module
//!
//! Provides collection access for the embedded SurrealDB store.
//! 写入纪律：读取最新快照 → 计算 → 整体写回；跨文档批量写
//! 一律走单条事务 (all-or-nothing)。

pub mod participant;
pub mod settings;
pub mod table;

// Re-exports
pub use participant::ParticipantRepository;
pub use settings::SettingsRepository;
pub use table::TableRepository;

use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<surrealdb::Error> for RepoError {
    fn from(err: surrealdb::Error) -> Self {
        RepoError::Database(err.to_string())
    }
}

impl From<RepoError> for crate::utils::AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(msg) => crate::utils::AppError::NotFound(msg),
            RepoError::Validation(msg) => crate::utils::AppError::Validation(msg),
            RepoError::Database(msg) => crate::utils::AppError::Database(msg),
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// Base repository with database reference
#[derive(Clone)]
pub struct BaseRepository {
    db: Surreal<Db>,
}

impl BaseRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Surreal<Db> {
        &self.db
    }
}
