//! Database Module
//!
//! Handles the embedded SurrealDB instance used as the shared document store.
//! Collections: `participant`, `seating_table`, `settings`.

pub mod models;
pub mod repository;

use crate::utils::AppError;
use std::path::Path;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem, RocksDb};

const NAMESPACE: &str = "gather";
const DATABASE: &str = "main";

/// Database service, owns the embedded SurrealDB handle
#[derive(Clone, Debug)]
pub struct DbService {
    pub db: Surreal<Db>,
}

impl DbService {
    /// Open (or create) the on-disk database under the given directory
    pub async fn new(db_dir: &Path) -> Result<Self, AppError> {
        let db: Surreal<Db> = Surreal::new::<RocksDb>(db_dir)
            .await
            .map_err(|e| AppError::database(format!("Failed to open database: {e}")))?;

        db.use_ns(NAMESPACE)
            .use_db(DATABASE)
            .await
            .map_err(|e| AppError::database(format!("Failed to select namespace: {e}")))?;

        tracing::info!(path = %db_dir.display(), "Database connection established (SurrealDB RocksDb)");

        Ok(Self { db })
    }

    /// In-memory database for tests
    pub async fn memory() -> Result<Self, AppError> {
        let db: Surreal<Db> = Surreal::new::<Mem>(())
            .await
            .map_err(|e| AppError::database(format!("Failed to open in-memory database: {e}")))?;

        db.use_ns(NAMESPACE)
            .use_db(DATABASE)
            .await
            .map_err(|e| AppError::database(format!("Failed to select namespace: {e}")))?;

        Ok(Self { db })
    }
}
