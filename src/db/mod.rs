use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::models::log::NewLog;

pub mod migrator;
pub mod repositories;

pub use crate::entities::logs::Model as LogRecord;
pub use repositories::logs::{LevelCount, LogFilter};

/// The connection pool to the store. Constructed once at startup and passed
/// explicitly wherever persistence is needed.
#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let in_memory = db_url.contains(":memory:");

        if !in_memory {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        // An in-memory database exists per connection, so a pool of more than
        // one would hand out empty databases.
        let max_connections = if in_memory { 1 } else { max_connections };
        let min_connections = min_connections.min(max_connections);

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn logs_repo(&self) -> repositories::logs::LogRepository {
        repositories::logs::LogRepository::new(self.conn.clone())
    }

    pub async fn insert_log(&self, log: NewLog) -> Result<LogRecord> {
        self.logs_repo().insert(log).await
    }

    pub async fn insert_logs(&self, batch: Vec<NewLog>) -> Result<Vec<LogRecord>> {
        self.logs_repo().insert_batch(batch).await
    }

    pub async fn query_logs(
        &self,
        filter: &LogFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<LogRecord>, u64)> {
        self.logs_repo().query(filter, page, limit).await
    }

    pub async fn log_stats(&self, filter: &LogFilter) -> Result<Vec<LevelCount>> {
        self.logs_repo().stats(filter).await
    }

    pub async fn get_log(&self, id: i64) -> Result<Option<LogRecord>> {
        self.logs_repo().get(id).await
    }
}
