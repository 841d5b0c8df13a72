use domain::{ChangeEvent, SubjectChange, SubjectId};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Sqlite,
};
use std::{fs, path::Path, str::FromStr};
use tokio::sync::broadcast;
use tracing::debug;

mod models;
mod remote;
mod repo;

const DEFAULT_FEED_CAPACITY: usize = 100;

#[derive(Clone)]
pub struct Db {
    pub(crate) pool: Pool<Sqlite>,
    pub(crate) changes: broadcast::Sender<SubjectChange>,
}

impl Db {
    pub async fn new(db_url: &str) -> anyhow::Result<Self> {
        Self::with_feed_capacity(db_url, DEFAULT_FEED_CAPACITY).await
    }

    pub async fn with_feed_capacity(db_url: &str, feed_capacity: usize) -> anyhow::Result<Self> {
        let in_memory = db_url.contains(":memory:");
        if db_url.starts_with("sqlite://") && !in_memory {
            let path_str = db_url.trim_start_matches("sqlite://");
            let path = Path::new(path_str);
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    fs::create_dir_all(parent)?;
                }
            }
        }
        let options = SqliteConnectOptions::from_str(db_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool_options = if in_memory {
            // every connection to :memory: is its own database, so the one
            // connection must never be reaped
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = pool_options.connect_with(options).await?;
        sqlx::query("PRAGMA journal_mode = WAL;")
            .execute(&pool)
            .await?;
        sqlx::query("PRAGMA synchronous = NORMAL;")
            .execute(&pool)
            .await?;
        sqlx::migrate!("../../migrations").run(&pool).await?;

        let (changes, _) = broadcast::channel(feed_capacity.max(1));
        Ok(Self { pool, changes })
    }

    pub(crate) fn publish(&self, subject_id: &SubjectId, event: ChangeEvent) {
        let change = SubjectChange {
            subject_id: subject_id.clone(),
            event,
        };
        if self.changes.send(change).is_err() {
            debug!("No realtime subscribers for subject {}", subject_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_pool_keeps_its_only_connection() {
        let db = Db::new("sqlite::memory:").await.unwrap();
        let options = db.pool.options();

        assert_eq!(options.get_max_connections(), 1);
        assert_eq!(options.get_min_connections(), 1);
        assert!(options.get_idle_timeout().is_none());
        assert!(options.get_max_lifetime().is_none());

        // schema is still there after the pool hands the connection back
        assert!(db.list_comments("g1").await.unwrap().is_empty());
        assert!(db.list_comments("g1").await.unwrap().is_empty());
    }
}
