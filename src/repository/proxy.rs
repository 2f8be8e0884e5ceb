use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use crate::error::Result;
use crate::models::ProxyRecord;

/// Persistence operations the maintainer needs from the proxy store
#[async_trait]
pub trait ProxyStore: Send + Sync {
    /// Delete every record whose error count is at or above `max_err`,
    /// returning the removed rows
    async fn delete_exceeding(&self, max_err: i32) -> Result<Vec<ProxyRecord>>;
}

/// Repository for proxy database operations
#[derive(Clone)]
pub struct ProxyRepository {
    pool: PgPool,
}

impl ProxyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProxyStore for ProxyRepository {
    async fn delete_exceeding(&self, max_err: i32) -> Result<Vec<ProxyRecord>> {
        let removed = sqlx::query_as::<_, ProxyRecord>(
            r#"
            DELETE FROM proxy
            WHERE err_times >= $1
            RETURNING id, address, provider, dial_type, err_times, created_at, updated_at
            "#,
        )
        .bind(max_err)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = removed.len(), max_err, "Deleted proxies over error threshold");

        Ok(removed)
    }
}
