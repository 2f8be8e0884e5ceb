use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Persisted proxy entity
///
/// Rows are written by the inventory side; the maintainer only ever removes
/// them once `err_times` crosses the configured threshold.
#[derive(Debug, Clone, FromRow)]
pub struct ProxyRecord {
    pub id: i32,
    pub address: String,
    pub provider: String,
    pub dial_type: String, // Stored as string in DB
    pub err_times: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProxyRecord {
    /// Whether the reaper should remove this record
    pub fn is_dead(&self, max_err: i32) -> bool {
        self.err_times >= max_err
    }
}
