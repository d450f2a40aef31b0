//! Background job to record connection pool metrics.

use sqlx::SqlitePool;

use super::scheduler::{Job, JobFrequency};

/// Job that periodically records database connection pool metrics.
pub struct PoolMetricsJob {
    pool: SqlitePool,
}

impl PoolMetricsJob {
    /// Create a new pool metrics job.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl Job for PoolMetricsJob {
    fn name(&self) -> &'static str {
        "pool_metrics"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Seconds(10)
    }

    async fn execute(&self) -> Result<(), String> {
        persistence::metrics::record_pool_metrics(&self.pool);
        Ok(())
    }
}
