//! Database metrics collection.

use metrics::{counter, gauge, histogram};
use sqlx::SqlitePool;
use std::time::Instant;

/// Record how long a query took and whether it succeeded.
pub fn record_query(query_name: &'static str, duration_secs: f64, succeeded: bool) {
    let status = if succeeded { "ok" } else { "error" };
    histogram!(
        "geomarker_db_query_duration_seconds",
        "query" => query_name,
        "status" => status
    )
    .record(duration_secs);

    if !succeeded {
        counter!("geomarker_db_query_errors_total", "query" => query_name).increment(1);
    }
}

/// Record connection pool occupancy.
pub fn record_pool_metrics(pool: &SqlitePool) {
    let size = pool.size() as usize;
    let idle = pool.num_idle();

    gauge!("geomarker_db_connections_active").set(size.saturating_sub(idle) as f64);
    gauge!("geomarker_db_connections_idle").set(idle as f64);
}

/// Times a single repository call.
///
/// ```ignore
/// let timer = QueryTimer::new("find_marker_by_id");
/// let result = sqlx::query_as::<_, MarkerEntity>(...).fetch_optional(&pool).await;
/// timer.finish(result)
/// ```
pub struct QueryTimer {
    query_name: &'static str,
    start: Instant,
}

impl QueryTimer {
    pub fn new(query_name: &'static str) -> Self {
        Self {
            query_name,
            start: Instant::now(),
        }
    }

    /// Record the elapsed time against the outcome and pass the result through.
    pub fn finish<T, E>(self, result: Result<T, E>) -> Result<T, E> {
        record_query(
            self.query_name,
            self.start.elapsed().as_secs_f64(),
            result.is_ok(),
        );
        result
    }
}
