//! Background job scheduler and job implementations.

mod pool_metrics;
mod refresh_markers;
mod scheduler;

pub use pool_metrics::PoolMetricsJob;
pub use refresh_markers::RefreshMarkersJob;
pub use scheduler::{Job, JobFrequency, JobScheduler};
