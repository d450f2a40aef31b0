//! Periodic background jobs.

use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::counter;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobFrequency {
    Seconds(u64),
    Minutes(u64),
}

impl JobFrequency {
    pub fn duration(&self) -> Duration {
        match self {
            JobFrequency::Seconds(secs) => Duration::from_secs(*secs),
            JobFrequency::Minutes(mins) => Duration::from_secs(*mins * 60),
        }
    }
}

/// A unit of periodic work.
#[async_trait::async_trait]
pub trait Job: Send + Sync {
    /// Name used in logs and metric labels.
    fn name(&self) -> &'static str;

    fn frequency(&self) -> JobFrequency;

    /// A failed run is logged; the job keeps its schedule.
    async fn execute(&self) -> Result<(), String>;
}

/// Runs each registered job on its own task until shut down.
pub struct JobScheduler {
    jobs: Vec<Arc<dyn Job>>,
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl JobScheduler {
    pub fn new() -> Self {
        Self {
            jobs: Vec::new(),
            cancel: CancellationToken::new(),
            handles: Vec::new(),
        }
    }

    pub fn register<J: Job + 'static>(&mut self, job: J) {
        self.jobs.push(Arc::new(job));
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Spawn one task per job. The first run happens one period after start.
    pub fn start(&mut self) {
        info!(jobs = self.jobs.len(), "Starting job scheduler");

        for job in &self.jobs {
            let job = Arc::clone(job);
            let cancel = self.cancel.child_token();
            self.handles.push(tokio::spawn(run_job(job, cancel)));
        }
    }

    /// Signal every job to stop. Does not wait.
    pub fn shutdown(&self) {
        info!("Job scheduler shutting down");
        self.cancel.cancel();
    }

    /// Wait for job tasks to finish, giving up after `timeout`.
    pub async fn wait_for_shutdown(self, timeout: Duration) {
        let handles = self.handles;
        let joined = async move {
            for handle in handles {
                if let Err(e) = handle.await {
                    warn!(error = %e, "Job task panicked");
                }
            }
        };

        if tokio::time::timeout(timeout, joined).await.is_err() {
            warn!(timeout = ?timeout, "Job shutdown timed out");
        }
    }
}

impl Default for JobScheduler {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_job(job: Arc<dyn Job>, cancel: CancellationToken) {
    let name = job.name();
    let frequency = job.frequency();
    let mut interval = tokio::time::interval(frequency.duration());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // The first tick completes immediately.
    interval.tick().await;
    debug!(job = name, frequency = ?frequency, "Job scheduled");

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                let started = Instant::now();
                let result = job.execute().await;
                let elapsed_ms = started.elapsed().as_millis() as u64;

                match result {
                    Ok(()) => {
                        counter!("geomarker_job_runs_total", "job" => name, "status" => "ok").increment(1);
                        debug!(job = name, elapsed_ms, "Job completed");
                    }
                    Err(e) => {
                        counter!("geomarker_job_runs_total", "job" => name, "status" => "error").increment(1);
                        error!(job = name, elapsed_ms, error = %e, "Job failed");
                    }
                }
            }
        }
    }

    debug!(job = name, "Job stopped");
}
