//! Background jobs that run on a fixed interval for the life of the
//! server.
use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use crate::api::SharedState;

mod evict_idle_sessions;

pub use evict_idle_sessions::EvictIdleSessions;

#[async_trait]
pub trait PeriodicJob: Debug + Send + Sync {
    fn interval(&self) -> Duration;

    async fn run_job(&self, state: &SharedState);
}

/// Run `job` every `job.interval()`, starting one interval from now
pub fn spawn_periodic_job<J>(state: SharedState, job: J) -> JoinHandle<()>
where
    J: PeriodicJob + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(job.interval());
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            tracing::debug!("Running periodic job {:?}", job);
            job.run_job(&state).await;
        }
    })
}
