use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::PeriodicJob;
use crate::api::{SharedState, write_state};

/// Drops server sessions whose page went away without ending them
#[derive(Debug)]
pub struct EvictIdleSessions {
    max_idle: Duration,
}

impl EvictIdleSessions {
    pub fn new(max_idle: Duration) -> Self {
        Self { max_idle }
    }
}

#[async_trait]
impl PeriodicJob for EvictIdleSessions {
    fn interval(&self) -> Duration {
        // Check a few times per timeout so a session outlives it by at
        // most a quarter
        (self.max_idle / 4).max(Duration::from_secs(1))
    }

    async fn run_job(&self, state: &SharedState) {
        let evicted = match write_state(state) {
            Ok(mut state) => state.evict_idle(Instant::now(), self.max_idle),
            Err(e) => {
                tracing::error!("Skipping idle session eviction: {}", e);
                return;
            }
        };

        if !evicted.is_empty() {
            tracing::info!(
                "Evicted {} idle sessions: {}",
                evicted.len(),
                evicted.join(", ")
            );
        }
    }
}
