use std::sync::Arc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use crate::pipeline::CampaignRunner;
use super::JobSource;

/// Cancel tokens of campaigns currently executing in this process.
/// Shared between the worker pool and the cancel endpoint.
#[derive(Clone, Default)]
pub struct ActiveRuns {
    runs: Arc<DashMap<String, CancellationToken>>,
}

impl ActiveRuns {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh token, or `None` if the campaign is already executing.
    pub fn register(&self, campaign_id: &str) -> Option<CancellationToken> {
        match self.runs.entry(campaign_id.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                let token = CancellationToken::new();
                slot.insert(token.clone());
                Some(token)
            }
        }
    }

    /// Trip the token of a running campaign. False when it is not running here.
    pub fn cancel(&self, campaign_id: &str) -> bool {
        match self.runs.get(campaign_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, campaign_id: &str) -> bool {
        self.runs.contains_key(campaign_id)
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    fn finish(&self, campaign_id: &str) {
        self.runs.remove(campaign_id);
    }
}

/// Removes the run entry even if the job task panics.
struct RunGuard {
    active: ActiveRuns,
    campaign_id: String,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.active.finish(&self.campaign_id);
    }
}

/// Fixed-size pool pulling jobs from a [`JobSource`]. Each job is one
/// independent runner invocation; the only shared limit is the pool size.
pub struct WorkerPool {
    source: Arc<dyn JobSource>,
    runner: Arc<CampaignRunner>,
    active: ActiveRuns,
    concurrency: usize,
}

impl WorkerPool {
    pub fn new(
        source: Arc<dyn JobSource>,
        runner: Arc<CampaignRunner>,
        active: ActiveRuns,
        concurrency: usize,
    ) -> Self {
        Self {
            source,
            runner,
            active,
            concurrency: concurrency.max(1),
        }
    }

    /// Pull and execute jobs until `shutdown` trips or the source closes,
    /// then wait for in-flight jobs to finish.
    pub async fn run(self, shutdown: CancellationToken) {
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();
        info!(concurrency = self.concurrency, "Worker pool started");

        loop {
            let permit = tokio::select! {
                _ = shutdown.cancelled() => break,
                permit = permits.clone().acquire_owned() => match permit {
                    Ok(p) => p,
                    Err(_) => break,
                },
            };

            let job = tokio::select! {
                _ = shutdown.cancelled() => break,
                job = self.source.next_job() => job,
            };
            let Some(campaign_id) = job else {
                debug!("Job source closed");
                break;
            };

            let Some(token) = self.active.register(&campaign_id) else {
                debug!(campaign_id = %campaign_id, "Duplicate delivery of running campaign ignored");
                continue;
            };

            let runner = self.runner.clone();
            let guard = RunGuard {
                active: self.active.clone(),
                campaign_id: campaign_id.clone(),
            };
            tasks.spawn(async move {
                let _permit = permit;
                let _guard = guard;
                if let Err(e) = runner.execute(&campaign_id, &token).await {
                    warn!(campaign_id = %campaign_id, error = %e, "Job failed");
                }
            });

            while let Some(done) = tasks.try_join_next() {
                if let Err(e) = done {
                    error!(error = %e, "Job task panicked");
                }
            }
        }

        info!(in_flight = tasks.len(), "Worker pool draining");
        while let Some(done) = tasks.join_next().await {
            if let Err(e) = done {
                error!(error = %e, "Job task panicked");
            }
        }
        info!("Worker pool stopped");
    }
}
