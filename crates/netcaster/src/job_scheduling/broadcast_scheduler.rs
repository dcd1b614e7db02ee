use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{BroadcastConfig, ScheduleConfig};
use crate::models::{StartOutcome, TickOutcome};
use crate::services::{BroadcastSupervisor, ScheduleGenerator};

/// Spawns and owns the periodic broadcast and schedule loops
#[derive(Clone)]
pub struct BroadcastJobs {
    supervisor: Arc<BroadcastSupervisor>,
    generator: Arc<ScheduleGenerator>,
    broadcast: BroadcastConfig,
    schedule: ScheduleConfig,
}

impl BroadcastJobs {
    pub fn new(
        supervisor: Arc<BroadcastSupervisor>,
        generator: Arc<ScheduleGenerator>,
        broadcast: BroadcastConfig,
        schedule: ScheduleConfig,
    ) -> Self {
        Self {
            supervisor,
            generator,
            broadcast,
            schedule,
        }
    }

    /// Run boot recovery (when enabled) and spawn all loops
    ///
    /// Recovery completes before the first tick so networks marked for broadcast
    /// are picked up immediately.
    pub async fn start(&self, cancellation_token: CancellationToken) -> Vec<JoinHandle<()>> {
        if self.broadcast.boot_recovery {
            self.recover_on_boot().await;
        } else {
            info!("Boot recovery disabled, leaving broadcast state as persisted");
        }

        vec![
            self.spawn_loop(
                "broadcast tick",
                self.broadcast.tick_interval,
                &cancellation_token,
                |jobs| async move { jobs.run_tick().await },
            ),
            self.spawn_loop(
                "broadcast heal",
                self.broadcast.heal_interval,
                &cancellation_token,
                |jobs| async move { jobs.run_heal().await },
            ),
            self.spawn_loop(
                "schedule regeneration",
                self.schedule.check_interval,
                &cancellation_token,
                |jobs| async move { jobs.run_regeneration().await },
            ),
        ]
    }

    pub async fn recover_on_boot(&self) -> usize {
        match self.supervisor.perform_boot_recovery(None).await {
            Ok(count) => count,
            Err(e) => {
                error!("Boot recovery failed: {}", e);
                0
            }
        }
    }

    fn spawn_loop<F, Fut>(
        &self,
        name: &'static str,
        period: Duration,
        cancellation_token: &CancellationToken,
        job: F,
    ) -> JoinHandle<()>
    where
        F: Fn(BroadcastJobs) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let jobs = self.clone();
        let token = cancellation_token.clone();
        tokio::spawn(async move {
            info!("Starting {} loop every {:?}", name, period);
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        job(jobs.clone()).await;
                    }
                    _ = token.cancelled() => {
                        info!("{} loop received cancellation signal, shutting down", name);
                        break;
                    }
                }
            }
        })
    }

    /// One reconciliation pass over every broadcastable network
    pub async fn run_tick(&self) {
        match self.supervisor.tick_all().await {
            Ok(results) => {
                let started = results
                    .iter()
                    .filter(|(_, outcome)| *outcome == TickOutcome::Started)
                    .count();
                let failed = results
                    .iter()
                    .filter(|(_, outcome)| *outcome == TickOutcome::Failed)
                    .count();
                if started > 0 || failed > 0 {
                    info!(
                        "Broadcast tick: {} network(s), {} started, {} failed",
                        results.len(),
                        started,
                        failed
                    );
                } else {
                    debug!("Broadcast tick: {} network(s), nothing to do", results.len());
                }
            }
            Err(e) => error!("Broadcast tick failed: {}", e),
        }
    }

    pub async fn run_heal(&self) {
        match self.supervisor.heal().await {
            Ok(results) => {
                for (network_id, outcome) in results {
                    match outcome {
                        StartOutcome::Started { pid, .. } => {
                            info!("Healed network {} with new pid {}", network_id, pid)
                        }
                        other => warn!("Could not heal network {}: {:?}", network_id, other),
                    }
                }
            }
            Err(e) => error!("Broadcast heal failed: {}", e),
        }
    }

    pub async fn run_regeneration(&self) {
        match self.generator.regenerate_due(Utc::now()).await {
            Ok(results) if !results.is_empty() => {
                info!("Regenerated schedules for {} network(s)", results.len())
            }
            Ok(_) => debug!("No schedules due for regeneration"),
            Err(e) => error!("Schedule regeneration check failed: {}", e),
        }
    }
}
