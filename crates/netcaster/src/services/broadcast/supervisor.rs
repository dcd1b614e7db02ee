//! Broadcast supervisor
//!
//! Reconciles each network's desired broadcast state (`broadcast_requested`)
//! with the transcoder actually running behind the control plane. Control-plane
//! failures never escape as errors: a transient failure (unreachable, timeout,
//! unreadable reply) leaves the desired state alone so the next tick retries,
//! while an explicit rejection clears it and records the reason until an
//! operator asks again.

use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::database::Database;
use crate::database::repositories::{ContentSeaOrmRepository, NetworkSeaOrmRepository};
use crate::errors::{AppError, AppResult};
use crate::models::{
    BroadcastState, BroadcastStatus, BroadcastUpdate, Network, StartOutcome, StopOutcome,
    TickOutcome,
};
use crate::services::schedule_generator::ScheduleGenerator;
use crate::utils::time::truncate_to_second;

use super::control_plane::{ControlPlane, StartRequest};
use super::lease::LeaseRegistry;
use super::probe::LivenessProbe;
use super::seek::{SeekWindow, transcoder_seek};
use super::upstream::UpstreamResolver;

pub struct BroadcastSupervisor {
    networks: NetworkSeaOrmRepository,
    content: ContentSeaOrmRepository,
    control_plane: Arc<dyn ControlPlane>,
    probe: Arc<dyn LivenessProbe>,
    generator: Arc<ScheduleGenerator>,
    resolver: UpstreamResolver,
    leases: LeaseRegistry,
}

impl BroadcastSupervisor {
    pub fn new(
        database: &Database,
        control_plane: Arc<dyn ControlPlane>,
        probe: Arc<dyn LivenessProbe>,
        generator: Arc<ScheduleGenerator>,
        resolver: UpstreamResolver,
        leases: LeaseRegistry,
    ) -> Self {
        let connection = database.connection();
        Self {
            networks: NetworkSeaOrmRepository::new(connection.clone()),
            content: ContentSeaOrmRepository::new(connection),
            control_plane,
            probe,
            generator,
            resolver,
            leases,
        }
    }

    pub fn control_plane(&self) -> Arc<dyn ControlPlane> {
        self.control_plane.clone()
    }

    /// One reconciliation pass for a network
    pub async fn tick(&self, network: &Network) -> AppResult<TickOutcome> {
        if !network.is_broadcastable() {
            return Ok(TickOutcome::Idle);
        }
        if self.probe.is_alive(network).await {
            return Ok(TickOutcome::Idle);
        }
        if !network.broadcast_requested {
            return Ok(TickOutcome::Idle);
        }

        let outcome = self.start(network).await?;
        Ok(TickOutcome::from(&outcome))
    }

    /// Reconcile every broadcastable network concurrently
    pub async fn tick_all(&self) -> AppResult<Vec<(Uuid, TickOutcome)>> {
        let networks = self.networks.find_broadcastable().await?;
        let results = join_all(networks.iter().map(|network| async move {
            let outcome = match self.tick(network).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(
                        "Network '{}' ({}): broadcast tick failed: {}",
                        network.name, network.id, e
                    );
                    TickOutcome::Failed
                }
            };
            (network.id, outcome)
        }))
        .await;
        Ok(results)
    }

    /// Start the transcoder at the live position of the currently airing programme
    pub async fn start(&self, network: &Network) -> AppResult<StartOutcome> {
        let Some(_lease) = self.leases.try_acquire(network.id) else {
            debug!(
                "Network '{}' ({}): start already in progress",
                network.name, network.id
            );
            return Ok(StartOutcome::Deferred {
                reason: "start already in progress".to_string(),
            });
        };

        let snapshot_pid = network.broadcast_pid;
        let mut network = self.reload(&network.id).await?;
        if network.broadcast_pid.is_some() && network.broadcast_pid != snapshot_pid {
            return Ok(StartOutcome::Deferred {
                reason: "started concurrently".to_string(),
            });
        }
        if !network.is_broadcastable() {
            return Ok(StartOutcome::Deferred {
                reason: "broadcast is disabled".to_string(),
            });
        }
        // A stop may have landed after the caller took its snapshot
        if !network.broadcast_requested {
            debug!(
                "Network '{}' ({}): broadcast no longer requested",
                network.name, network.id
            );
            return Ok(StartOutcome::Deferred {
                reason: "broadcast not requested".to_string(),
            });
        }
        if network.broadcast_pid.is_some() {
            network = self.retire_previous(network).await?;
        }

        let now = truncate_to_second(Utc::now());
        let mut programme = self.generator.current_programme(&network.id, now).await?;
        if programme.is_none() && network.auto_regenerate_schedule {
            info!(
                "Network '{}' ({}): nothing airing, generating schedule before start",
                network.name, network.id
            );
            self.generator.generate_schedule_at(&network, now).await?;
            programme = self.generator.current_programme(&network.id, now).await?;
        }
        let Some(programme) = programme else {
            debug!(
                "Network '{}' ({}): no programme airing, nothing to start",
                network.name, network.id
            );
            return Ok(StartOutcome::Deferred {
                reason: "no programme airing".to_string(),
            });
        };

        let Some(content) = self.content.resolve(&programme.content).await? else {
            warn!(
                "Network '{}' ({}): content of programme '{}' ({}) no longer exists",
                network.name, network.id, programme.title, programme.id
            );
            return Ok(StartOutcome::Deferred {
                reason: format!("content of programme {} no longer exists", programme.id),
            });
        };

        let window = SeekWindow::at(&programme, now);
        let source_url = self
            .resolver
            .resolve(&content, network.transcode_mode, window.seek_seconds);
        let request = StartRequest {
            seek_seconds: transcoder_seek(network.transcode_mode, window.seek_seconds, &source_url),
            source_url,
            remaining_seconds: window.remaining_seconds,
            programme_id: programme.id,
            segment_start_number: network.broadcast_segment_sequence,
        };

        match self.control_plane.start(&network.token, &request).await {
            Ok(response) => {
                self.networks
                    .update_broadcast(
                        &network.id,
                        BroadcastUpdate::started(
                            response.pid,
                            now,
                            programme.id,
                            window.seek_seconds,
                        ),
                    )
                    .await?;
                info!(
                    "Network '{}' ({}): broadcast started with pid {} for '{}' at {}s ({}s remaining, {:?} mode)",
                    network.name,
                    network.id,
                    response.pid,
                    programme.title,
                    window.seek_seconds,
                    window.remaining_seconds,
                    network.transcode_mode
                );
                Ok(StartOutcome::Started {
                    pid: response.pid,
                    programme_id: programme.id,
                    seek_seconds: window.seek_seconds,
                })
            }
            Err(e) if e.is_transient() => {
                warn!(
                    "Network '{}' ({}): control plane unavailable, will retry: {}",
                    network.name, network.id, e
                );
                Ok(StartOutcome::Unavailable {
                    reason: e.to_string(),
                })
            }
            Err(e) => {
                error!(
                    "Network '{}' ({}): broadcast start rejected, not retrying until requested again: {}",
                    network.name, network.id, e
                );
                self.networks
                    .update_broadcast(&network.id, BroadcastUpdate::failed(e.to_string()))
                    .await?;
                Ok(StartOutcome::Rejected {
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Stop the transcoder and start again from the live position
    pub async fn restart(&self, network: &Network) -> AppResult<StartOutcome> {
        let mut update = BroadcastUpdate {
            pid: Some(None),
            started_at: Some(None),
            ..BroadcastUpdate::requested()
        };

        match self.control_plane.stop(&network.token).await {
            Ok(response) => {
                if let Some(last) = response.final_segment_number {
                    update.segment_sequence = Some(last + 1);
                }
            }
            Err(e) => debug!(
                "Network '{}' ({}): stop before restart failed: {}",
                network.name, network.id, e
            ),
        }

        let network = self.networks.update_broadcast(&network.id, update).await?;
        info!("Network '{}' ({}): restarting broadcast", network.name, network.id);
        self.start(&network).await
    }

    /// Stop broadcasting; sticky until the broadcast is requested again
    pub async fn stop(&self, network: &Network) -> AppResult<StopOutcome> {
        self.networks
            .update_broadcast(&network.id, BroadcastUpdate::stopped())
            .await?;

        let cleaned_up = match self.control_plane.delete(&network.token).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    "Network '{}' ({}): control plane cleanup failed: {}",
                    network.name, network.id, e
                );
                false
            }
        };

        info!("Network '{}' ({}): broadcast stopped", network.name, network.id);
        Ok(StopOutcome { cleaned_up })
    }

    /// Operator request to broadcast: clears a previous failure and reconciles now
    pub async fn request(&self, network: &Network) -> AppResult<TickOutcome> {
        let network = self
            .networks
            .update_broadcast(&network.id, BroadcastUpdate::requested())
            .await?;
        self.tick(&network).await
    }

    /// Restart transcoders that were running but have died
    pub async fn heal(&self) -> AppResult<Vec<(Uuid, StartOutcome)>> {
        let networks = self.networks.find_broadcastable().await?;
        let candidates = networks
            .iter()
            .filter(|n| n.broadcast_requested && n.broadcast_pid.is_some());

        let results = join_all(candidates.map(|network| async move {
            if self.probe.is_alive(network).await {
                return None;
            }
            warn!(
                "Network '{}' ({}): transcoder pid {:?} is gone, resuming at live position",
                network.name, network.id, network.broadcast_pid
            );
            match self.start(network).await {
                Ok(outcome) => Some((network.id, outcome)),
                Err(e) => {
                    warn!(
                        "Network '{}' ({}): heal failed: {}",
                        network.name, network.id, e
                    );
                    None
                }
            }
        }))
        .await;

        Ok(results.into_iter().flatten().collect())
    }

    /// Mark broadcasts wanted again after an application restart
    ///
    /// Process identity and errors recorded by a previous run are discarded; the
    /// regular tick loop then starts the transcoders.
    pub async fn perform_boot_recovery(&self, network: Option<&Network>) -> AppResult<usize> {
        let networks = match network {
            Some(network) => vec![self.reload(&network.id).await?],
            None => self.networks.find_broadcastable().await?,
        };

        let mut recovered = 0;
        for network in networks.iter().filter(|n| n.is_broadcastable()) {
            self.networks
                .update_broadcast(&network.id, BroadcastUpdate::recovered())
                .await?;
            recovered += 1;
        }

        info!("Boot recovery marked {} network(s) for broadcast", recovered);
        Ok(recovered)
    }

    /// Stop the broadcast, then remove the network with its pool and timeline
    pub async fn delete_network(&self, network: &Network) -> AppResult<bool> {
        self.stop(network).await?;
        let deleted = self.networks.delete(&network.id).await?;
        info!("Network '{}' ({}): deleted", network.name, network.id);
        Ok(deleted)
    }

    /// Snapshot of a network's broadcast
    pub async fn status(&self, network: &Network) -> AppResult<BroadcastStatus> {
        let alive = network.is_broadcastable() && self.probe.is_alive(network).await;
        Ok(BroadcastStatus {
            network_id: network.id,
            state: BroadcastState::derive(
                network.enabled,
                network.broadcast_enabled,
                network.broadcast_requested,
                alive,
            ),
            requested: network.broadcast_requested,
            pid: network.broadcast_pid,
            started_at: network.broadcast_started_at,
            programme_id: network.broadcast_programme_id,
            initial_offset_seconds: network.broadcast_initial_offset_seconds,
            segment_sequence: network.broadcast_segment_sequence,
            error: network.broadcast_error.clone(),
        })
    }

    /// Stop the previous transcoder of this broadcast and continue its segment numbering
    async fn retire_previous(&self, network: Network) -> AppResult<Network> {
        let last = match self.control_plane.stop(&network.token).await {
            Ok(response) => response.final_segment_number,
            Err(e) => {
                debug!(
                    "Network '{}' ({}): stop of previous transcoder failed: {}",
                    network.name, network.id, e
                );
                None
            }
        };

        let Some(last) = last else {
            return Ok(network);
        };
        let update = BroadcastUpdate {
            segment_sequence: Some(last + 1),
            ..Default::default()
        };
        Ok(self.networks.update_broadcast(&network.id, update).await?)
    }

    async fn reload(&self, id: &Uuid) -> AppResult<Network> {
        self.networks
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("network", id))
    }
}
