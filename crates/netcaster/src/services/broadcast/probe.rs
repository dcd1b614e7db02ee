//! Liveness probes for a network's transcoder

use async_trait::async_trait;
use std::sync::Arc;
use sysinfo::{Pid, ProcessesToUpdate, System};
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::ProbeKind;
use crate::models::Network;

use super::control_plane::ControlPlane;

#[async_trait]
pub trait LivenessProbe: Send + Sync {
    /// Whether the network's transcoder is actually running
    async fn is_alive(&self, network: &Network) -> bool;
}

/// Asks the control plane's status endpoint
pub struct ControlPlaneProbe {
    control_plane: Arc<dyn ControlPlane>,
}

impl ControlPlaneProbe {
    pub fn new(control_plane: Arc<dyn ControlPlane>) -> Self {
        Self { control_plane }
    }
}

#[async_trait]
impl LivenessProbe for ControlPlaneProbe {
    async fn is_alive(&self, network: &Network) -> bool {
        match self.control_plane.status(&network.token).await {
            Ok(running) => running,
            Err(e) => {
                debug!(
                    "Network '{}' ({}): status probe failed: {}",
                    network.name, network.id, e
                );
                false
            }
        }
    }
}

/// Checks the persisted pid against the local process table
///
/// Only meaningful when the control plane runs on the same host.
pub struct ProcessProbe {
    system: Arc<RwLock<System>>,
}

impl ProcessProbe {
    pub fn new(system: Arc<RwLock<System>>) -> Self {
        Self { system }
    }
}

impl Default for ProcessProbe {
    fn default() -> Self {
        Self::new(Arc::new(RwLock::new(System::new())))
    }
}

#[async_trait]
impl LivenessProbe for ProcessProbe {
    async fn is_alive(&self, network: &Network) -> bool {
        let Some(pid) = network.broadcast_pid.and_then(|pid| u32::try_from(pid).ok()) else {
            return false;
        };
        let pid = Pid::from_u32(pid);

        let mut system = self.system.write().await;
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        system.process(pid).is_some()
    }
}

/// Build the probe selected in configuration
pub fn build_probe(kind: ProbeKind, control_plane: Arc<dyn ControlPlane>) -> Arc<dyn LivenessProbe> {
    match kind {
        ProbeKind::ControlPlane => Arc::new(ControlPlaneProbe::new(control_plane)),
        ProbeKind::Process => Arc::new(ProcessProbe::default()),
    }
}
