//! Per-network start leases
//!
//! At most one start may be in flight for a network. A lease expires after a
//! bounded lifetime so a crashed holder cannot block a network forever.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use uuid::Uuid;

#[derive(Clone)]
pub struct LeaseRegistry {
    ttl: Duration,
    leases: Arc<Mutex<HashMap<Uuid, Lease>>>,
}

#[derive(Debug, Clone, Copy)]
struct Lease {
    holder: Uuid,
    expires_at: Instant,
}

/// Held lease; released on drop
pub struct LeaseGuard {
    network_id: Uuid,
    holder: Uuid,
    leases: Arc<Mutex<HashMap<Uuid, Lease>>>,
}

impl LeaseRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            leases: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Acquire the lease for a network, or `None` if a live lease is held elsewhere
    pub fn try_acquire(&self, network_id: Uuid) -> Option<LeaseGuard> {
        let now = Instant::now();
        let mut leases = self.leases.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(existing) = leases.get(&network_id)
            && existing.expires_at > now
        {
            return None;
        }

        let holder = Uuid::new_v4();
        leases.insert(
            network_id,
            Lease {
                holder,
                expires_at: now + self.ttl,
            },
        );

        Some(LeaseGuard {
            network_id,
            holder,
            leases: self.leases.clone(),
        })
    }

    pub fn is_held(&self, network_id: &Uuid) -> bool {
        let leases = self.leases.lock().unwrap_or_else(|e| e.into_inner());
        leases
            .get(network_id)
            .is_some_and(|lease| lease.expires_at > Instant::now())
    }
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        let mut leases = self.leases.lock().unwrap_or_else(|e| e.into_inner());
        // An expired lease may have been reclaimed by someone else
        if leases
            .get(&self.network_id)
            .is_some_and(|lease| lease.holder == self.holder)
        {
            leases.remove(&self.network_id);
        }
    }
}
