//! Background jobs for netcaster
//!
//! Periodic drivers for the broadcast supervisor and the schedule generator:
//! - Boot recovery (one-shot at startup)
//! - Broadcast reconciliation ticks
//! - Healing of dead transcoders
//! - Schedule regeneration checks

pub mod broadcast_scheduler;

pub use broadcast_scheduler::BroadcastJobs;
