//! Broadcast supervision: lifecycle of the out-of-process transcoder per network

pub mod control_plane;
pub mod lease;
pub mod probe;
pub mod seek;
pub mod supervisor;
pub mod upstream;

pub use control_plane::{ControlPlane, HttpControlPlane, StartRequest, StartResponse, StopResponse};
pub use lease::{LeaseGuard, LeaseRegistry};
pub use probe::{ControlPlaneProbe, LivenessProbe, ProcessProbe, build_probe};
pub use seek::{SeekWindow, transcoder_seek};
pub use supervisor::BroadcastSupervisor;
pub use upstream::{UpstreamResolver, recognized_server_offset};
