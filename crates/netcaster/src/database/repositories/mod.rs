//! SeaORM repository implementations

pub mod content;
pub mod network;
pub mod network_content;
pub mod programme;

pub use content::ContentSeaOrmRepository;
pub use network::NetworkSeaOrmRepository;
pub use network_content::NetworkContentSeaOrmRepository;
pub use programme::{ProgrammeSeaOrmRepository, ScheduleWrite, ScheduleWriteCounts};
