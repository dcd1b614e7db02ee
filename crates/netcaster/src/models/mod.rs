//! Domain models shared by repositories, services and the web layer

pub mod broadcast;
pub mod content;
pub mod network;
pub mod programme;

pub use broadcast::*;
pub use content::*;
pub use network::*;
pub use programme::*;
