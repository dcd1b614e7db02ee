//! SeaORM entity definitions

pub mod prelude;

pub mod channels;
pub mod episodes;
pub mod network_contents;
pub mod network_programmes;
pub mod networks;
pub mod series;
