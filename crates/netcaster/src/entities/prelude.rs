pub use super::channels::Entity as Channels;
pub use super::episodes::Entity as Episodes;
pub use super::network_contents::Entity as NetworkContents;
pub use super::network_programmes::Entity as NetworkProgrammes;
pub use super::networks::Entity as Networks;
pub use super::series::Entity as Series;
