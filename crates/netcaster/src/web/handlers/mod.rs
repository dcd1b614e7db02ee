//! HTTP handlers

pub mod epg;
pub mod health;
pub mod hls;
pub mod networks;
