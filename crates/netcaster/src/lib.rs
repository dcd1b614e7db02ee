//! netcaster: virtual linear broadcast networks
//!
//! Networks rotate a pool of episodes and live channels into a continuous
//! programme timeline, broadcast it live through an out-of-process transcoder
//! and serve the result as HLS with an XMLTV guide.

pub mod config;
pub mod database;
pub mod entities;
pub mod errors;
pub mod job_scheduling;
pub mod models;
pub mod services;
pub mod utils;
pub mod web;
