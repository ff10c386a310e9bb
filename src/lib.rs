//! Builds an XMLTV guide from the Gracenote (zap2it) listings grid

pub mod config;
pub mod errors;
pub mod guide;
pub mod models;
pub mod scheduler;
pub mod services;
pub mod sources;
pub mod storage;
pub mod utils;
pub mod web;
