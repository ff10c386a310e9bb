//! Upstream listings sources
//!
//! [`GridSource`] is the seam between guide assembly and the network;
//! [`GracenoteClient`] is the production implementation.

pub mod gracenote;
pub mod traits;

pub use gracenote::{GracenoteClient, GracenoteSettings};
pub use traits::GridSource;
