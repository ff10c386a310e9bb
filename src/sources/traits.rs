//! Source trait definitions
//!
//! The guide assembler only needs two things from the listings service: a
//! session, and one grid per (time instant, postal code) cell. Keeping that
//! behind a trait lets the assembler run against scripted grids in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::AppResult;
use crate::models::GridResponse;

/// Fetch collaborator for the guide assembler
#[async_trait]
pub trait GridSource: Send + Sync {
    /// Negotiate a session before any grid is requested
    async fn authenticate(&mut self) -> AppResult<()>;

    /// Fetch the grid for one 3-hour slot starting at `instant`
    async fn fetch_grid(
        &self,
        instant: DateTime<Utc>,
        postal_code: &str,
    ) -> AppResult<GridResponse>;
}
