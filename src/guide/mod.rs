//! XMLTV guide construction
//!
//! [`GuideAssembler`] drives the build: it plans fetch instants, pulls grids
//! from a [`crate::sources::GridSource`], and deduplicates channels and
//! events into a [`GuideDocument`].

pub mod assembler;
pub mod document;
pub mod episode;
pub mod planner;
pub mod programme;
pub mod registry;

pub use assembler::{
    AssemblerSettings, AssemblyPhase, BuildReport, FailedCell, FailurePolicy, GuideAssembler,
};
pub use document::{GuideDocument, XmlElement};
pub use episode::{EpisodeEncoder, EpisodeNumbers};
pub use planner::TimeWindowPlanner;
pub use programme::ProgrammeBuilder;
pub use registry::{ChannelRegistry, EventRegistry, FavoritesFilter};
