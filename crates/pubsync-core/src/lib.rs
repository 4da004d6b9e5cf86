//! pubsync core: PubMed ingest, dedup against the curated corpus, human
//! review gate, deterministic corpus regeneration.

pub mod classify;
pub mod codec;
pub mod config;
pub mod doi;
pub mod error;
pub mod http;
pub mod matcher;
pub mod merge;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod review;
pub mod sources;

pub use config::{PipelineConfig, TeamMember};
pub use error::{Result, SyncError};
pub use model::{Approval, Candidate, CandidateSource, ProposedAction, Publication};
