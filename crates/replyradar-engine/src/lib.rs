//! Opportunity discovery and lifecycle engine.
//!
//! Four pieces, composed by the server binary:
//! - [`scoring`] ranks posts by recency and reach (pure, no I/O);
//! - [`discovery`] runs one fetch → score → filter → persist pass for one
//!   (account, discovery type) pair;
//! - [`scheduler`] owns one recurring job per enabled schedule;
//! - [`cleanup`] expires and hard-deletes opportunities on its own timer.
//!
//! The Postgres store is the only thing these share; there is no in-memory
//! state between them beyond read-only configuration.

pub mod cleanup;
pub mod discovery;
pub mod scheduler;
pub mod scoring;

pub use cleanup::{CleanupConfig, CleanupService, CleanupSummary};
pub use discovery::{DiscoveryConfig, DiscoveryError, DiscoveryService};
pub use scheduler::{Scheduler, SchedulerError};
pub use scoring::{score_post, OpportunityScore, ScoreWeights};
