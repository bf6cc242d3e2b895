//! Platform adapter boundary.
//!
//! The discovery engine is platform-agnostic: everything it needs from a
//! social platform goes through [`PlatformAdapter`]. Concrete adapters
//! (the HTTP clients that actually talk to a platform API) live outside
//! this workspace; this crate defines only the contract they implement
//! and the error taxonomy the engine consumes.

mod error;
mod types;

pub use error::PlatformError;
pub use types::{AccountRef, RawAuthor, RawPost, SearchOptions};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Read-only client for one social platform.
///
/// Implementations own their request timeouts; the engine relies on those
/// rather than imposing its own deadline on a discovery run.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    /// Replies to the account's own posts since the given instant.
    async fn fetch_replies(
        &self,
        account: &AccountRef,
        since: DateTime<Utc>,
    ) -> Result<Vec<RawPost>, PlatformError>;

    /// Keyword search across the platform.
    ///
    /// Implementations must deduplicate across their internal per-keyword
    /// queries; callers may assume each post appears at most once.
    async fn search_posts(
        &self,
        account: &AccountRef,
        keywords: &[String],
        options: &SearchOptions,
    ) -> Result<Vec<RawPost>, PlatformError>;

    /// Current profile for a platform user.
    async fn get_author(&self, platform_user_id: &str) -> Result<RawAuthor, PlatformError>;
}

/// Adapter that always returns empty results.
///
/// Lets the server and CLI run end-to-end when no platform client is
/// configured; every discovery run is a successful no-op.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAdapter;

#[async_trait]
impl PlatformAdapter for NoopAdapter {
    async fn fetch_replies(
        &self,
        _account: &AccountRef,
        _since: DateTime<Utc>,
    ) -> Result<Vec<RawPost>, PlatformError> {
        Ok(Vec::new())
    }

    async fn search_posts(
        &self,
        _account: &AccountRef,
        _keywords: &[String],
        _options: &SearchOptions,
    ) -> Result<Vec<RawPost>, PlatformError> {
        Ok(Vec::new())
    }

    async fn get_author(&self, platform_user_id: &str) -> Result<RawAuthor, PlatformError> {
        Err(PlatformError::Api(format!(
            "no platform client configured; cannot resolve author {platform_user_id}"
        )))
    }
}
