use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The slice of an account the adapter needs to address platform requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRef {
    pub platform: String,
    /// The account's handle on the platform (without any `@` prefix).
    pub handle: String,
}

/// Knobs for a search call.
#[derive(Debug, Clone, Copy)]
pub struct SearchOptions {
    pub max_results: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { max_results: 50 }
    }
}

/// A post as returned by the platform, before scoring or persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPost {
    /// Platform-native post identifier; unique per platform.
    pub post_id: String,
    pub text: String,
    /// When the post was created on the platform, not when we saw it.
    pub created_at: DateTime<Utc>,
    pub like_count: i32,
    pub repost_count: i32,
    pub reply_count: i32,
    pub author: RawAuthor,
}

/// A platform user profile as returned by the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawAuthor {
    pub platform_user_id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub follower_count: i32,
}
