use std::time::Duration;

use thiserror::Error;

/// Errors raised by platform adapters.
///
/// All three variants mean the same thing to the discovery engine — the run
/// failed and the schedule cursor must not advance — but they are recorded
/// with different messages and matter to operators: rate limits and network
/// errors clear themselves on the next scheduled attempt, authentication
/// failures need a credential fix.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The platform throttled us. `retry_after` is a hint, when the
    /// platform provided one.
    #[error("rate limited by platform{}", retry_after_suffix(*.retry_after))]
    RateLimited { retry_after: Option<Duration> },

    /// Credentials rejected or expired.
    #[error("platform authentication failed: {0}")]
    Authentication(String),

    /// Any other platform or transport failure.
    #[error("platform API error: {0}")]
    Api(String),
}

fn retry_after_suffix(retry_after: Option<Duration>) -> String {
    match retry_after {
        Some(d) => format!(" (retry after {}s)", d.as_secs()),
        None => String::new(),
    }
}
