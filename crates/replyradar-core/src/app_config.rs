use std::net::SocketAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Process-wide configuration, read once at startup from environment
/// variables. Engine tunables (score weights, TTL, cleanup cadence) live
/// here rather than as literals in the engine.
#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    /// Opportunities scoring below this total are never persisted.
    pub min_score_threshold: i32,
    /// Pending opportunities expire this many seconds after discovery.
    pub opportunity_ttl_secs: u64,
    /// First-run lookback when a schedule has no last_run_at yet.
    pub fallback_lookback_secs: u64,
    /// Hard cap on any discovery window, however stale last_run_at is.
    pub max_lookback_secs: u64,
    /// Dismissed opportunities survive this long past their last status
    /// change before hard deletion.
    pub dismissed_retention_secs: u64,
    pub cleanup_interval_secs: u64,
    pub score_weight_recency: f64,
    pub score_weight_impact: f64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("min_score_threshold", &self.min_score_threshold)
            .field("opportunity_ttl_secs", &self.opportunity_ttl_secs)
            .field("fallback_lookback_secs", &self.fallback_lookback_secs)
            .field("max_lookback_secs", &self.max_lookback_secs)
            .field("dismissed_retention_secs", &self.dismissed_retention_secs)
            .field("cleanup_interval_secs", &self.cleanup_interval_secs)
            .field("score_weight_recency", &self.score_weight_recency)
            .field("score_weight_impact", &self.score_weight_impact)
            .finish()
    }
}
