//! Shared types and configuration for the ReplyRadar engine.

mod app_config;
mod config;
mod schedule;
mod types;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use schedule::{ScheduleExpr, ScheduleParseError};
pub use types::{DiscoveryType, DiscoveryTypeParseError, OpportunityStatus, StatusParseError};

use thiserror::Error;

/// Errors raised while loading application configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    MissingEnvVar(String),
    #[error("environment variable {var} is invalid: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
