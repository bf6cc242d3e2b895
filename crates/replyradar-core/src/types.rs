//! Domain enums shared across the workspace.
//!
//! Both enums are persisted as lowercase text columns, so `as_str` and
//! `FromStr` are the canonical mapping in both directions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// How an opportunity was found.
///
/// Immutable provenance: set at discovery time and never rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryType {
    /// Replies to the account's own posts.
    Replies,
    /// Keyword search over the account's profile keywords.
    Search,
}

impl DiscoveryType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DiscoveryType::Replies => "replies",
            DiscoveryType::Search => "search",
        }
    }
}

impl fmt::Display for DiscoveryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("invalid discovery type: {0}")]
pub struct DiscoveryTypeParseError(pub String);

impl FromStr for DiscoveryType {
    type Err = DiscoveryTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "replies" => Ok(DiscoveryType::Replies),
            "search" => Ok(DiscoveryType::Search),
            other => Err(DiscoveryTypeParseError(other.to_string())),
        }
    }
}

/// Lifecycle status of an opportunity.
///
/// `pending` is the only non-terminal status; every transition out of it is
/// final. `responded` and `dismissed` come from user action, `expired` from
/// the cleanup pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityStatus {
    Pending,
    Responded,
    Dismissed,
    Expired,
}

impl OpportunityStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OpportunityStatus::Pending => "pending",
            OpportunityStatus::Responded => "responded",
            OpportunityStatus::Dismissed => "dismissed",
            OpportunityStatus::Expired => "expired",
        }
    }

    /// Whether no further transition is allowed out of this status.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, OpportunityStatus::Pending)
    }
}

impl fmt::Display for OpportunityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("invalid status: {0}")]
pub struct StatusParseError(pub String);

impl FromStr for OpportunityStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OpportunityStatus::Pending),
            "responded" => Ok(OpportunityStatus::Responded),
            "dismissed" => Ok(OpportunityStatus::Dismissed),
            "expired" => Ok(OpportunityStatus::Expired),
            other => Err(StatusParseError(other.to_string())),
        }
    }
}
