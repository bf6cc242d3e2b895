//! Opportunity scoring.
//!
//! Pure functions: a post's age plus its author/engagement counts go in, an
//! [`OpportunityScore`] comes out. Recency decays exponentially with a
//! 30-minute constant; impact is a log-scaled blend of follower count,
//! likes, and reposts, so reach shows diminishing returns (10 → 100
//! followers moves the score more than 100k → 1M). The recency/impact
//! weights come from configuration, not from constants here — they have
//! been retuned before (0.6/0.4 → 0.7/0.3) and will be again.

/// Exponential decay constant for recency, in minutes. A fresh post scores
/// 100, a 30-minute-old post ~37, a two-hour-old post ~2.
const RECENCY_DECAY_MINUTES: f64 = 30.0;

/// log10 ceiling for follower count: 10^7 (10M) followers saturates the
/// follower term.
const FOLLOWER_LOG_CEILING: f64 = 7.0;

/// log10 ceiling for likes and reposts: 10^4 saturates either term.
const ENGAGEMENT_LOG_CEILING: f64 = 4.0;

// Internal mix of the impact components. Followers dominate: an author's
// reach says more about an opportunity than early engagement counts do.
const IMPACT_FOLLOWER_SHARE: f64 = 0.6;
const IMPACT_LIKE_SHARE: f64 = 0.25;
const IMPACT_REPOST_SHARE: f64 = 0.15;

/// The tunable recency/impact weight pair, sourced from configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub recency: f64,
    pub impact: f64,
}

impl ScoreWeights {
    #[must_use]
    pub fn new(recency: f64, impact: f64) -> Self {
        Self { recency, impact }
    }

    #[must_use]
    pub fn from_app_config(config: &replyradar_core::AppConfig) -> Self {
        Self {
            recency: config.score_weight_recency,
            impact: config.score_weight_impact,
        }
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            recency: 0.7,
            impact: 0.3,
        }
    }
}

/// The computed score of a post.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpportunityScore {
    /// 0–100, decaying with post age.
    pub recency: f64,
    /// 0–100, log-scaled author reach and engagement.
    pub impact: f64,
    /// `round(w_r · recency + w_i · impact)`, clamped to 0–100.
    pub total: i32,
}

impl OpportunityScore {
    /// Human-readable breakdown for logs, e.g.
    /// `"41 = 0.7×37 recency + 0.3×46 impact"`. Derived on demand, never
    /// persisted.
    #[must_use]
    pub fn explanation(&self, weights: &ScoreWeights) -> String {
        format!(
            "{} = {}×{:.0} recency + {}×{:.0} impact",
            self.total, weights.recency, self.recency, weights.impact, self.impact
        )
    }
}

/// Score a post from its age and metrics.
///
/// Negative inputs clamp to zero; a post with zero engagement scores on the
/// author's reach alone (the `+1` inside each log10 keeps the math defined
/// everywhere).
#[must_use]
pub fn score_post(
    age_minutes: f64,
    follower_count: i64,
    like_count: i64,
    repost_count: i64,
    weights: &ScoreWeights,
) -> OpportunityScore {
    let recency = recency_score(age_minutes);
    let impact = impact_score(follower_count, like_count, repost_count);
    let total = weights
        .recency
        .mul_add(recency, weights.impact * impact)
        .round()
        .clamp(0.0, 100.0) as i32;

    OpportunityScore {
        recency,
        impact,
        total,
    }
}

fn recency_score(age_minutes: f64) -> f64 {
    let age = age_minutes.max(0.0);
    (100.0 * (-age / RECENCY_DECAY_MINUTES).exp()).clamp(0.0, 100.0)
}

fn impact_score(follower_count: i64, like_count: i64, repost_count: i64) -> f64 {
    let follower_term = log_ratio(follower_count, FOLLOWER_LOG_CEILING);
    let like_term = log_ratio(like_count, ENGAGEMENT_LOG_CEILING);
    let repost_term = log_ratio(repost_count, ENGAGEMENT_LOG_CEILING);

    let blended = IMPACT_FOLLOWER_SHARE * follower_term
        + IMPACT_LIKE_SHARE * like_term
        + IMPACT_REPOST_SHARE * repost_term;

    (100.0 * blended).clamp(0.0, 100.0)
}

/// `min(log10(count + 1) / ceiling, 1)` with negative counts clamped to 0.
fn log_ratio(count: i64, ceiling: f64) -> f64 {
    let count = count.max(0) as f64;
    ((count + 1.0).log10() / ceiling).min(1.0)
}
