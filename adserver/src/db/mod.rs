use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use primitives::{
    Campaign, CampaignId, EventSubmission, EventType, Placement, Position, Status, Tier, UnifiedNum,
};

pub mod postgres;

#[cfg(any(test, feature = "test-util"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-util")))]
pub mod memory;

#[derive(Debug, Error)]
pub enum Error {
    #[error("DB Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),
    #[error("Postgres error: {0}")]
    Backend(#[from] tokio_postgres::Error),
    #[error("Store lock poisoned while {0}")]
    Lock(&'static str),
    #[error("Error while performing spend calculations")]
    Calculation,
}

/// Why a submitted event was dropped without a ledger entry or a charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The campaign no longer exists.
    NotFound,
    /// The campaign was paused/completed between selection and reporting.
    NotActive(Status),
}

/// The outcome of an atomic event submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Applied {
        /// The amount actually charged, after clamping against the
        /// remaining budget.
        charged: UnifiedNum,
        /// Whether this submission exhausted the budget and auto-completed
        /// the campaign.
        completed: bool,
    },
    Skipped(SkipReason),
}

/// One row of the per-campaign events aggregation, grouped by event type
/// and module context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRow {
    pub event_type: EventType,
    pub module: Option<String>,
    pub count: u64,
    pub revenue: UnifiedNum,
}

/// The typed store interface of the ad engine.
///
/// Only the query shapes the engine needs are exposed; everything else
/// about the relational schema stays behind the implementations. The
/// in-memory implementation backs the engine tests.
#[async_trait]
pub trait AdStore: Send + Sync {
    /// Fresh lookup of a single campaign.
    async fn campaign(&self, id: CampaignId) -> Result<Option<Campaign>, Error>;

    /// All active placements for a position, paired with their owning
    /// campaign. Campaign-level eligibility is applied by the caller.
    async fn active_placements(
        &self,
        position: Position,
    ) -> Result<Vec<(Placement, Campaign)>, Error>;

    /// Sum of event revenue for a campaign since `since` (used for the
    /// daily budget window).
    async fn revenue_since(
        &self,
        campaign: CampaignId,
        since: DateTime<Utc>,
    ) -> Result<UnifiedNum, Error>;

    /// Atomically writes the ledger row and the spend it causes.
    ///
    /// Implementations must re-read the campaign, clamp `nominal` against
    /// the remaining budget and apply both writes inside a single
    /// transaction boundary, auto-completing the campaign when the budget
    /// is exhausted. This is the enforcement point of the overspend
    /// invariant.
    async fn submit_event(
        &self,
        submission: &EventSubmission,
        nominal: UnifiedNum,
    ) -> Result<Submission, Error>;

    /// Aggregation over the whole event ledger of one campaign.
    async fn events_summary(&self, campaign: CampaignId) -> Result<Vec<SummaryRow>, Error>;

    /// The persisted subscription tier of a user, if any.
    async fn tier_of(&self, user_id: &str) -> Result<Option<Tier>, Error>;
}
