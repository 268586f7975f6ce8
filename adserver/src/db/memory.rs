use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use num_traits::CheckedAdd;

use primitives::{
    Campaign, CampaignId, EventSubmission, ImpressionEvent, Placement, Position, Status, Tier,
    UnifiedNum,
};

use super::{AdStore, Error, SkipReason, Submission, SummaryRow};

#[derive(Debug, Default)]
struct Inner {
    campaigns: HashMap<CampaignId, Campaign>,
    placements: Vec<Placement>,
    events: Vec<ImpressionEvent>,
    accounts: HashMap<String, Tier>,
}

/// In-memory [`AdStore`] used by the engine tests.
///
/// `submit_event` holds the write lock for the whole read-clamp-write
/// sequence, which gives it the same atomicity as the Serializable
/// transaction of the Postgres store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_campaign(&self, campaign: Campaign) {
        let mut inner = self.inner.write().expect("not poisoned");
        inner.campaigns.insert(campaign.id, campaign);
    }

    pub fn insert_placement(&self, placement: Placement) {
        let mut inner = self.inner.write().expect("not poisoned");
        inner.placements.push(placement);
    }

    pub fn insert_account(&self, user_id: &str, tier: Tier) {
        let mut inner = self.inner.write().expect("not poisoned");
        inner.accounts.insert(user_id.to_string(), tier);
    }

    /// Seeds a raw ledger row, the way external backfill tooling would.
    pub fn push_event(&self, event: ImpressionEvent) {
        let mut inner = self.inner.write().expect("not poisoned");
        inner.events.push(event);
    }

    /// The current state of a campaign, for assertions.
    pub fn campaign_snapshot(&self, id: CampaignId) -> Option<Campaign> {
        let inner = self.inner.read().expect("not poisoned");
        inner.campaigns.get(&id).cloned()
    }

    /// All ledger rows of a campaign, in insertion order.
    pub fn events_of(&self, id: CampaignId) -> Vec<ImpressionEvent> {
        let inner = self.inner.read().expect("not poisoned");
        inner
            .events
            .iter()
            .filter(|event| event.campaign_id == id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AdStore for MemoryStore {
    async fn campaign(&self, id: CampaignId) -> Result<Option<Campaign>, Error> {
        let inner = self
            .inner
            .read()
            .map_err(|_| Error::Lock("reading a campaign"))?;

        Ok(inner.campaigns.get(&id).cloned())
    }

    async fn active_placements(
        &self,
        position: Position,
    ) -> Result<Vec<(Placement, Campaign)>, Error> {
        let inner = self
            .inner
            .read()
            .map_err(|_| Error::Lock("listing placements"))?;

        let pairs = inner
            .placements
            .iter()
            .filter(|placement| placement.is_active && placement.position == position)
            .filter_map(|placement| {
                inner
                    .campaigns
                    .get(&placement.campaign_id)
                    .map(|campaign| (placement.clone(), campaign.clone()))
            })
            .collect();

        Ok(pairs)
    }

    async fn revenue_since(
        &self,
        campaign: CampaignId,
        since: DateTime<Utc>,
    ) -> Result<UnifiedNum, Error> {
        let inner = self
            .inner
            .read()
            .map_err(|_| Error::Lock("summing revenue"))?;

        Ok(inner
            .events
            .iter()
            .filter(|event| event.campaign_id == campaign && event.created >= since)
            .map(|event| event.revenue)
            .sum())
    }

    async fn submit_event(
        &self,
        submission: &EventSubmission,
        nominal: UnifiedNum,
    ) -> Result<Submission, Error> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| Error::Lock("submitting an event"))?;

        let campaign = match inner.campaigns.get_mut(&submission.campaign_id) {
            Some(campaign) => campaign,
            None => return Ok(Submission::Skipped(SkipReason::NotFound)),
        };

        if campaign.status != Status::Active {
            return Ok(Submission::Skipped(SkipReason::NotActive(campaign.status)));
        }

        let charged = campaign.clamp_charge(nominal);
        let new_spent = campaign
            .spent
            .checked_add(&charged)
            .ok_or(Error::Calculation)?;
        let completed = new_spent >= campaign.budget;

        campaign.spent = new_spent;
        if completed {
            campaign.status = Status::Completed;
        }

        let event = ImpressionEvent::new(submission, charged, Utc::now());
        inner.events.push(event);

        Ok(Submission::Applied { charged, completed })
    }

    async fn events_summary(&self, campaign: CampaignId) -> Result<Vec<SummaryRow>, Error> {
        let inner = self
            .inner
            .read()
            .map_err(|_| Error::Lock("aggregating events"))?;

        let mut grouped: HashMap<(primitives::EventType, Option<String>), (u64, UnifiedNum)> =
            HashMap::new();

        for event in inner
            .events
            .iter()
            .filter(|event| event.campaign_id == campaign)
        {
            let entry = grouped
                .entry((event.event_type, event.context.module.clone()))
                .or_default();
            entry.0 += 1;
            entry.1 += event.revenue;
        }

        Ok(grouped
            .into_iter()
            .map(|((event_type, module), (count, revenue))| SummaryRow {
                event_type,
                module,
                count,
                revenue,
            })
            .collect())
    }

    async fn tier_of(&self, user_id: &str) -> Result<Option<Tier>, Error> {
        let inner = self
            .inner
            .read()
            .map_err(|_| Error::Lock("resolving a tier"))?;

        Ok(inner.accounts.get(user_id).cloned())
    }
}
