use std::collections::BTreeMap;

use primitives::{AnalyticsReport, CampaignId, EventStats, EventType};

use crate::db::{AdStore, Error};

/// The bucket for events recorded without a module context.
const UNKNOWN_MODULE: &str = "unknown";

/// Builds the per-campaign report out of the event ledger aggregation.
///
/// Returns `None` for a campaign that does not exist. The report is always
/// derived from the ledger and the current campaign row, nothing is cached
/// or precomputed.
pub async fn campaign_analytics<S: AdStore>(
    store: &S,
    campaign_id: CampaignId,
) -> Result<Option<AnalyticsReport>, Error> {
    let campaign = match store.campaign(campaign_id).await? {
        Some(campaign) => campaign,
        None => return Ok(None),
    };

    let summary = store.events_summary(campaign_id).await?;

    let mut impressions = EventStats::default();
    let mut clicks = EventStats::default();
    let mut conversions = 0;
    let mut by_module: BTreeMap<String, EventStats> = BTreeMap::new();

    for row in summary {
        match row.event_type {
            EventType::Impression => {
                impressions.count += row.count;
                impressions.revenue += row.revenue;
            }
            EventType::Click => {
                clicks.count += row.count;
                clicks.revenue += row.revenue;
            }
            EventType::Conversion => conversions += row.count,
        }

        let module = by_module
            .entry(row.module.unwrap_or_else(|| UNKNOWN_MODULE.to_string()))
            .or_default();
        module.count += row.count;
        module.revenue += row.revenue;
    }

    let ctr = if impressions.count > 0 {
        clicks.count as f64 / impressions.count as f64 * 100.0
    } else {
        0.0
    };
    let budget_utilization = if !campaign.budget.is_zero() {
        campaign.spent.to_f64() / campaign.budget.to_f64() * 100.0
    } else {
        0.0
    };

    Ok(Some(AnalyticsReport {
        campaign_id,
        impressions,
        clicks,
        conversions,
        ctr,
        budget: campaign.budget,
        spent: campaign.spent,
        budget_remaining: campaign.remaining(),
        budget_utilization,
        by_module,
    }))
}
