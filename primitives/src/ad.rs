use crate::{Campaign, CampaignId, Format, Placement, PlacementId, Position, UnifiedNum};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// The ad returned to a caller for rendering.
///
/// Carries everything the front end needs so that no follow-up campaign or
/// placement lookup is required on the render path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServedAd {
    pub placement_id: PlacementId,
    pub campaign_id: CampaignId,
    pub position: Position,
    pub format: Format,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<Url>,
    pub link_url: Url,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cta_text: Option<String>,
    pub advertiser_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advertiser_logo: Option<Url>,
}

impl ServedAd {
    pub fn from_parts(placement: Placement, campaign: &Campaign) -> Self {
        Self {
            placement_id: placement.id,
            campaign_id: campaign.id,
            position: placement.position,
            format: placement.format,
            title: placement.title,
            description: placement.description,
            image_url: placement.image_url,
            link_url: placement.link_url,
            cta_text: placement.cta_text,
            advertiser_name: campaign.advertiser.name.clone(),
            advertiser_logo: campaign.advertiser.logo_url.clone(),
        }
    }
}

/// Count & revenue pair for one class of events.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EventStats {
    pub count: u64,
    pub revenue: UnifiedNum,
}

/// The aggregate report of the analytics read path; pure aggregation over
/// the event ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub campaign_id: CampaignId,
    pub impressions: EventStats,
    pub clicks: EventStats,
    pub conversions: u64,
    /// Click-through rate in percent; `0` when there are no impressions.
    pub ctr: f64,
    pub budget: UnifiedNum,
    pub spent: UnifiedNum,
    pub budget_remaining: UnifiedNum,
    /// `spent / budget` in percent; `0` for a zero budget.
    pub budget_utilization: f64,
    /// Per-module breakdown; events recorded without a module context are
    /// aggregated under the `"unknown"` key.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub by_module: BTreeMap<String, EventStats>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct SuccessResponse {
    pub success: bool,
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_util::{DUMMY_CAMPAIGN, DUMMY_PLACEMENT};
    use pretty_assertions::assert_eq;

    #[test]
    fn served_ad_carries_the_creative_and_advertiser() {
        let served = ServedAd::from_parts(DUMMY_PLACEMENT.clone(), &DUMMY_CAMPAIGN);

        assert_eq!(DUMMY_PLACEMENT.id, served.placement_id);
        assert_eq!(DUMMY_CAMPAIGN.id, served.campaign_id);
        assert_eq!(DUMMY_CAMPAIGN.advertiser.name, served.advertiser_name);

        let value = serde_json::to_value(&served).expect("Should serialize");
        assert_eq!(
            serde_json::to_value(DUMMY_PLACEMENT.position).expect("Should serialize"),
            value["position"]
        );
        assert!(value.get("linkUrl").is_some());
    }
}
