use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};

use primitives::{Campaign, CampaignId, Placement, Status};

use crate::db::{AdStore, Error};

/// Midnight UTC of the day `now` falls in, the start of the daily budget
/// window.
pub fn day_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(
        &now.date_naive()
            .and_hms_opt(0, 0, 0)
            .expect("midnight is a valid time"),
    )
}

fn campaign_eligible(campaign: &Campaign, module: Option<&str>, now: DateTime<Utc>) -> bool {
    campaign.status == Status::Active
        && campaign.in_window(now)
        && !campaign.budget_exhausted()
        && campaign.targets_module(module)
}

/// Filters the serving candidates down to the campaigns allowed to serve
/// right now.
///
/// A campaign serves only while `Active`, inside its date window, with
/// budget left, matching the module context and below its daily budget for
/// the current UTC day. The daily check is one aggregation per distinct
/// campaign; several placements of the same campaign share the result.
pub async fn eligible_candidates<S: AdStore>(
    store: &S,
    candidates: Vec<(Placement, Campaign)>,
    module: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Vec<(Placement, Campaign)>, Error> {
    let since = day_start(now);
    let mut daily_allowance: HashMap<CampaignId, bool> = HashMap::new();

    let mut eligible = Vec::with_capacity(candidates.len());
    for (placement, campaign) in candidates {
        if !campaign_eligible(&campaign, module, now) {
            continue;
        }

        let within_daily = match daily_allowance.get(&campaign.id) {
            Some(within) => *within,
            None => {
                let within = match campaign.daily_budget {
                    Some(daily_budget) => {
                        store.revenue_since(campaign.id, since).await? < daily_budget
                    }
                    None => true,
                };
                daily_allowance.insert(campaign.id, within);

                within
            }
        };

        if within_daily {
            eligible.push((placement, campaign));
        }
    }

    Ok(eligible)
}
