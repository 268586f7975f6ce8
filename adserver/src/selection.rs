use std::cmp::Ordering;

use primitives::{Campaign, Placement};

/// Compares the spend ratios (`spent / budget`) of two campaigns by cross
/// multiplying, so the ranking is exact and never touches floating point.
fn spend_ratio(a: &Campaign, b: &Campaign) -> Ordering {
    let lhs = a.spent.to_u64() as u128 * b.budget.to_u64() as u128;
    let rhs = b.spent.to_u64() as u128 * a.budget.to_u64() as u128;

    lhs.cmp(&rhs)
}

/// Picks the winning placement out of the eligible candidates.
///
/// Higher priority always wins. Within a priority the campaign with the
/// lowest spend ratio is preferred, which paces budget consumption across
/// campaigns of equal importance. Ties fall back to the campaign id, so a
/// given store state always yields the same winner.
pub fn select_placement(
    mut candidates: Vec<(Placement, Campaign)>,
) -> Option<(Placement, Campaign)> {
    candidates.sort_by(|(_, a), (_, b)| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| spend_ratio(a, b))
            .then_with(|| a.id.cmp(&b.id))
    });

    candidates.into_iter().next()
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use primitives::{
        test_util::{DUMMY_CAMPAIGN, DUMMY_PLACEMENT},
        CampaignId, UnifiedNum,
    };

    fn candidate(id: &str, priority: i32, spent: u64, budget: u64) -> (Placement, Campaign) {
        let mut campaign = DUMMY_CAMPAIGN.clone();
        campaign.id = id.parse::<CampaignId>().expect("Should parse");
        campaign.priority = priority;
        campaign.spent = UnifiedNum::from_whole(spent);
        campaign.budget = UnifiedNum::from_whole(budget);

        let mut placement = DUMMY_PLACEMENT.clone();
        placement.campaign_id = campaign.id;

        (placement, campaign)
    }

    #[test]
    fn higher_priority_always_wins() {
        let winner = select_placement(vec![
            candidate("0x00000000000000000000000000000001", 1, 0, 100),
            candidate("0x00000000000000000000000000000002", 5, 99, 100),
        ])
        .expect("Should select");

        assert_eq!(
            "0x00000000000000000000000000000002",
            winner.1.id.to_string(),
            "An almost exhausted high priority campaign still beats a fresh low priority one"
        );
    }

    #[test]
    fn lowest_spend_ratio_wins_within_a_priority() {
        // 50/100 = 0.5 vs 20/50 = 0.4
        let winner = select_placement(vec![
            candidate("0x00000000000000000000000000000001", 1, 50, 100),
            candidate("0x00000000000000000000000000000002", 1, 20, 50),
        ])
        .expect("Should select");

        assert_eq!("0x00000000000000000000000000000002", winner.1.id.to_string());
    }

    #[test]
    fn ties_break_deterministically_on_the_campaign_id() {
        let candidates = vec![
            candidate("0x00000000000000000000000000000002", 1, 10, 100),
            candidate("0x00000000000000000000000000000001", 1, 20, 200),
        ];

        let winner = select_placement(candidates.clone()).expect("Should select");
        assert_eq!("0x00000000000000000000000000000001", winner.1.id.to_string());

        let rerun = select_placement(candidates).expect("Should select");
        assert_eq!(winner.1.id, rerun.1.id);
    }

    #[test]
    fn no_candidates_is_an_unfilled_request() {
        assert!(select_placement(vec![]).is_none());
    }
}
