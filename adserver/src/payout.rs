use primitives::{Campaign, EventType, UnifiedNum};

/// The nominal price of a single event, before the budget clamp.
///
/// Impressions are priced at a thousandth of the CPM rate, clicks at the
/// CPC rate (free when the campaign has none) and conversions are tracked
/// for reporting only, so they are always free.
pub fn get_payout(campaign: &Campaign, event_type: EventType) -> UnifiedNum {
    match event_type {
        EventType::Impression => campaign.cpm_rate.div_floor(1000),
        EventType::Click => campaign.cpc_rate.unwrap_or_default(),
        EventType::Conversion => UnifiedNum::ZERO,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use primitives::test_util::DUMMY_CAMPAIGN;

    #[test]
    fn impression_payout_is_a_thousandth_of_the_cpm() {
        // $5 CPM
        let campaign = DUMMY_CAMPAIGN.clone();

        assert_eq!(
            UnifiedNum::from_u64(500_000),
            get_payout(&campaign, EventType::Impression),
            "$5 CPM should price a single impression at $0.005"
        );
    }

    #[test]
    fn click_payout_uses_the_cpc_rate() {
        let mut campaign = DUMMY_CAMPAIGN.clone();

        assert_eq!(
            UnifiedNum::from_u64(50_000_000),
            get_payout(&campaign, EventType::Click)
        );

        campaign.cpc_rate = None;
        assert_eq!(
            UnifiedNum::ZERO,
            get_payout(&campaign, EventType::Click),
            "Clicks are free without a CPC rate"
        );
    }

    #[test]
    fn conversions_are_never_billed() {
        assert_eq!(
            UnifiedNum::ZERO,
            get_payout(&DUMMY_CAMPAIGN, EventType::Conversion)
        );
    }
}
