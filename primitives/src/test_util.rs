use chrono::{TimeZone, Utc};
use once_cell::sync::Lazy;

use crate::{
    Active, Advertiser, Campaign, Feature, Format, Placement, Position, Status, Tier, UnifiedNum,
};

pub use crate::util::logging::discard_logger;

/// A `$500` budget campaign with a `$5` CPM and a `$0.50` CPC, active
/// through the end of 2100 so that date-window tests have a stable "now".
pub static DUMMY_CAMPAIGN: Lazy<Campaign> = Lazy::new(|| Campaign {
    id: "0x7a3b9c0e25d24a8f9b1a4c5d6e7f8091"
        .parse()
        .expect("Should parse"),
    advertiser: Advertiser {
        name: "Stellar Dynamics".to_string(),
        logo_url: Some(
            "https://cdn.example.com/stellar-dynamics.png"
                .parse()
                .expect("Should parse"),
        ),
    },
    status: Status::Active,
    budget: UnifiedNum::from_whole(500),
    spent: UnifiedNum::ZERO,
    daily_budget: None,
    cpm_rate: UnifiedNum::from_whole(5),
    cpc_rate: Some(UnifiedNum::from_u64(50_000_000)),
    priority: 1,
    target_modules: vec![],
    created: Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap(),
    active: Active {
        from: Some(Utc.with_ymd_and_hms(2021, 2, 1, 0, 0, 0).unwrap()),
        to: Utc.with_ymd_and_hms(2100, 12, 31, 0, 0, 0).unwrap(),
    },
});

pub static DUMMY_PLACEMENT: Lazy<Placement> = Lazy::new(|| Placement {
    id: "0x16f6ad657efa44c9a8f2a591a5b8a2b5"
        .parse()
        .expect("Should parse"),
    campaign_id: DUMMY_CAMPAIGN.id,
    position: Position::TopBanner,
    format: Format::NativeCard,
    title: "Launch services for smallsats".to_string(),
    description: Some("Rideshare slots available every quarter".to_string()),
    image_url: Some(
        "https://cdn.example.com/creative.png"
            .parse()
            .expect("Should parse"),
    ),
    link_url: "https://stellar-dynamics.example.com/launch"
        .parse()
        .expect("Should parse"),
    cta_text: Some("Book a slot".to_string()),
    is_active: true,
    created: Utc.with_ymd_and_hms(2021, 2, 1, 0, 0, 0).unwrap(),
});

/// The default tier: sees ads.
pub static FREE_TIER: Lazy<Tier> = Lazy::new(|| Tier {
    name: "free".to_string(),
    features: Default::default(),
});

/// A paying tier whose feature set includes [`Feature::AdFree`].
pub static PRO_TIER: Lazy<Tier> = Lazy::new(|| Tier {
    name: "pro".to_string(),
    features: [Feature::AdFree, Feature::ApiAccess].into_iter().collect(),
});
