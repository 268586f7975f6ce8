#![deny(rust_2018_idioms)]
#![deny(clippy::all)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod ad;
pub mod campaign;
pub mod event;
pub mod placement;
pub mod tier;
pub mod unified_num;
pub mod util {
    pub mod logging;
}

#[cfg(any(test, feature = "test-util"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-util")))]
pub mod test_util;

pub use self::ad::{AnalyticsReport, EventStats, ServedAd, SuccessResponse};
pub use self::campaign::{Active, Advertiser, Campaign, CampaignId, Status};
pub use self::event::{EventContext, EventId, EventSubmission, EventType, ImpressionEvent};
pub use self::placement::{Format, Placement, PlacementId, Position};
pub use self::tier::{Feature, Tier};
pub use self::unified_num::UnifiedNum;
