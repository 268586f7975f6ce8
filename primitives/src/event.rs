use crate::{CampaignId, PlacementId, UnifiedNum};

use chrono::{serde::ts_milliseconds, DateTime, Utc};
use parse_display::{Display, FromStr};
use serde::{Deserialize, Serialize};

pub use self::event_id::EventId;

/// The kind of serve-related event reported back by a caller.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, FromStr)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    #[display("IMPRESSION")]
    Impression,
    #[display("CLICK")]
    Click,
    /// Tracked for reporting only, never billed.
    #[display("CONVERSION")]
    Conversion,
}

pub const IMPRESSION: EventType = EventType::Impression;
pub const CLICK: EventType = EventType::Click;
pub const CONVERSION: EventType = EventType::Conversion;

mod event_id {
    use serde::{Deserialize, Serialize};
    use std::fmt;
    use uuid::Uuid;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct EventId(Uuid);

    impl EventId {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn as_uuid(&self) -> &Uuid {
            &self.0
        }
    }

    impl Default for EventId {
        fn default() -> Self {
            Self(Uuid::new_v4())
        }
    }

    impl fmt::Display for EventId {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            self.0.fmt(f)
        }
    }
}

/// Optional request context attached to an event.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EventContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// The module (e.g. `news`, `marketplace`) the ad was rendered in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// A caller-reported event, before it is priced and written to the ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EventSubmission {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub campaign_id: CampaignId,
    pub placement_id: PlacementId,
    #[serde(flatten)]
    pub context: EventContext,
}

/// An immutable row of the append-only event ledger.
///
/// All spend is derived and reconciled from these rows; once written they
/// are never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImpressionEvent {
    pub id: EventId,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub campaign_id: CampaignId,
    pub placement_id: PlacementId,
    #[serde(flatten)]
    pub context: EventContext,
    /// The amount actually charged for this single event, after clamping.
    pub revenue: UnifiedNum,
    #[serde(with = "ts_milliseconds")]
    pub created: DateTime<Utc>,
}

impl ImpressionEvent {
    /// Builds the ledger row for a submission priced at `revenue`.
    pub fn new(submission: &EventSubmission, revenue: UnifiedNum, created: DateTime<Utc>) -> Self {
        Self {
            id: EventId::new(),
            event_type: submission.event_type,
            campaign_id: submission.campaign_id,
            placement_id: submission.placement_id,
            context: submission.context.clone(),
            revenue,
            created,
        }
    }
}

#[cfg(feature = "postgres")]
mod postgres {
    use super::{EventId, EventType};
    use bytes::BytesMut;
    use postgres_types::{accepts, to_sql_checked, FromSql, IsNull, ToSql, Type};
    use std::error::Error;

    impl<'a> FromSql<'a> for EventType {
        fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
            let str_slice = <&str as FromSql>::from_sql(ty, raw)?;

            Ok(str_slice.parse()?)
        }

        accepts!(TEXT, VARCHAR);
    }

    impl ToSql for EventType {
        fn to_sql(
            &self,
            ty: &Type,
            w: &mut BytesMut,
        ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
            self.to_string().to_sql(ty, w)
        }

        accepts!(TEXT, VARCHAR);
        to_sql_checked!();
    }

    impl ToSql for EventId {
        fn to_sql(
            &self,
            ty: &Type,
            w: &mut BytesMut,
        ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
            self.to_string().to_sql(ty, w)
        }

        accepts!(TEXT, VARCHAR);
        to_sql_checked!();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn event_type_screaming_snake_case() {
        assert_eq!("IMPRESSION", EventType::Impression.to_string());
        assert_eq!(
            EventType::Conversion,
            "CONVERSION".parse().expect("Should parse")
        );
        assert_eq!(
            serde_json::json!("CLICK"),
            serde_json::to_value(EventType::Click).expect("Should serialize")
        );
    }

    #[test]
    fn event_submission_deserializes_with_flattened_context() {
        let submission: EventSubmission = serde_json::from_value(serde_json::json!({
            "type": "IMPRESSION",
            "campaignId": "0x936da01f9abd4d9d80c702af85c822a8",
            "placementId": "0x16f6ad657efa44c9a8f2a591a5b8a2b5",
            "userId": "user-1",
            "module": "news",
        }))
        .expect("Should deserialize");

        assert_eq!(EventType::Impression, submission.event_type);
        assert_eq!(Some("user-1".to_string()), submission.context.user_id);
        assert_eq!(Some("news".to_string()), submission.context.module);
        assert_eq!(None, submission.context.session_id);
    }
}
