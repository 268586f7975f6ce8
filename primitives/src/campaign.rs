use crate::UnifiedNum;

use chrono::{
    serde::{ts_milliseconds, ts_milliseconds_option},
    DateTime, Utc,
};
use num_traits::CheckedSub;
use parse_display::{Display, FromStr};
use serde::{Deserialize, Serialize};
use serde_with::with_prefix;
use url::Url;

pub use campaign_id::CampaignId;

with_prefix!(pub prefix_active "active_");

mod campaign_id {
    use hex::{FromHex, FromHexError};
    use serde::{
        de::{self, Visitor},
        Deserialize, Deserializer, Serialize, Serializer,
    };
    use std::{fmt, str::FromStr};
    use thiserror::Error;
    use uuid::Uuid;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    /// an Id of 16 bytes, (de)serialized as a `0x` prefixed hex
    /// In this implementation of the `CampaignId` the value is generated from a `Uuid::new_v4().to_simple()`
    pub struct CampaignId([u8; 16]);

    impl CampaignId {
        /// Generates randomly a `CampaignId` using `Uuid::new_v4().to_simple()`
        pub fn new() -> Self {
            Self::default()
        }

        pub fn as_bytes(&self) -> &[u8; 16] {
            &self.0
        }

        pub fn from_bytes(bytes: &[u8; 16]) -> Self {
            Self(*bytes)
        }
    }

    impl Default for CampaignId {
        fn default() -> Self {
            Self(*Uuid::new_v4().as_bytes())
        }
    }

    impl AsRef<[u8]> for CampaignId {
        fn as_ref(&self) -> &[u8] {
            &self.0
        }
    }

    #[derive(Debug, Error)]
    pub enum Error {
        /// the `0x` prefix is missing
        #[error("Expected a `0x` prefix")]
        ExpectedPrefix,
        #[error(transparent)]
        InvalidHex(#[from] FromHexError),
    }

    impl FromStr for CampaignId {
        type Err = Error;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            match s.strip_prefix("0x") {
                Some(hex) => Ok(Self(<[u8; 16]>::from_hex(hex)?)),
                None => Err(Error::ExpectedPrefix),
            }
        }
    }

    impl fmt::Display for CampaignId {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "0x{}", hex::encode(self.0))
        }
    }

    impl Serialize for CampaignId {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            serializer.serialize_str(&self.to_string())
        }
    }

    impl<'de> Deserialize<'de> for CampaignId {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_str(StringIdVisitor)
        }
    }

    struct StringIdVisitor;

    impl<'de> Visitor<'de> for StringIdVisitor {
        type Value = CampaignId;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a string of a `0x` prefixed hex with 16 bytes")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            value
                .parse::<CampaignId>()
                .map_err(|err| E::custom(err.to_string()))
        }

        fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            self.visit_str(&value)
        }
    }

    #[cfg(test)]
    mod test {
        use serde_json::{to_value, Value};

        use super::*;

        #[test]
        fn de_serializes_campaign_id() {
            let id = CampaignId::new();

            assert_eq!(
                Value::String(format!("0x{}", hex::encode(id.0))),
                to_value(id).expect("Should serialize")
            );
        }
    }
}

/// The advertiser owning a [`Campaign`], read-only from the engine's
/// perspective.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Advertiser {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<Url>,
}

/// The campaign lifecycle.
///
/// Campaigns are created in `Draft`, serve only while `Active` and become
/// `Completed` automatically the instant `spent >= budget` (enforced by the
/// Impression Accountant) or once the end of the active window has passed.
/// `Paused` is an external, manual state which the engine must respect.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, FromStr)]
#[serde(rename_all = "lowercase")]
#[display(style = "lowercase")]
pub enum Status {
    Draft,
    Active,
    Paused,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: CampaignId,
    pub advertiser: Advertiser,
    pub status: Status,
    pub budget: UnifiedNum,
    /// Total amount charged against the budget so far.
    ///
    /// Monotonically non-decreasing and `spent <= budget` at all times - the
    /// Impression Accountant is the sole writer.
    pub spent: UnifiedNum,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_budget: Option<UnifiedNum>,
    /// Cost per 1000 impressions.
    pub cpm_rate: UnifiedNum,
    /// Cost per click (clicks are free when not set).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpc_rate: Option<UnifiedNum>,
    /// Higher priority always serves first.
    #[serde(default)]
    pub priority: i32,
    /// Module identifiers this campaign targets; an empty set targets all
    /// modules.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target_modules: Vec<String>,
    /// A millisecond timestamp of when the campaign was created
    #[serde(with = "ts_milliseconds")]
    pub created: DateTime<Utc>,
    #[serde(flatten, with = "prefix_active")]
    pub active: Active,
}

impl Campaign {
    /// Budget not yet spent. Zero when the budget is exhausted.
    pub fn remaining(&self) -> UnifiedNum {
        self.budget.checked_sub(&self.spent).unwrap_or_default()
    }

    /// A campaign with `budget = 0` is exhausted from the start.
    pub fn budget_exhausted(&self) -> bool {
        self.spent >= self.budget
    }

    /// Clamps a nominal charge so that applying it can never push `spent`
    /// above `budget`. Must only be evaluated on a freshly read campaign
    /// inside the store's transaction boundary.
    pub fn clamp_charge(&self, nominal: UnifiedNum) -> UnifiedNum {
        self.remaining().min(nominal)
    }

    pub fn in_window(&self, now: DateTime<Utc>) -> bool {
        self.active.from.map(|from| from <= now).unwrap_or(true) && now <= self.active.to
    }

    /// Module targeting check: an empty target set is eligible for any
    /// module, a non-empty set requires the requested module to be present.
    pub fn targets_module(&self, module: Option<&str>) -> bool {
        if self.target_modules.is_empty() {
            return true;
        }

        match module {
            Some(module) => self.target_modules.iter().any(|target| target == module),
            None => false,
        }
    }
}

/// The date window in which a campaign is allowed to serve.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Active {
    /// Start of the serving window; a campaign scheduled for the future is
    /// not eligible. `None` means "since creation".
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "ts_milliseconds_option"
    )]
    pub from: Option<DateTime<Utc>>,
    /// A millisecond timestamp after which the campaign no longer serves.
    #[serde(with = "ts_milliseconds")]
    pub to: DateTime<Utc>,
}

#[cfg(feature = "postgres")]
mod postgres {
    use super::{Active, Advertiser, Campaign, CampaignId, Status};
    use bytes::BytesMut;
    use postgres_types::{accepts, to_sql_checked, FromSql, IsNull, ToSql, Type};
    use std::error::Error;
    use tokio_postgres::Row;

    impl From<&Row> for Campaign {
        fn from(row: &Row) -> Self {
            Self {
                id: row.get("id"),
                advertiser: Advertiser {
                    name: row.get("advertiser_name"),
                    logo_url: row
                        .get::<_, Option<String>>("advertiser_logo")
                        .map(|logo| logo.parse().expect("advertiser_logo must be a valid URL")),
                },
                status: row.get("status"),
                budget: row.get("budget"),
                spent: row.get("spent"),
                daily_budget: row.get("daily_budget"),
                cpm_rate: row.get("cpm_rate"),
                cpc_rate: row.get("cpc_rate"),
                priority: row.get("priority"),
                target_modules: row.get("target_modules"),
                created: row.get("created"),
                active: Active {
                    from: row.get("active_from"),
                    to: row.get("active_to"),
                },
            }
        }
    }

    impl<'a> FromSql<'a> for CampaignId {
        fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
            let str_slice = <&str as FromSql>::from_sql(ty, raw)?;

            Ok(str_slice.parse()?)
        }

        accepts!(TEXT, VARCHAR);
    }

    impl ToSql for CampaignId {
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

    impl<'a> FromSql<'a> for Status {
        fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
            let str_slice = <&str as FromSql>::from_sql(ty, raw)?;

            Ok(str_slice.parse()?)
        }

        accepts!(TEXT, VARCHAR);
    }

    impl ToSql for Status {
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
    use crate::test_util::DUMMY_CAMPAIGN;
    use pretty_assertions::assert_eq;

    #[test]
    fn campaign_status_displays_and_parses() {
        assert_eq!("active", Status::Active.to_string());
        assert_eq!(Status::Paused, "paused".parse().expect("Should parse"));
        assert_eq!(
            serde_json::json!("completed"),
            serde_json::to_value(Status::Completed).expect("Should serialize")
        );
    }

    #[test]
    fn clamping_never_exceeds_the_remaining_budget() {
        let mut campaign = DUMMY_CAMPAIGN.clone();
        campaign.budget = UnifiedNum::from_whole(10);
        campaign.spent = UnifiedNum::from_u64(950_000_000); // 9.5

        // remaining is 0.5, a charge of 2.0 is clamped down to it
        assert_eq!(
            UnifiedNum::from_u64(50_000_000),
            campaign.clamp_charge(UnifiedNum::from_whole(2))
        );
        // a charge below the remaining budget is applied in full
        assert_eq!(
            UnifiedNum::from_u64(10_000_000),
            campaign.clamp_charge(UnifiedNum::from_u64(10_000_000))
        );

        campaign.spent = campaign.budget;
        assert_eq!(
            UnifiedNum::ZERO,
            campaign.clamp_charge(UnifiedNum::from_whole(1)),
            "An exhausted campaign is only ever charged zero"
        );

        campaign.budget = UnifiedNum::ZERO;
        campaign.spent = UnifiedNum::ZERO;
        assert!(campaign.budget_exhausted(), "Zero budget is exhausted");
    }

    #[test]
    fn module_targeting() {
        let mut campaign = DUMMY_CAMPAIGN.clone();

        campaign.target_modules = vec![];
        assert!(campaign.targets_module(Some("news")));
        assert!(campaign.targets_module(None));

        campaign.target_modules = vec!["marketplace".to_string()];
        assert!(campaign.targets_module(Some("marketplace")));
        assert!(!campaign.targets_module(Some("news")));
        assert!(
            !campaign.targets_module(None),
            "A targeted campaign requires a module context"
        );
    }

    #[test]
    fn campaign_serializes_with_active_prefix() {
        let campaign = DUMMY_CAMPAIGN.clone();
        let value = serde_json::to_value(&campaign).expect("Should serialize");

        assert!(value.get("active_to").is_some());
        assert_eq!(
            serde_json::to_value(campaign.id).expect("Should serialize"),
            value["id"]
        );

        let from_value: Campaign = serde_json::from_value(value).expect("Should deserialize");
        assert_eq!(campaign, from_value);
    }
}
