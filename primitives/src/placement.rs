use crate::CampaignId;

use chrono::{serde::ts_milliseconds, DateTime, Utc};
use parse_display::{Display, FromStr};
use serde::{Deserialize, Serialize};
use url::Url;

pub use placement_id::PlacementId;

mod placement_id {
    use hex::{FromHex, FromHexError};
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
    use std::{fmt, str::FromStr};
    use thiserror::Error;
    use uuid::Uuid;

    /// an Id of 16 bytes, (de)serialized as a `0x` prefixed hex,
    /// generated from a `Uuid::new_v4()` like [`crate::CampaignId`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct PlacementId([u8; 16]);

    impl PlacementId {
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

    impl Default for PlacementId {
        fn default() -> Self {
            Self(*Uuid::new_v4().as_bytes())
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

    impl FromStr for PlacementId {
        type Err = Error;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            match s.strip_prefix("0x") {
                Some(hex) => Ok(Self(<[u8; 16]>::from_hex(hex)?)),
                None => Err(Error::ExpectedPrefix),
            }
        }
    }

    impl fmt::Display for PlacementId {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "0x{}", hex::encode(self.0))
        }
    }

    impl Serialize for PlacementId {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            serializer.serialize_str(&self.to_string())
        }
    }

    impl<'de> Deserialize<'de> for PlacementId {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            let value = String::deserialize(deserializer)?;

            value
                .parse::<PlacementId>()
                .map_err(|err| de::Error::custom(err.to_string()))
        }
    }
}

/// The on-page slot a [`Placement`] renders into; requests for an ad always
/// carry exactly one position.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, FromStr)]
#[serde(rename_all = "snake_case")]
#[display(style = "snake_case")]
pub enum Position {
    TopBanner,
    Sidebar,
    InFeed,
    Footer,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, FromStr)]
#[serde(rename_all = "snake_case")]
#[display(style = "snake_case")]
pub enum Format {
    NativeCard,
    BannerLarge,
    BannerSmall,
}

/// A concrete creative unit belonging to exactly one [`crate::Campaign`].
///
/// Placements never outlive their campaign - the cascade is owned by the
/// store, not by this engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub id: PlacementId,
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
    pub is_active: bool,
    #[serde(with = "ts_milliseconds")]
    pub created: DateTime<Utc>,
}

#[cfg(feature = "postgres")]
mod postgres {
    use super::{Format, Placement, PlacementId, Position};
    use bytes::BytesMut;
    use postgres_types::{accepts, to_sql_checked, FromSql, IsNull, ToSql, Type};
    use std::error::Error;
    use tokio_postgres::Row;

    impl From<&Row> for Placement {
        fn from(row: &Row) -> Self {
            Self {
                id: row.get("id"),
                campaign_id: row.get("campaign_id"),
                position: row.get("position"),
                format: row.get("format"),
                title: row.get("title"),
                description: row.get("description"),
                image_url: row
                    .get::<_, Option<String>>("image_url")
                    .map(|url| url.parse().expect("image_url must be a valid URL")),
                link_url: row
                    .get::<_, String>("link_url")
                    .parse()
                    .expect("link_url must be a valid URL"),
                cta_text: row.get("cta_text"),
                is_active: row.get("is_active"),
                created: row.get("created"),
            }
        }
    }

    impl<'a> FromSql<'a> for PlacementId {
        fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
            let str_slice = <&str as FromSql>::from_sql(ty, raw)?;

            Ok(str_slice.parse()?)
        }

        accepts!(TEXT, VARCHAR);
    }

    impl ToSql for PlacementId {
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

    impl<'a> FromSql<'a> for Position {
        fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
            let str_slice = <&str as FromSql>::from_sql(ty, raw)?;

            Ok(str_slice.parse()?)
        }

        accepts!(TEXT, VARCHAR);
    }

    impl ToSql for Position {
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

    impl<'a> FromSql<'a> for Format {
        fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
            let str_slice = <&str as FromSql>::from_sql(ty, raw)?;

            Ok(str_slice.parse()?)
        }

        accepts!(TEXT, VARCHAR);
    }

    impl ToSql for Format {
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
    fn position_string_forms() {
        assert_eq!("top_banner", Position::TopBanner.to_string());
        assert_eq!(
            Position::InFeed,
            "in_feed".parse().expect("Should parse position")
        );
        assert_eq!(
            serde_json::json!("sidebar"),
            serde_json::to_value(Position::Sidebar).expect("Should serialize")
        );
    }

    #[test]
    fn format_string_forms() {
        assert_eq!("native_card", Format::NativeCard.to_string());
        assert_eq!(
            Format::BannerLarge,
            "banner_large".parse().expect("Should parse format")
        );
    }
}
