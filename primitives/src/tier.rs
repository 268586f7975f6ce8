use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A capability granted by a subscription tier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Feature {
    /// Members of a tier with this feature never get served an ad.
    AdFree,
    ApiAccess,
    PrioritySupport,
}

/// A subscription tier with its feature set.
///
/// The engine only ever consults the feature set; tier management itself is
/// owned by the billing side of the platform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Tier {
    pub name: String,
    #[serde(default)]
    pub features: HashSet<Feature>,
}

impl Tier {
    pub fn has_feature(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }
}
