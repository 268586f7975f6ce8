use primitives::{Feature, Tier};

use crate::db::{AdStore, Error};

/// Whether the requesting user is entitled to an ad-free experience.
///
/// A tier already known to the caller is consulted directly, without a
/// store lookup. Anonymous requests and users without a stored account
/// default to the free tier and are always served.
pub async fn is_ad_free<S: AdStore>(
    store: &S,
    tier: Option<&Tier>,
    user_id: Option<&str>,
) -> Result<bool, Error> {
    if let Some(tier) = tier {
        return Ok(tier.has_feature(Feature::AdFree));
    }

    let user_id = match user_id {
        Some(user_id) => user_id,
        None => return Ok(false),
    };

    let tier = store.tier_of(user_id).await?;

    Ok(tier
        .map(|tier| tier.has_feature(Feature::AdFree))
        .unwrap_or(false))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::db::memory::MemoryStore;
    use primitives::test_util::{FREE_TIER, PRO_TIER};

    #[tokio::test]
    async fn ad_free_is_resolved_from_the_tier_features() {
        let store = MemoryStore::new();
        store.insert_account("paying-user", PRO_TIER.clone());
        store.insert_account("free-user", FREE_TIER.clone());

        assert!(is_ad_free(&store, None, Some("paying-user"))
            .await
            .expect("Should resolve"));
        assert!(!is_ad_free(&store, None, Some("free-user"))
            .await
            .expect("Should resolve"));
        assert!(
            !is_ad_free(&store, None, Some("unknown-user"))
                .await
                .expect("Should resolve"),
            "Users without an account default to the free tier"
        );
        assert!(
            !is_ad_free(&store, None, None).await.expect("Should resolve"),
            "Anonymous requests are always served"
        );
    }

    #[tokio::test]
    async fn a_caller_supplied_tier_skips_the_store_lookup() {
        let store = MemoryStore::new();
        store.insert_account("free-user", FREE_TIER.clone());

        assert!(
            is_ad_free(&store, Some(&PRO_TIER), None)
                .await
                .expect("Should resolve"),
            "An ad-free tier known to the caller needs no account"
        );
        assert!(!is_ad_free(&store, Some(&FREE_TIER), None)
            .await
            .expect("Should resolve"));
        assert!(
            is_ad_free(&store, Some(&PRO_TIER), Some("free-user"))
                .await
                .expect("Should resolve"),
            "The supplied tier wins over the stored one"
        );
    }
}
