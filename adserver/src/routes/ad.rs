use chrono::Utc;
use hyper::{Body, Request, Response};
use serde::Deserialize;
use slog::error;

use primitives::{Position, ServedAd, Tier};

use crate::{
    access, db,
    db::AdStore,
    eligibility, selection, success_response, Application, ResponseError,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdQuery {
    pub position: Position,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    /// A tier the caller already resolved, e.g. from its session. Takes
    /// precedence over the `userId` lookup.
    #[serde(default)]
    pub tier: Option<Tier>,
}

/// `GET /ad?position=...&module=...&userId=...`
///
/// Serving is best effort: an unfilled request and a store failure both
/// respond `200` with a `null` body, only a malformed query is a `400`.
pub async fn serve_ad<S: AdStore + Clone + 'static>(
    req: Request<Body>,
    app: &Application<S>,
) -> Result<Response<Body>, ResponseError> {
    let query = serde_qs::from_str::<AdQuery>(req.uri().query().unwrap_or(""))
        .map_err(|error| ResponseError::BadRequest(error.to_string()))?;

    let served = match resolve(app, &query).await {
        Ok(served) => served,
        Err(error) => {
            error!(&app.logger, "Ad selection failed, serving empty"; "error" => ?error);

            None
        }
    };

    Ok(success_response(serde_json::to_string(&served)?))
}

async fn resolve<S: AdStore>(
    app: &Application<S>,
    query: &AdQuery,
) -> Result<Option<ServedAd>, db::Error> {
    if access::is_ad_free(&app.store, query.tier.as_ref(), query.user_id.as_deref()).await? {
        return Ok(None);
    }

    let candidates = app.store.active_placements(query.position).await?;
    let eligible = eligibility::eligible_candidates(
        &app.store,
        candidates,
        query.module.as_deref(),
        Utc::now(),
    )
    .await?;

    Ok(selection::select_placement(eligible)
        .map(|(placement, campaign)| ServedAd::from_parts(placement, &campaign)))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{db::memory::MemoryStore, test_util::test_application};
    use pretty_assertions::assert_eq;
    use primitives::test_util::{DUMMY_CAMPAIGN, DUMMY_PLACEMENT, PRO_TIER};

    fn ad_request(query: &str) -> Request<Body> {
        Request::get(format!("http://localhost/ad?{}", query))
            .body(Body::empty())
            .expect("Should build the request")
    }

    #[tokio::test]
    async fn serves_the_winning_placement_or_null() {
        let store = MemoryStore::new();
        store.insert_campaign(DUMMY_CAMPAIGN.clone());
        store.insert_placement(DUMMY_PLACEMENT.clone());
        store.insert_account("subscriber", PRO_TIER.clone());
        let app = test_application(store);

        let response = serve_ad(ad_request("position=top_banner"), &app)
            .await
            .expect("Should serve");
        let body = hyper::body::to_bytes(response.into_body())
            .await
            .expect("Should read the body");
        let served: Option<ServedAd> =
            serde_json::from_slice(&body).expect("Should deserialize");
        assert_eq!(
            Some(DUMMY_PLACEMENT.id),
            served.map(|served| served.placement_id)
        );

        // nothing serves in the sidebar
        let response = serve_ad(ad_request("position=sidebar"), &app)
            .await
            .expect("Should serve");
        let body = hyper::body::to_bytes(response.into_body())
            .await
            .expect("Should read the body");
        assert_eq!(b"null".as_slice(), &body[..]);

        // an ad-free subscriber always gets null
        let response = serve_ad(ad_request("position=top_banner&userId=subscriber"), &app)
            .await
            .expect("Should serve");
        let body = hyper::body::to_bytes(response.into_body())
            .await
            .expect("Should read the body");
        assert_eq!(b"null".as_slice(), &body[..]);
    }

    #[tokio::test]
    async fn a_tier_in_the_query_is_consulted_directly() {
        let store = MemoryStore::new();
        store.insert_campaign(DUMMY_CAMPAIGN.clone());
        store.insert_placement(DUMMY_PLACEMENT.clone());
        let app = test_application(store);

        // no account exists, the ad-free entitlement rides on the query
        let response = serve_ad(
            ad_request("position=top_banner&tier%5Bname%5D=pro&tier%5Bfeatures%5D%5B0%5D=adFree"),
            &app,
        )
        .await
        .expect("Should serve");
        let body = hyper::body::to_bytes(response.into_body())
            .await
            .expect("Should read the body");
        assert_eq!(b"null".as_slice(), &body[..]);

        // a free tier in the query still serves
        let response = serve_ad(ad_request("position=top_banner&tier%5Bname%5D=free"), &app)
            .await
            .expect("Should serve");
        let body = hyper::body::to_bytes(response.into_body())
            .await
            .expect("Should read the body");
        let served: Option<ServedAd> =
            serde_json::from_slice(&body).expect("Should deserialize");
        assert_eq!(
            Some(DUMMY_PLACEMENT.id),
            served.map(|served| served.placement_id)
        );
    }

    #[tokio::test]
    async fn rejects_a_malformed_query() {
        let app = test_application(MemoryStore::new());

        let result = serve_ad(ad_request("position=not-a-position"), &app).await;
        assert!(matches!(result, Err(ResponseError::BadRequest(_))));
    }
}
