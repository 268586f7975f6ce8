use hyper::{Body, Request, Response};

use primitives::CampaignId;

use crate::{db::AdStore, success_response, Application, ResponseError, RouteParams};

/// `GET /campaign/:id/analytics`
pub async fn campaign_analytics<S: AdStore + Clone + 'static>(
    req: Request<Body>,
    app: &Application<S>,
) -> Result<Response<Body>, ResponseError> {
    let route_params = req
        .extensions()
        .get::<RouteParams>()
        .expect("request should have route params");
    let campaign_id = route_params
        .index(0)
        .parse::<CampaignId>()
        .map_err(|_| ResponseError::BadRequest("Bad CampaignId".to_string()))?;

    match crate::analytics::campaign_analytics(&app.store, campaign_id).await? {
        Some(report) => Ok(success_response(serde_json::to_string(&report)?)),
        None => Err(ResponseError::NotFound),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{db::memory::MemoryStore, test_util::test_application};
    use hyper::StatusCode;
    use pretty_assertions::assert_eq;
    use primitives::{test_util::DUMMY_CAMPAIGN, AnalyticsReport};

    fn analytics_request(campaign_id: CampaignId) -> Request<Body> {
        let mut req = Request::get(format!(
            "http://localhost/campaign/{}/analytics",
            campaign_id
        ))
        .body(Body::empty())
        .expect("Should build the request");
        req.extensions_mut()
            .insert(RouteParams(vec![campaign_id.to_string()]));

        req
    }

    #[tokio::test]
    async fn a_missing_campaign_is_not_found() {
        let app = test_application(MemoryStore::new());

        let result = campaign_analytics(analytics_request(CampaignId::new()), &app).await;
        assert!(matches!(result, Err(ResponseError::NotFound)));
    }

    #[tokio::test]
    async fn reports_on_an_existing_campaign() {
        let store = MemoryStore::new();
        store.insert_campaign(DUMMY_CAMPAIGN.clone());
        let app = test_application(store);

        let response = campaign_analytics(analytics_request(DUMMY_CAMPAIGN.id), &app)
            .await
            .expect("Should report");
        assert_eq!(StatusCode::OK, response.status());

        let body = hyper::body::to_bytes(response.into_body())
            .await
            .expect("Should read the body");
        let report: AnalyticsReport = serde_json::from_slice(&body).expect("Should deserialize");
        assert_eq!(DUMMY_CAMPAIGN.id, report.campaign_id);
        assert_eq!(DUMMY_CAMPAIGN.budget, report.budget_remaining);
    }
}
