use hyper::{Body, Request, Response};
use serde::Deserialize;

use primitives::{
    CampaignId, EventContext, EventSubmission, EventType, PlacementId, SuccessResponse,
};

use crate::{
    accounting, db::AdStore, success_response, Application, ResponseError, RouteParams,
};

/// A single event in the batch body; the campaign comes from the route.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBody {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub placement_id: PlacementId,
    #[serde(flatten)]
    pub context: EventContext,
}

#[derive(Debug, Deserialize)]
pub struct InsertEventsRequest {
    pub events: Vec<EventBody>,
}

/// `POST /campaign/:id/events`
///
/// Accepts a batch of events and records each one best effort. The response
/// is a success as long as the request itself was well formed; individual
/// event outcomes are only logged, callers can not retry a charge.
pub async fn insert_events<S: AdStore + Clone + 'static>(
    req: Request<Body>,
    app: &Application<S>,
) -> Result<Response<Body>, ResponseError> {
    let route_params = req
        .extensions()
        .get::<RouteParams>()
        .expect("request should have route params")
        .clone();
    let campaign_id = route_params
        .index(0)
        .parse::<CampaignId>()
        .map_err(|_| ResponseError::BadRequest("Bad CampaignId".to_string()))?;

    let body = hyper::body::to_bytes(req.into_body()).await?;
    let request = serde_json::from_slice::<InsertEventsRequest>(&body)?;

    for event in request.events {
        let submission = EventSubmission {
            event_type: event.event_type,
            campaign_id,
            placement_id: event.placement_id,
            context: event.context,
        };

        accounting::record_event(&app.store, &app.logger, &submission).await;
    }

    Ok(success_response(serde_json::to_string(&SuccessResponse {
        success: true,
    })?))
}
