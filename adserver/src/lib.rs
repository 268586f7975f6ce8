#![deny(clippy::all)]
#![deny(rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

use hyper::{Body, Method, Request, Response, StatusCode};
use once_cell::sync::Lazy;
use regex::Regex;
use slog::Logger;
use std::collections::HashMap;

use application::Config;
use db::AdStore;
use routes::{
    ad::serve_ad, analytics::campaign_analytics, campaign::insert_events, cfg::config,
};

pub mod access;
pub mod accounting;
pub mod analytics;
pub mod application;
pub mod db;
pub mod eligibility;
pub mod payout;
pub mod selection;

pub mod routes {
    pub mod ad;
    pub mod analytics;
    pub mod campaign;
    pub mod cfg;
}

#[cfg(any(test, feature = "test-util"))]
pub mod test_util;

static EVENTS_BY_CAMPAIGN_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^/campaign/(0x[a-fA-F0-9]{32})/events/?$").expect("The regex should be valid")
});
static ANALYTICS_BY_CAMPAIGN_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^/campaign/(0x[a-fA-F0-9]{32})/analytics/?$").expect("The regex should be valid")
});

#[derive(Debug, Clone)]
pub struct RouteParams(pub Vec<String>);

impl RouteParams {
    pub fn get(&self, index: usize) -> Option<String> {
        self.0.get(index).map(ToOwned::to_owned)
    }

    pub fn index(&self, i: usize) -> String {
        self.0[i].clone()
    }
}

#[derive(Clone)]
pub struct Application<S: AdStore> {
    pub store: S,
    pub config: Config,
    pub logger: Logger,
}

impl<S: AdStore + Clone + 'static> Application<S> {
    pub fn new(store: S, config: Config, logger: Logger) -> Self {
        Self {
            store,
            config,
            logger,
        }
    }

    pub async fn handle_routing(&self, req: Request<Body>) -> Response<Body> {
        match (req.uri().path(), req.method()) {
            ("/cfg", &Method::GET) => config(req, self).await,
            ("/ad", &Method::GET) => serve_ad(req, self).await,
            // This is important because it prevents us from doing
            // expensive regex matching for routes without /campaign
            (path, _) if path.starts_with("/campaign") => campaigns_router(req, self).await,
            _ => Err(ResponseError::NotFound),
        }
        .unwrap_or_else(map_response_error)
    }
}

async fn campaigns_router<S: AdStore + Clone + 'static>(
    mut req: Request<Body>,
    app: &Application<S>,
) -> Result<Response<Body>, ResponseError> {
    let (path, method) = (req.uri().path().to_owned(), req.method());

    if let (Some(caps), &Method::POST) = (EVENTS_BY_CAMPAIGN_ID.captures(&path), method) {
        let param = RouteParams(vec![caps
            .get(1)
            .map_or("".to_string(), |m| m.as_str().to_string())]);
        req.extensions_mut().insert(param);

        insert_events(req, app).await
    } else if let (Some(caps), &Method::GET) = (ANALYTICS_BY_CAMPAIGN_ID.captures(&path), method) {
        let param = RouteParams(vec![caps
            .get(1)
            .map_or("".to_string(), |m| m.as_str().to_string())]);
        req.extensions_mut().insert(param);

        campaign_analytics(req, app).await
    } else {
        Err(ResponseError::NotFound)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ResponseError {
    NotFound,
    BadRequest(String),
}

impl<T> From<T> for ResponseError
where
    T: std::error::Error + 'static,
{
    fn from(error: T) -> Self {
        ResponseError::BadRequest(error.to_string())
    }
}

impl From<ResponseError> for Response<Body> {
    fn from(response_error: ResponseError) -> Self {
        map_response_error(response_error)
    }
}

pub fn map_response_error(error: ResponseError) -> Response<Body> {
    match error {
        ResponseError::NotFound => not_found(),
        ResponseError::BadRequest(e) => bad_response(e, StatusCode::BAD_REQUEST),
    }
}

pub fn not_found() -> Response<Body> {
    let mut response = Response::new(Body::from("Not found"));
    let status = response.status_mut();
    *status = StatusCode::NOT_FOUND;
    response
}

pub fn bad_response(response_body: String, status_code: StatusCode) -> Response<Body> {
    let mut error_response = HashMap::new();
    error_response.insert("message", response_body);

    let body = Body::from(serde_json::to_string(&error_response).expect("serialise err response"));

    let mut response = Response::new(body);
    response
        .headers_mut()
        .insert("Content-type", "application/json".parse().unwrap());

    *response.status_mut() = status_code;

    response
}

pub fn success_response(response_body: String) -> Response<Body> {
    let body = Body::from(response_body);

    let mut response = Response::new(body);
    response
        .headers_mut()
        .insert("Content-type", "application/json".parse().unwrap());

    let status = response.status_mut();
    *status = StatusCode::OK;

    response
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_util::{seeded_store, test_application};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn unknown_routes_are_not_found() {
        let app = test_application(seeded_store());

        let req = Request::get("http://localhost/does-not-exist")
            .body(Body::empty())
            .expect("Should build the request");
        assert_eq!(
            StatusCode::NOT_FOUND,
            app.handle_routing(req).await.status()
        );

        // a campaign route with a malformed id never reaches a handler
        let req = Request::post("http://localhost/campaign/not-an-id/events")
            .body(Body::empty())
            .expect("Should build the request");
        assert_eq!(
            StatusCode::NOT_FOUND,
            app.handle_routing(req).await.status()
        );
    }

    #[tokio::test]
    async fn cfg_serves_the_configuration() {
        let app = test_application(seeded_store());

        let req = Request::get("http://localhost/cfg")
            .body(Body::empty())
            .expect("Should build the request");
        let response = app.handle_routing(req).await;
        assert_eq!(StatusCode::OK, response.status());

        let body = hyper::body::to_bytes(response.into_body())
            .await
            .expect("Should read the body");
        let value: serde_json::Value = serde_json::from_slice(&body).expect("Should deserialize");
        assert_eq!(serde_json::json!("development"), value["env"]);
    }
}
