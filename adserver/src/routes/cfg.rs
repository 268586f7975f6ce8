use hyper::header::CONTENT_TYPE;
use hyper::{Body, Request, Response};

use crate::{db::AdStore, Application, ResponseError};

/// `GET /cfg`
pub async fn config<S: AdStore + Clone + 'static>(
    _: Request<Body>,
    app: &Application<S>,
) -> Result<Response<Body>, ResponseError> {
    let config_str = serde_json::to_string(&app.config)?;

    Ok(Response::builder()
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(config_str))
        .expect("Creating a response should never fail"))
}
