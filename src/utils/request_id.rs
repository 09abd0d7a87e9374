use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::fmt;
use std::str::FromStr;
use tracing::{Instrument, info_span};
use uuid::Uuid;

pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Correlation id for one inbound request
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Reuse an upstream id when it is a valid UUID
    fn from_request(request: &Request) -> Self {
        request
            .headers()
            .get(&X_REQUEST_ID)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::from_str(value).ok())
            .map(Self)
            .unwrap_or_else(Self::new)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Tags the request with an id, runs the rest of the stack inside a
/// `request` span carrying it, and echoes it in `X-Request-ID`.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = RequestId::from_request(&request);
    request.extensions_mut().insert(request_id);

    let span = info_span!("request", request_id = %request_id);
    let mut response = next.run(request).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert(X_REQUEST_ID.clone(), value);
    }
    response
}

pub trait RequestIdExt {
    fn request_id(&self) -> RequestId;
}

impl RequestIdExt for axum::http::Extensions {
    /// Nil id when the middleware did not run
    fn request_id(&self) -> RequestId {
        self.get::<RequestId>().copied().unwrap_or_default()
    }
}
