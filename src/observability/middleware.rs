use poem::http::HeaderValue;
use poem::{Endpoint, Middleware, Request, Result as PoemResult};
use tracing::{info_span, Instrument};
use uuid::Uuid;

use crate::security::ACTOR_ID_HEADER;

pub const REQUEST_ID_HEADER: &str = "X-Request-Id";
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-Id";

/// Middleware to add request ID, correlation ID and actor to the request span
pub struct RequestTracingMiddleware;

impl<E: Endpoint> Middleware<E> for RequestTracingMiddleware {
    type Output = RequestTracingEndpoint<E>;

    fn transform(&self, ep: E) -> Self::Output {
        RequestTracingEndpoint { ep }
    }
}

pub struct RequestTracingEndpoint<E> {
    ep: E,
}

#[poem::async_trait]
impl<E: Endpoint> Endpoint for RequestTracingEndpoint<E> {
    type Output = E::Output;

    async fn call(&self, mut req: Request) -> PoemResult<Self::Output> {
        let request_id = Uuid::new_v4().to_string();
        let correlation_id = extract_correlation_id(&req).unwrap_or_else(|| Uuid::new_v4().to_string());
        let actor_id = req.header(ACTOR_ID_HEADER).unwrap_or("anonymous").to_string();

        // Downstream handlers read these back from the headers
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            req.headers_mut().insert(REQUEST_ID_HEADER, value);
        }
        if let Ok(value) = HeaderValue::from_str(&correlation_id) {
            req.headers_mut().insert(CORRELATION_ID_HEADER, value);
        }

        let span = info_span!(
            "http_request",
            request_id = %request_id,
            correlation_id = %correlation_id,
            actor_id = %actor_id,
            method = %req.method(),
            path = %req.uri().path(),
        );

        self.ep.call(req).instrument(span).await
    }
}

pub fn extract_request_id(req: &Request) -> Option<String> {
    req.header(REQUEST_ID_HEADER).map(|s| s.to_string())
}

pub fn extract_correlation_id(req: &Request) -> Option<String> {
    req.header(CORRELATION_ID_HEADER).map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use poem::{handler, EndpointExt, Route};

    #[handler]
    fn echo_ids(req: &Request) -> String {
        format!(
            "{}|{}",
            extract_request_id(req).unwrap_or_default(),
            extract_correlation_id(req).unwrap_or_default()
        )
    }

    #[tokio::test]
    async fn test_correlation_id_extraction() {
        let req = Request::builder()
            .header(CORRELATION_ID_HEADER, "test-correlation-id")
            .finish();

        assert_eq!(
            extract_correlation_id(&req),
            Some("test-correlation-id".to_string())
        );
    }

    #[tokio::test]
    async fn test_missing_request_id() {
        let req = Request::builder().finish();
        assert!(extract_request_id(&req).is_none());
    }

    #[tokio::test]
    async fn test_middleware_sets_ids_and_keeps_correlation() {
        let app = Route::new().at("/", echo_ids).with(RequestTracingMiddleware);
        let req = Request::builder()
            .header(CORRELATION_ID_HEADER, "abc")
            .finish();

        let resp = app.call(req).await.unwrap();
        let body = resp.into_body().into_string().await.unwrap();
        let (request_id, correlation_id) = body.split_once('|').unwrap();
        assert!(Uuid::parse_str(request_id).is_ok());
        assert_eq!(correlation_id, "abc");
    }
}
