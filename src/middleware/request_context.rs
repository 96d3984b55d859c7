use axum::{
    body::Body,
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

/// HTTP header name for request ID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// HTTP header carrying the caller's stable identity, used to key the daily quota
pub const CLIENT_ID_HEADER: &str = "x-client-id";

const MAX_CLIENT_ID_LEN: usize = 128;

/// Extension type for storing request ID in request extensions
#[derive(Clone, Debug)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Caller identity from `x-client-id`, absent for anonymous callers
///
/// Only printable ASCII without whitespace is accepted, up to 128 bytes. Anything else is
/// treated as anonymous.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClientId(pub Option<String>);

impl ClientId {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let id = headers
            .get(CLIENT_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|s| {
                !s.is_empty()
                    && s.len() <= MAX_CLIENT_ID_LEN
                    && s.chars().all(|c| c.is_ascii_graphic())
            })
            .map(str::to_string);
        Self(id)
    }

    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

/// Tags every request with a request ID and the caller's client ID
///
/// An incoming `x-request-id` that parses as a UUID is reused, otherwise a new v4 is
/// generated. The request ID is echoed on the response.
pub async fn request_context_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .map(RequestId)
        .unwrap_or_default();
    let client_id = ClientId::from_headers(request.headers());

    request.extensions_mut().insert(request_id.clone());
    request.extensions_mut().insert(client_id);

    let mut response = next.run(request).await;

    if let Ok(header_value) = HeaderValue::from_str(&request_id.to_string()) {
        response
            .headers_mut()
            .insert(REQUEST_ID_HEADER, header_value);
    }

    response
}

/// Tracing span carrying the request and client IDs
pub fn make_span_with_request_id(request: &Request<Body>) -> tracing::Span {
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let client = request
        .extensions()
        .get::<ClientId>()
        .and_then(|c| c.as_deref())
        .unwrap_or("anonymous")
        .to_string();

    tracing::info_span!(
        "http_request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id,
        client = %client,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Extension, Router};
    use tower::ServiceExt;

    fn echo_router() -> Router {
        Router::new()
            .route(
                "/whoami",
                get(|Extension(client): Extension<ClientId>| async move {
                    client.0.unwrap_or_else(|| "anonymous".to_string())
                }),
            )
            .layer(axum::middleware::from_fn(request_context_middleware))
    }

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CLIENT_ID_HEADER, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_client_id_from_header() {
        assert_eq!(
            ClientId::from_headers(&headers(" device-42 ")).as_deref(),
            Some("device-42")
        );
    }

    #[test]
    fn test_client_id_rejects_blank_and_oversized() {
        assert_eq!(ClientId::from_headers(&headers("   ")), ClientId(None));
        assert_eq!(ClientId::from_headers(&headers(&"a".repeat(200))), ClientId(None));
        assert_eq!(ClientId::from_headers(&headers("two words")), ClientId(None));
        assert_eq!(ClientId::from_headers(&HeaderMap::new()), ClientId(None));
    }

    #[tokio::test]
    async fn test_middleware_sets_extensions_and_header() {
        let request = axum::http::Request::builder()
            .uri("/whoami")
            .header(CLIENT_ID_HEADER, "device-7")
            .body(Body::empty())
            .unwrap();

        let response = echo_router().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let request_id = response.headers().get(REQUEST_ID_HEADER).unwrap();
        assert!(Uuid::parse_str(request_id.to_str().unwrap()).is_ok());

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"device-7");
    }

    #[tokio::test]
    async fn test_middleware_replaces_malformed_request_id() {
        let request = axum::http::Request::builder()
            .uri("/whoami")
            .header(REQUEST_ID_HEADER, "not-a-uuid")
            .body(Body::empty())
            .unwrap();

        let response = echo_router().oneshot(request).await.unwrap();

        let request_id = response.headers().get(REQUEST_ID_HEADER).unwrap();
        assert_ne!(request_id, "not-a-uuid");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"anonymous");
    }
}
