//! axum host adapter.
//!
//! Exposes the gateway as a local reverse proxy: every inbound request is
//! converted to a `GatewayRequest`, dispatched through `on_fetch`, and the
//! result converted back. Registration mechanics live here, not in the
//! gateway itself.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use tower_http::trace::TraceLayer;

use dimts_client::FetchClient;

use crate::classify::{Destination, GatewayRequest, RequestMode};
use crate::gateway::{Gateway, GatewayResponse};

/// Shared gateway handle for all handlers.
pub type AppState = Arc<Gateway<FetchClient>>;

/// Hop-by-hop and transport-level headers, never forwarded in either
/// direction. Content-length and accept-encoding are excluded because the
/// fetch client may transparently decompress bodies.
const SKIP_HEADERS: &[&str] = &[
    "host",
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "content-length",
    "accept-encoding",
];

/// Maximum request body the proxy will buffer.
const MAX_REQUEST_BYTES: usize = 10 * 1024 * 1024;

/// Build the proxy router: a single fallback route through the gateway.
pub fn router(state: AppState) -> Router {
    Router::new()
        .fallback(handle)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle(State(gateway): State<AppState>, request: Request) -> Response {
    let gateway_request = match into_gateway_request(&gateway, request).await {
        Ok(converted) => converted,
        Err(rejection) => return rejection,
    };

    match gateway.on_fetch(&gateway_request).await {
        Ok(response) => into_axum_response(response),
        Err(e) => {
            tracing::warn!(url = %gateway_request.url, error = %e, "gateway error");
            (StatusCode::BAD_GATEWAY, e.to_string()).into_response()
        }
    }
}

/// Convert an inbound hyper request into the gateway's request shape.
///
/// The navigation flag and destination hint come from the browser's
/// `Sec-Fetch-Mode`/`Sec-Fetch-Dest` headers; requests without them (curl,
/// scripts) classify as plain no-cors fetches with no destination.
async fn into_gateway_request(gateway: &AppState, request: Request) -> Result<GatewayRequest, Response> {
    let (parts, body) = request.into_parts();

    let path_and_query = parts.uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let url = gateway
        .origin()
        .join(path_and_query)
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("invalid path: {e}")).into_response())?;

    let header_str =
        |name: &str| parts.headers.get(name).and_then(|value| value.to_str().ok());

    let mode = header_str("sec-fetch-mode").map_or(RequestMode::NoCors, RequestMode::parse);
    let destination = header_str("sec-fetch-dest").map_or(Destination::Empty, Destination::parse);
    let accept = header_str("accept").map(str::to_string);

    let headers = parts
        .headers
        .iter()
        .filter(|(name, _)| !SKIP_HEADERS.contains(&name.as_str()))
        .filter_map(|(name, value)| {
            value.to_str().ok().map(|v| (name.to_string(), v.to_string()))
        })
        .collect();

    let bytes = axum::body::to_bytes(body, MAX_REQUEST_BYTES)
        .await
        .map_err(|e| {
            (StatusCode::PAYLOAD_TOO_LARGE, format!("failed to read request body: {e}")).into_response()
        })?;
    let body = if bytes.is_empty() { None } else { Some(bytes) };

    Ok(GatewayRequest {
        method: parts.method.to_string(),
        url,
        mode,
        destination,
        accept,
        headers,
        body,
    })
}

fn into_axum_response(response: GatewayResponse) -> Response {
    let mut out = Response::new(Body::from(response.body));
    *out.status_mut() =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    for (name, value) in response.headers {
        if SKIP_HEADERS.contains(&name.as_str()) {
            continue;
        }
        if let (Ok(name), Ok(value)) =
            (name.parse::<HeaderName>(), HeaderValue::from_str(&value))
        {
            out.headers_mut().append(name, value);
        }
    }

    out
}
