//! Request classification: a pure mapping from request shape to strategy.
//!
//! Classification looks at three things only: the navigation flag
//! (`Sec-Fetch-Mode: navigate`), the `Accept` header, and the destination
//! hint (`Sec-Fetch-Dest`), plus whether the URL is origin-scoped. Nothing
//! here touches the store or the network.

use bytes::Bytes;
use dimts_client::same_origin;
use url::Url;

/// Request mode, the HTTP equivalent of the worker's `request.mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    Navigate,
    SameOrigin,
    NoCors,
    Cors,
}

impl RequestMode {
    /// Parse a `Sec-Fetch-Mode` header value. Unknown values collapse to
    /// `NoCors`, the least privileged mode.
    pub fn parse(value: &str) -> Self {
        match value {
            "navigate" => Self::Navigate,
            "same-origin" => Self::SameOrigin,
            "cors" => Self::Cors,
            _ => Self::NoCors,
        }
    }
}

/// What the requester will do with the response, from `Sec-Fetch-Dest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Document,
    Image,
    Audio,
    Script,
    Style,
    Font,
    Empty,
    Other,
}

impl Destination {
    /// Parse a `Sec-Fetch-Dest` header value.
    pub fn parse(value: &str) -> Self {
        match value {
            "document" => Self::Document,
            "image" => Self::Image,
            "audio" => Self::Audio,
            "script" => Self::Script,
            "style" => Self::Style,
            "font" => Self::Font,
            "empty" | "" => Self::Empty,
            _ => Self::Other,
        }
    }
}

/// The per-request cache policy chosen by classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    NetworkFirst,
    CacheFirstRefresh,
    CacheFirstDefault,
}

/// A request as seen by the gateway.
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    pub method: String,
    pub url: Url,
    pub mode: RequestMode,
    pub destination: Destination,
    pub accept: Option<String>,
    /// Headers to forward upstream, hop-by-hop already stripped.
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
}

impl GatewayRequest {
    /// A plain GET with no browser hints.
    pub fn get(url: Url) -> Self {
        Self {
            method: "GET".to_string(),
            url,
            mode: RequestMode::NoCors,
            destination: Destination::Empty,
            accept: None,
            headers: Vec::new(),
            body: None,
        }
    }
}

/// Classify a request against the app origin.
///
/// Navigations and HTML-accepting requests go network-first so online
/// content stays fresh. Same-origin image and audio requests are
/// cache-first with refresh. Everything else is cache-first with plain
/// network fallthrough and no shell fallback.
pub fn classify(request: &GatewayRequest, origin: &Url) -> Strategy {
    let wants_html = request
        .accept
        .as_deref()
        .is_some_and(|accept| accept.contains("text/html"));

    if request.mode == RequestMode::Navigate || wants_html {
        return Strategy::NetworkFirst;
    }

    if same_origin(&request.url, origin)
        && matches!(request.destination, Destination::Image | Destination::Audio)
    {
        return Strategy::CacheFirstRefresh;
    }

    Strategy::CacheFirstDefault
}
