//! The offline cache gateway: lifecycle operations and per-request strategies.
//!
//! `Gateway` owns the versioned bucket store, the network capability, the
//! asset manifest and the version tag. The host adapter wires
//! `on_install`/`on_activate`/`on_fetch` to its own startup and request
//! events, which keeps platform mechanics out of the state machine.

use bytes::Bytes;
use chrono::Utc;
use url::Url;

use dimts_client::{Fetch, FetchResponse, OutboundRequest, canonicalize};
use dimts_core::store::key::entry_key;
use dimts_core::{AssetManifest, BucketStore, Error, StoredResponse};

use crate::classify::{GatewayRequest, Strategy, classify};

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServedFrom {
    Network,
    Cache,
    ShellFallback,
}

/// A response as handed back to the host adapter.
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub served_from: ServedFrom,
}

/// The offline cache gateway.
pub struct Gateway<F> {
    store: BucketStore,
    network: F,
    manifest: AssetManifest,
    version: String,
    origin: Url,
}

impl<F: Fetch> Gateway<F> {
    /// Build a gateway fronting `upstream` with the given version tag.
    pub fn new(
        store: BucketStore, network: F, manifest: AssetManifest, version: String, upstream: &str,
    ) -> Result<Self, Error> {
        if version.is_empty() {
            return Err(Error::InvalidInput("version tag cannot be empty".into()));
        }
        let origin = canonicalize(upstream).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self { store, network, manifest, version, origin })
    }

    /// The app origin this gateway fronts.
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// The version tag naming the current bucket.
    pub fn version(&self) -> &str {
        &self.version
    }

    fn asset_url(&self, path: &str) -> Result<Url, Error> {
        self.origin.join(path).map_err(|e| Error::InvalidUrl(e.to_string()))
    }

    /// Create the current bucket and populate it with every manifest asset.
    ///
    /// All-or-nothing: any transport failure or non-2xx response aborts the
    /// install and the error propagates to the host. A partially populated
    /// bucket from an aborted install is overwritten by the next attempt.
    pub async fn on_install(&self) -> Result<(), Error> {
        self.store.create_bucket(&self.version).await?;

        for path in self.manifest.paths() {
            let url = self.asset_url(path)?;
            let response = self
                .network
                .fetch(&OutboundRequest::get(url.clone()))
                .await
                .map_err(|e| Error::ManifestPopulation(format!("{path}: {e}")))?;

            if !response.status.is_success() {
                return Err(Error::ManifestPopulation(format!(
                    "{path}: status {}",
                    response.status.as_u16()
                )));
            }

            self.store
                .put_entry(&self.version, &stored_response("GET", &url, &response))
                .await?;
        }

        tracing::info!(bucket = %self.version, assets = self.manifest.paths().len(), "bucket installed");
        Ok(())
    }

    /// Delete every bucket other than the current one. Completion is
    /// awaited; after this resolves only the current bucket exists.
    pub async fn on_activate(&self) -> Result<(), Error> {
        let deleted = self.store.delete_buckets_except(&self.version).await?;
        tracing::info!(bucket = %self.version, deleted, "bucket activated");
        Ok(())
    }

    /// Classify a request and dispatch it to its strategy.
    pub async fn on_fetch(&self, request: &GatewayRequest) -> Result<GatewayResponse, Error> {
        let strategy = classify(request, &self.origin);
        tracing::debug!(url = %request.url, ?strategy, "dispatch");
        match strategy {
            Strategy::NetworkFirst => self.network_first(request).await,
            Strategy::CacheFirstRefresh => self.cache_first_refresh(request).await,
            Strategy::CacheFirstDefault => self.cache_first_default(request).await,
        }
    }

    /// Network wins whenever it resolves, whatever the status; only
    /// transport failures degrade to the cached shell.
    async fn network_first(&self, request: &GatewayRequest) -> Result<GatewayResponse, Error> {
        match self.network.fetch(&outbound(request)).await {
            Ok(response) => Ok(network_response(&response)),
            Err(cause) => self.shell_fallback(cause).await,
        }
    }

    /// Cache wins outright on hit. On miss the network result is returned
    /// and written back in the background; total failure degrades to the
    /// cached shell.
    async fn cache_first_refresh(&self, request: &GatewayRequest) -> Result<GatewayResponse, Error> {
        let key = entry_key(&request.method, request.url.as_str());
        match self.store.get_entry(&self.version, &key).await {
            Ok(Some(entry)) => {
                tracing::debug!(url = %request.url, "media cache hit");
                Ok(cached_response(entry))
            }
            Ok(None) => match self.network.fetch(&outbound(request)).await {
                Ok(response) => {
                    self.write_back(request, &response);
                    Ok(network_response(&response))
                }
                Err(cause) => self.shell_fallback(cause).await,
            },
            Err(cause) => self.shell_fallback(cause).await,
        }
    }

    /// Cached entry if present, otherwise a plain network fetch. No shell
    /// fallback here: failures surface to the caller.
    async fn cache_first_default(&self, request: &GatewayRequest) -> Result<GatewayResponse, Error> {
        let key = entry_key(&request.method, request.url.as_str());
        if let Some(entry) = self.store.get_entry(&self.version, &key).await? {
            tracing::debug!(url = %request.url, "cache hit");
            return Ok(cached_response(entry));
        }
        let response = self.network.fetch(&outbound(request)).await?;
        Ok(network_response(&response))
    }

    /// Spawn a best-effort write-back. The response path never waits for
    /// it; failures are logged and otherwise invisible.
    fn write_back(&self, request: &GatewayRequest, response: &FetchResponse) {
        if request.method != "GET" {
            tracing::debug!(method = %request.method, url = %request.url, "skipping write-back for non-GET");
            return;
        }
        let store = self.store.clone();
        let bucket = self.version.clone();
        let entry = stored_response(&request.method, &request.url, response);
        let url = request.url.clone();
        tokio::spawn(async move {
            if let Err(e) = store.put_entry(&bucket, &entry).await {
                tracing::warn!(url = %url, error = %e, "media write-back failed");
            }
        });
    }

    /// Substitute the cached shell for a failed request. When the shell was
    /// never cached there is nothing to degrade to, so the original failure
    /// propagates.
    async fn shell_fallback(&self, cause: Error) -> Result<GatewayResponse, Error> {
        let shell_url = self.asset_url(self.manifest.shell())?;
        let key = entry_key("GET", shell_url.as_str());
        match self.store.get_entry(&self.version, &key).await {
            Ok(Some(entry)) => {
                tracing::warn!(error = %cause, "serving cached shell");
                let mut response = cached_response(entry);
                response.served_from = ServedFrom::ShellFallback;
                Ok(response)
            }
            _ => Err(cause),
        }
    }
}

fn outbound(request: &GatewayRequest) -> OutboundRequest {
    OutboundRequest {
        method: request.method.clone(),
        url: request.url.clone(),
        headers: request.headers.clone(),
        body: request.body.clone(),
    }
}

fn stored_response(method: &str, url: &Url, response: &FetchResponse) -> StoredResponse {
    StoredResponse {
        key: entry_key(method, url.as_str()),
        method: method.to_string(),
        url: url.to_string(),
        status: response.status.as_u16(),
        headers: response
            .headers
            .iter()
            .map(|(name, value)| {
                (name.to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned())
            })
            .collect(),
        body: response.bytes.to_vec(),
        stored_at: Utc::now().to_rfc3339(),
    }
}

fn network_response(response: &FetchResponse) -> GatewayResponse {
    GatewayResponse {
        status: response.status.as_u16(),
        headers: response
            .headers
            .iter()
            .map(|(name, value)| {
                (name.to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned())
            })
            .collect(),
        body: response.bytes.clone(),
        served_from: ServedFrom::Network,
    }
}

fn cached_response(entry: StoredResponse) -> GatewayResponse {
    GatewayResponse {
        status: entry.status,
        headers: entry.headers,
        body: Bytes::from(entry.body),
        served_from: ServedFrom::Cache,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{Destination, RequestMode};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    const ORIGIN: &str = "http://127.0.0.1:5001";

    struct FakeFetch {
        responses: Mutex<HashMap<String, (u16, Vec<u8>)>>,
        offline: AtomicBool,
        calls: AtomicUsize,
    }

    impl FakeFetch {
        fn new() -> Self {
            Self {
                responses: Mutex::new(HashMap::new()),
                offline: AtomicBool::new(false),
                calls: AtomicUsize::new(0),
            }
        }

        /// A fake origin serving every manifest asset with a distinct body.
        fn with_assets(manifest: &AssetManifest) -> Self {
            let fake = Self::new();
            for path in manifest.paths() {
                fake.insert(path, 200, format!("asset body of {path}").as_bytes());
            }
            fake
        }

        fn insert(&self, path: &str, status: u16, body: &[u8]) {
            let url = Url::parse(ORIGIN).unwrap().join(path).unwrap();
            self.responses
                .lock()
                .unwrap()
                .insert(url.to_string(), (status, body.to_vec()));
        }

        fn set_offline(&self, offline: bool) {
            self.offline.store(offline, Ordering::SeqCst);
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Fetch for FakeFetch {
        async fn fetch(&self, request: &OutboundRequest) -> Result<FetchResponse, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.offline.load(Ordering::SeqCst) {
                return Err(Error::Transport("connection refused (simulated)".into()));
            }
            let (status, body) = self
                .responses
                .lock()
                .unwrap()
                .get(request.url.as_str())
                .cloned()
                .unwrap_or((404, b"not found".to_vec()));
            Ok(FetchResponse {
                url: request.url.clone(),
                final_url: request.url.clone(),
                status: reqwest::StatusCode::from_u16(status).unwrap(),
                content_type: None,
                bytes: Bytes::from(body),
                headers: reqwest::header::HeaderMap::new(),
                fetch_ms: 1,
            })
        }
    }

    fn gateway_on(
        store: BucketStore, network: Arc<FakeFetch>, version: &str,
    ) -> Gateway<Arc<FakeFetch>> {
        Gateway::new(store, network, AssetManifest::default(), version.to_string(), ORIGIN).unwrap()
    }

    /// A fresh gateway over an in-memory store with a populated fake origin.
    async fn installed_gateway() -> (Gateway<Arc<FakeFetch>>, Arc<FakeFetch>) {
        let store = BucketStore::open_in_memory().await.unwrap();
        let network = Arc::new(FakeFetch::with_assets(&AssetManifest::default()));
        let gateway = gateway_on(store, Arc::clone(&network), "amharic-tts-v2");
        gateway.on_install().await.unwrap();
        gateway.on_activate().await.unwrap();
        (gateway, network)
    }

    fn navigate(url: Url) -> GatewayRequest {
        let mut request = GatewayRequest::get(url);
        request.mode = RequestMode::Navigate;
        request.destination = Destination::Document;
        request.accept = Some("text/html,application/xhtml+xml".to_string());
        request
    }

    fn media(url: Url, destination: Destination) -> GatewayRequest {
        let mut request = GatewayRequest::get(url);
        request.destination = destination;
        request
    }

    fn asset(path: &str) -> Url {
        Url::parse(ORIGIN).unwrap().join(path).unwrap()
    }

    async fn wait_for_entry(store: &BucketStore, bucket: &str, key: &str) {
        for _ in 0..200 {
            if store.get_entry(bucket, key).await.unwrap().is_some() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("write-back never landed");
    }

    #[tokio::test]
    async fn test_install_caches_manifest_bytes() {
        let (gateway, network) = installed_gateway().await;
        let calls_after_install = network.calls();

        let response = gateway.on_fetch(&GatewayRequest::get(asset("/static/ui.js"))).await.unwrap();

        assert_eq!(response.served_from, ServedFrom::Cache);
        assert_eq!(response.status, 200);
        assert_eq!(&response.body[..], b"asset body of /static/ui.js");
        assert_eq!(network.calls(), calls_after_install);
    }

    #[tokio::test]
    async fn test_navigation_offline_falls_back_to_shell() {
        let (gateway, network) = installed_gateway().await;
        network.set_offline(true);

        let response = gateway.on_fetch(&navigate(asset("/ui"))).await.unwrap();

        assert_eq!(response.served_from, ServedFrom::ShellFallback);
        assert_eq!(&response.body[..], b"asset body of /ui");
    }

    #[tokio::test]
    async fn test_navigation_passes_through_http_errors() {
        let (gateway, network) = installed_gateway().await;
        network.insert("/ui", 503, b"maintenance");

        let response = gateway.on_fetch(&navigate(asset("/ui"))).await.unwrap();

        assert_eq!(response.served_from, ServedFrom::Network);
        assert_eq!(response.status, 503);
        assert_eq!(&response.body[..], b"maintenance");
    }

    #[tokio::test]
    async fn test_media_miss_fetches_then_serves_from_cache() {
        let (gateway, network) = installed_gateway().await;
        network.insert("/audio/tts-42.mp3", 200, b"mp3 bytes");
        let request = media(asset("/audio/tts-42.mp3"), Destination::Audio);

        let first = gateway.on_fetch(&request).await.unwrap();
        assert_eq!(first.served_from, ServedFrom::Network);
        assert_eq!(&first.body[..], b"mp3 bytes");
        let calls_after_first = network.calls();

        let key = entry_key("GET", request.url.as_str());
        wait_for_entry(&gateway.store, "amharic-tts-v2", &key).await;

        let second = gateway.on_fetch(&request).await.unwrap();
        assert_eq!(second.served_from, ServedFrom::Cache);
        assert_eq!(&second.body[..], b"mp3 bytes");
        assert_eq!(network.calls(), calls_after_first);
    }

    #[tokio::test]
    async fn test_media_offline_falls_back_to_shell() {
        let (gateway, network) = installed_gateway().await;
        network.set_offline(true);

        let request = media(asset("/audio/never-seen.mp3"), Destination::Audio);
        let response = gateway.on_fetch(&request).await.unwrap();

        assert_eq!(response.served_from, ServedFrom::ShellFallback);
        assert_eq!(&response.body[..], b"asset body of /ui");
    }

    #[tokio::test]
    async fn test_cross_origin_media_not_cached() {
        let (gateway, _network) = installed_gateway().await;
        let url = Url::parse("https://cdn.example.com/pic.png").unwrap();

        // default strategy: resolved 404 from the fake passes through, and
        // nothing lands in the bucket
        let response = gateway.on_fetch(&media(url.clone(), Destination::Image)).await.unwrap();
        assert_eq!(response.served_from, ServedFrom::Network);
        assert_eq!(response.status, 404);

        let key = entry_key("GET", url.as_str());
        assert!(gateway.store.get_entry("amharic-tts-v2", &key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_activate_leaves_single_bucket() {
        let store = BucketStore::open_in_memory().await.unwrap();
        store.create_bucket("amharic-tts-v1").await.unwrap();
        let network = Arc::new(FakeFetch::with_assets(&AssetManifest::default()));
        let gateway = gateway_on(store, network, "amharic-tts-v2");

        gateway.on_install().await.unwrap();
        gateway.on_activate().await.unwrap();

        let names = gateway.store.bucket_names().await.unwrap();
        assert_eq!(names, vec!["amharic-tts-v2"]);
    }

    #[tokio::test]
    async fn test_version_bump_replaces_bucket() {
        let store = BucketStore::open_in_memory().await.unwrap();
        let network = Arc::new(FakeFetch::with_assets(&AssetManifest::default()));

        let v2 = gateway_on(store.clone(), Arc::clone(&network), "amharic-tts-v2");
        v2.on_install().await.unwrap();
        v2.on_activate().await.unwrap();

        let v3 = gateway_on(store.clone(), Arc::clone(&network), "amharic-tts-v3");
        v3.on_install().await.unwrap();
        v3.on_activate().await.unwrap();

        assert_eq!(store.bucket_names().await.unwrap(), vec!["amharic-tts-v3"]);
        assert_eq!(store.count_entries("amharic-tts-v3").await.unwrap(), 8);
        assert_eq!(store.count_entries("amharic-tts-v2").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_offline_css_served_from_cache() {
        let (gateway, network) = installed_gateway().await;
        network.set_offline(true);

        let mut request = GatewayRequest::get(asset("/static/ui.css"));
        request.destination = Destination::Style;
        let response = gateway.on_fetch(&request).await.unwrap();

        assert_eq!(response.served_from, ServedFrom::Cache);
        assert_eq!(&response.body[..], b"asset body of /static/ui.css");
    }

    #[tokio::test]
    async fn test_install_aborts_on_missing_asset() {
        let store = BucketStore::open_in_memory().await.unwrap();
        let network = Arc::new(FakeFetch::new()); // nothing canned: every asset 404s
        let gateway = gateway_on(store, network, "amharic-tts-v2");

        let result = gateway.on_install().await;
        assert!(matches!(result, Err(Error::ManifestPopulation(_))));
    }

    #[tokio::test]
    async fn test_install_aborts_offline() {
        let store = BucketStore::open_in_memory().await.unwrap();
        let network = Arc::new(FakeFetch::with_assets(&AssetManifest::default()));
        network.set_offline(true);
        let gateway = gateway_on(store, network, "amharic-tts-v2");

        let result = gateway.on_install().await;
        assert!(matches!(result, Err(Error::ManifestPopulation(_))));
    }

    #[tokio::test]
    async fn test_default_strategy_propagates_offline_failure() {
        let (gateway, network) = installed_gateway().await;
        network.set_offline(true);

        let request = GatewayRequest::get(asset("/tts_b64_get?text=selam"));
        let result = gateway.on_fetch(&request).await;

        assert!(matches!(result, Err(Error::Transport(_))));
    }

    #[tokio::test]
    async fn test_shell_fallback_without_install_propagates_cause() {
        let store = BucketStore::open_in_memory().await.unwrap();
        let network = Arc::new(FakeFetch::new());
        network.set_offline(true);
        let gateway = gateway_on(store, network, "amharic-tts-v2");

        let result = gateway.on_fetch(&navigate(asset("/ui"))).await;
        assert!(matches!(result, Err(Error::Transport(_))));
    }

    #[tokio::test]
    async fn test_empty_version_tag_rejected() {
        let store = BucketStore::open_in_memory().await.unwrap();
        let network = Arc::new(FakeFetch::new());
        let result = Gateway::new(store, network, AssetManifest::default(), String::new(), ORIGIN);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
