//! Payload sources and registry
//!
//! A source is the upstream collaborator that gathers data for one route
//! (web hits and quotes, retrieval contexts, procurement listings).
//! HTTP-backed sources call the configured report data service.

use crate::config::AppConfig;
use crate::error::ReportError;
use crate::models::{ResultPayload, RouteKind};
use crate::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// What a source is asked for
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SourceRequest {
    pub query: String,
    /// Normalized, plausibility-filtered tickers (web research only)
    #[serde(default)]
    pub tickers: Vec<String>,
}

/// Trait for a single route's data collaborator
#[async_trait::async_trait]
pub trait PayloadSource: Send + Sync {
    fn route(&self) -> RouteKind;
    fn description(&self) -> &'static str;
    async fn fetch(&self, request: &SourceRequest) -> Result<ResultPayload>;
}

/// Source registry keyed by route
pub struct SourceRegistry {
    sources: HashMap<RouteKind, Arc<dyn PayloadSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self {
            sources: HashMap::new(),
        }
    }

    pub fn register(&mut self, source: Arc<dyn PayloadSource>) {
        self.sources.insert(source.route(), source);
    }

    pub fn get(&self, route: &RouteKind) -> Option<Arc<dyn PayloadSource>> {
        self.sources.get(route).cloned()
    }

    pub fn routes(&self) -> Vec<&RouteKind> {
        self.sources.keys().collect()
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
struct ReportApiClient {
    client: Client,
    base_url: String,
}

impl ReportApiClient {
    /// `Ok(None)` when no base URL is configured.
    fn from_config(config: &AppConfig) -> Result<Option<Self>> {
        let Some(base_url) = config.report_api_base_url.clone() else {
            return Ok(None);
        };

        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                ReportError::ConfigError(format!("Failed to build report API client: {}", e))
            })?;

        Ok(Some(Self { client, base_url }))
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                ReportError::SourceError(format!("Report API request failed for {}: {}", path, e))
            })?;

        let status = response.status();
        let body = response
            .json::<Value>()
            .await
            .map_err(|e| ReportError::SourceError(format!("Invalid JSON response: {}", e)))?;

        if !status.is_success() {
            return Err(ReportError::SourceError(format!(
                "Report API returned {} for {}: {}",
                status, path, body
            )));
        }

        Ok(body)
    }
}

/// Upstream payloads are sometimes wrapped as `{"data": {...}}`.
fn unwrap_data(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.get("data").map_or(false, Value::is_object) => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Source backed by `POST <base>/api/v1/<route>`
pub struct HttpPayloadSource {
    route: RouteKind,
    api: Option<ReportApiClient>,
}

impl HttpPayloadSource {
    fn new(route: RouteKind, api: Option<ReportApiClient>) -> Self {
        Self { route, api }
    }

    fn endpoint(&self) -> String {
        format!("/api/v1/{}", self.route.as_str())
    }
}

#[async_trait::async_trait]
impl PayloadSource for HttpPayloadSource {
    fn route(&self) -> RouteKind {
        self.route.clone()
    }

    fn description(&self) -> &'static str {
        match self.route {
            RouteKind::WebResearch => "Web search, price quotes and company profile",
            RouteKind::RetrievalSummary => "Draft answer with ranked contexts from the local index",
            RouteKind::ProcurementListing => "Public procurement notices",
            RouteKind::Unrecognized(_) => "Unrecognized route",
        }
    }

    async fn fetch(&self, request: &SourceRequest) -> Result<ResultPayload> {
        let api = self.api.as_ref().ok_or_else(|| {
            ReportError::SourceError("REPORT_API_BASE_URL is not configured".to_string())
        })?;

        let endpoint = self.endpoint();
        debug!(
            endpoint = %endpoint,
            tickers = ?request.tickers,
            "Fetching payload"
        );

        let body = api
            .post_json(&endpoint, &serde_json::to_value(request)?)
            .await?;

        ResultPayload::from_route_json(&self.route, unwrap_data(body))
            .ok_or_else(|| ReportError::UnknownRoute(self.route.to_string()))?
            .map_err(ReportError::from)
    }
}

/// Returns the same payload for every request
pub struct StaticPayloadSource {
    payload: ResultPayload,
}

impl StaticPayloadSource {
    pub fn new(payload: ResultPayload) -> Self {
        Self { payload }
    }
}

#[async_trait::async_trait]
impl PayloadSource for StaticPayloadSource {
    fn route(&self) -> RouteKind {
        self.payload.route()
    }

    fn description(&self) -> &'static str {
        "Fixed payload"
    }

    async fn fetch(&self, _request: &SourceRequest) -> Result<ResultPayload> {
        Ok(self.payload.clone())
    }
}

/// Registry with an HTTP-backed source for every route.
pub fn create_default_registry(config: &AppConfig) -> Result<SourceRegistry> {
    let mut registry = SourceRegistry::new();
    let api = ReportApiClient::from_config(config)?;

    for route in [
        RouteKind::WebResearch,
        RouteKind::RetrievalSummary,
        RouteKind::ProcurementListing,
    ] {
        registry.register(Arc::new(HttpPayloadSource::new(route, api.clone())));
    }

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProcurementPayload, WebResearchPayload};
    use serde_json::json;

    #[test]
    fn test_default_registry_covers_routes() {
        let registry = create_default_registry(&AppConfig::default()).unwrap();

        assert_eq!(registry.routes().len(), 3);
        assert!(registry.get(&RouteKind::WebResearch).is_some());
        assert!(registry.get(&RouteKind::Unrecognized("x".into())).is_none());
    }

    #[test]
    fn test_unconfigured_http_source_fails() {
        let registry = create_default_registry(&AppConfig::default()).unwrap();
        let source = registry.get(&RouteKind::ProcurementListing).unwrap();

        let result = tokio_test::block_on(source.fetch(&SourceRequest {
            query: "AI 바우처".into(),
            tickers: vec![],
        }));

        assert!(
            matches!(result, Err(ReportError::SourceError(ref m)) if m.contains("not configured"))
        );
    }

    #[test]
    fn test_client_built_only_with_base_url() {
        assert!(ReportApiClient::from_config(&AppConfig::default())
            .unwrap()
            .is_none());

        let config = AppConfig {
            report_api_base_url: Some("http://127.0.0.1:9".into()),
            ..AppConfig::default()
        };
        let api = ReportApiClient::from_config(&config).unwrap().unwrap();
        assert_eq!(api.base_url, "http://127.0.0.1:9");
    }

    #[tokio::test]
    async fn test_static_source_registers_under_payload_route() {
        let mut registry = SourceRegistry::new();
        registry.register(Arc::new(StaticPayloadSource::new(
            ResultPayload::ProcurementListing(ProcurementPayload::default()),
        )));

        let source = registry.get(&RouteKind::ProcurementListing).unwrap();
        let payload = source.fetch(&SourceRequest::default()).await.unwrap();
        assert_eq!(payload.route(), RouteKind::ProcurementListing);
    }

    #[test]
    fn test_endpoint_and_unwrap() {
        let source = HttpPayloadSource::new(RouteKind::RetrievalSummary, None);
        assert_eq!(source.endpoint(), "/api/v1/retrieval_summary");

        let wrapped = json!({"data": {"answer": "x"}, "success": true});
        assert_eq!(unwrap_data(wrapped), json!({"answer": "x"}));

        let bare = json!({"prices": [], "data": "not an object"});
        assert_eq!(unwrap_data(bare.clone()), bare);

        let payload = ResultPayload::from_route_json(&RouteKind::WebResearch, json!({}))
            .unwrap()
            .unwrap();
        assert_eq!(payload, ResultPayload::WebResearch(WebResearchPayload::default()));
    }
}
