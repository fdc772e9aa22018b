//! Main orchestrator - turns a query into a saved report
//!
//! ROUTE → EXTRACT → FETCH → RENDER → PERSIST

use crate::classifier::RouteClassifier;
use crate::config::AppConfig;
use crate::error::ReportError;
use crate::models::{ReportOutcome, ReportRequest, RouteKind};
use crate::paths::OutputDirResolver;
use crate::sources::{create_default_registry, SourceRegistry, SourceRequest};
use crate::symbols::{extract_candidates, filter_plausible, normalize_regional};
use crate::writer::ReportWriter;
use crate::Result;
use chrono::Utc;
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Default ticker plausibility check: rejects known non-ticker words.
#[derive(Debug, Clone, Default)]
pub struct TickerFilter {
    denylist: HashSet<String>,
}

impl TickerFilter {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            denylist: words
                .into_iter()
                .map(|w| w.as_ref().trim().to_uppercase())
                .collect(),
        }
    }

    pub fn looks_like_ticker(&self, symbol: &str) -> bool {
        !self.denylist.contains(&symbol.to_uppercase())
    }
}

/// Tickers for a web research query, ready for the price source.
pub fn tickers_for_query(query: &str, filter: &TickerFilter) -> Vec<String> {
    let candidates = extract_candidates(query);
    let normalized = normalize_regional(&candidates);
    filter_plausible(normalized, |s| filter.looks_like_ticker(s))
}

/// Main orchestrator that coordinates the entire workflow
pub struct Orchestrator {
    sources: SourceRegistry,
    writer: ReportWriter,
    ticker_filter: TickerFilter,
}

impl Orchestrator {
    pub fn new(sources: SourceRegistry, writer: ReportWriter, ticker_filter: TickerFilter) -> Self {
        Self {
            sources,
            writer,
            ticker_filter,
        }
    }

    /// Orchestrator with HTTP sources and output settings from `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self::new(
            create_default_registry(config)?,
            ReportWriter::new(OutputDirResolver::new(config.output.clone())),
            TickerFilter::new(&config.ticker_denylist),
        ))
    }

    pub async fn handle(&self, request: ReportRequest) -> Result<ReportOutcome> {
        let start_time = Instant::now();
        let request_id = Uuid::new_v4();

        let route = request
            .route
            .clone()
            .unwrap_or_else(|| RouteClassifier::classify(&request.query));

        info!(
            request_id = %request_id,
            route = %route,
            query = %request.query,
            "Orchestrator: handling report request"
        );

        if !route.is_recognized() {
            warn!(request_id = %request_id, route = %route, "Unknown route requested");
            return Err(ReportError::UnknownRoute(route.to_string()));
        }

        // === EXTRACT ===
        let tickers = if route == RouteKind::WebResearch {
            tickers_for_query(&request.query, &self.ticker_filter)
        } else {
            Vec::new()
        };
        debug!(request_id = %request_id, ?tickers, "Tickers extracted");

        // === FETCH ===
        let source = self
            .sources
            .get(&route)
            .ok_or_else(|| ReportError::SourceNotFound(route.to_string()))?;

        let source_request = SourceRequest {
            query: request.query.clone(),
            tickers,
        };
        let payload = source.fetch(&source_request).await.map_err(|e| {
            warn!(request_id = %request_id, error = %e, "Source fetch failed");
            e
        })?;

        if payload.route() != route {
            warn!(
                request_id = %request_id,
                route = %route,
                payload_route = %payload.route(),
                "Source returned a payload for another route"
            );
        }

        // === RENDER + PERSIST ===
        let saved = self.writer.save(
            &route,
            &request.query,
            &payload,
            request.filename_hint.as_deref(),
            Utc::now(),
        )?;

        let has_data = payload.route() == route && payload.has_data();

        info!(
            request_id = %request_id,
            path = %saved.path.display(),
            has_data,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Report complete"
        );

        Ok(ReportOutcome {
            request_id,
            route,
            saved_path: saved.path,
            markdown: saved.markdown,
            has_data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        PriceQuote, ProcurementPayload, ResultPayload, WebResearchPayload,
    };
    use crate::paths::OutputConfig;
    use crate::render::parse_envelope_header;
    use crate::sources::{PayloadSource, StaticPayloadSource};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// Records the request it receives
    struct RecordingSource {
        seen: Mutex<Vec<SourceRequest>>,
        payload: ResultPayload,
    }

    #[async_trait::async_trait]
    impl PayloadSource for RecordingSource {
        fn route(&self) -> RouteKind {
            self.payload.route()
        }

        fn description(&self) -> &'static str {
            "recording"
        }

        async fn fetch(&self, request: &SourceRequest) -> Result<ResultPayload> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(self.payload.clone())
        }
    }

    struct FailingSource;

    #[async_trait::async_trait]
    impl PayloadSource for FailingSource {
        fn route(&self) -> RouteKind {
            RouteKind::RetrievalSummary
        }

        fn description(&self) -> &'static str {
            "failing"
        }

        async fn fetch(&self, _request: &SourceRequest) -> Result<ResultPayload> {
            Err(ReportError::SourceError("index offline".into()))
        }
    }

    fn writer_in(dir: &TempDir) -> ReportWriter {
        ReportWriter::new(OutputDirResolver::new(OutputConfig {
            override_dir: Some(dir.path().display().to_string()),
            anchor: None,
        }))
    }

    #[test]
    fn test_tickers_for_query() {
        let filter = TickerFilter::new(["NIPA", "vs"]);

        assert_eq!(
            tickers_for_query("NIPA 바우처 AAPL vs 005930", &filter),
            vec!["AAPL", "005930.KS"]
        );
        assert!(filter.looks_like_ticker("TSLA"));
        assert!(!filter.looks_like_ticker("nipa"));
    }

    #[test]
    fn test_from_config_builds_http_sources() {
        let config = AppConfig {
            report_api_base_url: Some("http://127.0.0.1:9".into()),
            ..AppConfig::default()
        };
        let orchestrator = Orchestrator::from_config(&config).unwrap();
        assert_eq!(orchestrator.sources.routes().len(), 3);
    }

    #[tokio::test]
    async fn test_web_research_flow() {
        let tmp = TempDir::new().unwrap();
        let source = Arc::new(RecordingSource {
            seen: Mutex::new(Vec::new()),
            payload: ResultPayload::WebResearch(WebResearchPayload {
                prices: vec![PriceQuote {
                    symbol: "AAPL".into(),
                    price: Some(190.0),
                    currency: Some("USD".into()),
                    error: None,
                }],
                ..Default::default()
            }),
        });
        let mut registry = SourceRegistry::new();
        registry.register(source.clone());

        let orchestrator =
            Orchestrator::new(registry, writer_in(&tmp), TickerFilter::new(["AI"]));

        let outcome = orchestrator
            .handle(ReportRequest::new("AI 테마 AAPL 주가 알려줘"))
            .await
            .unwrap();

        assert_eq!(outcome.route, RouteKind::WebResearch);
        assert!(outcome.has_data);
        assert!(outcome.saved_path.starts_with(tmp.path()));
        assert_eq!(
            std::fs::read_to_string(&outcome.saved_path).unwrap(),
            outcome.markdown
        );
        assert!(outcome.markdown.contains("- **AAPL**: 190.0 USD"));

        let seen = source.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].tickers, vec!["AAPL"]);
    }

    #[tokio::test]
    async fn test_explicit_route_and_hint() {
        let tmp = TempDir::new().unwrap();
        let mut registry = SourceRegistry::new();
        registry.register(Arc::new(StaticPayloadSource::new(
            ResultPayload::ProcurementListing(ProcurementPayload::default()),
        )));
        let orchestrator = Orchestrator::new(registry, writer_in(&tmp), TickerFilter::default());

        let outcome = orchestrator
            .handle(
                ReportRequest::new("AAPL 주가")
                    .with_route(RouteKind::ProcurementListing)
                    .with_filename_hint("tenders"),
            )
            .await
            .unwrap();

        assert!(!outcome.has_data);
        let name = outcome.saved_path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.ends_with("__procurement_listing__tenders.md"), "{}", name);

        let header = parse_envelope_header(&outcome.markdown).unwrap();
        assert_eq!(header.route, "procurement_listing");
        assert_eq!(header.saved, outcome.saved_path.to_string_lossy());
    }

    #[tokio::test]
    async fn test_error_kinds_are_distinct() {
        let tmp = TempDir::new().unwrap();
        let mut registry = SourceRegistry::new();
        registry.register(Arc::new(FailingSource));
        let orchestrator = Orchestrator::new(registry, writer_in(&tmp), TickerFilter::default());

        let unknown = orchestrator
            .handle(ReportRequest::new("q").with_route(RouteKind::Unrecognized("weather".into())))
            .await;
        assert!(matches!(unknown, Err(ReportError::UnknownRoute(r)) if r == "weather"));

        let missing = orchestrator
            .handle(ReportRequest::new("q").with_route(RouteKind::WebResearch))
            .await;
        assert!(matches!(missing, Err(ReportError::SourceNotFound(_))));

        let failed = orchestrator
            .handle(ReportRequest::new("문서 근거로 요약"))
            .await;
        assert!(matches!(failed, Err(ReportError::SourceError(_))));

        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }
}
