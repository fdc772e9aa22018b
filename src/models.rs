//! Core data models for the report orchestrator

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::convert::Infallible;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

//
// ================= Route =================
//

/// Category of report being produced. Decides which renderer runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RouteKind {
    WebResearch,
    RetrievalSummary,
    ProcurementListing,
    /// Anything else a caller asked for. Kept verbatim for the placeholder body.
    Unrecognized(String),
}

impl RouteKind {
    pub fn as_str(&self) -> &str {
        match self {
            RouteKind::WebResearch => "web_research",
            RouteKind::RetrievalSummary => "retrieval_summary",
            RouteKind::ProcurementListing => "procurement_listing",
            RouteKind::Unrecognized(name) => name,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, RouteKind::Unrecognized(_))
    }
}

impl FromStr for RouteKind {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let route = match s.trim().to_lowercase().as_str() {
            "web_research" | "web" | "day1" => RouteKind::WebResearch,
            "retrieval_summary" | "rag" | "day2" => RouteKind::RetrievalSummary,
            "procurement_listing" | "procurement" | "pps" | "day3" => {
                RouteKind::ProcurementListing
            }
            _ => RouteKind::Unrecognized(s.to_string()),
        };
        Ok(route)
    }
}

impl From<String> for RouteKind {
    fn from(s: String) -> Self {
        match s.parse::<RouteKind>() {
            Ok(route) => route,
            Err(never) => match never {},
        }
    }
}

impl From<RouteKind> for String {
    fn from(route: RouteKind) -> Self {
        route.as_str().to_string()
    }
}

impl fmt::Display for RouteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Accepts a string, number or bool and keeps its textual form.
/// Upstream services are inconsistent about identifier and budget types.
fn de_opt_stringish<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

/// Accepts a number or a numeric string; anything else becomes `None`.
fn de_opt_f64ish<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    })
}

/// First candidate that is present and not blank.
pub(crate) fn first_present<'a>(candidates: &[Option<&'a str>]) -> Option<&'a str> {
    candidates
        .iter()
        .flatten()
        .copied()
        .find(|s| !s.trim().is_empty())
}

//
// ================= Web Research =================
//

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PriceQuote {
    #[serde(default)]
    pub symbol: String,
    #[serde(default, deserialize_with = "de_opt_f64ish")]
    pub price: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    /// Reason the quote could not be fetched
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WebHit {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub published_date: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
}

impl WebHit {
    pub fn display_title(&self) -> &str {
        first_present(&[self.title.as_deref(), self.url.as_deref()]).unwrap_or("link")
    }

    pub fn display_date(&self) -> Option<&str> {
        first_present(&[self.published_date.as_deref(), self.date.as_deref()])
    }

    pub fn body_text(&self) -> Option<&str> {
        first_present(&[self.content.as_deref(), self.snippet.as_deref()])
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WebResearchPayload {
    #[serde(default)]
    pub prices: Vec<PriceQuote>,
    #[serde(default)]
    pub company_profile: Option<String>,
    #[serde(default)]
    pub profile_sources: Vec<String>,
    #[serde(default)]
    pub web_top: Vec<WebHit>,
    #[serde(default)]
    pub chart_paths: Vec<String>,
}

impl WebResearchPayload {
    pub fn profile(&self) -> &str {
        self.company_profile.as_deref().map(str::trim).unwrap_or("")
    }

    pub fn has_data(&self) -> bool {
        !self.prices.is_empty() || !self.profile().is_empty() || !self.web_top.is_empty()
    }
}

//
// ================= Retrieval Summary =================
//

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ContextMeta {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default, deserialize_with = "de_opt_stringish")]
    pub chunk: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RetrievalContext {
    #[serde(default, deserialize_with = "de_opt_f64ish")]
    pub score: Option<f64>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub meta: Option<ContextMeta>,
    #[serde(default, deserialize_with = "de_opt_stringish")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "de_opt_stringish")]
    pub chunk_id: Option<String>,
    #[serde(default, deserialize_with = "de_opt_stringish")]
    pub chunk_index: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub chunk: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

impl RetrievalContext {
    pub fn score(&self) -> f64 {
        self.score.unwrap_or(0.0)
    }

    /// `path`, then `meta.path`
    pub fn resolved_path(&self) -> &str {
        let meta_path = self.meta.as_ref().and_then(|m| m.path.as_deref());
        first_present(&[self.path.as_deref(), meta_path]).unwrap_or("")
    }

    /// `id`, then `meta.chunk`, then `chunk_id`, then `chunk_index`
    pub fn resolved_chunk_id(&self) -> &str {
        let meta_chunk = self.meta.as_ref().and_then(|m| m.chunk.as_deref());
        first_present(&[
            self.id.as_deref(),
            meta_chunk,
            self.chunk_id.as_deref(),
            self.chunk_index.as_deref(),
        ])
        .unwrap_or("")
    }

    /// `text`, then `chunk`, then `content`
    pub fn body_text(&self) -> &str {
        first_present(&[
            self.text.as_deref(),
            self.chunk.as_deref(),
            self.content.as_deref(),
        ])
        .unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RetrievalPayload {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub contexts: Vec<RetrievalContext>,
}

impl RetrievalPayload {
    pub fn answer(&self) -> &str {
        self.answer.as_deref().map(str::trim).unwrap_or("")
    }

    pub fn has_data(&self) -> bool {
        !self.answer().is_empty() || !self.contexts.is_empty()
    }
}

//
// ================= Procurement Listing =================
//

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProcurementItem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub agency: Option<String>,
    #[serde(default, deserialize_with = "de_opt_stringish")]
    pub bid_no: Option<String>,
    #[serde(default)]
    pub announce_date: Option<String>,
    #[serde(default)]
    pub close_date: Option<String>,
    #[serde(default, deserialize_with = "de_opt_stringish")]
    pub budget: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProcurementPayload {
    #[serde(default)]
    pub items: Vec<ProcurementItem>,
}

impl ProcurementPayload {
    pub fn has_data(&self) -> bool {
        !self.items.is_empty()
    }
}

//
// ================= Result Payload =================
//

/// Route-specific data handed over by an upstream source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "route", content = "payload", rename_all = "snake_case")]
pub enum ResultPayload {
    WebResearch(WebResearchPayload),
    RetrievalSummary(RetrievalPayload),
    ProcurementListing(ProcurementPayload),
}

impl ResultPayload {
    pub fn route(&self) -> RouteKind {
        match self {
            ResultPayload::WebResearch(_) => RouteKind::WebResearch,
            ResultPayload::RetrievalSummary(_) => RouteKind::RetrievalSummary,
            ResultPayload::ProcurementListing(_) => RouteKind::ProcurementListing,
        }
    }

    pub fn has_data(&self) -> bool {
        match self {
            ResultPayload::WebResearch(p) => p.has_data(),
            ResultPayload::RetrievalSummary(p) => p.has_data(),
            ResultPayload::ProcurementListing(p) => p.has_data(),
        }
    }

    /// Deserialize an untagged upstream body as the payload of `route`.
    pub fn from_route_json(route: &RouteKind, body: Value) -> Option<serde_json::Result<Self>> {
        let parsed = match route {
            RouteKind::WebResearch => serde_json::from_value(body).map(ResultPayload::WebResearch),
            RouteKind::RetrievalSummary => {
                serde_json::from_value(body).map(ResultPayload::RetrievalSummary)
            }
            RouteKind::ProcurementListing => {
                serde_json::from_value(body).map(ResultPayload::ProcurementListing)
            }
            RouteKind::Unrecognized(_) => return None,
        };
        Some(parsed)
    }
}

//
// ================= Request / Outcome =================
//

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportRequest {
    pub query: String,
    #[serde(default)]
    pub route: Option<RouteKind>,
    #[serde(default)]
    pub filename_hint: Option<String>,
}

impl ReportRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_route(mut self, route: RouteKind) -> Self {
        self.route = Some(route);
        self
    }

    pub fn with_filename_hint(mut self, hint: impl Into<String>) -> Self {
        self.filename_hint = Some(hint.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportOutcome {
    pub request_id: Uuid,
    pub route: RouteKind,
    pub saved_path: PathBuf,
    /// Enveloped markdown, identical to the file contents
    pub markdown: String,
    /// False when the source returned nothing to report
    pub has_data: bool,
}
