//! Markdown report rendering
//!
//! Bodies are deterministic: the same route, query and payload always
//! produce the same markdown. Missing fields fall back to defaults and
//! rendering never fails.

use crate::models::{
    ProcurementPayload, ResultPayload, RetrievalPayload, RouteKind, WebResearchPayload,
};
use std::path::Path;
use tracing::warn;

pub mod envelope;
pub use envelope::{compose_envelope, parse_envelope_header, EnvelopeHeader, OUTPUT_SCHEMA};

const PROFILE_EXCERPT_CHARS: usize = 500;
const PROFILE_SOURCE_LIMIT: usize = 3;
const WEB_RESULT_LIMIT: usize = 5;
const WEB_EXCERPT_CHARS: usize = 280;
const CONTEXT_EXCERPT_CHARS: usize = 200;
const PROCUREMENT_ROW_LIMIT: usize = 20;

pub const EMPTY_WEB_HINT: &str =
    "_참고: 결과가 비어있습니다. 쿼리/도메인 제한/키워드 설정을 확인하세요._";
pub const NO_PROCUREMENT_RESULTS: &str = "관련 공고를 찾지 못했습니다.";

/// Render the route-specific markdown body.
///
/// A payload belonging to another route is ignored and the route renders
/// as if nothing was supplied.
pub fn render_body(route: &RouteKind, query: &str, payload: &ResultPayload) -> String {
    if route.is_recognized() && payload.route() != *route {
        warn!(
            route = %route,
            payload_route = %payload.route(),
            "Payload does not belong to route - rendering defaults"
        );
    }

    match route {
        RouteKind::WebResearch => {
            let fallback = WebResearchPayload::default();
            let data = match payload {
                ResultPayload::WebResearch(p) => p,
                _ => &fallback,
            };
            render_web_research(query, data)
        }
        RouteKind::RetrievalSummary => {
            let fallback = RetrievalPayload::default();
            let data = match payload {
                ResultPayload::RetrievalSummary(p) => p,
                _ => &fallback,
            };
            render_retrieval_summary(query, data)
        }
        RouteKind::ProcurementListing => {
            let fallback = ProcurementPayload::default();
            let data = match payload {
                ResultPayload::ProcurementListing(p) => p,
                _ => &fallback,
            };
            render_procurement_listing(query, data)
        }
        RouteKind::Unrecognized(name) => render_unrecognized(name),
    }
}

pub fn render_unrecognized(name: &str) -> String {
    format!("### 결과\n\n(알 수 없는 route: {})", name)
}

/// Cut `text` to `limit` characters, trimming trailing whitespace.
/// Returns whether anything was cut.
fn truncate_chars(text: &str, limit: usize) -> (String, bool) {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => (text[..idx].trim_end().to_string(), true),
        None => (text.trim_end().to_string(), false),
    }
}

fn excerpt_with_ellipsis(text: &str, limit: usize) -> String {
    let (mut short, truncated) = truncate_chars(text, limit);
    if truncated {
        short.push('…');
    }
    short
}

fn flatten_newlines(text: &str) -> String {
    text.trim().replace('\n', " ")
}

/// Prices always show a fractional part: `190.0`, `189.5`.
fn format_price(price: f64) -> String {
    if price.is_finite() && price.fract() == 0.0 && price.abs() < 1e16 {
        format!("{:.1}", price)
    } else {
        price.to_string()
    }
}

pub fn render_web_research(query: &str, payload: &WebResearchPayload) -> String {
    let mut lines = vec![
        "# 웹 리서치 리포트".to_string(),
        format!("- 질의: {}", query),
        String::new(),
    ];

    // ── Price snapshot ──
    if !payload.prices.is_empty() {
        lines.push("## 시세 스냅샷".to_string());
        for quote in &payload.prices {
            let currency = quote
                .currency
                .as_deref()
                .filter(|c| !c.trim().is_empty())
                .map(|c| format!(" {}", c))
                .unwrap_or_default();

            match quote.price {
                Some(price) => {
                    lines.push(format!(
                        "- **{}**: {}{}",
                        quote.symbol,
                        format_price(price),
                        currency
                    ));
                }
                None => {
                    let reason = quote.error.as_deref().unwrap_or("");
                    if reason.trim().is_empty() {
                        lines.push(format!("- **{}**: (가져오기 실패)", quote.symbol));
                    } else {
                        lines.push(format!("- **{}**: (가져오기 실패) — {}", quote.symbol, reason));
                    }
                }
            }
        }
        lines.push(String::new());
    }

    // ── Company profile ──
    let profile = payload.profile();
    if !profile.is_empty() {
        lines.push("## 기업 정보 요약".to_string());
        lines.push(excerpt_with_ellipsis(profile, PROFILE_EXCERPT_CHARS));
        if !payload.profile_sources.is_empty() {
            lines.push(String::new());
            lines.push("**출처(기업 정보):**".to_string());
            for url in payload.profile_sources.iter().take(PROFILE_SOURCE_LIMIT) {
                lines.push(format!("- {}", url));
            }
        }
        lines.push(String::new());
    }

    // ── Top web results ──
    if !payload.web_top.is_empty() {
        lines.push("## 관련 링크 & 발췌".to_string());
        for hit in payload.web_top.iter().take(WEB_RESULT_LIMIT) {
            let url = hit.url.as_deref().unwrap_or("");
            let mut tail = String::new();
            if let Some(source) = hit.source.as_deref().filter(|s| !s.trim().is_empty()) {
                tail.push_str(&format!(" — {}", source));
            }
            if let Some(date) = hit.display_date() {
                tail.push_str(&format!(" ({})", date));
            }
            lines.push(format!("- [{}]({}){}", hit.display_title(), url, tail));

            if let Some(raw) = hit.body_text() {
                let raw = flatten_newlines(raw);
                if !raw.is_empty() {
                    lines.push(format!("  > {}", excerpt_with_ellipsis(&raw, WEB_EXCERPT_CHARS)));
                }
            }
        }
        lines.push(String::new());
    }

    if !payload.chart_paths.is_empty() {
        lines.push("## 📈 주가 추이 그래프".to_string());
        for chart in &payload.chart_paths {
            let name = Path::new(chart)
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(chart);
            lines.push(format!("![{}]({})", name, chart));
        }
        lines.push(String::new());
    }

    if !payload.has_data() {
        lines.push(EMPTY_WEB_HINT.to_string());
        lines.push(String::new());
    }

    lines.join("\n")
}

pub fn render_retrieval_summary(query: &str, payload: &RetrievalPayload) -> String {
    let mut lines = vec![
        "# RAG 요약".to_string(),
        String::new(),
        format!("**질의:** {}", query),
        String::new(),
    ];

    let answer = payload.answer();
    if !answer.is_empty() {
        lines.push("## 초안 요약".to_string());
        lines.push(String::new());
        lines.push(answer.to_string());
        lines.push(String::new());
    }

    if !payload.contexts.is_empty() {
        lines.push("## 근거(Top-K)".to_string());
        lines.push(String::new());
        lines.push("| rank | score | path | chunk_id | excerpt |".to_string());
        lines.push("|---:|---:|---|---:|---|".to_string());
        for (i, ctx) in payload.contexts.iter().enumerate() {
            let excerpt = flatten_newlines(ctx.body_text());
            let (excerpt, _) = truncate_chars(&excerpt, CONTEXT_EXCERPT_CHARS);
            lines.push(format!(
                "| {} | {:.3} | {} | {} | {} |",
                i + 1,
                ctx.score(),
                ctx.resolved_path(),
                ctx.resolved_chunk_id(),
                excerpt
            ));
        }
        lines.push(String::new());
    }

    lines.join("\n")
}

pub fn render_procurement_listing(query: &str, payload: &ProcurementPayload) -> String {
    let mut lines = vec![
        "# 공고 탐색 결과".to_string(),
        format!("- 질의: {}", query),
        String::new(),
    ];

    if payload.items.is_empty() {
        lines.push(NO_PROCUREMENT_RESULTS.to_string());
        return lines.join("\n");
    }

    lines.push("| 제목 | 기관 | 공고번호 | 공고일 | 입찰 마감 | 예산 | 링크 |".to_string());
    lines.push("|---|---|---|---|---|---:|---|".to_string());
    for item in payload.items.iter().take(PROCUREMENT_ROW_LIMIT) {
        let link = item
            .url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .map(|u| format!("[바로가기]({})", u))
            .unwrap_or_else(|| "-".to_string());

        lines.push(format!(
            "| {} | {} | {} | {} | {} | {} | {} |",
            item.title.as_deref().unwrap_or("-"),
            item.agency.as_deref().unwrap_or("-"),
            item.bid_no.as_deref().unwrap_or(""),
            item.announce_date.as_deref().unwrap_or(""),
            item.close_date.as_deref().unwrap_or(""),
            item.budget.as_deref().unwrap_or("-"),
            link,
        ));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PriceQuote, ProcurementItem, RetrievalContext, WebHit};

    fn web(payload: WebResearchPayload) -> ResultPayload {
        ResultPayload::WebResearch(payload)
    }

    #[test]
    fn test_empty_web_research_renders_single_hint() {
        let body = render_body(&RouteKind::WebResearch, "q", &web(WebResearchPayload::default()));

        assert!(!body.is_empty());
        assert_eq!(body.lines().filter(|l| *l == EMPTY_WEB_HINT).count(), 1);
        assert!(!body.lines().any(|l| l.starts_with("## ")));
    }

    #[test]
    fn test_price_formatting() {
        assert_eq!(format_price(190.0), "190.0");
        assert_eq!(format_price(189.5), "189.5");
        assert_eq!(format_price(-3.0), "-3.0");
        assert_eq!(format_price(71200.0), "71200.0");
        assert_eq!(format_price(0.1 + 0.2), "0.30000000000000004");
    }

    #[test]
    fn test_web_research_sections_in_order() {
        let payload = WebResearchPayload {
            prices: vec![
                PriceQuote {
                    symbol: "AAPL".into(),
                    price: Some(189.5),
                    currency: Some("USD".into()),
                    error: None,
                },
                PriceQuote {
                    symbol: "005930.KS".into(),
                    price: None,
                    currency: None,
                    error: Some("timeout".into()),
                },
            ],
            company_profile: Some("Apple designs phones.".into()),
            profile_sources: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            web_top: vec![WebHit {
                title: Some("Apple earnings".into()),
                url: Some("https://news.example/aapl".into()),
                source: Some("Example News".into()),
                published_date: Some("2024-05-02".into()),
                content: Some("line one\nline two".into()),
                ..Default::default()
            }],
            chart_paths: vec![],
        };

        let body = render_web_research("AAPL 주가", &payload);

        let snapshot = body.find("## 시세 스냅샷").unwrap();
        let profile = body.find("## 기업 정보 요약").unwrap();
        let links = body.find("## 관련 링크 & 발췌").unwrap();
        assert!(snapshot < profile && profile < links);

        assert!(body.contains("- **AAPL**: 189.5 USD"));
        assert!(body.contains("- **005930.KS**: (가져오기 실패) — timeout"));
        assert!(body.contains("- c\n"));
        assert!(!body.contains("- d\n"));
        assert!(body.contains(
            "- [Apple earnings](https://news.example/aapl) — Example News (2024-05-02)"
        ));
        assert!(body.contains("  > line one line two"));
        assert!(!body.contains(EMPTY_WEB_HINT));
    }

    #[test]
    fn test_web_research_truncation() {
        let long_profile = "가".repeat(600);
        let hits: Vec<WebHit> = (0..7)
            .map(|i| WebHit {
                title: Some(format!("hit-{}", i)),
                url: Some(format!("https://x/{}", i)),
                snippet: Some("x".repeat(300)),
                ..Default::default()
            })
            .collect();
        let payload = WebResearchPayload {
            company_profile: Some(long_profile),
            web_top: hits,
            ..Default::default()
        };

        let body = render_web_research("q", &payload);

        assert!(body.contains(&format!("{}…", "가".repeat(500))));
        assert!(!body.contains(&"가".repeat(501)));
        assert!(body.contains("hit-4"));
        assert!(!body.contains("hit-5"));
        assert!(body.contains(&format!("  > {}…", "x".repeat(280))));
    }

    #[test]
    fn test_retrieval_summary_table() {
        let payload = RetrievalPayload {
            answer: Some("  초안 답변  \n".into()),
            contexts: vec![
                RetrievalContext {
                    score: Some(0.91234),
                    path: Some("docs/a.md".into()),
                    id: Some("c1".into()),
                    text: Some("first\nchunk".into()),
                    ..Default::default()
                },
                RetrievalContext {
                    content: Some("z".repeat(250)),
                    ..Default::default()
                },
            ],
        };

        let body = render_body(
            &RouteKind::RetrievalSummary,
            "질문",
            &ResultPayload::RetrievalSummary(payload),
        );

        assert!(body.contains("## 초안 요약\n\n초안 답변\n"));
        assert!(body.contains("| 1 | 0.912 | docs/a.md | c1 | first chunk |"));
        assert!(body.contains(&format!("| 2 | 0.000 |  |  | {} |", "z".repeat(200))));
    }

    #[test]
    fn test_procurement_empty_renders_no_results() {
        let body = render_body(
            &RouteKind::ProcurementListing,
            "AI 바우처",
            &ResultPayload::ProcurementListing(ProcurementPayload::default()),
        );
        assert!(body.contains(NO_PROCUREMENT_RESULTS));
        assert!(!body.contains("| 제목 |"));
    }

    #[test]
    fn test_procurement_rows_capped_and_defaulted() {
        let mut items: Vec<ProcurementItem> = (0..25)
            .map(|i| ProcurementItem {
                title: Some(format!("공고-{}", i)),
                url: Some(format!("https://g2b.example/{}", i)),
                ..Default::default()
            })
            .collect();
        items[0] = ProcurementItem::default();

        let body = render_procurement_listing("q", &ProcurementPayload { items });

        assert!(body.contains("| - | - |  |  |  | - | - |"));
        assert!(body.contains("[바로가기](https://g2b.example/19)"));
        assert!(!body.contains("공고-20"));
    }

    #[test]
    fn test_unrecognized_route_placeholder() {
        let body = render_body(
            &RouteKind::Unrecognized("weather".into()),
            "q",
            &web(WebResearchPayload::default()),
        );
        assert_eq!(body, "### 결과\n\n(알 수 없는 route: weather)");
    }

    #[test]
    fn test_mismatched_payload_renders_route_defaults() {
        let body = render_body(
            &RouteKind::ProcurementListing,
            "q",
            &web(WebResearchPayload::default()),
        );
        assert!(body.contains(NO_PROCUREMENT_RESULTS));
    }
}
