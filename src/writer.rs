//! Report persistence
//!
//! Filenames follow `<YYYYMMDD_HHMMSS>__<route>__<slug>.md`. Timestamps are
//! always taken at UTC+09:00 so names stay consistent across hosts. Two
//! writes with the same route and slug inside one second overwrite each other.

use crate::error::ReportError;
use crate::models::{ResultPayload, RouteKind};
use crate::paths::OutputDirResolver;
use crate::render::{compose_envelope, render_body};
use crate::Result;
use chrono::{DateTime, Duration, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const SLUG_MAX_CHARS: usize = 80;
const SLUG_FALLBACK: &str = "output";
const REPORT_UTC_OFFSET_HOURS: i64 = 9;

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref SLUG_DISALLOWED: Regex = Regex::new(r"[^0-9A-Za-z가-힣\-_]+").unwrap();
}

/// Filesystem-safe token: whitespace runs become `-`, everything except
/// ASCII alphanumerics, Hangul syllables, `-` and `_` is dropped.
pub fn slugify(text: &str) -> String {
    let dashed = WHITESPACE.replace_all(text.trim(), "-");
    let kept = SLUG_DISALLOWED.replace_all(&dashed, "");
    let slug: String = kept.chars().take(SLUG_MAX_CHARS).collect();

    if slug.is_empty() {
        SLUG_FALLBACK.to_string()
    } else {
        slug
    }
}

/// `YYYYMMDD_HHMMSS` at UTC+09:00
pub fn report_timestamp(now: DateTime<Utc>) -> String {
    (now.naive_utc() + Duration::hours(REPORT_UTC_OFFSET_HOURS))
        .format("%Y%m%d_%H%M%S")
        .to_string()
}

pub fn report_filename(
    route: &RouteKind,
    query: &str,
    filename_hint: Option<&str>,
    now: DateTime<Utc>,
) -> String {
    let base = filename_hint
        .filter(|h| !h.trim().is_empty())
        .or(Some(query).filter(|q| !q.trim().is_empty()))
        .unwrap_or("query");

    format!(
        "{}__{}__{}.md",
        report_timestamp(now),
        slugify(route.as_str()),
        slugify(base)
    )
}

/// A report written to disk
#[derive(Debug, Clone)]
pub struct SavedReport {
    pub path: PathBuf,
    pub markdown: String,
}

pub struct ReportWriter {
    resolver: OutputDirResolver,
}

impl ReportWriter {
    pub fn new(resolver: OutputDirResolver) -> Self {
        Self { resolver }
    }

    pub fn output_dir(&self) -> &Path {
        self.resolver.resolve()
    }

    /// Render, envelope and save a report. Returns the absolute path written.
    pub fn persist(
        &self,
        route: &RouteKind,
        query: &str,
        payload: &ResultPayload,
        filename_hint: Option<&str>,
    ) -> Result<PathBuf> {
        self.save(route, query, payload, filename_hint, Utc::now())
            .map(|saved| saved.path)
    }

    pub fn save(
        &self,
        route: &RouteKind,
        query: &str,
        payload: &ResultPayload,
        filename_hint: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<SavedReport> {
        let path = self
            .output_dir()
            .join(report_filename(route, query, filename_hint, now));

        let body = render_body(route, query, payload);
        let markdown = compose_envelope(route, query, &body, &path.to_string_lossy());

        write_text(&path, &markdown)?;

        info!(
            route = %route,
            path = %path.display(),
            bytes = markdown.len(),
            "Report saved"
        );

        Ok(SavedReport { path, markdown })
    }

    /// Save markdown that was rendered elsewhere, without an envelope.
    pub fn persist_text(
        &self,
        route: &RouteKind,
        query: &str,
        markdown: &str,
        filename_hint: Option<&str>,
    ) -> Result<PathBuf> {
        let path = self
            .output_dir()
            .join(report_filename(route, query, filename_hint, Utc::now()));

        write_text(&path, markdown)?;

        info!(route = %route, path = %path.display(), "Markdown saved");
        Ok(path)
    }
}

/// Create parent directories, then write the whole file.
fn write_text(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ReportError::write(parent, e))?;
    }
    fs::write(path, text).map_err(|e| ReportError::write(path, e))
}
