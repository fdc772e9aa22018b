//! Research Report Orchestrator
//!
//! Turns user queries into saved markdown reports:
//! - Picks a report route (web research, retrieval summary, procurement listing)
//! - Extracts and normalizes ticker symbols from the query
//! - Fetches the route's payload from an upstream source
//! - Renders a deterministic markdown body wrapped in a metadata envelope
//! - Persists it under the resolved output directory
//!
//! FLOW:
//! QUERY → ROUTE → EXTRACT → FETCH → RENDER → PERSIST

pub mod agent;
pub mod api;
pub mod classifier;
pub mod config;
pub mod error;
pub mod models;
pub mod paths;
pub mod render;
pub mod sources;
pub mod symbols;
pub mod writer;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use classifier::RouteClassifier;
pub use symbols::{extract_candidates, filter_plausible, normalize_regional};
