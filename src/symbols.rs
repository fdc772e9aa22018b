//! Ticker symbol extraction
//!
//! Pulls candidate tickers out of free-text queries:
//! - alphabetic symbols: 1-5 uppercase ASCII letters ("AAPL")
//! - regional numeric codes: exactly 6 digits ("005930"), later suffixed with ".KS"

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

/// Market suffix for 6-digit domestic instrument codes
pub const REGIONAL_SUFFIX: &str = ".KS";

lazy_static! {
    static ref SEPARATORS: Regex = Regex::new(r"[/,|]").unwrap();
    static ref ALPHA_SYMBOL: Regex = Regex::new(r"\b[A-Z]{1,5}\b").unwrap();
    static ref NUMERIC_SYMBOL: Regex = Regex::new(r"\b[0-9]{6}\b").unwrap();
    static ref NUMERIC_EXACT: Regex = Regex::new(r"^[0-9]{6}$").unwrap();
}

/// Extract ticker candidates from a query.
///
/// Alphabetic hits come first, then numeric hits; duplicates keep their first position.
/// Dotted symbols such as "BRK.B" are not recognised as a unit.
pub fn extract_candidates(query: &str) -> Vec<String> {
    let upper = query.to_uppercase();
    let cleaned = SEPARATORS.replace_all(&upper, " ");

    let alpha = ALPHA_SYMBOL.find_iter(&cleaned);
    let numeric = NUMERIC_SYMBOL.find_iter(&cleaned);

    let mut seen = HashSet::new();
    alpha
        .chain(numeric)
        .map(|m| m.as_str())
        .filter(|sym| seen.insert(*sym))
        .map(str::to_string)
        .collect()
}

/// Append the regional suffix to bare 6-digit codes.
///
/// Already-suffixed symbols do not match the 6-digit rule, so calling this twice is harmless.
pub fn normalize_regional(symbols: &[String]) -> Vec<String> {
    symbols
        .iter()
        .map(|sym| {
            if NUMERIC_EXACT.is_match(sym) {
                format!("{}{}", sym, REGIONAL_SUFFIX)
            } else {
                sym.clone()
            }
        })
        .collect()
}

/// Keep only the symbols accepted by `is_plausible`, in order.
pub fn filter_plausible<F>(symbols: Vec<String>, is_plausible: F) -> Vec<String>
where
    F: Fn(&str) -> bool,
{
    symbols
        .into_iter()
        .filter(|s| is_plausible(s.as_str()))
        .collect()
}
