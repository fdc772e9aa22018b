//! Metadata envelope around rendered bodies
//!
//! The header block is read back by automated consumers as `key: value`
//! pairs. Field order and the quote escaping of `query` are part of the
//! file format.

use crate::models::RouteKind;

pub const OUTPUT_SCHEMA: &str = "v1";
const DELIMITER: &str = "---";

pub fn compose_envelope(route: &RouteKind, query: &str, body: &str, saved_path: &str) -> String {
    let header = format!(
        "---\n\
         output_schema: {schema}\n\
         type: markdown\n\
         route: {route}\n\
         saved: {saved}\n\
         query: \"{query}\"\n\
         ---\n\n",
        schema = OUTPUT_SCHEMA,
        route = route,
        saved = saved_path,
        query = query.replace('"', "\\\""),
    );
    let footer = format!("\n\n---\n> 저장 위치: `{}`\n", saved_path);

    format!("{}{}{}", header, body.trim(), footer)
}

/// Header fields of an enveloped document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvelopeHeader {
    pub output_schema: String,
    pub doc_type: String,
    pub route: String,
    pub saved: String,
    pub query: String,
}

/// Parse the header block of an enveloped document.
///
/// Lines that are not `key: value` pairs are skipped, except after `query`,
/// which is the last field and may span several lines.
/// Returns `None` when the document does not open with a complete header.
pub fn parse_envelope_header(document: &str) -> Option<EnvelopeHeader> {
    let mut lines = document.lines();
    if lines.next()? != DELIMITER {
        return None;
    }

    let mut header = EnvelopeHeader::default();
    let mut raw_query: Option<String> = None;
    for line in lines {
        if line == DELIMITER {
            if let Some(raw) = raw_query {
                header.query = unquote(&raw);
            }
            return Some(header);
        }
        if let Some(raw) = raw_query.as_mut() {
            raw.push('\n');
            raw.push_str(line);
            continue;
        }
        let Some((key, value)) = line.split_once(": ") else {
            continue;
        };
        match key {
            "output_schema" => header.output_schema = value.to_string(),
            "type" => header.doc_type = value.to_string(),
            "route" => header.route = value.to_string(),
            "saved" => header.saved = value.to_string(),
            "query" => raw_query = Some(value.to_string()),
            _ => {}
        }
    }

    None
}

fn unquote(value: &str) -> String {
    let inner = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);
    inner.replace("\\\"", "\"")
}
