//! Route Classifier
//!
//! Picks a report route for free-text queries that do not name one:
//! - Procurement: public tender / bid lookups ("나라장터 AI 입찰 공고")
//! - Retrieval: questions answered from the local document index ("문서 근거로 요약")
//! - Web research: everything else (news, prices, company profiles)

use crate::models::RouteKind;

/// Static keyword lists — zero allocation
const PROCUREMENT_KEYWORDS: &[&str] = &[
    // Korean public procurement
    "공고", "입찰", "나라장터", "조달", "발주", "용역", "바우처",
    // English
    "procurement", "tender", "bid", "pps", "rfp",
];

const RETRIEVAL_KEYWORDS: &[&str] = &[
    // Korean
    "문서", "근거", "인덱스", "자료에서", "내부 자료",
    // English
    "rag", "document", "retrieval", "knowledge base",
];

pub struct RouteClassifier;

impl RouteClassifier {
    pub fn classify(query: &str) -> RouteKind {
        let text = query.to_lowercase();

        let procurement_score = score(&text, PROCUREMENT_KEYWORDS);
        let retrieval_score = score(&text, RETRIEVAL_KEYWORDS);

        if procurement_score > 0 && procurement_score >= retrieval_score {
            RouteKind::ProcurementListing
        } else if retrieval_score > 0 {
            RouteKind::RetrievalSummary
        } else {
            RouteKind::WebResearch
        }
    }
}

fn score(text: &str, keywords: &[&str]) -> usize {
    keywords.iter().filter(|kw| contains_keyword(text, kw)).count()
}

/// Single ASCII words must match a whole ASCII token ("rag" is not in "average").
/// Everything else is a substring match, so Korean particles ("문서에서") still hit.
fn contains_keyword(text: &str, keyword: &str) -> bool {
    if keyword.chars().all(|c| c.is_ascii_alphanumeric()) {
        text.split(|c: char| !c.is_ascii_alphanumeric())
            .any(|token| token == keyword)
    } else {
        text.contains(keyword)
    }
}
