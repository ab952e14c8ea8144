//! Inline annotation of enriched terms in generated text.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use rummageo_common::format::{to_exponential, to_fixed};
use rummageo_sources::EnrichrRow;

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("static regex"))
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;").replace('"', "&quot;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Tooltip span for one enriched term.
pub fn term_span(term: &str, row: &EnrichrRow) -> String {
    let tip = format!(
        "Library: {}&#10;Rank: {}&#10;P-value: {}&#10;Odds Ratio: {}",
        escape_attr(&row.library),
        row.rank,
        to_exponential(row.pvalue, 2),
        to_fixed(row.odds_ratio, 4),
    );
    format!(r#"<span class="enriched-term" data-tip="{tip}">{term}</span>"#)
}

/// Wrap every verbatim occurrence of an enriched term in a tooltip span.
///
/// Matching is a single left-to-right pass preferring the longest term, so
/// a term that is a substring of another is not annotated twice and span
/// markup is never rewritten.
pub fn annotate(text: &str, stats: &BTreeMap<String, EnrichrRow>) -> String {
    let mut terms: Vec<&str> = stats
        .keys()
        .map(String::as_str)
        .filter(|t| !t.is_empty() && text.contains(*t))
        .collect();
    if terms.is_empty() {
        return text.to_string();
    }
    terms.sort_by_key(|t| std::cmp::Reverse(t.len()));

    let pattern = terms.iter().map(|t| regex::escape(t)).collect::<Vec<_>>().join("|");
    let Ok(re) = Regex::new(&pattern) else {
        return text.to_string();
    };
    re.replace_all(text, |caps: &regex::Captures<'_>| {
        let term = &caps[0];
        match stats.get(term) {
            Some(row) => term_span(term, row),
            None => term.to_string(),
        }
    })
    .into_owned()
}

/// Plain-text rendering with all tags removed (clipboard copy).
pub fn strip_tags(html: &str) -> String {
    tag_re().replace_all(html, "").into_owned()
}
