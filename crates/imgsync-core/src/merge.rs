//! # Content Merge
//!
//! Splices a freshly rendered fragment into an existing page body.
//!
//! The previously generated region is located by the sentinel pair the
//! renderer writes (first start sentinel through last end sentinel).
//! Bodies generated before sentinels were introduced are located by
//! pattern instead: from the first generated style/nav/heading block to
//! the last gallery-end marker. Content outside the region is preserved
//! verbatim apart from whitespace at the splice points.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::render::{END_SENTINEL, START_SENTINEL};

static LEGACY_SPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)<!-- wp:(?:html|heading)\b[^>]*-->\s*<(?:style|nav|h2)\b[^>]*\bimgsync-.*<!-- /wp:gallery -->",
    )
    .expect("legacy span pattern is valid")
});

/// Merge `fragment` into `existing`.
///
/// - `replace_all`: the result is `fragment` verbatim.
/// - A previously generated region is replaced in place.
/// - Otherwise the fragment is appended after a blank line (or stands
///   alone when the body is blank).
pub fn merge(existing: &str, fragment: &str, replace_all: bool) -> String {
    if replace_all {
        return fragment.to_string();
    }

    match generated_span(existing) {
        Some(span) => {
            let before = existing[..span.start].trim_end();
            let after = existing[span.end..].trim_start();
            join([before, fragment, after])
        }
        None => join([existing.trim_end(), fragment, ""]),
    }
}

/// Byte range of the previously generated region, if any.
pub fn generated_span(body: &str) -> Option<Range<usize>> {
    sentinel_span(body).or_else(|| LEGACY_SPAN.find(body).map(|m| m.range()))
}

fn sentinel_span(body: &str) -> Option<Range<usize>> {
    let start = body.find(START_SENTINEL)?;
    let end = body.rfind(END_SENTINEL)? + END_SENTINEL.len();
    (start < end - END_SENTINEL.len()).then_some(start..end)
}

fn join<const N: usize>(parts: [&str; N]) -> String {
    parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
