//! Pulls structured fields out of the model's free-text audit response.
//!
//! The upstream output format is only requested, never guaranteed, so every
//! extractor is independent and a miss is `None`/empty rather than an error.
//! Nothing here substitutes a default for a value the model did not report.

use std::sync::OnceLock;

use regex_lite::Regex;
use tracing::debug;

use crate::models::SeverityCounts;

pub const CORRECTION_START_MARKER: &str = "CORRECTED_CODE_START";
pub const CORRECTION_END_MARKER: &str = "CORRECTED_CODE_END";

const MAX_SCORE: u32 = 100;

/// The label, an optional `(0-100)`/`[0-100]` range note, then separator
/// markup and at most two line breaks before the digits.
fn score_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();

    #[expect(clippy::unwrap_used)]
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\bscore\b(?:[ \t]*[(\[][ \t]*0[ \t]*-[ \t]*100[ \t]*[)\]])?([ \t:*=#|\[\]-]{0,12}(?:\r?\n[ \t]*){0,2})([0-9]+)",
        )
        .unwrap()
    })
}

fn severity_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();

    #[expect(clippy::unwrap_used)]
    RE.get_or_init(|| {
        Regex::new(r"VULNERABILITIES:\s*\[\s*([0-9]+)\s*,\s*([0-9]+)\s*,\s*([0-9]+)\s*\]").unwrap()
    })
}

/// Fences open and close only at the start of a line (after indentation).
fn fence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();

    #[expect(clippy::unwrap_used)]
    RE.get_or_init(|| Regex::new(r"(?ms)^[ \t]*```[^\n`]*\n(.*?)^[ \t]*```").unwrap())
}

fn correction_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();

    #[expect(clippy::unwrap_used)]
    RE.get_or_init(|| Regex::new(r"(?s)CORRECTED_CODE_START(.*?)CORRECTED_CODE_END").unwrap())
}

/// First number labelled "score" (any case), separated from the label only
/// by punctuation, markup or up to two line breaks. A negative or
/// out-of-range first match means the response is malformed and yields
/// `None`; it is never clamped.
pub fn extract_score(text: &str) -> Option<u8> {
    let Some(captures) = score_regex().captures(text) else {
        debug!("no score label in response");
        return None;
    };
    let separator = captures.get(1).map_or("", |sep| sep.as_str());
    let digits = captures.get(2)?.as_str();
    if separator.ends_with('-') {
        debug!(digits, "negative score; treating as not reported");
        return None;
    }
    match digits.parse::<u32>() {
        Ok(value) if digits.len() <= 3 && value <= MAX_SCORE => u8::try_from(value).ok(),
        _ => {
            debug!(digits, "score outside 0-100; treating as not reported");
            None
        }
    }
}

/// `VULNERABILITIES: [critical, medium, low]`, exactly as requested from the
/// model. Any other shape is "not reported".
pub fn extract_severity_triple(text: &str) -> Option<SeverityCounts> {
    let Some(captures) = severity_regex().captures(text) else {
        debug!("no vulnerability breakdown in response");
        return None;
    };
    let count = |idx: usize| captures.get(idx)?.as_str().parse::<u32>().ok();
    Some(SeverityCounts {
        critical: count(1)?,
        medium: count(2)?,
        low: count(3)?,
    })
}

/// Bodies of all triple-backtick fenced blocks, in order of appearance.
///
/// The opening fence may carry a language tag. A body runs from the line
/// after the opening fence to the first closing fence; the line ending (and
/// indentation) in front of the closing fence belongs to the fence, not the
/// body. Everything else is returned byte for byte.
pub fn extract_code_blocks(text: &str) -> Vec<String> {
    fence_regex()
        .captures_iter(text)
        .filter_map(|captures| captures.get(1))
        .map(|body| strip_closing_fence_line(body.as_str()).to_string())
        .collect()
}

fn strip_closing_fence_line(body: &str) -> &str {
    match body.rfind('\n') {
        Some(idx) if body[idx + 1..].trim().is_empty() => {
            let head = &body[..idx];
            head.strip_suffix('\r').unwrap_or(head)
        }
        _ => body,
    }
}

/// Text between `CORRECTED_CODE_START` and `CORRECTED_CODE_END`, trimmed.
pub fn extract_legacy_correction(text: &str) -> Option<String> {
    correction_region(text).map(|region| region.trim().to_string())
}

fn correction_region(text: &str) -> Option<&str> {
    correction_regex()
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|region| region.as_str())
}

/// The code to present as the remediation: a fenced block inside the
/// correction markers, else the first fenced block, else the bare marker
/// contents.
pub fn extract_suggested_fix(text: &str) -> Option<String> {
    if let Some(region) = correction_region(text)
        && let Some(block) = extract_code_blocks(region).into_iter().next()
    {
        return Some(block);
    }
    extract_code_blocks(text)
        .into_iter()
        .next()
        .or_else(|| extract_legacy_correction(text))
        .filter(|fix| !fix.trim().is_empty())
}
