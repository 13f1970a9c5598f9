use serde::Serialize;

use crate::response_parser::extract_code_blocks;
use crate::response_parser::extract_legacy_correction;
use crate::response_parser::extract_score;
use crate::response_parser::extract_severity_triple;
use crate::response_parser::extract_suggested_fix;

/// Vulnerability counts exactly as the model reported them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    pub critical: u32,
    pub medium: u32,
    pub low: u32,
}

/// One audit response and everything that could be recognized in it.
///
/// Every structured field is independently optional; a result with none of
/// them is still valid and means no structure was recognized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditResult {
    raw_text: String,
    score: Option<u8>,
    severity: Option<SeverityCounts>,
    code_blocks: Vec<String>,
    legacy_correction: Option<String>,
    suggested_fix: Option<String>,
}

impl AuditResult {
    pub fn from_response(raw_text: String) -> Self {
        Self {
            score: extract_score(&raw_text),
            severity: extract_severity_triple(&raw_text),
            code_blocks: extract_code_blocks(&raw_text),
            legacy_correction: extract_legacy_correction(&raw_text),
            suggested_fix: extract_suggested_fix(&raw_text),
            raw_text,
        }
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn score(&self) -> Option<u8> {
        self.score
    }

    pub fn severity(&self) -> Option<SeverityCounts> {
        self.severity
    }

    pub fn code_blocks(&self) -> &[String] {
        &self.code_blocks
    }

    pub fn legacy_correction(&self) -> Option<&str> {
        self.legacy_correction.as_deref()
    }

    pub fn suggested_fix(&self) -> Option<&str> {
        self.suggested_fix.as_deref()
    }
}

/// Rewritten text. The instruction asks for nothing but the text itself;
/// that is not enforced here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewriteResult {
    raw_text: String,
}

impl RewriteResult {
    pub fn from_response(raw_text: String) -> Self {
        Self { raw_text }
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn scenario_with_legacy_markers() {
        let result = AuditResult::from_response(
            "VULNERABILITIES: [2, 5, 1]\nSCORE: 73\nCORRECTED_CODE_START\nprint('ok')\nCORRECTED_CODE_END"
                .to_string(),
        );
        assert_eq!(result.score(), Some(73));
        assert_eq!(
            result.severity(),
            Some(SeverityCounts {
                critical: 2,
                medium: 5,
                low: 1
            })
        );
        assert_eq!(result.legacy_correction(), Some("print('ok')"));
        assert_eq!(result.suggested_fix(), Some("print('ok')"));
        assert!(result.code_blocks().is_empty());
    }

    #[test]
    fn unstructured_response_is_still_a_result() {
        let result = AuditResult::from_response("I could not review this input.".to_string());
        assert_eq!(result.raw_text(), "I could not review this input.");
        assert_eq!(result.score(), None);
        assert_eq!(result.severity(), None);
        assert_eq!(result.suggested_fix(), None);
        assert!(result.code_blocks().is_empty());
        assert_eq!(result.legacy_correction(), None);
    }
}
