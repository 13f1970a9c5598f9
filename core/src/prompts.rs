//! Instruction text for the two assistant tasks.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use kritikos_gateway::GatewayRequest;
use kritikos_gateway::Payload;
use kritikos_gateway::Task;

use crate::error::ActionError;
use crate::input::AuditInput;
use crate::response_parser::CORRECTION_END_MARKER;
use crate::response_parser::CORRECTION_START_MARKER;

const AUDIT_PROMPT_TEMPLATE: &str = r#"
You are Kritikos, a Senior Security Architect. Analyze the provided input.
1. Assign SCORE: [0-100] (High is secure).
2. Provide VULNERABILITIES: [Critical, Medium, Low] as three integers, for example VULNERABILITIES: [1, 0, 2].
3. List findings clearly.
4. Provide fixed code between '{start}' and '{end}', inside a fenced code block.
"#;

const REWRITE_PROMPT_TEMPLATE: &str = r#"Task: {mode}
Tone: {tone}
The text to refine follows this instruction.
CRITICAL: Output ONLY the corrected text. Do NOT explain, do NOT use quotes, and do NOT add intro/outro text."#;

/// Persona for the rewrite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Tone {
    #[default]
    Executive,
    Direct,
    Colloquial,
}

/// How aggressively to rewrite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RewriteMode {
    #[default]
    GrammarCheck,
    ArchitectMode,
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Tone::Executive => "Executive",
            Tone::Direct => "Direct",
            Tone::Colloquial => "Colloquial",
        };
        f.write_str(label)
    }
}

impl fmt::Display for RewriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RewriteMode::GrammarCheck => "Grammar Check",
            RewriteMode::ArchitectMode => "Architect Mode",
        };
        f.write_str(label)
    }
}

impl FromStr for Tone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "executive" => Ok(Tone::Executive),
            "direct" => Ok(Tone::Direct),
            "colloquial" => Ok(Tone::Colloquial),
            _ => Err(format!(
                "invalid tone: {s}. Expected one of: executive|direct|colloquial"
            )),
        }
    }
}

impl FromStr for RewriteMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', '_', ' '], "").as_str() {
            "grammar" | "grammarcheck" => Ok(RewriteMode::GrammarCheck),
            "architect" | "architectmode" => Ok(RewriteMode::ArchitectMode),
            _ => Err(format!(
                "invalid mode: {s}. Expected one of: grammar-check|architect-mode"
            )),
        }
    }
}

pub fn audit_instruction() -> String {
    AUDIT_PROMPT_TEMPLATE
        .trim()
        .replace("{start}", CORRECTION_START_MARKER)
        .replace("{end}", CORRECTION_END_MARKER)
}

pub fn rewrite_instruction(tone: Tone, mode: RewriteMode) -> String {
    REWRITE_PROMPT_TEMPLATE
        .replace("{mode}", &mode.to_string())
        .replace("{tone}", &tone.to_string())
}

/// Build the audit request. Blank text is `InputMissing`; no request is
/// produced for it.
pub fn build_audit_request(input: AuditInput) -> Result<GatewayRequest, ActionError> {
    let payload = match input {
        AuditInput::Text(text) if text.trim().is_empty() => return Err(ActionError::InputMissing),
        AuditInput::Text(text) => Payload::Text(text),
        AuditInput::Image(image) => Payload::Image {
            mime_type: image.mime_type().to_string(),
            bytes: Bytes::from(image.bytes),
        },
    };
    Ok(GatewayRequest {
        task: Task::Audit,
        instruction: audit_instruction(),
        payload,
    })
}

pub fn build_rewrite_request(
    draft: &str,
    tone: Tone,
    mode: RewriteMode,
) -> Result<GatewayRequest, ActionError> {
    if draft.trim().is_empty() {
        return Err(ActionError::InputMissing);
    }
    Ok(GatewayRequest {
        task: Task::Rewrite,
        instruction: rewrite_instruction(tone, mode),
        payload: Payload::Text(draft.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    #[test]
    fn audit_instruction_requests_all_three_artifacts() {
        let instruction = audit_instruction();
        assert!(instruction.starts_with("You are Kritikos"));
        assert!(instruction.contains("SCORE: [0-100]"));
        assert!(instruction.contains("VULNERABILITIES: [Critical, Medium, Low]"));
        assert!(instruction.contains("'CORRECTED_CODE_START' and 'CORRECTED_CODE_END'"));
    }

    #[test]
    fn rewrite_instruction_names_task_tone_and_output_only_directive() {
        assert_eq!(
            rewrite_instruction(Tone::Direct, RewriteMode::ArchitectMode),
            "Task: Architect Mode\nTone: Direct\nThe text to refine follows this instruction.\nCRITICAL: Output ONLY the corrected text. Do NOT explain, do NOT use quotes, and do NOT add intro/outro text."
        );
    }

    #[test]
    fn text_audit_keeps_payload_separate_from_instruction() {
        let request =
            build_audit_request(AuditInput::Text("eval(input())".to_string())).expect("request");
        assert_eq!(request.task, Task::Audit);
        assert_eq!(request.payload, Payload::Text("eval(input())".to_string()));
    }

    #[test]
    fn blank_inputs_are_input_missing() {
        assert_matches!(
            build_audit_request(AuditInput::Text(" \n\t".to_string())),
            Err(ActionError::InputMissing)
        );
        assert_matches!(
            build_rewrite_request("   ", Tone::Executive, RewriteMode::GrammarCheck),
            Err(ActionError::InputMissing)
        );
    }

    #[test]
    fn parses_tone_and_mode_labels() {
        assert_eq!("Colloquial".parse::<Tone>(), Ok(Tone::Colloquial));
        assert_eq!("grammar-check".parse::<RewriteMode>(), Ok(RewriteMode::GrammarCheck));
        assert_eq!("Architect Mode".parse::<RewriteMode>(), Ok(RewriteMode::ArchitectMode));
        assert!("formal".parse::<Tone>().is_err());
    }
}
