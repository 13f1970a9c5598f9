use reqwest::StatusCode;
use serde::Deserialize;

use crate::error::GatewayError;
use crate::request::GatewayResponse;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    reason: Option<String>,
}

const INVALID_KEY_REASON: &str = "API_KEY_INVALID";

/// Turn a 2xx body into the response text: every text part of the first
/// candidate, in order.
pub(crate) fn decode_success(body: &str) -> Result<GatewayResponse, GatewayError> {
    let parsed: GenerateContentResponse = serde_json::from_str(body).map_err(|err| {
        GatewayError::upstream(format!("could not decode model response: {err}"))
    })?;

    let Some(candidate) = parsed.candidates.into_iter().next() else {
        let reason = parsed
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason)
            .unwrap_or_else(|| "unspecified".to_string());
        return Err(GatewayError::upstream(format!(
            "model returned no candidates (block reason: {reason})"
        )));
    };

    let text = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .unwrap_or_default();

    if text.is_empty() {
        let reason = candidate
            .finish_reason
            .unwrap_or_else(|| "unspecified".to_string());
        return Err(GatewayError::upstream(format!(
            "model returned no text (finish reason: {reason})"
        )));
    }

    Ok(GatewayResponse { text })
}

/// Classify a non-2xx response. The upstream `error.message` is preserved
/// verbatim; the raw body stands in when it is not the documented envelope.
pub(crate) fn classify_failure(status: StatusCode, body: &str) -> GatewayError {
    let envelope = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let invalid_key = envelope.as_ref().is_some_and(|envelope| {
        envelope
            .error
            .details
            .iter()
            .any(|detail| detail.reason.as_deref() == Some(INVALID_KEY_REASON))
    });
    let message = match envelope {
        Some(envelope) if !envelope.error.message.is_empty() => envelope.error.message,
        _ if body.trim().is_empty() => "no error details".to_string(),
        _ => body.trim().to_string(),
    };

    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) || invalid_key {
        GatewayError::Auth(message)
    } else {
        GatewayError::Upstream {
            status: Some(status.as_u16()),
            message,
        }
    }
}
