use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use serde_json::Value;
use serde_json::json;

/// Which assistant feature issued the request. Used for model selection and
/// logging only; the instruction text carries the actual task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    Audit,
    Rewrite,
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Audit => f.write_str("audit"),
            Task::Rewrite => f.write_str("rewrite"),
        }
    }
}

/// Material the instruction operates on.
#[derive(Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    /// Encoded image bytes, forwarded as-is.
    Image { mime_type: String, bytes: Bytes },
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Payloads can hold proprietary source; only describe their shape.
        match self {
            Payload::Text(text) => write!(f, "Text({} chars)", text.chars().count()),
            Payload::Image { mime_type, bytes } => {
                write!(f, "Image({mime_type}, {} bytes)", bytes.len())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayRequest {
    pub task: Task,
    pub instruction: String,
    pub payload: Payload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayResponse {
    pub text: String,
}

/// Model identifiers per task, sourced from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub audit: String,
    pub rewrite: String,
}

impl ModelSelection {
    pub fn single(model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            audit: model.clone(),
            rewrite: model,
        }
    }

    pub fn for_task(&self, task: Task) -> &str {
        match task {
            Task::Audit => &self.audit,
            Task::Rewrite => &self.rewrite,
        }
    }
}

/// Build the `generateContent` JSON body: one user turn whose first part is
/// the instruction and whose second part is the payload.
pub(crate) fn encode_body(request: &GatewayRequest) -> Value {
    let payload_part = match &request.payload {
        Payload::Text(text) => json!({ "text": text }),
        Payload::Image { mime_type, bytes } => json!({
            "inline_data": {
                "mime_type": mime_type,
                "data": STANDARD.encode(bytes),
            }
        }),
    };
    json!({
        "contents": [{
            "role": "user",
            "parts": [
                { "text": request.instruction },
                payload_part,
            ],
        }]
    })
}
