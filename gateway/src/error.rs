use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Failure of a single generation call. The carried message is the
/// upstream/transport text, unmodified, so callers can show it verbatim.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("model service error{}: {message}", status_suffix(.status.as_ref().copied()))]
    Upstream {
        /// HTTP status of the failed response; `None` when a 2xx body was unusable.
        status: Option<u16>,
        message: String,
    },
    #[error("model service did not respond within {}s", .0.as_secs_f64())]
    Timeout(Duration),
}

fn status_suffix(status: Option<u16>) -> String {
    match status {
        Some(code) => format!(" (HTTP {code})"),
        None => String::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayErrorKind {
    Auth,
    Network,
    Upstream,
    Timeout,
}

impl GatewayError {
    /// Upstream failure that did not come with an error status.
    pub fn upstream(message: impl Into<String>) -> Self {
        GatewayError::Upstream {
            status: None,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> GatewayErrorKind {
        match self {
            GatewayError::Auth(_) => GatewayErrorKind::Auth,
            GatewayError::Network(_) => GatewayErrorKind::Network,
            GatewayError::Upstream { .. } => GatewayErrorKind::Upstream,
            GatewayError::Timeout(_) => GatewayErrorKind::Timeout,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Upstream { status, .. } => *status,
            _ => None,
        }
    }

    /// The underlying message without the kind prefix.
    pub fn message(&self) -> String {
        match self {
            GatewayError::Auth(message)
            | GatewayError::Network(message)
            | GatewayError::Upstream { message, .. } => message.clone(),
            GatewayError::Timeout(limit) => format!("no response after {}ms", limit.as_millis()),
        }
    }
}

impl fmt::Display for GatewayErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            GatewayErrorKind::Auth => "auth",
            GatewayErrorKind::Network => "network",
            GatewayErrorKind::Upstream => "upstream",
            GatewayErrorKind::Timeout => "timeout",
        };
        f.write_str(label)
    }
}

/// `err` followed by each distinct message in its `source()` chain.
pub(crate) fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.contains(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = cause.source();
    }
    message
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::Network(error_chain(&err))
    }
}
