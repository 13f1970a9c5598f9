use std::path::PathBuf;

use kritikos_gateway::GatewayError;
use kritikos_utils_image::ImageProcessingError;
use thiserror::Error;

/// Why a user action did not replace its slot.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("nothing to send: provide a file or paste some text first")]
    InputMissing,

    #[error(transparent)]
    CredentialMissing(#[from] kritikos_provider_config::Error),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{} is not valid UTF-8 text", path.display())]
    NotUtf8 { path: PathBuf },

    #[error("failed to extract text from PDF {}: {source}", path.display())]
    Pdf {
        path: PathBuf,
        source: lopdf::Error,
    },

    #[error(transparent)]
    Image(#[from] ImageProcessingError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine a home directory; set KRITIKOS_HOME")]
    NoHome,

    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("{field} must not be empty")]
    EmptyValue { field: &'static str },

    #[error("request timeout must be greater than zero")]
    ZeroTimeout,
}
