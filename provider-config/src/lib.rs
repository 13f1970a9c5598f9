//! Provider configuration shared across Kritikos layers.
//!
//! This crate describes *where* generation requests go and *how* they are
//! authenticated. It intentionally knows nothing about prompts, audit reports
//! or session state.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("no API key configured: set {var} or enter a key manually")]
    MissingCredential {
        var: String,
        instructions: Option<String>,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

pub const GEMINI_API_KEY_ENV_VAR: &str = "GEMINI_API_KEY";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Header carrying the API key on every generation request.
pub const API_KEY_HEADER: &str = "x-goog-api-key";

const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 60_000;

/// Where generation requests go and how they are authenticated.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelProviderInfo {
    /// Friendly display name.
    pub name: String,
    /// Base URL for the provider's `generateContent` API.
    pub base_url: Option<String>,
    /// Environment variable that stores the user's API key for this provider.
    pub env_key: Option<String>,
    /// Optional instructions to help the user set the environment variable.
    pub env_key_instructions: Option<String>,
    /// Optional query parameters to append to the request URL.
    pub query_params: Option<HashMap<String, String>>,
    /// Additional static HTTP headers to include in requests.
    pub http_headers: Option<HashMap<String, String>>,
    /// Upper bound (in milliseconds) for one complete generation call.
    pub request_timeout_ms: Option<u64>,
}

/// Partial provider definition as it appears in `config.toml`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProviderOverrides {
    pub name: Option<String>,
    pub base_url: Option<String>,
    pub env_key: Option<String>,
    pub env_key_instructions: Option<String>,
    pub query_params: Option<HashMap<String, String>>,
    pub http_headers: Option<HashMap<String, String>>,
}

/// API key resolved for the current process. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

impl ModelProviderInfo {
    /// Construct the `POST` URL that generates content with `model`.
    pub fn get_full_url(&self, model: &str) -> String {
        let base_url = self
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_GEMINI_BASE_URL)
            .trim_end_matches('/');
        let query_string = self.get_query_string();
        format!("{base_url}/models/{model}:generateContent{query_string}")
    }

    fn get_query_string(&self) -> String {
        self.query_params
            .as_ref()
            .filter(|params| !params.is_empty())
            .map_or_else(String::new, |params| {
                let mut pairs = params
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect::<Vec<_>>();
                pairs.sort();
                format!("?{}", pairs.join("&"))
            })
    }

    /// Apply static headers to the provided builder.
    pub fn apply_http_headers(
        &self,
        mut builder: reqwest::RequestBuilder,
    ) -> reqwest::RequestBuilder {
        if let Some(extra) = &self.http_headers {
            for (k, v) in extra {
                builder = builder.header(k, v);
            }
        }
        builder
    }

    /// The provider's environment variable, blank values treated as unset.
    fn api_key_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
        let env_key = self.env_key.as_deref()?;
        lookup(env_key).filter(|value| !value.trim().is_empty())
    }

    /// Resolve the credential: environment first, then the manually entered
    /// value.
    pub fn resolve_api_key(&self, manual: Option<&str>) -> Result<ApiKey> {
        self.resolve_api_key_with(manual, |var| std::env::var(var).ok())
    }

    pub fn resolve_api_key_with(
        &self,
        manual: Option<&str>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<ApiKey> {
        if let Some(key) = self.api_key_with(lookup) {
            return Ok(ApiKey(key.trim().to_string()));
        }
        match manual.map(str::trim) {
            Some(value) if !value.is_empty() => Ok(ApiKey(value.to_string())),
            _ => Err(Error::MissingCredential {
                var: self
                    .env_key
                    .clone()
                    .unwrap_or_else(|| GEMINI_API_KEY_ENV_VAR.to_string()),
                instructions: self.env_key_instructions.clone(),
            }),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS))
    }

    /// Convenience to create a request builder with provider and auth headers.
    pub fn create_request_builder(
        &self,
        client: &reqwest::Client,
        model: &str,
        api_key: &ApiKey,
    ) -> reqwest::RequestBuilder {
        let builder = client.post(self.get_full_url(model));
        self.apply_http_headers(builder)
            .header(API_KEY_HEADER, api_key.expose())
    }

    /// Layer the fields present in `overrides` on top of `self`.
    pub fn apply_overrides(&mut self, overrides: &ProviderOverrides) {
        let ProviderOverrides {
            name,
            base_url,
            env_key,
            env_key_instructions,
            query_params,
            http_headers,
        } = overrides.clone();
        if let Some(name) = name {
            self.name = name;
        }
        if base_url.is_some() {
            self.base_url = base_url;
        }
        if env_key.is_some() {
            self.env_key = env_key;
        }
        if env_key_instructions.is_some() {
            self.env_key_instructions = env_key_instructions;
        }
        if query_params.is_some() {
            self.query_params = query_params;
        }
        if http_headers.is_some() {
            self.http_headers = http_headers;
        }
    }
}

/// The hosted provider used when `config.toml` does not say otherwise.
pub fn gemini_provider() -> ModelProviderInfo {
    ModelProviderInfo {
        name: "Gemini".to_string(),
        base_url: Some(DEFAULT_GEMINI_BASE_URL.to_string()),
        env_key: Some(GEMINI_API_KEY_ENV_VAR.to_string()),
        env_key_instructions: Some(
            "Create an API key at https://aistudio.google.com/apikey and export it as GEMINI_API_KEY."
                .to_string(),
        ),
        query_params: None,
        http_headers: None,
        request_timeout_ms: None,
    }
}

/// Provider pointing at an arbitrary base URL, used for local proxies and tests.
pub fn create_provider_with_base_url(url: &str) -> ModelProviderInfo {
    ModelProviderInfo {
        name: "custom".to_string(),
        base_url: Some(url.to_string()),
        env_key: None,
        env_key_instructions: None,
        query_params: None,
        http_headers: None,
        request_timeout_ms: None,
    }
}
