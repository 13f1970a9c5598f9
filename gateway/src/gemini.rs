use std::time::Duration;
use std::time::Instant;

use async_trait::async_trait;
use kritikos_provider_config::ApiKey;
use kritikos_provider_config::ModelProviderInfo;
use serde_json::Value;
use tracing::info;
use tracing::warn;

use crate::ModelGateway;
use crate::error::GatewayError;
use crate::request::GatewayRequest;
use crate::request::GatewayResponse;
use crate::request::ModelSelection;
use crate::request::encode_body;
use crate::response::classify_failure;
use crate::response::decode_success;
use crate::with_timeout;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP gateway speaking the `generateContent` protocol.
#[derive(Debug, Clone)]
pub struct GeminiGateway {
    client: reqwest::Client,
    provider: ModelProviderInfo,
    api_key: ApiKey,
    models: ModelSelection,
    timeout: Duration,
}

impl GeminiGateway {
    pub fn new(
        provider: ModelProviderInfo,
        api_key: ApiKey,
        models: ModelSelection,
    ) -> Result<Self, GatewayError> {
        let version = env!("CARGO_PKG_VERSION");
        let client = reqwest::Client::builder()
            .user_agent(format!("kritikos/{version}"))
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|err| GatewayError::Network(format!("building HTTP client: {err}")))?;
        let timeout = provider.request_timeout();
        Ok(Self {
            client,
            provider,
            api_key,
            models,
            timeout,
        })
    }

    async fn send(&self, model: &str, body: Value) -> Result<GatewayResponse, GatewayError> {
        let response = self
            .provider
            .create_request_builder(&self.client, model, &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(classify_failure(status, &text));
        }
        decode_success(&text)
    }
}

#[async_trait]
impl ModelGateway for GeminiGateway {
    async fn generate(&self, request: GatewayRequest) -> Result<GatewayResponse, GatewayError> {
        let model = self.models.for_task(request.task);
        let body = encode_body(&request);
        let started_at = Instant::now();

        let outcome = with_timeout(self.timeout, self.send(model, body)).await;

        let elapsed_ms = u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX);
        match &outcome {
            Ok(response) => info!(
                task = %request.task,
                model,
                elapsed_ms,
                response_chars = response.text.chars().count(),
                "generation completed"
            ),
            Err(err) => warn!(
                task = %request.task,
                model,
                elapsed_ms,
                kind = %err.kind(),
                "generation failed"
            ),
        }
        outcome
    }
}
