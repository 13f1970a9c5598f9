//! Boundary to the hosted generative-language service.
//!
//! Callers hand over one [`GatewayRequest`] and get back either the model's
//! free text or a typed [`GatewayError`]. Nothing is retried; every call is
//! bounded by the provider's request timeout.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

mod error;
mod gemini;
mod request;
mod response;

pub use error::GatewayError;
pub use error::GatewayErrorKind;
pub use gemini::GeminiGateway;
pub use request::GatewayRequest;
pub use request::GatewayResponse;
pub use request::ModelSelection;
pub use request::Payload;
pub use request::Task;

#[async_trait]
pub trait ModelGateway: Send + Sync {
    async fn generate(&self, request: GatewayRequest) -> Result<GatewayResponse, GatewayError>;
}

#[async_trait]
impl<G: ModelGateway + ?Sized> ModelGateway for std::sync::Arc<G> {
    async fn generate(&self, request: GatewayRequest) -> Result<GatewayResponse, GatewayError> {
        (**self).generate(request).await
    }
}

impl std::fmt::Debug for dyn ModelGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn ModelGateway")
    }
}

/// Run `fut`, failing with [`GatewayError::Timeout`] once `limit` elapses.
pub async fn with_timeout<F, T>(limit: Duration, fut: F) -> Result<T, GatewayError>
where
    F: Future<Output = Result<T, GatewayError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(GatewayError::Timeout(limit)),
    }
}
