use anyhow::Result;
use async_trait::async_trait;

/// Abstraction over a real model-provider backend.
///
/// No implementation ships with this crate: when a dispatcher has no
/// provider configured it fabricates replies on a timer instead. A concrete
/// HTTP integration plugs in here, and its failures surface as responses in
/// the `error` state.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    async fn invoke(&self, model: &str, prompt: &str) -> Result<String>;
}
