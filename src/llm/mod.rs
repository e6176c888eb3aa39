pub mod chat;
pub mod client;

pub use chat::ChatService;
pub use client::LlmClient;

use crate::history::ChatMessage;
use async_trait::async_trait;

/// Turns an ordered chat transcript into the assistant's next message.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> anyhow::Result<String>;
}
