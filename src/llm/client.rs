use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use super::CompletionClient;
use crate::config::Config;
use crate::history::{ChatMessage, Role};

#[derive(Clone)]
pub struct LlmClient {
    chat_client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    timeout: Duration,
}

impl LlmClient {
    pub fn new(config: &Config) -> Self {
        let chat_config = OpenAIConfig::new()
            .with_api_base(&config.llm_url)
            .with_api_key(&config.groq_api_key);

        Self {
            chat_client: Client::with_config(chat_config),
            model: config.llm_model.clone(),
            temperature: config.llm_temperature,
            max_tokens: config.llm_max_tokens,
            top_p: config.llm_top_p,
            timeout: Duration::from_secs(config.llm_timeout_secs),
        }
    }

    fn build_request(&self, messages: &[ChatMessage]) -> anyhow::Result<CreateChatCompletionRequest> {
        let messages = messages
            .iter()
            .map(to_request_message)
            .collect::<anyhow::Result<Vec<_>>>()?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .max_completion_tokens(self.max_tokens)
            .top_p(self.top_p)
            .build()?;
        Ok(request)
    }
}

#[async_trait]
impl CompletionClient for LlmClient {
    async fn complete(&self, messages: &[ChatMessage]) -> anyhow::Result<String> {
        let request = self.build_request(messages)?;
        debug!("Submitting {} messages to {}", messages.len(), self.model);

        let response = tokio::time::timeout(self.timeout, self.chat_client.chat().create(request))
            .await
            .map_err(|_| anyhow::anyhow!("LLM request timed out after {:?}", self.timeout))??;

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("No response from LLM"))
    }
}

fn to_request_message(message: &ChatMessage) -> anyhow::Result<ChatCompletionRequestMessage> {
    let content = message.content().to_string();
    let request = match message.role() {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(content)
            .build()?
            .into(),
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(content)
            .build()?
            .into(),
        Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(content)
            .build()?
            .into(),
    };
    Ok(request)
}
