pub mod commands;
pub mod config;
pub mod discord_text;
pub mod history;
pub mod llm;
pub mod mention;
pub mod reply;
pub mod speech;
pub mod voice;

use std::sync::Arc;

/// Custom data passed to all commands
pub struct Data {
    pub config: config::Config,
    pub chat: llm::ChatService,
    pub speech: Arc<dyn speech::SpeechClient>,
    pub artifacts: voice::ArtifactStore,
    /// Bot's own user ID, used to strip mentions and attribute history
    pub bot_id: u64,
}

impl Data {
    pub fn new(
        config: config::Config,
        completion: Arc<dyn llm::CompletionClient>,
        speech: Arc<dyn speech::SpeechClient>,
        bot_id: u64,
    ) -> Self {
        let store = Arc::new(history::HistoryStore::new(
            config.system_prompt.clone(),
            config.max_history_length,
            config.max_conversations,
            config.history_idle_ttl,
        ));
        let artifacts = voice::ArtifactStore::new(config.audio_dir.clone());

        Self {
            chat: llm::ChatService::new(store, completion),
            speech,
            artifacts,
            bot_id,
            config,
        }
    }
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
