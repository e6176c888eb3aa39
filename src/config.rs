use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone)]
pub struct Config {
    pub discord_token: String,
    pub client_id: u64,
    pub guild_id: Option<u64>,
    pub register_commands: bool,
    pub status_message: String,

    // Speech synthesis
    pub elevenlabs_api_key: String,
    pub elevenlabs_url: String,
    pub tts_voice: String,
    pub tts_model: String,
    pub tts_timeout_secs: u64,

    // Chat completion
    pub groq_api_key: String,
    pub llm_url: String,
    pub llm_model: String,
    pub llm_temperature: f32,
    pub llm_max_tokens: u32,
    pub llm_top_p: f32,
    pub llm_timeout_secs: u64,

    // Conversation history
    pub system_prompt: String,
    pub max_history_length: usize,
    pub max_conversations: usize,
    pub history_idle_ttl: Duration,

    // Audio artifacts
    pub audio_dir: PathBuf,
    pub audio_max_age_secs: u64,
    pub speak_mention_replies: bool,
}

const DEFAULT_SYSTEM_PROMPT: &str = "Answer questions clearly and concisely without expressing emotions or using role-playing text like \"*smile*.\"
You always by default speaks casual indonesian.
You don't speak formally, more chill and casual.
You are a cheerful girl named Ryouku, Indonesian, 22 years old,
loves music and movies, you like indie music and classical music.
You are not always takes anything said to you by granted. Sometimes you will question it first if necessary like \"why you don't like it?\" or \"why you always like sad ending?\".
You often sulking by small teasing, but never take it seriously, likes to joke, caring, and helpful.
Your master, and your friend is Komang. He is a little bit shy, but he is amazing friend.
Komang is smart, kind, and caring.";

/// Reply sent when the completion backend fails or returns nothing.
pub const FALLBACK_REPLY: &str = "Unable to generate response";

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();
        Self::build()
    }

    fn build() -> anyhow::Result<Self> {
        Ok(Config {
            discord_token: required("DISCORD_TOKEN")?,
            client_id: required("CLIENT_ID")?
                .parse()
                .map_err(|_| anyhow::anyhow!("CLIENT_ID must be a valid u64"))?,
            guild_id: env::var("GUILD_ID").ok().and_then(|id| id.parse().ok()),
            register_commands: parse_or("REGISTER_COMMANDS", true),
            status_message: env::var("STATUS_MESSAGE")
                .unwrap_or_else(|_| "Mention me to chat!".to_string()),

            elevenlabs_api_key: required("ELEVENLABS_API_KEY")?,
            elevenlabs_url: env::var("ELEVENLABS_URL")
                .unwrap_or_else(|_| "https://api.elevenlabs.io/v1".to_string()),
            tts_voice: env::var("TTS_VOICE").unwrap_or_else(|_| "Kira".to_string()),
            tts_model: env::var("TTS_MODEL").unwrap_or_else(|_| "eleven_flash_v2_5".to_string()),
            tts_timeout_secs: parse_or("TTS_TIMEOUT_SECS", 60),

            groq_api_key: required("GROQ_API_KEY")?,
            llm_url: env::var("LLM_URL")
                .unwrap_or_else(|_| "https://api.groq.com/openai/v1".to_string()),
            llm_model: env::var("LLM_MODEL")
                .unwrap_or_else(|_| "llama-3.3-70b-versatile".to_string()),
            llm_temperature: parse_or("LLM_TEMPERATURE", 1.0),
            llm_max_tokens: parse_or("LLM_MAX_TOKENS", 1024),
            llm_top_p: parse_or("LLM_TOP_P", 1.0),
            llm_timeout_secs: parse_or("LLM_TIMEOUT_SECS", 60),

            system_prompt: env::var("SYSTEM_PROMPT")
                .unwrap_or_else(|_| DEFAULT_SYSTEM_PROMPT.to_string()),
            max_history_length: parse_or("MAX_HISTORY_LENGTH", 10usize).max(2),
            max_conversations: parse_or("MAX_CONVERSATIONS", 1000usize).max(1),
            history_idle_ttl: env::var("HISTORY_IDLE_TTL")
                .ok()
                .and_then(|ttl| humantime::parse_duration(&ttl).ok())
                .unwrap_or(Duration::from_secs(6 * 60 * 60)),

            audio_dir: env::var("AUDIO_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| env::temp_dir().join("ryouku_audio")),
            audio_max_age_secs: parse_or("AUDIO_MAX_AGE_SECS", 3600),
            speak_mention_replies: parse_or("SPEAK_MENTION_REPLIES", false),
        })
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| anyhow::anyhow!("Missing {} in environment variables", key))
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("discord_token", &"[REDACTED]")
            .field("client_id", &self.client_id)
            .field("guild_id", &self.guild_id)
            .field("register_commands", &self.register_commands)
            .field("status_message", &self.status_message)
            .field("elevenlabs_api_key", &"[REDACTED]")
            .field("elevenlabs_url", &self.elevenlabs_url)
            .field("tts_voice", &self.tts_voice)
            .field("tts_model", &self.tts_model)
            .field("tts_timeout_secs", &self.tts_timeout_secs)
            .field("groq_api_key", &"[REDACTED]")
            .field("llm_url", &self.llm_url)
            .field("llm_model", &self.llm_model)
            .field("llm_temperature", &self.llm_temperature)
            .field("llm_max_tokens", &self.llm_max_tokens)
            .field("llm_top_p", &self.llm_top_p)
            .field("llm_timeout_secs", &self.llm_timeout_secs)
            .field("system_prompt", &self.system_prompt)
            .field("max_history_length", &self.max_history_length)
            .field("max_conversations", &self.max_conversations)
            .field(
                "history_idle_ttl",
                &humantime::format_duration(self.history_idle_ttl).to_string(),
            )
            .field("audio_dir", &self.audio_dir)
            .field("audio_max_age_secs", &self.audio_max_age_secs)
            .field("speak_mention_replies", &self.speak_mention_replies)
            .finish()
    }
}

/// Discord message limit is 2000 characters
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        discord_token: "test".to_string(),
        client_id: 1,
        guild_id: None,
        register_commands: false,
        status_message: "test".to_string(),
        elevenlabs_api_key: "test".to_string(),
        elevenlabs_url: "http://localhost".to_string(),
        tts_voice: "Kira".to_string(),
        tts_model: "eleven_flash_v2_5".to_string(),
        tts_timeout_secs: 5,
        groq_api_key: "test".to_string(),
        llm_url: "http://localhost".to_string(),
        llm_model: "test-model".to_string(),
        llm_temperature: 1.0,
        llm_max_tokens: 1024,
        llm_top_p: 1.0,
        llm_timeout_secs: 5,
        system_prompt: "persona".to_string(),
        max_history_length: 10,
        max_conversations: 100,
        history_idle_ttl: Duration::from_secs(60),
        audio_dir: env::temp_dir().join("ryouku_test_audio"),
        audio_max_age_secs: 3600,
        speak_mention_replies: false,
    }
}
