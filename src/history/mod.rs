//! Bounded per-conversation chat history
//!
//! Each conversation keeps the persona message pinned at index 0 followed by
//! the most recent turns, oldest-first. Growth past the cap drops the oldest
//! non-persona turns.

pub mod store;

pub use store::{HistoryHandle, HistoryStore};

use crate::discord_text::strip_bot_mentions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    role: Role,
    content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// A message fetched from the channel, used to seed a fresh conversation.
#[derive(Debug, Clone)]
pub struct PriorMessage {
    pub author_id: u64,
    pub content: String,
}

impl From<&poise::serenity_prelude::Message> for PriorMessage {
    fn from(msg: &poise::serenity_prelude::Message) -> Self {
        Self {
            author_id: msg.author.id.get(),
            content: msg.content.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConversationHistory {
    messages: Vec<ChatMessage>,
    cap: usize,
    seeded: bool,
}

impl ConversationHistory {
    /// Creates a history holding only the persona. `cap` counts the persona
    /// and is clamped to at least 2 so one turn always fits.
    pub fn new(persona: impl Into<String>, cap: usize) -> Self {
        Self {
            messages: vec![ChatMessage::system(persona)],
            cap: cap.max(2),
            seeded: false,
        }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Always false: the persona is never evicted.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    /// Replays recent channel messages (oldest-first) after the persona.
    ///
    /// Messages authored by `bot_id` become assistant turns, everything else
    /// becomes a user turn with bot mentions stripped. Empty messages and
    /// messages whose text matches `trigger` are skipped; at most `cap - 1`
    /// of the newest remaining messages are kept.
    pub fn seed(&mut self, prior: &[PriorMessage], bot_id: u64, trigger: &str) {
        let trigger = trigger.trim();

        let turns: Vec<ChatMessage> = prior
            .iter()
            .filter_map(|msg| {
                let message = if msg.author_id == bot_id {
                    ChatMessage::assistant(msg.content.trim())
                } else {
                    ChatMessage::user(strip_bot_mentions(&msg.content, bot_id))
                };
                let text = message.content().trim();
                if text.is_empty() || text == trigger || msg.content.trim() == trigger {
                    return None;
                }
                Some(message)
            })
            .collect();

        let skip = turns.len().saturating_sub(self.cap - 1);
        self.messages.extend(turns.into_iter().skip(skip));
        self.seeded = true;
    }

    /// Marks the history as seeded without replaying anything.
    pub fn mark_seeded(&mut self) {
        self.seeded = true;
    }

    pub fn append(&mut self, role: Role, content: impl Into<String>) {
        self.messages.push(ChatMessage::new(role, content));
    }

    /// Drops the oldest turns after the persona until the cap holds.
    pub fn trim(&mut self) {
        if self.messages.len() > self.cap {
            let excess = self.messages.len() - self.cap;
            self.messages.drain(1..1 + excess);
        }
    }

    pub fn as_ordered_list(&self) -> &[ChatMessage] {
        &self.messages
    }
}
