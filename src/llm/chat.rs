//! Mention-driven chat flow
//!
//! Pulls the conversation out of the history store, submits it to the
//! completion backend and records the answer. The conversation stays locked
//! for the whole round trip so concurrent mentions in one channel queue up.

use std::future::Future;
use std::sync::Arc;
use tracing::{error, info};

use super::CompletionClient;
use crate::config::FALLBACK_REPLY;
use crate::history::{HistoryStore, PriorMessage, Role};

pub struct ChatService {
    store: Arc<HistoryStore>,
    completion: Arc<dyn CompletionClient>,
}

impl ChatService {
    pub fn new(store: Arc<HistoryStore>, completion: Arc<dyn CompletionClient>) -> Self {
        Self { store, completion }
    }

    pub fn store(&self) -> &Arc<HistoryStore> {
        &self.store
    }

    /// Generates the reply to `text` in `conversation_id`.
    ///
    /// Never fails: backend errors and empty completions yield
    /// [`FALLBACK_REPLY`]. The user turn is kept in history either way; the
    /// assistant turn is only recorded on success.
    pub async fn respond<F, Fut>(
        &self,
        conversation_id: u64,
        bot_id: u64,
        text: &str,
        fetch_prior: F,
    ) -> String
    where
        F: FnOnce(usize) -> Fut,
        Fut: Future<Output = anyhow::Result<Vec<PriorMessage>>>,
    {
        let mut history = self
            .store
            .get_or_create(conversation_id, bot_id, text, fetch_prior)
            .await;

        history.append(Role::User, text);
        history.trim();

        match self.completion.complete(history.as_ordered_list()).await {
            Ok(reply) if !reply.trim().is_empty() => {
                history.append(Role::Assistant, reply.clone());
                history.trim();
                info!(
                    "Generated reply in conversation {} ({} messages retained)",
                    conversation_id,
                    history.len()
                );
                reply
            }
            Ok(_) => {
                error!("Empty completion in conversation {}", conversation_id);
                FALLBACK_REPLY.to_string()
            }
            Err(e) => {
                error!(
                    "Error generating AI chat response in conversation {}: {}",
                    conversation_id, e
                );
                FALLBACK_REPLY.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::ChatMessage;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replays scripted outcomes and records every transcript it was given.
    struct ScriptedCompletion {
        outcomes: Mutex<Vec<anyhow::Result<String>>>,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedCompletion {
        fn new(outcomes: Vec<anyhow::Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedCompletion {
        async fn complete(&self, messages: &[ChatMessage]) -> anyhow::Result<String> {
            self.seen.lock().unwrap().push(messages.to_vec());
            self.outcomes.lock().unwrap().remove(0)
        }
    }

    /// Never answers, standing in for a hung backend.
    struct StalledCompletion;

    #[async_trait]
    impl CompletionClient for StalledCompletion {
        async fn complete(&self, _messages: &[ChatMessage]) -> anyhow::Result<String> {
            tokio::time::timeout(Duration::from_millis(10), std::future::pending::<()>())
                .await
                .map_err(|_| anyhow::anyhow!("timed out"))?;
            Ok("unreachable".to_string())
        }
    }

    const BOT_ID: u64 = 999;

    fn store() -> Arc<HistoryStore> {
        Arc::new(HistoryStore::new("P", 10, 100, Duration::from_secs(60)))
    }

    async fn no_prior(_limit: usize) -> anyhow::Result<Vec<PriorMessage>> {
        Ok(Vec::new())
    }

    async fn history_of(store: &HistoryStore, id: u64) -> Vec<ChatMessage> {
        store
            .get_or_create(id, BOT_ID, "", no_prior)
            .await
            .as_ordered_list()
            .to_vec()
    }

    #[tokio::test]
    async fn test_reply_is_recorded() {
        let store = store();
        let completion = ScriptedCompletion::new(vec![Ok("hello".to_string())]);
        let chat = ChatService::new(store.clone(), completion.clone());

        let reply = chat.respond(1, BOT_ID, "hi", no_prior).await;
        assert_eq!(reply, "hello");

        let submitted = completion.seen.lock().unwrap()[0].clone();
        assert_eq!(submitted, vec![ChatMessage::system("P"), ChatMessage::user("hi")]);

        assert_eq!(
            history_of(&store, 1).await,
            vec![
                ChatMessage::system("P"),
                ChatMessage::user("hi"),
                ChatMessage::assistant("hello"),
            ]
        );
    }

    #[tokio::test]
    async fn test_timeout_returns_fallback_and_keeps_user_turn() {
        let store = store();
        let chat = ChatService::new(store.clone(), Arc::new(StalledCompletion));

        let reply = chat.respond(1, BOT_ID, "hi", no_prior).await;
        assert_eq!(reply, FALLBACK_REPLY);

        assert_eq!(
            history_of(&store, 1).await,
            vec![ChatMessage::system("P"), ChatMessage::user("hi")]
        );
    }

    #[tokio::test]
    async fn test_empty_completion_returns_fallback() {
        let store = store();
        let completion = ScriptedCompletion::new(vec![Ok("   ".to_string())]);
        let chat = ChatService::new(store.clone(), completion);

        assert_eq!(chat.respond(1, BOT_ID, "hi", no_prior).await, FALLBACK_REPLY);
        assert_eq!(history_of(&store, 1).await.len(), 2);
    }

    #[tokio::test]
    async fn test_unanswered_turns_accumulate() {
        let store = store();
        let completion = ScriptedCompletion::new(vec![
            Err(anyhow::anyhow!("boom")),
            Ok("finally".to_string()),
        ]);
        let chat = ChatService::new(store.clone(), completion.clone());

        chat.respond(1, BOT_ID, "first", no_prior).await;
        chat.respond(1, BOT_ID, "second", no_prior).await;

        let second_submission = completion.seen.lock().unwrap()[1].clone();
        assert_eq!(
            second_submission,
            vec![
                ChatMessage::system("P"),
                ChatMessage::user("first"),
                ChatMessage::user("second"),
            ]
        );
    }

    #[tokio::test]
    async fn test_seeded_context_is_submitted() {
        let store = store();
        let completion = ScriptedCompletion::new(vec![Ok("sure".to_string())]);
        let chat = ChatService::new(store, completion.clone());

        chat.respond(1, BOT_ID, "again?", |_| async {
            Ok::<_, anyhow::Error>(vec![
                PriorMessage {
                    author_id: 5,
                    content: "<@999> sing something".to_string(),
                },
                PriorMessage {
                    author_id: BOT_ID,
                    content: "la la la".to_string(),
                },
                PriorMessage {
                    author_id: 5,
                    content: "<@999> again?".to_string(),
                },
            ])
        })
        .await;

        let submitted = completion.seen.lock().unwrap()[0].clone();
        assert_eq!(
            submitted,
            vec![
                ChatMessage::system("P"),
                ChatMessage::user("sing something"),
                ChatMessage::assistant("la la la"),
                ChatMessage::user("again?"),
            ]
        );
    }

    #[tokio::test]
    async fn test_history_stays_within_cap() {
        let store = Arc::new(HistoryStore::new("P", 4, 100, Duration::from_secs(60)));
        let outcomes = (0..10).map(|i| Ok(format!("reply {}", i))).collect();
        let chat = ChatService::new(store.clone(), ScriptedCompletion::new(outcomes));

        for i in 0..10 {
            chat.respond(1, BOT_ID, &format!("message {}", i), no_prior).await;
        }

        let history = history_of(&store, 1).await;
        assert_eq!(history.len(), 4);
        assert_eq!(history[0], ChatMessage::system("P"));
        assert_eq!(history[3], ChatMessage::assistant("reply 9"));
    }
}
