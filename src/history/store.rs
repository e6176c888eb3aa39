use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use lru::LruCache;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use super::{ConversationHistory, PriorMessage};

/// Exclusive access to one conversation. Holding it serializes every other
/// task that wants the same conversation.
pub type HistoryHandle = OwnedMutexGuard<ConversationHistory>;

struct Slot {
    history: Arc<AsyncMutex<ConversationHistory>>,
    last_used: Instant,
}

impl Slot {
    /// A handle or a waiter still refers to the conversation.
    fn in_use(&self) -> bool {
        Arc::strong_count(&self.history) > 1
    }
}

/// Conversation histories keyed by channel id.
///
/// The map is bounded twice: by `max_conversations` (least recently used
/// conversation dropped first) and by `idle_ttl` via [`HistoryStore::evict_idle`].
/// A conversation that is held or awaited is never dropped, so the count bound
/// may be exceeded until those requests finish.
pub struct HistoryStore {
    persona: String,
    cap: usize,
    max_conversations: usize,
    idle_ttl: Duration,
    slots: Mutex<LruCache<u64, Slot>>,
}

impl HistoryStore {
    pub fn new(
        persona: impl Into<String>,
        cap: usize,
        max_conversations: usize,
        idle_ttl: Duration,
    ) -> Self {
        Self {
            persona: persona.into(),
            cap,
            max_conversations: max_conversations.max(1),
            idle_ttl,
            slots: Mutex::new(LruCache::unbounded()),
        }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    fn slots(&self) -> MutexGuard<'_, LruCache<u64, Slot>> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn slot(&self, conversation_id: u64) -> Arc<AsyncMutex<ConversationHistory>> {
        let mut slots = self.slots();
        let now = Instant::now();
        if let Some(slot) = slots.get_mut(&conversation_id) {
            slot.last_used = now;
            return slot.history.clone();
        }

        let history = Arc::new(AsyncMutex::new(ConversationHistory::new(
            self.persona.clone(),
            self.cap,
        )));
        slots.put(
            conversation_id,
            Slot {
                history: history.clone(),
                last_used: now,
            },
        );
        self.shrink_to_limit(&mut slots);
        history
    }

    /// Drops least recently used conversations over `max_conversations`,
    /// skipping any that are in use.
    fn shrink_to_limit(&self, slots: &mut LruCache<u64, Slot>) {
        let excess = slots.len().saturating_sub(self.max_conversations);
        if excess == 0 {
            return;
        }

        let victims: Vec<u64> = slots
            .iter()
            .rev()
            .filter(|(_, slot)| !slot.in_use())
            .map(|(id, _)| *id)
            .take(excess)
            .collect();
        for id in victims {
            slots.pop(&id);
            debug!("History store full, dropped conversation {}", id);
        }
    }

    /// Returns the conversation, creating and seeding it on first use.
    ///
    /// `fetch_prior` receives a message limit and is only called for a fresh
    /// conversation. A failed fetch leaves the history with just the persona.
    pub async fn get_or_create<F, Fut>(
        &self,
        conversation_id: u64,
        bot_id: u64,
        trigger: &str,
        fetch_prior: F,
    ) -> HistoryHandle
    where
        F: FnOnce(usize) -> Fut,
        Fut: Future<Output = anyhow::Result<Vec<PriorMessage>>>,
    {
        let mut handle = self.slot(conversation_id).lock_owned().await;
        if !handle.is_seeded() {
            match fetch_prior(self.cap).await {
                Ok(prior) => {
                    handle.seed(&prior, bot_id, trigger);
                    debug!(
                        "Seeded conversation {} with {} prior messages",
                        conversation_id,
                        handle.len() - 1
                    );
                }
                Err(e) => {
                    warn!(
                        "Failed to fetch message history for conversation {}: {}",
                        conversation_id, e
                    );
                    handle.mark_seeded();
                }
            }
        }
        handle
    }

    pub fn contains(&self, conversation_id: u64) -> bool {
        self.slots().contains(&conversation_id)
    }

    pub fn remove(&self, conversation_id: u64) -> bool {
        self.slots().pop(&conversation_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots().is_empty()
    }

    pub fn evict_idle(&self) -> usize {
        self.evict_idle_at(Instant::now())
    }

    /// Drops every conversation last used more than `idle_ttl` before `now`
    /// that nobody holds or waits on.
    pub fn evict_idle_at(&self, now: Instant) -> usize {
        let mut slots = self.slots();
        let stale: Vec<u64> = slots
            .iter()
            .filter(|(_, slot)| {
                !slot.in_use() && now.saturating_duration_since(slot.last_used) > self.idle_ttl
            })
            .map(|(id, _)| *id)
            .collect();
        for id in &stale {
            slots.pop(id);
        }
        self.shrink_to_limit(&mut slots);
        stale.len()
    }
}

/// Periodically drops idle conversations.
pub async fn start_eviction_task(store: Arc<HistoryStore>, every: Duration) {
    info!(
        "Starting history eviction task (idle ttl {})",
        humantime::format_duration(store.idle_ttl)
    );
    let mut ticker = tokio::time::interval(every);

    loop {
        ticker.tick().await;
        let evicted = store.evict_idle();
        if evicted > 0 {
            info!(
                "Evicted {} idle conversations, {} remain",
                evicted,
                store.len()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{ChatMessage, Role};

    fn store() -> HistoryStore {
        HistoryStore::new("persona", 10, 100, Duration::from_secs(60))
    }

    async fn no_prior(_limit: usize) -> anyhow::Result<Vec<PriorMessage>> {
        Ok(Vec::new())
    }

    async fn unexpected_fetch(_limit: usize) -> anyhow::Result<Vec<PriorMessage>> {
        panic!("fetch must not run for an existing conversation")
    }

    #[tokio::test]
    async fn test_created_lazily_with_persona() {
        let store = store();
        assert!(store.is_empty());

        let handle = store.get_or_create(1, 999, "hi", no_prior).await;
        assert_eq!(handle.as_ordered_list(), &[ChatMessage::system("persona")]);
        drop(handle);

        assert!(store.contains(1));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_seeds_only_once() {
        let store = store();
        let handle = store
            .get_or_create(1, 999, "hi", |limit| async move {
                assert_eq!(limit, 10);
                Ok::<_, anyhow::Error>(vec![PriorMessage {
                    author_id: 5,
                    content: "earlier".to_string(),
                }])
            })
            .await;
        assert_eq!(handle.len(), 2);
        drop(handle);

        let handle = store
            .get_or_create(1, 999, "hi", unexpected_fetch)
            .await;
        assert_eq!(handle.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_persona_only() {
        let store = store();
        let handle = store
            .get_or_create(1, 999, "hi", |_| async {
                Err::<Vec<PriorMessage>, _>(anyhow::anyhow!("offline"))
            })
            .await;
        assert_eq!(handle.len(), 1);
        assert!(handle.is_seeded());
    }

    #[tokio::test]
    async fn test_mutations_persist_between_handles() {
        let store = store();
        let mut handle = store.get_or_create(7, 999, "hi", no_prior).await;
        handle.append(Role::User, "hi");
        drop(handle);

        let handle = store.get_or_create(7, 999, "again", no_prior).await;
        assert_eq!(handle.as_ordered_list()[1], ChatMessage::user("hi"));
    }

    #[tokio::test]
    async fn test_conversations_are_isolated() {
        let store = store();
        let mut first = store.get_or_create(1, 999, "a", no_prior).await;
        first.append(Role::User, "a");

        // A second conversation is reachable while the first is held.
        let second = store.get_or_create(2, 999, "b", no_prior).await;
        assert_eq!(second.len(), 1);
        assert_eq!(first.len(), 2);
    }

    #[tokio::test]
    async fn test_same_conversation_is_serialized() {
        let store = Arc::new(store());
        let handle = store.get_or_create(1, 999, "hi", no_prior).await;

        let waiter = {
            let store = store.clone();
            tokio::spawn(async move {
                let mut handle = store.get_or_create(1, 999, "hi", no_prior).await;
                handle.append(Role::User, "second");
            })
        };

        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());
        drop(handle);
        waiter.await.unwrap();

        let handle = store.get_or_create(1, 999, "hi", no_prior).await;
        assert_eq!(handle.as_ordered_list()[1].content(), "second");
    }

    #[tokio::test]
    async fn test_lru_bound_on_conversations() {
        let store = HistoryStore::new("persona", 10, 2, Duration::from_secs(60));
        for id in 1..=3 {
            let _ = store.get_or_create(id, 999, "hi", no_prior).await;
        }
        assert_eq!(store.len(), 2);
        assert!(!store.contains(1));
        assert!(store.contains(3));
    }

    #[tokio::test]
    async fn test_evict_idle() {
        let store = store();
        let _ = store.get_or_create(1, 999, "hi", no_prior).await;
        let _ = store.get_or_create(2, 999, "hi", no_prior).await;

        assert_eq!(store.evict_idle_at(Instant::now()), 0);
        assert_eq!(store.len(), 2);

        let later = Instant::now() + Duration::from_secs(61);
        assert_eq!(store.evict_idle_at(later), 2);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_idle_eviction_spares_held_conversation() {
        let store = HistoryStore::new("persona", 10, 100, Duration::from_secs(1));
        let mut held = store.get_or_create(1, 999, "hi", no_prior).await;
        held.append(Role::User, "in flight");

        let later = Instant::now() + Duration::from_secs(2);
        assert_eq!(store.evict_idle_at(later), 0);
        assert!(store.contains(1));

        let second = tokio::time::timeout(
            Duration::from_millis(50),
            store.get_or_create(1, 999, "hi", unexpected_fetch),
        )
        .await;
        assert!(second.is_err(), "conversation must stay locked while held");

        drop(held);
        assert_eq!(store.evict_idle_at(later), 1);
        assert!(!store.contains(1));
    }

    #[tokio::test]
    async fn test_lru_bound_spares_held_conversation() {
        let store = HistoryStore::new("persona", 10, 1, Duration::from_secs(60));
        let first = store.get_or_create(1, 999, "hi", no_prior).await;
        let second = store.get_or_create(2, 999, "hi", no_prior).await;
        assert!(store.contains(1));
        assert!(store.contains(2));

        let again = tokio::time::timeout(
            Duration::from_millis(50),
            store.get_or_create(1, 999, "hi", unexpected_fetch),
        )
        .await;
        assert!(again.is_err(), "conversation must stay locked while held");

        drop(first);
        drop(second);
        let _ = store.get_or_create(3, 999, "hi", no_prior).await;
        assert_eq!(store.len(), 1);
        assert!(store.contains(3));
    }

    #[tokio::test]
    async fn test_remove() {
        let store = store();
        let _ = store.get_or_create(1, 999, "hi", no_prior).await;
        assert!(store.remove(1));
        assert!(!store.remove(1));
    }
}
