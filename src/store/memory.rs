use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::debug;

use super::{QueueStore, DEFAULT_QUEUE_TTL_SECS};
use crate::queue::{GuildId, QueueState};

const TOPIC_CAPACITY: usize = 32;

struct Entry {
    state: QueueState,
    expires_at: Instant,
}

/// Store de colas en memoria, mismo contrato que el de Redis.
///
/// Used as the test double and for single-process deployments without a
/// Redis at hand. Expiry is lazy: an entry past its deadline is dropped on
/// the next `get`, silently, same as a Redis key timing out.
pub struct MemoryQueueStore {
    entries: DashMap<GuildId, Entry>,
    topics: DashMap<GuildId, broadcast::Sender<QueueState>>,
    ttl: Duration,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self::with_ttl(Duration::from_secs(DEFAULT_QUEUE_TTL_SECS))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            topics: DashMap::new(),
            ttl,
        }
    }
}

impl Default for MemoryQueueStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn get(&self, guild_id: GuildId) -> Option<QueueState> {
        let expired = match self.entries.get(&guild_id) {
            Some(entry) if entry.expires_at > Instant::now() => {
                return Some(entry.state.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            debug!("Cola de guild {} expirada por TTL", guild_id);
            self.entries.remove(&guild_id);
        }
        None
    }

    async fn set(&self, guild_id: GuildId, state: &QueueState) {
        self.entries.insert(
            guild_id,
            Entry {
                state: state.clone(),
                expires_at: Instant::now() + self.ttl,
            },
        );
        if let Some(sender) = self.topics.get(&guild_id) {
            // Sin suscriptores el send falla; no es un error.
            let _ = sender.send(state.clone());
        }
    }

    fn subscribe(&self, guild_id: GuildId) -> broadcast::Receiver<QueueState> {
        self.topics
            .entry(guild_id)
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
            .subscribe()
    }
}
