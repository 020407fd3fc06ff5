//! # Store Module
//!
//! Cache-backed persistence for [`QueueState`], shared between bot
//! processes.
//!
//! The durable copy of every guild queue lives under `queue:<guildId>`
//! with an idle TTL, and every successful write is published, serialized,
//! on `music:queue:<guildId>` so sibling processes can refresh their local
//! views without polling. Two implementations share the contract:
//!
//! - [`redis::RedisQueueStore`]: the production store (SETEX + PUBLISH,
//!   one pattern-subscription feeding local subscribers)
//! - [`memory::MemoryQueueStore`]: in-process store for tests and
//!   single-process deployments without Redis
//!
//! Transport failures degrade instead of propagating: `get` answers
//! "absent", `set` becomes a no-op, both are logged. Callers must not
//! assume a `set` has durably succeeded, and cannot distinguish "no queue"
//! from "store unreachable".

pub mod memory;
pub mod redis;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::queue::{GuildId, QueueState};

/// TTL de inactividad por defecto para colas almacenadas, en segundos.
pub const DEFAULT_QUEUE_TTL_SECS: u64 = 3600;

const QUEUE_KEY_PREFIX: &str = "queue:";
const QUEUE_TOPIC_PREFIX: &str = "music:queue:";

/// Clave de caché para la cola de un servidor.
pub fn queue_key(guild_id: GuildId) -> String {
    format!("{QUEUE_KEY_PREFIX}{guild_id}")
}

/// Canal de broadcast para las actualizaciones de cola de un servidor.
pub fn queue_topic(guild_id: GuildId) -> String {
    format!("{QUEUE_TOPIC_PREFIX}{guild_id}")
}

/// Patrón PSUBSCRIBE que cubre los canales de todos los servidores.
pub fn queue_topic_pattern() -> String {
    format!("{QUEUE_TOPIC_PREFIX}*")
}

/// Extrae el guild id de un nombre de canal `music:queue:<guildId>`.
pub fn guild_from_topic(topic: &str) -> Option<GuildId> {
    topic
        .strip_prefix(QUEUE_TOPIC_PREFIX)
        .and_then(|raw| raw.parse().ok())
        .map(GuildId)
}

/// Repositorio de colas: carga/guarda por servidor y notifica cambios.
///
/// Each `set` is a full overwrite that also re-arms the idle TTL. There is
/// no conditional write; serialization of concurrent mutators is the
/// processor's job (see [`crate::processor`]).
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Devuelve la cola almacenada, o `None` si no existe (o el store
    /// no está disponible).
    async fn get(&self, guild_id: GuildId) -> Option<QueueState>;

    /// Sobrescribe la cola, rearma el TTL y publica el nuevo estado.
    async fn set(&self, guild_id: GuildId, state: &QueueState);

    /// Se suscribe a las actualizaciones de cola de un servidor.
    ///
    /// Best-effort: a subscriber that lags or joins late simply misses
    /// those updates and sees the next one.
    fn subscribe(&self, guild_id: GuildId) -> broadcast::Receiver<QueueState>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_and_topic_are_keyed_by_guild() {
        assert_eq!(queue_key(GuildId(123)), "queue:123");
        assert_eq!(queue_topic(GuildId(123)), "music:queue:123");
    }

    #[test]
    fn topic_pattern_covers_all_guilds() {
        assert_eq!(queue_topic_pattern(), "music:queue:*");
    }

    #[test]
    fn guild_parses_back_out_of_topic() {
        assert_eq!(guild_from_topic("music:queue:42"), Some(GuildId(42)));
        assert_eq!(guild_from_topic("music:queue:nope"), None);
        assert_eq!(guild_from_topic("other:topic"), None);
    }
}
