use anyhow::{Context as _, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use futures::StreamExt;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::{guild_from_topic, queue_key, queue_topic, queue_topic_pattern, QueueStore};
use crate::queue::{GuildId, QueueState};

const TOPIC_CAPACITY: usize = 32;

type TopicMap = DashMap<GuildId, broadcast::Sender<QueueState>>;

/// Store de colas respaldado por Redis, compartido entre procesos.
///
/// Writes go through a single pipeline (SETEX + PUBLISH) so the payload
/// stored and the payload broadcast are always the same bytes. A background
/// task holds one pattern subscription on `music:queue:*` and fans incoming
/// messages (our own publishes included) out to per-guild local channels,
/// which is what [`QueueStore::subscribe`] hands out.
pub struct RedisQueueStore {
    conn: ConnectionManager,
    topics: Arc<TopicMap>,
    ttl_secs: u64,
}

impl RedisQueueStore {
    /// Conecta al servidor Redis e inicia la tarea de suscripción.
    pub async fn connect(url: &str, ttl_secs: u64) -> Result<Self> {
        let client = redis::Client::open(url).context("URL de Redis inválida")?;
        let conn = ConnectionManager::new(client.clone())
            .await
            .context("No se pudo conectar a Redis")?;

        let mut pubsub = client
            .get_async_pubsub()
            .await
            .context("No se pudo abrir la conexión de suscripción a Redis")?;
        pubsub
            .psubscribe(queue_topic_pattern())
            .await
            .context("PSUBSCRIBE falló")?;

        let topics: Arc<TopicMap> = Arc::new(DashMap::new());
        tokio::spawn(fan_out(pubsub, Arc::clone(&topics)));

        info!("📡 Conectado a Redis, escuchando {}", queue_topic_pattern());
        Ok(Self { conn, topics, ttl_secs })
    }

    /// Ping de salud contra el servidor.
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .context("PING a Redis falló")?;
        debug!("Redis PING: {}", pong);
        Ok(())
    }
}

/// Reparte los mensajes del patrón a los canales locales por servidor.
async fn fan_out(pubsub: redis::aio::PubSub, topics: Arc<TopicMap>) {
    let mut stream = pubsub.into_on_message();
    while let Some(msg) = stream.next().await {
        let channel = msg.get_channel_name().to_string();
        let Some(guild_id) = guild_from_topic(&channel) else {
            debug!("Mensaje en canal inesperado: {}", channel);
            continue;
        };
        let payload: String = match msg.get_payload() {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Payload ilegible en {}: {}", channel, e);
                continue;
            }
        };
        match serde_json::from_str::<QueueState>(&payload) {
            Ok(state) => {
                if let Some(sender) = topics.get(&guild_id) {
                    // Sin suscriptores el send falla; no es un error.
                    let _ = sender.send(state);
                }
            }
            Err(e) => warn!("Estado de cola corrupto en {}: {}", channel, e),
        }
    }
    warn!("📡 Suscripción a Redis terminada, sin más actualizaciones remotas");
}

#[async_trait]
impl QueueStore for RedisQueueStore {
    async fn get(&self, guild_id: GuildId) -> Option<QueueState> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = match conn.get(queue_key(guild_id)).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Redis GET falló para guild {}: {}", guild_id, e);
                return None;
            }
        };
        raw.and_then(|raw| match serde_json::from_str(&raw) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!("Cola almacenada corrupta para guild {}: {}", guild_id, e);
                None
            }
        })
    }

    async fn set(&self, guild_id: GuildId, state: &QueueState) {
        let raw = match serde_json::to_string(state) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("No se pudo serializar la cola de guild {}: {}", guild_id, e);
                return;
            }
        };
        let mut conn = self.conn.clone();
        let result: redis::RedisResult<()> = redis::pipe()
            .set_ex(queue_key(guild_id), &raw, self.ttl_secs)
            .ignore()
            .publish(queue_topic(guild_id), &raw)
            .ignore()
            .query_async(&mut conn)
            .await;
        if let Err(e) = result {
            warn!("Redis SET/PUBLISH falló para guild {}: {}", guild_id, e);
        }
    }

    fn subscribe(&self, guild_id: GuildId) -> broadcast::Receiver<QueueState> {
        self.topics
            .entry(guild_id)
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
            .subscribe()
    }
}

