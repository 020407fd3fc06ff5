//! # Queue Action Processor
//!
//! Orchestration layer between inbound actions, the [`QueueStore`] and the
//! [`AudioBackend`]: load the current state, apply the matching pure
//! transition, persist (which publishes to sibling processes), then drive
//! the transport when the action has playback side effects.
//!
//! The store offers no conditional write, so the processor serializes all
//! mutations per guild behind a `tokio::sync::Mutex` held across the whole
//! load-transform-persist sequence. Two concurrent actions for the same
//! guild therefore never read the same prior state; across processes,
//! writes remain last-writer-wins (see DESIGN.md).

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::backend::{AudioBackend, BackendEvent};
use crate::error::QueueError;
use crate::queue::{GuildId, QueueState};
use crate::store::QueueStore;

/// Acciones de cola aceptadas, conjunto cerrado.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueAction {
    Skip,
    Pause,
    Resume,
    Stop,
    Shuffle,
    Clear,
    Previous,
    SetVolume { volume: Option<i64> },
}

impl QueueAction {
    /// Construye una acción desde la forma laxa que llega de los comandos
    /// (tag + volumen opcional). Un tag desconocido es `InvalidAction`.
    pub fn parse(tag: &str, volume: Option<i64>) -> Result<Self, QueueError> {
        match tag {
            "skip" => Ok(Self::Skip),
            "pause" => Ok(Self::Pause),
            "resume" => Ok(Self::Resume),
            "stop" => Ok(Self::Stop),
            "shuffle" => Ok(Self::Shuffle),
            "clear" => Ok(Self::Clear),
            "previous" => Ok(Self::Previous),
            "setVolume" => Ok(Self::SetVolume { volume }),
            _ => Err(QueueError::InvalidAction("Invalid queue action.".into())),
        }
    }
}

/// Resultado hacia el usuario. Los errores nunca salen como `Err`.
#[derive(Debug, Clone)]
pub struct QueueResponse {
    pub success: bool,
    pub message: String,
    pub queue: Option<QueueState>,
}

impl QueueResponse {
    fn ok(message: String, queue: QueueState) -> Self {
        Self {
            success: true,
            message,
            queue: Some(queue),
        }
    }

    fn fail(message: String) -> Self {
        Self {
            success: false,
            message,
            queue: None,
        }
    }
}

pub struct QueueActionProcessor {
    store: Arc<dyn QueueStore>,
    backend: Arc<dyn AudioBackend>,
    guild_locks: DashMap<GuildId, Arc<Mutex<()>>>,
}

impl QueueActionProcessor {
    pub fn new(store: Arc<dyn QueueStore>, backend: Arc<dyn AudioBackend>) -> Self {
        Self {
            store,
            backend,
            guild_locks: DashMap::new(),
        }
    }

    /// Mutex que serializa todas las mutaciones de un servidor.
    pub(crate) fn guild_lock(&self, guild_id: GuildId) -> Arc<Mutex<()>> {
        self.guild_locks
            .entry(guild_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub(crate) fn store(&self) -> &Arc<dyn QueueStore> {
        &self.store
    }

    pub(crate) fn backend(&self) -> &Arc<dyn AudioBackend> {
        &self.backend
    }

    /// Aplica una acción sobre la cola de un servidor.
    ///
    /// Always persists the new state (the store publishes it), even for
    /// ordering-only actions like shuffle, so observers see queue metadata
    /// change. A failed backend call is logged and reported as a failure
    /// response, but the already-persisted state stands.
    pub async fn apply(&self, guild_id: GuildId, action: QueueAction) -> QueueResponse {
        let lock = self.guild_lock(guild_id);
        let _guard = lock.lock().await;

        match self.try_apply(guild_id, action).await {
            Ok((state, message)) => {
                debug!("Acción aplicada en guild {}: {}", guild_id, message);
                QueueResponse::ok(message, state)
            }
            Err(e) => {
                warn!("Acción rechazada en guild {}: {}", guild_id, e);
                QueueResponse::fail(user_message(&e))
            }
        }
    }

    async fn try_apply(
        &self,
        guild_id: GuildId,
        action: QueueAction,
    ) -> Result<(QueueState, String), QueueError> {
        let queue = self
            .store
            .get(guild_id)
            .await
            .ok_or(QueueError::QueueNotFound)?;

        let (state, message) = match &action {
            QueueAction::Skip => (queue.next(), "Skipped to next track.".to_string()),
            QueueAction::Pause => (queue.pause(), "Music paused.".to_string()),
            QueueAction::Resume => (queue.play(), "Music resumed.".to_string()),
            QueueAction::Stop => (
                queue.clear(),
                "Music stopped and queue cleared.".to_string(),
            ),
            QueueAction::Shuffle => (queue.shuffle(), "Queue shuffled.".to_string()),
            QueueAction::Clear => (queue.clear(), "Queue cleared.".to_string()),
            QueueAction::Previous => (queue.previous(), "Skipped to previous track.".to_string()),
            QueueAction::SetVolume { volume } => {
                let volume = (*volume).ok_or_else(|| {
                    QueueError::InvalidAction(
                        "Volume value is required for setVolume action.".into(),
                    )
                })?;
                let state = queue.set_volume(volume);
                let message = format!("Volume set to {}%.", state.volume);
                (state, message)
            }
        };

        // Persistir siempre, haya o no llamada al backend: el set publica
        // el estado y los observadores ven también los cambios de metadatos.
        self.store.set(guild_id, &state).await;

        self.transport_effects(guild_id, &action, &state)
            .await
            .map_err(QueueError::Backend)?;

        Ok((state, message))
    }

    /// Efectos sobre el transporte de audio, según la acción.
    async fn transport_effects(
        &self,
        guild_id: GuildId,
        action: &QueueAction,
        state: &QueueState,
    ) -> anyhow::Result<()> {
        match action {
            QueueAction::Skip => match state.current_track() {
                Some(track) => self.backend.play(guild_id, track).await,
                None => self.backend.stop(guild_id).await,
            },
            QueueAction::Pause => self.backend.pause(guild_id).await,
            QueueAction::Resume => self.backend.resume(guild_id).await,
            QueueAction::Stop => self.backend.stop(guild_id).await,
            QueueAction::Previous => match state.current_track() {
                Some(track) => self.backend.play(guild_id, track).await,
                None => Ok(()),
            },
            // El backend recibe el valor ya saturado, no el pedido crudo.
            QueueAction::SetVolume { .. } => self.backend.set_volume(guild_id, state.volume).await,
            // Solo cambian orden/metadatos, el transporte no se toca.
            QueueAction::Shuffle | QueueAction::Clear => Ok(()),
        }
    }

    /// Auto-avance: el backend avisó que terminó un track.
    ///
    /// Deliberately the same entry point as a user-issued skip, with the same
    /// transition, persistence and broadcast, so the two paths can
    /// never diverge.
    pub async fn handle_track_end(&self, guild_id: GuildId) {
        info!("⏭️ Track terminado en guild {}, auto-avance", guild_id);
        let response = self.apply(guild_id, QueueAction::Skip).await;
        if !response.success {
            warn!(
                "Auto-avance falló en guild {}: {}",
                guild_id, response.message
            );
        }
    }

    /// Punto de entrada para la bomba de eventos del backend.
    pub async fn handle_event(&self, event: BackendEvent) {
        match event {
            BackendEvent::TrackEnded { guild_id } => self.handle_track_end(guild_id).await,
            BackendEvent::TrackFailed { guild_id, reason } => {
                warn!("Track falló en guild {}: {}", guild_id, reason);
            }
        }
    }
}

fn user_message(error: &QueueError) -> String {
    match error {
        QueueError::QueueNotFound | QueueError::InvalidAction(_) => error.to_string(),
        QueueError::Backend(_) => "An error occurred while managing the queue.".to_string(),
    }
}
