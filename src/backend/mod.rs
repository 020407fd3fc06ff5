//! # Backend Module
//!
//! Seam towards the external audio backend (a Lavalink-style node).
//!
//! The queue core never touches audio itself: it instructs the backend to
//! start/pause/stop/adjust the transport for a guild and delegates search
//! resolution to it. The backend in turn reports playback events, most
//! importantly "track ended", which the composition root feeds back into
//! [`crate::processor::QueueActionProcessor::handle_track_end`] so
//! auto-advance runs through the exact same path as a user-issued skip.

pub mod lavalink;

use anyhow::Result;
use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use crate::queue::{GuildId, Track};

/// Eventos entrantes del backend de audio.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    /// Un track terminó de reproducirse; dispara el auto-avance.
    TrackEnded { guild_id: GuildId },
    /// Un track falló durante la reproducción.
    TrackFailed { guild_id: GuildId, reason: String },
}

/// Operaciones de transporte y búsqueda del backend de audio.
///
/// Errors from these calls are the [`crate::error::QueueError::Backend`]
/// class: the processor logs them and degrades, it never unwinds.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AudioBackend: Send + Sync {
    /// Empieza a sonar `track` en el servidor, reemplazando lo que suene.
    async fn play(&self, guild_id: GuildId, track: &Track) -> Result<()>;

    async fn pause(&self, guild_id: GuildId) -> Result<()>;

    async fn resume(&self, guild_id: GuildId) -> Result<()>;

    async fn stop(&self, guild_id: GuildId) -> Result<()>;

    /// Ajusta el volumen del transporte, `0..=100`.
    async fn set_volume(&self, guild_id: GuildId, volume: u8) -> Result<()>;

    /// Resuelve texto libre a candidatos. Cero resultados no es un error.
    async fn search(&self, query: &str) -> Result<Vec<Track>>;
}
