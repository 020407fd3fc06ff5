use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identificador de servidor (guild). Clave de partición de todo el estado.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuildId(pub u64);

impl fmt::Display for GuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Un elemento reproducible. Inmutable una vez creado.
///
/// `url` is the opaque playable reference handed back by the audio backend
/// (for Lavalink this is the encoded track blob, not an HTTP URL); `id` is
/// the backend's own identifier for the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub title: String,
    pub author: String,
    /// Duración en milisegundos
    pub duration_ms: u64,
    pub url: String,
    pub thumbnail: Option<String>,
    pub requester_id: UserId,
    pub added_at: DateTime<Utc>,
}

impl Track {
    /// Formato corto para logs y mensajes al usuario.
    pub fn describe(&self) -> String {
        format!("**{}** by {}", self.title, self.author)
    }
}
