use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use super::track::{GuildId, Track};

/// Volumen por defecto para colas recién creadas.
pub const DEFAULT_VOLUME: u8 = 50;

/// Estado completo de reproducción de un servidor.
///
/// Immutable value object: every mutator consumes `self` and returns a new
/// state, so a loaded snapshot is never aliased or changed in place. The
/// durable copy lives in the [`QueueStore`](crate::store::QueueStore); code
/// holding a `QueueState` only ever holds a call-scoped copy.
///
/// Invariants kept by every transition:
/// - `volume` stays within `0..=100`
/// - `is_playing` and `is_paused` are never both true
/// - `current_track_index` is in range while `tracks` is non-empty
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueState {
    pub guild_id: GuildId,
    pub tracks: Vec<Track>,
    pub current_track_index: usize,
    pub is_looping: bool,
    pub is_shuffled: bool,
    pub volume: u8,
    pub is_playing: bool,
    pub is_paused: bool,
}

impl QueueState {
    /// Cola vacía por defecto: volumen 50, detenida, sin shuffle ni loop.
    pub fn new(guild_id: GuildId) -> Self {
        Self {
            guild_id,
            tracks: Vec::new(),
            current_track_index: 0,
            is_looping: false,
            is_shuffled: false,
            volume: DEFAULT_VOLUME,
            is_playing: false,
            is_paused: false,
        }
    }

    pub fn add_track(mut self, track: Track) -> Self {
        self.tracks.push(track);
        self
    }

    pub fn add_tracks(mut self, tracks: Vec<Track>) -> Self {
        self.tracks.extend(tracks);
        self
    }

    /// Elimina el track en `index`. Si está antes del actual, el puntero
    /// retrocede uno para seguir señalando el mismo track lógico; si la
    /// eliminación lo deja fuera de rango, se satura al último track.
    pub fn remove_track(mut self, index: usize) -> Self {
        if index >= self.tracks.len() {
            return self;
        }
        self.tracks.remove(index);
        if index < self.current_track_index {
            self.current_track_index -= 1;
        }
        if self.current_track_index >= self.tracks.len() {
            self.current_track_index = self.tracks.len().saturating_sub(1);
        }
        self
    }

    /// Fisher–Yates sobre todo menos el track actual, que queda primero.
    pub fn shuffle(mut self) -> Self {
        if self.tracks.is_empty() {
            return self;
        }
        let current = self.tracks.remove(self.current_track_index);
        self.tracks.shuffle(&mut rand::thread_rng());
        self.tracks.insert(0, current);
        self.current_track_index = 0;
        self.is_shuffled = true;
        self
    }

    /// Satura a `0..=100` antes de almacenar.
    pub fn set_volume(mut self, volume: i64) -> Self {
        self.volume = volume.clamp(0, 100) as u8;
        self
    }

    pub fn play(mut self) -> Self {
        self.is_playing = true;
        self.is_paused = false;
        self
    }

    pub fn pause(mut self) -> Self {
        self.is_playing = false;
        self.is_paused = true;
        self
    }

    /// Avanza al siguiente track. En el final de la cola: puntero a 0 y
    /// reproducción detenida (fin de cola, no loop; `is_looping` no se
    /// consulta aquí, comportamiento heredado).
    pub fn next(mut self) -> Self {
        let next_index = self.current_track_index + 1;
        if next_index >= self.tracks.len() {
            self.current_track_index = 0;
            self.is_playing = false;
            self.is_paused = false;
        } else {
            self.current_track_index = next_index;
        }
        self
    }

    /// Retrocede un track. Desde el índice 0 envuelve al último track,
    /// conservando los flags de reproducción (asimétrico con `next`).
    pub fn previous(mut self) -> Self {
        if self.current_track_index == 0 {
            self.current_track_index = self.tracks.len().saturating_sub(1);
        } else {
            self.current_track_index -= 1;
        }
        self
    }

    /// Vacía la cola y detiene la reproducción. El volumen se conserva.
    pub fn clear(mut self) -> Self {
        self.tracks.clear();
        self.current_track_index = 0;
        self.is_looping = false;
        self.is_shuffled = false;
        self.is_playing = false;
        self.is_paused = false;
        self
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.tracks.get(self.current_track_index)
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }
}
