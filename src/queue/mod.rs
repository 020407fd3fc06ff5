//! # Queue Module
//!
//! Per-guild playback state as an immutable value object.
//!
//! [`QueueState`] holds everything there is to know about one guild's
//! playback (ordered tracks, current pointer, volume, playing/paused
//! flags) and exposes a closed set of pure transitions: each one returns
//! a new state, no I/O, no panics for valid input. Persistence and
//! broadcasting live in [`crate::store`]; side effects on the actual audio
//! transport live in [`crate::processor`].

pub mod state;
pub mod track;

pub use state::{QueueState, DEFAULT_VOLUME};
pub use track::{GuildId, Track, UserId};
