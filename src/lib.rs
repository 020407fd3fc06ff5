//! # Logos Bot
//!
//! Core of a Discord-style music bot: an immutable per-guild playback
//! queue, persisted in a shared key-value cache with an idle TTL and
//! propagated to sibling bot processes over pub/sub.
//!
//! The crate deliberately stops at the queue core. Chat gateway, slash
//! commands, voice connections and the audio pipeline itself are external
//! collaborators reached through the [`backend::AudioBackend`] seam; the
//! relational store for guild settings and saved playlists is not touched
//! here at all.

pub mod backend;
pub mod config;
pub mod error;
pub mod ingest;
pub mod processor;
pub mod queue;
pub mod store;

pub use config::Config;
pub use error::QueueError;
pub use ingest::{PlayRequest, PlayResponse, TrackIngest};
pub use processor::{QueueAction, QueueActionProcessor, QueueResponse};
pub use queue::{GuildId, QueueState, Track, UserId};
