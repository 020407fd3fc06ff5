//! # Track Ingestion
//!
//! Turns free text into queued tracks: resolve candidates through the
//! audio backend, stamp the requester, append to the guild queue (creating
//! the default queue on first use) and start playback if nothing sounds.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use crate::processor::QueueActionProcessor;
use crate::queue::{GuildId, QueueState, Track, UserId};

/// Petición "play" de un usuario.
#[derive(Debug, Clone)]
pub struct PlayRequest {
    pub guild_id: GuildId,
    pub requester_id: UserId,
    pub query: String,
}

/// Resultado hacia el usuario, mismo sobre `{success, message}` que las
/// acciones de cola.
#[derive(Debug, Clone)]
pub struct PlayResponse {
    pub success: bool,
    pub message: String,
    pub track: Option<Track>,
    pub queue_length: Option<usize>,
}

impl PlayResponse {
    fn fail(message: &str) -> Self {
        Self {
            success: false,
            message: message.to_string(),
            track: None,
            queue_length: None,
        }
    }
}

/// Intake de tracks. Comparte los locks por servidor del procesador para
/// que encolar y las acciones de cola queden serializados entre sí.
pub struct TrackIngest {
    processor: Arc<QueueActionProcessor>,
}

impl TrackIngest {
    pub fn new(processor: Arc<QueueActionProcessor>) -> Self {
        Self { processor }
    }

    /// Resuelve `query` y encola el primer candidato.
    ///
    /// Zero search hits is a normal outcome, reported as a friendly
    /// message. The first track ever queued for a guild creates its
    /// default state (volume 50, stopped) implicitly.
    pub async fn play(&self, request: PlayRequest) -> PlayResponse {
        let tracks = match self.processor.backend().search(&request.query).await {
            Ok(tracks) => tracks,
            Err(e) => {
                warn!("Búsqueda falló para {:?}: {}", request.query, e);
                return PlayResponse::fail("An error occurred while trying to play music.");
            }
        };

        let Some(found) = tracks.into_iter().next() else {
            return PlayResponse::fail("No tracks found for your search query.");
        };
        let track = Track {
            requester_id: request.requester_id,
            added_at: Utc::now(),
            ..found
        };

        let lock = self.processor.guild_lock(request.guild_id);
        let _guard = lock.lock().await;

        let queue = self
            .processor
            .store()
            .get(request.guild_id)
            .await
            .unwrap_or_else(|| QueueState::new(request.guild_id));

        let was_playing = queue.is_playing;
        let mut updated = queue.add_track(track.clone());
        if !was_playing {
            updated = updated.play();
        }
        self.processor.store().set(request.guild_id, &updated).await;

        if !was_playing {
            if let Some(current) = updated.current_track() {
                if let Err(e) = self
                    .processor
                    .backend()
                    .play(request.guild_id, current)
                    .await
                {
                    // El estado ya quedó persistido por delante del
                    // transporte; se informa el fallo al usuario.
                    warn!(
                        "No se pudo iniciar la reproducción en guild {}: {}",
                        request.guild_id, e
                    );
                    return PlayResponse::fail("An error occurred while trying to play music.");
                }
            }
        }

        info!(
            "➕ Encolado en guild {}: {} (pos {})",
            request.guild_id,
            track.title,
            updated.len()
        );
        PlayResponse {
            success: true,
            message: format!("Now playing: {}", track.describe()),
            track: Some(track),
            queue_length: Some(updated.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockAudioBackend;
    use crate::store::memory::MemoryQueueStore;
    use crate::store::QueueStore;
    use anyhow::anyhow;

    const GUILD: GuildId = GuildId(200);
    const REQUESTER: UserId = UserId(31);

    fn found_track(id: &str) -> Track {
        Track {
            id: id.to_string(),
            title: format!("title {id}"),
            author: "artist".to_string(),
            duration_ms: 120_000,
            url: format!("encoded:{id}"),
            thumbnail: None,
            requester_id: UserId(0),
            added_at: Utc::now(),
        }
    }

    fn request(query: &str) -> PlayRequest {
        PlayRequest {
            guild_id: GUILD,
            requester_id: REQUESTER,
            query: query.to_string(),
        }
    }

    fn ingest_with(
        backend: MockAudioBackend,
    ) -> (Arc<MemoryQueueStore>, Arc<QueueActionProcessor>, TrackIngest) {
        let store = Arc::new(MemoryQueueStore::new());
        let processor = Arc::new(QueueActionProcessor::new(store.clone(), Arc::new(backend)));
        let ingest = TrackIngest::new(processor.clone());
        (store, processor, ingest)
    }

    #[tokio::test]
    async fn first_play_creates_default_queue_and_starts_playback() {
        let mut backend = MockAudioBackend::new();
        backend
            .expect_search()
            .withf(|query| query == "some song")
            .once()
            .returning(|_| Ok(vec![found_track("t1")]));
        backend
            .expect_play()
            .withf(|g, t| *g == GUILD && t.id == "t1")
            .once()
            .returning(|_, _| Ok(()));
        let (store, _, ingest) = ingest_with(backend);

        let response = ingest.play(request("some song")).await;
        assert!(response.success);
        assert_eq!(response.queue_length, Some(1));
        assert_eq!(response.message, "Now playing: **title t1** by artist");

        let stored = store.get(GUILD).await.unwrap();
        assert_eq!(stored.volume, 50);
        assert!(stored.is_playing);
        assert_eq!(stored.tracks[0].requester_id, REQUESTER);
    }

    #[tokio::test]
    async fn play_while_already_playing_appends_without_transport_call() {
        let mut backend = MockAudioBackend::new();
        backend
            .expect_search()
            .returning(|_| Ok(vec![found_track("t2")]));
        // Sin expect_play: si el intake tocara el transporte, panic.
        let (store, _, ingest) = ingest_with(backend);
        let existing = QueueState::new(GUILD).add_track(found_track("t1")).play();
        store.set(GUILD, &existing).await;

        let response = ingest.play(request("another")).await;
        assert!(response.success);
        assert_eq!(response.queue_length, Some(2));

        let stored = store.get(GUILD).await.unwrap();
        assert_eq!(stored.tracks.len(), 2);
        assert_eq!(stored.current_track_index, 0);
    }

    #[tokio::test]
    async fn play_while_paused_resumes_with_the_current_track() {
        let mut backend = MockAudioBackend::new();
        backend
            .expect_search()
            .returning(|_| Ok(vec![found_track("t2")]));
        backend
            .expect_play()
            .withf(|_, t| t.id == "t1") // el track actual, no el nuevo
            .once()
            .returning(|_, _| Ok(()));
        let (store, _, ingest) = ingest_with(backend);
        let existing = QueueState::new(GUILD).add_track(found_track("t1")).pause();
        store.set(GUILD, &existing).await;

        let response = ingest.play(request("another")).await;
        assert!(response.success);
        assert!(store.get(GUILD).await.unwrap().is_playing);
    }

    #[tokio::test]
    async fn zero_search_results_is_a_friendly_failure() {
        let mut backend = MockAudioBackend::new();
        backend.expect_search().returning(|_| Ok(Vec::new()));
        let (store, _, ingest) = ingest_with(backend);

        let response = ingest.play(request("nothing matches this")).await;
        assert!(!response.success);
        assert_eq!(response.message, "No tracks found for your search query.");
        assert!(store.get(GUILD).await.is_none(), "no se crea cola vacía");
    }

    #[tokio::test]
    async fn search_error_degrades_to_failure_response() {
        let mut backend = MockAudioBackend::new();
        backend
            .expect_search()
            .returning(|_| Err(anyhow!("node down")));
        let (store, _, ingest) = ingest_with(backend);

        let response = ingest.play(request("boom")).await;
        assert!(!response.success);
        assert_eq!(
            response.message,
            "An error occurred while trying to play music."
        );
        assert!(store.get(GUILD).await.is_none());
    }

    #[tokio::test]
    async fn enqueue_publishes_the_updated_state() {
        let mut backend = MockAudioBackend::new();
        backend
            .expect_search()
            .returning(|_| Ok(vec![found_track("t1")]));
        backend.expect_play().returning(|_, _| Ok(()));
        let (store, _, ingest) = ingest_with(backend);
        let mut updates = store.subscribe(GUILD);

        ingest.play(request("song")).await;
        let seen = updates.recv().await.unwrap();
        assert_eq!(seen.tracks.len(), 1);
        assert!(seen.is_playing);
    }

    #[tokio::test]
    async fn concurrent_plays_lose_no_track() {
        let mut backend = MockAudioBackend::new();
        backend.expect_search().returning(|query| {
            let id = query.to_string();
            Ok(vec![found_track(&id)])
        });
        backend.expect_play().returning(|_, _| Ok(()));
        let (store, _, ingest) = ingest_with(backend);
        let ingest = Arc::new(ingest);

        let mut handles = Vec::new();
        for i in 0..10 {
            let ingest = Arc::clone(&ingest);
            handles.push(tokio::spawn(async move {
                ingest.play(request(&format!("q{i}"))).await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().success);
        }

        // Diez peticiones concurrentes, diez tracks: ninguna sobrescritura
        // silenciosa bajo el lock por servidor.
        assert_eq!(store.get(GUILD).await.unwrap().tracks.len(), 10);
    }
}
