use anyhow::{Context as _, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{info, warn};
use url::Url;

use super::{AudioBackend, BackendEvent};
use crate::config::Config;
use crate::queue::{GuildId, Track, UserId};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Cliente REST para un nodo Lavalink v4.
///
/// Covers track resolution (`/v4/loadtracks`) and per-guild player updates
/// (`/v4/sessions/<session>/players/<guild>`). The websocket side (voice
/// server updates and the event feed) belongs to the gateway wiring, which
/// is outside this core; it pushes [`BackendEvent`]s through the sender
/// exposed by [`LavalinkBackend::event_sender`].
pub struct LavalinkBackend {
    http: reqwest::Client,
    base: Url,
    password: String,
    session_id: String,
    events: mpsc::Sender<BackendEvent>,
}

impl LavalinkBackend {
    /// Conecta al nodo (probe de `/version`) y crea el canal de eventos.
    pub async fn connect(config: &Config) -> Result<(Self, mpsc::Receiver<BackendEvent>)> {
        let base = Url::parse(&format!(
            "http://{}:{}",
            config.lavalink_host, config.lavalink_port
        ))
        .context("Dirección de Lavalink inválida")?;

        info!("🎼 Conectando a Lavalink en {}", base);

        let http = reqwest::Client::new();
        let version = http
            .get(base.join("/version")?)
            .header(AUTHORIZATION, &config.lavalink_password)
            .send()
            .await
            .context("No se pudo alcanzar el nodo Lavalink")?
            .error_for_status()
            .context("El nodo Lavalink rechazó la autenticación")?
            .text()
            .await?;
        info!("✅ Nodo Lavalink {} disponible", version.trim());

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let backend = Self {
            http,
            base,
            password: config.lavalink_password.clone(),
            session_id: config.lavalink_session_id.clone(),
            events: tx,
        };
        Ok((backend, rx))
    }

    /// Sender para que el cableado del gateway inyecte eventos del nodo.
    pub fn event_sender(&self) -> mpsc::Sender<BackendEvent> {
        self.events.clone()
    }

    fn player_url(&self, guild_id: GuildId) -> Result<Url> {
        self.base
            .join(&format!(
                "/v4/sessions/{}/players/{}?noReplace=false",
                self.session_id, guild_id
            ))
            .context("URL de player inválida")
    }

    async fn update_player(&self, guild_id: GuildId, body: serde_json::Value) -> Result<()> {
        self.http
            .patch(self.player_url(guild_id)?)
            .header(AUTHORIZATION, &self.password)
            .json(&body)
            .send()
            .await
            .context("PATCH al player falló")?
            .error_for_status()
            .context("El nodo rechazó la actualización del player")?;
        Ok(())
    }
}

#[async_trait]
impl AudioBackend for LavalinkBackend {
    async fn play(&self, guild_id: GuildId, track: &Track) -> Result<()> {
        info!("🎵 Reproduciendo en guild {}: {}", guild_id, track.title);
        self.update_player(guild_id, json!({ "track": { "encoded": track.url } }))
            .await
    }

    async fn pause(&self, guild_id: GuildId) -> Result<()> {
        self.update_player(guild_id, json!({ "paused": true })).await
    }

    async fn resume(&self, guild_id: GuildId) -> Result<()> {
        self.update_player(guild_id, json!({ "paused": false })).await
    }

    async fn stop(&self, guild_id: GuildId) -> Result<()> {
        self.update_player(guild_id, json!({ "track": { "encoded": null } }))
            .await
    }

    async fn set_volume(&self, guild_id: GuildId, volume: u8) -> Result<()> {
        self.update_player(guild_id, json!({ "volume": volume })).await
    }

    async fn search(&self, query: &str) -> Result<Vec<Track>> {
        // URLs se cargan directo; texto libre pasa por ytsearch
        let identifier = if query.starts_with("http://") || query.starts_with("https://") {
            query.to_string()
        } else {
            format!("ytsearch:{query}")
        };

        let mut url = self.base.join("/v4/loadtracks")?;
        url.set_query(Some(&format!(
            "identifier={}",
            urlencoding::encode(&identifier)
        )));

        let result: LoadResult = self
            .http
            .get(url)
            .header(AUTHORIZATION, &self.password)
            .send()
            .await
            .context("loadtracks falló")?
            .error_for_status()
            .context("El nodo rechazó la búsqueda")?
            .json()
            .await
            .context("Respuesta de loadtracks ilegible")?;

        Ok(tracks_from_load_result(result))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadResult {
    load_type: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiTrack {
    encoded: String,
    info: ApiTrackInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiTrackInfo {
    identifier: String,
    title: String,
    author: String,
    length: u64,
    artwork_url: Option<String>,
}

impl ApiTrack {
    /// El requester real se asigna al encolar; aquí aún no se conoce.
    fn into_track(self) -> Track {
        Track {
            id: self.info.identifier,
            title: self.info.title,
            author: self.info.author,
            duration_ms: self.info.length,
            url: self.encoded,
            thumbnail: self.info.artwork_url,
            requester_id: UserId(0),
            added_at: Utc::now(),
        }
    }
}

fn tracks_from_load_result(result: LoadResult) -> Vec<Track> {
    match result.load_type.as_str() {
        "track" => serde_json::from_value::<ApiTrack>(result.data)
            .map(|t| vec![t.into_track()])
            .unwrap_or_else(|e| {
                warn!("Track de loadtracks ilegible: {}", e);
                Vec::new()
            }),
        "search" => serde_json::from_value::<Vec<ApiTrack>>(result.data)
            .map(|ts| ts.into_iter().map(ApiTrack::into_track).collect())
            .unwrap_or_else(|e| {
                warn!("Resultados de búsqueda ilegibles: {}", e);
                Vec::new()
            }),
        "playlist" => {
            #[derive(Deserialize)]
            struct PlaylistData {
                tracks: Vec<ApiTrack>,
            }
            serde_json::from_value::<PlaylistData>(result.data)
                .map(|p| p.tracks.into_iter().map(ApiTrack::into_track).collect())
                .unwrap_or_else(|e| {
                    warn!("Playlist de loadtracks ilegible: {}", e);
                    Vec::new()
                })
        }
        "empty" => Vec::new(),
        "error" => {
            warn!("El nodo reportó error de carga: {}", result.data);
            Vec::new()
        }
        other => {
            warn!("loadType desconocido: {}", other);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_result(json: serde_json::Value) -> LoadResult {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn search_results_map_to_tracks() {
        let result = load_result(json!({
            "loadType": "search",
            "data": [{
                "encoded": "QAAA...",
                "info": {
                    "identifier": "dQw4w9WgXcQ",
                    "title": "Never Gonna Give You Up",
                    "author": "Rick Astley",
                    "length": 212000,
                    "uri": "https://youtu.be/dQw4w9WgXcQ",
                    "artworkUrl": "https://i.ytimg.com/vi/dQw4w9WgXcQ/default.jpg"
                }
            }]
        }));

        let tracks = tracks_from_load_result(result);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].id, "dQw4w9WgXcQ");
        assert_eq!(tracks[0].url, "QAAA...");
        assert_eq!(tracks[0].duration_ms, 212000);
        assert_eq!(tracks[0].author, "Rick Astley");
        assert!(tracks[0].thumbnail.is_some());
    }

    #[test]
    fn single_track_load_maps_to_one_track() {
        let result = load_result(json!({
            "loadType": "track",
            "data": {
                "encoded": "QBBB...",
                "info": {
                    "identifier": "abc",
                    "title": "song",
                    "author": "artist",
                    "length": 1000
                }
            }
        }));
        assert_eq!(tracks_from_load_result(result).len(), 1);
    }

    #[test]
    fn playlist_load_maps_every_track() {
        let result = load_result(json!({
            "loadType": "playlist",
            "data": {
                "info": { "name": "mix", "selectedTrack": -1 },
                "tracks": [
                    { "encoded": "a", "info": { "identifier": "1", "title": "x", "author": "y", "length": 1 } },
                    { "encoded": "b", "info": { "identifier": "2", "title": "x", "author": "y", "length": 1 } }
                ]
            }
        }));
        assert_eq!(tracks_from_load_result(result).len(), 2);
    }

    #[test]
    fn empty_and_error_loads_are_normal_empty_results() {
        let empty = load_result(json!({ "loadType": "empty", "data": {} }));
        assert!(tracks_from_load_result(empty).is_empty());

        let error = load_result(json!({
            "loadType": "error",
            "data": { "message": "node broke", "severity": "common" }
        }));
        assert!(tracks_from_load_result(error).is_empty());
    }
}
