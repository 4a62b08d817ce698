//! Playlist resolution port.
//!
//! The player never owns track catalogs; it asks the portal backend
//! for the ordered track list of a playlist and treats whatever comes
//! back (including an empty list) as the new queue.

use encore_common::{classify, MediaKind, Track};
use futures::future::BoxFuture;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

/// Resolves a playlist id to its ordered tracks.
pub trait PlaylistResolver: Send + Sync {
    fn resolve(&self, playlist_id: &str) -> BoxFuture<'static, Result<Vec<Track>>>;
}

/// Track row as the portal backend serves it. `kind` is optional;
/// older backends omit it and we classify from the media URL.
#[derive(Debug, Deserialize)]
struct TrackRow {
    id: String,
    title: String,
    #[serde(default)]
    kind: Option<MediaKind>,
    artist_name: String,
    artist_id: String,
    artist_slug: String,
    #[serde(default)]
    thumbnail_url: Option<String>,
    media_url: String,
    #[serde(default)]
    duration_seconds: f64,
}

impl From<TrackRow> for Track {
    fn from(row: TrackRow) -> Self {
        let kind = row.kind.unwrap_or_else(|| classify(&row.media_url));
        Track {
            id: row.id,
            title: row.title,
            kind,
            artist_name: row.artist_name,
            artist_id: row.artist_id,
            artist_slug: row.artist_slug,
            thumbnail_url: row.thumbnail_url,
            media_url: row.media_url,
            duration_seconds: row.duration_seconds,
        }
    }
}

/// Resolver backed by the portal's REST API.
pub struct HttpPlaylistResolver {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPlaylistResolver {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

impl PlaylistResolver for HttpPlaylistResolver {
    fn resolve(&self, playlist_id: &str) -> BoxFuture<'static, Result<Vec<Track>>> {
        let url = format!(
            "{}/playlists/{}/tracks",
            self.base_url.trim_end_matches('/'),
            playlist_id
        );
        let client = self.client.clone();

        Box::pin(async move {
            debug!(url = %url, "resolving playlist");
            let response = client
                .get(&url)
                .send()
                .await
                .map_err(|e| Error::Resolve(format!("playlist fetch failed: {}", e)))?;

            if !response.status().is_success() {
                return Err(Error::Resolve(format!(
                    "playlist fetch returned {}",
                    response.status()
                )));
            }

            let rows: Vec<TrackRow> = response
                .json()
                .await
                .map_err(|e| Error::Resolve(format!("playlist response malformed: {}", e)))?;

            Ok(rows.into_iter().map(Track::from).collect())
        })
    }
}

/// Resolver over a fixed in-memory catalog. Used by the daemon when no
/// backend URL is configured, and by tests.
#[derive(Default)]
pub struct StaticResolver {
    playlists: std::collections::HashMap<String, Vec<Track>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_playlist(mut self, playlist_id: impl Into<String>, tracks: Vec<Track>) -> Self {
        self.playlists.insert(playlist_id.into(), tracks);
        self
    }
}

impl PlaylistResolver for StaticResolver {
    fn resolve(&self, playlist_id: &str) -> BoxFuture<'static, Result<Vec<Track>>> {
        let result = self
            .playlists
            .get(playlist_id)
            .cloned()
            .ok_or_else(|| Error::Resolve(format!("unknown playlist: {}", playlist_id)));
        Box::pin(async move { result })
    }
}
