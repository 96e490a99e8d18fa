//! Spotify client: track search for setlists and artist lookup

use chordline_common::setlists::{SongCandidate, SpotifyTrack};
use chordline_common::Provider;
use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::config::ServiceConfig;
use crate::error::Result;

const PROVIDER: Provider = Provider::Spotify;
pub const DEFAULT_SEARCH_LIMIT: u32 = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Followers {
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotifyArtist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub popularity: u32,
    pub followers: Followers,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtistAnalytics {
    pub followers: u64,
    pub popularity: u32,
    pub top_tracks: Vec<SpotifyTrack>,
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct TrackSearch {
    tracks: Page<SpotifyTrack>,
}

#[derive(Debug, Deserialize)]
struct ArtistSearch {
    artists: Page<SpotifyArtist>,
}

#[derive(Debug, Deserialize)]
struct TopTracks {
    tracks: Vec<SpotifyTrack>,
}

#[derive(Debug, Clone)]
pub struct SpotifyClient {
    config: ServiceConfig,
}

impl SpotifyClient {
    pub fn new(config: ServiceConfig) -> Self {
        Self { config }
    }

    /// Search tracks and convert them into setlist candidates
    pub async fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<SongCandidate>> {
        let limit = limit.to_string();
        let result: TrackSearch = self
            .config
            .send_json(PROVIDER, Method::GET, "/v1/search", |r| {
                r.query(&[("q", query), ("type", "track"), ("limit", limit.as_str())])
            })
            .await?;
        Ok(result.tracks.items.iter().map(SongCandidate::from_track).collect())
    }

    /// Best artist match for a name
    pub async fn artist_by_name(&self, name: &str) -> Result<Option<SpotifyArtist>> {
        let result: ArtistSearch = self
            .config
            .send_json(PROVIDER, Method::GET, "/v1/search", |r| {
                r.query(&[("q", name), ("type", "artist"), ("limit", "1")])
            })
            .await?;
        Ok(result.artists.items.into_iter().next())
    }

    /// Followers, popularity and top tracks; `None` when no artist matches
    pub async fn artist_analytics(&self, name: &str) -> Result<Option<ArtistAnalytics>> {
        let Some(artist) = self.artist_by_name(name).await? else {
            return Ok(None);
        };

        let path = format!("/v1/artists/{}/top-tracks", artist.id);
        let top: TopTracks = self
            .config
            .send_json(PROVIDER, Method::GET, &path, |r| r.query(&[("market", "US")]))
            .await?;

        Ok(Some(ArtistAnalytics {
            followers: artist.followers.total,
            popularity: artist.popularity,
            top_tracks: top.tracks,
        }))
    }
}
