//! Setlist bookkeeping
//!
//! Ordering, duplication and statistics over [`Setlist`] / [`Song`] rows,
//! plus the conversion from Spotify search results into songs.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::models::{Setlist, Song};
use crate::{time, Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SetlistStats {
    pub total_songs: usize,
    /// Seconds
    pub total_duration: u64,
    /// Seconds, 0 for an empty setlist
    pub average_duration: f64,
    pub spotify_tracks: usize,
}

impl SetlistStats {
    pub fn of(songs: &[Song]) -> Self {
        let total_songs = songs.len();
        let total_duration: u64 = songs.iter().map(|s| s.duration_sec.unwrap_or(0) as u64).sum();
        let average_duration = if total_songs > 0 {
            total_duration as f64 / total_songs as f64
        } else {
            0.0
        };

        Self {
            total_songs,
            total_duration,
            average_duration,
            spotify_tracks: songs.iter().filter(|s| s.spotify_track_id.is_some()).count(),
        }
    }
}

/// Position for a song appended to the end
pub fn next_position(songs: &[Song]) -> u32 {
    songs.iter().map(|s| s.position).max().unwrap_or(0) + 1
}

/// Sort songs by position in place
pub fn sort_by_position(songs: &mut [Song]) {
    songs.sort_by_key(|s| s.position);
}

/// Renumber songs so that `ids` come first, in the given order.
///
/// Songs missing from `ids` keep their relative order after the listed
/// ones. Unknown or repeated ids are rejected and leave `songs` untouched.
pub fn reorder(songs: &mut Vec<Song>, ids: &[&str]) -> Result<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(*id) {
            return Err(Error::InvalidInput(format!("Duplicate song id in order: {}", id)));
        }
        if !songs.iter().any(|s| s.id == *id) {
            return Err(Error::NotFound(format!("Song not in setlist: {}", id)));
        }
    }

    sort_by_position(songs);
    let (mut listed, rest): (Vec<Song>, Vec<Song>) =
        songs.drain(..).partition(|s| seen.contains(s.id.as_str()));
    listed.sort_by_key(|s| ids.iter().position(|id| *id == s.id));

    songs.extend(listed);
    songs.extend(rest);
    for (idx, song) in songs.iter_mut().enumerate() {
        song.position = idx as u32 + 1;
    }
    Ok(())
}

/// Copy a setlist under a new name with fresh ids and contiguous positions
pub fn duplicate(source: &Setlist, new_name: &str) -> Result<Setlist> {
    let name = new_name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput("Setlist name is required".to_string()));
    }

    let now = time::now();
    let mut songs = source.songs.clone();
    sort_by_position(&mut songs);
    for (idx, song) in songs.iter_mut().enumerate() {
        song.id = Uuid::new_v4().to_string();
        song.position = idx as u32 + 1;
        song.created_at = now;
    }

    Ok(Setlist {
        id: Uuid::new_v4().to_string(),
        org_id: source.org_id.clone(),
        name: name.to_string(),
        description: source.description.clone(),
        is_template: source.is_template,
        songs,
        created_at: now,
        updated_at: now,
    })
}

// ========================================
// Spotify search results
// ========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotifyArtistRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotifyAlbumRef {
    pub id: String,
    pub name: String,
}

/// Subset of a Spotify track object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotifyTrack {
    pub id: String,
    pub name: String,
    pub artists: Vec<SpotifyArtistRef>,
    pub album: SpotifyAlbumRef,
    pub duration_ms: u64,
    #[serde(default)]
    pub popularity: u32,
    #[serde(default)]
    pub preview_url: Option<String>,
}

/// Song ready to be added to a setlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongCandidate {
    pub spotify_track_id: String,
    pub title: String,
    pub artist: String,
    pub duration_sec: u32,
    pub album: String,
    pub popularity: u32,
    pub preview_url: Option<String>,
}

impl SongCandidate {
    pub fn from_track(track: &SpotifyTrack) -> Self {
        Self {
            spotify_track_id: track.id.clone(),
            title: track.name.clone(),
            artist: track.artists.iter().map(|a| a.name.as_str()).collect::<Vec<_>>().join(", "),
            duration_sec: (track.duration_ms / 1000) as u32,
            album: track.album.name.clone(),
            popularity: track.popularity,
            preview_url: track.preview_url.clone(),
        }
    }

    /// Song row appended after `existing`
    pub fn into_song(self, existing: &[Song]) -> Song {
        Song {
            id: Uuid::new_v4().to_string(),
            title: self.title,
            artist: self.artist,
            duration_sec: Some(self.duration_sec),
            spotify_track_id: Some(self.spotify_track_id),
            position: next_position(existing),
            notes: None,
            created_at: time::now(),
        }
    }
}
