// flow-backend/src/spotify.rs
//! Mocked music player standing in for a Spotify account.
//!
//! Nothing here talks to an external service. Authorization is a state-token
//! round trip through the callback route, and playback is a per-user state
//! machine over a fixed demo queue.

use crate::config::SpotifyConfig;
use crate::error_handler::ServiceError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use uuid::Uuid;

pub const DEFAULT_VOLUME: u8 = 50;

#[derive(Debug, Clone, Copy)]
pub struct DemoTrack {
    pub id: &'static str,
    pub name: &'static str,
    pub artist: &'static str,
    pub album: &'static str,
    pub cover_url: &'static str,
    pub duration_ms: u64,
}

pub const DEMO_QUEUE: [DemoTrack; 3] = [
    DemoTrack {
        id: "spotify:track:123",
        name: "Midnight City",
        artist: "M83",
        album: "Hurry Up, We're Dreaming",
        cover_url: "https://i.scdn.co/image/ab67616d0000b273b3bb9066b9b3ac8e4bd73fbf",
        duration_ms: 260_000,
    },
    DemoTrack {
        id: "spotify:track:456",
        name: "Starboy",
        artist: "The Weeknd",
        album: "Starboy",
        cover_url: "https://i.scdn.co/image/ab67616d0000b273a048415db06a5b6fa7ec4e1a",
        duration_ms: 230_000,
    },
    DemoTrack {
        id: "spotify:track:789",
        name: "Blinding Lights",
        artist: "The Weeknd",
        album: "After Hours",
        cover_url: "https://i.scdn.co/image/ab67616d0000b2738863bc11d2aa12b54f5aeb36",
        duration_ms: 200_000,
    },
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlayerError {
    #[error("Spotify account is not connected")]
    NotConnected,
    #[error("Spotify authorization failed: {0}")]
    AuthorizationDenied(String),
    #[error("Unknown or expired authorization state")]
    UnknownState,
    #[error("Volume must be between 0 and 100")]
    InvalidVolume,
}

impl From<PlayerError> for ServiceError {
    fn from(error: PlayerError) -> ServiceError {
        ServiceError::BadRequest(error.to_string())
    }
}

#[derive(Debug, Clone)]
struct PlayerState {
    connected: bool,
    pending_state: Option<String>,
    is_playing: bool,
    volume: u8,
    track_index: usize,
    // Progress banked at the last pause or seek; `resumed_at` marks when
    // the current playing stretch began.
    banked_ms: u64,
    resumed_at: Option<DateTime<Utc>>,
}

impl Default for PlayerState {
    fn default() -> Self {
        PlayerState {
            connected: false,
            pending_state: None,
            is_playing: false,
            volume: DEFAULT_VOLUME,
            track_index: 0,
            banked_ms: 0,
            resumed_at: None,
        }
    }
}

impl PlayerState {
    fn track(&self) -> &'static DemoTrack {
        &DEMO_QUEUE[self.track_index % DEMO_QUEUE.len()]
    }

    fn progress_at(&self, now: DateTime<Utc>) -> u64 {
        let running = match (self.is_playing, self.resumed_at) {
            (true, Some(since)) => u64::try_from((now - since).num_milliseconds()).unwrap_or(0),
            _ => 0,
        };
        (self.banked_ms + running).min(self.track().duration_ms)
    }

    fn require_connected(&self) -> Result<(), PlayerError> {
        if self.connected {
            Ok(())
        } else {
            Err(PlayerError::NotConnected)
        }
    }

    fn jump_to(&mut self, index: usize, now: DateTime<Utc>) {
        self.track_index = index % DEMO_QUEUE.len();
        self.banked_ms = 0;
        self.resumed_at = self.is_playing.then_some(now);
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationStart {
    pub auth_url: String,
    pub state: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub pending: bool,
}

// Field names follow the Spotify Web API.
#[derive(Debug, Serialize)]
pub struct CurrentlyPlaying {
    pub is_playing: bool,
    pub progress_ms: u64,
    pub volume_percent: u8,
    pub item: TrackItem,
}

#[derive(Debug, Serialize)]
pub struct TrackItem {
    pub id: String,
    pub name: String,
    pub artists: Vec<ArtistRef>,
    pub album: AlbumRef,
    pub duration_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct ArtistRef {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct AlbumRef {
    pub name: String,
    pub images: Vec<ImageRef>,
}

#[derive(Debug, Serialize)]
pub struct ImageRef {
    pub url: String,
}

fn snapshot(state: &PlayerState, now: DateTime<Utc>) -> CurrentlyPlaying {
    let track = state.track();
    CurrentlyPlaying {
        is_playing: state.is_playing,
        progress_ms: state.progress_at(now),
        volume_percent: state.volume,
        item: TrackItem {
            id: track.id.to_string(),
            name: track.name.to_string(),
            artists: vec![ArtistRef {
                name: track.artist.to_string(),
            }],
            album: AlbumRef {
                name: track.album.to_string(),
                images: vec![ImageRef {
                    url: track.cover_url.to_string(),
                }],
            },
            duration_ms: track.duration_ms,
        },
    }
}

pub struct MusicPlayer {
    config: SpotifyConfig,
    players: Mutex<HashMap<i32, PlayerState>>,
}

impl MusicPlayer {
    pub fn new(config: SpotifyConfig) -> Self {
        MusicPlayer {
            config,
            players: Mutex::new(HashMap::new()),
        }
    }

    fn players(&self) -> MutexGuard<'_, HashMap<i32, PlayerState>> {
        self.players.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_connected<T>(
        &self,
        user_id: i32,
        f: impl FnOnce(&mut PlayerState) -> T,
    ) -> Result<T, PlayerError> {
        let mut players = self.players();
        let state = players.entry(user_id).or_default();
        state.require_connected()?;
        Ok(f(state))
    }

    pub fn begin_authorization(&self, user_id: i32) -> AuthorizationStart {
        let state_token = Uuid::new_v4().to_string();

        let mut auth_url = self.config.authorize_url.clone();
        auth_url
            .query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("state", &state_token);

        self.players().entry(user_id).or_default().pending_state = Some(state_token.clone());

        AuthorizationStart {
            auth_url: auth_url.into(),
            state: state_token,
        }
    }

    /// Completes the callback leg and returns the user that asked for it.
    pub fn complete_authorization(
        &self,
        state_token: Option<&str>,
        error: Option<&str>,
    ) -> Result<i32, PlayerError> {
        let mut players = self.players();
        let pending = state_token.and_then(|token| {
            players
                .iter_mut()
                .find(|(_, s)| s.pending_state.as_deref() == Some(token))
        });

        // The state token is spent whether the provider granted access or not.
        match (pending, error) {
            (Some((_, state)), Some(reason)) => {
                state.pending_state = None;
                Err(PlayerError::AuthorizationDenied(reason.to_string()))
            }
            (None, Some(reason)) => Err(PlayerError::AuthorizationDenied(reason.to_string())),
            (Some((user_id, state)), None) => {
                state.pending_state = None;
                state.connected = true;
                Ok(*user_id)
            }
            (None, None) => Err(PlayerError::UnknownState),
        }
    }

    pub fn status(&self, user_id: i32) -> ConnectionStatus {
        let players = self.players();
        players
            .get(&user_id)
            .map(|s| ConnectionStatus {
                connected: s.connected,
                pending: s.pending_state.is_some(),
            })
            .unwrap_or(ConnectionStatus {
                connected: false,
                pending: false,
            })
    }

    pub fn current_track(
        &self,
        user_id: i32,
        now: DateTime<Utc>,
    ) -> Result<CurrentlyPlaying, PlayerError> {
        self.with_connected(user_id, |state| snapshot(state, now))
    }

    pub fn play(&self, user_id: i32, now: DateTime<Utc>) -> Result<CurrentlyPlaying, PlayerError> {
        self.with_connected(user_id, |state| {
            if !state.is_playing {
                // A finished track starts over.
                if state.banked_ms >= state.track().duration_ms {
                    state.banked_ms = 0;
                }
                state.is_playing = true;
                state.resumed_at = Some(now);
            }
            snapshot(state, now)
        })
    }

    pub fn pause(&self, user_id: i32, now: DateTime<Utc>) -> Result<CurrentlyPlaying, PlayerError> {
        self.with_connected(user_id, |state| {
            if state.is_playing {
                state.banked_ms = state.progress_at(now);
                state.is_playing = false;
                state.resumed_at = None;
            }
            snapshot(state, now)
        })
    }

    pub fn next(&self, user_id: i32, now: DateTime<Utc>) -> Result<CurrentlyPlaying, PlayerError> {
        self.with_connected(user_id, |state| {
            let index = state.track_index + 1;
            state.jump_to(index, now);
            snapshot(state, now)
        })
    }

    pub fn previous(
        &self,
        user_id: i32,
        now: DateTime<Utc>,
    ) -> Result<CurrentlyPlaying, PlayerError> {
        self.with_connected(user_id, |state| {
            let index = state.track_index + DEMO_QUEUE.len() - 1;
            state.jump_to(index, now);
            snapshot(state, now)
        })
    }

    pub fn set_volume(&self, user_id: i32, volume: i64) -> Result<u8, PlayerError> {
        let volume = u8::try_from(volume)
            .ok()
            .filter(|v| *v <= 100)
            .ok_or(PlayerError::InvalidVolume)?;
        self.with_connected(user_id, |state| {
            state.volume = volume;
            volume
        })
    }

    pub fn disconnect(&self, user_id: i32) {
        self.players().remove(&user_id);
    }
}
