//! Local media collaborator.
//!
//! The embedder owns capture devices; the client only asks for a stream,
//! enumerates cameras for switching, and hands streams back for release.

use crate::BoxFuture;
use pairlink_core::PairResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

/// One captured track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaTrack {
    pub id: String,
    pub kind: TrackKind,
    /// Capture device the track came from, when known.
    pub device_id: Option<String>,
}

/// A bundle of tracks, local or remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaStream {
    pub id: String,
    pub tracks: Vec<MediaTrack>,
}

impl MediaStream {
    /// First video track, if any.
    pub fn video_track(&self) -> Option<&MediaTrack> {
        self.tracks.iter().find(|t| t.kind == TrackKind::Video)
    }
}

/// An enumerated video input device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoInput {
    pub device_id: String,
    pub label: String,
}

/// Source of local audio/video.
pub trait MediaSource: Send + Sync {
    /// Acquire a stream with audio and video. `camera` selects a specific
    /// video input; `None` lets the source choose.
    fn acquire(&self, camera: Option<String>) -> BoxFuture<'_, PairResult<MediaStream>>;

    /// Enumerate available video inputs.
    fn cameras(&self) -> BoxFuture<'_, PairResult<Vec<VideoInput>>>;

    /// Stop every track of a stream previously returned by [`acquire`](Self::acquire).
    fn release(&self, stream: &MediaStream);
}
