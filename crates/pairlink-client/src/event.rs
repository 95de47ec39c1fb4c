//! Events surfaced to the embedding application.

use crate::media::MediaStream;
use crate::peer::PeerStats;
use std::fmt;

/// Everything the client reports back to its embedder.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Status(Status),
    /// New local media (initial acquisition or camera switch).
    LocalMedia(MediaStream),
    /// The partner's media is available for display.
    RemoteStream(MediaStream),
    /// The partner's media binding was released.
    RemoteCleared,
    /// A statistics sample, or `None` once sampling stops.
    Stats(Option<ConnectionStats>),
}

/// User-facing progress of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Ready,
    Looking,
    Waiting,
    Paired { initiator: bool },
    Connected,
    Unstable,
    PartnerLeft { requeued: bool },
    Reconnecting,
    Reconnected,
    ConnectionIssue,
    Stopped,
    MediaError(String),
    NegotiationFailed(String),
    CameraSwitchFailed,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ready => f.write_str("Ready. Start to connect with a stranger."),
            Status::Looking => f.write_str("Looking for a partner..."),
            Status::Waiting => f.write_str("Waiting for a partner..."),
            Status::Paired { initiator: true } => f.write_str("Paired! Sending offer..."),
            Status::Paired { initiator: false } => f.write_str("Paired! Awaiting offer..."),
            Status::Connected => f.write_str("Connected!"),
            Status::Unstable => f.write_str("Connection unstable..."),
            Status::PartnerLeft { requeued: true } => {
                f.write_str("Stranger left. Finding the next partner...")
            }
            Status::PartnerLeft { requeued: false } => f.write_str("Stranger left."),
            Status::Reconnecting => f.write_str("Connection lost. Reconnecting..."),
            Status::Reconnected => f.write_str("Reconnected! Looking for a partner..."),
            Status::ConnectionIssue => f.write_str("Connection issue. Retrying..."),
            Status::Stopped => f.write_str("Stopped. Start when you're ready."),
            Status::MediaError(e) => write!(f, "Camera/mic error: {e}"),
            Status::NegotiationFailed(e) => write!(f, "Connection failed: {e}"),
            Status::CameraSwitchFailed => f.write_str("Failed to switch camera"),
        }
    }
}

/// Link quality derived from the round-trip time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    Excellent,
    Good,
    Poor,
    Disconnected,
}

impl Quality {
    /// Classify a round-trip time in seconds. Zero means no measurement.
    pub fn from_rtt(rtt: f64) -> Self {
        if rtt <= 0.0 {
            Quality::Disconnected
        } else if rtt < 0.1 {
            Quality::Excellent
        } else if rtt < 0.3 {
            Quality::Good
        } else {
            Quality::Poor
        }
    }
}

/// A classified statistics sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectionStats {
    pub quality: Quality,
    pub bytes_received: u64,
    pub bytes_sent: u64,
    pub packets_lost: u64,
    /// Seconds; zero when unknown.
    pub round_trip_time: f64,
}

impl From<PeerStats> for ConnectionStats {
    fn from(raw: PeerStats) -> Self {
        let rtt = raw.round_trip_time.unwrap_or(0.0);
        Self {
            quality: Quality::from_rtt(rtt),
            bytes_received: raw.bytes_received,
            bytes_sent: raw.bytes_sent,
            packets_lost: raw.packets_lost,
            round_trip_time: rtt,
        }
    }
}
