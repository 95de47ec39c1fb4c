//! Negotiation-object collaborator.
//!
//! A [`PeerConnection`] is the external transport primitive that performs the
//! actual offer/answer exchange and connectivity checks. The client drives it
//! through these traits and learns about its progress through a
//! [`PeerEventSink`] supplied at creation time.

use crate::ice::IceConfig;
use crate::media::{MediaStream, MediaTrack};
use crate::BoxFuture;
use pairlink_core::{IceCandidate, PairResult, SessionDescription};
use std::sync::Arc;

/// Connectivity state reported by a negotiation object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    New,
    Checking,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// Events raised by a negotiation object.
#[derive(Debug, Clone, PartialEq)]
pub enum PeerEvent {
    /// A local connectivity candidate to relay to the partner.
    LocalCandidate(IceCandidate),
    TransportState(TransportState),
    /// The partner's media arrived.
    RemoteStream(MediaStream),
}

/// Callback the negotiation object invokes for every [`PeerEvent`].
///
/// The sink may be called from any thread. After
/// [`PeerConnection::detach_handlers`] the object must stop calling it.
pub type PeerEventSink = Arc<dyn Fn(PeerEvent) + Send + Sync>;

/// Raw transfer statistics for the active video path.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PeerStats {
    pub bytes_received: u64,
    pub bytes_sent: u64,
    pub packets_lost: u64,
    /// Current round-trip time of the selected candidate pair, in seconds.
    pub round_trip_time: Option<f64>,
}

/// One negotiation attempt with one partner.
pub trait PeerConnection: Send + Sync {
    fn add_track(&self, track: &MediaTrack, stream: &MediaStream) -> PairResult<()>;

    fn create_offer(&self) -> BoxFuture<'_, PairResult<SessionDescription>>;

    fn create_answer(&self) -> BoxFuture<'_, PairResult<SessionDescription>>;

    fn set_local_description(&self, desc: SessionDescription) -> BoxFuture<'_, PairResult<()>>;

    fn set_remote_description(&self, desc: SessionDescription) -> BoxFuture<'_, PairResult<()>>;

    fn add_ice_candidate(&self, candidate: IceCandidate) -> BoxFuture<'_, PairResult<()>>;

    /// Swap the outgoing video track without renegotiating.
    fn replace_video_track(&self, track: MediaTrack) -> BoxFuture<'_, PairResult<()>>;

    fn stats(&self) -> BoxFuture<'_, PairResult<PeerStats>>;

    /// Stop delivering events to the sink.
    fn detach_handlers(&self);

    fn close(&self);
}

/// Builds negotiation objects.
pub trait PeerFactory: Send + Sync {
    fn create(&self, ice: &IceConfig, events: PeerEventSink) -> PairResult<Arc<dyn PeerConnection>>;
}
