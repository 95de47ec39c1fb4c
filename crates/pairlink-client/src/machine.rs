//! Peer negotiation state machine.
//!
//! A single driver task owns [`SessionMachine`] and feeds it every [`Input`]:
//! user commands, control-channel traffic, negotiation-object events, worker
//! results and timer expiries. Nothing else touches machine state. Inputs that
//! originate from asynchronous work carry the epoch (or media request) they
//! were issued under and are dropped when it is no longer current. Media
//! acquisition runs on its own task so the driver never waits on devices.

use crate::config::ClientConfig;
use crate::epoch::{Epoch, SessionEpoch};
use crate::event::{ClientEvent, ConnectionStats, Status};
use crate::ice::IceConfig;
use crate::media::{MediaSource, MediaStream, VideoInput};
use crate::negotiation::{bounded, Negotiation, NegotiationOp, OpOutcome};
use crate::next_ack::NextAck;
use crate::peer::{PeerEvent, PeerFactory, TransportState};
use pairlink_core::{
    short_id, validate_signal, ClientMessage, PairError, SdpType, ServerMessage, SignalPayload,
};
use serde_json::Value;
use std::future::Future;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// User requests forwarded by [`crate::PairClient`].
#[derive(Debug)]
pub(crate) enum Command {
    Start,
    Next,
    Stop,
    SwitchCamera,
    Shutdown(oneshot::Sender<()>),
}

/// Everything the driver reacts to.
#[derive(Debug)]
pub(crate) enum Input {
    Command(Command),
    /// The control channel (re)connected and received its identity.
    ChannelUp { session_id: String },
    ChannelDown,
    /// A connection attempt failed; the channel task keeps retrying.
    ConnectFailed { error: String },
    Server(ServerMessage),
    Peer { tag: Epoch, event: PeerEvent },
    Op { tag: Epoch, outcome: OpOutcome },
    Stats { tag: Epoch, stats: ConnectionStats },
    AckTimeout { tag: Epoch, ack_id: u64 },
    Rejoin { tag: Epoch },
    GraceExpired { tag: Epoch, seq: u64 },
    /// The pairing under `tag` did not reach a connected transport in time.
    NegotiationDeadline { tag: Epoch },
    /// A media acquisition started off the driver finished.
    Media { request: u64, outcome: MediaOutcome },
}

/// Result of acquiring local media.
#[derive(Debug)]
pub(crate) enum MediaOutcome {
    Acquired {
        stream: MediaStream,
        cameras: Vec<VideoInput>,
        index: usize,
    },
    /// Fewer than two cameras; nothing to switch to.
    NoAlternative { cameras: Vec<VideoInput> },
    Failed(PairError),
}

pub(crate) type InputSender = mpsc::UnboundedSender<Input>;

/// Negotiation state. A negotiation object exists exactly in the last two.
enum PeerState {
    Idle,
    Searching,
    Negotiating(Negotiation),
    Active(Negotiation),
}

impl PeerState {
    fn name(&self) -> &'static str {
        match self {
            PeerState::Idle => "idle",
            PeerState::Searching => "searching",
            PeerState::Negotiating(_) => "negotiating",
            PeerState::Active(_) => "active",
        }
    }

    fn negotiation(&self) -> Option<&Negotiation> {
        match self {
            PeerState::Negotiating(n) | PeerState::Active(n) => Some(n),
            _ => None,
        }
    }

    fn negotiation_mut(&mut self) -> Option<&mut Negotiation> {
        match self {
            PeerState::Negotiating(n) | PeerState::Active(n) => Some(n),
            _ => None,
        }
    }
}

/// Channels and collaborators the machine works through.
pub(crate) struct MachineLinks {
    pub outbound: mpsc::UnboundedSender<ClientMessage>,
    pub events: mpsc::UnboundedSender<ClientEvent>,
    pub inputs: InputSender,
    pub factory: Arc<dyn PeerFactory>,
    pub media: Arc<dyn MediaSource>,
}

pub(crate) struct SessionMachine {
    state: PeerState,
    epoch: SessionEpoch,
    next_ack: NextAck,
    channel_up: bool,
    session_id: Option<String>,
    local_media: Option<MediaStream>,
    cameras: Vec<VideoInput>,
    camera_index: usize,
    media_seq: u64,
    /// Acquisition a pending `start` is waiting for.
    media_start: Option<u64>,
    media_switch: Option<u64>,
    ice: IceConfig,
    config: ClientConfig,
    links: MachineLinks,
}

impl SessionMachine {
    pub(crate) fn new(
        config: ClientConfig,
        ice: IceConfig,
        epoch: SessionEpoch,
        links: MachineLinks,
    ) -> Self {
        Self {
            state: PeerState::Idle,
            epoch,
            next_ack: NextAck::default(),
            channel_up: false,
            session_id: None,
            local_media: None,
            cameras: Vec::new(),
            camera_index: 0,
            media_seq: 0,
            media_start: None,
            media_switch: None,
            ice,
            config,
            links,
        }
    }

    /// Drive the machine until shutdown or until every input sender is gone.
    pub(crate) async fn run(mut self, mut inputs: mpsc::UnboundedReceiver<Input>) {
        debug!("session driver started");
        while let Some(input) = inputs.recv().await {
            if self.handle(input).is_break() {
                break;
            }
        }
        self.release_media();
        debug!("session driver exited");
    }

    /// Acquire local media once at startup. Failure is reported, not fatal.
    pub(crate) async fn prepare_media(&mut self) {
        let outcome = acquire_default(self.links.media.clone(), self.config.media_timeout()).await;
        match outcome {
            MediaOutcome::Acquired {
                stream,
                cameras,
                index,
            } => {
                self.install_media(stream, cameras, index);
                self.status(Status::Ready);
            }
            MediaOutcome::Failed(e) => self.media_failed(e),
            MediaOutcome::NoAlternative { .. } => {}
        }
    }

    pub(crate) fn handle(&mut self, input: Input) -> ControlFlow<()> {
        match input {
            Input::Command(command) => return self.on_command(command),
            Input::ChannelUp { session_id } => self.on_channel_up(session_id),
            Input::ChannelDown => self.on_channel_down(),
            Input::ConnectFailed { error } => {
                debug!(error = %error, "control channel connect failed");
                if self.is_matching() {
                    self.status(Status::ConnectionIssue);
                }
            }
            Input::Server(message) => self.on_server(message),
            Input::Peer { tag, event } => {
                if self.is_current(tag) {
                    self.on_peer_event(event);
                } else {
                    debug!(epoch = tag, "dropping stale peer event");
                }
            }
            Input::Op { tag, outcome } => {
                if self.is_current(tag) {
                    self.on_op_outcome(outcome);
                } else {
                    debug!(epoch = tag, "dropping stale negotiation result");
                }
            }
            Input::Stats { tag, stats } => {
                if self.is_current(tag) && matches!(self.state, PeerState::Active(_)) {
                    self.emit(ClientEvent::Stats(Some(stats)));
                }
            }
            Input::AckTimeout { tag, ack_id } => self.on_ack_timeout(tag, ack_id),
            Input::Rejoin { tag } => self.on_rejoin(tag),
            Input::GraceExpired { tag, seq } => {
                let armed = self
                    .state
                    .negotiation()
                    .is_some_and(|n| n.tag() == tag && n.grace_is(seq));
                if armed && !self.epoch.is_stale(tag) {
                    warn!(epoch = tag, "transport did not recover, re-pairing");
                    self.requeue(Status::Looking);
                }
            }
            Input::NegotiationDeadline { tag } => {
                if self.is_current(tag) && matches!(self.state, PeerState::Negotiating(_)) {
                    warn!(epoch = tag, "negotiation did not complete in time, re-pairing");
                    self.status(Status::NegotiationFailed(PairError::Timeout.to_string()));
                    self.requeue(Status::Looking);
                }
            }
            Input::Media { request, outcome } => self.on_media(request, outcome),
        }
        ControlFlow::Continue(())
    }

    // ── User commands ───────────────────────────────────────────────

    fn on_command(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::Start => self.start(),
            Command::Next => self.next(),
            Command::Stop => self.stop(),
            Command::SwitchCamera => self.switch_camera(),
            Command::Shutdown(done) => {
                self.epoch.bump();
                self.next_ack.clear();
                self.media_start = None;
                self.media_switch = None;
                self.teardown();
                self.state = PeerState::Idle;
                self.send(ClientMessage::Leave);
                self.release_media();
                self.status(Status::Stopped);
                info!("client shut down");
                let _ = done.send(());
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn start(&mut self) {
        if !matches!(self.state, PeerState::Idle) {
            debug!(state = self.state.name(), "already matching, ignoring start");
            return;
        }
        if self.local_media.is_some() {
            self.begin_matching();
            return;
        }
        if self.media_start.is_some() {
            debug!("media acquisition in progress, ignoring start");
            return;
        }
        let media = self.links.media.clone();
        let limit = self.config.media_timeout();
        let request = self.spawn_media(acquire_default(media, limit));
        self.media_start = Some(request);
    }

    fn begin_matching(&mut self) {
        let tag = self.epoch.bump();
        self.state = PeerState::Searching;
        info!(epoch = tag, "matching started");
        self.status(Status::Looking);
        self.send(ClientMessage::Join);
    }

    fn stop(&mut self) {
        let tag = self.epoch.bump();
        self.next_ack.clear();
        self.media_start = None;
        self.teardown();
        self.state = PeerState::Idle;
        info!(epoch = tag, "matching stopped");
        self.send(ClientMessage::Leave);
        self.status(Status::Stopped);
    }

    fn next(&mut self) {
        if matches!(self.state, PeerState::Idle) {
            debug!("not matching, ignoring next");
            return;
        }
        if self.next_ack.is_pending(&self.epoch) {
            debug!("next already in flight, ignoring");
            return;
        }

        let tag = self.epoch.bump();
        self.teardown();
        self.state = PeerState::Searching;
        self.status(Status::Looking);

        if !self.channel_up {
            // Reconnection rejoins.
            debug!(epoch = tag, "control channel down, next waits for reconnect");
            return;
        }

        let ack_id = self.next_ack.begin(tag);
        info!(epoch = tag, ack_id, "requesting next partner");
        self.send(ClientMessage::Next { ack: Some(ack_id) });
        self.schedule(self.config.ack_timeout(), Input::AckTimeout { tag, ack_id });
    }

    fn switch_camera(&mut self) {
        if self.media_switch.is_some() {
            debug!("camera switch already in progress");
            return;
        }
        let media = self.links.media.clone();
        let limit = self.config.media_timeout();
        let cached = self.cameras.clone();
        let current = self.camera_index;
        let request = self.spawn_media(acquire_next_camera(media, limit, cached, current));
        self.media_switch = Some(request);
    }

    fn on_media(&mut self, request: u64, outcome: MediaOutcome) {
        if self.media_start == Some(request) {
            self.media_start = None;
            match outcome {
                MediaOutcome::Acquired {
                    stream,
                    cameras,
                    index,
                } => {
                    self.install_media(stream, cameras, index);
                    if matches!(self.state, PeerState::Idle) {
                        self.begin_matching();
                    }
                }
                MediaOutcome::Failed(e) => self.media_failed(e),
                MediaOutcome::NoAlternative { .. } => {}
            }
        } else if self.media_switch == Some(request) {
            self.media_switch = None;
            match outcome {
                MediaOutcome::Acquired {
                    stream,
                    cameras,
                    index,
                } => {
                    let device = stream
                        .video_track()
                        .and_then(|t| t.device_id.clone())
                        .unwrap_or_default();
                    info!(device = %device, "switched camera");
                    self.install_media(stream.clone(), cameras, index);
                    if let (Some(negotiation), Some(track)) =
                        (self.state.negotiation(), stream.video_track())
                    {
                        negotiation.submit(NegotiationOp::ReplaceVideoTrack(track.clone()));
                    }
                }
                MediaOutcome::NoAlternative { cameras } => {
                    debug!(cameras = cameras.len(), "nothing to switch to");
                    self.cameras = cameras;
                }
                MediaOutcome::Failed(e) => {
                    warn!(error = %e, "camera switch failed");
                    self.status(Status::CameraSwitchFailed);
                }
            }
        } else if let MediaOutcome::Acquired { stream, .. } = outcome {
            debug!(request, "releasing media from a cancelled request");
            self.links.media.release(&stream);
        }
    }

    // ── Control channel ─────────────────────────────────────────────

    fn on_channel_up(&mut self, session_id: String) {
        info!(session_id = %short_id(&session_id), "control channel up");
        self.channel_up = true;
        self.session_id = Some(session_id);
        self.next_ack.clear();

        if self.is_matching() {
            self.teardown();
            self.state = PeerState::Searching;
            self.status(Status::Reconnected);
            self.send(ClientMessage::Join);
        }
    }

    fn on_channel_down(&mut self) {
        warn!(
            session_id = %self.session_id.as_deref().map(short_id).unwrap_or("-"),
            "control channel lost"
        );
        self.channel_up = false;
        self.session_id = None;
        self.next_ack.clear();

        if self.is_matching() {
            self.teardown();
            self.state = PeerState::Searching;
            self.status(Status::Reconnecting);
        }
    }

    fn on_server(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::Ack { id } => {
                if self.next_ack.acknowledge(id) {
                    let tag = self.epoch.bump();
                    debug!(ack_id = id, epoch = tag, "next acknowledged");
                } else {
                    debug!(ack_id = id, "ignoring late ack");
                }
                return;
            }
            ServerMessage::Error { message } => {
                warn!(message = %message, "server reported an error");
                return;
            }
            ServerMessage::Welcome { .. } => {
                debug!("unexpected welcome on live channel");
                return;
            }
            _ => {}
        }

        if self.next_ack.is_pending(&self.epoch) {
            debug!(kind = message.kind(), "dropping notification issued before next");
            return;
        }

        match message {
            ServerMessage::Waiting => match self.state {
                PeerState::Searching => self.status(Status::Waiting),
                PeerState::Idle => debug!("waiting notice while not matching, ignoring"),
                PeerState::Negotiating(_) | PeerState::Active(_) => {
                    // The server holds no pair for us; drop the partner we think we have.
                    warn!("server reports us waiting, dropping current partner");
                    self.teardown();
                    self.state = PeerState::Searching;
                    self.status(Status::Waiting);
                }
            },
            ServerMessage::Paired { peer_id, initiator } => self.on_paired(peer_id, initiator),
            ServerMessage::Signal { peer_id, signal } => self.on_signal(peer_id, signal),
            ServerMessage::PartnerDisconnected { from } => self.on_partner_disconnected(from),
            ServerMessage::Ack { .. } | ServerMessage::Error { .. } | ServerMessage::Welcome { .. } => {}
        }
    }

    fn on_paired(&mut self, peer_id: String, initiator: bool) {
        if peer_id.is_empty() {
            warn!("paired message without a partner id");
            return;
        }
        if matches!(self.state, PeerState::Idle) {
            debug!(peer = %short_id(&peer_id), "paired while not matching, leaving");
            self.send(ClientMessage::Leave);
            return;
        }

        // The server is authoritative: a new pair replaces any current one.
        self.teardown();
        let tag = self.epoch.bump();

        let opened = Negotiation::open(
            self.links.factory.as_ref(),
            &self.ice,
            self.local_media.as_ref(),
            peer_id.clone(),
            initiator,
            tag,
            self.links.inputs.clone(),
            self.config.negotiation_timeout(),
        );

        match opened {
            Ok(mut negotiation) => {
                info!(peer = %short_id(&peer_id), initiator, epoch = tag, "paired");
                negotiation.arm_deadline(self.config.completion_timeout(), self.links.inputs.clone());
                if initiator {
                    negotiation.submit(NegotiationOp::CreateOffer);
                }
                self.state = PeerState::Negotiating(negotiation);
                self.status(Status::Paired { initiator });
            }
            Err(e) => {
                warn!(peer = %short_id(&peer_id), error = %e, "failed to create negotiation object");
                self.epoch.bump();
                self.state = PeerState::Idle;
                self.send(ClientMessage::Leave);
                self.status(Status::NegotiationFailed(e.to_string()));
            }
        }
    }

    fn on_signal(&mut self, peer_id: String, signal: Value) {
        let payload = match validate_signal(&signal) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(peer = %short_id(&peer_id), error = %e, "dropping malformed signal");
                return;
            }
        };

        let Some(negotiation) = self.state.negotiation() else {
            debug!(peer = %short_id(&peer_id), "no negotiation, dropping signal");
            return;
        };
        if negotiation.partner_id() != peer_id {
            debug!(peer = %short_id(&peer_id), "signal from non-partner, dropping");
            return;
        }

        match payload {
            SignalPayload::Sdp(desc) => match (desc.kind, negotiation.initiator()) {
                (SdpType::Offer, false) => negotiation.submit(NegotiationOp::AcceptOffer(desc)),
                (SdpType::Answer, true) => negotiation.submit(NegotiationOp::ApplyAnswer(desc)),
                (kind, initiator) => {
                    warn!(?kind, initiator, "unexpected description for our role, dropping");
                }
            },
            SignalPayload::Candidate(candidate) => {
                negotiation.submit(NegotiationOp::AddCandidate(candidate));
            }
        }
    }

    fn on_partner_disconnected(&mut self, from: String) {
        let is_partner = self
            .state
            .negotiation()
            .is_some_and(|n| n.partner_id() == from);
        if !is_partner {
            debug!(peer = %short_id(&from), "disconnect from non-partner, ignoring");
            return;
        }
        info!(peer = %short_id(&from), "partner left");
        self.requeue(Status::PartnerLeft { requeued: true });
    }

    fn on_ack_timeout(&mut self, tag: Epoch, ack_id: u64) {
        if self.epoch.is_stale(tag) || !self.is_matching() {
            return;
        }
        if self.next_ack.timed_out(tag, ack_id) {
            warn!(ack_id, "next not acknowledged, falling back to leave and join");
            self.send(ClientMessage::Leave);
            self.schedule(self.config.rejoin_delay(), Input::Rejoin { tag });
        }
    }

    fn on_rejoin(&mut self, tag: Epoch) {
        if self.epoch.is_stale(tag) {
            return;
        }
        if self.next_ack.rejoin_due(tag) && matches!(self.state, PeerState::Searching) {
            debug!(epoch = tag, "fallback rejoin");
            self.send(ClientMessage::Join);
        }
    }

    // ── Negotiation object ──────────────────────────────────────────

    fn on_peer_event(&mut self, event: PeerEvent) {
        match event {
            PeerEvent::LocalCandidate(candidate) => {
                let Some(negotiation) = self.state.negotiation() else {
                    return;
                };
                let partner = negotiation.partner_id().to_string();
                self.send_signal(partner, SignalPayload::Candidate(candidate));
            }
            PeerEvent::RemoteStream(stream) => self.emit(ClientEvent::RemoteStream(stream)),
            PeerEvent::TransportState(state) => self.on_transport_state(state),
        }
    }

    fn on_transport_state(&mut self, transport: TransportState) {
        match transport {
            TransportState::Connected => {
                let interval = self.config.stats_interval();
                let epoch = self.epoch.clone();
                let inputs = self.links.inputs.clone();
                self.state = match std::mem::replace(&mut self.state, PeerState::Idle) {
                    PeerState::Negotiating(mut n) | PeerState::Active(mut n) => {
                        n.disarm_grace();
                        n.disarm_deadline();
                        n.start_stats(interval, epoch, inputs);
                        PeerState::Active(n)
                    }
                    other => other,
                };
                info!("transport connected");
                self.status(Status::Connected);
            }
            TransportState::Disconnected => {
                let grace = self.config.disconnect_grace();
                let inputs = self.links.inputs.clone();
                if let Some(n) = self.state.negotiation_mut() {
                    n.arm_grace(grace, inputs);
                }
                self.status(Status::Unstable);
            }
            TransportState::Failed => {
                warn!("transport failed, re-pairing");
                self.status(Status::Unstable);
                self.requeue(Status::Looking);
            }
            TransportState::New | TransportState::Checking | TransportState::Closed => {
                debug!(?transport, "transport state");
            }
        }
    }

    fn on_op_outcome(&mut self, outcome: OpOutcome) {
        match outcome {
            OpOutcome::LocalDescription(desc) => {
                let Some(negotiation) = self.state.negotiation() else {
                    return;
                };
                let partner = negotiation.partner_id().to_string();
                self.send_signal(partner, SignalPayload::Sdp(desc));
            }
            OpOutcome::Failed { stage, error } => {
                warn!(stage, error = %error, "negotiation failed, re-pairing");
                self.status(Status::NegotiationFailed(error.to_string()));
                self.requeue(Status::Looking);
            }
            OpOutcome::TrackReplaced => debug!("outgoing video track replaced"),
            OpOutcome::TrackReplaceFailed(_) => self.status(Status::CameraSwitchFailed),
        }
    }

    // ── Helpers ─────────────────────────────────────────────────────

    fn is_matching(&self) -> bool {
        !matches!(self.state, PeerState::Idle)
    }

    /// True when `tag` names the live negotiation and is not stale.
    fn is_current(&self, tag: Epoch) -> bool {
        !self.epoch.is_stale(tag) && self.state.negotiation().is_some_and(|n| n.tag() == tag)
    }

    /// Tear down and ask the server for a new partner.
    fn requeue(&mut self, status: Status) {
        self.teardown();
        self.state = PeerState::Searching;
        self.status(status);
        self.send(ClientMessage::Join);
    }

    /// Close the negotiation object, if any, and clear remote bindings.
    fn teardown(&mut self) {
        let previous = std::mem::replace(&mut self.state, PeerState::Searching);
        match previous {
            PeerState::Negotiating(mut n) | PeerState::Active(mut n) => {
                n.close();
                self.emit(ClientEvent::RemoteCleared);
                self.emit(ClientEvent::Stats(None));
            }
            other => self.state = other,
        }
    }

    fn install_media(&mut self, stream: MediaStream, cameras: Vec<VideoInput>, index: usize) {
        self.cameras = cameras;
        self.camera_index = index;
        if let Some(old) = self.local_media.replace(stream.clone()) {
            self.links.media.release(&old);
        }
        self.emit(ClientEvent::LocalMedia(stream));
    }

    fn media_failed(&self, error: PairError) {
        warn!(error = %error, "local media unavailable");
        self.status(Status::MediaError(error.to_string()));
    }

    /// Run an acquisition off the driver; its outcome comes back as
    /// [`Input::Media`] carrying the returned request id.
    fn spawn_media<F>(&mut self, acquisition: F) -> u64
    where
        F: Future<Output = MediaOutcome> + Send + 'static,
    {
        self.media_seq += 1;
        let request = self.media_seq;
        let inputs = self.links.inputs.clone();
        let media = self.links.media.clone();
        tokio::spawn(async move {
            let outcome = acquisition.await;
            if let Err(mpsc::error::SendError(Input::Media {
                outcome: MediaOutcome::Acquired { stream, .. },
                ..
            })) = inputs.send(Input::Media { request, outcome })
            {
                media.release(&stream);
            }
        });
        request
    }

    fn release_media(&mut self) {
        if let Some(stream) = self.local_media.take() {
            self.links.media.release(&stream);
        }
    }

    fn send_signal(&self, partner: String, payload: SignalPayload) {
        match ClientMessage::signal(partner, &payload) {
            Ok(message) => self.send(message),
            Err(e) => warn!(error = %e, "failed to encode signal"),
        }
    }

    fn send(&self, message: ClientMessage) {
        if !self.channel_up {
            debug!(kind = message.kind(), "control channel down, not sending");
            return;
        }
        if self.links.outbound.send(message).is_err() {
            debug!("control channel task gone");
        }
    }

    fn emit(&self, event: ClientEvent) {
        let _ = self.links.events.send(event);
    }

    fn status(&self, status: Status) {
        debug!(status = %status, "status");
        self.emit(ClientEvent::Status(status));
    }

    fn schedule(&self, delay: Duration, input: Input) {
        let inputs = self.links.inputs.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = inputs.send(input);
        });
    }
}

/// Acquire the default devices, then enumerate cameras for later switching.
async fn acquire_default(media: Arc<dyn MediaSource>, limit: Duration) -> MediaOutcome {
    let stream = match bounded(limit, media.acquire(None)).await {
        Ok(stream) => stream,
        Err(e) => return MediaOutcome::Failed(e),
    };
    let cameras = match bounded(limit, media.cameras()).await {
        Ok(cameras) => cameras,
        Err(e) => {
            debug!(error = %e, "camera enumeration failed");
            Vec::new()
        }
    };
    MediaOutcome::Acquired {
        stream,
        cameras,
        index: 0,
    }
}

/// Acquire a stream from the camera after `current`, falling back to the
/// `cached` device list when enumeration fails.
async fn acquire_next_camera(
    media: Arc<dyn MediaSource>,
    limit: Duration,
    cached: Vec<VideoInput>,
    current: usize,
) -> MediaOutcome {
    let cameras = match bounded(limit, media.cameras()).await {
        Ok(cameras) => cameras,
        Err(e) => {
            debug!(error = %e, "camera enumeration failed, using cached list");
            cached
        }
    };
    if cameras.len() <= 1 {
        return MediaOutcome::NoAlternative { cameras };
    }
    let index = (current + 1) % cameras.len();
    let device = cameras[index].device_id.clone();
    match bounded(limit, media.acquire(Some(device))).await {
        Ok(stream) => MediaOutcome::Acquired {
            stream,
            cameras,
            index,
        },
        Err(e) => MediaOutcome::Failed(e),
    }
}
