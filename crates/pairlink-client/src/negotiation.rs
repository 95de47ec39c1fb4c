//! The Negotiation Object: one peer connection bound to one partner.
//!
//! Operations on the peer connection run strictly in order on a dedicated
//! worker task, each bounded by the negotiation timeout. The worker and the
//! event sink never touch machine state; they post inputs tagged with the
//! negotiation's epoch, and the machine drops anything whose tag is stale.

use crate::epoch::{Epoch, SessionEpoch};
use crate::event::ConnectionStats;
use crate::ice::IceConfig;
use crate::machine::{Input, InputSender};
use crate::media::{MediaStream, MediaTrack};
use crate::peer::{PeerConnection, PeerEventSink, PeerFactory};
use pairlink_core::{short_id, IceCandidate, PairError, PairResult, SessionDescription};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Work queued for the peer connection.
#[derive(Debug)]
pub(crate) enum NegotiationOp {
    /// Initiator: create and apply an offer.
    CreateOffer,
    /// Answerer: apply the partner's offer, then create and apply an answer.
    AcceptOffer(SessionDescription),
    /// Initiator: apply the partner's answer.
    ApplyAnswer(SessionDescription),
    AddCandidate(IceCandidate),
    ReplaceVideoTrack(MediaTrack),
}

/// Result of a queued operation, reported back to the machine.
#[derive(Debug)]
pub(crate) enum OpOutcome {
    /// A local offer or answer to relay to the partner.
    LocalDescription(SessionDescription),
    /// Offer/answer handling failed; the pairing cannot continue.
    Failed {
        stage: &'static str,
        error: PairError,
    },
    TrackReplaced,
    TrackReplaceFailed(PairError),
}

pub(crate) struct Negotiation {
    partner_id: String,
    initiator: bool,
    tag: Epoch,
    peer: Arc<dyn PeerConnection>,
    ops: mpsc::UnboundedSender<NegotiationOp>,
    attached: Arc<AtomicBool>,
    worker: JoinHandle<()>,
    stats: Option<JoinHandle<()>>,
    grace: Option<(u64, JoinHandle<()>)>,
    grace_seq: u64,
    deadline: Option<JoinHandle<()>>,
    closed: bool,
}

impl Negotiation {
    /// Build a fresh peer connection for `partner_id` and attach local media.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn open(
        factory: &dyn PeerFactory,
        ice: &IceConfig,
        local: Option<&MediaStream>,
        partner_id: String,
        initiator: bool,
        tag: Epoch,
        inputs: InputSender,
        op_timeout: Duration,
    ) -> PairResult<Self> {
        let attached = Arc::new(AtomicBool::new(true));
        let sink: PeerEventSink = {
            let attached = attached.clone();
            let inputs = inputs.clone();
            Arc::new(move |event| {
                if attached.load(Ordering::Acquire) {
                    let _ = inputs.send(Input::Peer { tag, event });
                }
            })
        };

        let peer = factory.create(ice, sink)?;
        if let Some(stream) = local {
            for track in &stream.tracks {
                if let Err(e) = peer.add_track(track, stream) {
                    attached.store(false, Ordering::Release);
                    peer.detach_handlers();
                    peer.close();
                    return Err(e);
                }
            }
        }

        let (ops, ops_rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(peer.clone(), ops_rx, tag, inputs, op_timeout));

        debug!(peer = %short_id(&partner_id), initiator, epoch = tag, "negotiation opened");

        Ok(Self {
            partner_id,
            initiator,
            tag,
            peer,
            ops,
            attached,
            worker,
            stats: None,
            grace: None,
            grace_seq: 0,
            deadline: None,
            closed: false,
        })
    }

    pub(crate) fn partner_id(&self) -> &str {
        &self.partner_id
    }

    pub(crate) fn initiator(&self) -> bool {
        self.initiator
    }

    pub(crate) fn tag(&self) -> Epoch {
        self.tag
    }

    /// Queue an operation behind everything already submitted.
    pub(crate) fn submit(&self, op: NegotiationOp) {
        if self.ops.send(op).is_err() {
            debug!(epoch = self.tag, "negotiation worker gone, dropping op");
        }
    }

    /// Start periodic statistics sampling. Samples are posted as inputs.
    pub(crate) fn start_stats(&mut self, every: Duration, epoch: SessionEpoch, inputs: InputSender) {
        if self.stats.is_some() || self.closed {
            return;
        }
        let peer = self.peer.clone();
        let tag = self.tag;
        self.stats = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if epoch.is_stale(tag) {
                    break;
                }
                match peer.stats().await {
                    Ok(raw) => {
                        let stats = ConnectionStats::from(raw);
                        if inputs.send(Input::Stats { tag, stats }).is_err() {
                            break;
                        }
                    }
                    Err(e) => debug!(error = %e, "stats sample failed"),
                }
            }
        }));
    }

    /// Arm the completion deadline. The machine re-pairs when it fires before
    /// the transport connects.
    pub(crate) fn arm_deadline(&mut self, limit: Duration, inputs: InputSender) {
        if self.deadline.is_some() || self.closed {
            return;
        }
        let tag = self.tag;
        self.deadline = Some(tokio::spawn(async move {
            tokio::time::sleep(limit).await;
            let _ = inputs.send(Input::NegotiationDeadline { tag });
        }));
    }

    pub(crate) fn disarm_deadline(&mut self) {
        if let Some(handle) = self.deadline.take() {
            handle.abort();
        }
    }

    /// Arm the disconnect grace timer unless it is already running.
    pub(crate) fn arm_grace(&mut self, delay: Duration, inputs: InputSender) {
        if self.grace.is_some() || self.closed {
            return;
        }
        self.grace_seq += 1;
        let seq = self.grace_seq;
        let tag = self.tag;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = inputs.send(Input::GraceExpired { tag, seq });
        });
        self.grace = Some((seq, handle));
    }

    pub(crate) fn disarm_grace(&mut self) {
        if let Some((_, handle)) = self.grace.take() {
            handle.abort();
        }
    }

    /// Whether `seq` identifies the grace timer that is currently armed.
    pub(crate) fn grace_is(&self, seq: u64) -> bool {
        matches!(self.grace, Some((armed, _)) if armed == seq)
    }

    /// Release the peer connection. Handlers are detached before closing so
    /// no callback fires into a torn-down negotiation. Idempotent.
    pub(crate) fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.attached.store(false, Ordering::Release);
        self.peer.detach_handlers();
        self.peer.close();
        self.worker.abort();
        if let Some(stats) = self.stats.take() {
            stats.abort();
        }
        self.disarm_grace();
        self.disarm_deadline();
        debug!(peer = %short_id(&self.partner_id), epoch = self.tag, "negotiation closed");
    }
}

impl Drop for Negotiation {
    fn drop(&mut self) {
        self.close();
    }
}

async fn run_worker(
    peer: Arc<dyn PeerConnection>,
    mut ops: mpsc::UnboundedReceiver<NegotiationOp>,
    tag: Epoch,
    inputs: InputSender,
    op_timeout: Duration,
) {
    while let Some(op) = ops.recv().await {
        let outcome = match op {
            NegotiationOp::CreateOffer => {
                match bounded(op_timeout, create_local(peer.as_ref(), true)).await {
                    Ok(offer) => OpOutcome::LocalDescription(offer),
                    Err(error) => OpOutcome::Failed {
                        stage: "offer",
                        error,
                    },
                }
            }
            NegotiationOp::AcceptOffer(offer) => {
                let answer = bounded(op_timeout, async {
                    peer.set_remote_description(offer).await?;
                    create_local(peer.as_ref(), false).await
                })
                .await;
                match answer {
                    Ok(answer) => OpOutcome::LocalDescription(answer),
                    Err(error) => OpOutcome::Failed {
                        stage: "remote offer",
                        error,
                    },
                }
            }
            NegotiationOp::ApplyAnswer(answer) => {
                match bounded(op_timeout, peer.set_remote_description(answer)).await {
                    Ok(()) => continue,
                    Err(error) => OpOutcome::Failed {
                        stage: "remote answer",
                        error,
                    },
                }
            }
            NegotiationOp::AddCandidate(candidate) => {
                // Candidates may trail a renegotiation; failures are expected.
                if let Err(e) = bounded(op_timeout, peer.add_ice_candidate(candidate)).await {
                    debug!(epoch = tag, error = %e, "ignoring candidate failure");
                }
                continue;
            }
            NegotiationOp::ReplaceVideoTrack(track) => {
                match bounded(op_timeout, peer.replace_video_track(track)).await {
                    Ok(()) => OpOutcome::TrackReplaced,
                    Err(e) => {
                        warn!(epoch = tag, error = %e, "replacing video track failed");
                        OpOutcome::TrackReplaceFailed(e)
                    }
                }
            }
        };

        if inputs.send(Input::Op { tag, outcome }).is_err() {
            break;
        }
    }
}

async fn create_local(peer: &dyn PeerConnection, offer: bool) -> PairResult<SessionDescription> {
    let desc = if offer {
        peer.create_offer().await?
    } else {
        peer.create_answer().await?
    };
    peer.set_local_description(desc.clone()).await?;
    Ok(desc)
}

/// Run `fut` under `limit`, mapping expiry to [`PairError::Timeout`].
pub(crate) async fn bounded<T>(limit: Duration, fut: impl Future<Output = PairResult<T>>) -> PairResult<T> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| PairError::Timeout)?
}
