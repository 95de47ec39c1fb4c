//! pairlink-client: client library for the pairlink pairing protocol.
//!
//! Drives one participant through matchmaking: joins the server queue,
//! negotiates a direct media session with each partner the server assigns,
//! and moves on with `next`. Every asynchronous continuation is tagged with a
//! session epoch so work belonging to an abandoned pairing can never touch the
//! current one.
//!
//! The media stack is supplied by the embedder through the [`PeerFactory`] and
//! [`MediaSource`] traits; this crate owns only the signaling and state logic.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use pairlink_client::{ClientConfig, ClientEvent, MediaSource, PairClient, PeerFactory};
//!
//! # async fn example(factory: Arc<dyn PeerFactory>, media: Arc<dyn MediaSource>) -> pairlink_core::PairResult<()> {
//! let config = ClientConfig {
//!     server_url: "wss://pair.example.com".into(),
//!     ..Default::default()
//! };
//! let (mut client, mut events) = PairClient::connect(config, factory, media).await?;
//! client.start()?;
//!
//! while let Some(event) = events.recv().await {
//!     if let ClientEvent::Status(status) = event {
//!         println!("{status}");
//!     }
//! }
//!
//! client.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod epoch;
pub mod event;
pub mod ice;
pub mod media;
pub mod peer;
pub mod transport;

mod machine;
mod negotiation;
mod next_ack;

use std::future::Future;
use std::pin::Pin;

/// Boxed `Send` future returned by the collaborator traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// Re-export primary public types.
pub use client::PairClient;
pub use config::ClientConfig;
pub use epoch::{Epoch, SessionEpoch};
pub use event::{ClientEvent, ConnectionStats, Quality, Status};
pub use ice::{IceConfig, IceServer, IceUrls};
pub use media::{MediaSource, MediaStream, MediaTrack, TrackKind, VideoInput};
pub use peer::{PeerConnection, PeerEvent, PeerEventSink, PeerFactory, PeerStats, TransportState};

// Re-export pairlink-core error types for convenience.
pub use pairlink_core::{PairError, PairResult};
