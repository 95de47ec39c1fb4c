//! The client handle.
//!
//! [`PairClient::connect`] loads the ICE configuration, acquires local media,
//! then spawns two tasks: the control channel and the session driver that owns
//! the state machine. The handle only forwards user commands to the driver.

use crate::config::ClientConfig;
use crate::epoch::{Epoch, SessionEpoch};
use crate::event::ClientEvent;
use crate::ice;
use crate::machine::{Command, Input, InputSender, MachineLinks, SessionMachine};
use crate::media::MediaSource;
use crate::peer::PeerFactory;
use crate::transport::websocket::run_control_channel;
use crate::transport::{check_url, Backoff};
use pairlink_core::{PairError, PairResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Bound on a single control-channel connection attempt.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// How long `shutdown` waits for each task before aborting it.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

pub struct PairClient {
    inputs: InputSender,
    epoch: SessionEpoch,
    driver: Option<JoinHandle<()>>,
    channel: Option<JoinHandle<()>>,
}

impl PairClient {
    /// Start a client and return its handle plus the event receiver.
    ///
    /// ICE discovery never fails (it falls back to a public STUN server), and
    /// a media failure is reported as a status event rather than an error, so
    /// this only errors on an unusable configuration.
    pub async fn connect(
        config: ClientConfig,
        factory: Arc<dyn PeerFactory>,
        media: Arc<dyn MediaSource>,
    ) -> PairResult<(Self, mpsc::UnboundedReceiver<ClientEvent>)> {
        check_url(&config.server_url)?;
        let ice_url = match &config.ice_url {
            Some(url) => url.clone(),
            None => ice::discovery_url(&config.server_url)?,
        };
        let ice = ice::discover(&ice_url, config.ice_timeout()).await;

        let (inputs_tx, inputs_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let epoch = SessionEpoch::new();

        let backoff = Backoff::new(config.reconnect_delay(), config.reconnect_delay_max());
        let server_url = config.server_url.clone();

        let mut machine = SessionMachine::new(
            config,
            ice,
            epoch.clone(),
            MachineLinks {
                outbound: outbound_tx,
                events: events_tx,
                inputs: inputs_tx.clone(),
                factory,
                media,
            },
        );
        machine.prepare_media().await;

        info!(url = %server_url, "starting pairlink client");
        let channel = tokio::spawn(run_control_channel(
            server_url,
            outbound_rx,
            inputs_tx.clone(),
            backoff,
            CONNECT_TIMEOUT,
        ));
        let driver = tokio::spawn(machine.run(inputs_rx));

        let client = Self {
            inputs: inputs_tx,
            epoch,
            driver: Some(driver),
            channel: Some(channel),
        };
        Ok((client, events_rx))
    }

    /// Begin matching.
    pub fn start(&self) -> PairResult<()> {
        self.command(Command::Start)
    }

    /// Abandon the current partner and look for another.
    pub fn next(&self) -> PairResult<()> {
        self.command(Command::Next)
    }

    /// Stop matching and release the current partner.
    pub fn stop(&self) -> PairResult<()> {
        self.command(Command::Stop)
    }

    /// Cycle to the next video input device.
    pub fn switch_camera(&self) -> PairResult<()> {
        self.command(Command::SwitchCamera)
    }

    /// Current session epoch.
    pub fn epoch(&self) -> Epoch {
        self.epoch.current()
    }

    /// Leave, release local media and stop both background tasks.
    pub async fn shutdown(&mut self) {
        debug!("client shutdown requested");
        let (done_tx, done_rx) = oneshot::channel();
        if self
            .inputs
            .send(Input::Command(Command::Shutdown(done_tx)))
            .is_ok()
            && tokio::time::timeout(SHUTDOWN_TIMEOUT, done_rx).await.is_err()
        {
            warn!("session driver did not acknowledge shutdown");
        }

        join_or_abort(self.driver.take(), "session driver").await;
        join_or_abort(self.channel.take(), "control channel").await;
    }

    fn command(&self, command: Command) -> PairResult<()> {
        self.inputs
            .send(Input::Command(command))
            .map_err(|_| PairError::Transport("client has shut down".into()))
    }
}

async fn join_or_abort(task: Option<JoinHandle<()>>, name: &'static str) {
    let Some(mut task) = task else {
        return;
    };
    match tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(task = name, error = %e, "task ended abnormally"),
        Err(_) => {
            warn!(task = name, "task did not exit in time, aborting");
            task.abort();
        }
    }
}

impl std::fmt::Debug for PairClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PairClient")
            .field("epoch", &self.epoch.current())
            .field("running", &self.driver.is_some())
            .finish()
    }
}

impl Drop for PairClient {
    fn drop(&mut self) {
        if let Some(task) = self.driver.take() {
            task.abort();
        }
        if let Some(task) = self.channel.take() {
            task.abort();
        }
    }
}
