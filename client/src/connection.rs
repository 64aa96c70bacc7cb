use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use system::{
    decode_snapshot, encode_event, CardState, MeetingEvent, MeetingSnapshot, Participation,
    ShortCode,
};

use crate::reconnect::ReconnectPolicy;
use crate::transport::{Connector, Transport, TransportError, WsConnector};

const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 64;
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Configuration for one meeting channel.
#[derive(Debug, Clone)]
pub struct MeetingConfig {
    /// Scheme and host of the meeting service, e.g. `wss://meet.example.org`.
    pub base_url: String,
    pub short_code: ShortCode,
    /// The caller's own identity, acquired out-of-band before connecting.
    pub participation: Participation,
    pub reconnect: ReconnectPolicy,
    pub event_channel_capacity: usize,
    pub shutdown_timeout: Duration,
}

impl MeetingConfig {
    pub fn new(
        base_url: impl Into<String>,
        short_code: impl Into<ShortCode>,
        participation: Participation,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            short_code: short_code.into(),
            participation,
            reconnect: ReconnectPolicy::default(),
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }

    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

/// Commands from the handle to the transport loop.
#[derive(Debug)]
enum ConnectionCommand {
    /// The caller's own card selection; remembered for resync-on-open, then
    /// sent.
    SelectCard(CardState),
    /// Any other outgoing event, sent verbatim (host moderation).
    SendEvent(MeetingEvent),
}

/// Lifecycle notifications delivered to the consumer.
#[derive(Debug)]
pub enum ConnectionEvent {
    /// The handshake completed and the resync event went out. Fires once per
    /// successful open, including every reconnect.
    Open,
    /// A decoded full-replace snapshot, in transport arrival order.
    Snapshot(MeetingSnapshot),
    /// The channel is permanently down; no further events follow.
    Closed { reason: CloseReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The reconnect budget was exhausted. Reportable, not fatal.
    RetryBudgetExhausted,
    /// The owner tore the connection down.
    Terminated,
}

/// Errors surfaced by the connection handle.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The transport loop is gone; the handle outlived the channel.
    #[error("connection closed")]
    ConnectionClosed,
}

/// Owns one meeting channel for as long as the meeting view is active.
/// Constructed on mount, torn down on unmount; dropping the handle releases
/// the channel on every exit path with no further reconnect attempts.
pub struct MeetingConnection {
    cmd_tx: mpsc::UnboundedSender<ConnectionCommand>,
    open: Arc<AtomicBool>,
    task: Option<tokio::task::JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    shutdown_timeout: Duration,
}

impl MeetingConnection {
    /// Open a channel to the configured meeting. Returns immediately with the
    /// handle and the event receiver; the handshake proceeds in the
    /// background, so listeners are attached before the first `Open`.
    pub fn connect(config: MeetingConfig) -> (Self, mpsc::Receiver<ConnectionEvent>) {
        let connector = WsConnector::new(&config.base_url, &config.short_code);
        Self::connect_with(connector, config)
    }

    /// Same as [`MeetingConnection::connect`] with an injected connector.
    pub fn connect_with(
        connector: impl Connector,
        config: MeetingConfig,
    ) -> (Self, mpsc::Receiver<ConnectionEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(config.event_channel_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let open = Arc::new(AtomicBool::new(false));

        let task = tokio::spawn(connection_loop(
            connector,
            config.participation,
            config.reconnect,
            cmd_rx,
            event_tx,
            shutdown_rx,
            Arc::clone(&open),
        ));

        let connection = Self {
            cmd_tx,
            open,
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
            shutdown_timeout: config.shutdown_timeout,
        };
        (connection, event_rx)
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Queue the caller's own card selection. This also becomes the state
    /// resent on every subsequent open.
    pub fn select_card(&self, state: CardState) -> Result<(), ClientError> {
        self.send_command(ConnectionCommand::SelectCard(state))
    }

    /// Queue an outgoing event verbatim (host moderation).
    pub fn send_event(&self, event: MeetingEvent) -> Result<(), ClientError> {
        self.send_command(ConnectionCommand::SendEvent(event))
    }

    /// Tear the channel down and wait for the transport loop to exit. No
    /// reconnect attempts happen afterwards.
    pub async fn shutdown(&mut self) {
        log::debug!("Connection shutdown requested");
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => log::warn!("Transport loop join error: {}", err),
                Err(_) => {
                    log::warn!("Transport loop did not exit in time, aborting");
                    task.abort();
                }
            }
        }
        self.open.store(false, Ordering::Release);
    }

    fn send_command(&self, command: ConnectionCommand) -> Result<(), ClientError> {
        debug_assert!(self.task.is_some(), "send on a torn-down connection");
        self.cmd_tx
            .send(command)
            .map_err(|_| ClientError::ConnectionClosed)
    }
}

impl Drop for MeetingConnection {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

enum ChannelOutcome {
    /// Unexpected close or error; reconnect may follow.
    Lost,
    /// The owner asked for teardown, or the consumer went away.
    Shutdown,
}

async fn connection_loop(
    mut connector: impl Connector,
    participation: Participation,
    policy: ReconnectPolicy,
    mut cmd_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
    event_tx: mpsc::Sender<ConnectionEvent>,
    mut shutdown_rx: oneshot::Receiver<()>,
    open_flag: Arc<AtomicBool>,
) {
    let pid = participation.id;
    let mut local_state = CardState::None;
    // consecutive failed opens; reset on every successful handshake
    let mut attempt: u32 = 0;

    let reason = 'lifecycle: loop {
        let mut transport = tokio::select! {
            _ = &mut shutdown_rx => break 'lifecycle CloseReason::Terminated,
            connected = connector.connect() => match connected {
                Ok(transport) => transport,
                Err(err) => {
                    log::warn!("Connect failed: {}", err);
                    match reconnect_gate(&policy, &mut attempt, &mut shutdown_rx).await {
                        Some(reason) => break 'lifecycle reason,
                        None => continue 'lifecycle,
                    }
                }
            },
        };
        attempt = 0;
        open_flag.store(true, Ordering::Release);

        let outcome = drive_channel(
            &mut *transport,
            &pid,
            &mut local_state,
            &mut cmd_rx,
            &event_tx,
            &mut shutdown_rx,
        )
        .await;
        open_flag.store(false, Ordering::Release);

        match outcome {
            ChannelOutcome::Shutdown => {
                transport.close().await;
                break 'lifecycle CloseReason::Terminated;
            }
            ChannelOutcome::Lost => {
                match reconnect_gate(&policy, &mut attempt, &mut shutdown_rx).await {
                    Some(reason) => break 'lifecycle reason,
                    None => {}
                }
            }
        }
    };

    match reason {
        CloseReason::Terminated => log::info!("Channel terminated"),
        CloseReason::RetryBudgetExhausted => {
            log::warn!("Reconnect budget exhausted, channel stays closed")
        }
    }
    let _ = event_tx.send(ConnectionEvent::Closed { reason }).await;
}

/// One failed open: either sleep the backoff delay and return `None` to try
/// again, or report why the lifecycle ends.
async fn reconnect_gate(
    policy: &ReconnectPolicy,
    attempt: &mut u32,
    shutdown_rx: &mut oneshot::Receiver<()>,
) -> Option<CloseReason> {
    *attempt += 1;
    if !policy.should_retry(*attempt) {
        return Some(CloseReason::RetryBudgetExhausted);
    }
    let delay = policy.delay(*attempt);
    log::info!(
        "Reconnecting in {:?} (attempt {}/{})",
        delay,
        attempt,
        policy.max_attempts
    );
    tokio::select! {
        _ = &mut *shutdown_rx => Some(CloseReason::Terminated),
        _ = tokio::time::sleep(delay) => None,
    }
}

enum Step {
    Shutdown,
    Command(Option<ConnectionCommand>),
    Frame(Option<Result<String, TransportError>>),
}

/// Drive one open channel until it is lost or torn down.
async fn drive_channel(
    transport: &mut dyn Transport,
    pid: &str,
    local_state: &mut CardState,
    cmd_rx: &mut mpsc::UnboundedReceiver<ConnectionCommand>,
    event_tx: &mpsc::Sender<ConnectionEvent>,
    shutdown_rx: &mut oneshot::Receiver<()>,
) -> ChannelOutcome {
    // Resync before anything else, exactly once per open. The server keeps no
    // per-connection history across reconnects; without this the participant
    // reappears in the shared view with no card.
    let resync = MeetingEvent::CardChange {
        pid: pid.to_owned(),
        state: *local_state,
    };
    if let Err(err) = transport.send(encode_event(&resync)).await {
        log::warn!("Resync failed: {}", err);
        return ChannelOutcome::Lost;
    }
    if event_tx.send(ConnectionEvent::Open).await.is_err() {
        return ChannelOutcome::Shutdown;
    }

    loop {
        let step = tokio::select! {
            _ = &mut *shutdown_rx => Step::Shutdown,
            command = cmd_rx.recv() => Step::Command(command),
            frame = transport.recv() => Step::Frame(frame),
        };
        match step {
            Step::Shutdown => return ChannelOutcome::Shutdown,
            // the handle is gone; nobody can send through us anymore
            Step::Command(None) => return ChannelOutcome::Shutdown,
            Step::Command(Some(command)) => {
                let event = match command {
                    ConnectionCommand::SelectCard(state) => {
                        *local_state = state;
                        MeetingEvent::CardChange {
                            pid: pid.to_owned(),
                            state,
                        }
                    }
                    ConnectionCommand::SendEvent(event) => event,
                };
                if let Err(err) = transport.send(encode_event(&event)).await {
                    log::warn!("Send failed: {}", err);
                    return ChannelOutcome::Lost;
                }
            }
            Step::Frame(None) => {
                log::info!("Channel closed by peer");
                return ChannelOutcome::Lost;
            }
            Step::Frame(Some(Err(err))) => {
                log::warn!("Channel error: {}", err);
                return ChannelOutcome::Lost;
            }
            Step::Frame(Some(Ok(text))) => match decode_snapshot(&text) {
                // one bad frame never takes the connection down; the previous
                // snapshot stays in effect
                Err(err) => log::warn!("Discarding malformed frame: {}", err),
                Ok(snapshot) => {
                    if event_tx
                        .send(ConnectionEvent::Snapshot(snapshot))
                        .await
                        .is_err()
                    {
                        return ChannelOutcome::Shutdown;
                    }
                }
            },
        }
    }
}
