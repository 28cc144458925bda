use crate::{
    Capability, CapabilityError,
    config::ConnectionConfig,
    connection::{CloseReason, Connection},
    frame::FrameError,
};
use std::fmt;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;
use ww_invoke::call::CallCodecError;

/// Lifecycle of a [`CapabilityServer`].
///
/// Transitions only move forward: `Idle -> Accepting -> Bound -> Closed`.
/// Any state may jump straight to `Closed`, which is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Constructed, no channel yet.
    Idle,
    /// Holding the channel, not yet serving.
    Accepting,
    /// Serving calls against the bootstrap capability.
    Bound,
    Closed,
}

#[derive(Debug)]
pub enum ServerError {
    /// The requested operation is not valid in the current state.
    InvalidTransition { from: ServerState, to: ServerState },

    /// The channel produced an unreadable frame or failed outright.
    Frame(FrameError),

    Io(io::Error),

    /// A one-shot request could not be decoded.
    Codec(CallCodecError),

    /// A one-shot request reached the capability, which failed.
    Capability(CapabilityError),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::InvalidTransition { from, to } => {
                write!(f, "invalid server transition from {from:?} to {to:?}")
            }
            ServerError::Frame(e) => write!(f, "frame error: {e}"),
            ServerError::Io(e) => write!(f, "I/O error: {e}"),
            ServerError::Codec(e) => write!(f, "codec error: {e}"),
            ServerError::Capability(e) => write!(f, "capability error: {e}"),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServerError::Frame(e) => Some(e),
            ServerError::Io(e) => Some(e),
            ServerError::Codec(e) => Some(e),
            ServerError::Capability(e) => Some(e),
            ServerError::InvalidTransition { .. } => None,
        }
    }
}

impl From<FrameError> for ServerError {
    fn from(e: FrameError) -> Self {
        ServerError::Frame(e)
    }
}

impl From<io::Error> for ServerError {
    fn from(e: io::Error) -> Self {
        ServerError::Io(e)
    }
}

impl From<CallCodecError> for ServerError {
    fn from(e: CallCodecError) -> Self {
        ServerError::Codec(e)
    }
}

impl From<CapabilityError> for ServerError {
    fn from(e: CapabilityError) -> Self {
        ServerError::Capability(e)
    }
}

type StateChangeHandler = Box<dyn Fn(ServerState) + Send + Sync>;

/// Serves a bootstrap capability over the duplex channel handed to a hosted
/// process by its launcher.
///
/// The channel is injected through [`accept`](Self::accept); the server never
/// opens one itself. Once closed, a server stays closed.
pub struct CapabilityServer<S> {
    bootstrap: Arc<dyn Capability>,
    config: ConnectionConfig,
    state: Mutex<ServerState>,
    channel: Mutex<Option<S>>,
    close_token: CancellationToken,
    state_change_handler: Mutex<Option<StateChangeHandler>>,
}

impl<S> CapabilityServer<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    /// Creates an idle server with the default [`ConnectionConfig`].
    ///
    /// # Arguments
    ///
    /// * `bootstrap` - The capability published at id 0, reachable for the
    ///   whole life of the connection.
    ///
    /// # Returns
    ///
    /// A server in [`ServerState::Idle`]. It does nothing until a channel is
    /// handed over with [`accept`](Self::accept) and
    /// [`serve`](Self::serve) is awaited.
    pub fn new(bootstrap: Arc<dyn Capability>) -> Self {
        Self::with_config(bootstrap, ConnectionConfig::default())
    }

    pub fn with_config(bootstrap: Arc<dyn Capability>, config: ConnectionConfig) -> Self {
        Self {
            bootstrap,
            config,
            state: Mutex::new(ServerState::Idle),
            channel: Mutex::new(None),
            close_token: CancellationToken::new(),
            state_change_handler: Mutex::new(None),
        }
    }

    pub fn state(&self) -> ServerState {
        *lock(&self.state)
    }

    /// Installs a callback invoked with every state the server enters.
    pub fn set_state_change_handler(&self, handler: impl Fn(ServerState) + Send + Sync + 'static) {
        *lock(&self.state_change_handler) = Some(Box::new(handler));
    }

    /// Takes ownership of the launcher-supplied channel. `Idle -> Accepting`.
    pub fn accept(&self, channel: S) -> Result<(), ServerError> {
        self.transition(ServerState::Idle, ServerState::Accepting)?;
        *lock(&self.channel) = Some(channel);
        tracing::debug!("Capability server accepted channel");
        Ok(())
    }

    /// Serves the bootstrap capability until `cancel` fires, [`close`](Self::close)
    /// is called, the peer closes the channel, or the channel fails.
    ///
    /// `Accepting -> Bound`, then `Bound -> Closed` when serving stops.
    pub async fn serve(&self, cancel: CancellationToken) -> Result<(), ServerError> {
        self.transition(ServerState::Accepting, ServerState::Bound)?;

        let channel = lock(&self.channel).take();
        let Some(channel) = channel else {
            // `close` raced us between the transition and here.
            self.mark_closed();
            return Ok(());
        };

        tracing::info!("Capability server bound");
        let connection = Connection::new(self.bootstrap.clone(), self.config.clone());
        let outcome = connection.run(channel, &cancel, &self.close_token).await;

        match &outcome {
            Ok(CloseReason::Canceled) => tracing::info!("Capability server canceled"),
            Ok(CloseReason::PeerClosed) => tracing::info!("Peer closed the channel"),
            Err(err) => tracing::warn!("Capability server stopped on error: {}", err),
        }

        self.mark_closed();
        outcome.map(|_| ())
    }

    /// Stops the server. Safe to call any number of times, from any state.
    ///
    /// A server that is serving moves to `Closed` once its in-flight calls
    /// have been aborted; otherwise the transition is immediate.
    pub fn close(&self) {
        self.close_token.cancel();

        let serving = self.state() == ServerState::Bound;
        if !serving {
            lock(&self.channel).take();
            self.mark_closed();
        }
    }

    fn transition(&self, from: ServerState, to: ServerState) -> Result<(), ServerError> {
        {
            let mut state = lock(&self.state);
            if *state != from {
                return Err(ServerError::InvalidTransition { from: *state, to });
            }
            *state = to;
        }
        self.notify(to);
        Ok(())
    }

    fn mark_closed(&self) {
        let changed = {
            let mut state = lock(&self.state);
            let changed = *state != ServerState::Closed;
            *state = ServerState::Closed;
            changed
        };
        if changed {
            self.notify(ServerState::Closed);
        }
    }

    fn notify(&self, state: ServerState) {
        if let Some(handler) = lock(&self.state_change_handler).as_ref() {
            handler(state);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
