use crate::{
    ResultStatus,
    config::ConnectionConfig,
    constants::{BOOTSTRAP_CAPABILITY_ID, NO_CAPABILITY},
    frame::{Frame, FrameCodec, FrameKind},
};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use ww_invoke::call::{CallCodec, CallCodecError, MethodCall, WordStack};

/// Errors raised on the calling side of a connection.
#[derive(Debug)]
pub enum ClientError {
    /// A transport-level or I/O error occurred during the call.
    Io(io::Error),

    /// The request could not be built, or the reply could not be decoded.
    Codec(CallCodecError),

    /// The remote side answered with a non-success status.
    /// For `ResultStatus::Fail` the payload holds the operation's error data.
    Remote {
        status: ResultStatus,
        payload: Vec<u8>,
    },

    /// The encoded request does not fit in one frame. Nothing was sent.
    RequestTooLarge { len: usize, limit: usize },

    /// The connection closed before a reply arrived.
    Disconnected,
}

impl ClientError {
    /// The remote status, if the error came back from the hosting side.
    pub fn remote_status(&self) -> Option<ResultStatus> {
        match self {
            ClientError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Io(e) => write!(f, "I/O error: {e}"),
            ClientError::Codec(e) => write!(f, "codec error: {e}"),
            ClientError::Remote { status, payload } => write!(
                f,
                "remote call failed with {status:?}: {}",
                String::from_utf8_lossy(payload)
            ),
            ClientError::RequestTooLarge { len, limit } => {
                write!(f, "request of {len} bytes exceeds frame limit of {limit} bytes")
            }
            ClientError::Disconnected => write!(f, "connection closed"),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Io(e) => Some(e),
            ClientError::Codec(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ClientError {
    fn from(e: io::Error) -> Self {
        ClientError::Io(e)
    }
}

impl From<CallCodecError> for ClientError {
    fn from(e: CallCodecError) -> Self {
        ClientError::Codec(e)
    }
}

/// A successful reply: the echoed method call plus any capability it exported.
#[derive(Debug)]
pub struct CallReply {
    results: MethodCall,
    capability: Option<RemoteCapability>,
}

impl CallReply {
    pub fn method(&self) -> &str {
        self.results.method()
    }

    pub fn stack(&self) -> &WordStack {
        self.results.stack()
    }

    pub fn payload(&self) -> &[u8] {
        self.results.payload()
    }

    /// Takes the capability exported by the call, if any.
    pub fn take_capability(&mut self) -> Option<RemoteCapability> {
        self.capability.take()
    }

    pub fn into_results(self) -> MethodCall {
        self.results
    }
}

struct ClientShared {
    tx: mpsc::UnboundedSender<Frame>,
    pending: Mutex<HashMap<u32, oneshot::Sender<Frame>>>,
    next_request_id: AtomicU32,
    closed: AtomicBool,
    max_frame_len: usize,
}

impl ClientShared {
    /// Marks the connection closed and fails every outstanding call.
    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        if let Ok(mut pending) = self.pending.lock() {
            // Dropping the senders wakes the waiting callers.
            pending.clear();
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// The calling side of an RPC connection.
///
/// Owns the background tasks reading and writing the channel; dropping the
/// client aborts them and closes the channel. Calls from any number of
/// tasks share the connection and are matched to their returns by request id.
pub struct CapabilityClient {
    shared: Arc<ClientShared>,
    tasks: Vec<JoinHandle<()>>,
}

impl CapabilityClient {
    pub fn connect<S>(channel: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        Self::connect_with_config(channel, ConnectionConfig::default())
    }

    pub fn connect_with_config<S>(channel: S, config: ConnectionConfig) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (mut reader, mut writer) = tokio::io::split(channel);
        let (tx, mut rx) = mpsc::unbounded_channel::<Frame>();

        let shared = Arc::new(ClientShared {
            tx,
            pending: Mutex::new(HashMap::new()),
            next_request_id: AtomicU32::new(1),
            closed: AtomicBool::new(false),
            max_frame_len: config.max_frame_len,
        });

        // Send loop
        let send_task = tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                if let Err(err) = FrameCodec::write_frame(&mut writer, &frame).await {
                    tracing::warn!("Failed to write frame: {}", err);
                    break;
                }
            }
        });

        // Receive loop
        let receive_task = tokio::spawn({
            let shared = shared.clone();
            async move {
                loop {
                    match FrameCodec::read_frame(&mut reader, config.max_frame_len).await {
                        Ok(Some(frame)) if frame.kind == FrameKind::Return => {
                            let waiter = shared
                                .pending
                                .lock()
                                .ok()
                                .and_then(|mut pending| pending.remove(&frame.request_id));
                            match waiter {
                                Some(waiter) => {
                                    let _ = waiter.send(frame);
                                }
                                None => tracing::warn!(
                                    "Dropping return for unknown request {}",
                                    frame.request_id
                                ),
                            }
                        }
                        Ok(Some(frame)) => {
                            tracing::warn!("Ignoring unexpected {:?} frame", frame.kind);
                        }
                        Ok(None) => {
                            tracing::debug!("Server closed the connection");
                            break;
                        }
                        Err(err) => {
                            tracing::warn!("Failed to read frame: {}", err);
                            break;
                        }
                    }
                }
                shared.close();
            }
        });

        Self {
            shared,
            tasks: vec![send_task, receive_task],
        }
    }

    /// The root capability the server published on this connection.
    pub fn bootstrap(&self) -> RemoteCapability {
        RemoteCapability {
            id: BOOTSTRAP_CAPABILITY_ID,
            shared: self.shared.clone(),
        }
    }

    pub fn is_connected(&self) -> bool {
        !self.shared.is_closed()
    }
}

impl Drop for CapabilityClient {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
        self.shared.close();
    }
}

/// A reference to a capability exported by the remote side of a connection.
#[derive(Clone)]
pub struct RemoteCapability {
    id: u32,
    shared: Arc<ClientShared>,
}

impl fmt::Debug for RemoteCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteCapability")
            .field("id", &self.id)
            .finish()
    }
}

impl RemoteCapability {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn is_bootstrap(&self) -> bool {
        self.id == BOOTSTRAP_CAPABILITY_ID
    }

    /// Invokes `params` on this capability and waits for the reply.
    ///
    /// A request that would not fit in one frame fails with
    /// [`ClientError::RequestTooLarge`] without touching the connection.
    pub async fn call(&self, params: &MethodCall) -> Result<CallReply, ClientError> {
        let payload = CallCodec::encode(params);
        if payload.len() > self.shared.max_frame_len {
            return Err(ClientError::RequestTooLarge {
                len: payload.len(),
                limit: self.shared.max_frame_len,
            });
        }

        let request_id = self.shared.next_request_id.fetch_add(1, Ordering::Relaxed);
        let (done_tx, done_rx) = oneshot::channel::<Frame>();

        self.shared
            .pending
            .lock()
            .map_err(|_| ClientError::Disconnected)?
            .insert(request_id, done_tx);

        // The receive loop may have closed between the insert and now.
        if self.shared.is_closed() {
            self.forget(request_id);
            return Err(ClientError::Disconnected);
        }

        let frame = Frame::call(request_id, self.id, payload);
        if self.shared.tx.send(frame).is_err() {
            self.forget(request_id);
            return Err(ClientError::Disconnected);
        }

        let frame = done_rx.await.map_err(|_| ClientError::Disconnected)?;
        let status = ResultStatus::try_from(frame.status).unwrap_or(ResultStatus::SystemError);

        if status != ResultStatus::Success {
            return Err(ClientError::Remote {
                status,
                payload: frame.payload,
            });
        }

        let results = CallCodec::decode(&frame.payload)?;
        let capability = (frame.capability_id != NO_CAPABILITY).then(|| RemoteCapability {
            id: frame.capability_id,
            shared: self.shared.clone(),
        });

        Ok(CallReply {
            results,
            capability,
        })
    }

    /// Tells the server this reference is no longer needed.
    ///
    /// Releasing the bootstrap capability is a no-op: it lives as long as
    /// the connection.
    pub fn release(self) -> Result<(), ClientError> {
        if self.is_bootstrap() {
            return Ok(());
        }

        self.shared
            .tx
            .send(Frame::release(self.id))
            .map_err(|_| ClientError::Disconnected)
    }

    fn forget(&self, request_id: u32) {
        if let Ok(mut pending) = self.shared.pending.lock() {
            pending.remove(&request_id);
        }
    }
}
