use crate::{
    Capability, ResultStatus,
    config::ConnectionConfig,
    constants::{BOOTSTRAP_CAPABILITY_ID, NO_CAPABILITY},
    frame::{Frame, FrameCodec, FrameError, FrameKind},
    server::ServerError,
};
use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use ww_invoke::call::{CallCodec, MethodCall};

/// Why a connection stopped serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CloseReason {
    Canceled,
    PeerClosed,
}

/// Capabilities reachable from the remote side, keyed by export id.
///
/// The bootstrap capability always sits at id 0 and cannot be released.
pub(crate) struct ExportTable {
    bootstrap: Arc<dyn Capability>,
    exports: HashMap<u32, Arc<dyn Capability>>,
    next_id: u32,
}

impl ExportTable {
    pub(crate) fn new(bootstrap: Arc<dyn Capability>) -> Self {
        Self {
            bootstrap,
            exports: HashMap::new(),
            next_id: BOOTSTRAP_CAPABILITY_ID + 1,
        }
    }

    pub(crate) fn get(&self, id: u32) -> Option<Arc<dyn Capability>> {
        if id == BOOTSTRAP_CAPABILITY_ID {
            return Some(self.bootstrap.clone());
        }
        self.exports.get(&id).cloned()
    }

    pub(crate) fn export(&mut self, capability: Arc<dyn Capability>) -> u32 {
        loop {
            let id = self.next_id;
            self.next_id = self.next_id.wrapping_add(1);

            let reserved = id == BOOTSTRAP_CAPABILITY_ID || id == NO_CAPABILITY;
            if reserved || self.exports.contains_key(&id) {
                continue;
            }

            self.exports.insert(id, capability);
            return id;
        }
    }

    pub(crate) fn release(&mut self, id: u32) -> bool {
        id != BOOTSTRAP_CAPABILITY_ID && self.exports.remove(&id).is_some()
    }
}

fn lock_exports(exports: &Mutex<ExportTable>) -> MutexGuard<'_, ExportTable> {
    exports.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Serves one duplex channel: reads call and release frames, runs each call
/// on its own task, and writes the returns back as they complete.
pub(crate) struct Connection {
    exports: Arc<Mutex<ExportTable>>,
    config: ConnectionConfig,
}

impl Connection {
    pub(crate) fn new(bootstrap: Arc<dyn Capability>, config: ConnectionConfig) -> Self {
        Self {
            exports: Arc::new(Mutex::new(ExportTable::new(bootstrap))),
            config,
        }
    }

    /// Runs until either token fires, the peer closes, or the channel fails.
    ///
    /// In-flight calls are drained when the peer closes and aborted on
    /// cancellation. A fatal frame error aborts them as well.
    pub(crate) async fn run<S>(
        self,
        channel: S,
        cancel: &CancellationToken,
        close: &CancellationToken,
    ) -> Result<CloseReason, ServerError>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (mut reader, mut writer) = tokio::io::split(channel);
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Frame>();
        let (in_tx, mut in_rx) =
            mpsc::channel::<Result<Frame, FrameError>>(self.config.max_in_flight_calls.max(1));

        // Reading a frame is not cancel-safe, so it lives on its own task
        // and the select loop below only ever waits on the channel.
        let max_frame_len = self.config.max_frame_len;
        let read_task = tokio::spawn(async move {
            loop {
                match FrameCodec::read_frame(&mut reader, max_frame_len).await {
                    Ok(Some(frame)) => {
                        if in_tx.send(Ok(frame)).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(err) => {
                        let _ = in_tx.send(Err(err)).await;
                        break;
                    }
                }
            }
        });

        let mut write_task = tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                FrameCodec::write_frame(&mut writer, &frame).await?;
            }
            let _ = writer.shutdown().await;
            Ok::<(), FrameError>(())
        });
        let mut write_done = false;

        let permits = Arc::new(Semaphore::new(self.config.max_in_flight_calls.max(1)));
        let mut calls = JoinSet::new();

        // A call slot is reserved before the next frame is taken off the
        // channel. With no free slot the channel fills and the reader stops.
        let mut slot: Option<OwnedSemaphorePermit> = None;

        let outcome = loop {
            tokio::select! {
                biased;

                _ = stop_requested(cancel, close) => break Ok(CloseReason::Canceled),

                written = &mut write_task => {
                    write_done = true;
                    let err = match written {
                        Ok(Err(err)) => ServerError::Frame(err),
                        Ok(Ok(())) => ServerError::Io(io::Error::new(
                            io::ErrorKind::BrokenPipe,
                            "return writer stopped",
                        )),
                        Err(err) => ServerError::Io(io::Error::other(err)),
                    };
                    tracing::warn!("Closing connection on write failure: {}", err);
                    break Err(err);
                }

                Some(joined) = calls.join_next() => log_join(joined),

                permit = permits.clone().acquire_owned(), if slot.is_none() => {
                    slot = permit.ok();
                }

                incoming = in_rx.recv(), if slot.is_some() => match incoming {
                    Some(Ok(frame)) => self.dispatch(frame, &mut calls, &mut slot, &out_tx),
                    Some(Err(err)) => {
                        tracing::warn!("Closing connection on frame error: {}", err);
                        break Err(ServerError::Frame(err));
                    }
                    None => break Ok(CloseReason::PeerClosed),
                },
            }
        };
        drop(slot);

        if matches!(outcome, Ok(CloseReason::PeerClosed)) {
            tracing::debug!("Peer closed; draining {} in-flight call(s)", calls.len());
            loop {
                tokio::select! {
                    biased;
                    _ = stop_requested(cancel, close) => break,
                    joined = calls.join_next() => match joined {
                        Some(joined) => log_join(joined),
                        None => break,
                    },
                }
            }
        }

        calls.shutdown().await;
        read_task.abort();
        drop(out_tx);

        // Flush returns already queued unless told to stop.
        if !write_done {
            tokio::select! {
                biased;
                _ = stop_requested(cancel, close) => write_task.abort(),
                _ = &mut write_task => {}
            }
        }

        outcome
    }

    fn dispatch(
        &self,
        frame: Frame,
        calls: &mut JoinSet<()>,
        slot: &mut Option<OwnedSemaphorePermit>,
        out_tx: &mpsc::UnboundedSender<Frame>,
    ) {
        match frame.kind {
            FrameKind::Call => {
                let target = lock_exports(&self.exports).get(frame.capability_id);
                let Some(target) = target else {
                    tracing::debug!(
                        "Call {} targets unknown capability {}",
                        frame.request_id,
                        frame.capability_id
                    );
                    let _ = out_tx.send(error_return(
                        frame.request_id,
                        ResultStatus::CapabilityNotFound,
                        format!("no capability with id {}", frame.capability_id),
                        self.config.max_frame_len,
                    ));
                    return;
                };

                let Some(permit) = slot.take() else {
                    return;
                };
                let exports = self.exports.clone();
                let out_tx = out_tx.clone();
                let max_frame_len = self.config.max_frame_len;

                calls.spawn(async move {
                    let _permit = permit;
                    let reply = execute(
                        target,
                        &exports,
                        frame.request_id,
                        &frame.payload,
                        max_frame_len,
                    )
                    .await;
                    let _ = out_tx.send(reply);
                });
            }
            FrameKind::Release => {
                if lock_exports(&self.exports).release(frame.capability_id) {
                    tracing::debug!("Released capability {}", frame.capability_id);
                } else {
                    tracing::warn!(
                        "Release of unknown capability {} ignored",
                        frame.capability_id
                    );
                }
            }
            FrameKind::Return => {
                tracing::warn!(
                    "Ignoring return frame for request {} on serving side",
                    frame.request_id
                );
            }
        }
    }
}

/// Runs one call and builds its return frame.
///
/// A return that would not fit in `max_frame_len` is replaced by a
/// `SystemError` return, and any capability it carried is not exported.
async fn execute(
    target: Arc<dyn Capability>,
    exports: &Mutex<ExportTable>,
    request_id: u32,
    payload: &[u8],
    max_frame_len: usize,
) -> Frame {
    let params = match CallCodec::decode(payload) {
        Ok(params) => params,
        Err(err) => {
            tracing::debug!("Malformed call {}: {}", request_id, err);
            return error_return(
                request_id,
                ResultStatus::MalformedCall,
                err.to_string(),
                max_frame_len,
            );
        }
    };

    let method = params.method().to_string();
    match target.call(params).await {
        Ok(results) => {
            let (stack, payload, capability) = results.into_parts();
            let results = match MethodCall::new(method.as_str(), stack, payload) {
                Ok(results) => results,
                Err(err) => {
                    return error_return(
                        request_id,
                        ResultStatus::SystemError,
                        err.to_string(),
                        max_frame_len,
                    );
                }
            };

            let encoded = CallCodec::encode(&results);
            if encoded.len() > max_frame_len {
                tracing::warn!(
                    "Result of call {} to {:?} is {} bytes, over the {} byte frame limit",
                    request_id,
                    method,
                    encoded.len(),
                    max_frame_len
                );
                return error_return(
                    request_id,
                    ResultStatus::SystemError,
                    format!(
                        "result of {} bytes exceeds frame limit of {} bytes",
                        encoded.len(),
                        max_frame_len
                    ),
                    max_frame_len,
                );
            }

            let exported = capability.map(|capability| {
                let id = lock_exports(exports).export(capability);
                tracing::debug!("Exported capability {} from call {}", id, request_id);
                id
            });

            Frame::ret(request_id, ResultStatus::Success, exported, encoded)
        }
        Err(err) => {
            tracing::debug!("Call {} to {:?} failed: {}", request_id, method, err);
            let status = err.status();
            let mut payload = err.into_payload();
            // Error data is cut rather than dropping the connection.
            payload.truncate(max_frame_len);
            Frame::ret(request_id, status, None, payload)
        }
    }
}

fn error_return(
    request_id: u32,
    status: ResultStatus,
    message: String,
    max_frame_len: usize,
) -> Frame {
    let mut payload = message.into_bytes();
    payload.truncate(max_frame_len);
    Frame::ret(request_id, status, None, payload)
}

async fn stop_requested(cancel: &CancellationToken, close: &CancellationToken) {
    tokio::select! {
        _ = cancel.cancelled() => {}
        _ = close.cancelled() => {}
    }
}

fn log_join(joined: Result<(), JoinError>) {
    if let Err(err) = joined {
        if err.is_panic() {
            tracing::warn!("Call task panicked: {}", err);
        }
    }
}
