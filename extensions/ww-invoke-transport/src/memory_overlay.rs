use crate::{StreamOpener, constants::DEFAULT_MEMORY_OVERLAY_BUFFER_SIZE};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::sync::{Arc, Mutex};
use tokio::io::{DuplexStream, duplex};
use ww_invoke::address::ProtocolAddress;

/// Handler run for every stream opened against a registered address.
///
/// It receives the hosting side of the stream and owns it until it returns.
pub type StreamHandler = Arc<dyn Fn(DuplexStream) -> BoxFuture<'static, ()> + Send + Sync>;

/// An in-process overlay connecting callers and hosted processes through
/// `tokio::io::duplex` pipes.
///
/// Hosting code registers a handler per [`ProtocolAddress`]; opening a
/// stream to that address spawns the handler on the far end of a fresh pipe.
/// Opening an unregistered address fails with `ConnectionRefused`, the same
/// way an overlay rejects an unknown protocol.
#[derive(Clone)]
pub struct MemoryOverlay {
    routes: Arc<Mutex<HashMap<ProtocolAddress, StreamHandler>>>,
    buffer_size: usize,
}

impl Default for MemoryOverlay {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryOverlay {
    pub fn new() -> Self {
        Self::with_buffer_size(DEFAULT_MEMORY_OVERLAY_BUFFER_SIZE)
    }

    pub fn with_buffer_size(buffer_size: usize) -> Self {
        Self {
            routes: Arc::new(Mutex::new(HashMap::new())),
            buffer_size: buffer_size.max(1),
        }
    }

    /// Routes streams opened against `address` to `handler`.
    ///
    /// Fails with `AlreadyExists` if the address is already served.
    pub fn register<F, Fut>(&self, address: ProtocolAddress, handler: F) -> io::Result<()>
    where
        F: Fn(DuplexStream) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut routes = self.lock_routes()?;
        if routes.contains_key(&address) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("a handler for {address} is already registered"),
            ));
        }

        tracing::debug!("Registered handler for {}", address);
        let wrapped =
            move |stream: DuplexStream| Box::pin(handler(stream)) as BoxFuture<'static, ()>;
        routes.insert(address, Arc::new(wrapped));
        Ok(())
    }

    /// Stops routing `address`. Returns whether a handler was removed.
    pub fn unregister(&self, address: &ProtocolAddress) -> bool {
        self.lock_routes()
            .map(|mut routes| routes.remove(address).is_some())
            .unwrap_or(false)
    }

    fn lock_routes(
        &self,
    ) -> io::Result<std::sync::MutexGuard<'_, HashMap<ProtocolAddress, StreamHandler>>> {
        self.routes
            .lock()
            .map_err(|_| io::Error::other("overlay route table poisoned"))
    }
}

#[async_trait::async_trait]
impl StreamOpener for MemoryOverlay {
    type Stream = DuplexStream;

    async fn open_stream(&self, address: &ProtocolAddress) -> io::Result<Self::Stream> {
        let handler = self.lock_routes()?.get(address).cloned();

        let Some(handler) = handler else {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                format!("no process serves {address}"),
            ));
        };

        let (local, remote) = duplex(self.buffer_size);
        tokio::spawn(handler(remote));

        Ok(local)
    }
}
