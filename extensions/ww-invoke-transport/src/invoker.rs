use crate::{InvokeError, StreamOpener, TransportError, config::TransportConfig, round_trip};
use tokio_util::sync::CancellationToken;
use ww_invoke::address::{PeerId, ProcessId, ProtocolAddress, resolve, resolve_str};
use ww_invoke::call::{CallCodec, MethodCall};

/// Issues method calls against processes on remote peers.
///
/// Each call resolves its address, encodes the request, performs one
/// [`round_trip`] on its own stream and decodes the reply. Failures in the
/// first two steps happen before any stream is opened.
pub struct Invoker<O>
where
    O: StreamOpener,
{
    opener: O,
    config: TransportConfig,
}

impl<O> Invoker<O>
where
    O: StreamOpener,
{
    /// Creates an invoker with the default [`TransportConfig`].
    ///
    /// # Arguments
    ///
    /// * `opener` - The overlay seam used to open one stream per call.
    ///
    /// # Returns
    ///
    /// An invoker that holds no connection state of its own; every call opens
    /// and finishes its own stream through `opener`.
    pub fn new(opener: O) -> Self {
        Self::with_config(opener, TransportConfig::default())
    }

    pub fn with_config(opener: O, config: TransportConfig) -> Self {
        Self { opener, config }
    }

    pub fn opener(&self) -> &O {
        &self.opener
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Invokes `call` on `pid` hosted by `peer` and decodes the reply.
    ///
    /// An error reply from the hosting process comes back as
    /// [`InvokeError::Remote`].
    pub async fn invoke(
        &self,
        peer: &PeerId,
        pid: &ProcessId,
        call: &MethodCall,
        cancel: &CancellationToken,
    ) -> Result<MethodCall, InvokeError> {
        let address = resolve(peer, pid);
        tracing::info!("Invoking {:?} on {}", call.method(), address);

        let response = self
            .invoke_raw(&address, &CallCodec::encode(call), cancel)
            .await?;

        let reply = CallCodec::decode(&response)?;
        if let Some(status) = reply.error_status() {
            tracing::debug!("{} answered {:?} with status {}", address, call.method(), status);
            let (_, _, payload) = reply.into_parts();
            return Err(InvokeError::Remote { status, payload });
        }

        Ok(reply)
    }

    /// Like [`Invoker::invoke`], parsing textual identifiers first.
    pub async fn invoke_str(
        &self,
        peer: &str,
        pid: &str,
        call: &MethodCall,
        cancel: &CancellationToken,
    ) -> Result<MethodCall, InvokeError> {
        let address = resolve_str(peer, pid)?;
        let (peer, pid) = address.split();
        self.invoke(&peer, &pid, call, cancel).await
    }

    /// Sends raw bytes to `address` and returns the raw response.
    ///
    /// Used by protocols that predate or bypass the call codec.
    pub async fn invoke_raw(
        &self,
        address: &ProtocolAddress,
        body: &[u8],
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, TransportError> {
        round_trip(&self.opener, address, body, &self.config, cancel).await
    }
}
