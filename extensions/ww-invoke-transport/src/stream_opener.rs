use std::io;
use tokio::io::{AsyncRead, AsyncWrite};
use ww_invoke::address::ProtocolAddress;

/// A handle onto the peer-to-peer overlay able to open streams by protocol.
///
/// Implementations dial the peer named by the address and request the
/// protocol identified by [`ProtocolAddress::protocol_id`]. Any failure to do
/// so (no route, peer unreachable, protocol rejected) is reported as an
/// `io::Error`; the transport turns it into `TransportError::StreamOpenFailed`.
#[async_trait::async_trait]
pub trait StreamOpener: Send + Sync {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    async fn open_stream(&self, address: &ProtocolAddress) -> io::Result<Self::Stream>;
}
