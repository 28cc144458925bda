use std::fmt;
use std::io;
use ww_invoke::address::AddressError;
use ww_invoke::call::CallCodecError;

/// Errors raised by a single round trip.
///
/// Partial I/O always carries the number of bytes that made it through, so a
/// caller can tell whether the remote process may already have seen part of
/// the request.
#[derive(Debug)]
pub enum TransportError {
    /// No stream could be opened to the address. An open that timed out
    /// lands here too, with a `TimedOut` source.
    StreamOpenFailed { address: String, source: io::Error },

    /// The request body was not written in full.
    ShortWrite {
        written: usize,
        total: usize,
        source: io::Error,
    },

    /// Reading the response failed partway.
    ShortRead { read: usize, source: io::Error },

    /// The response grew past the configured limit.
    ResponseTooLarge { limit: usize },

    /// The call was canceled before a stream was opened.
    Canceled,
}

impl TransportError {
    /// Whether any request bytes may have reached the remote process.
    ///
    /// When this is `true` a retry is generally unsafe.
    pub fn may_have_side_effects(&self) -> bool {
        match self {
            TransportError::StreamOpenFailed { .. } | TransportError::Canceled => false,
            TransportError::ShortWrite { written, .. } => *written > 0,
            TransportError::ShortRead { .. } | TransportError::ResponseTooLarge { .. } => true,
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::StreamOpenFailed { address, source } => {
                write!(f, "failed to open stream to {address}: {source}")
            }
            TransportError::ShortWrite {
                written,
                total,
                source,
            } => write!(f, "short write: {written} of {total} bytes written: {source}"),
            TransportError::ShortRead { read, source } => {
                write!(f, "short read after {read} bytes: {source}")
            }
            TransportError::ResponseTooLarge { limit } => {
                write!(f, "response exceeds the {limit} byte limit")
            }
            TransportError::Canceled => write!(f, "round trip canceled"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::StreamOpenFailed { source, .. }
            | TransportError::ShortWrite { source, .. }
            | TransportError::ShortRead { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Errors raised by [`Invoker`](crate::Invoker), covering every stage of a call.
///
/// `Address` and `Codec` errors on the request side are raised before any
/// network action.
#[derive(Debug)]
pub enum InvokeError {
    Address(AddressError),
    Codec(CallCodecError),
    Transport(TransportError),

    /// The hosting process answered with an error reply. `status` is the
    /// hosting side's result status byte; `payload` is its error data.
    Remote { status: u8, payload: Vec<u8> },
}

impl InvokeError {
    /// The status byte of an error reply, if the hosting process sent one.
    pub fn remote_status(&self) -> Option<u8> {
        match self {
            InvokeError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for InvokeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvokeError::Address(e) => write!(f, "address error: {e}"),
            InvokeError::Codec(e) => write!(f, "codec error: {e}"),
            InvokeError::Transport(e) => write!(f, "transport error: {e}"),
            InvokeError::Remote { status, payload } => write!(
                f,
                "remote call failed with status {status}: {}",
                String::from_utf8_lossy(payload)
            ),
        }
    }
}

impl std::error::Error for InvokeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InvokeError::Address(e) => Some(e),
            InvokeError::Codec(e) => Some(e),
            InvokeError::Transport(e) => Some(e),
            InvokeError::Remote { .. } => None,
        }
    }
}

impl From<AddressError> for InvokeError {
    fn from(e: AddressError) -> Self {
        InvokeError::Address(e)
    }
}

impl From<CallCodecError> for InvokeError {
    fn from(e: CallCodecError) -> Self {
        InvokeError::Codec(e)
    }
}

impl From<TransportError> for InvokeError {
    fn from(e: TransportError) -> Self {
        InvokeError::Transport(e)
    }
}
