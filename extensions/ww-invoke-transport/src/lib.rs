//! Caller side of remote process invocation.
//!
//! A call resolves a `(PeerId, ProcessId)` pair to a
//! [`ProtocolAddress`](ww_invoke::address::ProtocolAddress), opens one stream
//! to it through a [`StreamOpener`], writes the request body, half-closes,
//! and reads the response to end-of-stream. One stream carries exactly one
//! call, and nothing here retries.

pub mod config;
pub mod constants;

mod error;
pub use error::*;

mod invoker;
pub use invoker::Invoker;

mod memory_overlay;
pub use memory_overlay::{MemoryOverlay, StreamHandler};

mod round_trip;
pub use round_trip::round_trip;

mod stream_opener;
pub use stream_opener::StreamOpener;

pub use tokio_util::sync::CancellationToken;
