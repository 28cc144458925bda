//! Core primitives for invoking methods on processes hosted by remote peers.
//!
//! - [`address`] turns a `(PeerId, ProcessId)` pair into a routable
//!   [`ProtocolAddress`](address::ProtocolAddress) and back.
//! - [`call`] holds the [`MethodCall`](call::MethodCall) model and the binary
//!   codec used to carry it over a byte stream.
//!
//! Transports and the capability server live in the extension crates.

pub mod address;
pub mod call;
pub mod constants;
