//! Capability RPC for hosted processes.
//!
//! A hosted process publishes one bootstrap [`Capability`] over the duplex
//! channel its launcher hands it. [`CapabilityServer`] serves calls on that
//! channel concurrently; [`CapabilityClient`] is the calling side. Results
//! may carry further capabilities, which the caller receives as
//! [`RemoteCapability`] references.

pub mod config;
pub mod constants;
pub mod frame;

mod capability;
pub use capability::*;

mod capability_method;
pub use capability_method::*;

mod client;
pub use client::*;

mod connection;

mod method_id;
pub use method_id::*;

mod method_table;
pub use method_table::*;

mod responder;
pub use responder::*;

mod result_status;
pub use result_status::*;

mod server;
pub use server::*;

pub use tokio_util::sync::CancellationToken;
