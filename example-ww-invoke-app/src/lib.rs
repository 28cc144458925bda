//! Wiring shared by the demo binary and its tests: a method table built from
//! the example definitions, and a helper that hosts a capability behind an
//! in-memory overlay address.

use example_ww_invoke_service_definition::{Echo, Greet, Sum};
use std::io;
use std::sync::Arc;
use ww_invoke::address::{PeerId, ProcessId, ProtocolAddress, resolve};
use ww_invoke_capability::{
    Capability, CapabilityError, MethodTable, MethodTableError, serve_round_trip,
};
use ww_invoke_transport::MemoryOverlay;

/// Builds the demo service: `echo`, `sum` and `greet`.
pub async fn service_table() -> Result<MethodTable, MethodTableError> {
    let table = MethodTable::new();

    table
        .register_method::<Echo, _, _>(|(words, payload)| async move { Ok((words, payload)) })
        .await?;

    table
        .register_method::<Sum, _, _>(|words: Vec<u64>| async move {
            words
                .iter()
                .try_fold(0u64, |total, word| total.checked_add(*word))
                .ok_or_else(|| CapabilityError::failed("sum overflowed"))
        })
        .await?;

    table
        .register_method::<Greet, _, _>(|name: String| async move {
            if name.is_empty() {
                return Err(CapabilityError::InvalidArguments("empty name".into()));
            }
            Ok(format!("Hello, {name}!"))
        })
        .await?;

    Ok(table)
}

/// Serves `capability` at the protocol address of `(peer, pid)`, one call per
/// stream.
pub fn host_process(
    overlay: &MemoryOverlay,
    peer: &PeerId,
    pid: &ProcessId,
    capability: Arc<dyn Capability>,
) -> io::Result<ProtocolAddress> {
    let address = resolve(peer, pid);

    overlay.register(address.clone(), move |stream| {
        let capability = capability.clone();
        async move {
            if let Err(err) = serve_round_trip(stream, capability.as_ref()).await {
                tracing::warn!("Round trip failed on hosted process: {}", err);
            }
        }
    })?;

    tracing::info!("Hosting process at {}", address);
    Ok(address)
}
