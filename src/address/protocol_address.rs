use super::{AddressError, PeerId, ProcessId};
use crate::constants::{PEER_SCOPE_TAG, PROCESS_SCOPE_TAG, SERVICE_NAMESPACE};
use std::{fmt, str::FromStr};

/// A routable protocol identifier naming one process on one peer.
///
/// The address is made of three segments, always in this order:
///
/// 1. the peer scope, `/peer/<peer-id>`
/// 2. the service namespace, `/ww-invoke`
/// 3. the process scope, `/pid/<process-id>`
///
/// Each scope segment opens with a reserved tag and identifiers never contain
/// `/`, so splitting an address back into its parts is total and exact.
///
/// Addresses are derived data. They are rebuilt from a `(PeerId, ProcessId)`
/// pair whenever needed and are never stored on their own.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProtocolAddress {
    peer: PeerId,
    pid: ProcessId,
}

impl ProtocolAddress {
    pub fn peer(&self) -> &PeerId {
        &self.peer
    }

    pub fn pid(&self) -> &ProcessId {
        &self.pid
    }

    /// The service namespace segment carried by every address.
    pub fn namespace(&self) -> &'static str {
        SERVICE_NAMESPACE
    }

    /// Recovers the `(PeerId, ProcessId)` pair the address was built from.
    pub fn split(&self) -> (PeerId, ProcessId) {
        (self.peer.clone(), self.pid.clone())
    }

    /// Protocol identifier requested when opening a stream.
    pub fn protocol_id(&self) -> String {
        self.to_string()
    }
}

/// Builds the protocol address for `pid` hosted on `peer`.
///
/// Pure: performs no I/O and cannot fail once both identifiers are parsed.
pub fn resolve(peer: &PeerId, pid: &ProcessId) -> ProtocolAddress {
    ProtocolAddress {
        peer: peer.clone(),
        pid: pid.clone(),
    }
}

/// Parses both identifiers and resolves them.
///
/// Fails with [`AddressError::InvalidPeerId`] or [`AddressError::InvalidPid`]
/// before any network action could take place.
pub fn resolve_str(peer: &str, pid: &str) -> Result<ProtocolAddress, AddressError> {
    let peer = PeerId::parse(peer)?;
    let pid = ProcessId::parse(pid)?;

    Ok(resolve(&peer, &pid))
}

impl fmt::Display for ProtocolAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/{PEER_SCOPE_TAG}/{}/{SERVICE_NAMESPACE}/{PROCESS_SCOPE_TAG}/{}",
            self.peer, self.pid
        )
    }
}

impl FromStr for ProtocolAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || AddressError::MalformedAddress(s.to_string());

        let rest = s.strip_prefix('/').ok_or_else(malformed)?;
        let segments: Vec<&str> = rest.split('/').collect();

        match segments.as_slice() {
            [peer_tag, peer, namespace, pid_tag, pid]
                if *peer_tag == PEER_SCOPE_TAG
                    && *namespace == SERVICE_NAMESPACE
                    && *pid_tag == PROCESS_SCOPE_TAG =>
            {
                resolve_str(peer, pid)
            }
            _ => Err(malformed()),
        }
    }
}
