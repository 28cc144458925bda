use crate::constants::{BOOTSTRAP_CAPABILITY_ID, NO_CAPABILITY};
use crate::frame::FrameKind;
use crate::ResultStatus;

/// One unit of the connection protocol.
///
/// Frames are written back to back on the duplex channel. Calls and returns
/// are matched by `request_id`, so any number of calls may be outstanding
/// on one connection and returns may arrive in any order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameKind,

    /// Chosen by the caller, echoed by the matching return.
    pub request_id: u32,

    /// Call: the export id being invoked.
    /// Return: the export id of a capability handed back, or `NO_CAPABILITY`.
    /// Release: the export id being dropped.
    pub capability_id: u32,

    /// Raw `ResultStatus` byte. Zero on calls and releases.
    pub status: u8,

    /// Call and return: an encoded `MethodCall`. Failed return: error data.
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn call(request_id: u32, capability_id: u32, payload: Vec<u8>) -> Self {
        Self {
            kind: FrameKind::Call,
            request_id,
            capability_id,
            status: ResultStatus::Success.into(),
            payload,
        }
    }

    pub fn ret(
        request_id: u32,
        status: ResultStatus,
        exported: Option<u32>,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            kind: FrameKind::Return,
            request_id,
            capability_id: exported.unwrap_or(NO_CAPABILITY),
            status: status.into(),
            payload,
        }
    }

    pub fn release(capability_id: u32) -> Self {
        Self {
            kind: FrameKind::Release,
            request_id: 0,
            capability_id,
            status: ResultStatus::Success.into(),
            payload: Vec::new(),
        }
    }

    pub fn targets_bootstrap(&self) -> bool {
        self.capability_id == BOOTSTRAP_CAPABILITY_ID
    }
}
