use crate::constants::{DEFAULT_MAX_FRAME_LEN, DEFAULT_MAX_IN_FLIGHT_CALLS};

/// Limits applied to one RPC connection, on either side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Frames with a larger payload are a fatal protocol error.
    pub max_frame_len: usize,

    /// Upper bound on concurrently executing calls (server side).
    pub max_in_flight_calls: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            max_in_flight_calls: DEFAULT_MAX_IN_FLIGHT_CALLS,
        }
    }
}
