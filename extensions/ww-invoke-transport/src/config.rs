use crate::constants::{
    DEFAULT_MAX_RESPONSE_LEN, DEFAULT_OPEN_TIMEOUT_SECS, DEFAULT_READ_CHUNK_SIZE,
};
use std::time::Duration;

/// Tunables for a round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Upper bound on opening the stream. Cancellation can still end it sooner.
    pub open_timeout: Duration,

    /// Responses longer than this fail with `TransportError::ResponseTooLarge`.
    pub max_response_len: usize,

    /// Bytes requested per read of the response.
    pub read_chunk_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            open_timeout: Duration::from_secs(DEFAULT_OPEN_TIMEOUT_SECS),
            max_response_len: DEFAULT_MAX_RESPONSE_LEN,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
        }
    }
}

impl TransportConfig {
    pub fn with_open_timeout(mut self, open_timeout: Duration) -> Self {
        self.open_timeout = open_timeout;
        self
    }

    pub fn with_max_response_len(mut self, max_response_len: usize) -> Self {
        self.max_response_len = max_response_len;
        self
    }

    pub fn with_read_chunk_size(mut self, read_chunk_size: usize) -> Self {
        self.read_chunk_size = read_chunk_size.max(1);
        self
    }
}
