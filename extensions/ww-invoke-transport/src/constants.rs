/// How long opening a stream may take before it is abandoned.
pub const DEFAULT_OPEN_TIMEOUT_SECS: u64 = 10;

/// Largest response body a round trip will buffer.
pub const DEFAULT_MAX_RESPONSE_LEN: usize = 64 * 1024 * 1024;

/// Size of each read issued against the response stream.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 1024 * 64;

/// Capacity, in bytes, of each in-memory duplex pipe created by `MemoryOverlay`.
pub const DEFAULT_MEMORY_OVERLAY_BUFFER_SIZE: usize = 1024 * 64;
