// Connection frame layout

/// Size in bytes of the payload length field (u32) opening every frame.
pub const FRAME_LENGTH_FIELD_SIZE: usize = 4;

/// Byte offset of the 1-byte frame kind.
/// Values correspond to `FrameKind` variants.
pub const FRAME_KIND_OFFSET: usize = 4;

/// Byte offset of the 4-byte request id (u32) correlating a call with its return.
pub const FRAME_REQUEST_ID_OFFSET: usize = 5;

/// Byte offset of the 4-byte capability id (u32).
///
/// On a call this names the target capability; on a return it names a
/// capability exported by the call, or `NO_CAPABILITY`.
pub const FRAME_CAPABILITY_ID_OFFSET: usize = 9;

/// Byte offset of the 1-byte result status (u8), meaningful on returns.
pub const FRAME_STATUS_OFFSET: usize = 13;

/// Total size of the fixed-length header preceding the payload.
pub const FRAME_HEADER_SIZE: usize = 14;

// Capability table

/// Export id of the bootstrap capability on every connection.
pub const BOOTSTRAP_CAPABILITY_ID: u32 = 0;

/// Marker carried by a return frame that exports no capability.
pub const NO_CAPABILITY: u32 = u32::MAX;

// Defaults

/// Largest frame payload either side accepts.
pub const DEFAULT_MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Maximum number of calls a connection executes at the same time.
/// Further calls wait for a slot; they are not rejected.
pub const DEFAULT_MAX_IN_FLIGHT_CALLS: usize = 256;
