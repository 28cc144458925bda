// Address related constants

/// Service namespace segment identifying this invocation protocol.
///
/// Changing this value is a breaking wire-format change: peers running an
/// older namespace will reject streams opened against the new one.
pub const SERVICE_NAMESPACE: &str = "ww-invoke";

/// Reserved tag that opens the peer-scope segment of a protocol address.
pub const PEER_SCOPE_TAG: &str = "peer";

/// Reserved tag that opens the process-scope segment of a protocol address.
pub const PROCESS_SCOPE_TAG: &str = "pid";

/// Upper bound on the textual length of a peer or process identifier.
pub const MAX_IDENTIFIER_LEN: usize = 128;

// Method call related constants

/// Size in bytes of the method name length prefix (u32).
pub const CALL_METHOD_LENGTH_SIZE: usize = 4;

/// Size in bytes of the stack count field (i32).
pub const CALL_STACK_COUNT_SIZE: usize = 4;

/// Size in bytes of a single stack word (u64).
pub const CALL_WORD_SIZE: usize = 8;

/// Maximum number of words a stack may hold.
///
/// The wire format carries the count as a signed 32-bit integer, so anything
/// beyond `i32::MAX` cannot be represented.
pub const MAX_STACK_LEN: usize = i32::MAX as usize;

/// Method name reserved for the reply a hosting process sends when a
/// one-shot call fails. Such a reply carries the failure status as its only
/// stack word and the error data as its payload.
pub const ERROR_REPLY_METHOD: &str = "ww-invoke/error";
