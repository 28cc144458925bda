mod address_error;
mod peer_id;
mod process_id;
mod protocol_address;

pub use address_error::AddressError;
pub use peer_id::PeerId;
pub use process_id::ProcessId;
pub use protocol_address::{ProtocolAddress, resolve, resolve_str};

/// Checks that `text` is a usable identifier token.
///
/// Tokens are non-empty, bounded in length, and restricted to ASCII
/// alphanumerics plus `-`, `_` and `.`. Excluding `/` is what keeps
/// address splitting unambiguous.
pub(crate) fn is_valid_token(text: &str) -> bool {
    !text.is_empty()
        && text.len() <= crate::constants::MAX_IDENTIFIER_LEN
        && text
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}
