use std::fmt;

/// Errors raised while parsing identifiers or protocol addresses.
///
/// None of these involve I/O: they are raised before any stream is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// The peer identifier text could not be parsed.
    InvalidPeerId(String),

    /// The process identifier text could not be parsed.
    InvalidPid(String),

    /// A textual protocol address did not have the expected shape.
    MalformedAddress(String),
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressError::InvalidPeerId(text) => write!(f, "invalid peer id: {text:?}"),
            AddressError::InvalidPid(text) => write!(f, "invalid process id: {text:?}"),
            AddressError::MalformedAddress(text) => {
                write!(f, "malformed protocol address: {text:?}")
            }
        }
    }
}

impl std::error::Error for AddressError {}
