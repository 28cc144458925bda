use std::{fmt, io, str::Utf8Error};

/// Describes why a received byte sequence is not a valid method call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedMessage {
    /// The buffer ended inside the method name length prefix.
    TruncatedMethodLength { available: usize },

    /// The buffer ended before the declared method name was complete.
    TruncatedMethod { declared: usize, available: usize },

    /// The method name bytes are not UTF-8.
    InvalidMethodName(Utf8Error),

    /// The method name decoded to an empty string.
    EmptyMethodName,

    /// The buffer ended inside the stack count field.
    TruncatedStackCount { available: usize },

    /// The stack count field held a negative value.
    NegativeStackCount(i32),

    /// Fewer whole words are present than the stack count declares.
    TruncatedStack { declared: usize, present: usize },
}

impl fmt::Display for MalformedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedMessage::TruncatedMethodLength { available } => {
                write!(f, "method length prefix truncated ({available} bytes)")
            }
            MalformedMessage::TruncatedMethod {
                declared,
                available,
            } => write!(
                f,
                "method name truncated: declared {declared} bytes, {available} available"
            ),
            MalformedMessage::InvalidMethodName(err) => {
                write!(f, "method name is not valid UTF-8: {err}")
            }
            MalformedMessage::EmptyMethodName => write!(f, "method name is empty"),
            MalformedMessage::TruncatedStackCount { available } => {
                write!(f, "stack count truncated ({available} bytes)")
            }
            MalformedMessage::NegativeStackCount(count) => {
                write!(f, "negative stack count {count}")
            }
            MalformedMessage::TruncatedStack { declared, present } => write!(
                f,
                "stack truncated: declared {declared} words, {present} present"
            ),
        }
    }
}

/// Errors raised while building, encoding or decoding a [`MethodCall`](super::MethodCall).
///
/// `EmptyMethod`, `MethodTooLong` and `StackTooLarge` are construction errors: they are
/// raised before any bytes are produced. `MalformedMessage` is only ever
/// raised by decoding.
#[derive(Debug)]
pub enum CallCodecError {
    /// A method call was built with an empty method name.
    EmptyMethod,

    /// The method name is longer than the u32 length prefix can express.
    MethodTooLong { len: usize },

    /// The stack holds more words than the signed 32-bit count can express.
    StackTooLarge { len: usize },

    /// The received bytes do not form a valid method call.
    MalformedMessage(MalformedMessage),

    /// Reading the payload from its byte source failed.
    Io(io::Error),
}

impl fmt::Display for CallCodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallCodecError::EmptyMethod => write!(f, "method name must not be empty"),
            CallCodecError::MethodTooLong { len } => {
                write!(f, "method name of {len} bytes is too long")
            }
            CallCodecError::StackTooLarge { len } => write!(
                f,
                "stack of {len} words exceeds the maximum of {}",
                i32::MAX
            ),
            CallCodecError::MalformedMessage(reason) => write!(f, "malformed message: {reason}"),
            CallCodecError::Io(err) => write!(f, "failed to read payload: {err}"),
        }
    }
}

impl std::error::Error for CallCodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CallCodecError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MalformedMessage> for CallCodecError {
    fn from(reason: MalformedMessage) -> Self {
        CallCodecError::MalformedMessage(reason)
    }
}

impl From<io::Error> for CallCodecError {
    fn from(err: io::Error) -> Self {
        CallCodecError::Io(err)
    }
}
