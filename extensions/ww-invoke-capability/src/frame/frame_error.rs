use std::fmt;
use std::io;

#[derive(Debug)]
pub enum FrameError {
    /// The buffer is shorter than a frame header.
    IncompleteHeader,

    /// The buffer ends before the payload the header declares.
    IncompleteFrame { declared: usize, available: usize },

    /// The kind byte does not name a known frame kind.
    UnknownKind(u8),

    /// The declared payload exceeds the connection limit.
    FrameTooLarge { len: usize, limit: usize },

    /// The channel closed in the middle of a frame.
    UnexpectedEof,

    Io(io::Error),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::IncompleteHeader => write!(f, "incomplete frame header"),
            FrameError::IncompleteFrame {
                declared,
                available,
            } => write!(
                f,
                "incomplete frame: declared {declared} payload bytes, {available} available"
            ),
            FrameError::UnknownKind(kind) => write!(f, "unknown frame kind {kind}"),
            FrameError::FrameTooLarge { len, limit } => {
                write!(f, "frame payload of {len} bytes exceeds limit of {limit}")
            }
            FrameError::UnexpectedEof => write!(f, "channel closed mid-frame"),
            FrameError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for FrameError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FrameError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for FrameError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            FrameError::UnexpectedEof
        } else {
            FrameError::Io(e)
        }
    }
}
