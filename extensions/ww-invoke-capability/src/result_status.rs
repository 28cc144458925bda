use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Outcome of a call, carried in the status byte of every return frame.
#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, TryFromPrimitive, IntoPrimitive)]
pub enum ResultStatus {
    Success = 0,
    /// The operation failed; the payload holds its error data.
    Fail = 1,
    /// The hosting side failed outside of the operation itself.
    SystemError = 2,
    MethodNotFound = 3,
    /// The call targeted an export id the connection does not hold.
    CapabilityNotFound = 4,
    /// The call payload could not be decoded as a method call.
    MalformedCall = 5,
    /// The call decoded but its arguments were not what the method expects.
    InvalidArguments = 6,
}
