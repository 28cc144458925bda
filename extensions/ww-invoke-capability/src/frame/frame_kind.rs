use num_enum::{IntoPrimitive, TryFromPrimitive};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
pub enum FrameKind {
    /// Invoke a method on an exported capability.
    Call = 0,
    /// The result of a call, matched by request id.
    Return = 1,
    /// The caller no longer needs an exported capability.
    Release = 2,
}
