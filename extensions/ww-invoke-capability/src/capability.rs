use crate::ResultStatus;
use std::fmt;
use std::sync::Arc;
use ww_invoke::call::{CallCodecError, MethodCall, WordStack};

/// A server-side object whose operations remote callers can invoke.
///
/// One instance may be invoked many times concurrently, from any number of
/// tasks. Implementations own whatever synchronization their state needs;
/// the connection adds none.
#[async_trait::async_trait]
pub trait Capability: Send + Sync + 'static {
    /// Runs the operation named by `params.method()`.
    ///
    /// An `Err` is returned to the caller as a failed result. It never tears
    /// down the connection.
    async fn call(&self, params: MethodCall) -> Result<CallResults, CapabilityError>;
}

/// Results populated by a capability operation.
///
/// Returned to the caller as a method call echoing the invoked method name,
/// carrying this stack and payload. A capability placed in the results is
/// exported on the connection and handed to the caller as a reference.
#[derive(Default)]
pub struct CallResults {
    stack: WordStack,
    payload: Vec<u8>,
    capability: Option<Arc<dyn Capability>>,
}

impl CallResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stack(mut self, stack: WordStack) -> Self {
        self.stack = stack;
        self
    }

    pub fn with_words(self, words: Vec<u64>) -> Result<Self, CallCodecError> {
        Ok(self.with_stack(WordStack::from_words(words)?))
    }

    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_capability(mut self, capability: Arc<dyn Capability>) -> Self {
        self.capability = Some(capability);
        self
    }

    pub fn push_word(&mut self, word: u64) -> Result<(), CallCodecError> {
        self.stack.push(word)
    }

    pub fn set_payload(&mut self, payload: Vec<u8>) {
        self.payload = payload;
    }

    pub fn stack(&self) -> &WordStack {
        &self.stack
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn capability(&self) -> Option<&Arc<dyn Capability>> {
        self.capability.as_ref()
    }

    pub fn into_parts(self) -> (WordStack, Vec<u8>, Option<Arc<dyn Capability>>) {
        (self.stack, self.payload, self.capability)
    }
}

impl fmt::Debug for CallResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallResults")
            .field("stack", &self.stack)
            .field("payload", &self.payload)
            .field("capability", &self.capability.is_some())
            .finish()
    }
}

/// Errors raised by a capability operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    /// The operation failed. The bytes are handed to the caller untouched.
    Failed(Vec<u8>),

    /// The capability has no operation with this name.
    MethodNotFound(String),

    /// The call's stack or payload did not match what the operation expects.
    InvalidArguments(String),

    /// The hosting side failed outside the operation's own logic.
    Internal(String),
}

impl CapabilityError {
    /// Builds an operation failure carrying a text message.
    pub fn failed(message: impl Into<String>) -> Self {
        CapabilityError::Failed(message.into().into_bytes())
    }

    /// The status reported to the caller for this error.
    pub fn status(&self) -> ResultStatus {
        match self {
            CapabilityError::Failed(_) => ResultStatus::Fail,
            CapabilityError::MethodNotFound(_) => ResultStatus::MethodNotFound,
            CapabilityError::InvalidArguments(_) => ResultStatus::InvalidArguments,
            CapabilityError::Internal(_) => ResultStatus::SystemError,
        }
    }

    /// The payload carried back to the caller alongside the status.
    pub fn into_payload(self) -> Vec<u8> {
        match self {
            CapabilityError::Failed(payload) => payload,
            CapabilityError::MethodNotFound(message)
            | CapabilityError::InvalidArguments(message)
            | CapabilityError::Internal(message) => message.into_bytes(),
        }
    }
}

impl fmt::Display for CapabilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapabilityError::Failed(payload) => {
                write!(f, "operation failed: {}", String::from_utf8_lossy(payload))
            }
            CapabilityError::MethodNotFound(method) => write!(f, "method not found: {method}"),
            CapabilityError::InvalidArguments(message) => {
                write!(f, "invalid arguments: {message}")
            }
            CapabilityError::Internal(message) => write!(f, "internal error: {message}"),
        }
    }
}

impl std::error::Error for CapabilityError {}
