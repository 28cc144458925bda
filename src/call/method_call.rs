use super::{CallCodecError, WordStack};
use crate::constants::ERROR_REPLY_METHOD;

/// A single method invocation: a method name, an argument stack, and an
/// opaque payload.
///
/// An absent payload and a zero-length payload are the same thing. Values are
/// validated on construction and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCall {
    method: String,
    stack: WordStack,
    payload: Vec<u8>,
}

impl MethodCall {
    /// Builds a method call, rejecting an empty method name.
    pub fn new(
        method: impl Into<String>,
        stack: WordStack,
        payload: Vec<u8>,
    ) -> Result<Self, CallCodecError> {
        let method = method.into();
        if method.is_empty() {
            return Err(CallCodecError::EmptyMethod);
        }
        if u32::try_from(method.len()).is_err() {
            return Err(CallCodecError::MethodTooLong { len: method.len() });
        }

        Ok(Self {
            method,
            stack,
            payload,
        })
    }

    /// Convenience constructor taking the stack as plain words.
    pub fn with_words(
        method: impl Into<String>,
        words: Vec<u64>,
        payload: Vec<u8>,
    ) -> Result<Self, CallCodecError> {
        Self::new(method, WordStack::from_words(words)?, payload)
    }

    /// Builds the reply sent in place of results when a call fails.
    pub fn error_reply(status: u8, payload: Vec<u8>) -> Self {
        let stack = WordStack::from_words(vec![u64::from(status)]).unwrap_or_default();
        Self {
            method: ERROR_REPLY_METHOD.to_string(),
            stack,
            payload,
        }
    }

    /// The failure status of an error reply.
    ///
    /// `None` unless this is a well-formed reply built by
    /// [`MethodCall::error_reply`].
    pub fn error_status(&self) -> Option<u8> {
        if self.method != ERROR_REPLY_METHOD {
            return None;
        }
        match self.stack.as_slice() {
            [status] => u8::try_from(*status).ok(),
            _ => None,
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn stack(&self) -> &WordStack {
        &self.stack
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_parts(self) -> (String, WordStack, Vec<u8>) {
        (self.method, self.stack, self.payload)
    }
}
