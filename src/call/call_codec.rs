use super::{CallCodecError, MalformedMessage, MethodCall, WordStack};
use crate::constants::{
    CALL_METHOD_LENGTH_SIZE, CALL_STACK_COUNT_SIZE, CALL_WORD_SIZE, MAX_STACK_LEN,
};
use std::io::Read;

/// Encodes and decodes method calls.
///
/// The wire layout, all integers little-endian:
///
/// ```text
/// <len:u32> <method:bytes[len]> <count:i32> <word:u64>{count} <payload:bytes..EOF>
/// ```
///
/// The payload has no length prefix; it runs to the end of the message. An
/// empty payload is therefore indistinguishable from an omitted one.
pub struct CallCodec;

impl CallCodec {
    /// Encodes a method call into a self-contained message.
    ///
    /// Infallible: the name and stack were validated when the call was built.
    pub fn encode(call: &MethodCall) -> Vec<u8> {
        let method = call.method().as_bytes();
        let words = call.stack().as_slice();
        let payload = call.payload();

        let mut buf = Vec::with_capacity(
            CALL_METHOD_LENGTH_SIZE
                + method.len()
                + CALL_STACK_COUNT_SIZE
                + words.len() * CALL_WORD_SIZE
                + payload.len(),
        );

        buf.extend(&(method.len() as u32).to_le_bytes());
        buf.extend(method);
        buf.extend(&(words.len() as i32).to_le_bytes());
        for word in words {
            buf.extend(&word.to_le_bytes());
        }
        buf.extend(payload);

        buf
    }

    /// Validates the parts of a call and encodes them in one step.
    pub fn encode_parts(
        method: &str,
        words: &[u64],
        payload: &[u8],
    ) -> Result<Vec<u8>, CallCodecError> {
        let stack = WordStack::from_words(words.to_vec())?;
        let call = MethodCall::new(method, stack, payload.to_vec())?;
        Ok(Self::encode(&call))
    }

    /// Encodes a call whose payload is copied verbatim from `reader`.
    ///
    /// An empty reader (or `std::io::empty()` for an absent source) yields an
    /// empty payload.
    pub fn encode_from_reader<R: Read>(
        method: &str,
        stack: WordStack,
        mut reader: R,
    ) -> Result<Vec<u8>, CallCodecError> {
        let mut payload = Vec::new();
        reader.read_to_end(&mut payload)?;

        tracing::trace!(
            "encoding call {:?}: {} words, {} payload bytes",
            method,
            stack.len(),
            payload.len()
        );

        let call = MethodCall::new(method, stack, payload)?;
        Ok(Self::encode(&call))
    }

    /// Decodes a message produced by [`CallCodec::encode`].
    ///
    /// The method name and the declared stack must be fully present. Any bytes
    /// after the stack are taken as the payload, so a message cut short inside
    /// the payload still decodes, with a shorter payload.
    pub fn decode(buf: &[u8]) -> Result<MethodCall, CallCodecError> {
        let method_len = read_u32_le(buf, 0).ok_or(MalformedMessage::TruncatedMethodLength {
            available: buf.len(),
        })? as usize;

        let method_start = CALL_METHOD_LENGTH_SIZE;
        let method_end = method_start
            .checked_add(method_len)
            .filter(|end| *end <= buf.len())
            .ok_or(MalformedMessage::TruncatedMethod {
                declared: method_len,
                available: buf.len() - method_start,
            })?;

        let method = std::str::from_utf8(&buf[method_start..method_end])
            .map_err(MalformedMessage::InvalidMethodName)?;
        if method.is_empty() {
            return Err(MalformedMessage::EmptyMethodName.into());
        }

        let count = read_i32_le(buf, method_end).ok_or(MalformedMessage::TruncatedStackCount {
            available: buf.len() - method_end,
        })?;
        if count < 0 {
            return Err(MalformedMessage::NegativeStackCount(count).into());
        }
        let declared = count as usize;

        let words_start = method_end + CALL_STACK_COUNT_SIZE;
        let present = (buf.len() - words_start) / CALL_WORD_SIZE;
        if present < declared {
            return Err(MalformedMessage::TruncatedStack { declared, present }.into());
        }

        let words_end = words_start + declared * CALL_WORD_SIZE;
        let words = buf[words_start..words_end]
            .chunks_exact(CALL_WORD_SIZE)
            .map(|chunk| {
                let mut word = [0u8; CALL_WORD_SIZE];
                word.copy_from_slice(chunk);
                u64::from_le_bytes(word)
            })
            .collect();

        MethodCall::new(
            method,
            WordStack::from_words(words)?,
            buf[words_end..].to_vec(),
        )
    }
}

/// Rejects stack lengths the signed 32-bit count field cannot carry.
pub fn check_stack_len(len: usize) -> Result<(), CallCodecError> {
    if len > MAX_STACK_LEN {
        return Err(CallCodecError::StackTooLarge { len });
    }
    Ok(())
}

fn read_u32_le(buf: &[u8], offset: usize) -> Option<u32> {
    let bytes = buf.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_le_bytes(bytes.try_into().ok()?))
}

fn read_i32_le(buf: &[u8], offset: usize) -> Option<i32> {
    let bytes = buf.get(offset..offset.checked_add(4)?)?;
    Some(i32::from_le_bytes(bytes.try_into().ok()?))
}
