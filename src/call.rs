mod call_codec;
mod call_error;
mod method_call;
mod word_stack;

pub use call_codec::{CallCodec, check_stack_len};
pub use call_error::{CallCodecError, MalformedMessage};
pub use method_call::MethodCall;
pub use word_stack::WordStack;
