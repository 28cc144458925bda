use std::io;
use ww_invoke::call::MethodCall;
use ww_invoke_capability::{CallReply, CallResults, CapabilityMethod, invalid_input};

/// Adds the words on the stack, returning the total as the only word.
pub struct Sum;

impl CapabilityMethod for Sum {
    const METHOD_NAME: &'static str = "sum";

    type Input = Vec<u64>;
    type Output = u64;

    fn encode_request(words: Self::Input) -> Result<MethodCall, io::Error> {
        MethodCall::with_words(Self::METHOD_NAME, words, Vec::new()).map_err(invalid_input)
    }

    fn decode_request(params: MethodCall) -> Result<Self::Input, io::Error> {
        Ok(params.stack().as_slice().to_vec())
    }

    fn encode_response(total: Self::Output) -> Result<CallResults, io::Error> {
        CallResults::new().with_words(vec![total]).map_err(invalid_input)
    }

    fn decode_response(reply: CallReply) -> Result<Self::Output, io::Error> {
        match reply.stack().as_slice() {
            [total] => Ok(*total),
            other => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("expected one result word, got {}", other.len()),
            )),
        }
    }
}
