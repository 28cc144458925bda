use std::io;
use ww_invoke::call::MethodCall;
use ww_invoke_capability::{CallReply, CallResults, CapabilityMethod, invalid_input};

/// Hands the stack and payload straight back.
pub struct Echo;

impl CapabilityMethod for Echo {
    const METHOD_NAME: &'static str = "echo";

    type Input = (Vec<u64>, Vec<u8>);
    type Output = (Vec<u64>, Vec<u8>);

    fn encode_request((words, payload): Self::Input) -> Result<MethodCall, io::Error> {
        MethodCall::with_words(Self::METHOD_NAME, words, payload).map_err(invalid_input)
    }

    fn decode_request(params: MethodCall) -> Result<Self::Input, io::Error> {
        let (_, stack, payload) = params.into_parts();
        Ok((stack.into_vec(), payload))
    }

    fn encode_response((words, payload): Self::Output) -> Result<CallResults, io::Error> {
        Ok(CallResults::new()
            .with_words(words)
            .map_err(invalid_input)?
            .with_payload(payload))
    }

    fn decode_response(reply: CallReply) -> Result<Self::Output, io::Error> {
        let (_, stack, payload) = reply.into_results().into_parts();
        Ok((stack.into_vec(), payload))
    }
}
