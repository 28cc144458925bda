use bitcode::{Decode, Encode};
use std::io;
use ww_invoke::call::{MethodCall, WordStack};
use ww_invoke_capability::{CallReply, CallResults, CapabilityMethod, invalid_input};

#[derive(Encode, Decode, PartialEq, Debug)]
struct GreetRequestParams {
    pub name: String,
}

#[derive(Encode, Decode, PartialEq, Debug)]
struct GreetResponseParams {
    pub message: String,
}

/// Builds a greeting. Arguments and result travel bitcode-encoded in the
/// payload; the stack is unused.
pub struct Greet;

impl CapabilityMethod for Greet {
    const METHOD_NAME: &'static str = "greet";

    type Input = String;
    type Output = String;

    fn encode_request(name: Self::Input) -> Result<MethodCall, io::Error> {
        let payload = bitcode::encode(&GreetRequestParams { name });
        MethodCall::new(Self::METHOD_NAME, WordStack::new(), payload).map_err(invalid_input)
    }

    fn decode_request(params: MethodCall) -> Result<Self::Input, io::Error> {
        let raw = bitcode::decode::<GreetRequestParams>(params.payload())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        Ok(raw.name)
    }

    fn encode_response(message: Self::Output) -> Result<CallResults, io::Error> {
        Ok(CallResults::new().with_payload(bitcode::encode(&GreetResponseParams { message })))
    }

    fn decode_response(reply: CallReply) -> Result<Self::Output, io::Error> {
        let raw = bitcode::decode::<GreetResponseParams>(reply.payload())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        Ok(raw.message)
    }
}
