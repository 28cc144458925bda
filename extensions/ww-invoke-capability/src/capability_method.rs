use crate::{CallReply, CallResults, ClientError, RemoteCapability, method_id_hash};
use std::io;
use ww_invoke::call::MethodCall;

// Optional helper traits coupling a method name with the conversions between
// its typed arguments and the stack/payload carried on the wire. Untyped
// callers can keep building `MethodCall` values by hand.

/// A typed definition of one capability operation.
pub trait CapabilityMethod {
    /// The method name carried in every call.
    const METHOD_NAME: &'static str;

    /// Key used by method tables; derived from the name.
    const METHOD_ID: u64 = method_id_hash(Self::METHOD_NAME);

    /// The high-level input type expected by the request encoder.
    type Input;

    /// The high-level output type returned from the response decoder.
    type Output;

    /// Encodes typed arguments into a method call.
    fn encode_request(input: Self::Input) -> Result<MethodCall, io::Error>;

    /// Decodes a received method call into typed arguments.
    fn decode_request(params: MethodCall) -> Result<Self::Input, io::Error>;

    /// Encodes the typed result into call results.
    fn encode_response(output: Self::Output) -> Result<CallResults, io::Error>;

    /// Decodes a reply into the typed result.
    fn decode_response(reply: CallReply) -> Result<Self::Output, io::Error>;
}

/// Caller side of a [`CapabilityMethod`]: `Method::call(&remote, input)`.
#[async_trait::async_trait]
pub trait CapabilityCall: CapabilityMethod + Sized + Send + Sync {
    async fn call(target: &RemoteCapability, input: Self::Input)
    -> Result<Self::Output, ClientError>;
}

#[async_trait::async_trait]
impl<T> CapabilityCall for T
where
    T: CapabilityMethod + Send + Sync + 'static,
    T::Input: Send + 'static,
    T::Output: Send + 'static,
{
    async fn call(
        target: &RemoteCapability,
        input: Self::Input,
    ) -> Result<Self::Output, ClientError> {
        let params = T::encode_request(input)?;
        let reply = target.call(&params).await?;
        Ok(T::decode_response(reply)?)
    }
}

/// Wraps a codec error as an `InvalidInput` I/O error, the error type used
/// by method definitions.
pub fn invalid_input<E>(err: E) -> io::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    io::Error::new(io::ErrorKind::InvalidInput, err)
}
