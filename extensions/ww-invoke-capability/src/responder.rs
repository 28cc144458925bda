use crate::{Capability, ResultStatus, server::ServerError};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use ww_invoke::call::{CallCodec, MethodCall};

/// Answers a single round trip on `stream`: reads the request until the
/// caller half-closes, invokes `capability`, writes the encoded results and
/// half-closes in turn.
///
/// This is the hosting side of the one-stream-per-call transport.
///
/// # Arguments
///
/// * `stream` - The stream opened by the caller for this one call.
/// * `capability` - The capability the call is dispatched to.
///
/// # Returns
///
/// `Ok(())` once the results have been written. If the request does not
/// decode or the capability fails, an error reply built by
/// [`MethodCall::error_reply`] is written in place of results, carrying the
/// [`ResultStatus`] and error data, and the failure is still returned so
/// the host can log it.
///
/// A capability returned in the results cannot travel over a one-shot
/// stream and is dropped.
pub async fn serve_round_trip<S, C>(mut stream: S, capability: &C) -> Result<(), ServerError>
where
    S: AsyncRead + AsyncWrite + Unpin,
    C: Capability + ?Sized,
{
    let mut request = Vec::new();
    stream.read_to_end(&mut request).await?;

    let (reply, outcome) = match answer(&request, capability).await {
        Ok(results) => (results, Ok(())),
        Err(err) => {
            let (status, payload) = error_parts(&err);
            tracing::debug!("Answering round trip with {:?}", status);
            (MethodCall::error_reply(status.into(), payload), Err(err))
        }
    };

    stream.write_all(&CallCodec::encode(&reply)).await?;
    stream.shutdown().await?;

    outcome
}

async fn answer<C>(request: &[u8], capability: &C) -> Result<MethodCall, ServerError>
where
    C: Capability + ?Sized,
{
    let params = CallCodec::decode(request)?;
    let method = params.method().to_string();
    tracing::debug!("Serving round trip for {:?} ({} bytes)", method, request.len());

    let (stack, payload, nested) = capability.call(params).await?.into_parts();
    if nested.is_some() {
        tracing::warn!(
            "Dropping capability returned by {:?}: round trips cannot export capabilities",
            method
        );
    }

    Ok(MethodCall::new(method, stack, payload)?)
}

fn error_parts(err: &ServerError) -> (ResultStatus, Vec<u8>) {
    match err {
        ServerError::Codec(e) => (ResultStatus::MalformedCall, e.to_string().into_bytes()),
        ServerError::Capability(e) => (e.status(), e.clone().into_payload()),
        other => (ResultStatus::SystemError, other.to_string().into_bytes()),
    }
}
