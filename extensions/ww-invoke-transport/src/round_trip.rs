use crate::{StreamOpener, TransportError, config::TransportConfig};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use ww_invoke::address::ProtocolAddress;

/// Performs one request/response exchange with the process at `address`.
///
/// The exchange runs in strict order on a freshly opened stream:
///
/// 1. open the stream, bounded by `config.open_timeout` and `cancel`
/// 2. write all of `body`, then half-close the write side
/// 3. read until the peer half-closes
///
/// # Arguments
///
/// * `opener` - Opens the stream; it is never reused for another call.
/// * `address` - The protocol address of the target process.
/// * `body` - The complete request. An empty body is sent as an immediate
///   half-close.
/// * `config` - Open timeout, read chunk size and response size limit.
/// * `cancel` - Aborts the exchange at whichever step it has reached.
///
/// # Returns
///
/// Everything the peer wrote before half-closing its side.
///
/// The stream is owned by this function and dropped exactly once on every
/// exit path. Cancellation while writing or reading is reported as a
/// `ShortWrite` or `ShortRead` with an `Interrupted` source so the progress
/// count survives.
pub async fn round_trip<O>(
    opener: &O,
    address: &ProtocolAddress,
    body: &[u8],
    config: &TransportConfig,
    cancel: &CancellationToken,
) -> Result<Vec<u8>, TransportError>
where
    O: StreamOpener + ?Sized,
{
    tracing::debug!("Opening stream to {}", address);

    let mut stream = tokio::select! {
        biased;

        _ = cancel.cancelled() => {
            tracing::debug!("Round trip to {} canceled before open", address);
            return Err(TransportError::Canceled);
        }

        opened = timeout(config.open_timeout, opener.open_stream(address)) => match opened {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                tracing::warn!("Failed to open stream to {}: {}", address, source);
                return Err(TransportError::StreamOpenFailed {
                    address: address.to_string(),
                    source,
                });
            }
            Err(_) => {
                tracing::warn!("Timed out opening stream to {}", address);
                return Err(TransportError::StreamOpenFailed {
                    address: address.to_string(),
                    source: io::Error::new(io::ErrorKind::TimedOut, "stream open timed out"),
                });
            }
        },
    };

    write_request(&mut stream, body, cancel).await?;
    let response = read_response(&mut stream, config, cancel).await?;

    tracing::debug!(
        "Round trip to {} complete: {} bytes out, {} bytes in",
        address,
        body.len(),
        response.len()
    );

    Ok(response)
}

async fn write_request<S>(
    stream: &mut S,
    body: &[u8],
    cancel: &CancellationToken,
) -> Result<(), TransportError>
where
    S: AsyncWrite + Unpin,
{
    let total = body.len();
    let mut written = 0;

    while written < total {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(interrupted()),
            result = stream.write(&body[written..]) => result,
        };

        match result {
            Ok(0) => {
                return Err(TransportError::ShortWrite {
                    written,
                    total,
                    source: io::ErrorKind::WriteZero.into(),
                });
            }
            Ok(n) => written += n,
            Err(source) => {
                tracing::warn!("Write failed after {} of {} bytes: {}", written, total, source);
                return Err(TransportError::ShortWrite {
                    written,
                    total,
                    source,
                });
            }
        }
    }

    // Half-close so the peer sees the end of the request.
    let finished = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(interrupted()),
        result = async {
            stream.flush().await?;
            stream.shutdown().await
        } => result,
    };

    finished.map_err(|source| TransportError::ShortWrite {
        written,
        total,
        source,
    })
}

async fn read_response<S>(
    stream: &mut S,
    config: &TransportConfig,
    cancel: &CancellationToken,
) -> Result<Vec<u8>, TransportError>
where
    S: AsyncRead + Unpin,
{
    let mut response = Vec::new();
    let mut chunk = vec![0u8; config.read_chunk_size.max(1)];

    loop {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(interrupted()),
            result = stream.read(&mut chunk) => result,
        };

        match result {
            Ok(0) => return Ok(response),
            Ok(n) => {
                if response.len() + n > config.max_response_len {
                    return Err(TransportError::ResponseTooLarge {
                        limit: config.max_response_len,
                    });
                }
                response.extend_from_slice(&chunk[..n]);
            }
            Err(source) => {
                tracing::warn!("Read failed after {} bytes: {}", response.len(), source);
                return Err(TransportError::ShortRead {
                    read: response.len(),
                    source,
                });
            }
        }
    }
}

fn interrupted() -> io::Error {
    io::Error::new(io::ErrorKind::Interrupted, "round trip canceled")
}
