use crate::{
    constants::{
        FRAME_CAPABILITY_ID_OFFSET, FRAME_HEADER_SIZE, FRAME_KIND_OFFSET, FRAME_LENGTH_FIELD_SIZE,
        FRAME_REQUEST_ID_OFFSET, FRAME_STATUS_OFFSET,
    },
    frame::{Frame, FrameError, FrameKind},
};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Serializes frames onto a duplex channel and parses them back.
///
/// Layout, integers little-endian:
///
/// ```text
/// <len:u32> <kind:u8> <request_id:u32> <capability_id:u32> <status:u8> <payload:bytes[len]>
/// ```
pub struct FrameCodec;

/// Parsed fixed-size header; the payload length is kept separate.
struct FrameHeader {
    len: usize,
    kind: FrameKind,
    request_id: u32,
    capability_id: u32,
    status: u8,
}

impl FrameCodec {
    /// Serializes `frame` into a single contiguous buffer.
    ///
    /// # Arguments
    ///
    /// * `frame` - The frame to serialize. Its payload length becomes the
    ///   `len` field, so payloads must stay below `u32::MAX` bytes; the
    ///   connection limit keeps them far smaller in practice.
    ///
    /// # Returns
    ///
    /// The header followed by the payload, ready to be written in one call.
    /// No limit is checked here; callers compare the payload against their
    /// `max_frame_len` before building the frame.
    pub fn encode(frame: &Frame) -> Vec<u8> {
        let mut buf = Vec::with_capacity(FRAME_HEADER_SIZE + frame.payload.len());

        buf.extend(&(frame.payload.len() as u32).to_le_bytes());
        buf.push(frame.kind.into());
        buf.extend(&frame.request_id.to_le_bytes());
        buf.extend(&frame.capability_id.to_le_bytes());
        buf.push(frame.status);
        buf.extend(&frame.payload);

        buf
    }

    /// Decodes exactly one frame from the front of `buf`.
    ///
    /// Returns the frame and the number of bytes it occupied.
    pub fn decode(buf: &[u8]) -> Result<(Frame, usize), FrameError> {
        let header = Self::parse_header(buf)?;

        let end = FRAME_HEADER_SIZE + header.len;
        if buf.len() < end {
            return Err(FrameError::IncompleteFrame {
                declared: header.len,
                available: buf.len() - FRAME_HEADER_SIZE,
            });
        }

        let frame = header.into_frame(buf[FRAME_HEADER_SIZE..end].to_vec());
        Ok((frame, end))
    }

    /// Reads the next frame from `reader`.
    ///
    /// # Arguments
    ///
    /// * `reader` - The read half of the channel.
    /// * `max_frame_len` - Largest payload accepted. The header is checked
    ///   before any payload is buffered.
    ///
    /// # Returns
    ///
    /// `Ok(Some(frame))` for a complete frame, or `Ok(None)` when the channel
    /// closes cleanly on a frame boundary. Closing anywhere else is
    /// `FrameError::UnexpectedEof`; an oversized declaration is
    /// `FrameError::FrameTooLarge`.
    ///
    /// Not cancel-safe: dropping the future mid-frame loses the bytes read
    /// so far.
    pub async fn read_frame<R>(
        reader: &mut R,
        max_frame_len: usize,
    ) -> Result<Option<Frame>, FrameError>
    where
        R: AsyncRead + Unpin,
    {
        let mut header_buf = [0u8; FRAME_HEADER_SIZE];
        let mut filled = 0;
        while filled < FRAME_HEADER_SIZE {
            let n = reader.read(&mut header_buf[filled..]).await?;
            if n == 0 {
                return if filled == 0 {
                    Ok(None)
                } else {
                    Err(FrameError::UnexpectedEof)
                };
            }
            filled += n;
        }

        let header = Self::parse_header(&header_buf)?;
        if header.len > max_frame_len {
            return Err(FrameError::FrameTooLarge {
                len: header.len,
                limit: max_frame_len,
            });
        }

        let mut payload = vec![0u8; header.len];
        reader.read_exact(&mut payload).await?;

        Ok(Some(header.into_frame(payload)))
    }

    pub async fn write_frame<W>(writer: &mut W, frame: &Frame) -> Result<(), FrameError>
    where
        W: AsyncWrite + Unpin,
    {
        writer.write_all(&Self::encode(frame)).await?;
        writer.flush().await?;
        Ok(())
    }

    fn parse_header(buf: &[u8]) -> Result<FrameHeader, FrameError> {
        if buf.len() < FRAME_HEADER_SIZE {
            return Err(FrameError::IncompleteHeader);
        }

        let len = read_u32_le(buf, 0) as usize;
        let kind = FrameKind::try_from(buf[FRAME_KIND_OFFSET])
            .map_err(|_| FrameError::UnknownKind(buf[FRAME_KIND_OFFSET]))?;

        Ok(FrameHeader {
            len,
            kind,
            request_id: read_u32_le(buf, FRAME_REQUEST_ID_OFFSET),
            capability_id: read_u32_le(buf, FRAME_CAPABILITY_ID_OFFSET),
            status: buf[FRAME_STATUS_OFFSET],
        })
    }
}

impl FrameHeader {
    fn into_frame(self, payload: Vec<u8>) -> Frame {
        Frame {
            kind: self.kind,
            request_id: self.request_id,
            capability_id: self.capability_id,
            status: self.status,
            payload,
        }
    }
}

/// Callers guarantee `buf` holds a full header, so the slice is in bounds.
fn read_u32_le(buf: &[u8], offset: usize) -> u32 {
    let mut bytes = [0u8; FRAME_LENGTH_FIELD_SIZE];
    bytes.copy_from_slice(&buf[offset..offset + FRAME_LENGTH_FIELD_SIZE]);
    u32::from_le_bytes(bytes)
}
