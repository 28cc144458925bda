use tokio::io::AsyncWriteExt;
use ww_invoke_capability::{
    ResultStatus,
    constants::{FRAME_HEADER_SIZE, NO_CAPABILITY},
    frame::{Frame, FrameCodec, FrameError, FrameKind},
};

#[test]
fn test_frame_header_layout() {
    let frame = Frame::ret(0x0102_0304, ResultStatus::Fail, Some(7), b"err".to_vec());
    let bytes = FrameCodec::encode(&frame);

    assert_eq!(bytes.len(), FRAME_HEADER_SIZE + 3);
    assert_eq!(&bytes[0..4], &3u32.to_le_bytes());
    assert_eq!(bytes[4], u8::from(FrameKind::Return));
    assert_eq!(&bytes[5..9], &0x0102_0304u32.to_le_bytes());
    assert_eq!(&bytes[9..13], &7u32.to_le_bytes());
    assert_eq!(bytes[13], u8::from(ResultStatus::Fail));
    assert_eq!(&bytes[14..], b"err");

    let (decoded, used) = FrameCodec::decode(&bytes).unwrap();
    assert_eq!(decoded, frame);
    assert_eq!(used, bytes.len());
}

#[test]
fn test_return_without_capability_uses_sentinel() {
    let frame = Frame::ret(1, ResultStatus::Success, None, Vec::new());
    assert_eq!(frame.capability_id, NO_CAPABILITY);
}

#[test]
fn test_decode_consumes_one_frame_from_a_stream_of_bytes() {
    let mut bytes = FrameCodec::encode(&Frame::call(1, 0, b"first".to_vec()));
    bytes.extend(FrameCodec::encode(&Frame::release(5)));

    let (first, used) = FrameCodec::decode(&bytes).unwrap();
    assert_eq!(first.payload, b"first");
    assert!(first.targets_bootstrap());

    let (second, rest) = FrameCodec::decode(&bytes[used..]).unwrap();
    assert_eq!(second.kind, FrameKind::Release);
    assert_eq!(second.capability_id, 5);
    assert_eq!(used + rest, bytes.len());
}

#[test]
fn test_decode_rejects_partial_input() {
    let bytes = FrameCodec::encode(&Frame::call(1, 0, b"payload".to_vec()));

    assert!(matches!(
        FrameCodec::decode(&bytes[..FRAME_HEADER_SIZE - 1]),
        Err(FrameError::IncompleteHeader)
    ));
    assert!(matches!(
        FrameCodec::decode(&bytes[..FRAME_HEADER_SIZE + 2]),
        Err(FrameError::IncompleteFrame {
            declared: 7,
            available: 2
        })
    ));
}

#[test]
fn test_decode_rejects_unknown_kind() {
    let mut bytes = FrameCodec::encode(&Frame::release(1));
    bytes[4] = 9;
    assert!(matches!(
        FrameCodec::decode(&bytes),
        Err(FrameError::UnknownKind(9))
    ));
}

#[tokio::test]
async fn test_read_frame_distinguishes_clean_and_torn_eof() {
    let (mut near, mut far) = tokio::io::duplex(1024);
    let frame = Frame::call(3, 0, b"abc".to_vec());

    FrameCodec::write_frame(&mut near, &frame).await.unwrap();
    drop(near);

    assert_eq!(
        FrameCodec::read_frame(&mut far, 1024).await.unwrap(),
        Some(frame.clone())
    );
    assert_eq!(FrameCodec::read_frame(&mut far, 1024).await.unwrap(), None);

    // Closing in the middle of a frame is an error, not a clean end.
    let (mut near, mut far) = tokio::io::duplex(1024);
    let bytes = FrameCodec::encode(&frame);
    near.write_all(&bytes[..FRAME_HEADER_SIZE + 1]).await.unwrap();
    drop(near);

    assert!(matches!(
        FrameCodec::read_frame(&mut far, 1024).await,
        Err(FrameError::UnexpectedEof)
    ));
}

#[tokio::test]
async fn test_read_frame_enforces_limit() {
    let (mut near, mut far) = tokio::io::duplex(1024);
    FrameCodec::write_frame(&mut near, &Frame::call(1, 0, vec![0u8; 64]))
        .await
        .unwrap();

    assert!(matches!(
        FrameCodec::read_frame(&mut far, 32).await,
        Err(FrameError::FrameTooLarge { len: 64, limit: 32 })
    ));
}
