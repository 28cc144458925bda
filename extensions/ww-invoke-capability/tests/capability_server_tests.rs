use futures::future::join_all;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};
use tokio::task::JoinHandle;
use ww_invoke::call::MethodCall;
use ww_invoke_capability::{
    CallResults, CancellationToken, CapabilityClient, CapabilityError, CapabilityServer,
    ClientError, MethodTable, ResultStatus, ServerError, ServerState,
    config::ConnectionConfig,
    frame::{Frame, FrameCodec, FrameError, FrameKind},
};

async fn echo_table() -> MethodTable {
    let table = MethodTable::new();

    table
        .register("echo", |params: MethodCall| async move {
            let (_, stack, payload) = params.into_parts();
            Ok(CallResults::new().with_stack(stack).with_payload(payload))
        })
        .await
        .unwrap();

    // Sleeps for the number of milliseconds on top of the stack, then
    // returns it, so replies complete out of order.
    table
        .register("delay", |params: MethodCall| async move {
            let millis = params.stack().peek().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(millis)).await;
            CallResults::new()
                .with_words(vec![millis])
                .map_err(|e| CapabilityError::Internal(e.to_string()))
        })
        .await
        .unwrap();

    table
        .register("fail", |_params: MethodCall| async move {
            Err::<CallResults, _>(CapabilityError::failed("boom"))
        })
        .await
        .unwrap();

    table
}

struct Harness {
    server: Arc<CapabilityServer<DuplexStream>>,
    client: CapabilityClient,
    cancel: CancellationToken,
    serving: JoinHandle<Result<(), ServerError>>,
}

async fn start(table: MethodTable) -> Harness {
    start_with_config(table, ConnectionConfig::default()).await
}

async fn start_with_config(table: MethodTable, config: ConnectionConfig) -> Harness {
    let (server_end, client_end) = tokio::io::duplex(64 * 1024);

    let server = Arc::new(CapabilityServer::with_config(Arc::new(table), config.clone()));
    server.accept(server_end).unwrap();

    let cancel = CancellationToken::new();
    let serving = tokio::spawn({
        let server = server.clone();
        let cancel = cancel.clone();
        async move { server.serve(cancel).await }
    });

    Harness {
        server,
        client: CapabilityClient::connect_with_config(client_end, config),
        cancel,
        serving,
    }
}

#[tokio::test]
async fn test_bootstrap_echo() {
    let harness = start(echo_table().await).await;
    let bootstrap = harness.client.bootstrap();
    assert!(bootstrap.is_bootstrap());

    let call = MethodCall::with_words("echo", vec![7, 9], b"hi".to_vec()).unwrap();
    let reply = bootstrap.call(&call).await.unwrap();

    assert_eq!(reply.method(), "echo");
    assert_eq!(reply.stack().as_slice(), &[7, 9]);
    assert_eq!(reply.payload(), b"hi");
    assert_eq!(harness.server.state(), ServerState::Bound);
}

#[tokio::test]
async fn test_concurrent_calls_do_not_cross_talk() {
    let harness = start(echo_table().await).await;
    let bootstrap = harness.client.bootstrap();

    // Larger delays first so returns arrive in reverse order.
    let calls = (0..16u64).rev().map(|millis| {
        let bootstrap = bootstrap.clone();
        async move {
            let call = MethodCall::with_words("delay", vec![millis * 5], Vec::new()).unwrap();
            (millis * 5, bootstrap.call(&call).await.unwrap())
        }
    });

    for (expected, reply) in join_all(calls).await {
        assert_eq!(reply.stack().as_slice(), &[expected]);
    }
}

#[tokio::test]
async fn test_failed_operation_keeps_connection_open() {
    let harness = start(echo_table().await).await;
    let bootstrap = harness.client.bootstrap();

    let failed = bootstrap
        .call(&MethodCall::with_words("fail", vec![], vec![]).unwrap())
        .await
        .unwrap_err();
    match failed {
        ClientError::Remote { status, payload } => {
            assert_eq!(status, ResultStatus::Fail);
            assert_eq!(payload, b"boom");
        }
        other => panic!("expected remote failure, got {other:?}"),
    }

    let missing = bootstrap
        .call(&MethodCall::with_words("nope", vec![], vec![]).unwrap())
        .await
        .unwrap_err();
    assert_eq!(missing.remote_status(), Some(ResultStatus::MethodNotFound));

    let reply = bootstrap
        .call(&MethodCall::with_words("echo", vec![1], vec![]).unwrap())
        .await
        .unwrap();
    assert_eq!(reply.stack().as_slice(), &[1]);
    assert!(harness.client.is_connected());
}

#[tokio::test]
async fn test_nested_capability_lifecycle() {
    let table = echo_table().await;
    table
        .register("counter", |_params: MethodCall| async move {
            let count = Arc::new(AtomicU64::new(0));
            let counter = MethodTable::new();
            let registered = counter
                .register("next", move |_params: MethodCall| {
                    let count = count.clone();
                    async move {
                        let value = count.fetch_add(1, Ordering::SeqCst) + 1;
                        CallResults::new()
                            .with_words(vec![value])
                            .map_err(|e| CapabilityError::Internal(e.to_string()))
                    }
                })
                .await;
            match registered {
                Ok(()) => Ok(CallResults::new().with_capability(Arc::new(counter))),
                Err(e) => Err(CapabilityError::Internal(e.to_string())),
            }
        })
        .await
        .unwrap();

    let harness = start(table).await;
    let bootstrap = harness.client.bootstrap();

    let mut reply = bootstrap
        .call(&MethodCall::with_words("counter", vec![], vec![]).unwrap())
        .await
        .unwrap();
    let counter = reply.take_capability().expect("counter capability");
    assert!(!counter.is_bootstrap());

    let next = MethodCall::with_words("next", vec![], vec![]).unwrap();
    assert_eq!(counter.call(&next).await.unwrap().stack().as_slice(), &[1]);
    assert_eq!(counter.call(&next).await.unwrap().stack().as_slice(), &[2]);

    // Once released, the export id no longer resolves.
    let stale = counter.clone();
    counter.release().unwrap();
    let err = stale.call(&next).await.unwrap_err();
    assert_eq!(err.remote_status(), Some(ResultStatus::CapabilityNotFound));

    // Releasing the bootstrap reference does not affect the connection.
    bootstrap.clone().release().unwrap();
    let echo = MethodCall::with_words("echo", vec![3], vec![]).unwrap();
    assert!(bootstrap.call(&echo).await.is_ok());
}

#[tokio::test]
async fn test_cancel_closes_server() {
    let harness = start(echo_table().await).await;
    let bootstrap = harness.client.bootstrap();
    let echo = MethodCall::with_words("echo", vec![], b"x".to_vec()).unwrap();
    bootstrap.call(&echo).await.unwrap();

    harness.cancel.cancel();
    harness.serving.await.unwrap().unwrap();
    assert_eq!(harness.server.state(), ServerState::Closed);

    let err = bootstrap.call(&echo).await.unwrap_err();
    assert!(matches!(err, ClientError::Disconnected));
}

#[tokio::test]
async fn test_peer_close_closes_server() {
    let harness = start(echo_table().await).await;
    let echo = MethodCall::with_words("echo", vec![], vec![]).unwrap();
    harness.client.bootstrap().call(&echo).await.unwrap();

    drop(harness.client);

    let outcome = tokio::time::timeout(Duration::from_secs(5), harness.serving)
        .await
        .expect("server should notice the peer closing");
    outcome.unwrap().unwrap();
    assert_eq!(harness.server.state(), ServerState::Closed);
}

#[tokio::test]
async fn test_close_is_idempotent_and_terminal() {
    let (server_end, _client_end) = tokio::io::duplex(1024);
    let server = CapabilityServer::new(Arc::new(echo_table().await));

    let seen = Arc::new(Mutex::new(Vec::new()));
    server.set_state_change_handler({
        let seen = seen.clone();
        move |state| seen.lock().unwrap().push(state)
    });

    server.accept(server_end).unwrap();
    server.close();
    server.close();

    assert_eq!(server.state(), ServerState::Closed);
    assert_eq!(
        *seen.lock().unwrap(),
        vec![ServerState::Accepting, ServerState::Closed]
    );

    let err = server.serve(CancellationToken::new()).await.unwrap_err();
    assert!(matches!(
        err,
        ServerError::InvalidTransition {
            from: ServerState::Closed,
            to: ServerState::Bound
        }
    ));
}

#[tokio::test]
async fn test_serve_requires_accepted_channel() {
    let server: CapabilityServer<DuplexStream> =
        CapabilityServer::new(Arc::new(MethodTable::new()));

    let err = server.serve(CancellationToken::new()).await.unwrap_err();
    assert!(matches!(
        err,
        ServerError::InvalidTransition {
            from: ServerState::Idle,
            to: ServerState::Bound
        }
    ));
    assert_eq!(server.state(), ServerState::Idle);
}

#[tokio::test]
async fn test_state_changes_are_reported_in_order() {
    let (server_end, client_end) = tokio::io::duplex(64 * 1024);
    let server = Arc::new(CapabilityServer::new(Arc::new(echo_table().await)));

    let seen = Arc::new(Mutex::new(Vec::new()));
    server.set_state_change_handler({
        let seen = seen.clone();
        move |state| seen.lock().unwrap().push(state)
    });

    server.accept(server_end).unwrap();
    let serving = tokio::spawn({
        let server = server.clone();
        async move { server.serve(CancellationToken::new()).await }
    });

    let client = CapabilityClient::connect(client_end);
    let echo = MethodCall::with_words("echo", vec![], vec![]).unwrap();
    client.bootstrap().call(&echo).await.unwrap();

    server.close();
    serving.await.unwrap().unwrap();
    server.close();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            ServerState::Accepting,
            ServerState::Bound,
            ServerState::Closed
        ]
    );
}

#[tokio::test]
async fn test_malformed_call_is_answered_not_fatal() {
    let (server_end, mut raw) = tokio::io::duplex(64 * 1024);
    let server = Arc::new(CapabilityServer::new(Arc::new(echo_table().await)));
    server.accept(server_end).unwrap();
    let cancel = CancellationToken::new();
    let serving = tokio::spawn({
        let server = server.clone();
        let cancel = cancel.clone();
        async move { server.serve(cancel).await }
    });

    // Declares a four byte method name but carries only one byte.
    let garbage = vec![4, 0, 0, 0, b'e'];
    FrameCodec::write_frame(&mut raw, &Frame::call(11, 0, garbage))
        .await
        .unwrap();

    let reply = FrameCodec::read_frame(&mut raw, 1024).await.unwrap().unwrap();
    assert_eq!(reply.kind, FrameKind::Return);
    assert_eq!(reply.request_id, 11);
    assert_eq!(reply.status, u8::from(ResultStatus::MalformedCall));

    cancel.cancel();
    serving.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_oversized_frame_is_fatal() {
    let (server_end, mut raw) = tokio::io::duplex(64 * 1024);
    let config = ConnectionConfig {
        max_frame_len: 16,
        ..ConnectionConfig::default()
    };
    let server = CapabilityServer::with_config(Arc::new(echo_table().await), config);
    server.accept(server_end).unwrap();

    FrameCodec::write_frame(&mut raw, &Frame::call(1, 0, vec![0u8; 32]))
        .await
        .unwrap();

    let err = server.serve(CancellationToken::new()).await.unwrap_err();
    assert!(matches!(
        err,
        ServerError::Frame(FrameError::FrameTooLarge { len: 32, limit: 16 })
    ));
    assert_eq!(server.state(), ServerState::Closed);
}

#[tokio::test]
async fn test_oversized_result_fails_only_its_call() {
    let table = echo_table().await;
    table
        .register("big", |_params: MethodCall| async move {
            Ok(CallResults::new().with_payload(vec![0xAB; 2048]))
        })
        .await
        .unwrap();

    let config = ConnectionConfig {
        max_frame_len: 1024,
        ..ConnectionConfig::default()
    };
    let harness = start_with_config(table, config).await;
    let bootstrap = harness.client.bootstrap();

    let slow = MethodCall::with_words("delay", vec![100], vec![]).unwrap();
    let big = MethodCall::with_words("big", vec![], vec![]).unwrap();
    let (slow, big) = tokio::join!(bootstrap.call(&slow), bootstrap.call(&big));

    assert_eq!(slow.unwrap().stack().as_slice(), &[100]);
    match big.unwrap_err() {
        ClientError::Remote { status, payload } => {
            assert_eq!(status, ResultStatus::SystemError);
            assert!(payload.len() <= 1024);
        }
        other => panic!("expected remote system error, got {other:?}"),
    }

    assert!(harness.client.is_connected());
    assert_eq!(harness.server.state(), ServerState::Bound);

    let echo = MethodCall::with_words("echo", vec![5], vec![]).unwrap();
    let reply = bootstrap.call(&echo).await.unwrap();
    assert_eq!(reply.stack().as_slice(), &[5]);
}

#[tokio::test]
async fn test_oversized_request_is_rejected_before_sending() {
    let config = ConnectionConfig {
        max_frame_len: 64,
        ..ConnectionConfig::default()
    };
    let harness = start_with_config(echo_table().await, config).await;
    let bootstrap = harness.client.bootstrap();

    let call = MethodCall::with_words("echo", vec![], vec![0u8; 128]).unwrap();
    match bootstrap.call(&call).await.unwrap_err() {
        ClientError::RequestTooLarge { len, limit } => {
            assert!(len > 128);
            assert_eq!(limit, 64);
        }
        other => panic!("expected request too large, got {other:?}"),
    }

    let echo = MethodCall::with_words("echo", vec![2], vec![]).unwrap();
    assert_eq!(bootstrap.call(&echo).await.unwrap().stack().as_slice(), &[2]);
    assert_eq!(harness.server.state(), ServerState::Bound);
}

#[tokio::test]
async fn test_busy_server_stops_reading_calls() {
    let started = Arc::new(AtomicUsize::new(0));
    let table = MethodTable::new();
    table
        .register("hang", {
            let started = started.clone();
            move |_params: MethodCall| {
                let started = started.clone();
                async move {
                    started.fetch_add(1, Ordering::SeqCst);
                    futures::future::pending::<()>().await;
                    Ok(CallResults::new())
                }
            }
        })
        .await
        .unwrap();

    let (server_end, mut raw) = tokio::io::duplex(256);
    let config = ConnectionConfig {
        max_in_flight_calls: 2,
        ..ConnectionConfig::default()
    };
    let server = Arc::new(CapabilityServer::with_config(Arc::new(table), config));
    server.accept(server_end).unwrap();
    let cancel = CancellationToken::new();
    let serving = tokio::spawn({
        let server = server.clone();
        let cancel = cancel.clone();
        async move { server.serve(cancel).await }
    });

    let sent = Arc::new(AtomicUsize::new(0));
    let writer = tokio::spawn({
        let sent = sent.clone();
        async move {
            let call = ww_invoke::call::CallCodec::encode(
                &MethodCall::with_words("hang", vec![], vec![]).unwrap(),
            );
            for request_id in 0..200u32 {
                let frame = Frame::call(request_id, 0, call.clone());
                if FrameCodec::write_frame(&mut raw, &frame).await.is_err() {
                    break;
                }
                sent.fetch_add(1, Ordering::SeqCst);
            }
        }
    });

    tokio::time::sleep(Duration::from_millis(200)).await;

    // Only the permitted calls run; the rest back up into the channel.
    assert_eq!(started.load(Ordering::SeqCst), 2);
    assert!(!writer.is_finished());
    assert!(sent.load(Ordering::SeqCst) < 200);

    cancel.cancel();
    serving.await.unwrap().unwrap();
    writer.abort();
}

/// Reads from the wrapped stream; every write fails as if the peer had
/// stopped reading.
struct BrokenWrites {
    inner: DuplexStream,
}

impl AsyncRead for BrokenWrites {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for BrokenWrites {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Ready(Err(io::Error::new(
            io::ErrorKind::BrokenPipe,
            "peer stopped reading",
        )))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[tokio::test]
async fn test_write_failure_closes_server() {
    let (server_end, mut raw) = tokio::io::duplex(64 * 1024);
    let server = CapabilityServer::new(Arc::new(echo_table().await));
    server.accept(BrokenWrites { inner: server_end }).unwrap();

    let call = ww_invoke::call::CallCodec::encode(
        &MethodCall::with_words("echo", vec![1], vec![]).unwrap(),
    );
    FrameCodec::write_frame(&mut raw, &Frame::call(1, 0, call))
        .await
        .unwrap();

    // `raw` stays open, so only the failed write can end serving.
    let serving = server.serve(CancellationToken::new());
    let outcome = tokio::time::timeout(Duration::from_secs(5), serving)
        .await
        .expect("server should stop when its writes fail");
    assert!(matches!(outcome, Err(ServerError::Frame(FrameError::Io(_)))));
    assert_eq!(server.state(), ServerState::Closed);
    drop(raw);
}
