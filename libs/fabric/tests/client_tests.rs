use courier_fabric::{
    codec::{BincodeCodec, BincodeCodecFactory, Codec},
    transport::{FramedTransport, TcpTransport, Transport, UnixSocketListener},
    ApplicationException, ApplicationExceptionKind, Client, Error, MessageHeader, MessageKind,
    ServerSocket,
};
use std::time::Duration;
use tokio::sync::mpsc;

/// What the test server saw for each request
#[derive(Debug, Clone, PartialEq)]
struct Seen {
    name: String,
    kind: MessageKind,
    seq_id: i32,
}

/// Serve `requests` messages of `(i64, i64)` arguments
///
/// `add` replies with the sum, `div` raises an exception on a zero divisor,
/// `skew` replies with a shifted sequence id, and anything sent one-way gets
/// no reply.
async fn serve<T: Transport>(mut transport: T, requests: usize, seen: mpsc::UnboundedSender<Seen>) {
    for _ in 0..requests {
        let mut iprot = BincodeCodec::new(&mut transport);
        let header = iprot.read_message_begin().await.unwrap();
        let (a, b): (i64, i64) = iprot.read_struct().await.unwrap();
        iprot.read_message_end().await.unwrap();

        seen.send(Seen {
            name: header.name.clone(),
            kind: header.kind,
            seq_id: header.seq_id,
        })
        .unwrap();

        let mut oprot = BincodeCodec::new(&mut transport);
        match header.name.as_str() {
            "add" => {
                oprot
                    .write_message_begin(&MessageHeader::new("add", MessageKind::Reply, header.seq_id))
                    .await
                    .unwrap();
                oprot.write_struct(&(a + b)).await.unwrap();
            }
            "div" if b == 0 => {
                oprot
                    .write_message_begin(&MessageHeader::new(
                        "div",
                        MessageKind::Exception,
                        header.seq_id,
                    ))
                    .await
                    .unwrap();
                oprot
                    .write_struct(&ApplicationException::new(
                        ApplicationExceptionKind::InternalError,
                        "division by zero",
                    ))
                    .await
                    .unwrap();
            }
            "div" => {
                oprot
                    .write_message_begin(&MessageHeader::new("div", MessageKind::Reply, header.seq_id))
                    .await
                    .unwrap();
                oprot.write_struct(&(a / b)).await.unwrap();
            }
            "skew" => {
                oprot
                    .write_message_begin(&MessageHeader::new(
                        "skew",
                        MessageKind::Reply,
                        header.seq_id + 1,
                    ))
                    .await
                    .unwrap();
                oprot.write_struct(&0i64).await.unwrap();
            }
            _ => continue,
        }
        oprot.write_message_end().await.unwrap();
        oprot.flush().await.unwrap();
    }
}

async fn spawn_tcp_server(requests: usize) -> (std::net::SocketAddr, mpsc::UnboundedReceiver<Seen>) {
    let socket = ServerSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let transport = socket.accept().await.unwrap();
        serve(transport, requests, tx).await;
    });

    (addr, rx)
}

#[tokio::test]
async fn tcp_call_returns_reply() {
    let (addr, mut seen) = spawn_tcp_server(2).await;
    let mut client = Client::tcp(addr, BincodeCodecFactory).await.unwrap();

    let sum: i64 = client.call("add", &(2i64, 3i64)).await.unwrap();
    assert_eq!(sum, 5);
    let quotient: i64 = client.call("div", &(9i64, 3i64)).await.unwrap();
    assert_eq!(quotient, 3);

    let first = seen.recv().await.unwrap();
    let second = seen.recv().await.unwrap();
    assert_eq!((first.kind, first.seq_id), (MessageKind::Call, 0));
    assert_eq!((second.kind, second.seq_id), (MessageKind::Call, 1));
}

#[tokio::test]
async fn remote_exception_surfaces_as_error() {
    let (addr, _seen) = spawn_tcp_server(2).await;
    let mut client = Client::tcp(addr, BincodeCodecFactory).await.unwrap();

    match client.call::<_, i64>("div", &(1i64, 0i64)).await {
        Err(Error::Application(exception)) => {
            assert_eq!(exception.kind(), ApplicationExceptionKind::InternalError);
            assert_eq!(exception.message(), "division by zero");
        }
        other => panic!("Expected application exception, got {:?}", other),
    }

    // The connection is still usable afterwards
    let sum: i64 = client.call("add", &(1i64, 1i64)).await.unwrap();
    assert_eq!(sum, 2);
}

#[tokio::test]
async fn out_of_order_reply_is_bad_sequence_id() {
    let (addr, _seen) = spawn_tcp_server(1).await;
    let mut client = Client::tcp(addr, BincodeCodecFactory).await.unwrap();

    let err = client.call::<_, i64>("skew", &(0i64, 0i64)).await.unwrap_err();

    assert_eq!(
        err.application_kind(),
        Some(ApplicationExceptionKind::BadSequenceId)
    );
}

#[tokio::test]
async fn oneway_call_consumes_a_sequence_id() {
    let (addr, mut seen) = spawn_tcp_server(2).await;
    let mut client = Client::tcp(addr, BincodeCodecFactory).await.unwrap();

    client.call_oneway("log", &(4i64, 2i64)).await.unwrap();
    let sum: i64 = client.call("add", &(4i64, 2i64)).await.unwrap();

    assert_eq!(sum, 6);
    assert_eq!(
        seen.recv().await.unwrap(),
        Seen {
            name: "log".to_string(),
            kind: MessageKind::Call,
            seq_id: 0,
        }
    );
    assert_eq!(seen.recv().await.unwrap().seq_id, 1);
    assert_eq!(client.seq_id(), 2);
}

#[tokio::test]
async fn framed_transport_carries_calls() {
    let socket = ServerSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.addr().unwrap();
    let (tx, _rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let transport = FramedTransport::new(socket.accept().await.unwrap());
        serve(transport, 1, tx).await;
    });

    let transport = FramedTransport::new(TcpTransport::connect(addr).await.unwrap());
    let mut client = Client::new(transport, BincodeCodecFactory);

    let sum: i64 = client.call("add", &(20i64, 22i64)).await.unwrap();
    assert_eq!(sum, 42);
}

#[tokio::test]
async fn unix_call_returns_reply() {
    let socket_path = "/tmp/courier_test_client_unix.sock";
    let socket =
        ServerSocket::from_listener(UnixSocketListener::bind(socket_path).unwrap(), Duration::ZERO);
    let (tx, _rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let transport = socket.accept().await.unwrap();
        serve(transport, 1, tx).await;
    });

    let mut client = Client::unix(socket_path, BincodeCodecFactory).await.unwrap();
    let sum: i64 = client.call("add", &(-1i64, 1i64)).await.unwrap();
    assert_eq!(sum, 0);

    client.close().await.unwrap();
    assert!(!client.transport().is_open());
}

#[tokio::test]
async fn peer_hangup_fails_the_call() {
    let socket = ServerSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.addr().unwrap();

    // Server reads the request and closes without replying
    tokio::spawn(async move {
        let mut transport = socket.accept().await.unwrap();
        let mut iprot = BincodeCodec::new(&mut transport);
        iprot.read_message_begin().await.unwrap();
        let _: (i64, i64) = iprot.read_struct().await.unwrap();
        transport.close().await.unwrap();
    });

    let mut client = Client::tcp(addr, BincodeCodecFactory).await.unwrap();
    let err = client.call::<_, i64>("add", &(1i64, 2i64)).await.unwrap_err();

    assert!(err.transport_kind().is_some());
    assert_eq!(err.application_kind(), None);
}
