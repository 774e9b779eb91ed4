//! End-to-end tests driving the real accept loop and event loop over an
//! actual TCP socket, exercising the wire protocol the way a client would.

use tokio::net::TcpStream;
use tokio::sync::mpsc;

use scriptorium::core_state::CoreState;
use scriptorium::event_loop;
use scriptorium::net::listener;
use scriptorium::protocol::{encode, read_server_message, Hash, Message, MessageType, StatusCode};
use scriptorium::session::SessionId;

/// Spin up a whole server (accept loop + event loop) on an ephemeral port
/// with `accounts` already seeded in its credential store, and return the
/// address to connect to. The documents directory is a fresh temp dir that
/// lives for the duration of the test.
async fn start_server(accounts: &[(&str, &str)]) -> (std::net::SocketAddr, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let state = CoreState::new(dir.path().to_str().unwrap(), ":memory:").unwrap();
    for (name, password) in accounts {
        state.credentials.create(name, password.as_bytes()).unwrap();
    }

    let (accepted_tx, accepted_rx) = mpsc::unbounded_channel();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (control_tx, control_rx) = mpsc::unbounded_channel();
    // Leaked, not dropped: the event loop treats a closed control channel as
    // a shutdown signal, and this sender has no admin console driving it.
    std::mem::forget(control_tx);

    let addr = listener::spawn("127.0.0.1", 0, 4, inbound_tx, accepted_tx).await.unwrap();

    tokio::spawn(event_loop::run(state, accepted_rx, inbound_rx, control_rx));

    (addr, dir)
}

async fn send(stream: &mut TcpStream, message: &Message) {
    use tokio::io::AsyncWriteExt;
    stream.write_all(&encode(message)).await.unwrap();
}

async fn recv(stream: &mut TcpStream) -> Message {
    read_server_message(stream, SessionId::next()).await.unwrap()
}

fn login(name: &str, password: &str) -> Message {
    let hash: Hash = scriptorium::hash::hash_bytes(password.as_bytes());
    Message::UserLoginRequest {
        name: name.to_string(),
        hash,
    }
}

#[tokio::test]
async fn login_success_broadcasts_user_join_to_sender() {
    let (addr, _dir) = start_server(&[("alice", "hunter2")]).await;
    let mut client = TcpStream::connect(addr).await.unwrap();

    send(&mut client, &login("alice", "hunter2")).await;

    let reply = recv(&mut client).await;
    assert_eq!(reply, Message::UserLoginResponse { status: StatusCode::Ok });

    // Echo-authoritative: the sender is on `ALL_DOCUMENTS` for USER_JOIN, so
    // it gets its own broadcast too.
    let join = recv(&mut client).await;
    assert!(matches!(join, Message::UserJoin { id: 1, ref name } if name == "alice"));
}

#[tokio::test]
async fn login_with_wrong_password_is_rejected() {
    let (addr, _dir) = start_server(&[("alice", "hunter2")]).await;
    let mut client = TcpStream::connect(addr).await.unwrap();

    send(&mut client, &login("alice", "wrong")).await;

    let reply = recv(&mut client).await;
    assert_eq!(
        reply,
        Message::UserLoginResponse {
            status: StatusCode::UserWrongPassword
        }
    );
}

#[tokio::test]
async fn requests_before_login_are_silently_dropped() {
    let (addr, _dir) = start_server(&[]).await;
    let mut client = TcpStream::connect(addr).await.unwrap();

    send(&mut client, &Message::DocListRequest).await;
    // Nothing comes back for the dropped request; a login now still works,
    // proving the socket itself was never touched.
    send(&mut client, &login("ghost", "x")).await;

    let reply = recv(&mut client).await;
    assert_eq!(
        reply,
        Message::UserLoginResponse {
            status: StatusCode::UserNotExist
        }
    );
}

#[tokio::test]
async fn create_then_open_then_insert_echoes_to_peer_on_same_document() {
    let (addr, _dir) = start_server(&[("alice", "pw"), ("bob", "pw")]).await;

    let mut alice = TcpStream::connect(addr).await.unwrap();
    send(&mut alice, &login("alice", "pw")).await;
    recv(&mut alice).await; // login response
    recv(&mut alice).await; // USER_JOIN (self)

    let mut bob = TcpStream::connect(addr).await.unwrap();
    send(&mut bob, &login("bob", "pw")).await;
    recv(&mut bob).await; // login response
    recv(&mut bob).await; // USER_JOIN (self)
    let join = recv(&mut alice).await; // alice sees bob join too
    assert!(matches!(join, Message::UserJoin { ref name, .. } if name == "bob"));

    send(&mut alice, &Message::DocCreateRequest { name: "notes".into() }).await;
    let created = recv(&mut alice).await;
    assert_eq!(
        created,
        Message::DocCreateResponse {
            status: StatusCode::Ok,
            name: "notes".into()
        }
    );

    send(&mut alice, &Message::DocOpenRequest { name: "notes".into() }).await;
    let opened = recv(&mut alice).await;
    let Message::DocOpenResponse { status, .. } = opened else {
        panic!("expected DocOpenResponse, got {opened:?}");
    };
    assert_eq!(status, StatusCode::Ok); // empty file, no content stream

    send(&mut bob, &Message::DocOpenRequest { name: "notes".into() }).await;
    recv(&mut bob).await; // DOC_OPEN response, same id

    send(&mut alice, &Message::SyncCursor { position: 0 }).await;
    send(&mut alice, &Message::SyncByte { position: 0, byte: b'x' }).await;

    let echoed_to_sender = recv(&mut alice).await;
    assert_eq!(
        echoed_to_sender,
        Message::SyncByte { position: 0, byte: b'x' }
    );
    let echoed_to_peer = recv(&mut bob).await;
    assert_eq!(echoed_to_peer, Message::SyncByte { position: 0, byte: b'x' });
}

#[tokio::test]
async fn out_of_bounds_multibyte_reports_status_only_to_sender() {
    let (addr, _dir) = start_server(&[("alice", "pw")]).await;
    let mut alice = TcpStream::connect(addr).await.unwrap();
    send(&mut alice, &login("alice", "pw")).await;
    recv(&mut alice).await;
    recv(&mut alice).await;

    send(&mut alice, &Message::DocCreateRequest { name: "doc".into() }).await;
    recv(&mut alice).await;
    send(&mut alice, &Message::DocOpenRequest { name: "doc".into() }).await;
    recv(&mut alice).await;

    send(
        &mut alice,
        &Message::SyncMultibyte {
            position: 5,
            bytes: b"ab".to_vec(),
        },
    )
    .await;

    let reply = recv(&mut alice).await;
    assert_eq!(
        reply,
        Message::Status {
            status: StatusCode::UserCursorOutOfBounds
        }
    );
}

#[tokio::test]
async fn invalid_type_tag_disconnects_the_session() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let (addr, _dir) = start_server(&[("alice", "pw")]).await;
    let mut alice = TcpStream::connect(addr).await.unwrap();
    send(&mut alice, &login("alice", "pw")).await;
    recv(&mut alice).await;
    recv(&mut alice).await;

    alice.write_all(&[MessageType::Invalid.to_byte()]).await.unwrap();

    // The server closes its write half once the session is torn down; the
    // client observes that as a clean EOF.
    let mut buf = [0u8; 1];
    let n = alice.read(&mut buf).await.unwrap();
    assert_eq!(n, 0);
}

#[tokio::test]
async fn disconnecting_a_logged_in_client_broadcasts_user_quit() {
    let (addr, _dir) = start_server(&[("alice", "pw"), ("bob", "pw")]).await;

    let mut alice = TcpStream::connect(addr).await.unwrap();
    send(&mut alice, &login("alice", "pw")).await;
    recv(&mut alice).await;
    recv(&mut alice).await;

    let mut bob = TcpStream::connect(addr).await.unwrap();
    send(&mut bob, &login("bob", "pw")).await;
    recv(&mut bob).await;
    recv(&mut bob).await; // USER_JOIN (self)
    recv(&mut alice).await; // alice sees bob join

    drop(bob);

    let quit = recv(&mut alice).await;
    assert!(matches!(quit, Message::UserQuit { id: 2 }));
}
