//! The accept loop: binds the configured TCP endpoint and spawns a reader
//! and writer task for every incoming connection.

use log::info;
use tokio::net::TcpSocket;
use tokio::sync::mpsc::UnboundedSender;

use crate::error::CoreError;
use crate::session::SessionId;

use super::connection::{self, Inbound};

/// A freshly-accepted connection, handed to the event loop so it can
/// register the session before the reader/writer tasks start producing
/// traffic for it.
pub struct Accepted {
    pub session: SessionId,
    pub outbox: UnboundedSender<Vec<u8>>,
}

/// Bind `addr` and spawn an accept loop that registers each connection with
/// the event loop via `to_event_loop` (for decoded messages) and
/// `accepted_tx` (for the new session's outbox sender).
///
/// Returns the address actually bound to — the caller-supplied `port` is
/// honored verbatim except when it is `0`, in which case the OS assigns an
/// ephemeral port (used by tests that need to know it up front to connect).
///
/// Binds through [`TcpSocket`] rather than `TcpListener::bind`'s
/// convenience path so `backlog` is actually passed to the OS `listen()`
/// call — `TcpListener::bind` has no way to size the accept queue at all.
pub async fn spawn(
    addr: &str,
    port: u16,
    backlog: u32,
    to_event_loop: UnboundedSender<Inbound>,
    accepted_tx: UnboundedSender<Accepted>,
) -> Result<std::net::SocketAddr, CoreError> {
    let bind_addr = format!("{addr}:{port}");
    let socket_addr: std::net::SocketAddr = bind_addr.parse().map_err(|e| CoreError::ListenerFailed {
        addr: bind_addr.clone(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, e),
    })?;
    let socket = if socket_addr.is_ipv4() {
        TcpSocket::new_v4()
    } else {
        TcpSocket::new_v6()
    }
    .map_err(|source| CoreError::ListenerFailed {
        addr: bind_addr.clone(),
        source,
    })?;
    socket.bind(socket_addr).map_err(|source| CoreError::ListenerFailed {
        addr: bind_addr.clone(),
        source,
    })?;
    let listener = socket.listen(backlog).map_err(|source| CoreError::ListenerFailed {
        addr: bind_addr.clone(),
        source,
    })?;
    let local_addr = listener.local_addr().map_err(|source| CoreError::ListenerFailed {
        addr: bind_addr.clone(),
        source,
    })?;
    info!("listening on {local_addr} (backlog {backlog})");

    tokio::spawn(async move {
        loop {
            let (socket, peer) = match listener.accept().await {
                Ok(pair) => pair,
                Err(e) => {
                    log::warn!("accept() failed: {e}");
                    continue;
                }
            };
            let _ = socket.set_nodelay(true);
            let session = SessionId::next();
            info!("session {session:?} connected from {peer}");

            let (read_half, write_half) = socket.into_split();
            let outbox = connection::spawn_writer(session, write_half);
            connection::spawn_reader(session, read_half, to_event_loop.clone());

            if accepted_tx.send(Accepted { session, outbox }).is_err() {
                return;
            }
        }
    });

    Ok(local_addr)
}
