//! Per-connection tasks: one reads a decoded [`Message`] stream and forwards
//! it to the event loop, the other drains an outbox channel and writes
//! encoded bytes back to the socket. Splitting read and write this way
//! means a slow or stalled peer's write side never blocks the event loop,
//! and a peer that stops sending never blocks its own outbound delivery.

use log::{debug, warn};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::protocol::{self, Message};
use crate::session::SessionId;

/// A decoded inbound message together with the session it came from, as
/// delivered to the event loop.
#[derive(Debug)]
pub struct Inbound {
    pub session: SessionId,
    pub message: Message,
}

/// Spawn the read-side task for a freshly-accepted connection. Every
/// successfully decoded message, and finally a synthetic
/// [`Message::ClientDisconnect`], is sent to `to_event_loop`.
pub fn spawn_reader(
    session: SessionId,
    mut read_half: OwnedReadHalf,
    to_event_loop: UnboundedSender<Inbound>,
) {
    tokio::spawn(async move {
        loop {
            match protocol::read_message(&mut read_half, session).await {
                Ok(message) => {
                    debug!("session {session:?} received {:?}", message.message_type());
                    if to_event_loop.send(Inbound { session, message }).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    if e.is_fatal_to_session() {
                        warn!("session {session:?} connection ended: {e}");
                    }
                    let _ = to_event_loop.send(Inbound {
                        session,
                        message: Message::ClientDisconnect,
                    });
                    return;
                }
            }
        }
    });
}

/// Spawn the write-side task for a connection: drains `outbox` and writes
/// each payload to `write_half` until the channel closes (which happens
/// when the event loop removes the session from the registry) or a write
/// fails.
pub fn spawn_writer(session: SessionId, mut write_half: OwnedWriteHalf) -> UnboundedSender<Vec<u8>> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move { drain_outbox(session, &mut write_half, rx).await });
    tx
}

async fn drain_outbox<W>(session: SessionId, write_half: &mut W, mut rx: UnboundedReceiver<Vec<u8>>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(bytes) = rx.recv().await {
        if let Err(e) = write_half.write_all(&bytes).await {
            warn!("session {session:?} write failed, closing: {e}");
            return;
        }
    }
    let _ = write_half.shutdown().await;
}
