//! The event loop: the single task that owns [`CoreState`] and drives every
//! state transition. Everything else — accept loop, per-connection reader
//! and writer tasks, the admin console — only ever talks to this task
//! through channels.

use log::info;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::control::ControlCommand;
use crate::core_state::CoreState;
use crate::handler::HandlerOutcome;
use crate::net::{Accepted, Inbound};

/// Run the event loop until a shutdown command is received or every input
/// channel has closed.
///
/// Biased so that session bookkeeping (new connections being registered)
/// is always caught up before the loop processes another message batch —
/// otherwise a message for a session that hasn't been registered yet would
/// be silently dropped by the handler's "unknown session" guard.
pub async fn run(
    mut state: CoreState,
    mut accepted_rx: UnboundedReceiver<Accepted>,
    mut inbound_rx: UnboundedReceiver<Inbound>,
    mut control_rx: UnboundedReceiver<ControlCommand>,
) {
    loop {
        tokio::select! {
            biased;

            command = control_rx.recv() => {
                match command {
                    Some(ControlCommand::Shutdown) | None => {
                        info!("event loop shutting down");
                        return;
                    }
                    Some(ControlCommand::AddUser { name, password }) => {
                        match state.credentials.create(&name, password.as_bytes()) {
                            Ok(_) => info!("account {name:?} created"),
                            Err(e) => log::error!("failed to create account {name:?}: {e:#}"),
                        }
                    }
                    Some(ControlCommand::RemoveUser { name }) => {
                        match state.credentials.remove(&name) {
                            Ok(true) => info!("account {name:?} removed"),
                            Ok(false) => info!("no such account {name:?}"),
                            Err(e) => log::error!("failed to remove account {name:?}: {e:#}"),
                        }
                    }
                }
            }

            accepted = accepted_rx.recv() => {
                match accepted {
                    Some(Accepted { session, outbox }) => state.accept(session, outbox),
                    None => {
                        info!("accept loop ended, shutting down");
                        return;
                    }
                }
            }

            inbound = inbound_rx.recv() => {
                match inbound {
                    Some(Inbound { session, message }) => {
                        if state.dispatch(session, message) == HandlerOutcome::Disconnect {
                            log::debug!("session {session:?} disconnected");
                        }
                    }
                    None => {
                        info!("every connection task has ended, shutting down");
                        return;
                    }
                }
            }
        }
    }
}
