//! The session registry: tracks every connected client, and implements
//! both the broadcast primitive and the cursor coordinator (the cursor
//! coordinator is "just" a filtered mutation over this same map, per the
//! design).

use std::collections::HashMap;

use log::warn;
use tokio::sync::mpsc::UnboundedSender;

use crate::protocol::{self, Message};
use crate::session::{Session, SessionId};

/// `document_id` filter value meaning "every session, regardless of which
/// document (if any) it has active".
pub const ALL_DOCUMENTS: i32 = 0;

/// Registry of every connected session, plus the outbound byte channel
/// used to deliver messages to each one's connection task.
///
/// Exclusively owned and mutated by the event-loop task.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, Session>,
    outboxes: HashMap<SessionId, UnboundedSender<Vec<u8>>>,
}

impl SessionRegistry {
    /// Build an empty registry.
    pub fn new() -> SessionRegistry {
        SessionRegistry::default()
    }

    /// Register a freshly-accepted session and the channel its connection
    /// task listens on for outbound bytes.
    pub fn insert(&mut self, session: Session, outbox: UnboundedSender<Vec<u8>>) {
        self.outboxes.insert(session.id(), outbox);
        self.sessions.insert(session.id(), session);
    }

    /// Look up a session by id.
    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    /// Look up a session by id, mutably.
    pub fn get_mut(&mut self, id: SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(&id)
    }

    /// Remove a session from the registry. Dropping its outbox sender
    /// causes the connection task's write side to observe channel closure
    /// and tear down the socket.
    pub fn remove(&mut self, id: SessionId) -> Option<Session> {
        self.outboxes.remove(&id);
        self.sessions.remove(&id)
    }

    /// Iterate every registered session.
    pub fn iter(&self) -> impl Iterator<Item = (&SessionId, &Session)> {
        self.sessions.iter()
    }

    /// Number of currently-registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Send one message to a single session. Returns `false` if the
    /// session is gone or its outbox is closed; the caller treats this as
    /// non-fatal (the disconnect will be observed on the next read).
    pub fn send_to(&self, id: SessionId, message: &Message) -> bool {
        let Some(outbox) = self.outboxes.get(&id) else {
            return false;
        };
        outbox.send(protocol::encode(message)).is_ok()
    }

    /// Send `message` to every session matching `document_id`: all
    /// sessions if `document_id == ALL_DOCUMENTS`, else only sessions
    /// whose `active_document` equals it. Per-recipient send failures are
    /// swallowed (logged) — broadcasting continues to the rest.
    pub fn broadcast(&self, message: &Message, document_id: i32) {
        let bytes = protocol::encode(message);
        for (id, session) in &self.sessions {
            if document_id != ALL_DOCUMENTS && session.active_document != document_id {
                continue;
            }
            let Some(outbox) = self.outboxes.get(id) else {
                continue;
            };
            if outbox.send(bytes.clone()).is_err() {
                warn!("broadcast to session {id:?} failed, will be cleaned up on next read");
            }
        }
    }

    /// The cursor coordinator: for every session with `active_document ==
    /// document_id` and `cursor >= start`, shift its cursor by `addend`.
    /// Insertions pass a positive `addend`; deletions pass a negative one.
    /// A cursor that would fall before the affected range's start is
    /// clamped there (a deletion that straddles the cursor moves it back
    /// to the deletion point, never negative within the document).
    pub fn update_cursors(&mut self, start: i32, addend: i32, document_id: i32) {
        for session in self.sessions.values_mut() {
            if session.active_document != document_id {
                continue;
            }
            if session.cursor >= start {
                session.cursor = (session.cursor + addend).max(start.min(session.cursor));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn registered(registry: &mut SessionRegistry) -> (SessionId, mpsc::UnboundedReceiver<Vec<u8>>) {
        let id = SessionId::next();
        let session = Session::new(id);
        let (tx, rx) = mpsc::unbounded_channel();
        registry.insert(session, tx);
        (id, rx)
    }

    #[test]
    fn broadcast_to_all_documents_reaches_every_session() {
        let mut registry = SessionRegistry::new();
        let (_id1, mut rx1) = registered(&mut registry);
        let (_id2, mut rx2) = registered(&mut registry);

        registry.broadcast(&Message::UserQuit { id: 7 }, ALL_DOCUMENTS);

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[test]
    fn broadcast_filters_by_active_document() {
        let mut registry = SessionRegistry::new();
        let (id1, mut rx1) = registered(&mut registry);
        let (_id2, mut rx2) = registered(&mut registry);
        registry.get_mut(id1).unwrap().active_document = 5;

        registry.broadcast(&Message::Status { status: crate::protocol::StatusCode::DocSaved }, 5);

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_err());
    }

    #[test]
    fn update_cursors_shifts_forward_on_insert() {
        let mut registry = SessionRegistry::new();
        let (id, _rx) = registered(&mut registry);
        registry.get_mut(id).unwrap().active_document = 1;
        registry.get_mut(id).unwrap().cursor = 3;

        registry.update_cursors(0, 2, 1);

        assert_eq!(registry.get(id).unwrap().cursor, 5);
    }

    #[test]
    fn update_cursors_ignores_sessions_on_other_documents() {
        let mut registry = SessionRegistry::new();
        let (id, _rx) = registered(&mut registry);
        registry.get_mut(id).unwrap().active_document = 2;
        registry.get_mut(id).unwrap().cursor = 3;

        registry.update_cursors(0, 2, 1);

        assert_eq!(registry.get(id).unwrap().cursor, 3);
    }

    #[test]
    fn update_cursors_clamps_deletion_straddling_cursor_to_start() {
        let mut registry = SessionRegistry::new();
        let (id, _rx) = registered(&mut registry);
        registry.get_mut(id).unwrap().active_document = 1;
        registry.get_mut(id).unwrap().cursor = 4;

        // Delete range [2, 6) -> addend = -4, start = 2.
        registry.update_cursors(2, -4, 1);

        assert_eq!(registry.get(id).unwrap().cursor, 2);
    }

    #[test]
    fn update_cursors_leaves_cursors_before_start_untouched() {
        let mut registry = SessionRegistry::new();
        let (id, _rx) = registered(&mut registry);
        registry.get_mut(id).unwrap().active_document = 1;
        registry.get_mut(id).unwrap().cursor = 1;

        registry.update_cursors(2, -1, 1);

        assert_eq!(registry.get(id).unwrap().cursor, 1);
    }
}
