//! The per-connection [`Session`] record and its identifier.

use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque identifier for a connected client's session.
///
/// There's no stable raw socket fd to key by on an async runtime (and
/// reusing one as a map key would be a footgun once a slot is recycled),
/// so sessions are identified by a monotonically increasing counter
/// instead, indexing the registry the same way a socket fd would.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

impl SessionId {
    /// Allocate a fresh, never-before-used session id.
    pub fn next() -> SessionId {
        SessionId(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Placeholder id for contexts with no real session attached yet
    /// (unit tests exercising the codec in isolation).
    #[cfg(test)]
    pub fn unknown() -> SessionId {
        SessionId(0)
    }
}

/// The document id special value meaning "no active document".
pub const NO_ACTIVE_DOCUMENT: i32 = 0;
/// The cursor special value meaning "unknown" (never synced).
pub const CURSOR_UNKNOWN: i32 = -1;
/// The user id special value meaning "not yet logged in".
pub const NOT_LOGGED_IN: i32 = 0;

/// Server-side record of one connected client.
///
/// A session's socket is owned by its connection task, not by this struct;
/// `Session` holds only the protocol-level state the handler and cursor
/// coordinator need to mutate. See [`crate::net::connection`] for the
/// socket-owning half.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    /// 0 before login; positive once authenticated. Never reverts to 0
    /// while the session lives — logout disconnects the session instead.
    pub user_id: i32,
    /// 0 if no document is active, else a positive document id.
    pub active_document: i32,
    /// -1 ("unknown") until the client syncs a cursor position.
    pub cursor: i32,
    /// Name the user authenticated with, once logged in (for `USER_JOIN`
    /// broadcasts and disconnect cleanup).
    pub user_name: Option<String>,
}

impl Session {
    /// Construct a freshly-accepted, pre-authentication session.
    pub fn new(id: SessionId) -> Session {
        Session {
            id,
            user_id: NOT_LOGGED_IN,
            active_document: NO_ACTIVE_DOCUMENT,
            cursor: CURSOR_UNKNOWN,
            user_name: None,
        }
    }

    /// This session's identifier.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Whether this session has completed `USER_LOGIN`.
    pub fn is_logged_in(&self) -> bool {
        self.user_id != NOT_LOGGED_IN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_session_is_pre_auth_with_unknown_cursor() {
        let session = Session::new(SessionId::next());
        assert!(!session.is_logged_in());
        assert_eq!(session.active_document, NO_ACTIVE_DOCUMENT);
        assert_eq!(session.cursor, CURSOR_UNKNOWN);
    }

    #[test]
    fn session_ids_are_unique() {
        let a = SessionId::next();
        let b = SessionId::next();
        assert_ne!(a, b);
    }
}
