//! The message handler: the single state-transition function the event
//! loop calls for every inbound message. Pure with respect to I/O — all
//! filesystem and credential-store access goes through
//! [`crate::document::DocumentCache`] and [`crate::credentials::CredentialStore`],
//! and all client-visible effects go through [`crate::registry::SessionRegistry`].

use log::{info, warn};

use crate::credentials::{CredentialStore, LoginOutcome};
use crate::document::DocumentCache;
use crate::protocol::{Message, StatusCode};
use crate::registry::SessionRegistry;
use crate::session::{SessionId, CURSOR_UNKNOWN, NO_ACTIVE_DOCUMENT};

/// What the event loop should do with the session after a message was
/// handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// Keep the session open.
    Continue,
    /// Tear the session down (logout, or the connection already closed).
    Disconnect,
}

/// Dispatch one decoded message for `session_id`.
pub fn handle(
    session_id: SessionId,
    message: Message,
    registry: &mut SessionRegistry,
    documents: &mut DocumentCache,
    credentials: &CredentialStore,
) -> HandlerOutcome {
    if message == Message::ClientDisconnect {
        return handle_disconnect(session_id, registry, documents);
    }

    // An unrecognized type tag decodes to `Message::Invalid`; the wire
    // contract treats that as fatal to the connection, not just the
    // request, since there's no way to know how many bytes the sender
    // thought it was writing next.
    if message == Message::Invalid {
        return handle_disconnect(session_id, registry, documents);
    }

    let Some(session) = registry.get(session_id) else {
        warn!("message for unknown session {session_id:?}, ignoring");
        return HandlerOutcome::Continue;
    };

    // Pre-auth gate: everything except login is silently dropped until the
    // client has authenticated (no response, no broadcast).
    if !session.is_logged_in() && !matches!(message, Message::UserLoginRequest { .. }) {
        return HandlerOutcome::Continue;
    }

    match message {
        Message::UserLoginRequest { name, hash } => handle_login(session_id, name, hash, registry, credentials),
        Message::UserLogoutRequest => handle_logout(session_id, registry, documents),
        Message::DocCreateRequest { name } => handle_doc_create(session_id, name, registry, documents),
        Message::DocDeleteRequest { name } => handle_doc_delete(session_id, name, registry, documents),
        Message::DocOpenRequest { name } => handle_doc_open(session_id, name, registry, documents),
        Message::DocActivateRequest { id, hash } => handle_doc_activate(session_id, id, hash, registry, documents),
        Message::DocSaveRequest { id } => handle_doc_save(session_id, id, registry, documents),
        Message::DocListRequest => handle_doc_list(session_id, registry, documents),
        Message::SyncByte { byte, .. } => handle_sync_byte(session_id, byte, registry, documents),
        Message::SyncCursor { position } => handle_sync_cursor(session_id, position, registry, documents),
        Message::SyncDeletion { position, length } => {
            handle_sync_deletion(session_id, position, length, registry, documents)
        }
        Message::SyncMultibyte { position, bytes } => {
            handle_sync_multibyte(session_id, position, bytes, registry, documents)
        }
        other => {
            warn!("session {session_id:?} sent a message type with no request handling: {other:?}");
            registry.send_to(session_id, &Message::Status { status: StatusCode::NotOk });
            HandlerOutcome::Continue
        }
    }
}

fn handle_disconnect(
    session_id: SessionId,
    registry: &mut SessionRegistry,
    documents: &mut DocumentCache,
) -> HandlerOutcome {
    if let Some(session) = registry.remove(session_id) {
        if session.active_document != NO_ACTIVE_DOCUMENT {
            documents.close(session.active_document);
        }
        if session.is_logged_in() {
            registry.broadcast(&Message::UserQuit { id: session.user_id }, crate::registry::ALL_DOCUMENTS);
        }
    }
    HandlerOutcome::Disconnect
}

fn handle_login(
    session_id: SessionId,
    name: String,
    hash: crate::protocol::Hash,
    registry: &mut SessionRegistry,
    credentials: &CredentialStore,
) -> HandlerOutcome {
    let outcome = credentials.check(&name, &hash);
    let mut joined = None;
    let status = match outcome {
        Ok(LoginOutcome::Ok(user_id)) => {
            if let Some(session) = registry.get_mut(session_id) {
                session.user_id = user_id;
                session.user_name = Some(name.clone());
            }
            info!("session {session_id:?} logged in as {name:?}");
            joined = Some(user_id);
            StatusCode::Ok
        }
        Ok(LoginOutcome::NoSuchUser) => StatusCode::UserNotExist,
        Ok(LoginOutcome::WrongPassword) => StatusCode::UserWrongPassword,
        Err(e) => {
            warn!("credential check failed: {e:#}");
            StatusCode::DbError
        }
    };
    // Respond to the sender before broadcasting USER_JOIN — both go through
    // the same FIFO outbox, so whichever is sent first is what the wire
    // carries first.
    registry.send_to(session_id, &Message::UserLoginResponse { status });
    if let Some(user_id) = joined {
        registry.broadcast(&Message::UserJoin { id: user_id, name }, crate::registry::ALL_DOCUMENTS);
    }
    HandlerOutcome::Continue
}

/// `USER_LOGOUT` replies `OK` and then tears the session down exactly like
/// any other disconnect — same active-document release, same `USER_QUIT`
/// broadcast — it's just a client-requested disconnect instead of a
/// detected one.
fn handle_logout(
    session_id: SessionId,
    registry: &mut SessionRegistry,
    documents: &mut DocumentCache,
) -> HandlerOutcome {
    registry.send_to(session_id, &Message::UserLogoutResponse { status: StatusCode::Ok });
    handle_disconnect(session_id, registry, documents)
}

fn handle_doc_create(
    session_id: SessionId,
    name: String,
    registry: &mut SessionRegistry,
    documents: &DocumentCache,
) -> HandlerOutcome {
    let status = match documents.create(&name) {
        Ok(()) => StatusCode::Ok,
        Err(crate::document::DocumentStoreError::AlreadyExists(_)) => StatusCode::DocAlreadyExist,
        Err(_) => StatusCode::IoError,
    };
    registry.send_to(session_id, &Message::DocCreateResponse { status, name });
    HandlerOutcome::Continue
}

fn handle_doc_delete(
    session_id: SessionId,
    name: String,
    registry: &mut SessionRegistry,
    documents: &DocumentCache,
) -> HandlerOutcome {
    let status = match documents.delete(&name) {
        Ok(()) => StatusCode::Ok,
        Err(crate::document::DocumentStoreError::NotExist(_)) => StatusCode::DocNotExist,
        Err(_) => StatusCode::IoError,
    };
    registry.send_to(session_id, &Message::DocDeleteResponse { status, name });
    HandlerOutcome::Continue
}

fn handle_doc_open(
    session_id: SessionId,
    name: String,
    registry: &mut SessionRegistry,
    documents: &mut DocumentCache,
) -> HandlerOutcome {
    match documents.open(&name) {
        Ok(id) => {
            deactivate_current_document(session_id, registry, documents);
            if let Some(session) = registry.get_mut(session_id) {
                session.active_document = id;
                session.cursor = CURSOR_UNKNOWN;
            }
            let contents = documents.get(id).map(|doc| doc.contents.clone()).unwrap_or_default();
            if contents.is_empty() {
                registry.send_to(session_id, &Message::DocOpenResponse { status: StatusCode::Ok, id, name });
            } else {
                registry.send_to(
                    session_id,
                    &Message::DocOpenResponse { status: StatusCode::OkContentsFollowing, id, name },
                );
                registry.send_to(session_id, &Message::SyncMultibyte { position: 0, bytes: contents });
            }
        }
        Err(crate::document::DocumentStoreError::NotExist(_)) => {
            registry.send_to(
                session_id,
                &Message::DocOpenResponse { status: StatusCode::DocNotExist, id: 0, name },
            );
        }
        Err(_) => {
            registry.send_to(session_id, &Message::DocOpenResponse { status: StatusCode::IoError, id: 0, name });
        }
    }
    HandlerOutcome::Continue
}

fn handle_doc_activate(
    session_id: SessionId,
    id: i32,
    hash: crate::protocol::Hash,
    registry: &mut SessionRegistry,
    documents: &mut DocumentCache,
) -> HandlerOutcome {
    let Some(doc) = documents.get(id) else {
        registry.send_to(session_id, &Message::DocActivateResponse { status: StatusCode::DocNotExist, id });
        return HandlerOutcome::Continue;
    };

    let current_hash = crate::hash::hash_bytes(&doc.contents);
    let contents = doc.contents.clone();
    // Register this session as an opener of `id` before releasing its
    // previous document — if they're the same id, this keeps the count
    // from touching zero and evicting the entry out from under us.
    documents.activate(id).expect("id was just found in the cache");
    deactivate_current_document(session_id, registry, documents);
    if let Some(session) = registry.get_mut(session_id) {
        session.active_document = id;
        session.cursor = CURSOR_UNKNOWN;
    }

    if current_hash == hash {
        registry.send_to(session_id, &Message::DocActivateResponse { status: StatusCode::Ok, id });
    } else {
        registry.send_to(
            session_id,
            &Message::DocActivateResponse { status: StatusCode::OkContentsFollowing, id },
        );
        registry.send_to(session_id, &Message::SyncMultibyte { position: 0, bytes: contents });
    }
    HandlerOutcome::Continue
}

/// Release the session's previously-active document (if any) in the cache
/// before it switches to a different one.
fn deactivate_current_document(session_id: SessionId, registry: &SessionRegistry, documents: &mut DocumentCache) {
    if let Some(session) = registry.get(session_id) {
        if session.active_document != NO_ACTIVE_DOCUMENT {
            documents.close(session.active_document);
        }
    }
}

fn handle_doc_save(
    session_id: SessionId,
    id: i32,
    registry: &mut SessionRegistry,
    documents: &DocumentCache,
) -> HandlerOutcome {
    match documents.save(id) {
        Some(Ok(())) => {
            registry.send_to(session_id, &Message::DocSaveResponse { status: StatusCode::Ok, id });
            registry.broadcast(&Message::Status { status: StatusCode::DocSaved }, id);
        }
        Some(Err(_)) => {
            registry.send_to(session_id, &Message::DocSaveResponse { status: StatusCode::IoError, id });
        }
        None => {
            registry.send_to(session_id, &Message::DocSaveResponse { status: StatusCode::DocNotExist, id });
        }
    }
    HandlerOutcome::Continue
}

fn handle_doc_list(
    session_id: SessionId,
    registry: &mut SessionRegistry,
    documents: &DocumentCache,
) -> HandlerOutcome {
    let names = documents.list_names().unwrap_or_default();
    registry.send_to(session_id, &Message::DocListResponse { names });
    HandlerOutcome::Continue
}

/// `SYNC_BYTE` always inserts at the sender's own cursor, not any position
/// field on the wire — see the pre-insertion cursor-unknown check below.
/// `SYNC_MULTIBYTE` carries an explicit position instead of the session's
/// cursor, but a negative one reports the same `USER_CURSOR_UNKNOWN`
/// status (the protocol treats any negative position as the "unknown"
/// sentinel, not just `session.cursor == -1`).
fn handle_sync_byte(
    session_id: SessionId,
    byte: u8,
    registry: &mut SessionRegistry,
    documents: &mut DocumentCache,
) -> HandlerOutcome {
    let Some(session) = registry.get(session_id) else {
        return HandlerOutcome::Continue;
    };
    if session.active_document == NO_ACTIVE_DOCUMENT {
        registry.send_to(session_id, &Message::Status { status: StatusCode::UserNoActiveDoc });
        return HandlerOutcome::Continue;
    }
    let position = session.cursor;
    if position == CURSOR_UNKNOWN {
        registry.send_to(session_id, &Message::Status { status: StatusCode::UserCursorUnknown });
        return HandlerOutcome::Continue;
    }

    let Some((doc_id, status)) = with_active_document(session_id, registry, documents, |doc| {
        if position < 0 || position > doc.length() {
            return StatusCode::UserCursorOutOfBounds;
        }
        doc.contents.insert(position as usize, byte);
        StatusCode::Ok
    }) else {
        registry.send_to(session_id, &Message::Status { status: StatusCode::UserNoActiveDoc });
        return HandlerOutcome::Continue;
    };

    if status == StatusCode::Ok {
        registry.update_cursors(position, 1, doc_id);
        registry.broadcast(&Message::SyncByte { position, byte }, doc_id);
    } else {
        registry.send_to(session_id, &Message::Status { status });
    }
    HandlerOutcome::Continue
}

/// `SYNC_CURSOR` never gets a reply, successful or otherwise — a client
/// that sends one malformed enough to fall outside the active document's
/// bounds just has that update silently ignored instead, which keeps the
/// `cursor ∈ {-1} ∪ [0, doc.length]` invariant intact without breaking the
/// "no response, no broadcast" contract the rest of the protocol relies on
/// (a misbehaving peer here has no way to tell it was ignored).
fn handle_sync_cursor(
    session_id: SessionId,
    position: i32,
    registry: &mut SessionRegistry,
    documents: &DocumentCache,
) -> HandlerOutcome {
    let Some(session) = registry.get(session_id) else {
        return HandlerOutcome::Continue;
    };
    if session.active_document == NO_ACTIVE_DOCUMENT {
        return HandlerOutcome::Continue;
    }
    let Some(doc) = documents.get(session.active_document) else {
        return HandlerOutcome::Continue;
    };
    if position < 0 || position > doc.length() {
        return HandlerOutcome::Continue;
    }
    if let Some(session) = registry.get_mut(session_id) {
        session.cursor = position;
    }
    HandlerOutcome::Continue
}

fn handle_sync_deletion(
    session_id: SessionId,
    position: i32,
    length: u32,
    registry: &mut SessionRegistry,
    documents: &mut DocumentCache,
) -> HandlerOutcome {
    let Some((doc_id, status)) = with_active_document(session_id, registry, documents, |doc| {
        if position < 0 || position >= doc.length() {
            return StatusCode::UserCursorOutOfBounds;
        }
        let end = position as i64 + length as i64;
        if end > doc.length() as i64 {
            return StatusCode::UserLengthTooLong;
        }
        let range = position as usize..(position as usize + length as usize);
        doc.contents.drain(range);
        StatusCode::Ok
    }) else {
        registry.send_to(session_id, &Message::Status { status: StatusCode::UserNoActiveDoc });
        return HandlerOutcome::Continue;
    };

    if status == StatusCode::Ok {
        registry.update_cursors(position, -(length as i32), doc_id);
        registry.broadcast(&Message::SyncDeletion { position, length }, doc_id);
    } else {
        registry.send_to(session_id, &Message::Status { status });
    }
    HandlerOutcome::Continue
}

fn handle_sync_multibyte(
    session_id: SessionId,
    position: i32,
    bytes: Vec<u8>,
    registry: &mut SessionRegistry,
    documents: &mut DocumentCache,
) -> HandlerOutcome {
    let len = bytes.len();
    let insert_bytes = bytes.clone();
    let Some((doc_id, status)) = with_active_document(session_id, registry, documents, move |doc| {
        if position < 0 {
            return StatusCode::UserCursorUnknown;
        }
        if position > doc.length() {
            return StatusCode::UserCursorOutOfBounds;
        }
        let at = position as usize;
        doc.contents.splice(at..at, insert_bytes.iter().copied());
        StatusCode::Ok
    }) else {
        registry.send_to(session_id, &Message::Status { status: StatusCode::UserNoActiveDoc });
        return HandlerOutcome::Continue;
    };

    if status == StatusCode::Ok {
        registry.update_cursors(position, len as i32, doc_id);
        registry.broadcast(&Message::SyncMultibyte { position, bytes }, doc_id);
    } else {
        registry.send_to(session_id, &Message::Status { status });
    }
    HandlerOutcome::Continue
}

/// Run `f` against the session's active document, if it has one. Returns
/// `None` if the session has no active document (or the doc vanished from
/// the cache, which shouldn't happen while it's referenced), else the
/// document's id and whatever status `f` produced.
fn with_active_document(
    session_id: SessionId,
    registry: &SessionRegistry,
    documents: &mut DocumentCache,
    f: impl FnOnce(&mut crate::document::Document) -> StatusCode,
) -> Option<(i32, StatusCode)> {
    let doc_id = registry.get(session_id)?.active_document;
    if doc_id == NO_ACTIVE_DOCUMENT {
        return None;
    }
    let doc = documents.get_mut(doc_id)?;
    Some((doc_id, f(doc)))
}
