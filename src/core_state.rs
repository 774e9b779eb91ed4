//! `CoreState`: the state owned exclusively by the event-loop task. Nothing
//! outside that task ever touches these collaborators directly — every
//! other task communicates through channels instead.

use crate::credentials::CredentialStore;
use crate::document::{DocumentCache, DocumentStore};
use crate::error::CoreError;
use crate::handler::{self, HandlerOutcome};
use crate::protocol::Message;
use crate::registry::SessionRegistry;
use crate::session::{Session, SessionId};

/// Everything the event loop needs to dispatch a message: the session
/// registry, the document cache, and the credential store.
pub struct CoreState {
    pub registry: SessionRegistry,
    pub documents: DocumentCache,
    pub credentials: CredentialStore,
}

impl CoreState {
    /// Build the core state from its configured backing stores.
    pub fn new(documents_dir: &str, credentials_db: &str) -> Result<CoreState, CoreError> {
        let store = DocumentStore::new(documents_dir).map_err(|source| CoreError::DocumentsDirInaccessible {
            path: documents_dir.to_string(),
            source,
        })?;
        let credentials =
            CredentialStore::open(credentials_db).map_err(|source| CoreError::CredentialStoreUnavailable {
                path: credentials_db.to_string(),
                source,
            })?;
        Ok(CoreState {
            registry: SessionRegistry::new(),
            documents: DocumentCache::new(store),
            credentials,
        })
    }

    /// Register a newly-accepted connection.
    pub fn accept(&mut self, id: SessionId, outbox: tokio::sync::mpsc::UnboundedSender<Vec<u8>>) {
        self.registry.insert(Session::new(id), outbox);
    }

    /// Dispatch one decoded message through the handler.
    pub fn dispatch(&mut self, session_id: SessionId, message: Message) -> HandlerOutcome {
        handler::handle(session_id, message, &mut self.registry, &mut self.documents, &self.credentials)
    }
}
