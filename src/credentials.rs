//! SQLite-backed credential store: account creation, removal, and password
//! verification for `USER_LOGIN`.

use std::sync::Mutex;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use crate::hash::hash_bytes;
use crate::protocol::Hash;

/// Outcome of a login attempt against the credential store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// The name and password hash matched; carries the account's user id.
    Ok(i32),
    /// No account exists with that name.
    NoSuchUser,
    /// The account exists but the password hash didn't match.
    WrongPassword,
}

/// Outcome of an account-creation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The account was created; carries its assigned user id.
    Created(i32),
    /// An account with that name already exists.
    AlreadyExists,
}

/// A SQLite-backed table of `(id, name, password_hash)` rows.
///
/// Wrapped in a `Mutex` because `rusqlite::Connection` is `!Sync`; every
/// call here does a small, fast query, so serializing access through one
/// connection is simpler than pooling and never a bottleneck at the scale
/// this server runs at.
pub struct CredentialStore {
    connection: Mutex<Connection>,
}

impl CredentialStore {
    /// Open (or create) the credential database at `path`.
    pub fn open(path: &str) -> Result<CredentialStore> {
        let connection = Connection::open(path)
            .with_context(|| format!("opening credential database at {path}"))?;
        connection
            .execute(
                "CREATE TABLE IF NOT EXISTS users (
                    id       INTEGER PRIMARY KEY AUTOINCREMENT,
                    name     TEXT NOT NULL UNIQUE,
                    password BLOB NOT NULL
                )",
                [],
            )
            .context("creating users table")?;
        Ok(CredentialStore {
            connection: Mutex::new(connection),
        })
    }

    /// Verify `name`/`hash` against the stored hash. `hash` is the 20-byte
    /// SHA-1 digest the client already computed over its password and sent
    /// on the wire (`USER_LOGIN`'s `hash` field) — never a plaintext
    /// password, so this compares it directly rather than hashing it
    /// again.
    pub fn check(&self, name: &str, hash: &Hash) -> Result<LoginOutcome> {
        let connection = self.connection.lock().expect("credential store mutex poisoned");
        let row: Option<(i32, Vec<u8>)> = connection
            .query_row(
                "SELECT id, password FROM users WHERE name = ?1",
                params![name],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .context("querying user by name")?;

        let Some((id, stored_hash)) = row else {
            return Ok(LoginOutcome::NoSuchUser);
        };

        if stored_hash == hash.as_slice() {
            Ok(LoginOutcome::Ok(id))
        } else {
            Ok(LoginOutcome::WrongPassword)
        }
    }

    /// Create a new account, hashing `password` with SHA-1 before storing
    /// it.
    pub fn create(&self, name: &str, password: &[u8]) -> Result<CreateOutcome> {
        let connection = self.connection.lock().expect("credential store mutex poisoned");
        let hash = hash_bytes(password);
        let inserted = connection.execute(
            "INSERT OR IGNORE INTO users (name, password) VALUES (?1, ?2)",
            params![name, hash.as_slice()],
        )
        .context("inserting user")?;

        if inserted == 0 {
            return Ok(CreateOutcome::AlreadyExists);
        }
        Ok(CreateOutcome::Created(connection.last_insert_rowid() as i32))
    }

    /// Remove an account by name. Returns whether a row was actually
    /// deleted.
    pub fn remove(&self, name: &str) -> Result<bool> {
        let connection = self.connection.lock().expect("credential store mutex poisoned");
        let deleted = connection
            .execute("DELETE FROM users WHERE name = ?1", params![name])
            .context("deleting user")?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> CredentialStore {
        CredentialStore::open(":memory:").unwrap()
    }

    #[test]
    fn create_then_check_succeeds_with_right_password() {
        let store = store();
        let CreateOutcome::Created(id) = store.create("alice", b"hunter2").unwrap() else {
            panic!("expected Created");
        };
        assert_eq!(store.check("alice", &hash_bytes(b"hunter2")).unwrap(), LoginOutcome::Ok(id));
    }

    #[test]
    fn check_rejects_wrong_password() {
        let store = store();
        store.create("alice", b"hunter2").unwrap();
        assert_eq!(store.check("alice", &hash_bytes(b"wrong")).unwrap(), LoginOutcome::WrongPassword);
    }

    #[test]
    fn check_unknown_user_reports_no_such_user() {
        let store = store();
        assert_eq!(store.check("ghost", &hash_bytes(b"x")).unwrap(), LoginOutcome::NoSuchUser);
    }

    #[test]
    fn create_duplicate_name_reports_already_exists() {
        let store = store();
        store.create("alice", b"hunter2").unwrap();
        assert_eq!(store.create("alice", b"other").unwrap(), CreateOutcome::AlreadyExists);
    }

    #[test]
    fn remove_existing_user_then_check_reports_no_such_user() {
        let store = store();
        store.create("alice", b"hunter2").unwrap();
        assert!(store.remove("alice").unwrap());
        assert_eq!(store.check("alice", &hash_bytes(b"hunter2")).unwrap(), LoginOutcome::NoSuchUser);
    }

    #[test]
    fn remove_unknown_user_reports_false() {
        let store = store();
        assert!(!store.remove("ghost").unwrap());
    }
}
