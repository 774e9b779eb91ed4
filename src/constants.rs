//! Wire-format field widths and other fixed values shared across the codec,
//! session, and document modules.

/// Width of the `type` tag field, in bytes.
pub const TYPE_FIELD_LEN: usize = 1;
/// Width of the `status` field, in bytes.
pub const STATUS_FIELD_LEN: usize = 1;
/// Width of an `id` field (document id, user id), in bytes.
pub const ID_FIELD_LEN: usize = 4;
/// Width of a `size`/`position`/`length` field, in bytes.
pub const LENGTH_FIELD_LEN: usize = 4;
/// Width of a single-byte payload field (`SYNC_BYTE`).
pub const BYTE_FIELD_LEN: usize = 1;
/// Width of the fixed document-name field, in bytes.
pub const DOC_NAME_FIELD_LEN: usize = 128;
/// Width of the fixed user-name field, in bytes.
pub const USER_NAME_FIELD_LEN: usize = 64;
/// Width of a SHA-1 hash field, in bytes.
pub const HASH_FIELD_LEN: usize = 20;

/// Default TCP listening port.
pub const DEFAULT_PORT: u16 = 1337;
/// Default accept backlog.
pub const DEFAULT_BACKLOG: u32 = 4;
/// Default bind address (loopback only).
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1";
/// Default documents directory, relative to the process working directory.
pub const DEFAULT_DOCUMENTS_DIR: &str = "./documents";
/// Default credential-store database path.
pub const DEFAULT_CREDENTIALS_DB: &str = "./user.sql";

/// Largest value a document id may take before wrapping back to 1.
pub const MAX_DOCUMENT_ID: i32 = i32::MAX;
