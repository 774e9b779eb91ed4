//! The typed message set exchanged between clients and the server, and the
//! internal-only pseudo-messages used to notify the message handler of
//! connection lifecycle events.

use super::status::StatusCode;

/// A SHA-1 digest, used both for password hashes and document-content
/// comparison.
pub type Hash = [u8; 20];

/// The one-byte tag that begins every on-wire message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// Unknown/malformed message; receiving one disconnects the session.
    Invalid,
    DocActivate,
    DocCreate,
    DocDelete,
    DocOpen,
    DocSave,
    DocList,
    Status,
    SyncByte,
    SyncCursor,
    SyncDeletion,
    SyncMultibyte,
    UserLogin,
    UserLogout,
    UserJoin,
    UserQuit,
}

impl MessageType {
    /// Encode this type as its wire tag byte.
    pub fn to_byte(self) -> u8 {
        match self {
            MessageType::Invalid => 0,
            MessageType::DocActivate => 1,
            MessageType::DocCreate => 2,
            MessageType::DocDelete => 3,
            MessageType::DocOpen => 4,
            MessageType::DocSave => 5,
            MessageType::DocList => 6,
            MessageType::Status => 7,
            MessageType::SyncByte => 8,
            MessageType::SyncCursor => 9,
            MessageType::SyncDeletion => 10,
            MessageType::SyncMultibyte => 11,
            MessageType::UserLogin => 12,
            MessageType::UserLogout => 13,
            MessageType::UserJoin => 14,
            MessageType::UserQuit => 15,
        }
    }

    /// Decode a tag byte, if it names a known type.
    pub fn from_byte(byte: u8) -> Option<MessageType> {
        Some(match byte {
            0 => MessageType::Invalid,
            1 => MessageType::DocActivate,
            2 => MessageType::DocCreate,
            3 => MessageType::DocDelete,
            4 => MessageType::DocOpen,
            5 => MessageType::DocSave,
            6 => MessageType::DocList,
            7 => MessageType::Status,
            8 => MessageType::SyncByte,
            9 => MessageType::SyncCursor,
            10 => MessageType::SyncDeletion,
            11 => MessageType::SyncMultibyte,
            12 => MessageType::UserLogin,
            13 => MessageType::UserLogout,
            14 => MessageType::UserJoin,
            15 => MessageType::UserQuit,
            _ => return None,
        })
    }
}

/// A decoded protocol message, client→server or server→client.
///
/// Document and user names are stored trimmed of their zero-byte padding;
/// the codec handles padding to the fixed wire width on encode and
/// stripping it on decode.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Malformed or unrecognized message. Never constructed deliberately;
    /// produced only when a decode failed in a way the caller chooses to
    /// represent as data rather than an error.
    Invalid,

    /// `DOC_ACTIVATE` request: open-or-reuse a document by id, streaming
    /// contents only if they differ from the client's cached hash.
    DocActivateRequest { id: i32, hash: Hash },
    /// `DOC_ACTIVATE` response.
    DocActivateResponse { status: StatusCode, id: i32 },

    /// `DOC_CREATE` request: create an empty document file.
    DocCreateRequest { name: String },
    /// `DOC_CREATE` response.
    DocCreateResponse { status: StatusCode, name: String },

    /// `DOC_DELETE` request: remove a document file.
    DocDeleteRequest { name: String },
    /// `DOC_DELETE` response.
    DocDeleteResponse { status: StatusCode, name: String },

    /// `DOC_OPEN` request: open-or-reuse a document by name.
    DocOpenRequest { name: String },
    /// `DOC_OPEN` response.
    DocOpenResponse {
        status: StatusCode,
        id: i32,
        name: String,
    },

    /// `DOC_SAVE` request: persist a cached document's contents to disk.
    DocSaveRequest { id: i32 },
    /// `DOC_SAVE` response.
    DocSaveResponse { status: StatusCode, id: i32 },

    /// `DOC_LIST` request: enumerate document names on disk.
    DocListRequest,
    /// `DOC_LIST` response: the fixed-width name fields of every document.
    DocListResponse { names: Vec<String> },

    /// A standalone status notification (also embedded in several of the
    /// responses above).
    Status { status: StatusCode },

    /// `SYNC_BYTE`: insert one byte at the sender's current cursor.
    SyncByte { position: i32, byte: u8 },

    /// `SYNC_CURSOR`: update the sender's cursor with no broadcast.
    SyncCursor { position: i32 },

    /// `SYNC_DELETION`: delete a byte range from the active document.
    SyncDeletion { position: i32, length: u32 },

    /// `SYNC_MULTIBYTE`: insert a byte sequence at an explicit position.
    SyncMultibyte { position: i32, bytes: Vec<u8> },

    /// `USER_LOGIN` request.
    UserLoginRequest { name: String, hash: Hash },
    /// `USER_LOGIN` response.
    UserLoginResponse { status: StatusCode },

    /// `USER_LOGOUT` request (no fields beyond the tag).
    UserLogoutRequest,
    /// `USER_LOGOUT` response.
    UserLogoutResponse { status: StatusCode },

    /// `USER_JOIN` broadcast: a user has logged in.
    UserJoin { id: i32, name: String },

    /// `USER_QUIT` broadcast: a user has disconnected.
    UserQuit { id: i32 },

    /// Internal-only notification that a session's connection task ended.
    /// Never placed on the wire; synthesized by the event loop.
    ClientDisconnect,
}

impl Message {
    /// The [`MessageType`] tag for this message, used both for encoding and
    /// for labeling handler dispatch.
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::Invalid => MessageType::Invalid,
            Message::DocActivateRequest { .. } | Message::DocActivateResponse { .. } => {
                MessageType::DocActivate
            }
            Message::DocCreateRequest { .. } | Message::DocCreateResponse { .. } => {
                MessageType::DocCreate
            }
            Message::DocDeleteRequest { .. } | Message::DocDeleteResponse { .. } => {
                MessageType::DocDelete
            }
            Message::DocOpenRequest { .. } | Message::DocOpenResponse { .. } => {
                MessageType::DocOpen
            }
            Message::DocSaveRequest { .. } | Message::DocSaveResponse { .. } => {
                MessageType::DocSave
            }
            Message::DocListRequest | Message::DocListResponse { .. } => MessageType::DocList,
            Message::Status { .. } => MessageType::Status,
            Message::SyncByte { .. } => MessageType::SyncByte,
            Message::SyncCursor { .. } => MessageType::SyncCursor,
            Message::SyncDeletion { .. } => MessageType::SyncDeletion,
            Message::SyncMultibyte { .. } => MessageType::SyncMultibyte,
            Message::UserLoginRequest { .. } | Message::UserLoginResponse { .. } => {
                MessageType::UserLogin
            }
            Message::UserLogoutRequest | Message::UserLogoutResponse { .. } => {
                MessageType::UserLogout
            }
            Message::UserJoin { .. } => MessageType::UserJoin,
            Message::UserQuit { .. } => MessageType::UserQuit,
            Message::ClientDisconnect => MessageType::Invalid,
        }
    }
}
