//! Status codes carried by [`super::message::Message::Status`] and embedded
//! in several response messages.

/// A single-byte status code sent back to a client in response to a
/// request, or standalone as a `STATUS` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// The request succeeded.
    Ok,
    /// The request succeeded and document contents follow as one or more
    /// `SYNC_MULTIBYTE` messages.
    OkContentsFollowing,
    /// `DOC_CREATE` failed because the name is already in use.
    DocAlreadyExist,
    /// The referenced document does not exist.
    DocNotExist,
    /// `DOC_SAVE` succeeded.
    DocSaved,
    /// The credential store failed for a reason other than bad credentials.
    DbError,
    /// A filesystem operation failed.
    IoError,
    /// `USER_LOGIN` referenced a name with no matching account.
    UserNotExist,
    /// `USER_LOGIN` referenced a name whose password hash didn't match.
    UserWrongPassword,
    /// A sync operation was attempted with no active document.
    UserNoActiveDoc,
    /// A sync-by-cursor operation was attempted while the cursor is unknown
    /// (-1).
    UserCursorUnknown,
    /// A position fell outside `[0, document.length]`.
    UserCursorOutOfBounds,
    /// A deletion's `position + length` exceeded the document length.
    UserLengthTooLong,
    /// Generic failure with no more specific code.
    NotOk,
}

impl StatusCode {
    /// Encode this status as its wire byte.
    pub fn to_byte(self) -> u8 {
        match self {
            StatusCode::Ok => 0,
            StatusCode::OkContentsFollowing => 1,
            StatusCode::DocAlreadyExist => 2,
            StatusCode::DocNotExist => 3,
            StatusCode::DocSaved => 4,
            StatusCode::DbError => 5,
            StatusCode::IoError => 6,
            StatusCode::UserNotExist => 7,
            StatusCode::UserWrongPassword => 8,
            StatusCode::UserNoActiveDoc => 9,
            StatusCode::UserCursorUnknown => 10,
            StatusCode::UserCursorOutOfBounds => 11,
            StatusCode::UserLengthTooLong => 12,
            StatusCode::NotOk => 13,
        }
    }

    /// Decode a status byte. Unknown bytes decode as [`StatusCode::NotOk`]
    /// rather than failing — status is never the first byte of a message,
    /// so a garbled value here cannot desynchronize the stream the way an
    /// unknown message type would.
    pub fn from_byte(byte: u8) -> StatusCode {
        match byte {
            0 => StatusCode::Ok,
            1 => StatusCode::OkContentsFollowing,
            2 => StatusCode::DocAlreadyExist,
            3 => StatusCode::DocNotExist,
            4 => StatusCode::DocSaved,
            5 => StatusCode::DbError,
            6 => StatusCode::IoError,
            7 => StatusCode::UserNotExist,
            8 => StatusCode::UserWrongPassword,
            9 => StatusCode::UserNoActiveDoc,
            10 => StatusCode::UserCursorUnknown,
            11 => StatusCode::UserCursorOutOfBounds,
            12 => StatusCode::UserLengthTooLong,
            _ => StatusCode::NotOk,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_variant() {
        let all = [
            StatusCode::Ok,
            StatusCode::OkContentsFollowing,
            StatusCode::DocAlreadyExist,
            StatusCode::DocNotExist,
            StatusCode::DocSaved,
            StatusCode::DbError,
            StatusCode::IoError,
            StatusCode::UserNotExist,
            StatusCode::UserWrongPassword,
            StatusCode::UserNoActiveDoc,
            StatusCode::UserCursorUnknown,
            StatusCode::UserCursorOutOfBounds,
            StatusCode::UserLengthTooLong,
            StatusCode::NotOk,
        ];
        for status in all {
            assert_eq!(StatusCode::from_byte(status.to_byte()), status);
        }
    }
}
