//! Wire protocol: message types, status codes, and the codec between them
//! and raw bytes.

pub mod codec;
pub mod message;
pub mod status;

pub use codec::{encode, read_message, read_server_message, write_message};
pub use message::{Hash, Message, MessageType};
pub use status::StatusCode;
