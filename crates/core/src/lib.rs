//! Core logic of the chat client: the conversation model, the stream
//! pipeline and the session driver.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

pub mod conversation;
mod error;
mod query_client;
mod reader;
mod session;

pub use conversation::{
    Conversation, Message, MessageId, Role, TurnId, TurnState,
};
pub use error::TurnError;
pub use ragchat_protocol::{FrameOptions, ProtocolEvent};
pub use reader::StreamReader;
pub use session::{Session, SessionBuilder, SessionSnapshot};
