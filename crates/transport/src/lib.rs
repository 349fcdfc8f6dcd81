//! The boundary between the conversation core and the network.
//!
//! This crate only describes how a query is sent and what comes back: a
//! stream of raw byte chunks, or an error. Implementations live in their
//! own crates, so the core can be driven by a real HTTP client as well as
//! by scripted transports in tests.

#![deny(missing_docs)]

mod error;
mod request;
mod transport;

pub use error::*;
pub use request::*;
pub use transport::*;
