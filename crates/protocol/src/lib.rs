//! Wire-level pieces of the answer stream.
//!
//! The upstream service streams an answer as line-framed text. This crate
//! turns raw bytes into text ([`Utf8Decoder`]) and text into discrete
//! [`ProtocolEvent`]s ([`FrameParser`]). Both are incremental: they keep
//! carry-over state between calls, so input may be split at any byte.
//!
//! Nothing here performs I/O.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod decoder;
mod event;
mod frame;

pub use decoder::{DecodeError, Utf8Decoder};
pub use event::ProtocolEvent;
pub use frame::{Events, FrameOptions, FrameParser};
