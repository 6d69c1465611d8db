//! Client protocol core for remote Urbi servers.
//!
//! A [`Client`] owns one duplex stream to a line-oriented command interpreter.
//! Commands go out as single lines, optionally prefixed with a caller-chosen
//! correlation tag (`"<tag>: <command>\n"`). Replies arrive asynchronously on
//! a background receive loop, which splits each line into a [`Message`] and
//! hands it to the [`Callback`] registered for its tag in the [`TagRegistry`],
//! falling back to the wildcard callback.
//!
//! The server is treated as an opaque line-based peer: nothing here
//! interprets the command language, and the absence of a reply is never an
//! error.

mod client;
mod errors;
mod message;
mod receiver;
mod registry;
mod sender;
mod transport;

pub use client::{Client, ConnectionStatus, FRESH_TAG_PREFIX};
pub use errors::{ClientError, ReadError};
pub use message::{Message, TAG_SEPARATOR};
pub use receiver::LoopState;
pub use registry::{
    Callback, CallbackAction, CallbackError, CallbackResult, TagRegistry, WILDCARD_TAG,
};
pub use sender::format_command;

const TRANSPORT_TARGET: &str = "urbi_client::transport";
const SEND_TARGET: &str = "urbi_client::send";
const RECEIVE_TARGET: &str = "urbi_client::receive";
const CLIENT_TARGET: &str = "urbi_client::client";

#[cfg(test)]
mod tests;
