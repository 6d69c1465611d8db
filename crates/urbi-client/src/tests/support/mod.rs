//! Shared helpers for client tests.

mod fake_server;

use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::{CallbackAction, CallbackResult, Client, Message};

pub(in crate::tests) use fake_server::{FakeServer, ServerPeer};

/// How long tests wait for an event that should happen promptly.
pub(in crate::tests) const EVENT_TIMEOUT: Duration = Duration::from_secs(2);

/// How long tests wait before concluding an event did not happen.
pub(in crate::tests) const QUIET_PERIOD: Duration = Duration::from_millis(150);

/// Receives the messages delivered to one callback.
pub(in crate::tests) struct Inbox {
    receiver: mpsc::Receiver<Message>,
}

impl Inbox {
    /// Waits for the next delivered message.
    pub fn next_message(&self) -> Result<Message> {
        self.receiver
            .recv_timeout(EVENT_TIMEOUT)
            .context("callback was not invoked in time")
    }

    /// Whether the callback feeding this inbox has been dropped.
    pub fn is_disconnected(&self) -> bool {
        matches!(
            self.receiver.try_recv(),
            Err(mpsc::TryRecvError::Disconnected)
        )
    }

    /// Asserts that nothing further is delivered for a short while.
    pub fn assert_quiet(&self) {
        if let Ok(message) = self.receiver.recv_timeout(QUIET_PERIOD) {
            panic!("unexpected delivery: {message:?}");
        }
    }
}

fn channel_callback(
    action: CallbackAction,
) -> (impl Fn(&Message) -> CallbackResult + Send + Sync + 'static, Inbox) {
    let (sender, receiver) = mpsc::channel();
    let callback = move |message: &Message| -> CallbackResult {
        sender.send(message.clone())?;
        Ok(action)
    };
    (callback, Inbox { receiver })
}

/// Registers a recording callback for `tag` and returns its inbox.
pub(in crate::tests) fn record_tag(client: &Client, tag: &str) -> Inbox {
    let (callback, inbox) = channel_callback(CallbackAction::Continue);
    client.set_callback(tag, callback);
    inbox
}

/// Registers a callback for `tag` that unregisters itself after one message.
pub(in crate::tests) fn record_tag_once(client: &Client, tag: &str) -> Inbox {
    let (callback, inbox) = channel_callback(CallbackAction::Remove);
    client.set_callback(tag, callback);
    inbox
}

/// Registers a recording wildcard callback and returns its inbox.
pub(in crate::tests) fn record_wildcard(client: &Client) -> Inbox {
    let (callback, inbox) = channel_callback(CallbackAction::Continue);
    client.set_wildcard_callback(callback);
    inbox
}

/// Connects a client to a fresh fake server and accepts the connection.
pub(in crate::tests) fn connected_pair() -> Result<(Client, ServerPeer)> {
    let server = FakeServer::bind()?;
    let client = Client::connect(&server.endpoint()).context("connect client")?;
    let peer = server.accept()?;
    Ok((client, peer))
}
