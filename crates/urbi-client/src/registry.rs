//! Tag registry mapping correlation tags to callbacks.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::Message;

/// Tag reserved for the wildcard callback.
pub const WILDCARD_TAG: &str = "";

/// Error a callback may report; it is logged and otherwise ignored.
pub type CallbackError = Box<dyn Error + Send + Sync>;

/// What the receive loop does with a callback after it ran.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CallbackAction {
    /// Keep the registration for later messages.
    #[default]
    Continue,
    /// Unregister this callback; later messages for its tag fall through to
    /// the wildcard, if any.
    Remove,
}

/// Outcome of a callback invocation. An error keeps the registration.
pub type CallbackResult = Result<CallbackAction, CallbackError>;

/// Behaviour invoked with each message routed to it.
///
/// Callbacks run on the receive loop thread, one at a time and in stream
/// order. A slow callback delays the dispatch of every later message.
pub trait Callback: Send + Sync + 'static {
    /// Handles one message.
    ///
    /// # Errors
    ///
    /// Any error is logged by the receive loop, which then moves on.
    fn on_message(&self, message: &Message) -> CallbackResult;
}

impl<F> Callback for F
where
    F: Fn(&Message) -> CallbackResult + Send + Sync + 'static,
{
    fn on_message(&self, message: &Message) -> CallbackResult {
        self(message)
    }
}

#[derive(Default)]
struct Entries {
    exact: HashMap<String, Arc<dyn Callback>>,
    wildcard: Option<Arc<dyn Callback>>,
}

/// Thread-safe table of callbacks keyed by tag, plus a wildcard slot.
///
/// Registrations survive any number of dispatches. They end when replaced by
/// a later registration for the same tag, when removed explicitly, or when
/// the callback answers [`CallbackAction::Remove`].
#[derive(Default)]
pub struct TagRegistry {
    entries: Mutex<Entries>,
}

impl TagRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` for `tag`, replacing any previous registration.
    ///
    /// The empty tag addresses the wildcard slot.
    pub fn register(&self, tag: impl Into<String>, callback: Arc<dyn Callback>) {
        let tag = tag.into();
        let mut entries = self.lock();
        if tag == WILDCARD_TAG {
            entries.wildcard = Some(callback);
        } else {
            entries.exact.insert(tag, callback);
        }
    }

    /// Registers the wildcard callback, replacing any previous one.
    pub fn register_wildcard(&self, callback: Arc<dyn Callback>) {
        self.lock().wildcard = Some(callback);
    }

    /// Removes the callback registered for `tag`. Returns whether one existed.
    pub fn remove(&self, tag: &str) -> bool {
        let mut entries = self.lock();
        if tag == WILDCARD_TAG {
            return entries.wildcard.take().is_some();
        }
        entries.exact.remove(tag).is_some()
    }

    /// Removes the wildcard callback. Returns whether one existed.
    pub fn clear_wildcard(&self) -> bool {
        self.lock().wildcard.take().is_some()
    }

    /// Removes the registration that [`TagRegistry::resolve`] returned for
    /// `tag`, provided it is still `callback`.
    ///
    /// A registration replaced in the meantime is left alone. Returns whether
    /// anything was removed.
    pub fn remove_resolved(&self, tag: Option<&str>, callback: &Arc<dyn Callback>) -> bool {
        let mut entries = self.lock();
        if let Some(tag) = tag {
            if entries
                .exact
                .get(tag)
                .is_some_and(|current| same_callback(current, callback))
            {
                entries.exact.remove(tag);
                return true;
            }
            if entries.exact.contains_key(tag) {
                return false;
            }
        }
        if entries
            .wildcard
            .as_ref()
            .is_some_and(|current| same_callback(current, callback))
        {
            entries.wildcard = None;
            return true;
        }
        false
    }

    /// Drops every registration, the wildcard included.
    ///
    /// The callbacks are released after the lock, so dropping one may
    /// re-enter the registry.
    pub fn clear(&self) {
        let released = std::mem::take(&mut *self.lock());
        drop(released);
    }

    /// Resolves the callback for a message tag.
    ///
    /// An exact registration wins; otherwise the wildcard applies, including
    /// for untagged messages. `None` means the message is dropped.
    #[must_use]
    pub fn resolve(&self, tag: Option<&str>) -> Option<Arc<dyn Callback>> {
        let entries = self.lock();
        tag.and_then(|tag| entries.exact.get(tag))
            .or(entries.wildcard.as_ref())
            .map(Arc::clone)
    }

    /// Number of registrations, counting the wildcard slot when filled.
    #[must_use]
    pub fn len(&self) -> usize {
        let entries = self.lock();
        entries.exact.len() + usize::from(entries.wildcard.is_some())
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        // Callbacks never run under this lock, so poisoning only means a
        // panic elsewhere; the map itself is still consistent.
        self.entries
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

fn same_callback(left: &Arc<dyn Callback>, right: &Arc<dyn Callback>) -> bool {
    // Compare data pointers only; vtable pointers are not unique.
    Arc::as_ptr(left).cast::<()>() == Arc::as_ptr(right).cast::<()>()
}

impl fmt::Debug for TagRegistry {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.lock();
        let mut tags: Vec<&str> = entries.exact.keys().map(String::as_str).collect();
        tags.sort_unstable();
        formatter
            .debug_struct("TagRegistry")
            .field("tags", &tags)
            .field("wildcard", &entries.wildcard.is_some())
            .finish()
    }
}
