//! # mlt_events - Named-Slot Event Hub
//!
//! Slots are declared by name together with the shape of call they carry
//! (a [`Transmitter`]). Listeners attach to a slot with a callback of the
//! matching shape and are invoked in registration order when it fires.
//!
//! Two shapes cover the object-creation protocol:
//! - **Request**: `(service, input, &mut Option<T>)`; a listener may supply the object
//! - **Done**: `(service, input, Option<&T>)`; observation only
//!
//! Firing an unknown slot, a slot without listeners, or a closed hub is a no-op.

use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Result type for hub operations
pub type Result<T> = std::result::Result<T, EventError>;

/// Errors from listener registration
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventError {
    /// Slot was never registered
    #[error("Event slot '{0}' is not registered")]
    UnknownSlot(String),

    /// Listener shape does not match the slot's transmitter
    #[error("Event slot '{slot}' carries {expected} calls, not {found}")]
    ShapeMismatch {
        slot: String,
        expected: Transmitter,
        found: Transmitter,
    },

    /// Hub has been closed
    #[error("Event hub is closed")]
    Closed,
}

/// Shape of the call a slot carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transmitter {
    /// `(service, input, &mut Option<T>)`
    Request,
    /// `(service, input, Option<&T>)`
    Done,
}

impl fmt::Display for Transmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transmitter::Request => write!(f, "request"),
            Transmitter::Done => write!(f, "done"),
        }
    }
}

/// Listener offered the chance to supply an object
pub type RequestListener<T> =
    Box<dyn Fn(Option<&str>, Option<&str>, &mut Option<T>) + Send + Sync>;

/// Listener told about the outcome of a creation
pub type DoneListener<T> = Box<dyn Fn(Option<&str>, Option<&str>, Option<&T>) + Send + Sync>;

/// Listener ID
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

enum Callback<T> {
    Request(RequestListener<T>),
    Done(DoneListener<T>),
}

impl<T> Callback<T> {
    fn transmitter(&self) -> Transmitter {
        match self {
            Callback::Request(_) => Transmitter::Request,
            Callback::Done(_) => Transmitter::Done,
        }
    }
}

struct Listener<T> {
    id: ListenerId,
    blocked: bool,
    callback: Callback<T>,
}

struct Slot<T> {
    transmitter: Transmitter,
    listeners: Vec<Listener<T>>,
}

/// Event hub with named slots
pub struct EventHub<T> {
    slots: HashMap<String, Slot<T>>,
    next_listener_id: u64,
    closed: bool,
}

impl<T> EventHub<T> {
    /// Create a new hub
    pub fn new() -> Self {
        Self {
            slots: HashMap::new(),
            next_listener_id: 1,
            closed: false,
        }
    }

    /// Declare a slot and the shape of call it carries
    pub fn register(&mut self, slot: &str, transmitter: Transmitter) {
        if self.closed {
            log::warn!("Ignoring registration of '{}' on a closed event hub", slot);
            return;
        }

        if let Some(existing) = self.slots.get(slot) {
            if existing.transmitter == transmitter {
                return;
            }
            log::warn!(
                "Event slot '{}' changed from {} to {}; dropping {} listener(s)",
                slot,
                existing.transmitter,
                transmitter,
                existing.listeners.len()
            );
        }

        self.slots.insert(
            slot.to_string(),
            Slot {
                transmitter,
                listeners: Vec::new(),
            },
        );
    }

    /// Check if a slot is registered
    pub fn is_registered(&self, slot: &str) -> bool {
        self.slots.contains_key(slot)
    }

    /// Transmitter of a registered slot
    pub fn transmitter(&self, slot: &str) -> Option<Transmitter> {
        self.slots.get(slot).map(|s| s.transmitter)
    }

    fn attach(&mut self, slot: &str, callback: Callback<T>) -> Result<ListenerId> {
        if self.closed {
            return Err(EventError::Closed);
        }

        let entry = self
            .slots
            .get_mut(slot)
            .ok_or_else(|| EventError::UnknownSlot(slot.to_string()))?;

        let found = callback.transmitter();
        if entry.transmitter != found {
            return Err(EventError::ShapeMismatch {
                slot: slot.to_string(),
                expected: entry.transmitter,
                found,
            });
        }

        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;

        entry.listeners.push(Listener {
            id,
            blocked: false,
            callback,
        });

        log::debug!("Listener {} attached to '{}'", id.0, slot);
        Ok(id)
    }

    /// Listen on a request-shaped slot
    pub fn listen_request<F>(&mut self, slot: &str, listener: F) -> Result<ListenerId>
    where
        F: Fn(Option<&str>, Option<&str>, &mut Option<T>) + Send + Sync + 'static,
    {
        self.attach(slot, Callback::Request(Box::new(listener)))
    }

    /// Listen on a done-shaped slot
    pub fn listen_done<F>(&mut self, slot: &str, listener: F) -> Result<ListenerId>
    where
        F: Fn(Option<&str>, Option<&str>, Option<&T>) + Send + Sync + 'static,
    {
        self.attach(slot, Callback::Done(Box::new(listener)))
    }

    fn listener_mut(&mut self, id: ListenerId) -> Option<&mut Listener<T>> {
        self.slots
            .values_mut()
            .flat_map(|s| s.listeners.iter_mut())
            .find(|l| l.id == id)
    }

    /// Suspend a listener without removing it
    pub fn block(&mut self, id: ListenerId) -> bool {
        self.listener_mut(id).map(|l| l.blocked = true).is_some()
    }

    /// Resume a blocked listener
    pub fn unblock(&mut self, id: ListenerId) -> bool {
        self.listener_mut(id).map(|l| l.blocked = false).is_some()
    }

    /// Remove a listener
    pub fn disconnect(&mut self, id: ListenerId) -> bool {
        let mut removed = false;
        for slot in self.slots.values_mut() {
            let before = slot.listeners.len();
            slot.listeners.retain(|l| l.id != id);
            removed |= slot.listeners.len() != before;
        }
        removed
    }

    /// Number of listeners on a slot (blocked ones included)
    pub fn listener_count(&self, slot: &str) -> usize {
        self.slots.get(slot).map_or(0, |s| s.listeners.len())
    }

    fn active(&self, slot: &str, shape: Transmitter) -> Option<impl Iterator<Item = &Callback<T>>> {
        let entry = self.slots.get(slot)?;
        if entry.transmitter != shape {
            log::warn!(
                "Fired {} call on '{}', which carries {} calls",
                shape,
                slot,
                entry.transmitter
            );
            return None;
        }
        Some(
            entry
                .listeners
                .iter()
                .filter(|l| !l.blocked)
                .map(|l| &l.callback),
        )
    }

    /// Fire a request-shaped slot. Every listener sees (and may fill) `out`
    pub fn fire_request(
        &self,
        slot: &str,
        service: Option<&str>,
        input: Option<&str>,
        out: &mut Option<T>,
    ) {
        let Some(listeners) = self.active(slot, Transmitter::Request) else {
            return;
        };
        for callback in listeners {
            if let Callback::Request(f) = callback {
                f(service, input, out);
            }
        }
    }

    /// Fire a done-shaped slot
    pub fn fire_done(
        &self,
        slot: &str,
        service: Option<&str>,
        input: Option<&str>,
        created: Option<&T>,
    ) {
        let Some(listeners) = self.active(slot, Transmitter::Done) else {
            return;
        };
        for callback in listeners {
            if let Callback::Done(f) = callback {
                f(service, input, created);
            }
        }
    }

    /// Drop every slot and listener; later fires are no-ops
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.slots.clear();
        self.closed = true;
    }

    /// Check whether the hub was closed
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl<T> Default for EventHub<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for EventHub<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHub")
            .field("slots", &self.slots.len())
            .field("closed", &self.closed)
            .finish()
    }
}

/// Prelude
pub mod prelude {
    pub use crate::{EventError, EventHub, ListenerId, Transmitter};
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn hub() -> EventHub<String> {
        let mut hub = EventHub::new();
        hub.register("thing-create-request", Transmitter::Request);
        hub.register("thing-create-done", Transmitter::Done);
        hub
    }

    #[test]
    fn test_request_supplies_object() {
        let mut hub = hub();
        hub.listen_request("thing-create-request", |service, _, out| {
            if service == Some("magic") {
                *out = Some("made by listener".to_string());
            }
        })
        .unwrap();

        let mut out = None;
        hub.fire_request("thing-create-request", Some("plain"), None, &mut out);
        assert!(out.is_none());

        hub.fire_request("thing-create-request", Some("magic"), None, &mut out);
        assert_eq!(out.as_deref(), Some("made by listener"));
    }

    #[test]
    fn test_fire_without_listeners_is_noop() {
        let hub = hub();
        let mut out = None;
        hub.fire_request("thing-create-request", None, None, &mut out);
        hub.fire_request("never-registered", None, None, &mut out);
        hub.fire_done("thing-create-done", None, None, None);
        assert!(out.is_none());
    }

    #[test]
    fn test_multiple_listeners_in_order() {
        let mut hub = hub();
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

        for tag in ["first", "second"] {
            let o = order.clone();
            hub.listen_done("thing-create-done", move |_, _, created| {
                o.lock().push((tag, created.cloned()));
            })
            .unwrap();
        }

        let made = "obj".to_string();
        hub.fire_done("thing-create-done", Some("svc"), None, Some(&made));

        let seen = order.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], ("first", Some("obj".to_string())));
        assert_eq!(seen[1].0, "second");
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let mut hub = hub();
        let err = hub
            .listen_done("thing-create-request", |_, _, _| {})
            .unwrap_err();
        assert!(matches!(err, EventError::ShapeMismatch { .. }));

        let err = hub.listen_request("nope", |_, _, _| {}).unwrap_err();
        assert_eq!(err, EventError::UnknownSlot("nope".into()));
    }

    #[test]
    fn test_block_and_disconnect() {
        let mut hub = hub();
        let counter = Arc::new(AtomicU32::new(0));
        let c = counter.clone();
        let id = hub
            .listen_done("thing-create-done", move |_, _, _| {
                c.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        hub.fire_done("thing-create-done", None, None, None);
        assert!(hub.block(id));
        hub.fire_done("thing-create-done", None, None, None);
        assert!(hub.unblock(id));
        hub.fire_done("thing-create-done", None, None, None);
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        assert!(hub.disconnect(id));
        assert!(!hub.disconnect(id));
        assert_eq!(hub.listener_count("thing-create-done"), 0);
    }

    #[test]
    fn test_close() {
        let mut hub = hub();
        let counter = Arc::new(AtomicU32::new(0));
        let c = counter.clone();
        hub.listen_done("thing-create-done", move |_, _, _| {
            c.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        hub.close();
        hub.close();
        hub.fire_done("thing-create-done", None, None, None);

        assert!(hub.is_closed());
        assert!(!hub.is_registered("thing-create-done"));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(
            hub.listen_done("thing-create-done", |_, _, _| {}).unwrap_err(),
            EventError::Closed
        );
    }
}
