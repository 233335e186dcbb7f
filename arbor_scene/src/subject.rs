// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Change notification: subjects, listeners, and the events they carry.
//!
//! Every authored object owns a [`Subject`]. Observers register a weak [`Listener`]
//! together with a [`Payload`] (typically a packed tree index) and receive every
//! [`ObjectEvent`] the object emits, tagged with that payload.
//!
//! The subject's lock is only held while the subscription list is copied or edited;
//! listeners are always called without it, so a listener may attach or detach
//! from inside a notification.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::node::Hints;

/// Opaque value handed back to a listener with every notification.
pub type Payload = u64;

/// A change emitted by an authored object.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ObjectEvent {
    /// Hints or traversal mask changed. Carries the new values.
    AttributesChanged {
        /// New local hints.
        hints: Hints,
        /// New local traversal mask.
        traversal_mask: u32,
    },
    /// The local matrix of a transform or the parameters of a billboard changed.
    TransformChanged,
    /// A switch selected a different child.
    ActiveChildChanged,
    /// A scene replaced its root node.
    RootChanged,
}

/// Receiver of [`ObjectEvent`]s.
///
/// Notifications may arrive on any thread; implementations should only record the
/// event and return.
pub trait Listener: Send + Sync {
    /// Called once per event for every subscription of this listener.
    fn on_notify(&self, event: &ObjectEvent, payload: Payload);
}

#[derive(Clone)]
struct Subscription {
    listener: Weak<dyn Listener>,
    payload: Payload,
}

/// Subscription list of an authored object.
#[derive(Default)]
pub struct Subject {
    subscriptions: Mutex<Vec<Subscription>>,
}

impl core::fmt::Debug for Subject {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Subject")
            .field("subscriptions", &self.subscriptions.lock().len())
            .finish_non_exhaustive()
    }
}

impl Subject {
    /// Create a subject with no subscriptions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `listener`; it will be called with `payload` for every event.
    pub fn attach(&self, listener: Weak<dyn Listener>, payload: Payload) {
        self.subscriptions
            .lock()
            .push(Subscription { listener, payload });
    }

    /// Remove the subscription of `listener` with `payload`. Returns true if one was found.
    pub fn detach(&self, listener: &Weak<dyn Listener>, payload: Payload) -> bool {
        let mut subs = self.subscriptions.lock();
        let before = subs.len();
        subs.retain(|s| !(s.payload == payload && Weak::ptr_eq(&s.listener, listener)));
        subs.len() != before
    }

    /// Number of subscriptions whose listener is still alive.
    pub fn listener_count(&self) -> usize {
        self.subscriptions
            .lock()
            .iter()
            .filter(|s| s.listener.strong_count() > 0)
            .count()
    }

    /// Deliver `event` to every live subscription. Dead listeners are dropped.
    pub fn notify(&self, event: &ObjectEvent) {
        let live: Vec<(Arc<dyn Listener>, Payload)> = {
            let mut subs = self.subscriptions.lock();
            subs.retain(|s| s.listener.strong_count() > 0);
            subs.iter()
                .filter_map(|s| Some((s.listener.upgrade()?, s.payload)))
                .collect()
        };
        for (listener, payload) in live {
            listener.on_notify(event, payload);
        }
    }
}
