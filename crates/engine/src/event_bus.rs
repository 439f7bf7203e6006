// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event bus for fleet-wide notifications.
//!
//! A synchronous fan-out dispatcher keyed by [`EventKind`]. Subscribers
//! run in registration order; a panicking subscriber is logged and does
//! not prevent the others from running. Emission is synchronous for
//! determinism under test.

use drover_core::{Event, EventKind};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::error;

type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

/// Handle for removing a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Clone)]
struct Subscriber {
    id: SubscriptionId,
    handler: Handler,
}

#[derive(Default)]
struct BusState {
    next_id: u64,
    by_kind: HashMap<EventKind, Vec<Subscriber>>,
    any: Vec<Subscriber>,
}

/// Synchronous pub-sub bus.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<BusState>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to one event kind.
    pub fn on(
        &self,
        kind: EventKind,
        handler: impl Fn(&Event) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let mut state = self.inner.lock();
        let id = SubscriptionId(state.next_id);
        state.next_id += 1;
        state.by_kind.entry(kind).or_default().push(Subscriber {
            id,
            handler: Arc::new(handler),
        });
        id
    }

    /// Subscribe to every event.
    pub fn on_any(&self, handler: impl Fn(&Event) + Send + Sync + 'static) -> SubscriptionId {
        let mut state = self.inner.lock();
        let id = SubscriptionId(state.next_id);
        state.next_id += 1;
        state.any.push(Subscriber {
            id,
            handler: Arc::new(handler),
        });
        id
    }

    /// Remove a subscription. Returns whether it existed.
    pub fn off(&self, id: SubscriptionId) -> bool {
        let mut state = self.inner.lock();
        let mut removed = false;
        for subscribers in state.by_kind.values_mut() {
            let before = subscribers.len();
            subscribers.retain(|s| s.id != id);
            removed |= subscribers.len() != before;
        }
        let before = state.any.len();
        state.any.retain(|s| s.id != id);
        removed | (state.any.len() != before)
    }

    /// Emit an event to all matching subscribers, synchronously.
    ///
    /// The subscriber list is snapshotted before dispatch, so handlers may
    /// subscribe/unsubscribe (or emit) without deadlocking.
    pub fn emit(&self, event: &Event) {
        let mut subscribers: Vec<Subscriber> = {
            let state = self.inner.lock();
            let mut all = Vec::new();
            if let Some(for_kind) = state.by_kind.get(&event.kind()) {
                all.extend(for_kind.iter().cloned());
            }
            all.extend(state.any.iter().cloned());
            all
        };
        // Registration order across kind-specific and catch-all subscribers
        subscribers.sort_by_key(|s| s.id.0);

        for subscriber in subscribers {
            let handler = subscriber.handler;
            if catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
                error!(event = %event.kind(), "event subscriber panicked");
            }
        }
    }

    /// Number of live subscriptions (for diagnostics).
    pub fn subscriber_count(&self) -> usize {
        let state = self.inner.lock();
        state.by_kind.values().map(Vec::len).sum::<usize>() + state.any.len()
    }
}

#[cfg(test)]
#[path = "event_bus_tests.rs"]
mod tests;
