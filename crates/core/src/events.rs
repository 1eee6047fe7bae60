//! Keyed event fan-out for application-defined signals.
//!
//! Listeners subscribe to a string key and are invoked synchronously, in
//! registration order, whenever an event with that key is dispatched. Each
//! invocation is isolated: a panicking listener is logged and the remaining
//! listeners still run.
//!
//! [`EventBus::subscribe`] returns a [`ListenerRemover`] that removes exactly
//! the listener it was created for. Unlike a drop guard it must be invoked
//! explicitly; dropping it leaves the listener registered.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use boost_protocol::Arguments;
use indexmap::IndexMap;
use parking_lot::Mutex;

/// Unique identifier for a registered listener.
pub type ListenerId = u64;

/// Listener callback: `(key, arguments)`.
pub type EventListener = Arc<dyn Fn(&str, &Arguments) + Send + Sync>;

type ListenerTable = HashMap<String, IndexMap<ListenerId, EventListener>>;

/// Key → ordered listener list multiplexer.
#[derive(Default)]
pub struct EventBus {
	listeners: Arc<Mutex<ListenerTable>>,
	next_id: AtomicU64,
}

impl EventBus {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `listener` for `key`.
	pub fn subscribe<F>(&self, key: impl Into<String>, listener: F) -> ListenerRemover
	where
		F: Fn(&str, &Arguments) + Send + Sync + 'static,
	{
		let key = key.into();
		let id = self.next_id.fetch_add(1, Ordering::SeqCst);

		self.listeners
			.lock()
			.entry(key.clone())
			.or_default()
			.insert(id, Arc::new(listener));
		tracing::debug!(key = %key, id, "Event listener added");

		ListenerRemover {
			key,
			id,
			table: Arc::downgrade(&self.listeners),
		}
	}

	/// Invokes every listener currently registered for `key`.
	///
	/// `None` arguments are delivered as an empty map. Dispatching to a key
	/// with no listeners is a silent no-op. Returns how many listeners ran
	/// to completion.
	pub fn dispatch(&self, key: &str, arguments: Option<Arguments>) -> usize {
		let arguments = arguments.unwrap_or_default();

		// Snapshot so listeners may subscribe or unsubscribe while running.
		let listeners: Vec<(ListenerId, EventListener)> = match self.listeners.lock().get(key) {
			Some(map) => map.iter().map(|(id, l)| (*id, Arc::clone(l))).collect(),
			None => return 0,
		};

		let mut delivered = 0;
		for (id, listener) in listeners {
			match catch_unwind(AssertUnwindSafe(|| listener(key, &arguments))) {
				Ok(()) => delivered += 1,
				Err(panic) => {
					let reason = panic
						.downcast_ref::<&str>()
						.map(|s| s.to_string())
						.or_else(|| panic.downcast_ref::<String>().cloned())
						.unwrap_or_else(|| "<non-string panic>".to_string());
					tracing::error!(key, id, %reason, "Event listener panicked");
				}
			}
		}
		delivered
	}

	/// Number of listeners registered for `key`.
	pub fn listener_count(&self, key: &str) -> usize {
		self.listeners.lock().get(key).map_or(0, IndexMap::len)
	}
}

impl std::fmt::Debug for EventBus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let keys: Vec<String> = self.listeners.lock().keys().cloned().collect();
		f.debug_struct("EventBus").field("keys", &keys).finish()
	}
}

/// Capability removing one listener from an [`EventBus`].
///
/// Holds a weak reference to the listener table, so removing after the bus
/// is gone is a no-op. Calling [`remove`](Self::remove) more than once is
/// harmless and never affects other listeners.
pub struct ListenerRemover {
	key: String,
	id: ListenerId,
	table: Weak<Mutex<ListenerTable>>,
}

impl ListenerRemover {
	/// Removes the listener.
	pub fn remove(&self) {
		let Some(table) = self.table.upgrade() else {
			return;
		};
		let mut table = table.lock();
		if let Some(listeners) = table.get_mut(&self.key) {
			if listeners.shift_remove(&self.id).is_some() {
				tracing::debug!(key = %self.key, id = self.id, "Event listener removed");
			}
			if listeners.is_empty() {
				table.remove(&self.key);
			}
		}
	}

	pub fn key(&self) -> &str {
		&self.key
	}

	pub fn id(&self) -> ListenerId {
		self.id
	}
}

impl std::fmt::Debug for ListenerRemover {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ListenerRemover")
			.field("key", &self.key)
			.field("id", &self.id)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;
	use std::sync::atomic::AtomicUsize;

	fn args(value: serde_json::Value) -> Arguments {
		value.as_object().cloned().unwrap()
	}

	#[test]
	fn test_subscribe_then_dispatch_invokes_once() {
		let bus = EventBus::new();
		let seen = Arc::new(Mutex::new(Vec::new()));
		let seen_clone = Arc::clone(&seen);

		let _remover = bus.subscribe("cart", move |key, arguments| {
			seen_clone.lock().push((key.to_string(), arguments.clone()));
		});

		assert_eq!(bus.dispatch("cart", Some(args(json!({"count": 3})))), 1);

		let seen = seen.lock();
		assert_eq!(seen.len(), 1);
		assert_eq!(seen[0].0, "cart");
		assert_eq!(seen[0].1["count"], 3);
	}

	#[test]
	fn test_dispatch_in_registration_order() {
		let bus = EventBus::new();
		let order = Arc::new(Mutex::new(Vec::new()));

		for label in ["first", "second", "third"] {
			let order = Arc::clone(&order);
			let _ = bus.subscribe("tick", move |_, _| order.lock().push(label));
		}

		bus.dispatch("tick", None);
		assert_eq!(*order.lock(), ["first", "second", "third"]);
	}

	#[test]
	fn test_missing_arguments_become_empty_map() {
		let bus = EventBus::new();
		let empty = Arc::new(Mutex::new(None));
		let empty_clone = Arc::clone(&empty);

		let _remover = bus.subscribe("ping", move |_, arguments| {
			*empty_clone.lock() = Some(arguments.is_empty());
		});

		bus.dispatch("ping", None);
		assert_eq!(*empty.lock(), Some(true));
	}

	#[test]
	fn test_dispatch_without_listeners_is_noop() {
		let bus = EventBus::new();
		assert_eq!(bus.dispatch("nobody", Some(Arguments::new())), 0);
	}

	#[test]
	fn test_remover_is_idempotent_and_targeted() {
		let bus = EventBus::new();
		let a_calls = Arc::new(AtomicUsize::new(0));
		let b_calls = Arc::new(AtomicUsize::new(0));

		let a = {
			let a_calls = Arc::clone(&a_calls);
			bus.subscribe("evt", move |_, _| {
				a_calls.fetch_add(1, Ordering::SeqCst);
			})
		};
		let _b = {
			let b_calls = Arc::clone(&b_calls);
			bus.subscribe("evt", move |_, _| {
				b_calls.fetch_add(1, Ordering::SeqCst);
			})
		};

		a.remove();
		a.remove();
		assert_eq!(bus.listener_count("evt"), 1);

		bus.dispatch("evt", None);
		assert_eq!(a_calls.load(Ordering::SeqCst), 0);
		assert_eq!(b_calls.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn test_same_closure_registered_twice_removes_one() {
		let bus = EventBus::new();
		let calls = Arc::new(AtomicUsize::new(0));
		let listener = {
			let calls = Arc::clone(&calls);
			move |_: &str, _: &Arguments| {
				calls.fetch_add(1, Ordering::SeqCst);
			}
		};

		let first = bus.subscribe("evt", listener.clone());
		let _second = bus.subscribe("evt", listener);
		first.remove();

		bus.dispatch("evt", None);
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn test_dropping_remover_keeps_listener() {
		let bus = EventBus::new();
		drop(bus.subscribe("evt", |_, _| {}));
		assert_eq!(bus.listener_count("evt"), 1);
	}

	#[test]
	fn test_panicking_listener_is_isolated() {
		let bus = EventBus::new();
		let after = Arc::new(AtomicUsize::new(0));

		let _faulty = bus.subscribe("evt", |_, _| panic!("listener fault"));
		let _healthy = {
			let after = Arc::clone(&after);
			bus.subscribe("evt", move |_, _| {
				after.fetch_add(1, Ordering::SeqCst);
			})
		};

		assert_eq!(bus.dispatch("evt", None), 1);
		assert_eq!(after.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn test_remove_after_bus_dropped() {
		let bus = EventBus::new();
		let remover = bus.subscribe("evt", |_, _| {});
		drop(bus);
		remover.remove();
	}
}
