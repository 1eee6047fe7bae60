//! Registry of live containers.
//!
//! Tracks which containers are alive, their [`VisibilityState`], and which
//! one was activated most recently. Holds [`Weak`] references only; the host
//! owns its containers. The registry performs no I/O: callers issue the
//! matching bridge calls around each mutation.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use indexmap::IndexSet;

use crate::container::{ContainerHandle, VisibilityState};

struct Entry {
	handle: Weak<dyn ContainerHandle>,
	state: VisibilityState,
}

/// Registry of containers keyed by unique id.
#[derive(Default)]
pub struct ContainerRegistry {
	containers: HashMap<String, Entry>,
	/// Registered ids in activation order; the last one is the top container.
	activation: IndexSet<String>,
}

impl ContainerRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a container in the `Created` state.
	///
	/// Re-registering an id replaces the previous mapping. Returns `true` when
	/// the id was not registered before.
	pub fn add_container(&mut self, container: &Arc<dyn ContainerHandle>) -> bool {
		let entry = Entry {
			handle: Arc::downgrade(container),
			state: VisibilityState::Created,
		};
		self.containers
			.insert(container.unique_id().to_string(), entry)
			.is_none()
	}

	/// Marks a registered container `Appeared` and makes it the top container.
	///
	/// Returns `false` (and changes nothing) for an unregistered id.
	pub fn activate_container(&mut self, unique_id: &str) -> bool {
		let Some(entry) = self.containers.get_mut(unique_id) else {
			tracing::debug!(unique_id, "Activation of unregistered container ignored");
			return false;
		};
		entry.state = VisibilityState::Appeared;
		self.activation.shift_remove(unique_id);
		self.activation.insert(unique_id.to_string());
		true
	}

	/// Marks a registered container `Disappeared`. It stays registered.
	pub fn mark_disappeared(&mut self, unique_id: &str) -> bool {
		match self.containers.get_mut(unique_id) {
			Some(entry) => {
				entry.state = VisibilityState::Disappeared;
				true
			}
			None => false,
		}
	}

	/// Removes a container. Absent ids are a no-op.
	///
	/// Returns `true` when an entry was removed.
	pub fn remove_container(&mut self, unique_id: &str) -> bool {
		self.activation.shift_remove(unique_id);
		self.containers.remove(unique_id).is_some()
	}

	/// Looks up a live container by id.
	pub fn find_container_by_id(&self, unique_id: &str) -> Option<Arc<dyn ContainerHandle>> {
		self.containers
			.get(unique_id)
			.and_then(|entry| entry.handle.upgrade())
	}

	/// The most recently activated container that is still registered and alive.
	pub fn top_container(&self) -> Option<Arc<dyn ContainerHandle>> {
		self.activation
			.iter()
			.rev()
			.find_map(|id| self.find_container_by_id(id))
	}

	/// Visibility of a registered container, `None` once it was removed.
	pub fn visibility(&self, unique_id: &str) -> Option<VisibilityState> {
		self.containers.get(unique_id).map(|entry| entry.state)
	}

	pub fn contains(&self, unique_id: &str) -> bool {
		self.containers.contains_key(unique_id)
	}

	/// Number of registered containers.
	pub fn size(&self) -> usize {
		self.containers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.containers.is_empty()
	}
}

impl std::fmt::Debug for ContainerRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ContainerRegistry")
			.field("size", &self.containers.len())
			.field("activation", &self.activation)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::TestContainer;

	fn container(id: &str, page: &str) -> Arc<dyn ContainerHandle> {
		TestContainer::new(id, page)
	}

	#[test]
	fn test_add_and_remove_track_size() {
		let mut registry = ContainerRegistry::new();
		let a = container("A", "/home");
		let b = container("B", "/detail");

		assert!(registry.add_container(&a));
		assert!(registry.add_container(&b));
		assert_eq!(registry.size(), 2);
		assert_eq!(registry.visibility("A"), Some(VisibilityState::Created));

		assert!(registry.remove_container("A"));
		assert_eq!(registry.size(), 1);
		assert!(!registry.contains("A"));

		assert!(!registry.remove_container("A"));
		assert!(!registry.remove_container("missing"));
		assert_eq!(registry.size(), 1);
	}

	#[test]
	fn test_re_add_replaces_mapping() {
		let mut registry = ContainerRegistry::new();
		let first = container("A", "/home");
		let second = container("A", "/profile");

		assert!(registry.add_container(&first));
		assert!(!registry.add_container(&second));
		assert_eq!(registry.size(), 1);

		let found = registry.find_container_by_id("A").unwrap();
		assert_eq!(found.page_name(), "/profile");
	}

	#[test]
	fn test_top_container_follows_activation() {
		let mut registry = ContainerRegistry::new();
		let a = container("A", "/home");
		let b = container("B", "/detail");
		registry.add_container(&a);
		registry.add_container(&b);

		assert!(registry.top_container().is_none());

		registry.activate_container("A");
		assert_eq!(registry.top_container().unwrap().unique_id(), "A");

		registry.activate_container("B");
		assert_eq!(registry.top_container().unwrap().unique_id(), "B");
		// A stays Appeared, but only the most recent activation counts as top.
		assert_eq!(registry.visibility("A"), Some(VisibilityState::Appeared));

		registry.activate_container("A");
		assert_eq!(registry.top_container().unwrap().unique_id(), "A");

		registry.remove_container("A");
		assert_eq!(registry.top_container().unwrap().unique_id(), "B");

		registry.remove_container("B");
		assert!(registry.top_container().is_none());
	}

	#[test]
	fn test_activate_unregistered_is_ignored() {
		let mut registry = ContainerRegistry::new();
		assert!(!registry.activate_container("ghost"));
		assert!(registry.top_container().is_none());
		assert_eq!(registry.size(), 0);
	}

	#[test]
	fn test_disappeared_stays_registered() {
		let mut registry = ContainerRegistry::new();
		let a = container("A", "/home");
		registry.add_container(&a);
		registry.activate_container("A");

		assert!(registry.mark_disappeared("A"));
		assert_eq!(registry.visibility("A"), Some(VisibilityState::Disappeared));
		assert_eq!(registry.size(), 1);
		assert!(!registry.mark_disappeared("missing"));
	}

	#[test]
	fn test_registry_does_not_own_containers() {
		let mut registry = ContainerRegistry::new();
		let a = container("A", "/home");
		registry.add_container(&a);
		registry.activate_container("A");

		drop(a);
		assert!(registry.find_container_by_id("A").is_none());
		assert!(registry.top_container().is_none());
		// Bookkeeping is only cleared by an explicit removal.
		assert_eq!(registry.size(), 1);
	}
}
