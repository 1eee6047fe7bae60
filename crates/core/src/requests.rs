//! Request codes correlating native pushes with their eventual results.
//!
//! Each embedded-initiated native navigation is assigned a fresh code. When
//! the host later reports a result for that code, the table yields the page
//! name the navigation targeted so the result can be routed back.

use indexmap::IndexMap;

/// Counter seed; the first allocated code is `REQUEST_CODE_BASE + 1`.
pub const REQUEST_CODE_BASE: i32 = 1000;

/// Outstanding entries kept before the oldest is evicted.
pub const MAX_PENDING_REQUESTS: usize = 256;

/// `requestCode → pageName` table with a monotonic code counter.
#[derive(Debug)]
pub struct RequestTable {
	last_code: i32,
	/// Insertion ordered, so index 0 is always the oldest entry.
	pending: IndexMap<i32, String>,
	capacity: usize,
}

impl Default for RequestTable {
	fn default() -> Self {
		Self::with_capacity(MAX_PENDING_REQUESTS)
	}
}

impl RequestTable {
	pub fn new() -> Self {
		Self::default()
	}

	/// A table that keeps at most `capacity` outstanding entries.
	pub fn with_capacity(capacity: usize) -> Self {
		Self {
			last_code: REQUEST_CODE_BASE,
			pending: IndexMap::new(),
			capacity: capacity.max(1),
		}
	}

	/// Records `page_name` under a fresh code and returns the code.
	///
	/// Codes are never reused within a run. When the table is full, the
	/// oldest unresolved entry is dropped.
	pub fn allocate(&mut self, page_name: impl Into<String>) -> i32 {
		self.last_code = match self.last_code.checked_add(1) {
			Some(code) => code,
			None => {
				tracing::warn!("Request code counter exhausted, wrapping");
				REQUEST_CODE_BASE + 1
			}
		};
		let code = self.last_code;

		if self.pending.len() >= self.capacity {
			if let Some((evicted, page_name)) = self.pending.shift_remove_index(0) {
				tracing::warn!(
					request_code = evicted,
					page_name = %page_name,
					capacity = self.capacity,
					"Pending request table full, evicting oldest entry"
				);
			}
		}

		let page_name = page_name.into();
		tracing::debug!(request_code = code, page_name = %page_name, "Request code allocated");
		self.pending.insert(code, page_name);
		code
	}

	/// Takes the page name recorded for `code`. A code resolves at most once.
	pub fn resolve(&mut self, code: i32) -> Option<String> {
		self.pending.shift_remove(&code)
	}

	/// Number of unresolved entries.
	pub fn len(&self) -> usize {
		self.pending.len()
	}

	pub fn is_empty(&self) -> bool {
		self.pending.is_empty()
	}
}
