//! Host-owned containers hosting one embedded page each.

use boost_protocol::Arguments;

/// A host surface hosting one embedded page.
///
/// Implemented by the host's screen types. The bridge only keeps weak
/// references; the host owns the container for its whole lifetime.
pub trait ContainerHandle: Send + Sync {
	/// Stable identity, unique for the container's lifetime.
	fn unique_id(&self) -> &str;

	/// Route identifier shown inside the embedded runtime.
	fn page_name(&self) -> &str;

	/// Navigation arguments the page was opened with.
	fn params(&self) -> Arguments;

	/// Closes the container, handing `result` back to whoever opened it.
	fn finish_container(&self, result: Arguments);
}

/// Visibility of a registered container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisibilityState {
	Created,
	/// The active, visible surface
	Appeared,
	/// Superseded or paused; may appear again
	Disappeared,
	/// Torn down and removed from the registry
	Destroyed,
}
