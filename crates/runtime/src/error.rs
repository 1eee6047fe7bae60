//! Error types for the route bridge runtime.

use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while routing calls across the boundary.
#[derive(Debug, Error)]
pub enum Error {
	/// The embedded runtime has not begun executing code.
	#[error(
		"The embedded runtime is not ready for use. The message would be dropped silently; check readiness first"
	)]
	NotReady,

	/// No message channel is attached yet (or it was detached).
	#[error("The bridge is not attached to a message channel yet")]
	NotAttached,

	/// A navigation call was issued before the host installed its delegate.
	#[error("No navigation delegate installed on the host")]
	MissingDelegate,

	/// A close request arrived without a container id.
	#[error("The unique id is missing")]
	MissingUniqueId,

	/// Manual foreground/background dispatch while automatic dispatch is active.
	#[error("Foreground/background override is disabled; enable it in the setup options first")]
	OverrideDisabled,

	/// Channel closed unexpectedly.
	#[error("Channel closed unexpectedly")]
	ChannelClosed,

	/// Protocol-level error (malformed or unexpected message).
	#[error("Protocol error: {0}")]
	ProtocolError(String),

	/// Error reported by the other side in reply to one of our calls.
	#[error("{name}: {message}")]
	Remote {
		/// Error name as reported by the remote side (e.g. "MissingDelegate")
		name: String,
		/// Human-readable error message
		message: String,
	},

	/// I/O error.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl Error {
	/// Stable name used when this error is reported across the channel.
	pub fn name(&self) -> &str {
		match self {
			Error::NotReady => "NotReady",
			Error::NotAttached => "NotAttached",
			Error::MissingDelegate => "MissingDelegate",
			Error::MissingUniqueId => "MissingUniqueId",
			Error::OverrideDisabled => "OverrideDisabled",
			Error::ChannelClosed => "ChannelClosed",
			Error::ProtocolError(_) => "ProtocolError",
			Error::Remote { name, .. } => name,
			Error::Io(_) => "IoError",
			Error::Json(_) => "JsonError",
		}
	}

	/// Returns true if the call failed because the embedded runtime was not executing.
	pub fn is_not_ready(&self) -> bool {
		match self {
			Error::NotReady => true,
			Error::Remote { name, .. } => name == "NotReady",
			_ => false,
		}
	}
}
