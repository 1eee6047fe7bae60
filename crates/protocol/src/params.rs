//! Payload types carried by bridge calls.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque navigation arguments.
pub type Arguments = Map<String, Value>;

/// Request envelope shared by every cross-boundary navigation call.
///
/// Every field is optional on the wire; each call documents which ones it
/// reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonParams {
	/// Route identifier inside the embedded runtime
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub page_name: Option<String>,

	/// Identity of the container the call refers to
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub unique_id: Option<String>,

	/// Event key for event fan-out calls
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub key: Option<String>,

	/// Navigation or event arguments
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub arguments: Option<Arguments>,
}

impl CommonParams {
	/// Creates empty params.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the page name.
	pub fn page_name(mut self, page_name: impl Into<String>) -> Self {
		self.page_name = Some(page_name.into());
		self
	}

	/// Sets the container unique id.
	pub fn unique_id(mut self, unique_id: impl Into<String>) -> Self {
		self.unique_id = Some(unique_id.into());
		self
	}

	/// Sets the event key.
	pub fn key(mut self, key: impl Into<String>) -> Self {
		self.key = Some(key.into());
		self
	}

	/// Sets the arguments.
	pub fn arguments(mut self, arguments: Arguments) -> Self {
		self.arguments = Some(arguments);
		self
	}

	/// Returns the arguments, or an empty map when none were supplied.
	pub fn arguments_or_empty(&self) -> Arguments {
		self.arguments.clone().unwrap_or_default()
	}
}

/// Opaque snapshot of the embedded runtime's page stack.
///
/// The host never inspects the contents; it stores the latest snapshot and
/// hands it back on request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StackInfo(Arguments);

impl StackInfo {
	/// An empty snapshot, returned when nothing was saved yet.
	pub fn empty() -> Self {
		Self::default()
	}

	pub fn from_map(map: Arguments) -> Self {
		Self(map)
	}

	pub fn as_map(&self) -> &Arguments {
		&self.0
	}

	pub fn into_map(self) -> Arguments {
		self.0
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

/// App-level lifecycle state of the embedded runtime.
///
/// Encoded on the wire as the integer codes the embedded side expects
/// (`0` for resumed, `2` for paused).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum AppLifecycleState {
	/// At least one embedded surface is alive
	Resumed,
	/// No embedded surface is alive
	Paused,
}

impl AppLifecycleState {
	pub const RESUMED_CODE: i32 = 0;
	pub const PAUSED_CODE: i32 = 2;

	/// Returns the wire code for this state.
	pub fn code(self) -> i32 {
		match self {
			Self::Resumed => Self::RESUMED_CODE,
			Self::Paused => Self::PAUSED_CODE,
		}
	}
}

impl From<AppLifecycleState> for i32 {
	fn from(state: AppLifecycleState) -> Self {
		state.code()
	}
}

impl TryFrom<i32> for AppLifecycleState {
	type Error = String;

	fn try_from(code: i32) -> Result<Self, Self::Error> {
		match code {
			Self::RESUMED_CODE => Ok(Self::Resumed),
			Self::PAUSED_CODE => Ok(Self::Paused),
			other => Err(format!("unknown app lifecycle state code: {other}")),
		}
	}
}

/// Payload of [`HostCall::AppLifecycleChanged`](crate::HostCall::AppLifecycleChanged).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleParams {
	pub lifecycle_state: AppLifecycleState,
}
