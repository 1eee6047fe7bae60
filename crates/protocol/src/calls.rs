//! The fixed call set exchanged over the message channel.
//!
//! Each direction is a tagged union with one variant per call. On the wire a
//! call is an object `{"method": <name>, "params": <payload>}`; unit calls
//! omit `params` and accept an empty `{}` envelope when decoding. [`HostCall::into_parts`] and [`EmbeddedCall::from_parts`]
//! convert between the typed form and the `(method, params)` pair the
//! connection layer transports.

use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::params::{CommonParams, LifecycleParams, StackInfo};

/// Calls issued by the host and handled by the embedded runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "camelCase")]
pub enum HostCall {
	/// Open or activate the named page for a container.
	PushRoute(CommonParams),
	/// Tear down the route bound to a container.
	PopRoute(CommonParams),
	/// Discard bookkeeping for a destroyed container.
	RemoveRoute(CommonParams),
	OnForeground,
	OnBackground,
	/// Mark a container's page visible without recreating it.
	OnContainerShow(CommonParams),
	/// Mark a container's page hidden without destroying it.
	OnContainerHide(CommonParams),
	/// Deliver the outcome of a native navigation request to the page that issued it.
	OnNativeResult(CommonParams),
	AppLifecycleChanged(LifecycleParams),
	/// Application event from the host to embedded listeners.
	SendEventToFlutter(CommonParams),
}

/// Calls issued by the embedded runtime and handled by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "camelCase")]
pub enum EmbeddedCall {
	/// Open a native host screen.
	PushNativeRoute(CommonParams),
	/// Open a new embedded surface hosted by a native container.
	PushFlutterRoute(CommonParams),
	/// Close the container identified by `uniqueId`.
	PopRoute(CommonParams),
	GetStackFromHost,
	SaveStackToHost(StackInfo),
	/// Application event from embedded pages to host listeners.
	SendEventToNative(CommonParams),
}

impl HostCall {
	/// Returns the wire method name.
	pub fn method(&self) -> &'static str {
		match self {
			Self::PushRoute(_) => "pushRoute",
			Self::PopRoute(_) => "popRoute",
			Self::RemoveRoute(_) => "removeRoute",
			Self::OnForeground => "onForeground",
			Self::OnBackground => "onBackground",
			Self::OnContainerShow(_) => "onContainerShow",
			Self::OnContainerHide(_) => "onContainerHide",
			Self::OnNativeResult(_) => "onNativeResult",
			Self::AppLifecycleChanged(_) => "appLifecycleChanged",
			Self::SendEventToFlutter(_) => "sendEventToFlutter",
		}
	}

	/// Whether the caller expects a reply for this call.
	///
	/// Route stack mutations are acknowledged; notifications are fire-and-forget.
	pub fn expects_reply(&self) -> bool {
		matches!(self, Self::PushRoute(_) | Self::PopRoute(_) | Self::RemoveRoute(_))
	}

	pub fn into_parts(self) -> serde_json::Result<(String, Value)> {
		split(serde_json::to_value(self)?)
	}

	pub fn from_parts(method: &str, params: Value) -> serde_json::Result<Self> {
		let unit = matches!(method, "onForeground" | "onBackground");
		serde_json::from_value(join(method, params, unit))
	}
}

impl EmbeddedCall {
	/// Returns the wire method name.
	pub fn method(&self) -> &'static str {
		match self {
			Self::PushNativeRoute(_) => "pushNativeRoute",
			Self::PushFlutterRoute(_) => "pushFlutterRoute",
			Self::PopRoute(_) => "popRoute",
			Self::GetStackFromHost => "getStackFromHost",
			Self::SaveStackToHost(_) => "saveStackToHost",
			Self::SendEventToNative(_) => "sendEventToNative",
		}
	}

	pub fn into_parts(self) -> serde_json::Result<(String, Value)> {
		split(serde_json::to_value(self)?)
	}

	pub fn from_parts(method: &str, params: Value) -> serde_json::Result<Self> {
		let unit = method == "getStackFromHost";
		serde_json::from_value(join(method, params, unit))
	}
}

fn split(value: Value) -> serde_json::Result<(String, Value)> {
	let Value::Object(mut map) = value else {
		return Err(serde_json::Error::custom("call did not serialize to an object"));
	};
	let method = match map.remove("method") {
		Some(Value::String(method)) => method,
		_ => return Err(serde_json::Error::custom("call is missing its method name")),
	};
	let params = map.remove("params").unwrap_or(Value::Null);
	Ok((method, params))
}

fn join(method: &str, params: Value, unit: bool) -> Value {
	let mut map = Map::new();
	map.insert("method".to_string(), Value::String(method.to_string()));
	let empty = match &params {
		Value::Null => true,
		Value::Object(fields) => unit && fields.is_empty(),
		_ => false,
	};
	if !empty {
		map.insert("params".to_string(), params);
	}
	Value::Object(map)
}
