//! Navigation requests handed to host delegates.

use serde::{Deserialize, Serialize};

use crate::params::{Arguments, CommonParams};

/// An immutable navigation request.
///
/// `request_code` is populated only for native navigation requests whose
/// result must later be routed back to the embedded page that issued them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteOptions {
	page_name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	unique_id: Option<String>,
	#[serde(default)]
	arguments: Arguments,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	request_code: Option<i32>,
}

impl RouteOptions {
	/// Creates a new builder.
	pub fn builder() -> RouteOptionsBuilder {
		RouteOptionsBuilder::default()
	}

	pub fn page_name(&self) -> &str {
		&self.page_name
	}

	pub fn unique_id(&self) -> Option<&str> {
		self.unique_id.as_deref()
	}

	pub fn arguments(&self) -> &Arguments {
		&self.arguments
	}

	pub fn request_code(&self) -> Option<i32> {
		self.request_code
	}

	/// Converts into the wire envelope (request codes stay on the host).
	pub fn to_params(&self) -> CommonParams {
		CommonParams {
			page_name: Some(self.page_name.clone()),
			unique_id: self.unique_id.clone(),
			key: None,
			arguments: Some(self.arguments.clone()),
		}
	}
}

/// Builder for [`RouteOptions`].
#[derive(Debug, Clone, Default)]
pub struct RouteOptionsBuilder {
	inner: RouteOptions,
}

impl RouteOptionsBuilder {
	/// Sets the page name.
	pub fn page_name(mut self, page_name: impl Into<String>) -> Self {
		self.inner.page_name = page_name.into();
		self
	}

	/// Sets the container unique id.
	pub fn unique_id(mut self, unique_id: impl Into<String>) -> Self {
		self.inner.unique_id = Some(unique_id.into());
		self
	}

	/// Sets the navigation arguments.
	pub fn arguments(mut self, arguments: Arguments) -> Self {
		self.inner.arguments = arguments;
		self
	}

	/// Sets the request code used to correlate a later result.
	pub fn request_code(mut self, request_code: i32) -> Self {
		self.inner.request_code = Some(request_code);
		self
	}

	/// Builds the options.
	pub fn build(self) -> RouteOptions {
		self.inner
	}
}
