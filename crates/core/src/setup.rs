//! Options the host passes when setting up the bridge.

use std::fmt;
use std::fs;
use std::path::Path;

use boost_runtime::Result;
use serde::{Deserialize, Serialize};

pub const DEFAULT_INITIAL_ROUTE: &str = "/";
pub const DEFAULT_ENTRYPOINT: &str = "main";

/// Bridge setup options.
///
/// Every field has a default, so a JSON file only needs the keys it
/// overrides:
///
/// ```json
/// { "initialRoute": "/home", "overrideForegroundBackground": true }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SetupOptions {
	/// Route the embedded runtime shows first.
	pub initial_route: String,
	/// Entrypoint function the embedded runtime runs.
	pub entrypoint_name: String,
	/// Leave foreground/background dispatch to the host.
	pub override_foreground_background: bool,
	/// Extra arguments passed to the embedded runtime at startup.
	pub extra_args: Vec<String>,
}

impl Default for SetupOptions {
	fn default() -> Self {
		Self {
			initial_route: DEFAULT_INITIAL_ROUTE.to_string(),
			entrypoint_name: DEFAULT_ENTRYPOINT.to_string(),
			override_foreground_background: false,
			extra_args: Vec::new(),
		}
	}
}

impl SetupOptions {
	pub fn builder() -> SetupOptionsBuilder {
		SetupOptionsBuilder::default()
	}

	/// Reads options from a JSON file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self> {
		let content = fs::read_to_string(path.as_ref())?;
		let options = serde_json::from_str(&content)?;
		tracing::debug!(path = %path.as_ref().display(), "Loaded setup options");
		Ok(options)
	}
}

impl fmt::Display for SetupOptions {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"initialRoute: {}, entrypointName: {}, overrideForegroundBackground: {}, extraArgs: [{}]",
			self.initial_route,
			self.entrypoint_name,
			self.override_foreground_background,
			self.extra_args.join(", ")
		)
	}
}

/// Builder for [`SetupOptions`].
#[derive(Debug, Clone, Default)]
pub struct SetupOptionsBuilder {
	inner: SetupOptions,
}

impl SetupOptionsBuilder {
	pub fn initial_route(mut self, route: impl Into<String>) -> Self {
		self.inner.initial_route = route.into();
		self
	}

	pub fn entrypoint_name(mut self, name: impl Into<String>) -> Self {
		self.inner.entrypoint_name = name.into();
		self
	}

	pub fn override_foreground_background(mut self, enabled: bool) -> Self {
		self.inner.override_foreground_background = enabled;
		self
	}

	pub fn extra_args<I, S>(mut self, args: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.inner.extra_args = args.into_iter().map(Into::into).collect();
		self
	}

	pub fn build(self) -> SetupOptions {
		self.inner
	}
}
