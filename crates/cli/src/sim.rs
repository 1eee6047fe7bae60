//! Scripted host/embedded session over an in-process channel.
//!
//! The host side is a real [`Boost`]; the embedded side is a bare
//! [`Connection`] that records every host call it receives and issues the
//! embedded-initiated calls a page stack would. The recorded calls form the
//! transcript.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, bail};
use boost::{
	Arguments, Boost, BoostDelegate, Connection, ContainerHandle, EmbeddedRuntime, RequestHandler,
	RouteOptions, SetupOptions, in_process_pair,
};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::mpsc;

/// One host call as observed by the embedded side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallRecord {
	pub method: String,
	#[serde(skip_serializing_if = "Value::is_null")]
	pub params: Value,
}

impl std::fmt::Display for CallRecord {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		if self.params.is_null() {
			write!(f, "{}", self.method)
		} else {
			write!(f, "{} {}", self.method, self.params)
		}
	}
}

#[derive(Default)]
struct SimRuntime {
	executing: AtomicBool,
}

impl EmbeddedRuntime for SimRuntime {
	fn is_executing(&self) -> bool {
		self.executing.load(Ordering::SeqCst)
	}

	fn execute_entrypoint(&self, options: &SetupOptions) -> boost::Result<()> {
		tracing::info!(
			entrypoint = %options.entrypoint_name,
			args = ?options.extra_args,
			"Embedded runtime executing"
		);
		self.executing.store(true, Ordering::SeqCst);
		Ok(())
	}
}

/// Host navigation: records what the embedded side asked to open.
#[derive(Default)]
struct SimDelegate {
	native: Mutex<Vec<RouteOptions>>,
	opened: Mutex<Vec<RouteOptions>>,
}

impl BoostDelegate for SimDelegate {
	fn push_native_route(&self, options: RouteOptions) -> boost::Result<()> {
		tracing::info!(
			page_name = options.page_name(),
			request_code = ?options.request_code(),
			"Host opens native screen"
		);
		self.native.lock().push(options);
		Ok(())
	}

	fn push_flutter_route(&self, options: RouteOptions) -> boost::Result<()> {
		tracing::info!(
			page_name = options.page_name(),
			unique_id = ?options.unique_id(),
			"Host opens embedded container"
		);
		self.opened.lock().push(options);
		Ok(())
	}
}

/// Host screen hosting one embedded page.
struct SimScreen {
	unique_id: String,
	page_name: String,
	params: Arguments,
	result: Mutex<Option<Arguments>>,
}

impl SimScreen {
	fn new(unique_id: &str, page_name: &str, params: Arguments) -> Arc<Self> {
		Arc::new(Self {
			unique_id: unique_id.to_string(),
			page_name: page_name.to_string(),
			params,
			result: Mutex::new(None),
		})
	}
}

impl ContainerHandle for SimScreen {
	fn unique_id(&self) -> &str {
		&self.unique_id
	}

	fn page_name(&self) -> &str {
		&self.page_name
	}

	fn params(&self) -> Arguments {
		self.params.clone()
	}

	fn finish_container(&self, result: Arguments) {
		tracing::info!(unique_id = %self.unique_id, ?result, "Container finished");
		*self.result.lock() = Some(result);
	}
}

/// Embedded side: records host calls and acknowledges them.
struct EmbeddedRecorder {
	calls: mpsc::UnboundedSender<CallRecord>,
}

impl RequestHandler for EmbeddedRecorder {
	fn handle_request(&self, method: &str, params: Value) -> boost::Result<Value> {
		tracing::debug!(method, "Embedded side received host call");
		let _ = self.calls.send(CallRecord {
			method: method.to_string(),
			params,
		});
		Ok(Value::Null)
	}
}

fn object(value: Value) -> Arguments {
	match value {
		Value::Object(map) => map,
		_ => Arguments::new(),
	}
}

/// Runs the scripted session and returns the host calls in arrival order.
pub async fn run(options: SetupOptions) -> Result<Vec<CallRecord>> {
	let manual_visibility = options.override_foreground_background;
	let initial_route = options.initial_route.clone();

	let (host_parts, embedded_parts) = in_process_pair(64 * 1024);
	let delegate = Arc::new(SimDelegate::default());
	let runtime = SimRuntime::default();
	let boost = Boost::setup(options, delegate.clone(), &runtime, host_parts)
		.context("bridge setup failed")?;

	let embedded = Arc::new(Connection::new(embedded_parts));
	let (calls_tx, mut calls_rx) = mpsc::unbounded_channel();
	embedded.set_handler(Arc::new(EmbeddedRecorder { calls: calls_tx }));
	embedded.set_executing(true);

	let host_loop = {
		let boost = boost.clone();
		tokio::spawn(async move { boost.run().await })
	};
	let embedded_loop = {
		let embedded = Arc::clone(&embedded);
		tokio::spawn(async move { embedded.run().await })
	};

	// Host screen comes up.
	boost.on_screen_created("MainActivity");
	boost.on_screen_started()?;
	boost.on_screen_resumed("MainActivity");
	if manual_visibility {
		boost.dispatch_back_foreground_event(false)?;
	}

	// First container hosts the initial route.
	let home: Arc<dyn ContainerHandle> =
		SimScreen::new("container-home", &initial_route, Arguments::new());
	boost.bridge().on_container_created(&home)?;
	boost.bridge().on_container_appeared(&home)?;

	let cart_listener = boost.add_event_listener("cart", |key, arguments| {
		tracing::info!(key, ?arguments, "Host received embedded event");
	});

	// The page opens a native screen and gets its result back.
	embedded
		.call("pushNativeRoute", json!({"pageName": "/detail", "arguments": {"id": 7}}))?
		.await?;
	let request_code = delegate
		.native
		.lock()
		.last()
		.and_then(RouteOptions::request_code)
		.context("native navigation was not recorded")?;
	boost.on_activity_result(request_code, Some(object(json!({"ok": true}))))?;

	embedded
		.call("sendEventToNative", json!({"key": "cart", "arguments": {"count": 1}}))?
		.await?;
	cart_listener.remove();

	embedded
		.call("saveStackToHost", json!({"containers": ["container-home"]}))?
		.await?;
	let saved = embedded.call("getStackFromHost", Value::Null)?.await?;
	if saved != json!({"containers": ["container-home"]}) {
		bail!("stack snapshot was not preserved: {saved}");
	}

	// The page opens a second embedded container, which closes itself.
	embedded
		.call("pushFlutterRoute", json!({"pageName": "/profile"}))?
		.await?;
	let opened = delegate
		.opened
		.lock()
		.last()
		.cloned()
		.context("embedded navigation was not recorded")?;
	let profile_id = opened
		.unique_id()
		.context("opened container has no unique id")?
		.to_string();
	let profile_screen = SimScreen::new(&profile_id, opened.page_name(), opened.arguments().clone());
	let profile: Arc<dyn ContainerHandle> = profile_screen.clone();

	boost.bridge().on_container_created(&profile)?;
	boost.bridge().on_container_disappeared(&home)?;
	boost.bridge().on_container_appeared(&profile)?;

	embedded
		.call(
			"popRoute",
			json!({"uniqueId": profile_id, "arguments": {"saved": true}}),
		)?
		.await?;
	if profile_screen.result.lock().is_none() {
		bail!("container {profile_id} was not finished");
	}

	boost.bridge().on_container_disappeared(&profile)?;
	boost.bridge().on_container_appeared(&home)?;
	boost.bridge().on_container_destroyed(&profile)?;

	boost.send_event_to_embedded("theme", Some(object(json!({"dark": true}))))?;

	// Host screen goes away.
	boost.bridge().on_container_disappeared(&home)?;
	boost.bridge().on_container_destroyed(&home)?;
	boost.on_screen_stopped(false)?;
	if manual_visibility {
		boost.dispatch_back_foreground_event(true)?;
	}

	// Replies travel behind every earlier host call, so once this one
	// resolves the embedded side has seen them all.
	embedded.call("getStackFromHost", Value::Null)?.await?;

	boost.tear_down();
	host_loop.abort();
	embedded_loop.abort();

	let mut transcript = Vec::new();
	while let Ok(record) = calls_rx.try_recv() {
		transcript.push(record);
	}
	tracing::info!(calls = transcript.len(), "Simulation finished");
	Ok(transcript)
}
