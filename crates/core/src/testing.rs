//! Test doubles shared by the unit tests.

use std::sync::Arc;
use std::time::Duration;

use boost_protocol::{Arguments, RouteOptions};
use boost_runtime::{Connection, Error, RequestHandler, Result, TransportParts, in_process_pair};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::bridge::RouteBridge;
use crate::container::ContainerHandle;
use crate::delegate::BoostDelegate;
use crate::lifecycle::LifecycleCoordinator;

/// Container that records every result it was finished with.
pub struct TestContainer {
	unique_id: String,
	page_name: String,
	params: Arguments,
	finished: Mutex<Vec<Arguments>>,
}

impl TestContainer {
	pub fn new(unique_id: &str, page_name: &str) -> Arc<Self> {
		Self::with_params(unique_id, page_name, Arguments::new())
	}

	pub fn with_params(unique_id: &str, page_name: &str, params: Arguments) -> Arc<Self> {
		Arc::new(Self {
			unique_id: unique_id.to_string(),
			page_name: page_name.to_string(),
			params,
			finished: Mutex::new(Vec::new()),
		})
	}

	pub fn finished(&self) -> Vec<Arguments> {
		self.finished.lock().clone()
	}
}

impl ContainerHandle for TestContainer {
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
		self.finished.lock().push(result);
	}
}

/// Delegate recording the options it was asked to open.
#[derive(Default)]
pub struct RecordingDelegate {
	pub native: Mutex<Vec<RouteOptions>>,
	pub flutter: Mutex<Vec<RouteOptions>>,
	pub fail_native: bool,
}

impl RecordingDelegate {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn failing() -> Arc<Self> {
		Arc::new(Self {
			fail_native: true,
			..Self::default()
		})
	}
}

impl BoostDelegate for RecordingDelegate {
	fn push_native_route(&self, options: RouteOptions) -> Result<()> {
		if self.fail_native {
			return Err(Error::ProtocolError("screen not found".to_string()));
		}
		self.native.lock().push(options);
		Ok(())
	}

	fn push_flutter_route(&self, options: RouteOptions) -> Result<()> {
		self.flutter.lock().push(options);
		Ok(())
	}
}

/// Handler standing in for the embedded runtime: records calls, acknowledges
/// each with `null`.
struct EmbeddedRecorder {
	seen: mpsc::UnboundedSender<(String, Value)>,
}

impl RequestHandler for EmbeddedRecorder {
	fn handle_request(&self, method: &str, params: Value) -> Result<Value> {
		let _ = self.seen.send((method.to_string(), params));
		Ok(Value::Null)
	}
}

/// Simulated embedded side of a bridge.
pub struct EmbeddedPeer {
	pub connection: Arc<Connection>,
	seen: mpsc::UnboundedReceiver<(String, Value)>,
}

impl EmbeddedPeer {
	/// Runs a recording embedded connection over `parts`, marked executing.
	pub fn spawn(parts: TransportParts) -> Self {
		let connection = Arc::new(Connection::new(parts));
		let (seen_tx, seen) = mpsc::unbounded_channel();
		connection.set_handler(Arc::new(EmbeddedRecorder { seen: seen_tx }));
		connection.set_executing(true);

		let runner = Arc::clone(&connection);
		tokio::spawn(async move { runner.run().await });
		Self { connection, seen }
	}

	/// Next call received from the host.
	pub async fn next_call(&mut self) -> (String, Value) {
		tokio::time::timeout(Duration::from_secs(5), self.seen.recv())
			.await
			.expect("timed out waiting for a host call")
			.expect("embedded peer closed")
	}

	/// Asserts nothing else arrives within a short grace period.
	pub async fn assert_idle(&mut self) {
		let extra = tokio::time::timeout(Duration::from_millis(100), self.seen.recv()).await;
		if let Ok(Some(call)) = extra {
			panic!("unexpected host call: {call:?}");
		}
	}
}

/// Joins a host connection and an embedded peer over in-process pipes and
/// starts both dispatch loops. Both sides are marked executing.
pub fn connected_pair(handler: Arc<dyn RequestHandler>) -> (Arc<Connection>, EmbeddedPeer) {
	let (host_parts, embedded_parts) = in_process_pair(64 * 1024);
	let host = Arc::new(Connection::new(host_parts));
	host.set_handler(handler);
	host.set_executing(true);

	let runner = Arc::clone(&host);
	tokio::spawn(async move { runner.run().await });

	(host, EmbeddedPeer::spawn(embedded_parts))
}

/// A bridge attached to a running embedded peer.
pub fn connected_bridge() -> (Arc<RouteBridge>, EmbeddedPeer) {
	let bridge = Arc::new(RouteBridge::new(Arc::new(LifecycleCoordinator::new(false))));
	let (host, peer) = connected_pair(Arc::clone(&bridge) as Arc<dyn RequestHandler>);
	bridge.attach(host);
	(bridge, peer)
}
