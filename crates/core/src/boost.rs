//! The host's entry point: one [`Boost`] per embedded runtime.

use std::sync::Arc;

use boost_protocol::{Arguments, CommonParams, RouteOptions};
use boost_runtime::{Connection, RequestHandler, Result, TransportParts};

use crate::bridge::RouteBridge;
use crate::container::ContainerHandle;
use crate::delegate::BoostDelegate;
use crate::events::ListenerRemover;
use crate::lifecycle::LifecycleCoordinator;
use crate::setup::SetupOptions;

/// Control surface of the embedded runtime the bridge talks to.
pub trait EmbeddedRuntime: Send + Sync {
	/// Whether the runtime has already started executing code.
	fn is_executing(&self) -> bool;

	/// Starts the runtime at `options.entrypoint_name`, showing
	/// `options.initial_route`.
	fn execute_entrypoint(&self, options: &SetupOptions) -> Result<()>;
}

/// A set-up bridge bound to one embedded runtime.
///
/// Cheap to clone; clones share the same bridge and channel. Dropping the
/// last clone detaches the bridge as [`tear_down`](Self::tear_down) does.
#[derive(Clone)]
pub struct Boost {
	options: Arc<SetupOptions>,
	connection: Arc<Connection>,
	bridge: Arc<RouteBridge>,
	lifecycle: Arc<LifecycleCoordinator>,
	_attachment: Arc<Attachment>,
}

/// Detaches the bridge on drop.
///
/// The connection's handler holds the bridge and an attached bridge holds the
/// connection; neither is freed until this runs.
struct Attachment(Arc<RouteBridge>);

impl Drop for Attachment {
	fn drop(&mut self) {
		self.0.detach();
	}
}

impl Boost {
	/// Wires the bridge to `transport` and starts the embedded runtime when
	/// it is not executing yet.
	///
	/// The returned value is ready for host calls. Messages from the embedded
	/// side are only processed once [`run`](Self::run) is polled.
	pub fn setup(
		options: SetupOptions,
		delegate: Arc<dyn BoostDelegate>,
		runtime: &dyn EmbeddedRuntime,
		transport: TransportParts,
	) -> Result<Self> {
		let lifecycle = Arc::new(LifecycleCoordinator::new(
			options.override_foreground_background,
		));
		let bridge = Arc::new(RouteBridge::new(Arc::clone(&lifecycle)));

		let connection = Arc::new(Connection::new(transport));
		connection.set_handler(Arc::clone(&bridge) as Arc<dyn RequestHandler>);
		bridge.attach(Arc::clone(&connection));
		let attachment = Attachment(Arc::clone(&bridge));
		bridge.set_delegate(delegate);

		if runtime.is_executing() {
			tracing::debug!("Embedded runtime already executing, reusing it");
		} else {
			tracing::info!(
				entrypoint = %options.entrypoint_name,
				initial_route = %options.initial_route,
				"Starting embedded runtime"
			);
			runtime.execute_entrypoint(&options)?;
		}
		connection.set_executing(true);

		tracing::info!(%options, "Bridge set up");
		Ok(Self {
			options: Arc::new(options),
			connection,
			bridge,
			lifecycle,
			_attachment: Arc::new(attachment),
		})
	}

	/// Processes messages from the embedded side until the channel closes.
	pub async fn run(&self) -> Result<()> {
		self.connection.run().await
	}

	/// Detaches the bridge; later host calls fail with
	/// [`Error::NotAttached`](boost_runtime::Error::NotAttached).
	pub fn tear_down(&self) {
		self.connection.set_executing(false);
		self.bridge.detach();
		tracing::info!("Bridge torn down");
	}

	pub fn options(&self) -> &SetupOptions {
		&self.options
	}

	pub fn connection(&self) -> &Arc<Connection> {
		&self.connection
	}

	pub fn bridge(&self) -> &Arc<RouteBridge> {
		&self.bridge
	}

	pub fn set_delegate(&self, delegate: Arc<dyn BoostDelegate>) {
		self.bridge.set_delegate(delegate);
	}

	// Navigation

	/// Opens a new container hosting an embedded page, through the delegate.
	pub fn open(&self, options: RouteOptions) -> Result<()> {
		self.bridge.handle_push_flutter_route(options.to_params())
	}

	/// Closes the container `unique_id`.
	pub fn close(&self, unique_id: &str) -> Result<()> {
		self.bridge
			.handle_pop_route(CommonParams::new().unique_id(unique_id))
	}

	pub fn find_container_by_id(&self, unique_id: &str) -> Option<Arc<dyn ContainerHandle>> {
		self.bridge.find_container_by_id(unique_id)
	}

	pub fn top_container(&self) -> Option<Arc<dyn ContainerHandle>> {
		self.bridge.top_container()
	}

	// Events

	pub fn add_event_listener<F>(&self, key: impl Into<String>, listener: F) -> ListenerRemover
	where
		F: Fn(&str, &Arguments) + Send + Sync + 'static,
	{
		self.bridge.add_event_listener(key, listener)
	}

	pub fn send_event_to_embedded(&self, key: &str, arguments: Option<Arguments>) -> Result<()> {
		self.bridge.send_event_to_embedded(key, arguments)
	}

	// Visibility

	/// Manually reports the app moving to the background or foreground.
	///
	/// # Errors
	///
	/// [`Error::OverrideDisabled`](boost_runtime::Error::OverrideDisabled)
	/// unless `override_foreground_background` was set.
	pub fn dispatch_back_foreground_event(&self, background: bool) -> Result<()> {
		let transition = self.lifecycle.manual_transition(background)?;
		self.bridge.broadcast_visibility(transition)?;
		self.lifecycle.set_in_background(background);
		Ok(())
	}

	pub fn is_app_in_background(&self) -> bool {
		self.lifecycle.is_app_in_background()
	}

	// Host screen callbacks

	pub fn on_screen_created(&self, screen_id: &str) {
		self.lifecycle.set_current_screen(screen_id);
	}

	pub fn on_screen_started(&self) -> Result<()> {
		match self.lifecycle.screen_started() {
			Some(transition) => self.bridge.broadcast_visibility(transition),
			None => Ok(()),
		}
	}

	pub fn on_screen_resumed(&self, screen_id: &str) {
		self.lifecycle.set_current_screen(screen_id);
	}

	/// A host screen stopped; `changing_configurations` marks a teardown that
	/// is immediately followed by a restart.
	pub fn on_screen_stopped(&self, changing_configurations: bool) -> Result<()> {
		match self.lifecycle.screen_stopped(changing_configurations) {
			Some(transition) => self.bridge.broadcast_visibility(transition),
			None => Ok(()),
		}
	}

	/// The host screen most recently created or resumed.
	pub fn current_screen(&self) -> Option<String> {
		self.lifecycle.current_screen()
	}

	/// Routes a native screen's result back to the embedded page that
	/// opened it.
	pub fn on_activity_result(&self, request_code: i32, result: Option<Arguments>) -> Result<()> {
		self.bridge.on_activity_result(request_code, result)
	}
}

impl std::fmt::Debug for Boost {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Boost")
			.field("options", &self.options)
			.field("bridge", &self.bridge)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};

	use boost_runtime::{Error, in_process_pair};
	use serde_json::json;

	use super::*;
	use crate::testing::{EmbeddedPeer, RecordingDelegate, TestContainer};

	#[derive(Default)]
	struct FakeRuntime {
		executing: bool,
		broken: bool,
		started: AtomicUsize,
	}

	impl EmbeddedRuntime for FakeRuntime {
		fn is_executing(&self) -> bool {
			self.executing
		}

		fn execute_entrypoint(&self, options: &SetupOptions) -> Result<()> {
			assert_eq!(options.entrypoint_name, "main");
			if self.broken {
				return Err(Error::ProtocolError("entrypoint not found".to_string()));
			}
			self.started.fetch_add(1, Ordering::SeqCst);
			Ok(())
		}
	}

	/// A running Boost wired to a recording embedded peer.
	fn running_boost(options: SetupOptions) -> (Boost, Arc<RecordingDelegate>, EmbeddedPeer) {
		let delegate = RecordingDelegate::new();
		let (host_parts, embedded_parts) = in_process_pair(64 * 1024);
		let boost = Boost::setup(options, delegate.clone(), &FakeRuntime::default(), host_parts)
			.unwrap();

		let peer = EmbeddedPeer::spawn(embedded_parts);
		let runner = boost.clone();
		tokio::spawn(async move { runner.run().await });
		(boost, delegate, peer)
	}

	#[test]
	fn test_setup_starts_idle_runtime_once() {
		let runtime = FakeRuntime::default();
		let (host_parts, _embedded) = in_process_pair(1024);
		let boost = Boost::setup(
			SetupOptions::default(),
			RecordingDelegate::new(),
			&runtime,
			host_parts,
		)
		.unwrap();

		assert_eq!(runtime.started.load(Ordering::SeqCst), 1);
		assert!(boost.connection().is_executing());
		assert!(boost.bridge().is_attached());
		assert!(boost.bridge().delegate().is_some());
	}

	#[test]
	fn test_setup_reuses_executing_runtime() {
		let runtime = FakeRuntime {
			executing: true,
			..FakeRuntime::default()
		};
		let (host_parts, _embedded) = in_process_pair(1024);
		Boost::setup(
			SetupOptions::default(),
			RecordingDelegate::new(),
			&runtime,
			host_parts,
		)
		.unwrap();
		assert_eq!(runtime.started.load(Ordering::SeqCst), 0);
	}

	#[test]
	fn test_dropping_last_clone_frees_bridge_and_connection() {
		let (host_parts, _embedded) = in_process_pair(1024);
		let boost = Boost::setup(
			SetupOptions::default(),
			RecordingDelegate::new(),
			&FakeRuntime::default(),
			host_parts,
		)
		.unwrap();
		let bridge = Arc::downgrade(boost.bridge());
		let connection = Arc::downgrade(boost.connection());

		let clone = boost.clone();
		drop(boost);
		assert!(bridge.upgrade().is_some_and(|b| b.is_attached()));

		drop(clone);
		assert!(bridge.upgrade().is_none());
		assert!(connection.upgrade().is_none());
	}

	#[test]
	fn test_failed_entrypoint_releases_bridge() {
		let runtime = FakeRuntime {
			broken: true,
			..FakeRuntime::default()
		};
		let delegate = RecordingDelegate::new();
		let (host_parts, _embedded) = in_process_pair(1024);

		let err = Boost::setup(
			SetupOptions::default(),
			delegate.clone(),
			&runtime,
			host_parts,
		)
		.unwrap_err();
		assert!(matches!(err, Error::ProtocolError(_)));
		assert_eq!(Arc::strong_count(&delegate), 1);
	}

	#[tokio::test]
	async fn test_screen_callbacks_broadcast_visibility() {
		let (boost, _delegate, mut peer) = running_boost(SetupOptions::default());

		boost.on_screen_created("Main");
		boost.on_screen_started().unwrap();
		boost.on_screen_resumed("Main");
		assert_eq!(boost.current_screen().as_deref(), Some("Main"));
		assert_eq!(peer.next_call().await.0, "onForeground");

		boost.on_screen_stopped(true).unwrap();
		boost.on_screen_started().unwrap();
		peer.assert_idle().await;

		boost.on_screen_stopped(false).unwrap();
		assert_eq!(peer.next_call().await.0, "onBackground");
		assert!(boost.is_app_in_background());
	}

	#[tokio::test]
	async fn test_manual_dispatch_requires_override() {
		let (boost, _delegate, mut peer) = running_boost(SetupOptions::default());
		let err = boost.dispatch_back_foreground_event(true).unwrap_err();
		assert!(matches!(err, Error::OverrideDisabled));
		peer.assert_idle().await;
	}

	#[tokio::test]
	async fn test_manual_dispatch_with_override() {
		let options = SetupOptions::builder()
			.override_foreground_background(true)
			.build();
		let (boost, _delegate, mut peer) = running_boost(options);

		// Screen callbacks no longer broadcast.
		boost.on_screen_started().unwrap();
		boost.on_screen_stopped(false).unwrap();
		peer.assert_idle().await;

		boost.dispatch_back_foreground_event(true).unwrap();
		assert_eq!(peer.next_call().await.0, "onBackground");
		assert!(boost.is_app_in_background());

		boost.dispatch_back_foreground_event(false).unwrap();
		assert_eq!(peer.next_call().await.0, "onForeground");
		assert!(!boost.is_app_in_background());
	}

	#[tokio::test]
	async fn test_open_and_close() {
		let (boost, delegate, _peer) = running_boost(SetupOptions::default());

		boost
			.open(RouteOptions::builder().page_name("/profile").build())
			.unwrap();
		let opened = delegate.flutter.lock()[0].clone();
		let unique_id = opened.unique_id().unwrap().to_string();

		let container = TestContainer::new(&unique_id, "/profile");
		let handle: Arc<dyn ContainerHandle> = container.clone();
		boost.bridge().on_container_created(&handle).unwrap();
		assert!(boost.find_container_by_id(&unique_id).is_some());

		boost.close(&unique_id).unwrap();
		assert_eq!(container.finished().len(), 1);
	}

	#[tokio::test]
	async fn test_native_round_trip_through_boost() {
		let (boost, delegate, mut peer) = running_boost(SetupOptions::default());

		peer.connection
			.call("pushNativeRoute", json!({"pageName": "/settings"}))
			.unwrap()
			.await
			.unwrap();
		let code = delegate.native.lock()[0].request_code().unwrap();

		boost.on_activity_result(code, None).unwrap();
		let (method, params) = peer.next_call().await;
		assert_eq!(method, "onNativeResult");
		assert_eq!(params, json!({"pageName": "/settings", "arguments": {}}));
	}

	#[tokio::test]
	async fn test_events_both_directions() {
		let (boost, _delegate, mut peer) = running_boost(SetupOptions::default());
		let hits = Arc::new(AtomicUsize::new(0));
		let _remover = {
			let hits = Arc::clone(&hits);
			boost.add_event_listener("login", move |_, _| {
				hits.fetch_add(1, Ordering::SeqCst);
			})
		};

		peer.connection
			.call("sendEventToNative", json!({"key": "login"}))
			.unwrap()
			.await
			.unwrap();
		assert_eq!(hits.load(Ordering::SeqCst), 1);

		boost.send_event_to_embedded("logout", None).unwrap();
		let (method, params) = peer.next_call().await;
		assert_eq!(method, "sendEventToFlutter");
		assert_eq!(params, json!({"key": "logout", "arguments": {}}));
	}

	#[tokio::test]
	async fn test_tear_down_detaches() {
		let (boost, _delegate, _peer) = running_boost(SetupOptions::default());
		boost.tear_down();
		assert!(matches!(
			boost.send_event_to_embedded("x", None),
			Err(Error::NotAttached)
		));
	}
}
