//! Route bridge between the host screen stack and the embedded page stack.
//!
//! The bridge owns the host-side bookkeeping (container registry, request
//! codes, saved stack snapshot, event listeners) and translates between it
//! and the typed call set exchanged over a [`Connection`].
//!
//! # Directions
//!
//! - **Host → embedded**: [`push_route`](RouteBridge::push_route),
//!   [`on_container_show`](RouteBridge::on_container_show) and friends. Every
//!   call fails fast with [`Error::NotAttached`] or [`Error::NotReady`]; none
//!   of them waits for the embedded side.
//! - **Embedded → host**: requests decoded as [`EmbeddedCall`] and routed by
//!   the [`RequestHandler`] impl to the `handle_*` methods.
//!
//! # Container hooks
//!
//! The host reports container lifecycle through the `on_container_*` hooks,
//! which keep the registry and the embedded side in step:
//!
//! | Hook | Registry | Calls sent |
//! |------|----------|------------|
//! | created | register | `appLifecycleChanged(Resumed)` on 0→1 |
//! | appeared | activate | `pushRoute`, then `onContainerShow` |
//! | disappeared | mark disappeared | `onContainerHide` |
//! | destroyed | remove | `removeRoute`, then `appLifecycleChanged(Paused)` on 1→0 |

use std::sync::Arc;

use boost_protocol::{
	AppLifecycleState, Arguments, CommonParams, EmbeddedCall, HostCall, LifecycleParams,
	RouteOptions, StackInfo,
};
use boost_runtime::{Connection, Error, PendingReply, RequestHandler, Result};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use crate::container::ContainerHandle;
use crate::delegate::BoostDelegate;
use crate::events::{EventBus, ListenerRemover};
use crate::lifecycle::{LifecycleCoordinator, VisibilityTransition};
use crate::registry::ContainerRegistry;
use crate::requests::RequestTable;

/// Host-side endpoint of the route bridge.
pub struct RouteBridge {
	connection: RwLock<Option<Arc<Connection>>>,
	delegate: RwLock<Option<Arc<dyn BoostDelegate>>>,
	registry: Mutex<ContainerRegistry>,
	lifecycle: Arc<LifecycleCoordinator>,
	events: EventBus,
	requests: Mutex<RequestTable>,
	stack: Mutex<Option<StackInfo>>,
}

impl RouteBridge {
	pub fn new(lifecycle: Arc<LifecycleCoordinator>) -> Self {
		Self {
			connection: RwLock::new(None),
			delegate: RwLock::new(None),
			registry: Mutex::new(ContainerRegistry::new()),
			lifecycle,
			events: EventBus::new(),
			requests: Mutex::new(RequestTable::new()),
			stack: Mutex::new(None),
		}
	}

	/// Binds the bridge to the channel it sends host calls on.
	pub fn attach(&self, connection: Arc<Connection>) {
		tracing::debug!("Route bridge attached");
		*self.connection.write() = Some(connection);
	}

	/// Unbinds the channel; later host calls fail with [`Error::NotAttached`].
	pub fn detach(&self) -> Option<Arc<Connection>> {
		tracing::debug!("Route bridge detached");
		self.connection.write().take()
	}

	pub fn is_attached(&self) -> bool {
		self.connection.read().is_some()
	}

	pub fn set_delegate(&self, delegate: Arc<dyn BoostDelegate>) {
		*self.delegate.write() = Some(delegate);
	}

	pub fn delegate(&self) -> Option<Arc<dyn BoostDelegate>> {
		self.delegate.read().clone()
	}

	pub fn lifecycle(&self) -> &Arc<LifecycleCoordinator> {
		&self.lifecycle
	}

	fn connection(&self) -> Result<Arc<Connection>> {
		self.connection.read().clone().ok_or(Error::NotAttached)
	}

	/// Sends `call`, as a request when [`HostCall::expects_reply`] holds and
	/// as a notification otherwise.
	fn send(&self, call: HostCall) -> Result<Option<PendingReply>> {
		let connection = self.connection()?;
		let expects_reply = call.expects_reply();
		let (method, params) = call.into_parts()?;
		if expects_reply {
			connection.call(&method, params).map(Some)
		} else {
			connection.notify(&method, params).map(|()| None)
		}
	}

	fn call(&self, call: HostCall) -> Result<PendingReply> {
		let method = call.method();
		self.send(call)?
			.ok_or_else(|| Error::ProtocolError(format!("'{method}' is not acknowledged")))
	}

	fn notify(&self, call: HostCall) -> Result<()> {
		self.send(call).map(drop)
	}

	// Host → embedded

	/// Opens or activates `page_name` for container `unique_id`.
	pub fn push_route(
		&self,
		unique_id: &str,
		page_name: &str,
		arguments: Arguments,
	) -> Result<PendingReply> {
		self.call(HostCall::PushRoute(
			CommonParams::new()
				.unique_id(unique_id)
				.page_name(page_name)
				.arguments(arguments),
		))
	}

	/// Asks the embedded side to tear down the route bound to `unique_id`.
	pub fn pop_route(&self, unique_id: &str) -> Result<PendingReply> {
		self.call(HostCall::PopRoute(CommonParams::new().unique_id(unique_id)))
	}

	pub fn remove_route(&self, unique_id: &str) -> Result<PendingReply> {
		self.call(HostCall::RemoveRoute(CommonParams::new().unique_id(unique_id)))
	}

	pub fn on_foreground(&self) -> Result<()> {
		self.notify(HostCall::OnForeground)
	}

	pub fn on_background(&self) -> Result<()> {
		self.notify(HostCall::OnBackground)
	}

	/// Sends the call matching a visibility transition.
	pub fn broadcast_visibility(&self, transition: VisibilityTransition) -> Result<()> {
		tracing::debug!(?transition, "Broadcasting visibility transition");
		match transition {
			VisibilityTransition::Foreground => self.on_foreground(),
			VisibilityTransition::Background => self.on_background(),
		}
	}

	pub fn on_container_show(&self, unique_id: &str) -> Result<()> {
		self.notify(HostCall::OnContainerShow(
			CommonParams::new().unique_id(unique_id),
		))
	}

	pub fn on_container_hide(&self, unique_id: &str) -> Result<()> {
		self.notify(HostCall::OnContainerHide(
			CommonParams::new().unique_id(unique_id),
		))
	}

	/// Delivers a native screen's result to the embedded page `page_name`.
	pub fn on_native_result(&self, page_name: &str, result: Arguments) -> Result<()> {
		self.notify(HostCall::OnNativeResult(
			CommonParams::new().page_name(page_name).arguments(result),
		))
	}

	pub fn app_lifecycle_changed(&self, state: AppLifecycleState) -> Result<()> {
		tracing::debug!(?state, "Broadcasting app lifecycle state");
		self.notify(HostCall::AppLifecycleChanged(LifecycleParams {
			lifecycle_state: state,
		}))
	}

	/// Sends an application event to embedded listeners of `key`.
	pub fn send_event_to_embedded(&self, key: &str, arguments: Option<Arguments>) -> Result<()> {
		self.notify(HostCall::SendEventToFlutter(
			CommonParams::new()
				.key(key)
				.arguments(arguments.unwrap_or_default()),
		))
	}

	// Container hooks

	/// A container was created. Registers it and resumes the app on the first
	/// live container.
	pub fn on_container_created(&self, container: &Arc<dyn ContainerHandle>) -> Result<()> {
		let unique_id = container.unique_id();
		let (before, after) = {
			let mut registry = self.registry.lock();
			let before = registry.size();
			registry.add_container(container);
			(before, registry.size())
		};
		tracing::debug!(
			unique_id,
			page_name = container.page_name(),
			size = after,
			"Container created"
		);

		match self.lifecycle.population_changed(before, after) {
			Some(state) => self.app_lifecycle_changed(state),
			None => Ok(()),
		}
	}

	/// A container became the visible surface.
	pub fn on_container_appeared(&self, container: &Arc<dyn ContainerHandle>) -> Result<()> {
		let unique_id = container.unique_id();
		if !self.registry.lock().activate_container(unique_id) {
			tracing::warn!(unique_id, "Appearance of unregistered container ignored");
			return Ok(());
		}
		tracing::debug!(unique_id, "Container appeared");

		// Acknowledgement is not awaited.
		drop(self.push_route(unique_id, container.page_name(), container.params())?);
		self.on_container_show(unique_id)
	}

	/// A container was covered or paused but stays alive.
	pub fn on_container_disappeared(&self, container: &Arc<dyn ContainerHandle>) -> Result<()> {
		let unique_id = container.unique_id();
		if !self.registry.lock().mark_disappeared(unique_id) {
			tracing::warn!(unique_id, "Disappearance of unregistered container ignored");
			return Ok(());
		}
		tracing::debug!(unique_id, "Container disappeared");
		self.on_container_hide(unique_id)
	}

	/// A container was destroyed. Unregisters it and pauses the app once no
	/// container is left.
	///
	/// The registry entry is removed even when `removeRoute` cannot be sent;
	/// that error is returned after the bookkeeping is done.
	pub fn on_container_destroyed(&self, container: &Arc<dyn ContainerHandle>) -> Result<()> {
		let unique_id = container.unique_id();
		let sent = self.remove_route(unique_id).map(drop);

		let (before, after) = {
			let mut registry = self.registry.lock();
			let before = registry.size();
			registry.remove_container(unique_id);
			(before, registry.size())
		};
		tracing::debug!(unique_id, size = after, "Container destroyed");

		let state = self.lifecycle.population_changed(before, after);
		sent?;
		match state {
			Some(state) => self.app_lifecycle_changed(state),
			None => Ok(()),
		}
	}

	// Embedded → host

	/// Opens a native host screen and remembers which page asked for it.
	///
	/// # Errors
	///
	/// - [`Error::MissingDelegate`] when no delegate is installed
	/// - [`Error::ProtocolError`] when `pageName` is absent
	/// - whatever the delegate returns
	pub fn handle_push_native_route(&self, params: CommonParams) -> Result<()> {
		let delegate = self.delegate().ok_or(Error::MissingDelegate)?;
		let page_name = params
			.page_name
			.clone()
			.ok_or_else(|| Error::ProtocolError("pushNativeRoute requires a pageName".to_string()))?;

		let request_code = self.requests.lock().allocate(page_name.clone());
		let options = RouteOptions::builder()
			.page_name(page_name)
			.arguments(params.arguments_or_empty())
			.request_code(request_code)
			.build();

		tracing::debug!(request_code, page_name = options.page_name(), "Pushing native route");
		delegate.push_native_route(options).inspect_err(|_| {
			self.requests.lock().resolve(request_code);
		})
	}

	/// Opens a new container hosting an embedded page.
	///
	/// A unique id is generated when the embedded side did not supply one.
	pub fn handle_push_flutter_route(&self, params: CommonParams) -> Result<()> {
		let delegate = self.delegate().ok_or(Error::MissingDelegate)?;
		let unique_id = params
			.unique_id
			.clone()
			.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

		let options = RouteOptions::builder()
			.page_name(params.page_name.clone().unwrap_or_default())
			.unique_id(unique_id)
			.arguments(params.arguments_or_empty())
			.build();

		tracing::debug!(
			unique_id = ?options.unique_id(),
			page_name = options.page_name(),
			"Pushing embedded route"
		);
		delegate.push_flutter_route(options)
	}

	/// Closes the container named by `uniqueId`, handing it the arguments as
	/// its result.
	///
	/// An id with no live container is ignored.
	pub fn handle_pop_route(&self, params: CommonParams) -> Result<()> {
		let unique_id = params.unique_id.as_deref().ok_or(Error::MissingUniqueId)?;

		let Some(container) = self.registry.lock().find_container_by_id(unique_id) else {
			tracing::debug!(unique_id, "Close request for unknown container ignored");
			return Ok(());
		};

		tracing::debug!(unique_id, "Finishing container");
		container.finish_container(params.arguments_or_empty());
		Ok(())
	}

	/// The last saved stack snapshot, empty when none was saved.
	pub fn handle_get_stack_from_host(&self) -> StackInfo {
		self.stack.lock().clone().unwrap_or_default()
	}

	pub fn handle_save_stack_to_host(&self, stack: StackInfo) {
		*self.stack.lock() = Some(stack);
	}

	/// Delivers an embedded application event to host listeners.
	pub fn handle_send_event_to_native(&self, params: CommonParams) -> Result<()> {
		let key = params
			.key
			.ok_or_else(|| Error::ProtocolError("sendEventToNative requires a key".to_string()))?;
		let delivered = self.events.dispatch(&key, params.arguments);
		tracing::debug!(key = %key, delivered, "Event delivered to host listeners");
		Ok(())
	}

	// Host API

	pub fn add_event_listener<F>(&self, key: impl Into<String>, listener: F) -> ListenerRemover
	where
		F: Fn(&str, &Arguments) + Send + Sync + 'static,
	{
		self.events.subscribe(key, listener)
	}

	/// Routes a native screen's result back to the page that opened it.
	///
	/// Codes that were never allocated, or were already resolved, are
	/// dropped.
	pub fn on_activity_result(&self, request_code: i32, result: Option<Arguments>) -> Result<()> {
		let connection = self.connection()?;
		if !connection.is_executing() {
			return Err(Error::NotReady);
		}

		let Some(page_name) = self.requests.lock().resolve(request_code) else {
			tracing::debug!(request_code, "Result for unknown request code dropped");
			return Ok(());
		};
		self.on_native_result(&page_name, result.unwrap_or_default())
	}

	pub fn find_container_by_id(&self, unique_id: &str) -> Option<Arc<dyn ContainerHandle>> {
		self.registry.lock().find_container_by_id(unique_id)
	}

	pub fn top_container(&self) -> Option<Arc<dyn ContainerHandle>> {
		self.registry.lock().top_container()
	}

	/// Number of registered containers.
	pub fn container_count(&self) -> usize {
		self.registry.lock().size()
	}

	/// Number of native requests still awaiting a result.
	pub fn pending_requests(&self) -> usize {
		self.requests.lock().len()
	}
}

impl RequestHandler for RouteBridge {
	fn handle_request(&self, method: &str, params: Value) -> Result<Value> {
		let call = EmbeddedCall::from_parts(method, params)
			.map_err(|e| Error::ProtocolError(format!("invalid '{method}' call: {e}")))?;

		match call {
			EmbeddedCall::PushNativeRoute(params) => self.handle_push_native_route(params)?,
			EmbeddedCall::PushFlutterRoute(params) => self.handle_push_flutter_route(params)?,
			EmbeddedCall::PopRoute(params) => self.handle_pop_route(params)?,
			EmbeddedCall::GetStackFromHost => {
				return Ok(serde_json::to_value(self.handle_get_stack_from_host())?);
			}
			EmbeddedCall::SaveStackToHost(stack) => self.handle_save_stack_to_host(stack),
			EmbeddedCall::SendEventToNative(params) => self.handle_send_event_to_native(params)?,
		}
		Ok(Value::Null)
	}
}

impl std::fmt::Debug for RouteBridge {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RouteBridge")
			.field("attached", &self.is_attached())
			.field("registry", &*self.registry.lock())
			.field("events", &self.events)
			.finish_non_exhaustive()
	}
}
