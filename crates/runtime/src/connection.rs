//! Message channel connection between the host and the embedded runtime.
//!
//! This module implements the request/reply correlation layer on top of the
//! transport. The same type serves both sides of the boundary. It handles:
//! - Generating unique request IDs
//! - Correlating replies with pending requests
//! - Routing incoming requests to the installed [`RequestHandler`]
//! - Failing fast when the embedded runtime is not executing yet
//!
//! # Message Flow
//!
//! 1. Caller invokes [`Connection::call`] with a method name and params
//! 2. Connection checks readiness, allocates an ID and a oneshot channel
//! 3. Request is queued for the writer task; `call` returns immediately
//! 4. The other side handles the request and writes a reply
//! 5. Dispatch loop correlates the reply by ID and completes the oneshot
//! 6. The [`PendingReply`] future held by the caller resolves exactly once
//!
//! [`Connection::notify`] skips steps 4–6: the request carries no reply slot.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::task::{Context, Poll};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::error::{Error, Result};
use crate::transport::{Transport, TransportParts, TransportReceiver};

/// Handles requests arriving from the other side of the channel.
///
/// Called on the connection's dispatch loop, one request at a time, in
/// arrival order. The returned value (or error) becomes the reply when the
/// sender asked for one.
pub trait RequestHandler: Send + Sync {
	fn handle_request(&self, method: &str, params: Value) -> Result<Value>;
}

/// Request message sent to the other side
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
	/// Unique request ID for correlating replies
	pub id: u32,
	/// Method name to invoke
	pub method: String,
	/// Method parameters
	#[serde(default, skip_serializing_if = "Value::is_null")]
	pub params: Value,
	/// Whether the sender holds a reply slot for this request
	#[serde(default = "default_expects_reply")]
	pub expects_reply: bool,
}

fn default_expects_reply() -> bool {
	true
}

/// Reply message correlated to a [`Request`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
	/// Request ID this reply correlates to
	pub id: u32,
	/// Success result (mutually exclusive with error)
	#[serde(skip_serializing_if = "Option::is_none")]
	pub result: Option<Value>,
	/// Error result (mutually exclusive with result)
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<ErrorPayload>,
}

impl Response {
	fn from_result(id: u32, result: Result<Value>) -> Self {
		match result {
			Ok(value) => Self {
				id,
				result: Some(value),
				error: None,
			},
			Err(e) => Self {
				id,
				result: None,
				error: Some(ErrorPayload {
					name: e.name().to_string(),
					message: e.to_string(),
				}),
			},
		}
	}
}

/// Error details carried in a reply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
	/// Error type name (e.g., "MissingDelegate", "NotReady")
	pub name: String,
	/// Error message
	pub message: String,
}

/// Discriminated union of channel messages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
	/// Request message (has `method` field)
	Request(Request),
	/// Reply message (has `id` but no `method`)
	Response(Response),
	/// Unknown message type (forward-compatible catch-all)
	Unknown(Value),
}

/// Pending reply slots keyed by request ID.
type CallbackMap = Arc<Mutex<HashMap<u32, oneshot::Sender<Result<Value>>>>>;

/// RAII guard removing the reply slot when a [`PendingReply`] is dropped unanswered.
struct CancelGuard {
	id: u32,
	callbacks: CallbackMap,
	completed: bool,
}

impl CancelGuard {
	fn new(id: u32, callbacks: CallbackMap) -> Self {
		Self {
			id,
			callbacks,
			completed: false,
		}
	}

	fn complete(&mut self) {
		self.completed = true;
	}
}

impl Drop for CancelGuard {
	fn drop(&mut self) {
		if self.completed {
			return;
		}
		if self.callbacks.lock().remove(&self.id).is_some() {
			tracing::debug!(id = self.id, "CancelGuard: removed abandoned reply slot");
		}
	}
}

/// Future returned by [`Connection::call`], resolving with the reply.
///
/// Dropping it abandons the reply: a late reply for the request is ignored.
pub struct PendingReply {
	id: u32,
	rx: oneshot::Receiver<Result<Value>>,
	guard: CancelGuard,
}

impl PendingReply {
	/// Request ID this future is waiting on.
	pub fn id(&self) -> u32 {
		self.id
	}
}

impl Future for PendingReply {
	type Output = Result<Value>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		match Pin::new(&mut self.rx).poll(cx) {
			Poll::Ready(result) => {
				self.guard.complete();
				Poll::Ready(result.map_err(|_| Error::ChannelClosed).and_then(|r| r))
			}
			Poll::Pending => Poll::Pending,
		}
	}
}

impl std::fmt::Debug for PendingReply {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PendingReply").field("id", &self.id).finish()
	}
}

/// One side of the message channel.
///
/// Manages request/reply correlation and request routing.
/// Uses sequential request IDs and oneshot channels for correlation.
pub struct Connection {
	/// Sequential request ID counter
	last_id: AtomicU32,
	/// Pending reply slots keyed by request ID
	callbacks: CallbackMap,
	/// Outbound queue drained by the writer task, in send order
	outbound_tx: mpsc::UnboundedSender<Value>,
	/// Transport halves and queues, taken once by run()
	transport_sender: Mutex<Option<Box<dyn Transport>>>,
	transport_receiver: Mutex<Option<Box<dyn TransportReceiver>>>,
	message_rx: Mutex<Option<mpsc::UnboundedReceiver<Value>>>,
	outbound_rx: Mutex<Option<mpsc::UnboundedReceiver<Value>>>,
	/// Handler for incoming requests
	handler: RwLock<Option<Arc<dyn RequestHandler>>>,
	/// Whether the remote runtime is executing and able to take calls
	executing: AtomicBool,
}

impl Connection {
	/// Create a new Connection with the given transport
	pub fn new(parts: TransportParts) -> Self {
		let TransportParts {
			sender,
			receiver,
			message_rx,
		} = parts;

		let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

		Self {
			last_id: AtomicU32::new(0),
			callbacks: Arc::new(Mutex::new(HashMap::new())),
			outbound_tx,
			transport_sender: Mutex::new(Some(sender)),
			transport_receiver: Mutex::new(Some(receiver)),
			message_rx: Mutex::new(Some(message_rx)),
			outbound_rx: Mutex::new(Some(outbound_rx)),
			handler: RwLock::new(None),
			executing: AtomicBool::new(false),
		}
	}

	/// Installs the handler for incoming requests, replacing any previous one.
	pub fn set_handler(&self, handler: Arc<dyn RequestHandler>) {
		*self.handler.write() = Some(handler);
	}

	/// Records whether the remote runtime is executing.
	pub fn set_executing(&self, executing: bool) {
		tracing::debug!(executing, "Connection readiness changed");
		self.executing.store(executing, Ordering::SeqCst);
	}

	pub fn is_executing(&self) -> bool {
		self.executing.load(Ordering::SeqCst)
	}

	/// Sends a request carrying a reply slot.
	///
	/// Never waits: fails immediately with [`Error::NotReady`] when the remote
	/// runtime is not executing, otherwise queues the request and returns a
	/// future for the reply.
	pub fn call(&self, method: &str, params: Value) -> Result<PendingReply> {
		self.ensure_ready()?;
		let id = self.last_id.fetch_add(1, Ordering::SeqCst);

		let (tx, rx) = oneshot::channel();
		self.callbacks.lock().insert(id, tx);
		let guard = CancelGuard::new(id, Arc::clone(&self.callbacks));

		tracing::debug!(id, method, "Sending call");
		self.enqueue(Request {
			id,
			method: method.to_string(),
			params,
			expects_reply: true,
		})?;

		Ok(PendingReply { id, rx, guard })
	}

	/// Sends a fire-and-forget request.
	pub fn notify(&self, method: &str, params: Value) -> Result<()> {
		self.ensure_ready()?;
		let id = self.last_id.fetch_add(1, Ordering::SeqCst);

		tracing::debug!(id, method, "Sending notification");
		self.enqueue(Request {
			id,
			method: method.to_string(),
			params,
			expects_reply: false,
		})
	}

	fn ensure_ready(&self) -> Result<()> {
		if self.is_executing() {
			Ok(())
		} else {
			Err(Error::NotReady)
		}
	}

	fn enqueue<T: Serialize>(&self, message: T) -> Result<()> {
		let value = serde_json::to_value(message)?;
		if self.outbound_tx.send(value).is_err() {
			tracing::error!("Failed to queue message: outbound channel closed");
			return Err(Error::ChannelClosed);
		}
		Ok(())
	}

	/// Run the message dispatch loop until the transport closes.
	///
	/// Pending replies fail with [`Error::ChannelClosed`] once the loop ends.
	pub async fn run(self: &Arc<Self>) -> Result<()> {
		let (
			Some(transport_receiver),
			Some(mut transport_sender),
			Some(mut outbound_rx),
			Some(mut message_rx),
		) = (
			self.transport_receiver.lock().take(),
			self.transport_sender.lock().take(),
			self.outbound_rx.lock().take(),
			self.message_rx.lock().take(),
		) else {
			return Err(Error::ProtocolError(
				"run() can only be called once".to_string(),
			));
		};

		let reader_handle = tokio::spawn(async move {
			if let Err(e) = transport_receiver.run().await {
				tracing::error!("Transport read error: {}", e);
			}
		});

		let writer_handle = tokio::spawn(async move {
			while let Some(message) = outbound_rx.recv().await {
				if let Err(e) = transport_sender.send(message).await {
					tracing::error!("Transport write error: {}", e);
					break;
				}
			}
		});

		while let Some(message_value) = message_rx.recv().await {
			match serde_json::from_value::<Message>(message_value) {
				Ok(message) => self.dispatch_internal(message),
				Err(e) => tracing::error!("Failed to parse message: {}", e),
			}
		}

		tracing::debug!("Transport closed, failing pending replies");
		self.callbacks.lock().clear();
		self.set_executing(false);

		let _ = reader_handle.await;
		writer_handle.abort();
		Ok(())
	}

	/// Dispatch an incoming message (test-only public version)
	#[cfg(test)]
	pub fn dispatch(&self, message: Message) {
		self.dispatch_internal(message)
	}

	fn dispatch_internal(&self, message: Message) {
		match message {
			Message::Response(response) => {
				let Some(callback) = self.callbacks.lock().remove(&response.id) else {
					tracing::debug!(
						id = response.id,
						"Reply for unknown or abandoned request (ignored)"
					);
					return;
				};

				let result = match response.error {
					Some(error) => Err(Error::Remote {
						name: error.name,
						message: error.message,
					}),
					None => Ok(response.result.unwrap_or(Value::Null)),
				};
				let _ = callback.send(result);
			}
			Message::Request(request) => self.handle_request(request),
			Message::Unknown(value) => {
				tracing::debug!(
					"Unknown message type (forward-compatible, ignored): {}",
					serde_json::to_string(&value)
						.unwrap_or_else(|_| "<serialization failed>".to_string())
				);
			}
		}
	}

	fn handle_request(&self, request: Request) {
		let Request {
			id,
			method,
			params,
			expects_reply,
		} = request;
		tracing::debug!(id, method = %method, "Handling request");

		// Clone out of the lock so the handler may call back into the connection.
		let handler = self.handler.read().clone();
		let result = match handler {
			Some(handler) => handler.handle_request(&method, params),
			None => Err(Error::ProtocolError(format!(
				"no request handler installed for '{method}'"
			))),
		};

		if let Err(e) = &result {
			tracing::warn!(id, method = %method, error = %e, "Request failed");
		}

		if expects_reply && self.enqueue(Response::from_result(id, result)).is_err() {
			tracing::debug!(id, "Reply dropped: channel closed");
		}
	}
}
