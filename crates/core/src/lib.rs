//! boost - route and lifecycle bridge between a host screen stack and an
//! embedded page stack
//!
//! The host owns native screens ("containers"); the embedded runtime owns a
//! page stack of its own. This crate keeps the two consistent:
//!
//! - [`RouteBridge`]: the typed call set in both directions, plus the
//!   container hooks hosts call as their screens are created, shown, hidden
//!   and destroyed
//! - [`ContainerRegistry`]: live containers and the most recently activated one
//! - [`LifecycleCoordinator`]: foreground/background and resumed/paused
//!   signals derived from host screens and container population
//! - [`EventBus`]: keyed application events in both directions
//! - [`RequestTable`]: request codes routing native results back to the page
//!   that asked for them
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use boost::{Boost, SetupOptions};
//!
//! let boost = Boost::setup(SetupOptions::default(), delegate, &runtime, transport)?;
//! let runner = boost.clone();
//! tokio::spawn(async move { runner.run().await });
//!
//! let _remover = boost.add_event_listener("login", |key, args| {
//!     tracing::info!(key, ?args, "login event");
//! });
//! boost.bridge().on_container_created(&container)?;
//! boost.bridge().on_container_appeared(&container)?;
//! ```

pub mod boost;
pub mod bridge;
pub mod container;
pub mod delegate;
pub mod events;
pub mod lifecycle;
pub mod registry;
pub mod requests;
pub mod setup;

#[cfg(test)]
pub(crate) mod testing;

pub use boost::{Boost, EmbeddedRuntime};
pub use boost_protocol::{
	AppLifecycleState, Arguments, CommonParams, EmbeddedCall, HostCall, RouteOptions,
	RouteOptionsBuilder, StackInfo,
};
pub use boost_runtime::{
	Connection, Error, PendingReply, RequestHandler, Result, TransportParts, in_process_pair,
};
pub use bridge::RouteBridge;
pub use container::{ContainerHandle, VisibilityState};
pub use delegate::BoostDelegate;
pub use events::{EventBus, ListenerId, ListenerRemover};
pub use lifecycle::{HostVisibility, LifecycleCoordinator, VisibilityTransition};
pub use registry::ContainerRegistry;
pub use requests::{MAX_PENDING_REQUESTS, REQUEST_CODE_BASE, RequestTable};
pub use setup::{SetupOptions, SetupOptionsBuilder};
