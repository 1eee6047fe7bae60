//! Route bridge runtime - message channel and reply correlation
//!
//! This crate provides the low-level plumbing both sides of the bridge share:
//!
//! - **Transport**: length-prefixed JSON frames over an async byte pipe
//! - **Connection**: request/reply correlation, readiness gating, and routing
//!   of incoming requests to a [`RequestHandler`]
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │   boost-rs   │  Route bridge, registry, lifecycle, events
//! └──────┬───────┘
//!        │ implements RequestHandler
//! ┌──────▼───────┐
//! │ boost-runtime│  This crate
//! │  ┌────────┐  │
//! │  │ Conn   │  │  Reply correlation, readiness
//! │  └────────┘  │
//! │  ┌────────┐  │
//! │  │ Trans  │  │  Framed pipe transport
//! │  └────────┘  │
//! └──────────────┘
//! ```

pub mod connection;
pub mod error;
pub mod transport;

pub use connection::{
	Connection, ErrorPayload, Message, PendingReply, Request, RequestHandler, Response,
};
pub use error::{Error, Result};
pub use transport::{
	PipeTransport, PipeTransportReceiver, PipeTransportSender, Transport, TransportParts,
	TransportReceiver, in_process_pair,
};
