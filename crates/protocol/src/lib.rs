//! Wire types for the host/embedded route bridge.
//!
//! This crate contains the serde-serializable types exchanged between the
//! host screen stack and the embedded page stack. They describe what travels
//! over the message channel, nothing more.
//!
//! # Main Types
//!
//! - [`CommonParams`] - The request envelope shared by every navigation call
//! - [`StackInfo`] - Opaque snapshot of the embedded page stack
//! - [`HostCall`] - Calls issued by the host, handled by the embedded side
//! - [`EmbeddedCall`] - Calls issued by the embedded side, handled by the host
//! - [`RouteOptions`] - Immutable navigation request handed to host delegates

pub mod calls;
pub mod options;
pub mod params;

pub use calls::*;
pub use options::*;
pub use params::*;
