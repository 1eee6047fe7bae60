//! Host navigation delegate.

use boost_protocol::RouteOptions;
use boost_runtime::Result;

/// Performs navigation on behalf of the embedded runtime.
///
/// Installed by the host once during setup. The bridge calls it without
/// holding any internal lock, so implementations may call back into the
/// bridge (for example to register the container they just created).
pub trait BoostDelegate: Send + Sync {
	/// Opens a native host screen.
	///
	/// `options.request_code()` is set; the host reports the screen's result
	/// later through [`Boost::on_activity_result`](crate::Boost::on_activity_result)
	/// with that code.
	fn push_native_route(&self, options: RouteOptions) -> Result<()>;

	/// Opens a new host container hosting an embedded page.
	///
	/// `options.unique_id()` is always set.
	fn push_flutter_route(&self, options: RouteOptions) -> Result<()>;
}
