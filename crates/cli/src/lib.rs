//! boost-sim - scripted simulation of the boost route bridge
//!
//! Runs a host [`boost::Boost`] against a simulated embedded runtime over
//! in-process pipes and reports every host call the embedded side received.

pub mod cli;
pub mod logging;
pub mod sim;
