//! Lifecycle coordination.
//!
//! Two independent signals are derived here:
//!
//! - **Host visibility** (foreground/background): reference count of started
//!   host screens, with configuration-change suppression.
//! - **App activity** (resumed/paused): driven only by container registry
//!   population.
//!
//! The coordinator holds state only. It returns the transitions that should
//! be broadcast and leaves the broadcasting to the caller.

use std::sync::atomic::{AtomicBool, Ordering};

use boost_protocol::AppLifecycleState;
use boost_runtime::{Error, Result};
use parking_lot::Mutex;

/// A host visibility transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityTransition {
	Foreground,
	Background,
}

impl VisibilityTransition {
	pub fn from_background(background: bool) -> Self {
		if background {
			Self::Background
		} else {
			Self::Foreground
		}
	}

	pub fn is_background(self) -> bool {
		self == Self::Background
	}
}

/// Reference count of started host screens.
#[derive(Debug, Default)]
pub struct HostVisibility {
	started: usize,
	changing_configurations: bool,
}

impl HostVisibility {
	pub fn new() -> Self {
		Self::default()
	}

	/// A host screen started. Fires `Foreground` on 0→1 unless the previous
	/// stop was a configuration change.
	pub fn screen_started(&mut self) -> Option<VisibilityTransition> {
		self.started += 1;
		let suppressed = std::mem::take(&mut self.changing_configurations);
		(self.started == 1 && !suppressed).then_some(VisibilityTransition::Foreground)
	}

	/// A host screen stopped. Fires `Background` on 1→0 unless the screen is
	/// being torn down for a configuration change.
	pub fn screen_stopped(&mut self, changing_configurations: bool) -> Option<VisibilityTransition> {
		self.changing_configurations = changing_configurations;
		if self.started == 0 {
			tracing::debug!("Screen stop without matching start ignored");
			return None;
		}
		self.started -= 1;
		(self.started == 0 && !changing_configurations).then_some(VisibilityTransition::Background)
	}

	/// Number of currently started screens.
	pub fn started(&self) -> usize {
		self.started
	}
}

/// Derives and records both lifecycle signals.
#[derive(Debug)]
pub struct LifecycleCoordinator {
	override_foreground_background: bool,
	visibility: Mutex<HostVisibility>,
	in_background: AtomicBool,
	app_state: Mutex<AppLifecycleState>,
	current_screen: Mutex<Option<String>>,
}

impl LifecycleCoordinator {
	/// With `override_foreground_background` set, visibility transitions are
	/// never auto-broadcast; the host dispatches them manually.
	pub fn new(override_foreground_background: bool) -> Self {
		Self {
			override_foreground_background,
			visibility: Mutex::new(HostVisibility::new()),
			in_background: AtomicBool::new(false),
			app_state: Mutex::new(AppLifecycleState::Resumed),
			current_screen: Mutex::new(None),
		}
	}

	pub fn is_overridden(&self) -> bool {
		self.override_foreground_background
	}

	/// Records a screen start; returns the transition to broadcast, if any.
	pub fn screen_started(&self) -> Option<VisibilityTransition> {
		let transition = self.visibility.lock().screen_started();
		self.auto_transition(transition)
	}

	/// Records a screen stop; returns the transition to broadcast, if any.
	pub fn screen_stopped(&self, changing_configurations: bool) -> Option<VisibilityTransition> {
		let transition = self.visibility.lock().screen_stopped(changing_configurations);
		self.auto_transition(transition)
	}

	fn auto_transition(
		&self,
		transition: Option<VisibilityTransition>,
	) -> Option<VisibilityTransition> {
		let transition = transition?;
		if self.override_foreground_background {
			tracing::debug!(?transition, "Visibility transition left to manual dispatch");
			return None;
		}
		self.set_in_background(transition.is_background());
		Some(transition)
	}

	/// Validates a manual foreground/background dispatch.
	///
	/// # Errors
	///
	/// Returns [`Error::OverrideDisabled`] unless the override switch is on.
	pub fn manual_transition(&self, background: bool) -> Result<VisibilityTransition> {
		if !self.override_foreground_background {
			return Err(Error::OverrideDisabled);
		}
		Ok(VisibilityTransition::from_background(background))
	}

	pub fn set_in_background(&self, background: bool) {
		self.in_background.store(background, Ordering::SeqCst);
	}

	pub fn is_app_in_background(&self) -> bool {
		self.in_background.load(Ordering::SeqCst)
	}

	/// Maps a registry size change to the app state to broadcast.
	///
	/// Only 0→1 (`Resumed`) and 1→0 (`Paused`) produce a state.
	pub fn population_changed(&self, before: usize, after: usize) -> Option<AppLifecycleState> {
		let state = match (before, after) {
			(0, 1) => AppLifecycleState::Resumed,
			(1, 0) => AppLifecycleState::Paused,
			_ => return None,
		};
		*self.app_state.lock() = state;
		Some(state)
	}

	/// Last app state derived from registry population.
	pub fn app_state(&self) -> AppLifecycleState {
		*self.app_state.lock()
	}

	pub fn set_current_screen(&self, screen_id: impl Into<String>) {
		*self.current_screen.lock() = Some(screen_id.into());
	}

	/// The host screen most recently created or resumed.
	pub fn current_screen(&self) -> Option<String> {
		self.current_screen.lock().clone()
	}
}
