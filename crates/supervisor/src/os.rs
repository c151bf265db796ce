//! The operating system capabilities the supervisor needs.
//!
//! Signal subscription and child reaping are platform-specific, and a test harness cannot safely
//! call `waitpid(-1)` in a process that runs other tests. The supervisor therefore only talks to
//! the OS through [`ProcessOs`], which [`UnixOs`] implements for real and the test suite fakes.

use std::{fmt, future::Future, io};

use crate::{errors::CriticalError, Signal};

#[cfg(unix)]
#[doc(inline)]
pub use unix::{UnixOs, UnixSignals};

#[cfg(unix)]
mod unix;

#[cfg(test)]
pub(crate) mod testos;

/// The process ID of a reaped child.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChildId(pub i32);

impl fmt::Display for ChildId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.fmt(f)
	}
}

/// The outcome of one non-blocking reap attempt.
#[derive(Debug)]
pub enum Reap {
	/// A child had exited and its status was collected.
	Reaped(ChildId),

	/// There are children, but none of them has exited yet.
	NoneExited,

	/// There are no children at all.
	NoChildren,

	/// The attempt failed for another reason.
	Failed(io::Error),
}

/// A subscription to OS notifications.
pub trait SignalSource: Send + 'static {
	/// Wait for the next notification.
	///
	/// Returns `None` once the source is closed; it will never deliver again after that.
	fn recv(&mut self) -> impl Future<Output = Option<Signal>> + Send;
}

/// Signal subscription and child reaping.
pub trait ProcessOs: Send + 'static {
	/// The subscription type returned by [`subscribe`](ProcessOs::subscribe).
	type Signals: SignalSource;

	/// Subscribe to the given notifications.
	///
	/// The subscription must be active when this returns: a notification delivered afterwards is
	/// queued until the returned source is polled.
	fn subscribe(&mut self, kinds: &[Signal]) -> Result<Self::Signals, CriticalError>;

	/// Collect one exited child, if there is one, without blocking.
	fn reap_one(&mut self) -> Reap;
}
