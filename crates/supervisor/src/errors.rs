//! Error types.

use miette::Diagnostic;
use thiserror::Error;

use crate::Signal;

/// Errors which stop the supervisor from being started or from delivering its terminal value.
///
/// Anything that goes wrong _while_ supervising (a failed reap, a failed service stop) is only
/// logged, because the process must always remain able to exit.
#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum CriticalError {
	/// The OS refused a signal subscription.
	#[error("cannot subscribe to {signal}: {err}")]
	#[diagnostic(code(runmq::supervisor::subscribe))]
	Subscribe {
		/// The signal that could not be subscribed to.
		signal: Signal,

		/// The underlying error.
		#[source]
		err: std::io::Error,
	},

	/// The supervisor task ended without producing its terminal value.
	///
	/// This happens if the task panicked, or if its signal source closed after every
	/// [`Supervisor`](crate::supervisor::Supervisor) handle was dropped.
	#[error("supervisor task ended without a termination")]
	#[diagnostic(code(runmq::supervisor::gone))]
	SupervisorGone,
}

/// The error a [`Service`](crate::supervisor::Service) returns when it fails to stop.
pub type StopError = Box<dyn std::error::Error + Send + Sync>;
