use tokio::{
	sync::{mpsc, oneshot},
	task::JoinHandle,
};
use tracing::{error, trace};

use super::messages::{Control, ControlMessage, Ticket};
use crate::{
	errors::{CriticalError, StopError},
	flag::Flag,
	Signal,
};

/// A handle to the supervisor task.
///
/// This is the sending side of the control queue. It is cheap to clone, and sending never blocks.
/// Dropping every handle does not stop the supervisor: it keeps waiting for signals.
#[derive(Debug, Clone)]
pub struct Supervisor {
	pub(crate) control_queue: mpsc::UnboundedSender<ControlMessage>,

	/// Raised once the supervisor has stopped processing controls.
	pub(crate) gone: Flag,
}

impl Supervisor {
	/// Queue a control.
	///
	/// In general prefer the dedicated methods.
	pub fn control(&self, control: Control) -> Ticket {
		if self.gone.raised() {
			return Ticket::cancelled();
		}

		let (message, ticket) = ControlMessage::new(control);

		// a refused message is dropped right here, which resolves its ticket
		if self.control_queue.send(message).is_err() {
			trace!(?control, "supervisor is gone, control not queued");
		}

		ticket
	}

	/// Start reaping on child-exit notifications. See [`Control::EnableReaping`].
	pub fn enable_reaping(&self) -> Ticket {
		self.control(Control::EnableReaping)
	}

	/// Reap already-exited children now. See [`Control::ReapNow`].
	pub fn reap_now(&self) -> Ticket {
		self.control(Control::ReapNow)
	}

	/// Whether the supervisor has retired its control queue.
	pub fn is_terminated(&self) -> bool {
		self.gone.raised()
	}
}

/// The receiving side of the supervisor's terminal value.
///
/// There is exactly one of these per supervisor, and [`wait`](Terminated::wait) consumes it.
#[derive(Debug)]
pub struct Terminated {
	pub(crate) termination: oneshot::Receiver<Termination>,
	pub(crate) task: JoinHandle<()>,
}

impl Terminated {
	/// Wait until the OS has asked the process to terminate and the service has been stopped.
	///
	/// This also waits for the supervisor task to finish, so nothing it does can outlive this.
	pub async fn wait(self) -> Result<Termination, CriticalError> {
		let termination = self
			.termination
			.await
			.map_err(|_| CriticalError::SupervisorGone);

		if let Err(err) = self.task.await {
			error!(%err, "supervisor task did not finish cleanly");
		}

		termination
	}
}

/// The terminal value of a supervisor.
#[derive(Debug)]
pub struct Termination {
	/// The signal that triggered shutdown.
	pub signal: Signal,

	/// Why the service failed to stop, if it did.
	pub stop_error: Option<StopError>,
}

impl Termination {
	/// Whether the service's stop routine succeeded.
	#[must_use]
	pub const fn stopped_cleanly(&self) -> bool {
		self.stop_error.is_none()
	}
}
