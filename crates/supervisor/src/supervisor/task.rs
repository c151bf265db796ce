use futures::future::BoxFuture;
use tokio::{
	select,
	sync::{mpsc, oneshot},
};
use tracing::{debug, error, info, trace, warn};

use super::{
	handle::{Supervisor, Terminated, Termination},
	messages::{Control, ControlMessage},
	state::State,
};
use crate::{
	errors::{CriticalError, StopError},
	flag::Flag,
	os::{ProcessOs, SignalSource},
	reaper::reap_exited,
	Signal,
};

/// The managed service, as far as the supervisor is concerned.
pub trait Service: Send + 'static {
	/// A name for logs.
	fn name(&self) -> &str;

	/// Stop the service gracefully.
	///
	/// Called at most once, from the supervisor task, when a termination signal arrives. No reap
	/// pass runs while this is in progress, so it may wait on its own child processes.
	fn stop(&mut self) -> BoxFuture<'_, Result<(), StopError>>;
}

/// Start the supervisor.
///
/// This subscribes to [`Signal::ALL`] before returning, so no signal delivered after this call
/// can be missed: call it before any other startup work. The supervisor task is then spawned on
/// the current Tokio runtime, armed with reaping disabled.
///
/// Returns a [`Supervisor`] handle to send controls with, and the [`Terminated`] receiver for the
/// terminal value.
///
/// # Panics
///
/// Panics if called outside of a Tokio runtime.
pub fn start<O: ProcessOs, S: Service>(
	mut os: O,
	service: S,
) -> Result<(Supervisor, Terminated), CriticalError> {
	let signals = os.subscribe(&Signal::ALL)?;

	let (control_queue, controls) = mpsc::unbounded_channel();
	let (terminal, termination) = oneshot::channel();
	let gone = Flag::default();

	let task = SupervisorTask {
		os,
		signals,
		service,
		controls,
		gone: gone.clone(),
		state: State::Armed,
		deferred: 0,
	};

	let task = tokio::spawn(task.run(terminal));

	Ok((
		Supervisor {
			control_queue,
			gone,
		},
		Terminated { termination, task },
	))
}

struct SupervisorTask<O: ProcessOs, S> {
	os: O,
	signals: O::Signals,
	service: S,
	controls: mpsc::UnboundedReceiver<ControlMessage>,
	gone: Flag,
	state: State,

	/// Child-exit notifications received while reaping was not enabled.
	deferred: usize,
}

impl<O: ProcessOs, S: Service> SupervisorTask<O, S> {
	async fn run(mut self, terminal: oneshot::Sender<Termination>) {
		debug!(service=%self.service.name(), "supervisor armed, reaping disabled");

		let Some(signal) = self.supervise().await else {
			warn!("signal source closed and all handles dropped, supervisor exiting");
			self.retire();
			return;
		};

		let stop_error = self.shut_down(signal).await;
		self.retire();

		if terminal.send(Termination { signal, stop_error }).is_err() {
			debug!("nobody is waiting for the termination");
		}
	}

	/// Process controls and signals until a termination signal arrives.
	async fn supervise(&mut self) -> Option<Signal> {
		let mut controls_open = true;
		let mut signals_open = true;

		while controls_open || signals_open {
			select! {
				message = self.controls.recv(), if controls_open => match message {
					Some(message) => {
						self.apply(message.control);
						message.complete();
					}
					None => {
						debug!("all supervisor handles dropped");
						controls_open = false;
					}
				},
				sig = self.signals.recv(), if signals_open => match sig {
					Some(sig) if sig.is_termination() => return Some(sig),
					Some(_) => self.child_exited(),
					None => {
						warn!("signal source closed");
						signals_open = false;
					}
				},
			}
		}

		None
	}

	fn apply(&mut self, control: Control) {
		trace!(?control, state=?self.state, "processing control");
		match control {
			Control::EnableReaping => {
				if self.state == State::Armed {
					self.state = State::Reaping;
					debug!(deferred = self.deferred, "reaping enabled");
				}
			}
			Control::ReapNow => {
				let pass = reap_exited(&mut self.os);
				debug!(reaped = pass.reaped, failures = pass.failures, "reaped on request");
			}
		}
	}

	fn child_exited(&mut self) {
		if self.state.reaping() {
			reap_exited(&mut self.os);
		} else {
			self.deferred += 1;
			trace!(
				deferred = self.deferred,
				"child exit notification deferred, reaping not enabled"
			);
		}
	}

	/// Stop the service, returning its error if it failed.
	async fn shut_down(&mut self, signal: Signal) -> Option<StopError> {
		let was_reaping = self.state.reaping();
		self.state = State::ShuttingDown;

		let name = self.service.name().to_owned();
		info!(%signal, service=%name, "termination requested, stopping service");

		let signals = &mut self.signals;
		let deferred = &mut self.deferred;
		let mut stop = self.service.stop();
		let result = loop {
			select! {
				result = &mut stop => break result,
				Some(sig) = signals.recv() => {
					if sig.is_termination() {
						warn!(%sig, "already shutting down, ignoring");
					} else {
						*deferred += 1;
					}
				}
			}
		};
		drop(stop);

		let stop_error = match result {
			Ok(()) => {
				info!(service=%name, "service stopped");
				None
			}
			Err(err) => {
				error!(service=%name, %err, "failed to stop service");
				Some(err)
			}
		};

		if was_reaping {
			let pass = reap_exited(&mut self.os);
			debug!(reaped = pass.reaped, "final reap pass");
		}

		stop_error
	}

	/// Stop processing controls for good.
	fn retire(&mut self) {
		self.state = State::Terminated;
		self.controls.close();
		self.gone.raise();

		let mut dropped = 0_usize;
		while self.controls.try_recv().is_ok() {
			dropped += 1;
		}
		if dropped > 0 {
			debug!(dropped, "discarded controls sent during shutdown");
		}
	}
}
