use nix::{
	errno::Errno,
	sys::wait::{waitpid, WaitPidFlag},
	unistd::Pid,
};
use tokio::{
	select,
	signal::unix::{signal, Signal as TokioSignal, SignalKind},
};
use tracing::{debug, trace};

use super::{ChildId, ProcessOs, Reap, SignalSource};
use crate::{errors::CriticalError, Signal};

/// The real operating system, on unix.
///
/// Subscriptions go through [`tokio::signal::unix`] and so require a Tokio runtime with signal
/// support. Reaping is `waitpid(-1, WNOHANG)`: it collects _any_ exited child of this process,
/// which is exactly why the supervisor gates it behind an explicit enable.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnixOs;

/// Live signal subscriptions on unix.
#[derive(Debug)]
pub struct UnixSignals {
	interrupt: Option<TokioSignal>,
	terminate: Option<TokioSignal>,
	child: Option<TokioSignal>,
}

impl ProcessOs for UnixOs {
	type Signals = UnixSignals;

	fn subscribe(&mut self, kinds: &[Signal]) -> Result<Self::Signals, CriticalError> {
		let listen = |sig: Signal| -> Result<Option<TokioSignal>, CriticalError> {
			if !kinds.contains(&sig) {
				return Ok(None);
			}

			trace!(%sig, "listening for unix signal");
			signal(SignalKind::from_raw(sig.to_nix() as i32))
				.map(Some)
				.map_err(|err| CriticalError::Subscribe { signal: sig, err })
		};

		Ok(UnixSignals {
			interrupt: listen(Signal::Interrupt)?,
			terminate: listen(Signal::Terminate)?,
			child: listen(Signal::ChildExit)?,
		})
	}

	fn reap_one(&mut self) -> Reap {
		loop {
			match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
				Ok(status) => {
					return status
						.pid()
						.map_or(Reap::NoneExited, |pid| Reap::Reaped(ChildId(pid.as_raw())));
				}
				Err(Errno::ECHILD) => return Reap::NoChildren,
				Err(Errno::EINTR) => trace!("waitpid interrupted, retrying"),
				Err(errno) => return Reap::Failed(errno.into()),
			}
		}
	}
}

async fn next(sig: &mut Option<TokioSignal>) -> Option<()> {
	match sig {
		Some(s) => s.recv().await,
		None => std::future::pending().await,
	}
}

impl SignalSource for UnixSignals {
	async fn recv(&mut self) -> Option<Signal> {
		let sig = select! {
			Some(()) = next(&mut self.interrupt) => Signal::Interrupt,
			Some(()) = next(&mut self.terminate) => Signal::Terminate,
			Some(()) = next(&mut self.child) => Signal::ChildExit,
			else => return None,
		};

		debug!(%sig, "received unix signal");
		Some(sig)
	}
}
