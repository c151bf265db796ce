use std::{
	future::Future,
	pin::Pin,
	sync::{
		atomic::{AtomicBool, Ordering::SeqCst},
		Arc,
	},
	task::{Context, Poll},
};

use crate::flag::Flag;

/// A command for the supervisor.
///
/// Commands are processed in the order they are sent. They only take effect while the supervisor
/// is waiting for signals; once shutdown has started, queued and newly sent commands are dropped
/// without being processed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Control {
	/// Start reaping on child-exit notifications.
	///
	/// Until this is sent, child-exit notifications are deferred: whoever spawned those children
	/// is assumed to be waiting on them synchronously, and reaping would steal their exit status.
	/// Enabling does not reap by itself; follow up with [`ReapNow`](Control::ReapNow) to collect
	/// children whose notifications were deferred.
	EnableReaping,

	/// Run one reap pass right now, whether or not reaping is enabled.
	ReapNow,
}

/// A queued control and the means to resolve its ticket.
///
/// However the message goes away, its ticket resolves: dropping it unprocessed (queue drained,
/// send refused, supervisor gone) raises the flag without marking it processed.
#[derive(Debug)]
pub(crate) struct ControlMessage {
	pub control: Control,
	resolved: Flag,
	processed: Arc<AtomicBool>,
}

impl ControlMessage {
	pub fn new(control: Control) -> (Self, Ticket) {
		let resolved = Flag::default();
		let processed = Arc::new(AtomicBool::new(false));
		let ticket = Ticket {
			resolved: resolved.clone(),
			processed: processed.clone(),
		};

		(
			Self {
				control,
				resolved,
				processed,
			},
			ticket,
		)
	}

	/// Mark the control as processed and resolve its ticket.
	pub fn complete(self) {
		self.processed.store(true, SeqCst);
	}
}

impl Drop for ControlMessage {
	fn drop(&mut self) {
		self.resolved.raise();
	}
}

/// A future which resolves when a [`Control`] has been processed, or can no longer be.
///
/// Dropping a ticket does not cancel the control. Clones share one waker: only the task that
/// last polled any of them is woken.
#[derive(Debug, Clone)]
pub struct Ticket {
	resolved: Flag,
	processed: Arc<AtomicBool>,
}

impl Ticket {
	pub(crate) fn cancelled() -> Self {
		Self {
			resolved: Flag::new(true),
			processed: Arc::default(),
		}
	}

	/// Whether the control was actually processed.
	///
	/// Once the ticket has resolved, `false` means the supervisor had already begun shutting down.
	#[must_use]
	pub fn processed(&self) -> bool {
		self.processed.load(SeqCst)
	}
}

impl Future for Ticket {
	type Output = ();

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		Pin::new(&mut self.get_mut().resolved).poll(cx)
	}
}
