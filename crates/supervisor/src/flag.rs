//! A flag that can be raised to wake a task.

use std::{
	pin::Pin,
	sync::{
		atomic::{AtomicBool, Ordering::SeqCst},
		Arc,
	},
};

use futures::{
	future::Future,
	task::{AtomicWaker, Context, Poll},
};

#[derive(Debug)]
struct Inner {
	waker: AtomicWaker,
	set: AtomicBool,
}

/// A raise-once flag with a single waiter.
///
/// Only the task that polled it last is woken. Every ticket has its own flag, so that's the
/// task awaiting that ticket.
#[derive(Clone, Debug)]
pub struct Flag(Arc<Inner>);

impl Default for Flag {
	fn default() -> Self {
		Self::new(false)
	}
}

impl Flag {
	pub fn new(value: bool) -> Self {
		Self(Arc::new(Inner {
			waker: AtomicWaker::new(),
			set: AtomicBool::new(value),
		}))
	}

	pub fn raised(&self) -> bool {
		self.0.set.load(SeqCst)
	}

	pub fn raise(&self) {
		self.0.set.store(true, SeqCst);
		self.0.waker.wake();
	}
}

impl Future for Flag {
	type Output = ();

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
		if self.0.set.load(SeqCst) {
			return Poll::Ready(());
		}

		self.0.waker.register(cx.waker());

		// checked again after registering, or a raise in between would be lost
		if self.0.set.load(SeqCst) {
			Poll::Ready(())
		} else {
			Poll::Pending
		}
	}
}
