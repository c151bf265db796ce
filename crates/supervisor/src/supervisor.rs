//! The signal handler and its control protocol.
//!
//! The supervisor is a single Tokio task which owns the process's signal subscription. It waits on
//! two sources at once, whichever is ready first: [`Control`]s sent through a [`Supervisor`]
//! handle, and notifications from the OS.
//!
//! - Child-exit notifications trigger a reap pass, but only after
//!   [`EnableReaping`](Control::EnableReaping). Before that they are deferred.
//! - The first termination signal stops the [`Service`], then emits the [`Termination`]. Later
//!   termination signals are ignored.
//!
//! Commands flow in on one channel and the terminal value flows out on another, so the two can't
//! be confused: the [`Terminated`] receiver yields exactly one [`Termination`].

#[doc(inline)]
pub use self::{
	handle::{Supervisor, Terminated, Termination},
	messages::{Control, Ticket},
	task::{start, Service},
};

mod handle;
mod messages;
mod state;
mod task;
