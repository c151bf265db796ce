//! Signal types for the runmq entrypoint.
//!
//! The entrypoint runs as PID 1 and only ever subscribes to a small, closed set of
//! notifications: the two termination requests, and the child-exit notification used to drive
//! zombie reaping. [`Signal`] is that set.
//!
//! ## Features
//!
//! - `serde`: Enables serde support for [`Signal`].

#![warn(clippy::unwrap_used, missing_docs, rustdoc::unescaped_backticks)]
#![deny(rust_2018_idioms)]

use std::fmt;

/// A notification delivered to the entrypoint process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum Signal {
	/// Received to indicate that the process should stop.
	///
	/// On Unix, this is `SIGINT`. It is generally produced by a user at a terminal attached to
	/// the container (`docker run -it` and Ctrl-C).
	Interrupt,

	/// Received to indicate that the process should stop.
	///
	/// On Unix, this is `SIGTERM`. This is what container runtimes send on `stop`, before
	/// following up with `SIGKILL` after their own grace period.
	Terminate,

	/// Received when a child process has exited, stopped, or continued.
	///
	/// On Unix, this is `SIGCHLD`. The kernel coalesces pending deliveries, so one notification
	/// may stand for several exited children.
	ChildExit,
}

impl Signal {
	/// Every notification the entrypoint subscribes to.
	pub const ALL: [Self; 3] = [Self::Interrupt, Self::Terminate, Self::ChildExit];

	/// Whether this notification asks the process to shut down.
	#[must_use]
	pub const fn is_termination(self) -> bool {
		matches!(self, Self::Interrupt | Self::Terminate)
	}

	/// The conventional name of the signal, as it would be written in a shell.
	#[must_use]
	pub const fn name(self) -> &'static str {
		match self {
			Self::Interrupt => "SIGINT",
			Self::Terminate => "SIGTERM",
			Self::ChildExit => "SIGCHLD",
		}
	}

	/// Converts to a [`nix::Signal`][nix::sys::signal::Signal].
	#[cfg(unix)]
	#[must_use]
	pub const fn to_nix(self) -> nix::sys::signal::Signal {
		use nix::sys::signal::Signal as NixSignal;
		match self {
			Self::Interrupt => NixSignal::SIGINT,
			Self::Terminate => NixSignal::SIGTERM,
			Self::ChildExit => NixSignal::SIGCHLD,
		}
	}

	/// Converts from a [`nix::Signal`][nix::sys::signal::Signal].
	///
	/// Returns `None` for signals the entrypoint does not subscribe to.
	#[cfg(unix)]
	#[must_use]
	pub const fn from_nix(sig: nix::sys::signal::Signal) -> Option<Self> {
		use nix::sys::signal::Signal as NixSignal;
		match sig {
			NixSignal::SIGINT => Some(Self::Interrupt),
			NixSignal::SIGTERM => Some(Self::Terminate),
			NixSignal::SIGCHLD => Some(Self::ChildExit),
			_ => None,
		}
	}
}

impl fmt::Display for Signal {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}
