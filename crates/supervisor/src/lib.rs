//! PID 1 duties for the runmq entrypoint.
//!
//! A container's first process inherits two jobs the kernel gives no other process: it has to
//! act on termination signals itself (the default dispositions don't apply to PID 1), and it has
//! to reap every orphan that gets reparented to it. This crate implements both, as a single
//! supervisor task that owns the signal subscription.
//!
//! # Theory of Operation
//!
//! [`start`] subscribes to [`Signal::ALL`] and spawns the supervisor on the Tokio runtime. From
//! then on, no signal can be missed. The supervisor starts _armed_: child-exit notifications are
//! counted but not acted on, because during startup the entrypoint runs external tools and waits
//! on them synchronously, and a `waitpid(-1)` would steal their exit status.
//!
//! Once startup no longer spawns children, the main flow sends
//! [`enable_reaping`](supervisor::Supervisor::enable_reaping) and then
//! [`reap_now`](supervisor::Supervisor::reap_now), the latter to catch children whose
//! notifications were deferred. Every later child-exit notification triggers a reap pass that
//! loops until no exited child remains, as the kernel coalesces pending notifications.
//!
//! The first termination signal stops the managed [`Service`](supervisor::Service), and the
//! supervisor then emits its single [`Termination`](supervisor::Termination), which the main flow
//! waits on with [`Terminated::wait`](supervisor::Terminated::wait).
//!
//! # Example
//!
//! ```no_run
//! # #[tokio::main(flavor = "current_thread")] async fn main() -> miette::Result<()> {
//! use futures::{future::BoxFuture, FutureExt};
//! use runmq_supervisor::{errors::StopError, os::UnixOs, start, supervisor::Service};
//!
//! struct Noop;
//! impl Service for Noop {
//!     fn name(&self) -> &str { "noop" }
//!     fn stop(&mut self) -> BoxFuture<'_, Result<(), StopError>> {
//!         async { Ok(()) }.boxed()
//!     }
//! }
//!
//! let (supervisor, terminated) = start(UnixOs, Noop)?;
//! // ...startup work that spawns and waits on children...
//! supervisor.enable_reaping();
//! supervisor.reap_now().await;
//!
//! let termination = terminated.wait().await?;
//! println!("stopped by {}", termination.signal);
//! # Ok(()) }
//! ```

#![warn(clippy::unwrap_used, missing_docs, rustdoc::unescaped_backticks)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![deny(rust_2018_idioms)]

#[doc(no_inline)]
pub use runmq_signals::Signal;

#[doc(inline)]
pub use supervisor::start;

pub mod errors;
pub mod os;
pub mod reaper;
pub mod supervisor;

mod flag;
