//! Log mirroring for the runmq entrypoint.
//!
//! The queue manager writes its error log to a file inside the container, where nobody looks.
//! This crate follows such a file and republishes every new record, usually to the container's
//! stdout, from a background task with a clean stop handshake: once [`Mirror::stop`] returns,
//! everything that was in the file has gone through the sink, and the sink won't be called again.
//!
//! The file is polled rather than watched, which keeps working across the truncation and
//! rotation the queue manager does to its logs:
//!
//! - if the file gets shorter than what was already read, it was truncated, and reading
//!   starts over from its beginning;
//! - if the path now names a different file, it was rotated, and the new file is read from its
//!   beginning;
//! - if the file can't be read at all for a moment, that's logged and retried with backoff.
//!
//! ```no_run
//! # #[tokio::main(flavor = "current_thread")] async fn main() -> miette::Result<()> {
//! let mirror = runmq_mirror::start("/var/mqm/qmgrs/QM1/errors/AMQERR01.LOG", |record| {
//!     println!("{record}");
//! })
//! .await?;
//!
//! // ...
//!
//! let summary = mirror.stop().await?;
//! eprintln!("mirrored {} records", summary.records);
//! # Ok(()) }
//! ```

#![warn(clippy::unwrap_used, missing_docs, rustdoc::unescaped_backticks)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![deny(rust_2018_idioms)]

#[doc(inline)]
pub use self::{
	errors::MirrorError,
	mirror::{start, start_with_config, Mirror, MirrorConfig, MirrorSummary},
};

pub mod errors;

mod mirror;
mod tail;
