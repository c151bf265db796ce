//! Error types.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;
use tokio::task::JoinError;

/// Errors from starting or stopping a [`Mirror`](crate::Mirror).
///
/// Read errors while mirroring are not here: they are logged and retried.
#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum MirrorError {
	/// The file to mirror could not be opened.
	#[error("cannot open {} for mirroring: {err}", .path.display())]
	#[diagnostic(
		code(runmq::mirror::open),
		help("the file must exist before mirroring starts")
	)]
	Open {
		/// The file.
		path: PathBuf,

		/// The underlying error.
		#[source]
		err: std::io::Error,
	},

	/// The mirror task ended without acknowledging the stop request.
	#[error("mirror task ended without acknowledging stop")]
	#[diagnostic(code(runmq::mirror::gone))]
	TaskGone,

	/// The mirror task panicked.
	#[error("mirror task failed: {0}")]
	#[diagnostic(code(runmq::mirror::join))]
	TaskJoin(#[source] JoinError),
}
