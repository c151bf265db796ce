//! Running the queue manager's control programs to completion.

use std::{path::Path, process::Stdio};

use miette::{IntoDiagnostic, Result, WrapErr};
use tokio::{io::AsyncWriteExt, process::Command};
use tracing::{debug, trace, warn};

/// What a finished program left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
	/// Exit code, or `None` if the program was killed by a signal.
	pub code: Option<i32>,

	/// Standard output followed by standard error, decoded lossily.
	pub output: String,
}

impl CommandOutput {
	#[must_use]
	pub const fn success(&self) -> bool {
		matches!(self.code, Some(0))
	}
}

/// Run a program and wait for it to exit.
///
/// A non-zero exit is not an error here; callers decide which codes they accept. Failing to start
/// the program at all is.
pub async fn run(program: &Path, args: &[&str]) -> Result<CommandOutput> {
	run_with_input(program, args, None).await
}

/// Run a program with `input` on its stdin, and wait for it to exit.
pub async fn run_with_input(
	program: &Path,
	args: &[&str],
	input: Option<&[u8]>,
) -> Result<CommandOutput> {
	debug!(program=%program.display(), ?args, "running");

	let mut child = Command::new(program)
		.args(args)
		.stdin(if input.is_some() {
			Stdio::piped()
		} else {
			Stdio::null()
		})
		.stdout(Stdio::piped())
		.stderr(Stdio::piped())
		.kill_on_drop(true)
		.spawn()
		.into_diagnostic()
		.wrap_err_with(|| format!("cannot run {}", program.display()))?;

	// stdin is written while output is collected, or a chatty program fills its pipe and stalls
	let stdin = child.stdin.take();
	let feed = async move {
		if let (Some(mut stdin), Some(input)) = (stdin, input) {
			if let Err(err) = stdin.write_all(input).await {
				// a program may exit without reading everything; its exit code tells the story
				warn!(%err, "writing to program stdin");
			}
		}
	};

	let ((), finished) = tokio::join!(feed, child.wait_with_output());
	let finished = finished
		.into_diagnostic()
		.wrap_err_with(|| format!("waiting on {}", program.display()))?;

	let mut output = String::from_utf8_lossy(&finished.stdout).into_owned();
	output.push_str(&String::from_utf8_lossy(&finished.stderr));

	let code = finished.status.code();
	debug!(program=%program.display(), ?code, "finished");
	trace!(%output, "program output");

	Ok(CommandOutput { code, output })
}
