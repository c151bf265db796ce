//! Zombie reaping.
//!
//! As PID 1, the entrypoint inherits every orphan in the container. Nobody else will ever wait
//! on those, so unless they are collected here they stay in the process table as zombies.

use tracing::{debug, trace, warn};

use crate::os::{ProcessOs, Reap};

/// A reap pass gives up after this many failures in a row.
const MAX_CONSECUTIVE_FAILURES: usize = 3;

/// What a reap pass did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReapPass {
	/// How many children were collected.
	pub reaped: usize,

	/// How many individual attempts failed.
	pub failures: usize,
}

/// Collect every child that has already exited, without blocking.
///
/// Keeps calling [`ProcessOs::reap_one`] until it reports that no exited children remain, as one
/// child-exit notification may stand for several exits. Having no children at all is the normal
/// end of a pass, not an error. Other failures are logged and the pass carries on, up to a few
/// consecutive failures.
pub fn reap_exited<O: ProcessOs + ?Sized>(os: &mut O) -> ReapPass {
	let mut pass = ReapPass::default();
	let mut consecutive = 0;

	loop {
		match os.reap_one() {
			Reap::Reaped(child) => {
				debug!(%child, "reaped child process");
				pass.reaped += 1;
				consecutive = 0;
			}
			Reap::NoneExited => break,
			Reap::NoChildren => {
				trace!("no child processes left");
				break;
			}
			Reap::Failed(err) => {
				warn!(%err, "failed to reap child process");
				pass.failures += 1;
				consecutive += 1;
				if consecutive >= MAX_CONSECUTIVE_FAILURES {
					warn!(failures = consecutive, "giving up on this reap pass");
					break;
				}
			}
		}
	}

	trace!(?pass, "reap pass done");
	pass
}
