#![deny(rust_2018_idioms)]
#![allow(clippy::missing_const_for_fn, clippy::future_not_send)]

#[cfg(not(unix))]
compile_error!("runmqserver manages unix processes and only builds for unix");

use miette::{IntoDiagnostic, Result, WrapErr};
use runmq_mirror::Mirror;
use runmq_supervisor::{
	errors::CriticalError,
	os::UnixOs,
	supervisor::Termination,
};
use tokio::fs::OpenOptions;
use tracing::{debug, error, info, warn};

use crate::{args::Args, qmgr::QueueManager};

pub mod args;
pub mod command;
pub mod qmgr;

fn log_runtime_info() {
	let pid = std::process::id();
	info!(
		version=%env!("CARGO_PKG_VERSION"),
		pid,
		uid=%nix::unistd::getuid(),
		gid=%nix::unistd::getgid(),
		"runtime"
	);

	if pid != 1 {
		warn!(pid, "not running as PID 1, orphaned processes won't be reparented here");
	}
}

/// Follow the queue manager's error log onto stdout.
///
/// In JSON mode the records already are JSON objects, so they're printed as-is, interleaved with
/// our own JSON log lines. Otherwise each record becomes a log event.
async fn mirror_error_log(qmgr: &QueueManager, json: bool) -> Result<Mirror> {
	let path = qmgr.error_log(json);

	// the queue manager may not have written anything yet
	OpenOptions::new()
		.create(true)
		.append(true)
		.open(&path)
		.await
		.into_diagnostic()
		.wrap_err_with(|| format!("creating {}", path.display()))?;

	info!(path=%path.display(), "mirroring error log");
	let mirror = if json {
		runmq_mirror::start(&path, |record| println!("{record}")).await?
	} else {
		runmq_mirror::start(&path, |record| info!(target: "runmq::error_log", "{record}")).await?
	};

	Ok(mirror)
}

async fn run_queue_manager(args: Args) -> Result<()> {
	let name = args.queue_manager_name()?;
	info!(%name, "using queue manager name");
	let qmgr = QueueManager::new(name, &args.queue_manager);

	// subscribing first: a termination signal that arrives during setup is not lost
	let (supervisor, terminated) = runmq_supervisor::start(UnixOs, qmgr.clone())?;
	log_runtime_info();

	qmgr::create_volume(&args.queue_manager.volume).await?;
	qmgr.create_dir_structure().await?;
	qmgr.create().await?;

	let mirror = if args.logging.mirror_error_logs {
		Some(mirror_error_log(&qmgr, args.logging.json_logs).await?)
	} else {
		None
	};

	qmgr.set_command_level(args.queue_manager.cmdlevel.as_deref())
		.await?;
	qmgr.start().await?;

	match qmgr.run_scripts().await {
		Ok(applied) => debug!(applied, "MQSC scripts applied"),
		Err(err) => warn!(%err, "could not apply MQSC scripts"),
	}

	// from here on nothing waits on a specific child, so exited children can be reaped freely
	supervisor.enable_reaping();
	supervisor.reap_now().await;
	info!("queue manager running, waiting for a termination signal");

	wind_down(terminated.wait().await, mirror).await;
	Ok(())
}

/// Report how the queue manager stopped, then stop the mirror.
///
/// By now the queue manager has been asked to end, so nothing here is worth a failing exit: the
/// problems are logged, and the mirror is stopped regardless, so its last records still make it
/// to stdout.
async fn wind_down(termination: Result<Termination, CriticalError>, mirror: Option<Mirror>) {
	match termination {
		Ok(Termination {
			signal,
			stop_error: Some(err),
		}) => warn!(%signal, %err, "queue manager did not stop cleanly"),
		Ok(Termination { signal, .. }) => info!(%signal, "queue manager stopped"),
		Err(err) => error!(%err, "lost track of the queue manager's shutdown"),
	}

	if let Some(mirror) = mirror {
		match mirror.stop().await {
			Ok(summary) => debug!(records = summary.records, "error log mirror stopped"),
			Err(err) => error!(%err, "error log mirror did not stop cleanly"),
		}
	}
}

pub async fn run() -> Result<()> {
	let args = args::get_args();
	let _log_guard = args::logging::init(&args.logging);
	debug!(?args, "arguments");

	let result = run_queue_manager(args).await;
	if let Err(err) = &result {
		error!(%err, "giving up");
	}

	result
}
