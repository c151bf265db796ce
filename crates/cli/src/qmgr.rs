//! The queue manager's lifecycle, driven through its control programs.

use std::{
	path::{Path, PathBuf},
	sync::Arc,
};

use futures::{future::BoxFuture, FutureExt};
use miette::{miette, IntoDiagnostic, Result, WrapErr};
use runmq_supervisor::{errors::StopError, supervisor::Service};
use tokio::fs;
use tracing::{debug, error, info};

use crate::{
	args::QueueManagerArgs,
	command::{run, run_with_input, CommandOutput},
};

/// Exit code of `crtmqm` when the queue manager already exists.
const ALREADY_EXISTS: i32 = 8;

/// Make sure the data volume has its `data` directory.
pub async fn create_volume(volume: &Path) -> Result<()> {
	let data = volume.join("data");
	if fs::metadata(&data).await.is_ok_and(|meta| meta.is_dir()) {
		debug!(path=%data.display(), "data directory already exists");
		return Ok(());
	}

	info!(path=%data.display(), "creating data directory");
	fs::create_dir_all(&data)
		.await
		.into_diagnostic()
		.wrap_err_with(|| format!("creating {}", data.display()))
}

/// A named queue manager and where its tools and files live.
///
/// Cheap to clone: the supervisor gets one copy to stop it with, the main flow keeps another.
#[derive(Debug, Clone)]
pub struct QueueManager {
	inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
	name: String,
	port: u16,
	bin_dir: PathBuf,
	data_root: PathBuf,
	config_dir: PathBuf,
}

impl QueueManager {
	pub fn new(name: String, args: &QueueManagerArgs) -> Self {
		Self {
			inner: Arc::new(Inner {
				name,
				port: args.port,
				bin_dir: args.bin_dir.clone(),
				data_root: args.data_root.clone(),
				config_dir: args.config_dir.clone(),
			}),
		}
	}

	#[must_use]
	pub fn name(&self) -> &str {
		&self.inner.name
	}

	fn program(&self, name: &str) -> PathBuf {
		self.inner.bin_dir.join(name)
	}

	/// The error log the queue manager writes, in JSON or text form.
	#[must_use]
	pub fn error_log(&self, json: bool) -> PathBuf {
		self.inner
			.data_root
			.join("qmgrs")
			.join(&self.inner.name)
			.join("errors")
			.join(if json { "AMQERR01.json" } else { "AMQERR01.LOG" })
	}

	/// Create or repair the data directory tree.
	pub async fn create_dir_structure(&self) -> Result<()> {
		info!("creating directory structure");
		let out = run(&self.program("crtmqdir"), &["-f", "-s"]).await?;
		expect_success("crtmqdir", &out)
	}

	/// Create the queue manager. One that already exists is left as it is.
	pub async fn create(&self) -> Result<()> {
		info!(name=%self.name(), port=self.inner.port, "creating queue manager");
		let port = self.inner.port.to_string();
		let out = run(&self.program("crtmqm"), &["-q", "-p", &port, self.name()]).await?;

		if out.code == Some(ALREADY_EXISTS) {
			info!(name=%self.name(), "queue manager already exists");
			return Ok(());
		}

		expect_success("crtmqm", &out)
	}

	/// Raise the command level. Does nothing without a level.
	pub async fn set_command_level(&self, level: Option<&str>) -> Result<()> {
		let Some(level) = level.filter(|level| !level.is_empty()) else {
			return Ok(());
		};

		info!(%level, "setting command level");
		let flag = format!("CMDLEVEL={level}");
		let out = run(&self.program("strmqm"), &["-e", &flag, self.name()]).await?;
		expect_success("strmqm -e", &out)
	}

	pub async fn start(&self) -> Result<()> {
		info!(name=%self.name(), "starting queue manager");
		let out = run(&self.program("strmqm"), &[self.name()]).await?;
		expect_success("strmqm", &out)?;
		info!(name=%self.name(), "started queue manager");
		Ok(())
	}

	/// Feed every `*.mqsc` file in the configuration directory to `runmqsc`, in name order.
	///
	/// A script that fails is logged and the rest still run. Only an unreadable directory is an
	/// error; a missing one just means there's nothing to apply.
	pub async fn run_scripts(&self) -> Result<usize> {
		let dir = &self.inner.config_dir;
		let mut entries = match fs::read_dir(dir).await {
			Ok(entries) => entries,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
				debug!(path=%dir.display(), "no configuration directory");
				return Ok(0);
			}
			Err(err) => {
				return Err(err)
					.into_diagnostic()
					.wrap_err_with(|| format!("reading {}", dir.display()))
			}
		};

		let mut scripts = Vec::new();
		while let Some(entry) = entries.next_entry().await.into_diagnostic()? {
			let path = entry.path();
			if path.extension().is_some_and(|ext| ext == "mqsc") {
				scripts.push(path);
			}
		}
		scripts.sort();

		let mut applied = 0;
		for script in scripts {
			match self.run_script(&script).await {
				Ok(()) => applied += 1,
				Err(err) => error!(script=%script.display(), %err, "MQSC script failed"),
			}
		}

		Ok(applied)
	}

	async fn run_script(&self, script: &Path) -> Result<()> {
		info!(script=%script.display(), "applying MQSC script");
		let content = fs::read(script)
			.await
			.into_diagnostic()
			.wrap_err_with(|| format!("reading {}", script.display()))?;

		let out = run_with_input(
			&self.program("runmqsc"),
			&[self.name()],
			Some(content.as_slice()),
		)
		.await?;
		for line in out.output.lines() {
			info!("\t{line}");
		}

		expect_success("runmqsc", &out)
	}

	/// Stop the queue manager, waiting for it to finish.
	pub async fn end(&self) -> Result<()> {
		info!(name=%self.name(), "stopping queue manager");
		let out = run(&self.program("endmqm"), &["-w", self.name()]).await?;
		expect_success("endmqm", &out)?;
		info!(name=%self.name(), "stopped queue manager");
		Ok(())
	}
}

impl Service for QueueManager {
	fn name(&self) -> &str {
		&self.inner.name
	}

	fn stop(&mut self) -> BoxFuture<'_, Result<(), StopError>> {
		async move { self.end().await.map_err(StopError::from) }.boxed()
	}
}

fn expect_success(what: &str, out: &CommandOutput) -> Result<()> {
	if out.success() {
		return Ok(());
	}

	let output = out.output.trim_end();
	debug!(program=%what, code=?out.code, %output, "program failed");

	let status = match out.code {
		Some(code) => format!("exited with code {code}"),
		None => "was killed by a signal".into(),
	};

	Err(if output.is_empty() {
		miette!("{what} {status}")
	} else {
		miette!("{what} {status}: {output}")
	})
}

#[cfg(all(test, unix))]
mod test {
	use std::{fs, os::unix::fs::PermissionsExt};

	use tempfile::TempDir;
	use tracing_test::traced_test;

	use super::*;

	struct Fixture {
		dir: TempDir,
		qmgr: QueueManager,
	}

	impl Fixture {
		fn new() -> Self {
			let dir = tempfile::tempdir().expect("tempdir");
			for sub in ["bin", "data", "config"] {
				fs::create_dir(dir.path().join(sub)).expect("mkdir");
			}

			let args = QueueManagerArgs {
				name: None,
				cmdlevel: None,
				port: 1414,
				volume: dir.path().join("volume"),
				data_root: dir.path().join("data"),
				config_dir: dir.path().join("config"),
				bin_dir: dir.path().join("bin"),
			};

			let qmgr = QueueManager::new("QM1".into(), &args);
			Self { dir, qmgr }
		}

		/// Install a fake program which records its arguments, then runs `body`.
		fn program(&self, name: &str, body: &str) {
			let record = self.dir.path().join(format!("{name}.args"));
			let script = format!(
				"#!/bin/sh\nprintf '%s\\n' \"$*\" >> '{}'\n{body}\n",
				record.display()
			);

			let path = self.dir.path().join("bin").join(name);
			fs::write(&path, script).expect("write script");
			fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
		}

		fn calls(&self, name: &str) -> Vec<String> {
			fs::read_to_string(self.dir.path().join(format!("{name}.args")))
				.map(|calls| calls.lines().map(String::from).collect())
				.unwrap_or_default()
		}

		fn config(&self, file: &str, content: &str) {
			fs::write(self.dir.path().join("config").join(file), content).expect("write config");
		}
	}

	#[tokio::test]
	async fn volume_gets_a_data_directory() {
		let fx = Fixture::new();
		let volume = fx.dir.path().join("volume");

		create_volume(&volume).await.expect("create");
		assert!(volume.join("data").is_dir());

		create_volume(&volume).await.expect("again");
	}

	#[tokio::test]
	async fn dir_structure() {
		let fx = Fixture::new();
		fx.program("crtmqdir", "exit 0");

		fx.qmgr.create_dir_structure().await.expect("crtmqdir");
		assert_eq!(fx.calls("crtmqdir"), ["-f -s"]);
	}

	#[tokio::test]
	async fn create_passes_port_and_name() {
		let fx = Fixture::new();
		fx.program("crtmqm", "exit 0");

		fx.qmgr.create().await.expect("create");
		assert_eq!(fx.calls("crtmqm"), ["-q -p 1414 QM1"]);
	}

	#[tokio::test]
	async fn existing_queue_manager_is_fine() {
		let fx = Fixture::new();
		fx.program("crtmqm", "echo 'AMQ8110E: queue manager already exists.'; exit 8");

		fx.qmgr.create().await.expect("already exists is success");
	}

	#[tokio::test]
	async fn create_failure_carries_the_output() {
		let fx = Fixture::new();
		fx.program("crtmqm", "echo 'AMQ7064E: log path not valid.' >&2; exit 72");

		let err = fx.qmgr.create().await.expect_err("should fail");
		let report = format!("{err:?}");
		assert!(report.contains("72"), "{report}");
		assert!(report.contains("AMQ7064E"), "{report}");
	}

	#[tokio::test]
	async fn command_level_only_when_set() {
		let fx = Fixture::new();
		fx.program("strmqm", "exit 0");

		fx.qmgr.set_command_level(None).await.expect("none");
		fx.qmgr.set_command_level(Some("")).await.expect("empty");
		assert!(fx.calls("strmqm").is_empty());

		fx.qmgr.set_command_level(Some("802")).await.expect("set");
		assert_eq!(fx.calls("strmqm"), ["-e CMDLEVEL=802 QM1"]);
	}

	#[tokio::test]
	async fn start_failure_is_an_error() {
		let fx = Fixture::new();
		fx.program("strmqm", "exit 1");

		assert!(fx.qmgr.start().await.is_err());
	}

	#[tokio::test]
	#[traced_test]
	async fn scripts_run_in_name_order_and_failures_are_skipped() {
		let fx = Fixture::new();
		let seen = fx.dir.path().join("seen");
		fx.program(
			"runmqsc",
			&format!(
				"input=$(cat)\necho \"$input\" >> '{}'\necho \"ran $input\"\n[ \"$input\" != BAD ]",
				seen.display()
			),
		);

		fx.config("20-queues.mqsc", "QUEUES");
		fx.config("10-channels.mqsc", "CHANNELS");
		fx.config("15-broken.mqsc", "BAD");
		fx.config("README.txt", "NOT MQSC");

		let applied = fx.qmgr.run_scripts().await.expect("scripts");
		assert_eq!(applied, 2);

		let seen = fs::read_to_string(seen).expect("seen");
		assert_eq!(seen, "CHANNELS\nBAD\nQUEUES\n");
		assert_eq!(fx.calls("runmqsc"), ["QM1", "QM1", "QM1"]);
		assert!(logs_contain("ran QUEUES"));
		assert!(logs_contain("runmqsc exited with code 1"));
	}

	#[tokio::test]
	async fn missing_config_dir_applies_nothing() {
		let fx = Fixture::new();
		fs::remove_dir(fx.dir.path().join("config")).expect("rmdir");

		assert_eq!(fx.qmgr.run_scripts().await.expect("scripts"), 0);
	}

	#[tokio::test]
	async fn service_stop_ends_and_waits() {
		let fx = Fixture::new();
		fx.program("endmqm", "exit 0");

		let mut qmgr = fx.qmgr.clone();
		Service::stop(&mut qmgr).await.expect("stop");
		assert_eq!(fx.calls("endmqm"), ["-w QM1"]);
	}

	#[tokio::test]
	async fn service_stop_reports_failure() {
		let fx = Fixture::new();
		fx.program("endmqm", "echo 'AMQ8146E: not available.'; exit 16");

		let mut qmgr = fx.qmgr.clone();
		let err = Service::stop(&mut qmgr).await.expect_err("should fail");
		assert!(err.to_string().contains("16"), "{err}");
	}

	#[test]
	fn error_log_paths() {
		let fx = Fixture::new();
		let errors = fx.dir.path().join("data/qmgrs/QM1/errors");
		assert_eq!(fx.qmgr.error_log(false), errors.join("AMQERR01.LOG"));
		assert_eq!(fx.qmgr.error_log(true), errors.join("AMQERR01.json"));
	}
}
