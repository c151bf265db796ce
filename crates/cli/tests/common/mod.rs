use std::{
	fs,
	os::unix::fs::PermissionsExt,
	path::PathBuf,
	process::Stdio,
	time::Duration,
};

use tempfile::TempDir;
use tokio::{
	io::{AsyncBufReadExt, BufReader, Lines},
	process::{Child, ChildStdout, Command},
	time::timeout,
};

pub const TIMEOUT: Duration = Duration::from_secs(30);

/// A pretend queue manager installation in a temporary directory.
///
/// Every control program appends its name and arguments to a shared call log, then behaves as
/// configured: by default it succeeds.
pub struct FakeInstall {
	pub dir: TempDir,
}

impl FakeInstall {
	pub fn new() -> Self {
		let dir = tempfile::tempdir().expect("tempdir");
		for sub in ["bin", "volume", "data", "config"] {
			fs::create_dir(dir.path().join(sub)).expect("mkdir");
		}

		let install = Self { dir };
		for program in ["crtmqdir", "crtmqm", "strmqm", "endmqm", "runmqsc"] {
			install.program(program, "exit 0");
		}
		install
	}

	pub fn path(&self, sub: &str) -> PathBuf {
		self.dir.path().join(sub)
	}

	pub fn errors_dir(&self, name: &str) -> PathBuf {
		self.path("data").join("qmgrs").join(name).join("errors")
	}

	/// Replace a control program with one running `body` after logging its call.
	pub fn program(&self, name: &str, body: &str) {
		let script = format!(
			"#!/bin/sh\nprintf '%s\\n' \"{name} $*\" >> '{}'\n{body}\n",
			self.path("calls").display()
		);

		let path = self.path("bin").join(name);
		fs::write(&path, script).expect("write program");
		fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
	}

	pub fn calls(&self) -> Vec<String> {
		fs::read_to_string(self.path("calls"))
			.map(|calls| calls.lines().map(String::from).collect())
			.unwrap_or_default()
	}

	pub fn command(&self, extra: &[&str]) -> Command {
		let mut cmd = Command::new(env!("CARGO_BIN_EXE_runmqserver"));
		cmd.arg("--bin-dir")
			.arg(self.path("bin"))
			.arg("--volume")
			.arg(self.path("volume"))
			.arg("--data-root")
			.arg(self.path("data"))
			.arg("--config-dir")
			.arg(self.path("config"))
			.args(extra)
			.env_remove("RUST_LOG")
			.env_remove("DEBUG")
			.env_remove("MQ_QMGR_NAME")
			.env_remove("MQ_CMDLEVEL")
			.env_remove("MQ_ALPHA_JSON_LOGS")
			.env_remove("MQ_ALPHA_MIRROR_ERROR_LOGS")
			.stdin(Stdio::null())
			.stdout(Stdio::piped())
			.stderr(Stdio::inherit())
			.kill_on_drop(true);
		cmd
	}

	pub fn spawn(&self, extra: &[&str]) -> (Child, Lines<BufReader<ChildStdout>>) {
		let mut child = self.command(extra).spawn().expect("spawn runmqserver");
		let stdout = child.stdout.take().expect("stdout is piped");
		(child, BufReader::new(stdout).lines())
	}
}

/// Read stdout until a line contains `needle`, and return that line.
pub async fn wait_for_line(lines: &mut Lines<BufReader<ChildStdout>>, needle: &str) -> String {
	timeout(TIMEOUT, async {
		while let Some(line) = lines.next_line().await.expect("read stdout") {
			if line.contains(needle) {
				return line;
			}
		}
		panic!("stdout closed before a line containing {needle:?}");
	})
	.await
	.expect("timed out waiting for output")
}

pub fn program_names(calls: &[String]) -> Vec<&str> {
	calls
		.iter()
		.filter_map(|call| call.split_whitespace().next())
		.collect()
}
