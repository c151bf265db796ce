use std::{convert::Infallible, ffi::OsString};

use clap::Parser;
use miette::{miette, IntoDiagnostic, Result};
use tracing::debug;

pub(crate) mod logging;
pub(crate) mod qmgr;

pub use self::{logging::LoggingArgs, qmgr::QueueManagerArgs};

const OPTSET_QUEUE_MANAGER: &str = "Queue manager options";
const OPTSET_PATHS: &str = "Path options";
const OPTSET_LOGGING: &str = "Logging options";

/// Longest name a queue manager can have.
pub const MAX_NAME_LENGTH: usize = 48;

/// Create, start, and supervise a queue manager as a container's first process.
///
/// Every option can also be given through its environment variable, which is how a container
/// runtime usually passes them. Options given on the command line win.
#[derive(Debug, Clone, Parser)]
#[command(name = "runmqserver", author, version, about, long_about = None)]
#[cfg_attr(debug_assertions, command(before_help = "⚠ DEBUG BUILD ⚠"))]
pub struct Args {
	#[command(flatten)]
	pub queue_manager: QueueManagerArgs,

	#[command(flatten)]
	pub logging: LoggingArgs,
}

impl Args {
	/// The queue manager name to use.
	///
	/// If none was given, it is derived from the host name, keeping only the characters a queue
	/// manager name may contain. Either way the result is validated.
	pub fn queue_manager_name(&self) -> Result<String> {
		let name = if let Some(name) = &self.queue_manager.name {
			name.clone()
		} else {
			let host = hostname()?;
			debug!(%host, "deriving queue manager name from host name");
			sanitise_name(&host)
		};

		validate_name(&name)?;
		Ok(name)
	}
}

/// Boolean environment switches are only on when set to `true` or `1`.
#[allow(clippy::unnecessary_wraps)]
pub(crate) fn truthy(value: &str) -> Result<bool, Infallible> {
	Ok(matches!(value, "true" | "1"))
}

fn is_name_char(c: char) -> bool {
	c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '%' | '/')
}

/// Drop every character a queue manager name can't contain.
#[must_use]
pub fn sanitise_name(raw: &str) -> String {
	raw.chars().filter(|&c| is_name_char(c)).collect()
}

pub fn validate_name(name: &str) -> Result<()> {
	if name.is_empty() {
		return Err(miette!(
			help = "set MQ_QMGR_NAME or pass --name",
			"queue manager name is empty"
		));
	}

	if name.chars().count() > MAX_NAME_LENGTH {
		return Err(miette!(
			"queue manager name {name:?} is longer than {MAX_NAME_LENGTH} characters"
		));
	}

	if let Some(bad) = name.chars().find(|&c| !is_name_char(c)) {
		return Err(miette!(
			help = "only letters, digits, and . _ % / are allowed",
			"queue manager name {name:?} contains {bad:?}"
		));
	}

	Ok(())
}

fn hostname() -> Result<String> {
	nix::unistd::gethostname()
		.into_diagnostic()
		.map(OsString::into_string)?
		.map_err(|raw| miette!("host name {raw:?} is not valid UTF-8"))
}

#[must_use]
pub fn get_args() -> Args {
	Args::parse()
}

#[cfg(test)]
mod test {
	use std::path::Path;

	use super::*;

	fn parse(args: &[&str]) -> Args {
		Args::try_parse_from(std::iter::once("runmqserver").chain(args.iter().copied()))
			.expect("parse")
	}

	#[test]
	fn truthy_values() {
		assert_eq!(truthy("true"), Ok(true));
		assert_eq!(truthy("1"), Ok(true));
		assert_eq!(truthy("TRUE"), Ok(false));
		assert_eq!(truthy("yes"), Ok(false));
		assert_eq!(truthy("0"), Ok(false));
		assert_eq!(truthy(""), Ok(false));
	}

	#[test]
	fn sanitising_keeps_only_name_characters() {
		assert_eq!(sanitise_name("qm-host-1.example"), "qmhost1.example");
		assert_eq!(sanitise_name("a_b%c/d"), "a_b%c/d");
		assert_eq!(sanitise_name("---"), "");
	}

	#[test]
	fn validation() {
		assert!(validate_name("QM1").is_ok());
		assert!(validate_name(&"Q".repeat(MAX_NAME_LENGTH)).is_ok());
		assert!(validate_name("").is_err());
		assert!(validate_name(&"Q".repeat(MAX_NAME_LENGTH + 1)).is_err());
		assert!(validate_name("QM-1").is_err());
	}

	#[test]
	fn explicit_name_is_validated() {
		let args = parse(&["--name", "QM1"]);
		assert_eq!(args.queue_manager_name().expect("name"), "QM1");

		let args = parse(&["--name", "bad name"]);
		assert!(args.queue_manager_name().is_err());
	}

	#[test]
	fn flags_from_the_command_line() {
		let args = parse(&["--name", "QM1", "--mirror-error-logs", "--json-logs", "--debug"]);
		assert!(args.logging.mirror_error_logs);
		assert!(args.logging.json_logs);
		assert!(args.logging.debug);
	}

	#[test]
	fn paths_and_port() {
		let args = parse(&[
			"--name",
			"QM1",
			"--port",
			"1515",
			"--bin-dir",
			"/tmp/bin",
			"--cmdlevel",
			"802",
		]);
		assert_eq!(args.queue_manager.port, 1515);
		assert_eq!(args.queue_manager.bin_dir, Path::new("/tmp/bin"));
		assert_eq!(args.queue_manager.cmdlevel.as_deref(), Some("802"));
	}

	#[test]
	fn port_must_be_a_port() {
		let parsed = Args::try_parse_from(["runmqserver", "--port", "99999"]);
		assert!(parsed.is_err());
	}
}
