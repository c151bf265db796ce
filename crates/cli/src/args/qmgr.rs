use std::path::PathBuf;

use clap::{Parser, ValueHint};

use super::{OPTSET_PATHS, OPTSET_QUEUE_MANAGER};

#[derive(Debug, Clone, Parser)]
pub struct QueueManagerArgs {
	/// Name of the queue manager
	///
	/// Defaults to the host name, with every character a queue manager name can't contain removed.
	/// Names are at most 48 characters of letters, digits, and '.', '_', '%', '/'.
	#[arg(
		long,
		env = "MQ_QMGR_NAME",
		help_heading = OPTSET_QUEUE_MANAGER,
		value_name = "NAME",
	)]
	pub name: Option<String>,

	/// Command level to set before starting the queue manager
	///
	/// When set, the queue manager is started once with 'strmqm -e CMDLEVEL=' to raise its
	/// command level, and then started for real.
	#[arg(
		long,
		env = "MQ_CMDLEVEL",
		help_heading = OPTSET_QUEUE_MANAGER,
		value_name = "LEVEL",
	)]
	pub cmdlevel: Option<String>,

	/// Port for the queue manager's listener
	#[arg(
		long,
		env = "MQ_PORT",
		help_heading = OPTSET_QUEUE_MANAGER,
		default_value = "1414",
	)]
	pub port: u16,

	/// Mount point of the data volume
	///
	/// A 'data' directory is created inside it if it doesn't exist yet.
	#[arg(
		long,
		env = "MQ_VOLUME",
		help_heading = OPTSET_PATHS,
		default_value = "/mnt/mqm",
		value_hint = ValueHint::DirPath,
		value_name = "PATH",
	)]
	pub volume: PathBuf,

	/// Root of the queue manager data tree
	///
	/// Error logs are read from '<data-root>/qmgrs/<name>/errors/'.
	#[arg(
		long,
		env = "MQ_DATA_ROOT",
		help_heading = OPTSET_PATHS,
		default_value = "/var/mqm",
		value_hint = ValueHint::DirPath,
		value_name = "PATH",
	)]
	pub data_root: PathBuf,

	/// Directory of MQSC scripts to apply after start
	///
	/// Every '*.mqsc' file in it is fed to 'runmqsc', in name order.
	#[arg(
		long,
		env = "MQ_CONFIG_DIR",
		help_heading = OPTSET_PATHS,
		default_value = "/etc/mqm",
		value_hint = ValueHint::DirPath,
		value_name = "PATH",
	)]
	pub config_dir: PathBuf,

	/// Directory holding the queue manager's control programs
	#[arg(
		long,
		env = "MQ_BIN_DIR",
		help_heading = OPTSET_PATHS,
		default_value = "/opt/mqm/bin",
		value_hint = ValueHint::DirPath,
		value_name = "PATH",
	)]
	pub bin_dir: PathBuf,
}
