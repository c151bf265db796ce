use std::{
	env::var,
	fmt,
	io::{stdout, IsTerminal},
};

use chrono::{SecondsFormat, Utc};
use clap::{ArgAction, Parser};
use serde_json::{Map, Value};
use tracing::{
	field::{Field, Visit},
	info, warn, Event, Level, Subscriber,
};
use tracing_appender::{non_blocking, non_blocking::WorkerGuard};
use tracing_subscriber::{
	fmt::{format::Writer, FmtContext, FormatEvent, FormatFields},
	registry::LookupSpan,
	EnvFilter,
};

use super::{truthy, OPTSET_LOGGING};

#[derive(Debug, Clone, Parser)]
pub struct LoggingArgs {
	/// Log at debug level
	///
	/// Setting $RUST_LOG also works, and takes precedence.
	#[arg(
		long,
		env = "DEBUG",
		help_heading = OPTSET_LOGGING,
		action = ArgAction::SetTrue,
		value_parser = truthy,
	)]
	pub debug: bool,

	/// Write logs as JSON, one object per line
	///
	/// This also makes mirrored error log records go to stdout as-is, since the queue manager
	/// already writes them as JSON.
	#[arg(
		long,
		env = "MQ_ALPHA_JSON_LOGS",
		help_heading = OPTSET_LOGGING,
		action = ArgAction::SetTrue,
		value_parser = truthy,
	)]
	pub json_logs: bool,

	/// Copy the queue manager's error log to stdout
	#[arg(
		long,
		env = "MQ_ALPHA_MIRROR_ERROR_LOGS",
		help_heading = OPTSET_LOGGING,
		action = ArgAction::SetTrue,
		value_parser = truthy,
	)]
	pub mirror_error_logs: bool,
}

/// Set up the tracing subscriber.
///
/// Logs go to stdout through a non-blocking writer; the returned guard flushes it on drop, so it
/// must be held until the process is done logging.
pub fn init(args: &LoggingArgs) -> WorkerGuard {
	let from_env = var("RUST_LOG").is_ok();
	let filter = if from_env {
		EnvFilter::from_default_env()
	} else {
		EnvFilter::new(if args.debug { "debug" } else { "info" })
	};

	let (log_writer, guard) = non_blocking(stdout());
	let builder = tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_ansi(stdout().is_terminal())
		.with_writer(log_writer);

	match if args.json_logs {
		builder.event_format(MqJson).try_init()
	} else {
		builder.try_init()
	} {
		Ok(()) => {
			if from_env {
				warn!(RUST_LOG=?var("RUST_LOG").ok(), "logging configured from RUST_LOG");
			}
			info!(json = args.json_logs, debug = args.debug, "logging initialised");
		}
		Err(e) => eprintln!("Failed to initialise logging, continuing with none\n{e}"),
	}

	guard
}

/// One JSON object per event, keyed the way the queue manager's own JSON error log is.
///
/// The message goes in `message`, the level in `ibm_level`, and the time in `ibm_datetime` with
/// millisecond precision. Other event fields are added under their own names. Spans are left out.
#[derive(Clone, Copy, Debug, Default)]
pub struct MqJson;

impl<S, N> FormatEvent<S, N> for MqJson
where
	S: Subscriber + for<'a> LookupSpan<'a>,
	N: for<'a> FormatFields<'a> + 'static,
{
	fn format_event(
		&self,
		_ctx: &FmtContext<'_, S, N>,
		mut writer: Writer<'_>,
		event: &Event<'_>,
	) -> fmt::Result {
		let mut fields = Map::new();
		fields.insert(
			"ibm_datetime".into(),
			Utc::now()
				.to_rfc3339_opts(SecondsFormat::Millis, true)
				.into(),
		);
		fields.insert("ibm_level".into(), level_name(*event.metadata().level()).into());
		event.record(&mut JsonFields(&mut fields));

		writeln!(writer, "{}", Value::Object(fields))
	}
}

const fn level_name(level: Level) -> &'static str {
	match level {
		Level::TRACE => "trace",
		Level::DEBUG => "debug",
		Level::INFO => "info",
		Level::WARN => "warning",
		Level::ERROR => "error",
	}
}

struct JsonFields<'m>(&'m mut Map<String, Value>);

impl Visit for JsonFields<'_> {
	fn record_str(&mut self, field: &Field, value: &str) {
		self.0.insert(field.name().into(), value.into());
	}

	fn record_i64(&mut self, field: &Field, value: i64) {
		self.0.insert(field.name().into(), value.into());
	}

	fn record_u64(&mut self, field: &Field, value: u64) {
		self.0.insert(field.name().into(), value.into());
	}

	fn record_bool(&mut self, field: &Field, value: bool) {
		self.0.insert(field.name().into(), value.into());
	}

	fn record_f64(&mut self, field: &Field, value: f64) {
		self.0.insert(field.name().into(), value.into());
	}

	fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
		self.0
			.insert(field.name().into(), format!("{value:?}").into());
	}
}
