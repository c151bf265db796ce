use std::{path::Path, time::Duration};

use tokio::{
	select,
	sync::oneshot,
	task::JoinHandle,
	time::sleep,
};
use tracing::{debug, trace, warn};

use crate::{tail::Tail, MirrorError};

/// How the mirror polls its file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MirrorConfig {
	/// How long to wait between reads when nothing is wrong.
	pub poll_interval: Duration,

	/// Read errors back off exponentially from the poll interval, up to this.
	pub max_backoff: Duration,
}

impl Default for MirrorConfig {
	fn default() -> Self {
		Self {
			poll_interval: Duration::from_millis(500),
			max_backoff: Duration::from_secs(5),
		}
	}
}

/// What the mirror did over its lifetime, sent back when it acknowledges a stop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MirrorSummary {
	/// How many records were passed to the sink.
	pub records: usize,
}

type StopRequest = oneshot::Sender<MirrorSummary>;

/// A handle to a running mirror task.
///
/// Stop it with [`stop`](Mirror::stop). If the handle is dropped instead, the task notices, flushes
/// what it has read, and exits.
#[derive(Debug)]
pub struct Mirror {
	stop: oneshot::Sender<StopRequest>,
	task: JoinHandle<()>,
}

/// Start mirroring the file at `path` with the default configuration.
///
/// See [`start_with_config`].
pub async fn start<F>(path: impl AsRef<Path>, sink: F) -> Result<Mirror, MirrorError>
where
	F: FnMut(String) + Send + 'static,
{
	start_with_config(path, MirrorConfig::default(), sink).await
}

/// Start mirroring the file at `path`.
///
/// The file is opened before this returns, and failing to open it is an error: it won't be
/// waited for. The file is read from its start, and then followed as it grows. Every complete
/// line is passed to `sink`, once, in order, without its line ending. The sink is only ever called
/// from the mirror task, so calls never overlap.
///
/// # Panics
///
/// Panics if called outside of a Tokio runtime.
pub async fn start_with_config<F>(
	path: impl AsRef<Path>,
	config: MirrorConfig,
	sink: F,
) -> Result<Mirror, MirrorError>
where
	F: FnMut(String) + Send + 'static,
{
	let path = path.as_ref();
	let tail = Tail::open(path).await.map_err(|err| MirrorError::Open {
		path: path.to_owned(),
		err,
	})?;

	debug!(?path, ?config, "starting log mirror");
	let (stop, requests) = oneshot::channel();
	let task = tokio::spawn(run(tail, config, sink, requests));

	Ok(Mirror { stop, task })
}

impl Mirror {
	/// Stop mirroring, and wait for the task to finish.
	///
	/// Before acknowledging, the task reads the file one last time and passes everything it has to
	/// the sink, including an unterminated last line. The sink is never called after this returns.
	pub async fn stop(self) -> Result<MirrorSummary, MirrorError> {
		let (ack, acked) = oneshot::channel();
		self.stop.send(ack).map_err(|_| MirrorError::TaskGone)?;
		let summary = acked.await.map_err(|_| MirrorError::TaskGone)?;
		self.task.await.map_err(MirrorError::TaskJoin)?;
		Ok(summary)
	}
}

async fn run<F>(
	mut tail: Tail,
	config: MirrorConfig,
	mut sink: F,
	mut requests: oneshot::Receiver<StopRequest>,
) where
	F: FnMut(String) + Send + 'static,
{
	let mut summary = MirrorSummary::default();
	let mut backoff: Option<Duration> = None;

	let ack = loop {
		match tail.read_records().await {
			Ok(records) => {
				if backoff.take().is_some() {
					debug!(path=?tail.path(), "mirrored file readable again");
				}
				deliver(records, &mut sink, &mut summary);
			}
			Err(err) => {
				let wait = backoff.map_or(config.poll_interval, |last| {
					(last * 2).min(config.max_backoff)
				});
				warn!(path=?tail.path(), %err, retry_in=?wait, "cannot read mirrored file");
				backoff = Some(wait);
			}
		}

		select! {
			request = &mut requests => break request.ok(),
			() = sleep(backoff.unwrap_or(config.poll_interval)) => {}
		}
	};

	trace!("mirror stopping, final read");
	match tail.read_records().await {
		Ok(records) => deliver(records, &mut sink, &mut summary),
		Err(err) => warn!(path=?tail.path(), %err, "cannot read mirrored file one last time"),
	}
	if let Some(rest) = tail.flush() {
		summary.records += 1;
		sink(rest);
	}

	debug!(records = summary.records, "log mirror stopped");
	if let Some(ack) = ack {
		ack.send(summary).ok();
	}
}

fn deliver(records: Vec<String>, sink: &mut impl FnMut(String), summary: &mut MirrorSummary) {
	summary.records += records.len();
	records.into_iter().for_each(sink);
}
