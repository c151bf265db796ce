/// Where the supervisor task is in its lifecycle.
///
/// ```text
/// Armed --EnableReaping--> Reaping
///   |                         |
///   +------ termination ------+--> ShuttingDown --stop returns--> Terminated
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum State {
	/// Signals are subscribed; child exits are deferred.
	Armed,

	/// Child exits trigger a reap pass.
	Reaping,

	/// The service's stop routine is running. Further termination requests are ignored.
	ShuttingDown,

	/// The terminal value has been emitted; nothing is processed anymore.
	Terminated,
}

impl State {
	pub const fn reaping(self) -> bool {
		matches!(self, Self::Reaping)
	}
}
