use std::{
	collections::{BTreeSet, VecDeque},
	io,
	sync::{Arc, Mutex},
};

use tokio::sync::mpsc;

use super::{ChildId, ProcessOs, Reap, SignalSource};
use crate::{errors::CriticalError, Signal};

/// Fake process table and signal source, driven from a [`TestOsHandle`].
#[derive(Debug)]
pub struct TestOs {
	signals: Option<mpsc::UnboundedReceiver<Signal>>,
	table: Arc<Mutex<TestTable>>,
	calls: Arc<boxcar::Vec<TestOsCall>>,
}

#[derive(Debug, Default)]
struct TestTable {
	alive: BTreeSet<i32>,
	exited: VecDeque<i32>,
	reaped: Vec<ChildId>,
	failures: VecDeque<io::ErrorKind>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestOsCall {
	Subscribe(Vec<Signal>),
	ReapOne,
}

/// The other end of a [`TestOs`]: plays the kernel.
#[derive(Debug, Clone)]
pub struct TestOsHandle {
	signals: mpsc::UnboundedSender<Signal>,
	table: Arc<Mutex<TestTable>>,
	calls: Arc<boxcar::Vec<TestOsCall>>,
}

#[derive(Debug)]
pub struct TestSignals(mpsc::UnboundedReceiver<Signal>);

impl TestOs {
	pub fn new() -> (Self, TestOsHandle) {
		let (tx, rx) = mpsc::unbounded_channel();
		let table = Arc::new(Mutex::new(TestTable::default()));
		let calls = Arc::new(boxcar::Vec::new());
		(
			Self {
				signals: Some(rx),
				table: table.clone(),
				calls: calls.clone(),
			},
			TestOsHandle {
				signals: tx,
				table,
				calls,
			},
		)
	}
}

impl TestOsHandle {
	pub fn signal(&self, sig: Signal) {
		self.signals.send(sig).ok();
	}

	/// A child that will be running until [`exit`](Self::exit) is called.
	pub fn spawn(&self, pid: i32) {
		self.table.lock().unwrap().alive.insert(pid);
	}

	/// Children exit without any notification being delivered yet.
	pub fn exit(&self, pids: &[i32]) {
		let mut table = self.table.lock().unwrap();
		for pid in pids {
			table.alive.remove(pid);
			table.exited.push_back(*pid);
		}
	}

	/// Children exit and the kernel coalesces their notifications into one.
	pub fn exit_and_notify(&self, pids: &[i32]) {
		self.exit(pids);
		self.signal(Signal::ChildExit);
	}

	pub fn fail_next_reap(&self, kind: io::ErrorKind) {
		self.table.lock().unwrap().failures.push_back(kind);
	}

	pub fn reaped(&self) -> Vec<ChildId> {
		self.table.lock().unwrap().reaped.clone()
	}

	pub fn zombies(&self) -> usize {
		self.table.lock().unwrap().exited.len()
	}

	pub fn reap_calls(&self) -> usize {
		self.calls
			.iter()
			.filter(|(_, call)| **call == TestOsCall::ReapOne)
			.count()
	}

	pub fn subscriptions(&self) -> Vec<Vec<Signal>> {
		self.calls
			.iter()
			.filter_map(|(_, call)| match call {
				TestOsCall::Subscribe(kinds) => Some(kinds.clone()),
				TestOsCall::ReapOne => None,
			})
			.collect()
	}
}

impl ProcessOs for TestOs {
	type Signals = TestSignals;

	fn subscribe(&mut self, kinds: &[Signal]) -> Result<Self::Signals, CriticalError> {
		self.calls.push(TestOsCall::Subscribe(kinds.to_vec()));
		let rx = self.signals.take().ok_or(CriticalError::Subscribe {
			signal: kinds[0],
			err: io::Error::new(io::ErrorKind::AlreadyExists, "already subscribed"),
		})?;
		Ok(TestSignals(rx))
	}

	fn reap_one(&mut self) -> Reap {
		self.calls.push(TestOsCall::ReapOne);
		let mut table = self.table.lock().unwrap();
		if let Some(kind) = table.failures.pop_front() {
			Reap::Failed(io::Error::new(kind, "injected reap failure"))
		} else if let Some(pid) = table.exited.pop_front() {
			table.reaped.push(ChildId(pid));
			Reap::Reaped(ChildId(pid))
		} else if table.alive.is_empty() {
			Reap::NoChildren
		} else {
			Reap::NoneExited
		}
	}
}

impl SignalSource for TestSignals {
	async fn recv(&mut self) -> Option<Signal> {
		self.0.recv().await
	}
}
