//! Bounded undo/redo over whole-graph snapshots.
//!
//! Restoring a snapshot mutates the graph, and graph mutations normally record
//! a snapshot. To keep a restore from recording itself, replay is an explicit
//! state: [`History::begin_undo`] or [`History::begin_redo`] enters
//! [`ReplayState::Replaying`], recording is ignored until the caller reports
//! the outcome with [`History::complete_replay`] or [`History::cancel_replay`].

use log::debug;

use super::types::{Edge, Node};

/// Deep copy of the node and edge collections at one point in time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
	pub nodes: Vec<Node>,
	pub edges: Vec<Edge>,
}

impl Snapshot {
	pub fn new(nodes: &[Node], edges: &[Edge]) -> Self {
		Self {
			nodes: nodes.to_vec(),
			edges: edges.to_vec(),
		}
	}
}

/// Whether a restore is in flight.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReplayState {
	#[default]
	Idle,
	Replaying { target: usize },
}

#[derive(Clone, Debug)]
pub struct History {
	stack: Vec<Snapshot>,
	index: Option<usize>,
	state: ReplayState,
	limit: usize,
}

impl History {
	pub fn new(limit: usize) -> Self {
		Self {
			stack: Vec::new(),
			index: None,
			state: ReplayState::Idle,
			limit: limit.max(1),
		}
	}

	/// Records the loaded state once, so the first edit can be undone.
	pub fn record_initial(&mut self, snapshot: Snapshot) {
		if self.stack.is_empty() {
			self.stack.push(snapshot);
			self.index = Some(0);
		}
	}

	/// Records the state after a user mutation.
	///
	/// Drops every snapshot after the current index first, then evicts the
	/// oldest entries beyond the limit. Ignored while a replay is in flight.
	pub fn record(&mut self, snapshot: Snapshot) {
		if self.is_replaying() {
			debug!("perception-map: skipping snapshot during replay");
			return;
		}
		let keep = self.index.map_or(0, |i| i + 1);
		self.stack.truncate(keep);
		self.stack.push(snapshot);
		if self.stack.len() > self.limit {
			let excess = self.stack.len() - self.limit;
			self.stack.drain(..excess);
		}
		self.index = Some(self.stack.len() - 1);
	}

	pub fn can_undo(&self) -> bool {
		!self.is_replaying() && self.index.is_some_and(|i| i > 0)
	}

	pub fn can_redo(&self) -> bool {
		!self.is_replaying() && self.index.is_some_and(|i| i + 1 < self.stack.len())
	}

	/// Starts restoring the previous snapshot and returns it.
	pub fn begin_undo(&mut self) -> Option<Snapshot> {
		if !self.can_undo() {
			return None;
		}
		let target = self.index? - 1;
		self.begin(target)
	}

	/// Starts restoring the next snapshot and returns it.
	pub fn begin_redo(&mut self) -> Option<Snapshot> {
		if !self.can_redo() {
			return None;
		}
		let target = self.index? + 1;
		self.begin(target)
	}

	fn begin(&mut self, target: usize) -> Option<Snapshot> {
		let snapshot = self.stack.get(target)?.clone();
		self.state = ReplayState::Replaying { target };
		Some(snapshot)
	}

	/// Moves the index to the replay target once the restore has landed.
	pub fn complete_replay(&mut self) {
		if let ReplayState::Replaying { target } = self.state {
			self.index = Some(target);
		}
		self.state = ReplayState::Idle;
	}

	/// Leaves the index where it was after a failed restore.
	pub fn cancel_replay(&mut self) {
		self.state = ReplayState::Idle;
	}

	pub fn is_replaying(&self) -> bool {
		matches!(self.state, ReplayState::Replaying { .. })
	}

	pub fn state(&self) -> ReplayState {
		self.state
	}

	pub fn index(&self) -> Option<usize> {
		self.index
	}

	pub fn len(&self) -> usize {
		self.stack.len()
	}

	pub fn is_empty(&self) -> bool {
		self.stack.is_empty()
	}

	pub fn current(&self) -> Option<&Snapshot> {
		self.stack.get(self.index?)
	}

	/// Forgets everything, as after importing a new map.
	pub fn clear(&mut self) {
		self.stack.clear();
		self.index = None;
		self.state = ReplayState::Idle;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::perception_canvas::seed;

	fn snap(n: usize) -> Snapshot {
		Snapshot::new(&seed::seed_nodes()[..n], &[])
	}

	fn undo(history: &mut History) -> Option<Snapshot> {
		let snapshot = history.begin_undo();
		history.complete_replay();
		snapshot
	}

	#[test]
	fn initial_snapshot_is_recorded_once() {
		let mut history = History::new(50);
		history.record_initial(snap(1));
		history.record_initial(snap(2));
		assert_eq!(history.len(), 1);
		assert_eq!(history.index(), Some(0));
		assert!(!history.can_undo());
	}

	#[test]
	fn undo_then_record_truncates_redo_branch() {
		let mut history = History::new(50);
		history.record_initial(snap(0));
		for n in 1..=3 {
			history.record(snap(n));
		}
		assert_eq!(history.len(), 4);

		assert_eq!(undo(&mut history), Some(snap(2)));
		assert_eq!(undo(&mut history), Some(snap(1)));
		assert_eq!(history.index(), Some(1));
		assert!(history.can_redo());

		history.record(snap(5));
		assert_eq!(history.len(), 3);
		assert_eq!(history.index(), Some(2));
		assert!(!history.can_redo());
	}

	#[test]
	fn oldest_snapshots_are_evicted_at_the_limit() {
		let mut history = History::new(3);
		history.record_initial(snap(0));
		for n in 1..=4 {
			history.record(snap(n));
		}
		assert_eq!(history.len(), 3);
		assert_eq!(history.index(), Some(2));
		assert_eq!(history.current(), Some(&snap(4)));
	}

	#[test]
	fn recording_is_ignored_during_replay() {
		let mut history = History::new(50);
		history.record_initial(snap(0));
		history.record(snap(1));

		let restored = history.begin_undo();
		assert_eq!(restored, Some(snap(0)));
		history.record(snap(0));
		assert!(history.begin_redo().is_none());
		history.complete_replay();

		assert_eq!(history.len(), 2);
		assert_eq!(history.index(), Some(0));
	}

	#[test]
	fn cancelled_replay_keeps_index() {
		let mut history = History::new(50);
		history.record_initial(snap(0));
		history.record(snap(1));

		assert!(history.begin_undo().is_some());
		history.cancel_replay();
		assert_eq!(history.index(), Some(1));
		assert_eq!(history.state(), ReplayState::Idle);
	}

	#[test]
	fn undo_at_start_is_a_no_op() {
		let mut history = History::new(50);
		assert!(history.begin_undo().is_none());
		history.record_initial(snap(0));
		assert!(history.begin_undo().is_none());
		assert!(!history.is_replaying());
	}
}
