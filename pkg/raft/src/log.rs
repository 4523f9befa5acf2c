//! The replicated log and its append/reconcile operation.
//!
//! Everything is kept in memory, with the reader surface (`last_index`, `term`, `entry`) folded
//! directly onto `Log`; durability across restarts is out of scope here.

use serde::{Deserialize, Serialize};

use crate::errors::*;

/// Term of a log entry, or the node's own current term. `-1` means "never seen a term".
pub type Term = i64;

/// Position within a log, or a pseudo-position. `-1` means "before the first entry".
pub type LogIndex = i64;

/// Sentinel term for "no term observed yet" / the virtual entry before index 0.
pub const NO_TERM: Term = -1;

/// Sentinel index for "before the first entry".
pub const BEFORE_FIRST_INDEX: LogIndex = -1;

/// A single entry in the replicated log: the unit of replication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
	pub term: Term,
	/// Opaque command payload.
	pub item: Vec<u8>,
}

impl LogEntry {
	pub fn new(term: Term, item: Vec<u8>) -> Self {
		LogEntry { term, item }
	}
}

/// A finite, contiguous, 0-indexed sequence of log entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Log {
	entries: Vec<LogEntry>,
}

impl Log {
	pub fn new() -> Self {
		Log { entries: Vec::new() }
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Index of the last entry, or `BEFORE_FIRST_INDEX` if the log is empty.
	pub fn last_index(&self) -> LogIndex {
		self.entries.len() as LogIndex - 1
	}

	/// Term at `index`, where `index == BEFORE_FIRST_INDEX` always yields `NO_TERM`.
	/// Returns `None` if `index` is out of range (including "past the end").
	pub fn term_at(&self, index: LogIndex) -> Option<Term> {
		if index == BEFORE_FIRST_INDEX {
			return Some(NO_TERM);
		}
		self.entry_at(index).map(|e| e.term)
	}

	pub fn entry_at(&self, index: LogIndex) -> Option<&LogEntry> {
		if index < 0 {
			return None;
		}
		self.entries.get(index as usize)
	}

	/// All entries at or after `index` (used to build the tail sent to a lagging follower).
	/// `index` may equal `len()`, in which case the slice is empty.
	pub fn slice_from(&self, index: LogIndex) -> &[LogEntry] {
		if index < 0 {
			return &self.entries[..];
		}
		let start = (index as usize).min(self.entries.len());
		&self.entries[start..]
	}

	/// Truncates the log so that `entries.len() == at` (discards `at` and everything after it).
	pub fn truncate(&mut self, at: LogIndex) {
		let at = at.max(0) as usize;
		self.entries.truncate(at);
	}

	/// Appends a single entry, assumed to immediately follow the current end of the log.
	/// Used by the leader when it originates a new entry (`ClientLogAppend`); a leader never
	/// modifies its own existing entries, so this never truncates.
	pub fn append_one(&mut self, entry: LogEntry) {
		self.entries.push(entry);
	}

	/// The append/reconcile operation. Returns `Ok(true)` on success (log mutated to
	/// include `entries`), `Ok(false)` on failure (log left unchanged). `Err` only for the
	/// internal contradiction in rule 4, which the conflict-truncation pass in rule 3 should
	/// always have prevented from being reachable.
	pub fn append_entries(
		&mut self,
		previous_index: LogIndex,
		previous_term: Term,
		entries: &[LogEntry],
	) -> Result<bool> {
		// Rule 1: gap check.
		if previous_index >= self.entries.len() as LogIndex {
			return Ok(false);
		}

		// Rule 2: term check.
		if previous_index >= 0 {
			match self.term_at(previous_index) {
				Some(t) if t == previous_term => {}
				_ => return Ok(false),
			}
		}

		// Rule 3: conflict truncation. Scan paired positions and truncate at the first
		// disagreement.
		let mut truncate_at = None;
		for (offset, incoming) in entries.iter().enumerate() {
			let index = previous_index + 1 + offset as LogIndex;
			match self.entry_at(index) {
				Some(existing) if existing.term != incoming.term => {
					truncate_at = Some(index);
					break;
				}
				_ => {}
			}
		}
		if let Some(at) = truncate_at {
			self.truncate(at);
		}

		// Rule 4: consistency assertion. Anything still present at a target position must now
		// equal the incoming entry -- the truncation pass above should have removed anything
		// that disagreed.
		for (offset, incoming) in entries.iter().enumerate() {
			let index = previous_index + 1 + offset as LogIndex;
			if let Some(existing) = self.entry_at(index) {
				if existing != incoming {
					bail!(ErrorKind::LogContradiction(index));
				}
			}
		}

		// Rule 5: append the tail.
		for (offset, incoming) in entries.iter().enumerate() {
			let index = previous_index + 1 + offset as LogIndex;
			if index >= self.entries.len() as LogIndex {
				self.entries.push(incoming.clone());
			}
		}

		Ok(true)
	}
}
