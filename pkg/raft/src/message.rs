//! The closed set of typed messages the dispatcher accepts and produces.
//!
//! Every variant derives `Serialize, Deserialize` so that a codec layered on top (Bencode, JSON,
//! whatever a driver picks) can round-trip them without the core knowing about the wire format.
//! Serialization itself is a boundary concern this crate stays compatible with, not implements.

use serde::{Deserialize, Serialize};

use crate::config::NodeId;
use crate::log::{LogEntry, LogIndex, Term};
use crate::role::RoleTag;

/// One message in or out of the dispatcher. Every variant carries `source` and `target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message {
	/// External client proposing a new entry to the leader.
	ClientLogAppend {
		source: NodeId,
		target: NodeId,
		item: Vec<u8>,
	},

	/// Timer-driven trigger telling a leader to replicate/heartbeat to `followers`.
	UpdateFollowers {
		source: NodeId,
		target: NodeId,
		followers: Vec<NodeId>,
	},

	/// Leader -> follower replication request.
	AppendEntryRequest {
		source: NodeId,
		target: NodeId,
		current_term: Term,
		previous_index: LogIndex,
		previous_term: Term,
		entries: Vec<LogEntry>,
		commit_index: LogIndex,
	},

	/// Follower -> leader reply to `AppendEntryRequest`.
	AppendEntryResponse {
		source: NodeId,
		target: NodeId,
		current_term: Term,
		success: bool,
		entries_length: usize,
	},

	/// Role-change-driven trigger telling a fresh candidate to solicit votes from `followers`.
	RunElection {
		source: NodeId,
		target: NodeId,
		followers: Vec<NodeId>,
	},

	/// Candidate -> peer vote solicitation.
	RequestVoteRequest {
		source: NodeId,
		target: NodeId,
		current_term: Term,
		last_log_index: LogIndex,
		last_log_term: Term,
	},

	/// Peer -> candidate reply to `RequestVoteRequest`.
	RequestVoteResponse {
		source: NodeId,
		target: NodeId,
		success: bool,
		current_term: Term,
	},

	/// Self-addressed trigger requesting a role transition.
	RoleChange {
		source: NodeId,
		target: NodeId,
		from_role: RoleTag,
		to_role: RoleTag,
	},
}

impl Message {
	pub fn source(&self) -> NodeId {
		match self {
			Message::ClientLogAppend { source, .. }
			| Message::UpdateFollowers { source, .. }
			| Message::AppendEntryRequest { source, .. }
			| Message::AppendEntryResponse { source, .. }
			| Message::RunElection { source, .. }
			| Message::RequestVoteRequest { source, .. }
			| Message::RequestVoteResponse { source, .. }
			| Message::RoleChange { source, .. } => *source,
		}
	}

	pub fn target(&self) -> NodeId {
		match self {
			Message::ClientLogAppend { target, .. }
			| Message::UpdateFollowers { target, .. }
			| Message::AppendEntryRequest { target, .. }
			| Message::AppendEntryResponse { target, .. }
			| Message::RunElection { target, .. }
			| Message::RequestVoteRequest { target, .. }
			| Message::RequestVoteResponse { target, .. }
			| Message::RoleChange { target, .. } => *target,
		}
	}
}
