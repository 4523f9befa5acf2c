//! The per-node role state machine and the pure role-transition functions.
//!
//! Role-specific sub-records (`CandidateState`, `LeaderState`) live on the `Role` enum variants
//! rather than as nullable fields on a flat record; there are no driver-owned timer fields here
//! since this core never reads a clock.
//!
//! `Timer`/`ElectionCommission`/`Constitution` are not role variants; they are source tags on
//! `TriggerSource`, kept separate from `Peer(RoleTag)` so an exhaustive match over roles never
//! has to account for a pseudo-role.

use std::collections::HashMap;

use crate::config::NodeId;
use crate::log::LogIndex;

/// A role, without its associated data. Used wherever only the tag matters (transition tables,
/// `RoleChange` messages, `TriggerSource::Peer`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum RoleTag {
	Follower,
	Candidate,
	Leader,
}

/// Candidate-only vote tally: who each configured member voted for in the current term, if known.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CandidateState {
	pub current_votes: HashMap<NodeId, Option<NodeId>>,
}

impl CandidateState {
	/// Number of members on record as having voted for `self_id`.
	pub fn votes_for(&self, self_id: NodeId) -> usize {
		self.current_votes
			.values()
			.filter(|v| **v == Some(self_id))
			.count()
	}
}

/// Leader-only replication view: one progress record per configured member.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LeaderState {
	/// Index the leader will attempt to send next to each member.
	pub next_index: HashMap<NodeId, LogIndex>,
	/// Highest index known replicated on each member, or `None` if unknown.
	pub match_index: HashMap<NodeId, Option<LogIndex>>,
	/// Whether any follower has responded since the last heartbeat interval.
	pub has_followers: bool,
}

/// The per-node role, carrying whatever auxiliary state is meaningful for that role.
#[derive(Debug, Clone, PartialEq)]
pub enum Role {
	Follower,
	Candidate(CandidateState),
	Leader(LeaderState),
}

impl Role {
	pub fn tag(&self) -> RoleTag {
		match self {
			Role::Follower => RoleTag::Follower,
			Role::Candidate(_) => RoleTag::Candidate,
			Role::Leader(_) => RoleTag::Leader,
		}
	}

	pub fn as_candidate(&self) -> Option<&CandidateState> {
		match self {
			Role::Candidate(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_candidate_mut(&mut self) -> Option<&mut CandidateState> {
		match self {
			Role::Candidate(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_leader(&self) -> Option<&LeaderState> {
		match self {
			Role::Leader(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_leader_mut(&mut self) -> Option<&mut LeaderState> {
		match self {
			Role::Leader(s) => Some(s),
			_ => None,
		}
	}
}

/// Who or what triggered a role evaluation. Pseudo-sources model internal events without adding
/// fake roles to `RoleTag`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
	/// A remote RPC from a peer known (by message type) to hold `RoleTag`.
	Peer(RoleTag),
	/// The driver's timer elapsed.
	Timer,
	/// This candidate just won an election.
	ElectionCommission,
	/// This leader lost contact with its followers.
	Constitution,
}

/// What to do with `voted_for` as part of a state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VotedForOp {
	Pass,
	ResetToNone,
	InitializeToSelf,
}

/// What to do with one of the role-scoped attributes as part of a state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
	Pass,
	ResetToNone,
	Initialize,
}

/// A complete, pending state change: a possible role transition plus the per-attribute
/// operations it implies. Produced by `enumerate_state_change`, applied by
/// `implement_state_change`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
	pub role_change: Option<(RoleTag, RoleTag)>,
	pub new_current_term: crate::log::Term,
	pub voted_for_op: VotedForOp,
	pub next_index_op: Operation,
	pub match_index_op: Operation,
	pub commit_index_op: Operation,
	pub has_followers_op: Operation,
	pub current_votes_op: Operation,
}

/// Pure function mapping `(source role, source term, target role, target term)` to a role
/// change (if any), the resulting term, and what to do with `voted_for`.
pub fn evaluate_role_change(
	source: TriggerSource,
	source_term: crate::log::Term,
	target_role: RoleTag,
	target_term: crate::log::Term,
) -> (Option<(RoleTag, RoleTag)>, crate::log::Term, VotedForOp) {
	match source {
		TriggerSource::Timer => {
			if target_role == RoleTag::Follower {
				(
					Some((RoleTag::Follower, RoleTag::Candidate)),
					target_term + 1,
					VotedForOp::InitializeToSelf,
				)
			} else {
				(None, target_term, VotedForOp::Pass)
			}
		}
		TriggerSource::ElectionCommission => {
			if target_role == RoleTag::Candidate {
				(
					Some((RoleTag::Candidate, RoleTag::Leader)),
					target_term,
					VotedForOp::Pass,
				)
			} else {
				(None, target_term, VotedForOp::Pass)
			}
		}
		TriggerSource::Constitution => {
			if target_role == RoleTag::Leader {
				(
					Some((RoleTag::Leader, RoleTag::Follower)),
					target_term,
					VotedForOp::Pass,
				)
			} else {
				(None, target_term, VotedForOp::Pass)
			}
		}
		TriggerSource::Peer(source_role) => {
			if source_term > target_term {
				let role_change = if target_role != RoleTag::Follower {
					Some((target_role, RoleTag::Follower))
				} else {
					None
				};
				(role_change, source_term, VotedForOp::ResetToNone)
			} else if source_term == target_term {
				if source_role == RoleTag::Leader && target_role == RoleTag::Candidate {
					(
						Some((RoleTag::Candidate, RoleTag::Follower)),
						target_term,
						VotedForOp::Pass,
					)
				} else {
					(None, target_term, VotedForOp::Pass)
				}
			} else {
				// source_term < target_term: stale message, caller rejects it and makes no
				// state change.
				(None, target_term, VotedForOp::Pass)
			}
		}
	}
}

/// Pure function mapping a role change to the per-attribute operations it implies. Attributes
/// whose target role doesn't carry them are harmless no-ops in practice: the role-specific
/// sub-record is simply not constructed with them.
pub fn evaluate_operations(
	role_change: Option<(RoleTag, RoleTag)>,
) -> (Operation, Operation, Operation, Operation, Operation) {
	use Operation::*;
	match role_change {
		Some((RoleTag::Follower, RoleTag::Candidate)) => (Pass, Pass, Pass, Pass, Initialize),
		Some((RoleTag::Candidate, RoleTag::Leader)) => (Initialize, Initialize, Pass, Initialize, Pass),
		Some((RoleTag::Candidate, RoleTag::Follower)) => (Pass, Pass, Pass, Pass, ResetToNone),
		Some((RoleTag::Leader, RoleTag::Follower)) => {
			(ResetToNone, ResetToNone, ResetToNone, ResetToNone, ResetToNone)
		}
		_ => (Pass, Pass, Pass, Pass, Pass),
	}
}

/// Composes `evaluate_role_change` and `evaluate_operations` into one descriptor.
pub fn enumerate_state_change(
	source: TriggerSource,
	source_term: crate::log::Term,
	target_role: RoleTag,
	target_term: crate::log::Term,
) -> StateChange {
	let (role_change, new_current_term, voted_for_op) =
		evaluate_role_change(source, source_term, target_role, target_term);
	let (next_index_op, match_index_op, commit_index_op, has_followers_op, current_votes_op) =
		evaluate_operations(role_change);

	StateChange {
		role_change,
		new_current_term,
		voted_for_op,
		next_index_op,
		match_index_op,
		commit_index_op,
		has_followers_op,
		current_votes_op,
	}
}
