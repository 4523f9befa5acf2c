//! The per-node record and the mechanics of applying a `StateChange` to it.
//!
//! `id`/`config`/term/vote/commit-index/log/role live directly on one `Node` record; there is no
//! separate persisted metadata struct, since persistence across restarts is out of scope here.

use std::sync::{Arc, Mutex};

use crate::config::{ClusterConfig, NodeId};
use crate::log::{Log, LogIndex, Term, BEFORE_FIRST_INDEX, NO_TERM};
use crate::role::{Role, RoleTag, StateChange, VotedForOp};

/// The per-node consensus state. Mutates only through `dispatch` and `implement_state_change`.
#[derive(Debug, Clone)]
pub struct Node {
	pub(crate) id: NodeId,
	pub(crate) config: ClusterConfig,
	pub(crate) current_term: Term,
	pub(crate) voted_for: Option<NodeId>,
	pub(crate) commit_index: LogIndex,
	pub(crate) log: Log,
	pub(crate) role: Role,
}

/// An opt-in for drivers that want to share one node across threads, serialized through a
/// single lock. `Node` itself does no internal locking.
pub type SharedNode = Arc<Mutex<Node>>;

impl Node {
	/// Creates a node in Follower role with an empty log, term `NO_TERM`, and commit index
	/// `BEFORE_FIRST_INDEX`.
	pub fn new(id: NodeId, config: ClusterConfig) -> Self {
		Node {
			id,
			config,
			current_term: NO_TERM,
			voted_for: None,
			commit_index: BEFORE_FIRST_INDEX,
			log: Log::new(),
			role: Role::Follower,
		}
	}

	pub fn id(&self) -> NodeId {
		self.id
	}

	pub fn config(&self) -> &ClusterConfig {
		&self.config
	}

	pub fn current_term(&self) -> Term {
		self.current_term
	}

	pub fn voted_for(&self) -> Option<NodeId> {
		self.voted_for
	}

	pub fn commit_index(&self) -> LogIndex {
		self.commit_index
	}

	pub fn log(&self) -> &Log {
		&self.log
	}

	pub fn role(&self) -> &Role {
		&self.role
	}

	pub fn role_tag(&self) -> RoleTag {
		self.role.tag()
	}

	/// Applies a `StateChange` descriptor produced by `enumerate_state_change`.
	///
	/// Asserts that the outgoing role of any `role_change` equals the node's actual current
	/// role before mutating it: a mismatch is a logic bug, not a runtime condition, so this
	/// panics rather than returning an `Error`.
	pub fn implement_state_change(&mut self, change: &StateChange) {
		if let Some((from_role, _)) = change.role_change {
			assert_eq!(
				self.role.tag(),
				from_role,
				"state change claims outgoing role {:?} but node is {:?}",
				from_role,
				self.role.tag()
			);
		}

		self.current_term = change.new_current_term;

		match change.voted_for_op {
			VotedForOp::Pass => {}
			VotedForOp::ResetToNone => self.voted_for = None,
			VotedForOp::InitializeToSelf => self.voted_for = Some(self.id),
		}

		if change.commit_index_op == crate::role::Operation::ResetToNone {
			self.commit_index = BEFORE_FIRST_INDEX;
		}

		if let Some((_, to_role)) = change.role_change {
			self.role = self.build_role(to_role, change);
		}
	}

	fn build_role(&self, to_role: RoleTag, change: &StateChange) -> Role {
		use crate::role::{CandidateState, LeaderState, Operation};
		use std::collections::HashMap;

		match to_role {
			RoleTag::Follower => Role::Follower,
			RoleTag::Candidate => {
				let mut current_votes = HashMap::new();
				if change.current_votes_op == Operation::Initialize {
					for member in self.config.iter() {
						current_votes.insert(*member, None);
					}
					current_votes.insert(self.id, Some(self.id));
				}
				Role::Candidate(CandidateState { current_votes })
			}
			RoleTag::Leader => {
				let mut next_index = HashMap::new();
				if change.next_index_op == Operation::Initialize {
					for member in self.config.iter() {
						next_index.insert(*member, self.log.len() as LogIndex);
					}
				}

				let mut match_index = HashMap::new();
				if change.match_index_op == Operation::Initialize {
					for member in self.config.iter() {
						match_index.insert(*member, None);
					}
					match_index.insert(self.id, Some(self.log.last_index()));
				}

				// INITIALIZE is the only operation that ever produces a Leader role, and it
				// always seeds `false` ("received any follower response since the last
				// heartbeat interval" starts unset).
				let has_followers = false;
				debug_assert_eq!(change.has_followers_op, Operation::Initialize);

				Role::Leader(LeaderState {
					next_index,
					match_index,
					has_followers,
				})
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::role::{enumerate_state_change, TriggerSource};

	fn new_node(id: u64, members: &[u64]) -> Node {
		let config = ClusterConfig::new(members.iter().map(|m| NodeId(*m)));
		Node::new(NodeId(id), config)
	}

	#[test]
	fn new_node_starts_as_follower_with_sentinel_term_and_commit_index() {
		let node = new_node(1, &[1, 2, 3]);
		assert_eq!(node.role_tag(), RoleTag::Follower);
		assert_eq!(node.current_term(), NO_TERM);
		assert_eq!(node.commit_index(), BEFORE_FIRST_INDEX);
		assert_eq!(node.voted_for(), None);
		assert!(node.log().is_empty());
	}

	#[test]
	fn timer_trigger_seeds_candidate_self_vote() {
		let mut node = new_node(1, &[1, 2, 3]);
		let change = enumerate_state_change(TriggerSource::Timer, 0, node.role_tag(), node.current_term());
		node.implement_state_change(&change);

		assert_eq!(node.role_tag(), RoleTag::Candidate);
		assert_eq!(node.current_term(), 0);
		assert_eq!(node.voted_for(), Some(NodeId(1)));
		let candidate = node.role().as_candidate().unwrap();
		assert_eq!(candidate.votes_for(NodeId(1)), 1);
	}

	#[test]
	fn election_commission_seeds_leader_indices_from_log_length() {
		let mut node = new_node(1, &[1, 2, 3]);
		node.log.append_one(crate::log::LogEntry::new(0, b"x".to_vec()));

		let change = enumerate_state_change(
			TriggerSource::Timer,
			0,
			node.role_tag(),
			node.current_term(),
		);
		node.implement_state_change(&change);

		let change = enumerate_state_change(
			TriggerSource::ElectionCommission,
			node.current_term(),
			node.role_tag(),
			node.current_term(),
		);
		node.implement_state_change(&change);

		assert_eq!(node.role_tag(), RoleTag::Leader);
		let leader = node.role().as_leader().unwrap();
		assert_eq!(leader.next_index[&NodeId(2)], 1);
		assert_eq!(leader.match_index[&NodeId(1)], Some(0));
		assert_eq!(leader.match_index[&NodeId(2)], None);
		assert!(!leader.has_followers);
	}

	#[test]
	#[should_panic]
	fn implement_state_change_panics_on_role_mismatch() {
		let mut node = new_node(1, &[1, 2, 3]);
		let change = crate::role::StateChange {
			role_change: Some((RoleTag::Leader, RoleTag::Follower)),
			new_current_term: node.current_term(),
			voted_for_op: VotedForOp::Pass,
			next_index_op: crate::role::Operation::Pass,
			match_index_op: crate::role::Operation::Pass,
			commit_index_op: crate::role::Operation::Pass,
			has_followers_op: crate::role::Operation::Pass,
			current_votes_op: crate::role::Operation::Pass,
		};
		node.implement_state_change(&change);
	}
}
