//! The message dispatcher and its per-variant handlers.
//!
//! One `dispatch` entry point with an exhaustive match over the message type, so every variant
//! is guaranteed a handler at compile time, with one private handler function per variant
//! underneath so each handler's logic and doc comment stay individually legible.

use crate::config::NodeId;
use crate::errors::*;
use crate::log::{LogEntry, LogIndex, Term, NO_TERM};
use crate::message::Message;
use crate::node::Node;
use crate::role::{enumerate_state_change, RoleTag, TriggerSource};

/// The dispatcher: the only mutator of `Node`. Applies the common preamble (for messages that
/// carry a remote term) before handing off to the variant-specific handler, then returns
/// whatever outbound messages that handler produced.
pub fn dispatch(node: &mut Node, message: Message) -> Result<Vec<Message>> {
	match message {
		Message::ClientLogAppend { item, .. } => handle_client_log_append(node, item),
		Message::UpdateFollowers { followers, .. } => handle_update_followers(node, followers),
		Message::AppendEntryRequest {
			source,
			current_term,
			previous_index,
			previous_term,
			entries,
			commit_index,
			..
		} => handle_append_entry_request(
			node,
			source,
			current_term,
			previous_index,
			previous_term,
			entries,
			commit_index,
		),
		Message::AppendEntryResponse {
			source,
			current_term,
			success,
			entries_length,
			..
		} => handle_append_entry_response(node, source, current_term, success, entries_length),
		Message::RunElection { followers, .. } => handle_run_election(node, followers),
		Message::RequestVoteRequest {
			source,
			current_term,
			last_log_index,
			last_log_term,
			..
		} => handle_request_vote_request(node, source, current_term, last_log_index, last_log_term),
		Message::RequestVoteResponse {
			source,
			success,
			current_term,
			..
		} => handle_request_vote_response(node, source, success, current_term),
		Message::RoleChange {
			from_role, to_role, ..
		} => handle_role_change(node, from_role, to_role),
	}
}

/// Common preamble: observes a remote term/role before any variant-specific logic
/// runs, so a stale leader always steps down (or a higher term is always adopted) first.
fn observe_remote(node: &mut Node, source_role: RoleTag, source_term: Term) {
	let change = enumerate_state_change(
		TriggerSource::Peer(source_role),
		source_term,
		node.role_tag(),
		node.current_term(),
	);
	node.implement_state_change(&change);
}

/// `ClientLogAppend(item)`.
fn handle_client_log_append(node: &mut Node, item: Vec<u8>) -> Result<Vec<Message>> {
	if node.role_tag() != RoleTag::Leader {
		bail!(ErrorKind::NotLeader(node.role_tag()));
	}

	let term = node.current_term();
	node.log.append_one(LogEntry::new(term, item));

	let log_len = node.log.len() as LogIndex;
	let last_index = node.log.last_index();
	let self_id = node.id();
	let leader = node
		.role
		.as_leader_mut()
		.expect("role_tag() == Leader implies Role::Leader");
	leader.next_index.insert(self_id, log_len);
	leader.match_index.insert(self_id, Some(last_index));

	log::debug!("node {}: appended entry at index {} in term {}", self_id, last_index, term);

	Ok(vec![])
}

/// `UpdateFollowers(followers)`.
fn handle_update_followers(node: &mut Node, followers: Vec<NodeId>) -> Result<Vec<Message>> {
	if node.role_tag() != RoleTag::Leader {
		bail!(ErrorKind::NotLeader(node.role_tag()));
	}

	let self_id = node.id();
	let current_term = node.current_term();
	let commit_index = node.commit_index();
	let log_len = node.log.len() as LogIndex;

	let leader = node
		.role
		.as_leader()
		.expect("role_tag() == Leader implies Role::Leader");

	let mut out = Vec::with_capacity(followers.len());
	for follower in followers {
		let next_index = leader.next_index.get(&follower).copied().unwrap_or(log_len);
		let previous_index = next_index - 1;
		let previous_term = node.log.term_at(previous_index).unwrap_or(NO_TERM);
		let entries = node.log.slice_from(next_index).to_vec();

		out.push(Message::AppendEntryRequest {
			source: self_id,
			target: follower,
			current_term,
			previous_index,
			previous_term,
			entries,
			commit_index,
		});
	}

	Ok(out)
}

/// `AppendEntryRequest` (follower side).
fn handle_append_entry_request(
	node: &mut Node,
	source: NodeId,
	current_term: Term,
	previous_index: LogIndex,
	previous_term: Term,
	entries: Vec<LogEntry>,
	leader_commit_index: LogIndex,
) -> Result<Vec<Message>> {
	observe_remote(node, RoleTag::Leader, current_term);

	let self_id = node.id();
	let entries_length = entries.len();

	if node.role_tag() != RoleTag::Follower {
		return Ok(vec![Message::AppendEntryResponse {
			source: self_id,
			target: source,
			current_term: node.current_term(),
			success: false,
			entries_length,
		}]);
	}

	let success = node.log.append_entries(previous_index, previous_term, &entries)?;

	if success && leader_commit_index > node.commit_index() {
		node.commit_index = leader_commit_index.min(node.log.last_index());
		log::debug!("node {}: advanced commit_index to {}", self_id, node.commit_index);
	}

	Ok(vec![Message::AppendEntryResponse {
		source: self_id,
		target: source,
		current_term: node.current_term(),
		success,
		entries_length,
	}])
}

/// `AppendEntryResponse` (leader side).
fn handle_append_entry_response(
	node: &mut Node,
	source: NodeId,
	current_term: Term,
	success: bool,
	entries_length: usize,
) -> Result<Vec<Message>> {
	observe_remote(node, RoleTag::Follower, current_term);

	if node.role_tag() != RoleTag::Leader {
		return Ok(vec![]);
	}

	if success {
		let self_id = node.id();
		let leader = node
			.role
			.as_leader_mut()
			.expect("role_tag() == Leader implies Role::Leader");

		let next_index = leader.next_index.entry(source).or_insert(0);
		*next_index += entries_length as LogIndex;
		let new_match_index = *next_index - 1;
		leader.match_index.insert(source, Some(new_match_index));
		leader.has_followers = true;

		advance_commit_index(node);
		log::debug!("node {}: follower {} now matches index {}", self_id, source, new_match_index);

		Ok(vec![])
	} else {
		let self_id = node.id();
		let current_term = node.current_term();
		let commit_index = node.commit_index();

		let leader = node
			.role
			.as_leader_mut()
			.expect("role_tag() == Leader implies Role::Leader");
		let next_index = leader.next_index.entry(source).or_insert(0);
		*next_index = (*next_index - 1).max(0);
		let next_index = *next_index;

		let previous_index = next_index - 1;
		let previous_term = node.log.term_at(previous_index).unwrap_or(NO_TERM);
		let entries = node.log.slice_from(next_index).to_vec();

		log::debug!("node {}: retrying follower {} from next_index {}", self_id, source, next_index);

		Ok(vec![Message::AppendEntryRequest {
			source: self_id,
			target: source,
			current_term,
			previous_index,
			previous_term,
			entries,
			commit_index,
		}])
	}
}

/// Re-evaluate commit advancement after a successful `AppendEntryResponse`.
///
/// Takes the `k`-th largest known `match_index` directly (`k` = majority) and only commits past
/// it if the entry at that index was created in the current term.
fn advance_commit_index(node: &mut Node) {
	let majority = node.config().majority();
	let current_term = node.current_term();

	let leader = match node.role().as_leader() {
		Some(l) => l,
		None => return,
	};

	let mut known: Vec<LogIndex> = leader.match_index.values().filter_map(|v| *v).collect();
	if known.len() < majority {
		return;
	}

	known.sort_unstable_by(|a, b| b.cmp(a));
	let candidate = known[majority - 1];

	if candidate > node.commit_index() && node.log().term_at(candidate) == Some(current_term) {
		node.commit_index = candidate;
	}
}

/// `RunElection(followers)`.
fn handle_run_election(node: &mut Node, followers: Vec<NodeId>) -> Result<Vec<Message>> {
	if node.role_tag() != RoleTag::Candidate {
		bail!(ErrorKind::NotCandidate(node.role_tag()));
	}

	let self_id = node.id();
	let current_term = node.current_term();
	let last_log_index = node.log().last_index();
	let last_log_term = node.log().term_at(last_log_index).unwrap_or(NO_TERM);

	log::info!("node {}: starting election for term {}", self_id, current_term);

	Ok(followers
		.into_iter()
		.map(|follower| Message::RequestVoteRequest {
			source: self_id,
			target: follower,
			current_term,
			last_log_index,
			last_log_term,
		})
		.collect())
}

/// `RequestVoteRequest`.
fn handle_request_vote_request(
	node: &mut Node,
	source: NodeId,
	current_term: Term,
	last_log_index: LogIndex,
	last_log_term: Term,
) -> Result<Vec<Message>> {
	observe_remote(node, RoleTag::Candidate, current_term);

	let self_id = node.id();

	if node.role_tag() != RoleTag::Follower {
		return Ok(vec![Message::RequestVoteResponse {
			source: self_id,
			target: source,
			success: false,
			current_term: node.current_term(),
		}]);
	}

	let self_last_index = node.log().last_index();
	let self_last_term = node.log().term_at(self_last_index).unwrap_or(NO_TERM);

	// Higher term wins first; only at equal term does log length decide.
	let granted = if current_term < node.current_term() {
		false
	} else if last_log_term < self_last_term {
		false
	} else if last_log_term == self_last_term && last_log_index < self_last_index {
		false
	} else if let Some(voted_for) = node.voted_for() {
		voted_for == source
	} else {
		node.voted_for = Some(source);
		log::info!("node {}: cast vote for {} in term {}", self_id, source, node.current_term());
		true
	};

	Ok(vec![Message::RequestVoteResponse {
		source: self_id,
		target: source,
		success: granted,
		current_term: node.current_term(),
	}])
}

/// `RequestVoteResponse` (candidate side).
fn handle_request_vote_response(
	node: &mut Node,
	source: NodeId,
	success: bool,
	current_term: Term,
) -> Result<Vec<Message>> {
	observe_remote(node, RoleTag::Follower, current_term);

	if node.role_tag() != RoleTag::Candidate {
		return Ok(vec![]);
	}

	if !success {
		return Ok(vec![]);
	}

	let self_id = node.id();
	let votes_for_self = {
		let candidate = node
			.role
			.as_candidate_mut()
			.expect("role_tag() == Candidate implies Role::Candidate");
		candidate.current_votes.insert(source, Some(self_id));
		candidate.votes_for(self_id)
	};

	let majority = node.config().majority();
	if votes_for_self < majority {
		return Ok(vec![]);
	}

	log::info!("node {}: won election for term {}", self_id, node.current_term());

	let change = enumerate_state_change(
		TriggerSource::ElectionCommission,
		node.current_term(),
		node.role_tag(),
		node.current_term(),
	);
	node.implement_state_change(&change);

	Ok(vec![Message::UpdateFollowers {
		source: self_id,
		target: self_id,
		followers: node.config().peers_of(self_id),
	}])
}

/// `RoleChange(from_role, to_role)`.
///
/// The only two transitions this core ever receives through a `RoleChange` message are
/// `Follower -> Candidate` (driven by `Timer`, via the driver's timeout) and `Leader -> Follower`
/// (driven by `Constitution`, when a leader has lost contact with its followers). Anything else
/// is a driver bug.
fn handle_role_change(node: &mut Node, from_role: RoleTag, to_role: RoleTag) -> Result<Vec<Message>> {
	if node.role_tag() != from_role {
		bail!(ErrorKind::RoleMismatch(from_role, node.role_tag()));
	}

	let trigger = match (from_role, to_role) {
		(RoleTag::Follower, RoleTag::Candidate) => TriggerSource::Timer,
		(RoleTag::Leader, RoleTag::Follower) => TriggerSource::Constitution,
		_ => bail!(ErrorKind::UnsupportedRoleChange(from_role, to_role)),
	};

	let change = enumerate_state_change(trigger, node.current_term(), node.role_tag(), node.current_term());
	node.implement_state_change(&change);

	if change.role_change == Some((RoleTag::Follower, RoleTag::Candidate)) {
		let self_id = node.id();
		Ok(vec![Message::RunElection {
			source: self_id,
			target: self_id,
			followers: node.config().peers_of(self_id),
		}])
	} else {
		Ok(vec![])
	}
}

/// The timeout driver contract. Produces one message the driver then feeds back into
/// `dispatch` as if it had arrived externally. The core never calls this itself -- it has no
/// clock of its own.
pub fn change_state_on_timeout(node: &mut Node) -> Message {
	let self_id = node.id();

	match node.role_tag() {
		RoleTag::Follower => Message::RoleChange {
			source: self_id,
			target: self_id,
			from_role: RoleTag::Follower,
			to_role: RoleTag::Candidate,
		},
		RoleTag::Candidate => {
			// The one place besides a higher observed remote term where the term advances.
			node.current_term += 1;
			Message::RunElection {
				source: self_id,
				target: self_id,
				followers: node.config().peers_of(self_id),
			}
		}
		RoleTag::Leader => {
			let has_followers = node
				.role()
				.as_leader()
				.expect("role_tag() == Leader implies Role::Leader")
				.has_followers;

			if !has_followers {
				Message::RoleChange {
					source: self_id,
					target: self_id,
					from_role: RoleTag::Leader,
					to_role: RoleTag::Follower,
				}
			} else {
				node.role
					.as_leader_mut()
					.expect("role_tag() == Leader implies Role::Leader")
					.has_followers = false;

				Message::UpdateFollowers {
					source: self_id,
					target: self_id,
					followers: node.config().peers_of(self_id),
				}
			}
		}
	}
}
