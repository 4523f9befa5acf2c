//! The core doesn't implement a wire codec (that's an explicit boundary concern -- see the
//! crate's top-level docs), but every `Message` variant derives `Serialize`/`Deserialize` so a
//! codec layered on top can round-trip them unchanged. These tests pin that contract down with
//! `serde_json` as a stand-in transport: not the codec the core ships with, just a convenient,
//! ubiquitous one to prove the derive actually round-trips every field of every variant.

use raft_core::{LogEntry, Message, NodeId, RoleTag};

fn round_trip(message: &Message) {
	let encoded = serde_json::to_string(message).expect("message must serialize");
	let decoded: Message = serde_json::from_str(&encoded).expect("message must deserialize");
	assert_eq!(&decoded, message);
}

#[test]
fn every_message_variant_round_trips_through_json() {
	round_trip(&Message::ClientLogAppend {
		source: NodeId(0),
		target: NodeId(1),
		item: b"payload".to_vec(),
	});

	round_trip(&Message::UpdateFollowers {
		source: NodeId(1),
		target: NodeId(1),
		followers: vec![NodeId(2), NodeId(3)],
	});

	round_trip(&Message::AppendEntryRequest {
		source: NodeId(1),
		target: NodeId(2),
		current_term: 4,
		previous_index: 2,
		previous_term: 3,
		entries: vec![LogEntry::new(4, b"a".to_vec()), LogEntry::new(4, b"b".to_vec())],
		commit_index: 1,
	});

	round_trip(&Message::AppendEntryResponse {
		source: NodeId(2),
		target: NodeId(1),
		current_term: 4,
		success: true,
		entries_length: 2,
	});

	round_trip(&Message::RunElection {
		source: NodeId(1),
		target: NodeId(1),
		followers: vec![NodeId(2), NodeId(3)],
	});

	round_trip(&Message::RequestVoteRequest {
		source: NodeId(1),
		target: NodeId(2),
		current_term: 4,
		last_log_index: 1,
		last_log_term: 4,
	});

	round_trip(&Message::RequestVoteResponse {
		source: NodeId(2),
		target: NodeId(1),
		success: false,
		current_term: 4,
	});

	round_trip(&Message::RoleChange {
		source: NodeId(1),
		target: NodeId(1),
		from_role: RoleTag::Follower,
		to_role: RoleTag::Candidate,
	});
}

#[test]
fn log_entry_equality_matches_both_fields() {
	let a = LogEntry::new(1, b"x".to_vec());
	let b = LogEntry::new(1, b"x".to_vec());
	let c = LogEntry::new(1, b"y".to_vec());
	let d = LogEntry::new(2, b"x".to_vec());

	assert_eq!(a, b);
	assert_ne!(a, c);
	assert_ne!(a, d);

	round_trip(&Message::AppendEntryRequest {
		source: NodeId(1),
		target: NodeId(2),
		current_term: 0,
		previous_index: -1,
		previous_term: -1,
		entries: vec![a],
		commit_index: -1,
	});
}
