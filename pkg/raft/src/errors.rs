//! Invariant-violation errors surfaced to the driver.
//!
//! Protocol-level failures (a denied vote, a rejected append) are never
//! represented here: they are ordinary `Message` values returned from
//! `dispatch`. Only the programming errors enumerated below -- conditions
//! that indicate a bug, not a network condition -- come back as an `Err`.

error_chain! {
	errors {
		/// A `ClientLogAppend` or `UpdateFollowers` arrived while this node is not leader.
		NotLeader(role: crate::role::RoleTag) {
			description("operation requires the leader role")
			display("operation requires the leader role, but this node is currently {:?}", role)
		}

		/// A `RunElection` arrived while this node is not a candidate.
		NotCandidate(role: crate::role::RoleTag) {
			description("operation requires the candidate role")
			display("operation requires the candidate role, but this node is currently {:?}", role)
		}

		/// A `RoleChange` whose `from_role` does not match the node's actual current role.
		RoleMismatch(expected: crate::role::RoleTag, actual: crate::role::RoleTag) {
			description("RoleChange.from_role does not match the node's current role")
			display("RoleChange claimed from_role {:?} but the node is actually {:?}", expected, actual)
		}

		/// A `RoleChange` naming a transition this core never produces.
		UnsupportedRoleChange(from: crate::role::RoleTag, to: crate::role::RoleTag) {
			description("unsupported role change")
			display("no trigger source is defined for the role change {:?} -> {:?}", from, to)
		}

		/// The log's conflict-truncation pass should have removed any entry that could
		/// disagree with an incoming one; finding one anyway is an internal contradiction.
		LogContradiction(index: crate::log::LogIndex) {
			description("log entry survived conflict truncation but disagrees with the incoming entry")
			display("internal invariant violation: entry at index {} disagrees with the incoming entry after truncation", index)
		}
	}
}
