//! Cluster identity and configuration.
//!
//! `ClusterConfig` is an immutable set of voting members; there is no online membership change
//! here, dynamic membership is out of scope for this core.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Identifier for a node, dense over the configured cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// The immutable set of nodes that make up the cluster this node's config was started with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterConfig {
	members: HashSet<NodeId>,
}

impl ClusterConfig {
	pub fn new(members: impl IntoIterator<Item = NodeId>) -> Self {
		ClusterConfig {
			members: members.into_iter().collect(),
		}
	}

	pub fn contains(&self, id: NodeId) -> bool {
		self.members.contains(&id)
	}

	pub fn len(&self) -> usize {
		self.members.len()
	}

	pub fn is_empty(&self) -> bool {
		self.members.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &NodeId> {
		self.members.iter()
	}

	/// `floor(N/2) + 1`, the number of votes or match-indices required for quorum.
	pub fn majority(&self) -> usize {
		(self.members.len() / 2) + 1
	}

	/// All other configured members (everyone except `id`), used to build the fan-out list for
	/// `UpdateFollowers`/`RunElection`.
	pub fn peers_of(&self, id: NodeId) -> Vec<NodeId> {
		self.members.iter().copied().filter(|m| *m != id).collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn majority_of_three_is_two() {
		let config = ClusterConfig::new(vec![NodeId(1), NodeId(2), NodeId(3)]);
		assert_eq!(config.majority(), 2);
	}

	#[test]
	fn majority_of_one_is_one() {
		let config = ClusterConfig::new(vec![NodeId(1)]);
		assert_eq!(config.majority(), 1);
	}

	#[test]
	fn peers_of_excludes_self() {
		let config = ClusterConfig::new(vec![NodeId(1), NodeId(2), NodeId(3)]);
		let mut peers = config.peers_of(NodeId(1));
		peers.sort();
		assert_eq!(peers, vec![NodeId(2), NodeId(3)]);
	}
}
