//! A pure, deterministic Raft consensus core: a replicated log, a role state machine, and a
//! message dispatcher, with no I/O and no clock of its own.
//!
//! A driver owns the clock, the network, and persistence, and drives this crate purely through
//! [`dispatch::dispatch`] and [`dispatch::change_state_on_timeout`].

#[macro_use]
extern crate error_chain;

pub mod config;
pub mod dispatch;
pub mod errors;
pub mod log;
pub mod message;
pub mod node;
pub mod role;

pub use config::{ClusterConfig, NodeId};
pub use dispatch::{change_state_on_timeout, dispatch};
pub use errors::{Error, ErrorKind, Result};
pub use log::{Log, LogEntry, LogIndex, Term, BEFORE_FIRST_INDEX, NO_TERM};
pub use message::Message;
pub use node::{Node, SharedNode};
pub use role::{Role, RoleTag};
