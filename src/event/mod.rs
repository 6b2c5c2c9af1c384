//! Hash-chained, append-only event log.
//!
//! Events are the single source of truth: the in-memory session is a cache
//! that can be fully reconstructed by replay. Each record's hash covers the
//! previous record's hash, making retroactive edits computationally evident.

pub mod log;
pub mod publish;
pub mod record;

pub use log::{EventLog, GameSummary, PhaseStamp};
pub use publish::EventPublisher;
pub use record::{ChatChannel, EventKind, EventRecord, RoleAssignment, Visibility};
