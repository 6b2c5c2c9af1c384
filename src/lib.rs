//! Nocturne: a session engine for hidden-role social deduction games.
//!
//! The engine drives werewolf-style games through a fixed phase cycle,
//! records every fact in a hash-chained append-only event log, resolves
//! nights and votes deterministically, and builds seat-scoped observations
//! that never leak another living seat's secrets.
//!
//! [`GameEngine`] is the single entry point: create a session from a
//! [`GameConfig`], deal roles, and feed it seat actions. Phase deadlines
//! advance the game on their own; manual advances and deadline expiry race
//! safely, with exactly one of them winning.
//!
//! The in-memory session is a cache. The log is the source of truth, and
//! [`session::rebuild::from_events`] reconstructs a session that compares
//! equal to the live one.

pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod ids;
pub mod observability;
pub mod observe;
pub mod resolve;
pub mod role;
pub mod session;

pub use config::GameConfig;
pub use engine::GameEngine;
pub use error::{EngineError, Result};
pub use event::{EventKind, EventRecord, Visibility};
pub use ids::{Actor, GameId, Seat};
pub use observe::{EligibleAction, Observation};
pub use role::{Alignment, NightActionKind, Role};
pub use session::phase::Phase;
