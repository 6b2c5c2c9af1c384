//! Error types for `nocturne`.
//!
//! Every rejection the engine produces is a synchronous, local validation
//! failure surfaced to the caller. The only unrecoverable system-level fault
//! is [`EngineError::ChainIntegrity`], which signals that the audit log can
//! no longer be trusted and must never be silently repaired.

use thiserror::Error;

use crate::config::ValidationIssue;
use crate::ids::{GameId, Seat};
use crate::role::NightActionKind;
use crate::session::phase::Phase;

/// Top-level error type for engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The referenced game session does not exist.
    ///
    /// Fatal to the call; not retried.
    #[error("game not found: {0}")]
    GameNotFound(GameId),

    /// The referenced seat does not exist in the session.
    #[error("seat not found: {0}")]
    SeatNotFound(Seat),

    /// An intent was submitted outside the phase it is valid in.
    ///
    /// The caller may retry in the correct phase.
    #[error("{action} not allowed in phase {phase}")]
    InvalidPhase {
        /// The session's current phase.
        phase: Phase,
        /// Human-readable name of the rejected intent.
        action: &'static str,
    },

    /// A phase transition that the fixed table does not permit.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// A dead seat, or a seat whose role lacks the power, attempted an action.
    ///
    /// Never retried; almost always a client bug.
    #[error("seat {seat} is not eligible: {reason}")]
    IneligibleActor {
        /// The offending seat.
        seat: Seat,
        /// Why the seat was rejected.
        reason: String,
    },

    /// The submitted target falls outside the computed constraint set.
    #[error("invalid target {target}: allowed targets are {allowed:?}")]
    InvalidTarget {
        /// The rejected target seat.
        target: Seat,
        /// The constraint set the target had to be in.
        allowed: Vec<Seat>,
    },

    /// A role-limited action whose single-use charge is already spent.
    #[error("seat {seat} has already used {action}")]
    ResourceExhausted {
        /// The acting seat.
        seat: Seat,
        /// The exhausted action kind.
        action: NightActionKind,
    },

    /// Player count does not match the configured role list length.
    #[error("roster mismatch: {players} players for {roles} roles")]
    RosterMismatch {
        /// Number of players supplied.
        players: usize,
        /// Number of roles configured.
        roles: usize,
    },

    /// Event log hash mismatch detected during verification.
    ///
    /// Automated trust in replay must halt; surface for manual audit.
    #[error("event chain integrity violation at index {index}: {detail}")]
    ChainIntegrity {
        /// First failing sequence index.
        index: u64,
        /// What failed to match.
        detail: String,
    },

    /// The game configuration failed validation.
    #[error("invalid configuration: {issues:?}")]
    Config {
        /// Issues collected by the validation pass.
        issues: Vec<ValidationIssue>,
    },

    /// Malformed message content (empty, oversized).
    #[error("invalid message content: {0}")]
    InvalidContent(String),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error (configuration loading).
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// I/O error (configuration loading).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Returns `true` when the error is an unrecoverable system-level fault
    /// rather than a per-call validation rejection.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::ChainIntegrity { .. })
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
