//! Event records and the closed event tag set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::config::GameConfig;
use crate::error::Result;
use crate::ids::{Actor, GameId, Seat};
use crate::resolve::{DeathCause, VoteReason};
use crate::role::{Alignment, NightActionKind, Role};
use crate::session::phase::Phase;

/// One immutable fact in the audit log.
///
/// Created once by the engine, never mutated or deleted. Recomputing
/// [`EventRecord::compute_hash`] from a record's own fields must reproduce
/// the stored `hash`, and `prev_hash` must equal the preceding record's
/// `hash` — any divergence signals tampering or a logic bug.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Owning game session.
    pub game_id: GameId,
    /// Monotonically increasing per game, starting at 0, no gaps.
    pub index: u64,
    /// When the event was appended.
    pub timestamp: DateTime<Utc>,
    /// Seat or system origin.
    pub actor: Actor,
    /// Tagged payload.
    pub kind: EventKind,
    /// Who the transport layer may deliver this event to.
    pub visibility: Visibility,
    /// SHA-256 over (`prev_hash`, tag, canonical payload, index, timestamp).
    pub hash: String,
    /// The preceding record's `hash`, or empty for index 0.
    pub prev_hash: String,
}

impl EventRecord {
    /// Recomputes the content hash from this record's own fields.
    ///
    /// # Errors
    ///
    /// Returns a JSON error if the payload cannot be serialized.
    pub fn compute_hash(&self) -> Result<String> {
        hash_parts(
            &self.prev_hash,
            &self.kind,
            self.index,
            self.timestamp.timestamp_millis(),
        )
    }
}

/// Computes the chain hash for one record's constituent parts.
///
/// The payload is canonicalized by serializing through `serde_json::Value`,
/// whose object representation keeps keys sorted.
///
/// # Errors
///
/// Returns a JSON error if the event kind cannot be serialized.
pub fn hash_parts(
    prev_hash: &str,
    kind: &EventKind,
    index: u64,
    timestamp_ms: i64,
) -> Result<String> {
    let (tag, payload) = kind.canonical_parts()?;
    let input = format!("{prev_hash}{tag}{payload}{index}{timestamp_ms}");
    let digest = Sha256::digest(input.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    Ok(out)
}

/// Who an event may be delivered to. The engine never performs delivery
/// itself; the transport layer filters against this tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum Visibility {
    /// Deliverable to every seat and spectator.
    Public,
    /// Deliverable only to seats sharing the named alignment.
    Alignment {
        /// The alignment that may see the event.
        alignment: Alignment,
        /// Concrete living seats of that alignment at emission time.
        seats: Vec<Seat>,
    },
    /// Deliverable only to the listed seats. An empty list means the record
    /// is audit-only and never leaves the engine boundary.
    Seats {
        /// Target seats.
        seats: Vec<Seat>,
    },
}

/// Chat channel a spoken message was addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatChannel {
    /// Day discussion, visible to all.
    Open,
    /// Night coordination among same-alignment antagonists.
    AlignmentOnly,
}

/// One seat's dealt role, as recorded in `RolesAssigned`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    /// The seat.
    pub seat: Seat,
    /// The dealt role.
    pub role: Role,
    /// Alignment derived from the role.
    pub alignment: Alignment,
}

/// The closed event tag set.
///
/// Internally tagged so the tag travels with the payload; every variant is
/// a struct so the canonical payload is always a JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// A session was created in the lobby.
    SessionCreated {
        /// Full configuration, embedded so replay is self-contained.
        config: GameConfig,
    },

    /// Roles were dealt. Audit-only: assignments are secret while seats live.
    RolesAssigned {
        /// Seat-to-role mapping.
        assignments: Vec<RoleAssignment>,
        /// The shuffle seed actually used.
        seed: u64,
    },

    /// The session moved to a new phase.
    PhaseChanged {
        /// Phase being left.
        from: Phase,
        /// Phase being entered.
        to: Phase,
        /// Round counter after the transition.
        round: u32,
        /// Deadline for the new phase, unix millis.
        deadline_ms: Option<i64>,
    },

    /// A seat died.
    PlayerDied {
        /// The seat.
        seat: Seat,
        /// How it died.
        cause: DeathCause,
    },

    /// A seat spoke.
    Speak {
        /// Speaking seat.
        seat: Seat,
        /// Message text.
        text: String,
        /// Phase during which it was spoken.
        phase: Phase,
        /// Channel it was addressed to.
        channel: ChatChannel,
    },

    /// A seat cast or replaced a vote.
    Vote {
        /// Voting seat.
        voter: Seat,
        /// Target, or `None` to abstain.
        target: Option<Seat>,
    },

    /// A voting phase was resolved.
    VoteResult {
        /// Non-abstaining vote counts per target.
        tally: BTreeMap<Seat, u32>,
        /// The executed seat, if any.
        executed: Option<Seat>,
        /// Why execution did or did not happen.
        reason: VoteReason,
    },

    /// A night action was submitted (replacing any earlier one this night).
    NightAction {
        /// Acting seat.
        seat: Seat,
        /// Action category.
        kind: NightActionKind,
        /// Target seat.
        target: Seat,
        /// The actor's role, for audit.
        role: Role,
    },

    /// A night was resolved. Carries only the publicly announceable outcome.
    NightResult {
        /// Seats that died this night, in seat order.
        deaths: Vec<Seat>,
    },

    /// An inspection result, scoped strictly to the inspector.
    Inspection {
        /// The inspecting seat.
        inspector: Seat,
        /// The inspected seat.
        target: Seat,
        /// The target's alignment.
        alignment: Alignment,
    },

    /// A seat was pulled back from the to-die set, scoped to that seat.
    Saved {
        /// The saved seat.
        seat: Seat,
    },

    /// Free-form engine notice.
    SystemNotice {
        /// Notice text.
        message: String,
    },

    /// The game ended.
    GameEnded {
        /// Winning alignment.
        winner: Alignment,
        /// Rounds played.
        rounds: u32,
    },
}

impl EventKind {
    /// The serialized tag name for this kind.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::SessionCreated { .. } => "session_created",
            Self::RolesAssigned { .. } => "roles_assigned",
            Self::PhaseChanged { .. } => "phase_changed",
            Self::PlayerDied { .. } => "player_died",
            Self::Speak { .. } => "speak",
            Self::Vote { .. } => "vote",
            Self::VoteResult { .. } => "vote_result",
            Self::NightAction { .. } => "night_action",
            Self::NightResult { .. } => "night_result",
            Self::Inspection { .. } => "inspection",
            Self::Saved { .. } => "saved",
            Self::SystemNotice { .. } => "system_notice",
            Self::GameEnded { .. } => "game_ended",
        }
    }

    /// Splits the kind into its tag and a canonical (key-sorted) payload
    /// JSON string, the two hashing inputs.
    ///
    /// # Errors
    ///
    /// Returns a JSON error if serialization fails.
    pub fn canonical_parts(&self) -> Result<(&'static str, String)> {
        let value = serde_json::to_value(self)?;
        let mut object = match value {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        object.remove("type");
        let payload = serde_json::to_string(&serde_json::Value::Object(object))?;
        Ok((self.tag(), payload))
    }
}
