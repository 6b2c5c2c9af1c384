//! Live session state and the concurrent session registry.
//!
//! The session struct is a pure state container: it holds no channels, no
//! timers, and no log handles, so it can be compared structurally against a
//! replay-reconstructed copy. All mutation flows through the engine, which
//! holds each session behind its own `RwLock` inside a lock-free registry.

pub mod phase;
pub mod rebuild;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::RwLock;

use crate::config::GameConfig;
use crate::error::{EngineError, Result};
use crate::ids::{GameId, Seat};
use crate::role::{Alignment, NightActionKind, Role};
use self::phase::Phase;

/// One seated participant and its per-game resource state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// The seat.
    pub seat: Seat,
    /// Dealt role, immutable for the whole game.
    pub role: Role,
    /// Alignment derived from the role at deal time.
    pub alignment: Alignment,
    /// False once the seat has died. Dead seats never act again.
    pub alive: bool,
    /// Whether the witch's cure charge has been spent.
    pub cure_used: bool,
    /// Whether the witch's harm charge has been spent.
    pub harm_used: bool,
    /// The seat this guard actually protected last night, if any. Protecting
    /// the same seat on consecutive nights is rejected.
    pub last_protected: Option<Seat>,
}

impl Player {
    /// A freshly seated player with untouched resources.
    #[must_use]
    pub fn new(seat: Seat, role: Role) -> Self {
        Self {
            seat,
            role,
            alignment: role.alignment(),
            alive: true,
            cure_used: false,
            harm_used: false,
            last_protected: None,
        }
    }
}

/// A night action held until resolution. Resubmitting replaces the earlier
/// entry; nothing takes effect until the night resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingNightAction {
    /// Action category.
    pub kind: NightActionKind,
    /// Target seat.
    pub target: Seat,
}

/// Full mutable state of one game session.
///
/// Derives `PartialEq` so a session rebuilt from the event log can be checked
/// for exact equality against the live one.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSession {
    /// Session identifier.
    pub id: GameId,
    /// Current phase.
    pub phase: Phase,
    /// Round counter, 1-based once the first night starts.
    pub round: u32,
    /// When the current phase expires. Truncated to millisecond precision so
    /// the value survives a trip through the event log unchanged.
    pub phase_deadline: Option<DateTime<Utc>>,
    /// Incremented on every phase entry. Timer tasks capture the serial they
    /// were started under and no-op if it has moved on.
    pub phase_serial: u64,
    /// Configuration the session was created with.
    pub config: GameConfig,
    /// All seats, dealt or not.
    pub seats: BTreeMap<Seat, Player>,
    /// Votes cast this voting phase. `None` is an explicit abstention.
    pub pending_votes: BTreeMap<Seat, Option<Seat>>,
    /// Night actions submitted this night, latest per seat.
    pub pending_night_actions: BTreeMap<Seat, PendingNightAction>,
    /// Winner, set only when `phase` is `End`.
    pub winner: Option<Alignment>,
}

impl GameSession {
    /// A fresh session in the lobby with no seats dealt.
    #[must_use]
    pub fn new(id: GameId, config: GameConfig) -> Self {
        Self {
            id,
            phase: Phase::Lobby,
            round: 0,
            phase_deadline: None,
            phase_serial: 0,
            config,
            seats: BTreeMap::new(),
            pending_votes: BTreeMap::new(),
            pending_night_actions: BTreeMap::new(),
            winner: None,
        }
    }

    /// Looks up a seat's player.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SeatNotFound`] if the seat does not exist.
    pub fn player(&self, seat: Seat) -> Result<&Player> {
        self.seats.get(&seat).ok_or(EngineError::SeatNotFound(seat))
    }

    /// Mutable seat lookup.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SeatNotFound`] if the seat does not exist.
    pub fn player_mut(&mut self, seat: Seat) -> Result<&mut Player> {
        self.seats
            .get_mut(&seat)
            .ok_or(EngineError::SeatNotFound(seat))
    }

    /// Living seats in seat order.
    #[must_use]
    pub fn living_seats(&self) -> Vec<Seat> {
        self.seats
            .values()
            .filter(|p| p.alive)
            .map(|p| p.seat)
            .collect()
    }

    /// Living seats of one alignment, in seat order.
    #[must_use]
    pub fn living_by_alignment(&self, alignment: Alignment) -> Vec<Seat> {
        self.seats
            .values()
            .filter(|p| p.alive && p.alignment == alignment)
            .map(|p| p.seat)
            .collect()
    }

    /// Enters `phase`: bumps the serial, installs the deadline (truncated to
    /// millis), and clears whatever pending data the phase invalidates.
    pub fn begin_phase(&mut self, phase: Phase, deadline: Option<DateTime<Utc>>) {
        self.phase = phase;
        self.phase_serial += 1;
        self.phase_deadline = deadline.and_then(truncate_to_millis);
        if phase.clears_votes() {
            self.pending_votes.clear();
        }
        if phase.clears_night_actions() {
            self.pending_night_actions.clear();
        }
    }

    /// Checks the win condition against living seats.
    ///
    /// Antagonists lose the moment none remain; they win the moment they
    /// reach parity with everyone else. Checked after every batch of deaths.
    #[must_use]
    pub fn winner_check(&self) -> Option<Alignment> {
        let wolves = self.living_by_alignment(Alignment::Werewolf).len();
        let others = self.living_seats().len() - wolves;
        if wolves == 0 {
            Some(Alignment::Village)
        } else if wolves >= others {
            Some(Alignment::Werewolf)
        } else {
            None
        }
    }
}

fn truncate_to_millis(instant: DateTime<Utc>) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(instant.timestamp_millis())
}

/// Concurrent registry of live sessions.
///
/// The map itself is lock-free; each session carries its own `RwLock`, so
/// operations on different games never contend.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<GameId, Arc<RwLock<GameSession>>>,
}

impl SessionStore {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session under its own id.
    pub fn insert(&self, session: GameSession) -> Arc<RwLock<GameSession>> {
        let id = session.id;
        let handle = Arc::new(RwLock::new(session));
        self.sessions.insert(id, Arc::clone(&handle));
        handle
    }

    /// Fetches the handle for a game.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::GameNotFound`] if no such session exists.
    pub fn get(&self, game_id: GameId) -> Result<Arc<RwLock<GameSession>>> {
        self.sessions
            .get(&game_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(EngineError::GameNotFound(game_id))
    }

    /// Number of registered sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no sessions are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
