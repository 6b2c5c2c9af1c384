//! Seat-scoped observation building.
//!
//! An observation is everything one seat is allowed to know, assembled from
//! the session and the event log. It never contains another living seat's
//! role, the other team's private chat, or another seat's inspection
//! results. Dead seats have their roles revealed to everyone.

use std::sync::Arc;

use serde::Serialize;

use crate::error::Result;
use crate::event::{ChatChannel, EventKind, EventRecord, Visibility};
use crate::ids::Seat;
use crate::resolve::DeathCause;
use crate::role::{Alignment, NightActionKind, Role};
use crate::session::GameSession;
use crate::session::phase::Phase;

/// How many public chat lines an observation carries.
pub const PUBLIC_CHAT_TAIL: usize = 20;
/// How many same-alignment chat lines an observation carries.
pub const ALIGNMENT_CHAT_TAIL: usize = 10;

/// Upper bound on a single spoken message, in characters.
pub const MAX_MESSAGE_CHARS: usize = 1000;

/// Everything one seat may know about the game right now.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    /// Session-level facts visible to everyone.
    pub game: GameInfo,
    /// The observing seat's own secrets.
    pub you: SelfInfo,
    /// Board state visible to everyone.
    pub public_state: PublicState,
    /// Recent chat the seat may read.
    pub chat: ChatHistory,
    /// Results delivered privately to this seat, oldest first.
    pub private_notes: Vec<PrivateNote>,
    /// Living same-alignment seats, excluding the observer. Present only for
    /// antagonist-aligned observers; village seats do not know each other.
    pub teammates: Option<Vec<Seat>>,
    /// Actions the seat may take right now.
    pub eligible_actions: Vec<EligibleAction>,
}

/// Session-level facts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameInfo {
    /// Current phase.
    pub phase: Phase,
    /// Current round.
    pub round: u32,
    /// Phase deadline in unix millis, if the phase is timed.
    pub deadline_ms: Option<i64>,
    /// Winner, once the game has ended.
    pub winner: Option<Alignment>,
}

/// The observer's own identity and resources.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelfInfo {
    /// The observing seat.
    pub seat: Seat,
    /// Its dealt role.
    pub role: Role,
    /// Its alignment.
    pub alignment: Alignment,
    /// Whether it is still alive.
    pub alive: bool,
    /// Whether the cure charge is still available (witch only, else false).
    pub cure_available: bool,
    /// Whether the harm charge is still available (witch only, else false).
    pub harm_available: bool,
    /// The seat protected last night (guard only).
    pub last_protected: Option<Seat>,
}

/// Board state everyone can see.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicState {
    /// Living seats in seat order.
    pub living: Vec<Seat>,
    /// Dead seats with revealed roles, in death order.
    pub dead: Vec<DeadSeat>,
}

/// One revealed death.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DeadSeat {
    /// The seat.
    pub seat: Seat,
    /// Its role, public once dead.
    pub role: Role,
    /// How it died.
    pub cause: DeathCause,
}

/// One chat line the observer may read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatLine {
    /// Speaking seat.
    pub seat: Seat,
    /// Message text.
    pub text: String,
    /// Phase it was spoken in.
    pub phase: Phase,
}

/// Recent chat, split by channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatHistory {
    /// Last [`PUBLIC_CHAT_TAIL`] open-channel lines, oldest first.
    pub public_tail: Vec<ChatLine>,
    /// Last [`ALIGNMENT_CHAT_TAIL`] same-alignment lines, oldest first.
    /// Empty for seats whose alignment has no private channel.
    pub alignment_tail: Vec<ChatLine>,
}

/// A result delivered privately to one seat.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PrivateNote {
    /// An inspection result this seat performed.
    Inspection {
        /// The inspected seat.
        target: Seat,
        /// Its alignment.
        alignment: Alignment,
    },
    /// This seat was pulled back from the to-die set.
    Saved,
    /// A notice addressed to this seat.
    Notice {
        /// Notice text.
        message: String,
    },
}

/// One action a seat may take right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum EligibleAction {
    /// Speak on whichever channel the current phase permits.
    Speak,
    /// Cast or replace a vote.
    Vote,
    /// Submit a night action of the given kind.
    Night {
        /// The action category.
        kind: NightActionKind,
    },
}

/// Builds the observation for one seat.
///
/// `records` must be the full replay for this game; chat tails, death
/// causes, and private notes are derived from it.
///
/// # Errors
///
/// Returns [`crate::error::EngineError::SeatNotFound`] if the seat was never
/// dealt into the session.
pub fn build_observation(
    session: &GameSession,
    records: &[Arc<EventRecord>],
    seat: Seat,
) -> Result<Observation> {
    let player = session.player(seat)?;

    let you = SelfInfo {
        seat,
        role: player.role,
        alignment: player.alignment,
        alive: player.alive,
        cure_available: player.role == Role::Witch && !player.cure_used,
        harm_available: player.role == Role::Witch && !player.harm_used,
        last_protected: player.last_protected,
    };

    let teammates = (player.alignment == Alignment::Werewolf).then(|| {
        session
            .living_by_alignment(Alignment::Werewolf)
            .into_iter()
            .filter(|s| *s != seat)
            .collect()
    });

    Ok(Observation {
        game: GameInfo {
            phase: session.phase,
            round: session.round,
            deadline_ms: session.phase_deadline.map(|d| d.timestamp_millis()),
            winner: session.winner,
        },
        you,
        public_state: public_state(session, records),
        chat: chat_history(records, seat, player.alignment),
        private_notes: private_notes(records, seat),
        teammates,
        eligible_actions: eligible_actions(session, seat),
    })
}

fn public_state(session: &GameSession, records: &[Arc<EventRecord>]) -> PublicState {
    let mut dead = Vec::new();
    for record in records {
        if let EventKind::PlayerDied { seat, cause } = &record.kind
            && let Some(player) = session.seats.get(seat)
        {
            dead.push(DeadSeat {
                seat: *seat,
                role: player.role,
                cause: *cause,
            });
        }
    }
    PublicState {
        living: session.living_seats(),
        dead,
    }
}

fn chat_history(records: &[Arc<EventRecord>], seat: Seat, alignment: Alignment) -> ChatHistory {
    let mut public_tail = Vec::new();
    let mut alignment_tail = Vec::new();
    for record in records {
        let EventKind::Speak {
            seat: speaker,
            text,
            phase,
            channel,
        } = &record.kind
        else {
            continue;
        };
        let line = ChatLine {
            seat: *speaker,
            text: text.clone(),
            phase: *phase,
        };
        match channel {
            ChatChannel::Open => public_tail.push(line),
            ChatChannel::AlignmentOnly => {
                let readable = match &record.visibility {
                    Visibility::Alignment {
                        alignment: scope, ..
                    } => *scope == alignment,
                    Visibility::Seats { seats } => seats.contains(&seat),
                    Visibility::Public => true,
                };
                if readable {
                    alignment_tail.push(line);
                }
            }
        }
    }
    trim_to_tail(&mut public_tail, PUBLIC_CHAT_TAIL);
    trim_to_tail(&mut alignment_tail, ALIGNMENT_CHAT_TAIL);
    ChatHistory {
        public_tail,
        alignment_tail,
    }
}

fn trim_to_tail(lines: &mut Vec<ChatLine>, keep: usize) {
    if lines.len() > keep {
        lines.drain(..lines.len() - keep);
    }
}

fn private_notes(records: &[Arc<EventRecord>], seat: Seat) -> Vec<PrivateNote> {
    let mut notes = Vec::new();
    for record in records {
        match &record.kind {
            EventKind::Inspection {
                inspector,
                target,
                alignment,
            } if *inspector == seat => {
                notes.push(PrivateNote::Inspection {
                    target: *target,
                    alignment: *alignment,
                });
            }
            EventKind::Saved { seat: saved } if *saved == seat => {
                notes.push(PrivateNote::Saved);
            }
            EventKind::SystemNotice { message } => {
                if let Visibility::Seats { seats } = &record.visibility
                    && seats.contains(&seat)
                {
                    notes.push(PrivateNote::Notice {
                        message: message.clone(),
                    });
                }
            }
            _ => {}
        }
    }
    notes
}

/// What `seat` may do in the current phase. Dead seats may do nothing.
#[must_use]
pub fn eligible_actions(session: &GameSession, seat: Seat) -> Vec<EligibleAction> {
    let Ok(player) = session.player(seat) else {
        return Vec::new();
    };
    if !player.alive {
        return Vec::new();
    }

    match session.phase {
        Phase::DayTalk => vec![EligibleAction::Speak],
        Phase::Vote => vec![EligibleAction::Vote],
        Phase::Night => {
            let mut actions: Vec<EligibleAction> = player
                .role
                .night_actions()
                .iter()
                .filter(|kind| match kind {
                    NightActionKind::Cure => !player.cure_used,
                    NightActionKind::Harm => !player.harm_used,
                    _ => true,
                })
                .map(|kind| EligibleAction::Night { kind: *kind })
                .collect();
            if player.alignment == Alignment::Werewolf {
                actions.push(EligibleAction::Speak);
            }
            actions
        }
        _ => Vec::new(),
    }
}

/// Seats a given action may legally target right now.
///
/// An empty result means the action has no legal target, not that targeting
/// is unrestricted.
#[must_use]
pub fn action_constraints(
    session: &GameSession,
    seat: Seat,
    action: EligibleAction,
) -> Vec<Seat> {
    let Ok(player) = session.player(seat) else {
        return Vec::new();
    };
    let living = session.living_seats();
    match action {
        EligibleAction::Speak => Vec::new(),
        EligibleAction::Vote => living,
        EligibleAction::Night { kind } => match kind {
            NightActionKind::Eliminate => living
                .into_iter()
                .filter(|s| {
                    session
                        .seats
                        .get(s)
                        .is_some_and(|p| p.alignment != player.alignment)
                })
                .collect(),
            NightActionKind::Inspect => living.into_iter().filter(|s| *s != seat).collect(),
            NightActionKind::Protect => living
                .into_iter()
                .filter(|s| *s != seat && Some(*s) != player.last_protected)
                .collect(),
            NightActionKind::Cure | NightActionKind::Harm => living,
        },
    }
}
