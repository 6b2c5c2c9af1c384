//! Session reconstruction by replaying the event log.
//!
//! The log is the source of truth; the live session is a cache. Replaying a
//! verified log from the start must produce a session structurally equal to
//! the live one, including resource charges and phase serials. The engine
//! relies on this for recovery and for mid-game state audits.

use chrono::DateTime;
use std::sync::Arc;

use crate::error::{EngineError, Result};
use crate::event::{EventKind, EventRecord};
use crate::resolve::commit_night_resources;
use crate::session::{GameSession, PendingNightAction, Player};

/// Rebuilds a session by folding every record in order.
///
/// Records with no state effect (chat, notices, seat-scoped results) are
/// skipped; they exist for delivery and audit, not reconstruction.
///
/// # Errors
///
/// Returns [`EngineError::ChainIntegrity`] when the record sequence is not a
/// well-formed session history, such as an empty slice or a first record
/// that is not the session-creation event.
pub fn from_events(records: &[Arc<EventRecord>]) -> Result<GameSession> {
    let first = records.first().ok_or_else(|| EngineError::ChainIntegrity {
        index: 0,
        detail: "cannot rebuild from an empty record set".to_string(),
    })?;

    let mut session = match &first.kind {
        EventKind::SessionCreated { config } => {
            GameSession::new(first.game_id, config.clone())
        }
        other => {
            return Err(EngineError::ChainIntegrity {
                index: first.index,
                detail: format!(
                    "first record must be session_created, found {}",
                    other.tag()
                ),
            });
        }
    };

    for record in &records[1..] {
        apply(&mut session, record)?;
    }
    Ok(session)
}

fn apply(session: &mut GameSession, record: &EventRecord) -> Result<()> {
    match &record.kind {
        EventKind::SessionCreated { .. } => {
            return Err(EngineError::ChainIntegrity {
                index: record.index,
                detail: "duplicate session_created record".to_string(),
            });
        }
        EventKind::RolesAssigned { assignments, .. } => {
            for assignment in assignments {
                session
                    .seats
                    .insert(assignment.seat, Player::new(assignment.seat, assignment.role));
            }
        }
        EventKind::PhaseChanged {
            to,
            round,
            deadline_ms,
            ..
        } => {
            session.round = *round;
            let deadline = deadline_ms.and_then(DateTime::from_timestamp_millis);
            session.begin_phase(*to, deadline);
        }
        EventKind::Vote { voter, target } => {
            session.pending_votes.insert(*voter, *target);
        }
        EventKind::NightAction {
            seat, kind, target, ..
        } => {
            session.pending_night_actions.insert(
                *seat,
                PendingNightAction {
                    kind: *kind,
                    target: *target,
                },
            );
        }
        EventKind::NightResult { .. } => {
            commit_night_resources(session);
        }
        EventKind::PlayerDied { seat, .. } => {
            if let Some(player) = session.seats.get_mut(seat) {
                player.alive = false;
            }
        }
        EventKind::GameEnded { winner, .. } => {
            session.winner = Some(*winner);
        }
        EventKind::VoteResult { .. }
        | EventKind::Speak { .. }
        | EventKind::Inspection { .. }
        | EventKind::Saved { .. }
        | EventKind::SystemNotice { .. } => {}
    }
    Ok(())
}
