//! Deterministic vote and night resolution.
//!
//! Both resolvers are pure functions of the session's pending data: given
//! the same submissions they always produce the same outcome, so a replayed
//! log reconverges on the same state. Night actions are applied in the fixed
//! precedence order of [`NightActionKind`], never in submission order.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::ids::Seat;
use crate::role::{Alignment, NightActionKind, Role};
use crate::session::GameSession;

/// How a seat died.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathCause {
    /// Executed by majority vote.
    Voted,
    /// Killed by the night elimination.
    Eliminated,
    /// Killed by the single-use harm charge.
    Harmed,
}

impl std::fmt::Display for DeathCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Voted => "voted",
            Self::Eliminated => "eliminated",
            Self::Harmed => "harmed",
        };
        write!(f, "{name}")
    }
}

/// Why a voting phase did or did not execute someone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteReason {
    /// A single seat held the strict maximum.
    Majority,
    /// Nobody cast any vote at all.
    NoVotes,
    /// Everyone who voted abstained.
    AllAbstained,
    /// Two or more seats shared the maximum. A tie never executes.
    Tie,
}

impl std::fmt::Display for VoteReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Majority => "majority",
            Self::NoVotes => "no_votes",
            Self::AllAbstained => "all_abstained",
            Self::Tie => "tie",
        };
        write!(f, "{name}")
    }
}

/// Outcome of resolving a voting phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteOutcome {
    /// Non-abstaining vote counts per target.
    pub tally: BTreeMap<Seat, u32>,
    /// The executed seat, already marked dead on the session.
    pub executed: Option<Seat>,
    /// Why execution did or did not happen.
    pub reason: VoteReason,
}

/// Resolves the pending votes and applies the execution, if any.
///
/// Plurality with a strict maximum: ties, abstention-only rounds, and empty
/// rounds all pass with nobody executed.
pub fn resolve_vote(session: &mut GameSession) -> VoteOutcome {
    let mut tally: BTreeMap<Seat, u32> = BTreeMap::new();
    let mut cast = 0usize;
    for target in session.pending_votes.values() {
        if let Some(target) = target {
            *tally.entry(*target).or_insert(0) += 1;
            cast += 1;
        }
    }

    if session.pending_votes.is_empty() {
        return VoteOutcome {
            tally,
            executed: None,
            reason: VoteReason::NoVotes,
        };
    }
    if cast == 0 {
        return VoteOutcome {
            tally,
            executed: None,
            reason: VoteReason::AllAbstained,
        };
    }

    let max = tally.values().copied().max().unwrap_or(0);
    let leaders: Vec<Seat> = tally
        .iter()
        .filter(|(_, count)| **count == max)
        .map(|(seat, _)| *seat)
        .collect();

    if leaders.len() > 1 {
        return VoteOutcome {
            tally,
            executed: None,
            reason: VoteReason::Tie,
        };
    }

    let executed = leaders[0];
    if let Some(player) = session.seats.get_mut(&executed) {
        player.alive = false;
    }
    VoteOutcome {
        tally,
        executed: Some(executed),
        reason: VoteReason::Majority,
    }
}

/// One inspection result produced during night resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InspectionResult {
    /// The inspected seat.
    pub target: Seat,
    /// Its alignment.
    pub alignment: Alignment,
}

/// Outcome of resolving a night.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NightOutcome {
    /// Seats shielded from elimination this night.
    pub protected: BTreeSet<Seat>,
    /// Deaths in the order they became final, with causes.
    pub deaths: Vec<(Seat, DeathCause)>,
    /// The seat pulled back from the to-die set by a cure, if the cure
    /// actually changed anything.
    pub saved: Option<Seat>,
    /// Inspection results keyed by the inspector, so two seers each get
    /// their own answer.
    pub inspections: BTreeMap<Seat, InspectionResult>,
}

/// Resolves the pending night actions and applies the deaths.
///
/// Categories apply in precedence order: protect shields first, elimination
/// marks unshielded targets, cure unmarks, harm marks unconditionally, and
/// inspection reads alignments without touching life or death. Single-use
/// charges and the guard's no-repeat memory are committed here, not at
/// submission time.
pub fn resolve_night(session: &mut GameSession) -> NightOutcome {
    let mut ordered: Vec<(Seat, NightActionKind, Seat)> = session
        .pending_night_actions
        .iter()
        .map(|(seat, action)| (*seat, action.kind, action.target))
        .collect();
    ordered.sort_by_key(|(seat, kind, _)| (*kind, *seat));

    let mut protected = BTreeSet::new();
    let mut marked: Vec<(Seat, DeathCause)> = Vec::new();
    let mut saved = None;
    let mut inspections = BTreeMap::new();

    for (actor, kind, target) in ordered {
        match kind {
            NightActionKind::Protect => {
                protected.insert(target);
            }
            NightActionKind::Eliminate => {
                if !protected.contains(&target)
                    && !marked.iter().any(|(seat, _)| *seat == target)
                {
                    marked.push((target, DeathCause::Eliminated));
                }
            }
            NightActionKind::Cure => {
                let before = marked.len();
                marked.retain(|(seat, _)| *seat != target);
                if marked.len() < before {
                    saved = Some(target);
                }
            }
            NightActionKind::Harm => {
                if !marked.iter().any(|(seat, _)| *seat == target) {
                    marked.push((target, DeathCause::Harmed));
                }
            }
            NightActionKind::Inspect => {
                if let Some(player) = session.seats.get(&target) {
                    inspections.insert(
                        actor,
                        InspectionResult {
                            target,
                            alignment: player.alignment,
                        },
                    );
                }
            }
        }
    }

    commit_night_resources(session);

    for (seat, _) in &marked {
        if let Some(player) = session.seats.get_mut(seat) {
            player.alive = false;
        }
    }

    NightOutcome {
        protected,
        deaths: marked,
        saved,
        inspections,
    }
}

/// Commits resource effects of the pending night actions: witch charges are
/// spent and the guard's no-repeat memory updated. Replay applies this on a
/// night-result record so a rebuilt session matches the live one exactly.
pub fn commit_night_resources(session: &mut GameSession) {
    let pending = session.pending_night_actions.clone();

    for (seat, action) in &pending {
        if let Some(player) = session.seats.get_mut(seat) {
            match action.kind {
                NightActionKind::Cure => player.cure_used = true,
                NightActionKind::Harm => player.harm_used = true,
                _ => {}
            }
        }
    }

    // Guards who sat out lose their no-repeat restriction for the next night.
    let guards: Vec<Seat> = session
        .seats
        .values()
        .filter(|p| p.role == Role::Guard)
        .map(|p| p.seat)
        .collect();
    for seat in guards {
        let protected = pending
            .get(&seat)
            .filter(|a| a.kind == NightActionKind::Protect)
            .map(|a| a.target);
        if let Some(player) = session.seats.get_mut(&seat) {
            player.last_protected = protected;
        }
    }
}
