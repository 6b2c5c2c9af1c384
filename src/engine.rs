//! The game engine: the only mutation path for sessions.
//!
//! Every inbound operation takes the session's write lock, validates,
//! mutates, and appends the events describing what happened, in that order.
//! Phase timers are spawned per phase entry and carry the phase serial they
//! were started under; a timer whose serial has been overtaken by a manual
//! advance does nothing, so the deadline race resolves to exactly one
//! transition.

use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::GameConfig;
use crate::error::{EngineError, Result};
use crate::event::{
    ChatChannel, EventKind, EventLog, EventPublisher, EventRecord, GameSummary, RoleAssignment,
    Visibility,
};
use crate::ids::{Actor, GameId, Seat};
use crate::observe::{
    self, EligibleAction, MAX_MESSAGE_CHARS, Observation, build_observation,
};
use crate::resolve::{self, DeathCause};
use crate::role::{Alignment, NightActionKind, Role};
use crate::session::phase::Phase;
use crate::session::{GameSession, PendingNightAction, SessionStore};

/// Cheaply cloneable handle to the shared engine state.
#[derive(Debug, Clone)]
pub struct GameEngine {
    inner: Arc<EngineInner>,
}

#[derive(Debug)]
struct EngineInner {
    store: SessionStore,
    log: EventLog,
    publisher: EventPublisher,
    shutdown: CancellationToken,
}

impl Default for GameEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl GameEngine {
    /// Creates an engine with no sessions.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(EngineInner {
                store: SessionStore::new(),
                log: EventLog::new(),
                publisher: EventPublisher::new(),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Creates a session in the lobby from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] when validation finds errors.
    pub fn create_session(&self, config: GameConfig) -> Result<GameId> {
        let config = config.validated()?;
        let game_id = GameId::new();
        let session = GameSession::new(game_id, config.clone());
        self.inner.store.insert(session);
        self.emit(
            game_id,
            Actor::System,
            EventKind::SessionCreated { config },
            Visibility::Public,
        )?;
        metrics::counter!("nocturne_sessions_total").increment(1);
        info!(%game_id, "session created");
        Ok(game_id)
    }

    /// Deals roles to `players` seats, starts the first night, and returns
    /// the full deal for the orchestrator.
    ///
    /// The shuffle is driven by a seeded ChaCha generator; the seed (given
    /// or freshly drawn) is recorded in the audit-only assignment event so
    /// the deal can be reproduced.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidPhase`] outside the lobby and
    /// [`EngineError::RosterMismatch`] when `players` does not match the
    /// configured role list.
    pub async fn assign_roles(
        &self,
        game_id: GameId,
        players: usize,
    ) -> Result<Vec<RoleAssignment>> {
        let handle = self.inner.store.get(game_id)?;
        let mut session = handle.write().await;

        if session.phase != Phase::Lobby {
            return Err(EngineError::InvalidPhase {
                phase: session.phase,
                action: "assign_roles",
            });
        }
        if players != session.config.roles.len() {
            return Err(EngineError::RosterMismatch {
                players,
                roles: session.config.roles.len(),
            });
        }

        self.enter_phase(&mut session, Phase::AssignRoles)?;

        let seed = session.config.shuffle_seed.unwrap_or_else(rand::random);
        let mut roles: Vec<Role> = session.config.roles.clone();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        roles.shuffle(&mut rng);

        let mut assignments = Vec::with_capacity(roles.len());
        for (i, role) in roles.iter().enumerate() {
            let seat = Seat(u8::try_from(i).map_err(|_| EngineError::RosterMismatch {
                players,
                roles: session.config.roles.len(),
            })?);
            session
                .seats
                .insert(seat, crate::session::Player::new(seat, *role));
            assignments.push(RoleAssignment {
                seat,
                role: *role,
                alignment: role.alignment(),
            });
        }

        // Audit-only: the deal stays secret until seats die.
        self.emit(
            game_id,
            Actor::System,
            EventKind::RolesAssigned {
                assignments: assignments.clone(),
                seed,
            },
            Visibility::Seats { seats: vec![] },
        )?;
        info!(%game_id, players, "roles dealt");

        self.enter_phase(&mut session, Phase::Night)?;
        Ok(assignments)
    }

    /// Starts `phase`, which must be the table successor of the current
    /// phase, optionally overriding its configured duration. Resolves the
    /// phase being left exactly as [`GameEngine::advance_phase`] does, and
    /// returns the new deadline (if the phase is timed).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidTransition`] when `phase` is not the
    /// current phase's successor, or when the win check ends the game
    /// instead of entering the requested phase.
    pub async fn start_phase(
        &self,
        game_id: GameId,
        phase: Phase,
        override_duration: Option<std::time::Duration>,
    ) -> Result<Option<DateTime<Utc>>> {
        let handle = self.inner.store.get(game_id)?;
        let mut session = handle.write().await;

        if session.phase.next() != Some(phase) {
            return Err(EngineError::InvalidTransition(format!(
                "cannot start {phase} from {}",
                session.phase
            )));
        }
        let entered = self.advance_with(&mut session, override_duration)?;
        if entered != phase {
            return Err(EngineError::InvalidTransition(format!(
                "the game ended instead of entering {phase}"
            )));
        }
        Ok(session.phase_deadline)
    }

    /// Manually advances the session to its next phase, resolving votes or
    /// night actions when leaving the corresponding phase.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidTransition`] once the game has ended.
    pub async fn advance_phase(&self, game_id: GameId) -> Result<Phase> {
        let handle = self.inner.store.get(game_id)?;
        let mut session = handle.write().await;
        self.advance_locked(&mut session)
    }

    /// Records a spoken message on the channel the current phase permits.
    ///
    /// # Errors
    ///
    /// Rejects empty or oversized text with [`EngineError::InvalidContent`],
    /// speech outside `DayTalk`/`Night` with [`EngineError::InvalidPhase`],
    /// and dead or non-antagonist night speakers with
    /// [`EngineError::IneligibleActor`].
    pub async fn submit_speak(
        &self,
        game_id: GameId,
        seat: Seat,
        text: &str,
    ) -> Result<Arc<EventRecord>> {
        if text.trim().is_empty() {
            return Err(EngineError::InvalidContent(
                "message text is empty".to_string(),
            ));
        }
        if text.chars().count() > MAX_MESSAGE_CHARS {
            return Err(EngineError::InvalidContent(format!(
                "message exceeds {MAX_MESSAGE_CHARS} characters"
            )));
        }

        let handle = self.inner.store.get(game_id)?;
        let session = handle.read().await;
        let player = session.player(seat)?;
        if !player.alive {
            return Err(EngineError::IneligibleActor {
                seat,
                reason: "dead seats cannot speak".to_string(),
            });
        }

        let (channel, visibility) = match session.phase {
            Phase::DayTalk => (ChatChannel::Open, Visibility::Public),
            Phase::Night => {
                if player.alignment != Alignment::Werewolf {
                    return Err(EngineError::IneligibleActor {
                        seat,
                        reason: "only antagonists speak at night".to_string(),
                    });
                }
                (
                    ChatChannel::AlignmentOnly,
                    Visibility::Alignment {
                        alignment: Alignment::Werewolf,
                        seats: session.living_by_alignment(Alignment::Werewolf),
                    },
                )
            }
            phase => {
                return Err(EngineError::InvalidPhase {
                    phase,
                    action: "speak",
                });
            }
        };

        self.emit(
            game_id,
            Actor::Seat(seat),
            EventKind::Speak {
                seat,
                text: text.to_string(),
                phase: session.phase,
                channel,
            },
            visibility,
        )
    }

    /// Casts or replaces a vote; `None` is an explicit abstention.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidPhase`] outside the voting phase,
    /// [`EngineError::IneligibleActor`] for dead voters, and
    /// [`EngineError::InvalidTarget`] for dead or unknown targets.
    pub async fn submit_vote(
        &self,
        game_id: GameId,
        seat: Seat,
        target: Option<Seat>,
    ) -> Result<()> {
        let handle = self.inner.store.get(game_id)?;
        let mut session = handle.write().await;

        let player = session.player(seat)?;
        if !player.alive {
            return Err(EngineError::IneligibleActor {
                seat,
                reason: "dead seats cannot vote".to_string(),
            });
        }
        if session.phase != Phase::Vote {
            return Err(EngineError::InvalidPhase {
                phase: session.phase,
                action: "vote",
            });
        }
        if let Some(target) = target {
            let living = session.living_seats();
            if !living.contains(&target) {
                return Err(EngineError::InvalidTarget {
                    target,
                    allowed: living,
                });
            }
        }

        session.pending_votes.insert(seat, target);
        self.emit(
            game_id,
            Actor::Seat(seat),
            EventKind::Vote {
                voter: seat,
                target,
            },
            Visibility::Public,
        )?;
        Ok(())
    }

    /// Submits a night action, replacing any earlier one from the same seat
    /// this night. Nothing takes effect until the night resolves.
    ///
    /// # Errors
    ///
    /// Validates in order: the seat must be alive
    /// ([`EngineError::IneligibleActor`]), the phase must be night
    /// ([`EngineError::InvalidPhase`]), the role must carry the action
    /// ([`EngineError::IneligibleActor`]), the charge must be unspent
    /// ([`EngineError::ResourceExhausted`]), and the target must be legal
    /// ([`EngineError::InvalidTarget`], carrying the legal set).
    pub async fn submit_night_action(
        &self,
        game_id: GameId,
        seat: Seat,
        kind: NightActionKind,
        target: Seat,
    ) -> Result<()> {
        let handle = self.inner.store.get(game_id)?;
        let mut session = handle.write().await;

        let player = session.player(seat)?;
        if !player.alive {
            return Err(EngineError::IneligibleActor {
                seat,
                reason: "dead seats cannot act".to_string(),
            });
        }
        if session.phase != Phase::Night {
            return Err(EngineError::InvalidPhase {
                phase: session.phase,
                action: "night_action",
            });
        }
        if !player.role.night_actions().contains(&kind) {
            return Err(EngineError::IneligibleActor {
                seat,
                reason: format!("role {} cannot {kind}", player.role),
            });
        }
        let exhausted = match kind {
            NightActionKind::Cure => player.cure_used,
            NightActionKind::Harm => player.harm_used,
            _ => false,
        };
        if exhausted {
            return Err(EngineError::ResourceExhausted { seat, action: kind });
        }
        let role = player.role;
        let allowed = observe::action_constraints(&session, seat, EligibleAction::Night { kind });
        if !allowed.contains(&target) {
            return Err(EngineError::InvalidTarget { target, allowed });
        }

        session
            .pending_night_actions
            .insert(seat, PendingNightAction { kind, target });

        // Pack members see each other's elimination picks; everything else
        // stays scoped to the actor.
        let visibility = if kind == NightActionKind::Eliminate {
            Visibility::Alignment {
                alignment: Alignment::Werewolf,
                seats: session.living_by_alignment(Alignment::Werewolf),
            }
        } else {
            Visibility::Seats { seats: vec![seat] }
        };
        self.emit(
            game_id,
            Actor::Seat(seat),
            EventKind::NightAction {
                seat,
                kind,
                target,
                role,
            },
            visibility,
        )?;
        Ok(())
    }

    /// Posts an orchestrator notice, delivered to the listed seats or to
    /// everyone when the list is empty.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::GameNotFound`] for unknown games and
    /// [`EngineError::InvalidContent`] for empty text.
    pub fn post_notice(
        &self,
        game_id: GameId,
        seats: Vec<Seat>,
        message: &str,
    ) -> Result<Arc<EventRecord>> {
        if message.trim().is_empty() {
            return Err(EngineError::InvalidContent(
                "notice text is empty".to_string(),
            ));
        }
        self.inner.store.get(game_id)?;
        let visibility = if seats.is_empty() {
            Visibility::Public
        } else {
            Visibility::Seats { seats }
        };
        self.emit(
            game_id,
            Actor::System,
            EventKind::SystemNotice {
                message: message.to_string(),
            },
            visibility,
        )
    }

    /// Builds the observation for one seat.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::GameNotFound`] or
    /// [`EngineError::SeatNotFound`].
    pub async fn observation(&self, game_id: GameId, seat: Seat) -> Result<Observation> {
        let handle = self.inner.store.get(game_id)?;
        let session = handle.read().await;
        let records = self.inner.log.replay(game_id, None)?;
        build_observation(&session, &records, seat)
    }

    /// Actions `seat` may take right now.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::GameNotFound`] for unknown games.
    pub async fn eligible_actions(
        &self,
        game_id: GameId,
        seat: Seat,
    ) -> Result<Vec<EligibleAction>> {
        let handle = self.inner.store.get(game_id)?;
        let session = handle.read().await;
        Ok(observe::eligible_actions(&session, seat))
    }

    /// Legal targets for one of `seat`'s actions right now.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::GameNotFound`] for unknown games.
    pub async fn action_constraints(
        &self,
        game_id: GameId,
        seat: Seat,
        action: EligibleAction,
    ) -> Result<Vec<Seat>> {
        let handle = self.inner.store.get(game_id)?;
        let session = handle.read().await;
        Ok(observe::action_constraints(&session, seat, action))
    }

    /// Rebuilds a session from its verified log and checks it against the
    /// live one, returning the rebuilt copy.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ChainIntegrity`] if the chain fails
    /// verification or the rebuilt state diverges from the live session.
    pub async fn audit_session(&self, game_id: GameId) -> Result<GameSession> {
        self.inner.log.verify_chain(game_id)?;
        let records = self.inner.log.replay(game_id, None)?;
        let rebuilt = crate::session::rebuild::from_events(&records)?;

        let handle = self.inner.store.get(game_id)?;
        let live = handle.read().await;
        if rebuilt != *live {
            return Err(EngineError::ChainIntegrity {
                index: self.inner.log.latest_index(game_id).unwrap_or(0),
                detail: "replayed state diverges from live session".to_string(),
            });
        }
        Ok(rebuilt)
    }

    /// Verifies the hash chain for a game.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ChainIntegrity`] at the first broken link.
    pub fn verify_chain(&self, game_id: GameId) -> Result<()> {
        self.inner.log.verify_chain(game_id)
    }

    /// Replays a game's records, optionally up to an index (inclusive).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::GameNotFound`] for unknown games.
    pub fn replay(&self, game_id: GameId, to_index: Option<u64>) -> Result<Vec<Arc<EventRecord>>> {
        self.inner.log.replay(game_id, to_index)
    }

    /// Summarizes a game's log.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::GameNotFound`] for unknown games.
    pub fn summary(&self, game_id: GameId) -> Result<GameSummary> {
        self.inner.log.summary(game_id)
    }

    /// Registers a firehose subscriber over all games' committed events.
    pub fn subscribe(&self) -> tokio::sync::mpsc::UnboundedReceiver<Arc<EventRecord>> {
        self.inner.publisher.subscribe()
    }

    /// Cancels all outstanding phase timers.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn emit(
        &self,
        game_id: GameId,
        actor: Actor,
        kind: EventKind,
        visibility: Visibility,
    ) -> Result<Arc<EventRecord>> {
        let record = self.inner.log.append(game_id, actor, kind, visibility)?;
        self.inner.publisher.publish(&record);
        Ok(record)
    }

    /// Enters `to`, emits the transition, and arms the deadline timer.
    /// Entering the night bumps the round.
    fn enter_phase(&self, session: &mut GameSession, to: Phase) -> Result<()> {
        self.enter_phase_with(session, to, None)
    }

    fn enter_phase_with(
        &self,
        session: &mut GameSession,
        to: Phase,
        override_duration: Option<std::time::Duration>,
    ) -> Result<()> {
        let from = session.phase;
        if to == Phase::Night {
            session.round += 1;
        }
        let deadline = to.is_timed().then(|| {
            deadline_after(override_duration.unwrap_or_else(|| session.config.duration_for(to)))
        });
        session.begin_phase(to, deadline);

        self.emit(
            session.id,
            Actor::System,
            EventKind::PhaseChanged {
                from,
                to,
                round: session.round,
                deadline_ms: session.phase_deadline.map(|d| d.timestamp_millis()),
            },
            Visibility::Public,
        )?;
        metrics::counter!("nocturne_phase_transitions_total").increment(1);
        info!(game_id = %session.id, %from, %to, round = session.round, "phase changed");

        if let Some(deadline) = session.phase_deadline {
            self.arm_timer(session.id, session.phase_serial, deadline);
        }
        Ok(())
    }

    fn arm_timer(&self, game_id: GameId, serial: u64, deadline: DateTime<Utc>) {
        let engine = self.clone();
        let shutdown = self.inner.shutdown.clone();
        tokio::spawn(async move {
            let wait = (deadline - Utc::now())
                .to_std()
                .unwrap_or(std::time::Duration::ZERO);
            tokio::select! {
                () = shutdown.cancelled() => return,
                () = tokio::time::sleep(wait) => {}
            }
            if let Err(err) = engine.advance_if_current(game_id, serial).await {
                warn!(%game_id, %err, "deadline advance failed");
            }
        });
    }

    /// Deadline-driven advance. A stale serial means a manual advance won
    /// the race; the timer quietly stands down.
    async fn advance_if_current(&self, game_id: GameId, serial: u64) -> Result<()> {
        let handle = self.inner.store.get(game_id)?;
        let mut session = handle.write().await;
        if session.phase_serial != serial {
            debug!(%game_id, serial, current = session.phase_serial, "stale phase timer");
            return Ok(());
        }
        self.advance_locked(&mut session)?;
        Ok(())
    }

    fn advance_locked(&self, session: &mut GameSession) -> Result<Phase> {
        self.advance_with(session, None)
    }

    fn advance_with(
        &self,
        session: &mut GameSession,
        override_duration: Option<std::time::Duration>,
    ) -> Result<Phase> {
        let from = session.phase;
        if from == Phase::End {
            return Err(EngineError::InvalidTransition(
                "the game has already ended".to_string(),
            ));
        }

        let resolved = match from {
            Phase::Vote => {
                self.resolve_vote_phase(session)?;
                true
            }
            Phase::Night => {
                self.resolve_night_phase(session)?;
                true
            }
            _ => false,
        };

        if resolved && let Some(winner) = session.winner_check() {
            session.winner = Some(winner);
            self.enter_phase(session, Phase::End)?;
            self.emit(
                session.id,
                Actor::System,
                EventKind::GameEnded {
                    winner,
                    rounds: session.round,
                },
                Visibility::Public,
            )?;
            metrics::counter!("nocturne_games_ended_total").increment(1);
            info!(game_id = %session.id, %winner, rounds = session.round, "game ended");
            return Ok(Phase::End);
        }

        let to = from.next().ok_or_else(|| {
            EngineError::InvalidTransition(format!("no successor phase for {from}"))
        })?;
        self.enter_phase_with(session, to, override_duration)?;
        Ok(to)
    }

    fn resolve_vote_phase(&self, session: &mut GameSession) -> Result<()> {
        let outcome = resolve::resolve_vote(session);
        self.emit(
            session.id,
            Actor::System,
            EventKind::VoteResult {
                tally: outcome.tally,
                executed: outcome.executed,
                reason: outcome.reason,
            },
            Visibility::Public,
        )?;
        if let Some(seat) = outcome.executed {
            self.emit(
                session.id,
                Actor::System,
                EventKind::PlayerDied {
                    seat,
                    cause: DeathCause::Voted,
                },
                Visibility::Public,
            )?;
            metrics::counter!("nocturne_deaths_total").increment(1);
        }
        Ok(())
    }

    fn resolve_night_phase(&self, session: &mut GameSession) -> Result<()> {
        let outcome = resolve::resolve_night(session);
        self.emit(
            session.id,
            Actor::System,
            EventKind::NightResult {
                deaths: outcome.deaths.iter().map(|(seat, _)| *seat).collect(),
            },
            Visibility::Public,
        )?;
        for (seat, cause) in &outcome.deaths {
            self.emit(
                session.id,
                Actor::System,
                EventKind::PlayerDied {
                    seat: *seat,
                    cause: *cause,
                },
                Visibility::Public,
            )?;
            metrics::counter!("nocturne_deaths_total").increment(1);
        }
        for (inspector, result) in &outcome.inspections {
            self.emit(
                session.id,
                Actor::System,
                EventKind::Inspection {
                    inspector: *inspector,
                    target: result.target,
                    alignment: result.alignment,
                },
                Visibility::Seats {
                    seats: vec![*inspector],
                },
            )?;
        }
        if let Some(seat) = outcome.saved {
            self.emit(
                session.id,
                Actor::System,
                EventKind::Saved { seat },
                Visibility::Seats { seats: vec![seat] },
            )?;
        }
        Ok(())
    }
}

fn deadline_after(duration: std::time::Duration) -> DateTime<Utc> {
    let millis = i64::try_from(duration.as_millis()).unwrap_or(i64::MAX);
    Utc::now() + ChronoDuration::milliseconds(millis)
}
