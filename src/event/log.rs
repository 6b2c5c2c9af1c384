//! Per-game serialized event chains.
//!
//! Appends for one game are strictly ordered because each hash depends on
//! the previous record; different games' chains are fully independent and
//! append concurrently. Appends never await or perform I/O while holding a
//! chain lock.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, error};

use crate::error::{EngineError, Result};
use crate::ids::{Actor, GameId};
use crate::role::Alignment;
use crate::session::phase::Phase;

use super::record::{EventKind, EventRecord, Visibility, hash_parts};

/// In-memory hash-chained event store, keyed by game.
///
/// Shaped exactly like the durable table an external store would own:
/// rows keyed by `(game_id, index)` with a hash column verifiable
/// independently of any cache. [`EventLog::restore`] loads such rows back.
#[derive(Debug, Default)]
pub struct EventLog {
    chains: DashMap<GameId, Mutex<Vec<Arc<EventRecord>>>>,
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one event to a game's chain and returns the committed record.
    ///
    /// Computes the next sequence index and the content hash over the
    /// previous record's hash, the kind tag, the canonical payload, the
    /// index, and the timestamp. Serialized per game by the chain lock.
    ///
    /// # Errors
    ///
    /// Returns a JSON error if the payload cannot be serialized.
    ///
    /// # Panics
    ///
    /// Panics if a chain lock is poisoned.
    pub fn append(
        &self,
        game_id: GameId,
        actor: Actor,
        kind: EventKind,
        visibility: Visibility,
    ) -> Result<Arc<EventRecord>> {
        let chain = self.chains.entry(game_id).or_default();
        let mut records = chain.lock().expect("event chain lock poisoned");

        let index = records.len() as u64;
        let prev_hash = records.last().map_or_else(String::new, |r| r.hash.clone());
        let timestamp = Utc::now();
        let hash = hash_parts(&prev_hash, &kind, index, timestamp.timestamp_millis())?;

        let record = Arc::new(EventRecord {
            game_id,
            index,
            timestamp,
            actor,
            kind,
            visibility,
            hash,
            prev_hash,
        });

        debug!(game = %game_id, index, kind = record.kind.tag(), "event appended");
        metrics::counter!("nocturne_events_total").increment(1);

        records.push(Arc::clone(&record));
        Ok(record)
    }

    /// Replaces a game's chain with externally persisted records.
    ///
    /// The chain is verified before it is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ChainIntegrity`] with the first failing index
    /// if the supplied records do not form a valid chain.
    ///
    /// # Panics
    ///
    /// Panics if a chain lock is poisoned.
    pub fn restore(&self, game_id: GameId, records: Vec<EventRecord>) -> Result<()> {
        let records: Vec<Arc<EventRecord>> = records.into_iter().map(Arc::new).collect();
        verify_records(&records)?;
        let chain = self.chains.entry(game_id).or_default();
        *chain.lock().expect("event chain lock poisoned") = records;
        Ok(())
    }

    /// Returns every event for a game up to and including `to_index`, in
    /// sequence order. `None` returns the full chain.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::GameNotFound`] for an unknown game.
    ///
    /// # Panics
    ///
    /// Panics if a chain lock is poisoned.
    pub fn replay(&self, game_id: GameId, to_index: Option<u64>) -> Result<Vec<Arc<EventRecord>>> {
        let chain = self
            .chains
            .get(&game_id)
            .ok_or(EngineError::GameNotFound(game_id))?;
        let records = chain.lock().expect("event chain lock poisoned");
        Ok(records
            .iter()
            .filter(|r| to_index.is_none_or(|max| r.index <= max))
            .cloned()
            .collect())
    }

    /// Highest committed sequence index for a game, if any events exist.
    ///
    /// # Panics
    ///
    /// Panics if a chain lock is poisoned.
    #[must_use]
    pub fn latest_index(&self, game_id: GameId) -> Option<u64> {
        let chain = self.chains.get(&game_id)?;
        let records = chain.lock().expect("event chain lock poisoned");
        records.last().map(|r| r.index)
    }

    /// Walks a game's full chain, recomputing every hash and checking the
    /// `prev_hash` linkage and index continuity.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::GameNotFound`] for an unknown game, or
    /// [`EngineError::ChainIntegrity`] naming the first failing index. The
    /// chain is never repaired.
    ///
    /// # Panics
    ///
    /// Panics if a chain lock is poisoned.
    pub fn verify_chain(&self, game_id: GameId) -> Result<()> {
        let chain = self
            .chains
            .get(&game_id)
            .ok_or(EngineError::GameNotFound(game_id))?;
        let records = chain.lock().expect("event chain lock poisoned");
        verify_records(&records).inspect_err(|e| {
            error!(game = %game_id, "chain verification failed: {e}");
        })
    }

    /// Builds a replay-derived summary of one game.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::GameNotFound`] for an unknown game.
    pub fn summary(&self, game_id: GameId) -> Result<GameSummary> {
        let records = self.replay(game_id, None)?;

        let mut summary = GameSummary {
            game_id,
            total_events: records.len() as u64,
            started_at: records.first().map(|r| r.timestamp),
            ended_at: None,
            winner: None,
            rounds: 0,
            phases: Vec::new(),
        };

        for record in &records {
            match &record.kind {
                EventKind::GameEnded { winner, rounds } => {
                    summary.ended_at = Some(record.timestamp);
                    summary.winner = Some(*winner);
                    summary.rounds = summary.rounds.max(*rounds);
                }
                EventKind::PhaseChanged { to, round, .. } => {
                    summary.rounds = summary.rounds.max(*round);
                    summary.phases.push(PhaseStamp {
                        phase: *to,
                        round: *round,
                        timestamp: record.timestamp,
                    });
                }
                _ => {}
            }
        }

        Ok(summary)
    }
}

/// Verifies an ordered record slice as a self-consistent chain.
fn verify_records(records: &[Arc<EventRecord>]) -> Result<()> {
    let mut prev_hash = String::new();
    for (i, record) in records.iter().enumerate() {
        if record.index != i as u64 {
            return Err(EngineError::ChainIntegrity {
                index: i as u64,
                detail: format!("expected index {i}, found {}", record.index),
            });
        }
        if record.prev_hash != prev_hash {
            return Err(EngineError::ChainIntegrity {
                index: record.index,
                detail: "previous-hash linkage broken".to_string(),
            });
        }
        let recomputed = record.compute_hash()?;
        if recomputed != record.hash {
            return Err(EngineError::ChainIntegrity {
                index: record.index,
                detail: "stored hash does not match recomputed hash".to_string(),
            });
        }
        prev_hash.clone_from(&record.hash);
    }
    Ok(())
}

/// Replay-derived summary of one game's history.
#[derive(Debug, Clone, Serialize)]
pub struct GameSummary {
    /// The game.
    pub game_id: GameId,
    /// Total events in the chain.
    pub total_events: u64,
    /// Timestamp of the first event.
    pub started_at: Option<DateTime<Utc>>,
    /// Timestamp of the `GameEnded` event, if the game finished.
    pub ended_at: Option<DateTime<Utc>>,
    /// Winning alignment, if the game finished.
    pub winner: Option<Alignment>,
    /// Highest round reached.
    pub rounds: u32,
    /// Every phase entered, in order.
    pub phases: Vec<PhaseStamp>,
}

/// One phase entry in a game summary.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PhaseStamp {
    /// Phase entered.
    pub phase: Phase,
    /// Round at entry.
    pub round: u32,
    /// When it was entered.
    pub timestamp: DateTime<Utc>,
}
