//! Shared integration-test harness: canned configurations and helpers for
//! driving a game through its phases via the public engine API.

#![allow(dead_code)]

use std::collections::BTreeMap;

use nocturne::config::HumanDuration;
use nocturne::{GameConfig, GameEngine, GameId, Phase, Role, Seat};

/// The standard eight-seat roster used across the integration tests.
#[must_use]
pub fn standard_config() -> GameConfig {
    GameConfig {
        roles: vec![
            Role::Werewolf,
            Role::Werewolf,
            Role::Seer,
            Role::Witch,
            Role::Guard,
            Role::Hunter,
            Role::Villager,
            Role::Villager,
        ],
        phase_durations: BTreeMap::new(),
        shuffle_seed: Some(2024),
    }
}

/// A minimal four-seat roster for quick win-condition games.
#[must_use]
pub fn small_config() -> GameConfig {
    GameConfig {
        roles: vec![Role::Werewolf, Role::Seer, Role::Villager, Role::Villager],
        phase_durations: BTreeMap::new(),
        shuffle_seed: Some(5),
    }
}

/// Overrides one phase duration on a config.
#[must_use]
pub fn with_duration(mut config: GameConfig, phase: Phase, secs: u64) -> GameConfig {
    config.phase_durations.insert(
        phase,
        HumanDuration(std::time::Duration::from_secs(secs)),
    );
    config
}

/// Creates a session, deals roles, and returns the id with the game in its
/// first night.
pub async fn started_game(engine: &GameEngine, config: GameConfig) -> GameId {
    let players = config.roles.len();
    let game_id = engine.create_session(config).expect("valid config");
    engine
        .assign_roles(game_id, players)
        .await
        .expect("assignment succeeds");
    game_id
}

/// Finds every seat holding `role`, via each seat's own observation.
pub async fn seats_by_role(
    engine: &GameEngine,
    game_id: GameId,
    players: u8,
    role: Role,
) -> Vec<Seat> {
    let mut found = Vec::new();
    for i in 0..players {
        let seat = Seat(i);
        let obs = engine
            .observation(game_id, seat)
            .await
            .expect("seat exists");
        if obs.you.role == role {
            found.push(seat);
        }
    }
    found
}

/// Current phase as seen by seat 0.
pub async fn current_phase(engine: &GameEngine, game_id: GameId) -> Phase {
    engine
        .observation(game_id, Seat(0))
        .await
        .expect("seat 0 exists")
        .game
        .phase
}

/// Advances `n` phases manually.
pub async fn advance(engine: &GameEngine, game_id: GameId, n: usize) {
    for _ in 0..n {
        engine.advance_phase(game_id).await.expect("advance");
    }
}
