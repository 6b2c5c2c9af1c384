//! End-to-end game flow: deal, night, day, vote, and win, all through the
//! public engine API, with the log verifying cleanly afterwards.

mod common;

use common::{advance, current_phase, seats_by_role, small_config, standard_config, started_game};
use nocturne::error::EngineError;
use nocturne::{
    Alignment, EventKind, GameEngine, NightActionKind, Phase, Role, Seat,
};

#[tokio::test(start_paused = true)]
async fn full_round_walks_the_phase_cycle() {
    let engine = GameEngine::new();
    let game_id = started_game(&engine, standard_config()).await;

    assert_eq!(current_phase(&engine, game_id).await, Phase::Night);
    let expected = [
        Phase::Dawn,
        Phase::DayTalk,
        Phase::Vote,
        Phase::Trial,
        Phase::DayResult,
        Phase::Night,
    ];
    for want in expected {
        assert_eq!(engine.advance_phase(game_id).await.unwrap(), want);
    }

    // The loop back to night opened round two.
    let obs = engine.observation(game_id, Seat(0)).await.unwrap();
    assert_eq!(obs.game.round, 2);
    engine.verify_chain(game_id).unwrap();
}

#[tokio::test(start_paused = true)]
async fn assignment_returns_the_full_deal() {
    let engine = GameEngine::new();
    let game_id = engine.create_session(standard_config()).unwrap();
    let deal = engine.assign_roles(game_id, 8).await.unwrap();

    assert_eq!(deal.len(), 8);
    let wolves = deal
        .iter()
        .filter(|a| a.alignment == Alignment::Werewolf)
        .count();
    assert_eq!(wolves, 2);
    assert!(matches!(
        engine.assign_roles(game_id, 8).await,
        Err(EngineError::InvalidPhase { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn night_kill_then_vote_execution() {
    let engine = GameEngine::new();
    let game_id = started_game(&engine, standard_config()).await;
    let wolves = seats_by_role(&engine, game_id, 8, Role::Werewolf).await;
    let villagers = seats_by_role(&engine, game_id, 8, Role::Villager).await;

    engine
        .submit_night_action(game_id, wolves[0], NightActionKind::Eliminate, villagers[0])
        .await
        .unwrap();
    advance(&engine, game_id, 2).await; // Dawn, then DayTalk

    let obs = engine.observation(game_id, villagers[1]).await.unwrap();
    assert!(!obs.public_state.living.contains(&villagers[0]));
    assert_eq!(obs.public_state.dead[0].seat, villagers[0]);
    assert_eq!(obs.public_state.dead[0].role, Role::Villager);

    engine
        .submit_speak(game_id, villagers[1], "I suspect the quiet one")
        .await
        .unwrap();
    advance(&engine, game_id, 1).await; // Vote

    for seat in [villagers[1], wolves[1]] {
        engine
            .submit_vote(game_id, seat, Some(wolves[0]))
            .await
            .unwrap();
    }
    assert_eq!(engine.advance_phase(game_id).await.unwrap(), Phase::Trial);

    let obs = engine.observation(game_id, villagers[1]).await.unwrap();
    assert!(!obs.public_state.living.contains(&wolves[0]));
    engine.verify_chain(game_id).unwrap();
}

#[tokio::test(start_paused = true)]
async fn village_win_ends_and_freezes_the_game() {
    let engine = GameEngine::new();
    let game_id = started_game(&engine, small_config()).await;
    let wolf = seats_by_role(&engine, game_id, 4, Role::Werewolf).await[0];
    let villagers = seats_by_role(&engine, game_id, 4, Role::Villager).await;

    advance(&engine, game_id, 3).await; // empty night, to Vote
    for seat in villagers {
        engine.submit_vote(game_id, seat, Some(wolf)).await.unwrap();
    }
    assert_eq!(engine.advance_phase(game_id).await.unwrap(), Phase::End);

    let obs = engine.observation(game_id, wolf).await.unwrap();
    assert_eq!(obs.game.winner, Some(Alignment::Village));
    assert!(obs.eligible_actions.is_empty());
    assert!(matches!(
        engine.advance_phase(game_id).await,
        Err(EngineError::InvalidTransition(_))
    ));

    let summary = engine.summary(game_id).unwrap();
    assert_eq!(summary.winner, Some(Alignment::Village));
    assert!(summary.ended_at.is_some());
}

#[tokio::test(start_paused = true)]
async fn werewolf_win_at_parity() {
    let engine = GameEngine::new();
    let game_id = started_game(&engine, small_config()).await;
    let wolf = seats_by_role(&engine, game_id, 4, Role::Werewolf).await[0];
    let villagers = seats_by_role(&engine, game_id, 4, Role::Villager).await;

    // Night one: kill a villager (3 left, wolf + 2 village).
    engine
        .submit_night_action(game_id, wolf, NightActionKind::Eliminate, villagers[0])
        .await
        .unwrap();
    advance(&engine, game_id, 6).await; // full round back to Night

    // Night two: kill the second villager, reaching parity.
    engine
        .submit_night_action(game_id, wolf, NightActionKind::Eliminate, villagers[1])
        .await
        .unwrap();
    assert_eq!(engine.advance_phase(game_id).await.unwrap(), Phase::End);

    let obs = engine.observation(game_id, wolf).await.unwrap();
    assert_eq!(obs.game.winner, Some(Alignment::Werewolf));
}

#[tokio::test(start_paused = true)]
async fn tie_votes_execute_nobody() {
    let engine = GameEngine::new();
    let game_id = started_game(&engine, standard_config()).await;
    let wolves = seats_by_role(&engine, game_id, 8, Role::Werewolf).await;
    let villagers = seats_by_role(&engine, game_id, 8, Role::Villager).await;

    advance(&engine, game_id, 3).await; // to Vote
    engine
        .submit_vote(game_id, villagers[0], Some(wolves[0]))
        .await
        .unwrap();
    engine
        .submit_vote(game_id, wolves[0], Some(villagers[0]))
        .await
        .unwrap();

    let mut events = engine.subscribe();
    engine.advance_phase(game_id).await.unwrap();

    let mut executed_events = 0;
    while let Ok(record) = events.try_recv() {
        match &record.kind {
            EventKind::PlayerDied { .. } => executed_events += 1,
            EventKind::VoteResult { executed, .. } => assert_eq!(*executed, None),
            _ => {}
        }
    }
    assert_eq!(executed_events, 0);

    let obs = engine.observation(game_id, villagers[0]).await.unwrap();
    assert_eq!(obs.public_state.living.len(), 8);
}

#[tokio::test(start_paused = true)]
async fn votes_can_be_replaced_until_resolution() {
    let engine = GameEngine::new();
    let game_id = started_game(&engine, standard_config()).await;
    let wolves = seats_by_role(&engine, game_id, 8, Role::Werewolf).await;
    let villagers = seats_by_role(&engine, game_id, 8, Role::Villager).await;
    let seer = seats_by_role(&engine, game_id, 8, Role::Seer).await[0];

    advance(&engine, game_id, 3).await;
    // First pick the villager, then change to the wolf.
    engine
        .submit_vote(game_id, seer, Some(villagers[0]))
        .await
        .unwrap();
    engine
        .submit_vote(game_id, seer, Some(wolves[0]))
        .await
        .unwrap();
    engine
        .submit_vote(game_id, villagers[0], Some(wolves[0]))
        .await
        .unwrap();
    engine.advance_phase(game_id).await.unwrap();

    let obs = engine.observation(game_id, seer).await.unwrap();
    assert!(!obs.public_state.living.contains(&wolves[0]));
    assert!(obs.public_state.living.contains(&villagers[0]));
}
