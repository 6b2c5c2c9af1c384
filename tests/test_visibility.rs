//! Observation isolation: no seat's view may carry another living seat's
//! role, the other team's chat, or someone else's private results.

mod common;

use common::{advance, seats_by_role, standard_config, started_game};
use nocturne::observe::PrivateNote;
use nocturne::{Alignment, GameEngine, NightActionKind, Role};

#[tokio::test(start_paused = true)]
async fn teammates_are_visible_only_to_the_pack() {
    let engine = GameEngine::new();
    let game_id = started_game(&engine, standard_config()).await;
    let wolves = seats_by_role(&engine, game_id, 8, Role::Werewolf).await;
    let seer = seats_by_role(&engine, game_id, 8, Role::Seer).await[0];

    let wolf_view = engine.observation(game_id, wolves[0]).await.unwrap();
    assert_eq!(wolf_view.teammates, Some(vec![wolves[1]]));

    let seer_view = engine.observation(game_id, seer).await.unwrap();
    assert_eq!(seer_view.teammates, None);
}

#[tokio::test(start_paused = true)]
async fn night_chat_stays_inside_the_pack() {
    let engine = GameEngine::new();
    let game_id = started_game(&engine, standard_config()).await;
    let wolves = seats_by_role(&engine, game_id, 8, Role::Werewolf).await;
    let villagers = seats_by_role(&engine, game_id, 8, Role::Villager).await;

    engine
        .submit_speak(game_id, wolves[0], "take the loud one tonight")
        .await
        .unwrap();

    let packmate = engine.observation(game_id, wolves[1]).await.unwrap();
    assert_eq!(packmate.chat.alignment_tail.len(), 1);
    assert_eq!(
        packmate.chat.alignment_tail[0].text,
        "take the loud one tonight"
    );

    let villager = engine.observation(game_id, villagers[0]).await.unwrap();
    assert!(villager.chat.alignment_tail.is_empty());
    assert!(villager.chat.public_tail.is_empty());
}

#[tokio::test(start_paused = true)]
async fn inspection_results_reach_only_the_seer() {
    let engine = GameEngine::new();
    let game_id = started_game(&engine, standard_config()).await;
    let wolves = seats_by_role(&engine, game_id, 8, Role::Werewolf).await;
    let seer = seats_by_role(&engine, game_id, 8, Role::Seer).await[0];
    let witch = seats_by_role(&engine, game_id, 8, Role::Witch).await[0];

    engine
        .submit_night_action(game_id, seer, NightActionKind::Inspect, wolves[0])
        .await
        .unwrap();
    advance(&engine, game_id, 1).await;

    let seer_view = engine.observation(game_id, seer).await.unwrap();
    assert_eq!(
        seer_view.private_notes,
        vec![PrivateNote::Inspection {
            target: wolves[0],
            alignment: Alignment::Werewolf,
        }]
    );

    let witch_view = engine.observation(game_id, witch).await.unwrap();
    assert!(witch_view.private_notes.is_empty());
    // The inspected wolf learns nothing either.
    let wolf_view = engine.observation(game_id, wolves[0]).await.unwrap();
    assert!(wolf_view.private_notes.is_empty());
}

#[tokio::test(start_paused = true)]
async fn living_roles_never_appear_in_public_state() {
    let engine = GameEngine::new();
    let game_id = started_game(&engine, standard_config()).await;
    let villagers = seats_by_role(&engine, game_id, 8, Role::Villager).await;

    let obs = engine.observation(game_id, villagers[0]).await.unwrap();
    assert_eq!(obs.you.role, Role::Villager);
    assert!(obs.public_state.dead.is_empty());
    // The only role data in the whole observation is the observer's own.
    let json = serde_json::to_value(&obs).unwrap();
    let roles_mentioned = count_role_fields(&json);
    assert_eq!(roles_mentioned, 1, "only `you.role` may name a role: {json}");
}

fn count_role_fields(value: &serde_json::Value) -> usize {
    match value {
        serde_json::Value::Object(map) => map
            .iter()
            .map(|(key, v)| usize::from(key == "role") + count_role_fields(v))
            .sum(),
        serde_json::Value::Array(items) => items.iter().map(count_role_fields).sum(),
        _ => 0,
    }
}

#[tokio::test(start_paused = true)]
async fn the_saved_seat_alone_learns_of_the_rescue() {
    let engine = GameEngine::new();
    let game_id = started_game(&engine, standard_config()).await;
    let wolves = seats_by_role(&engine, game_id, 8, Role::Werewolf).await;
    let witch = seats_by_role(&engine, game_id, 8, Role::Witch).await[0];
    let villagers = seats_by_role(&engine, game_id, 8, Role::Villager).await;

    engine
        .submit_night_action(game_id, wolves[0], NightActionKind::Eliminate, villagers[0])
        .await
        .unwrap();
    engine
        .submit_night_action(game_id, witch, NightActionKind::Cure, villagers[0])
        .await
        .unwrap();
    advance(&engine, game_id, 1).await;

    let saved = engine.observation(game_id, villagers[0]).await.unwrap();
    assert!(saved.you.alive);
    assert_eq!(saved.private_notes, vec![PrivateNote::Saved]);

    let bystander = engine.observation(game_id, villagers[1]).await.unwrap();
    assert!(bystander.private_notes.is_empty());
    assert!(bystander.public_state.dead.is_empty());
}

#[tokio::test(start_paused = true)]
async fn targeted_notices_land_in_private_notes() {
    let engine = GameEngine::new();
    let game_id = started_game(&engine, standard_config()).await;
    let seer = seats_by_role(&engine, game_id, 8, Role::Seer).await[0];
    let witch = seats_by_role(&engine, game_id, 8, Role::Witch).await[0];

    engine
        .post_notice(game_id, vec![seer], "your visions sharpen")
        .unwrap();

    let seer_view = engine.observation(game_id, seer).await.unwrap();
    assert_eq!(
        seer_view.private_notes,
        vec![PrivateNote::Notice {
            message: "your visions sharpen".to_string(),
        }]
    );
    let witch_view = engine.observation(game_id, witch).await.unwrap();
    assert!(witch_view.private_notes.is_empty());
}

#[tokio::test(start_paused = true)]
async fn dead_seats_lose_all_actions_but_keep_sight() {
    let engine = GameEngine::new();
    let game_id = started_game(&engine, standard_config()).await;
    let wolves = seats_by_role(&engine, game_id, 8, Role::Werewolf).await;
    let villagers = seats_by_role(&engine, game_id, 8, Role::Villager).await;

    engine
        .submit_night_action(game_id, wolves[0], NightActionKind::Eliminate, villagers[0])
        .await
        .unwrap();
    advance(&engine, game_id, 2).await; // Dawn, DayTalk

    let dead = engine.observation(game_id, villagers[0]).await.unwrap();
    assert!(!dead.you.alive);
    assert!(dead.eligible_actions.is_empty());
    // Dead seats still read the public record.
    assert_eq!(dead.public_state.dead[0].seat, villagers[0]);

    assert!(
        engine
            .submit_speak(game_id, villagers[0], "from beyond")
            .await
            .is_err()
    );
}
