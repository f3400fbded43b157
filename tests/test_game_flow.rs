//! A full round over the handler path: start, information partitioning,
//! vote requests, voting, results, and return to lobby — plus the
//! timer-driven auto-advance.

mod common;

use std::time::Duration;

use common::{ready_all, room_with_players};
use wordspy::protocol::{ClientEvent, ServerEvent};
use wordspy::room::model::{PlayerRole, RoomPhase};
use wordspy::room::store::RoomStore;

fn start_event(room_id: &str) -> ClientEvent {
    ClientEvent::StartGame {
        room_id: room_id.to_string(),
        language: None,
        category_ids: None,
        settings: None,
    }
}

#[tokio::test]
async fn only_the_host_may_start() {
    let (state, room_id, mut clients) = room_with_players(&["ana", "bo", "cy"]).await;
    ready_all(&state, &room_id, &mut clients).await;

    clients[1].send(&state, start_event(&room_id)).await;
    assert_eq!(
        clients[1].errors(),
        vec!["only the host can start the game"]
    );
    assert_eq!(
        state.store.get(&room_id).await.unwrap().phase,
        RoomPhase::Waiting
    );
}

#[tokio::test]
async fn start_requires_everyone_ready() {
    let (state, room_id, mut clients) = room_with_players(&["ana", "bo", "cy"]).await;

    clients[0].send(&state, start_event(&room_id)).await;
    assert_eq!(clients[0].errors(), vec!["all players must be ready"]);
}

#[tokio::test]
async fn start_requires_three_players() {
    let (state, room_id, mut clients) = room_with_players(&["ana", "bo"]).await;
    ready_all(&state, &room_id, &mut clients).await;

    clients[0].send(&state, start_event(&room_id)).await;
    assert_eq!(
        clients[0].errors(),
        vec!["need at least 3 players to start (have 2)"]
    );
}

#[tokio::test]
async fn start_partitions_information_per_viewer() {
    let (state, room_id, mut clients) = room_with_players(&["ana", "bo", "cy"]).await;
    ready_all(&state, &room_id, &mut clients).await;

    clients[0].send(&state, start_event(&room_id)).await;

    let room = state.store.get(&room_id).await.unwrap();
    assert_eq!(room.phase, RoomPhase::RoleReveal);
    assert_eq!(room.round_number, 1);
    let impostor_id = room.game_state.as_ref().unwrap().impostor_id.clone();

    for client in &mut clients {
        let player_id = client.player_id(&state);
        let view = client.last_room_state().expect("every member got state");

        // Own entry carries role and (except the impostor) the word;
        // every other entry is redacted.
        let own = &view.players[&player_id];
        assert!(own.role.is_some());
        if player_id == impostor_id {
            assert_eq!(own.role, Some(PlayerRole::Impostor));
            assert_eq!(own.word, None);
        } else {
            assert!(own.word.is_some());
        }
        for (id, other) in &view.players {
            if id != &player_id {
                assert_eq!(other.role, None, "role leaked to {player_id}");
                assert_eq!(other.word, None, "word leaked to {player_id}");
            }
        }

        // Impostor identity and shared word withheld until results.
        let game_state = view.game_state.as_ref().unwrap();
        assert_eq!(game_state.impostor_id, None);
        assert_eq!(game_state.word, None);
    }
}

#[tokio::test]
async fn majority_vote_request_opens_voting() {
    let (state, room_id, mut clients) = room_with_players(&["ana", "bo", "cy", "di", "ed"]).await;
    ready_all(&state, &room_id, &mut clients).await;
    clients[0].send(&state, start_event(&room_id)).await;

    // Skip the reveal timer by driving the engine directly.
    let room = state.store.get(&room_id).await.unwrap();
    state.engine.transition_to_playing(room).await.unwrap();

    let request = ClientEvent::RequestVote {
        room_id: room_id.clone(),
    };
    for client in &clients[0..2] {
        client.send(&state, request.clone()).await;
    }
    assert_eq!(
        state.store.get(&room_id).await.unwrap().phase,
        RoomPhase::Playing,
        "two of five is below the threshold"
    );

    clients[2].send(&state, request.clone()).await;
    assert_eq!(
        state.store.get(&room_id).await.unwrap().phase,
        RoomPhase::Voting,
        "three of five reaches floor(5/2)+1"
    );
}

#[tokio::test]
async fn voting_produces_results_once_everyone_voted() {
    let (state, room_id, mut clients) = room_with_players(&["ana", "bo", "cy"]).await;
    ready_all(&state, &room_id, &mut clients).await;
    clients[0].send(&state, start_event(&room_id)).await;

    let room = state.store.get(&room_id).await.unwrap();
    let room = state.engine.transition_to_playing(room).await.unwrap();
    state.engine.transition_to_voting(room).await.unwrap();

    // Self-votes are rejected.
    let ana_id = clients[0].player_id(&state);
    clients[0]
        .send(
            &state,
            ClientEvent::Vote {
                room_id: room_id.clone(),
                voted_for_id: ana_id.clone(),
            },
        )
        .await;
    assert_eq!(clients[0].errors(), vec!["cannot vote for yourself"]);

    // Everyone votes for ana.
    for client in &clients[1..] {
        client
            .send(
                &state,
                ClientEvent::Vote {
                    room_id: room_id.clone(),
                    voted_for_id: ana_id.clone(),
                },
            )
            .await;
    }
    let bo_id = clients[1].player_id(&state);
    clients[0]
        .send(
            &state,
            ClientEvent::Vote {
                room_id: room_id.clone(),
                voted_for_id: bo_id,
            },
        )
        .await;

    let room = state.store.get(&room_id).await.unwrap();
    assert_eq!(room.phase, RoomPhase::Results);
    let game_state = room.game_state.as_ref().unwrap();
    assert_eq!(game_state.most_voted_id.as_deref(), Some(ana_id.as_str()));
    assert!(game_state.result.is_some());

    // Vote progress events reached the room along the way.
    let events = clients[2].drain();
    assert!(
        events
            .iter()
            .any(|e| matches!(e, ServerEvent::VoteUpdate { .. }))
    );

    // At results time the projection reveals the impostor and the word.
    let view = clients[0].last_room_state().unwrap();
    let revealed = view.game_state.as_ref().unwrap();
    assert!(revealed.impostor_id.is_some());
    assert!(revealed.word.is_some());
}

#[tokio::test]
async fn back_to_lobby_is_host_only_and_results_only() {
    let (state, room_id, mut clients) = room_with_players(&["ana", "bo", "cy"]).await;
    ready_all(&state, &room_id, &mut clients).await;

    let back = ClientEvent::BackToLobby {
        room_id: room_id.clone(),
    };

    // Wrong phase first.
    clients[0].send(&state, back.clone()).await;
    assert_eq!(
        clients[0].errors(),
        vec!["action requires results phase (room is in waiting)"]
    );

    clients[0].send(&state, start_event(&room_id)).await;
    let room = state.store.get(&room_id).await.unwrap();
    let room = state.engine.transition_to_playing(room).await.unwrap();
    let room = state.engine.transition_to_voting(room).await.unwrap();
    state.engine.calculate_results(room).await.unwrap();

    // Non-host next.
    clients[1].send(&state, back.clone()).await;
    assert_eq!(clients[1].errors(), vec!["only the host can return to lobby"]);

    // Host succeeds; everything resets.
    clients[0].send(&state, back).await;
    let room = state.store.get(&room_id).await.unwrap();
    assert_eq!(room.phase, RoomPhase::Waiting);
    assert!(room.game_state.is_none());
    assert!(room.players.values().all(|p| p.role.is_none()));
}

#[tokio::test]
async fn game_event_passthrough_requires_membership() {
    let (state, room_id, mut clients) = room_with_players(&["ana", "bo"]).await;

    clients[0]
        .send(
            &state,
            ClientEvent::GameEvent {
                room_id: "some-other-room".to_string(),
                event_type: "emote".to_string(),
                payload: serde_json::json!({"kind": "wave"}),
            },
        )
        .await;
    assert_eq!(clients[0].errors(), vec!["not in this room"]);

    clients[0]
        .send(
            &state,
            ClientEvent::GameEvent {
                room_id: room_id.clone(),
                event_type: "emote".to_string(),
                payload: serde_json::json!({"kind": "wave"}),
            },
        )
        .await;
    let events = clients[1].drain();
    assert!(events.iter().any(|e| matches!(
        e,
        ServerEvent::GameEvent { event_type, .. } if event_type == "emote"
    )));
}

#[tokio::test(start_paused = true)]
async fn round_auto_advances_on_timers_alone() {
    let (state, room_id, mut clients) = room_with_players(&["ana", "bo", "cy"]).await;
    ready_all(&state, &room_id, &mut clients).await;
    clients[0].send(&state, start_event(&room_id)).await;
    assert_eq!(
        state.store.get(&room_id).await.unwrap().phase,
        RoomPhase::RoleReveal
    );

    tokio::time::sleep(Duration::from_secs(11)).await;
    assert_eq!(
        state.store.get(&room_id).await.unwrap().phase,
        RoomPhase::Playing
    );

    tokio::time::sleep(Duration::from_secs(301)).await;
    assert_eq!(
        state.store.get(&room_id).await.unwrap().phase,
        RoomPhase::Voting
    );

    tokio::time::sleep(Duration::from_secs(61)).await;
    let room = state.store.get(&room_id).await.unwrap();
    assert_eq!(room.phase, RoomPhase::Results);
    // Nobody voted: the impostor escapes by default.
    let game_state = room.game_state.unwrap();
    assert_eq!(game_state.most_voted_id, None);
    assert!(game_state.result.is_some());
}

#[tokio::test]
async fn host_overrides_apply_at_start() {
    let (state, room_id, mut clients) = room_with_players(&["ana", "bo", "cy"]).await;
    ready_all(&state, &room_id, &mut clients).await;

    clients[0]
        .send(
            &state,
            ClientEvent::StartGame {
                room_id: room_id.clone(),
                language: None,
                category_ids: Some(vec![1]),
                settings: Some(wordspy::protocol::StartSettings {
                    detective_enabled: true,
                    joker_enabled: false,
                    voting_time: 45,
                    discussion_timer_enabled: true,
                    discussion_time: 120,
                }),
            },
        )
        .await;

    let room = state.store.get(&room_id).await.unwrap();
    assert!(room.settings.detective_enabled);
    assert_eq!(room.settings.voting_time, 45);
    assert!(room.settings.discussion_timer_enabled);
    assert_eq!(room.settings.discussion_time, 120);
    assert!(room.game_state.unwrap().detective_id.is_some());
}
