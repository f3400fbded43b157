//! Room membership over the full handler path: joining, passwords,
//! capacity, leaving, host departure, and disconnect cleanup.

mod common;

use common::{TestClient, create_room, room_with_players, test_state};
use wordspy::protocol::{ClientEvent, ServerEvent};
use wordspy::relay::CloseReason;
use wordspy::room::model::{Player, RoomSettings};
use wordspy::room::store::RoomStore;

#[tokio::test]
async fn joining_broadcasts_state_to_the_whole_room() {
    let state = test_state();
    let room = create_room(&state, "ana").await;

    let mut host = TestClient::connect(&state);
    host.join(&state, &room.id, "ana").await;
    assert!(host.last_room_state().is_some());

    let mut guest = TestClient::connect(&state);
    guest.join(&state, &room.id, "bo").await;

    let host_view = host.last_room_state().expect("host sees the join");
    let guest_view = guest.last_room_state().expect("guest sees the room");
    assert_eq!(host_view.players.len(), 2);
    assert_eq!(guest_view.players.len(), 2);
}

#[tokio::test]
async fn join_is_case_insensitive_on_room_id() {
    let state = test_state();
    let room = create_room(&state, "ana").await;
    let flipped: String = room
        .id
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            }
        })
        .collect();

    let mut guest = TestClient::connect(&state);
    guest.join(&state, &flipped, "bo").await;
    let view = guest.last_room_state().expect("joined despite case");
    assert_eq!(view.id, room.id);
}

#[tokio::test]
async fn unknown_room_yields_error_event() {
    let state = test_state();
    let mut client = TestClient::connect(&state);
    client.join(&state, "missing-room", "ana").await;
    assert_eq!(client.errors(), vec!["room not found".to_string()]);
}

#[tokio::test]
async fn private_room_requires_password() {
    let state = test_state();
    let settings = RoomSettings {
        category_ids: vec![1],
        is_public: false,
        password: Some("secret".to_string()),
        ..RoomSettings::default()
    };
    let room = state
        .store
        .create(settings, Player::host("ana"))
        .await
        .unwrap();

    let mut guest = TestClient::connect(&state);
    guest.join(&state, &room.id, "bo").await;
    assert_eq!(guest.errors(), vec!["invalid password".to_string()]);

    guest
        .join_with_password(&state, &room.id, "bo", Some("secret"))
        .await;
    assert!(guest.last_room_state().is_some());
}

#[tokio::test]
async fn full_room_rejects_new_players() {
    let state = test_state();
    let settings = RoomSettings {
        category_ids: vec![1],
        max_players: 3,
        ..RoomSettings::default()
    };
    let room = state
        .store
        .create(settings, Player::host("ana"))
        .await
        .unwrap();

    for name in ["bo", "cy"] {
        let client = TestClient::connect(&state);
        client.join(&state, &room.id, name).await;
    }

    let mut late = TestClient::connect(&state);
    late.join(&state, &room.id, "di").await;
    assert_eq!(late.errors(), vec!["room is full".to_string()]);
}

#[tokio::test]
async fn same_username_reconnects_without_password_or_capacity_checks() {
    let state = test_state();
    let settings = RoomSettings {
        category_ids: vec![1],
        max_players: 3,
        is_public: false,
        password: Some("secret".to_string()),
        ..RoomSettings::default()
    };
    let room = state
        .store
        .create(settings, Player::host("ana"))
        .await
        .unwrap();
    let host_id = room.host_id.clone();

    // Reconnect as the host by username alone: no password supplied.
    let mut host = TestClient::connect(&state);
    host.join(&state, &room.id, "ana").await;
    assert!(host.errors().is_empty());
    assert_eq!(host.player_id(&state), host_id);
    assert_eq!(
        state.store.get(&room.id).await.unwrap().player_count(),
        1,
        "no duplicate player created"
    );
}

#[tokio::test]
async fn guest_leaving_notifies_and_keeps_room() {
    let (state, room_id, mut clients) = room_with_players(&["ana", "bo", "cy"]).await;
    let bo_id = clients[1].player_id(&state);

    clients[1]
        .send(
            &state,
            ClientEvent::LeaveRoom {
                room_id: room_id.clone(),
            },
        )
        .await;

    let events = clients[0].drain();
    assert!(events.iter().any(|e| matches!(
        e,
        ServerEvent::PlayerLeft { player_id, .. } if *player_id == bo_id
    )));
    assert!(
        events
            .iter()
            .any(|e| matches!(e, ServerEvent::RoomState(_)))
    );

    let leaver_events = clients[1].drain();
    assert!(leaver_events.iter().any(|e| matches!(
        e,
        ServerEvent::LeftRoom { room_id: left } if *left == room_id
    )));

    assert_eq!(state.store.get(&room_id).await.unwrap().player_count(), 2);
}

#[tokio::test]
async fn host_leaving_closes_the_room() {
    let (state, room_id, mut clients) = room_with_players(&["ana", "bo", "cy"]).await;

    clients[0]
        .send(
            &state,
            ClientEvent::LeaveRoom {
                room_id: room_id.clone(),
            },
        )
        .await;

    for client in &mut clients[1..] {
        let events = client.drain();
        assert!(
            events.iter().any(|e| matches!(
                e,
                ServerEvent::RoomClosed { reason: CloseReason::HostLeft, .. }
            )),
            "remaining players told the room closed"
        );
    }
    assert!(state.store.get(&room_id).await.is_err(), "room deleted");
}

#[tokio::test]
async fn last_player_leaving_deletes_the_room() {
    let state = test_state();
    let room = create_room(&state, "ana").await;
    let client = TestClient::connect(&state);
    client.join(&state, &room.id, "ana").await;

    client
        .send(
            &state,
            ClientEvent::LeaveRoom {
                room_id: room.id.clone(),
            },
        )
        .await;

    assert!(state.store.get(&room.id).await.is_err());
}

#[tokio::test]
async fn disconnect_runs_the_leave_path() {
    let (state, room_id, mut clients) = room_with_players(&["ana", "bo", "cy"]).await;
    let cy_conn = clients[2].conn;

    wordspy::handlers::room::disconnect(&state, cy_conn).await;

    let events = clients[0].drain();
    assert!(
        events
            .iter()
            .any(|e| matches!(e, ServerEvent::PlayerLeft { .. }))
    );
    assert_eq!(state.store.get(&room_id).await.unwrap().player_count(), 2);
    assert!(state.sessions.session(cy_conn).is_none());
}

#[tokio::test]
async fn rename_validates_and_rejects_duplicates() {
    let (state, room_id, mut clients) = room_with_players(&["ana", "bo"]).await;

    clients[1]
        .send(
            &state,
            ClientEvent::UpdateUsername {
                room_id: room_id.clone(),
                new_username: "   ".to_string(),
            },
        )
        .await;
    assert_eq!(clients[1].errors(), vec!["username cannot be empty"]);

    clients[1]
        .send(
            &state,
            ClientEvent::UpdateUsername {
                room_id: room_id.clone(),
                new_username: "x".repeat(21),
            },
        )
        .await;
    assert_eq!(
        clients[1].errors(),
        vec!["username too long (max 20 characters)"]
    );

    clients[1]
        .send(
            &state,
            ClientEvent::UpdateUsername {
                room_id: room_id.clone(),
                new_username: "Ana".to_string(),
            },
        )
        .await;
    assert_eq!(clients[1].errors(), vec!["username 'Ana' is already taken"]);

    clients[1]
        .send(
            &state,
            ClientEvent::UpdateUsername {
                room_id: room_id.clone(),
                new_username: "bobby".to_string(),
            },
        )
        .await;
    let events = clients[0].drain();
    assert!(events.iter().any(|e| matches!(
        e,
        ServerEvent::UsernameChanged { new_username, .. } if new_username == "bobby"
    )));

    let room = state.store.get(&room_id).await.unwrap();
    assert!(room.player_by_username("bobby").is_some());
}

#[tokio::test]
async fn ready_toggle_flips_and_broadcasts() {
    let (state, room_id, mut clients) = room_with_players(&["ana", "bo"]).await;
    let bo_id = clients[1].player_id(&state);

    clients[1]
        .send(
            &state,
            ClientEvent::ToggleReady {
                room_id: room_id.clone(),
            },
        )
        .await;

    let events = clients[0].drain();
    assert!(events.iter().any(|e| matches!(
        e,
        ServerEvent::PlayerReadyChanged { player_id, is_ready: true, .. } if *player_id == bo_id
    )));
    let room = state.store.get(&room_id).await.unwrap();
    assert!(room.players[&bo_id].is_ready);

    clients[1]
        .send(
            &state,
            ClientEvent::ToggleReady {
                room_id: room_id.clone(),
            },
        )
        .await;
    let room = state.store.get(&room_id).await.unwrap();
    assert!(!room.players[&bo_id].is_ready);
}
