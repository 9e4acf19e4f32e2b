//! Connection admission and disconnect cleanup.

use std::time::Duration;

use chat_gateway::application::dto::ServerEvent;
use chat_gateway::presentation::websocket::ClientEvent;
use pretty_assertions::assert_eq;
use tokio::sync::mpsc;

use chat_gateway::presentation::websocket::ConnectionHandle;

use crate::common::{TestGateway, GENERAL, RANDOM};

#[tokio::test]
async fn test_connection_starts_without_room_or_scope() {
    let gateway = TestGateway::new();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let handle = ConnectionHandle::open(gateway.services.clone(), gateway.member(1, "alice"), tx, 8);

    match rx.recv().await {
        Some(ServerEvent::Ready(ready)) => {
            assert_eq!(ready.connection_id, handle.id());
            assert_eq!(ready.user.id, "1");
            assert_eq!(ready.user.display_name, "alice");
        }
        other => panic!("expected ready, got {:?}", other),
    }
    let registry = &gateway.services.registry;
    assert!(registry.is_registered(handle.id()));
    assert_eq!(registry.current_room(handle.id()), None);
    assert_eq!(registry.connection_count(), 1);

    handle.close().await;
    assert_eq!(gateway.services.registry.connection_count(), 0);
}

#[tokio::test]
async fn test_disconnect_announces_user_left_exactly_once() {
    let gateway = TestGateway::new();
    let mut alice = gateway.connect_in(gateway.member(1, "alice"), GENERAL).await;
    let mut bob = gateway.connect_in(gateway.member(2, "bob"), GENERAL).await;
    let carol = gateway.connect_in(gateway.member(3, "carol"), GENERAL).await;
    let mut dave = gateway.connect_in(gateway.member(4, "dave"), RANDOM).await;

    assert!(matches!(alice.recv().await, ServerEvent::UserJoined(_)));
    assert!(matches!(alice.recv().await, ServerEvent::UserJoined(_)));
    assert!(matches!(bob.recv().await, ServerEvent::UserJoined(_)));

    let carol_id = carol.id();
    carol.close().await;

    for client in [&mut alice, &mut bob] {
        match client.recv().await {
            ServerEvent::UserLeft(user) => assert_eq!(user.user_id, "3"),
            other => panic!("expected user-left, got {:?}", other),
        }
        client.assert_silent().await;
    }
    dave.assert_silent().await;

    let registry = &gateway.services.registry;
    assert!(!registry.is_registered(carol_id));
    assert_eq!(registry.room_members(GENERAL).len(), 2);
}

#[tokio::test]
async fn test_disconnect_without_room_is_silent() {
    let gateway = TestGateway::new();
    let mut alice = gateway.connect_in(gateway.member(1, "alice"), GENERAL).await;
    let bob = gateway.connect(gateway.member(2, "bob")).await;

    bob.close().await;

    alice.assert_silent().await;
    assert_eq!(gateway.services.registry.connection_count(), 1);
}

#[tokio::test]
async fn test_disconnect_clears_active_typing() {
    let gateway = TestGateway::new();
    let mut alice = gateway.connect_in(gateway.member(1, "alice"), GENERAL).await;
    let bob = gateway.connect_in(gateway.member(2, "bob"), GENERAL).await;
    assert!(matches!(alice.recv().await, ServerEvent::UserJoined(_)));

    bob.send(ClientEvent::TypingStart).await;
    assert!(matches!(alice.recv().await, ServerEvent::UserTyping(_)));

    bob.close().await;

    assert!(matches!(alice.recv().await, ServerEvent::UserStopTyping(_)));
    assert!(matches!(alice.recv().await, ServerEvent::UserLeft(_)));
    assert_eq!(gateway.services.typing.active_count(), 0);
}

#[tokio::test]
async fn test_last_member_leaving_releases_the_room() {
    let gateway = TestGateway::new();
    let alice = gateway.connect_in(gateway.member(1, "alice"), GENERAL).await;
    assert_eq!(gateway.services.registry.room_count(), 1);

    alice.close().await;

    assert_eq!(gateway.services.registry.room_count(), 0);
    assert_eq!(gateway.services.registry.connection_count(), 0);
    assert_eq!(gateway.services.registry.commit_lock_count(), 0);
}

#[tokio::test]
async fn test_same_user_on_two_connections_is_tracked_separately() {
    let gateway = TestGateway::new();
    let identity = gateway.member(1, "alice");
    let phone = gateway.connect_in(identity.clone(), GENERAL).await;
    let mut laptop = gateway.connect_in(identity, RANDOM).await;
    let phone_id = phone.id();

    phone.close().await;

    let registry = &gateway.services.registry;
    assert!(!registry.is_registered(phone_id));
    assert!(registry.is_registered(laptop.id()));
    assert_eq!(registry.connection_count(), 1);
    laptop.assert_silent().await;
}

#[tokio::test]
async fn test_message_in_flight_at_disconnect_follows_user_left() {
    let gateway = TestGateway::new();
    let mut alice = gateway.connect_in(gateway.member(1, "alice"), GENERAL).await;
    let mut bob = gateway.connect_in(gateway.member(2, "bob"), GENERAL).await;
    let mut carol = gateway.connect_in(gateway.member(3, "carol"), GENERAL).await;
    assert_eq!(alice.drain().await.len(), 2);
    assert_eq!(bob.drain().await.len(), 1);

    gateway.repository.delay_writes(Some(Duration::from_millis(300)));
    bob.say("parting words").await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    bob.close().await;

    for client in [&mut alice, &mut carol] {
        match client.recv().await {
            ServerEvent::UserLeft(user) => assert_eq!(user.user_id, "2"),
            other => panic!("expected user-left, got {:?}", other),
        }
        match client.recv().await {
            ServerEvent::NewMessage(message) => assert_eq!(message.content, "parting words"),
            other => panic!("expected new-message, got {:?}", other),
        }
        client.assert_silent().await;
    }
    assert_eq!(gateway.repository.message_count(GENERAL), 1);
}
