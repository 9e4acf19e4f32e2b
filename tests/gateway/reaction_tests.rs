//! Reaction toggles and aggregate broadcasts.

use chat_gateway::application::dto::events::ReactionsPayload;
use chat_gateway::application::dto::ServerEvent;
use chat_gateway::config::{GatewaySettings, ReactionBroadcast};
use pretty_assertions::assert_eq;

use crate::common::{gateway_settings, TestClient, TestGateway, GENERAL, PRIVATE, RANDOM};

async fn next_reactions(client: &mut TestClient) -> ReactionsPayload {
    match client.recv().await {
        ServerEvent::MessageReactionsUpdated(payload) => payload,
        other => panic!("expected message-reactions-updated, got {:?}", other),
    }
}

#[tokio::test]
async fn test_toggle_twice_restores_empty_set() {
    let gateway = TestGateway::new();
    let message = gateway.repository.seed_messages(GENERAL, 1, 1)[0];
    let mut alice = gateway.connect_in(gateway.member(1, "alice"), GENERAL).await;

    alice.react(message, "🔥").await;
    let first = next_reactions(&mut alice).await;
    assert_eq!(first.message_id, message.to_string());
    assert_eq!(first.reactions.len(), 1);
    assert_eq!(first.reactions[0].author_id, "1");
    assert_eq!(first.reactions[0].emoji, "🔥");

    alice.react(message, "🔥").await;
    let second = next_reactions(&mut alice).await;
    assert!(second.reactions.is_empty());
}

#[tokio::test]
async fn test_reactions_from_different_users_accumulate() {
    let gateway = TestGateway::new();
    let message = gateway.repository.seed_messages(GENERAL, 1, 1)[0];
    let mut alice = gateway.connect_in(gateway.member(1, "alice"), GENERAL).await;
    let mut bob = gateway.connect_in(gateway.member(2, "bob"), GENERAL).await;
    assert!(matches!(alice.recv().await, ServerEvent::UserJoined(_)));

    alice.react(message, "👍").await;
    assert_eq!(next_reactions(&mut bob).await.reactions.len(), 1);

    bob.react(message, "👍").await;
    let both = next_reactions(&mut bob).await;
    let authors: Vec<&str> = both.reactions.iter().map(|r| r.author_id.as_str()).collect();
    assert_eq!(authors, vec!["1", "2"]);

    assert_eq!(next_reactions(&mut alice).await.reactions.len(), 1);
    assert_eq!(next_reactions(&mut alice).await.reactions.len(), 2);
}

#[tokio::test]
async fn test_room_scope_reaches_requester_outside_the_room() {
    let gateway = TestGateway::new();
    let message = gateway.repository.seed_messages(GENERAL, 1, 1)[0];
    let mut alice = gateway.connect_in(gateway.member(1, "alice"), GENERAL).await;
    let mut bob = gateway.connect_in(gateway.member(2, "bob"), RANDOM).await;

    bob.react(message, "🎉").await;

    assert_eq!(next_reactions(&mut bob).await.reactions.len(), 1);
    assert_eq!(next_reactions(&mut alice).await.reactions.len(), 1);
    bob.assert_silent().await;
}

#[tokio::test]
async fn test_room_scope_skips_other_rooms() {
    let gateway = TestGateway::new();
    let message = gateway.repository.seed_messages(GENERAL, 1, 1)[0];
    let mut alice = gateway.connect_in(gateway.member(1, "alice"), GENERAL).await;
    let mut carol = gateway.connect_in(gateway.member(3, "carol"), RANDOM).await;

    alice.react(message, "🔥").await;

    next_reactions(&mut alice).await;
    carol.assert_silent().await;
}

#[tokio::test]
async fn test_platform_scope_reaches_every_connection() {
    let gateway = TestGateway::with_settings(GatewaySettings {
        reaction_broadcast: ReactionBroadcast::Platform,
        ..gateway_settings()
    });
    let message = gateway.repository.seed_messages(GENERAL, 1, 1)[0];
    let mut alice = gateway.connect_in(gateway.member(1, "alice"), GENERAL).await;
    let mut carol = gateway.connect_in(gateway.member(3, "carol"), RANDOM).await;
    let mut idle = gateway.connect(gateway.member(4, "dave")).await;

    alice.react(message, "🔥").await;

    next_reactions(&mut alice).await;
    next_reactions(&mut carol).await;
    next_reactions(&mut idle).await;
}

#[tokio::test]
async fn test_unknown_message_is_reported() {
    let gateway = TestGateway::new();
    let mut alice = gateway.connect_in(gateway.member(1, "alice"), GENERAL).await;

    alice.react(424242, "🔥").await;

    assert_eq!(alice.recv_error().await, "message_not_found");
}

#[tokio::test]
async fn test_reacting_in_inaccessible_channel_is_denied() {
    let gateway = TestGateway::new();
    let message = gateway.repository.seed_messages(PRIVATE, 9, 1)[0];
    let mut alice = gateway.connect_in(gateway.member(1, "alice"), GENERAL).await;

    alice.react(message, "🔥").await;

    assert_eq!(alice.recv_error().await, "channel_access_denied");
}

#[tokio::test]
async fn test_invalid_reaction_payloads() {
    let gateway = TestGateway::new();
    let mut alice = gateway.connect_in(gateway.member(1, "alice"), GENERAL).await;

    alice.react(1, "").await;
    assert_eq!(alice.recv_error().await, "invalid_payload");

    alice
        .send_raw(r#"{"event":"add-reaction","data":{"messageId":"nope","emoji":"🔥"}}"#)
        .await;
    assert_eq!(alice.recv_error().await, "invalid_payload");
}

#[tokio::test]
async fn test_store_failure_suppresses_broadcast() {
    let gateway = TestGateway::new();
    let message = gateway.repository.seed_messages(GENERAL, 1, 1)[0];
    let mut alice = gateway.connect_in(gateway.member(1, "alice"), GENERAL).await;
    let mut bob = gateway.connect_in(gateway.member(2, "bob"), GENERAL).await;
    assert!(matches!(alice.recv().await, ServerEvent::UserJoined(_)));

    gateway.repository.fail_writes(true);
    alice.react(message, "🔥").await;

    assert_eq!(alice.recv_error().await, "internal_error");
    bob.assert_silent().await;
}

#[tokio::test]
async fn test_reacting_in_unoccupied_channel_leaves_no_commit_lock() {
    let gateway = TestGateway::new();
    let message = gateway.repository.seed_messages(GENERAL, 1, 1)[0];
    let mut bob = gateway.connect_in(gateway.member(2, "bob"), RANDOM).await;
    assert_eq!(gateway.services.registry.commit_lock_count(), 1);

    bob.react(message, "🎉").await;
    assert_eq!(next_reactions(&mut bob).await.reactions.len(), 1);
    bob.assert_silent().await;

    assert_eq!(gateway.services.registry.commit_lock_count(), 1);
    bob.close().await;
    assert_eq!(gateway.services.registry.commit_lock_count(), 0);
}
