//! Common Test Utilities
//!
//! In-memory collaborators, settings and a channel-driven client for
//! exercising the gateway without sockets or a database.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{body::Body, http::Request, Router};
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tower::ServiceExt;

use chat_gateway::application::dto::ServerEvent;
use chat_gateway::application::services::GatewayServices;
use chat_gateway::config::{
    DatabaseSettings, GatewaySettings, JwtSettings, ReactionBroadcast, ServerSettings, Settings,
    SnowflakeSettings, WebSocketSettings,
};
use chat_gateway::domain::{
    Channel, ChannelType, ChatRepository, Identity, Message, NewMessage, Reaction,
    ReactionToggle, SessionValidator,
};
use chat_gateway::presentation::http::create_router;
use chat_gateway::presentation::websocket::{parse_client_event, ClientEvent, ConnectionHandle};
use chat_gateway::shared::error::{AuthFailure, StoreError};
use chat_gateway::startup::AppState;

pub const SERVER: i64 = 1;
pub const OTHER_SERVER: i64 = 2;
pub const GENERAL: i64 = 100;
pub const RANDOM: i64 = 101;
pub const PRIVATE: i64 = 200;

/// How long a test waits for an event it expects.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Default)]
struct StoreState {
    users: HashMap<i64, Identity>,
    members: HashSet<(i64, i64)>,
    channels: HashMap<i64, Channel>,
    messages: Vec<Message>,
    reactions: Vec<Reaction>,
    touched: Vec<i64>,
}

/// In-memory [`ChatRepository`] with failure injection.
#[derive(Default)]
pub struct InMemoryChatRepository {
    state: Mutex<StoreState>,
    next_id: AtomicI64,
    fail_writes: AtomicBool,
    write_delay: Mutex<Option<Duration>>,
}

impl InMemoryChatRepository {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(10_000),
            ..Self::default()
        }
    }

    pub fn add_user(&self, identity: Identity) {
        self.state.lock().users.insert(identity.id, identity);
    }

    pub fn add_member(&self, server_id: i64, user_id: i64) {
        self.state.lock().members.insert((server_id, user_id));
    }

    pub fn remove_member(&self, server_id: i64, user_id: i64) {
        self.state.lock().members.remove(&(server_id, user_id));
    }

    pub fn add_channel(&self, id: i64, server_id: i64, name: &str, position: i32) {
        self.state.lock().channels.insert(
            id,
            Channel {
                id,
                server_id,
                name: name.to_string(),
                channel_type: ChannelType::Text,
                topic: None,
                position,
            },
        );
    }

    /// Seed `count` messages authored by `author_id`, oldest first.
    pub fn seed_messages(&self, channel_id: i64, author_id: i64, count: usize) -> Vec<i64> {
        let mut ids = Vec::with_capacity(count);
        for n in 0..count {
            let message = self.build_message(NewMessage {
                author_id,
                channel_id,
                content: format!("seed {}", n),
                message_type: Default::default(),
            });
            ids.push(message.id);
            self.state.lock().messages.push(message);
        }
        ids
    }

    pub fn message_count(&self, channel_id: i64) -> usize {
        self.state
            .lock()
            .messages
            .iter()
            .filter(|m| m.channel_id == channel_id)
            .count()
    }

    pub fn touched(&self) -> Vec<i64> {
        self.state.lock().touched.clone()
    }

    /// Make writes and the readiness ping fail until reset.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Delay `create_message` and `toggle_reaction`.
    pub fn delay_writes(&self, delay: Option<Duration>) {
        *self.write_delay.lock() = delay;
    }

    fn build_message(&self, new: NewMessage) -> Message {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let author = self
            .state
            .lock()
            .users
            .get(&new.author_id)
            .cloned()
            .unwrap_or_else(|| Identity::new(new.author_id, format!("user{}", new.author_id)));
        Message {
            id,
            channel_id: new.channel_id,
            author_id: new.author_id,
            content: new.content,
            message_type: new.message_type,
            created_at: Utc.timestamp_opt(1_700_000_000 + id, 0).unwrap(),
            author,
            attachments: Vec::new(),
        }
    }

    async fn before_write(&self) -> Result<(), StoreError> {
        let delay = *self.write_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ChatRepository for InMemoryChatRepository {
    async fn is_server_member(&self, user_id: i64, server_id: i64) -> Result<bool, StoreError> {
        Ok(self.state.lock().members.contains(&(server_id, user_id)))
    }

    async fn list_channels(&self, server_id: i64) -> Result<Vec<Channel>, StoreError> {
        let mut channels: Vec<Channel> = self
            .state
            .lock()
            .channels
            .values()
            .filter(|c| c.server_id == server_id)
            .cloned()
            .collect();
        channels.sort_by_key(|c| (c.position, c.id));
        Ok(channels)
    }

    async fn has_channel_access(&self, user_id: i64, channel_id: i64) -> Result<bool, StoreError> {
        let state = self.state.lock();
        Ok(state
            .channels
            .get(&channel_id)
            .map(|c| state.members.contains(&(c.server_id, user_id)))
            .unwrap_or(false))
    }

    async fn list_recent_messages(
        &self,
        channel_id: i64,
        limit: i64,
    ) -> Result<Vec<Message>, StoreError> {
        let state = self.state.lock();
        let mut messages: Vec<Message> = state
            .messages
            .iter()
            .filter(|m| m.channel_id == channel_id)
            .cloned()
            .collect();
        messages.sort_by(|a, b| b.id.cmp(&a.id));
        messages.truncate(limit as usize);
        Ok(messages)
    }

    async fn create_message(&self, message: NewMessage) -> Result<Message, StoreError> {
        self.before_write().await?;
        let message = self.build_message(message);
        self.state.lock().messages.push(message.clone());
        Ok(message)
    }

    async fn touch_channel_activity(&self, channel_id: i64) -> Result<(), StoreError> {
        self.state.lock().touched.push(channel_id);
        Ok(())
    }

    async fn find_message_channel(&self, message_id: i64) -> Result<Option<i64>, StoreError> {
        Ok(self
            .state
            .lock()
            .messages
            .iter()
            .find(|m| m.id == message_id)
            .map(|m| m.channel_id))
    }

    async fn toggle_reaction(
        &self,
        user_id: i64,
        message_id: i64,
        emoji: &str,
    ) -> Result<ReactionToggle, StoreError> {
        self.before_write().await?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();
        let existing = state
            .reactions
            .iter()
            .position(|r| r.author_id == user_id && r.message_id == message_id && r.emoji == emoji);
        match existing {
            Some(index) => {
                state.reactions.remove(index);
                Ok(ReactionToggle::Removed)
            }
            None => {
                state.reactions.push(Reaction {
                    id,
                    message_id,
                    author_id: user_id,
                    emoji: emoji.to_string(),
                    created_at: Utc::now(),
                });
                Ok(ReactionToggle::Applied)
            }
        }
    }

    async fn list_reactions(&self, message_id: i64) -> Result<Vec<Reaction>, StoreError> {
        Ok(self
            .state
            .lock()
            .reactions
            .iter()
            .filter(|r| r.message_id == message_id)
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected failure".into()));
        }
        Ok(())
    }
}

/// Token-to-identity table standing in for the session store.
#[derive(Default)]
pub struct StaticSessionValidator {
    sessions: Mutex<HashMap<String, Option<Identity>>>,
    unavailable: AtomicBool,
}

impl StaticSessionValidator {
    pub fn issue(&self, token: &str, identity: Identity) {
        self.sessions
            .lock()
            .insert(token.to_string(), Some(identity));
    }

    /// A valid credential whose user was deleted.
    pub fn issue_orphan(&self, token: &str) {
        self.sessions.lock().insert(token.to_string(), None);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl SessionValidator for StaticSessionValidator {
    async fn validate(&self, credential: &str) -> Result<Identity, AuthFailure> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AuthFailure::Unavailable("session store down".into()));
        }
        match self.sessions.lock().get(credential) {
            Some(Some(identity)) => Ok(identity.clone()),
            Some(None) => Err(AuthFailure::UserNotFound),
            None => Err(AuthFailure::InvalidSession),
        }
    }
}

pub fn gateway_settings() -> GatewaySettings {
    GatewaySettings {
        history_limit: 50,
        persistence_timeout_ms: 500,
        typing_ttl_secs: 10,
        reaction_broadcast: ReactionBroadcast::Room,
    }
}

pub fn test_settings(gateway: GatewaySettings) -> Settings {
    Settings {
        server: ServerSettings {
            host: "127.0.0.1".into(),
            port: 0,
        },
        database: DatabaseSettings {
            url: "postgres://localhost/chat_test".into(),
            max_connections: 1,
            min_connections: 0,
            acquire_timeout: 1,
            run_migrations: false,
        },
        jwt: JwtSettings {
            secret: "test-secret-key-that-is-at-least-32-bytes".into(),
        },
        snowflake: SnowflakeSettings {
            machine_id: 1,
            epoch: 1420070400000,
        },
        websocket: WebSocketSettings {
            max_message_size: 65536,
            max_frame_size: 16384,
            heartbeat_interval_ms: 30000,
            idle_timeout_ms: 90000,
            inbound_queue_size: 32,
        },
        gateway,
        environment: "test".into(),
    }
}

/// Gateway services wired to in-memory collaborators, plus a standard
/// fixture: server 1 with `general` and `random`, server 2 with `private`.
pub struct TestGateway {
    pub services: Arc<GatewayServices>,
    pub repository: Arc<InMemoryChatRepository>,
    pub validator: Arc<StaticSessionValidator>,
    pub settings: GatewaySettings,
}

impl TestGateway {
    pub fn new() -> Self {
        Self::with_settings(gateway_settings())
    }

    pub fn with_settings(settings: GatewaySettings) -> Self {
        let repository = Arc::new(InMemoryChatRepository::new());
        let validator = Arc::new(StaticSessionValidator::default());

        repository.add_channel(GENERAL, SERVER, "general", 0);
        repository.add_channel(RANDOM, SERVER, "random", 1);
        repository.add_channel(PRIVATE, OTHER_SERVER, "private", 0);

        let services = Arc::new(GatewayServices::new(
            repository.clone(),
            validator.clone(),
            &settings,
        ));

        Self {
            services,
            repository,
            validator,
            settings,
        }
    }

    /// Create a user that belongs to server 1.
    pub fn member(&self, id: i64, username: &str) -> Identity {
        let identity = Identity::new(id, username);
        self.repository.add_user(identity.clone());
        self.repository.add_member(SERVER, id);
        identity
    }

    /// Create an anonymous member of server 1.
    pub fn anonymous_member(&self, id: i64, username: &str, alias: &str) -> Identity {
        let identity = Identity {
            anonymous: true,
            anonymous_alias: Some(alias.to_string()),
            ..Identity::new(id, username)
        };
        self.repository.add_user(identity.clone());
        self.repository.add_member(SERVER, id);
        identity
    }

    /// Open a connection and consume its `ready` event.
    pub async fn connect(&self, identity: Identity) -> TestClient {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = ConnectionHandle::open(self.services.clone(), identity, tx, 32);
        let mut client = TestClient { handle, rx };
        match client.recv().await {
            ServerEvent::Ready(_) => {}
            other => panic!("expected ready, got {:?}", other),
        }
        client
    }

    /// Connect and join `channel_id`, consuming the history reply.
    pub async fn connect_in(&self, identity: Identity, channel_id: i64) -> TestClient {
        let mut client = self.connect(identity).await;
        client.join_channel(channel_id).await;
        match client.recv().await {
            ServerEvent::ChannelMessages(_) => {}
            other => panic!("expected channel-messages, got {:?}", other),
        }
        client
    }

    /// HTTP router backed by the same collaborators.
    pub fn router(&self) -> Router {
        let state = AppState::new(
            test_settings(self.settings.clone()),
            self.repository.clone(),
            self.validator.clone(),
        );
        create_router(state)
    }
}

/// A connection driven over channels instead of a socket.
pub struct TestClient {
    pub handle: ConnectionHandle,
    pub rx: mpsc::UnboundedReceiver<ServerEvent>,
}

impl TestClient {
    pub async fn send(&self, event: ClientEvent) {
        assert!(self.handle.submit(Ok(event)).await, "session stopped");
    }

    /// Send a raw text frame through the wire decoder.
    pub async fn send_raw(&self, text: &str) {
        assert!(
            self.handle.submit(parse_client_event(text)).await,
            "session stopped"
        );
    }

    pub async fn join_server(&self, server_id: i64) {
        self.send(ClientEvent::JoinServer { server_id }).await;
    }

    pub async fn join_channel(&self, channel_id: i64) {
        self.send(ClientEvent::JoinChannel { channel_id }).await;
    }

    pub async fn say(&self, content: &str) {
        self.send_raw(&format!(
            r#"{{"event":"send-message","data":{{"content":{}}}}}"#,
            serde_json::Value::String(content.to_string())
        ))
        .await;
    }

    pub async fn react(&self, message_id: i64, emoji: &str) {
        self.send_raw(&format!(
            r#"{{"event":"add-reaction","data":{{"messageId":"{}","emoji":{}}}}}"#,
            message_id,
            serde_json::Value::String(emoji.to_string())
        ))
        .await;
    }

    /// Next event, failing the test if none arrives in time.
    pub async fn recv(&mut self) -> ServerEvent {
        tokio::time::timeout(RECV_TIMEOUT, self.rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("outbound channel closed")
    }

    /// Next `error` event's code.
    pub async fn recv_error(&mut self) -> &'static str {
        match self.recv().await {
            ServerEvent::Error(error) => error.code,
            other => panic!("expected error, got {:?}", other),
        }
    }

    /// Assert nothing is queued after giving in-flight work a moment.
    pub async fn assert_silent(&mut self) {
        tokio::time::sleep(Duration::from_millis(50)).await;
        if let Ok(event) = self.rx.try_recv() {
            panic!("unexpected event: {:?}", event);
        }
    }

    /// Everything queued after giving in-flight work a moment.
    pub async fn drain(&mut self) -> Vec<ServerEvent> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }

    pub fn id(&self) -> uuid::Uuid {
        self.handle.id()
    }

    pub async fn close(self) {
        self.handle.close().await;
    }
}

/// Issue a GET through the router.
pub async fn get(router: &Router, uri: &str) -> axum::response::Response {
    router
        .clone()
        .oneshot(Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// Issue a GET with extra headers.
pub async fn get_with_headers(
    router: &Router,
    uri: &str,
    headers: &[(&str, &str)],
) -> axum::response::Response {
    let mut builder = Request::builder().method("GET").uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    router
        .clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
