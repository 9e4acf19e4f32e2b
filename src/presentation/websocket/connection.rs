//! Gateway connection actor
//!
//! Each admitted socket gets one session task that owns its
//! [`ConnectionState`] and handles inbound events strictly one at a time.
//! The transport reader feeds it through a bounded queue; outbound events
//! flow through the presence registry into the connection's outbound queue.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::messages::ClientEvent;
use crate::application::dto::ServerEvent;
use crate::application::services::{GatewayServices, Outbound};
use crate::application::session::{ConnectionId, ConnectionState};
use crate::domain::Identity;
use crate::infrastructure::metrics;
use crate::shared::error::{ErrorKind, GatewayError};

/// A decoded frame, or the protocol error decoding produced.
pub type InboundFrame = Result<ClientEvent, GatewayError>;

/// Handle to a running connection.
pub struct ConnectionHandle {
    id: ConnectionId,
    user_id: i64,
    inbound: mpsc::Sender<InboundFrame>,
    task: JoinHandle<()>,
    services: Arc<GatewayServices>,
}

impl ConnectionHandle {
    /// Register the identity and start its session task.
    ///
    /// `ready` is queued on `outbound` before this returns.
    pub fn open(
        services: Arc<GatewayServices>,
        identity: Identity,
        outbound: Outbound,
        queue_size: usize,
    ) -> Self {
        let state = services.presence.connect(identity, outbound);
        let (inbound, rx) = mpsc::channel(queue_size.max(1));

        Self {
            id: state.id,
            user_id: state.user_id(),
            inbound,
            task: tokio::spawn(run_session(Arc::clone(&services), state, rx)),
            services,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    /// Queue a frame for the session task. Waits while the queue is full.
    ///
    /// Returns `false` once the session has stopped.
    pub async fn submit(&self, frame: InboundFrame) -> bool {
        self.inbound.send(frame).await.is_ok()
    }

    /// Tear the connection down.
    ///
    /// Presence cleanup runs before this waits on the session task, so
    /// peers see `user-left` right away. An event already in flight
    /// completes; queued ones are dropped.
    pub async fn close(self) {
        self.services.presence.disconnect(self.id);
        drop(self.inbound);
        if let Err(e) = self.task.await {
            tracing::error!(connection_id = %self.id, error = %e, "Session task failed");
        }
    }
}

async fn run_session(
    services: Arc<GatewayServices>,
    mut state: ConnectionState,
    mut inbound: mpsc::Receiver<InboundFrame>,
) {
    while let Some(frame) = inbound.recv().await {
        if !services.registry.is_registered(state.id) {
            break;
        }

        let result = match frame {
            Ok(event) => {
                metrics::record_event_received(event.event_name());
                dispatch(&services, &mut state, event).await
            }
            Err(e) => {
                metrics::record_event_received("invalid");
                Err(e)
            }
        };

        if let Err(error) = result {
            report(&services, &state, &error);
        }
    }

    tracing::debug!(connection_id = %state.id, "Session task stopped");
}

async fn dispatch(
    services: &GatewayServices,
    state: &mut ConnectionState,
    event: ClientEvent,
) -> Result<(), GatewayError> {
    match event {
        ClientEvent::JoinServer { server_id } => {
            services.subscriptions.join_server(state, server_id).await
        }
        ClientEvent::JoinChannel { channel_id } => {
            services.subscriptions.join_channel(state, channel_id).await
        }
        ClientEvent::SendMessage(request) => services
            .messages
            .send_message(state, request)
            .await
            .map(|_| ()),
        ClientEvent::TypingStart => {
            services.typing.start(state);
            Ok(())
        }
        ClientEvent::TypingStop => {
            services.typing.stop(state);
            Ok(())
        }
        ClientEvent::AddReaction(request) => services
            .reactions
            .toggle_reaction(state, request)
            .await
            .map(|_| ()),
    }
}

fn report(services: &GatewayServices, state: &ConnectionState, error: &GatewayError) {
    metrics::record_gateway_error(error.code());
    match error.kind() {
        ErrorKind::Collaborator => {
            tracing::warn!(connection_id = %state.id, user_id = state.user_id(), error = %error, "Event failed")
        }
        _ => {
            tracing::debug!(connection_id = %state.id, user_id = state.user_id(), error = %error, "Event rejected")
        }
    }
    services.registry.send_to(state.id, ServerEvent::from(error));
}
