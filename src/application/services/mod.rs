//! Application Services
//!
//! Gateway services that coordinate the presence registry with the
//! persistence and session collaborators.
//!
//! ## Available Services
//!
//! - **ConnectionAuthenticator**: resolves the upgrade credential to an identity
//! - **PresenceService**: connection registration and disconnect cleanup
//! - **SubscriptionService**: server scope and channel room joins
//! - **MessageRouter**: persist-then-broadcast for chat messages
//! - **TypingCoordinator**: ephemeral typing indicators with expiry
//! - **ReactionAggregator**: reaction toggles and aggregate broadcasts

pub mod auth_service;
pub mod message_service;
pub mod presence_registry;
pub mod presence_service;
pub mod reaction_service;
pub mod subscription_service;
pub mod typing_service;

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub use auth_service::ConnectionAuthenticator;
pub use message_service::MessageRouter;
pub use presence_registry::{Departure, Outbound, PresenceRegistry, RoomCommit};
pub use presence_service::PresenceService;
pub use reaction_service::ReactionAggregator;
pub use subscription_service::SubscriptionService;
pub use typing_service::TypingCoordinator;

use crate::config::GatewaySettings;
use crate::domain::{ChatRepository, SessionValidator};
use crate::infrastructure::metrics;
use crate::shared::error::{GatewayError, StoreError};

/// Every gateway service, wired to one registry and one set of collaborators.
pub struct GatewayServices {
    pub registry: Arc<PresenceRegistry>,
    pub auth: ConnectionAuthenticator,
    pub presence: PresenceService,
    pub subscriptions: SubscriptionService,
    pub messages: MessageRouter,
    pub typing: TypingCoordinator,
    pub reactions: ReactionAggregator,
}

impl GatewayServices {
    pub fn new(
        repository: Arc<dyn ChatRepository>,
        validator: Arc<dyn SessionValidator>,
        settings: &GatewaySettings,
    ) -> Self {
        let registry = Arc::new(PresenceRegistry::new());
        let timeout = settings.persistence_timeout();
        let typing = TypingCoordinator::new(Arc::clone(&registry), settings.typing_ttl());

        Self {
            auth: ConnectionAuthenticator::new(validator, timeout),
            presence: PresenceService::new(Arc::clone(&registry), typing.clone()),
            subscriptions: SubscriptionService::new(
                Arc::clone(&registry),
                Arc::clone(&repository),
                typing.clone(),
                settings.history_limit,
                timeout,
            ),
            messages: MessageRouter::new(
                Arc::clone(&registry),
                Arc::clone(&repository),
                typing.clone(),
                timeout,
            ),
            reactions: ReactionAggregator::new(
                Arc::clone(&registry),
                repository,
                settings.reaction_broadcast,
                timeout,
            ),
            typing,
            registry,
        }
    }
}

/// Await a persistence call with an upper bound on its duration.
///
/// Elapsed calls surface as [`GatewayError::Timeout`]; the caller performs
/// no state change or broadcast in either failure case.
pub(crate) async fn bounded<T, F>(
    operation: &'static str,
    limit: Duration,
    call: F,
) -> Result<T, GatewayError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    let started = Instant::now();
    let outcome = tokio::time::timeout(limit, call).await;
    metrics::record_collaborator_call(operation, started.elapsed().as_secs_f64());

    match outcome {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            tracing::warn!(operation, error = %e, "Persistence call failed");
            Err(e.into())
        }
        Err(_) => {
            tracing::warn!(operation, timeout_ms = limit.as_millis() as u64, "Persistence call timed out");
            Err(GatewayError::Timeout(operation))
        }
    }
}
