//! Application Startup
//!
//! Application building and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;

use crate::application::services::GatewayServices;
use crate::config::Settings;
use crate::domain::{ChatRepository, SessionValidator};
use crate::infrastructure::auth::JwtSessionValidator;
use crate::infrastructure::database;
use crate::infrastructure::repositories::PgChatRepository;
use crate::presentation::http::handlers::health;
use crate::presentation::http::routes;
use crate::presentation::middleware::logging;
use crate::shared::snowflake::SnowflakeGenerator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<GatewayServices>,
    pub repository: Arc<dyn ChatRepository>,
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Wire the gateway services to a pair of collaborators.
    pub fn new(
        settings: Settings,
        repository: Arc<dyn ChatRepository>,
        validator: Arc<dyn SessionValidator>,
    ) -> Self {
        let services = Arc::new(GatewayServices::new(
            Arc::clone(&repository),
            validator,
            &settings.gateway,
        ));
        Self {
            services,
            repository,
            settings: Arc::new(settings),
        }
    }
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        // Create database pool
        let db = database::create_pool(&settings.database).await?;
        tracing::info!("Database connection pool created");

        if settings.database.run_migrations {
            database::run_migrations(&db).await?;
            tracing::info!("Database migrations applied");
        }

        // Create snowflake generator
        let snowflake = Arc::new(SnowflakeGenerator::new(
            settings.snowflake.machine_id,
            settings.snowflake.epoch,
        ));

        let repository: Arc<dyn ChatRepository> =
            Arc::new(PgChatRepository::new(db.clone(), snowflake));
        let validator: Arc<dyn SessionValidator> =
            Arc::new(JwtSessionValidator::new(&settings.jwt, db));

        let addr: SocketAddr = settings.server_addr().parse()?;
        let state = AppState::new(settings, repository, validator);

        // Build router with middleware
        let router = routes::create_router(state).layer(logging::create_trace_layer());

        // Bind to address
        let listener = TcpListener::bind(addr).await?;
        health::init_server_start();
        tracing::info!("Listening on {}", addr);

        Ok(Self { listener, router })
    }

    /// Run the server until a shutdown signal arrives
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        tracing::info!("Server stopped");
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
