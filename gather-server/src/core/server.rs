//! Server Implementation
//!
//! HTTP 服务器启动和管理

use crate::core::{Config, ServerState};
use crate::utils::{AppError, AppResult};
use axum_server::Handle;
use std::time::Duration;

/// HTTP Server
pub struct Server {
    config: Config,
    state: ServerState,
}

impl Server {
    /// Create server around an already-initialized state
    pub fn with_state(config: Config, state: ServerState) -> Self {
        Self { config, state }
    }

    pub async fn run(&self) -> AppResult<()> {
        let state = self.state.clone();

        // Start background tasks
        state.start_background_tasks();

        let app = crate::api::build_app(&state).with_state(state.clone());

        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        tracing::info!("Gather Server listening on {}", addr);

        // Graceful shutdown on Ctrl-C: stop accepting, drain, stop tasks
        let handle = Handle::new();
        let shutdown_handle = handle.clone();
        let bus = state.message_bus.clone();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down...");
            bus.shutdown();
            shutdown_handle.graceful_shutdown(Some(Duration::from_secs(10)));
        });

        axum_server::bind(addr)
            .handle(handle)
            .serve(app.into_make_service())
            .await
            .map_err(|e| AppError::Internal(format!("Server error: {e}")))?;

        Ok(())
    }
}
