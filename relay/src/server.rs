use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use relay_config::Config;
use relay_core::MemoryDao;
use relay_llm::{HttpProviderFactory, LlmState, Registry, llm_router};
use tower_http::trace::TraceLayer;

/// Assembled server with all routes and middleware
pub struct Server {
    router: Router,
    listen_address: SocketAddr,
}

impl Server {
    /// Build the registry and routes from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if no backend could be registered
    pub fn new(config: &Config, listen: Option<SocketAddr>) -> anyhow::Result<Self> {
        let listen_address = listen
            .or(config.server.listen_address)
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

        let factory = HttpProviderFactory::new(Arc::new(MemoryDao::new()));
        let registry = Registry::from_config(&config.llm, &factory)
            .map_err(|e| anyhow::anyhow!("failed to build provider registry: {e}"))?;

        tracing::info!(
            models = registry.models().len(),
            skipped = registry.failures().len(),
            "provider registry ready"
        );

        let router = llm_router(LlmState::new(Arc::new(registry))).layer(TraceLayer::new_for_http());

        Ok(Self { router, listen_address })
    }

    /// Start serving requests
    ///
    /// Blocks until the cancellation token is triggered.
    ///
    /// # Errors
    ///
    /// Returns an error if binding the TCP listener or serving fails
    pub async fn serve(self, shutdown: tokio_util::sync::CancellationToken) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.listen_address).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, "server listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                tracing::info!("graceful shutdown initiated");
            })
            .await?;

        Ok(())
    }
}
