//! ServerBuilder for fluent API to build HTTP servers

use super::exposure::RestExposure;
use super::host::ServerHost;
use super::resource_registry::{ResourceDescriptor, ResourceRegistry};
use crate::config::RestConfig;
use crate::core::adapter::DomainFetchAdapter;
use crate::core::auth::{AuthProvider, NoAuthProvider, PermissionGate, PolicyGate};
use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Builder for creating HTTP servers exposing the resource routes
///
/// Defaults:
/// - configuration: [`RestConfig::default_config`]
/// - permission gate: [`PolicyGate::from_config`]
/// - auth provider: [`NoAuthProvider`] (every request is anonymous)
///
/// A domain adapter is required.
///
/// # Example
///
/// ```ignore
/// let app = ServerBuilder::new()
///     .with_config(RestConfig::from_yaml_file("config/rest.yaml")?)
///     .with_adapter(InMemoryDirectory::from_yaml_file("config/seed.yaml")?)
///     .with_auth_provider(HeaderAuthProvider)
///     .build()?;
/// ```
pub struct ServerBuilder {
    config: Option<RestConfig>,
    adapter: Option<Arc<dyn DomainFetchAdapter>>,
    gate: Option<Arc<dyn PermissionGate>>,
    auth_provider: Option<Arc<dyn AuthProvider>>,
    extra_resources: Vec<Box<dyn ResourceDescriptor>>,
    custom_routes: Vec<Router>,
}

impl ServerBuilder {
    /// Create a new ServerBuilder
    pub fn new() -> Self {
        Self {
            config: None,
            adapter: None,
            gate: None,
            auth_provider: None,
            extra_resources: Vec::new(),
            custom_routes: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: RestConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Load the configuration from a YAML file
    pub fn with_config_file(self, path: &str) -> Result<Self> {
        Ok(self.with_config(RestConfig::from_yaml_file(path)?))
    }

    /// Set the domain adapter (required)
    pub fn with_adapter(mut self, adapter: impl DomainFetchAdapter + 'static) -> Self {
        self.adapter = Some(Arc::new(adapter));
        self
    }

    /// Replace the configured permission policies with a custom gate
    pub fn with_permission_gate(mut self, gate: impl PermissionGate + 'static) -> Self {
        self.gate = Some(Arc::new(gate));
        self
    }

    pub fn with_auth_provider(mut self, provider: impl AuthProvider + 'static) -> Self {
        self.auth_provider = Some(Arc::new(provider));
        self
    }

    /// Register an additional resource descriptor
    ///
    /// A descriptor for an already registered component replaces the
    /// built-in one.
    pub fn register_resource(mut self, descriptor: impl ResourceDescriptor + 'static) -> Self {
        self.extra_resources.push(Box::new(descriptor));
        self
    }

    /// Add custom routes to the server
    ///
    /// Custom routes are merged at the root, outside the namespace prefix.
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Build the transport-agnostic host
    pub fn build_host(self) -> Result<ServerHost> {
        let adapter = self
            .adapter
            .ok_or_else(|| anyhow::anyhow!("A domain adapter is required. Call .with_adapter()"))?;
        let config = self.config.unwrap_or_else(RestConfig::default_config);

        let gate = match self.gate {
            Some(gate) => gate,
            None => Arc::new(PolicyGate::from_config(&config)?),
        };
        let auth_provider = self
            .auth_provider
            .unwrap_or_else(|| Arc::new(NoAuthProvider));

        let mut registry = ResourceRegistry::from_config(&config);
        for descriptor in self.extra_resources {
            registry.register(descriptor);
        }

        ServerHost::from_builder_components(config, adapter, gate, auth_provider, registry)
    }

    /// Build the final REST router with request tracing and CORS
    pub fn build(mut self) -> Result<Router> {
        let custom_routes = std::mem::take(&mut self.custom_routes);
        let host = Arc::new(self.build_host()?);
        let app = RestExposure::build_router(host, custom_routes)?;

        Ok(app
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http()))
    }

    /// Serve the application with graceful shutdown
    ///
    /// This will:
    /// - Bind to the provided address
    /// - Start serving requests
    /// - Handle SIGTERM and SIGINT (Ctrl+C) for graceful shutdown
    pub async fn serve(self, addr: &str) -> Result<()> {
        let app = self.build()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves on Ctrl+C or SIGTERM
///
/// A signal handler that cannot be installed never resolves, so the server
/// keeps running until the other signal arrives.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
