//! REST API exposure
//!
//! Consumes a `ServerHost` and produces an Axum `Router`: resource routes
//! nested under the namespace prefix, health checks and custom routes at
//! the root.

use super::super::host::ServerHost;
use anyhow::Result;
use axum::{Json, Router, routing::get};
use serde_json::{Value, json};
use std::sync::Arc;

/// REST API exposure implementation
pub struct RestExposure;

impl RestExposure {
    /// Build the REST router from a host
    ///
    /// Returns a router with:
    /// - Health check routes
    /// - Resource routes of every active component under the route prefix
    /// - Custom routes
    pub fn build_router(host: Arc<ServerHost>, custom_routes: Vec<Router>) -> Result<Router> {
        let prefix = host.config.route_prefix();
        let resource_routes = host
            .resource_registry
            .build_routes(&host.config)
            .with_state(host.api_state());

        tracing::debug!(
            prefix = %prefix,
            components = ?host.mounted_components(),
            "mounting resource routes"
        );

        let mut app = Self::health_routes().nest(&prefix, resource_routes);

        for custom_router in custom_routes {
            app = app.merge(custom_router);
        }

        Ok(app)
    }

    /// Build health check routes
    fn health_routes() -> Router {
        Router::new()
            .route("/health", get(Self::health_check))
            .route("/healthz", get(Self::health_check))
    }

    /// Health check endpoint handler
    async fn health_check() -> Json<Value> {
        Json(json!({
            "status": "ok",
            "service": env!("CARGO_PKG_NAME")
        }))
    }
}
