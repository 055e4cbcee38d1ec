//! Server host for transport-agnostic API exposure
//!
//! `ServerHost` holds everything a request needs once startup is done: the
//! validated configuration, the schema registry, the resource controller and
//! the principal resolver. Exposures read from it; nothing mutates it.

use crate::config::RestConfig;
use crate::core::adapter::DomainFetchAdapter;
use crate::core::auth::{AuthProvider, PermissionGate};
use crate::core::controller::ResourceController;
use crate::core::schema::SchemaRegistry;
use crate::server::handlers::ApiState;
use crate::server::resource_registry::ResourceRegistry;
use anyhow::Result;
use std::sync::Arc;

/// Host context containing all framework state
///
/// # Example
///
/// ```rust,ignore
/// let host = ServerHost::from_builder_components(
///     config,
///     Arc::new(InMemoryDirectory::new()),
///     Arc::new(AllowAll),
///     Arc::new(NoAuthProvider),
///     ResourceRegistry::from_config(&config),
/// )?;
///
/// let app = RestExposure::build_router(Arc::new(host), vec![])?;
/// ```
pub struct ServerHost {
    /// Validated deployment configuration
    pub config: Arc<RestConfig>,

    /// Schemas of every resource kind
    pub schemas: Arc<SchemaRegistry>,

    /// Per-request pipeline
    pub controller: ResourceController,

    /// Principal resolution for incoming requests
    pub auth_provider: Arc<dyn AuthProvider>,

    /// Resource descriptors to mount
    pub resource_registry: ResourceRegistry,
}

impl ServerHost {
    /// Build the host from builder components
    ///
    /// Fails when the configuration does not pass validation.
    pub fn from_builder_components(
        config: RestConfig,
        adapter: Arc<dyn DomainFetchAdapter>,
        gate: Arc<dyn PermissionGate>,
        auth_provider: Arc<dyn AuthProvider>,
        resource_registry: ResourceRegistry,
    ) -> Result<Self> {
        config.check()?;

        let config = Arc::new(config);
        let schemas = Arc::new(SchemaRegistry::new(&config));
        let controller = ResourceController::new(config.clone(), schemas.clone(), adapter, gate);

        Ok(Self {
            config,
            schemas,
            controller,
            auth_provider,
            resource_registry,
        })
    }

    /// Handler state derived from the host
    pub fn api_state(&self) -> ApiState {
        ApiState {
            controller: self.controller.clone(),
            schemas: self.schemas.clone(),
            auth: self.auth_provider.clone(),
        }
    }

    /// Components whose routes will be mounted
    pub fn mounted_components(&self) -> Vec<&str> {
        self.resource_registry
            .components()
            .into_iter()
            .filter(|c| *c == "core" || self.config.is_active(c))
            .collect()
    }
}
