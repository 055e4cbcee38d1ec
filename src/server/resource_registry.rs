//! Resource registry for managing resource descriptors and their read routes

use crate::config::RestConfig;
use crate::core::schema::ResourceKind;
use crate::server::handlers::ApiState;
use crate::server::router::{collection_route, item_route, singleton_route};
use axum::Router;
use std::collections::BTreeMap;

/// Trait that describes how to build routes for one component's resources
///
/// Paths are relative to the namespace prefix (e.g. `/groups`, not
/// `/buddypress/v1/groups`).
pub trait ResourceDescriptor: Send + Sync {
    /// Component owning the routes; inactive components are not mounted
    fn component(&self) -> &str;

    /// Resource kinds served by the routes
    fn kinds(&self) -> Vec<ResourceKind>;

    fn build_routes(&self) -> Router<ApiState>;
}

/// `GET /core`
pub struct CoreResource;

impl ResourceDescriptor for CoreResource {
    fn component(&self) -> &str {
        "core"
    }

    fn kinds(&self) -> Vec<ResourceKind> {
        vec![ResourceKind::Core]
    }

    fn build_routes(&self) -> Router<ApiState> {
        Router::new().route("/core", singleton_route(ResourceKind::Core))
    }
}

/// `GET /{base}` and `GET /{base}/{id}`
pub struct GroupResource {
    base: String,
}

impl GroupResource {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }
}

impl ResourceDescriptor for GroupResource {
    fn component(&self) -> &str {
        "groups"
    }

    fn kinds(&self) -> Vec<ResourceKind> {
        vec![ResourceKind::Group]
    }

    fn build_routes(&self) -> Router<ApiState> {
        collection_and_item(&self.base, ResourceKind::Group)
    }
}

/// `GET /{base}` and `GET /{base}/{id}`
pub struct MemberResource {
    base: String,
}

impl MemberResource {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }
}

impl ResourceDescriptor for MemberResource {
    fn component(&self) -> &str {
        "members"
    }

    fn kinds(&self) -> Vec<ResourceKind> {
        vec![ResourceKind::Member]
    }

    fn build_routes(&self) -> Router<ApiState> {
        collection_and_item(&self.base, ResourceKind::Member)
    }
}

/// Extended profile: field groups at `/{base}` and `/{base}/{id}`, single
/// fields at `/{base}/fields/{id}`
pub struct ProfileResource {
    base: String,
}

impl ProfileResource {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }
}

impl ResourceDescriptor for ProfileResource {
    fn component(&self) -> &str {
        "xprofile"
    }

    fn kinds(&self) -> Vec<ResourceKind> {
        vec![ResourceKind::ProfileFieldGroup, ResourceKind::ProfileField]
    }

    fn build_routes(&self) -> Router<ApiState> {
        let base = self.base.trim_matches('/');
        collection_and_item(base, ResourceKind::ProfileFieldGroup).route(
            &format!("/{}/fields/{{id}}", base),
            item_route(ResourceKind::ProfileField),
        )
    }
}

fn collection_and_item(base: &str, kind: ResourceKind) -> Router<ApiState> {
    let base = base.trim_matches('/');
    Router::new()
        .route(&format!("/{}", base), collection_route(kind))
        .route(&format!("/{}/{{id}}", base), item_route(kind))
}

/// Registry for all resources exposed by the application
///
/// Descriptors are keyed by component; registering a component twice
/// replaces the earlier descriptor.
#[derive(Default)]
pub struct ResourceRegistry {
    descriptors: BTreeMap<String, Box<dyn ResourceDescriptor>>,
}

impl ResourceRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            descriptors: BTreeMap::new(),
        }
    }

    /// The built-in resources, using the configured REST bases
    pub fn from_config(config: &RestConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(CoreResource));
        registry.register(Box::new(GroupResource::new(&config.rest_bases.groups)));
        registry.register(Box::new(MemberResource::new(&config.rest_bases.members)));
        registry.register(Box::new(ProfileResource::new(&config.rest_bases.profile)));
        registry
    }

    pub fn register(&mut self, descriptor: Box<dyn ResourceDescriptor>) {
        let component = descriptor.component().to_string();
        self.descriptors.insert(component, descriptor);
    }

    /// Build a router with the routes of every active component
    ///
    /// `core` is always mounted.
    pub fn build_routes(&self, config: &RestConfig) -> Router<ApiState> {
        let mut router = Router::new();

        for (component, descriptor) in &self.descriptors {
            if component == "core" || config.is_active(component) {
                router = router.merge(descriptor.build_routes());
            } else {
                tracing::debug!(component = %component, "component inactive, routes not mounted");
            }
        }

        router
    }

    /// Get all registered components
    pub fn components(&self) -> Vec<&str> {
        self.descriptors.keys().map(|s| s.as_str()).collect()
    }

    /// Get all resource kinds served by registered descriptors
    pub fn kinds(&self) -> Vec<ResourceKind> {
        self.descriptors.values().flat_map(|d| d.kinds()).collect()
    }
}
