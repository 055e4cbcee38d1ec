//! Server module for building HTTP servers with the resource routes
//!
//! `ServerBuilder` assembles a [`ServerHost`] from a configuration, a domain
//! adapter, a permission gate and an auth provider, then exposes it over
//! REST:
//! - `GET`/`OPTIONS` routes for every resource of each active component
//! - Health routes (`/health`, `/healthz`)

pub mod builder;
pub mod exposure;
pub mod handlers;
pub mod host;
pub mod resource_registry;
pub mod router;

pub use builder::ServerBuilder;
pub use exposure::RestExposure;
pub use handlers::{ApiState, TOTAL_HEADER, TOTAL_PAGES_HEADER};
pub use host::ServerHost;
pub use resource_registry::{
    CoreResource, GroupResource, MemberResource, ProfileResource, ResourceDescriptor,
    ResourceRegistry,
};
