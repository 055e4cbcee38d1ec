//! # bp-rest
//!
//! A read-only REST layer over a social directory: groups, members and
//! extended profile field groups, fields and per-user values.
//!
//! ## Features
//!
//! - **Schema-driven**: every resource kind has a static schema that drives
//!   parameter validation, context filtering and the `OPTIONS` document
//! - **Typed queries**: raw query strings are sanitized and validated into
//!   typed collection and item queries before anything is fetched
//! - **Pluggable storage**: the domain store is reached through the
//!   [`DomainFetchAdapter`](core::DomainFetchAdapter) trait
//! - **Pluggable authorization**: a [`PermissionGate`](core::PermissionGate)
//!   decides per resource kind and action
//! - **Hyperlinked output**: every item carries `self`/`collection` links and
//!   cross-resource `author`/`up` links where they apply
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bp_rest::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let directory = InMemoryDirectory::new();
//!     directory.add_group(my_group)?;
//!
//!     ServerBuilder::new()
//!         .with_config(RestConfig::default_config())
//!         .with_adapter(directory)
//!         .serve("127.0.0.1:8080")
//!         .await
//! }
//! ```

pub mod config;
pub mod core;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        adapter::{
            AdapterError, CoreRecord, DomainFetchAdapter, FetchedPage, FieldData,
            FieldGroupRecord, FieldRecord, GroupRecord, MemberRecord, Record, StoredFlag,
            StoredInt,
        },
        auth::{
            Action, AllowAll, AuthPolicy, AuthProvider, HeaderAuthProvider, NoAuthProvider,
            PermissionGate, PolicyGate, Principal,
        },
        controller::{CollectionResponse, ResourceController},
        error::{RestError, RestResult},
        query::{CollectionQuery, ItemQuery, RawParams},
        schema::{Context, ResourceKind, SchemaRegistry},
    };

    // === Storage ===
    pub use crate::storage::InMemoryDirectory;

    // === Config ===
    pub use crate::config::RestConfig;

    // === Server ===
    pub use crate::server::{ResourceDescriptor, ResourceRegistry, ServerBuilder, ServerHost};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use serde::{Deserialize, Serialize};
}
