//! Core of the REST layer: schemas, queries, authorization, the adapter
//! contract, response shaping and the per-request controller

pub mod adapter;
pub mod aggregate;
pub mod auth;
pub mod controller;
pub mod error;
pub mod links;
pub mod query;
pub mod schema;
pub mod serialized;
pub mod shaper;
pub mod validation;

pub use adapter::{AdapterError, DomainFetchAdapter, FetchedPage, Record};
pub use auth::{
    Action, AllowAll, AuthPolicy, AuthProvider, HeaderAuthProvider, NoAuthProvider,
    PermissionGate, PolicyGate, Principal,
};
pub use controller::{CollectionResponse, ResourceController};
pub use error::{ErrorResponse, ParameterError, RestError, RestResult};
pub use query::{CollectionQuery, ItemQuery, PaginationMeta, QueryBuilder, RawParams};
pub use schema::{Context, ResourceKind, ResourceSchema, SchemaRegistry};
pub use shaper::{ResponseShaper, ShapeError};
