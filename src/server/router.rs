//! Method routers binding a resource kind to the generic handlers
//!
//! - `collection_route`: `GET` list, `OPTIONS` schema
//! - `item_route`: `GET` by `{id}`, `OPTIONS` schema
//! - `singleton_route`: `GET` the single item, `OPTIONS` schema

use crate::core::query::RawParams;
use crate::core::schema::ResourceKind;
use crate::server::handlers::{
    ApiState, describe_resource, get_resource, get_singleton, list_resources,
};
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::{MethodRouter, get};

pub fn collection_route(kind: ResourceKind) -> MethodRouter<ApiState> {
    get(
        move |state: State<ApiState>, headers: HeaderMap, query: Query<RawParams>| {
            list_resources(kind, state, headers, query)
        },
    )
    .options(move |state: State<ApiState>| describe_resource(kind, state))
}

pub fn item_route(kind: ResourceKind) -> MethodRouter<ApiState> {
    get(
        move |state: State<ApiState>,
              path: Path<String>,
              headers: HeaderMap,
              query: Query<RawParams>| {
            get_resource(kind, state, path, headers, query)
        },
    )
    .options(move |state: State<ApiState>| describe_resource(kind, state))
}

pub fn singleton_route(kind: ResourceKind) -> MethodRouter<ApiState> {
    get(
        move |state: State<ApiState>, headers: HeaderMap, query: Query<RawParams>| {
            get_singleton(kind, state, headers, query)
        },
    )
    .options(move |state: State<ApiState>| describe_resource(kind, state))
}
