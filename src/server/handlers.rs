//! HTTP handlers for resource reads
//!
//! Handlers are resource-agnostic: every route binds a [`ResourceKind`] and
//! forwards to the shared [`ResourceController`].

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
};
use serde_json::Value;
use std::sync::Arc;

use crate::core::auth::{Action, AuthProvider, Principal};
use crate::core::controller::ResourceController;
use crate::core::error::{ParameterError, RestError, RestResult};
use crate::core::query::RawParams;
use crate::core::schema::{ResourceKind, SchemaRegistry};

/// Total number of items matching a collection read
pub const TOTAL_HEADER: &str = "x-wp-total";

/// Total number of pages for a collection read
pub const TOTAL_PAGES_HEADER: &str = "x-wp-totalpages";

/// Application state shared across handlers
#[derive(Clone)]
pub struct ApiState {
    pub controller: ResourceController,
    pub schemas: Arc<SchemaRegistry>,
    pub auth: Arc<dyn AuthProvider>,
}

/// `GET` on a collection route
pub async fn list_resources(
    kind: ResourceKind,
    State(state): State<ApiState>,
    headers: HeaderMap,
    Query(raw): Query<RawParams>,
) -> RestResult<Response> {
    let principal = resolve_principal(&state, &headers, kind, Action::List).await?;
    let page = state.controller.list(kind, &raw, &principal).await?;

    let mut response = Json(page.items).into_response();
    if let Some(pagination) = page.pagination {
        let headers = response.headers_mut();
        headers.insert(TOTAL_HEADER, HeaderValue::from(pagination.total));
        headers.insert(TOTAL_PAGES_HEADER, HeaderValue::from(pagination.total_pages));
    }
    Ok(response)
}

/// `GET` on an item route
pub async fn get_resource(
    kind: ResourceKind,
    State(state): State<ApiState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Query(raw): Query<RawParams>,
) -> RestResult<Json<Value>> {
    let id = parse_id(&id)?;
    let principal = resolve_principal(&state, &headers, kind, Action::Read).await?;
    let item = state.controller.get_item(kind, id, &raw, &principal).await?;
    Ok(Json(item))
}

/// `GET` on a route that serves exactly one item (`/core`)
pub async fn get_singleton(
    kind: ResourceKind,
    State(state): State<ApiState>,
    headers: HeaderMap,
    Query(raw): Query<RawParams>,
) -> RestResult<Json<Value>> {
    let principal = resolve_principal(&state, &headers, kind, Action::Read).await?;
    let item = state.controller.get_item(kind, 0, &raw, &principal).await?;
    Ok(Json(item))
}

/// `OPTIONS` on any resource route: the resource's JSON schema
pub async fn describe_resource(kind: ResourceKind, State(state): State<ApiState>) -> Json<Value> {
    Json(state.schemas.schema_for(kind).to_json_schema())
}

/// Credentials that cannot be read are treated as a denial
async fn resolve_principal(
    state: &ApiState,
    headers: &HeaderMap,
    kind: ResourceKind,
    action: Action,
) -> RestResult<Principal> {
    state.auth.principal(headers).await.map_err(|e| {
        tracing::warn!(resource = %kind, %action, "rejecting credentials: {}", e);
        RestError::Forbidden { kind, action }
    })
}

/// Path ids are positive integers
fn parse_id(raw: &str) -> RestResult<u64> {
    raw.trim().parse::<u64>().map_err(|_| {
        ParameterError::InvalidType {
            param: "id".to_string(),
            value: raw.to_string(),
            expected: "integer",
        }
        .into()
    })
}
