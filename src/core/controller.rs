//! Resource controller
//!
//! Runs one request through
//! `Parsed -> Validated -> Authorized -> Fetched -> Shaped -> Paginated -> Responded`,
//! leaving for `Errored` from any of the first four stages:
//!
//! | from | failure | error |
//! |---|---|---|
//! | Parsed | query builder rejects a parameter | `InvalidParameter` |
//! | Validated | permission gate denies | `Forbidden` |
//! | Authorized | adapter reports a missing item | `InvalidResourceId` |
//! | Authorized | adapter fails or panics | `UpstreamFailure` |
//! | Fetched | record cannot be shaped | `UpstreamFailure` |
//!
//! Nothing is fetched before the gate has allowed the query.

use crate::config::RestConfig;
use crate::core::adapter::{AdapterError, DomainFetchAdapter, FetchedPage, Record};
use crate::core::aggregate::NestedAggregator;
use crate::core::auth::{Action, PermissionGate, Principal, QueryRef};
use crate::core::error::{RestError, RestResult};
use crate::core::query::{
    CollectionQuery, ItemExtras, ItemQuery, PaginationMeta, QueryBuilder, RawParams,
};
use crate::core::schema::{ResourceKind, SchemaRegistry};
use crate::core::shaper::{ResponseShaper, ShapeError, ShapeFlags};
use anyhow::anyhow;
use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::Instrument;

/// Request processing stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Parsed,
    Validated,
    Authorized,
    Fetched,
    Shaped,
    Paginated,
    Responded,
    Errored,
}

/// Tracks and logs the stage of one request
#[derive(Debug)]
struct Transitions {
    stage: Stage,
}

impl Transitions {
    fn start() -> Self {
        tracing::debug!(stage = ?Stage::Parsed, "request parsed");
        Self {
            stage: Stage::Parsed,
        }
    }

    fn advance(&mut self, next: Stage) {
        tracing::debug!(from = ?self.stage, to = ?next, "transition");
        self.stage = next;
    }

    fn fail(&mut self, err: RestError) -> RestError {
        tracing::warn!(
            from = ?self.stage,
            code = err.error_code(),
            status = err.status_code().as_u16(),
            "request failed: {}",
            err
        );
        self.stage = Stage::Errored;
        err
    }
}

/// Shaped items of a collection read
#[derive(Debug, Clone)]
pub struct CollectionResponse {
    pub items: Vec<Value>,

    /// Present only when the total was counted
    pub pagination: Option<PaginationMeta>,
}

/// Orchestrates validation, authorization, fetching and shaping
#[derive(Clone)]
pub struct ResourceController {
    queries: QueryBuilder,
    gate: Arc<dyn PermissionGate>,
    adapter: Arc<dyn DomainFetchAdapter>,
    shaper: ResponseShaper,
    aggregator: NestedAggregator,
}

impl ResourceController {
    pub fn new(
        config: Arc<RestConfig>,
        schemas: Arc<SchemaRegistry>,
        adapter: Arc<dyn DomainFetchAdapter>,
        gate: Arc<dyn PermissionGate>,
    ) -> Self {
        let shaper = ResponseShaper::new(config.clone(), schemas.clone());
        Self {
            queries: QueryBuilder::new(config, schemas),
            gate,
            adapter,
            aggregator: NestedAggregator::new(shaper.clone()),
            shaper,
        }
    }

    /// Collection read
    pub async fn list(
        &self,
        kind: ResourceKind,
        raw: &RawParams,
        principal: &Principal,
    ) -> RestResult<CollectionResponse> {
        let span = tracing::info_span!("rest", resource = %kind, action = %Action::List);
        self.run_list(kind, raw, principal).instrument(span).await
    }

    /// Single-item read
    pub async fn get_item(
        &self,
        kind: ResourceKind,
        id: u64,
        raw: &RawParams,
        principal: &Principal,
    ) -> RestResult<Value> {
        let span = tracing::info_span!("rest", resource = %kind, action = %Action::Read, id);
        self.run_get(kind, id, raw, principal).instrument(span).await
    }

    async fn run_list(
        &self,
        kind: ResourceKind,
        raw: &RawParams,
        principal: &Principal,
    ) -> RestResult<CollectionResponse> {
        let mut t = Transitions::start();

        let query = self
            .queries
            .build_collection(kind, raw, principal)
            .map_err(|e| t.fail(e))?;
        t.advance(Stage::Validated);

        self.authorize(kind, Action::List, QueryRef::Collection(&query), principal)
            .map_err(|e| t.fail(e))?;
        t.advance(Stage::Authorized);

        let page = guarded(self.adapter.fetch_collection(&query))
            .await
            .map_err(|e| t.fail(RestError::upstream(kind, e.to_string())))?;
        t.advance(Stage::Fetched);
        tracing::debug!(records = page.records.len(), total = ?page.total, "fetched");

        let items = self
            .shape_page(kind, &query, &page)
            .map_err(|e| t.fail(RestError::upstream(kind, e.to_string())))?;
        t.advance(Stage::Shaped);

        let pagination = page
            .total
            .filter(|_| query.count_total)
            .map(|total| PaginationMeta::new(query.page, query.per_page, total));
        t.advance(Stage::Paginated);

        t.advance(Stage::Responded);
        Ok(CollectionResponse { items, pagination })
    }

    async fn run_get(
        &self,
        kind: ResourceKind,
        id: u64,
        raw: &RawParams,
        principal: &Principal,
    ) -> RestResult<Value> {
        let mut t = Transitions::start();

        let query = self
            .queries
            .build_item(kind, id, raw, principal)
            .map_err(|e| t.fail(e))?;
        t.advance(Stage::Validated);

        self.authorize(kind, Action::Read, QueryRef::Item(&query), principal)
            .map_err(|e| t.fail(e))?;
        t.advance(Stage::Authorized);

        let record = guarded(self.adapter.fetch_one(&query))
            .await
            .map_err(|e| {
                t.fail(match e {
                    AdapterError::NotFound => RestError::InvalidResourceId { kind, id },
                    other => RestError::upstream(kind, other.to_string()),
                })
            })?;
        t.advance(Stage::Fetched);

        let item = self
            .shape_item(&query, &record)
            .map_err(|e| t.fail(RestError::upstream(kind, e.to_string())))?;
        t.advance(Stage::Shaped);

        t.advance(Stage::Responded);
        Ok(item)
    }

    fn authorize(
        &self,
        kind: ResourceKind,
        action: Action,
        query: QueryRef<'_>,
        principal: &Principal,
    ) -> RestResult<()> {
        if self.gate.authorize(kind, action, query, principal) {
            Ok(())
        } else {
            Err(RestError::Forbidden { kind, action })
        }
    }

    fn shape_page(
        &self,
        kind: ResourceKind,
        query: &CollectionQuery,
        page: &FetchedPage,
    ) -> Result<Vec<Value>, ShapeError> {
        page.records
            .iter()
            .map(|record| {
                self.shaper
                    .shape(kind, record, query.context, ShapeFlags::default())
            })
            .collect()
    }

    fn shape_item(&self, query: &ItemQuery, record: &Record) -> Result<Value, ShapeError> {
        match (&query.extras, record) {
            (ItemExtras::FieldGroup(fetch), Record::ProfileFieldGroup(group)) => {
                self.aggregator.aggregate(group, fetch, query.context)
            }
            (ItemExtras::Field { user_id }, _) => {
                let flags = ShapeFlags {
                    field_data: user_id.is_some(),
                    visibility_level: false,
                };
                self.shaper.shape(query.kind, record, query.context, flags)
            }
            _ => self
                .shaper
                .shape(query.kind, record, query.context, ShapeFlags::default()),
        }
    }
}

/// Runs an adapter call, turning a panic into an adapter failure
async fn guarded<T>(
    call: impl Future<Output = Result<T, AdapterError>>,
) -> Result<T, AdapterError> {
    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(AdapterError::Failure(anyhow!(
            "adapter panicked: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::adapter::{FieldGroupRecord, GroupRecord};
    use crate::core::auth::{AllowAll, AuthPolicy, PolicyGate};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves one canned group, counts calls
    #[derive(Default)]
    struct StubAdapter {
        calls: AtomicUsize,
        panic: bool,
    }

    fn stub_group(id: u64) -> GroupRecord {
        GroupRecord {
            id,
            name: format!("Group {}", id),
            slug: format!("group-{}", id),
            creator_id: 1.into(),
            status: "public".into(),
            permalink: format!("http://localhost/groups/{}/", id),
            ..GroupRecord::default()
        }
    }

    #[async_trait]
    impl DomainFetchAdapter for StubAdapter {
        async fn fetch_collection(&self, query: &CollectionQuery) -> Result<FetchedPage, AdapterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.panic {
                panic!("store exploded");
            }
            let records = vec![Record::Group(stub_group(5)), Record::Group(stub_group(9))];
            let total = query.count_total.then_some(40);
            Ok(FetchedPage::new(records, total))
        }

        async fn fetch_one(&self, query: &ItemQuery) -> Result<Record, AdapterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match (query.kind, query.id) {
                (ResourceKind::Group, 5) => Ok(Record::Group(stub_group(5))),
                (ResourceKind::Group, 6) => {
                    let mut group = stub_group(6);
                    group.date_created = Some("not a date".into());
                    Ok(Record::Group(group))
                }
                (ResourceKind::Group, 7) => Ok(Record::ProfileFieldGroup(FieldGroupRecord::default())),
                (ResourceKind::Group, 8) => Err(anyhow!("connection reset").into()),
                _ => Err(AdapterError::NotFound),
            }
        }
    }

    fn controller_with(adapter: Arc<StubAdapter>, gate: Arc<dyn PermissionGate>) -> ResourceController {
        let config = Arc::new(RestConfig::default_config());
        let schemas = Arc::new(SchemaRegistry::new(&config));
        ResourceController::new(config, schemas, adapter, gate)
    }

    fn controller(adapter: Arc<StubAdapter>) -> ResourceController {
        controller_with(adapter, Arc::new(AllowAll))
    }

    fn raw(pairs: &[(&str, &str)]) -> RawParams {
        RawParams::from_pairs(pairs.iter().copied())
    }

    #[tokio::test]
    async fn test_list_with_pagination() {
        let adapter = Arc::new(StubAdapter::default());
        let response = controller(adapter.clone())
            .list(ResourceKind::Group, &raw(&[("per_page", "2")]), &Principal::anonymous())
            .await
            .unwrap();

        assert_eq!(response.items.len(), 2);
        let pagination = response.pagination.unwrap();
        assert_eq!(pagination.total, 40);
        assert_eq!(pagination.total_pages, 20);
        assert_eq!(adapter.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_include_omits_pagination() {
        let response = controller(Arc::new(StubAdapter::default()))
            .list(ResourceKind::Group, &raw(&[("include", "5,9")]), &Principal::anonymous())
            .await
            .unwrap();
        assert!(response.pagination.is_none());
    }

    #[tokio::test]
    async fn test_invalid_parameter_skips_fetch() {
        let adapter = Arc::new(StubAdapter::default());
        let err = controller(adapter.clone())
            .list(ResourceKind::Group, &raw(&[("order", "up")]), &Principal::anonymous())
            .await
            .unwrap_err();
        assert!(matches!(err, RestError::InvalidParameter(_)));
        assert_eq!(adapter.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_forbidden_skips_fetch() {
        let adapter = Arc::new(StubAdapter::default());
        let gate = PolicyGate::new().with_policy(
            ResourceKind::Group,
            Action::Read,
            AuthPolicy::Authenticated,
        );
        let err = controller_with(adapter.clone(), Arc::new(gate))
            .get_item(ResourceKind::Group, 5, &RawParams::new(), &Principal::anonymous())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RestError::Forbidden {
                kind: ResourceKind::Group,
                action: Action::Read
            }
        ));
        assert_eq!(adapter.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_not_found_is_invalid_resource_id() {
        let err = controller(Arc::new(StubAdapter::default()))
            .get_item(ResourceKind::Group, 42, &RawParams::new(), &Principal::anonymous())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RestError::InvalidResourceId {
                kind: ResourceKind::Group,
                id: 42
            }
        ));
    }

    #[tokio::test]
    async fn test_adapter_failure_is_upstream() {
        let err = controller(Arc::new(StubAdapter::default()))
            .get_item(ResourceKind::Group, 8, &RawParams::new(), &Principal::anonymous())
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "upstream_failure");
        assert!(err.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_malformed_record_is_upstream() {
        let err = controller(Arc::new(StubAdapter::default()))
            .get_item(ResourceKind::Group, 6, &RawParams::new(), &Principal::anonymous())
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "upstream_failure");
    }

    #[tokio::test]
    async fn test_wrong_record_kind_is_upstream() {
        let err = controller(Arc::new(StubAdapter::default()))
            .get_item(ResourceKind::Group, 7, &RawParams::new(), &Principal::anonymous())
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "upstream_failure");
    }

    #[tokio::test]
    async fn test_adapter_panic_is_upstream() {
        let adapter = Arc::new(StubAdapter {
            panic: true,
            ..StubAdapter::default()
        });
        let err = controller(adapter)
            .list(ResourceKind::Group, &RawParams::new(), &Principal::anonymous())
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "upstream_failure");
        assert!(err.to_string().contains("store exploded"));
    }

    #[tokio::test]
    async fn test_get_item_shapes_for_context() {
        let item = controller(Arc::new(StubAdapter::default()))
            .get_item(ResourceKind::Group, 5, &raw(&[("context", "embed")]), &Principal::anonymous())
            .await
            .unwrap();
        assert_eq!(item["id"], 5);
        assert!(item.get("slug").is_none());
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
        let boxed: Box<dyn Any + Send> = Box::new(3);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }
}
