//! Collection and item queries
//!
//! [`QueryBuilder`] turns raw query-string pairs into a typed, validated
//! [`CollectionQuery`] or [`ItemQuery`]. Every parameter is sanitized first
//! and then validated against the schema registry, so an unknown enum value
//! is rejected here, before anything reaches the domain adapter.
//!
//! # Example
//! ```rust,ignore
//! let raw = RawParams::from_pairs([("type", "newest"), ("per_page", "5")]);
//! let query = builder.build_collection(ResourceKind::Member, &raw, &principal)?;
//! assert_eq!(query.per_page, 5);
//! ```

use crate::config::RestConfig;
use crate::core::auth::Principal;
use crate::core::error::{ParameterError, RestResult};
use crate::core::schema::{Context, ResourceKind, ResourceSchema, SchemaRegistry};
use crate::core::validation::{filters, validators};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

// =============================================================================
// Raw parameters
// =============================================================================

/// Query-string pairs exactly as received
///
/// Lists may arrive comma separated (`include=5,9`), bracketed
/// (`include[]=5&include[]=9`) or repeated (`include=5&include=9`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct RawParams(Vec<(String, String)>);

impl RawParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    fn matches(key: &str, name: &str) -> bool {
        key == name || key.strip_suffix("[]") == Some(name)
    }

    /// Last value given for `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|(k, _)| Self::matches(k, name))
            .map(|(_, v)| v.as_str())
    }

    /// Every value given for `name`, in order
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |(k, _)| Self::matches(k, name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

// =============================================================================
// Typed queries
// =============================================================================

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    Asc,
    #[default]
    Desc,
}

/// Typed collection read
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionQuery {
    pub kind: ResourceKind,
    pub context: Context,
    pub page: u64,
    pub per_page: u64,
    pub order: Order,
    pub search: Option<String>,
    pub include: BTreeSet<u64>,
    pub exclude: BTreeSet<u64>,

    /// Whether the adapter should count the full result set
    pub count_total: bool,

    /// Whether hidden items may be returned; never taken from the caller
    pub show_hidden: bool,

    /// Logged-in user the query runs for
    pub viewer_id: Option<u64>,

    pub filters: CollectionFilters,
}

impl CollectionQuery {
    /// Zero-based offset of the first item of the requested page
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.per_page)
    }
}

/// Resource-specific collection filters
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionFilters {
    Groups(GroupFilters),
    Members(MemberFilters),
    FieldGroups(FieldGroupListFilters),
}

/// Scope filter with independent object and action dimensions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeFilter {
    /// Owning component (`component` parameter)
    pub object: Option<String>,

    /// Action type (`type` parameter)
    pub action: Option<String>,
}

/// Group status filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    Published,
    Spam,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupFilters {
    pub author: Option<u64>,
    pub status: StatusFilter,
    pub after: Option<DateTime<Utc>>,
    pub primary_ids: BTreeSet<u64>,
    pub secondary_ids: BTreeSet<u64>,
    pub filter: ScopeFilter,
}

/// Member list ordering (`type` parameter)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemberListType {
    Active,
    Newest,
    Popular,
    Online,
    #[default]
    Alphabetical,
    Random,
}

impl MemberListType {
    fn from_validated(value: &str) -> Self {
        match value {
            "active" => MemberListType::Active,
            "newest" => MemberListType::Newest,
            "popular" => MemberListType::Popular,
            "online" => MemberListType::Online,
            "random" => MemberListType::Random,
            _ => MemberListType::Alphabetical,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemberFilters {
    pub list_type: MemberListType,
    pub meta_key: Option<String>,
    pub meta_value: Option<String>,

    /// Limit to friends of these users
    pub user_ids: BTreeSet<u64>,

    pub populate_extras: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldGroupListFilters {
    pub hide_empty_groups: bool,
}

/// Typed single-item read
#[derive(Debug, Clone, PartialEq)]
pub struct ItemQuery {
    pub kind: ResourceKind,
    pub id: u64,
    pub context: Context,
    pub viewer_id: Option<u64>,
    pub extras: ItemExtras,
}

impl ItemQuery {
    /// User whose data the read targets
    pub fn target_user(&self) -> Option<u64> {
        match &self.extras {
            ItemExtras::FieldGroup(fetch) => fetch.user_id,
            ItemExtras::Field { user_id } => *user_id,
            ItemExtras::None if self.kind == ResourceKind::Member => Some(self.id),
            ItemExtras::None => None,
        }
    }
}

/// Item parameters beyond `context`
#[derive(Debug, Clone, PartialEq)]
pub enum ItemExtras {
    None,
    FieldGroup(FieldGroupFetch),
    Field { user_id: Option<u64> },
}

/// What to load with a single profile field group
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldGroupFetch {
    /// 0 on the wire means none
    pub user_id: Option<u64>,
    pub member_types: Vec<String>,
    pub hide_empty_fields: bool,
    pub fetch_fields: bool,
    pub fetch_field_data: bool,
    pub fetch_visibility_level: bool,
    pub update_meta_cache: bool,
    pub exclude_fields: BTreeSet<u64>,
}

impl FieldGroupFetch {
    /// Field values need both the flag and a target user
    pub fn wants_field_data(&self) -> bool {
        self.fetch_fields && self.fetch_field_data && self.user_id.is_some()
    }

    pub fn wants_visibility_level(&self) -> bool {
        self.fetch_fields && self.fetch_visibility_level && self.user_id.is_some()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builds typed queries from raw parameters
#[derive(Clone)]
pub struct QueryBuilder {
    config: Arc<RestConfig>,
    schemas: Arc<SchemaRegistry>,
}

impl QueryBuilder {
    pub fn new(config: Arc<RestConfig>, schemas: Arc<SchemaRegistry>) -> Self {
        Self { config, schemas }
    }

    /// Build a collection query for `kind`
    pub fn build_collection(
        &self,
        kind: ResourceKind,
        raw: &RawParams,
        principal: &Principal,
    ) -> RestResult<CollectionQuery> {
        let reader = ParamReader::new(self.schemas.schema_for(kind), raw);
        let context = reader.context()?;

        let mut query = CollectionQuery {
            kind,
            context,
            page: 1,
            per_page: self.config.max_per_page,
            order: Order::Desc,
            search: None,
            include: BTreeSet::new(),
            exclude: BTreeSet::new(),
            count_total: false,
            show_hidden: false,
            viewer_id: principal.user_id,
            filters: CollectionFilters::FieldGroups(FieldGroupListFilters::default()),
        };

        match kind {
            ResourceKind::Group => {
                self.read_pagination(&reader, &mut query)?;
                query.order = reader.order()?;
                let filters = self.group_filters(&reader)?;
                query.show_hidden = hidden_override(&filters, principal);
                query.filters = CollectionFilters::Groups(filters);
            }
            ResourceKind::Member => {
                self.read_pagination(&reader, &mut query)?;
                query.filters = CollectionFilters::Members(member_filters(&reader)?);
            }
            ResourceKind::ProfileFieldGroup => {
                query.filters = CollectionFilters::FieldGroups(FieldGroupListFilters {
                    hide_empty_groups: reader.flag("hide_empty_groups")?,
                });
            }
            ResourceKind::Core | ResourceKind::ProfileField => {
                return Err(ParameterError::InvalidType {
                    param: "kind".to_string(),
                    value: kind.as_str().to_string(),
                    expected: "collection resource",
                }
                .into());
            }
        }

        Ok(query)
    }

    /// Build a single-item query for `kind` and `id`
    pub fn build_item(
        &self,
        kind: ResourceKind,
        id: u64,
        raw: &RawParams,
        principal: &Principal,
    ) -> RestResult<ItemQuery> {
        let reader = ParamReader::new(self.schemas.schema_for(kind), raw);
        let context = reader.context()?;

        let extras = match kind {
            ResourceKind::ProfileFieldGroup => ItemExtras::FieldGroup(field_group_fetch(&reader)?),
            ResourceKind::ProfileField => ItemExtras::Field {
                user_id: reader.user_id("user_id"),
            },
            _ => ItemExtras::None,
        };

        Ok(ItemQuery {
            kind,
            id,
            context,
            viewer_id: principal.user_id,
            extras,
        })
    }

    fn read_pagination(&self, reader: &ParamReader<'_>, query: &mut CollectionQuery) -> RestResult<()> {
        query.page = match reader.raw("page") {
            Some(v) => validators::at_least("page", filters::absint(v), 1)?,
            None => 1,
        };
        query.per_page = match reader.raw("per_page") {
            Some(v) => {
                validators::at_least("per_page", filters::absint(v), 1)?.min(self.config.max_per_page)
            }
            None => self.config.default_per_page,
        };
        query.search = reader.text("search");
        query.include = reader.ids("include");
        query.exclude = reader.ids("exclude");
        query.count_total = query.include.is_empty();
        Ok(())
    }

    fn group_filters(&self, reader: &ParamReader<'_>) -> RestResult<GroupFilters> {
        let status = match reader.enum_value("status")?.as_deref() {
            Some("spam") => StatusFilter::Spam,
            _ => StatusFilter::Published,
        };

        let after = reader
            .raw("after")
            .filter(|v| !v.trim().is_empty())
            .map(|v| validators::date_time("after", v))
            .transpose()?;

        // show_hidden is read so malformed values are rejected; its value is
        // never used
        reader.flag("show_hidden")?;

        Ok(GroupFilters {
            author: reader.raw("author").map(filters::absint).filter(|id| *id > 0),
            status,
            after,
            primary_ids: reader.ids("primary_id"),
            secondary_ids: reader.ids("secondary_id"),
            filter: ScopeFilter {
                object: reader.enum_key("component")?,
                action: reader.text("type"),
            },
        })
    }
}

/// Hidden groups are visible to moderators and to members of every
/// targeted group, and only when the query is scoped to the groups component
fn hidden_override(filters: &GroupFilters, principal: &Principal) -> bool {
    if filters.filter.object.as_deref() != Some("groups") {
        return false;
    }
    if principal.is_moderator() {
        return true;
    }
    principal.is_authenticated()
        && !filters.primary_ids.is_empty()
        && filters.primary_ids.iter().all(|id| principal.is_member_of(*id))
}

fn member_filters(reader: &ParamReader<'_>) -> RestResult<MemberFilters> {
    let list_type = reader
        .enum_value("type")?
        .map(|t| MemberListType::from_validated(&t))
        .unwrap_or_default();

    Ok(MemberFilters {
        list_type,
        meta_key: reader.text("meta_key"),
        meta_value: reader.text("meta_value"),
        user_ids: reader.ids("user_id"),
        populate_extras: reader.flag_or("populate_extras", true)?,
    })
}

fn field_group_fetch(reader: &ParamReader<'_>) -> RestResult<FieldGroupFetch> {
    let member_types = filters::parse_token_list(reader.all("member_type"))
        .into_iter()
        .map(|t| filters::sanitize_key(&t))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>();
    if let Some(allowed) = reader.schema.param_enum("member_type") {
        validators::all_in_enum("member_type", &member_types, allowed)?;
    }

    Ok(FieldGroupFetch {
        user_id: reader.user_id("user_id"),
        member_types,
        hide_empty_fields: reader.flag("hide_empty_fields")?,
        fetch_fields: reader.flag("fetch_fields")?,
        fetch_field_data: reader.flag("fetch_field_data")?,
        fetch_visibility_level: reader.flag("fetch_visibility_level")?,
        update_meta_cache: reader.flag_or("update_meta_cache", true)?,
        exclude_fields: reader.ids("exclude_fields"),
    })
}

/// Reads parameters of one resource kind, validating against its schema
struct ParamReader<'a> {
    schema: &'a ResourceSchema,
    raw: &'a RawParams,
}

impl<'a> ParamReader<'a> {
    fn new(schema: &'a ResourceSchema, raw: &'a RawParams) -> Self {
        Self { schema, raw }
    }

    fn raw(&self, name: &str) -> Option<&'a str> {
        self.raw.get(name)
    }

    fn all(&self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.raw.get_all(name)
    }

    fn context(&self) -> RestResult<Context> {
        match self.raw("context") {
            None => Ok(Context::default()),
            Some(v) => {
                let v = filters::sanitize_key(v);
                Context::parse(&v).ok_or_else(|| {
                    ParameterError::NotInEnum {
                        param: "context".to_string(),
                        value: v,
                        allowed: Context::ALL.iter().map(|c| c.as_str().to_string()).collect(),
                    }
                    .into()
                })
            }
        }
    }

    fn order(&self) -> RestResult<Order> {
        Ok(match self.enum_value("order")?.as_deref() {
            Some("asc") => Order::Asc,
            _ => Order::Desc,
        })
    }

    /// Sanitized text, `None` when empty
    fn text(&self, name: &str) -> Option<String> {
        self.raw(name)
            .map(filters::sanitize_text_field)
            .filter(|v| !v.is_empty())
    }

    fn ids(&self, name: &'a str) -> BTreeSet<u64> {
        filters::parse_id_list(self.all(name))
    }

    /// absint user id, 0 meaning none
    fn user_id(&self, name: &str) -> Option<u64> {
        self.raw(name).map(filters::absint).filter(|id| *id > 0)
    }

    fn flag(&self, name: &str) -> RestResult<bool> {
        self.flag_or(name, false)
    }

    fn flag_or(&self, name: &str, default: bool) -> RestResult<bool> {
        match self.raw(name) {
            Some(v) => Ok(validators::boolean(name, v)?),
            None => Ok(default),
        }
    }

    /// Text value validated against the declared enum; empty means absent
    fn enum_value(&self, name: &str) -> RestResult<Option<String>> {
        self.checked(name, self.text(name))
    }

    /// Key value validated against the declared enum; empty means absent
    fn enum_key(&self, name: &str) -> RestResult<Option<String>> {
        let value = self
            .raw(name)
            .map(filters::sanitize_key)
            .filter(|v| !v.is_empty());
        self.checked(name, value)
    }

    fn checked(&self, name: &str, value: Option<String>) -> RestResult<Option<String>> {
        if let (Some(v), Some(allowed)) = (&value, self.schema.param_enum(name)) {
            validators::in_enum(name, v, allowed)?;
        }
        Ok(value)
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// Pagination metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaginationMeta {
    /// Current page number (starts at 1)
    pub page: u64,

    /// Number of items per page
    pub per_page: u64,

    /// Total number of items (after filters)
    pub total: u64,

    /// Total number of pages
    pub total_pages: u64,

    /// Whether there is a next page
    pub has_next: bool,

    /// Whether there is a previous page
    pub has_prev: bool,
}

impl PaginationMeta {
    /// Create pagination metadata from calculation
    pub fn new(page: u64, per_page: u64, total: u64) -> Self {
        // Ensure per_page is at least 1 to avoid division by zero
        let per_page = per_page.max(1);
        let total_pages = if total == 0 { 0 } else { total.div_ceil(per_page) };
        let start = page.saturating_sub(1).saturating_mul(per_page);

        Self {
            page,
            per_page,
            total,
            total_pages,
            has_next: start.saturating_add(per_page) < total,
            has_prev: page > 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::RestError;

    fn builder() -> QueryBuilder {
        let config = Arc::new(RestConfig::default_config());
        let schemas = Arc::new(SchemaRegistry::new(&config));
        QueryBuilder::new(config, schemas)
    }

    fn params(pairs: &[(&str, &str)]) -> RawParams {
        RawParams::from_pairs(pairs.iter().copied())
    }

    fn groups(raw: &[(&str, &str)], principal: &Principal) -> RestResult<CollectionQuery> {
        builder().build_collection(ResourceKind::Group, &params(raw), principal)
    }

    fn group_filters(query: &CollectionQuery) -> &GroupFilters {
        match &query.filters {
            CollectionFilters::Groups(f) => f,
            other => panic!("expected group filters, got {:?}", other),
        }
    }

    fn assert_invalid(result: RestResult<impl std::fmt::Debug>, param: &str) {
        match result {
            Err(RestError::InvalidParameter(e)) => assert_eq!(e.param(), param),
            other => panic!("expected invalid {}, got {:?}", param, other),
        }
    }

    // === RawParams ===

    #[test]
    fn test_raw_params_list_forms() {
        let raw = params(&[("include[]", "5"), ("include", "9"), ("page", "1"), ("page", "2")]);
        assert_eq!(raw.get_all("include").collect::<Vec<_>>(), vec!["5", "9"]);
        assert_eq!(raw.get("page"), Some("2"));
        assert!(!raw.contains("exclude"));
    }

    // === Pagination and defaults ===

    #[test]
    fn test_group_defaults() {
        let query = groups(&[], &Principal::anonymous()).unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.per_page, 20);
        assert_eq!(query.order, Order::Desc);
        assert_eq!(query.context, Context::View);
        assert!(query.count_total);
        assert!(!query.show_hidden);

        let filters = group_filters(&query);
        assert_eq!(filters.status, StatusFilter::Published);
        assert_eq!(filters.author, None);
    }

    #[test]
    fn test_per_page_capped() {
        let query = groups(&[("per_page", "5000")], &Principal::anonymous()).unwrap();
        assert_eq!(query.per_page, 100);
    }

    #[test]
    fn test_zero_page_rejected() {
        assert_invalid(groups(&[("page", "0")], &Principal::anonymous()), "page");
        assert_invalid(groups(&[("per_page", "-3")], &Principal::anonymous()), "per_page");
    }

    #[test]
    fn test_offset() {
        let query = groups(&[("page", "3"), ("per_page", "10")], &Principal::anonymous()).unwrap();
        assert_eq!(query.offset(), 20);
    }

    #[test]
    fn test_include_disables_count() {
        let query = groups(&[("include", "5,9")], &Principal::anonymous()).unwrap();
        assert!(!query.count_total);
        assert_eq!(query.include.iter().copied().collect::<Vec<_>>(), vec![5, 9]);
    }

    #[test]
    fn test_include_of_garbage_keeps_count() {
        let query = groups(&[("include", "abc")], &Principal::anonymous()).unwrap();
        assert!(query.include.is_empty());
        assert!(query.count_total);
    }

    // === Enum validation ===

    #[test]
    fn test_unknown_context_rejected() {
        assert_invalid(groups(&[("context", "admin")], &Principal::anonymous()), "context");
    }

    #[test]
    fn test_unknown_order_rejected() {
        assert_invalid(groups(&[("order", "sideways")], &Principal::anonymous()), "order");
    }

    #[test]
    fn test_unknown_component_rejected() {
        assert_invalid(groups(&[("component", "forums")], &Principal::anonymous()), "component");
    }

    #[test]
    fn test_member_type_bogus_rejected() {
        let result = builder().build_collection(
            ResourceKind::Member,
            &params(&[("type", "bogus")]),
            &Principal::anonymous(),
        );
        match result {
            Err(RestError::InvalidParameter(ParameterError::NotInEnum { param, allowed, .. })) => {
                assert_eq!(param, "type");
                assert!(allowed.contains(&"alphabetical".to_string()));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_invalid_after_rejected() {
        assert_invalid(groups(&[("after", "last tuesday")], &Principal::anonymous()), "after");
    }

    #[test]
    fn test_invalid_show_hidden_rejected() {
        assert_invalid(groups(&[("show_hidden", "perhaps")], &Principal::anonymous()), "show_hidden");
    }

    // === Filter composition ===

    #[test]
    fn test_component_and_type_coexist() {
        let query = groups(
            &[("component", "groups"), ("type", "joined_group"), ("author", "7"), ("after", "2017-01-01T00:00:00Z")],
            &Principal::anonymous(),
        )
        .unwrap();
        let filters = group_filters(&query);
        assert_eq!(filters.filter.object.as_deref(), Some("groups"));
        assert_eq!(filters.filter.action.as_deref(), Some("joined_group"));
        assert_eq!(filters.author, Some(7));
        assert!(filters.after.is_some());
    }

    #[test]
    fn test_negative_author_means_none() {
        let query = groups(&[("author", "-4")], &Principal::anonymous()).unwrap();
        assert_eq!(group_filters(&query).author, None);
    }

    // === Hidden visibility override ===

    #[test]
    fn test_show_hidden_never_trusted() {
        let query = groups(
            &[("show_hidden", "true"), ("component", "groups")],
            &Principal::user(3),
        )
        .unwrap();
        assert!(!query.show_hidden);
    }

    #[test]
    fn test_moderator_sees_hidden_in_groups_component() {
        let moderator = Principal::user(1).with_capability("bp_moderate");
        let scoped = groups(&[("component", "groups")], &moderator).unwrap();
        assert!(scoped.show_hidden);

        let unscoped = groups(&[], &moderator).unwrap();
        assert!(!unscoped.show_hidden);
    }

    #[test]
    fn test_member_of_targeted_groups_sees_hidden() {
        let member = Principal::user(3).with_groups([5, 9]);
        let query = groups(&[("component", "groups"), ("primary_id", "5,9")], &member).unwrap();
        assert!(query.show_hidden);

        let partial = groups(&[("component", "groups"), ("primary_id", "5,6")], &member).unwrap();
        assert!(!partial.show_hidden);
    }

    // === Members ===

    #[test]
    fn test_member_filters() {
        let query = builder()
            .build_collection(
                ResourceKind::Member,
                &params(&[
                    ("type", "newest"),
                    ("meta_key", " <b>city</b> "),
                    ("meta_value", ""),
                    ("user_id", "3,x"),
                    ("populate_extras", "0"),
                ]),
                &Principal::anonymous(),
            )
            .unwrap();
        match query.filters {
            CollectionFilters::Members(f) => {
                assert_eq!(f.list_type, MemberListType::Newest);
                assert_eq!(f.meta_key.as_deref(), Some("city"));
                assert_eq!(f.meta_value, None);
                assert_eq!(f.user_ids.into_iter().collect::<Vec<_>>(), vec![3]);
                assert!(!f.populate_extras);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_member_defaults() {
        let query = builder()
            .build_collection(ResourceKind::Member, &RawParams::new(), &Principal::anonymous())
            .unwrap();
        match query.filters {
            CollectionFilters::Members(f) => {
                assert_eq!(f.list_type, MemberListType::Alphabetical);
                assert!(f.populate_extras);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    // === Profile ===

    #[test]
    fn test_field_group_fetch() {
        let query = builder()
            .build_item(
                ResourceKind::ProfileFieldGroup,
                7,
                &params(&[
                    ("fetch_fields", "true"),
                    ("fetch_field_data", "false"),
                    ("user_id", "3"),
                    ("member_type", "student,any"),
                ]),
                &Principal::anonymous(),
            )
            .unwrap();
        match query.extras {
            ItemExtras::FieldGroup(fetch) => {
                assert!(fetch.fetch_fields);
                assert!(!fetch.wants_field_data());
                assert_eq!(fetch.user_id, Some(3));
                assert!(fetch.update_meta_cache);
                assert_eq!(fetch.member_types, vec!["student", "any"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_field_data_requires_user() {
        let query = builder()
            .build_item(
                ResourceKind::ProfileFieldGroup,
                7,
                &params(&[("fetch_fields", "1"), ("fetch_field_data", "1"), ("user_id", "0")]),
                &Principal::anonymous(),
            )
            .unwrap();
        match query.extras {
            ItemExtras::FieldGroup(fetch) => {
                assert_eq!(fetch.user_id, None);
                assert!(!fetch.wants_field_data());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unknown_member_type_rejected() {
        assert_invalid(
            builder().build_item(
                ResourceKind::ProfileFieldGroup,
                7,
                &params(&[("member_type", "student,pirate")]),
                &Principal::anonymous(),
            ),
            "member_type",
        );
    }

    #[test]
    fn test_field_user_id() {
        let query = builder()
            .build_item(ResourceKind::ProfileField, 2, &params(&[("user_id", "3")]), &Principal::anonymous())
            .unwrap();
        assert_eq!(query.extras, ItemExtras::Field { user_id: Some(3) });
        assert_eq!(query.target_user(), Some(3));
    }

    #[test]
    fn test_field_group_overview() {
        let query = builder()
            .build_collection(
                ResourceKind::ProfileFieldGroup,
                &params(&[("hide_empty_groups", "true")]),
                &Principal::anonymous(),
            )
            .unwrap();
        assert!(!query.count_total);
        assert_eq!(
            query.filters,
            CollectionFilters::FieldGroups(FieldGroupListFilters { hide_empty_groups: true })
        );
    }

    #[test]
    fn test_core_is_not_a_collection() {
        assert!(builder()
            .build_collection(ResourceKind::Core, &RawParams::new(), &Principal::anonymous())
            .is_err());
    }

    // === PaginationMeta ===

    #[test]
    fn test_pagination_meta() {
        let meta = PaginationMeta::new(1, 20, 145);
        assert_eq!(meta.total, 145);
        assert_eq!(meta.total_pages, 8);
        assert!(!meta.has_prev);
        assert!(meta.has_next);
    }

    #[test]
    fn test_pagination_meta_past_the_end() {
        let meta = PaginationMeta::new(u64::MAX, 20, 4);
        assert_eq!(meta.total_pages, 1);
        assert!(meta.has_prev);
        assert!(!meta.has_next);
    }

    #[test]
    fn test_pagination_meta_empty() {
        let meta = PaginationMeta::new(1, 20, 0);
        assert_eq!(meta.total_pages, 0);
        assert!(!meta.has_next);
    }
}
