//! In-memory implementation of DomainFetchAdapter for testing and development

use crate::core::adapter::{
    AdapterError, CoreRecord, DomainFetchAdapter, FetchedPage, FieldData, FieldGroupRecord,
    FieldRecord, GroupRecord, MemberRecord, Record, StoredFlag, StoredInt,
};
use crate::core::query::{
    CollectionFilters, CollectionQuery, FieldGroupFetch, GroupFilters, ItemExtras, ItemQuery,
    MemberFilters, MemberListType, Order, StatusFilter,
};
use crate::core::schema::ResourceKind;
use anyhow::{Context as _, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{BuildHasher, RandomState};
use std::sync::{Arc, RwLock};

/// Members active this recently count as online
const ONLINE_INTERVAL_MINUTES: i64 = 15;

/// A group and its memberships
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredGroup {
    #[serde(flatten)]
    pub record: GroupRecord,

    #[serde(default)]
    pub member_ids: BTreeSet<u64>,
    #[serde(default)]
    pub invited_ids: BTreeSet<u64>,
    #[serde(default)]
    pub pending_ids: BTreeSet<u64>,
    #[serde(default)]
    pub banned_ids: BTreeSet<u64>,

    /// Group types, matched by the `type` filter
    #[serde(default)]
    pub types: BTreeSet<String>,

    #[serde(default)]
    pub spam: bool,
}

/// A member with the data the list filters need
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredMember {
    #[serde(flatten)]
    pub record: MemberRecord,

    #[serde(default)]
    pub meta: BTreeMap<String, String>,
    #[serde(default)]
    pub friend_ids: BTreeSet<u64>,
    #[serde(default)]
    pub last_activity: Option<String>,
    #[serde(default)]
    pub registered: Option<String>,
}

/// One user's saved value for a field
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredFieldValue {
    pub user_id: u64,
    #[serde(default)]
    pub id: Option<u64>,
    pub value: String,

    /// Overrides the field's default visibility for this user
    #[serde(default)]
    pub visibility_level: Option<String>,
}

/// A field definition with its saved values
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredField {
    /// Definition; `visibility_level` is the default level
    #[serde(flatten)]
    pub record: FieldRecord,

    /// Member types the field applies to, empty for all
    #[serde(default)]
    pub member_types: BTreeSet<String>,

    #[serde(default)]
    pub values: Vec<StoredFieldValue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredFieldGroup {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub group_order: i64,
    #[serde(default)]
    pub can_delete: bool,
    #[serde(default)]
    pub fields: Vec<StoredField>,
}

/// Everything the in-memory directory holds; loadable from YAML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectorySeed {
    #[serde(default)]
    pub core: CoreRecord,
    #[serde(default)]
    pub groups: Vec<StoredGroup>,
    #[serde(default)]
    pub members: Vec<StoredMember>,
    #[serde(default)]
    pub field_groups: Vec<StoredFieldGroup>,
}

/// In-memory social directory
///
/// Useful for testing and development. Uses RwLock for thread-safe access.
#[derive(Clone, Default)]
pub struct InMemoryDirectory {
    data: Arc<RwLock<DirectorySeed>>,
}

impl InMemoryDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: DirectorySeed) -> Self {
        Self {
            data: Arc::new(RwLock::new(seed)),
        }
    }

    /// Load a directory from a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let seed: DirectorySeed =
            serde_yaml::from_str(yaml).context("Failed to parse directory seed")?;
        Ok(Self::from_seed(seed))
    }

    /// Load a directory from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read directory seed {}", path))?;
        Self::from_yaml_str(&content)
    }

    pub fn set_core(&self, core: CoreRecord) -> Result<()> {
        self.write()?.core = core;
        Ok(())
    }

    pub fn add_group(&self, group: StoredGroup) -> Result<()> {
        let mut data = self.write()?;
        data.groups.retain(|g| g.record.id != group.record.id);
        data.groups.push(group);
        Ok(())
    }

    pub fn add_member(&self, member: StoredMember) -> Result<()> {
        let mut data = self.write()?;
        data.members.retain(|m| m.record.user_id != member.record.user_id);
        data.members.push(member);
        Ok(())
    }

    pub fn add_field_group(&self, group: StoredFieldGroup) -> Result<()> {
        let mut data = self.write()?;
        data.field_groups.retain(|g| g.id != group.id);
        data.field_groups.push(group);
        Ok(())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, DirectorySeed>> {
        self.data
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, DirectorySeed>> {
        self.data
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))
    }
}

#[async_trait]
impl DomainFetchAdapter for InMemoryDirectory {
    async fn fetch_collection(&self, query: &CollectionQuery) -> Result<FetchedPage, AdapterError> {
        let data = self.read()?;

        let records: Vec<Record> = match &query.filters {
            CollectionFilters::Groups(filters) => list_groups(&data, query, filters)
                .into_iter()
                .map(|g| Record::Group(with_viewer_flags(g, query.viewer_id)))
                .collect(),
            CollectionFilters::Members(filters) => list_members(&data, query, filters)
                .into_iter()
                .map(|m| Record::Member(member_record(m, filters.populate_extras)))
                .collect(),
            CollectionFilters::FieldGroups(filters) => {
                let mut groups: Vec<&StoredFieldGroup> = data
                    .field_groups
                    .iter()
                    .filter(|g| !filters.hide_empty_groups || !g.fields.is_empty())
                    .collect();
                groups.sort_by_key(|g| (g.group_order, g.id));
                let records = groups
                    .into_iter()
                    .map(|g| Record::ProfileFieldGroup(field_group_record(g, None)))
                    .collect();
                return Ok(FetchedPage::new(records, None));
            }
        };

        let total = query.count_total.then_some(records.len() as u64);
        let page = records
            .into_iter()
            .skip(usize::try_from(query.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(query.per_page).unwrap_or(usize::MAX))
            .collect();

        Ok(FetchedPage::new(page, total))
    }

    async fn fetch_one(&self, query: &ItemQuery) -> Result<Record, AdapterError> {
        let data = self.read()?;

        match (query.kind, &query.extras) {
            (ResourceKind::Core, _) => Ok(Record::Core(data.core.clone())),
            (ResourceKind::Group, _) => data
                .groups
                .iter()
                .find(|g| g.record.id == query.id)
                .map(|g| Record::Group(with_viewer_flags(g, query.viewer_id)))
                .ok_or(AdapterError::NotFound),
            (ResourceKind::Member, _) => data
                .members
                .iter()
                .find(|m| m.record.user_id == query.id)
                .map(|m| Record::Member(member_record(m, true)))
                .ok_or(AdapterError::NotFound),
            (ResourceKind::ProfileFieldGroup, ItemExtras::FieldGroup(fetch)) => data
                .field_groups
                .iter()
                .find(|g| g.id == query.id)
                .map(|g| Record::ProfileFieldGroup(field_group_record(g, Some(fetch))))
                .ok_or(AdapterError::NotFound),
            (ResourceKind::ProfileField, ItemExtras::Field { user_id }) => data
                .field_groups
                .iter()
                .flat_map(|g| g.fields.iter())
                .find(|f| f.record.id == query.id)
                .map(|f| Record::ProfileField(field_record(f, *user_id, user_id.is_some(), false)))
                .ok_or(AdapterError::NotFound),
            (kind, extras) => Err(anyhow!("Unsupported item query for {}: {:?}", kind, extras).into()),
        }
    }
}

// =============================================================================
// Groups
// =============================================================================

fn list_groups<'a>(
    data: &'a DirectorySeed,
    query: &CollectionQuery,
    filters: &GroupFilters,
) -> Vec<&'a StoredGroup> {
    // Every group belongs to the groups component
    if filters.filter.object.as_deref().is_some_and(|c| c != "groups") {
        return Vec::new();
    }

    let search = query.search.as_deref().map(str::to_lowercase);

    let mut groups: Vec<&StoredGroup> = data
        .groups
        .iter()
        .filter(|g| query.include.is_empty() || query.include.contains(&g.record.id))
        .filter(|g| !query.exclude.contains(&g.record.id))
        .filter(|g| query.show_hidden || g.record.status != "hidden")
        .filter(|g| g.spam == (filters.status == StatusFilter::Spam))
        .filter(|g| {
            filters
                .author
                .is_none_or(|author| stored_int(&g.record.creator_id) == author as i64)
        })
        .filter(|g| filters.primary_ids.is_empty() || filters.primary_ids.contains(&g.record.id))
        .filter(|g| {
            filters.secondary_ids.is_empty()
                || u64::try_from(stored_int(&g.record.parent_id))
                    .is_ok_and(|parent| filters.secondary_ids.contains(&parent))
        })
        .filter(|g| {
            filters
                .filter
                .action
                .as_ref()
                .is_none_or(|action| g.types.contains(action))
        })
        .filter(|g| {
            filters.after.is_none_or(|after| {
                parse_stored_date(g.record.date_created.as_deref()).is_some_and(|d| d > after)
            })
        })
        .filter(|g| {
            search.as_ref().is_none_or(|needle| {
                g.record.name.to_lowercase().contains(needle)
                    || g.record.description.to_lowercase().contains(needle)
            })
        })
        .collect();

    groups.sort_by_key(|g| (parse_stored_date(g.record.date_created.as_deref()), g.record.id));
    if query.order == Order::Desc {
        groups.reverse();
    }
    groups
}

/// Membership flags relative to the viewer; anonymous viewers get the
/// stored values
fn with_viewer_flags(group: &StoredGroup, viewer: Option<u64>) -> GroupRecord {
    let mut record = group.record.clone();
    if let Some(viewer) = viewer {
        record.is_member = Some(StoredFlag::Bool(group.member_ids.contains(&viewer)));
        record.is_invited = Some(StoredFlag::Bool(group.invited_ids.contains(&viewer)));
        record.is_pending = Some(StoredFlag::Bool(group.pending_ids.contains(&viewer)));
        record.is_banned = Some(StoredFlag::Bool(group.banned_ids.contains(&viewer)));
    }
    if !group.member_ids.is_empty() {
        record.total_member_count = StoredInt::Int(group.member_ids.len() as i64);
    }
    record
}

// =============================================================================
// Members
// =============================================================================

fn list_members<'a>(
    data: &'a DirectorySeed,
    query: &CollectionQuery,
    filters: &MemberFilters,
) -> Vec<&'a StoredMember> {
    let search = query.search.as_deref().map(str::to_lowercase);
    let now = Utc::now();
    let online_since = now - Duration::minutes(ONLINE_INTERVAL_MINUTES);

    let mut members: Vec<&StoredMember> = data
        .members
        .iter()
        .filter(|m| query.include.is_empty() || query.include.contains(&m.record.user_id))
        .filter(|m| !query.exclude.contains(&m.record.user_id))
        .filter(|m| {
            filters.user_ids.is_empty() || !m.friend_ids.is_disjoint(&filters.user_ids)
        })
        .filter(|m| match (&filters.meta_key, &filters.meta_value) {
            (Some(key), Some(value)) => m.meta.get(key) == Some(value),
            (Some(key), None) => m.meta.contains_key(key),
            (None, Some(value)) => m.meta.values().any(|v| v == value),
            (None, None) => true,
        })
        .filter(|m| {
            search.as_ref().is_none_or(|needle| {
                m.record.display_name.to_lowercase().contains(needle)
                    || m.record.user_nicename.to_lowercase().contains(needle)
            })
        })
        .filter(|m| {
            filters.list_type != MemberListType::Online
                || parse_stored_date(m.last_activity.as_deref()).is_some_and(|d| d >= online_since)
        })
        .collect();

    match filters.list_type {
        MemberListType::Active | MemberListType::Online => members.sort_by_key(|m| {
            Reverse((parse_stored_date(m.last_activity.as_deref()), m.record.user_id))
        }),
        MemberListType::Newest => members.sort_by_key(|m| {
            Reverse((parse_stored_date(m.registered.as_deref()), m.record.user_id))
        }),
        MemberListType::Popular => members.sort_by_key(|m| {
            Reverse((stored_int(&m.record.total_friend_count), m.record.user_id))
        }),
        MemberListType::Alphabetical => members.sort_by(|a, b| {
            a.record
                .display_name
                .to_lowercase()
                .cmp(&b.record.display_name.to_lowercase())
                .then(a.record.user_id.cmp(&b.record.user_id))
        }),
        MemberListType::Random => {
            let state = RandomState::new();
            members.sort_by_key(|m| state.hash_one(m.record.user_id));
        }
    }

    members
}

/// Extras (profile data such as the diary title) only when requested
fn member_record(member: &StoredMember, populate_extras: bool) -> MemberRecord {
    let mut record = member.record.clone();
    if !populate_extras {
        record.diary_title = None;
    }
    record
}

// =============================================================================
// Profile
// =============================================================================

fn field_group_record(group: &StoredFieldGroup, fetch: Option<&FieldGroupFetch>) -> FieldGroupRecord {
    let fields = fetch.filter(|f| f.fetch_fields).map(|fetch| {
        let any_type = fetch.member_types.is_empty() || fetch.member_types.iter().any(|t| t == "any");
        let mut fields: Vec<&StoredField> = group
            .fields
            .iter()
            .filter(|f| !fetch.exclude_fields.contains(&f.record.id))
            .filter(|f| {
                any_type
                    || f.member_types.is_empty()
                    || fetch.member_types.iter().any(|t| f.member_types.contains(t))
            })
            .filter(|f| {
                !fetch.hide_empty_fields
                    || fetch
                        .user_id
                        .is_some_and(|user| value_for(f, user).is_some_and(|v| !v.value.is_empty()))
            })
            .collect();
        fields.sort_by_key(|f| (stored_int(&f.record.field_order), f.record.id));

        fields
            .into_iter()
            .map(|f| {
                field_record(
                    f,
                    fetch.user_id,
                    fetch.wants_field_data(),
                    fetch.wants_visibility_level(),
                )
            })
            .collect()
    });

    FieldGroupRecord {
        id: group.id,
        name: group.name.clone(),
        description: group.description.clone(),
        group_order: StoredInt::Int(group.group_order),
        can_delete: Some(StoredFlag::Bool(group.can_delete)),
        fields,
    }
}

fn field_record(field: &StoredField, user_id: Option<u64>, with_data: bool, with_visibility: bool) -> FieldRecord {
    let mut record = field.record.clone();
    let value = user_id.and_then(|user| value_for(field, user));

    record.data = match (with_data, value) {
        (true, Some(v)) => Some(FieldData {
            id: v.id,
            value: v.value.clone(),
        }),
        (true, None) if user_id.is_some() => Some(FieldData::default()),
        _ => None,
    };
    record.visibility_level = if with_visibility {
        value
            .and_then(|v| v.visibility_level.clone())
            .or_else(|| field.record.visibility_level.clone())
    } else {
        None
    };
    record
}

fn value_for(field: &StoredField, user_id: u64) -> Option<&StoredFieldValue> {
    field.values.iter().find(|v| v.user_id == user_id)
}

// =============================================================================
// Helpers
// =============================================================================

fn stored_int(value: &StoredInt) -> i64 {
    match value {
        StoredInt::Int(n) => *n,
        StoredInt::Text(s) => s.trim().parse().unwrap_or(0),
    }
}

fn parse_stored_date(value: Option<&str>) -> Option<DateTime<Utc>> {
    let value = value?.trim();
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .or_else(|_| DateTime::parse_from_rfc3339(value).map(|dt| dt.to_utc()))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RestConfig;
    use crate::core::auth::Principal;
    use crate::core::query::{QueryBuilder, RawParams};
    use crate::core::schema::SchemaRegistry;

    const SEED: &str = r#"
core:
  version: "2.9.1"
groups:
  - id: 5
    name: Chess Club
    slug: chess-club
    creator_id: "3"
    status: public
    date_created: "2016-05-01 10:00:00"
    permalink: http://localhost/groups/chess-club/
    member_ids: [3, 4]
    types: [club]
  - id: 6
    name: Secret Society
    slug: secret-society
    creator_id: 4
    status: hidden
    date_created: "2017-01-01 00:00:00"
    permalink: http://localhost/groups/secret-society/
    member_ids: [4]
  - id: 9
    name: Go Club
    slug: go-club
    creator_id: 3
    parent_id: 5
    status: private
    date_created: "2018-03-04 12:00:00"
    permalink: http://localhost/groups/go-club/
members:
  - user_id: 3
    display_name: Ada
    user_nicename: ada
    permalink: http://localhost/members/ada/
    diary_title: Notes
    total_friend_count: "2"
    meta: { city: Paris }
    friend_ids: [4]
    registered: "2015-01-01 00:00:00"
  - user_id: 4
    display_name: Bob
    user_nicename: bob
    permalink: http://localhost/members/bob/
    total_friend_count: 1
    friend_ids: [3]
    registered: "2016-01-01 00:00:00"
field_groups:
  - id: 7
    name: Base
    group_order: 1
    fields:
      - id: 2
        group_id: 7
        type: checkbox
        name: Colours
        field_order: 2
        visibility_level: public
        values:
          - user_id: 3
            id: 11
            value: 'a:1:{i:0;s:3:"red";}'
      - id: 1
        group_id: 7
        type: textbox
        name: Name
        field_order: 1
        member_types: [teacher]
  - id: 8
    name: Empty
    group_order: 2
"#;

    fn directory() -> InMemoryDirectory {
        InMemoryDirectory::from_yaml_str(SEED).unwrap()
    }

    fn builder() -> QueryBuilder {
        let config = Arc::new(RestConfig::default_config());
        let schemas = Arc::new(SchemaRegistry::new(&config));
        QueryBuilder::new(config, schemas)
    }

    fn collection(kind: ResourceKind, pairs: &[(&str, &str)], principal: &Principal) -> CollectionQuery {
        builder()
            .build_collection(kind, &RawParams::from_pairs(pairs.iter().copied()), principal)
            .unwrap()
    }

    fn item(kind: ResourceKind, id: u64, pairs: &[(&str, &str)]) -> ItemQuery {
        builder()
            .build_item(kind, id, &RawParams::from_pairs(pairs.iter().copied()), &Principal::anonymous())
            .unwrap()
    }

    fn ids(page: &FetchedPage) -> Vec<u64> {
        page.records
            .iter()
            .map(|r| match r {
                Record::Group(g) => g.id,
                Record::Member(m) => m.user_id,
                Record::ProfileFieldGroup(g) => g.id,
                other => panic!("unexpected {:?}", other),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_groups_hide_hidden_and_order_desc() {
        let page = directory()
            .fetch_collection(&collection(ResourceKind::Group, &[], &Principal::anonymous()))
            .await
            .unwrap();
        assert_eq!(ids(&page), vec![9, 5]);
        assert_eq!(page.total, Some(2));
    }

    #[tokio::test]
    async fn test_moderator_sees_hidden_groups() {
        let moderator = Principal::user(1).with_capability("bp_moderate");
        let query = collection(ResourceKind::Group, &[("component", "groups"), ("order", "asc")], &moderator);
        let page = directory().fetch_collection(&query).await.unwrap();
        assert_eq!(ids(&page), vec![5, 6, 9]);
    }

    #[tokio::test]
    async fn test_group_filters() {
        let dir = directory();
        let by_author = collection(ResourceKind::Group, &[("author", "3")], &Principal::anonymous());
        assert_eq!(ids(&dir.fetch_collection(&by_author).await.unwrap()), vec![9, 5]);

        let by_type = collection(ResourceKind::Group, &[("type", "club")], &Principal::anonymous());
        assert_eq!(ids(&dir.fetch_collection(&by_type).await.unwrap()), vec![5]);

        let after = collection(ResourceKind::Group, &[("after", "2017-06-01T00:00:00Z")], &Principal::anonymous());
        assert_eq!(ids(&dir.fetch_collection(&after).await.unwrap()), vec![9]);

        let children = collection(ResourceKind::Group, &[("secondary_id", "5")], &Principal::anonymous());
        assert_eq!(ids(&dir.fetch_collection(&children).await.unwrap()), vec![9]);

        let other_component = collection(ResourceKind::Group, &[("component", "activity")], &Principal::anonymous());
        assert!(dir.fetch_collection(&other_component).await.unwrap().records.is_empty());
    }

    #[tokio::test]
    async fn test_group_include_skips_total() {
        let query = collection(ResourceKind::Group, &[("include", "5,9")], &Principal::anonymous());
        let page = directory().fetch_collection(&query).await.unwrap();
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.total, None);
    }

    #[tokio::test]
    async fn test_group_paging() {
        let query = collection(
            ResourceKind::Group,
            &[("per_page", "1"), ("page", "2")],
            &Principal::anonymous(),
        );
        let page = directory().fetch_collection(&query).await.unwrap();
        assert_eq!(ids(&page), vec![5]);
        assert_eq!(page.total, Some(2));
    }

    #[tokio::test]
    async fn test_viewer_membership_flags() {
        let query = builder()
            .build_item(ResourceKind::Group, 5, &RawParams::new(), &Principal::user(4))
            .unwrap();
        match directory().fetch_one(&query).await.unwrap() {
            Record::Group(group) => {
                assert_eq!(group.is_member, Some(StoredFlag::Bool(true)));
                assert_eq!(group.total_member_count, StoredInt::Int(2));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_group_is_not_found() {
        let result = directory().fetch_one(&item(ResourceKind::Group, 42, &[])).await;
        assert!(matches!(result, Err(AdapterError::NotFound)));
    }

    #[tokio::test]
    async fn test_member_lists() {
        let dir = directory();
        let alphabetical = collection(ResourceKind::Member, &[], &Principal::anonymous());
        assert_eq!(ids(&dir.fetch_collection(&alphabetical).await.unwrap()), vec![3, 4]);

        let newest = collection(ResourceKind::Member, &[("type", "newest")], &Principal::anonymous());
        assert_eq!(ids(&dir.fetch_collection(&newest).await.unwrap()), vec![4, 3]);

        let meta = collection(ResourceKind::Member, &[("meta_key", "city")], &Principal::anonymous());
        assert_eq!(ids(&dir.fetch_collection(&meta).await.unwrap()), vec![3]);

        let friends_of_3 = collection(ResourceKind::Member, &[("user_id", "3")], &Principal::anonymous());
        assert_eq!(ids(&dir.fetch_collection(&friends_of_3).await.unwrap()), vec![4]);

        let online = collection(ResourceKind::Member, &[("type", "online")], &Principal::anonymous());
        assert!(dir.fetch_collection(&online).await.unwrap().records.is_empty());
    }

    #[tokio::test]
    async fn test_populate_extras_off_drops_diary() {
        let query = collection(
            ResourceKind::Member,
            &[("populate_extras", "false"), ("include", "3")],
            &Principal::anonymous(),
        );
        match &directory().fetch_collection(&query).await.unwrap().records[0] {
            Record::Member(m) => assert_eq!(m.diary_title, None),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_field_group_overview() {
        let dir = directory();
        let all = collection(ResourceKind::ProfileFieldGroup, &[], &Principal::anonymous());
        let page = dir.fetch_collection(&all).await.unwrap();
        assert_eq!(ids(&page), vec![7, 8]);
        assert_eq!(page.total, None);

        let non_empty = collection(
            ResourceKind::ProfileFieldGroup,
            &[("hide_empty_groups", "1")],
            &Principal::anonymous(),
        );
        assert_eq!(ids(&dir.fetch_collection(&non_empty).await.unwrap()), vec![7]);
    }

    #[tokio::test]
    async fn test_field_group_with_fields() {
        let query = item(
            ResourceKind::ProfileFieldGroup,
            7,
            &[("fetch_fields", "1"), ("fetch_field_data", "1"), ("user_id", "3")],
        );
        match directory().fetch_one(&query).await.unwrap() {
            Record::ProfileFieldGroup(group) => {
                let fields = group.fields.unwrap();
                assert_eq!(fields.iter().map(|f| f.id).collect::<Vec<_>>(), vec![1, 2]);
                assert_eq!(fields[1].data.as_ref().unwrap().id, Some(11));
                assert_eq!(fields[0].data, Some(FieldData::default()));
                assert_eq!(fields[1].visibility_level, None);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_field_group_member_type_and_hide_empty() {
        let dir = directory();
        let students = item(
            ResourceKind::ProfileFieldGroup,
            7,
            &[("fetch_fields", "1"), ("member_type", "student")],
        );
        match dir.fetch_one(&students).await.unwrap() {
            Record::ProfileFieldGroup(group) => {
                assert_eq!(group.fields.unwrap().iter().map(|f| f.id).collect::<Vec<_>>(), vec![2]);
            }
            other => panic!("unexpected {:?}", other),
        }

        let non_empty = item(
            ResourceKind::ProfileFieldGroup,
            7,
            &[("fetch_fields", "1"), ("hide_empty_fields", "1"), ("user_id", "3")],
        );
        match dir.fetch_one(&non_empty).await.unwrap() {
            Record::ProfileFieldGroup(group) => assert_eq!(group.fields.unwrap().len(), 1),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_single_field_value() {
        let dir = directory();
        match dir.fetch_one(&item(ResourceKind::ProfileField, 2, &[("user_id", "3")])).await.unwrap() {
            Record::ProfileField(field) => assert_eq!(field.data.unwrap().value, "a:1:{i:0;s:3:\"red\";}"),
            other => panic!("unexpected {:?}", other),
        }
        match dir.fetch_one(&item(ResourceKind::ProfileField, 2, &[])).await.unwrap() {
            Record::ProfileField(field) => assert!(field.data.is_none()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_core_record() {
        match directory().fetch_one(&item(ResourceKind::Core, 0, &[])).await.unwrap() {
            Record::Core(core) => assert_eq!(core.version.as_deref(), Some("2.9.1")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_add_replaces_same_id() {
        let dir = InMemoryDirectory::new();
        let mut group = StoredGroup::default();
        group.record.id = 1;
        dir.add_group(group.clone()).unwrap();
        group.record.name = "Renamed".into();
        dir.add_group(group).unwrap();

        let data = dir.read().unwrap();
        assert_eq!(data.groups.len(), 1);
        assert_eq!(data.groups[0].record.name, "Renamed");
    }

    #[test]
    fn test_bad_seed_is_error() {
        assert!(InMemoryDirectory::from_yaml_str("groups: 12").is_err());
    }
}
