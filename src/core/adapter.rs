//! Domain fetch adapter contract
//!
//! The adapter is the only component that talks to the domain store. It
//! receives already-validated queries and returns raw records in storage
//! shape: numbers may arrive as numeric strings, flags as `"0"`/`"1"`/null,
//! and dates as `YYYY-MM-DD HH:MM:SS` text. The response shaper owns all
//! coercion into the public representation.

use crate::core::query::{CollectionQuery, ItemQuery};
use crate::core::schema::ResourceKind;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Errors an adapter may report
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// The requested item does not exist
    #[error("not found")]
    NotFound,

    /// Any other failure of the domain store
    #[error(transparent)]
    Failure(#[from] anyhow::Error),
}

/// One page of a collection read
#[derive(Debug, Clone, Default)]
pub struct FetchedPage {
    pub records: Vec<Record>,

    /// Size of the full result set, present when the query asked for it
    pub total: Option<u64>,
}

impl FetchedPage {
    pub fn new(records: Vec<Record>, total: Option<u64>) -> Self {
        Self { records, total }
    }
}

/// Executes typed queries against the domain store
#[async_trait]
pub trait DomainFetchAdapter: Send + Sync {
    async fn fetch_collection(&self, query: &CollectionQuery) -> Result<FetchedPage, AdapterError>;

    async fn fetch_one(&self, query: &ItemQuery) -> Result<Record, AdapterError>;
}

// =============================================================================
// Storage values
// =============================================================================

/// An integer column as stored: native or numeric text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredInt {
    Int(i64),
    Text(String),
}

impl Default for StoredInt {
    fn default() -> Self {
        StoredInt::Int(0)
    }
}

impl From<i64> for StoredInt {
    fn from(n: i64) -> Self {
        StoredInt::Int(n)
    }
}

impl From<&str> for StoredInt {
    fn from(s: &str) -> Self {
        StoredInt::Text(s.to_string())
    }
}

/// A boolean column as stored; `None` (null) means false
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredFlag {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl From<bool> for StoredFlag {
    fn from(b: bool) -> Self {
        StoredFlag::Bool(b)
    }
}

impl From<&str> for StoredFlag {
    fn from(s: &str) -> Self {
        StoredFlag::Text(s.to_string())
    }
}

// =============================================================================
// Records
// =============================================================================

/// A raw domain record of any kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Core(CoreRecord),
    Group(GroupRecord),
    Member(MemberRecord),
    ProfileFieldGroup(FieldGroupRecord),
    ProfileField(FieldRecord),
}

impl Record {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Record::Core(_) => ResourceKind::Core,
            Record::Group(_) => ResourceKind::Group,
            Record::Member(_) => ResourceKind::Member,
            Record::ProfileFieldGroup(_) => ResourceKind::ProfileFieldGroup,
            Record::ProfileField(_) => ResourceKind::ProfileField,
        }
    }
}

/// Runtime metadata the domain knows beyond configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoreRecord {
    /// Overrides the configured version when set
    #[serde(default)]
    pub version: Option<String>,

    /// Directory page ids discovered by the domain, merged over configuration
    #[serde(default)]
    pub component_page_ids: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub id: u64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    pub creator_id: StoredInt,
    #[serde(default)]
    pub parent_id: StoredInt,
    /// public, private or hidden
    pub status: String,
    #[serde(default)]
    pub date_created: Option<String>,
    #[serde(default)]
    pub last_activity: Option<String>,
    #[serde(default)]
    pub total_member_count: StoredInt,
    #[serde(default)]
    pub is_member: Option<StoredFlag>,
    #[serde(default)]
    pub is_invited: Option<StoredFlag>,
    #[serde(default)]
    pub is_pending: Option<StoredFlag>,
    #[serde(default)]
    pub is_banned: Option<StoredFlag>,
    pub permalink: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemberRecord {
    pub user_id: u64,
    pub display_name: String,
    pub user_nicename: String,
    #[serde(default)]
    pub avatar: Option<String>,
    pub permalink: String,
    #[serde(default)]
    pub diary_title: Option<String>,
    #[serde(default)]
    pub total_friend_count: StoredInt,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldGroupRecord {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub group_order: StoredInt,
    #[serde(default)]
    pub can_delete: Option<StoredFlag>,

    /// Loaded only when fields were requested
    #[serde(default)]
    pub fields: Option<Vec<FieldRecord>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldRecord {
    pub id: u64,
    pub group_id: StoredInt,
    #[serde(default)]
    pub parent_id: StoredInt,
    #[serde(rename = "type")]
    pub field_type: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_required: Option<StoredFlag>,
    #[serde(default)]
    pub can_delete: Option<StoredFlag>,
    #[serde(default)]
    pub field_order: StoredInt,
    #[serde(default)]
    pub option_order: StoredInt,
    #[serde(default)]
    pub order_by: String,
    #[serde(default)]
    pub is_default_option: Option<StoredFlag>,
    #[serde(default)]
    pub visibility_level: Option<String>,
    #[serde(default)]
    pub data: Option<FieldData>,
}

/// A user's stored value for one field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldData {
    #[serde(default)]
    pub id: Option<u64>,

    /// Raw stored value, possibly in serialized form
    pub value: String,
}
