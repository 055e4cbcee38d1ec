//! Hyperlink assembly
//!
//! Every shaped item carries a `links` map of relation name to absolute URL.
//! URLs are built as `{base_url}/{namespace}/{version}/{rest_base}/...`.

use crate::config::RestConfig;
use crate::core::schema::ResourceKind;
use indexmap::IndexMap;
use serde::Serialize;

pub const SELF: &str = "self";
pub const COLLECTION: &str = "collection";
pub const AUTHOR: &str = "author";
pub const UP: &str = "up";

/// Relation name to absolute URL, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Links(IndexMap<&'static str, String>);

impl Links {
    pub fn insert(&mut self, relation: &'static str, href: String) {
        self.0.insert(relation, href);
    }

    pub fn get(&self, relation: &str) -> Option<&str> {
        self.0.get(relation).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Builds canonical URLs for every resource kind
#[derive(Debug, Clone)]
pub struct LinkBuilder {
    root: String,
    groups: String,
    members: String,
    profile: String,
}

impl LinkBuilder {
    pub fn new(config: &RestConfig) -> Self {
        let root = format!(
            "{}{}",
            config.base_url.trim_end_matches('/'),
            config.route_prefix()
        );
        Self {
            root,
            groups: config.rest_bases.groups.trim_matches('/').to_string(),
            members: config.rest_bases.members.trim_matches('/').to_string(),
            profile: config.rest_bases.profile.trim_matches('/').to_string(),
        }
    }

    /// Path of the collection of `kind`, relative to the namespace
    fn base(&self, kind: ResourceKind) -> String {
        match kind {
            ResourceKind::Core => "core".to_string(),
            ResourceKind::Group => self.groups.clone(),
            ResourceKind::Member => self.members.clone(),
            ResourceKind::ProfileFieldGroup => self.profile.clone(),
            ResourceKind::ProfileField => format!("{}/fields", self.profile),
        }
    }

    /// Collection URL, with trailing slash
    pub fn collection(&self, kind: ResourceKind) -> String {
        format!("{}/{}/", self.root, self.base(kind))
    }

    /// Canonical URL of one item
    pub fn item(&self, kind: ResourceKind, id: u64) -> String {
        format!("{}/{}/{}", self.root, self.base(kind), id)
    }

    /// `self` and `collection`
    pub fn standard(&self, kind: ResourceKind, id: u64) -> Links {
        let mut links = Links::default();
        links.insert(SELF, self.item(kind, id));
        links.insert(COLLECTION, self.collection(kind));
        links
    }

    pub fn core(&self) -> Links {
        let mut links = Links::default();
        links.insert(SELF, format!("{}/core", self.root));
        links
    }

    /// Group links; `author` points at the creator, `up` at the parent group
    pub fn group(&self, id: u64, creator_id: i64, parent_id: i64) -> Links {
        let mut links = self.standard(ResourceKind::Group, id);
        if let Some(creator) = positive(creator_id) {
            links.insert(AUTHOR, self.item(ResourceKind::Member, creator));
        }
        if let Some(parent) = positive(parent_id) {
            links.insert(UP, self.item(ResourceKind::Group, parent));
        }
        links
    }

    pub fn member(&self, user_id: u64) -> Links {
        self.standard(ResourceKind::Member, user_id)
    }

    pub fn field_group(&self, id: u64) -> Links {
        self.standard(ResourceKind::ProfileFieldGroup, id)
    }

    /// Field links; `up` points at the owning field group
    pub fn field(&self, id: u64, group_id: i64) -> Links {
        let mut links = self.standard(ResourceKind::ProfileField, id);
        if let Some(group) = positive(group_id) {
            links.insert(UP, self.item(ResourceKind::ProfileFieldGroup, group));
        }
        links
    }
}

fn positive(id: i64) -> Option<u64> {
    u64::try_from(id).ok().filter(|id| *id > 0)
}
