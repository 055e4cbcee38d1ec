//! Response shaper
//!
//! Converts one raw [`Record`] into its public JSON representation:
//!
//! 1. storage values are coerced to their schema type (flags, numeric
//!    strings, sentinel dates, serialized profile values)
//! 2. the schema's properties are walked in declaration order and only
//!    those visible in the requested [`Context`] are emitted
//! 3. a `links` map is attached
//!
//! Irregular storage values surface as [`ShapeError`]; the controller
//! reports them as upstream failures.

use crate::config::RestConfig;
use crate::core::adapter::{
    CoreRecord, FieldData, FieldGroupRecord, FieldRecord, GroupRecord, MemberRecord, Record,
    StoredFlag, StoredInt,
};
use crate::core::links::{LinkBuilder, Links};
use crate::core::schema::{Context, ResourceKind, ResourceSchema, SchemaRegistry};
use crate::core::serialized::maybe_unserialize;
use chrono::{DateTime, NaiveDateTime, SecondsFormat};
use indexmap::IndexMap;
use serde_json::{Map, Value, json};
use std::sync::Arc;

/// Stored value meaning "no date"
pub const ZERO_DATE: &str = "0000-00-00 00:00:00";

const STORAGE_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A record the adapter returned in a shape that violates the contract
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ShapeError {
    #[error("'{field}' holds '{value}', which is not an integer")]
    NotAnInteger { field: &'static str, value: String },

    #[error("'{field}' holds '{value}', which is not a date")]
    InvalidDate { field: &'static str, value: String },

    #[error("'{field}' holds '{value}', which is not one of {allowed:?}")]
    NotInEnum {
        field: &'static str,
        value: String,
        allowed: Vec<String>,
    },

    #[error("expected a {expected} record, got {found}")]
    KindMismatch {
        expected: ResourceKind,
        found: ResourceKind,
    },
}

/// Optional parts of a representation, all off by default
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShapeFlags {
    /// Emit `data` on profile fields
    pub field_data: bool,

    /// Emit `visibility_level` on profile fields
    pub visibility_level: bool,
}

/// Public values of one record keyed by property name, before projection
pub type Candidates = IndexMap<&'static str, Value>;

/// Shapes records of every kind
#[derive(Clone)]
pub struct ResponseShaper {
    config: Arc<RestConfig>,
    schemas: Arc<SchemaRegistry>,
    links: LinkBuilder,
}

impl ResponseShaper {
    pub fn new(config: Arc<RestConfig>, schemas: Arc<SchemaRegistry>) -> Self {
        let links = LinkBuilder::new(&config);
        Self {
            config,
            schemas,
            links,
        }
    }

    pub fn links(&self) -> &LinkBuilder {
        &self.links
    }

    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    /// Shape a record of the expected kind, with links
    pub fn shape(
        &self,
        expected: ResourceKind,
        record: &Record,
        context: Context,
        flags: ShapeFlags,
    ) -> Result<Value, ShapeError> {
        if record.kind() != expected {
            return Err(ShapeError::KindMismatch {
                expected,
                found: record.kind(),
            });
        }

        let (candidates, links) = match record {
            Record::Core(core) => (self.core_candidates(core), self.links.core()),
            Record::Group(group) => self.group(group)?,
            Record::Member(member) => self.member(member)?,
            Record::ProfileFieldGroup(group) => self.field_group(group)?,
            Record::ProfileField(field) => {
                let links = self.links.field(field.id, int("group_id", &field.group_id)?);
                (field_candidates(field, flags)?, links)
            }
        };

        Ok(self.finish(expected, candidates, context, Some(links)))
    }

    /// Project candidates onto the schema of `kind` for `context`, then
    /// attach links when given
    pub fn finish(
        &self,
        kind: ResourceKind,
        candidates: Candidates,
        context: Context,
        links: Option<Links>,
    ) -> Value {
        let mut object = project(self.schemas.schema_for(kind), candidates, context);
        if let Some(links) = links {
            object.insert("links".to_string(), json!(links));
        }
        Value::Object(object)
    }

    fn core_candidates(&self, core: &CoreRecord) -> Candidates {
        let mut page_ids = self.config.core.component_page_ids.clone();
        page_ids.extend(core.component_page_ids.clone());

        let version = core
            .version
            .clone()
            .unwrap_or_else(|| self.config.core.version.clone());

        IndexMap::from([
            ("version", json!(version)),
            ("active_components", json!(self.config.active_components)),
            ("component_page_ids", json!(page_ids)),
        ])
    }

    fn group(&self, group: &GroupRecord) -> Result<(Candidates, Links), ShapeError> {
        let creator_id = int("creator_id", &group.creator_id)?;
        let parent_id = int("parent_id", &group.parent_id)?;
        let status = self.enum_value(ResourceKind::Group, "status", &group.status)?;

        let candidates = IndexMap::from([
            ("id", json!(group.id)),
            ("name", json!(group.name)),
            ("slug", json!(group.slug)),
            ("description", json!(group.description)),
            ("creator_id", json!(creator_id)),
            ("parent_id", json!(parent_id)),
            ("status", json!(status)),
            ("date_created", date("date_created", group.date_created.as_deref())?),
            ("last_activity", date("last_activity", group.last_activity.as_deref())?),
            ("total_member_count", json!(int("total_member_count", &group.total_member_count)?)),
            ("is_member", json!(flag(&group.is_member))),
            ("is_invited", json!(flag(&group.is_invited))),
            ("is_pending", json!(flag(&group.is_pending))),
            ("is_banned", json!(flag(&group.is_banned))),
            ("link", json!(group.permalink)),
            ("avatar", json!(group.avatar.as_deref().unwrap_or_default())),
        ]);

        Ok((candidates, self.links.group(group.id, creator_id, parent_id)))
    }

    fn member(&self, member: &MemberRecord) -> Result<(Candidates, Links), ShapeError> {
        let candidates = IndexMap::from([
            ("user_id", json!(member.user_id)),
            ("user_name", json!(member.display_name)),
            ("user_nicename", json!(member.user_nicename)),
            ("user_avatar", json!(member.avatar.as_deref().unwrap_or_default())),
            ("user_permalink", json!(member.permalink)),
            ("diary_title", json!(member.diary_title.as_deref().unwrap_or_default())),
            ("total_friend_count", json!(int("total_friend_count", &member.total_friend_count)?)),
        ]);
        Ok((candidates, self.links.member(member.user_id)))
    }

    fn field_group(&self, group: &FieldGroupRecord) -> Result<(Candidates, Links), ShapeError> {
        Ok((
            field_group_candidates(group)?,
            self.links.field_group(group.id),
        ))
    }

    /// Record value of an enum-typed property, checked against the schema
    fn enum_value<'a>(
        &self,
        kind: ResourceKind,
        field: &'static str,
        value: &'a str,
    ) -> Result<&'a str, ShapeError> {
        let allowed = self
            .schemas
            .schema_for(kind)
            .property_descriptor(field)
            .and_then(|d| d.enum_values.as_ref());
        match allowed {
            Some(allowed) if !allowed.iter().any(|a| a == value) => Err(ShapeError::NotInEnum {
                field,
                value: value.to_string(),
                allowed: allowed.clone(),
            }),
            _ => Ok(value),
        }
    }
}

/// Schema-ordered, context-filtered projection
pub fn project(schema: &ResourceSchema, mut candidates: Candidates, context: Context) -> Map<String, Value> {
    let mut object = Map::new();
    for (name, descriptor) in schema.properties() {
        if !descriptor.visible_in(context) {
            continue;
        }
        if let Some(value) = candidates.shift_remove(name) {
            object.insert(name.to_string(), value);
        }
    }
    object
}

pub(crate) fn field_group_candidates(group: &FieldGroupRecord) -> Result<Candidates, ShapeError> {
    Ok(IndexMap::from([
        ("id", json!(group.id)),
        ("name", json!(group.name)),
        ("description", json!(group.description)),
        ("group_order", json!(int("group_order", &group.group_order)?)),
        ("can_delete", json!(flag(&group.can_delete))),
    ]))
}

/// Field values; `visibility_level` and `data` only when flagged
pub(crate) fn field_candidates(field: &FieldRecord, flags: ShapeFlags) -> Result<Candidates, ShapeError> {
    let mut candidates = IndexMap::from([
        ("id", json!(field.id)),
        ("group_id", json!(int("group_id", &field.group_id)?)),
        ("parent_id", json!(int("parent_id", &field.parent_id)?)),
        ("type", json!(field.field_type)),
        ("name", json!(field.name)),
        ("description", json!(field.description)),
        ("is_required", json!(flag(&field.is_required))),
        ("can_delete", json!(flag(&field.can_delete))),
        ("field_order", json!(int("field_order", &field.field_order)?)),
        ("option_order", json!(int("option_order", &field.option_order)?)),
        ("order_by", json!(field.order_by)),
        ("is_default_option", json!(flag(&field.is_default_option))),
    ]);

    if let Some(level) = field.visibility_level.as_ref().filter(|_| flags.visibility_level) {
        candidates.insert("visibility_level", json!(level));
    }
    if let Some(data) = field.data.as_ref().filter(|_| flags.field_data) {
        candidates.insert("data", field_data(data));
    }

    Ok(candidates)
}

fn field_data(data: &FieldData) -> Value {
    let mut object = Map::new();
    if let Some(id) = data.id {
        object.insert("id".to_string(), json!(id));
    }
    object.insert("value".to_string(), maybe_unserialize(&data.value));
    Value::Object(object)
}

// =============================================================================
// Storage coercions
// =============================================================================

/// Integer from a native or numeric-text column; empty text is 0
pub fn int(field: &'static str, stored: &StoredInt) -> Result<i64, ShapeError> {
    match stored {
        StoredInt::Int(n) => Ok(*n),
        StoredInt::Text(s) if s.trim().is_empty() => Ok(0),
        StoredInt::Text(s) => s.trim().parse().map_err(|_| ShapeError::NotAnInteger {
            field,
            value: s.clone(),
        }),
    }
}

/// Boolean from tri-state storage: null, `0`, `""` and `false` are false
pub fn flag(stored: &Option<StoredFlag>) -> bool {
    match stored {
        None => false,
        Some(StoredFlag::Bool(b)) => *b,
        Some(StoredFlag::Int(n)) => *n != 0,
        Some(StoredFlag::Text(s)) => !matches!(s.trim(), "" | "0" | "false"),
    }
}

/// RFC-3339 UTC date from a stored date, `null` for the zero date
///
/// Accepts `YYYY-MM-DD HH:MM:SS` (read as UTC) and RFC-3339 input, so the
/// conversion is idempotent.
pub fn date(field: &'static str, stored: Option<&str>) -> Result<Value, ShapeError> {
    let Some(raw) = stored.map(str::trim).filter(|s| !s.is_empty() && *s != ZERO_DATE) else {
        return Ok(Value::Null);
    };

    let utc = NaiveDateTime::parse_from_str(raw, STORAGE_DATE_FORMAT)
        .map(|naive| naive.and_utc())
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.to_utc()))
        .map_err(|_| ShapeError::InvalidDate {
            field,
            value: raw.to_string(),
        })?;

    Ok(json!(utc.to_rfc3339_opts(SecondsFormat::Secs, true)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shaper() -> ResponseShaper {
        let config = Arc::new(RestConfig::default_config());
        let schemas = Arc::new(SchemaRegistry::new(&config));
        ResponseShaper::new(config, schemas)
    }

    fn group() -> GroupRecord {
        GroupRecord {
            id: 5,
            name: "Chess Club".into(),
            slug: "chess-club".into(),
            description: "Weekly games".into(),
            creator_id: "3".into(),
            parent_id: 0.into(),
            status: "public".into(),
            date_created: Some("2016-05-01 10:00:00".into()),
            last_activity: Some(ZERO_DATE.into()),
            total_member_count: "12".into(),
            is_member: Some("1".into()),
            is_invited: None,
            is_pending: Some(StoredFlag::Int(0)),
            is_banned: Some(false.into()),
            permalink: "http://localhost/groups/chess-club/".into(),
            avatar: None,
        }
    }

    fn field() -> FieldRecord {
        FieldRecord {
            id: 2,
            group_id: 7.into(),
            field_type: "checkbox".into(),
            name: "Colours".into(),
            visibility_level: Some("public".into()),
            data: Some(FieldData {
                id: Some(11),
                value: "a:2:{i:0;s:3:\"red\";i:1;s:4:\"blue\";}".into(),
            }),
            ..FieldRecord::default()
        }
    }

    // === Coercions ===

    #[test]
    fn test_int_coercion() {
        assert_eq!(int("n", &"42".into()).unwrap(), 42);
        assert_eq!(int("n", &StoredInt::Int(-1)).unwrap(), -1);
        assert_eq!(int("n", &"".into()).unwrap(), 0);
        assert!(matches!(
            int("n", &"forty".into()),
            Err(ShapeError::NotAnInteger { field: "n", .. })
        ));
    }

    #[test]
    fn test_flag_coercion() {
        assert!(!flag(&None));
        assert!(!flag(&Some("0".into())));
        assert!(!flag(&Some("".into())));
        assert!(flag(&Some("1".into())));
        assert!(flag(&Some(StoredFlag::Int(1))));
        assert!(!flag(&Some(false.into())));
    }

    #[test]
    fn test_zero_date_is_null() {
        assert_eq!(date("d", Some(ZERO_DATE)).unwrap(), Value::Null);
        assert_eq!(date("d", None).unwrap(), Value::Null);
        assert_eq!(date("d", Some("")).unwrap(), Value::Null);
    }

    #[test]
    fn test_date_is_rfc3339() {
        assert_eq!(
            date("d", Some("2016-05-01 10:00:00")).unwrap(),
            json!("2016-05-01T10:00:00Z")
        );
    }

    #[test]
    fn test_date_conversion_is_idempotent() {
        let once = date("d", Some("2016-05-01 10:00:00")).unwrap();
        let twice = date("d", once.as_str()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_unparseable_date_is_error() {
        assert!(matches!(
            date("d", Some("yesterday")),
            Err(ShapeError::InvalidDate { .. })
        ));
    }

    // === Groups ===

    #[test]
    fn test_group_view() {
        let out = shaper()
            .shape(ResourceKind::Group, &Record::Group(group()), Context::View, ShapeFlags::default())
            .unwrap();

        assert_eq!(out["id"], 5);
        assert_eq!(out["creator_id"], 3);
        assert_eq!(out["total_member_count"], 12);
        assert_eq!(out["is_member"], true);
        assert_eq!(out["is_invited"], false);
        assert_eq!(out["is_pending"], false);
        assert_eq!(out["date_created"], "2016-05-01T10:00:00Z");
        assert_eq!(out["last_activity"], Value::Null);
        assert_eq!(out["avatar"], "");
        assert_eq!(out["links"]["author"], "http://localhost:8080/buddypress/v1/members/3");
        assert!(out["links"].get("up").is_none());
    }

    #[test]
    fn test_group_property_order() {
        let out = shaper()
            .shape(ResourceKind::Group, &Record::Group(group()), Context::View, ShapeFlags::default())
            .unwrap();
        let keys: Vec<&String> = out.as_object().unwrap().keys().take(3).collect();
        assert_eq!(keys, vec!["id", "name", "slug"]);
    }

    #[test]
    fn test_embed_context_filters_properties() {
        let out = shaper()
            .shape(ResourceKind::Group, &Record::Group(group()), Context::Embed, ShapeFlags::default())
            .unwrap();
        let keys: Vec<&String> = out.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["id", "name", "avatar", "links"]);
    }

    #[test]
    fn test_every_emitted_property_is_visible_in_context() {
        let shaper = shaper();
        let schema = shaper.schemas().schema_for(ResourceKind::Group);
        for context in Context::ALL {
            let out = shaper
                .shape(ResourceKind::Group, &Record::Group(group()), context, ShapeFlags::default())
                .unwrap();
            for key in out.as_object().unwrap().keys().filter(|k| *k != "links") {
                let descriptor = schema.property_descriptor(key).unwrap();
                assert!(descriptor.visible_in(context), "{} leaked into {:?}", key, context);
            }
        }
    }

    #[test]
    fn test_unknown_group_status_is_error() {
        let mut record = group();
        record.status = "secret".into();
        let err = shaper()
            .shape(ResourceKind::Group, &Record::Group(record), Context::View, ShapeFlags::default())
            .unwrap_err();
        assert!(matches!(err, ShapeError::NotInEnum { field: "status", .. }));
    }

    #[test]
    fn test_kind_mismatch() {
        let err = shaper()
            .shape(ResourceKind::Member, &Record::Group(group()), Context::View, ShapeFlags::default())
            .unwrap_err();
        assert_eq!(
            err,
            ShapeError::KindMismatch {
                expected: ResourceKind::Member,
                found: ResourceKind::Group
            }
        );
    }

    // === Members ===

    #[test]
    fn test_member() {
        let member = MemberRecord {
            user_id: 3,
            display_name: "Ada Lovelace".into(),
            user_nicename: "ada".into(),
            avatar: Some("http://localhost/avatars/3.png".into()),
            permalink: "http://localhost/members/ada/".into(),
            diary_title: None,
            total_friend_count: "4".into(),
        };
        let out = shaper()
            .shape(ResourceKind::Member, &Record::Member(member), Context::View, ShapeFlags::default())
            .unwrap();
        assert_eq!(out["user_name"], "Ada Lovelace");
        assert_eq!(out["total_friend_count"], 4);
        assert_eq!(out["diary_title"], "");
        assert_eq!(out["links"]["self"], "http://localhost:8080/buddypress/v1/members/3");

        let embedded = shaper()
            .shape(
                ResourceKind::Member,
                &Record::Member(MemberRecord::default()),
                Context::Embed,
                ShapeFlags::default(),
            )
            .unwrap();
        assert_eq!(embedded.as_object().unwrap().len(), 1);
    }

    // === Profile fields ===

    #[test]
    fn test_field_optional_parts_off() {
        let out = shaper()
            .shape(ResourceKind::ProfileField, &Record::ProfileField(field()), Context::View, ShapeFlags::default())
            .unwrap();
        assert!(out.get("data").is_none());
        assert!(out.get("visibility_level").is_none());
        assert_eq!(out["links"]["up"], "http://localhost:8080/buddypress/v1/xprofile/7");
    }

    #[test]
    fn test_field_optional_parts_on() {
        let flags = ShapeFlags {
            field_data: true,
            visibility_level: true,
        };
        let out = shaper()
            .shape(ResourceKind::ProfileField, &Record::ProfileField(field()), Context::View, flags)
            .unwrap();
        assert_eq!(out["visibility_level"], "public");
        assert_eq!(out["data"], json!({"id": 11, "value": ["red", "blue"]}));
    }

    #[test]
    fn test_field_data_flag_without_stored_data() {
        let mut record = field();
        record.data = None;
        let flags = ShapeFlags {
            field_data: true,
            visibility_level: false,
        };
        let out = shaper()
            .shape(ResourceKind::ProfileField, &Record::ProfileField(record), Context::View, flags)
            .unwrap();
        assert!(out.get("data").is_none());
    }

    // === Core ===

    #[test]
    fn test_core_merges_page_ids() {
        let core = CoreRecord {
            version: None,
            component_page_ids: [("activity".to_string(), 9)].into_iter().collect(),
        };
        let out = shaper()
            .shape(ResourceKind::Core, &Record::Core(core), Context::View, ShapeFlags::default())
            .unwrap();
        assert_eq!(out["version"], "2.9.0");
        assert_eq!(out["component_page_ids"]["groups"], 4);
        assert_eq!(out["component_page_ids"]["activity"], 9);
        assert_eq!(out["active_components"][0], "core");
    }
}
