//! Schema registry
//!
//! Static descriptors for every resource kind: the ordered list of public
//! properties (with their JSON type and the display contexts they appear in)
//! and the query parameters each kind accepts (with defaults and enum
//! constraints). The registry is built once from [`RestConfig`] at startup and
//! is immutable afterwards.

use crate::config::RestConfig;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeSet;
use std::fmt;

/// The resource kinds exposed by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Core,
    Group,
    Member,
    ProfileFieldGroup,
    ProfileField,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Core,
        ResourceKind::Group,
        ResourceKind::Member,
        ResourceKind::ProfileFieldGroup,
        ResourceKind::ProfileField,
    ];

    /// Stable snake_case name, used in errors, logs and configuration keys
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Core => "core",
            ResourceKind::Group => "group",
            ResourceKind::Member => "member",
            ResourceKind::ProfileFieldGroup => "profile_field_group",
            ResourceKind::ProfileField => "profile_field",
        }
    }

    /// Component that owns the routes of this kind
    pub fn component(&self) -> &'static str {
        match self {
            ResourceKind::Core => "core",
            ResourceKind::Group => "groups",
            ResourceKind::Member => "members",
            ResourceKind::ProfileFieldGroup | ResourceKind::ProfileField => "xprofile",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named display mode controlling which properties are emitted
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Context {
    #[default]
    View,
    Edit,
    Embed,
}

impl Context {
    pub const ALL: [Context; 3] = [Context::View, Context::Edit, Context::Embed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Context::View => "view",
            Context::Edit => "edit",
            Context::Embed => "embed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }
}

const VIEW: &[Context] = &[Context::View];
const VIEW_EDIT: &[Context] = &[Context::View, Context::Edit];
const ALL_CONTEXTS: &[Context] = &[Context::View, Context::Edit, Context::Embed];

/// JSON type of a property or parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyType {
    String,
    Integer,
    Boolean,
    Array,
    Object,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::String => "string",
            PropertyType::Integer => "integer",
            PropertyType::Boolean => "boolean",
            PropertyType::Array => "array",
            PropertyType::Object => "object",
        }
    }
}

/// Descriptor of one public property of a resource
#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    pub property_type: PropertyType,
    pub contexts: BTreeSet<Context>,
    pub enum_values: Option<Vec<String>>,
    pub readonly: bool,
    pub nullable: bool,
    pub format: Option<&'static str>,
    pub description: &'static str,
}

impl PropertyDescriptor {
    fn new(property_type: PropertyType, contexts: &[Context], description: &'static str) -> Self {
        Self {
            property_type,
            contexts: contexts.iter().copied().collect(),
            enum_values: None,
            readonly: false,
            nullable: false,
            format: None,
            description,
        }
    }

    fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    fn date_time(mut self) -> Self {
        self.format = Some("date-time");
        self.nullable = true;
        self
    }

    fn url(mut self) -> Self {
        self.format = Some("uri");
        self
    }

    fn one_of(mut self, values: &[&str]) -> Self {
        self.enum_values = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }

    /// Whether this property is emitted in the given context
    pub fn visible_in(&self, context: Context) -> bool {
        self.contexts.contains(&context)
    }

    fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("description".into(), json!(self.description));
        if self.nullable {
            obj.insert("type".into(), json!([self.property_type.as_str(), "null"]));
        } else {
            obj.insert("type".into(), json!(self.property_type.as_str()));
        }
        obj.insert(
            "context".into(),
            json!(self.contexts.iter().map(Context::as_str).collect::<Vec<_>>()),
        );
        if let Some(format) = self.format {
            obj.insert("format".into(), json!(format));
        }
        if let Some(values) = &self.enum_values {
            obj.insert("enum".into(), json!(values));
        }
        if self.readonly {
            obj.insert("readonly".into(), json!(true));
        }
        Value::Object(obj)
    }
}

/// Descriptor of one accepted query parameter
#[derive(Debug, Clone)]
pub struct ParamDescriptor {
    pub param_type: PropertyType,
    pub default: Option<Value>,
    pub enum_values: Option<Vec<String>>,
    pub description: &'static str,
}

impl ParamDescriptor {
    fn new(param_type: PropertyType, description: &'static str) -> Self {
        Self {
            param_type,
            default: None,
            enum_values: None,
            description,
        }
    }

    fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    fn one_of<S: AsRef<str>>(mut self, values: &[S]) -> Self {
        self.enum_values = Some(values.iter().map(|v| v.as_ref().to_string()).collect());
        self
    }

    fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("description".into(), json!(self.description));
        obj.insert("type".into(), json!(self.param_type.as_str()));
        if let Some(default) = &self.default {
            obj.insert("default".into(), default.clone());
        }
        if let Some(values) = &self.enum_values {
            obj.insert("enum".into(), json!(values));
        }
        Value::Object(obj)
    }
}

/// Schema of one resource kind
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub kind: ResourceKind,
    pub title: &'static str,
    properties: IndexMap<&'static str, PropertyDescriptor>,
    params: IndexMap<&'static str, ParamDescriptor>,
}

impl ResourceSchema {
    fn new(kind: ResourceKind, title: &'static str) -> Self {
        Self {
            kind,
            title,
            properties: IndexMap::new(),
            params: IndexMap::new(),
        }
    }

    fn property(mut self, name: &'static str, descriptor: PropertyDescriptor) -> Self {
        self.properties.insert(name, descriptor);
        self
    }

    fn param(mut self, name: &'static str, descriptor: ParamDescriptor) -> Self {
        self.params.insert(name, descriptor);
        self
    }

    /// Properties in declaration order
    pub fn properties(&self) -> impl Iterator<Item = (&'static str, &PropertyDescriptor)> {
        self.properties.iter().map(|(name, d)| (*name, d))
    }

    pub fn property_descriptor(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.get(name)
    }

    pub fn param_descriptor(&self, name: &str) -> Option<&ParamDescriptor> {
        self.params.get(name)
    }

    /// Declared enum of a query parameter, if any
    pub fn param_enum(&self, name: &str) -> Option<&[String]> {
        self.params
            .get(name)
            .and_then(|p| p.enum_values.as_deref())
    }

    /// JSON-Schema (draft-04) document, with accepted parameters under `args`
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .properties
            .iter()
            .map(|(name, d)| (name.to_string(), d.to_json()))
            .collect();
        let args: Map<String, Value> = self
            .params
            .iter()
            .map(|(name, d)| (name.to_string(), d.to_json()))
            .collect();

        json!({
            "$schema": "http://json-schema.org/draft-04/schema#",
            "title": self.title,
            "type": "object",
            "properties": properties,
            "args": args,
        })
    }
}

/// Registry of every resource schema
///
/// One schema per [`ResourceKind`]; there is no lookup failure path.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    core: ResourceSchema,
    group: ResourceSchema,
    member: ResourceSchema,
    profile_field_group: ResourceSchema,
    profile_field: ResourceSchema,
}

impl SchemaRegistry {
    pub fn new(config: &RestConfig) -> Self {
        Self {
            core: core_schema(),
            group: group_schema(config),
            member: member_schema(config),
            profile_field_group: profile_field_group_schema(config),
            profile_field: profile_field_schema(),
        }
    }

    pub fn schema_for(&self, kind: ResourceKind) -> &ResourceSchema {
        match kind {
            ResourceKind::Core => &self.core,
            ResourceKind::Group => &self.group,
            ResourceKind::Member => &self.member,
            ResourceKind::ProfileFieldGroup => &self.profile_field_group,
            ResourceKind::ProfileField => &self.profile_field,
        }
    }
}

// =============================================================================
// Schema definitions
// =============================================================================

use PropertyType::{Array, Boolean, Integer, Object, String as Str};

fn context_param() -> ParamDescriptor {
    ParamDescriptor::new(Str, "Scope under which the request is made; determines fields present in response.")
        .default_value(json!("view"))
        .one_of(&["view", "edit", "embed"])
}

fn with_pagination(schema: ResourceSchema, config: &RestConfig) -> ResourceSchema {
    schema
        .param(
            "page",
            ParamDescriptor::new(Integer, "Current page of the collection.").default_value(json!(1)),
        )
        .param(
            "per_page",
            ParamDescriptor::new(Integer, "Maximum number of items to be returned in result set.")
                .default_value(json!(config.default_per_page)),
        )
        .param(
            "search",
            ParamDescriptor::new(Str, "Limit results to those matching a string.")
                .default_value(json!("")),
        )
        .param(
            "include",
            ParamDescriptor::new(Array, "Ensure result set includes specific IDs.")
                .default_value(json!([])),
        )
        .param(
            "exclude",
            ParamDescriptor::new(Array, "Ensure result set excludes specific IDs.")
                .default_value(json!([])),
        )
}

fn core_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::Core, "core")
        .property(
            "version",
            PropertyDescriptor::new(Str, VIEW, "Platform version.").readonly(),
        )
        .property(
            "active_components",
            PropertyDescriptor::new(Array, VIEW, "Active components.").readonly(),
        )
        .property(
            "component_page_ids",
            PropertyDescriptor::new(Object, VIEW, "Directory page ids keyed by component.")
                .readonly(),
        )
        .param("context", context_param())
}

fn group_schema(config: &RestConfig) -> ResourceSchema {
    let schema = ResourceSchema::new(ResourceKind::Group, "groups")
        .property(
            "id",
            PropertyDescriptor::new(Integer, ALL_CONTEXTS, "A unique numeric ID for the group.")
                .readonly(),
        )
        .property(
            "name",
            PropertyDescriptor::new(Str, ALL_CONTEXTS, "Name of the group."),
        )
        .property(
            "slug",
            PropertyDescriptor::new(Str, VIEW_EDIT, "The slug of the group."),
        )
        .property(
            "description",
            PropertyDescriptor::new(Str, VIEW_EDIT, "Description of the group."),
        )
        .property(
            "creator_id",
            PropertyDescriptor::new(Integer, VIEW_EDIT, "The ID of the user who created the group."),
        )
        .property(
            "parent_id",
            PropertyDescriptor::new(Integer, VIEW_EDIT, "The ID of the parent group, 0 if none."),
        )
        .property(
            "status",
            PropertyDescriptor::new(Str, VIEW_EDIT, "Visibility status of the group.")
                .one_of(&["public", "private", "hidden"]),
        )
        .property(
            "date_created",
            PropertyDescriptor::new(Str, VIEW_EDIT, "The date the group was created, in GMT.")
                .date_time(),
        )
        .property(
            "last_activity",
            PropertyDescriptor::new(Str, VIEW_EDIT, "The date of the last group activity, in GMT.")
                .date_time(),
        )
        .property(
            "total_member_count",
            PropertyDescriptor::new(Integer, VIEW_EDIT, "How many members are part of this group."),
        )
        .property(
            "is_member",
            PropertyDescriptor::new(Boolean, VIEW_EDIT, "Whether the current user is a member."),
        )
        .property(
            "is_invited",
            PropertyDescriptor::new(Boolean, VIEW_EDIT, "Whether the current user is invited."),
        )
        .property(
            "is_pending",
            PropertyDescriptor::new(Boolean, VIEW_EDIT, "Whether the current user has a pending request."),
        )
        .property(
            "is_banned",
            PropertyDescriptor::new(Boolean, VIEW_EDIT, "Whether the current user is banned."),
        )
        .property(
            "link",
            PropertyDescriptor::new(Str, VIEW_EDIT, "The permalink to this group on the site.")
                .url(),
        )
        .property(
            "avatar",
            PropertyDescriptor::new(Str, ALL_CONTEXTS, "Thumbnail avatar URL of the group.").url(),
        )
        .param("context", context_param());

    with_pagination(schema, config)
        .param(
            "order",
            ParamDescriptor::new(Str, "Order sort attribute ascending or descending.")
                .default_value(json!("desc"))
                .one_of(&["asc", "desc"]),
        )
        .param(
            "after",
            ParamDescriptor::new(Str, "Limit result set to items created after a given ISO8601 date."),
        )
        .param(
            "author",
            ParamDescriptor::new(Integer, "Limit result set to items created by a specific user.")
                .default_value(json!(0)),
        )
        .param(
            "status",
            ParamDescriptor::new(Str, "Limit result set to items with a specific status.")
                .default_value(json!("published"))
                .one_of(&["published", "spam"]),
        )
        .param(
            "primary_id",
            ParamDescriptor::new(Array, "Limit result set to items with a specific primary association.")
                .default_value(json!([])),
        )
        .param(
            "secondary_id",
            ParamDescriptor::new(Array, "Limit result set to items with a specific secondary association.")
                .default_value(json!([])),
        )
        .param(
            "component",
            ParamDescriptor::new(Str, "Limit result set to items with a specific component.")
                .one_of(&config.components),
        )
        .param(
            "type",
            ParamDescriptor::new(Str, "Limit result set to items with a specific action type."),
        )
        .param(
            "show_hidden",
            ParamDescriptor::new(Boolean, "Ignored; hidden items are shown only to members and moderators.")
                .default_value(json!(false)),
        )
}

fn member_schema(config: &RestConfig) -> ResourceSchema {
    let schema = ResourceSchema::new(ResourceKind::Member, "members")
        .property(
            "user_id",
            PropertyDescriptor::new(Integer, VIEW_EDIT, "A unique numeric ID for the user.")
                .readonly(),
        )
        .property(
            "user_name",
            PropertyDescriptor::new(Str, VIEW_EDIT, "The display name of the user."),
        )
        .property(
            "user_nicename",
            PropertyDescriptor::new(Str, VIEW_EDIT, "The sanitized name of the user."),
        )
        .property(
            "user_avatar",
            PropertyDescriptor::new(Str, VIEW_EDIT, "Avatar of the user.").url(),
        )
        .property(
            "user_permalink",
            PropertyDescriptor::new(Str, VIEW_EDIT, "Profile page link of the user.").url(),
        )
        .property(
            "diary_title",
            PropertyDescriptor::new(Str, VIEW_EDIT, "Name of the user's diary."),
        )
        .property(
            "total_friend_count",
            PropertyDescriptor::new(Integer, VIEW_EDIT, "Number of friends the user has."),
        )
        .param("context", context_param());

    with_pagination(schema, config)
        .param(
            "type",
            ParamDescriptor::new(Str, "Sort order of the member list.")
                .default_value(json!("alphabetical"))
                .one_of(&["active", "newest", "popular", "online", "alphabetical", "random"]),
        )
        .param(
            "meta_key",
            ParamDescriptor::new(Str, "Limit result set to users having this metadata key."),
        )
        .param(
            "meta_value",
            ParamDescriptor::new(Str, "Limit result set to users whose metadata matches this value."),
        )
        .param(
            "user_id",
            ParamDescriptor::new(Array, "Limit result set to friends of these user IDs.")
                .default_value(json!([])),
        )
        .param(
            "populate_extras",
            ParamDescriptor::new(Boolean, "Fetch extra data for each user.")
                .default_value(json!(true)),
        )
}

fn profile_field_group_schema(config: &RestConfig) -> ResourceSchema {
    let mut member_types: Vec<&str> = config.member_types.iter().map(String::as_str).collect();
    member_types.push("any");

    ResourceSchema::new(ResourceKind::ProfileFieldGroup, "xprofile_group")
        .property(
            "id",
            PropertyDescriptor::new(Integer, VIEW_EDIT, "A unique numeric ID for the field group.")
                .readonly(),
        )
        .property(
            "name",
            PropertyDescriptor::new(Str, VIEW_EDIT, "The name of the profile field group."),
        )
        .property(
            "description",
            PropertyDescriptor::new(Str, VIEW_EDIT, "The description of the profile field group."),
        )
        .property(
            "group_order",
            PropertyDescriptor::new(Integer, VIEW_EDIT, "The order of the group."),
        )
        .property(
            "can_delete",
            PropertyDescriptor::new(Boolean, VIEW_EDIT, "Whether the profile field group can be deleted."),
        )
        .property(
            "fields",
            PropertyDescriptor::new(Array, VIEW_EDIT, "The fields of the group, when requested."),
        )
        .param("context", context_param())
        .param(
            "hide_empty_groups",
            ParamDescriptor::new(Boolean, "True to hide groups that do not have any fields.")
                .default_value(json!(false)),
        )
        .param(
            "user_id",
            ParamDescriptor::new(Integer, "Required to load a specific user's data.")
                .default_value(json!(0)),
        )
        .param(
            "member_type",
            ParamDescriptor::new(Array, "Limit fields to those available to the given member types.")
                .one_of(&member_types),
        )
        .param(
            "hide_empty_fields",
            ParamDescriptor::new(Boolean, "True to hide fields where the user has not provided data.")
                .default_value(json!(false)),
        )
        .param(
            "fetch_fields",
            ParamDescriptor::new(Boolean, "Whether to fetch the fields of the group.")
                .default_value(json!(false)),
        )
        .param(
            "fetch_field_data",
            ParamDescriptor::new(Boolean, "Whether to fetch data for each field. Requires a user_id.")
                .default_value(json!(false)),
        )
        .param(
            "fetch_visibility_level",
            ParamDescriptor::new(Boolean, "Whether to fetch the visibility level of each field. Requires a user_id.")
                .default_value(json!(false)),
        )
        .param(
            "exclude_fields",
            ParamDescriptor::new(Array, "Ensure result set excludes specific profile fields.")
                .default_value(json!([])),
        )
        .param(
            "update_meta_cache",
            ParamDescriptor::new(Boolean, "Whether to pre-fetch metadata for groups, fields and data.")
                .default_value(json!(true)),
        )
}

fn profile_field_schema() -> ResourceSchema {
    ResourceSchema::new(ResourceKind::ProfileField, "xprofile_field")
        .property(
            "id",
            PropertyDescriptor::new(Integer, VIEW_EDIT, "A unique numeric ID for the field.")
                .readonly(),
        )
        .property(
            "group_id",
            PropertyDescriptor::new(Integer, VIEW_EDIT, "The ID of the group the field is part of."),
        )
        .property(
            "parent_id",
            PropertyDescriptor::new(Integer, VIEW_EDIT, "The ID of the field parent."),
        )
        .property(
            "type",
            PropertyDescriptor::new(Str, VIEW_EDIT, "The type of field, like checkbox or select."),
        )
        .property(
            "name",
            PropertyDescriptor::new(Str, VIEW_EDIT, "The name of the profile field."),
        )
        .property(
            "description",
            PropertyDescriptor::new(Str, VIEW_EDIT, "The description of the profile field."),
        )
        .property(
            "is_required",
            PropertyDescriptor::new(Boolean, VIEW_EDIT, "Whether the profile field must have a value."),
        )
        .property(
            "can_delete",
            PropertyDescriptor::new(Boolean, VIEW_EDIT, "Whether the profile field can be deleted."),
        )
        .property(
            "field_order",
            PropertyDescriptor::new(Integer, VIEW_EDIT, "The order of the field."),
        )
        .property(
            "option_order",
            PropertyDescriptor::new(Integer, VIEW_EDIT, "The order of the field's options."),
        )
        .property(
            "order_by",
            PropertyDescriptor::new(Str, VIEW_EDIT, "How the field's options are ordered."),
        )
        .property(
            "is_default_option",
            PropertyDescriptor::new(Boolean, VIEW_EDIT, "Whether the option is the default option."),
        )
        .property(
            "visibility_level",
            PropertyDescriptor::new(Str, VIEW_EDIT, "Who may see the saved value for this field."),
        )
        .property(
            "data",
            PropertyDescriptor::new(Object, VIEW_EDIT, "The saved value for this field."),
        )
        .param("context", context_param())
        .param(
            "user_id",
            ParamDescriptor::new(Integer, "Required to load a specific user's data.")
                .default_value(json!(0)),
        )
}
