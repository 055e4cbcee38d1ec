//! Nested aggregation for profile field groups
//!
//! A field group may embed its fields, and each field may embed the target
//! user's value. Fields are shaped with the same rules as a single field read
//! (schema order, context filtering, optional parts only when requested) and
//! kept in the order the adapter returned them. Nested fields carry no links.

use crate::core::adapter::FieldGroupRecord;
use crate::core::query::FieldGroupFetch;
use crate::core::schema::{Context, ResourceKind};
use crate::core::shaper::{
    ResponseShaper, ShapeError, ShapeFlags, field_candidates, field_group_candidates, project,
};
use serde_json::Value;

/// Composes a field group with its fields
#[derive(Clone)]
pub struct NestedAggregator {
    shaper: ResponseShaper,
}

impl NestedAggregator {
    pub fn new(shaper: ResponseShaper) -> Self {
        Self { shaper }
    }

    pub fn aggregate(
        &self,
        group: &FieldGroupRecord,
        fetch: &FieldGroupFetch,
        context: Context,
    ) -> Result<Value, ShapeError> {
        let mut candidates = field_group_candidates(group)?;

        if fetch.fetch_fields {
            let flags = ShapeFlags {
                field_data: fetch.wants_field_data(),
                visibility_level: fetch.wants_visibility_level(),
            };
            let schema = self.shaper.schemas().schema_for(ResourceKind::ProfileField);

            let fields = group
                .fields
                .iter()
                .flatten()
                .map(|field| {
                    field_candidates(field, flags)
                        .map(|c| Value::Object(project(schema, c, context)))
                })
                .collect::<Result<Vec<_>, _>>()?;

            candidates.insert("fields", Value::Array(fields));
        }

        let links = self.shaper.links().field_group(group.id);
        Ok(self
            .shaper
            .finish(ResourceKind::ProfileFieldGroup, candidates, context, Some(links)))
    }
}
