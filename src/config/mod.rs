//! Configuration loading and management

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use validator::Validate;

/// REST base (first path segment after the namespace) of each resource family
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestBases {
    /// Base for group routes (e.g., "groups")
    pub groups: String,

    /// Base for member routes (e.g., "members")
    pub members: String,

    /// Base for extended profile routes (e.g., "xprofile")
    pub profile: String,
}

impl Default for RestBases {
    fn default() -> Self {
        Self {
            groups: "groups".to_string(),
            members: "members".to_string(),
            profile: "xprofile".to_string(),
        }
    }
}

/// Static process metadata reported by `GET /core`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoreInfoConfig {
    /// Version string of the social platform
    pub version: String,

    /// Directory page ids keyed by component id
    #[serde(default)]
    pub component_page_ids: BTreeMap<String, u64>,
}

/// Authorization policies for one resource kind
///
/// Each value is a policy string understood by
/// [`AuthPolicy::parse_policy`](crate::core::auth::AuthPolicy::parse_policy).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourcePermissions {
    #[serde(default = "default_policy")]
    pub list: String,

    #[serde(default = "default_policy")]
    pub read: String,
}

impl Default for ResourcePermissions {
    fn default() -> Self {
        Self {
            list: default_policy(),
            read: default_policy(),
        }
    }
}

fn default_policy() -> String {
    "public".to_string()
}

/// Complete deployment configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RestConfig {
    /// API namespace (first path segment)
    #[validate(length(min = 1))]
    pub namespace: String,

    /// API version (second path segment)
    #[validate(length(min = 1))]
    pub version: String,

    /// Absolute origin used when assembling hyperlinks
    #[validate(length(min = 1))]
    pub base_url: String,

    #[serde(default)]
    pub rest_bases: RestBases,

    /// Every known component id (the `component` parameter enum)
    pub components: Vec<String>,

    /// Components whose routes are exposed
    pub active_components: Vec<String>,

    /// Registered member types (the `member_type` parameter enum, plus `any`)
    #[serde(default)]
    pub member_types: Vec<String>,

    #[serde(default = "default_per_page")]
    #[validate(range(min = 1, max = 100))]
    pub default_per_page: u64,

    #[serde(default = "default_max_per_page")]
    #[validate(range(min = 1, max = 1000))]
    pub max_per_page: u64,

    #[serde(default)]
    pub core: CoreInfoConfig,

    /// Permission policies keyed by resource kind name
    /// (`core`, `group`, `member`, `profile_field_group`, `profile_field`)
    #[serde(default)]
    pub permissions: HashMap<String, ResourcePermissions>,
}

fn default_per_page() -> u64 {
    20
}

fn default_max_per_page() -> u64 {
    100
}

impl RestConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading configuration file '{}'", path))?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.check()?;
        Ok(config)
    }

    /// Run declarative and cross-field validation
    pub fn check(&self) -> Result<()> {
        self.validate()?;

        if self.default_per_page > self.max_per_page {
            anyhow::bail!(
                "default_per_page ({}) exceeds max_per_page ({})",
                self.default_per_page,
                self.max_per_page
            );
        }

        if let Some(unknown) = self
            .active_components
            .iter()
            .find(|c| !self.components.contains(c))
        {
            anyhow::bail!("active component '{}' is not a known component", unknown);
        }

        Ok(())
    }

    /// Whether a component's routes should be exposed
    pub fn is_active(&self, component: &str) -> bool {
        self.active_components.iter().any(|c| c == component)
    }

    /// Route prefix, e.g. `/buddypress/v1`
    pub fn route_prefix(&self) -> String {
        format!("/{}/{}", self.namespace, self.version)
    }

    /// Create a default configuration for development and tests
    pub fn default_config() -> Self {
        let components: Vec<String> = [
            "activity",
            "blogs",
            "core",
            "friends",
            "groups",
            "members",
            "messages",
            "notifications",
            "settings",
            "xprofile",
        ]
        .iter()
        .map(|c| c.to_string())
        .collect();

        Self {
            namespace: "buddypress".to_string(),
            version: "v1".to_string(),
            base_url: "http://localhost:8080".to_string(),
            rest_bases: RestBases::default(),
            active_components: vec![
                "core".to_string(),
                "groups".to_string(),
                "members".to_string(),
                "xprofile".to_string(),
            ],
            components,
            member_types: vec!["student".to_string(), "teacher".to_string()],
            default_per_page: default_per_page(),
            max_per_page: default_max_per_page(),
            core: CoreInfoConfig {
                version: "2.9.0".to_string(),
                component_page_ids: BTreeMap::from([
                    ("groups".to_string(), 4),
                    ("members".to_string(), 5),
                ]),
            },
            permissions: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RestConfig::default_config();
        assert!(config.check().is_ok());
        assert_eq!(config.route_prefix(), "/buddypress/v1");
        assert!(config.is_active("groups"));
        assert!(!config.is_active("activity"));
    }

    #[test]
    fn test_yaml_serialization() {
        let config = RestConfig::default_config();
        let yaml = serde_yaml::to_string(&config).unwrap();

        let parsed = RestConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(parsed.namespace, config.namespace);
        assert_eq!(parsed.components, config.components);
        assert_eq!(parsed.default_per_page, 20);
    }

    #[test]
    fn test_minimal_yaml_uses_defaults() {
        let yaml = r#"
namespace: community
version: v2
base_url: https://example.org/wp-json
components: [groups, members]
active_components: [groups]
"#;
        let config = RestConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.rest_bases.profile, "xprofile");
        assert_eq!(config.default_per_page, 20);
        assert_eq!(config.max_per_page, 100);
        assert!(config.permissions.is_empty());
    }

    #[test]
    fn test_unknown_active_component_rejected() {
        let yaml = r#"
namespace: community
version: v1
base_url: http://localhost
components: [groups]
active_components: [groups, forums]
"#;
        let err = RestConfig::from_yaml_str(yaml).unwrap_err();
        assert!(err.to_string().contains("forums"));
    }

    #[test]
    fn test_per_page_out_of_range_rejected() {
        let mut config = RestConfig::default_config();
        config.default_per_page = 0;
        assert!(config.check().is_err());

        let mut config = RestConfig::default_config();
        config.default_per_page = 90;
        config.max_per_page = 50;
        assert!(config.check().is_err());
    }
}
