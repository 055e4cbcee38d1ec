//! Authorization for the REST layer
//!
//! Three pieces:
//! - [`Principal`]: who is asking, resolved per request by an [`AuthProvider`]
//! - [`AuthPolicy`]: a declarative rule checked against a principal
//! - [`PermissionGate`]: the per-kind, per-action decision point consulted by
//!   the controller before any domain fetch

use crate::config::RestConfig;
use crate::core::query::{CollectionQuery, ItemQuery};
use crate::core::schema::ResourceKind;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Capability that grants moderator visibility (hidden groups)
pub const MODERATE_CAPABILITY: &str = "bp_moderate";

/// The caller of a request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Principal {
    /// Logged-in user, `None` for anonymous callers
    pub user_id: Option<u64>,

    /// Capabilities granted to the user
    pub capabilities: BTreeSet<String>,

    /// Groups the user is a member of
    pub group_ids: BTreeSet<u64>,
}

impl Principal {
    /// An anonymous caller
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A logged-in user without capabilities or memberships
    pub fn user(user_id: u64) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.insert(capability.into());
        self
    }

    pub fn with_groups(mut self, group_ids: impl IntoIterator<Item = u64>) -> Self {
        self.group_ids.extend(group_ids);
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }

    pub fn is_member_of(&self, group_id: u64) -> bool {
        self.group_ids.contains(&group_id)
    }

    /// Moderators see every group regardless of status
    pub fn is_moderator(&self) -> bool {
        self.has_capability(MODERATE_CAPABILITY)
    }
}

/// What a request wants to do with a resource kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Collection read
    List,
    /// Single-item read
    Read,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::List => "list",
            Action::Read => "read",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The already-validated query a permission decision is about
#[derive(Debug, Clone, Copy)]
pub enum QueryRef<'a> {
    Collection(&'a CollectionQuery),
    Item(&'a ItemQuery),
}

impl QueryRef<'_> {
    /// User the query targets, if any (the item id for members, the
    /// `user_id` parameter for profile reads)
    pub fn target_user(&self) -> Option<u64> {
        match self {
            QueryRef::Collection(_) => None,
            QueryRef::Item(item) => item.target_user(),
        }
    }
}

/// Authorization policy for an operation
#[derive(Debug, Clone)]
pub enum AuthPolicy {
    /// Public access (no auth required)
    Public,

    /// Any logged-in user
    Authenticated,

    /// The logged-in user is the user targeted by the query
    Owner,

    /// User must hold one of these capabilities
    HasCapability(Vec<String>),

    /// Combination of policies (AND)
    And(Vec<AuthPolicy>),

    /// Combination of policies (OR)
    Or(Vec<AuthPolicy>),

    /// Custom policy function
    Custom(fn(&Principal, &QueryRef<'_>) -> bool),
}

impl AuthPolicy {
    /// Check if the principal satisfies this policy for the given query
    pub fn check(&self, principal: &Principal, query: &QueryRef<'_>) -> bool {
        match self {
            AuthPolicy::Public => true,

            AuthPolicy::Authenticated => principal.is_authenticated(),

            AuthPolicy::Owner => match (principal.user_id, query.target_user()) {
                (Some(me), Some(target)) => me == target,
                _ => false,
            },

            AuthPolicy::HasCapability(required) => {
                required.iter().any(|c| principal.has_capability(c))
            }

            AuthPolicy::And(policies) => policies.iter().all(|p| p.check(principal, query)),

            AuthPolicy::Or(policies) => policies.iter().any(|p| p.check(principal, query)),

            AuthPolicy::Custom(f) => f(principal, query),
        }
    }

    /// Parse policy from string (for YAML config)
    pub fn parse_policy(s: &str) -> Result<Self> {
        match s {
            "public" => Ok(AuthPolicy::Public),
            "authenticated" => Ok(AuthPolicy::Authenticated),
            "owner" => Ok(AuthPolicy::Owner),
            s if s.starts_with("capability:") => {
                let cap = s.trim_start_matches("capability:");
                non_empty(cap, s)?;
                Ok(AuthPolicy::HasCapability(vec![cap.to_string()]))
            }
            s if s.starts_with("owner_or_capability:") => {
                let cap = s.trim_start_matches("owner_or_capability:");
                non_empty(cap, s)?;
                Ok(AuthPolicy::Or(vec![
                    AuthPolicy::Owner,
                    AuthPolicy::HasCapability(vec![cap.to_string()]),
                ]))
            }
            other => Err(anyhow!("Unknown permission policy '{}'", other)),
        }
    }
}

fn non_empty(capability: &str, policy: &str) -> Result<()> {
    if capability.is_empty() {
        Err(anyhow!("Permission policy '{}' names no capability", policy))
    } else {
        Ok(())
    }
}

// =============================================================================
// Principal extraction
// =============================================================================

/// Resolves the [`Principal`] of an incoming request
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn principal(&self, headers: &HeaderMap) -> Result<Principal>;
}

/// Default provider: every request is anonymous
pub struct NoAuthProvider;

#[async_trait]
impl AuthProvider for NoAuthProvider {
    async fn principal(&self, _headers: &HeaderMap) -> Result<Principal> {
        Ok(Principal::anonymous())
    }
}

/// Trusts identity headers set by an upstream gateway
///
/// - `X-User-Id`: numeric user id
/// - `X-User-Capabilities`: comma separated capabilities
/// - `X-User-Groups`: comma separated group ids
pub struct HeaderAuthProvider;

impl HeaderAuthProvider {
    pub const USER_ID: &'static str = "x-user-id";
    pub const CAPABILITIES: &'static str = "x-user-capabilities";
    pub const GROUPS: &'static str = "x-user-groups";
}

#[async_trait]
impl AuthProvider for HeaderAuthProvider {
    async fn principal(&self, headers: &HeaderMap) -> Result<Principal> {
        let header = |name: &str| -> Result<Option<&str>> {
            headers
                .get(name)
                .map(|v| v.to_str().map_err(|_| anyhow!("Invalid {} header", name)))
                .transpose()
        };

        let user_id = match header(Self::USER_ID)? {
            Some(raw) => Some(
                raw.trim()
                    .parse::<u64>()
                    .map_err(|_| anyhow!("Invalid {} header: {}", Self::USER_ID, raw))?,
            ),
            None => None,
        };

        let Some(user_id) = user_id.filter(|id| *id > 0) else {
            return Ok(Principal::anonymous());
        };

        let capabilities = header(Self::CAPABILITIES)?
            .map(|raw| crate::core::validation::filters::parse_token_list([raw]))
            .unwrap_or_default();
        let groups = header(Self::GROUPS)?
            .map(|raw| crate::core::validation::filters::parse_id_list([raw]))
            .unwrap_or_default();

        Ok(Principal {
            user_id: Some(user_id),
            capabilities: capabilities.into_iter().collect(),
            group_ids: groups,
        })
    }
}

// =============================================================================
// Permission gate
// =============================================================================

/// Decides whether a validated query may run
///
/// Consulted by the controller after validation and before the domain fetch.
pub trait PermissionGate: Send + Sync {
    fn authorize(
        &self,
        kind: ResourceKind,
        action: Action,
        query: QueryRef<'_>,
        principal: &Principal,
    ) -> bool;
}

/// Allows every request
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl PermissionGate for AllowAll {
    fn authorize(&self, _: ResourceKind, _: Action, _: QueryRef<'_>, _: &Principal) -> bool {
        true
    }
}

/// Table of [`AuthPolicy`] per resource kind and action
///
/// Pairs without an entry are allowed.
#[derive(Debug, Clone, Default)]
pub struct PolicyGate {
    policies: HashMap<(ResourceKind, Action), AuthPolicy>,
}

impl PolicyGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(mut self, kind: ResourceKind, action: Action, policy: AuthPolicy) -> Self {
        self.policies.insert((kind, action), policy);
        self
    }

    /// Build the gate from the `permissions` section of the configuration
    pub fn from_config(config: &RestConfig) -> Result<Self> {
        let mut gate = Self::new();
        for (name, perms) in &config.permissions {
            let kind = ResourceKind::ALL
                .into_iter()
                .find(|k| k.as_str() == name)
                .ok_or_else(|| anyhow!("Unknown resource kind '{}' in permissions", name))?;
            gate.policies
                .insert((kind, Action::List), AuthPolicy::parse_policy(&perms.list)?);
            gate.policies
                .insert((kind, Action::Read), AuthPolicy::parse_policy(&perms.read)?);
        }
        Ok(gate)
    }
}

impl PermissionGate for PolicyGate {
    fn authorize(
        &self,
        kind: ResourceKind,
        action: Action,
        query: QueryRef<'_>,
        principal: &Principal,
    ) -> bool {
        self.policies
            .get(&(kind, action))
            .is_none_or(|policy| policy.check(principal, &query))
    }
}
