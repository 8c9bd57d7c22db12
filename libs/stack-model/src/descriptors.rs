//! Resource descriptors emitted by a synthesis pass.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::collaborators::NetworkPlacement;
use crate::naming::Taggable;
use crate::policy::{PolicyDocument, Principal};

/// Reference to a value only the provisioning engine can resolve,
/// rendered as `${kind:name}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ResourceRef {
    kind: String,
    name: String,
}

impl ResourceRef {
    #[must_use]
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
        }
    }

    #[must_use]
    pub fn handler_arn(handler: &str) -> Self {
        Self::new("handler_arn", handler)
    }

    #[must_use]
    pub fn rest_api(name: &str) -> Self {
        Self::new("rest_api", name)
    }

    #[must_use]
    pub fn topic_rule(name: &str) -> Self {
        Self::new("topic_rule", name)
    }

    #[must_use]
    pub fn web_acl(name: &str) -> Self {
        Self::new("web_acl", name)
    }

    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${{{}:{}}}", self.kind, self.name)
    }
}

impl From<ResourceRef> for String {
    fn from(value: ResourceRef) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for ResourceRef {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let inner = value
            .strip_prefix("${")
            .and_then(|s| s.strip_suffix('}'))
            .ok_or_else(|| format!("'{value}' is not a ${{kind:name}} reference"))?;
        let (kind, name) = inner
            .split_once(':')
            .ok_or_else(|| format!("'{value}' is missing the ':' separator"))?;
        Ok(Self::new(kind, name))
    }
}

/// A coarse platform-managed capability grant, referenced by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManagedGrant(String);

impl ManagedGrant {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

/// Execution identity of exactly one handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessRoleDescriptor {
    pub name: String,
    pub assumed_by: Principal,
    pub managed_grants: Vec<ManagedGrant>,
    pub inline_policies: BTreeMap<String, PolicyDocument>,
    pub tags: BTreeMap<String, String>,
}

impl AccessRoleDescriptor {
    #[must_use]
    pub fn inline_policy(&self, name: &str) -> Option<&PolicyDocument> {
        self.inline_policies.get(name)
    }
}

impl Taggable for AccessRoleDescriptor {
    fn tags_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.tags
    }
}

/// One unit of compute bound to a route or an event rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandlerDescriptor {
    /// Deployed function name (`<prefix>_<handler_name>`).
    pub name: String,
    /// Manifest handler name the descriptor was created for.
    pub handler_name: String,
    /// Name of the role from [`AccessRoleDescriptor::name`].
    pub execution_role: String,
    pub runtime: String,
    pub entry_point: String,
    pub code_location: String,
    pub timeout_seconds: u32,
    pub network: NetworkPlacement,
    pub environment: BTreeMap<String, String>,
    pub layers: Vec<String>,
    pub tags: BTreeMap<String, String>,
}

impl HandlerDescriptor {
    #[must_use]
    pub fn arn(&self) -> ResourceRef {
        ResourceRef::handler_arn(&self.name)
    }
}

impl Taggable for HandlerDescriptor {
    fn tags_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.tags
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn resource_ref_renders_and_parses() {
        let r = ResourceRef::rest_api("iot_dev_rest_api");
        assert_eq!(r.to_string(), "${rest_api:iot_dev_rest_api}");

        let parsed = ResourceRef::try_from(r.to_string()).unwrap();
        assert_eq!(parsed, r);
        assert!(ResourceRef::try_from("rest_api".to_owned()).is_err());
        assert!(ResourceRef::try_from("${rest_api}".to_owned()).is_err());
    }

    #[test]
    fn resource_ref_serializes_as_token() {
        let json = serde_json::to_string(&ResourceRef::topic_rule("fwd")).unwrap();
        assert_eq!(json, "\"${topic_rule:fwd}\"");
    }
}
