//! Deterministic name derivation and bulk tag application.
//!
//! Every provisioned resource is named from the stack prefix
//! (`<name_prefix>_<stage>`) and, where global uniqueness is required,
//! the tenant id suffix.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{SynthError, SynthResult};

const DEFAULT_NAME_PREFIX: &str = "iot";
const DEFAULT_STAGE: &str = "dev";

/// `prefix + suffix + tenant_id`.
#[must_use]
pub fn derive_name(prefix: &str, suffix: &str, tenant_id: &str) -> String {
    let mut name = String::with_capacity(prefix.len() + suffix.len() + tenant_id.len());
    name.push_str(prefix);
    name.push_str(suffix);
    name.push_str(tenant_id);
    name
}

/// Convert `snake_case` to `camelCase`, used for output keys.
///
/// ```
/// # use stack_model::naming::snake_to_camel;
/// assert_eq!(snake_to_camel("iot_dev_api_data"), "iotDevApiData");
/// ```
#[must_use]
pub fn snake_to_camel(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut upper_next = false;
    for ch in s.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// Short tenant identifier appended to globally unique resource names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    /// Last group of a random v4 UUID (12 lowercase hex characters).
    #[must_use]
    pub fn generate() -> Self {
        let id = Uuid::new_v4().simple().to_string();
        // simple() is 32 hex chars; the last group of the hyphenated form is the final 12
        Self(id[20..].to_owned())
    }

    /// # Errors
    /// Returns [`SynthError::Configuration`] when the id is empty or contains
    /// anything other than ASCII alphanumerics.
    pub fn parse(raw: &str) -> SynthResult<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(SynthError::configuration("tenant_id", "tenant id is empty"));
        }
        if !raw.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(SynthError::configuration(
                "tenant_id",
                format!("tenant id '{raw}' must be ASCII alphanumeric"),
            ));
        }
        Ok(Self(raw.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TenantId {
    type Error = SynthError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TenantId> for String {
    fn from(value: TenantId) -> Self {
        value.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name factory bound to one stack prefix and tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Naming {
    name_prefix: String,
    stage: String,
    prefix: String,
    tenant_id: TenantId,
}

impl Naming {
    /// Empty `name_prefix` falls back to `iot`, empty `stage` to `dev`.
    #[must_use]
    pub fn new(name_prefix: &str, stage: &str, tenant_id: TenantId) -> Self {
        let name_prefix = non_empty_or(name_prefix, DEFAULT_NAME_PREFIX);
        let stage = non_empty_or(stage, DEFAULT_STAGE);
        let prefix = format!("{name_prefix}_{stage}");
        Self {
            name_prefix,
            stage,
            prefix,
            tenant_id,
        }
    }

    /// `<name_prefix>_<stage>`
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    #[must_use]
    pub fn name_prefix(&self) -> &str {
        &self.name_prefix
    }

    #[must_use]
    pub fn stage(&self) -> &str {
        &self.stage
    }

    #[must_use]
    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    /// `<prefix>_<suffix>`
    #[must_use]
    pub fn resource(&self, suffix: &str) -> String {
        format!("{}_{suffix}", self.prefix)
    }

    /// `<prefix>_<suffix>-<tenant_id>`
    #[must_use]
    pub fn tenant_scoped(&self, suffix: &str) -> String {
        derive_name(
            &self.prefix,
            &format!("_{suffix}-"),
            self.tenant_id.as_str(),
        )
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        fallback.to_owned()
    } else {
        value.to_owned()
    }
}

/// A descriptor that carries resource labels.
pub trait Taggable {
    fn tags_mut(&mut self) -> &mut BTreeMap<String, String>;
}

/// Label set applied to every descriptor of a stack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(BTreeMap<String, String>);

impl Tags {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn standard(release: &str, team: &str, stage: &str, tenant_id: &TenantId) -> Self {
        Self::new()
            .with("framework", format!("stackforge:{release}"))
            .with("install_team", team)
            .with("stage", stage)
            .with("tenant_id", tenant_id.as_str())
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Label one descriptor. Existing keys are overwritten, others are kept.
    pub fn apply<T: Taggable + ?Sized>(&self, target: &mut T) {
        let tags = target.tags_mut();
        for (key, value) in &self.0 {
            tags.insert(key.clone(), value.clone());
        }
    }

    /// Label every descriptor yielded by `targets`.
    pub fn apply_all<'a, T, I>(&self, targets: I)
    where
        T: Taggable + 'a,
        I: IntoIterator<Item = &'a mut T>,
    {
        for target in targets {
            self.apply(target);
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn tenant() -> TenantId {
        TenantId::parse("a1b2c3d4e5f6").unwrap()
    }

    #[test]
    fn derive_name_concatenates_in_order() {
        assert_eq!(derive_name("iot_dev", "_table-", "abc"), "iot_dev_table-abc");
        assert_eq!(derive_name("", "", ""), "");
    }

    #[test]
    fn naming_applies_defaults_for_blank_inputs() {
        let naming = Naming::new("  ", "", tenant());
        assert_eq!(naming.prefix(), "iot_dev");
        assert_eq!(naming.resource("rest_api"), "iot_dev_rest_api");
        assert_eq!(naming.tenant_scoped("web_acl"), "iot_dev_web_acl-a1b2c3d4e5f6");
    }

    #[test]
    fn generated_tenant_ids_are_short_hex() {
        let id = TenantId::generate();
        assert_eq!(id.as_str().len(), 12);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert!(TenantId::parse(id.as_str()).is_ok());
    }

    #[test]
    fn tenant_id_rejects_bad_input() {
        assert!(TenantId::parse("").is_err());
        assert!(TenantId::parse("abc-def").is_err());
        assert_eq!(TenantId::parse(" abc ").unwrap().as_str(), "abc");
    }

    #[test]
    fn snake_to_camel_handles_edges() {
        assert_eq!(snake_to_camel("name_prefix"), "namePrefix");
        assert_eq!(snake_to_camel("plain"), "plain");
        assert_eq!(snake_to_camel("trailing_"), "trailing");
    }

    struct Labeled(BTreeMap<String, String>);

    impl Taggable for Labeled {
        fn tags_mut(&mut self) -> &mut BTreeMap<String, String> {
            &mut self.0
        }
    }

    #[test]
    fn apply_all_overwrites_and_preserves() {
        let tags = Tags::standard("1.2.0", "ops", "dev", &tenant());
        let mut existing = BTreeMap::new();
        existing.insert("stage".to_owned(), "old".to_owned());
        existing.insert("owner".to_owned(), "me".to_owned());
        let mut items = vec![Labeled(existing), Labeled(BTreeMap::new())];

        tags.apply_all(items.iter_mut());

        assert_eq!(items[0].0.get("stage").map(String::as_str), Some("dev"));
        assert_eq!(items[0].0.get("owner").map(String::as_str), Some("me"));
        assert_eq!(
            items[1].0.get("framework").map(String::as_str),
            Some("stackforge:1.2.0")
        );
        assert_eq!(items[1].0.len(), 4);
    }
}
