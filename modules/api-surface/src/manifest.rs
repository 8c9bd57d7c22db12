//! Declarative route manifest: one entry per exposed capability.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use stack_model::{SynthError, SynthResult};

pub const DEFAULT_ENTRY_POINT: &str = "main.lambda_handler";

/// Explicitly bindable HTTP verbs, ordered as they are registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpVerb {
    Post,
    Put,
    Get,
    Delete,
}

impl HttpVerb {
    pub const ALL: [Self; 4] = [Self::Post, Self::Put, Self::Get, Self::Delete];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Get => "GET",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpVerb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unsupported HTTP verb '{s}'"))
    }
}

/// Verbs exposed by a manifest entry: the ANY catch-all or an explicit subset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "VerbSetRepr", into = "VerbSetRepr")]
pub enum VerbSet {
    Any,
    Only(BTreeSet<HttpVerb>),
}

impl VerbSet {
    /// `{POST, PUT, GET, DELETE}`
    #[must_use]
    pub fn all() -> Self {
        Self::Only(HttpVerb::ALL.into_iter().collect())
    }

    #[must_use]
    pub fn none() -> Self {
        Self::Only(BTreeSet::new())
    }

    #[must_use]
    pub fn only(verbs: impl IntoIterator<Item = HttpVerb>) -> Self {
        Self::Only(verbs.into_iter().collect())
    }

    #[must_use]
    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }

    /// True for an explicit set with no verbs: such an entry binds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Only(verbs) if verbs.is_empty())
    }

    /// Explicit verbs in registration order. Empty for [`VerbSet::Any`].
    #[must_use]
    pub fn verbs(&self) -> Vec<HttpVerb> {
        match self {
            Self::Any => Vec::new(),
            Self::Only(verbs) => HttpVerb::ALL
                .into_iter()
                .filter(|v| verbs.contains(v))
                .collect(),
        }
    }
}

#[derive(Deserialize, Serialize)]
#[serde(untagged)]
enum VerbSetRepr {
    Keyword(String),
    Verbs(Vec<HttpVerb>),
}

impl TryFrom<VerbSetRepr> for VerbSet {
    type Error = String;

    fn try_from(value: VerbSetRepr) -> Result<Self, Self::Error> {
        match value {
            VerbSetRepr::Keyword(k) if k.eq_ignore_ascii_case("ANY") => Ok(Self::Any),
            VerbSetRepr::Keyword(k) => Err(format!("expected \"ANY\" or a verb list, got '{k}'")),
            VerbSetRepr::Verbs(v) => Ok(Self::only(v)),
        }
    }
}

impl From<VerbSet> for VerbSetRepr {
    fn from(value: VerbSet) -> Self {
        match value {
            VerbSet::Any => Self::Keyword("ANY".to_owned()),
            VerbSet::Only(_) => Self::Verbs(value.verbs()),
        }
    }
}

/// When an entry is exposed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    #[default]
    Always,
    /// Only exposed when callers present an external identity-provider token.
    ExternalProviderOnly,
}

fn default_entry_point() -> String {
    DEFAULT_ENTRY_POINT.to_owned()
}

/// One exposed capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteManifestEntry {
    /// Segment under the surface root the resource hangs from; `None` for the root itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_segment: Option<String>,
    pub resource_name: String,
    pub handler_name: String,
    pub code_location: String,
    pub verbs: VerbSet,
    #[serde(default = "default_entry_point")]
    pub entry_point: String,
    #[serde(default)]
    pub availability: Availability,
    /// Handler receives read/write access to the document table.
    #[serde(default)]
    pub table_access: bool,
}

impl RouteManifestEntry {
    /// Entry with all four verbs, the default entry point and no table access.
    #[must_use]
    pub fn new(
        parent_segment: Option<&str>,
        resource_name: impl Into<String>,
        handler_name: impl Into<String>,
        code_location: impl Into<String>,
    ) -> Self {
        Self {
            parent_segment: parent_segment.map(str::to_owned),
            resource_name: resource_name.into(),
            handler_name: handler_name.into(),
            code_location: code_location.into(),
            verbs: VerbSet::all(),
            entry_point: default_entry_point(),
            availability: Availability::Always,
            table_access: false,
        }
    }

    #[must_use]
    pub fn with_verbs(mut self, verbs: VerbSet) -> Self {
        self.verbs = verbs;
        self
    }

    #[must_use]
    pub fn with_entry_point(mut self, entry_point: impl Into<String>) -> Self {
        self.entry_point = entry_point.into();
        self
    }

    #[must_use]
    pub fn with_table_access(mut self) -> Self {
        self.table_access = true;
        self
    }

    #[must_use]
    pub fn external_provider_only(mut self) -> Self {
        self.availability = Availability::ExternalProviderOnly;
        self
    }

    /// `parent/resource`, or just `resource` for root entries. Used to
    /// attribute errors to an entry.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        match &self.parent_segment {
            Some(parent) => format!("{parent}/{}", self.resource_name),
            None => self.resource_name.clone(),
        }
    }

    fn validate(&self) -> SynthResult<()> {
        let name = self.qualified_name();
        if let Some(parent) = &self.parent_segment {
            check_label(&name, "parent segment", parent)?;
        }
        check_label(&name, "resource name", &self.resource_name)?;
        for (field, value) in [
            ("handler name", &self.handler_name),
            ("code location", &self.code_location),
            ("entry point", &self.entry_point),
        ] {
            if value.trim().is_empty() {
                return Err(SynthError::configuration(name, format!("{field} is empty")));
            }
        }
        Ok(())
    }
}

/// Path labels must be non-empty and made of `[A-Za-z0-9_-]`.
pub(crate) fn check_label(resource: &str, field: &str, label: &str) -> SynthResult<()> {
    if label.is_empty() {
        return Err(SynthError::configuration(resource, format!("{field} is empty")));
    }
    if !label
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(SynthError::configuration(
            resource,
            format!("{field} '{label}' may only contain letters, digits, '_' and '-'"),
        ));
    }
    Ok(())
}

/// Ordered list of manifest entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteManifest {
    entries: Vec<RouteManifestEntry>,
}

impl RouteManifest {
    #[must_use]
    pub fn new(entries: Vec<RouteManifestEntry>) -> Self {
        Self { entries }
    }

    /// The backend's standard manifest.
    #[must_use]
    pub fn standard() -> Self {
        let root = [
            "project",
            "model",
            "datatype",
            "data",
            "device",
            "admin",
            "featuremanager",
            "firmware",
            "setting",
            "user",
            "location",
            "template",
            "update",
        ];
        let ui = [
            "admin", "auth", "data", "datatype", "device", "model", "project", "start", "user",
        ];
        let feature = ["alexa", "connect", "grafana", "location", "twin", "sms"];

        let mut entries = Vec::with_capacity(root.len() + ui.len() + feature.len());
        for r in root {
            let entry = RouteManifestEntry::new(
                None,
                r,
                format!("api_{r}"),
                format!("lambda_src/api/iot_api_{r}"),
            );
            entries.push(match r {
                "data" => entry.with_table_access(),
                "user" => entry.external_provider_only(),
                _ => entry,
            });
        }
        for r in ui {
            entries.push(RouteManifestEntry::new(
                Some("ui"),
                r,
                format!("ui_api_{r}"),
                format!("lambda_src/api/ui/iot_ui_api_{r}"),
            ));
        }
        for r in feature {
            // grafana is served by the connect code
            let code = if r == "grafana" { "connect" } else { r };
            entries.push(RouteManifestEntry::new(
                Some("feature"),
                r,
                format!("feature_api_{r}"),
                format!("lambda_src/api/feature/iot_feature_api_{code}"),
            ));
        }
        Self { entries }
    }

    #[must_use]
    pub fn entries(&self) -> &[RouteManifestEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check every entry before anything is synthesized.
    ///
    /// # Errors
    /// Returns [`SynthError::Configuration`] naming the first entry with an
    /// empty or malformed field, or a handler name used twice.
    pub fn validate(&self) -> SynthResult<()> {
        let mut handlers = HashSet::with_capacity(self.entries.len());
        for entry in &self.entries {
            entry.validate()?;
            if !handlers.insert(entry.handler_name.as_str()) {
                return Err(SynthError::configuration(
                    entry.qualified_name(),
                    format!("handler name '{}' is used by more than one entry", entry.handler_name),
                ));
            }
        }
        Ok(())
    }
}
