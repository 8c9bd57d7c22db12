//! Configuration bag for one synthesis pass.
//!
//! Loaded with figment: a YAML file first, then `STACKFORGE_` environment
//! overrides with nested keys split on `__` (`STACKFORGE_API__ROOT_SEGMENT`).

use std::path::Path;

use api_surface::{ApiSurfaceConfig, HandlerSettings, RouteManifest};
use event_routing::DEFAULT_TOPIC_NAMESPACE;
use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use serde::{Deserialize, Serialize};
use stack_model::{Collaborators, SynthError, SynthResult, TenantId};

pub const ENV_PREFIX: &str = "STACKFORGE_";

fn default_name_prefix() -> String {
    "iot".to_owned()
}

fn default_team() -> String {
    "platform".to_owned()
}

fn default_release() -> String {
    env!("CARGO_PKG_VERSION").to_owned()
}

fn default_topic_namespace() -> String {
    DEFAULT_TOPIC_NAMESPACE.to_owned()
}

/// Recognized configuration keys. Unrecognized keys are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StackConfig {
    /// `true` selects ambient identity, `false` token authorization
    /// through the identity provider.
    pub use_external_identity: bool,
    pub region: String,
    pub stage_name: String,
    pub timeout_seconds: u32,
    pub log_level: String,
    /// Key under which handlers find their database credentials.
    pub credential_key_ref: String,

    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,
    /// Generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<TenantId>,
    #[serde(default = "default_team")]
    pub team: String,
    #[serde(default = "default_release")]
    pub release: String,
    #[serde(default = "default_topic_namespace")]
    pub topic_namespace: String,
    #[serde(default)]
    pub api: ApiSurfaceConfig,
    /// Replaces the standard manifest when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<RouteManifest>,

    pub collaborators: Collaborators,
}

impl StackConfig {
    /// Load `path` and apply environment overrides.
    ///
    /// # Errors
    /// Returns [`SynthError::Configuration`] for resource `config` when the
    /// file cannot be read, a required key is missing or a value is invalid.
    pub fn load(path: &Path) -> SynthResult<Self> {
        Self::from_figment(
            Figment::new()
                .merge(Yaml::file_exact(path))
                .merge(Env::prefixed(ENV_PREFIX).split("__")),
        )
    }

    /// Extract and validate a config from an already assembled figment.
    ///
    /// # Errors
    /// See [`StackConfig::load`].
    pub fn from_figment(figment: Figment) -> SynthResult<Self> {
        let config: Self = figment
            .extract()
            .map_err(|e| SynthError::configuration("config", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// Returns [`SynthError::Configuration`] naming the first invalid key.
    pub fn validate(&self) -> SynthResult<()> {
        for (key, value) in [
            ("region", &self.region),
            ("stage_name", &self.stage_name),
            ("log_level", &self.log_level),
            ("credential_key_ref", &self.credential_key_ref),
            ("topic_namespace", &self.topic_namespace),
        ] {
            if value.trim().is_empty() {
                return Err(SynthError::configuration(key, "value is empty"));
            }
        }
        self.collaborators.validate()
    }

    #[must_use]
    pub fn handler_settings(&self) -> HandlerSettings {
        HandlerSettings {
            timeout_seconds: self.timeout_seconds,
            credential_key_ref: self.credential_key_ref.clone(),
            log_level: self.log_level.clone(),
        }
    }

    /// The configured manifest, or the standard one.
    #[must_use]
    pub fn effective_manifest(&self) -> RouteManifest {
        self.manifest.clone().unwrap_or_else(RouteManifest::standard)
    }
}
