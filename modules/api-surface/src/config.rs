use serde::{Deserialize, Serialize};

/// Route surface options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiSurfaceConfig {
    /// First path segment under the surface root, e.g. `v1`.
    pub root_segment: String,
    /// Sub-rules excluded from the general protection rule group.
    pub excluded_filter_rules: Vec<String>,
    /// Fail synthesis on manifest entries with neither ANY nor any verb.
    /// When false such entries are logged and left without methods.
    pub reject_empty_verb_sets: bool,
    /// Origins allowed by the CORS preflight; `["*"]` means any.
    pub cors_allow_origins: Vec<String>,
    /// Method logging level of the deployed stage.
    pub logging_level: String,
}

impl Default for ApiSurfaceConfig {
    fn default() -> Self {
        Self {
            root_segment: "v1".to_owned(),
            excluded_filter_rules: vec!["SizeRestrictions_BODY".to_owned()],
            reject_empty_verb_sets: false,
            cors_allow_origins: vec!["*".to_owned()],
            logging_level: "INFO".to_owned(),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let cfg: ApiSurfaceConfig =
            serde_json::from_value(serde_json::json!({ "root_segment": "v2" })).unwrap();
        assert_eq!(cfg.root_segment, "v2");
        assert_eq!(cfg.excluded_filter_rules, vec!["SizeRestrictions_BODY"]);
        assert!(!cfg.reject_empty_verb_sets);
        assert_eq!(cfg.logging_level, "INFO");
    }
}
