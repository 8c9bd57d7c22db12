//! Error taxonomy for graph synthesis.

use thiserror::Error;

/// Errors that abort a synthesis pass.
///
/// Both variants are fatal: the pass stops and no descriptor set is emitted.
/// Failures of the external provisioning engine are not represented here,
/// synthesis is complete once descriptors are handed over.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SynthError {
    /// Missing or invalid manifest field, unresolved collaborator reference,
    /// or a platform limit that would be exceeded.
    #[error("configuration error in '{resource}': {reason}")]
    Configuration { resource: String, reason: String },

    /// An invoke-permission grant collides with an existing one on the same handler.
    #[error("grant conflict on '{resource}': {reason}")]
    GrantConflict { resource: String, reason: String },
}

impl SynthError {
    #[must_use]
    pub fn configuration(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            resource: resource.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn grant_conflict(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::GrantConflict {
            resource: resource.into(),
            reason: reason.into(),
        }
    }

    /// Name of the manifest entry or resource the error is attributed to.
    #[must_use]
    pub fn resource(&self) -> &str {
        match self {
            Self::Configuration { resource, .. } | Self::GrantConflict { resource, .. } => resource,
        }
    }

    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}

pub type SynthResult<T> = Result<T, SynthError>;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_offending_resource() {
        let err = SynthError::configuration("ui/user", "empty code location");
        assert_eq!(
            err.to_string(),
            "configuration error in 'ui/user': empty code location"
        );
        assert_eq!(err.resource(), "ui/user");
        assert!(err.is_configuration());

        let err = SynthError::grant_conflict("iot_dev_api_data", "statement id taken");
        assert_eq!(err.resource(), "iot_dev_api_data");
        assert!(!err.is_configuration());
    }
}
