//! Authorization strategy selection.
//!
//! Exactly one strategy is selected per synthesis pass and threaded into
//! every route registration.

use serde::Serialize;
use stack_model::{Naming, ResourceRef, SynthError, SynthResult};
use tracing::{info, warn};

use crate::manifest::Availability;
use crate::surface::RouteSurface;

pub const AUTHORIZER_TYPE: &str = "COGNITO_USER_POOLS";
pub const IDENTITY_SOURCE: &str = "method.request.header.Authorization";

/// How a single method binding authorizes its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MethodAuthorization {
    /// The caller's ambient platform identity.
    Ambient,
    /// A bearer token validated by the shared authorizer.
    ExternalToken,
}

impl MethodAuthorization {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ambient => "ambient",
            Self::ExternalToken => "external-token",
        }
    }
}

/// Shared gatekeeper bound to one route surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Authorizer {
    pub name: String,
    pub authorizer_type: String,
    pub identity_source: String,
    pub provider_refs: Vec<String>,
    pub rest_api: ResourceRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuthorizationStrategy {
    AmbientIdentity,
    ExternalProvider { authorizer: Authorizer },
}

impl AuthorizationStrategy {
    #[must_use]
    pub fn method_authorization(&self) -> MethodAuthorization {
        match self {
            Self::AmbientIdentity => MethodAuthorization::Ambient,
            Self::ExternalProvider { .. } => MethodAuthorization::ExternalToken,
        }
    }

    #[must_use]
    pub fn authorizer(&self) -> Option<&Authorizer> {
        match self {
            Self::AmbientIdentity => None,
            Self::ExternalProvider { authorizer } => Some(authorizer),
        }
    }

    /// Name of the shared authorizer every binding references, if any.
    #[must_use]
    pub fn authorizer_ref(&self) -> Option<&str> {
        self.authorizer().map(|a| a.name.as_str())
    }

    /// Whether an entry with `availability` is exposed under this strategy.
    #[must_use]
    pub fn admits(&self, availability: Availability) -> bool {
        match availability {
            Availability::Always => true,
            Availability::ExternalProviderOnly => matches!(self, Self::ExternalProvider { .. }),
        }
    }
}

/// Choose the authorization strategy for the whole route surface.
///
/// With `use_external_identity == false` one authorizer is materialized for
/// `surface`, reading the bearer token from the `Authorization` header.
/// Otherwise routes rely on the caller's ambient identity and no authorizer
/// is created. That branch also creates no dedicated invoke role.
///
/// # Errors
/// Returns [`SynthError::Configuration`] for resource `authorizer` when the
/// external provider is selected but `provider_ref` is missing or blank.
pub fn select_strategy(
    use_external_identity: bool,
    provider_ref: Option<&str>,
    naming: &Naming,
    surface: &RouteSurface,
) -> SynthResult<AuthorizationStrategy> {
    if use_external_identity {
        warn!(
            surface = %surface.name,
            "ambient identity selected: no authorizer and no dedicated invoke role are created"
        );
        return Ok(AuthorizationStrategy::AmbientIdentity);
    }

    let provider_ref = provider_ref
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| {
            SynthError::configuration(
                "authorizer",
                "identity provider reference is required for token authorization",
            )
        })?;

    let authorizer = Authorizer {
        name: naming.resource("cognito_authorizer"),
        authorizer_type: AUTHORIZER_TYPE.to_owned(),
        identity_source: IDENTITY_SOURCE.to_owned(),
        provider_refs: vec![provider_ref.to_owned()],
        rest_api: surface.reference(),
    };
    info!(authorizer = %authorizer.name, surface = %surface.name, "token authorizer materialized");
    Ok(AuthorizationStrategy::ExternalProvider { authorizer })
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use stack_model::TenantId;

    use super::*;
    use crate::config::ApiSurfaceConfig;

    fn fixture() -> (Naming, RouteSurface) {
        let naming = Naming::new("iot", "dev", TenantId::parse("a1b2c3").unwrap());
        let surface = RouteSurface::new(&naming, &ApiSurfaceConfig::default()).unwrap();
        (naming, surface)
    }

    #[test]
    fn flag_false_materializes_one_authorizer() {
        let (naming, surface) = fixture();
        let strategy = select_strategy(false, Some("arn:pool"), &naming, &surface).unwrap();

        let authorizer = strategy.authorizer().unwrap();
        assert_eq!(authorizer.name, "iot_dev_cognito_authorizer");
        assert_eq!(authorizer.identity_source, IDENTITY_SOURCE);
        assert_eq!(authorizer.provider_refs, vec!["arn:pool"]);
        assert_eq!(authorizer.rest_api, surface.reference());
        assert_eq!(
            strategy.method_authorization(),
            MethodAuthorization::ExternalToken
        );
    }

    #[test]
    fn flag_true_uses_ambient_identity() {
        let (naming, surface) = fixture();
        let strategy = select_strategy(true, None, &naming, &surface).unwrap();
        assert_eq!(strategy, AuthorizationStrategy::AmbientIdentity);
        assert!(strategy.authorizer_ref().is_none());
        assert!(!strategy.admits(Availability::ExternalProviderOnly));
    }

    #[test]
    fn missing_provider_ref_is_a_configuration_error() {
        let (naming, surface) = fixture();
        let err = select_strategy(false, Some("  "), &naming, &surface).unwrap_err();
        assert_eq!(err.resource(), "authorizer");
    }
}
