//! Request resolution over a synthesized route tree.

use std::collections::HashMap;

use serde::Serialize;
use stack_model::{SynthError, SynthResult};

use crate::auth::MethodAuthorization;
use crate::manifest::HttpVerb;
use crate::route_tree::{BoundMethod, MethodBinding, PROXY_LABEL, RouteTree};

/// Handler and authorization a request would reach.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedRoute {
    pub handler: String,
    pub authorization: MethodAuthorization,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorizer: Option<String>,
}

impl From<&MethodBinding> for ResolvedRoute {
    fn from(binding: &MethodBinding) -> Self {
        Self {
            handler: binding.handler.clone(),
            authorization: binding.authorization,
            authorizer: binding.authorizer.clone(),
        }
    }
}

/// Route matcher for a specific HTTP verb.
#[derive(Clone)]
struct RouteMatcher {
    matcher: matchit::Router<ResolvedRoute>,
}

impl RouteMatcher {
    fn new() -> Self {
        Self {
            matcher: matchit::Router::new(),
        }
    }

    fn insert(&mut self, path: &str, route: ResolvedRoute) -> Result<(), matchit::InsertError> {
        self.matcher.insert(path, route)
    }

    fn find(&self, path: &str) -> Option<&ResolvedRoute> {
        self.matcher.at(path).ok().map(|m| m.value)
    }
}

/// Per-verb matchers built from every binding of a route tree.
#[derive(Clone, Default)]
pub struct RoutePolicy {
    matchers: HashMap<HttpVerb, RouteMatcher>,
}

impl RoutePolicy {
    /// Index every binding of `tree`. Proxy bindings answer every verb for
    /// any sub-path of their parent segment.
    ///
    /// # Errors
    /// Returns [`SynthError::Configuration`] when two bindings claim the same
    /// route pattern for one verb.
    pub fn from_tree(tree: &RouteTree) -> SynthResult<Self> {
        let mut policy = Self::default();
        for (segment, binding) in tree.bindings() {
            let (verbs, path) = match binding.method {
                BoundMethod::Any => (
                    HttpVerb::ALL.to_vec(),
                    proxy_pattern(&segment.path),
                ),
                BoundMethod::Verb(verb) => (vec![verb], segment.path.clone()),
            };
            for verb in verbs {
                policy
                    .matchers
                    .entry(verb)
                    .or_insert_with(RouteMatcher::new)
                    .insert(&path, ResolvedRoute::from(binding))
                    .map_err(|e| {
                        SynthError::configuration(
                            binding.handler.clone(),
                            format!("failed to index route pattern '{verb} {path}': {e}"),
                        )
                    })?;
            }
        }
        Ok(policy)
    }

    /// Resolve the binding that serves `(verb, path)`.
    #[must_use]
    pub fn resolve(&self, verb: HttpVerb, path: &str) -> Option<&ResolvedRoute> {
        self.matchers.get(&verb).and_then(|m| m.find(path))
    }
}

/// `/v1/user/{proxy+}` becomes the catch-all pattern `/v1/user/{*proxy}`.
fn proxy_pattern(path: &str) -> String {
    match path.strip_suffix(PROXY_LABEL) {
        Some(parent) => format!("{parent}{{*proxy}}"),
        None => format!("{path}/{{*proxy}}"),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn proxy_pattern_rewrites_the_catch_all_label() {
        assert_eq!(proxy_pattern("/v1/user/{proxy+}"), "/v1/user/{*proxy}");
        assert_eq!(proxy_pattern("/v1/user"), "/v1/user/{*proxy}");
    }
}
