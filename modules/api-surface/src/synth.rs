//! Manifest walk: one role, one handler and one route registration per entry.

use std::collections::BTreeMap;

use access_roles::RoleSynthesizer;
use serde::Serialize;
use stack_model::{AccessRoleDescriptor, HandlerDescriptor, SynthError, SynthResult};
use tracing::{debug, info, warn};

use crate::auth::AuthorizationStrategy;
use crate::config::ApiSurfaceConfig;
use crate::handlers::HandlerFactory;
use crate::manifest::RouteManifest;
use crate::surface::RouteSurface;

/// Everything the route walk produced besides the tree itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RouteSynthesis {
    /// Keyed by manifest handler name.
    pub handlers: BTreeMap<String, HandlerDescriptor>,
    pub roles: Vec<AccessRoleDescriptor>,
    /// Handler names flagged for document-table access.
    pub table_access: Vec<String>,
    /// Entries not exposed under the selected strategy.
    pub skipped: Vec<String>,
}

pub struct RouteSynthesizer<'a> {
    strategy: &'a AuthorizationStrategy,
    factory: &'a HandlerFactory,
    config: &'a ApiSurfaceConfig,
    roles: RoleSynthesizer,
}

impl<'a> RouteSynthesizer<'a> {
    #[must_use]
    pub fn new(
        strategy: &'a AuthorizationStrategy,
        factory: &'a HandlerFactory,
        config: &'a ApiSurfaceConfig,
        roles: RoleSynthesizer,
    ) -> Self {
        Self {
            strategy,
            factory,
            config,
            roles,
        }
    }

    /// Walk `manifest` in declaration order and attach every admitted entry
    /// to `surface`.
    ///
    /// # Errors
    /// Returns [`SynthError::Configuration`] attributed to the offending
    /// entry for invalid manifests, role limit violations, conflicting
    /// bindings and, when configured, entries that bind no verb.
    pub fn synthesize(
        mut self,
        surface: &mut RouteSurface,
        manifest: &RouteManifest,
    ) -> SynthResult<RouteSynthesis> {
        manifest.validate()?;

        let mut out = RouteSynthesis::default();
        for entry in manifest.entries() {
            let entry_name = entry.qualified_name();
            if !self.strategy.admits(entry.availability) {
                debug!(entry = %entry_name, "entry not exposed under the selected strategy");
                out.skipped.push(entry.handler_name.clone());
                continue;
            }
            if entry.verbs.is_empty() {
                if self.config.reject_empty_verb_sets {
                    return Err(SynthError::configuration(
                        entry_name,
                        "entry binds neither ANY nor any explicit verb",
                    ));
                }
                warn!(entry = %entry_name, "entry binds no verbs and stays unreachable");
            }

            let parent = match &entry.parent_segment {
                Some(label) => surface
                    .tree
                    .resolve_or_create(surface.root_segment, label)
                    .map_err(|e| reattribute(e, &entry_name))?,
                None => surface.root_segment,
            };

            let function_name = self.factory.function_name(&entry.handler_name);
            let role = self
                .roles
                .synthesize(&function_name)
                .map_err(|e| reattribute(e, &entry_name))?;
            let handler = self.factory.build(entry, &role);

            surface
                .tree
                .register_route(parent, &entry.resource_name, &handler, &entry.verbs, self.strategy)
                .map_err(|e| reattribute(e, &entry_name))?;

            debug!(
                entry = %entry_name,
                handler = %handler.name,
                role = %role.name,
                "entry synthesized"
            );
            if entry.table_access {
                out.table_access.push(entry.handler_name.clone());
            }
            out.roles.push(role);
            out.handlers.insert(entry.handler_name.clone(), handler);
        }

        info!(
            handlers = out.handlers.len(),
            skipped = out.skipped.len(),
            segments = surface.tree.len(),
            "route tree synthesized"
        );
        Ok(out)
    }
}

/// Attribute a failure to the manifest entry being processed.
fn reattribute(err: SynthError, entry: &str) -> SynthError {
    match err {
        SynthError::Configuration { resource, reason } if resource != entry => {
            SynthError::configuration(entry, format!("{resource}: {reason}"))
        }
        other => other,
    }
}
