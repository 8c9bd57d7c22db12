//! Composition root.
//!
//! Synthesis runs as a fixed sequence of stages: security chain,
//! authorization strategy, route tree, storage grants, event bindings.
//! Every stage consumes the builder of the previous one, so calling them
//! out of order does not compile.

use std::collections::BTreeMap;

use access_roles::{RoleSynthesizer, SharedCapabilities};
use api_surface::{
    AuthorizationStrategy, FilterChain, HandlerFactory, RouteManifest, RoutePolicy, RouteSurface,
    RouteSynthesis, RouteSynthesizer, StageAssociations, build_filter_chain, select_strategy,
};
use event_routing::{EventBinder, EventBinding, bind_standard_events};
use serde::Serialize;
use stack_model::{
    AccessRoleDescriptor, HandlerDescriptor, Naming, StorageGrant, SynthError, SynthResult,
    TableHandle, Tags, TenantId,
};
use tracing::{debug, info};

use crate::config::StackConfig;
use crate::outputs::Outputs;

/// Type-state markers and the products each stage carries forward.
pub mod state {
    use super::{
        AuthorizationStrategy, FilterChain, RouteSynthesis, StageAssociations, StorageGrant,
    };

    /// Nothing synthesized yet.
    #[derive(Debug)]
    pub struct Start;

    /// Filter chain built and attached to the deployed stage.
    #[derive(Debug)]
    pub struct Secured {
        pub(crate) chain: FilterChain,
        pub(crate) associations: StageAssociations,
    }

    /// Authorization strategy selected.
    #[derive(Debug)]
    pub struct Authorized {
        pub(crate) secured: Secured,
        pub(crate) strategy: AuthorizationStrategy,
    }

    /// Handlers, roles and routes synthesized.
    #[derive(Debug)]
    pub struct Routed {
        pub(crate) authorized: Authorized,
        pub(crate) routes: RouteSynthesis,
    }

    /// Table access granted.
    #[derive(Debug)]
    pub struct Granted {
        pub(crate) routed: Routed,
        pub(crate) storage_grants: Vec<StorageGrant>,
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Sealed trait for pipeline stage markers
pub trait Stage: sealed::Sealed {}

impl sealed::Sealed for state::Start {}
impl sealed::Sealed for state::Secured {}
impl sealed::Sealed for state::Authorized {}
impl sealed::Sealed for state::Routed {}
impl sealed::Sealed for state::Granted {}

impl Stage for state::Start {}
impl Stage for state::Secured {}
impl Stage for state::Authorized {}
impl Stage for state::Routed {}
impl Stage for state::Granted {}

pub use state::{Authorized, Granted, Routed, Secured, Start};

/// Pipeline builder. `S` records which stages have run.
#[derive(Debug)]
pub struct StackBuilder<S: Stage = Start> {
    config: StackConfig,
    naming: Naming,
    tags: Tags,
    surface: RouteSurface,
    stage: S,
}

impl StackBuilder<Start> {
    /// Validate `config` and lay out naming, tags and the empty route surface.
    ///
    /// # Errors
    /// Returns [`SynthError::Configuration`] for invalid configuration or
    /// collaborator handles.
    pub fn new(config: StackConfig) -> SynthResult<Self> {
        config.validate()?;
        let tenant_id = config.tenant_id.clone().unwrap_or_else(TenantId::generate);
        let naming = Naming::new(&config.name_prefix, &config.stage_name, tenant_id);
        let tags = Tags::standard(
            &config.release,
            &config.team,
            naming.stage(),
            naming.tenant_id(),
        );
        let surface = RouteSurface::new(&naming, &config.api)?;
        info!(prefix = %naming.prefix(), tenant = %naming.tenant_id(), "synthesis started");
        Ok(Self {
            config,
            naming,
            tags,
            surface,
            stage: Start,
        })
    }

    /// Build the filter chain and attach it to the deployed stage.
    ///
    /// # Errors
    /// Propagates filter chain construction and attachment failures.
    pub fn secure(self) -> SynthResult<StackBuilder<Secured>> {
        let chain = build_filter_chain(&self.naming, &self.config.api.excluded_filter_rules)?;
        let mut associations = StageAssociations::new();
        associations.attach_to_stage(&chain, &self.surface.stage_arn(&self.config.region))?;
        Ok(self.map_stage(|Start| Secured {
            chain,
            associations,
        }))
    }
}

impl StackBuilder<Secured> {
    /// Select the authorization strategy for the whole surface.
    ///
    /// # Errors
    /// Returns [`SynthError::Configuration`] when token authorization is
    /// selected without an identity provider reference.
    pub fn authorize(self) -> SynthResult<StackBuilder<Authorized>> {
        let strategy = select_strategy(
            self.config.use_external_identity,
            self.config.collaborators.identity_provider_ref.as_deref(),
            &self.naming,
            &self.surface,
        )?;
        Ok(self.map_stage(|secured| Authorized { secured, strategy }))
    }
}

impl StackBuilder<Authorized> {
    /// Walk `manifest`, creating one role, one handler and one route
    /// registration per admitted entry.
    ///
    /// # Errors
    /// Propagates handler factory and route synthesis failures.
    pub fn route(mut self, manifest: &RouteManifest) -> SynthResult<StackBuilder<Routed>> {
        let factory = HandlerFactory::new(
            &self.naming,
            &self.config.handler_settings(),
            &self.config.collaborators,
        )?;
        let roles = RoleSynthesizer::new(SharedCapabilities::standard());
        let routes = RouteSynthesizer::new(&self.stage.strategy, &factory, &self.config.api, roles)
            .synthesize(&mut self.surface, manifest)?;
        Ok(self.map_stage(|authorized| Routed { authorized, routes }))
    }
}

impl StackBuilder<Routed> {
    /// Grant document-table access to every handler flagged for it.
    ///
    /// # Errors
    /// Returns [`SynthError::Configuration`] when a flagged handler is missing.
    pub fn grant_storage(self) -> SynthResult<StackBuilder<Granted>> {
        let table = &self.config.collaborators.table;
        let routes = &self.stage.routes;
        let storage_grants = routes
            .table_access
            .iter()
            .map(|name| -> SynthResult<StorageGrant> {
                let handler = routes.handlers.get(name).ok_or_else(|| {
                    SynthError::configuration(name, "table access requested for an unknown handler")
                })?;
                debug!(handler = %handler.name, table = %table.name(), "table access granted");
                Ok(table.grant_read_write(handler))
            })
            .collect::<SynthResult<Vec<_>>>()?;
        Ok(self.map_stage(|routed| Granted {
            routed,
            storage_grants,
        }))
    }
}

impl StackBuilder<Granted> {
    /// Bind the event rules, label every descriptor and collect outputs.
    ///
    /// # Errors
    /// Returns [`SynthError::Configuration`] for a missing target handler and
    /// [`SynthError::GrantConflict`] for a colliding invoke grant.
    pub fn bind_events(self) -> SynthResult<SynthesizedStack> {
        let Granted {
            routed,
            storage_grants,
        } = self.stage;
        let Routed { authorized, routes } = routed;
        let Authorized { secured, strategy } = authorized;
        let RouteSynthesis {
            mut handlers,
            mut roles,
            skipped,
            ..
        } = routes;

        let mut binder = EventBinder::new();
        bind_standard_events(&mut binder, &self.config.topic_namespace, &handlers)?;
        let mut event_bindings = binder.into_bindings();

        let mut surface = self.surface;
        let mut chain = secured.chain;
        let tags = self.tags;
        tags.apply_all(handlers.values_mut());
        tags.apply_all(roles.iter_mut());
        tags.apply_all(event_bindings.iter_mut().map(|b| &mut b.rule));
        tags.apply(&mut surface);
        tags.apply(&mut chain);

        let outputs = Outputs::collect(
            &self.naming,
            &surface,
            &self.config.region,
            handlers.values(),
        );
        info!(
            handlers = handlers.len(),
            bindings = event_bindings.len(),
            outputs = outputs.len(),
            "synthesis complete"
        );

        Ok(SynthesizedStack {
            name_prefix: self.naming.prefix().to_owned(),
            tenant_id: self.naming.tenant_id().clone(),
            region: self.config.region,
            tags,
            filter_chain: chain,
            stage_associations: secured.associations,
            strategy,
            surface,
            handlers,
            roles,
            skipped_entries: skipped,
            storage_grants,
            event_bindings,
            outputs,
        })
    }
}

impl<S: Stage> StackBuilder<S> {
    #[must_use]
    pub fn naming(&self) -> &Naming {
        &self.naming
    }

    #[must_use]
    pub fn surface(&self) -> &RouteSurface {
        &self.surface
    }

    fn map_stage<N: Stage>(self, next: impl FnOnce(S) -> N) -> StackBuilder<N> {
        StackBuilder {
            config: self.config,
            naming: self.naming,
            tags: self.tags,
            surface: self.surface,
            stage: next(self.stage),
        }
    }
}

/// The complete descriptor set handed to the provisioning engine.
#[derive(Debug, Clone, Serialize)]
pub struct SynthesizedStack {
    pub name_prefix: String,
    pub tenant_id: TenantId,
    pub region: String,
    pub tags: Tags,
    pub filter_chain: FilterChain,
    pub stage_associations: StageAssociations,
    pub strategy: AuthorizationStrategy,
    pub surface: RouteSurface,
    /// Keyed by manifest handler name.
    pub handlers: BTreeMap<String, HandlerDescriptor>,
    pub roles: Vec<AccessRoleDescriptor>,
    pub skipped_entries: Vec<String>,
    pub storage_grants: Vec<StorageGrant>,
    pub event_bindings: Vec<EventBinding>,
    pub outputs: Outputs,
}

impl SynthesizedStack {
    /// Matchers answering which handler serves a request.
    ///
    /// # Errors
    /// Returns [`SynthError::Configuration`] when two bindings claim the same pattern.
    pub fn route_policy(&self) -> SynthResult<RoutePolicy> {
        RoutePolicy::from_tree(&self.surface.tree)
    }

    /// Pretty JSON rendering of the whole descriptor set.
    ///
    /// # Errors
    /// Returns the serializer error; descriptors only hold serializable data.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Run every stage in order.
///
/// # Errors
/// Returns the first stage failure. Nothing is emitted on failure.
pub fn synthesize(config: StackConfig, manifest: &RouteManifest) -> SynthResult<SynthesizedStack> {
    StackBuilder::new(config)?
        .secure()?
        .authorize()?
        .route(manifest)?
        .grant_storage()?
        .bind_events()
}
