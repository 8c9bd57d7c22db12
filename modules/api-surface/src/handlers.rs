//! Handler descriptor factory.

use std::collections::BTreeMap;

use stack_model::{
    AccessRoleDescriptor, Collaborators, HandlerDescriptor, Naming, NetworkPlacement, SynthError,
    SynthResult, TableHandle,
};

use crate::manifest::RouteManifestEntry;

pub const RUNTIME: &str = "python3.8";

/// Upper bound the compute platform accepts for a handler timeout.
pub const MAX_TIMEOUT_SECONDS: u32 = 900;

/// Per-stack values every handler is configured with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerSettings {
    pub timeout_seconds: u32,
    pub credential_key_ref: String,
    pub log_level: String,
}

/// Builds handler descriptors that share runtime, network, layers and the
/// base environment.
#[derive(Debug, Clone)]
pub struct HandlerFactory {
    naming: Naming,
    timeout_seconds: u32,
    network: NetworkPlacement,
    layers: Vec<String>,
    environment: BTreeMap<String, String>,
}

impl HandlerFactory {
    /// # Errors
    /// Returns [`SynthError::Configuration`] for a timeout outside
    /// `1..=MAX_TIMEOUT_SECONDS` or a blank credential key reference.
    pub fn new(
        naming: &Naming,
        settings: &HandlerSettings,
        collaborators: &Collaborators,
    ) -> SynthResult<Self> {
        if !(1..=MAX_TIMEOUT_SECONDS).contains(&settings.timeout_seconds) {
            return Err(SynthError::configuration(
                "timeout_seconds",
                format!(
                    "{} is outside 1..={MAX_TIMEOUT_SECONDS}",
                    settings.timeout_seconds
                ),
            ));
        }
        if settings.credential_key_ref.trim().is_empty() {
            return Err(SynthError::configuration(
                "credential_key_ref",
                "credential key reference is empty",
            ));
        }

        let mut environment = BTreeMap::from([
            (
                "DB_PASS_KEY".to_owned(),
                settings.credential_key_ref.clone(),
            ),
            (
                "DYNAMODB_TABLE".to_owned(),
                collaborators.table.name().to_owned(),
            ),
            ("PREFIX".to_owned(), naming.prefix().to_owned()),
            (
                "IOT_ENDPOINT".to_owned(),
                collaborators.messaging_endpoint.clone(),
            ),
            ("STAGE".to_owned(), naming.stage().to_owned()),
            ("IOT_LOGLEVEL".to_owned(), settings.log_level.clone()),
        ]);
        if let Some(ts) = &collaborators.timeseries {
            environment.insert("TS_DATABASE".to_owned(), ts.database.clone());
            environment.insert("TS_TABLENAME".to_owned(), ts.table.clone());
        }

        Ok(Self {
            naming: naming.clone(),
            timeout_seconds: settings.timeout_seconds,
            network: collaborators.network.clone(),
            layers: collaborators.layers.clone(),
            environment,
        })
    }

    /// Deployed name of the handler for `handler_name`: `<prefix>_<handler_name>`.
    #[must_use]
    pub fn function_name(&self, handler_name: &str) -> String {
        self.naming.resource(handler_name)
    }

    /// Descriptor for `entry`, executing as `role`.
    #[must_use]
    pub fn build(
        &self,
        entry: &RouteManifestEntry,
        role: &AccessRoleDescriptor,
    ) -> HandlerDescriptor {
        HandlerDescriptor {
            name: self.function_name(&entry.handler_name),
            handler_name: entry.handler_name.clone(),
            execution_role: role.name.clone(),
            runtime: RUNTIME.to_owned(),
            entry_point: entry.entry_point.clone(),
            code_location: entry.code_location.clone(),
            timeout_seconds: self.timeout_seconds,
            network: self.network.clone(),
            environment: self.environment.clone(),
            layers: self.layers.clone(),
            tags: BTreeMap::new(),
        }
    }
}
