use std::collections::BTreeMap;

use serde::Serialize;
use stack_model::{HandlerDescriptor, Principal, ResourceRef, SynthError, SynthResult};
use tracing::{debug, info};

use crate::rules::{
    EventFilter, SQL_VERSION, TELEMETRY_HANDLER, TELEMETRY_RULE, TopicRule, UPDATE_CHECK_HANDLER,
    UPDATE_CHECK_RULE,
};

pub const INVOKE_ACTION: &str = "lambda:InvokeFunction";

/// Permission for a principal to invoke one handler, scoped to one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvokeGrant {
    pub statement_id: String,
    /// Deployed handler name.
    pub handler: String,
    pub action: String,
    pub principal: Principal,
    pub source: ResourceRef,
}

impl InvokeGrant {
    #[must_use]
    pub fn new(
        statement_id: String,
        handler: &str,
        principal: Principal,
        source: ResourceRef,
    ) -> Self {
        Self {
            statement_id,
            handler: handler.to_owned(),
            action: INVOKE_ACTION.to_owned(),
            principal,
            source,
        }
    }

    /// Whether this grant lets `source` invoke `handler`.
    #[must_use]
    pub fn permits(&self, handler: &str, source: &ResourceRef) -> bool {
        self.handler == handler && &self.source == source
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventBinding {
    pub rule: TopicRule,
    /// Manifest handler name of the target.
    pub target_handler: String,
    pub grant: InvokeGrant,
}

/// Binds topic rules to handlers. Re-binding an identical rule is a no-op.
#[derive(Debug, Clone, Default)]
pub struct EventBinder {
    bindings: Vec<EventBinding>,
    /// Keyed by `(handler, statement_id)`.
    grants: BTreeMap<(String, String), InvokeGrant>,
}

impl EventBinder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the binder with grants that already exist on handlers.
    #[must_use]
    pub fn with_existing_grants(mut self, grants: impl IntoIterator<Item = InvokeGrant>) -> Self {
        for grant in grants {
            self.grants
                .insert((grant.handler.clone(), grant.statement_id.clone()), grant);
        }
        self
    }

    /// Route messages matching `filter` to `target` and let the
    /// message-routing principal invoke it from this rule only.
    ///
    /// # Errors
    /// Returns [`SynthError::GrantConflict`] when the handler already holds a
    /// different grant under the same statement id, and
    /// [`SynthError::Configuration`] when `rule_name` is already bound to
    /// another filter or handler. Nothing is recorded on failure.
    pub fn bind_event(
        &mut self,
        rule_name: &str,
        filter: EventFilter,
        target: &HandlerDescriptor,
    ) -> SynthResult<&EventBinding> {
        let rule = TopicRule {
            name: rule_name.to_owned(),
            filter,
            sql_version: SQL_VERSION.to_owned(),
            enabled: true,
            target: target.arn(),
            tags: BTreeMap::new(),
        };
        let grant = InvokeGrant::new(
            format!("{rule_name}_invoke"),
            &target.name,
            Principal::message_routing(),
            rule.reference(),
        );

        if let Some(i) = self.bindings.iter().position(|b| b.rule.name == rule_name) {
            let existing = &self.bindings[i];
            if existing.rule.filter == rule.filter && existing.grant == grant {
                debug!(rule = %rule_name, "event binding already present");
                return Ok(&self.bindings[i]);
            }
            return Err(SynthError::configuration(
                rule_name,
                format!(
                    "rule is already bound to '{}' with filter \"{}\"",
                    existing.target_handler, existing.rule.filter.sql
                ),
            ));
        }

        let key = (grant.handler.clone(), grant.statement_id.clone());
        match self.grants.get(&key) {
            Some(existing) if *existing != grant => {
                return Err(SynthError::grant_conflict(
                    &target.name,
                    format!(
                        "statement '{}' already grants '{}' from '{}'",
                        grant.statement_id,
                        existing.principal.id(),
                        existing.source
                    ),
                ));
            }
            Some(_) => debug!(
                handler = %target.name,
                statement = %grant.statement_id,
                "invoke grant already present"
            ),
            None => {
                self.grants.insert(key, grant.clone());
            }
        }

        info!(
            rule = %rule_name,
            topic = %rule.filter.topic_pattern,
            handler = %target.name,
            "event binding created"
        );
        self.bindings.push(EventBinding {
            rule,
            target_handler: target.handler_name.clone(),
            grant,
        });
        Ok(&self.bindings[self.bindings.len() - 1])
    }

    #[must_use]
    pub fn bindings(&self) -> &[EventBinding] {
        &self.bindings
    }

    pub fn grants(&self) -> impl Iterator<Item = &InvokeGrant> {
        self.grants.values()
    }

    #[must_use]
    pub fn into_bindings(self) -> Vec<EventBinding> {
        self.bindings
    }
}

/// Bind the telemetry and update-check rules under `namespace`.
///
/// `handlers` is keyed by manifest handler name.
///
/// # Errors
/// Returns [`SynthError::Configuration`] naming a missing target handler,
/// and propagates [`EventBinder::bind_event`] failures.
pub fn bind_standard_events(
    binder: &mut EventBinder,
    namespace: &str,
    handlers: &BTreeMap<String, HandlerDescriptor>,
) -> SynthResult<()> {
    let routes = [
        (TELEMETRY_RULE, EventFilter::telemetry(namespace)?, TELEMETRY_HANDLER),
        (
            UPDATE_CHECK_RULE,
            EventFilter::update_check(namespace)?,
            UPDATE_CHECK_HANDLER,
        ),
    ];
    for (rule, filter, handler_name) in routes {
        let target = handlers.get(handler_name).ok_or_else(|| {
            SynthError::configuration(
                handler_name,
                format!("rule '{rule}' targets a handler that was not synthesized"),
            )
        })?;
        binder.bind_event(rule, filter, target)?;
    }
    Ok(())
}
