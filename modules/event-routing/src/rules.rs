//! Topic rules and the filter predicates they evaluate.

use std::collections::BTreeMap;

use serde::Serialize;
use stack_model::{ResourceRef, SynthError, SynthResult, Taggable};

pub const SQL_VERSION: &str = "2016-03-23";
pub const DEFAULT_TOPIC_NAMESPACE: &str = "simpleiot_v1";

pub const TELEMETRY_RULE: &str = "iot_lambda_fwd_rule";
pub const UPDATE_CHECK_RULE: &str = "iot_lambda_update_rule";
pub const TELEMETRY_HANDLER: &str = "api_data";
pub const UPDATE_CHECK_HANDLER: &str = "api_update";

/// Topic pattern plus the payload query applied to matching messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventFilter {
    pub topic_pattern: String,
    pub sql: String,
}

impl EventFilter {
    /// Select every field of messages published under `topic_pattern`.
    ///
    /// # Errors
    /// Returns [`SynthError::Configuration`] for an empty pattern or one
    /// containing a quote.
    pub fn select_all(topic_pattern: &str) -> SynthResult<Self> {
        if topic_pattern.trim().is_empty() || topic_pattern.contains('\'') {
            return Err(SynthError::configuration(
                "topic_namespace",
                format!("'{topic_pattern}' is not a usable topic pattern"),
            ));
        }
        Ok(Self {
            topic_pattern: topic_pattern.to_owned(),
            sql: format!("SELECT * FROM '{topic_pattern}'"),
        })
    }

    /// `<namespace>/app/data/#`
    ///
    /// # Errors
    /// See [`EventFilter::select_all`].
    pub fn telemetry(namespace: &str) -> SynthResult<Self> {
        Self::select_all(&format!("{namespace}/app/data/#"))
    }

    /// `<namespace>/checkupdate/#`
    ///
    /// # Errors
    /// See [`EventFilter::select_all`].
    pub fn update_check(namespace: &str) -> SynthResult<Self> {
        Self::select_all(&format!("{namespace}/checkupdate/#"))
    }
}

/// Routing rule forwarding matching messages to one handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicRule {
    pub name: String,
    pub filter: EventFilter,
    pub sql_version: String,
    pub enabled: bool,
    pub target: ResourceRef,
    pub tags: BTreeMap<String, String>,
}

impl TopicRule {
    #[must_use]
    pub fn reference(&self) -> ResourceRef {
        ResourceRef::topic_rule(&self.name)
    }
}

impl Taggable for TopicRule {
    fn tags_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.tags
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn standard_filters() {
        let telemetry = EventFilter::telemetry("simpleiot_v1").unwrap();
        assert_eq!(telemetry.sql, "SELECT * FROM 'simpleiot_v1/app/data/#'");

        let update = EventFilter::update_check("fleet").unwrap();
        assert_eq!(update.topic_pattern, "fleet/checkupdate/#");
    }

    #[test]
    fn quoted_patterns_are_rejected() {
        assert!(EventFilter::select_all("a'b/#").is_err());
        assert!(EventFilter::select_all(" ").is_err());
    }
}
