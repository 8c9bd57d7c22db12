//! Request-inspection rules placed in front of the route surface.

use std::collections::BTreeMap;

use serde::Serialize;
use stack_model::{Naming, ResourceRef, SynthError, SynthResult, Taggable};
use tracing::{debug, info};

pub const CHAIN_SCOPE: &str = "REGIONAL";
pub const RULE_VENDOR: &str = "AWS";

const COMMON_RULE_SET: &str = "AWSManagedRulesCommonRuleSet";
const IP_REPUTATION_LIST: &str = "AWSManagedRulesAmazonIpReputationList";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideMode {
    /// Managed rules decide blocking themselves.
    None,
    /// Matches are only counted.
    Count,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultAction {
    Allow,
    Block,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisibilityConfig {
    pub metric_name: String,
    pub metrics_enabled: bool,
    pub sampled_requests_enabled: bool,
}

impl VisibilityConfig {
    #[must_use]
    pub fn observed(metric_name: &str) -> Self {
        Self {
            metric_name: metric_name.to_owned(),
            metrics_enabled: true,
            sampled_requests_enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManagedRuleGroup {
    pub vendor: String,
    pub name: String,
    pub excluded_rules: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterRule {
    pub name: String,
    pub priority: u32,
    pub override_mode: OverrideMode,
    pub statement: ManagedRuleGroup,
    pub visibility: VisibilityConfig,
}

impl FilterRule {
    #[must_use]
    pub fn managed(name: &str, priority: u32, group: &str, metric: &str) -> Self {
        Self {
            name: name.to_owned(),
            priority,
            override_mode: OverrideMode::None,
            statement: ManagedRuleGroup {
                vendor: RULE_VENDOR.to_owned(),
                name: group.to_owned(),
                excluded_rules: Vec::new(),
            },
            visibility: VisibilityConfig::observed(metric),
        }
    }

    #[must_use]
    pub fn excluding(mut self, rules: &[String]) -> Self {
        self.statement.excluded_rules.extend(rules.iter().cloned());
        self
    }
}

/// Ordered rule list bound to one named filter group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterChain {
    pub name: String,
    pub scope: String,
    pub default_action: DefaultAction,
    pub visibility: VisibilityConfig,
    rules: Vec<FilterRule>,
    pub tags: BTreeMap<String, String>,
}

impl FilterChain {
    /// # Errors
    /// Returns [`SynthError::Configuration`] unless rule priorities are
    /// unique and strictly ascending.
    pub fn from_rules(name: impl Into<String>, rules: Vec<FilterRule>) -> SynthResult<Self> {
        let name = name.into();
        for pair in rules.windows(2) {
            if pair[1].priority <= pair[0].priority {
                return Err(SynthError::configuration(
                    name,
                    format!(
                        "rule '{}' has priority {} which does not follow '{}' at {}",
                        pair[1].name, pair[1].priority, pair[0].name, pair[0].priority
                    ),
                ));
            }
        }
        Ok(Self {
            name,
            scope: CHAIN_SCOPE.to_owned(),
            default_action: DefaultAction::Allow,
            visibility: VisibilityConfig::observed("webACL"),
            rules,
            tags: BTreeMap::new(),
        })
    }

    #[must_use]
    pub fn rules(&self) -> &[FilterRule] {
        &self.rules
    }

    #[must_use]
    pub fn rule(&self, name: &str) -> Option<&FilterRule> {
        self.rules.iter().find(|r| r.name == name)
    }

    #[must_use]
    pub fn reference(&self) -> ResourceRef {
        ResourceRef::web_acl(&self.name)
    }
}

impl Taggable for FilterChain {
    fn tags_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.tags
    }
}

/// The standard chain: general protection at priority 1 with
/// `excluded_restrictions` turned off, reputation block list at priority 2.
///
/// # Errors
/// Propagates [`FilterChain::from_rules`] failures.
pub fn build_filter_chain(
    naming: &Naming,
    excluded_restrictions: &[String],
) -> SynthResult<FilterChain> {
    let rules = vec![
        FilterRule::managed(
            &format!("{RULE_VENDOR}-{COMMON_RULE_SET}"),
            1,
            COMMON_RULE_SET,
            "awsCommonRules",
        )
        .excluding(excluded_restrictions),
        FilterRule::managed("awsIPReputation", 2, IP_REPUTATION_LIST, "awsReputation"),
    ];
    let chain = FilterChain::from_rules(naming.tenant_scoped("web_acl"), rules)?;
    info!(
        chain = %chain.name,
        rules = chain.rules.len(),
        excluded = ?excluded_restrictions,
        "filter chain built"
    );
    Ok(chain)
}

/// Binding of a filter chain to a deployed stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageAssociation {
    pub web_acl: ResourceRef,
    pub stage_arn: String,
}

/// All chain-to-stage bindings of a synthesis pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StageAssociations {
    associations: Vec<StageAssociation>,
}

impl StageAssociations {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `chain` to `stage_arn`. Repeating an existing binding is a no-op.
    ///
    /// # Errors
    /// Returns [`SynthError::Configuration`] when `chain` is already bound to
    /// a different stage. Bindings are never re-targeted.
    pub fn attach_to_stage(
        &mut self,
        chain: &FilterChain,
        stage_arn: &str,
    ) -> SynthResult<&StageAssociation> {
        let web_acl = chain.reference();
        let position = match self.associations.iter().position(|a| a.web_acl == web_acl) {
            Some(i) if self.associations[i].stage_arn == stage_arn => {
                debug!(chain = %chain.name, "filter chain already attached");
                i
            }
            Some(i) => {
                return Err(SynthError::configuration(
                    chain.name.clone(),
                    format!(
                        "already attached to '{}', cannot re-attach to '{stage_arn}'",
                        self.associations[i].stage_arn
                    ),
                ));
            }
            None => {
                self.associations.push(StageAssociation {
                    web_acl,
                    stage_arn: stage_arn.to_owned(),
                });
                info!(chain = %chain.name, stage = %stage_arn, "filter chain attached");
                self.associations.len() - 1
            }
        };
        Ok(&self.associations[position])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.associations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.associations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StageAssociation> {
        self.associations.iter()
    }
}
