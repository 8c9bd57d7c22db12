//! Access policy documents and principals.

use serde::{Deserialize, Serialize};

/// Statement effect. Synthesized roles only ever grant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Effect {
    #[default]
    Allow,
}

/// One access statement: an effect over a set of actions on a set of resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyStatement {
    pub effect: Effect,
    pub actions: Vec<String>,
    pub resources: Vec<String>,
}

impl PolicyStatement {
    /// Allow `actions` on every resource.
    #[must_use]
    pub fn allow_all<I, S>(actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            effect: Effect::Allow,
            actions: actions.into_iter().map(Into::into).collect(),
            resources: vec!["*".to_owned()],
        }
    }

    #[must_use]
    pub fn allows(&self, action: &str) -> bool {
        self.actions.iter().any(|a| a == action)
    }
}

/// Ordered list of statements attached under one policy name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyDocument {
    statements: Vec<PolicyStatement>,
}

impl PolicyDocument {
    #[must_use]
    pub fn new(statements: Vec<PolicyStatement>) -> Self {
        Self { statements }
    }

    #[must_use]
    pub fn single(statement: PolicyStatement) -> Self {
        Self {
            statements: vec![statement],
        }
    }

    #[must_use]
    pub fn statements(&self) -> &[PolicyStatement] {
        &self.statements
    }

    #[must_use]
    pub fn allows(&self, action: &str) -> bool {
        self.statements.iter().any(|s| s.allows(action))
    }
}

/// Service identity allowed to assume a role or invoke a handler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Principal {
    Service(String),
}

impl Principal {
    /// The compute platform that runs handlers.
    #[must_use]
    pub fn compute() -> Self {
        Self::Service("lambda.amazonaws.com".to_owned())
    }

    /// The pub/sub message-routing service.
    #[must_use]
    pub fn message_routing() -> Self {
        Self::Service("iot.amazonaws.com".to_owned())
    }

    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Service(id) => id,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn allow_all_statement_renders_as_allow_on_every_resource() {
        let statement = PolicyStatement::allow_all(["sts:AssumeRole"]);
        assert!(statement.allows("sts:AssumeRole"));
        assert!(!statement.allows("sts:GetCallerIdentity"));

        let json = serde_json::to_value(PolicyDocument::single(statement)).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{
                "effect": "Allow",
                "actions": ["sts:AssumeRole"],
                "resources": ["*"],
            }])
        );
    }

    #[test]
    fn unknown_effects_are_not_accepted() {
        assert!(serde_json::from_str::<Effect>("\"Deny\"").is_err());
        assert_eq!(serde_json::from_str::<Effect>("\"Allow\"").unwrap(), Effect::Allow);
    }
}
