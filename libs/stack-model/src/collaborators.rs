//! Typed handles produced by the collaborators that provision storage,
//! identity, networking and shared code outside of this workspace.

use serde::{Deserialize, Serialize};

use crate::descriptors::HandlerDescriptor;
use crate::error::{SynthError, SynthResult};

/// Read/write data-plane actions granted on a table.
pub const TABLE_READ_WRITE_ACTIONS: &[&str] = &[
    "dynamodb:BatchGetItem",
    "dynamodb:GetRecords",
    "dynamodb:GetShardIterator",
    "dynamodb:Query",
    "dynamodb:GetItem",
    "dynamodb:Scan",
    "dynamodb:ConditionCheckItem",
    "dynamodb:BatchWriteItem",
    "dynamodb:PutItem",
    "dynamodb:UpdateItem",
    "dynamodb:DeleteItem",
    "dynamodb:DescribeTable",
];

/// Grant of table access to one handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageGrant {
    pub table: String,
    pub table_arn: String,
    pub grantee: String,
    pub actions: Vec<String>,
}

/// Interface of the document-storage collaborator.
pub trait TableHandle {
    /// Stable table name, injected into handler environments.
    fn name(&self) -> &str;

    /// Grant `handler` read/write access to the table.
    fn grant_read_write(&self, handler: &HandlerDescriptor) -> StorageGrant;
}

/// A table provisioned by the storage collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionedTable {
    pub name: String,
    pub arn: String,
}

impl TableHandle for ProvisionedTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn grant_read_write(&self, handler: &HandlerDescriptor) -> StorageGrant {
        StorageGrant {
            table: self.name.clone(),
            table_arn: self.arn.clone(),
            grantee: handler.execution_role.clone(),
            actions: TABLE_READ_WRITE_ACTIONS
                .iter()
                .map(|a| (*a).to_owned())
                .collect(),
        }
    }
}

/// Private network placement applied to every handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkPlacement {
    pub network_ref: String,
    pub security_groups: Vec<String>,
}

/// Time-series store names, injected when the store is provisioned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeseriesStore {
    pub database: String,
    pub table: String,
}

/// Everything the core consumes from outside collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collaborators {
    pub table: ProvisionedTable,
    /// Identity-provider reference, only needed with the external-provider strategy.
    #[serde(default)]
    pub identity_provider_ref: Option<String>,
    pub network: NetworkPlacement,
    /// Shared code layers, attached to every handler in this order.
    #[serde(default)]
    pub layers: Vec<String>,
    pub messaging_endpoint: String,
    #[serde(default)]
    pub timeseries: Option<TimeseriesStore>,
}

impl Collaborators {
    /// Reject handles that cannot be wired into a handler.
    ///
    /// # Errors
    /// Returns [`SynthError::Configuration`] naming the unresolved collaborator.
    pub fn validate(&self) -> SynthResult<()> {
        if self.table.name.trim().is_empty() {
            return Err(SynthError::configuration("collaborators.table", "table name is empty"));
        }
        if self.network.network_ref.trim().is_empty() {
            return Err(SynthError::configuration(
                "collaborators.network",
                "network reference is empty",
            ));
        }
        if self.network.security_groups.is_empty() {
            return Err(SynthError::configuration(
                "collaborators.network",
                "at least one access-control group is required",
            ));
        }
        if self.messaging_endpoint.trim().is_empty() {
            return Err(SynthError::configuration(
                "collaborators.messaging_endpoint",
                "messaging endpoint is empty",
            ));
        }
        Ok(())
    }
}
