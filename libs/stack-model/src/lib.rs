#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Shared model for stack synthesis: naming, descriptors, policies,
//! collaborator handles and the error taxonomy.

pub mod collaborators;
pub mod descriptors;
pub mod error;
pub mod naming;
pub mod policy;

pub use collaborators::{
    Collaborators, NetworkPlacement, ProvisionedTable, StorageGrant, TableHandle, TimeseriesStore,
};
pub use descriptors::{AccessRoleDescriptor, HandlerDescriptor, ManagedGrant, ResourceRef};
pub use error::{SynthError, SynthResult};
pub use naming::{Naming, Taggable, Tags, TenantId, derive_name, snake_to_camel};
pub use policy::{Effect, PolicyDocument, PolicyStatement, Principal};
