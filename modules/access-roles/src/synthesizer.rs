use std::collections::{BTreeMap, BTreeSet};

use stack_model::{AccessRoleDescriptor, Principal, SynthError, SynthResult};
use tracing::debug;

use crate::capabilities::{MAX_MANAGED_GRANTS, SharedCapabilities};

const ROLE_PREFIX: &str = "role_";

/// Role name for a handler: `role_<handler_name>`.
#[must_use]
pub fn role_name(handler_name: &str) -> String {
    format!("{ROLE_PREFIX}{handler_name}")
}

/// Build the execution role of one handler.
///
/// The role is assumed by the compute principal and carries every managed
/// grant and inline policy of `capabilities`, in order.
///
/// # Errors
/// Returns [`SynthError::Configuration`] naming the handler when the handler
/// name is blank or more than [`MAX_MANAGED_GRANTS`] managed grants would be
/// attached. The list is never truncated.
pub fn synthesize_role(
    handler_name: &str,
    capabilities: &SharedCapabilities,
) -> SynthResult<AccessRoleDescriptor> {
    if handler_name.trim().is_empty() {
        return Err(SynthError::configuration(
            "role",
            "handler name is required to derive a role name",
        ));
    }

    let grants = capabilities.managed_grants();
    if grants.len() > MAX_MANAGED_GRANTS {
        return Err(SynthError::configuration(
            handler_name,
            format!(
                "{} managed grants requested, at most {MAX_MANAGED_GRANTS} fit on one role",
                grants.len()
            ),
        ));
    }

    let role = AccessRoleDescriptor {
        name: role_name(handler_name),
        assumed_by: Principal::compute(),
        managed_grants: grants.to_vec(),
        inline_policies: capabilities.inline_policies().clone(),
        tags: BTreeMap::new(),
    };
    debug!(handler = %handler_name, role = %role.name, "synthesized access role");
    Ok(role)
}

/// Issues roles for a whole synthesis pass and refuses to hand out the same
/// role twice.
#[derive(Debug, Clone)]
pub struct RoleSynthesizer {
    capabilities: SharedCapabilities,
    issued: BTreeSet<String>,
}

impl RoleSynthesizer {
    #[must_use]
    pub fn new(capabilities: SharedCapabilities) -> Self {
        Self {
            capabilities,
            issued: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn capabilities(&self) -> &SharedCapabilities {
        &self.capabilities
    }

    /// Synthesize the role for `handler_name`.
    ///
    /// # Errors
    /// Same as [`synthesize_role`], plus [`SynthError::Configuration`] when a
    /// role for `handler_name` was already issued in this pass.
    pub fn synthesize(&mut self, handler_name: &str) -> SynthResult<AccessRoleDescriptor> {
        let role = synthesize_role(handler_name, &self.capabilities)?;
        if !self.issued.insert(role.name.clone()) {
            return Err(SynthError::configuration(
                handler_name,
                format!("role '{}' was already issued to another handler", role.name),
            ));
        }
        Ok(role)
    }

    /// Number of roles issued so far.
    #[must_use]
    pub fn issued(&self) -> usize {
        self.issued.len()
    }
}
