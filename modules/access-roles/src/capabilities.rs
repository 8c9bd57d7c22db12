//! Cross-cutting grants shared by every handler role.

use std::collections::BTreeMap;

use stack_model::{ManagedGrant, PolicyDocument, PolicyStatement};

/// Platform limit on managed grants attached to a single role.
pub const MAX_MANAGED_GRANTS: usize = 10;

pub const ASSUME_ROLE: &str = "assume_role";
pub const INVOKE_HANDLER: &str = "invoke_handler";
pub const INVALIDATE_CACHE: &str = "invalidate_cache";
pub const GEO_LOCATION: &str = "geo_location";
pub const SEND_MESSAGE: &str = "send_message";

/// Coarse managed grants attached to every handler role.
const STANDARD_MANAGED_GRANTS: [&str; 10] = [
    "AmazonRDSFullAccess",
    "AmazonDynamoDBFullAccess",
    "IAMFullAccess",
    "AmazonS3FullAccess",
    "SecretsManagerReadWrite",
    "AWSGreengrassFullAccess",
    "AWSIoTFullAccess",
    "service-role/AWSLambdaVPCAccessExecutionRole",
    "AmazonTimestreamFullAccess",
    "AmazonSSMFullAccess",
];

const GEO_ACTIONS: [&str; 11] = [
    "geo:SearchPlaceIndexForText",
    "geo:CreatePlaceIndex",
    "geo:DeletePlaceIndex",
    "geo:BatchDeleteDevicePositionHistory",
    "geo:DeleteTracker",
    "geo:AssociateTrackerConsumer",
    "geo:UpdateTracker",
    "geo:CreateTracker",
    "geo:ListPlaceIndexes",
    "geo:CreateRouteCalculator",
    "geo:BatchUpdateDevicePosition",
];

/// Grant bundle common to all handlers: coarse managed grants plus
/// named least-privilege inline policies layered on top of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SharedCapabilities {
    managed_grants: Vec<ManagedGrant>,
    inline_policies: BTreeMap<String, PolicyDocument>,
}

impl SharedCapabilities {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard bundle: ten managed grants and the five inline overlays.
    #[must_use]
    pub fn standard() -> Self {
        let mut caps = Self::new();
        for grant in STANDARD_MANAGED_GRANTS {
            caps = caps.with_managed_grant(grant);
        }
        caps.with_inline_policy(
            ASSUME_ROLE,
            PolicyDocument::single(PolicyStatement::allow_all(["sts:AssumeRole"])),
        )
        .with_inline_policy(
            INVOKE_HANDLER,
            PolicyDocument::single(PolicyStatement::allow_all([
                "lambda:InvokeFunction",
                "lambda:InvokeAsync",
            ])),
        )
        .with_inline_policy(
            INVALIDATE_CACHE,
            PolicyDocument::single(PolicyStatement::allow_all([
                "cloudfront:CreateInvalidation",
            ])),
        )
        .with_inline_policy(
            GEO_LOCATION,
            PolicyDocument::single(PolicyStatement::allow_all(GEO_ACTIONS)),
        )
        .with_inline_policy(
            SEND_MESSAGE,
            PolicyDocument::single(PolicyStatement::allow_all([
                "mobiletargeting:SendMessages",
                "mobiletargeting:SendUsersMessages",
            ])),
        )
    }

    /// Append a managed grant. Duplicates are kept so that the limit check
    /// sees exactly what would be attached.
    #[must_use]
    pub fn with_managed_grant(mut self, name: impl Into<String>) -> Self {
        self.managed_grants.push(ManagedGrant::new(name));
        self
    }

    #[must_use]
    pub fn with_inline_policy(mut self, name: impl Into<String>, document: PolicyDocument) -> Self {
        self.inline_policies.insert(name.into(), document);
        self
    }

    #[must_use]
    pub fn managed_grants(&self) -> &[ManagedGrant] {
        &self.managed_grants
    }

    #[must_use]
    pub fn inline_policies(&self) -> &BTreeMap<String, PolicyDocument> {
        &self.inline_policies
    }
}
