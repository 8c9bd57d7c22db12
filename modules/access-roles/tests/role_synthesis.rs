#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::BTreeSet;

use access_roles::{RoleSynthesizer, SharedCapabilities, synthesize_role};
use stack_model::Principal;

#[test]
fn role_is_bound_to_the_compute_principal_with_all_overlays() {
    let role = synthesize_role("iot_dev_api_device", &SharedCapabilities::standard()).unwrap();

    assert_eq!(role.name, "role_iot_dev_api_device");
    assert_eq!(role.assumed_by, Principal::compute());
    assert_eq!(role.managed_grants.len(), 10);
    for policy in [
        "assume_role",
        "invoke_handler",
        "invalidate_cache",
        "geo_location",
        "send_message",
    ] {
        assert!(role.inline_policy(policy).is_some(), "missing {policy}");
    }
}

#[test]
fn eleven_managed_grants_are_rejected_without_truncation() {
    let caps = SharedCapabilities::standard().with_managed_grant("AmazonSQSFullAccess");
    assert_eq!(caps.managed_grants().len(), 11);

    let mut roles = RoleSynthesizer::new(caps);
    let err = roles.synthesize("iot_dev_api_data").unwrap_err();

    assert!(err.is_configuration());
    assert_eq!(err.resource(), "iot_dev_api_data");
    assert!(err.to_string().contains("11 managed grants"));
    assert_eq!(roles.issued(), 0);
}

#[test]
fn distinct_handlers_never_share_a_role() {
    let mut roles = RoleSynthesizer::new(SharedCapabilities::standard());
    let names: BTreeSet<String> = ["iot_dev_api_data", "iot_dev_api_update", "iot_dev_ui_api_user"]
        .into_iter()
        .map(|h| roles.synthesize(h).unwrap().name)
        .collect();

    assert_eq!(names.len(), 3);
    assert_eq!(roles.issued(), 3);
}

#[test]
fn custom_bundle_without_overlays_is_passed_through() {
    let caps = SharedCapabilities::new().with_managed_grant("AmazonS3FullAccess");
    let role = synthesize_role("iot_dev_api_model", &caps).unwrap();

    assert_eq!(role.managed_grants.len(), 1);
    assert!(role.inline_policies.is_empty());
}
