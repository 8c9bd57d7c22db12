#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::BTreeMap;

use event_routing::{EventBinder, EventFilter, InvokeGrant, bind_standard_events};
use stack_model::{HandlerDescriptor, NetworkPlacement, Principal, ResourceRef, SynthError};

fn handler(handler_name: &str) -> HandlerDescriptor {
    let name = format!("iot_dev_{handler_name}");
    HandlerDescriptor {
        execution_role: format!("role_{name}"),
        name,
        handler_name: handler_name.to_owned(),
        runtime: "python3.8".to_owned(),
        entry_point: "main.lambda_handler".to_owned(),
        code_location: format!("lambda_src/api/iot_{handler_name}"),
        timeout_seconds: 30,
        network: NetworkPlacement {
            network_ref: "vpc-1".to_owned(),
            security_groups: vec!["sg-1".to_owned()],
        },
        environment: BTreeMap::new(),
        layers: Vec::new(),
        tags: BTreeMap::new(),
    }
}

fn handlers() -> BTreeMap<String, HandlerDescriptor> {
    ["api_data", "api_update", "api_model"]
        .into_iter()
        .map(|h| (h.to_owned(), handler(h)))
        .collect()
}

#[test]
fn two_targets_get_two_independently_scoped_grants() {
    let handlers = handlers();
    let mut binder = EventBinder::new();
    bind_standard_events(&mut binder, "simpleiot_v1", &handlers).unwrap();

    let bindings = binder.bindings();
    assert_eq!(bindings.len(), 2);
    assert_eq!(binder.grants().count(), 2);

    let (a, b) = (&bindings[0], &bindings[1]);
    assert_eq!(a.rule.name, "iot_lambda_fwd_rule");
    assert_eq!(a.rule.filter.sql, "SELECT * FROM 'simpleiot_v1/app/data/#'");
    assert_eq!(a.target_handler, "api_data");
    assert_eq!(b.rule.filter.sql, "SELECT * FROM 'simpleiot_v1/checkupdate/#'");
    assert_eq!(b.target_handler, "api_update");

    assert_eq!(a.grant.principal, Principal::message_routing());
    assert_eq!(a.grant.statement_id, "iot_lambda_fwd_rule_invoke");
    assert_eq!(a.grant.source, a.rule.reference());
    assert_ne!(a.grant.source, b.grant.source);
}

#[test]
fn grant_of_one_binding_does_not_cover_the_other() {
    let handlers = handlers();
    let mut binder = EventBinder::new();
    bind_standard_events(&mut binder, "simpleiot_v1", &handlers).unwrap();
    let [a, b] = binder.bindings() else {
        panic!("expected two bindings");
    };

    let data = &handlers["api_data"].name;
    let update = &handlers["api_update"].name;
    assert!(a.grant.permits(data, &a.rule.reference()));
    assert!(!a.grant.permits(update, &b.rule.reference()));
    assert!(!a.grant.permits(data, &b.rule.reference()));
    assert!(!b.grant.permits(data, &a.rule.reference()));
    assert!(b.grant.permits(update, &b.rule.reference()));
}

#[test]
fn rebinding_is_idempotent() {
    let handlers = handlers();
    let mut binder = EventBinder::new();
    bind_standard_events(&mut binder, "simpleiot_v1", &handlers).unwrap();
    bind_standard_events(&mut binder, "simpleiot_v1", &handlers).unwrap();

    assert_eq!(binder.bindings().len(), 2);
    assert_eq!(binder.grants().count(), 2);
}

#[test]
fn conflicting_existing_grant_fails_synthesis() {
    let handlers = handlers();
    let data = &handlers["api_data"];
    let foreign = InvokeGrant::new(
        "iot_lambda_fwd_rule_invoke".to_owned(),
        &data.name,
        Principal::message_routing(),
        ResourceRef::topic_rule("some_other_rule"),
    );
    let mut binder = EventBinder::new().with_existing_grants([foreign]);

    let err = bind_standard_events(&mut binder, "simpleiot_v1", &handlers).unwrap_err();

    assert!(matches!(err, SynthError::GrantConflict { .. }));
    assert_eq!(err.resource(), "iot_dev_api_data");
    assert!(binder.bindings().is_empty());
}

#[test]
fn rule_name_reused_for_another_target_is_rejected() {
    let handlers = handlers();
    let mut binder = EventBinder::new();
    let filter = EventFilter::telemetry("simpleiot_v1").unwrap();
    binder
        .bind_event("iot_lambda_fwd_rule", filter.clone(), &handlers["api_data"])
        .unwrap();

    let err = binder
        .bind_event("iot_lambda_fwd_rule", filter, &handlers["api_model"])
        .unwrap_err();

    assert!(err.is_configuration());
    assert_eq!(err.resource(), "iot_lambda_fwd_rule");
    assert_eq!(binder.bindings().len(), 1);
}

#[test]
fn missing_target_handler_is_a_configuration_error() {
    let mut handlers = handlers();
    handlers.remove("api_update");
    let mut binder = EventBinder::new();

    let err = bind_standard_events(&mut binder, "simpleiot_v1", &handlers).unwrap_err();

    assert!(err.is_configuration());
    assert_eq!(err.resource(), "api_update");
}

#[test]
fn binding_serializes_with_reference_tokens() {
    let handlers = handlers();
    let mut binder = EventBinder::new();
    bind_standard_events(&mut binder, "fleet", &handlers).unwrap();

    let json = serde_json::to_value(binder.bindings()).unwrap();
    assert_eq!(json[0]["rule"]["target"], "${handler_arn:iot_dev_api_data}");
    assert_eq!(json[0]["grant"]["source"], "${topic_rule:iot_lambda_fwd_rule}");
    assert_eq!(json[1]["rule"]["sql_version"], "2016-03-23");
}
