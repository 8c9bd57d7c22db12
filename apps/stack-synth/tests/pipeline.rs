#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::io::Write;

use api_surface::{
    ApiSurfaceConfig, HttpVerb, MethodAuthorization, RouteManifest, RouteManifestEntry,
};
use stack_model::{Collaborators, NetworkPlacement, ProvisionedTable, TenantId};
use stack_synth::{StackBuilder, StackConfig, synthesize};
use tracing_test::traced_test;

fn config(use_external_identity: bool) -> StackConfig {
    StackConfig {
        use_external_identity,
        region: "us-west-2".to_owned(),
        stage_name: "dev".to_owned(),
        timeout_seconds: 30,
        log_level: "INFO".to_owned(),
        credential_key_ref: "iot_dev_db_credentials".to_owned(),
        name_prefix: "iot".to_owned(),
        tenant_id: Some(TenantId::parse("a1b2c3d4e5f6").unwrap()),
        team: "platform".to_owned(),
        release: "1.2.3".to_owned(),
        topic_namespace: "simpleiot_v1".to_owned(),
        api: ApiSurfaceConfig::default(),
        manifest: None,
        collaborators: Collaborators {
            table: ProvisionedTable {
                name: "iot_dev_dynamo_table".to_owned(),
                arn: "arn:aws:dynamodb:us-west-2:123456789012:table/iot_dev_dynamo_table"
                    .to_owned(),
            },
            identity_provider_ref: Some(
                "arn:aws:cognito-idp:us-west-2:123456789012:userpool/p1".to_owned(),
            ),
            network: NetworkPlacement {
                network_ref: "vpc-0abc".to_owned(),
                security_groups: vec!["sg-app".to_owned()],
            },
            layers: vec!["layer_core".to_owned(), "layer_db".to_owned()],
            messaging_endpoint: "abc-ats.iot.us-west-2.amazonaws.com".to_owned(),
            timeseries: None,
        },
    }
}

#[test]
fn token_authorized_stack_covers_the_standard_manifest() {
    let stack = synthesize(config(false), &RouteManifest::standard()).unwrap();

    assert_eq!(stack.name_prefix, "iot_dev");
    assert_eq!(stack.handlers.len(), 28);
    assert_eq!(stack.roles.len(), 28);
    assert!(stack.skipped_entries.is_empty());
    assert_eq!(
        stack.strategy.method_authorization(),
        MethodAuthorization::ExternalToken
    );
    assert_eq!(stack.surface.tree.authorization(), Some(MethodAuthorization::ExternalToken));
    assert_eq!(stack.filter_chain.name, "iot_dev_web_acl-a1b2c3d4e5f6");
    assert_eq!(stack.stage_associations.len(), 1);

    let data = &stack.handlers["api_data"];
    assert_eq!(data.name, "iot_dev_api_data");
    assert_eq!(data.execution_role, "role_iot_dev_api_data");
    assert_eq!(data.layers, vec!["layer_core", "layer_db"]);
}

#[test]
fn ambient_identity_skips_provider_only_entries() {
    let stack = synthesize(config(true), &RouteManifest::standard()).unwrap();

    assert_eq!(stack.handlers.len(), 27);
    assert_eq!(stack.skipped_entries, vec!["api_user"]);
    assert!(stack.strategy.authorizer().is_none());
    assert!(stack.outputs.get("iotDevApiUser").is_none());

    let policy = stack.route_policy().unwrap();
    let route = policy.resolve(HttpVerb::Get, "/v1/ui/user").unwrap();
    assert_eq!(route.handler, "iot_dev_ui_api_user");
    assert_eq!(route.authorization, MethodAuthorization::Ambient);
    assert!(policy.resolve(HttpVerb::Get, "/v1/user").is_none());
}

#[test]
fn identity_provider_is_required_for_token_authorization() {
    let mut cfg = config(false);
    cfg.collaborators.identity_provider_ref = None;
    let err = synthesize(cfg, &RouteManifest::standard()).unwrap_err();
    assert!(err.is_configuration());
    assert_eq!(err.resource(), "authorizer");
}

#[test]
fn every_descriptor_carries_the_standard_tags() {
    let stack = synthesize(config(false), &RouteManifest::standard()).unwrap();

    let expected = [
        ("framework", "stackforge:1.2.3"),
        ("install_team", "platform"),
        ("stage", "dev"),
        ("tenant_id", "a1b2c3d4e5f6"),
    ];
    let tag_sets = stack
        .handlers
        .values()
        .map(|h| &h.tags)
        .chain(stack.roles.iter().map(|r| &r.tags))
        .chain(stack.event_bindings.iter().map(|b| &b.rule.tags))
        .chain([&stack.surface.tags, &stack.filter_chain.tags]);
    for tags in tag_sets {
        for (key, value) in expected {
            assert_eq!(tags.get(key).map(String::as_str), Some(value), "tag {key}");
        }
    }
}

#[test]
fn storage_is_granted_only_to_flagged_handlers() {
    let stack = synthesize(config(false), &RouteManifest::standard()).unwrap();

    assert_eq!(stack.storage_grants.len(), 1);
    let grant = &stack.storage_grants[0];
    assert_eq!(grant.grantee, "role_iot_dev_api_data");
    assert_eq!(grant.table, "iot_dev_dynamo_table");
    assert!(grant.actions.iter().any(|a| a == "dynamodb:PutItem"));
}

#[test]
fn telemetry_and_update_rules_are_bound() {
    let stack = synthesize(config(false), &RouteManifest::standard()).unwrap();

    let targets: Vec<_> = stack
        .event_bindings
        .iter()
        .map(|b| (b.rule.name.as_str(), b.target_handler.as_str()))
        .collect();
    assert_eq!(
        targets,
        vec![
            ("iot_lambda_fwd_rule", "api_data"),
            ("iot_lambda_update_rule", "api_update"),
        ]
    );
    assert_eq!(
        stack.event_bindings[0].rule.filter.sql,
        "SELECT * FROM 'simpleiot_v1/app/data/#'"
    );
    assert_eq!(stack.event_bindings[1].grant.handler, "iot_dev_api_update");
}

#[test]
fn outputs_name_every_handler() {
    let stack = synthesize(config(false), &RouteManifest::standard()).unwrap();

    assert_eq!(stack.outputs.len(), 5 + 2 * 28);
    assert_eq!(stack.outputs.get("namePrefix"), Some("iot_dev"));
    assert_eq!(stack.outputs.get("tenantIdSuffix"), Some("a1b2c3d4e5f6"));
    assert_eq!(stack.outputs.get("stageName"), Some("dev"));
    assert_eq!(stack.outputs.get("restApiName"), Some("iot_dev_rest_api"));
    assert_eq!(
        stack.outputs.get("apiEndpoint"),
        Some("https://${rest_api:iot_dev_rest_api}.execute-api.us-west-2.amazonaws.com/dev/")
    );
    assert_eq!(stack.outputs.get("iotDevApiData"), Some("iot_dev_api_data"));
    assert_eq!(
        stack.outputs.get("iotDevApiDataArn"),
        Some("${handler_arn:iot_dev_api_data}")
    );
}

#[test]
fn manifest_without_update_handler_fails_event_binding() {
    let manifest = RouteManifest::new(vec![
        RouteManifestEntry::new(None, "data", "api_data", "lambda_src/api/iot_api_data")
            .with_table_access(),
    ]);
    let err = synthesize(config(false), &manifest).unwrap_err();
    assert!(err.is_configuration());
    assert_eq!(err.resource(), "api_update");
}

#[test]
fn stages_can_be_driven_one_at_a_time() {
    let secured = StackBuilder::new(config(false)).unwrap().secure().unwrap();
    assert_eq!(secured.naming().prefix(), "iot_dev");
    assert!(secured.surface().tree.bindings().next().is_none());

    let routed = secured
        .authorize()
        .unwrap()
        .route(&RouteManifest::standard())
        .unwrap();
    assert_eq!(routed.surface().tree.bindings().count(), 28 * 4);

    let stack = routed.grant_storage().unwrap().bind_events().unwrap();
    assert_eq!(stack.event_bindings.len(), 2);
}

#[test]
fn absent_tenant_id_is_generated() {
    let mut cfg = config(false);
    cfg.tenant_id = None;
    let stack = synthesize(cfg, &RouteManifest::standard()).unwrap();
    assert_eq!(stack.tenant_id.as_str().len(), 12);
    assert!(stack.filter_chain.name.ends_with(stack.tenant_id.as_str()));
}

#[test]
#[traced_test]
fn completion_is_logged() {
    synthesize(config(false), &RouteManifest::standard()).unwrap();
    assert!(logs_contain("synthesis complete"));
}

#[test]
fn descriptor_set_renders_as_json() {
    let stack = synthesize(config(false), &RouteManifest::standard()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&stack.to_json().unwrap()).unwrap();

    assert_eq!(json["name_prefix"], "iot_dev");
    assert_eq!(json["handlers"]["api_data"]["runtime"], "python3.8");
    assert_eq!(json["outputs"]["restApiName"]["value"], "iot_dev_rest_api");
    assert_eq!(json["event_bindings"].as_array().unwrap().len(), 2);
}

const YAML_CONFIG: &str = r"
use_external_identity: false
region: eu-central-1
stage_name: prod
timeout_seconds: 60
log_level: DEBUG
credential_key_ref: iot_prod_db_credentials
tenant_id: ffee00112233
api:
  root_segment: v2
collaborators:
  table: { name: iot_prod_table, arn: 'arn:aws:dynamodb:eu-central-1:1:table/iot_prod_table' }
  identity_provider_ref: 'arn:aws:cognito-idp:eu-central-1:1:userpool/p'
  network: { network_ref: vpc-1, security_groups: [sg-1, sg-2] }
  messaging_endpoint: abc-ats.iot.eu-central-1.amazonaws.com
  timeseries: { database: iot_ts, table: readings }
";

#[test]
fn config_file_drives_synthesis() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(YAML_CONFIG.as_bytes()).unwrap();

    let cfg = StackConfig::load(file.path()).unwrap();
    assert_eq!(cfg.api.root_segment, "v2");
    let manifest = cfg.effective_manifest();
    let stack = synthesize(cfg, &manifest).unwrap();

    assert_eq!(stack.name_prefix, "iot_prod");
    let data = &stack.handlers["api_data"];
    assert_eq!(data.timeout_seconds, 60);
    let keys: Vec<_> = data.environment.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec![
            "DB_PASS_KEY",
            "DYNAMODB_TABLE",
            "IOT_ENDPOINT",
            "IOT_LOGLEVEL",
            "PREFIX",
            "STAGE",
            "TS_DATABASE",
            "TS_TABLENAME",
        ]
    );
    assert_eq!(data.environment["DB_PASS_KEY"], "iot_prod_db_credentials");
    assert_eq!(data.environment["DYNAMODB_TABLE"], "iot_prod_table");
    assert_eq!(
        data.environment["IOT_ENDPOINT"],
        "abc-ats.iot.eu-central-1.amazonaws.com"
    );
    assert_eq!(data.environment["IOT_LOGLEVEL"], "DEBUG");
    assert_eq!(data.environment["TS_DATABASE"], "iot_ts");
    assert_eq!(data.environment["TS_TABLENAME"], "readings");

    let policy = stack.route_policy().unwrap();
    assert!(policy.resolve(HttpVerb::Post, "/v2/feature/alexa").is_some());
    assert!(policy.resolve(HttpVerb::Post, "/v1/feature/alexa").is_none());
}

#[test]
fn config_file_missing_a_required_key_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(YAML_CONFIG.replace("timeout_seconds: 60\n", "").as_bytes())
        .unwrap();

    let err = StackConfig::load(file.path()).unwrap_err();
    assert_eq!(err.resource(), "config");
    assert!(err.to_string().contains("timeout_seconds"));
}

#[test]
fn missing_config_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let err = StackConfig::load(&dir.path().join("absent.yaml")).unwrap_err();
    assert_eq!(err.resource(), "config");
}
