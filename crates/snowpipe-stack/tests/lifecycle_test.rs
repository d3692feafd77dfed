//! Full lifecycle of the ingestion stack against the local providers

use serde_json::json;
use snowpipe_config::StackConfig;
use snowpipe_graph::{ActionType, Engine, Resolution, StackState, StateManager};
use snowpipe_local::{LocalCloud, local_providers, registry_for};
use snowpipe_stack::program::{
    BUCKET_NOTIFICATION, EXPORT_BUCKET_NAME, EXPORT_COPY_STATEMENT, INTEGRATION_POLICY,
    INTEGRATION_ROLE, PIPE, POLICY_ATTACHMENT, STAGE, TABLE,
};
use snowpipe_stack::{Stack, declare};

const BUCKET: &str = "pulumi-snowflake-blog-demo";

fn setup() -> (StackConfig, Stack, LocalCloud, Engine) {
    let config = StackConfig::default();
    let stack = declare(&config).unwrap();
    let (cloud, registry) = local_providers(&config);
    (config, stack, cloud, Engine::new(registry))
}

#[tokio::test]
async fn test_first_run_creates_everything() {
    let (_, stack, cloud, engine) = setup();
    let mut state = StackState::new();

    let plan = Engine::preview(stack.graph(), &state).unwrap();
    let summary = plan.summary();
    assert_eq!(summary.create, 11);
    assert_eq!(summary.read, 1);

    let result = engine.up(stack.graph(), &mut state).await.unwrap();
    assert!(result.is_success(), "{:?}", result.failed);
    assert_eq!(state.resources.len(), 12);
    assert_eq!(cloud.len(), 11);
}

#[tokio::test]
async fn test_rerun_is_noop() {
    let (_, stack, cloud, engine) = setup();
    let mut state = StackState::new();
    engine.up(stack.graph(), &mut state).await.unwrap();

    let plan = Engine::preview(stack.graph(), &state).unwrap();
    assert!(!plan.has_changes, "{}", plan.summary());

    let result = engine.up(stack.graph(), &mut state).await.unwrap();
    assert!(result.is_success());
    // Only the caller identity lookup runs again
    assert_eq!(result.succeeded.len(), 1);
    assert_eq!(cloud.len(), 11);
}

#[tokio::test]
async fn test_exports_after_apply() {
    let (_, stack, _, engine) = setup();
    let mut state = StackState::new();
    engine.up(stack.graph(), &mut state).await.unwrap();

    let exports = stack.resolve_exports(&state.output_context());
    let bucket = state.get_resource(BUCKET).unwrap().get_output::<String>("bucket").unwrap();
    assert_eq!(exports[EXPORT_BUCKET_NAME], Resolution::Known(json!(bucket)));

    let Resolution::Known(statement) = &exports[EXPORT_COPY_STATEMENT] else {
        panic!("copy statement did not resolve: {:?}", exports[EXPORT_COPY_STATEMENT]);
    };
    let statement = statement.as_str().unwrap();
    assert!(statement.starts_with("\nCOPY INTO \"PULUMI_SNOWFLAKE_DEMO_"));
    assert!(statement.contains("\"JAFFLE_SHOP\".\"CUSTOMERS\" \n"));
    assert!(statement.ends_with("PATTERN=\"jaffle-shop-customers/.*.csv\"\n"));

    let pipe = state.get_resource(PIPE).unwrap();
    assert_eq!(pipe.inputs["copy_statement"], json!(statement));
}

#[tokio::test]
async fn test_bucket_arn_change_updates_only_policy() {
    let (config, stack, _, engine) = setup();
    let mut state = StackState::new();
    engine.up(stack.graph(), &mut state).await.unwrap();

    if let Some(bucket) = state.resources.get_mut(BUCKET) {
        bucket.set_output("arn", json!("arn:aws:s3:::relocated"));
    }

    let plan = Engine::preview(stack.graph(), &state).unwrap();
    let updates: Vec<&str> = plan
        .actions_by_type(ActionType::Update)
        .iter()
        .map(|a| a.resource_name.as_str())
        .collect();
    assert_eq!(updates, vec![INTEGRATION_POLICY]);
    assert!(plan.actions_by_type(ActionType::Create).is_empty());
    assert!(plan.actions_by_type(ActionType::Delete).is_empty());

    let policy_action = plan.action_for(INTEGRATION_POLICY).unwrap();
    assert!(policy_action.changed.contains("policy"));

    // Apply with a fresh process' view of the cloud
    let cloud = LocalCloud::from_state(&state);
    let engine = Engine::new(registry_for(&cloud, &config));
    let result = engine.up(stack.graph(), &mut state).await.unwrap();
    assert!(result.is_success(), "{:?}", result.failed);

    let policy = state.get_resource(INTEGRATION_POLICY).unwrap();
    assert!(
        policy.inputs["policy"]
            .as_str()
            .unwrap()
            .contains("arn:aws:s3:::relocated/*")
    );
    // Policy ARN is stable, so the attachment is untouched
    let plan = Engine::preview(stack.graph(), &state).unwrap();
    assert!(!plan.has_changes);
    assert_eq!(
        plan.action_for(POLICY_ATTACHMENT).unwrap().action_type,
        ActionType::NoOp
    );
}

#[tokio::test]
async fn test_failure_halts_only_dependents() {
    let (_, stack, cloud, engine) = setup();
    let mut state = StackState::new();

    cloud.fail_on(STAGE);
    let result = engine.up(stack.graph(), &mut state).await.unwrap();
    assert!(!result.is_success());
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.skipped.len(), 2);

    assert!(state.get_resource(STAGE).is_none());
    assert!(state.get_resource(PIPE).is_none());
    assert!(state.get_resource(BUCKET_NOTIFICATION).is_none());
    // Independent branches carried on
    assert!(state.get_resource(TABLE).is_some());
    assert!(state.get_resource(INTEGRATION_ROLE).is_some());
    assert!(state.get_resource(POLICY_ATTACHMENT).is_some());

    cloud.clear_failures();
    let plan = Engine::preview(stack.graph(), &state).unwrap();
    assert_eq!(plan.summary().create, 3);

    let result = engine.up(stack.graph(), &mut state).await.unwrap();
    assert!(result.is_success(), "{:?}", result.failed);
    assert_eq!(state.resources.len(), 12);
}

#[tokio::test]
async fn test_destroy_removes_everything() {
    let (_, stack, cloud, engine) = setup();
    let mut state = StackState::new();
    engine.up(stack.graph(), &mut state).await.unwrap();

    let result = engine.destroy(&mut state).await.unwrap();
    assert!(result.is_success(), "{:?}", result.failed);
    assert_eq!(result.succeeded.len(), 11);
    assert!(state.resources.is_empty());
    assert!(cloud.is_empty());
}

#[tokio::test]
async fn test_state_survives_round_trip() {
    let temp_dir = tempfile::tempdir().unwrap();
    let manager = StateManager::new(temp_dir.path());
    let (_, stack, _, engine) = setup();

    let mut state = manager.load().await.unwrap();
    engine.up(stack.graph(), &mut state).await.unwrap();
    manager.save(&state).await.unwrap();

    let reloaded = manager.load().await.unwrap();
    let plan = Engine::preview(stack.graph(), &reloaded).unwrap();
    assert!(!plan.has_changes);
}
