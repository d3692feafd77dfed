//! The S3 → Snowpipe ingestion stack
//!
//! Files land in a bucket, a storage integration lets the warehouse read it
//! through an IAM role, and an auto-ingest pipe copies every new CSV under
//! `jaffle-shop-customers/` into the customers table.

use crate::error::Result;
use crate::model::{
    Bucket, BucketNotification, CallerIdentity, Column, Database, IamPolicy, IamRole, Pipe,
    QueueNotification, ResourceOptions, RolePolicyAttachment, Schema, Stage, StorageIntegration,
    Table,
};
use crate::policy::{bucket_access_policy, role_arn, trust_policy};
use crate::stack::Stack;
use crate::template::copy_statement_output;
use snowpipe_config::StackConfig;
use snowpipe_graph::Output;

pub const CALLER_IDENTITY: &str = "caller-identity";
pub const STORAGE_INTEGRATION: &str = "snowflake-storage-integration";
pub const INTEGRATION_ROLE: &str = "snowflake-integration-role";
pub const INTEGRATION_POLICY: &str = "snowflake-storage-integation-policy";
pub const POLICY_ATTACHMENT: &str = "snowflake-policy-attachment";
pub const SCHEMA: &str = "jaffle-shop";
pub const TABLE: &str = "jaffle-shop-customers";
pub const STAGE: &str = "snowpipe-stage";
pub const PIPE: &str = "pipe";
pub const BUCKET_NOTIFICATION: &str = "bucket-notification";

pub const EXPORT_COPY_STATEMENT: &str = "copy_statement";
pub const EXPORT_BUCKET_NAME: &str = "bucketName";

const ROLE_DESCRIPTION: &str = "Allows Snowflake to access the bucket containing files for import";
const STAGE_COMMENT: &str = "Loads data from an S3 bucket containing Jaffle Shop data";
const PIPE_COMMENT: &str = "My pipe's comment";
const OBJECT_CREATED: &str = "s3:ObjectCreated:*";

/// Columns of the customers table: three load metadata columns, then the
/// fields of the exported file
pub fn customer_columns() -> Vec<Column> {
    vec![
        Column::not_null("FILENAME", "VARCHAR"),
        Column::not_null("LAST_MODIFIED_AT", "TIMESTAMP_NTZ(9)"),
        Column::not_null("LOADED_AT", "TIMESTAMP_NTZ(9)"),
        Column::not_null("ID", "VARCHAR"),
        Column::not_null("NAME", "VARCHAR"),
    ]
}

/// Declare the whole stack
///
/// Only registers declarations; nothing is provisioned and no provider is
/// contacted. The returned stack has been validated.
pub fn declare(config: &StackConfig) -> Result<Stack> {
    let names = &config.names;
    let mut stack = Stack::new(config.stack.clone());

    let bucket = stack.add(&names.bucket, Bucket::default())?;
    let caller = stack.add(CALLER_IDENTITY, CallerIdentity)?;

    let role_name = names.role.clone();
    let storage_role_arn = caller
        .account_id
        .apply(move |account_id| role_arn(&account_id, &role_name));
    let integration = stack.add(
        STORAGE_INTEGRATION,
        StorageIntegration::s3(storage_role_arn, vec!["*".to_string()]),
    )?;

    let assume_role_policy = integration
        .storage_aws_iam_user_arn
        .zip(&integration.storage_aws_external_id)
        .try_apply(|(principal, external_id)| trust_policy(&principal, &external_id));
    let role = stack.add(
        INTEGRATION_ROLE,
        IamRole {
            name: names.role.clone(),
            description: Some(ROLE_DESCRIPTION.to_string()),
            assume_role_policy,
        },
    )?;

    let policy = stack.add(
        INTEGRATION_POLICY,
        IamPolicy {
            policy: bucket.arn.try_apply(|arn| bucket_access_policy(&arn)),
            description: None,
        },
    )?;

    // The role is attached by its literal name, so the edge is explicit
    stack.add_with(
        POLICY_ATTACHMENT,
        RolePolicyAttachment {
            role: Output::known(names.role.clone()),
            policy_arn: policy.arn.clone(),
        },
        ResourceOptions::default().depends_on(role.resource.clone()),
    )?;

    let database = stack.add(&names.database, Database::default())?;
    let schema = stack.add(SCHEMA, Schema::new(names.schema.clone(), &database))?;
    let table = stack.add(
        TABLE,
        Table::new(names.table.clone(), &schema, customer_columns()),
    )?;

    let stage = stack.add(
        STAGE,
        Stage::new(
            &schema,
            bucket.bucket.apply(|name| format!("s3://{}", name)),
            &integration,
        )
        .with_comment(STAGE_COMMENT),
    )?;

    let copy_statement =
        copy_statement_output(&database.name, &schema.name, &table.name, &stage.name);
    stack.export(EXPORT_COPY_STATEMENT, &copy_statement);

    let pipe = stack.add(
        PIPE,
        Pipe::new(&schema, copy_statement)
            .auto_ingest()
            .with_comment(PIPE_COMMENT),
    )?;

    stack.add(
        BUCKET_NOTIFICATION,
        BucketNotification {
            bucket: bucket.bucket.clone(),
            queues: vec![QueueNotification {
                queue_arn: pipe.notification_channel.clone(),
                events: vec![OBJECT_CREATED.to_string()],
            }],
        },
    )?;

    stack.export(EXPORT_BUCKET_NAME, &bucket.bucket);

    stack.validate()?;
    tracing::debug!(
        stack = %stack.name(),
        resources = stack.graph().len(),
        "Declared ingestion stack"
    );
    Ok(stack)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use snowpipe_graph::{OutputContext, PropertyValue, Resolution};
    use std::collections::{BTreeMap, BTreeSet};

    fn deps(stack: &Stack, name: &str) -> BTreeSet<String> {
        stack.graph().dependencies_of(name)
    }

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_declares_twelve_resources() {
        let stack = declare(&StackConfig::default()).unwrap();
        assert_eq!(stack.graph().len(), 12);
        assert!(stack.graph().contains("pulumi-snowflake-blog-demo"));
        assert!(stack.graph().contains("pulumi-snowflake-demo"));
        assert_eq!(
            stack.exports().keys().cloned().collect::<Vec<_>>(),
            vec!["bucketName".to_string(), "copy_statement".to_string()]
        );
    }

    #[test]
    fn test_dependency_edges() {
        let stack = declare(&StackConfig::default()).unwrap();
        let bucket = "pulumi-snowflake-blog-demo";
        let database = "pulumi-snowflake-demo";

        assert!(deps(&stack, bucket).is_empty());
        assert_eq!(deps(&stack, STORAGE_INTEGRATION), set(&[CALLER_IDENTITY]));
        assert_eq!(deps(&stack, INTEGRATION_ROLE), set(&[STORAGE_INTEGRATION]));
        assert_eq!(deps(&stack, INTEGRATION_POLICY), set(&[bucket]));
        assert_eq!(
            deps(&stack, POLICY_ATTACHMENT),
            set(&[INTEGRATION_ROLE, INTEGRATION_POLICY])
        );
        assert_eq!(deps(&stack, SCHEMA), set(&[database]));
        assert_eq!(deps(&stack, TABLE), set(&[database, SCHEMA]));
        assert_eq!(
            deps(&stack, STAGE),
            set(&[bucket, database, SCHEMA, STORAGE_INTEGRATION])
        );
        assert_eq!(deps(&stack, PIPE), set(&[database, SCHEMA, TABLE, STAGE]));
        assert_eq!(deps(&stack, BUCKET_NOTIFICATION), set(&[bucket, PIPE]));
    }

    #[test]
    fn test_bucket_dependents_exclude_trust_chain() {
        let stack = declare(&StackConfig::default()).unwrap();
        let dependents = stack.graph().dependents_of("pulumi-snowflake-blog-demo");
        assert!(dependents.contains(INTEGRATION_POLICY));
        assert!(!dependents.contains(INTEGRATION_ROLE));
        assert!(!dependents.contains(STORAGE_INTEGRATION));
    }

    #[test]
    fn test_integration_role_arn_uses_account() {
        let stack = declare(&StackConfig::default()).unwrap();
        let decl = stack.graph().get(STORAGE_INTEGRATION).unwrap();

        let mut ctx = OutputContext::new();
        ctx.set_ready(
            CALLER_IDENTITY,
            BTreeMap::from([("account_id".to_string(), json!("123456789012"))]),
        );
        assert_eq!(
            decl.properties["storage_aws_role_arn"].resolve(&ctx),
            Resolution::Known(json!(
                "arn:aws:iam::123456789012:role/snowflake-storage-integration"
            ))
        );
        assert!(matches!(
            decl.properties["storage_allowed_locations"],
            PropertyValue::Literal(_)
        ));
    }

    #[test]
    fn test_copy_statement_export() {
        let stack = declare(&StackConfig::default()).unwrap();
        let mut ctx = OutputContext::new();
        for (resource, name) in [
            ("pulumi-snowflake-demo", "PULUMI_SNOWFLAKE_DEMO_ABC1234"),
            (SCHEMA, "JAFFLE_SHOP"),
            (TABLE, "CUSTOMERS"),
            (STAGE, "SNOWPIPE_STAGE_DEF5678"),
        ] {
            ctx.set_ready(resource, BTreeMap::from([("name".to_string(), json!(name))]));
        }

        let exports = stack.resolve_exports(&ctx);
        let Resolution::Known(statement) = &exports[EXPORT_COPY_STATEMENT] else {
            panic!("copy statement should resolve");
        };
        assert!(statement.as_str().unwrap().starts_with(
            "\nCOPY INTO \"PULUMI_SNOWFLAKE_DEMO_ABC1234\".\"JAFFLE_SHOP\".\"CUSTOMERS\" \n"
        ));
        assert!(exports[EXPORT_BUCKET_NAME].is_pending());
    }

    #[test]
    fn test_table_columns_in_order() {
        let names: Vec<String> = customer_columns().into_iter().map(|c| c.name).collect();
        assert_eq!(
            names,
            vec!["FILENAME", "LAST_MODIFIED_AT", "LOADED_AT", "ID", "NAME"]
        );
        assert!(customer_columns().iter().all(|c| !c.nullable));
    }

    #[test]
    fn test_custom_names_from_config() {
        let mut config = StackConfig::default();
        config.names.table = "ORDERS".to_string();
        config.names.bucket = "landing".to_string();
        let stack = declare(&config).unwrap();

        assert!(stack.graph().contains("landing"));
        let table = stack.graph().get(TABLE).unwrap();
        assert!(matches!(
            &table.properties["name"],
            PropertyValue::Literal(v) if v == "ORDERS"
        ));
    }
}
