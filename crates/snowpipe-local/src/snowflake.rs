//! Simulated Snowflake package
//!
//! Objects are tracked by their fully qualified name. A database or schema
//! cannot be dropped while it still contains objects.

use crate::aws::attributes;
use crate::cloud::{LocalCloud, identity_of};
use crate::error::{LocalError, Result};
use crate::naming::{qualified, snowflake_name, suffix};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use snowpipe_config::StackConfig;
use snowpipe_graph::{Attributes, AuthStatus, Provider, ResourceRequest};
use std::collections::HashSet;

const INTEGRATION: &str = "snowflake:index:StorageIntegration";
const DATABASE: &str = "snowflake:index:Database";
const SCHEMA: &str = "snowflake:index:Schema";
const TABLE: &str = "snowflake:index:Table";
const STAGE: &str = "snowflake:index:Stage";
const PIPE: &str = "snowflake:index:Pipe";

/// Types that live inside a database
const DATABASE_OBJECTS: &[&str] = &[SCHEMA];

/// Types that live inside a schema
const SCHEMA_OBJECTS: &[&str] = &[TABLE, STAGE, PIPE];

#[derive(Debug, Deserialize)]
struct ColumnSpec {
    name: String,
    #[serde(rename = "type")]
    column_type: String,
}

/// Snowflake provider backed by a [`LocalCloud`]
pub struct LocalSnowflakeProvider {
    cloud: LocalCloud,
    stack: String,
    account: String,
    aws_account_id: String,
    region: String,
}

impl LocalSnowflakeProvider {
    pub fn new(cloud: LocalCloud, config: &StackConfig) -> Self {
        Self {
            cloud,
            stack: config.stack.clone(),
            account: config.snowflake.account.clone(),
            aws_account_id: config.snowflake.aws_account_id.clone(),
            region: config.aws.region.clone(),
        }
    }

    fn string(request: &ResourceRequest, key: &str) -> Result<String> {
        request
            .get_input::<String>(key)
            .ok_or_else(|| LocalError::invalid(&request.name, format!("missing string '{}'", key)))
    }

    /// Explicit name, or one derived from the logical name
    fn object_name(&self, request: &ResourceRequest) -> String {
        request
            .get_input::<String>("name")
            .unwrap_or_else(|| snowflake_name(&self.stack, &request.name))
    }

    /// Resolve and check the containing database and schema
    fn container(&self, request: &ResourceRequest) -> Result<(String, String)> {
        let database = Self::string(request, "database")?;
        let schema = Self::string(request, "schema")?;
        let schema_id = qualified(&[&database, &schema]);
        if !self.cloud.exists(SCHEMA, &schema_id) {
            return Err(LocalError::NotFound {
                kind: "schema",
                name: schema_id,
            });
        }
        Ok((database, schema))
    }

    fn provision(&self, request: &ResourceRequest) -> Result<Attributes> {
        self.cloud.check_fault(&request.name)?;

        let outputs = match request.resource_type.as_str() {
            INTEGRATION => {
                let name = self.object_name(request);
                let provider = Self::string(request, "storage_provider")?;
                if provider != "S3" {
                    return Err(LocalError::invalid(
                        &request.name,
                        format!("unsupported storage provider '{}'", provider),
                    ));
                }
                let role_arn = Self::string(request, "storage_aws_role_arn")?;
                if !(role_arn.starts_with("arn:aws:iam::") && role_arn.contains(":role/")) {
                    return Err(LocalError::invalid(
                        &request.name,
                        format!("'{}' is not an IAM role ARN", role_arn),
                    ));
                }
                self.cloud.claim("storage integration", INTEGRATION, &name, &request.name)?;
                json!({
                    "name": name,
                    "storage_aws_iam_user_arn": format!(
                        "arn:aws:iam::{}:user/{}-s",
                        self.aws_account_id,
                        suffix(&self.account, &name)
                    ),
                    "storage_aws_external_id": format!(
                        "{}_SFCRole=2_{}",
                        self.account,
                        suffix(&name, "external-id")
                    ),
                })
            }
            DATABASE => {
                let name = self.object_name(request);
                self.cloud.claim("database", DATABASE, &name, &request.name)?;
                json!({ "name": name })
            }
            SCHEMA => {
                let name = Self::string(request, "name")?;
                let database = Self::string(request, "database")?;
                if !self.cloud.exists(DATABASE, &database) {
                    return Err(LocalError::NotFound {
                        kind: "database",
                        name: database,
                    });
                }
                let qualified_name = qualified(&[&database, &name]);
                self.cloud.claim("schema", SCHEMA, &qualified_name, &request.name)?;
                json!({ "name": name, "qualified_name": qualified_name })
            }
            TABLE => {
                let name = Self::string(request, "name")?;
                let (database, schema) = self.container(request)?;
                let columns: Vec<ColumnSpec> = request.get_input("columns").ok_or_else(|| {
                    LocalError::invalid(&request.name, "columns must be a list of {name, type}")
                })?;
                if columns.is_empty() {
                    return Err(LocalError::invalid(&request.name, "a table needs at least one column"));
                }
                let mut seen = HashSet::new();
                for column in &columns {
                    if column.column_type.trim().is_empty() {
                        return Err(LocalError::invalid(
                            &request.name,
                            format!("column {} has no type", column.name),
                        ));
                    }
                    if !seen.insert(column.name.as_str()) {
                        return Err(LocalError::invalid(
                            &request.name,
                            format!("duplicate column {}", column.name),
                        ));
                    }
                }
                let qualified_name = qualified(&[&database, &schema, &name]);
                self.cloud.claim("table", TABLE, &qualified_name, &request.name)?;
                json!({ "name": name, "qualified_name": qualified_name })
            }
            STAGE => {
                let name = self.object_name(request);
                let (database, schema) = self.container(request)?;
                let url = Self::string(request, "url")?;
                if !url.starts_with("s3://") {
                    return Err(LocalError::invalid(
                        &request.name,
                        format!("stage url '{}' is not an s3:// location", url),
                    ));
                }
                let integration = Self::string(request, "storage_integration")?;
                if !self.cloud.exists(INTEGRATION, &integration) {
                    return Err(LocalError::NotFound {
                        kind: "storage integration",
                        name: integration,
                    });
                }
                let qualified_name = qualified(&[&database, &schema, &name]);
                self.cloud.claim("stage", STAGE, &qualified_name, &request.name)?;
                json!({ "name": name, "qualified_name": qualified_name })
            }
            PIPE => {
                let name = self.object_name(request);
                let (database, schema) = self.container(request)?;
                let statement = Self::string(request, "copy_statement")?;
                if !statement.trim_start().starts_with("COPY INTO") || !statement.contains("FROM") {
                    return Err(LocalError::invalid(
                        &request.name,
                        "copy_statement must be a COPY INTO ... FROM statement",
                    ));
                }
                let qualified_name = qualified(&[&database, &schema, &name]);
                self.cloud.claim("pipe", PIPE, &qualified_name, &request.name)?;

                let mut outputs = json!({ "name": name, "qualified_name": qualified_name });
                if request.get_input::<bool>("auto_ingest").unwrap_or(false) {
                    outputs["notification_channel"] = json!(format!(
                        "arn:aws:sqs:{}:{}:sf-snowpipe-{}",
                        self.region,
                        self.aws_account_id,
                        suffix(&self.account, &qualified_name)
                    ));
                }
                outputs
            }
            other => return Err(LocalError::UnsupportedType(other.to_string())),
        };

        Ok(attributes(outputs))
    }

    fn remove(&self, request: &ResourceRequest, current: &Attributes) -> Result<()> {
        let Some(identity) = identity_of(&request.resource_type, current) else {
            return Err(LocalError::invalid(&request.name, "no recorded name"));
        };

        let (kind, children, prefix): (&'static str, &[&str], String) =
            match request.resource_type.as_str() {
                DATABASE => ("database", DATABASE_OBJECTS, format!("{}.", qualified(&[&identity]))),
                SCHEMA => ("schema", SCHEMA_OBJECTS, format!("{}.", identity)),
                _ => ("object", &[], String::new()),
            };
        if children
            .iter()
            .any(|child| self.cloud.has_children(child, &prefix))
        {
            return Err(LocalError::NotEmpty {
                kind,
                name: identity,
            });
        }

        self.cloud.release(&request.resource_type, &identity)
    }
}

#[async_trait]
impl Provider for LocalSnowflakeProvider {
    fn name(&self) -> &str {
        "snowflake"
    }

    fn display_name(&self) -> &str {
        "Snowflake (local)"
    }

    async fn check_auth(&self) -> snowpipe_graph::Result<AuthStatus> {
        Ok(AuthStatus::ok(format!("account {}", self.account)))
    }

    async fn read(&self, request: &ResourceRequest) -> snowpipe_graph::Result<Attributes> {
        Err(LocalError::UnsupportedType(request.resource_type.clone()).into())
    }

    async fn create(&self, request: &ResourceRequest) -> snowpipe_graph::Result<Attributes> {
        tracing::info!(resource = %request.name, "Creating {}", request.resource_type);
        Ok(self.provision(request)?)
    }

    async fn update(
        &self,
        request: &ResourceRequest,
        current: &Attributes,
    ) -> snowpipe_graph::Result<Attributes> {
        tracing::info!(resource = %request.name, "Updating {}", request.resource_type);
        self.cloud.check_fault(&request.name)?;
        // Rename in place: contained objects keep existing
        let identity = identity_of(&request.resource_type, current)
            .ok_or_else(|| LocalError::invalid(&request.name, "no recorded name"))?;
        self.cloud.release(&request.resource_type, &identity)?;
        self.provision(request).map_err(|e| {
            self.cloud.adopt(&request.resource_type, current, &request.name);
            e.into()
        })
    }

    async fn delete(&self, request: &ResourceRequest, current: &Attributes) -> snowpipe_graph::Result<()> {
        tracing::info!(resource = %request.name, "Deleting {}", request.resource_type);
        Ok(self.remove(request, current)?)
    }
}
