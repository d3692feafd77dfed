//! Snowflake resources
//!
//! Containment is enforced by the constructors: a [`Schema`] is built from a
//! [`DatabaseHandle`], a [`Table`] or [`Stage`] from a [`SchemaHandle`], so
//! the database and schema properties can never be left out by accident.

use super::{Resource, output, prop};
use serde::{Deserialize, Serialize};
use serde_json::json;
use snowpipe_graph::{Output, PropertyKind, PropertySpec, ResourceDecl, ResourceSchema};

pub static STORAGE_INTEGRATION: ResourceSchema = ResourceSchema {
    token: "snowflake:index:StorageIntegration",
    inputs: &[
        PropertySpec::optional("name", PropertyKind::String),
        PropertySpec::required("enabled", PropertyKind::Bool),
        PropertySpec::required("storage_aws_role_arn", PropertyKind::String),
        PropertySpec::required("storage_provider", PropertyKind::String),
        PropertySpec::required("type", PropertyKind::String),
        PropertySpec::required("storage_allowed_locations", PropertyKind::StringList),
    ],
    outputs: &["name", "storage_aws_iam_user_arn", "storage_aws_external_id"],
    data_source: false,
};

pub static DATABASE: ResourceSchema = ResourceSchema {
    token: "snowflake:index:Database",
    inputs: &[
        PropertySpec::optional("name", PropertyKind::String),
        PropertySpec::optional("comment", PropertyKind::String),
    ],
    outputs: &["name"],
    data_source: false,
};

pub static SCHEMA: ResourceSchema = ResourceSchema {
    token: "snowflake:index:Schema",
    inputs: &[
        PropertySpec::required("name", PropertyKind::String),
        PropertySpec::required("database", PropertyKind::String),
        PropertySpec::optional("comment", PropertyKind::String),
    ],
    outputs: &["name", "qualified_name"],
    data_source: false,
};

pub static TABLE: ResourceSchema = ResourceSchema {
    token: "snowflake:index:Table",
    inputs: &[
        PropertySpec::required("name", PropertyKind::String),
        PropertySpec::required("database", PropertyKind::String),
        PropertySpec::required("schema", PropertyKind::String),
        PropertySpec::required("columns", PropertyKind::List),
    ],
    outputs: &["name", "qualified_name"],
    data_source: false,
};

pub static STAGE: ResourceSchema = ResourceSchema {
    token: "snowflake:index:Stage",
    inputs: &[
        PropertySpec::optional("name", PropertyKind::String),
        PropertySpec::required("url", PropertyKind::String),
        PropertySpec::required("database", PropertyKind::String),
        PropertySpec::required("schema", PropertyKind::String),
        PropertySpec::required("storage_integration", PropertyKind::String),
        PropertySpec::optional("comment", PropertyKind::String),
    ],
    outputs: &["name", "qualified_name"],
    data_source: false,
};

pub static PIPE: ResourceSchema = ResourceSchema {
    token: "snowflake:index:Pipe",
    inputs: &[
        PropertySpec::optional("name", PropertyKind::String),
        PropertySpec::required("auto_ingest", PropertyKind::Bool),
        PropertySpec::optional("comment", PropertyKind::String),
        PropertySpec::required("copy_statement", PropertyKind::String),
        PropertySpec::required("database", PropertyKind::String),
        PropertySpec::required("schema", PropertyKind::String),
    ],
    outputs: &["name", "notification_channel"],
    data_source: false,
};

/// External stage integration backed by an IAM role
#[derive(Debug, Clone)]
pub struct StorageIntegration {
    pub name: Option<String>,
    pub enabled: bool,
    pub storage_aws_role_arn: Output<String>,
    pub storage_provider: String,
    pub integration_type: String,
    pub storage_allowed_locations: Vec<String>,
}

impl StorageIntegration {
    /// Enabled S3 integration for external stages
    pub fn s3(role_arn: Output<String>, allowed_locations: Vec<String>) -> Self {
        Self {
            name: None,
            enabled: true,
            storage_aws_role_arn: role_arn,
            storage_provider: "S3".to_string(),
            integration_type: "EXTERNAL_STAGE".to_string(),
            storage_allowed_locations: allowed_locations,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorageIntegrationHandle {
    pub resource: String,
    pub name: Output<String>,
    /// IAM user the warehouse assumes the role as
    pub storage_aws_iam_user_arn: Output<String>,
    pub storage_aws_external_id: Output<String>,
}

impl Resource for StorageIntegration {
    type Handle = StorageIntegrationHandle;

    fn schema() -> &'static ResourceSchema {
        &STORAGE_INTEGRATION
    }

    fn into_decl(self, name: &str) -> ResourceDecl {
        let mut decl = ResourceDecl::new(name, Self::schema())
            .with_property("enabled", json!(self.enabled))
            .with_property("storage_aws_role_arn", prop(&self.storage_aws_role_arn))
            .with_property("storage_provider", json!(self.storage_provider))
            .with_property("type", json!(self.integration_type))
            .with_property(
                "storage_allowed_locations",
                json!(self.storage_allowed_locations),
            );
        if let Some(physical) = self.name {
            decl = decl.with_property("name", json!(physical));
        }
        decl
    }

    fn handle(&self, name: &str) -> StorageIntegrationHandle {
        StorageIntegrationHandle {
            resource: name.to_string(),
            name: output(name, "name"),
            storage_aws_iam_user_arn: output(name, "storage_aws_iam_user_arn"),
            storage_aws_external_id: output(name, "storage_aws_external_id"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Database {
    pub name: Option<String>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DatabaseHandle {
    pub resource: String,
    pub name: Output<String>,
}

impl Resource for Database {
    type Handle = DatabaseHandle;

    fn schema() -> &'static ResourceSchema {
        &DATABASE
    }

    fn into_decl(self, name: &str) -> ResourceDecl {
        let mut decl = ResourceDecl::new(name, Self::schema());
        if let Some(physical) = self.name {
            decl = decl.with_property("name", json!(physical));
        }
        if let Some(comment) = self.comment {
            decl = decl.with_property("comment", json!(comment));
        }
        decl
    }

    fn handle(&self, name: &str) -> DatabaseHandle {
        DatabaseHandle {
            resource: name.to_string(),
            name: output(name, "name"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Schema {
    pub name: String,
    pub database: Output<String>,
    pub comment: Option<String>,
}

impl Schema {
    pub fn new(name: impl Into<String>, database: &DatabaseHandle) -> Self {
        Self {
            name: name.into(),
            database: database.name.clone(),
            comment: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SchemaHandle {
    pub resource: String,
    pub name: Output<String>,
    /// Name of the containing database
    pub database: Output<String>,
    pub qualified_name: Output<String>,
}

impl Resource for Schema {
    type Handle = SchemaHandle;

    fn schema() -> &'static ResourceSchema {
        &SCHEMA
    }

    fn into_decl(self, name: &str) -> ResourceDecl {
        let mut decl = ResourceDecl::new(name, Self::schema())
            .with_property("name", json!(self.name))
            .with_property("database", prop(&self.database));
        if let Some(comment) = self.comment {
            decl = decl.with_property("comment", json!(comment));
        }
        decl
    }

    fn handle(&self, name: &str) -> SchemaHandle {
        SchemaHandle {
            resource: name.to_string(),
            name: output(name, "name"),
            database: self.database.clone(),
            qualified_name: output(name, "qualified_name"),
        }
    }
}

/// Table column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
    pub nullable: bool,
}

impl Column {
    pub fn not_null(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
            nullable: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Table {
    pub name: String,
    pub database: Output<String>,
    pub schema: Output<String>,
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new(name: impl Into<String>, schema: &SchemaHandle, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            database: schema.database.clone(),
            schema: schema.name.clone(),
            columns,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TableHandle {
    pub resource: String,
    pub name: Output<String>,
    pub qualified_name: Output<String>,
}

impl Resource for Table {
    type Handle = TableHandle;

    fn schema() -> &'static ResourceSchema {
        &TABLE
    }

    fn into_decl(self, name: &str) -> ResourceDecl {
        ResourceDecl::new(name, Self::schema())
            .with_property("name", json!(self.name))
            .with_property("database", prop(&self.database))
            .with_property("schema", prop(&self.schema))
            .with_property("columns", json!(self.columns))
    }

    fn handle(&self, name: &str) -> TableHandle {
        TableHandle {
            resource: name.to_string(),
            name: output(name, "name"),
            qualified_name: output(name, "qualified_name"),
        }
    }
}

/// External stage over an S3 location
#[derive(Debug, Clone)]
pub struct Stage {
    pub name: Option<String>,
    pub url: Output<String>,
    pub database: Output<String>,
    pub schema: Output<String>,
    pub storage_integration: Output<String>,
    pub comment: Option<String>,
}

impl Stage {
    pub fn new(
        schema: &SchemaHandle,
        url: Output<String>,
        integration: &StorageIntegrationHandle,
    ) -> Self {
        Self {
            name: None,
            url,
            database: schema.database.clone(),
            schema: schema.name.clone(),
            storage_integration: integration.name.clone(),
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct StageHandle {
    pub resource: String,
    pub name: Output<String>,
    pub qualified_name: Output<String>,
}

impl Resource for Stage {
    type Handle = StageHandle;

    fn schema() -> &'static ResourceSchema {
        &STAGE
    }

    fn into_decl(self, name: &str) -> ResourceDecl {
        let mut decl = ResourceDecl::new(name, Self::schema())
            .with_property("url", prop(&self.url))
            .with_property("database", prop(&self.database))
            .with_property("schema", prop(&self.schema))
            .with_property("storage_integration", prop(&self.storage_integration));
        if let Some(physical) = self.name {
            decl = decl.with_property("name", json!(physical));
        }
        if let Some(comment) = self.comment {
            decl = decl.with_property("comment", json!(comment));
        }
        decl
    }

    fn handle(&self, name: &str) -> StageHandle {
        StageHandle {
            resource: name.to_string(),
            name: output(name, "name"),
            qualified_name: output(name, "qualified_name"),
        }
    }
}

/// Continuous loader running a `COPY INTO` statement
#[derive(Debug, Clone)]
pub struct Pipe {
    pub name: Option<String>,
    pub auto_ingest: bool,
    pub comment: Option<String>,
    pub copy_statement: Output<String>,
    pub database: Output<String>,
    pub schema: Output<String>,
}

impl Pipe {
    pub fn new(schema: &SchemaHandle, copy_statement: Output<String>) -> Self {
        Self {
            name: None,
            auto_ingest: false,
            comment: None,
            copy_statement,
            database: schema.database.clone(),
            schema: schema.name.clone(),
        }
    }

    /// Load on bucket event notifications
    pub fn auto_ingest(mut self) -> Self {
        self.auto_ingest = true;
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct PipeHandle {
    pub resource: String,
    pub name: Output<String>,
    /// Queue ARN bucket notifications are sent to (auto-ingest only)
    pub notification_channel: Output<String>,
}

impl Resource for Pipe {
    type Handle = PipeHandle;

    fn schema() -> &'static ResourceSchema {
        &PIPE
    }

    fn into_decl(self, name: &str) -> ResourceDecl {
        let mut decl = ResourceDecl::new(name, Self::schema())
            .with_property("auto_ingest", json!(self.auto_ingest))
            .with_property("copy_statement", prop(&self.copy_statement))
            .with_property("database", prop(&self.database))
            .with_property("schema", prop(&self.schema));
        if let Some(physical) = self.name {
            decl = decl.with_property("name", json!(physical));
        }
        if let Some(comment) = self.comment {
            decl = decl.with_property("comment", json!(comment));
        }
        decl
    }

    fn handle(&self, name: &str) -> PipeHandle {
        PipeHandle {
            resource: name.to_string(),
            name: output(name, "name"),
            notification_channel: output(name, "notification_channel"),
        }
    }
}
