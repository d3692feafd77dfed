//! Typed resource descriptors
//!
//! Each descriptor knows its [`ResourceSchema`] and how to lower itself to a
//! [`ResourceDecl`]. Registering one on a [`Stack`](crate::Stack) returns a
//! handle whose fields are the resource's deferred outputs.

pub mod aws;
pub mod snowflake;

pub use aws::{
    Bucket, BucketHandle, BucketNotification, CallerIdentity, CallerIdentityHandle, IamPolicy,
    IamPolicyHandle, IamRole, IamRoleHandle, QueueNotification, RolePolicyAttachment,
};
pub use snowflake::{
    Column, Database, DatabaseHandle, Pipe, PipeHandle, Schema, SchemaHandle, Stage, StageHandle,
    StorageIntegration, StorageIntegrationHandle, Table, TableHandle,
};

use serde::de::DeserializeOwned;
use snowpipe_graph::{AttributeRef, Output, PropertyValue, ResourceDecl, ResourceSchema};
use std::collections::BTreeSet;

/// A resource type the stack can declare
pub trait Resource {
    /// Deferred outputs exposed after registration
    type Handle;

    fn schema() -> &'static ResourceSchema;

    /// Lower into an untyped declaration
    fn into_decl(self, name: &str) -> ResourceDecl;

    /// Handle for the declaration registered under `name`
    fn handle(&self, name: &str) -> Self::Handle;
}

/// Handle of a resource with no outputs worth naming
#[derive(Debug, Clone)]
pub struct ResourceHandle {
    /// Logical name
    pub resource: String,
}

/// Per-resource options
#[derive(Debug, Clone, Default)]
pub struct ResourceOptions {
    /// Resources that must exist first even though no data flows from them
    pub depends_on: BTreeSet<String>,
}

impl ResourceOptions {
    pub fn depends_on(mut self, resource: impl Into<String>) -> Self {
        self.depends_on.insert(resource.into());
        self
    }
}

/// Deferred output attribute of a declared resource
pub(crate) fn output<T>(resource: &str, attribute: &str) -> Output<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    Output::attribute(AttributeRef::new(resource, attribute))
}

/// Property value from a typed deferred string
pub(crate) fn prop(value: &Output<String>) -> PropertyValue {
    value.to_value().into()
}
