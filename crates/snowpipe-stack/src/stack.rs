//! Stack: a resource graph plus named exports

use crate::error::Result;
use crate::model::{Resource, ResourceOptions};
use serde::Serialize;
use serde_json::Value;
use snowpipe_graph::{Output, OutputContext, Resolution, ResourceDecl, ResourceGraph};
use std::collections::BTreeMap;

/// Declared resources and the values the stack exports
#[derive(Debug, Clone)]
pub struct Stack {
    name: String,
    graph: ResourceGraph,
    exports: BTreeMap<String, Output<Value>>,
}

impl Stack {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            graph: ResourceGraph::new(),
            exports: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declare a resource under a logical name
    pub fn add<R: Resource>(&mut self, name: &str, resource: R) -> Result<R::Handle> {
        self.add_with(name, resource, ResourceOptions::default())
    }

    /// Declare a resource with explicit options
    pub fn add_with<R: Resource>(
        &mut self,
        name: &str,
        resource: R,
        options: ResourceOptions,
    ) -> Result<R::Handle> {
        let handle = resource.handle(name);
        let mut decl = resource.into_decl(name);
        for dependency in options.depends_on {
            decl = decl.with_dependency(dependency);
        }
        self.register(decl)?;
        Ok(handle)
    }

    /// Declare an untyped resource
    pub fn register(&mut self, decl: ResourceDecl) -> Result<()> {
        self.graph.register(decl)?;
        Ok(())
    }

    /// Export a deferred value under a name
    pub fn export<T>(&mut self, name: impl Into<String>, value: &Output<T>)
    where
        T: Serialize + Clone + Send + Sync + 'static,
    {
        self.exports.insert(name.into(), value.to_value());
    }

    pub fn graph(&self) -> &ResourceGraph {
        &self.graph
    }

    pub fn exports(&self) -> &BTreeMap<String, Output<Value>> {
        &self.exports
    }

    /// Evaluate every export against the given outputs
    pub fn resolve_exports(&self, ctx: &OutputContext) -> BTreeMap<String, Resolution<Value>> {
        self.exports
            .iter()
            .map(|(name, output)| (name.clone(), output.resolve(ctx)))
            .collect()
    }

    /// Check the graph without touching any provider; exports must only
    /// read declared resources
    pub fn validate(&self) -> Result<()> {
        self.graph.validate()?;
        for (export, output) in &self.exports {
            for reference in output.dependencies() {
                if !self.graph.contains(&reference.resource) {
                    return Err(snowpipe_graph::GraphError::UnknownReference {
                        resource: format!("export {}", export),
                        target: reference.resource.clone(),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StackError;
    use crate::model::snowflake::TABLE;
    use crate::model::{Bucket, Column, Database, Schema, Table};
    use serde_json::json;
    use snowpipe_graph::GraphError;

    #[test]
    fn test_duplicate_name_rejected() {
        let mut stack = Stack::new("dev");
        stack.add("landing", Bucket::default()).unwrap();
        let err = stack.add("landing", Bucket::default()).unwrap_err();
        assert!(matches!(err, StackError::Graph(GraphError::DuplicateResource(_))));
    }

    #[test]
    fn test_table_without_schema_fails_validation() {
        let mut stack = Stack::new("dev");
        let db = stack.add("db", Database::default()).unwrap();
        stack
            .register(
                ResourceDecl::new("customers", &TABLE)
                    .with_property("name", json!("CUSTOMERS"))
                    .with_property("database", db.name.to_value())
                    .with_property("columns", json!([])),
            )
            .unwrap();

        let err = stack.validate().unwrap_err();
        match err {
            StackError::Graph(GraphError::MissingProperty { resource, property, .. }) => {
                assert_eq!(resource, "customers");
                assert_eq!(property, "schema");
            }
            other => panic!("expected missing property, got {:?}", other),
        }
    }

    #[test]
    fn test_table_referencing_undeclared_schema_fails_validation() {
        let mut stack = Stack::new("dev");
        let db = stack.add("db", Database::default()).unwrap();
        // Schema handle for a resource that was never added
        let orphan = Schema::new("JAFFLE_SHOP", &db).handle("missing-schema");
        stack
            .add(
                "customers",
                Table::new("CUSTOMERS", &orphan, vec![Column::not_null("ID", "VARCHAR")]),
            )
            .unwrap();

        assert!(matches!(
            stack.validate(),
            Err(StackError::Graph(GraphError::UnknownReference { .. }))
        ));
    }

    #[test]
    fn test_exports_resolve_against_context() {
        let mut stack = Stack::new("dev");
        let bucket = stack.add("landing", Bucket::default()).unwrap();
        stack.export("bucketName", &bucket.bucket);
        assert!(stack.validate().is_ok());

        let mut ctx = OutputContext::new();
        assert!(stack.resolve_exports(&ctx)["bucketName"].is_pending());

        ctx.set_ready(
            "landing",
            BTreeMap::from([("bucket".to_string(), json!("landing-1a2b3c4"))]),
        );
        assert_eq!(
            stack.resolve_exports(&ctx)["bucketName"],
            Resolution::Known(json!("landing-1a2b3c4"))
        );
    }

    #[test]
    fn test_explicit_dependency_recorded() {
        let mut stack = Stack::new("dev");
        stack.add("a", Bucket::default()).unwrap();
        stack
            .add_with("b", Bucket::default(), ResourceOptions::default().depends_on("a"))
            .unwrap();
        assert!(stack.graph().dependencies_of("b").contains("a"));
    }
}
