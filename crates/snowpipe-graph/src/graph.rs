//! Resource graph: registration, validation and ordering

use crate::error::{GraphError, Result};
use crate::resource::{PropertyValue, ResourceDecl};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Declared resources and the dependency edges between them
#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    resources: BTreeMap<String, ResourceDecl>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a declaration. Names must be unique.
    pub fn register(&mut self, decl: ResourceDecl) -> Result<()> {
        if self.resources.contains_key(&decl.name) {
            return Err(GraphError::DuplicateResource(decl.name));
        }
        tracing::debug!(resource = %decl.name, resource_type = decl.resource_type(), "Registered resource");
        self.resources.insert(decl.name.clone(), decl);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ResourceDecl> {
        self.resources.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resources.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceDecl> {
        self.resources.values()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Validate every declaration and the graph shape
    ///
    /// Checks references, schema conformance of literal properties and
    /// acyclicity. Nothing here talks to a provider.
    pub fn validate(&self) -> Result<()> {
        for decl in self.resources.values() {
            self.validate_decl(decl)?;
        }
        self.topological_order()?;
        Ok(())
    }

    fn validate_decl(&self, decl: &ResourceDecl) -> Result<()> {
        let schema = decl.schema;

        for (key, value) in &decl.properties {
            match value {
                PropertyValue::Literal(literal) => decl.check_value(key, literal)?,
                PropertyValue::Deferred(output) => {
                    if schema.input(key).is_none() {
                        return Err(GraphError::UnknownProperty {
                            resource: decl.name.clone(),
                            resource_type: schema.token.to_string(),
                            property: key.clone(),
                        });
                    }
                    for reference in output.dependencies() {
                        let target = self.resources.get(&reference.resource).ok_or_else(|| {
                            GraphError::UnknownReference {
                                resource: decl.name.clone(),
                                target: reference.resource.clone(),
                            }
                        })?;
                        if !target.schema.exports(&reference.attribute) {
                            return Err(GraphError::UnknownAttribute {
                                resource: decl.name.clone(),
                                target: reference.resource.clone(),
                                attribute: reference.attribute.clone(),
                            });
                        }
                    }
                }
            }
        }

        for spec in schema.inputs.iter().filter(|s| s.required) {
            if !decl.properties.contains_key(spec.name) {
                return Err(GraphError::MissingProperty {
                    resource: decl.name.clone(),
                    resource_type: schema.token.to_string(),
                    property: spec.name.to_string(),
                });
            }
        }

        for target in &decl.depends_on {
            if !self.resources.contains_key(target) {
                return Err(GraphError::UnknownReference {
                    resource: decl.name.clone(),
                    target: target.clone(),
                });
            }
        }

        Ok(())
    }

    /// Direct dependencies of a resource that are declared in this graph
    pub fn dependencies_of(&self, name: &str) -> BTreeSet<String> {
        self.resources
            .get(name)
            .map(|decl| {
                decl.dependencies()
                    .into_iter()
                    .filter(|dep| self.resources.contains_key(dep))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every resource that transitively depends on `name`
    pub fn dependents_of(&self, name: &str) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        let mut queue = VecDeque::from([name.to_string()]);
        while let Some(current) = queue.pop_front() {
            for decl in self.resources.values() {
                if decl.dependencies().contains(&current) && found.insert(decl.name.clone()) {
                    queue.push_back(decl.name.clone());
                }
            }
        }
        found
    }

    /// Topological order, ties broken by name
    pub fn topological_order(&self) -> Result<Vec<String>> {
        Ok(self.levels()?.into_iter().flatten().collect())
    }

    /// Group resources into apply levels
    ///
    /// Every resource in level `n` only depends on resources in levels `< n`,
    /// so members of one level may be provisioned concurrently.
    pub fn levels(&self) -> Result<Vec<Vec<String>>> {
        let mut remaining: BTreeMap<&str, BTreeSet<String>> = self
            .resources
            .keys()
            .map(|name| (name.as_str(), self.dependencies_of(name)))
            .collect();

        let mut levels = Vec::new();
        while !remaining.is_empty() {
            let ready: Vec<String> = remaining
                .iter()
                .filter(|(_, deps)| deps.is_empty())
                .map(|(name, _)| name.to_string())
                .collect();

            if ready.is_empty() {
                return Err(GraphError::CircularDependency(self.describe_cycle(&remaining)));
            }

            for name in &ready {
                remaining.remove(name.as_str());
            }
            for deps in remaining.values_mut() {
                for name in &ready {
                    deps.remove(name);
                }
            }
            levels.push(ready);
        }
        Ok(levels)
    }

    /// Walk the unresolved subgraph until a node repeats
    fn describe_cycle(&self, remaining: &BTreeMap<&str, BTreeSet<String>>) -> String {
        let Some(start) = remaining.keys().next() else {
            return String::new();
        };
        let mut path: Vec<String> = vec![start.to_string()];
        let mut current = start.to_string();
        loop {
            let next = remaining
                .get(current.as_str())
                .and_then(|deps| deps.iter().next())
                .cloned();
            let Some(next) = next else {
                return path.join(" -> ");
            };
            if let Some(pos) = path.iter().position(|p| *p == next) {
                let mut cycle = path[pos..].to_vec();
                cycle.push(next);
                return cycle.join(" -> ");
            }
            path.push(next.clone());
            current = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{AttributeRef, Output};
    use crate::resource::{PropertyKind, PropertySpec, ResourceSchema};
    use serde_json::{Value, json};

    static NODE: ResourceSchema = ResourceSchema {
        token: "test:index:Node",
        inputs: &[
            PropertySpec::required("label", PropertyKind::String),
            PropertySpec::optional("upstream", PropertyKind::String),
            PropertySpec::optional("count", PropertyKind::Integer),
        ],
        outputs: &["id"],
        data_source: false,
    };

    fn node(name: &str) -> ResourceDecl {
        ResourceDecl::new(name, &NODE).with_property("label", json!(name))
    }

    fn reads(decl: ResourceDecl, target: &str) -> ResourceDecl {
        decl.with_property(
            "upstream",
            Output::<Value>::attribute(AttributeRef::new(target, "id")),
        )
    }

    #[test]
    fn test_register_duplicate_fails() {
        let mut graph = ResourceGraph::new();
        graph.register(node("a")).unwrap();
        let err = graph.register(node("a")).unwrap_err();
        assert!(matches!(err, GraphError::DuplicateResource(_)));
    }

    #[test]
    fn test_unknown_reference_fails_validation() {
        let mut graph = ResourceGraph::new();
        graph.register(reads(node("a"), "missing")).unwrap();
        let err = graph.validate().unwrap_err();
        assert!(matches!(err, GraphError::UnknownReference { .. }));
        assert!(err.is_validation());
    }

    #[test]
    fn test_unknown_attribute_fails_validation() {
        let mut graph = ResourceGraph::new();
        graph.register(node("a")).unwrap();
        graph
            .register(node("b").with_property(
                "upstream",
                Output::<Value>::attribute(AttributeRef::new("a", "arn")),
            ))
            .unwrap();
        let err = graph.validate().unwrap_err();
        assert!(matches!(err, GraphError::UnknownAttribute { .. }));
    }

    #[test]
    fn test_missing_required_property() {
        let mut graph = ResourceGraph::new();
        graph.register(ResourceDecl::new("a", &NODE)).unwrap();
        let err = graph.validate().unwrap_err();
        assert!(matches!(err, GraphError::MissingProperty { .. }));
    }

    #[test]
    fn test_literal_type_mismatch() {
        let mut graph = ResourceGraph::new();
        graph
            .register(node("a").with_property("count", json!("three")))
            .unwrap();
        match graph.validate().unwrap_err() {
            GraphError::TypeMismatch {
                property, expected, ..
            } => {
                assert_eq!(property, "count");
                assert_eq!(expected, "integer");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_property() {
        let mut graph = ResourceGraph::new();
        graph
            .register(node("a").with_property("colour", json!("red")))
            .unwrap();
        assert!(matches!(
            graph.validate().unwrap_err(),
            GraphError::UnknownProperty { .. }
        ));
    }

    #[test]
    fn test_cycle_rejected() {
        let mut graph = ResourceGraph::new();
        graph.register(reads(node("a"), "c")).unwrap();
        graph.register(reads(node("b"), "a")).unwrap();
        graph.register(reads(node("c"), "b")).unwrap();
        match graph.validate().unwrap_err() {
            GraphError::CircularDependency(path) => {
                assert!(path.contains("a"));
                assert!(path.contains("b"));
                assert!(path.contains("c"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_explicit_self_dependency_is_cycle() {
        let mut graph = ResourceGraph::new();
        graph.register(node("a").with_dependency("a")).unwrap();
        assert!(matches!(
            graph.validate().unwrap_err(),
            GraphError::CircularDependency(_)
        ));
    }

    #[test]
    fn test_levels_and_order() {
        let mut graph = ResourceGraph::new();
        graph.register(node("db")).unwrap();
        graph.register(reads(node("schema"), "db")).unwrap();
        graph.register(reads(node("table"), "schema")).unwrap();
        graph.register(node("bucket")).unwrap();
        graph.validate().unwrap();

        let levels = graph.levels().unwrap();
        assert_eq!(levels[0], vec!["bucket".to_string(), "db".to_string()]);
        assert_eq!(levels[1], vec!["schema".to_string()]);
        assert_eq!(levels[2], vec!["table".to_string()]);

        let order = graph.topological_order().unwrap();
        assert_eq!(order, vec!["bucket", "db", "schema", "table"]);
    }

    #[test]
    fn test_dependents_are_transitive() {
        let mut graph = ResourceGraph::new();
        graph.register(node("db")).unwrap();
        graph.register(reads(node("schema"), "db")).unwrap();
        graph.register(reads(node("table"), "schema")).unwrap();
        graph.register(node("bucket")).unwrap();

        let dependents = graph.dependents_of("db");
        assert_eq!(
            dependents,
            BTreeSet::from(["schema".to_string(), "table".to_string()])
        );
        assert!(graph.dependents_of("bucket").is_empty());
    }
}
