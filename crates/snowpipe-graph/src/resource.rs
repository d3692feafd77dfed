//! Resource declarations and their schemas

use crate::error::{GraphError, Result};
use crate::output::{Output, OutputContext, Resolution};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Kind of value a property accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    String,
    Bool,
    Integer,
    StringList,
    List,
    Object,
}

impl PropertyKind {
    /// Check a JSON value against this kind
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            PropertyKind::String => value.is_string(),
            PropertyKind::Bool => value.is_boolean(),
            PropertyKind::Integer => value.is_i64() || value.is_u64(),
            PropertyKind::StringList => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
            PropertyKind::List => value.is_array(),
            PropertyKind::Object => value.is_object(),
        }
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKind::String => write!(f, "string"),
            PropertyKind::Bool => write!(f, "bool"),
            PropertyKind::Integer => write!(f, "integer"),
            PropertyKind::StringList => write!(f, "list of strings"),
            PropertyKind::List => write!(f, "list"),
            PropertyKind::Object => write!(f, "object"),
        }
    }
}

/// Name of the JSON type of a value, for error messages
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

/// Input property accepted by a resource type
#[derive(Debug, Clone, Copy)]
pub struct PropertySpec {
    pub name: &'static str,
    pub kind: PropertyKind,
    pub required: bool,
}

impl PropertySpec {
    pub const fn required(name: &'static str, kind: PropertyKind) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, kind: PropertyKind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }
}

/// Static description of a resource type
#[derive(Debug)]
pub struct ResourceSchema {
    /// Type token, `<package>:<module>:<Type>` (e.g. "aws:s3:Bucket")
    pub token: &'static str,

    /// Input properties
    pub inputs: &'static [PropertySpec],

    /// Output attributes available after provisioning
    pub outputs: &'static [&'static str],

    /// Read-only lookup; never created, updated or deleted
    pub data_source: bool,
}

impl ResourceSchema {
    /// Provider package that owns this type (the token prefix)
    pub fn package(&self) -> &'static str {
        self.token.split(':').next().unwrap_or(self.token)
    }

    pub fn input(&self, name: &str) -> Option<&PropertySpec> {
        self.inputs.iter().find(|spec| spec.name == name)
    }

    pub fn exports(&self, attribute: &str) -> bool {
        self.outputs.contains(&attribute)
    }
}

/// Value of a single input property
#[derive(Debug, Clone)]
pub enum PropertyValue {
    /// Known at declaration time
    Literal(Value),
    /// Derived from other resources' outputs
    Deferred(Output<Value>),
}

impl PropertyValue {
    pub fn resolve(&self, ctx: &OutputContext) -> Resolution<Value> {
        match self {
            PropertyValue::Literal(value) => Resolution::Known(value.clone()),
            PropertyValue::Deferred(output) => output.resolve(ctx),
        }
    }
}

impl From<Value> for PropertyValue {
    fn from(value: Value) -> Self {
        PropertyValue::Literal(value)
    }
}

impl From<Output<Value>> for PropertyValue {
    fn from(output: Output<Value>) -> Self {
        // Outputs without dependencies are just literals in disguise
        if output.dependencies().is_empty() {
            if let Resolution::Known(value) = output.resolve(&OutputContext::new()) {
                return PropertyValue::Literal(value);
            }
        }
        PropertyValue::Deferred(output)
    }
}

/// A resource the stack wants to exist
#[derive(Debug, Clone)]
pub struct ResourceDecl {
    /// Logical name, unique within the stack
    pub name: String,

    /// Type schema
    pub schema: &'static ResourceSchema,

    /// Input properties
    pub properties: BTreeMap<String, PropertyValue>,

    /// Dependencies that are not visible through property data
    pub depends_on: BTreeSet<String>,
}

impl ResourceDecl {
    pub fn new(name: impl Into<String>, schema: &'static ResourceSchema) -> Self {
        Self {
            name: name.into(),
            schema,
            properties: BTreeMap::new(),
            depends_on: BTreeSet::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_dependency(mut self, resource: impl Into<String>) -> Self {
        self.depends_on.insert(resource.into());
        self
    }

    pub fn resource_type(&self) -> &'static str {
        self.schema.token
    }

    /// Every resource this declaration depends on, through data or explicitly
    pub fn dependencies(&self) -> BTreeSet<String> {
        let mut deps = self.depends_on.clone();
        for value in self.properties.values() {
            if let PropertyValue::Deferred(output) = value {
                deps.extend(output.resources().into_iter().map(str::to_string));
            }
        }
        deps
    }

    /// Check one property value against the schema
    pub fn check_value(&self, key: &str, value: &Value) -> Result<()> {
        let spec = self.schema.input(key).ok_or_else(|| GraphError::UnknownProperty {
            resource: self.name.clone(),
            resource_type: self.schema.token.to_string(),
            property: key.to_string(),
        })?;
        if !spec.kind.matches(value) {
            return Err(GraphError::TypeMismatch {
                resource: self.name.clone(),
                property: key.to_string(),
                expected: spec.kind.to_string(),
                found: json_type_name(value).to_string(),
            });
        }
        Ok(())
    }

    /// Check resolved inputs, including those produced by derivations
    pub fn check_resolved(&self, inputs: &BTreeMap<String, Value>) -> Result<()> {
        inputs
            .iter()
            .try_for_each(|(key, value)| self.check_value(key, value))
    }

    /// Resolve as much as possible; unresolved properties are listed separately
    pub fn resolve_partial(&self, ctx: &OutputContext) -> PartialInputs {
        let mut partial = PartialInputs::default();
        for (key, value) in &self.properties {
            match value.resolve(ctx) {
                Resolution::Known(v) => {
                    partial.known.insert(key.clone(), v);
                }
                Resolution::Pending => {
                    partial.unknown.insert(key.clone());
                }
                Resolution::Failed(reason) => {
                    partial.failed.insert(key.clone(), reason);
                }
            }
        }
        partial
    }
}

/// Inputs of a declaration resolved against an incomplete context
#[derive(Debug, Clone, Default)]
pub struct PartialInputs {
    pub known: BTreeMap<String, Value>,
    pub unknown: BTreeSet<String>,
    pub failed: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::AttributeRef;
    use serde_json::json;

    static BUCKET: ResourceSchema = ResourceSchema {
        token: "aws:s3:Bucket",
        inputs: &[PropertySpec::optional("bucket", PropertyKind::String)],
        outputs: &["arn", "bucket"],
        data_source: false,
    };

    #[test]
    fn test_property_kind_matches() {
        assert!(PropertyKind::String.matches(&json!("x")));
        assert!(!PropertyKind::String.matches(&json!(1)));
        assert!(PropertyKind::StringList.matches(&json!(["a", "b"])));
        assert!(!PropertyKind::StringList.matches(&json!(["a", 1])));
        assert!(PropertyKind::Integer.matches(&json!(3)));
        assert!(!PropertyKind::Integer.matches(&json!(3.5)));
    }

    #[test]
    fn test_schema_package() {
        assert_eq!(BUCKET.package(), "aws");
        assert!(BUCKET.exports("arn"));
        assert!(!BUCKET.exports("name"));
    }

    #[test]
    fn test_known_output_becomes_literal() {
        let value: PropertyValue = Output::known(json!("demo")).into();
        assert!(matches!(value, PropertyValue::Literal(_)));

        let deferred: PropertyValue =
            Output::<Value>::attribute(AttributeRef::new("bucket", "arn")).into();
        assert!(matches!(deferred, PropertyValue::Deferred(_)));
    }

    #[test]
    fn test_dependencies_include_explicit_and_data_edges() {
        let decl = ResourceDecl::new("policy", &BUCKET)
            .with_property(
                "bucket",
                Output::<Value>::attribute(AttributeRef::new("source", "bucket")),
            )
            .with_dependency("role");
        let deps = decl.dependencies();
        assert!(deps.contains("source"));
        assert!(deps.contains("role"));
        assert_eq!(deps.len(), 2);
    }

    #[test]
    fn test_resolve_partial_splits_known_and_unknown() {
        let decl = ResourceDecl::new("b", &BUCKET)
            .with_property("bucket", json!("demo"))
            .with_property(
                "tags",
                Output::<Value>::attribute(AttributeRef::new("other", "arn")),
            );
        let partial = decl.resolve_partial(&OutputContext::new());
        assert_eq!(partial.known.get("bucket"), Some(&json!("demo")));
        assert!(partial.unknown.contains("tags"));
        assert!(partial.failed.is_empty());
    }

    #[test]
    fn test_derived_value_of_wrong_kind_rejected() {
        let decl = ResourceDecl::new("b", &BUCKET).with_property(
            "bucket",
            Output::<Value>::attribute(AttributeRef::new("other", "arn")).apply(|_| json!(42)),
        );
        let mut ctx = OutputContext::new();
        ctx.set_ready("other", BTreeMap::from([("arn".to_string(), json!("arn:x"))]));

        let partial = decl.resolve_partial(&ctx);
        assert_eq!(partial.known.get("bucket"), Some(&json!(42)));
        let err = decl.check_resolved(&partial.known).unwrap_err();
        assert!(matches!(
            err,
            GraphError::TypeMismatch { ref property, ref found, .. } if property == "bucket" && found == "number"
        ));
        assert!(decl.check_value("bucket", &json!("ok")).is_ok());
    }
}
