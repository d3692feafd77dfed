//! Deferred resource outputs
//!
//! An [`Output`] is a value that only becomes known once the resources it
//! reads from have been provisioned. It carries the set of attributes it
//! depends on (these become edges in the resource graph) and a pure
//! evaluation function that is re-run against every new [`OutputContext`],
//! so a change upstream is always reflected downstream.
//!
//! Resolution follows three rules:
//!
//! - a derivation runs only once every input is [`Resolution::Known`];
//! - any failed input makes the derivation [`Resolution::Failed`];
//! - otherwise it stays [`Resolution::Pending`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

/// Reference to one output attribute of a declared resource
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AttributeRef {
    /// Logical name of the resource
    pub resource: String,

    /// Output attribute name (e.g. "arn")
    pub attribute: String,
}

impl AttributeRef {
    pub fn new(resource: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            attribute: attribute.into(),
        }
    }
}

impl fmt::Display for AttributeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.resource, self.attribute)
    }
}

/// Current state of a deferred value
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<T> {
    /// Upstream resources have not been provisioned yet
    Pending,
    /// All inputs are available
    Known(T),
    /// An input failed or could not be interpreted
    Failed(String),
}

impl<T> Resolution<T> {
    pub fn is_known(&self) -> bool {
        matches!(self, Resolution::Known(_))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Resolution::Pending)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Resolution::Failed(_))
    }

    pub fn known(self) -> Option<T> {
        match self {
            Resolution::Known(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resolution<U> {
        match self {
            Resolution::Known(value) => Resolution::Known(f(value)),
            Resolution::Pending => Resolution::Pending,
            Resolution::Failed(reason) => Resolution::Failed(reason),
        }
    }
}

/// Combine two resolutions. Failure wins over pending.
fn combine<A, B>(a: Resolution<A>, b: Resolution<B>) -> Resolution<(A, B)> {
    match (a, b) {
        (Resolution::Failed(reason), _) | (_, Resolution::Failed(reason)) => {
            Resolution::Failed(reason)
        }
        (Resolution::Known(a), Resolution::Known(b)) => Resolution::Known((a, b)),
        _ => Resolution::Pending,
    }
}

/// Provisioning outcome of a single resource, as seen by deferred values
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceOutcome {
    /// Not provisioned yet (or unknown until apply)
    Pending,
    /// Provisioned; output attributes are available
    Ready(BTreeMap<String, Value>),
    /// Provisioning failed
    Failed(String),
}

/// Snapshot of resource outputs that deferred values are evaluated against
#[derive(Debug, Clone, Default)]
pub struct OutputContext {
    resources: HashMap<String, ResourceOutcome>,
}

impl OutputContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_ready(&mut self, resource: impl Into<String>, attributes: BTreeMap<String, Value>) {
        self.resources
            .insert(resource.into(), ResourceOutcome::Ready(attributes));
    }

    pub fn set_failed(&mut self, resource: impl Into<String>, reason: impl Into<String>) {
        self.resources
            .insert(resource.into(), ResourceOutcome::Failed(reason.into()));
    }

    pub fn set_pending(&mut self, resource: impl Into<String>) {
        self.resources
            .insert(resource.into(), ResourceOutcome::Pending);
    }

    pub fn outcome(&self, resource: &str) -> Option<&ResourceOutcome> {
        self.resources.get(resource)
    }

    /// Look up a single attribute
    pub fn lookup(&self, reference: &AttributeRef) -> Resolution<Value> {
        match self.resources.get(&reference.resource) {
            Some(ResourceOutcome::Ready(attributes)) => match attributes.get(&reference.attribute) {
                Some(value) => Resolution::Known(value.clone()),
                None => Resolution::Failed(format!(
                    "{} did not report attribute '{}'",
                    reference.resource, reference.attribute
                )),
            },
            Some(ResourceOutcome::Failed(reason)) => {
                Resolution::Failed(format!("{} failed: {}", reference.resource, reason))
            }
            Some(ResourceOutcome::Pending) | None => Resolution::Pending,
        }
    }
}

type EvalFn<T> = dyn Fn(&OutputContext) -> Resolution<T> + Send + Sync;

/// A deferred value derived from zero or more resource output attributes
pub struct Output<T> {
    dependencies: Arc<BTreeSet<AttributeRef>>,
    eval: Arc<EvalFn<T>>,
}

impl<T> Clone for Output<T> {
    fn clone(&self) -> Self {
        Self {
            dependencies: Arc::clone(&self.dependencies),
            eval: Arc::clone(&self.eval),
        }
    }
}

impl<T> fmt::Debug for Output<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Output")
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

impl<T> Output<T> {
    /// Attributes this value reads
    pub fn dependencies(&self) -> &BTreeSet<AttributeRef> {
        &self.dependencies
    }

    /// Logical names of the resources this value reads from
    pub fn resources(&self) -> BTreeSet<&str> {
        self.dependencies
            .iter()
            .map(|r| r.resource.as_str())
            .collect()
    }

    /// Evaluate against a snapshot of resource outputs
    pub fn resolve(&self, ctx: &OutputContext) -> Resolution<T> {
        (self.eval)(ctx)
    }
}

impl<T: Clone + Send + Sync + 'static> Output<T> {
    /// A value known at declaration time
    pub fn known(value: T) -> Self {
        Self {
            dependencies: Arc::new(BTreeSet::new()),
            eval: Arc::new(move |_| Resolution::Known(value.clone())),
        }
    }

    /// Lift a function over this value
    pub fn apply<U, F>(&self, f: F) -> Output<U>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let eval = Arc::clone(&self.eval);
        Output {
            dependencies: Arc::clone(&self.dependencies),
            eval: Arc::new(move |ctx| eval(ctx).map(&f)),
        }
    }

    /// Lift a fallible function over this value; an `Err` fails the output
    pub fn try_apply<U, E, F>(&self, f: F) -> Output<U>
    where
        U: Clone + Send + Sync + 'static,
        E: fmt::Display,
        F: Fn(T) -> std::result::Result<U, E> + Send + Sync + 'static,
    {
        let eval = Arc::clone(&self.eval);
        Output {
            dependencies: Arc::clone(&self.dependencies),
            eval: Arc::new(move |ctx| match eval(ctx) {
                Resolution::Known(value) => match f(value) {
                    Ok(derived) => Resolution::Known(derived),
                    Err(e) => Resolution::Failed(e.to_string()),
                },
                Resolution::Pending => Resolution::Pending,
                Resolution::Failed(reason) => Resolution::Failed(reason),
            }),
        }
    }

    /// Pair this value with another deferred value
    pub fn zip<U>(&self, other: &Output<U>) -> Output<(T, U)>
    where
        U: Clone + Send + Sync + 'static,
    {
        let mut dependencies = (*self.dependencies).clone();
        dependencies.extend(other.dependencies.iter().cloned());

        let left = Arc::clone(&self.eval);
        let right = Arc::clone(&other.eval);
        Output {
            dependencies: Arc::new(dependencies),
            eval: Arc::new(move |ctx| combine(left(ctx), right(ctx))),
        }
    }

    /// Collect many deferred values into one
    pub fn all(outputs: impl IntoIterator<Item = Output<T>>) -> Output<Vec<T>> {
        let outputs: Vec<Output<T>> = outputs.into_iter().collect();
        let dependencies: BTreeSet<AttributeRef> = outputs
            .iter()
            .flat_map(|o| o.dependencies.iter().cloned())
            .collect();

        Output {
            dependencies: Arc::new(dependencies),
            eval: Arc::new(move |ctx| {
                let mut values = Vec::with_capacity(outputs.len());
                let mut pending = false;
                for output in &outputs {
                    match output.resolve(ctx) {
                        Resolution::Known(value) => values.push(value),
                        Resolution::Pending => pending = true,
                        Resolution::Failed(reason) => return Resolution::Failed(reason),
                    }
                }
                if pending {
                    Resolution::Pending
                } else {
                    Resolution::Known(values)
                }
            }),
        }
    }
}

impl<T: DeserializeOwned + Clone + Send + Sync + 'static> Output<T> {
    /// Read an output attribute of another resource
    pub fn attribute(reference: AttributeRef) -> Self {
        let dependencies = BTreeSet::from([reference.clone()]);
        Self {
            dependencies: Arc::new(dependencies),
            eval: Arc::new(move |ctx| match ctx.lookup(&reference) {
                Resolution::Known(value) => match serde_json::from_value::<T>(value.clone()) {
                    Ok(typed) => Resolution::Known(typed),
                    Err(_) => Resolution::Failed(format!(
                        "attribute {} has unexpected type: {}",
                        reference, value
                    )),
                },
                Resolution::Pending => Resolution::Pending,
                Resolution::Failed(reason) => Resolution::Failed(reason),
            }),
        }
    }
}

impl<T: Serialize + Clone + Send + Sync + 'static> Output<T> {
    /// Erase the type into a JSON value
    pub fn to_value(&self) -> Output<Value> {
        self.try_apply(|value| serde_json::to_value(value))
    }
}

impl From<&str> for Output<String> {
    fn from(value: &str) -> Self {
        Output::known(value.to_string())
    }
}

impl From<String> for Output<String> {
    fn from(value: String) -> Self {
        Output::known(value)
    }
}
