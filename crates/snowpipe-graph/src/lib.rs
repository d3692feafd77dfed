//! Snowpipe resource graph
//!
//! This crate models a stack as a graph of resource declarations whose
//! properties may be deferred values computed from other resources'
//! outputs, and drives that graph through a set of providers.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  snowpipe CLI                    │
//! │          (validate / preview / up / destroy)     │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                snowpipe-graph                    │
//! │  ┌──────────────┐  ┌──────────────┐             │
//! │  │  Output<T>   │  │ ResourceGraph│             │
//! │  └──────────────┘  └──────────────┘             │
//! │  ┌──────────────┐  ┌──────────────┐             │
//! │  │    Engine    │  │  State Mgmt  │             │
//! │  └──────────────┘  └──────────────┘             │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │  trait Provider { ... }                   │   │
//! │  └──────────────────────────────────────────┘   │
//! └───────┬─────────────────┬───────────────────────┘
//!         │                 │
//! ┌───────▼───────┐ ┌───────▼───────┐
//! │      aws      │ │   snowflake   │
//! │   provider    │ │   provider    │
//! └───────────────┘ └───────────────┘
//! ```

pub mod action;
pub mod engine;
pub mod error;
pub mod graph;
pub mod output;
pub mod provider;
pub mod resource;
pub mod state;

// Re-exports
pub use action::{Action, ActionResult, ActionType, ApplyResult, Plan, PlanSummary};
pub use engine::Engine;
pub use error::{GraphError, Result};
pub use graph::ResourceGraph;
pub use output::{AttributeRef, Output, OutputContext, Resolution, ResourceOutcome};
pub use provider::{Attributes, AuthStatus, Provider, ProviderRegistry, ResourceRequest};
pub use resource::{PropertyKind, PropertySpec, PropertyValue, ResourceDecl, ResourceSchema};
pub use state::{ResourceState, ResourceStatus, StackState, StateManager};
