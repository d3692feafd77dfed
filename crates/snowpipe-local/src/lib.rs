//! Local providers for snowpipe
//!
//! Deterministic, in-process implementations of the `aws` and `snowflake`
//! provider packages. Both share one [`LocalCloud`] inventory, so
//! cross-package references (a stage pointing at an integration, a bucket
//! notification pointing at a pipe's queue) are checked the way the real
//! services would check them.
//!
//! Physical names and ARNs are derived from the stack config, which makes
//! repeated runs reproducible.
//!
//! # Example
//!
//! ```ignore
//! use snowpipe_config::StackConfig;
//! use snowpipe_graph::Engine;
//!
//! let config = StackConfig::default();
//! let (cloud, registry) = snowpipe_local::local_providers(&config);
//! let engine = Engine::new(registry);
//!
//! // Make the pipe fail on the next run
//! cloud.fail_on("pipe");
//! ```

pub mod aws;
pub mod cloud;
pub mod error;
pub mod naming;
pub mod snowflake;

pub use aws::LocalAwsProvider;
pub use cloud::LocalCloud;
pub use error::{LocalError, Result};
pub use snowflake::LocalSnowflakeProvider;

use snowpipe_config::StackConfig;
use snowpipe_graph::ProviderRegistry;
use std::sync::Arc;

/// Both local providers over a fresh inventory
pub fn local_providers(config: &StackConfig) -> (LocalCloud, ProviderRegistry) {
    let cloud = LocalCloud::new();
    let registry = registry_for(&cloud, config);
    (cloud, registry)
}

/// Both local providers over an existing inventory
pub fn registry_for(cloud: &LocalCloud, config: &StackConfig) -> ProviderRegistry {
    ProviderRegistry::new()
        .with(Arc::new(LocalAwsProvider::new(cloud.clone(), config)))
        .with(Arc::new(LocalSnowflakeProvider::new(cloud.clone(), config)))
}
