//! Snowpipe ingestion stack
//!
//! Declares the S3 bucket, IAM trust chain and Snowflake objects of an
//! auto-ingest pipeline as a [`snowpipe_graph::ResourceGraph`].
//!
//! ```no_run
//! use snowpipe_config::StackConfig;
//!
//! let stack = snowpipe_stack::declare(&StackConfig::default())?;
//! assert_eq!(stack.graph().len(), 12);
//! # Ok::<(), snowpipe_stack::StackError>(())
//! ```

pub mod error;
pub mod model;
pub mod policy;
pub mod program;
pub mod stack;
pub mod template;

pub use error::{Result, StackError};
pub use program::declare;
pub use stack::Stack;
pub use template::CopyStatement;
