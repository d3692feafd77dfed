//! AWS resources: bucket, IAM role/policy, bucket notifications

use super::{Resource, ResourceHandle, output, prop};
use serde_json::{Value, json};
use snowpipe_graph::{Output, PropertyKind, PropertySpec, ResourceDecl, ResourceSchema};

pub static BUCKET: ResourceSchema = ResourceSchema {
    token: "aws:s3:Bucket",
    inputs: &[
        PropertySpec::optional("bucket", PropertyKind::String),
        PropertySpec::optional("force_destroy", PropertyKind::Bool),
    ],
    outputs: &["id", "arn", "bucket"],
    data_source: false,
};

pub static CALLER_IDENTITY: ResourceSchema = ResourceSchema {
    token: "aws:index:getCallerIdentity",
    inputs: &[],
    outputs: &["account_id", "arn", "user_id"],
    data_source: true,
};

pub static IAM_ROLE: ResourceSchema = ResourceSchema {
    token: "aws:iam:Role",
    inputs: &[
        PropertySpec::required("name", PropertyKind::String),
        PropertySpec::optional("description", PropertyKind::String),
        PropertySpec::required("assume_role_policy", PropertyKind::String),
    ],
    outputs: &["id", "arn", "name"],
    data_source: false,
};

pub static IAM_POLICY: ResourceSchema = ResourceSchema {
    token: "aws:iam:Policy",
    inputs: &[
        PropertySpec::optional("name", PropertyKind::String),
        PropertySpec::optional("description", PropertyKind::String),
        PropertySpec::required("policy", PropertyKind::String),
    ],
    outputs: &["id", "arn", "name"],
    data_source: false,
};

pub static ROLE_POLICY_ATTACHMENT: ResourceSchema = ResourceSchema {
    token: "aws:iam:RolePolicyAttachment",
    inputs: &[
        PropertySpec::required("role", PropertyKind::String),
        PropertySpec::required("policy_arn", PropertyKind::String),
    ],
    outputs: &["id"],
    data_source: false,
};

pub static BUCKET_NOTIFICATION: ResourceSchema = ResourceSchema {
    token: "aws:s3:BucketNotification",
    inputs: &[
        PropertySpec::required("bucket", PropertyKind::String),
        PropertySpec::required("queues", PropertyKind::List),
    ],
    outputs: &["id"],
    data_source: false,
};

/// S3 bucket; the physical name is generated unless `bucket` is set
#[derive(Debug, Clone, Default)]
pub struct Bucket {
    pub bucket: Option<String>,
    pub force_destroy: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct BucketHandle {
    pub resource: String,
    pub arn: Output<String>,
    /// Physical bucket name
    pub bucket: Output<String>,
}

impl Resource for Bucket {
    type Handle = BucketHandle;

    fn schema() -> &'static ResourceSchema {
        &BUCKET
    }

    fn into_decl(self, name: &str) -> ResourceDecl {
        let mut decl = ResourceDecl::new(name, Self::schema());
        if let Some(bucket) = self.bucket {
            decl = decl.with_property("bucket", json!(bucket));
        }
        if let Some(force_destroy) = self.force_destroy {
            decl = decl.with_property("force_destroy", json!(force_destroy));
        }
        decl
    }

    fn handle(&self, name: &str) -> BucketHandle {
        BucketHandle {
            resource: name.to_string(),
            arn: output(name, "arn"),
            bucket: output(name, "bucket"),
        }
    }
}

/// Lookup of the account the provider credentials belong to
#[derive(Debug, Clone, Copy, Default)]
pub struct CallerIdentity;

#[derive(Debug, Clone)]
pub struct CallerIdentityHandle {
    pub resource: String,
    pub account_id: Output<String>,
    pub arn: Output<String>,
}

impl Resource for CallerIdentity {
    type Handle = CallerIdentityHandle;

    fn schema() -> &'static ResourceSchema {
        &CALLER_IDENTITY
    }

    fn into_decl(self, name: &str) -> ResourceDecl {
        ResourceDecl::new(name, Self::schema())
    }

    fn handle(&self, name: &str) -> CallerIdentityHandle {
        CallerIdentityHandle {
            resource: name.to_string(),
            account_id: output(name, "account_id"),
            arn: output(name, "arn"),
        }
    }
}

/// IAM role with a fixed name
#[derive(Debug, Clone)]
pub struct IamRole {
    pub name: String,
    pub description: Option<String>,
    pub assume_role_policy: Output<String>,
}

#[derive(Debug, Clone)]
pub struct IamRoleHandle {
    pub resource: String,
    pub arn: Output<String>,
    pub name: Output<String>,
}

impl Resource for IamRole {
    type Handle = IamRoleHandle;

    fn schema() -> &'static ResourceSchema {
        &IAM_ROLE
    }

    fn into_decl(self, name: &str) -> ResourceDecl {
        let mut decl = ResourceDecl::new(name, Self::schema())
            .with_property("name", json!(self.name))
            .with_property("assume_role_policy", prop(&self.assume_role_policy));
        if let Some(description) = self.description {
            decl = decl.with_property("description", json!(description));
        }
        decl
    }

    fn handle(&self, name: &str) -> IamRoleHandle {
        IamRoleHandle {
            resource: name.to_string(),
            arn: output(name, "arn"),
            name: output(name, "name"),
        }
    }
}

/// Managed IAM policy
#[derive(Debug, Clone)]
pub struct IamPolicy {
    pub policy: Output<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct IamPolicyHandle {
    pub resource: String,
    pub arn: Output<String>,
}

impl Resource for IamPolicy {
    type Handle = IamPolicyHandle;

    fn schema() -> &'static ResourceSchema {
        &IAM_POLICY
    }

    fn into_decl(self, name: &str) -> ResourceDecl {
        let mut decl = ResourceDecl::new(name, Self::schema()).with_property("policy", prop(&self.policy));
        if let Some(description) = self.description {
            decl = decl.with_property("description", json!(description));
        }
        decl
    }

    fn handle(&self, name: &str) -> IamPolicyHandle {
        IamPolicyHandle {
            resource: name.to_string(),
            arn: output(name, "arn"),
        }
    }
}

/// Attaches a managed policy to a role, by role name
#[derive(Debug, Clone)]
pub struct RolePolicyAttachment {
    pub role: Output<String>,
    pub policy_arn: Output<String>,
}

impl Resource for RolePolicyAttachment {
    type Handle = ResourceHandle;

    fn schema() -> &'static ResourceSchema {
        &ROLE_POLICY_ATTACHMENT
    }

    fn into_decl(self, name: &str) -> ResourceDecl {
        ResourceDecl::new(name, Self::schema())
            .with_property("role", prop(&self.role))
            .with_property("policy_arn", prop(&self.policy_arn))
    }

    fn handle(&self, name: &str) -> ResourceHandle {
        ResourceHandle {
            resource: name.to_string(),
        }
    }
}

/// One queue destination of a bucket notification
#[derive(Debug, Clone)]
pub struct QueueNotification {
    pub queue_arn: Output<String>,
    pub events: Vec<String>,
}

impl QueueNotification {
    fn to_value(&self) -> Output<Value> {
        let events = self.events.clone();
        self.queue_arn.apply(move |queue_arn| {
            json!({
                "queue_arn": queue_arn,
                "events": events,
            })
        })
    }
}

/// Routes bucket events to queues
#[derive(Debug, Clone)]
pub struct BucketNotification {
    pub bucket: Output<String>,
    pub queues: Vec<QueueNotification>,
}

impl Resource for BucketNotification {
    type Handle = ResourceHandle;

    fn schema() -> &'static ResourceSchema {
        &BUCKET_NOTIFICATION
    }

    fn into_decl(self, name: &str) -> ResourceDecl {
        let queues = Output::all(self.queues.iter().map(QueueNotification::to_value)).apply(Value::Array);
        ResourceDecl::new(name, Self::schema())
            .with_property("bucket", prop(&self.bucket))
            .with_property("queues", queues)
    }

    fn handle(&self, name: &str) -> ResourceHandle {
        ResourceHandle {
            resource: name.to_string(),
        }
    }
}
