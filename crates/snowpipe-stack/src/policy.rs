//! IAM policy documents
//!
//! Both documents are pure functions of their inputs and serialise with a
//! fixed key order, so the same inputs always give byte-identical JSON.

use crate::error::Result;
use serde::Serialize;
use std::collections::BTreeMap;

pub const POLICY_VERSION: &str = "2012-10-17";

/// Object-level permissions, granted on `<bucket arn>/*`
pub const OBJECT_ACTIONS: &[&str] = &[
    "s3:PutObject",
    "s3:GetObject",
    "s3:GetObjectVersion",
    "s3:DeleteObject",
    "s3:DeleteObjectVersion",
];

/// Bucket-level permissions, granted on `<bucket arn>`
pub const BUCKET_ACTIONS: &[&str] = &["s3:ListBucket", "s3:GetBucketLocation"];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: &'static str,
    pub statement: Vec<Statement>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    pub effect: Effect,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<Principal>,

    pub action: OneOrMany,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<BTreeMap<String, BTreeMap<String, String>>>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub enum Effect {
    Allow,
    Deny,
}

#[derive(Debug, Clone, Serialize)]
pub struct Principal {
    #[serde(rename = "AWS")]
    pub aws: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl PolicyDocument {
    pub fn new(statement: Vec<Statement>) -> Self {
        Self {
            version: POLICY_VERSION,
            statement,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Trust policy letting the warehouse's IAM user assume the integration role
///
/// The external id condition pins the grant to this one storage integration.
pub fn trust_policy(principal_arn: &str, external_id: &str) -> Result<String> {
    let condition = BTreeMap::from([(
        "StringEquals".to_string(),
        BTreeMap::from([("sts:ExternalId".to_string(), external_id.to_string())]),
    )]);

    PolicyDocument::new(vec![Statement {
        effect: Effect::Allow,
        principal: Some(Principal {
            aws: principal_arn.to_string(),
        }),
        action: OneOrMany::One("sts:AssumeRole".to_string()),
        resource: None,
        condition: Some(condition),
    }])
    .to_json()
}

/// Read/write access to the objects of one bucket
pub fn bucket_access_policy(bucket_arn: &str) -> Result<String> {
    let actions = |list: &[&str]| OneOrMany::Many(list.iter().map(|a| a.to_string()).collect());

    PolicyDocument::new(vec![
        Statement {
            effect: Effect::Allow,
            principal: None,
            action: actions(OBJECT_ACTIONS),
            resource: Some(format!("{}/*", bucket_arn)),
            condition: None,
        },
        Statement {
            effect: Effect::Allow,
            principal: None,
            action: actions(BUCKET_ACTIONS),
            resource: Some(bucket_arn.to_string()),
            condition: None,
        },
    ])
    .to_json()
}

/// ARN of an IAM role in the given account
pub fn role_arn(account_id: &str, role_name: &str) -> String {
    format!("arn:aws:iam::{}:role/{}", account_id, role_name)
}
