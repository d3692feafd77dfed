//! Simulated AWS package: S3 buckets, IAM and the caller identity lookup

use crate::cloud::{LocalCloud, identity_of};
use crate::error::{LocalError, Result};
use crate::naming::{aws_name, suffix};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use snowpipe_config::StackConfig;
use snowpipe_graph::{Attributes, AuthStatus, Provider, ResourceRequest};

const BUCKET: &str = "aws:s3:Bucket";
const CALLER_IDENTITY: &str = "aws:index:getCallerIdentity";
const ROLE: &str = "aws:iam:Role";
const POLICY: &str = "aws:iam:Policy";
const ATTACHMENT: &str = "aws:iam:RolePolicyAttachment";
const NOTIFICATION: &str = "aws:s3:BucketNotification";

#[derive(Debug, Deserialize)]
struct QueueConfig {
    queue_arn: String,
    events: Vec<String>,
}

/// Output attributes from a JSON object
pub(crate) fn attributes(value: Value) -> Attributes {
    match value {
        Value::Object(map) => map.into_iter().collect(),
        _ => Attributes::new(),
    }
}

/// AWS provider backed by a [`LocalCloud`]
pub struct LocalAwsProvider {
    cloud: LocalCloud,
    stack: String,
    region: String,
    account_id: String,
}

impl LocalAwsProvider {
    pub fn new(cloud: LocalCloud, config: &StackConfig) -> Self {
        Self {
            cloud,
            stack: config.stack.clone(),
            region: config.aws.region.clone(),
            account_id: config.aws.account_id.clone(),
        }
    }

    fn string(request: &ResourceRequest, key: &str) -> Result<String> {
        request
            .get_input::<String>(key)
            .ok_or_else(|| LocalError::invalid(&request.name, format!("missing string '{}'", key)))
    }

    fn policy_json(request: &ResourceRequest, key: &str) -> Result<String> {
        let document = Self::string(request, key)?;
        serde_json::from_str::<Value>(&document).map_err(|e| {
            LocalError::invalid(&request.name, format!("{} is not valid JSON: {}", key, e))
        })?;
        Ok(document)
    }

    fn provision(&self, request: &ResourceRequest) -> Result<Attributes> {
        self.cloud.check_fault(&request.name)?;

        let outputs = match request.resource_type.as_str() {
            BUCKET => {
                let bucket = request
                    .get_input::<String>("bucket")
                    .unwrap_or_else(|| aws_name(&self.stack, &request.name));
                self.cloud.claim("bucket", BUCKET, &bucket, &request.name)?;
                json!({
                    "id": bucket,
                    "arn": format!("arn:aws:s3:::{}", bucket),
                    "bucket": bucket,
                })
            }
            ROLE => {
                let name = Self::string(request, "name")?;
                Self::policy_json(request, "assume_role_policy")?;
                self.cloud.claim("role", ROLE, &name, &request.name)?;
                json!({
                    "id": name,
                    "arn": format!("arn:aws:iam::{}:role/{}", self.account_id, name),
                    "name": name,
                })
            }
            POLICY => {
                let name = request
                    .get_input::<String>("name")
                    .unwrap_or_else(|| aws_name(&self.stack, &request.name));
                Self::policy_json(request, "policy")?;
                let arn = format!("arn:aws:iam::{}:policy/{}", self.account_id, name);
                self.cloud.claim("policy", POLICY, &arn, &request.name)?;
                json!({
                    "id": arn,
                    "arn": arn,
                    "name": name,
                })
            }
            ATTACHMENT => {
                let role = Self::string(request, "role")?;
                let policy_arn = Self::string(request, "policy_arn")?;
                if !self.cloud.exists(ROLE, &role) {
                    return Err(LocalError::NotFound {
                        kind: "role",
                        name: role,
                    });
                }
                if !self.cloud.exists(POLICY, &policy_arn) {
                    return Err(LocalError::NotFound {
                        kind: "policy",
                        name: policy_arn,
                    });
                }
                let id = format!("{}-{}", role, suffix(&role, &policy_arn));
                self.cloud.claim("policy attachment", ATTACHMENT, &id, &request.name)?;
                json!({ "id": id })
            }
            NOTIFICATION => {
                let bucket = Self::string(request, "bucket")?;
                if !self.cloud.exists(BUCKET, &bucket) {
                    return Err(LocalError::NotFound {
                        kind: "bucket",
                        name: bucket,
                    });
                }
                let queues: Vec<QueueConfig> = request.get_input("queues").ok_or_else(|| {
                    LocalError::invalid(&request.name, "queues must be a list of queue configurations")
                })?;
                for queue in &queues {
                    if !queue.queue_arn.starts_with("arn:aws:sqs:") {
                        return Err(LocalError::invalid(
                            &request.name,
                            format!("'{}' is not an SQS queue ARN", queue.queue_arn),
                        ));
                    }
                    let bad_event = queue.events.iter().any(|e| !e.starts_with("s3:"));
                    if queue.events.is_empty() || bad_event {
                        return Err(LocalError::invalid(
                            &request.name,
                            format!("invalid event list {:?}", queue.events),
                        ));
                    }
                }
                self.cloud.claim("bucket notification", NOTIFICATION, &bucket, &request.name)?;
                json!({ "id": bucket })
            }
            other => return Err(LocalError::UnsupportedType(other.to_string())),
        };

        Ok(attributes(outputs))
    }

    fn remove(&self, request: &ResourceRequest, current: &Attributes) -> Result<()> {
        let Some(identity) = identity_of(&request.resource_type, current) else {
            return Err(LocalError::invalid(&request.name, "no recorded id"));
        };
        self.cloud.release(&request.resource_type, &identity)
    }
}

#[async_trait]
impl Provider for LocalAwsProvider {
    fn name(&self) -> &str {
        "aws"
    }

    fn display_name(&self) -> &str {
        "AWS (local)"
    }

    async fn check_auth(&self) -> snowpipe_graph::Result<AuthStatus> {
        Ok(AuthStatus::ok(format!(
            "account {} ({})",
            self.account_id, self.region
        )))
    }

    async fn read(&self, request: &ResourceRequest) -> snowpipe_graph::Result<Attributes> {
        if request.resource_type != CALLER_IDENTITY {
            return Err(LocalError::UnsupportedType(request.resource_type.clone()).into());
        }
        Ok(Attributes::from([
            ("account_id".to_string(), json!(self.account_id)),
            (
                "arn".to_string(),
                json!(format!("arn:aws:iam::{}:user/snowpipe", self.account_id)),
            ),
            (
                "user_id".to_string(),
                json!(format!(
                    "AIDA{}",
                    suffix(&self.account_id, "snowpipe").to_ascii_uppercase()
                )),
            ),
        ]))
    }

    async fn create(&self, request: &ResourceRequest) -> snowpipe_graph::Result<Attributes> {
        tracing::info!(resource = %request.name, "Creating {}", request.resource_type);
        Ok(self.provision(request)?)
    }

    async fn update(
        &self,
        request: &ResourceRequest,
        current: &Attributes,
    ) -> snowpipe_graph::Result<Attributes> {
        tracing::info!(resource = %request.name, "Updating {}", request.resource_type);
        self.cloud.check_fault(&request.name)?;
        self.remove(request, current)?;
        self.provision(request).map_err(|e| {
            self.cloud.adopt(&request.resource_type, current, &request.name);
            e.into()
        })
    }

    async fn delete(&self, request: &ResourceRequest, current: &Attributes) -> snowpipe_graph::Result<()> {
        tracing::info!(resource = %request.name, "Deleting {}", request.resource_type);
        Ok(self.remove(request, current)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> LocalAwsProvider {
        LocalAwsProvider::new(LocalCloud::new(), &StackConfig::default())
    }

    fn request(name: &str, resource_type: &str, inputs: Value) -> ResourceRequest {
        ResourceRequest::new(name, resource_type, serde_json::from_value(inputs).unwrap())
    }

    #[tokio::test]
    async fn test_bucket_auto_name_and_arn() {
        let aws = provider();
        let outputs = aws.create(&request("landing", BUCKET, json!({}))).await.unwrap();
        let bucket = outputs["bucket"].as_str().unwrap();
        assert!(bucket.starts_with("landing-"));
        assert_eq!(outputs["arn"], json!(format!("arn:aws:s3:::{}", bucket)));
    }

    #[tokio::test]
    async fn test_duplicate_bucket_rejected() {
        let aws = provider();
        aws.create(&request("a", BUCKET, json!({"bucket": "shared"}))).await.unwrap();
        let err = aws
            .create(&request("b", BUCKET, json!({"bucket": "shared"})))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn test_role_requires_json_policy() {
        let aws = provider();
        let err = aws
            .create(&request(
                "role",
                ROLE,
                json!({"name": "r", "assume_role_policy": "not json"}),
            ))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not valid JSON"));
    }

    #[tokio::test]
    async fn test_attachment_needs_role() {
        let aws = provider();
        let policy = aws
            .create(&request("policy", POLICY, json!({"policy": "{}"})))
            .await
            .unwrap();
        let err = aws
            .create(&request(
                "attach",
                ATTACHMENT,
                json!({"role": "missing", "policy_arn": policy["arn"]}),
            ))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[tokio::test]
    async fn test_notification_validates_queue_arn() {
        let aws = provider();
        aws.create(&request("b", BUCKET, json!({"bucket": "landing"}))).await.unwrap();
        let err = aws
            .create(&request(
                "notify",
                NOTIFICATION,
                json!({
                    "bucket": "landing",
                    "queues": [{"queue_arn": "arn:aws:sns:x", "events": ["s3:ObjectCreated:*"]}],
                }),
            ))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not an SQS queue ARN"));
    }

    #[tokio::test]
    async fn test_caller_identity() {
        let aws = provider();
        let outputs = aws
            .read(&request("caller", CALLER_IDENTITY, json!({})))
            .await
            .unwrap();
        assert_eq!(outputs["account_id"], json!("123456789012"));
    }

    #[tokio::test]
    async fn test_update_keeps_stable_arn() {
        let aws = provider();
        let created = aws
            .create(&request("policy", POLICY, json!({"policy": "{\"v\":1}"})))
            .await
            .unwrap();
        let updated = aws
            .update(&request("policy", POLICY, json!({"policy": "{\"v\":2}"})), &created)
            .await
            .unwrap();
        assert_eq!(created["arn"], updated["arn"]);
    }
}
