//! Flow-log bundle: log bucket, its delivery policy, and the flow log.

use serde_json::json;

use crate::naming;
use crate::resource::{get_att, join, name_tags, reference, ResourceGraph, ResourceNode};

pub const LOG_BUCKET: &str = "LogBucket";
pub const LOG_BUCKET_POLICY: &str = "LogBucketPolicy";
pub const FLOW_LOG: &str = "S3FlowLog";

/// Days before logs move to archival storage.
const ARCHIVE_AFTER_DAYS: u32 = 30;
/// Days before logs are deleted.
const EXPIRE_AFTER_DAYS: u32 = 365;

fn log_bucket() -> ResourceNode {
    ResourceNode::new("AWS::S3::Bucket")
        .deletion_policy("Retain")
        .with_properties(json!({
            "AccessControl": "LogDeliveryWrite",
            "BucketEncryption": {
                "ServerSideEncryptionConfiguration": [{
                    "ServerSideEncryptionByDefault": { "SSEAlgorithm": "AES256" }
                }]
            },
            "LifecycleConfiguration": {
                "Rules": [{
                    "Id": "RetentionRule",
                    "Status": "Enabled",
                    "ExpirationInDays": EXPIRE_AFTER_DAYS,
                    "Transitions": [{
                        "StorageClass": "GLACIER",
                        "TransitionInDays": ARCHIVE_AFTER_DAYS,
                    }]
                }]
            },
            "PublicAccessBlockConfiguration": {
                "BlockPublicAcls": true,
                "BlockPublicPolicy": true,
                "IgnorePublicAcls": true,
                "RestrictPublicBuckets": true,
            },
            "Tags": name_tags(&["logs"]),
        }))
}

fn log_bucket_policy() -> ResourceNode {
    ResourceNode::new("AWS::S3::BucketPolicy").with_properties(json!({
        "Bucket": reference(LOG_BUCKET),
        "PolicyDocument": {
            "Version": "2012-10-17",
            "Statement": [
                {
                    "Sid": "AWSLogDeliveryAclCheck",
                    "Effect": "Allow",
                    "Principal": { "Service": "delivery.logs.amazonaws.com" },
                    "Action": "s3:GetBucketAcl",
                    "Resource": get_att(LOG_BUCKET, "Arn"),
                },
                {
                    "Sid": "AWSLogDeliveryWrite",
                    "Effect": "Allow",
                    "Principal": { "Service": "delivery.logs.amazonaws.com" },
                    "Action": "s3:PutObject",
                    "Resource": join("", vec![
                        json!("arn:aws:s3:::"),
                        reference(LOG_BUCKET),
                        json!("/AWSLogs/"),
                        reference("AWS::AccountId"),
                        json!("/*"),
                    ]),
                    "Condition": {
                        "StringEquals": { "s3:x-amz-acl": "bucket-owner-full-control" }
                    },
                },
            ]
        },
    }))
}

fn flow_log() -> ResourceNode {
    ResourceNode::new("AWS::EC2::FlowLog")
        .depends_on(LOG_BUCKET_POLICY)
        .with_properties(json!({
            "LogDestinationType": "s3",
            "LogDestination": get_att(LOG_BUCKET, "Arn"),
            "ResourceId": reference(naming::VPC),
            "ResourceType": "VPC",
            "TrafficType": "ALL",
        }))
}

/// All traffic of the VPC, delivered to a retained log bucket. The flow log
/// waits for the bucket policy, without which delivery is rejected.
pub fn flow_logs() -> ResourceGraph {
    ResourceGraph::single(LOG_BUCKET, log_bucket())
        .with(LOG_BUCKET_POLICY, log_bucket_policy())
        .with(FLOW_LOG, flow_log())
}
