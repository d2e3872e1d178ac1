//! Typed view of a single CloudTrail log record.
//!
//! Records arrive as JSON strings inside the lookup API's event envelope.
//! Only the fields the summarizer consumes are modeled here; everything
//! else in a record is ignored during deserialization.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{RecordError, RecordResult};

/// One parsed CloudTrail log record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActivityRecord {
    pub event_time: String,
    pub event_source: String,
    pub event_name: String,
    #[serde(rename = "sourceIPAddress")]
    pub source_ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub response_elements: Option<Value>,
    pub user_identity: Option<UserIdentity>,
}

/// The `userIdentity` block of a log record. Which sub-fields are present
/// varies widely by identity type, so everything is optional here and the
/// per-type requirements are enforced during principal resolution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserIdentity {
    #[serde(rename = "type")]
    pub identity_type: Option<String>,
    pub principal_id: Option<String>,
    pub arn: Option<String>,
    pub account_id: Option<String>,
    pub user_name: Option<String>,
    pub invoked_by: Option<String>,
    pub session_context: Option<SessionContext>,
    pub on_behalf_of: Option<OnBehalfOf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionContext {
    pub session_issuer: Option<SessionIssuer>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionIssuer {
    #[serde(rename = "type")]
    pub issuer_type: Option<String>,
    pub arn: Option<String>,
    pub account_id: Option<String>,
    pub user_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OnBehalfOf {
    pub user_id: Option<String>,
    pub identity_store_arn: Option<String>,
}

impl ActivityRecord {
    /// Parses the raw JSON payload of one log record.
    pub fn from_json(raw: &str) -> RecordResult<Self> {
        serde_json::from_str(raw).map_err(|_| RecordError::malformed("log record JSON"))
    }

    /// The invoked API as `"<eventSource>:<eventName>"`.
    pub fn api_call(&self) -> String {
        format!("{}:{}", self.event_source, self.event_name)
    }

    /// Whether the record describes a successful API call. A call counts
    /// as failed when the record carries `errorCode` or `errorMessage` at
    /// the top level, or inside a non-null `responseElements` object.
    pub fn is_successful(&self) -> bool {
        if self.error_code.is_some() || self.error_message.is_some() {
            return false;
        }
        if let Some(elements) = self.response_elements.as_ref().and_then(Value::as_object) {
            if elements.contains_key("errorCode") || elements.contains_key("errorMessage") {
                return false;
            }
        }
        true
    }

    /// The error as `"<eventSource>:<errorCode>"`, preferring the
    /// top-level code over one nested in `responseElements`. `None` for
    /// successful records and for failures that carry no code at all.
    pub fn error_id(&self) -> Option<String> {
        if self.is_successful() {
            return None;
        }
        let nested = self
            .response_elements
            .as_ref()
            .and_then(|elements| elements.get("errorCode"))
            .and_then(Value::as_str);
        let code = self.error_code.as_deref().or(nested)?;
        Some(format!("{}:{}", self.event_source, code))
    }

    /// Source IP address, `"Unknown"` when the record carries none.
    pub fn source_ip(&self) -> &str {
        self.source_ip_address.as_deref().unwrap_or("Unknown")
    }

    /// User agent, `"Unknown"` when the record carries none.
    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or("Unknown")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> ActivityRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_api_call_combines_source_and_name() {
        let record = record(json!({
            "eventSource": "s3.amazonaws.com",
            "eventName": "GetObject"
        }));
        assert_eq!(record.api_call(), "s3.amazonaws.com:GetObject");
    }

    #[test]
    fn test_is_successful_clean_record() {
        let record = record(json!({
            "eventSource": "s3.amazonaws.com",
            "eventName": "GetObject",
            "responseElements": {"bucketName": "test"}
        }));
        assert!(record.is_successful());
    }

    #[test]
    fn test_is_successful_top_level_error_code() {
        let record = record(json!({
            "eventSource": "s3.amazonaws.com",
            "eventName": "GetObject",
            "errorCode": "AccessDenied"
        }));
        assert!(!record.is_successful());
    }

    #[test]
    fn test_is_successful_top_level_error_message_only() {
        let record = record(json!({
            "eventSource": "sts.amazonaws.com",
            "eventName": "AssumeRole",
            "errorMessage": "Access denied"
        }));
        assert!(!record.is_successful());
    }

    #[test]
    fn test_is_successful_nested_error_code_only() {
        let record = record(json!({
            "eventSource": "ec2.amazonaws.com",
            "eventName": "RunInstances",
            "responseElements": {"errorCode": "Server.InternalError"}
        }));
        assert!(!record.is_successful());
    }

    #[test]
    fn test_is_successful_null_response_elements() {
        let record = record(json!({
            "eventSource": "ec2.amazonaws.com",
            "eventName": "DescribeInstances",
            "responseElements": null
        }));
        assert!(record.is_successful());
    }

    #[test]
    fn test_error_id_prefers_top_level_code() {
        let record = record(json!({
            "eventSource": "s3.amazonaws.com",
            "eventName": "GetObject",
            "errorCode": "AccessDenied",
            "responseElements": {"errorCode": "Shadowed"}
        }));
        assert_eq!(
            record.error_id(),
            Some("s3.amazonaws.com:AccessDenied".to_string())
        );
    }

    #[test]
    fn test_error_id_falls_back_to_nested_code() {
        let record = record(json!({
            "eventSource": "ec2.amazonaws.com",
            "eventName": "RunInstances",
            "responseElements": {"errorCode": "Server.InternalError"}
        }));
        assert_eq!(
            record.error_id(),
            Some("ec2.amazonaws.com:Server.InternalError".to_string())
        );
    }

    #[test]
    fn test_error_id_none_for_successful_record() {
        let record = record(json!({
            "eventSource": "s3.amazonaws.com",
            "eventName": "GetObject"
        }));
        assert_eq!(record.error_id(), None);
    }

    #[test]
    fn test_error_id_none_for_failure_without_code() {
        let record = record(json!({
            "eventSource": "sts.amazonaws.com",
            "eventName": "AssumeRole",
            "errorMessage": "Access denied"
        }));
        assert_eq!(record.error_id(), None);
    }

    #[test]
    fn test_source_ip_and_user_agent_default_to_unknown() {
        let record = record(json!({
            "eventSource": "s3.amazonaws.com",
            "eventName": "GetObject"
        }));
        assert_eq!(record.source_ip(), "Unknown");
        assert_eq!(record.user_agent(), "Unknown");
    }

    #[test]
    fn test_source_ip_and_user_agent_pass_through() {
        let record = record(json!({
            "eventSource": "s3.amazonaws.com",
            "eventName": "GetObject",
            "sourceIPAddress": "198.51.100.7",
            "userAgent": "aws-cli/2.13.0"
        }));
        assert_eq!(record.source_ip(), "198.51.100.7");
        assert_eq!(record.user_agent(), "aws-cli/2.13.0");
    }

    #[test]
    fn test_from_json_rejects_invalid_payload() {
        assert!(ActivityRecord::from_json("not json").is_err());
    }

    #[test]
    fn test_from_json_ignores_unmodeled_fields() {
        let parsed = ActivityRecord::from_json(
            r#"{"eventSource": "s3.amazonaws.com", "eventName": "GetObject",
                "eventVersion": "1.08", "readOnly": true, "requestID": "abc"}"#,
        )
        .unwrap();
        assert_eq!(parsed.api_call(), "s3.amazonaws.com:GetObject");
    }
}
