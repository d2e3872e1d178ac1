//! Caller identity lookup.

use anyhow::{Context, Result};
use aws_sdk_sts::Client as StsClient;

use super::session::{AwsSessions, DEFAULT_REGION};

/// The account and principal behind the configured credentials.
#[derive(Debug, Clone)]
pub struct CallerIdentity {
    pub account_id: String,
    pub arn: String,
}

/// Resolves the caller identity. This doubles as the run's credential
/// check: failure here aborts before any region is attempted.
pub async fn caller_identity(sessions: &AwsSessions) -> Result<CallerIdentity> {
    let aws_config = sessions.config_for_region(DEFAULT_REGION).await;
    let client = StsClient::new(&aws_config);
    let response = client
        .get_caller_identity()
        .send()
        .await
        .context("No or invalid AWS credentials configured")?;

    let account_id = response
        .account
        .context("Caller identity carries no account id")?;
    let arn = response.arn.context("Caller identity carries no ARN")?;
    Ok(CallerIdentity { account_id, arn })
}
