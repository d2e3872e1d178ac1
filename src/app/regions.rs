//! Region enumeration.

use anyhow::{Context, Result};
use aws_sdk_ec2::Client as Ec2Client;

use super::session::{AwsSessions, DEFAULT_REGION};

/// Regions enabled in the account, sorted by name. Opt-in regions the
/// account has not enabled are excluded, so collection does not run into
/// guaranteed authorization failures.
pub async fn enabled_regions(sessions: &AwsSessions) -> Result<Vec<String>> {
    let aws_config = sessions.config_for_region(DEFAULT_REGION).await;
    let client = Ec2Client::new(&aws_config);
    let response = client
        .describe_regions()
        .all_regions(false)
        .send()
        .await
        .context("Cannot list the regions enabled in the account")?;

    let mut regions: Vec<String> = response
        .regions
        .unwrap_or_default()
        .into_iter()
        .filter_map(|region| region.region_name)
        .collect();
    regions.sort();
    Ok(regions)
}
