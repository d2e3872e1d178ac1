//! AWS session provisioning.
//!
//! One loaded SDK config per region, cached for the lifetime of the run.
//! Every client this tool builds (STS, EC2, CloudTrail) goes through
//! here, so profile selection and retry behavior apply uniformly.

use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_types::app_name::AppName;
use aws_types::region::Region;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Region used for the account-level bootstrap calls (caller identity,
/// region enumeration) before any data region is in play.
pub const DEFAULT_REGION: &str = "us-east-1";

const TOTAL_MAX_ATTEMPTS: u32 = 5;
const APP_NAME: &str = "trailscope";

pub struct AwsSessions {
    profile: Option<String>,
    configs: RwLock<HashMap<String, SdkConfig>>,
}

impl AwsSessions {
    pub fn new(profile: Option<String>) -> Self {
        Self {
            profile,
            configs: RwLock::new(HashMap::new()),
        }
    }

    /// Loaded SDK config for one region, cached across calls. Retries on
    /// throttled lookups are left to the SDK's standard retry mode.
    pub async fn config_for_region(&self, region: &str) -> SdkConfig {
        if let Some(config) = self.configs.read().await.get(region) {
            return config.clone();
        }
        let config = self.load_config(region).await;
        self.configs
            .write()
            .await
            .entry(region.to_string())
            .or_insert(config)
            .clone()
    }

    async fn load_config(&self, region: &str) -> SdkConfig {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .retry_config(RetryConfig::standard().with_max_attempts(TOTAL_MAX_ATTEMPTS));
        if let Ok(app_name) = AppName::new(APP_NAME) {
            loader = loader.app_name(app_name);
        }
        if let Some(profile) = &self.profile {
            loader = loader.profile_name(profile);
        }
        loader.load().await
    }
}
