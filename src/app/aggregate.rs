//! Nested activity counters and their merge.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Two-level counter table: group key (principal or region) to counted
/// key (API call, IP address, user agent, error code) to occurrences.
pub type CounterFamily = BTreeMap<String, BTreeMap<String, u64>>;

/// Activity counts of one collection scope. Region collectors each build
/// their own summary; the orchestrator folds them into the run-wide one.
/// Ordered maps keep every serialization of a summary deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub api_calls_by_principal: CounterFamily,
    pub api_calls_by_region: CounterFamily,
    pub error_codes_by_principal: CounterFamily,
    pub ip_addresses_by_principal: CounterFamily,
    pub user_agents_by_principal: CounterFamily,
}

impl ActivitySummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one API call under both its principal and its region.
    pub fn count_api_call(&mut self, region: &str, principal: &str, api_call: &str) {
        bump(&mut self.api_calls_by_principal, principal, api_call);
        bump(&mut self.api_calls_by_region, region, api_call);
    }

    pub fn count_ip_address(&mut self, principal: &str, ip_address: &str) {
        bump(&mut self.ip_addresses_by_principal, principal, ip_address);
    }

    pub fn count_user_agent(&mut self, principal: &str, user_agent: &str) {
        bump(&mut self.user_agents_by_principal, principal, user_agent);
    }

    pub fn count_error_code(&mut self, principal: &str, error_code: &str) {
        bump(&mut self.error_codes_by_principal, principal, error_code);
    }

    /// Folds another summary into this one, summing counts at matching
    /// keys and inserting new keys otherwise. Merging is commutative and
    /// associative, so region results may be folded in any completion
    /// order.
    pub fn merge(&mut self, other: ActivitySummary) {
        merge_family(&mut self.api_calls_by_principal, other.api_calls_by_principal);
        merge_family(&mut self.api_calls_by_region, other.api_calls_by_region);
        merge_family(
            &mut self.error_codes_by_principal,
            other.error_codes_by_principal,
        );
        merge_family(
            &mut self.ip_addresses_by_principal,
            other.ip_addresses_by_principal,
        );
        merge_family(
            &mut self.user_agents_by_principal,
            other.user_agents_by_principal,
        );
    }

    pub fn total_api_calls(&self) -> u64 {
        self.api_calls_by_region
            .values()
            .flat_map(|counters| counters.values())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.api_calls_by_principal.is_empty()
            && self.api_calls_by_region.is_empty()
            && self.error_codes_by_principal.is_empty()
            && self.ip_addresses_by_principal.is_empty()
            && self.user_agents_by_principal.is_empty()
    }
}

fn bump(family: &mut CounterFamily, group: &str, key: &str) {
    *family
        .entry(group.to_string())
        .or_default()
        .entry(key.to_string())
        .or_default() += 1;
}

fn merge_family(target: &mut CounterFamily, source: CounterFamily) {
    for (group, counters) in source {
        let target_group = target.entry(group).or_default();
        for (key, count) in counters {
            *target_group.entry(key).or_default() += count;
        }
    }
}
