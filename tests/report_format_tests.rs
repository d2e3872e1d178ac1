//! Result file format tests.
//!
//! The output document must be deterministic: two runs over the same
//! collected data produce byte-identical JSON, with every key at every
//! nesting level in sorted order.

use pretty_assertions::assert_eq;
use std::collections::BTreeMap;

use trailscope::app::aggregate::ActivitySummary;
use trailscope::app::report::{
    load_report, write_report, ActivityReport, AnalyzedWindow, RunMetadata,
};

fn sample_report() -> ActivityReport {
    let mut summary = ActivitySummary::new();
    summary.count_api_call("eu-central-1", "112233445566:user/alice", "s3.amazonaws.com:GetObject");
    summary.count_api_call("eu-central-1", "112233445566:user/alice", "s3.amazonaws.com:GetObject");
    summary.count_api_call("us-east-1", "112233445566:root", "sts.amazonaws.com:GetCallerIdentity");
    summary.count_ip_address("112233445566:user/alice", "198.51.100.7");
    summary.count_ip_address("112233445566:user/alice", "198.51.100.7");
    summary.count_ip_address("112233445566:root", "203.0.113.99");
    summary.count_user_agent("112233445566:user/alice", "aws-cli/2.13.0");
    summary.count_user_agent("112233445566:user/alice", "aws-cli/2.13.0");
    summary.count_user_agent("112233445566:root", "console.amazonaws.com");
    summary.count_error_code("112233445566:user/alice", "s3.amazonaws.com:AccessDenied");

    ActivityReport {
        metadata: RunMetadata {
            account_id: "112233445566".to_string(),
            account_principal: "arn:aws:iam::112233445566:user/alice".to_string(),
            activity_type: "ALL".to_string(),
            cloudtrail_data_analyzed: AnalyzedWindow {
                from_timestamp: "20240518120000".to_string(),
                to_timestamp: "20240601120000".to_string(),
            },
            invocation: "trailscope --past-hours 336 --plot-results".to_string(),
            regions_enabled: vec!["eu-central-1".to_string(), "us-east-1".to_string()],
            regions_failed: BTreeMap::from([(
                "eu-west-1".to_string(),
                "AccessDeniedException".to_string(),
            )]),
            run_timestamp: "20240601120000".to_string(),
        },
        summary,
    }
}

#[test]
fn test_document_layout_is_fully_sorted() {
    let json = serde_json::to_string_pretty(&sample_report()).unwrap();
    let expected = r#"{
  "_metadata": {
    "account_id": "112233445566",
    "account_principal": "arn:aws:iam::112233445566:user/alice",
    "activity_type": "ALL",
    "cloudtrail_data_analyzed": {
      "from_timestamp": "20240518120000",
      "to_timestamp": "20240601120000"
    },
    "invocation": "trailscope --past-hours 336 --plot-results",
    "regions_enabled": [
      "eu-central-1",
      "us-east-1"
    ],
    "regions_failed": {
      "eu-west-1": "AccessDeniedException"
    },
    "run_timestamp": "20240601120000"
  },
  "api_calls_by_principal": {
    "112233445566:root": {
      "sts.amazonaws.com:GetCallerIdentity": 1
    },
    "112233445566:user/alice": {
      "s3.amazonaws.com:GetObject": 2
    }
  },
  "api_calls_by_region": {
    "eu-central-1": {
      "s3.amazonaws.com:GetObject": 2
    },
    "us-east-1": {
      "sts.amazonaws.com:GetCallerIdentity": 1
    }
  },
  "error_codes_by_principal": {
    "112233445566:user/alice": {
      "s3.amazonaws.com:AccessDenied": 1
    }
  },
  "ip_addresses_by_principal": {
    "112233445566:root": {
      "203.0.113.99": 1
    },
    "112233445566:user/alice": {
      "198.51.100.7": 2
    }
  },
  "user_agents_by_principal": {
    "112233445566:root": {
      "console.amazonaws.com": 1
    },
    "112233445566:user/alice": {
      "aws-cli/2.13.0": 2
    }
  }
}"#;
    assert_eq!(json, expected);
}

#[test]
fn test_serialization_is_deterministic() {
    let first = serde_json::to_string_pretty(&sample_report()).unwrap();
    let second = serde_json::to_string_pretty(&sample_report()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_written_report_loads_back_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir
        .path()
        .join("account_activity_112233445566_20240601120000.json");
    let report = sample_report();

    write_report(&report, &path).unwrap();
    let loaded = load_report(&path).unwrap();
    assert_eq!(loaded, report);
}

/// Result files written by earlier versions of this kind of analysis
/// carry the same layout; they must load cleanly, e.g. for replotting.
#[test]
fn test_loads_externally_written_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("account_activity_998877665544_20240101000000.json");
    let document = r#"{
  "_metadata": {
    "account_id": "998877665544",
    "account_principal": "arn:aws:iam::998877665544:root",
    "activity_type": "FAILED",
    "cloudtrail_data_analyzed": {
      "from_timestamp": "20231231000000",
      "to_timestamp": "20240101000000"
    },
    "invocation": "./aws_summarize_account_activity.py --activity-type FAILED --past-hours 24",
    "regions_enabled": [
      "us-east-1"
    ],
    "regions_failed": {},
    "run_timestamp": "20240101000000"
  },
  "api_calls_by_principal": {
    "998877665544:root": {
      "ec2.amazonaws.com:RunInstances": 3
    }
  },
  "api_calls_by_region": {
    "us-east-1": {
      "ec2.amazonaws.com:RunInstances": 3
    }
  },
  "error_codes_by_principal": {
    "998877665544:root": {
      "ec2.amazonaws.com:UnauthorizedOperation": 3
    }
  },
  "ip_addresses_by_principal": {
    "998877665544:root": {
      "203.0.113.99": 3
    }
  },
  "user_agents_by_principal": {
    "998877665544:root": {
      "console.amazonaws.com": 3
    }
  }
}"#;
    std::fs::write(&path, document).unwrap();

    let report = load_report(&path).unwrap();
    assert_eq!(report.metadata.account_id, "998877665544");
    assert_eq!(report.metadata.activity_type, "FAILED");
    assert_eq!(report.summary.total_api_calls(), 3);
    assert_eq!(
        report.summary.error_codes_by_principal["998877665544:root"]
            ["ec2.amazonaws.com:UnauthorizedOperation"],
        3
    );
}
