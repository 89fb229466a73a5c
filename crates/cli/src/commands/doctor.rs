use munchbot_core::config::{AppConfig, LoadOptions};
use munchbot_workspace::VerificationSigner;
use serde::Serialize;

use crate::commands::{CommandResult, CONFIG_FAILURE_EXIT};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report(LoadOptions::default());
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { CONFIG_FAILURE_EXIT };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

const DEPENDENT_CHECKS: [&str; 3] =
    ["workspace_credentials", "search_credentials", "verification_signing"];

fn build_report(options: LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_workspace_credentials(&config));
            checks.push(check_search_credentials(&config));
            checks.push(check_verification_signing(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.extend(DEPENDENT_CHECKS.into_iter().map(|name| DoctorCheck {
                name,
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            }));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_workspace_credentials(config: &AppConfig) -> DoctorCheck {
    DoctorCheck {
        name: "workspace_credentials",
        status: CheckStatus::Pass,
        details: format!(
            "app `{}` will authenticate against {}",
            config.workspace.app_id, config.workspace.api_base_url
        ),
    }
}

fn check_search_credentials(config: &AppConfig) -> DoctorCheck {
    DoctorCheck {
        name: "search_credentials",
        status: CheckStatus::Pass,
        details: format!(
            "client `{}` will search {} for `{}` (limit {})",
            config.search.client_id,
            config.search.api_base_url,
            config.search.term,
            config.search.limit
        ),
    }
}

fn check_verification_signing(config: &AppConfig) -> DoctorCheck {
    let signer = VerificationSigner::new(config.workspace.webhook_secret.clone());
    match signer.verification_response("doctor-readiness") {
        Ok(_) => DoctorCheck {
            name: "verification_signing",
            status: CheckStatus::Pass,
            details: "webhook secret produces X-OUTBOUND-TOKEN signatures".to_string(),
        },
        Err(error) => DoctorCheck {
            name: "verification_signing",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
