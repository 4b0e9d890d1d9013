use std::path::Path;

use fitsize_core::config::{AppConfig, LoadOptions};
use fitsize_core::sizing::{OutcomeClassifier, RecommendationRequest, SizeRecommendationEngine};
use fitsize_db::{DemoCohort, Snapshot, DEMO_PRODUCT, DEMO_TARGET_SHOPPER};
use serde::Serialize;

use super::{CommandResult, EXIT_CHECK_FAILED, EXIT_OK};

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

pub fn run(json_output: bool, snapshot: Option<&Path>, options: LoadOptions) -> CommandResult {
    let report = build_report(snapshot, options);
    let exit_code =
        if report.overall_status == CheckStatus::Pass { EXIT_OK } else { EXIT_CHECK_FAILED };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\
                 \"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report(snapshot: Option<&Path>, options: LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: format!(
                    "configuration loaded and validated (sizing version {})",
                    config.sizing.version
                ),
            });
            checks.push(check_snapshot(snapshot));
            checks.push(check_engine(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(check_snapshot(snapshot));
            checks.push(DoctorCheck {
                name: "engine_smoke",
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            });
        }
    }

    let all_pass = checks.iter().all(|check| check.status != CheckStatus::Fail);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

/// Decode the snapshot and make sure every order status has an outcome class.
fn check_snapshot(path: Option<&Path>) -> DoctorCheck {
    let Some(path) = path else {
        return DoctorCheck {
            name: "snapshot_integrity",
            status: CheckStatus::Skipped,
            details: "no --snapshot given".to_string(),
        };
    };

    let snapshot = match Snapshot::load(path) {
        Ok(snapshot) => snapshot,
        Err(error) => {
            return DoctorCheck {
                name: "snapshot_integrity",
                status: CheckStatus::Fail,
                details: format!("failed to load `{}`: {error}", path.display()),
            };
        }
    };

    let classifier = OutcomeClassifier::new();
    let unmapped: Vec<&str> = snapshot
        .orders
        .iter()
        .filter(|line| classifier.classify_status(&line.status).is_err())
        .map(|line| line.status.as_str())
        .collect();

    if unmapped.is_empty() {
        DoctorCheck {
            name: "snapshot_integrity",
            status: CheckStatus::Pass,
            details: format!(
                "{} profiles and {} order lines decoded; every status is classifiable",
                snapshot.profiles.len(),
                snapshot.orders.len()
            ),
        }
    } else {
        DoctorCheck {
            name: "snapshot_integrity",
            status: CheckStatus::Fail,
            details: format!("unclassifiable order statuses: {}", unmapped.join(", ")),
        }
    }
}

/// Runs the demo cohort through the engine with the effective configuration.
fn check_engine(config: &AppConfig) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "engine_smoke",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let result = DemoCohort::snapshot()
        .map_err(|error| format!("demo cohort did not build: {error}"))
        .and_then(|snapshot| {
            let anchor =
                DemoCohort::anchor().map_err(|error| format!("demo anchor invalid: {error}"))?;
            let stores = snapshot.into_stores();
            let engine = SizeRecommendationEngine::new(
                config.sizing.clone(),
                stores.profiles.clone(),
                stores.profiles,
                stores.orders,
            )
            .map_err(|error| format!("engine rejected configuration: {error}"))?;
            let request =
                RecommendationRequest::new(DEMO_TARGET_SHOPPER, DEMO_PRODUCT).with_as_of(anchor);
            runtime
                .block_on(engine.recommend(&request))
                .map_err(|error| format!("engine failed on demo cohort: {error}"))
        });

    match result {
        Ok(result) => match result.recommended_size {
            Some(size) => DoctorCheck {
                name: "engine_smoke",
                status: CheckStatus::Pass,
                details: format!(
                    "demo cohort recommends {size} with {:.0}% confidence",
                    result.confidence * 100.0
                ),
            },
            None => DoctorCheck {
                name: "engine_smoke",
                status: CheckStatus::Fail,
                details: "demo cohort produced no recommendation".to_string(),
            },
        },
        Err(details) => DoctorCheck { name: "engine_smoke", status: CheckStatus::Fail, details },
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
