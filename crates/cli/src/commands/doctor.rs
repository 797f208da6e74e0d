use pdsdesk_core::config::{AppConfig, LoadOptions};
use pdsdesk_db::connect_with_config;
use pdsdesk_db::repositories::{lookup_default_queue, DefaultQueue, SqlOperatorGroupRepository};
use serde::Serialize;

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

impl DoctorCheck {
    fn skipped(name: &'static str, reason: &str) -> Self {
        Self { name, status: CheckStatus::Skipped, details: format!("skipped because {reason}") }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_api_token(&config));
            checks.extend(check_database(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            let reason = "configuration did not load";
            checks.push(DoctorCheck::skipped("api_token", reason));
            checks.push(DoctorCheck::skipped("database_connectivity", reason));
            checks.push(DoctorCheck::skipped("default_queue", reason));
        }
    }

    let all_ok = checks.iter().all(|check| check.status != CheckStatus::Fail);
    let overall_status = if all_ok { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_ok {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_api_token(config: &AppConfig) -> DoctorCheck {
    let details = if config.auth.api_token.is_some() {
        "bearer token required on API requests".to_string()
    } else {
        "no api token configured; the server trusts proxy identity headers alone".to_string()
    };
    DoctorCheck { name: "api_token", status: CheckStatus::Pass, details }
}

/// Connectivity first; the default queue lookup needs a reachable,
/// migrated database.
fn check_database(config: &AppConfig) -> Vec<DoctorCheck> {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return vec![
                DoctorCheck {
                    name: "database_connectivity",
                    status: CheckStatus::Fail,
                    details: format!("failed to initialize async runtime: {error}"),
                },
                DoctorCheck::skipped("default_queue", "the async runtime did not start"),
            ];
        }
    };

    runtime.block_on(async {
        let pool = match connect_with_config(&config.database).await {
            Ok(pool) => pool,
            Err(error) => {
                return vec![
                    DoctorCheck {
                        name: "database_connectivity",
                        status: CheckStatus::Fail,
                        details: format!("failed to connect to database: {error}"),
                    },
                    DoctorCheck::skipped("default_queue", "the database is unreachable"),
                ];
            }
        };

        let connectivity = DoctorCheck {
            name: "database_connectivity",
            status: CheckStatus::Pass,
            details: format!("connected using `{}`", config.database.url),
        };

        let groups = SqlOperatorGroupRepository::new(pool.clone());
        let lookup =
            lookup_default_queue(&groups, config.routing.default_group_key.as_deref()).await;
        let (status, details) = match lookup {
            Ok(DefaultQueue::Unset) => (
                CheckStatus::Pass,
                "no default queue configured; unmatched tickets stay unassigned".to_string(),
            ),
            Ok(DefaultQueue::Active(group)) => (
                CheckStatus::Pass,
                format!("default queue `{}` resolves to {}", group.group_key, group.id),
            ),
            Ok(DefaultQueue::Inactive(group)) => {
                (CheckStatus::Fail, format!("default queue `{}` is inactive", group.group_key))
            }
            Ok(DefaultQueue::Missing(group_key)) => {
                (CheckStatus::Fail, format!("default queue `{group_key}` does not exist"))
            }
            Err(error) => (
                CheckStatus::Fail,
                format!("lookup failed (has `pdsdesk migrate` been run?): {error}"),
            ),
        };
        let default_queue = DoctorCheck { name: "default_queue", status, details };

        pool.close().await;
        vec![connectivity, default_queue]
    })
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
