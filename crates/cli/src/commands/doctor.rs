use serde::Serialize;
use studioflow_core::config::{AppConfig, LoadOptions};
use studioflow_db::{connect_storage, migrations};

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
    fn skipped(name: &'static str, details: &str) -> Self {
        Self { name, status: CheckStatus::Skipped, details: details.to_string() }
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
            checks.extend(check_storage(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            let reason = "skipped because configuration did not load";
            checks.push(DoctorCheck::skipped("storage_connectivity", reason));
            checks.push(DoctorCheck::skipped("migration_status", reason));
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

fn check_storage(config: &AppConfig) -> [DoctorCheck; 2] {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return [
                DoctorCheck {
                    name: "storage_connectivity",
                    status: CheckStatus::Fail,
                    details: format!("failed to initialize async runtime: {error}"),
                },
                DoctorCheck::skipped("migration_status", "skipped because no runtime is available"),
            ];
        }
    };

    runtime.block_on(async {
        let pool = match connect_storage(&config.storage).await {
            Ok(pool) => pool,
            Err(error) => {
                return [
                    DoctorCheck {
                        name: "storage_connectivity",
                        status: CheckStatus::Fail,
                        details: format!("failed to connect to storage: {error}"),
                    },
                    DoctorCheck::skipped(
                        "migration_status",
                        "skipped because storage is unreachable",
                    ),
                ];
            }
        };

        let connectivity = DoctorCheck {
            name: "storage_connectivity",
            status: CheckStatus::Pass,
            details: format!("connected using `{}`", config.storage.url),
        };
        let known = migrations::known_migrations();
        let migration_status = match migrations::applied_migrations(&pool).await {
            Ok(applied) if applied >= known => DoctorCheck {
                name: "migration_status",
                status: CheckStatus::Pass,
                details: format!("{applied}/{known} migrations applied"),
            },
            Ok(applied) => DoctorCheck {
                name: "migration_status",
                status: CheckStatus::Fail,
                details: format!("{applied}/{known} migrations applied; run `studioflow migrate`"),
            },
            Err(error) => DoctorCheck {
                name: "migration_status",
                status: CheckStatus::Fail,
                details: format!("could not read migration history: {error}"),
            },
        };
        pool.close().await;
        [connectivity, migration_status]
    })
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = vec![report.summary.clone()];

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
