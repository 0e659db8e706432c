//! Command implementations. Exit codes: 0 ok, 2 config, 3 runtime,
//! 4 database connectivity, 5 migration, 6 invalid input, 7 request failure.

pub mod approvals;
pub mod config;
pub mod doctor;
pub mod gate;
pub mod migrate;
pub mod rules;

use std::future::Future;

use serde::Serialize;
use serde_json::Value;
use studioflow_core::config::{AppConfig, LoadOptions};
use studioflow_core::errors::{ApplicationError, InterfaceError};
use studioflow_db::{connect_storage, migrations, SqliteSnapshotStore};

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_RUNTIME: u8 = 3;
pub const EXIT_DB_CONNECTIVITY: u8 = 4;
pub const EXIT_MIGRATION: u8 = 5;
pub const EXIT_INVALID_INPUT: u8 = 6;
pub const EXIT_REQUEST_FAILED: u8 = 7;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with_data(command, message, None)
    }

    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

pub(crate) fn load_config(command: &str) -> Result<AppConfig, CommandResult> {
    AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            EXIT_CONFIG,
        )
    })
}

/// Opens the configured store, applies pending migrations and runs `action`
/// on a current-thread runtime.
pub(crate) fn with_store<T, F, Fut>(
    command: &str,
    config: &AppConfig,
    action: F,
) -> Result<T, CommandResult>
where
    F: FnOnce(SqliteSnapshotStore) -> Fut,
    Fut: Future<Output = Result<T, ApplicationError>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(
        |error| {
            CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                EXIT_RUNTIME,
            )
        },
    )?;

    runtime.block_on(async {
        let pool = connect_storage(&config.storage).await.map_err(|error| {
            CommandResult::failure(command, "db_connectivity", error.to_string(), EXIT_DB_CONNECTIVITY)
        })?;
        if let Err(error) = migrations::run_pending(&pool).await {
            pool.close().await;
            return Err(CommandResult::failure(
                command,
                "migration",
                error.to_string(),
                EXIT_MIGRATION,
            ));
        }

        let result = action(SqliteSnapshotStore::new(pool.clone())).await;
        pool.close().await;
        result.map_err(|error| request_failure(command, error))
    })
}

fn request_failure(command: &str, error: ApplicationError) -> CommandResult {
    let interface = error.into_interface(command);
    let error_class = match &interface {
        InterfaceError::BadRequest { .. } => "bad_request",
        InterfaceError::NotFound { .. } => "not_found",
        InterfaceError::Forbidden { .. } => "forbidden",
        InterfaceError::ServiceUnavailable { .. } => "service_unavailable",
        InterfaceError::Internal { .. } => "internal",
    };
    CommandResult::failure(command, error_class, interface.to_string(), EXIT_REQUEST_FAILED)
}

pub(crate) fn to_data<T: Serialize>(command: &str, value: &T) -> Result<Value, CommandResult> {
    serde_json::to_value(value).map_err(|error| {
        CommandResult::failure(command, "serialization", error.to_string(), EXIT_RUNTIME)
    })
}
