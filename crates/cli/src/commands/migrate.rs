use crate::commands::{
    load_config, CommandResult, EXIT_DB_CONNECTIVITY, EXIT_MIGRATION, EXIT_RUNTIME,
};
use studioflow_db::{connect_storage, migrations};

pub fn run() -> CommandResult {
    let config = match load_config("migrate") {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "migrate",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                EXIT_RUNTIME,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_storage(&config.storage)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), EXIT_DB_CONNECTIVITY))?;
        let outcome = migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), EXIT_MIGRATION));
        let applied = migrations::applied_migrations(&pool).await.unwrap_or_default();
        pool.close().await;
        outcome.map(|()| applied)
    });

    match result {
        Ok(applied) => {
            tracing::info!(event_name = "cli.migrate.completed", applied, "migrations applied");
            let known = migrations::known_migrations();
            CommandResult::success(
                "migrate",
                format!("applied pending migrations ({applied}/{known} in place)"),
            )
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("migrate", error_class, message, exit_code)
        }
    }
}
