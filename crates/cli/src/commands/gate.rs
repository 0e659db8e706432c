use std::fs;
use std::path::Path;

use anyhow::Context;
use studioflow_core::domain::stage::Stage;
use studioflow_core::gate::{StageEntities, WorkflowGate};

use crate::commands::{load_config, to_data, with_store, CommandResult, EXIT_INVALID_INPUT};

/// Evaluates whether `stage` may be completed. The snapshot file holds the
/// stage's tasks, files and documents as JSON; requests and workflow rules
/// come from the store.
pub fn run(project_id: &str, stage: &str, snapshot_path: &Path) -> CommandResult {
    const COMMAND: &str = "gate";
    let config = match load_config(COMMAND) {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let stage = match stage.parse::<Stage>() {
        Ok(stage) => stage,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "invalid_input",
                error.to_string(),
                EXIT_INVALID_INPUT,
            )
        }
    };
    let entities = match read_entities(snapshot_path) {
        Ok(entities) => entities,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "invalid_input",
                format!("{error:#}"),
                EXIT_INVALID_INPUT,
            )
        }
    };

    let verdict = with_store(COMMAND, &config, |store| async move {
        WorkflowGate::new(store).evaluate(project_id, stage, entities).await
    });
    let verdict = match verdict {
        Ok(verdict) => verdict,
        Err(failure) => return failure,
    };

    let message = if verdict.allowed {
        format!("{} can be completed", stage.display_name())
    } else {
        format!("{} is blocked by {} reason(s)", stage.display_name(), verdict.reasons.len())
    };
    match to_data(COMMAND, &verdict) {
        Ok(data) => CommandResult::success_with_data(COMMAND, message, Some(data)),
        Err(failure) => failure,
    }
}

fn read_entities(path: &Path) -> anyhow::Result<StageEntities> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read snapshot `{}`", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("snapshot `{}` is not valid stage JSON", path.display()))
}
