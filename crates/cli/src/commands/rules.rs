use serde::Serialize;
use studioflow_core::domain::approval::{ApprovalRule, RuleScope};
use studioflow_core::rules::RuleStore;

use crate::commands::{load_config, to_data, with_store, CommandResult};

#[derive(Debug, Serialize)]
struct RuleListing {
    global: Vec<ApprovalRule>,
    project: Vec<ApprovalRule>,
}

/// Lists global rules plus project rules, narrowed to one project when given.
pub fn list(project_id: Option<&str>) -> CommandResult {
    const COMMAND: &str = "rules list";
    let config = match load_config(COMMAND) {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let listing = with_store(COMMAND, &config, |store| async move {
        let rules = RuleStore::new(store);
        let global = rules.list(RuleScope::Global).await?;
        let project = match project_id {
            Some(project_id) => rules.list_for_project(project_id).await?,
            None => rules.list(RuleScope::Project).await?,
        };
        Ok(RuleListing { global, project })
    });

    let listing = match listing {
        Ok(listing) => listing,
        Err(failure) => return failure,
    };
    let message =
        format!("{} global and {} project rule(s)", listing.global.len(), listing.project.len());
    match to_data(COMMAND, &listing) {
        Ok(data) => CommandResult::success_with_data(COMMAND, message, Some(data)),
        Err(failure) => failure,
    }
}
