use studioflow_core::approvals::ApprovalService;
use studioflow_core::audit::TracingAuditSink;

use crate::commands::{load_config, to_data, with_store, CommandResult};

/// Lists a project's approval requests, or only the open ones assigned to
/// `assignee`.
pub fn list(project_id: &str, assignee: Option<&str>) -> CommandResult {
    const COMMAND: &str = "approvals list";
    let config = match load_config(COMMAND) {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let avatar_base_url = config.approvals.avatar_base_url.clone();
    let requests = with_store(COMMAND, &config, |store| async move {
        let service = ApprovalService::new(store, TracingAuditSink, avatar_base_url);
        match assignee {
            Some(user_id) => service.open_requests_for_assignee(project_id, user_id).await,
            None => service.list_requests(project_id).await,
        }
    });

    let requests = match requests {
        Ok(requests) => requests,
        Err(failure) => return failure,
    };
    let open = requests.iter().filter(|request| request.status.is_open()).count();
    let message = format!("{} approval request(s), {open} open", requests.len());
    match to_data(COMMAND, &requests) {
        Ok(data) => CommandResult::success_with_data(COMMAND, message, Some(data)),
        Err(failure) => failure,
    }
}
