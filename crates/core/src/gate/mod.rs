//! Stage completion gate.
//!
//! Blocking conditions are evaluated independently and every violated one
//! contributes a single human-readable reason. A stage may be completed only
//! when no reason was produced.

pub mod service;

use serde::{Deserialize, Serialize};

use crate::domain::approval::ApprovalRequest;
use crate::domain::entity::{
    DocumentStatus, FileStatus, ProjectDocument, ProjectFile, TaskSnapshot, TaskStatus,
};
use crate::domain::stage::Stage;
use crate::domain::workflow::{WorkflowRule, WorkflowRuleType};

pub use service::WorkflowGate;

const DEFAULT_APPROVER_ROLE: &str = "an approver";

/// Read-only entity collections supplied by the caller.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageEntities {
    #[serde(default)]
    pub tasks: Vec<TaskSnapshot>,
    #[serde(default)]
    pub files: Vec<ProjectFile>,
    #[serde(default)]
    pub documents: Vec<ProjectDocument>,
}

/// Everything the gate looks at for one project.
#[derive(Clone, Debug, Default)]
pub struct StageSnapshot {
    pub tasks: Vec<TaskSnapshot>,
    pub files: Vec<ProjectFile>,
    pub documents: Vec<ProjectDocument>,
    pub requests: Vec<ApprovalRequest>,
    pub workflow_rules: Vec<WorkflowRule>,
}

impl StageSnapshot {
    pub fn new(
        entities: StageEntities,
        requests: Vec<ApprovalRequest>,
        workflow_rules: Vec<WorkflowRule>,
    ) -> Self {
        Self {
            tasks: entities.tasks,
            files: entities.files,
            documents: entities.documents,
            requests,
            workflow_rules,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateVerdict {
    pub stage: Stage,
    pub allowed: bool,
    pub reasons: Vec<String>,
}

pub fn can_complete_stage(stage: Stage, snapshot: &StageSnapshot) -> GateVerdict {
    let transition_rules: Vec<&WorkflowRule> = snapshot
        .workflow_rules
        .iter()
        .filter(|rule| rule.rule_type == WorkflowRuleType::StageTransition && rule.applies_to(stage))
        .collect();
    let requires_tasks =
        transition_rules.iter().any(|rule| rule.requirements.require_all_tasks_complete);
    let requires_files =
        transition_rules.iter().any(|rule| rule.requirements.require_all_files_uploaded);
    let requires_documents =
        transition_rules.iter().any(|rule| rule.requirements.require_all_documents_approved);

    let stage_documents: Vec<&ProjectDocument> =
        snapshot.documents.iter().filter(|document| document.stage == stage).collect();
    let mut reasons = Vec::new();

    if requires_tasks {
        let open_tasks = snapshot
            .tasks
            .iter()
            .filter(|task| task.stage == stage && task.status != TaskStatus::Completed)
            .count();
        if open_tasks > 0 {
            reasons.push(format!(
                "{open_tasks} {} in {} {} not completed",
                plural(open_tasks, "task", "tasks"),
                stage.display_name(),
                plural(open_tasks, "is", "are")
            ));
        }
    }

    if requires_files {
        let missing_files = snapshot
            .files
            .iter()
            .filter(|file| {
                file.required_for_stage == Some(stage) && file.status != FileStatus::Received
            })
            .count();
        if missing_files > 0 {
            reasons.push(format!(
                "{missing_files} required {} for {} {} not been received",
                plural(missing_files, "file", "files"),
                stage.display_name(),
                plural(missing_files, "has", "have")
            ));
        }
    }

    if requires_documents {
        let unapproved = stage_documents
            .iter()
            .filter(|document| document.status != DocumentStatus::Approved)
            .count();
        if unapproved > 0 {
            reasons.push(format!(
                "{unapproved} {} in {} {} not approved",
                plural(unapproved, "document", "documents"),
                stage.display_name(),
                plural(unapproved, "is", "are")
            ));
        }
    }

    let blocking_documents = stage_documents
        .iter()
        .filter(|document| {
            document.required_for_progression && document.status != DocumentStatus::Approved
        })
        .count();
    if blocking_documents > 0 {
        reasons.push(format!(
            "{blocking_documents} {} required for progression {} not approved",
            plural(blocking_documents, "document", "documents"),
            plural(blocking_documents, "is", "are")
        ));
    }

    let open_requests = snapshot
        .requests
        .iter()
        .filter(|request| request.stage == Some(stage) && request.status.is_open())
        .count();
    if open_requests > 0 {
        reasons.push(format!(
            "{open_requests} approval {} still pending for {}",
            plural(open_requests, "request is", "requests are"),
            stage.display_name()
        ));
    }

    // Enabled approval rules block regardless of whether a request exists.
    for rule in snapshot
        .workflow_rules
        .iter()
        .filter(|rule| rule.rule_type == WorkflowRuleType::Approval && rule.applies_to(stage))
    {
        let role = rule
            .approver_role
            .as_deref()
            .map(str::trim)
            .filter(|role| !role.is_empty())
            .unwrap_or(DEFAULT_APPROVER_ROLE);
        reasons.push(format!("approval required from {role}"));
    }

    GateVerdict { stage, allowed: reasons.is_empty(), reasons }
}

fn plural(count: usize, one: &'static str, many: &'static str) -> &'static str {
    if count == 1 {
        one
    } else {
        many
    }
}

#[cfg(test)]
mod tests {
    use super::{can_complete_stage, StageSnapshot};
    use crate::approvals::lifecycle::{self, NewApprovalRequest};
    use crate::approvals::resolver::{ApproverResolver, DEFAULT_AVATAR_BASE_URL};
    use crate::domain::approval::{ApprovalStatus, ApproverType, RequestSource};
    use crate::domain::entity::{
        DocumentStatus, FileStatus, ProjectDocument, ProjectFile, TaskPriority, TaskSnapshot,
        TaskStatus,
    };
    use crate::domain::stage::Stage;
    use crate::domain::workflow::{TransitionRequirements, WorkflowRule, WorkflowRuleType};
    use crate::test_support::{config, fixed_time, roster, task_entity};

    fn task(id: &str, stage: Stage, status: TaskStatus) -> TaskSnapshot {
        TaskSnapshot {
            id: id.to_string(),
            title: format!("Task {id}"),
            stage,
            status,
            priority: TaskPriority::Medium,
        }
    }

    fn document(id: &str, stage: Stage, status: DocumentStatus, required: bool) -> ProjectDocument {
        ProjectDocument {
            id: id.to_string(),
            name: format!("{id}.pdf"),
            stage,
            category: "drawings".to_string(),
            status,
            required_for_progression: required,
        }
    }

    fn file(id: &str, stage: Option<Stage>, status: FileStatus) -> ProjectFile {
        ProjectFile {
            id: id.to_string(),
            name: format!("{id}.dwg"),
            required_for_stage: stage,
            status,
        }
    }

    fn transition_rule(requirements: TransitionRequirements) -> WorkflowRule {
        WorkflowRule {
            id: "wf-transition".to_string(),
            name: "Stage checklist".to_string(),
            rule_type: WorkflowRuleType::StageTransition,
            stages: vec![Stage::TechnicalDesign],
            enabled: true,
            requirements,
            approver_role: None,
        }
    }

    fn approval_rule(role: Option<&str>, enabled: bool) -> WorkflowRule {
        WorkflowRule {
            id: "wf-approval".to_string(),
            name: "Sign-off".to_string(),
            rule_type: WorkflowRuleType::Approval,
            stages: Vec::new(),
            enabled,
            requirements: TransitionRequirements::default(),
            approver_role: role.map(str::to_string),
        }
    }

    fn pending_request(stage: Stage) -> crate::domain::approval::ApprovalRequest {
        let roster = roster();
        let resolver = ApproverResolver::new(&roster, DEFAULT_AVATAR_BASE_URL);
        lifecycle::create_request(
            NewApprovalRequest {
                project_id: "proj-1".to_string(),
                source: RequestSource::Manual,
                rule_id: None,
                entity: task_entity("t-9", stage),
                approval_configs: vec![config(0, ApproverType::ProjectManager)],
            },
            &roster[0],
            &resolver,
            fixed_time(0),
        )
        .expect("request")
    }

    #[test]
    fn empty_stage_is_allowed() {
        let verdict = can_complete_stage(Stage::TechnicalDesign, &StageSnapshot::default());
        assert!(verdict.allowed);
        assert!(verdict.reasons.is_empty());
    }

    #[test]
    fn delegated_request_blocks_stage() {
        let roster = roster();
        let resolver = ApproverResolver::new(&roster, DEFAULT_AVATAR_BASE_URL);
        let mut request = pending_request(Stage::Design);
        lifecycle::delegate(&mut request, &roster[2], "u-admin", &resolver, fixed_time(1))
            .expect("delegate");
        assert_eq!(request.status, ApprovalStatus::Delegated);

        let snapshot = StageSnapshot { requests: vec![request], ..StageSnapshot::default() };
        let verdict = can_complete_stage(Stage::Design, &snapshot);
        assert!(!verdict.allowed);
        assert_eq!(
            verdict.reasons,
            vec!["1 approval request is still pending for Design".to_string()]
        );
    }

    #[test]
    fn one_reason_per_violated_condition() {
        let snapshot = StageSnapshot {
            tasks: vec![
                task("t-1", Stage::TechnicalDesign, TaskStatus::Todo),
                task("t-2", Stage::TechnicalDesign, TaskStatus::InProgress),
                task("t-3", Stage::TechnicalDesign, TaskStatus::Completed),
            ],
            documents: vec![document(
                "d-1",
                Stage::TechnicalDesign,
                DocumentStatus::InReview,
                true,
            )],
            requests: vec![pending_request(Stage::TechnicalDesign)],
            workflow_rules: vec![transition_rule(TransitionRequirements {
                require_all_tasks_complete: true,
                ..TransitionRequirements::default()
            })],
            ..StageSnapshot::default()
        };

        let verdict = can_complete_stage(Stage::TechnicalDesign, &snapshot);
        assert!(!verdict.allowed);
        assert_eq!(verdict.reasons.len(), 3, "{:?}", verdict.reasons);
        assert!(verdict.reasons[0].starts_with("2 tasks in Technical Design are"));
        assert!(verdict.reasons[1].contains("required for progression"));
        assert!(verdict.reasons[2].contains("approval request is still pending"));
    }

    #[test]
    fn task_completion_is_only_checked_when_a_rule_requires_it() {
        let snapshot = StageSnapshot {
            tasks: vec![task("t-1", Stage::TechnicalDesign, TaskStatus::Blocked)],
            ..StageSnapshot::default()
        };
        assert!(can_complete_stage(Stage::TechnicalDesign, &snapshot).allowed);
    }

    #[test]
    fn rules_for_other_stages_are_ignored() {
        let snapshot = StageSnapshot {
            tasks: vec![task("t-1", Stage::Procurement, TaskStatus::Todo)],
            workflow_rules: vec![transition_rule(TransitionRequirements {
                require_all_tasks_complete: true,
                ..TransitionRequirements::default()
            })],
            ..StageSnapshot::default()
        };
        assert!(can_complete_stage(Stage::Procurement, &snapshot).allowed);
    }

    #[test]
    fn required_files_must_be_received() {
        let snapshot = StageSnapshot {
            files: vec![
                file("f-1", Some(Stage::TechnicalDesign), FileStatus::Requested),
                file("f-2", Some(Stage::TechnicalDesign), FileStatus::Received),
                file("f-3", None, FileStatus::Pending),
            ],
            workflow_rules: vec![transition_rule(TransitionRequirements {
                require_all_files_uploaded: true,
                ..TransitionRequirements::default()
            })],
            ..StageSnapshot::default()
        };

        let verdict = can_complete_stage(Stage::TechnicalDesign, &snapshot);
        assert_eq!(
            verdict.reasons,
            vec!["1 required file for Technical Design has not been received".to_string()]
        );
    }

    #[test]
    fn document_rule_and_progression_flag_report_separately() {
        let snapshot = StageSnapshot {
            documents: vec![
                document("d-1", Stage::TechnicalDesign, DocumentStatus::Draft, true),
                document("d-2", Stage::TechnicalDesign, DocumentStatus::Rejected, false),
                document("d-3", Stage::TechnicalDesign, DocumentStatus::Approved, true),
            ],
            workflow_rules: vec![transition_rule(TransitionRequirements {
                require_all_documents_approved: true,
                ..TransitionRequirements::default()
            })],
            ..StageSnapshot::default()
        };

        let verdict = can_complete_stage(Stage::TechnicalDesign, &snapshot);
        assert_eq!(verdict.reasons.len(), 2);
        assert!(verdict.reasons[0].starts_with("2 documents in Technical Design are"));
        assert!(verdict.reasons[1].starts_with("1 document required for progression is"));
    }

    #[test]
    fn duplicate_transition_rules_add_one_reason() {
        let requirements =
            TransitionRequirements { require_all_tasks_complete: true, ..Default::default() };
        let snapshot = StageSnapshot {
            tasks: vec![task("t-1", Stage::TechnicalDesign, TaskStatus::Todo)],
            workflow_rules: vec![
                transition_rule(requirements.clone()),
                transition_rule(requirements),
            ],
            ..StageSnapshot::default()
        };
        assert_eq!(can_complete_stage(Stage::TechnicalDesign, &snapshot).reasons.len(), 1);
    }

    #[test]
    fn enabled_approval_rule_blocks_without_any_request() {
        let snapshot = StageSnapshot {
            workflow_rules: vec![
                approval_rule(Some("Principal Designer"), true),
                approval_rule(Some("Client"), false),
            ],
            ..StageSnapshot::default()
        };

        let verdict = can_complete_stage(Stage::Execution, &snapshot);
        assert!(!verdict.allowed);
        assert_eq!(verdict.reasons, vec!["approval required from Principal Designer".to_string()]);
    }

    #[test]
    fn approval_rule_without_role_names_a_generic_approver() {
        let snapshot =
            StageSnapshot { workflow_rules: vec![approval_rule(None, true)], ..Default::default() };
        let verdict = can_complete_stage(Stage::Sales, &snapshot);
        assert_eq!(verdict.reasons, vec!["approval required from an approver".to_string()]);
    }

    #[test]
    fn requests_for_other_stages_do_not_block() {
        let snapshot = StageSnapshot {
            requests: vec![pending_request(Stage::Procurement)],
            ..StageSnapshot::default()
        };
        assert!(can_complete_stage(Stage::TechnicalDesign, &snapshot).allowed);
    }
}
