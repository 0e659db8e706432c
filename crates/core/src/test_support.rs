use chrono::{DateTime, TimeZone, Utc};

use crate::domain::approval::{ApprovalConfig, ApproverType};
use crate::domain::entity::{ApprovalEntity, EntityType, TaskPriority};
use crate::domain::stage::Stage;
use crate::domain::team::TeamMember;

pub(crate) fn member(id: &str, name: &str, role: &str) -> TeamMember {
    TeamMember::new(id, name, role, format!("https://avatars.example.test/{id}.png"))
}

pub(crate) fn roster() -> Vec<TeamMember> {
    vec![
        member("u-site", "Sam Site", "Site Supervisor"),
        member("u-design-head", "Dana Head", "Design Head"),
        member("u-pm", "Priya Manager", "Project Manager"),
        member("u-admin", "Alex Admin", "Admin"),
    ]
}

pub(crate) fn config(sequence_order: u32, approver_type: ApproverType) -> ApprovalConfig {
    ApprovalConfig {
        id: format!("cfg-{sequence_order}"),
        entity_type: EntityType::Task,
        approver_type,
        approver_role: None,
        approver_user_id: None,
        required: true,
        allow_delegation: true,
        require_comment: false,
        notify_on_request: true,
        send_reminders: false,
        sequence_order,
    }
}

pub(crate) fn user_step(sequence_order: u32, user_id: &str) -> ApprovalConfig {
    ApprovalConfig {
        approver_user_id: Some(user_id.to_string()),
        ..config(sequence_order, ApproverType::SpecificUser)
    }
}

pub(crate) fn task_entity(id: &str, stage: Stage) -> ApprovalEntity {
    ApprovalEntity::Task {
        id: id.to_string(),
        title: format!("Task {id}"),
        stage,
        priority: TaskPriority::High,
    }
}

pub(crate) fn fixed_time(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, minute, 0).single().unwrap_or_else(Utc::now)
}
