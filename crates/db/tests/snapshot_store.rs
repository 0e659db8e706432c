use studioflow_core::approvals::{ActionContext, ApprovalService};
use studioflow_core::audit::InMemoryAuditSink;
use studioflow_core::domain::approval::{
    ApprovalConfig, ApprovalStatus, ApproverType, MatchingCriteria, RuleScope,
};
use studioflow_core::domain::entity::{ApprovalEntity, EntityType, TaskPriority};
use studioflow_core::domain::stage::Stage;
use studioflow_core::domain::team::TeamMember;
use studioflow_core::rules::{RuleDraft, RuleStore};
use studioflow_db::migrations::run_pending;
use studioflow_db::{connect_with_settings, SqliteSnapshotStore};
use tempfile::TempDir;

fn roster() -> Vec<TeamMember> {
    vec![
        TeamMember::new("u-lead", "Lee Lead", "Design Head", "https://avatars.test/lee.png"),
        TeamMember::new("u-pm", "Pat Manager", "Project Manager", "https://avatars.test/pat.png"),
    ]
}

fn level(sequence_order: u32, approver_type: ApproverType) -> ApprovalConfig {
    ApprovalConfig {
        id: format!("lvl-{sequence_order}"),
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

async fn file_store(dir: &TempDir) -> SqliteSnapshotStore {
    let url = format!("sqlite://{}", dir.path().join("studioflow.db").display());
    let pool = connect_with_settings(&url, 2, 30).await.expect("connect");
    run_pending(&pool).await.expect("migrate");
    SqliteSnapshotStore::new(pool)
}

#[tokio::test]
async fn approval_chain_survives_reopening_the_database() {
    let dir = TempDir::new().expect("tempdir");
    let roster = roster();
    let ctx = ActionContext::new(roster[0].clone(), roster.clone());
    let entity = ApprovalEntity::Task {
        id: "t-1".to_string(),
        title: "Kitchen elevation drawings".to_string(),
        stage: Stage::Design,
        priority: TaskPriority::Urgent,
    };

    let request_id = {
        let store = file_store(&dir).await;
        let rules = RuleStore::new(store.clone());
        let rule = rules
            .create(RuleDraft {
                name: "Urgent design tasks".to_string(),
                description: None,
                scope: RuleScope::Global,
                project_id: None,
                entity_type: EntityType::Task,
                criteria: MatchingCriteria {
                    priorities: vec![TaskPriority::Urgent],
                    ..MatchingCriteria::default()
                },
                approval_configs: vec![
                    level(0, ApproverType::DepartmentHead),
                    level(1, ApproverType::ProjectManager),
                ],
                auto_apply: true,
                enabled: true,
            })
            .await
            .expect("create rule");

        let service =
            ApprovalService::new(store.clone(), InMemoryAuditSink::default(), "https://avatars.test/");
        let created =
            service.request_approvals(&ctx, "proj-1", &entity, &[rule]).await.expect("request");
        assert_eq!(created.len(), 1);
        service.approve(&ctx, "proj-1", &created[0].id, Some("looks right")).await.expect("approve");
        created[0].id.clone()
    };

    let store = file_store(&dir).await;
    let service = ApprovalService::new(store, InMemoryAuditSink::default(), "https://avatars.test/");
    let reloaded = service.get_request("proj-1", &request_id).await.expect("reload");

    assert_eq!(reloaded.status, ApprovalStatus::Pending);
    assert_eq!(reloaded.current_approval_level, 1);
    assert_eq!(reloaded.assigned_to.id, "u-pm");
    assert_eq!(reloaded.history.len(), 3);
    assert_eq!(reloaded.comments.len(), 1);

    let rules = RuleStore::new(file_store(&dir).await);
    assert_eq!(rules.list(RuleScope::Global).await.expect("rules").len(), 1);
}
