use serde::{Deserialize, Serialize};

use crate::domain::approval::{ApprovalRequest, ApprovalStatus};
use crate::domain::entity::EntityType;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityApprovalStatus {
    None,
    Pending,
    Approved,
    Rejected,
}

/// Aggregate approval state of one entity across all of its requests.
///
/// A rejection only counts when the rejected request's current level is
/// `required`; non-required rejections are informational.
pub fn approval_status(
    requests: &[ApprovalRequest],
    entity_type: EntityType,
    entity_id: &str,
) -> EntityApprovalStatus {
    let related: Vec<&ApprovalRequest> =
        requests.iter().filter(|request| request.is_for_entity(entity_type, entity_id)).collect();

    let blocking_rejection = related.iter().any(|request| {
        request.status == ApprovalStatus::Rejected
            && request.current_config().is_some_and(|config| config.required)
    });
    if blocking_rejection {
        return EntityApprovalStatus::Rejected;
    }

    if related.iter().any(|request| request.status.is_open()) {
        return EntityApprovalStatus::Pending;
    }

    if related.iter().any(|request| request.status == ApprovalStatus::Approved) {
        return EntityApprovalStatus::Approved;
    }

    EntityApprovalStatus::None
}

#[cfg(test)]
mod tests {
    use super::{approval_status, EntityApprovalStatus};
    use crate::approvals::lifecycle::{
        approve, create_request, delegate, reject, NewApprovalRequest,
    };
    use crate::approvals::resolver::{ApproverResolver, DEFAULT_AVATAR_BASE_URL};
    use crate::domain::approval::{ApprovalRequest, ApprovalStatus, RequestSource};
    use crate::domain::entity::EntityType;
    use crate::domain::stage::Stage;
    use crate::domain::team::TeamMember;
    use crate::test_support::{fixed_time, roster, task_entity, user_step};

    fn request(team: &[TeamMember], entity_id: &str, required: bool) -> ApprovalRequest {
        let resolver = ApproverResolver::new(team, DEFAULT_AVATAR_BASE_URL);
        let mut step = user_step(0, "u-pm");
        step.required = required;
        create_request(
            NewApprovalRequest {
                project_id: "proj-1".to_string(),
                source: RequestSource::Manual,
                rule_id: None,
                entity: task_entity(entity_id, Stage::Design),
                approval_configs: vec![step],
            },
            &team[0],
            &resolver,
            fixed_time(0),
        )
        .expect("create request")
    }

    #[test]
    fn no_requests_means_none() {
        assert_eq!(approval_status(&[], EntityType::Task, "task-1"), EntityApprovalStatus::None);
    }

    #[test]
    fn open_requests_are_pending_and_other_entities_are_ignored() {
        let team = roster();
        let mut other = request(&team, "task-2", true);
        reject(&mut other, &team[2], "no", None, fixed_time(1)).expect("reject");
        let requests = vec![request(&team, "task-1", true), other];

        assert_eq!(
            approval_status(&requests, EntityType::Task, "task-1"),
            EntityApprovalStatus::Pending
        );
        assert_eq!(
            approval_status(&requests, EntityType::Document, "task-1"),
            EntityApprovalStatus::None
        );
    }

    #[test]
    fn delegated_request_counts_as_pending() {
        let team = roster();
        let resolver = ApproverResolver::new(&team, DEFAULT_AVATAR_BASE_URL);
        let mut delegated = request(&team, "task-1", true);
        delegate(&mut delegated, &team[2], "u-admin", &resolver, fixed_time(1)).expect("delegate");
        assert_eq!(delegated.status, ApprovalStatus::Delegated);

        assert_eq!(
            approval_status(&[delegated], EntityType::Task, "task-1"),
            EntityApprovalStatus::Pending
        );
    }

    #[test]
    fn required_rejection_flips_aggregate_to_rejected() {
        let team = roster();
        let mut rejected = request(&team, "task-1", true);
        reject(&mut rejected, &team[2], "finish does not match sample", None, fixed_time(1))
            .expect("reject");
        let requests = vec![rejected, request(&team, "task-1", true)];

        assert_eq!(
            approval_status(&requests, EntityType::Task, "task-1"),
            EntityApprovalStatus::Rejected
        );
    }

    #[test]
    fn non_required_rejection_does_not_flip_aggregate() {
        let team = roster();
        let resolver = ApproverResolver::new(&team, DEFAULT_AVATAR_BASE_URL);
        let mut optional = request(&team, "task-1", false);
        reject(&mut optional, &team[2], "prefer another finish", None, fixed_time(1))
            .expect("reject");
        let mut approved = request(&team, "task-1", true);
        approve(&mut approved, &team[2], None, &resolver, fixed_time(2)).expect("approve");

        let requests = vec![optional.clone(), approved];
        assert_eq!(
            approval_status(&requests, EntityType::Task, "task-1"),
            EntityApprovalStatus::Approved
        );

        let requests = vec![optional, request(&team, "task-1", true)];
        assert_eq!(
            approval_status(&requests, EntityType::Task, "task-1"),
            EntityApprovalStatus::Pending
        );
    }
}
