//! State transitions for a single approval request.
//!
//! Every function here is pure over the request it is handed: callers own
//! loading and persisting the surrounding collection. A failed transition
//! leaves the request untouched.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::approvals::resolver::ApproverResolver;
use crate::domain::approval::{
    ApprovalComment, ApprovalConfig, ApprovalHistoryEntry, ApprovalId, ApprovalRequest,
    ApprovalStatus, HistoryAction, RequestSource, RuleId,
};
use crate::domain::entity::ApprovalEntity;
use crate::domain::team::TeamMember;

pub const NEXT_LEVEL_NOTE: &str = "moved to next level";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("{kind} `{id}` was not found")]
    NotFound { kind: &'static str, id: String },
    #[error("user `{actor_id}` is not allowed to {action}")]
    Unauthorized { actor_id: String, action: &'static str },
    #[error("validation failed: {0}")]
    ValidationFailed(String),
    #[error("cannot {action} approval request `{request_id}` while it is {status:?}")]
    InvalidState { request_id: String, status: ApprovalStatus, action: &'static str },
}

impl LifecycleError {
    pub fn request_not_found(request_id: &ApprovalId) -> Self {
        Self::NotFound { kind: "approval request", id: request_id.0.clone() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewApprovalRequest {
    pub project_id: String,
    pub source: RequestSource,
    pub rule_id: Option<RuleId>,
    pub entity: ApprovalEntity,
    pub approval_configs: Vec<ApprovalConfig>,
}

pub fn create_request(
    new_request: NewApprovalRequest,
    requester: &TeamMember,
    resolver: &ApproverResolver<'_>,
    now: DateTime<Utc>,
) -> Result<ApprovalRequest, LifecycleError> {
    let NewApprovalRequest { project_id, source, rule_id, entity, mut approval_configs } =
        new_request;

    if approval_configs.is_empty() {
        return Err(LifecycleError::ValidationFailed(
            "an approval request needs at least one approval level".to_string(),
        ));
    }
    approval_configs.sort_by_key(|config| config.sequence_order);
    let assigned_to = resolver.resolve(&approval_configs[0]);

    Ok(ApprovalRequest {
        id: ApprovalId::generate(),
        project_id,
        source,
        rule_id,
        entity_type: entity.entity_type(),
        entity_id: entity.id().to_string(),
        entity_name: entity.title().to_string(),
        stage: Some(entity.stage()),
        status: ApprovalStatus::Pending,
        current_approval_level: 0,
        approval_configs,
        requested_by: requester.clone(),
        assigned_to,
        approved_by: None,
        approved_at: None,
        rejected_by: None,
        rejected_at: None,
        rejection_reason: None,
        delegated_to: None,
        delegated_at: None,
        comments: Vec::new(),
        reminder_count: 0,
        last_reminder_at: None,
        expired_at: None,
        history: vec![ApprovalHistoryEntry::new(HistoryAction::Requested, requester, now, None)],
        created_at: now,
        updated_at: now,
    })
}

/// Approves the current level. Advances to the next level when one remains,
/// otherwise finalizes the request as approved.
pub fn approve(
    request: &mut ApprovalRequest,
    actor: &TeamMember,
    comment: Option<&str>,
    resolver: &ApproverResolver<'_>,
    now: DateTime<Utc>,
) -> Result<(), LifecycleError> {
    ensure_open(request, "approve")?;
    let comment = non_blank(comment);
    let requires_comment = request.current_config().is_some_and(|config| config.require_comment);
    if requires_comment && comment.is_none() {
        return Err(LifecycleError::ValidationFailed(format!(
            "approval level {} requires a comment",
            request.current_approval_level + 1
        )));
    }

    if let Some(text) = comment {
        request.comments.push(ApprovalComment::new(actor, text, now));
    }
    request.history.push(ApprovalHistoryEntry::new(
        HistoryAction::Approved,
        actor,
        now,
        Some(level_note(request.current_approval_level, comment)),
    ));

    let next_level = request.current_approval_level + 1;
    if let Some(next_config) = request.approval_configs.get(next_level) {
        request.assigned_to = resolver.resolve(next_config);
        request.current_approval_level = next_level;
        request.status = ApprovalStatus::Pending;
        request.history.push(ApprovalHistoryEntry::new(
            HistoryAction::Delegated,
            actor,
            now,
            Some(format!("{NEXT_LEVEL_NOTE}: assigned to {}", request.assigned_to.name)),
        ));
    } else {
        request.status = ApprovalStatus::Approved;
        request.approved_by = Some(actor.clone());
        request.approved_at = Some(now);
    }

    request.updated_at = now;
    Ok(())
}

/// Rejects the request. Rejection at any level ends the whole chain.
pub fn reject(
    request: &mut ApprovalRequest,
    actor: &TeamMember,
    reason: &str,
    comment: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(), LifecycleError> {
    ensure_open(request, "reject")?;
    let Some(reason) = non_blank(Some(reason)) else {
        return Err(LifecycleError::ValidationFailed("a rejection reason is required".to_string()));
    };

    if let Some(text) = non_blank(comment) {
        request.comments.push(ApprovalComment::new(actor, text, now));
    }
    request.history.push(ApprovalHistoryEntry::new(
        HistoryAction::Rejected,
        actor,
        now,
        Some(reason.to_string()),
    ));
    request.status = ApprovalStatus::Rejected;
    request.rejected_by = Some(actor.clone());
    request.rejected_at = Some(now);
    request.rejection_reason = Some(reason.to_string());
    request.updated_at = now;
    Ok(())
}

pub fn delegate(
    request: &mut ApprovalRequest,
    actor: &TeamMember,
    to_user_id: &str,
    resolver: &ApproverResolver<'_>,
    now: DateTime<Utc>,
) -> Result<(), LifecycleError> {
    ensure_open(request, "delegate")?;
    let Some(to_user_id) = non_blank(Some(to_user_id)) else {
        return Err(LifecycleError::ValidationFailed("a delegate must be selected".to_string()));
    };
    if request.current_config().is_some_and(|config| !config.allow_delegation) {
        return Err(LifecycleError::ValidationFailed(format!(
            "approval level {} does not allow delegation",
            request.current_approval_level + 1
        )));
    }
    let Some(delegate_to) = resolver.find_member(to_user_id) else {
        return Err(LifecycleError::ValidationFailed(format!(
            "delegate `{to_user_id}` is not a member of the project team"
        )));
    };

    request.history.push(ApprovalHistoryEntry::new(
        HistoryAction::Delegated,
        actor,
        now,
        Some(format!("delegated to {}", delegate_to.name)),
    ));
    request.assigned_to = delegate_to.clone();
    request.delegated_to = Some(delegate_to.clone());
    request.delegated_at = Some(now);
    request.status = ApprovalStatus::Delegated;
    request.updated_at = now;
    Ok(())
}

/// Comments are accepted in every status and never change it.
pub fn add_comment(
    request: &mut ApprovalRequest,
    actor: &TeamMember,
    text: &str,
    now: DateTime<Utc>,
) -> Result<(), LifecycleError> {
    let Some(text) = non_blank(Some(text)) else {
        return Err(LifecycleError::ValidationFailed("comment text is required".to_string()));
    };

    request.comments.push(ApprovalComment::new(actor, text, now));
    request.history.push(ApprovalHistoryEntry::new(
        HistoryAction::Commented,
        actor,
        now,
        Some(text.to_string()),
    ));
    request.updated_at = now;
    Ok(())
}

/// Removes a comment written by `actor`. History keeps the original
/// `commented` entry.
pub fn delete_comment(
    request: &mut ApprovalRequest,
    actor: &TeamMember,
    comment_id: &str,
    now: DateTime<Utc>,
) -> Result<(), LifecycleError> {
    let Some(index) = request.comments.iter().position(|comment| comment.id == comment_id) else {
        return Err(LifecycleError::NotFound { kind: "comment", id: comment_id.to_string() });
    };
    if request.comments[index].author.id != actor.id {
        return Err(LifecycleError::Unauthorized {
            actor_id: actor.id.clone(),
            action: "delete another user's comment",
        });
    }

    request.comments.remove(index);
    request.updated_at = now;
    Ok(())
}

pub fn remind(
    request: &mut ApprovalRequest,
    actor: &TeamMember,
    now: DateTime<Utc>,
) -> Result<(), LifecycleError> {
    ensure_open(request, "remind")?;

    request.reminder_count += 1;
    request.last_reminder_at = Some(now);
    request.history.push(ApprovalHistoryEntry::new(
        HistoryAction::Reminded,
        actor,
        now,
        Some(format!("reminder {} sent to {}", request.reminder_count, request.assigned_to.name)),
    ));
    request.updated_at = now;
    Ok(())
}

pub fn expire(
    request: &mut ApprovalRequest,
    actor: &TeamMember,
    now: DateTime<Utc>,
) -> Result<(), LifecycleError> {
    ensure_open(request, "expire")?;

    request.status = ApprovalStatus::Expired;
    request.expired_at = Some(now);
    request.history.push(ApprovalHistoryEntry::new(HistoryAction::Expired, actor, now, None));
    request.updated_at = now;
    Ok(())
}

fn ensure_open(request: &ApprovalRequest, action: &'static str) -> Result<(), LifecycleError> {
    if request.status.is_open() {
        Ok(())
    } else {
        Err(LifecycleError::InvalidState {
            request_id: request.id.0.clone(),
            status: request.status,
            action,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn level_note(level: usize, comment: Option<&str>) -> String {
    match comment {
        Some(comment) => format!("level {} approved: {comment}", level + 1),
        None => format!("level {} approved", level + 1),
    }
}
