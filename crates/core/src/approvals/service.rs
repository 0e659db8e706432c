use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::approvals::lifecycle::{self, LifecycleError, NewApprovalRequest};
use crate::approvals::matcher::match_rules;
use crate::approvals::resolver::ApproverResolver;
use crate::approvals::status::{approval_status, EntityApprovalStatus};
use crate::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::approval::{
    ApprovalConfig, ApprovalId, ApprovalRequest, ApprovalRule, RequestSource, RuleScope,
};
use crate::domain::entity::{ApprovalEntity, EntityType};
use crate::domain::team::TeamMember;
use crate::errors::ApplicationError;
use crate::store::{keys, load_collection, save_collection, SnapshotStore};

/// Who is acting, against which roster, under which correlation id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionContext {
    pub actor: TeamMember,
    pub roster: Vec<TeamMember>,
    pub correlation_id: String,
}

impl ActionContext {
    pub fn new(actor: TeamMember, roster: Vec<TeamMember>) -> Self {
        Self { actor, roster, correlation_id: Uuid::new_v4().to_string() }
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }
}

/// Approval request repository for one store. Each mutation loads the
/// project's request collection, applies one lifecycle transition and writes
/// the whole collection back; the last write wins.
pub struct ApprovalService<S, A> {
    store: S,
    audit: A,
    avatar_base_url: String,
}

impl<S, A> ApprovalService<S, A>
where
    S: SnapshotStore,
    A: AuditSink,
{
    pub fn new(store: S, audit: A, avatar_base_url: impl Into<String>) -> Self {
        Self { store, audit, avatar_base_url: avatar_base_url.into() }
    }

    pub async fn list_requests(
        &self,
        project_id: &str,
    ) -> Result<Vec<ApprovalRequest>, ApplicationError> {
        Ok(load_collection(&self.store, &keys::approval_requests(project_id)).await?)
    }

    pub async fn get_request(
        &self,
        project_id: &str,
        request_id: &ApprovalId,
    ) -> Result<ApprovalRequest, ApplicationError> {
        self.list_requests(project_id)
            .await?
            .into_iter()
            .find(|request| &request.id == request_id)
            .ok_or_else(|| LifecycleError::request_not_found(request_id).into())
    }

    pub async fn requests_for_entity(
        &self,
        project_id: &str,
        entity_type: EntityType,
        entity_id: &str,
    ) -> Result<Vec<ApprovalRequest>, ApplicationError> {
        let mut requests = self.list_requests(project_id).await?;
        requests.retain(|request| request.is_for_entity(entity_type, entity_id));
        Ok(requests)
    }

    /// Open requests currently assigned to `user_id`.
    pub async fn open_requests_for_assignee(
        &self,
        project_id: &str,
        user_id: &str,
    ) -> Result<Vec<ApprovalRequest>, ApplicationError> {
        let mut requests = self.list_requests(project_id).await?;
        requests.retain(|request| request.status.is_open() && request.assigned_to.id == user_id);
        Ok(requests)
    }

    pub async fn approval_status(
        &self,
        project_id: &str,
        entity_type: EntityType,
        entity_id: &str,
    ) -> Result<EntityApprovalStatus, ApplicationError> {
        let requests = self.list_requests(project_id).await?;
        Ok(approval_status(&requests, entity_type, entity_id))
    }

    /// Creates one request per auto-apply rule that matches `entity`. Rules
    /// that already have an open request for the entity are skipped.
    pub async fn request_approvals(
        &self,
        ctx: &ActionContext,
        project_id: &str,
        entity: &ApprovalEntity,
        rules: &[ApprovalRule],
    ) -> Result<Vec<ApprovalRequest>, ApplicationError> {
        let key = keys::approval_requests(project_id);
        let mut requests: Vec<ApprovalRequest> = load_collection(&self.store, &key).await?;
        let applicable: Vec<ApprovalRule> = rules
            .iter()
            .filter(|rule| rule.enabled && rule.auto_apply && rule_covers(rule, project_id))
            .cloned()
            .collect();

        let resolver = ApproverResolver::new(&ctx.roster, &self.avatar_base_url);
        let now = Utc::now();
        let mut created = Vec::new();
        for rule in match_rules(entity, &applicable) {
            let already_open = requests.iter().any(|request| {
                request.status.is_open()
                    && request.rule_id.as_ref() == Some(&rule.id)
                    && request.is_for_entity(entity.entity_type(), entity.id())
            });
            if already_open {
                tracing::debug!(
                    event_name = "approval.request.skipped_duplicate",
                    correlation_id = %ctx.correlation_id,
                    project_id,
                    rule_id = %rule.id.0,
                    entity_id = entity.id(),
                    "open approval request already exists for rule"
                );
                continue;
            }

            let request = lifecycle::create_request(
                NewApprovalRequest {
                    project_id: project_id.to_string(),
                    source: RequestSource::from(rule.scope),
                    rule_id: Some(rule.id.clone()),
                    entity: entity.clone(),
                    approval_configs: rule.approval_configs.clone(),
                },
                &ctx.actor,
                &resolver,
                now,
            )?;
            created.push(request);
        }

        if created.is_empty() {
            return Ok(created);
        }

        requests.extend(created.iter().cloned());
        save_collection(&self.store, &key, &requests).await?;
        for request in &created {
            let rule_id = request.rule_id.as_ref().map_or("", |id| id.0.as_str());
            self.audit.emit(
                self.record(ctx, project_id, Some(request), "approval.requested", AuditOutcome::Success)
                    .with_metadata("rule_id", rule_id),
            );
        }
        Ok(created)
    }

    pub async fn create_manual_request(
        &self,
        ctx: &ActionContext,
        project_id: &str,
        entity: &ApprovalEntity,
        approval_configs: Vec<ApprovalConfig>,
    ) -> Result<ApprovalRequest, ApplicationError> {
        let key = keys::approval_requests(project_id);
        let mut requests: Vec<ApprovalRequest> = load_collection(&self.store, &key).await?;
        let resolver = ApproverResolver::new(&ctx.roster, &self.avatar_base_url);

        let request = lifecycle::create_request(
            NewApprovalRequest {
                project_id: project_id.to_string(),
                source: RequestSource::Manual,
                rule_id: None,
                entity: entity.clone(),
                approval_configs,
            },
            &ctx.actor,
            &resolver,
            Utc::now(),
        );
        let request = match request {
            Ok(request) => request,
            Err(error) => {
                self.audit.emit(
                    self.record(ctx, project_id, None, "approval.requested", AuditOutcome::Rejected)
                        .with_metadata("error", error.to_string()),
                );
                return Err(error.into());
            }
        };

        requests.push(request.clone());
        save_collection(&self.store, &key, &requests).await?;
        self.audit.emit(
            self.record(ctx, project_id, Some(&request), "approval.requested", AuditOutcome::Success)
                .with_metadata("source", "manual"),
        );
        Ok(request)
    }

    pub async fn approve(
        &self,
        ctx: &ActionContext,
        project_id: &str,
        request_id: &ApprovalId,
        comment: Option<&str>,
    ) -> Result<ApprovalRequest, ApplicationError> {
        self.transition(ctx, project_id, request_id, "approval.approved", |request, resolver, now| {
            lifecycle::approve(request, &ctx.actor, comment, resolver, now)
        })
        .await
    }

    pub async fn reject(
        &self,
        ctx: &ActionContext,
        project_id: &str,
        request_id: &ApprovalId,
        reason: &str,
        comment: Option<&str>,
    ) -> Result<ApprovalRequest, ApplicationError> {
        self.transition(ctx, project_id, request_id, "approval.rejected", |request, _, now| {
            lifecycle::reject(request, &ctx.actor, reason, comment, now)
        })
        .await
    }

    pub async fn delegate(
        &self,
        ctx: &ActionContext,
        project_id: &str,
        request_id: &ApprovalId,
        to_user_id: &str,
    ) -> Result<ApprovalRequest, ApplicationError> {
        self.transition(ctx, project_id, request_id, "approval.delegated", |request, resolver, now| {
            lifecycle::delegate(request, &ctx.actor, to_user_id, resolver, now)
        })
        .await
    }

    pub async fn comment(
        &self,
        ctx: &ActionContext,
        project_id: &str,
        request_id: &ApprovalId,
        text: &str,
    ) -> Result<ApprovalRequest, ApplicationError> {
        self.transition(ctx, project_id, request_id, "approval.commented", |request, _, now| {
            lifecycle::add_comment(request, &ctx.actor, text, now)
        })
        .await
    }

    pub async fn delete_comment(
        &self,
        ctx: &ActionContext,
        project_id: &str,
        request_id: &ApprovalId,
        comment_id: &str,
    ) -> Result<ApprovalRequest, ApplicationError> {
        self.transition(ctx, project_id, request_id, "approval.comment_deleted", |request, _, now| {
            lifecycle::delete_comment(request, &ctx.actor, comment_id, now)
        })
        .await
    }

    pub async fn remind(
        &self,
        ctx: &ActionContext,
        project_id: &str,
        request_id: &ApprovalId,
    ) -> Result<ApprovalRequest, ApplicationError> {
        self.transition(ctx, project_id, request_id, "approval.reminded", |request, _, now| {
            lifecycle::remind(request, &ctx.actor, now)
        })
        .await
    }

    pub async fn expire(
        &self,
        ctx: &ActionContext,
        project_id: &str,
        request_id: &ApprovalId,
    ) -> Result<ApprovalRequest, ApplicationError> {
        self.transition(ctx, project_id, request_id, "approval.expired", |request, _, now| {
            lifecycle::expire(request, &ctx.actor, now)
        })
        .await
    }

    async fn transition<F>(
        &self,
        ctx: &ActionContext,
        project_id: &str,
        request_id: &ApprovalId,
        event_type: &'static str,
        apply: F,
    ) -> Result<ApprovalRequest, ApplicationError>
    where
        F: FnOnce(
            &mut ApprovalRequest,
            &ApproverResolver<'_>,
            DateTime<Utc>,
        ) -> Result<(), LifecycleError>,
    {
        let key = keys::approval_requests(project_id);
        let mut requests: Vec<ApprovalRequest> = load_collection(&self.store, &key).await?;
        let Some(index) = requests.iter().position(|request| &request.id == request_id) else {
            let error = LifecycleError::request_not_found(request_id);
            self.audit.emit(
                self.record(ctx, project_id, None, event_type, AuditOutcome::Rejected)
                    .with_metadata("request_id", request_id.0.clone())
                    .with_metadata("error", error.to_string()),
            );
            return Err(error.into());
        };

        let resolver = ApproverResolver::new(&ctx.roster, &self.avatar_base_url);
        let mut updated = requests[index].clone();
        if let Err(error) = apply(&mut updated, &resolver, Utc::now()) {
            self.audit.emit(
                self.record(ctx, project_id, Some(&updated), event_type, AuditOutcome::Rejected)
                    .with_metadata("error", error.to_string()),
            );
            return Err(error.into());
        }

        requests[index] = updated.clone();
        if let Err(error) = save_collection(&self.store, &key, &requests).await {
            self.audit.emit(
                self.record(ctx, project_id, Some(&updated), event_type, AuditOutcome::Failed)
                    .with_metadata("error", error.to_string()),
            );
            return Err(error.into());
        }

        self.audit.emit(self.record(
            ctx,
            project_id,
            Some(&updated),
            event_type,
            AuditOutcome::Success,
        ));
        Ok(updated)
    }

    fn record(
        &self,
        ctx: &ActionContext,
        project_id: &str,
        request: Option<&ApprovalRequest>,
        event_type: &str,
        outcome: AuditOutcome,
    ) -> AuditEvent {
        let event = AuditEvent::new(
            Some(project_id.to_string()),
            request.map(|request| request.id.0.clone()),
            ctx.correlation_id.clone(),
            event_type,
            AuditCategory::Approval,
            ctx.actor.id.clone(),
            outcome,
        );

        match request {
            Some(request) => event
                .with_metadata("status", request.status.as_str())
                .with_metadata("level", request.current_approval_level.to_string())
                .with_metadata("assigned_to", request.assigned_to.id.clone()),
            None => event,
        }
    }
}

fn rule_covers(rule: &ApprovalRule, project_id: &str) -> bool {
    match rule.scope {
        RuleScope::Global => true,
        RuleScope::Project => rule.project_id.as_deref() == Some(project_id),
    }
}
