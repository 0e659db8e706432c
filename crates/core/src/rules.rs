//! Approval rule definitions, persisted per scope.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::approvals::matcher::compile_title_pattern;
use crate::domain::approval::{ApprovalConfig, ApprovalRule, MatchingCriteria, RuleId, RuleScope};
use crate::domain::entity::EntityType;
use crate::errors::{ApplicationError, DomainError};
use crate::store::{keys, load_collection, save_collection, SnapshotStore};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RuleValidationError {
    #[error("approval rule name must not be empty")]
    EmptyName,
    #[error("approval rule `{rule_name}` needs at least one approval level")]
    NoApprovalConfigs { rule_name: String },
    #[error("project-scoped approval rule `{rule_name}` needs a project id")]
    MissingProjectId { rule_name: String },
    #[error("title pattern `{pattern}` is not a valid regular expression: {message}")]
    InvalidTitlePattern { pattern: String, message: String },
    #[error("approval level `{config_id}` targets {found:?} but the rule targets {expected:?}")]
    ConfigEntityMismatch { config_id: String, expected: EntityType, found: EntityType },
}

/// Editable part of a rule; ids and timestamps are owned by the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub scope: RuleScope,
    #[serde(default)]
    pub project_id: Option<String>,
    pub entity_type: EntityType,
    #[serde(default)]
    pub criteria: MatchingCriteria,
    pub approval_configs: Vec<ApprovalConfig>,
    pub auto_apply: bool,
    pub enabled: bool,
}

pub fn validate_rule(draft: &RuleDraft) -> Result<(), RuleValidationError> {
    let name = draft.name.trim();
    if name.is_empty() {
        return Err(RuleValidationError::EmptyName);
    }

    if draft.approval_configs.is_empty() {
        return Err(RuleValidationError::NoApprovalConfigs { rule_name: name.to_string() });
    }

    let missing_project =
        draft.project_id.as_deref().map(str::trim).filter(|id| !id.is_empty()).is_none();
    if draft.scope == RuleScope::Project && missing_project {
        return Err(RuleValidationError::MissingProjectId { rule_name: name.to_string() });
    }

    if let Some(pattern) = draft.criteria.title_pattern.as_deref().filter(|p| !p.trim().is_empty())
    {
        compile_title_pattern(pattern).map_err(|error| {
            RuleValidationError::InvalidTitlePattern {
                pattern: pattern.to_string(),
                message: error.to_string(),
            }
        })?;
    }

    if let Some(config) =
        draft.approval_configs.iter().find(|config| config.entity_type != draft.entity_type)
    {
        return Err(RuleValidationError::ConfigEntityMismatch {
            config_id: config.id.clone(),
            expected: draft.entity_type,
            found: config.entity_type,
        });
    }

    Ok(())
}

fn scope_key(scope: RuleScope) -> &'static str {
    match scope {
        RuleScope::Global => keys::GLOBAL_RULES,
        RuleScope::Project => keys::PROJECT_RULES,
    }
}

pub struct RuleStore<S> {
    store: S,
}

impl<S> RuleStore<S>
where
    S: SnapshotStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn list(&self, scope: RuleScope) -> Result<Vec<ApprovalRule>, ApplicationError> {
        Ok(load_collection(&self.store, scope_key(scope)).await?)
    }

    pub async fn list_for_project(
        &self,
        project_id: &str,
    ) -> Result<Vec<ApprovalRule>, ApplicationError> {
        let rules = self.list(RuleScope::Project).await?;
        Ok(rules
            .into_iter()
            .filter(|rule| rule.project_id.as_deref() == Some(project_id))
            .collect())
    }

    /// Enabled global rules followed by the project's own enabled rules.
    pub async fn active_rules_for(
        &self,
        project_id: &str,
        entity_type: EntityType,
    ) -> Result<Vec<ApprovalRule>, ApplicationError> {
        let mut rules = self.list(RuleScope::Global).await?;
        rules.extend(self.list_for_project(project_id).await?);
        rules.retain(|rule| rule.enabled && rule.entity_type == entity_type);
        Ok(rules)
    }

    pub async fn create(&self, draft: RuleDraft) -> Result<ApprovalRule, ApplicationError> {
        validate_rule(&draft)?;
        let now = Utc::now();
        let rule = ApprovalRule {
            id: RuleId::generate(),
            name: draft.name.trim().to_string(),
            description: draft.description,
            scope: draft.scope,
            project_id: scoped_project_id(draft.scope, draft.project_id),
            entity_type: draft.entity_type,
            criteria: draft.criteria,
            approval_configs: draft.approval_configs,
            auto_apply: draft.auto_apply,
            enabled: draft.enabled,
            created_at: now,
            updated_at: now,
        };

        let key = scope_key(rule.scope);
        let mut rules: Vec<ApprovalRule> = load_collection(&self.store, key).await?;
        rules.push(rule.clone());
        save_collection(&self.store, key, &rules).await?;

        tracing::info!(
            event_name = "approval.rule.created",
            rule_id = %rule.id.0,
            scope = ?rule.scope,
            entity_type = rule.entity_type.as_str(),
            "approval rule created"
        );
        Ok(rule)
    }

    /// Replaces a rule's editable fields. Requests created earlier keep their
    /// own copy of the approval levels.
    pub async fn update(
        &self,
        rule_id: &RuleId,
        draft: RuleDraft,
    ) -> Result<ApprovalRule, ApplicationError> {
        validate_rule(&draft)?;
        let (scope, mut rules, index) = self.locate(rule_id).await?;
        let existing = rules.remove(index);
        let updated = ApprovalRule {
            id: existing.id,
            name: draft.name.trim().to_string(),
            description: draft.description,
            scope: draft.scope,
            project_id: scoped_project_id(draft.scope, draft.project_id),
            entity_type: draft.entity_type,
            criteria: draft.criteria,
            approval_configs: draft.approval_configs,
            auto_apply: draft.auto_apply,
            enabled: draft.enabled,
            created_at: existing.created_at,
            updated_at: Utc::now(),
        };

        if scope == updated.scope {
            rules.insert(index, updated.clone());
            save_collection(&self.store, scope_key(scope), &rules).await?;
        } else {
            save_collection(&self.store, scope_key(scope), &rules).await?;
            let target_key = scope_key(updated.scope);
            let mut target: Vec<ApprovalRule> = load_collection(&self.store, target_key).await?;
            target.push(updated.clone());
            save_collection(&self.store, target_key, &target).await?;
        }

        tracing::info!(
            event_name = "approval.rule.updated",
            rule_id = %updated.id.0,
            scope = ?updated.scope,
            "approval rule updated"
        );
        Ok(updated)
    }

    pub async fn delete(&self, rule_id: &RuleId) -> Result<ApprovalRule, ApplicationError> {
        let (scope, mut rules, index) = self.locate(rule_id).await?;
        let removed = rules.remove(index);
        save_collection(&self.store, scope_key(scope), &rules).await?;

        tracing::info!(
            event_name = "approval.rule.deleted",
            rule_id = %removed.id.0,
            "approval rule deleted"
        );
        Ok(removed)
    }

    pub async fn set_enabled(
        &self,
        rule_id: &RuleId,
        enabled: bool,
    ) -> Result<ApprovalRule, ApplicationError> {
        let (scope, mut rules, index) = self.locate(rule_id).await?;
        let rule = &mut rules[index];
        rule.enabled = enabled;
        rule.updated_at = Utc::now();
        let toggled = rule.clone();
        save_collection(&self.store, scope_key(scope), &rules).await?;

        tracing::info!(
            event_name = "approval.rule.toggled",
            rule_id = %toggled.id.0,
            enabled,
            "approval rule toggled"
        );
        Ok(toggled)
    }

    async fn locate(
        &self,
        rule_id: &RuleId,
    ) -> Result<(RuleScope, Vec<ApprovalRule>, usize), ApplicationError> {
        for scope in [RuleScope::Global, RuleScope::Project] {
            let rules = self.list(scope).await?;
            if let Some(index) = rules.iter().position(|rule| &rule.id == rule_id) {
                return Ok((scope, rules, index));
            }
        }

        Err(DomainError::RuleNotFound { rule_id: rule_id.0.clone() }.into())
    }
}

fn scoped_project_id(scope: RuleScope, project_id: Option<String>) -> Option<String> {
    match scope {
        RuleScope::Global => None,
        RuleScope::Project => project_id.map(|id| id.trim().to_string()),
    }
}
