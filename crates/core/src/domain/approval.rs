use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entity::{EntityType, TaskPriority};
use crate::domain::stage::Stage;
use crate::domain::team::TeamMember;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApprovalId(pub String);

impl ApprovalId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleId(pub String);

impl RuleId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApproverType {
    DepartmentHead,
    ProjectManager,
    Admin,
    SpecificUser,
    Client,
    External,
}

/// One step of an approval chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalConfig {
    pub id: String,
    pub entity_type: EntityType,
    pub approver_type: ApproverType,
    #[serde(default)]
    pub approver_role: Option<String>,
    #[serde(default)]
    pub approver_user_id: Option<String>,
    pub required: bool,
    pub allow_delegation: bool,
    pub require_comment: bool,
    #[serde(default)]
    pub notify_on_request: bool,
    #[serde(default)]
    pub send_reminders: bool,
    pub sequence_order: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleScope {
    Global,
    Project,
}

/// Criteria sets for a rule. An empty set places no constraint on its
/// dimension.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingCriteria {
    #[serde(default)]
    pub stages: Vec<Stage>,
    #[serde(default)]
    pub priorities: Vec<TaskPriority>,
    #[serde(default)]
    pub document_categories: Vec<String>,
    #[serde(default)]
    pub title_pattern: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRule {
    pub id: RuleId,
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
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestSource {
    Template,
    GlobalRule,
    ProjectRule,
    Manual,
}

impl From<RuleScope> for RequestSource {
    fn from(scope: RuleScope) -> Self {
        match scope {
            RuleScope::Global => Self::GlobalRule,
            RuleScope::Project => Self::ProjectRule,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
    Delegated,
}

impl ApprovalStatus {
    /// Pending and delegated requests still accept approve/reject/delegate.
    pub fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::Delegated)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
            Self::Delegated => "delegated",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Requested,
    Approved,
    Rejected,
    Delegated,
    Reminded,
    Expired,
    Commented,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalHistoryEntry {
    pub id: String,
    pub action: HistoryAction,
    pub actor: TeamMember,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub note: Option<String>,
}

impl ApprovalHistoryEntry {
    pub fn new(
        action: HistoryAction,
        actor: &TeamMember,
        timestamp: DateTime<Utc>,
        note: Option<String>,
    ) -> Self {
        Self { id: Uuid::new_v4().to_string(), action, actor: actor.clone(), timestamp, note }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalComment {
    pub id: String,
    pub author: TeamMember,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl ApprovalComment {
    pub fn new(author: &TeamMember, text: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self { id: Uuid::new_v4().to_string(), author: author.clone(), text: text.into(), created_at }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: ApprovalId,
    pub project_id: String,
    pub source: RequestSource,
    #[serde(default)]
    pub rule_id: Option<RuleId>,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub entity_name: String,
    #[serde(default)]
    pub stage: Option<Stage>,
    pub status: ApprovalStatus,
    pub current_approval_level: usize,
    pub approval_configs: Vec<ApprovalConfig>,
    pub requested_by: TeamMember,
    pub assigned_to: TeamMember,
    #[serde(default)]
    pub approved_by: Option<TeamMember>,
    #[serde(default)]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rejected_by: Option<TeamMember>,
    #[serde(default)]
    pub rejected_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub delegated_to: Option<TeamMember>,
    #[serde(default)]
    pub delegated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub comments: Vec<ApprovalComment>,
    #[serde(default)]
    pub reminder_count: u32,
    #[serde(default)]
    pub last_reminder_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expired_at: Option<DateTime<Utc>>,
    pub history: Vec<ApprovalHistoryEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApprovalRequest {
    pub fn current_config(&self) -> Option<&ApprovalConfig> {
        self.approval_configs.get(self.current_approval_level)
    }

    pub fn is_for_entity(&self, entity_type: EntityType, entity_id: &str) -> bool {
        self.entity_type == entity_type && self.entity_id == entity_id
    }
}
