use serde::{Deserialize, Serialize};

use crate::domain::stage::Stage;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowRuleType {
    StageTransition,
    Approval,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRequirements {
    #[serde(default)]
    pub require_all_tasks_complete: bool,
    #[serde(default)]
    pub require_all_files_uploaded: bool,
    #[serde(default)]
    pub require_all_documents_approved: bool,
}

/// Stage-level workflow rule consulted by the workflow gate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRule {
    pub id: String,
    pub name: String,
    pub rule_type: WorkflowRuleType,
    /// Empty means the rule applies to every stage.
    #[serde(default)]
    pub stages: Vec<Stage>,
    pub enabled: bool,
    #[serde(default)]
    pub requirements: TransitionRequirements,
    #[serde(default)]
    pub approver_role: Option<String>,
}

impl WorkflowRule {
    pub fn applies_to(&self, stage: Stage) -> bool {
        self.enabled && (self.stages.is_empty() || self.stages.contains(&stage))
    }
}
