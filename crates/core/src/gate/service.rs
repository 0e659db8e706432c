use crate::domain::approval::ApprovalRequest;
use crate::domain::stage::Stage;
use crate::domain::workflow::WorkflowRule;
use crate::errors::ApplicationError;
use crate::gate::{can_complete_stage, GateVerdict, StageEntities, StageSnapshot};
use crate::store::{keys, load_collection, save_collection, SnapshotStore};

/// Loads a project's workflow rules and approval requests and runs the gate.
pub struct WorkflowGate<S> {
    store: S,
}

impl<S> WorkflowGate<S>
where
    S: SnapshotStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn workflow_rules(
        &self,
        project_id: &str,
    ) -> Result<Vec<WorkflowRule>, ApplicationError> {
        Ok(load_collection(&self.store, &keys::workflow_rules(project_id)).await?)
    }

    pub async fn save_workflow_rules(
        &self,
        project_id: &str,
        rules: &[WorkflowRule],
    ) -> Result<(), ApplicationError> {
        save_collection(&self.store, &keys::workflow_rules(project_id), rules).await?;
        tracing::info!(
            event_name = "gate.workflow_rules.saved",
            project_id,
            rule_count = rules.len(),
            "workflow rules saved"
        );
        Ok(())
    }

    pub async fn evaluate(
        &self,
        project_id: &str,
        stage: Stage,
        entities: StageEntities,
    ) -> Result<GateVerdict, ApplicationError> {
        let requests: Vec<ApprovalRequest> =
            load_collection(&self.store, &keys::approval_requests(project_id)).await?;
        let workflow_rules = self.workflow_rules(project_id).await?;
        let snapshot = StageSnapshot::new(entities, requests, workflow_rules);

        let verdict = can_complete_stage(stage, &snapshot);
        tracing::info!(
            event_name = "gate.stage_evaluated",
            project_id,
            stage = stage.key(),
            allowed = verdict.allowed,
            reason_count = verdict.reasons.len(),
            "stage completion evaluated"
        );
        Ok(verdict)
    }
}
