pub mod approvals;
pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod gate;
pub mod rules;
pub mod store;

#[cfg(test)]
mod test_support;

pub use approvals::{
    approval_status, match_rules, ActionContext, ApprovalService, ApproverResolver,
    EntityApprovalStatus, LifecycleError, NewApprovalRequest,
};
pub use audit::{AuditEvent, AuditSink, InMemoryAuditSink, TracingAuditSink};
pub use domain::approval::{
    ApprovalConfig, ApprovalId, ApprovalRequest, ApprovalRule, ApprovalStatus, ApproverType,
    MatchingCriteria, RuleId, RuleScope,
};
pub use domain::entity::{ApprovalEntity, EntityType};
pub use domain::stage::Stage;
pub use domain::team::TeamMember;
pub use domain::workflow::{WorkflowRule, WorkflowRuleType};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use gate::{can_complete_stage, GateVerdict, StageEntities, StageSnapshot, WorkflowGate};
pub use rules::{RuleDraft, RuleStore, RuleValidationError};
pub use store::{InMemorySnapshotStore, SnapshotStore, StoreError};
