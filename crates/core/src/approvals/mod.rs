pub mod lifecycle;
pub mod matcher;
pub mod resolver;
pub mod service;
pub mod status;

pub use lifecycle::{LifecycleError, NewApprovalRequest};
pub use matcher::match_rules;
pub use resolver::ApproverResolver;
pub use service::{ActionContext, ApprovalService};
pub use status::{approval_status, EntityApprovalStatus};

pub(crate) fn normalize_key(value: &str) -> String {
    value.trim().to_ascii_lowercase()
}
