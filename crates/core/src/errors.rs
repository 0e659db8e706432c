use thiserror::Error;

use crate::approvals::lifecycle::LifecycleError;
use crate::rules::RuleValidationError;
use crate::store::StoreError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    RuleValidation(#[from] RuleValidationError),
    #[error("approval rule `{rule_id}` was not found")]
    RuleNotFound { rule_id: String },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl From<LifecycleError> for ApplicationError {
    fn from(value: LifecycleError) -> Self {
        Self::Domain(DomainError::Lifecycle(value))
    }
}

impl From<RuleValidationError> for ApplicationError {
    fn from(value: RuleValidationError) -> Self {
        Self::Domain(DomainError::RuleValidation(value))
    }
}

impl From<StoreError> for ApplicationError {
    fn from(value: StoreError) -> Self {
        Self::Persistence(value.to_string())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("forbidden: {message}")]
    Forbidden { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::NotFound { .. } => "The requested approval item no longer exists.",
            Self::Forbidden { .. } => "You are not allowed to perform this action.",
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::Forbidden { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::Forbidden { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::Domain(DomainError::Lifecycle(
                error @ LifecycleError::NotFound { .. },
            )) => Self::NotFound { message: error.to_string(), correlation_id },
            ApplicationError::Domain(error @ DomainError::RuleNotFound { .. }) => {
                Self::NotFound { message: error.to_string(), correlation_id }
            }
            ApplicationError::Domain(DomainError::Lifecycle(
                error @ LifecycleError::Unauthorized { .. },
            )) => Self::Forbidden { message: error.to_string(), correlation_id },
            ApplicationError::Domain(DomainError::Lifecycle(_))
            | ApplicationError::Domain(DomainError::RuleValidation(_))
            | ApplicationError::Domain(DomainError::InvariantViolation(_)) => Self::BadRequest {
                message: "domain validation failed".to_owned(),
                correlation_id,
            },
            ApplicationError::Persistence(message) => {
                Self::ServiceUnavailable { message, correlation_id }
            }
            ApplicationError::Configuration(message) => Self::Internal { message, correlation_id },
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::approvals::lifecycle::LifecycleError;
    use crate::errors::{ApplicationError, DomainError, InterfaceError};
    use crate::store::StoreError;

    #[test]
    fn validation_failure_maps_to_bad_request_interface_error() {
        let interface = ApplicationError::from(LifecycleError::ValidationFailed(
            "a rejection reason is required".to_owned(),
        ))
        .into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest {
                ref correlation_id,
                ..
            } if correlation_id == "req-1"
        ));
        assert_eq!(
            interface.user_message(),
            "The request could not be processed. Check inputs and try again."
        );
    }

    #[test]
    fn missing_request_maps_to_not_found() {
        let interface = ApplicationError::from(LifecycleError::NotFound {
            kind: "approval request",
            id: "apr-9".to_owned(),
        })
        .into_interface("req-2");

        assert!(matches!(interface, InterfaceError::NotFound { ref message, .. } if message.contains("apr-9")));
        assert_eq!(interface.correlation_id(), "req-2");
    }

    #[test]
    fn unauthorized_maps_to_forbidden() {
        let interface = ApplicationError::from(LifecycleError::Unauthorized {
            actor_id: "u-admin".to_owned(),
            action: "delete another user's comment",
        })
        .into_interface("req-3");

        assert!(matches!(interface, InterfaceError::Forbidden { .. }));
    }

    #[test]
    fn persistence_error_maps_to_service_unavailable() {
        let interface = ApplicationError::from(StoreError::Backend("database is locked".to_owned()))
            .into_interface("req-4");

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        assert_eq!(
            interface.user_message(),
            "The service is temporarily unavailable. Please retry shortly."
        );
    }

    #[test]
    fn rule_not_found_maps_to_not_found() {
        let interface =
            ApplicationError::from(DomainError::RuleNotFound { rule_id: "rule-1".to_owned() })
                .into_interface("req-5");

        assert!(matches!(interface, InterfaceError::NotFound { .. }));
    }
}
