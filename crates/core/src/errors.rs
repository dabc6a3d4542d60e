use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("unknown {field} value `{value}`")]
    UnknownValue { field: &'static str, value: String },
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

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String },
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check filters and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Domain(error) => Self::BadRequest { message: error.to_string() },
            ApplicationError::Persistence(message) => Self::ServiceUnavailable { message },
            ApplicationError::Configuration(message) => Self::Internal { message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ApplicationError, DomainError, InterfaceError};

    #[test]
    fn domain_error_maps_to_bad_request() {
        let interface = InterfaceError::from(ApplicationError::from(DomainError::UnknownValue {
            field: "vulnerability",
            value: "severe".to_string(),
        }));

        assert!(matches!(interface, InterfaceError::BadRequest { .. }));
        assert_eq!(
            interface.user_message(),
            "The request could not be processed. Check filters and try again."
        );
    }

    #[test]
    fn invariant_violation_maps_to_bad_request() {
        let interface = InterfaceError::from(ApplicationError::from(
            DomainError::InvariantViolation("survey target must be positive, got 0".to_string()),
        ));

        assert_eq!(
            interface,
            InterfaceError::BadRequest {
                message: "domain invariant violation: survey target must be positive, got 0"
                    .to_string(),
            }
        );
    }

    #[test]
    fn persistence_error_maps_to_service_unavailable() {
        let interface =
            InterfaceError::from(ApplicationError::Persistence("database locked".to_string()));

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
    }

    #[test]
    fn configuration_error_maps_to_internal() {
        let interface =
            InterfaceError::from(ApplicationError::Configuration("bad template dir".to_string()));

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }
}
