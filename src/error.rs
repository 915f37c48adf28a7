use poem::http::StatusCode;
use poem::Error as PoemError;
use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::business::ActorRole;

/// Kind of record an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Inquiry,
    Offer,
    Booking,
    Space,
    Service,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Inquiry => "inquiry",
            EntityKind::Offer => "offer",
            EntityKind::Booking => "booking",
            EntityKind::Space => "space",
            EntityKind::Service => "service",
        };
        f.write_str(name)
    }
}

/// The rule a rejected field broke
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationRule {
    #[error("must be greater than zero")]
    NotPositive,

    #[error("must not be negative")]
    Negative,

    #[error("must not be empty")]
    Empty,

    #[error("exceeds maximum length of {0} characters")]
    TooLong(usize),

    #[error("end date must not precede start date")]
    InvertedDateRange,

    #[error("must not be before {0}")]
    DateInPast(chrono::NaiveDate),

    #[error("must be between {min} and {max}")]
    OutOfRange { min: Decimal, max: Decimal },

    #[error("requested {requested} m² exceeds available capacity of {available} m²")]
    ExceedsCapacity { requested: Decimal, available: Decimal },

    #[error("overlaps pending inquiry {0} for the same space and dates")]
    OverlapsPendingInquiry(Uuid),

    #[error("selected space does not belong to any selected warehouse")]
    InvalidWarehouse,

    #[error("no line item at position {0}")]
    NoSuchLine(usize),

    #[error("not applicable to {0} pricing")]
    NotApplicable(&'static str),

    #[error("required for {0} pricing")]
    Required(&'static str),

    #[error("amount is out of range")]
    Overflow,
}

/// Malformed or incomplete input, attributable to a single field
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field} {rule}")]
pub struct ValidationError {
    pub field: String,
    pub rule: ValidationRule,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, rule: ValidationRule) -> Self {
        Self {
            field: field.into(),
            rule,
        }
    }
}

/// Why an actor may not perform an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionReason {
    RoleNotAllowed(ActorRole),
    NotOwner,
}

impl fmt::Display for PermissionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionReason::RoleNotAllowed(role) => write!(f, "role {} may not perform it", role),
            PermissionReason::NotOwner => f.write_str("actor does not own the inquiry"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{action} is not permitted: {reason}")]
pub struct PermissionError {
    pub action: String,
    pub reason: PermissionReason,
}

/// An action that is not legal from the current (or derived) status
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot {action} {entity} {id} while it is {status}")]
pub struct StateConflictError {
    pub entity: EntityKind,
    pub id: Uuid,
    pub status: String,
    pub action: String,
}

/// Typed failure of a brokerage operation
#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Permission denied: {0}")]
    Permission(#[from] PermissionError),

    #[error("State conflict: {0}")]
    StateConflict(#[from] StateConflictError),

    #[error("Not found: {entity} {id}")]
    NotFound { entity: EntityKind, id: Uuid },

    #[error("Storage failure: {0}")]
    Storage(#[source] anyhow::Error),
}

impl BrokerError {
    pub fn not_found(entity: EntityKind, id: Uuid) -> Self {
        BrokerError::NotFound { entity, id }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unauthorized: missing or invalid actor identity")]
    Unauthorized,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<BrokerError> for AppError {
    fn from(err: BrokerError) -> Self {
        match err {
            BrokerError::Validation(e) => AppError::ValidationError(e.to_string()),
            BrokerError::Permission(e) => AppError::Forbidden(e.to_string()),
            BrokerError::StateConflict(e) => AppError::Conflict(e.to_string()),
            e @ BrokerError::NotFound { .. } => AppError::NotFound(e.to_string()),
            BrokerError::Storage(e) => {
                tracing::error!("Storage failure: {:?}", e);
                AppError::Internal(e)
            }
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

impl From<AppError> for PoemError {
    fn from(err: AppError) -> Self {
        PoemError::from_string(err.to_string(), err.status_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_names_field_and_rule() {
        let err = ValidationError::new("space_requests[0].size_m2", ValidationRule::NotPositive);
        assert_eq!(err.to_string(), "space_requests[0].size_m2 must be greater than zero");
    }

    #[test]
    fn test_broker_error_status_mapping() {
        let id = Uuid::new_v4();
        let cases: Vec<(BrokerError, StatusCode)> = vec![
            (
                ValidationError::new("date_range", ValidationRule::InvertedDateRange).into(),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                PermissionError {
                    action: "send offer".to_string(),
                    reason: PermissionReason::RoleNotAllowed(ActorRole::Requester),
                }
                .into(),
                StatusCode::FORBIDDEN,
            ),
            (
                StateConflictError {
                    entity: EntityKind::Offer,
                    id,
                    status: "expired".to_string(),
                    action: "accept".to_string(),
                }
                .into(),
                StatusCode::CONFLICT,
            ),
            (BrokerError::not_found(EntityKind::Inquiry, id), StatusCode::NOT_FOUND),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).status_code(), status);
        }
    }

    #[test]
    fn test_permission_error_message() {
        let err = PermissionError {
            action: "accept offer".to_string(),
            reason: PermissionReason::NotOwner,
        };
        assert_eq!(
            err.to_string(),
            "accept offer is not permitted: actor does not own the inquiry"
        );
    }

    #[test]
    fn test_state_conflict_message() {
        let id = Uuid::nil();
        let err = StateConflictError {
            entity: EntityKind::Offer,
            id,
            status: "expired".to_string(),
            action: "accept".to_string(),
        };
        assert_eq!(
            err.to_string(),
            format!("cannot accept offer {} while it is expired", id)
        );
    }
}
