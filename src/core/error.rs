use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("{field} {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("spend schedule band {index}: {reason}")]
    InvalidSchedule { index: usize, reason: String },
}

impl PlanError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        PlanError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn schedule(index: usize, reason: impl Into<String>) -> Self {
        PlanError::InvalidSchedule {
            index,
            reason: reason.into(),
        }
    }
}

pub type PlanResult<T> = Result<T, PlanError>;
