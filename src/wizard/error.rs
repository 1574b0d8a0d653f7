use thiserror::Error;

pub const MANDATORY_FIELDS_MESSAGE: &str = "Location and Requirements are mandatory fields.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    #[error("{0}")]
    Validation(String),
    #[error("'{operation}' is not available at step {step}")]
    InvalidTransition {
        operation: &'static str,
        step: usize,
    },
    #[error("No {level} at index {index} (this {parent} has {len})")]
    Index {
        level: &'static str,
        parent: &'static str,
        index: usize,
        len: usize,
    },
    #[error("Project data is missing.")]
    MissingProjectData,
}

impl WizardError {
    pub fn invalid(operation: &'static str, step: usize) -> Self {
        WizardError::InvalidTransition { operation, step }
    }
}
