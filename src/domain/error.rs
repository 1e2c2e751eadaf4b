use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("\"{field}\" {message}")]
    Validation { field: String, message: String },
    #[error("domain invariant violated: {message}")]
    Invariant { message: String },
}

impl DomainError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant {
            message: message.into(),
        }
    }

    /// Field that failed validation, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            DomainError::Validation { field, .. } => Some(field.as_str()),
            DomainError::Invariant { .. } => None,
        }
    }
}
