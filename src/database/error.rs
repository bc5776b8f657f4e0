use crate::{conditions::ConditionEvaluationError, metadata::error::RegexError};

/// Represents an error that occurred while retrieving metadata.
#[derive(Debug)]
#[non_exhaustive]
pub enum MetadataRetrievalError {
    ConditionEvaluationError(ConditionEvaluationError),
    RegexError(RegexError),
}

impl std::fmt::Display for MetadataRetrievalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConditionEvaluationError(_) => {
                write!(f, "failed to evaluate a metadata condition")
            }
            Self::RegexError(_) => write!(f, "failed to use a regex plugin name"),
        }
    }
}

impl std::error::Error for MetadataRetrievalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ConditionEvaluationError(e) => Some(e),
            Self::RegexError(e) => Some(e),
        }
    }
}

impl From<ConditionEvaluationError> for MetadataRetrievalError {
    fn from(value: ConditionEvaluationError) -> Self {
        MetadataRetrievalError::ConditionEvaluationError(value)
    }
}

impl From<RegexError> for MetadataRetrievalError {
    fn from(value: RegexError) -> Self {
        MetadataRetrievalError::RegexError(value)
    }
}
