//! Holds all error types aside from those related to plugin metadata.
use std::path::PathBuf;

pub use crate::conditions::{ConditionEvaluationError, ConditionParseError};
pub use crate::database::MetadataRetrievalError;
pub use crate::metadata::error::LoadMetadataError;
pub use crate::plugin::error::PluginDataError;

use crate::sorting::error::{SortingError, display_cycle};
use crate::{Vertex, escape_ascii};

/// Represents an error that occurred while trying to create a
/// [Game][crate::Game].
#[derive(Debug)]
#[non_exhaustive]
pub enum GameHandleCreationError {
    NotADirectory(PathBuf),
    LoadOrderError(LoadOrderError),
}

impl std::fmt::Display for GameHandleCreationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotADirectory(p) => write!(
                f,
                "the path \"{}\" does not resolve to a directory",
                escape_ascii(p)
            ),
            Self::LoadOrderError(_) => {
                write!(f, "failed to initialise the load order game settings")
            }
        }
    }
}

impl std::error::Error for GameHandleCreationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::NotADirectory(_) => None,
            Self::LoadOrderError(e) => Some(e),
        }
    }
}

impl From<loadorder::Error> for GameHandleCreationError {
    fn from(value: loadorder::Error) -> Self {
        GameHandleCreationError::LoadOrderError(value.into())
    }
}

/// Represents an error that occurred while trying to interact with the load
/// order.
#[derive(Debug)]
pub struct LoadOrderError(Box<loadorder::Error>);

impl std::fmt::Display for LoadOrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "load order interaction failed")
    }
}

impl std::error::Error for LoadOrderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl From<loadorder::Error> for LoadOrderError {
    fn from(value: loadorder::Error) -> Self {
        LoadOrderError(Box::new(value))
    }
}

/// Represents an error that occurred while loading plugins.
#[derive(Debug)]
#[non_exhaustive]
pub enum LoadPluginsError {
    IoError(Box<std::io::Error>),
    PluginDataError(PluginDataError),
}

impl std::fmt::Display for LoadPluginsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IoError(_) => write!(f, "an I/O error occurred"),
            Self::PluginDataError(_) => write!(f, "failed to read loaded plugin data"),
        }
    }
}

impl std::error::Error for LoadPluginsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::IoError(e) => Some(e),
            Self::PluginDataError(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for LoadPluginsError {
    fn from(value: std::io::Error) -> Self {
        LoadPluginsError::IoError(Box::new(value))
    }
}

impl From<PluginDataError> for LoadPluginsError {
    fn from(value: PluginDataError) -> Self {
        LoadPluginsError::PluginDataError(value)
    }
}

/// Represents an error that occurred during sorting.
#[derive(Debug)]
#[non_exhaustive]
pub enum SortPluginsError {
    PluginLoadingError(Box<LoadPluginsError>),
    LoadOrderError(LoadOrderError),
    MetadataRetrievalError(MetadataRetrievalError),
    CycleFound(Vec<Vertex>),
    CycleFoundInvolving(String),
    PluginDataError(PluginDataError),
}

impl std::fmt::Display for SortPluginsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PluginLoadingError(_) => write!(f, "failed to load the installed plugins"),
            Self::LoadOrderError(_) => write!(f, "failed to load the current load order state"),
            Self::MetadataRetrievalError(_) => write!(f, "failed to retrieve plugin metadata"),
            Self::CycleFound(c) => write!(f, "found a cycle: {}", display_cycle(c)),
            Self::CycleFoundInvolving(n) => write!(f, "found a cycle involving \"{n}\""),
            Self::PluginDataError(_) => write!(f, "failed to read loaded plugin data"),
        }
    }
}

impl std::error::Error for SortPluginsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::PluginLoadingError(e) => Some(e),
            Self::LoadOrderError(e) => Some(e),
            Self::MetadataRetrievalError(e) => Some(e),
            Self::PluginDataError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LoadPluginsError> for SortPluginsError {
    fn from(value: LoadPluginsError) -> Self {
        SortPluginsError::PluginLoadingError(Box::new(value))
    }
}

impl From<LoadOrderError> for SortPluginsError {
    fn from(value: LoadOrderError) -> Self {
        SortPluginsError::LoadOrderError(value)
    }
}

impl From<loadorder::Error> for SortPluginsError {
    fn from(value: loadorder::Error) -> Self {
        SortPluginsError::LoadOrderError(value.into())
    }
}

impl From<MetadataRetrievalError> for SortPluginsError {
    fn from(value: MetadataRetrievalError) -> Self {
        SortPluginsError::MetadataRetrievalError(value)
    }
}

impl From<ConditionEvaluationError> for SortPluginsError {
    fn from(value: ConditionEvaluationError) -> Self {
        SortPluginsError::MetadataRetrievalError(MetadataRetrievalError::ConditionEvaluationError(
            value,
        ))
    }
}

impl From<PluginDataError> for SortPluginsError {
    fn from(value: PluginDataError) -> Self {
        SortPluginsError::PluginDataError(value)
    }
}

impl From<SortingError> for SortPluginsError {
    fn from(value: SortingError) -> Self {
        match value {
            SortingError::CycleFound(c) => Self::CycleFound(c.into_cycle()),
            SortingError::CycleInvolving(n) => Self::CycleFoundInvolving(n),
            SortingError::PluginDataError(e) => Self::PluginDataError(e),
        }
    }
}

/// Codes that identify error categories across API boundaries. The numeric
/// values are stable for ABI reasons.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[non_exhaustive]
pub enum ErrorCode {
    Ok = 0,
    LoadOrderLibraryError = 1,
    PathWriteFail = 2,
    PathReadFail = 3,
    ConditionEvalFail = 4,
    RegexEvalFail = 5,
    OutOfMemory = 6,
    InvalidArgs = 7,
    NoTagMap = 8,
    PathNotFound = 9,
    NoGameDetected = 10,
    GitError = 12,
    OsError = 13,
    SortingError = 14,
}

impl ErrorCode {
    /// Get the code's stable numeric value.
    pub fn value(self) -> u32 {
        self as u32
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl From<&GameHandleCreationError> for ErrorCode {
    fn from(value: &GameHandleCreationError) -> Self {
        match value {
            GameHandleCreationError::NotADirectory(_) => ErrorCode::NoGameDetected,
            GameHandleCreationError::LoadOrderError(_) => ErrorCode::LoadOrderLibraryError,
        }
    }
}

impl From<&LoadOrderError> for ErrorCode {
    fn from(_: &LoadOrderError) -> Self {
        ErrorCode::LoadOrderLibraryError
    }
}

impl From<&LoadPluginsError> for ErrorCode {
    fn from(value: &LoadPluginsError) -> Self {
        match value {
            LoadPluginsError::IoError(_) | LoadPluginsError::PluginDataError(_) => {
                ErrorCode::PathReadFail
            }
        }
    }
}

impl From<&ConditionEvaluationError> for ErrorCode {
    fn from(value: &ConditionEvaluationError) -> Self {
        match value {
            ConditionEvaluationError::InvalidRegex(_, _) => ErrorCode::RegexEvalFail,
            _ => ErrorCode::ConditionEvalFail,
        }
    }
}

impl From<&MetadataRetrievalError> for ErrorCode {
    fn from(value: &MetadataRetrievalError) -> Self {
        match value {
            MetadataRetrievalError::ConditionEvaluationError(e) => e.into(),
            MetadataRetrievalError::RegexError(_) => ErrorCode::RegexEvalFail,
        }
    }
}

impl From<&SortPluginsError> for ErrorCode {
    fn from(value: &SortPluginsError) -> Self {
        match value {
            SortPluginsError::PluginLoadingError(e) => e.as_ref().into(),
            SortPluginsError::LoadOrderError(e) => e.into(),
            SortPluginsError::MetadataRetrievalError(e) => e.into(),
            SortPluginsError::CycleFound(_) | SortPluginsError::CycleFoundInvolving(_) => {
                ErrorCode::SortingError
            }
            SortPluginsError::PluginDataError(_) => ErrorCode::PathReadFail,
        }
    }
}

impl From<&LoadMetadataError> for ErrorCode {
    fn from(value: &LoadMetadataError) -> Self {
        if value.is_path_not_found() {
            ErrorCode::PathNotFound
        } else {
            ErrorCode::InvalidArgs
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod error_code {
        use super::*;

        #[test]
        fn should_have_stable_numeric_values() {
            assert_eq!(0, ErrorCode::Ok.value());
            assert_eq!(1, ErrorCode::LoadOrderLibraryError.value());
            assert_eq!(2, ErrorCode::PathWriteFail.value());
            assert_eq!(3, ErrorCode::PathReadFail.value());
            assert_eq!(4, ErrorCode::ConditionEvalFail.value());
            assert_eq!(5, ErrorCode::RegexEvalFail.value());
            assert_eq!(6, ErrorCode::OutOfMemory.value());
            assert_eq!(7, ErrorCode::InvalidArgs.value());
            assert_eq!(8, ErrorCode::NoTagMap.value());
            assert_eq!(9, ErrorCode::PathNotFound.value());
            assert_eq!(10, ErrorCode::NoGameDetected.value());
            assert_eq!(12, ErrorCode::GitError.value());
            assert_eq!(13, ErrorCode::OsError.value());
            assert_eq!(14, ErrorCode::SortingError.value());
        }

        #[test]
        fn should_map_cycles_to_the_sorting_error_code() {
            let error = SortPluginsError::CycleFoundInvolving("A.esp".into());

            assert_eq!(ErrorCode::SortingError, ErrorCode::from(&error));
        }
    }
}
