//! Holds all error types related to plugin metadata.
use std::path::PathBuf;

use regress::Error as RegexImplError;
use saphyr::Marker;

use crate::{conditions::ConditionParseError, escape_ascii, metadata::MessageContent};

use super::yaml::YamlObjectType;

/// Represents an error that occurred when validating a collection of
/// [MessageContent] objects.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MultilingualMessageContentsError;

impl std::fmt::Display for MultilingualMessageContentsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "multilingual messages must contain a content string that uses the {} language code",
            MessageContent::DEFAULT_LANGUAGE
        )
    }
}

impl std::error::Error for MultilingualMessageContentsError {}

/// Represents an error that occurred while parsing metadata.
#[derive(Debug)]
pub struct ParseMetadataError {
    marker: Marker,
    reason: MetadataParsingErrorReason,
}

impl ParseMetadataError {
    pub(super) fn new(marker: Marker, reason: MetadataParsingErrorReason) -> Self {
        Self { marker, reason }
    }

    pub(super) fn invalid_condition(
        marker: Marker,
        condition: String,
        cause: ConditionParseError,
    ) -> Self {
        Self {
            marker,
            reason: MetadataParsingErrorReason::InvalidCondition(Box::new((condition, cause))),
        }
    }

    pub(super) fn missing_key(
        marker: Marker,
        key: &'static str,
        yaml_type: YamlObjectType,
    ) -> Self {
        Self {
            marker,
            reason: MetadataParsingErrorReason::MissingKey(key, yaml_type),
        }
    }

    pub(super) fn unknown_key(marker: Marker, key: String, yaml_type: YamlObjectType) -> Self {
        Self {
            marker,
            reason: MetadataParsingErrorReason::UnknownKey(key, yaml_type),
        }
    }

    pub(super) fn duplicate_entry(marker: Marker, id: String, yaml_type: YamlObjectType) -> Self {
        Self {
            marker,
            reason: MetadataParsingErrorReason::DuplicateEntry(id, yaml_type),
        }
    }

    pub(super) fn unexpected_type(
        marker: Marker,
        yaml_type: YamlObjectType,
        expected_type: ExpectedType,
    ) -> Self {
        Self {
            marker,
            reason: MetadataParsingErrorReason::UnexpectedType(expected_type, yaml_type),
        }
    }

    pub(super) fn unexpected_value_type(
        marker: Marker,
        key: &'static str,
        yaml_type: YamlObjectType,
        expected_type: ExpectedType,
    ) -> Self {
        Self {
            marker,
            reason: MetadataParsingErrorReason::UnexpectedValueType(key, expected_type, yaml_type),
        }
    }
}

impl std::fmt::Display for ParseMetadataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "encountered a YAML parsing error at line {} column {}: {}",
            self.marker.line(),
            self.marker.col(),
            self.reason
        )
    }
}

impl std::error::Error for ParseMetadataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.reason {
            MetadataParsingErrorReason::InvalidCondition(b) => Some(&b.1),
            MetadataParsingErrorReason::InvalidRegex(b) => Some(b),
            _ => None,
        }
    }
}

impl From<saphyr::ScanError> for ParseMetadataError {
    fn from(value: saphyr::ScanError) -> Self {
        Self {
            marker: *value.marker(),
            reason: MetadataParsingErrorReason::Other(Box::new(value)),
        }
    }
}

#[derive(Debug)]
pub(super) enum MetadataParsingErrorReason {
    InvalidCondition(Box<(String, ConditionParseError)>),
    MissingKey(&'static str, YamlObjectType),
    UnknownKey(String, YamlObjectType),
    InvalidRegex(RegexError),
    InvalidMultilingualMessageContents,
    UnexpectedType(ExpectedType, YamlObjectType),
    UnexpectedValueType(&'static str, ExpectedType, YamlObjectType),
    NonU32Number(i64),
    PriorityOutOfRange(i64),
    RegexPluginCleaningData,
    DuplicateEntry(String, YamlObjectType),
    Other(Box<saphyr::ScanError>),
}

impl std::fmt::Display for MetadataParsingErrorReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCondition(b) => {
                write!(f, "the condition string \"{}\" is invalid", b.0)
            }
            Self::MissingKey(key, yaml_object_type) => {
                write!(f, "\"{key}\" key in \"{yaml_object_type}\" map is missing")
            }
            Self::UnknownKey(key, yaml_object_type) => {
                write!(
                    f,
                    "\"{key}\" key in \"{yaml_object_type}\" map is not a recognised key"
                )
            }
            Self::InvalidRegex(_) => {
                write!(f, "invalid regex in \"name\" key")
            }
            Self::InvalidMultilingualMessageContents => MultilingualMessageContentsError.fmt(f),
            Self::UnexpectedType(expected_type, yaml_object_type) => {
                write!(f, "\"{yaml_object_type}\" object must be {expected_type}")
            }
            Self::UnexpectedValueType(key, expected_type, yaml_object_type) => write!(
                f,
                "\"{key}\" key in \"{yaml_object_type}\" map must be {expected_type}"
            ),
            Self::NonU32Number(i) => {
                write!(f, "{i} is not valid as a 32-bit unsigned integer")
            }
            Self::PriorityOutOfRange(i) => {
                write!(f, "{i} is outside the valid priority value range")
            }
            Self::RegexPluginCleaningData => {
                write!(
                    f,
                    "a plugin metadata entry with a regex name cannot have cleaning data"
                )
            }
            Self::DuplicateEntry(id, yaml_object_type) => write!(
                f,
                "more than one entry exists for {yaml_object_type} \"{id}\""
            ),
            Self::Other(m) => m.fmt(f),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub(super) enum ExpectedType {
    String,
    Number,
    Boolean,
    Array,
    Map,
    MapOrString,
    ArrayOrString,
}

impl std::fmt::Display for ExpectedType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExpectedType::String => write!(f, "a string"),
            ExpectedType::Number => write!(f, "a number"),
            ExpectedType::Boolean => write!(f, "a boolean"),
            ExpectedType::Array => write!(f, "an array"),
            ExpectedType::Map => write!(f, "a map"),
            ExpectedType::MapOrString => write!(f, "a map or string"),
            ExpectedType::ArrayOrString => write!(f, "an array or string"),
        }
    }
}

/// Represents an error encountered while parsing and compiling a regex plugin
/// name.
#[derive(Debug)]
pub struct RegexError(Box<RegexImplError>);

impl std::fmt::Display for RegexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "encountered a regex error: {}", self.0)
    }
}

impl std::error::Error for RegexError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl From<Box<RegexImplError>> for RegexError {
    fn from(value: Box<RegexImplError>) -> Self {
        RegexError(value)
    }
}

/// Represents an error that occurred while loading a metadata document from a
/// file.
#[derive(Debug)]
pub struct LoadMetadataError {
    path: PathBuf,
    reason: MetadataDocumentParsingError,
}

impl LoadMetadataError {
    pub(crate) fn new(path: PathBuf, reason: MetadataDocumentParsingError) -> Self {
        Self { path, reason }
    }

    pub(crate) fn from_io_error(path: PathBuf, error: std::io::Error) -> Self {
        Self {
            path,
            reason: MetadataDocumentParsingError::IoError(error),
        }
    }

    /// Check if the error was caused by the file not existing.
    pub fn is_path_not_found(&self) -> bool {
        matches!(self.reason, MetadataDocumentParsingError::PathNotFound)
    }
}

impl std::fmt::Display for LoadMetadataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "failed to load metadata from the file at \"{}\"",
            escape_ascii(&self.path)
        )
    }
}

impl std::error::Error for LoadMetadataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.reason)
    }
}

#[derive(Debug)]
#[non_exhaustive]
pub(crate) enum MetadataDocumentParsingError {
    PathNotFound,
    IoError(std::io::Error),
    NoDocuments,
    MoreThanOneDocument(usize),
    MetadataParsingError(ParseMetadataError),
    ScanError(saphyr::ScanError),
}

impl std::fmt::Display for MetadataDocumentParsingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PathNotFound => write!(f, "the path does not exist"),
            Self::IoError(_) => write!(f, "an I/O error occurred"),
            Self::NoDocuments => write!(f, "the file contains no YAML documents"),
            Self::MoreThanOneDocument(n) => {
                write!(f, "the file contains {n} YAML documents, expected one")
            }
            Self::MetadataParsingError(_) => write!(f, "failed to parse the file's metadata"),
            Self::ScanError(_) => write!(f, "the file is not valid YAML"),
        }
    }
}

impl std::error::Error for MetadataDocumentParsingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::IoError(e) => Some(e),
            Self::MetadataParsingError(e) => Some(e),
            Self::ScanError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ParseMetadataError> for MetadataDocumentParsingError {
    fn from(value: ParseMetadataError) -> Self {
        MetadataDocumentParsingError::MetadataParsingError(value)
    }
}

impl From<saphyr::ScanError> for MetadataDocumentParsingError {
    fn from(value: saphyr::ScanError) -> Self {
        MetadataDocumentParsingError::ScanError(value)
    }
}
