use std::str::FromStr;

use saphyr::{AnnotatedMapping, MarkedYaml, Marker, Scalar, YamlData};

use crate::conditions::Expression;

use super::error::{ExpectedType, MetadataParsingErrorReason, ParseMetadataError};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub(super) enum YamlObjectType {
    File,
    Location,
    Message,
    MessageContent,
    PluginCleaningData,
    PluginMetadata,
    Tag,
    MetadataDocument,
}

impl std::fmt::Display for YamlObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            YamlObjectType::File => write!(f, "file"),
            YamlObjectType::Location => write!(f, "location"),
            YamlObjectType::Message => write!(f, "message"),
            YamlObjectType::MessageContent => write!(f, "message content"),
            YamlObjectType::PluginCleaningData => write!(f, "plugin cleaning data"),
            YamlObjectType::PluginMetadata => write!(f, "plugin metadata"),
            YamlObjectType::Tag => write!(f, "tag"),
            YamlObjectType::MetadataDocument => write!(f, "metadata document"),
        }
    }
}

pub(super) trait TryFromYaml: Sized {
    fn try_from_yaml(value: &MarkedYaml) -> Result<Self, ParseMetadataError>;
}

pub(super) fn as_str<'a>(value: &'a MarkedYaml<'a>) -> Option<&'a str> {
    match &value.data {
        YamlData::Value(Scalar::String(s)) => Some(s.as_ref()),
        _ => None,
    }
}

fn as_integer(value: &MarkedYaml) -> Option<i64> {
    match &value.data {
        YamlData::Value(Scalar::Integer(i)) => Some(*i),
        _ => None,
    }
}

fn as_boolean(value: &MarkedYaml) -> Option<bool> {
    match &value.data {
        YamlData::Value(Scalar::Boolean(b)) => Some(*b),
        _ => None,
    }
}

pub(super) fn as_mapping<'a>(
    value: &'a MarkedYaml,
    yaml_type: YamlObjectType,
) -> Result<&'a AnnotatedMapping<'a, MarkedYaml<'a>>, ParseMetadataError> {
    match &value.data {
        YamlData::Mapping(m) => Ok(m),
        _ => Err(ParseMetadataError::unexpected_type(
            value.span.start,
            yaml_type,
            ExpectedType::Map,
        )),
    }
}

pub(super) fn get_value<'a>(
    mapping: &'a AnnotatedMapping<MarkedYaml<'a>>,
    key: &str,
) -> Option<&'a MarkedYaml<'a>> {
    mapping
        .iter()
        .find(|(k, _)| as_str(k) == Some(key))
        .map(|(_, v)| v)
}

pub(super) fn get_string_value<'a>(
    mapping: &'a AnnotatedMapping<MarkedYaml<'a>>,
    key: &'static str,
    yaml_type: YamlObjectType,
) -> Result<Option<(Marker, &'a str)>, ParseMetadataError> {
    match get_value(mapping, key) {
        Some(n) => match as_str(n) {
            Some(s) => Ok(Some((n.span.start, s))),
            None => Err(ParseMetadataError::unexpected_value_type(
                n.span.start,
                key,
                yaml_type,
                ExpectedType::String,
            )),
        },
        None => Ok(None),
    }
}

pub(super) fn get_required_string_value<'a>(
    marker: Marker,
    mapping: &'a AnnotatedMapping<MarkedYaml<'a>>,
    key: &'static str,
    yaml_type: YamlObjectType,
) -> Result<&'a str, ParseMetadataError> {
    match get_string_value(mapping, key, yaml_type)? {
        Some(n) => Ok(n.1),
        None => Err(ParseMetadataError::missing_key(marker, key, yaml_type)),
    }
}

pub(super) fn get_bool_value(
    mapping: &AnnotatedMapping<MarkedYaml<'_>>,
    key: &'static str,
    yaml_type: YamlObjectType,
) -> Result<Option<bool>, ParseMetadataError> {
    match get_value(mapping, key) {
        Some(n) => match as_boolean(n) {
            Some(b) => Ok(Some(b)),
            None => Err(ParseMetadataError::unexpected_value_type(
                n.span.start,
                key,
                yaml_type,
                ExpectedType::Boolean,
            )),
        },
        None => Ok(None),
    }
}

pub(super) fn get_u32_value(
    mapping: &AnnotatedMapping<MarkedYaml<'_>>,
    key: &'static str,
    yaml_type: YamlObjectType,
) -> Result<Option<u32>, ParseMetadataError> {
    match get_value(mapping, key) {
        Some(n) => match as_integer(n) {
            Some(i) => i.try_into().map(Some).map_err(|_| {
                ParseMetadataError::new(n.span.start, MetadataParsingErrorReason::NonU32Number(i))
            }),
            None => Err(ParseMetadataError::unexpected_value_type(
                n.span.start,
                key,
                yaml_type,
                ExpectedType::Number,
            )),
        },
        None => Ok(None),
    }
}

pub(super) fn get_i8_value(
    mapping: &AnnotatedMapping<MarkedYaml<'_>>,
    key: &'static str,
    yaml_type: YamlObjectType,
) -> Result<Option<i8>, ParseMetadataError> {
    match get_value(mapping, key) {
        Some(n) => match as_integer(n) {
            Some(i) => i.try_into().map(Some).map_err(|_| {
                ParseMetadataError::new(
                    n.span.start,
                    MetadataParsingErrorReason::PriorityOutOfRange(i),
                )
            }),
            None => Err(ParseMetadataError::unexpected_value_type(
                n.span.start,
                key,
                yaml_type,
                ExpectedType::Number,
            )),
        },
        None => Ok(None),
    }
}

pub(super) fn get_as_slice<'a>(
    mapping: &'a AnnotatedMapping<MarkedYaml<'a>>,
    key: &'static str,
    yaml_type: YamlObjectType,
) -> Result<&'a [MarkedYaml<'a>], ParseMetadataError> {
    if let Some(value) = get_value(mapping, key) {
        match &value.data {
            YamlData::Sequence(s) => Ok(s.as_slice()),
            _ => Err(ParseMetadataError::unexpected_value_type(
                value.span.start,
                key,
                yaml_type,
                ExpectedType::Array,
            )),
        }
    } else {
        Ok(&[])
    }
}

/// Reject any key in the mapping that is not in the given list. Unknown keys
/// in a metadata document are far more likely to be mistakes than deliberate,
/// and silently ignoring them would hide those mistakes.
pub(super) fn reject_unknown_keys(
    mapping: &AnnotatedMapping<MarkedYaml<'_>>,
    allowed_keys: &[&str],
    yaml_type: YamlObjectType,
) -> Result<(), ParseMetadataError> {
    for key in mapping.keys() {
        match as_str(key) {
            Some(s) if allowed_keys.contains(&s) => {}
            Some(s) => {
                return Err(ParseMetadataError::unknown_key(
                    key.span.start,
                    s.to_owned(),
                    yaml_type,
                ));
            }
            None => {
                return Err(ParseMetadataError::unexpected_type(
                    key.span.start,
                    yaml_type,
                    ExpectedType::String,
                ));
            }
        }
    }

    Ok(())
}

/// Read the "condition" value for the given key, validating its syntax so
/// that an invalid condition is rejected when the document is parsed rather
/// than when the condition is first evaluated.
pub(super) fn parse_condition(
    mapping: &AnnotatedMapping<MarkedYaml<'_>>,
    key: &'static str,
    yaml_type: YamlObjectType,
) -> Result<Option<Box<str>>, ParseMetadataError> {
    match get_string_value(mapping, key, yaml_type)? {
        Some((marker, s)) => {
            if let Err(e) = Expression::from_str(s) {
                return Err(ParseMetadataError::invalid_condition(
                    marker,
                    s.to_owned(),
                    e,
                ));
            }
            Ok(Some(s.into()))
        }
        None => Ok(None),
    }
}
