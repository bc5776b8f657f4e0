use saphyr::{MarkedYaml, Scalar, YamlData};

use super::{
    error::{ExpectedType, ParseMetadataError},
    yaml::{
        TryFromYaml, YamlObjectType, get_required_string_value, parse_condition,
        reject_unknown_keys,
    },
};

/// Represents whether a Bash Tag suggestion is for addition or removal.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum TagSuggestion {
    #[default]
    Addition,
    Removal,
}

/// Represents a Bash Tag suggestion for a plugin.
///
/// Equality ignores the condition, so that the same tag cannot be suggested
/// twice, but a suggestion to add and a suggestion to remove the same tag can
/// coexist.
#[derive(Clone, Debug, Default)]
pub struct Tag {
    name: Box<str>,
    suggestion: TagSuggestion,
    condition: Option<Box<str>>,
}

impl Tag {
    /// Create a [Tag] suggestion for the given tag name.
    #[must_use]
    pub fn new(name: String, suggestion: TagSuggestion) -> Self {
        Self {
            name: name.into_boxed_str(),
            suggestion,
            condition: None,
        }
    }

    /// Set the condition string.
    #[must_use]
    pub fn with_condition(mut self, condition: String) -> Self {
        self.condition = Some(condition.into_boxed_str());
        self
    }

    /// Get the tag's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get if the tag should be added.
    pub fn is_addition(&self) -> bool {
        self.suggestion == TagSuggestion::Addition
    }

    /// Get the condition string.
    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }
}

impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.suggestion == other.suggestion
    }
}

impl Eq for Tag {}

impl PartialOrd for Tag {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Tag {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.suggestion.cmp(&other.suggestion))
    }
}

impl std::hash::Hash for Tag {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.suggestion.hash(state);
    }
}

impl TryFromYaml for Tag {
    fn try_from_yaml(value: &MarkedYaml) -> Result<Self, ParseMetadataError> {
        match &value.data {
            YamlData::Value(Scalar::String(s)) => {
                let (name, suggestion) = name_and_suggestion(s);
                Ok(Tag {
                    name: name.into(),
                    suggestion,
                    condition: None,
                })
            }
            YamlData::Mapping(m) => {
                reject_unknown_keys(m, &["name", "condition"], YamlObjectType::Tag)?;

                let name =
                    get_required_string_value(value.span.start, m, "name", YamlObjectType::Tag)?;

                let condition = parse_condition(m, "condition", YamlObjectType::Tag)?;

                let (name, suggestion) = name_and_suggestion(name);
                Ok(Tag {
                    name: name.into(),
                    suggestion,
                    condition,
                })
            }
            _ => Err(ParseMetadataError::unexpected_type(
                value.span.start,
                YamlObjectType::Tag,
                ExpectedType::MapOrString,
            )),
        }
    }
}

fn name_and_suggestion(value: &str) -> (&str, TagSuggestion) {
    if let Some(name) = value.strip_prefix('-') {
        (name, TagSuggestion::Removal)
    } else {
        (value, TagSuggestion::Addition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod tag_eq {
        use super::*;

        #[test]
        fn should_ignore_the_condition() {
            assert_eq!(
                Tag::new("Relev".into(), TagSuggestion::Addition),
                Tag::new("Relev".into(), TagSuggestion::Addition)
                    .with_condition("file(\"Foo.esp\")".into())
            );
        }

        #[test]
        fn should_distinguish_addition_from_removal() {
            assert_ne!(
                Tag::new("Relev".into(), TagSuggestion::Addition),
                Tag::new("Relev".into(), TagSuggestion::Removal)
            );
        }
    }

    mod try_from_yaml {
        use crate::metadata::parse;

        use super::*;

        #[test]
        fn should_read_a_bare_string_as_an_addition() {
            let yaml = parse("Relev");

            let tag = Tag::try_from_yaml(&yaml).unwrap();

            assert_eq!("Relev", tag.name());
            assert!(tag.is_addition());
            assert!(tag.condition().is_none());
        }

        #[test]
        fn should_read_a_hyphen_prefix_as_a_removal() {
            let yaml = parse("'-Relev'");

            let tag = Tag::try_from_yaml(&yaml).unwrap();

            assert_eq!("Relev", tag.name());
            assert!(!tag.is_addition());
        }

        #[test]
        fn should_read_a_map_with_name_and_condition() {
            let yaml = parse("{name: Delev, condition: 'file(\"Foo.esp\")'}");

            let tag = Tag::try_from_yaml(&yaml).unwrap();

            assert_eq!("Delev", tag.name());
            assert!(tag.is_addition());
            assert_eq!("file(\"Foo.esp\")", tag.condition().unwrap());
        }

        #[test]
        fn should_error_if_name_is_missing() {
            let yaml = parse("{condition: 'file(\"Foo.esp\")'}");

            assert!(Tag::try_from_yaml(&yaml).is_err());
        }

        #[test]
        fn should_error_if_given_an_unknown_key() {
            let yaml = parse("{name: Delev, enabled: true}");

            assert!(Tag::try_from_yaml(&yaml).is_err());
        }
    }
}
