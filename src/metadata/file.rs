use saphyr::{MarkedYaml, Scalar, YamlData};
use unicase::UniCase;

use super::{
    error::{ExpectedType, ParseMetadataError},
    yaml::{
        TryFromYaml, YamlObjectType, get_required_string_value, get_string_value, parse_condition,
        reject_unknown_keys,
    },
};

/// Represents a file in a game's Data folder, including files in
/// subdirectories.
///
/// Equality and ordering consider only the filename, compared
/// case-insensitively: the display name and condition are payload that the
/// first-seen value of a given name keeps when metadata is merged.
#[derive(Clone, Debug, Default)]
pub struct File {
    name: Filename,
    display_name: Option<Box<str>>,
    condition: Option<Box<str>>,
}

impl File {
    /// Create a value with the given name. This can also be a relative path.
    #[must_use]
    pub fn new(name: String) -> Self {
        Self {
            name: Filename::new(name),
            ..Default::default()
        }
    }

    /// Set the name to be displayed for the file in messages.
    #[must_use]
    pub fn with_display_name(mut self, display_name: String) -> Self {
        self.display_name = Some(display_name.into_boxed_str());
        self
    }

    /// Set the condition string.
    #[must_use]
    pub fn with_condition(mut self, condition: String) -> Self {
        self.condition = Some(condition.into_boxed_str());
        self
    }

    /// Gets the name of the file (which may actually be a path).
    pub fn name(&self) -> &Filename {
        &self.name
    }

    /// Get the display name of the file.
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Get the condition string.
    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }
}

impl PartialEq for File {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for File {}

impl PartialOrd for File {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for File {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.name.cmp(&other.name)
    }
}

impl std::hash::Hash for File {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

/// Represents a case-insensitive filename.
#[derive(Clone, Debug, Default)]
pub struct Filename(Box<str>);

impl Filename {
    /// Create a value using the given string.
    #[must_use]
    pub fn new(s: String) -> Self {
        Filename(s.into())
    }

    /// Get this Filename as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for Filename {
    fn eq(&self, other: &Self) -> bool {
        unicase::eq(&self.0, &other.0)
    }
}

impl Eq for Filename {}

impl PartialOrd for Filename {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Filename {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        UniCase::new(&self.0).cmp(&UniCase::new(&other.0))
    }
}

impl std::hash::Hash for Filename {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        UniCase::new(&self.0).hash(state);
    }
}

impl AsRef<str> for Filename {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Filename {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFromYaml for File {
    fn try_from_yaml(value: &MarkedYaml) -> Result<Self, ParseMetadataError> {
        match &value.data {
            YamlData::Value(Scalar::String(s)) => Ok(File {
                name: Filename::new(s.to_string()),
                display_name: None,
                condition: None,
            }),
            YamlData::Mapping(m) => {
                reject_unknown_keys(m, &["name", "display", "condition"], YamlObjectType::File)?;

                let name =
                    get_required_string_value(value.span.start, m, "name", YamlObjectType::File)?;

                let display_name = get_string_value(m, "display", YamlObjectType::File)?;

                let condition = parse_condition(m, "condition", YamlObjectType::File)?;

                Ok(File {
                    name: Filename::new(name.to_owned()),
                    display_name: display_name.map(|(_, s)| s.into()),
                    condition,
                })
            }
            _ => Err(ParseMetadataError::unexpected_type(
                value.span.start,
                YamlObjectType::File,
                ExpectedType::MapOrString,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod file_eq {
        use super::*;

        #[test]
        fn should_be_case_insensitive_on_name() {
            assert_eq!(File::new("name".into()), File::new("name".into()));
            assert_eq!(File::new("name".into()), File::new("NAME".into()));
            assert_ne!(File::new("name1".into()), File::new("name2".into()));
        }

        #[test]
        fn should_ignore_display_name_and_condition() {
            assert_eq!(
                File::new("name".into()),
                File::new("name".into())
                    .with_display_name("display".into())
                    .with_condition("file(\"Foo.esp\")".into())
            );
        }
    }

    mod filename_eq {
        use super::*;

        #[test]
        fn should_be_case_insensitive_on_name() {
            assert_eq!(Filename::new("name".into()), Filename::new("name".into()));
            assert_eq!(Filename::new("name".into()), Filename::new("NAME".into()));
            assert_ne!(Filename::new("name1".into()), Filename::new("name2".into()));
        }
    }

    mod try_from_yaml {
        use crate::metadata::parse;

        use super::*;

        #[test]
        fn should_only_set_name_if_decoding_from_scalar() {
            let yaml = parse("name1");

            let file = File::try_from_yaml(&yaml).unwrap();

            assert_eq!("name1", file.name().as_str());
            assert!(file.display_name().is_none());
            assert!(file.condition().is_none());
        }

        #[test]
        fn should_error_if_given_a_list() {
            let yaml = parse("[0, 1, 2]");

            assert!(File::try_from_yaml(&yaml).is_err());
        }

        #[test]
        fn should_error_if_name_is_missing() {
            let yaml = parse("{display: display1}");

            assert!(File::try_from_yaml(&yaml).is_err());
        }

        #[test]
        fn should_error_if_given_an_invalid_condition() {
            let yaml = parse("{name: name1, condition: invalid}");

            assert!(File::try_from_yaml(&yaml).is_err());
        }

        #[test]
        fn should_error_if_given_an_unknown_key() {
            let yaml = parse("{name: name1, displayName: display1}");

            assert!(File::try_from_yaml(&yaml).is_err());
        }

        #[test]
        fn should_set_all_given_fields() {
            let yaml = parse("{name: name1, display: display1, condition: 'file(\"Foo.esp\")'}");

            let file = File::try_from_yaml(&yaml).unwrap();

            assert_eq!("name1", file.name().as_str());
            assert_eq!("display1", file.display_name().unwrap());
            assert_eq!("file(\"Foo.esp\")", file.condition().unwrap());
        }

        #[test]
        fn should_leave_optional_fields_empty_if_not_present() {
            let yaml = parse("{name: name1}");

            let file = File::try_from_yaml(&yaml).unwrap();

            assert_eq!("name1", file.name().as_str());
            assert!(file.display_name().is_none());
            assert!(file.condition().is_none());
        }
    }
}
