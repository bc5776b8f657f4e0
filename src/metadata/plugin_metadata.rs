use std::sync::Arc;

use regress::Regex;
use saphyr::{AnnotatedMapping, MarkedYaml};

use crate::{case_insensitive_regex, regex_matches};

use super::{
    error::{MetadataParsingErrorReason, ParseMetadataError, RegexError},
    file::File,
    location::Location,
    message::Message,
    plugin_cleaning_data::PluginCleaningData,
    priority::Priority,
    tag::Tag,
    yaml::{
        TryFromYaml, YamlObjectType, as_mapping, get_as_slice, get_bool_value, get_i8_value,
        get_required_string_value, get_value, reject_unknown_keys,
    },
};

pub(crate) const GHOST_FILE_EXTENSION: &str = ".ghost";

/// Represents a plugin's metadata.
#[derive(Clone, Debug)]
pub struct PluginMetadata {
    name: PluginName,
    enabled: bool,
    local_priority: Priority,
    global_priority: Priority,
    load_after: Vec<File>,
    requirements: Vec<File>,
    incompatibilities: Vec<File>,
    messages: Vec<Message>,
    tags: Vec<Tag>,
    dirty_info: Vec<PluginCleaningData>,
    clean_info: Vec<PluginCleaningData>,
    locations: Vec<Location>,
}

impl PluginMetadata {
    /// Construct a [PluginMetadata] object with no metadata for a plugin with
    /// the given filename, which may also be a regex (see
    /// [is_regex_plugin][Self::is_regex_plugin]).
    pub fn new(name: &str) -> Result<Self, RegexError> {
        Ok(Self {
            name: PluginName::new(name)?,
            enabled: true,
            local_priority: Priority::default(),
            global_priority: Priority::default(),
            load_after: Vec::new(),
            requirements: Vec::new(),
            incompatibilities: Vec::new(),
            messages: Vec::new(),
            tags: Vec::new(),
            dirty_info: Vec::new(),
            clean_info: Vec::new(),
            locations: Vec::new(),
        })
    }

    /// Get the plugin name.
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Check if the metadata entry is enabled. Disabled entries are not used
    /// when merging metadata for a sort.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Get the plugin's priority against conflicting plugins.
    pub fn local_priority(&self) -> Priority {
        self.local_priority
    }

    /// Get the plugin's priority against all plugins, whether they conflict
    /// with it or not.
    pub fn global_priority(&self) -> Priority {
        self.global_priority
    }

    /// Get the plugins that the plugin must load after.
    pub fn load_after_files(&self) -> &[File] {
        &self.load_after
    }

    /// Get the files that the plugin requires to be installed.
    pub fn requirements(&self) -> &[File] {
        &self.requirements
    }

    /// Get the files that the plugin is incompatible with.
    pub fn incompatibilities(&self) -> &[File] {
        &self.incompatibilities
    }

    /// Get the plugin's messages.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Get the plugin's Bash Tag suggestions.
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// Get the plugin's dirty plugin information.
    pub fn dirty_info(&self) -> &[PluginCleaningData] {
        &self.dirty_info
    }

    /// Get the plugin's clean plugin information.
    pub fn clean_info(&self) -> &[PluginCleaningData] {
        &self.clean_info
    }

    /// Get the locations at which this plugin can be found.
    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    /// Set whether the metadata entry is enabled.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Set the plugin's priority against conflicting plugins.
    pub fn set_local_priority(&mut self, priority: Priority) {
        self.local_priority = priority;
    }

    /// Set the plugin's priority against all plugins.
    pub fn set_global_priority(&mut self, priority: Priority) {
        self.global_priority = priority;
    }

    /// Set the plugins that the plugin must load after.
    pub fn set_load_after_files(&mut self, files: Vec<File>) {
        self.load_after = files;
    }

    /// Set the files that the plugin requires to be installed.
    pub fn set_requirements(&mut self, files: Vec<File>) {
        self.requirements = files;
    }

    /// Set the files that the plugin is incompatible with.
    pub fn set_incompatibilities(&mut self, files: Vec<File>) {
        self.incompatibilities = files;
    }

    /// Set the plugin's messages.
    pub fn set_messages(&mut self, messages: Vec<Message>) {
        self.messages = messages;
    }

    /// Append a message to the plugin's messages.
    pub fn add_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Set the plugin's Bash Tag suggestions.
    pub fn set_tags(&mut self, tags: Vec<Tag>) {
        self.tags = tags;
    }

    /// Set the plugin's dirty plugin information.
    pub fn set_dirty_info(&mut self, dirty_info: Vec<PluginCleaningData>) {
        self.dirty_info = dirty_info;
    }

    /// Set the plugin's clean plugin information.
    pub fn set_clean_info(&mut self, clean_info: Vec<PluginCleaningData>) {
        self.clean_info = clean_info;
    }

    /// Set the locations at which this plugin can be found.
    pub fn set_locations(&mut self, locations: Vec<Location>) {
        self.locations = locations;
    }

    /// Merge metadata from the given [PluginMetadata] object into this object.
    ///
    /// If an equal metadata object already exists in this PluginMetadata
    /// object, it is not duplicated, and the existing object keeps its display
    /// and condition payloads. Messages are appended. The enabled flag is
    /// taken from the given object, and its priorities are taken only if they
    /// are explicit.
    pub fn merge_metadata(&mut self, plugin: &PluginMetadata) {
        if plugin.has_name_only() {
            return;
        }

        self.enabled = plugin.enabled;

        if plugin.local_priority.is_explicit() {
            self.local_priority = plugin.local_priority;
        }

        if plugin.global_priority.is_explicit() {
            self.global_priority = plugin.global_priority;
        }

        merge_vecs(&mut self.load_after, &plugin.load_after);
        merge_vecs(&mut self.requirements, &plugin.requirements);
        merge_vecs(&mut self.incompatibilities, &plugin.incompatibilities);
        merge_vecs(&mut self.tags, &plugin.tags);
        self.messages.extend(plugin.messages.iter().cloned());
        merge_vecs(&mut self.dirty_info, &plugin.dirty_info);
        merge_vecs(&mut self.clean_info, &plugin.clean_info);
        merge_vecs(&mut self.locations, &plugin.locations);
    }

    /// Produce the metadata that differs between this object and the given
    /// object: the symmetric difference of each pair of sets, with messages
    /// treated as ordered multisets. Priorities equal in both objects are
    /// reset to implicit zeroes.
    #[must_use]
    pub fn diff_metadata(&self, plugin: &PluginMetadata) -> PluginMetadata {
        let mut diff = self.clone();

        if self.local_priority == plugin.local_priority {
            diff.local_priority = Priority::default();
        }

        if self.global_priority == plugin.global_priority {
            diff.global_priority = Priority::default();
        }

        diff.load_after = symmetric_difference(&self.load_after, &plugin.load_after);
        diff.requirements = symmetric_difference(&self.requirements, &plugin.requirements);
        diff.incompatibilities =
            symmetric_difference(&self.incompatibilities, &plugin.incompatibilities);
        diff.messages = multiset_symmetric_difference(&self.messages, &plugin.messages);
        diff.tags = symmetric_difference(&self.tags, &plugin.tags);
        diff.dirty_info = symmetric_difference(&self.dirty_info, &plugin.dirty_info);
        diff.clean_info = symmetric_difference(&self.clean_info, &plugin.clean_info);
        diff.locations = symmetric_difference(&self.locations, &plugin.locations);

        diff
    }

    /// Produce the metadata in this object that is not present in the given
    /// object: the set difference of each pair of sets, with messages treated
    /// as ordered multisets.
    #[must_use]
    pub fn new_metadata(&self, plugin: &PluginMetadata) -> PluginMetadata {
        let mut new = self.clone();

        new.load_after = difference(&self.load_after, &plugin.load_after);
        new.requirements = difference(&self.requirements, &plugin.requirements);
        new.incompatibilities = difference(&self.incompatibilities, &plugin.incompatibilities);
        new.messages = multiset_difference(&self.messages, &plugin.messages);
        new.tags = difference(&self.tags, &plugin.tags);
        new.dirty_info = difference(&self.dirty_info, &plugin.dirty_info);
        new.clean_info = difference(&self.clean_info, &plugin.clean_info);
        new.locations = difference(&self.locations, &plugin.locations);

        new
    }

    /// Check if no plugin metadata is set.
    ///
    /// The enabled flag is not counted as metadata: an entry that only toggles
    /// it carries nothing worth merging.
    pub fn has_name_only(&self) -> bool {
        !self.local_priority.is_explicit()
            && !self.global_priority.is_explicit()
            && self.load_after.is_empty()
            && self.requirements.is_empty()
            && self.incompatibilities.is_empty()
            && self.messages.is_empty()
            && self.tags.is_empty()
            && self.dirty_info.is_empty()
            && self.clean_info.is_empty()
            && self.locations.is_empty()
    }

    /// Check if the plugin name is a regular expression.
    ///
    /// A name is treated as a regex iff it ends with an escaped plugin file
    /// extension, i.e. `\.esp` or `\.esm`.
    pub fn is_regex_plugin(&self) -> bool {
        matches!(self.name, PluginName::Regex { .. })
    }

    /// Check if the given plugin name matches this plugin metadata object's
    /// name field.
    ///
    /// If the name field is a regular expression, the given plugin name will
    /// be matched against it, otherwise the strings will be compared
    /// case-insensitively. The given plugin name must be literal, i.e. not a
    /// regular expression.
    pub fn name_matches(&self, other_name: &str) -> bool {
        match &self.name {
            PluginName::Literal(name) => unicase::eq(name.as_ref(), other_name),
            PluginName::Regex { pattern, .. } => regex_matches(pattern, other_name),
        }
    }
}

/// Plugin metadata entries are equal if their name fields are equal,
/// case-insensitively.
impl PartialEq for PluginMetadata {
    fn eq(&self, other: &Self) -> bool {
        unicase::eq(self.name(), other.name())
    }
}

impl Eq for PluginMetadata {}

#[derive(Clone)]
enum PluginName {
    Literal(Box<str>),
    Regex { pattern: Arc<Regex>, source: Box<str> },
}

impl PluginName {
    fn new(name: &str) -> Result<Self, RegexError> {
        let name = trim_dot_ghost(name);

        if is_regex_name(name) {
            let pattern = case_insensitive_regex(&format!("^{name}$"))?;
            Ok(PluginName::Regex {
                pattern: Arc::new(pattern),
                source: name.into(),
            })
        } else {
            Ok(PluginName::Literal(name.into()))
        }
    }

    fn as_str(&self) -> &str {
        match self {
            PluginName::Literal(name) => name,
            PluginName::Regex { source, .. } => source,
        }
    }
}

impl std::fmt::Debug for PluginName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PluginName::Literal(name) => f.debug_tuple("Literal").field(name).finish(),
            PluginName::Regex { source, .. } => f.debug_tuple("Regex").field(source).finish(),
        }
    }
}

fn is_regex_name(name: &str) -> bool {
    iends_with_ascii(name, "\\.esp") || iends_with_ascii(name, "\\.esm")
}

pub(crate) fn trim_dot_ghost(string: &str) -> &str {
    if iends_with_ascii(string, GHOST_FILE_EXTENSION) {
        string.get(..string.len() - GHOST_FILE_EXTENSION.len()).unwrap_or(string)
    } else {
        string
    }
}

pub(crate) fn iends_with_ascii(string: &str, suffix: &str) -> bool {
    string.len() >= suffix.len()
        && string
            .as_bytes()
            .iter()
            .rev()
            .zip(suffix.as_bytes().iter().rev())
            .all(|(string_byte, suffix_byte)| string_byte.eq_ignore_ascii_case(suffix_byte))
}

fn merge_vecs<T: Clone + PartialEq>(target: &mut Vec<T>, source: &[T]) {
    let initial_target_len = target.len();
    for element in source {
        if !target
            .get(..initial_target_len)
            .unwrap_or_default()
            .contains(element)
        {
            target.push(element.clone());
        }
    }
}

fn difference<T: Clone + PartialEq>(lhs: &[T], rhs: &[T]) -> Vec<T> {
    lhs.iter()
        .filter(|e| !rhs.contains(e))
        .cloned()
        .collect()
}

fn symmetric_difference<T: Clone + PartialEq>(lhs: &[T], rhs: &[T]) -> Vec<T> {
    let mut result = difference(lhs, rhs);
    result.extend(difference(rhs, lhs));
    result
}

/// The difference of two ordered multisets: an element of `lhs` is kept if it
/// has more occurrences in `lhs` up to and including its own position than
/// `rhs` has in total.
fn multiset_difference(lhs: &[Message], rhs: &[Message]) -> Vec<Message> {
    lhs.iter()
        .enumerate()
        .filter(|(index, message)| {
            let prior_occurrences = lhs
                .get(..*index)
                .unwrap_or_default()
                .iter()
                .filter(|other| other == message)
                .count();
            let rhs_occurrences = rhs.iter().filter(|other| other == message).count();

            prior_occurrences >= rhs_occurrences
        })
        .map(|(_, message)| message.clone())
        .collect()
}

fn multiset_symmetric_difference(lhs: &[Message], rhs: &[Message]) -> Vec<Message> {
    let mut result = multiset_difference(lhs, rhs);
    result.extend(multiset_difference(rhs, lhs));
    result
}

impl TryFromYaml for PluginMetadata {
    fn try_from_yaml(value: &MarkedYaml) -> Result<Self, ParseMetadataError> {
        let mapping = as_mapping(value, YamlObjectType::PluginMetadata)?;

        reject_unknown_keys(
            mapping,
            &[
                "name",
                "enabled",
                "priority",
                "global_priority",
                "after",
                "req",
                "inc",
                "msg",
                "tag",
                "dirty",
                "clean",
                "url",
            ],
            YamlObjectType::PluginMetadata,
        )?;

        let name = get_required_string_value(
            value.span.start,
            mapping,
            "name",
            YamlObjectType::PluginMetadata,
        )?;
        let name = match PluginName::new(name) {
            Ok(n) => n,
            Err(e) => {
                return Err(ParseMetadataError::new(
                    value.span.start,
                    MetadataParsingErrorReason::InvalidRegex(e),
                ));
            }
        };

        let enabled =
            get_bool_value(mapping, "enabled", YamlObjectType::PluginMetadata)?.unwrap_or(true);

        let local_priority = get_i8_value(mapping, "priority", YamlObjectType::PluginMetadata)?
            .map(Priority::explicit)
            .unwrap_or_default();

        let global_priority =
            get_i8_value(mapping, "global_priority", YamlObjectType::PluginMetadata)?
                .map(Priority::explicit)
                .unwrap_or_default();

        let load_after = get_vec::<File>(mapping, "after")?;
        let requirements = get_vec::<File>(mapping, "req")?;
        let incompatibilities = get_vec::<File>(mapping, "inc")?;
        let messages = get_vec::<Message>(mapping, "msg")?;
        let tags = get_vec::<Tag>(mapping, "tag")?;
        let dirty_info = get_vec::<PluginCleaningData>(mapping, "dirty")?;
        let clean_info = get_vec::<PluginCleaningData>(mapping, "clean")?;
        let locations = get_vec::<Location>(mapping, "url")?;

        // Cleaning data is keyed on a specific file's CRC, which a regex name
        // cannot identify.
        if matches!(name, PluginName::Regex { .. })
            && (!dirty_info.is_empty() || !clean_info.is_empty())
        {
            return Err(ParseMetadataError::new(
                value.span.start,
                MetadataParsingErrorReason::RegexPluginCleaningData,
            ));
        }

        Ok(PluginMetadata {
            name,
            enabled,
            local_priority,
            global_priority,
            load_after,
            requirements,
            incompatibilities,
            messages,
            tags,
            dirty_info,
            clean_info,
            locations,
        })
    }
}

fn get_vec<'a, T: TryFromYaml>(
    mapping: &'a AnnotatedMapping<MarkedYaml<'a>>,
    key: &'static str,
) -> Result<Vec<T>, ParseMetadataError> {
    get_as_slice(mapping, key, YamlObjectType::PluginMetadata)?
        .iter()
        .map(T::try_from_yaml)
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::metadata::{MessageType, TagSuggestion, parse};

    use super::*;

    fn metadata(name: &str) -> PluginMetadata {
        PluginMetadata::new(name).unwrap()
    }

    mod new {
        use super::*;

        #[test]
        fn should_trim_a_ghost_extension_from_the_name() {
            let plugin = metadata("Blank.esp.ghost");

            assert_eq!("Blank.esp", plugin.name());
        }

        #[test]
        fn should_error_if_a_regex_name_is_invalid() {
            assert!(PluginMetadata::new("(unclosed\\.esp").is_err());
        }
    }

    mod is_regex_plugin {
        use super::*;

        #[test]
        fn should_be_false_for_a_literal_name() {
            assert!(!metadata("Blank.esp").is_regex_plugin());
        }

        #[test]
        fn should_be_true_iff_the_name_ends_with_an_escaped_plugin_extension() {
            assert!(metadata("Blank.*\\.esp").is_regex_plugin());
            assert!(metadata("Blank.*\\.esm").is_regex_plugin());
            assert!(metadata("Blank.*\\.ESP").is_regex_plugin());
            assert!(!metadata("Blank.*.esp").is_regex_plugin());
        }
    }

    mod name_matches {
        use super::*;

        #[test]
        fn should_compare_literal_names_case_insensitively() {
            assert!(metadata("Blank.esp").name_matches("blank.ESP"));
            assert!(!metadata("Blank.esp").name_matches("Blank.esm"));
        }

        #[test]
        fn should_match_a_regex_name_against_the_whole_string() {
            let plugin = metadata("Blank.*\\.esp");

            assert!(plugin.name_matches("Blank - Different.esp"));
            assert!(plugin.name_matches("BLANK.esp"));
            assert!(!plugin.name_matches("Other - Blank.esp"));
        }
    }

    mod merge_metadata {
        use super::*;

        #[test]
        fn should_do_nothing_if_the_source_has_name_only() {
            let mut plugin = metadata("Blank.esp");
            plugin.set_enabled(false);

            let source = metadata("Blank.esp");
            plugin.merge_metadata(&source);

            assert!(!plugin.is_enabled());
            assert!(plugin.load_after_files().is_empty());
        }

        #[test]
        fn should_not_duplicate_existing_entries() {
            let mut plugin = metadata("Blank.esp");
            plugin.set_load_after_files(vec![File::new("A.esp".into())]);

            let mut source = metadata("Blank.esp");
            source.set_load_after_files(vec![File::new("a.esp".into()), File::new("B.esp".into())]);

            plugin.merge_metadata(&source);

            assert_eq!(2, plugin.load_after_files().len());
            assert_eq!("A.esp", plugin.load_after_files()[0].name().as_str());
            assert_eq!("B.esp", plugin.load_after_files()[1].name().as_str());
        }

        #[test]
        fn should_keep_the_first_inserted_payload_for_equal_entries() {
            let mut plugin = metadata("Blank.esp");
            plugin.set_load_after_files(vec![
                File::new("A.esp".into()).with_display_name("first".into()),
            ]);

            let mut source = metadata("Blank.esp");
            source.set_load_after_files(vec![
                File::new("A.esp".into()).with_display_name("second".into()),
            ]);

            plugin.merge_metadata(&source);

            assert_eq!(1, plugin.load_after_files().len());
            assert_eq!("first", plugin.load_after_files()[0].display_name().unwrap());
        }

        #[test]
        fn should_append_all_messages() {
            let mut plugin = metadata("Blank.esp");
            plugin.set_messages(vec![Message::new(MessageType::Say, "first".into())]);

            let mut source = metadata("Blank.esp");
            source.set_messages(vec![Message::new(MessageType::Say, "first".into())]);

            plugin.merge_metadata(&source);

            assert_eq!(2, plugin.messages().len());
        }

        #[test]
        fn should_take_explicit_priorities_only() {
            let mut plugin = metadata("Blank.esp");
            plugin.set_local_priority(Priority::new(5));

            let mut source = metadata("Blank.esp");
            source.set_messages(vec![Message::new(MessageType::Say, "note".into())]);

            plugin.merge_metadata(&source);
            assert_eq!(5, plugin.local_priority().value());

            let mut source = metadata("Blank.esp");
            source.set_local_priority(Priority::explicit(0));

            plugin.merge_metadata(&source);
            assert_eq!(0, plugin.local_priority().value());
            assert!(plugin.local_priority().is_explicit());
        }

        #[test]
        fn should_allow_an_addition_and_removal_of_the_same_tag() {
            let mut plugin = metadata("Blank.esp");
            plugin.set_tags(vec![Tag::new("Relev".into(), TagSuggestion::Addition)]);

            let mut source = metadata("Blank.esp");
            source.set_tags(vec![Tag::new("Relev".into(), TagSuggestion::Removal)]);

            plugin.merge_metadata(&source);

            assert_eq!(2, plugin.tags().len());
        }
    }

    mod diff_metadata {
        use super::*;

        #[test]
        fn should_produce_the_symmetric_difference_of_sets() {
            let mut plugin = metadata("Blank.esp");
            plugin.set_load_after_files(vec![File::new("A.esp".into()), File::new("B.esp".into())]);

            let mut other = metadata("Blank.esp");
            other.set_load_after_files(vec![File::new("B.esp".into()), File::new("C.esp".into())]);

            let diff = plugin.diff_metadata(&other);

            assert_eq!(
                vec![File::new("A.esp".into()), File::new("C.esp".into())],
                diff.load_after_files().to_vec()
            );
        }

        #[test]
        fn should_zero_priorities_that_are_equal() {
            let mut plugin = metadata("Blank.esp");
            plugin.set_local_priority(Priority::new(5));

            let mut other = metadata("Blank.esp");
            other.set_local_priority(Priority::new(5));

            let diff = plugin.diff_metadata(&other);

            assert_eq!(0, diff.local_priority().value());
            assert!(!diff.local_priority().is_explicit());
        }

        #[test]
        fn should_keep_priorities_that_differ() {
            let mut plugin = metadata("Blank.esp");
            plugin.set_local_priority(Priority::new(5));

            let diff = plugin.diff_metadata(&metadata("Blank.esp"));

            assert_eq!(5, diff.local_priority().value());
        }

        #[test]
        fn should_treat_messages_as_ordered_multisets() {
            let message = Message::new(MessageType::Say, "note".into());

            let mut plugin = metadata("Blank.esp");
            plugin.set_messages(vec![message.clone(), message.clone()]);

            let mut other = metadata("Blank.esp");
            other.set_messages(vec![message.clone()]);

            let diff = plugin.diff_metadata(&other);

            assert_eq!(vec![message], diff.messages().to_vec());
        }
    }

    mod new_metadata {
        use super::*;

        #[test]
        fn should_produce_the_set_difference() {
            let mut plugin = metadata("Blank.esp");
            plugin.set_load_after_files(vec![File::new("A.esp".into()), File::new("B.esp".into())]);

            let mut other = metadata("Blank.esp");
            other.set_load_after_files(vec![File::new("B.esp".into()), File::new("C.esp".into())]);

            let new = plugin.new_metadata(&other);

            assert_eq!(
                vec![File::new("A.esp".into())],
                new.load_after_files().to_vec()
            );
        }
    }

    mod has_name_only {
        use super::*;

        #[test]
        fn should_be_true_for_a_newly_created_object() {
            assert!(metadata("Blank.esp").has_name_only());
        }

        #[test]
        fn should_be_true_if_only_the_enabled_flag_is_set() {
            let mut plugin = metadata("Blank.esp");
            plugin.set_enabled(false);

            assert!(plugin.has_name_only());
        }

        #[test]
        fn should_be_false_if_a_priority_is_explicit() {
            let mut plugin = metadata("Blank.esp");
            plugin.set_local_priority(Priority::explicit(0));

            assert!(!plugin.has_name_only());
        }

        #[test]
        fn should_be_false_if_any_metadata_is_set() {
            let mut plugin = metadata("Blank.esp");
            plugin.set_messages(vec![Message::new(MessageType::Say, "note".into())]);

            assert!(!plugin.has_name_only());
        }
    }

    mod eq {
        use super::*;

        #[test]
        fn should_compare_names_case_insensitively() {
            assert_eq!(metadata("Blank.esp"), metadata("blank.ESP"));
            assert_ne!(metadata("Blank.esp"), metadata("Blank.esm"));
        }
    }

    mod try_from_yaml {
        use super::*;

        #[test]
        fn should_error_if_name_is_missing() {
            let yaml = parse("{priority: 5}");

            assert!(PluginMetadata::try_from_yaml(&yaml).is_err());
        }

        #[test]
        fn should_error_if_given_an_unknown_key() {
            let yaml = parse("{name: Blank.esp, group: early}");

            assert!(PluginMetadata::try_from_yaml(&yaml).is_err());
        }

        #[test]
        fn should_read_priorities_as_explicit() {
            let yaml = parse("{name: Blank.esp, priority: 0, global_priority: -10}");

            let plugin = PluginMetadata::try_from_yaml(&yaml).unwrap();

            assert_eq!(0, plugin.local_priority().value());
            assert!(plugin.local_priority().is_explicit());
            assert_eq!(-10, plugin.global_priority().value());
        }

        #[test]
        fn should_error_if_a_priority_is_out_of_range() {
            let yaml = parse("{name: Blank.esp, priority: 500}");

            assert!(PluginMetadata::try_from_yaml(&yaml).is_err());
        }

        #[test]
        fn should_default_enabled_to_true() {
            let yaml = parse("{name: Blank.esp}");

            assert!(PluginMetadata::try_from_yaml(&yaml).unwrap().is_enabled());
        }

        #[test]
        fn should_read_the_enabled_flag() {
            let yaml = parse("{name: Blank.esp, enabled: false}");

            assert!(!PluginMetadata::try_from_yaml(&yaml).unwrap().is_enabled());
        }

        #[test]
        fn should_read_all_list_fields() {
            let yaml = parse(
                "name: Blank.esp
after: [A.esp]
req: [B.esp]
inc: [C.esp]
msg:
  - type: say
    content: 'a message'
tag: [Relev]
dirty:
  - crc: 0x12345678
    util: cleaner
clean:
  - crc: 0x87654321
    util: cleaner
url: ['https://www.example.com']",
            );

            let plugin = PluginMetadata::try_from_yaml(&yaml).unwrap();

            assert_eq!(1, plugin.load_after_files().len());
            assert_eq!(1, plugin.requirements().len());
            assert_eq!(1, plugin.incompatibilities().len());
            assert_eq!(1, plugin.messages().len());
            assert_eq!(1, plugin.tags().len());
            assert_eq!(1, plugin.dirty_info().len());
            assert_eq!(1, plugin.clean_info().len());
            assert_eq!(1, plugin.locations().len());
        }

        #[test]
        fn should_error_if_a_regex_name_has_dirty_info() {
            let yaml = parse(
                "name: 'Blank.*\\.esp'
dirty:
  - crc: 0x12345678
    util: cleaner",
            );

            assert!(PluginMetadata::try_from_yaml(&yaml).is_err());
        }

        #[test]
        fn should_error_if_a_regex_name_is_invalid() {
            let yaml = parse("{name: '(unclosed\\.esp'}");

            assert!(PluginMetadata::try_from_yaml(&yaml).is_err());
        }
    }
}
