use saphyr::MarkedYaml;

use super::{
    error::ParseMetadataError,
    message::{
        Message, MessageContent, MessageType, parse_message_contents_yaml, select_message_content,
        validate_message_contents,
    },
    yaml::{
        TryFromYaml, YamlObjectType, as_mapping, get_required_string_value, get_u32_value,
        get_value, reject_unknown_keys,
    },
};
use crate::metadata::error::MultilingualMessageContentsError;

/// Represents cleaning data for a specific version of a plugin, identified by
/// the CRC-32 of its file contents.
///
/// Equality considers only the CRC, as the counts and utility are descriptive
/// of the version it identifies.
#[derive(Clone, Debug, Default)]
pub struct PluginCleaningData {
    crc: u32,
    itm_count: u32,
    deleted_reference_count: u32,
    deleted_navmesh_count: u32,
    cleaning_utility: Box<str>,
    info: Box<[MessageContent]>,
}

impl PluginCleaningData {
    /// Construct a [PluginCleaningData] object with the given CRC and cleaning
    /// utility, no info and the ITM, deleted reference and deleted navmesh
    /// counts set to zero.
    #[must_use]
    pub fn new(crc: u32, cleaning_utility: String) -> Self {
        Self {
            crc,
            cleaning_utility: cleaning_utility.into_boxed_str(),
            ..Default::default()
        }
    }

    /// Set the number of Identical To Master records found in the plugin.
    #[must_use]
    pub fn with_itm_count(mut self, itm_count: u32) -> Self {
        self.itm_count = itm_count;
        self
    }

    /// Set the number of deleted references found in the plugin.
    #[must_use]
    pub fn with_deleted_reference_count(mut self, deleted_reference_count: u32) -> Self {
        self.deleted_reference_count = deleted_reference_count;
        self
    }

    /// Set the number of deleted navmeshes found in the plugin.
    #[must_use]
    pub fn with_deleted_navmesh_count(mut self, deleted_navmesh_count: u32) -> Self {
        self.deleted_navmesh_count = deleted_navmesh_count;
        self
    }

    /// Set additional informative message content, e.g. a link to a cleaning
    /// guide. If multilingual, one language must be
    /// [MessageContent::DEFAULT_LANGUAGE].
    pub fn with_info(
        mut self,
        info: Vec<MessageContent>,
    ) -> Result<Self, MultilingualMessageContentsError> {
        validate_message_contents(&info)?;
        self.info = info.into_boxed_slice();
        Ok(self)
    }

    /// Get the CRC that identifies the plugin version that the cleaning data
    /// is for.
    pub fn crc(&self) -> u32 {
        self.crc
    }

    /// Get the number of Identical To Master records found in the plugin.
    pub fn itm_count(&self) -> u32 {
        self.itm_count
    }

    /// Get the number of deleted references found in the plugin.
    pub fn deleted_reference_count(&self) -> u32 {
        self.deleted_reference_count
    }

    /// Get the number of deleted navmeshes found in the plugin.
    pub fn deleted_navmesh_count(&self) -> u32 {
        self.deleted_navmesh_count
    }

    /// Get the cleaning utility that was used to check the plugin.
    pub fn cleaning_utility(&self) -> &str {
        &self.cleaning_utility
    }

    /// Get any additional informative message content supplied with the
    /// cleaning data.
    pub fn info(&self) -> &[MessageContent] {
        &self.info
    }

    /// Build the warning message shown for a plugin that this cleaning data
    /// identifies as dirty, using the info content for the given language.
    #[must_use]
    pub(crate) fn as_dirty_message(&self, language: &str) -> Message {
        let mut text = format!(
            "This plugin contains {} ITM record(s), {} deleted reference(s) and {} deleted navmesh(es). Clean with {}.",
            self.itm_count,
            self.deleted_reference_count,
            self.deleted_navmesh_count,
            self.cleaning_utility
        );

        if let Some(info) = select_message_content(&self.info, language) {
            text.push(' ');
            text.push_str(info.text());
        }

        Message::new(MessageType::Warn, text)
    }
}

impl PartialEq for PluginCleaningData {
    fn eq(&self, other: &Self) -> bool {
        self.crc == other.crc
    }
}

impl Eq for PluginCleaningData {}

impl PartialOrd for PluginCleaningData {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PluginCleaningData {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.crc.cmp(&other.crc)
    }
}

impl std::hash::Hash for PluginCleaningData {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.crc.hash(state);
    }
}

impl TryFromYaml for PluginCleaningData {
    fn try_from_yaml(value: &MarkedYaml) -> Result<Self, ParseMetadataError> {
        let mapping = as_mapping(value, YamlObjectType::PluginCleaningData)?;

        reject_unknown_keys(
            mapping,
            &["crc", "util", "itm", "udr", "nav", "info"],
            YamlObjectType::PluginCleaningData,
        )?;

        let crc = match get_u32_value(mapping, "crc", YamlObjectType::PluginCleaningData)? {
            Some(n) => n,
            None => {
                return Err(ParseMetadataError::missing_key(
                    value.span.start,
                    "crc",
                    YamlObjectType::PluginCleaningData,
                ));
            }
        };

        let util = get_required_string_value(
            value.span.start,
            mapping,
            "util",
            YamlObjectType::PluginCleaningData,
        )?;

        let itm = get_u32_value(mapping, "itm", YamlObjectType::PluginCleaningData)?.unwrap_or(0);
        let udr = get_u32_value(mapping, "udr", YamlObjectType::PluginCleaningData)?.unwrap_or(0);
        let nav = get_u32_value(mapping, "nav", YamlObjectType::PluginCleaningData)?.unwrap_or(0);

        let info = match get_value(mapping, "info") {
            Some(n) => parse_message_contents_yaml(n, "info", YamlObjectType::PluginCleaningData)?,
            None => Box::default(),
        };

        Ok(PluginCleaningData {
            crc,
            itm_count: itm,
            deleted_reference_count: udr,
            deleted_navmesh_count: nav,
            cleaning_utility: util.into(),
            info,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod eq {
        use super::*;

        #[test]
        fn should_consider_only_the_crc() {
            assert_eq!(
                PluginCleaningData::new(0xDEAD_BEEF, "TES4Edit".into()),
                PluginCleaningData::new(0xDEAD_BEEF, "TES5Edit".into()).with_itm_count(4)
            );
            assert_ne!(
                PluginCleaningData::new(0xDEAD_BEEF, "TES4Edit".into()),
                PluginCleaningData::new(0xCAFE_D00D, "TES4Edit".into())
            );
        }
    }

    mod as_dirty_message {
        use super::*;

        #[test]
        fn should_mention_counts_and_the_cleaning_utility() {
            let data = PluginCleaningData::new(0xDEAD_BEEF, "TES4Edit".into())
                .with_itm_count(2)
                .with_deleted_reference_count(10);

            let message = data.as_dirty_message("en");

            assert_eq!(MessageType::Warn, message.message_type());
            let text = message.content()[0].text();
            assert!(text.contains("2 ITM record(s)"));
            assert!(text.contains("10 deleted reference(s)"));
            assert!(text.contains("0 deleted navmesh(es)"));
            assert!(text.contains("TES4Edit"));
        }

        #[test]
        fn should_append_localised_info_content() {
            let data = PluginCleaningData::new(0xDEAD_BEEF, "TES4Edit".into())
                .with_info(vec![
                    MessageContent::new("english info".into()),
                    MessageContent::new("french info".into()).with_language("fr".into()),
                ])
                .unwrap();

            let message = data.as_dirty_message("fr");

            assert!(message.content()[0].text().ends_with("french info"));
        }
    }

    mod try_from_yaml {
        use crate::metadata::parse;

        use super::*;

        #[test]
        fn should_error_if_given_a_scalar() {
            let yaml = parse("0x12345678");

            assert!(PluginCleaningData::try_from_yaml(&yaml).is_err());
        }

        #[test]
        fn should_error_if_crc_is_missing() {
            let yaml = parse("{util: cleaner}");

            assert!(PluginCleaningData::try_from_yaml(&yaml).is_err());
        }

        #[test]
        fn should_error_if_util_is_missing() {
            let yaml = parse("{crc: 0x12345678}");

            assert!(PluginCleaningData::try_from_yaml(&yaml).is_err());
        }

        #[test]
        fn should_error_if_given_an_unknown_key() {
            let yaml = parse("{crc: 0x12345678, util: cleaner, itms: 1}");

            assert!(PluginCleaningData::try_from_yaml(&yaml).is_err());
        }

        #[test]
        fn should_default_counts_to_zero() {
            let yaml = parse("{crc: 0x12345678, util: cleaner}");

            let data = PluginCleaningData::try_from_yaml(&yaml).unwrap();

            assert_eq!(0x1234_5678, data.crc());
            assert_eq!("cleaner", data.cleaning_utility());
            assert_eq!(0, data.itm_count());
            assert_eq!(0, data.deleted_reference_count());
            assert_eq!(0, data.deleted_navmesh_count());
            assert!(data.info().is_empty());
        }

        #[test]
        fn should_set_all_given_fields() {
            let yaml =
                parse("{crc: 0x12345678, util: cleaner, itm: 1, udr: 2, nav: 3, info: 'a note'}");

            let data = PluginCleaningData::try_from_yaml(&yaml).unwrap();

            assert_eq!(1, data.itm_count());
            assert_eq!(2, data.deleted_reference_count());
            assert_eq!(3, data.deleted_navmesh_count());
            assert_eq!(&[MessageContent::new("a note".into())], data.info());
        }
    }
}
