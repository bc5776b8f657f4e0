pub(crate) mod error;

use std::path::Path;

use esplugin::ParseOptions;

use crate::{
    GameType,
    conditions::calculate_crc,
    logging,
    metadata::{Message, MessageType, iends_with_ascii, trim_dot_ghost},
    version::extract_version,
};
use error::{
    InvalidFilenameReason, LoadPluginError, PluginValidationError, PluginValidationErrorReason,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub(crate) enum LoadScope {
    HeaderOnly,
    WholePlugin,
}

impl std::fmt::Display for LoadScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadScope::HeaderOnly => write!(f, "plugin header"),
            LoadScope::WholePlugin => write!(f, "whole plugin"),
        }
    }
}

/// Represents a plugin file that has been loaded.
#[derive(Debug)]
pub struct Plugin {
    name: String,
    plugin: Option<esplugin::Plugin>,
    crc: Option<u32>,
    version: Option<String>,
    tags: Vec<String>,
    loads_archive: bool,
    messages: Vec<Message>,
}

impl Plugin {
    pub(crate) fn new(
        game_type: GameType,
        data_path: &Path,
        plugin_path: &Path,
        load_scope: LoadScope,
    ) -> Result<Self, LoadPluginError> {
        let name = name_string(plugin_path)?;

        let (parse_options, crc) = if load_scope == LoadScope::HeaderOnly {
            (ParseOptions::header_only(), None)
        } else {
            let crc = calculate_crc(plugin_path)?;
            (ParseOptions::whole_plugin(), Some(crc))
        };

        let mut plugin = esplugin::Plugin::new(game_type.into(), plugin_path);
        plugin.parse_file(parse_options)?;

        let mut version = None;
        let mut tags = Vec::new();
        if let Some(description) = plugin.description()? {
            tags = extract_bash_tags(&description);
            version = extract_version(&description);
        }

        let loads_archive = loads_archive(game_type, data_path, &name);

        Ok(Self {
            name,
            plugin: Some(plugin),
            crc,
            version,
            tags,
            loads_archive,
            messages: Vec::new(),
        })
    }

    /// Create a stub for a plugin that could not be loaded, carrying an
    /// error message describing the failure in place of plugin data.
    pub(crate) fn with_load_failure(name: String, details: &str) -> Self {
        Self {
            name,
            plugin: None,
            crc: None,
            version: None,
            tags: Vec::new(),
            loads_archive: false,
            messages: vec![Message::new(
                MessageType::Error,
                format!("An error occurred while loading this plugin. Details: {details}"),
            )],
        }
    }

    /// Get the plugin's filename.
    ///
    /// If the plugin was ghosted when it was loaded, this filename is without
    /// the .ghost suffix.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the plugin's version number from its description field.
    ///
    /// The description field may not contain a version number, or the version
    /// may not be detected. The description field parsing may fail to extract
    /// the version number correctly, though it functions correctly in all
    /// known cases.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Get the plugin's masters.
    pub fn masters(&self) -> Result<Vec<String>, error::PluginDataError> {
        self.plugin
            .as_ref()
            .map(|p| p.masters().map_err(Into::into))
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    /// Get any Bash Tags found in the plugin's description field.
    pub fn bash_tags(&self) -> &[String] {
        &self.tags
    }

    /// Get the plugin's CRC-32 checksum.
    ///
    /// This will be `None` if the plugin is not fully loaded.
    pub fn crc(&self) -> Option<u32> {
        self.crc
    }

    /// Check if the plugin is a master plugin, i.e. has its master flag set.
    ///
    /// The term "master" is potentially confusing: a plugin A may not be a
    /// *master plugin*, but may still be a *master of* another plugin by being
    /// listed as such in that plugin's header record.
    pub fn is_master(&self) -> bool {
        self.plugin
            .as_ref()
            .map(|p| p.is_master_file())
            .unwrap_or(false)
    }

    /// Check if the plugin contains any records other than its header.
    pub fn is_empty(&self) -> bool {
        self.plugin
            .as_ref()
            .and_then(|p| p.record_and_group_count())
            .unwrap_or(0)
            == 0
    }

    /// Check if the game will load an archive alongside this plugin.
    pub fn loads_archive(&self) -> bool {
        self.loads_archive
    }

    /// Get the messages attached to this plugin, e.g. describing a load
    /// failure.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Check if the plugin's record data has been loaded, which is only true
    /// if the whole plugin was parsed.
    pub fn is_fully_loaded(&self) -> bool {
        self.crc.is_some()
    }

    /// Check if two plugins contain a record with the same ID.
    ///
    /// Record data is only present for fully-loaded plugins: a plugin that
    /// was loaded headers-only overlaps nothing.
    pub fn do_records_overlap(&self, plugin: &Plugin) -> Result<bool, error::PluginDataError> {
        if !self.is_fully_loaded() || !plugin.is_fully_loaded() {
            return Ok(false);
        }

        if let (Some(plugin), Some(other_plugin)) = (&self.plugin, &plugin.plugin) {
            plugin.overlaps_with(other_plugin).map_err(Into::into)
        } else {
            Ok(false)
        }
    }

    /// Get the number of records in this plugin that override records defined
    /// by its masters.
    pub(crate) fn override_record_count(&self) -> Result<usize, error::PluginDataError> {
        if !self.is_fully_loaded() {
            return Ok(0);
        }

        self.plugin
            .as_ref()
            .map(|p| p.count_override_records().map_err(Into::into))
            .unwrap_or(Ok(0))
    }
}

pub(crate) fn validate_plugin_path_and_header(
    game_type: GameType,
    plugin_path: &Path,
) -> Result<(), PluginValidationError> {
    if !has_plugin_file_extension(plugin_path) {
        logging::debug!(
            "The file \"{}\" is not a valid plugin",
            plugin_path.display()
        );
        Err(PluginValidationError::invalid(
            plugin_path.into(),
            InvalidFilenameReason::UnsupportedFileExtension,
        ))
    } else if esplugin::Plugin::is_valid(game_type.into(), plugin_path, ParseOptions::header_only())
    {
        Ok(())
    } else {
        logging::debug!(
            "The file \"{}\" is not a valid plugin",
            plugin_path.display()
        );
        Err(PluginValidationError::new(
            plugin_path.into(),
            PluginValidationErrorReason::InvalidPluginHeader,
        ))
    }
}

fn has_plugin_file_extension(plugin_path: &Path) -> bool {
    let extension = if has_ascii_extension(plugin_path, "ghost") {
        plugin_path
            .file_stem()
            .and_then(|s| Path::new(s).extension())
    } else {
        plugin_path.extension()
    };

    extension.is_some_and(|extension| {
        extension.eq_ignore_ascii_case("esp") || extension.eq_ignore_ascii_case("esm")
    })
}

pub(crate) fn has_ascii_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

/// Check if the game will auto-load an archive alongside the given plugin.
///
/// Skyrim loads an archive whose basename exactly matches the plugin's;
/// Oblivion loads archives whose names start with an .esp plugin's basename;
/// Fallout 3, New Vegas and Fallout 4 load archives whose names start with
/// any plugin's basename.
fn loads_archive(game_type: GameType, data_path: &Path, plugin_name: &str) -> bool {
    let Some(stem) = plugin_name.rsplit_once('.').map(|(stem, _)| stem) else {
        return false;
    };

    let archive_extension = game_type.archive_file_extension();

    if game_type == GameType::Skyrim {
        data_path.join(format!("{stem}{archive_extension}")).exists()
    } else if game_type == GameType::Oblivion && !iends_with_ascii(plugin_name, ".esp") {
        false
    } else {
        let Ok(dir_iterator) = std::fs::read_dir(data_path) else {
            return false;
        };

        dir_iterator.filter_map(Result::ok).any(|entry| {
            let filename = entry.file_name();
            let Some(filename) = filename.to_str() else {
                return false;
            };

            iends_with_ascii(filename, archive_extension)
                && filename.len() >= stem.len()
                && filename
                    .get(..stem.len())
                    .is_some_and(|prefix| unicase::eq(prefix, stem))
        })
    }
}

fn name_string(path: &Path) -> Result<String, LoadPluginError> {
    match path.file_name() {
        Some(f) => match f.to_str() {
            Some(f) => Ok(trim_dot_ghost(f).to_string()),
            None => Err(LoadPluginError::InvalidFilename(
                InvalidFilenameReason::NonUnicode,
            )),
        },
        None => Err(LoadPluginError::InvalidFilename(
            InvalidFilenameReason::Empty,
        )),
    }
}

fn extract_bash_tags(description: &str) -> Vec<String> {
    let bash_tags_opener = "{{BASH:";

    if let Some(start_pos) = description.find(bash_tags_opener) {
        let tags = &description[start_pos + bash_tags_opener.len()..];

        if let Some(end_pos) = tags.find("}}") {
            return tags[..end_pos]
                .split(',')
                .map(|s| s.trim().to_string())
                .collect();
        }
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    mod extract_bash_tags {
        use super::*;

        #[test]
        fn should_extract_comma_separated_tags() {
            let tags = extract_bash_tags(
                "A description.\n{{BASH: Relev, Delev, C.Water}}\nMore text.",
            );

            assert_eq!(vec!["Relev", "Delev", "C.Water"], tags);
        }

        #[test]
        fn should_return_no_tags_if_the_marker_is_absent() {
            assert!(extract_bash_tags("A description.").is_empty());
        }

        #[test]
        fn should_return_no_tags_if_the_marker_is_unterminated() {
            assert!(extract_bash_tags("{{BASH: Relev").is_empty());
        }
    }

    mod has_plugin_file_extension {
        use super::*;

        #[test]
        fn should_accept_esp_and_esm_case_insensitively() {
            assert!(has_plugin_file_extension(Path::new("Blank.esp")));
            assert!(has_plugin_file_extension(Path::new("Blank.ESM")));
        }

        #[test]
        fn should_look_through_a_ghost_extension() {
            assert!(has_plugin_file_extension(Path::new("Blank.esp.ghost")));
            assert!(!has_plugin_file_extension(Path::new("Blank.bsa.ghost")));
        }

        #[test]
        fn should_reject_other_extensions() {
            assert!(!has_plugin_file_extension(Path::new("Blank.esl")));
            assert!(!has_plugin_file_extension(Path::new("Blank.bsa")));
            assert!(!has_plugin_file_extension(Path::new("Blank")));
        }
    }

    mod name_string {
        use super::*;

        #[test]
        fn should_trim_a_ghost_suffix() {
            assert_eq!(
                "Blank.esp",
                name_string(Path::new("Data/Blank.esp.ghost")).unwrap()
            );
        }
    }

    mod loads_archive {
        use super::*;

        fn data_dir() -> TempDir {
            let temp_dir = TempDir::new().unwrap();

            std::fs::write(temp_dir.path().join("Blank.bsa"), "").unwrap();
            std::fs::write(temp_dir.path().join("Blank - Extra.bsa"), "").unwrap();
            std::fs::write(temp_dir.path().join("Blank - Extra.ba2"), "").unwrap();

            temp_dir
        }

        #[test]
        fn should_require_an_exact_basename_match_for_skyrim() {
            let data_dir = data_dir();

            assert!(loads_archive(GameType::Skyrim, data_dir.path(), "Blank.esp"));
            assert!(!loads_archive(
                GameType::Skyrim,
                data_dir.path(),
                "Blank - Different.esp"
            ));
        }

        #[test]
        fn should_match_a_basename_prefix_for_fallout_games() {
            let data_dir = data_dir();

            assert!(loads_archive(
                GameType::Fallout3,
                data_dir.path(),
                "Blank.esm"
            ));
            assert!(loads_archive(
                GameType::FalloutNV,
                data_dir.path(),
                "Blank.esp"
            ));
        }

        #[test]
        fn should_only_match_esp_plugins_for_oblivion() {
            let data_dir = data_dir();

            assert!(loads_archive(
                GameType::Oblivion,
                data_dir.path(),
                "Blank.esp"
            ));
            assert!(!loads_archive(
                GameType::Oblivion,
                data_dir.path(),
                "Blank.esm"
            ));
        }

        #[test]
        fn should_match_ba2_archives_for_fallout4() {
            let data_dir = data_dir();

            assert!(loads_archive(
                GameType::Fallout4,
                data_dir.path(),
                "Blank - Extra.esp"
            ));
            assert!(!loads_archive(
                GameType::Fallout4,
                data_dir.path(),
                "Missing.esp"
            ));
        }

        #[test]
        fn should_compare_basenames_case_insensitively() {
            let data_dir = data_dir();

            assert!(loads_archive(
                GameType::FalloutNV,
                data_dir.path(),
                "BLANK.esp"
            ));
        }
    }
}
