use std::{
    collections::HashMap,
    fmt::Display,
    path::{Path, PathBuf},
    sync::Arc,
};

use loadorder::WritableLoadOrder;
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::{
    conditions::State,
    database::{Database, conditions::evaluate_all_conditions},
    error::{
        GameHandleCreationError, LoadOrderError, LoadPluginsError, SortPluginsError,
    },
    escape_ascii,
    logging::{self, format_details},
    metadata::{
        Filename, GHOST_FILE_EXTENSION, Message, MessageType, PluginMetadata, Tag, TagSuggestion,
        iends_with_ascii,
    },
    plugin::{LoadScope, Plugin, validate_plugin_path_and_header},
    sorting::plugins::{PluginSortingData, sort_plugins},
};

/// The Bash Tag that marks a plugin as a filter patch, which the game can
/// load with some of its masters missing.
const FILTER_TAG_NAME: &str = "Filter";

/// Codes used to create game handles for specific games.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[non_exhaustive]
pub enum GameType {
    /// The Elder Scrolls IV: Oblivion
    Oblivion,
    /// The Elder Scrolls V: Skyrim
    Skyrim,
    /// Fallout 3
    Fallout3,
    /// Fallout: New Vegas
    FalloutNV,
    /// Fallout 4
    Fallout4,
}

impl GameType {
    /// Get the filename of the game's main master file.
    pub fn master_file(self) -> &'static str {
        match self {
            GameType::Oblivion => "Oblivion.esm",
            GameType::Skyrim => "Skyrim.esm",
            GameType::Fallout3 => "Fallout3.esm",
            GameType::FalloutNV => "FalloutNV.esm",
            GameType::Fallout4 => "Fallout4.esm",
        }
    }

    pub(crate) fn archive_file_extension(self) -> &'static str {
        match self {
            GameType::Fallout4 => ".ba2",
            _ => ".bsa",
        }
    }
}

impl Display for GameType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameType::Oblivion => write!(f, "The Elder Scrolls IV: Oblivion"),
            GameType::Skyrim => write!(f, "The Elder Scrolls V: Skyrim"),
            GameType::Fallout3 => write!(f, "Fallout 3"),
            GameType::FalloutNV => write!(f, "Fallout: New Vegas"),
            GameType::Fallout4 => write!(f, "Fallout 4"),
        }
    }
}

impl From<GameType> for loadorder::GameId {
    fn from(value: GameType) -> Self {
        match value {
            GameType::Oblivion => loadorder::GameId::Oblivion,
            GameType::Skyrim => loadorder::GameId::Skyrim,
            GameType::Fallout3 => loadorder::GameId::Fallout3,
            GameType::FalloutNV => loadorder::GameId::FalloutNV,
            GameType::Fallout4 => loadorder::GameId::Fallout4,
        }
    }
}

impl From<GameType> for esplugin::GameId {
    fn from(value: GameType) -> Self {
        match value {
            GameType::Oblivion => esplugin::GameId::Oblivion,
            GameType::Skyrim => esplugin::GameId::Skyrim,
            GameType::Fallout3 => esplugin::GameId::Fallout3,
            GameType::FalloutNV => esplugin::GameId::FalloutNV,
            GameType::Fallout4 => esplugin::GameId::Fallout4,
        }
    }
}

/// A plugin's entry in a sort result: its filename and the diagnostic
/// messages that merging and evaluating its metadata produced.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SortedPlugin {
    name: String,
    messages: Vec<Message>,
}

impl SortedPlugin {
    /// Get the plugin's filename.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the plugin's diagnostic messages, in the order they were produced.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }
}

/// The result of sorting a game's installed plugins.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SortResult {
    plugins: Vec<SortedPlugin>,
    general_messages: Vec<Message>,
}

impl SortResult {
    /// Get the sorted plugins, in their calculated load order.
    pub fn plugins(&self) -> &[SortedPlugin] {
        &self.plugins
    }

    /// Get the calculated load order as a list of plugin filenames.
    pub fn load_order(&self) -> Vec<&str> {
        self.plugins.iter().map(SortedPlugin::name).collect()
    }

    /// Get the evaluated messages that apply to the game as a whole rather
    /// than to one plugin.
    pub fn general_messages(&self) -> &[Message] {
        &self.general_messages
    }
}

/// The interface through which game-specific functionality is provided.
#[derive(Debug)]
pub struct Game {
    game_type: GameType,
    game_path: PathBuf,
    load_order: Box<(dyn WritableLoadOrder + Send + Sync + 'static)>,
    database: Database,
    plugins: HashMap<Filename, Arc<Plugin>>,
    merged_metadata: HashMap<Filename, PluginMetadata>,
}

impl Game {
    /// Initialise a new game handle, which is then used by all game-specific
    /// functions.
    ///
    /// - `game_type` is a value representing which game to create the handle
    ///   for,
    /// - `game_path` is the relative or absolute path to the directory
    ///   containing the game's executable.
    pub fn new(game_type: GameType, game_path: &Path) -> Result<Self, GameHandleCreationError> {
        logging::info!(
            "Attempting to create a game handle for game type \"{}\" with game path \"{}\"",
            game_type,
            escape_ascii(game_path)
        );

        if !game_path.is_dir() {
            return Err(GameHandleCreationError::NotADirectory(game_path.into()));
        }

        let load_order = loadorder::GameSettings::new(game_type.into(), game_path)?.into_load_order();

        let condition_evaluator_state = State::new(data_path(game_path));

        Ok(Game {
            game_type,
            game_path: game_path.into(),
            load_order,
            database: Database::new(condition_evaluator_state),
            plugins: HashMap::new(),
            merged_metadata: HashMap::new(),
        })
    }

    /// Initialise a new game handle using the given game local data path
    /// instead of looking it up.
    ///
    /// The local data folder is usually in `%LOCALAPPDATA%`, but its name and
    /// location varies by game and game configuration, so it can be given
    /// explicitly.
    pub fn with_local_path(
        game_type: GameType,
        game_path: &Path,
        game_local_path: &Path,
    ) -> Result<Self, GameHandleCreationError> {
        logging::info!(
            "Attempting to create a game handle for game type \"{}\" with game path \"{}\" and game local path \"{}\"",
            game_type,
            escape_ascii(game_path),
            escape_ascii(game_local_path)
        );

        if !game_path.is_dir() {
            return Err(GameHandleCreationError::NotADirectory(game_path.into()));
        }

        if game_local_path.exists() && !game_local_path.is_dir() {
            return Err(GameHandleCreationError::NotADirectory(
                game_local_path.into(),
            ));
        }

        let load_order = loadorder::GameSettings::with_local_path(
            game_type.into(),
            game_path,
            game_local_path,
        )?
        .into_load_order();

        let condition_evaluator_state = State::new(data_path(game_path));

        Ok(Game {
            game_type,
            game_path: game_path.into(),
            load_order,
            database: Database::new(condition_evaluator_state),
            plugins: HashMap::new(),
            merged_metadata: HashMap::new(),
        })
    }

    /// Get the game's type.
    pub fn game_type(&self) -> GameType {
        self.game_type
    }

    /// Get the game's data directory, where its plugins are installed.
    pub fn data_path(&self) -> PathBuf {
        data_path(&self.game_path)
    }

    /// Get the object used for accessing metadata-related functionality.
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Get a mutable reference to the object used for accessing
    /// metadata-related functionality.
    pub fn database_mut(&mut self) -> &mut Database {
        &mut self.database
    }

    /// Check if a file is a valid plugin.
    ///
    /// The validity check is not exhaustive: it checks that the filename has
    /// a plugin file extension (after stripping any .ghost suffix), and that
    /// the file's header can be parsed.
    pub fn is_valid_plugin(&self, plugin_name: &str) -> bool {
        let plugin_path = resolve_plugin_path(&self.data_path(), Path::new(plugin_name));

        validate_plugin_path_and_header(self.game_type, &plugin_path).is_ok()
    }

    /// Find and load all installed plugins by scanning the game's data
    /// directory.
    ///
    /// If `headers_only` is true only plugin headers are parsed, which is
    /// enough for metadata evaluation but not for sorting. The game's main
    /// master file is always loaded headers-only, as its full record data is
    /// huge and never needed: every other master-dependent plugin lists it as
    /// a master anyway.
    ///
    /// Per-plugin read failures do not fail the whole load: a failed plugin
    /// is recorded with an error message attached.
    ///
    /// Loading plugins clears the condition cache in this game's database
    /// object.
    pub fn load_installed_plugins(
        &mut self,
        headers_only: bool,
    ) -> Result<(), LoadPluginsError> {
        let data_path = self.data_path();

        let plugin_paths = find_installed_plugins(self.game_type, &data_path)?;

        logging::trace!(
            "Loading {} installed plugins from \"{}\".",
            plugin_paths.len(),
            escape_ascii(&data_path)
        );

        let game_type = self.game_type;
        let main_master = self.game_type.master_file();

        let plugins: Vec<_> = plugin_paths
            .into_par_iter()
            .filter_map(|path| {
                let load_scope = if headers_only || is_main_master(&path, main_master) {
                    LoadScope::HeaderOnly
                } else {
                    LoadScope::WholePlugin
                };

                try_load_plugin(game_type, &data_path, &path, load_scope)
            })
            .collect();

        self.plugins = plugins
            .into_iter()
            .map(|p| (Filename::new(p.name().to_owned()), Arc::new(p)))
            .collect();
        self.merged_metadata.clear();

        self.update_loaded_plugin_state();

        Ok(())
    }

    /// Clears the plugins loaded by a previous call to
    /// [Game::load_installed_plugins].
    pub fn clear_loaded_plugins(&mut self) {
        self.plugins.clear();
        self.merged_metadata.clear();
    }

    /// Get data for a loaded plugin.
    pub fn plugin(&self, plugin_name: &str) -> Option<Arc<Plugin>> {
        self.plugins
            .get(&Filename::new(plugin_name.to_owned()))
            .cloned()
    }

    /// Get data for all loaded plugins.
    pub fn loaded_plugins(&self) -> Vec<Arc<Plugin>> {
        self.plugins.values().cloned().collect()
    }

    /// Get a loaded plugin's merged and evaluated metadata, as produced by
    /// the last call to [Game::sort_plugins].
    pub fn plugin_merged_metadata(&self, plugin_name: &str) -> Option<&PluginMetadata> {
        self.merged_metadata
            .get(&Filename::new(plugin_name.to_owned()))
    }

    /// Load the current load order state, discarding any previously held
    /// state.
    ///
    /// This function should be called whenever the load order or active state
    /// of plugins "on disk" changes, so that the cached state is updated to
    /// reflect the changes.
    ///
    /// Loading the current load order state clears the condition cache in
    /// this game's database object.
    pub fn load_current_load_order_state(&mut self) -> Result<(), LoadOrderError> {
        self.load_order.load()?;

        self.database.clear_condition_cache();
        self.database
            .condition_evaluator_state_mut()
            .set_active_plugins(&self.load_order.active_plugin_names());

        Ok(())
    }

    /// Check if the given plugin is active.
    pub fn is_plugin_active(&self, plugin_name: &str) -> bool {
        self.load_order.is_active(plugin_name)
    }

    /// Get the current load order.
    pub fn load_order(&self) -> Vec<&str> {
        self.load_order.plugin_names()
    }

    /// Set the game's load order and save it.
    pub fn set_load_order(&mut self, load_order: &[&str]) -> Result<(), LoadOrderError> {
        self.load_order.set_load_order(load_order)?;
        self.load_order.save()?;
        Ok(())
    }

    /// Calculates a new load order for the game's installed plugins
    /// (including inactive plugins) and returns the sorted order together
    /// with the diagnostic messages that metadata evaluation produced.
    ///
    /// This (re-)loads the installed plugins and the current load order
    /// state, merges each plugin's metadata from its description field, the
    /// masterlist and the userlist, evaluates the metadata conditions, checks
    /// install validity and then builds and sorts the plugin graph. Message
    /// content is selected for the given language.
    ///
    /// No changes are applied to the load order used by the game: apply the
    /// result with [Game::set_load_order] if that's wanted.
    pub fn sort_plugins(&mut self, language: &str) -> Result<SortResult, SortPluginsError> {
        self.load_installed_plugins(false)
            .map_err(SortPluginsError::from)?;
        self.load_current_load_order_state()?;

        logging::debug!("Current load order:");
        for plugin_name in self.load_order.plugin_names() {
            logging::debug!("\t{plugin_name}");
        }

        // Merge and evaluate each installed plugin's metadata.
        let mut merged_metadata = HashMap::new();
        for plugin in self.plugins.values() {
            let metadata = self.merge_and_evaluate_metadata(plugin, language)?;
            merged_metadata.insert(Filename::new(plugin.name().to_owned()), metadata);
        }
        self.merged_metadata = merged_metadata;

        let current_load_order = self.load_order.plugin_names();

        let plugins_sorting_data = self
            .plugins
            .values()
            .map(|plugin| {
                let metadata = self
                    .merged_metadata
                    .get(&Filename::new(plugin.name().to_owned()));
                let load_order_index = current_load_order
                    .iter()
                    .position(|name| unicase::eq(*name, plugin.name()));

                PluginSortingData::new(plugin.as_ref(), metadata, load_order_index)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let new_load_order = sort_plugins(plugins_sorting_data)?;

        logging::debug!("Sorted load order:");
        for plugin_name in &new_load_order {
            logging::debug!("\t{plugin_name}");
        }

        let plugins = new_load_order
            .into_iter()
            .map(|name| {
                let messages = self
                    .merged_metadata
                    .get(&Filename::new(name.clone()))
                    .map(|m| m.messages().to_vec())
                    .unwrap_or_default();

                SortedPlugin { name, messages }
            })
            .collect();

        let general_messages = self
            .database
            .general_messages(true)?
            .iter()
            .map(|m| m.localised(language))
            .collect();

        Ok(SortResult {
            plugins,
            general_messages,
        })
    }

    /// Produce a plugin's effective metadata: its intrinsic description tags,
    /// merged with the masterlist's and enabled userlist's entries, with
    /// conditions evaluated, messages localised, cleaning data filtered by
    /// CRC and install validity checked.
    fn merge_and_evaluate_metadata(
        &self,
        plugin: &Plugin,
        language: &str,
    ) -> Result<PluginMetadata, SortPluginsError> {
        logging::trace!("Merging metadata for plugin \"{}\"", plugin.name());

        let mut metadata = match PluginMetadata::new(plugin.name()) {
            Ok(m) => m,
            Err(e) => {
                // Installed plugin names are literal, so this regex error
                // should be unreachable.
                logging::error!(
                    "Could not create a metadata object for \"{}\": {}",
                    plugin.name(),
                    format_details(&e)
                );
                return Err(crate::database::MetadataRetrievalError::from(e).into());
            }
        };

        metadata.set_messages(plugin.messages().to_vec());
        metadata.set_tags(
            plugin
                .bash_tags()
                .iter()
                .map(|tag| Tag::new(tag.clone(), TagSuggestion::Addition))
                .collect(),
        );

        if let Some(masterlist_metadata) = self
            .database
            .plugin_metadata(plugin.name(), false, false)?
        {
            metadata.merge_metadata(&masterlist_metadata);
        }

        if let Some(user_metadata) = self.database.plugin_user_metadata(plugin.name(), false)?
            && user_metadata.is_enabled()
        {
            metadata.merge_metadata(&user_metadata);
        }

        let state = self.database.condition_evaluator_state();
        let mut metadata = match evaluate_all_conditions(metadata, state) {
            Ok(Some(metadata)) => metadata,
            Ok(None) => match PluginMetadata::new(plugin.name()) {
                Ok(m) => m,
                Err(e) => return Err(crate::database::MetadataRetrievalError::from(e).into()),
            },
            Err(e) => {
                // A condition that cannot be evaluated is a metadata bug, but
                // it shouldn't stop the plugin from being sorted: report it
                // on the plugin instead.
                logging::error!(
                    "\"{}\" contains a condition that could not be evaluated: {}",
                    plugin.name(),
                    format_details(&e)
                );

                let mut metadata = match PluginMetadata::new(plugin.name()) {
                    Ok(m) => m,
                    Err(e) => {
                        return Err(crate::database::MetadataRetrievalError::from(e).into());
                    }
                };
                metadata.set_messages(plugin.messages().to_vec());
                metadata.set_tags(
                    plugin
                        .bash_tags()
                        .iter()
                        .map(|tag| Tag::new(tag.clone(), TagSuggestion::Addition))
                        .collect(),
                );
                metadata.add_message(Message::new(
                    MessageType::Error,
                    format!(
                        "\"{}\" contains a condition that could not be evaluated. Details: {}",
                        plugin.name(),
                        format_details(&e)
                    ),
                ));
                metadata
            }
        };

        self.check_install_validity(plugin, &mut metadata, language);

        let messages = metadata
            .messages()
            .iter()
            .map(|m| m.localised(language))
            .collect();
        metadata.set_messages(messages);

        Ok(metadata)
    }

    /// Check that the plugin's masters, requirements and incompatibilities
    /// are consistent with the installed files, attaching a message for each
    /// problem found. Problems are errors if the plugin is active and
    /// warnings if not.
    ///
    /// The Filter tag suppresses only the master diagnostics: a filter patch
    /// is designed to load with masters missing, but its requirement and
    /// incompatibility metadata still hold.
    fn check_install_validity(&self, plugin: &Plugin, metadata: &mut PluginMetadata, language: &str) {
        logging::trace!(
            "Checking that the current install is valid according to \"{}\"'s data.",
            plugin.name()
        );

        let message_type = if self.is_plugin_active(plugin.name()) {
            MessageType::Error
        } else {
            MessageType::Warn
        };

        let is_filter_patch = metadata
            .tags()
            .iter()
            .any(|tag| tag.is_addition() && tag.name() == FILTER_TAG_NAME);

        if !is_filter_patch {
            for master in plugin.masters().unwrap_or_default() {
                if !self.file_exists_in_data(&master) {
                    logging::error!(
                        "\"{}\" requires \"{}\", but it is missing.",
                        plugin.name(),
                        master
                    );
                    metadata.add_message(Message::new(
                        message_type,
                        format!(
                            "This plugin requires \"{master}\" to be installed, but it is missing."
                        ),
                    ));
                } else if !self.is_plugin_active(&master) {
                    logging::error!(
                        "\"{}\" requires \"{}\", but it is inactive.",
                        plugin.name(),
                        master
                    );
                    metadata.add_message(Message::new(
                        message_type,
                        format!(
                            "This plugin requires \"{master}\" to be active, but it is inactive."
                        ),
                    ));
                }
            }
        }

        for requirement in metadata.requirements().to_vec() {
            let name = requirement.name().as_str();
            if !self.file_exists_in_data(name) {
                logging::error!(
                    "\"{}\" requires \"{}\", but it is missing.",
                    plugin.name(),
                    name
                );
                let display_name = requirement.display_name().unwrap_or(name);
                metadata.add_message(Message::new(
                    message_type,
                    format!(
                        "This plugin requires \"{display_name}\" to be installed, but it is missing."
                    ),
                ));
            }
        }

        for incompatibility in metadata.incompatibilities().to_vec() {
            let name = incompatibility.name().as_str();
            if self.file_exists_in_data(name) {
                let message_type = if self.is_plugin_active(name) {
                    message_type
                } else {
                    MessageType::Warn
                };

                logging::error!(
                    "\"{}\" is incompatible with \"{}\", but both are present.",
                    plugin.name(),
                    name
                );
                let display_name = incompatibility.display_name().unwrap_or(name);
                metadata.add_message(Message::new(
                    message_type,
                    format!(
                        "This plugin is incompatible with \"{display_name}\", but both are present."
                    ),
                ));
            }
        }

        for dirty_info in metadata.dirty_info().to_vec() {
            metadata.add_message(dirty_info.as_dirty_message(language));
        }
    }

    fn file_exists_in_data(&self, filename: &str) -> bool {
        let file_path = self.data_path().join(filename);

        if file_path.exists() {
            return true;
        }

        if iends_with_ascii(filename, ".esp") || iends_with_ascii(filename, ".esm") {
            self.data_path()
                .join(format!("{filename}{GHOST_FILE_EXTENSION}"))
                .exists()
        } else {
            false
        }
    }

    /// Copy the loaded plugins' versions and CRCs into the condition
    /// evaluator's state, and clear the condition cache.
    fn update_loaded_plugin_state(&mut self) {
        let mut plugin_versions = Vec::new();
        let mut plugin_crcs = Vec::new();

        for plugin in self.plugins.values() {
            if let Some(version) = plugin.version() {
                plugin_versions.push((plugin.name(), version));
            }

            if let Some(crc) = plugin.crc() {
                plugin_crcs.push((plugin.name(), crc));
            }
        }

        let state = self.database.condition_evaluator_state_mut();
        state.clear_condition_cache();
        state.set_plugin_versions(&plugin_versions);
        state.set_cached_crcs(&plugin_crcs);
    }
}

fn data_path(game_path: &Path) -> PathBuf {
    game_path.join("Data")
}

fn is_main_master(plugin_path: &Path, main_master: &str) -> bool {
    plugin_path
        .file_name()
        .and_then(|f| f.to_str())
        .is_some_and(|f| unicase::eq(f, main_master))
}

/// Scan the data directory for valid plugin files.
fn find_installed_plugins(
    game_type: GameType,
    data_path: &Path,
) -> std::io::Result<Vec<PathBuf>> {
    if !data_path.exists() {
        return Ok(Vec::new());
    }

    let mut plugin_paths: Vec<_> = std::fs::read_dir(data_path)?
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|entry| entry.path())
        .filter(|path| validate_plugin_path_and_header(game_type, path).is_ok())
        .collect();

    // Sort the paths so that the load doesn't depend on directory iteration
    // order.
    plugin_paths.sort();

    Ok(plugin_paths)
}

fn try_load_plugin(
    game_type: GameType,
    data_path: &Path,
    plugin_path: &Path,
    load_scope: LoadScope,
) -> Option<Plugin> {
    logging::trace!(
        "Loading the {} of \"{}\".",
        load_scope,
        escape_ascii(plugin_path)
    );

    match Plugin::new(game_type, data_path, plugin_path, load_scope) {
        Ok(p) => Some(p),
        Err(e) => {
            logging::error!(
                "Caught error while trying to load \"{}\": {}",
                escape_ascii(plugin_path),
                format_details(&e)
            );

            plugin_path
                .file_name()
                .and_then(|f| f.to_str())
                .map(|name| Plugin::with_load_failure(name.to_owned(), &format_details(&e)))
        }
    }
}

fn resolve_plugin_path(data_path: &Path, plugin_path: &Path) -> PathBuf {
    let plugin_path = data_path.join(plugin_path);

    if !plugin_path.exists() {
        if let Some(filename) = plugin_path.file_name() {
            let mut filename = filename.to_os_string();
            filename.push(GHOST_FILE_EXTENSION);
            return plugin_path.with_file_name(filename);
        }
    }

    plugin_path
}

#[cfg(test)]
mod tests {
    use super::*;

    mod game_type {
        use super::*;

        #[test]
        fn master_file_should_name_the_game_main_master() {
            assert_eq!("Oblivion.esm", GameType::Oblivion.master_file());
            assert_eq!("Skyrim.esm", GameType::Skyrim.master_file());
            assert_eq!("Fallout3.esm", GameType::Fallout3.master_file());
            assert_eq!("FalloutNV.esm", GameType::FalloutNV.master_file());
            assert_eq!("Fallout4.esm", GameType::Fallout4.master_file());
        }

        #[test]
        fn archive_file_extension_should_be_ba2_only_for_fallout4() {
            assert_eq!(".bsa", GameType::Skyrim.archive_file_extension());
            assert_eq!(".ba2", GameType::Fallout4.archive_file_extension());
        }
    }

    mod find_installed_plugins {
        use tempfile::TempDir;

        use super::*;

        #[test]
        fn should_return_an_empty_list_for_a_missing_directory() {
            let paths =
                find_installed_plugins(GameType::Skyrim, Path::new("missing/Data")).unwrap();

            assert!(paths.is_empty());
        }

        #[test]
        fn should_skip_files_that_are_not_valid_plugins() {
            let temp_dir = TempDir::new().unwrap();
            std::fs::write(temp_dir.path().join("NotAPlugin.esp"), "not a plugin").unwrap();
            std::fs::write(temp_dir.path().join("readme.txt"), "readme").unwrap();

            let paths = find_installed_plugins(GameType::Skyrim, temp_dir.path()).unwrap();

            assert!(paths.is_empty());
        }
    }

    mod game {
        use tempfile::TempDir;

        use super::*;

        fn game_fixture() -> (TempDir, Game) {
            let temp_dir = TempDir::new().unwrap();

            let game_path = temp_dir.path().join("game");
            let local_path = temp_dir.path().join("local");
            std::fs::create_dir_all(game_path.join("Data")).unwrap();
            std::fs::create_dir_all(&local_path).unwrap();

            let game = Game::with_local_path(GameType::Oblivion, &game_path, &local_path).unwrap();

            (temp_dir, game)
        }

        #[test]
        fn new_should_error_if_the_game_path_is_not_a_directory() {
            let error = Game::new(GameType::Oblivion, Path::new("missing")).unwrap_err();

            assert!(matches!(
                error,
                GameHandleCreationError::NotADirectory(_)
            ));
        }

        #[test]
        fn is_valid_plugin_should_be_false_for_a_non_plugin_file() {
            let (_temp_dir, game) = game_fixture();
            std::fs::write(game.data_path().join("NotAPlugin.esm"), "not a plugin").unwrap();

            assert!(!game.is_valid_plugin("NotAPlugin.esm"));
            assert!(!game.is_valid_plugin("Missing.esm"));
        }

        #[test]
        fn load_installed_plugins_should_load_nothing_from_an_empty_data_directory() {
            let (_temp_dir, mut game) = game_fixture();

            game.load_installed_plugins(false).unwrap();

            assert!(game.loaded_plugins().is_empty());
            assert!(game.plugin("Blank.esp").is_none());
        }
    }

    mod resolve_plugin_path {
        use tempfile::TempDir;

        use super::*;

        #[test]
        fn should_return_the_joined_path_if_it_exists() {
            let temp_dir = TempDir::new().unwrap();
            std::fs::write(temp_dir.path().join("Blank.esp"), "").unwrap();

            assert_eq!(
                temp_dir.path().join("Blank.esp"),
                resolve_plugin_path(temp_dir.path(), Path::new("Blank.esp"))
            );
        }

        #[test]
        fn should_add_a_ghost_extension_if_the_path_does_not_exist() {
            let temp_dir = TempDir::new().unwrap();

            assert_eq!(
                temp_dir.path().join("Blank.esp.ghost"),
                resolve_plugin_path(temp_dir.path(), Path::new("Blank.esp"))
            );
        }
    }
}
