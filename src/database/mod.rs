pub(crate) mod conditions;
mod error;

use std::path::Path;

use conditions::{evaluate_all_conditions, filter_map_on_condition};

use crate::{
    conditions::{ConditionEvaluationError, State, evaluate_condition},
    metadata::{
        MasterlistRevision, Message, MetadataDocument, PluginMetadata, error::LoadMetadataError,
    },
};
pub use error::MetadataRetrievalError;

/// A handle for updating a masterlist from a remote source control
/// repository.
///
/// The update itself is out of this library's hands: an implementation
/// fetches the configured remote, fast-forwards the local branch and checks
/// the masterlist file out. The only contract is that after a successful
/// [update][Self::update] the file at the masterlist path parses cleanly,
/// rolling back to an earlier revision on parse failure as necessary.
pub trait MasterlistUpdater {
    /// Update the masterlist file at the given path from the given remote
    /// repository URL and branch. Returns `true` if the masterlist was
    /// changed, and `false` if it was already up to date.
    fn update(
        &self,
        masterlist_path: &Path,
        remote_url: &str,
        remote_branch: &str,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync + 'static>>;

    /// Get the revision of the masterlist file at the given path. If `short`
    /// is true, revision IDs may be abbreviated.
    fn revision(
        &self,
        masterlist_path: &Path,
        short: bool,
    ) -> Result<MasterlistRevision, Box<dyn std::error::Error + Send + Sync + 'static>>;
}

/// The interface through which metadata can be accessed.
#[derive(Debug)]
pub struct Database {
    masterlist: MetadataDocument,
    userlist: MetadataDocument,
    condition_evaluator_state: State,
}

impl Database {
    #[must_use]
    pub(crate) fn new(condition_evaluator_state: State) -> Self {
        Self {
            masterlist: MetadataDocument::default(),
            userlist: MetadataDocument::default(),
            condition_evaluator_state,
        }
    }

    pub(crate) fn condition_evaluator_state(&self) -> &State {
        &self.condition_evaluator_state
    }

    pub(crate) fn condition_evaluator_state_mut(&mut self) -> &mut State {
        &mut self.condition_evaluator_state
    }

    pub(crate) fn clear_condition_cache(&mut self) {
        self.condition_evaluator_state.clear_condition_cache();
    }

    /// Loads the masterlist from the given path.
    ///
    /// Replaces any existing data that was previously loaded from a
    /// masterlist.
    pub fn load_masterlist(&mut self, path: &Path) -> Result<(), LoadMetadataError> {
        self.masterlist.load(path)
    }

    /// Loads the userlist from the given path.
    ///
    /// Replaces any existing data that was previously loaded from a userlist.
    pub fn load_userlist(&mut self, path: &Path) -> Result<(), LoadMetadataError> {
        self.userlist.load(path)
    }

    /// Get the loaded masterlist's revision, if one has been recorded.
    pub fn masterlist_revision(&self) -> Option<&MasterlistRevision> {
        self.masterlist.revision()
    }

    /// Record the loaded masterlist's revision, e.g. as reported by a
    /// [MasterlistUpdater]. The revision is surfaced verbatim.
    pub fn set_masterlist_revision(&mut self, revision: MasterlistRevision) {
        self.masterlist.set_revision(revision);
    }

    /// Evaluate the given condition string against the game's installed
    /// state.
    pub fn evaluate(&self, condition: &str) -> Result<bool, ConditionEvaluationError> {
        evaluate_condition(condition, &self.condition_evaluator_state)
    }

    /// Get all general messages listed in the loaded metadata lists.
    ///
    /// If `evaluate_conditions` is `true`, messages with false conditions are
    /// omitted, otherwise all messages are returned.
    pub fn general_messages(
        &self,
        evaluate_conditions: bool,
    ) -> Result<Vec<Message>, ConditionEvaluationError> {
        let messages_iter = self
            .masterlist
            .messages()
            .iter()
            .chain(self.userlist.messages());

        if evaluate_conditions {
            messages_iter
                .filter_map(|m| {
                    filter_map_on_condition(m, m.condition(), &self.condition_evaluator_state)
                })
                .collect()
        } else {
            Ok(messages_iter.cloned().collect())
        }
    }

    /// Get all of a plugin's loaded metadata.
    ///
    /// If `include_user_metadata` is `true`, any user metadata the plugin has
    /// is merged into the returned metadata, otherwise the metadata returned
    /// only includes metadata from the masterlist.
    ///
    /// If `evaluate_conditions` is `true`, any metadata conditions are
    /// evaluated before the metadata is returned and items with false
    /// conditions are dropped, otherwise unevaluated metadata is returned.
    pub fn plugin_metadata(
        &self,
        plugin_name: &str,
        include_user_metadata: bool,
        evaluate_conditions: bool,
    ) -> Result<Option<PluginMetadata>, MetadataRetrievalError> {
        let mut metadata = self.masterlist.find_plugin(plugin_name)?;

        if include_user_metadata
            && let Some(user_metadata) = self.userlist.find_plugin(plugin_name)?
            && user_metadata.is_enabled()
        {
            match &mut metadata {
                Some(metadata) => metadata.merge_metadata(&user_metadata),
                None => metadata = Some(user_metadata),
            }
        }

        if evaluate_conditions {
            if let Some(metadata) = metadata {
                return evaluate_all_conditions(metadata, &self.condition_evaluator_state)
                    .map_err(Into::into);
            }
        }

        Ok(metadata)
    }

    /// Get a plugin's metadata loaded from the userlist.
    ///
    /// If `evaluate_conditions` is `true`, any metadata conditions are
    /// evaluated before the metadata is returned, otherwise unevaluated
    /// metadata is returned.
    pub fn plugin_user_metadata(
        &self,
        plugin_name: &str,
        evaluate_conditions: bool,
    ) -> Result<Option<PluginMetadata>, MetadataRetrievalError> {
        let metadata = self.userlist.find_plugin(plugin_name)?;

        if evaluate_conditions {
            if let Some(metadata) = metadata {
                return evaluate_all_conditions(metadata, &self.condition_evaluator_state)
                    .map_err(Into::into);
            }
        }

        Ok(metadata)
    }

    /// Sets a plugin's user metadata, replacing any loaded user metadata for
    /// that plugin.
    pub fn set_plugin_user_metadata(&mut self, plugin_metadata: PluginMetadata) {
        self.userlist.set_plugin_metadata(plugin_metadata);
    }

    /// Discards all loaded user metadata for the plugin with the given
    /// filename.
    pub fn discard_plugin_user_metadata(&mut self, plugin: &str) {
        self.userlist.remove_plugin_metadata(plugin);
    }

    /// Discards all loaded user metadata.
    pub fn discard_all_user_metadata(&mut self) {
        self.userlist.clear();
    }
}
