use std::{collections::HashMap, path::Path};

use saphyr::{LoadableYamlNode, MarkedYaml, YamlData};

use crate::{escape_ascii, logging};

use super::{
    error::{
        ExpectedType, LoadMetadataError, MetadataDocumentParsingError, ParseMetadataError,
        RegexError,
    },
    file::Filename,
    message::Message,
    plugin_metadata::PluginMetadata,
    yaml::{TryFromYaml, YamlObjectType, get_as_slice, reject_unknown_keys},
};

/// Holds the revision metadata of a version-controlled metadata document, as
/// reported by the masterlist updater.
#[derive(Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MasterlistRevision {
    revision_id: String,
    revision_date: String,
    is_modified: bool,
}

impl MasterlistRevision {
    /// Create a value from a revision's ID and date, and whether the file has
    /// been edited since that revision was checked out.
    #[must_use]
    pub fn new(revision_id: String, revision_date: String, is_modified: bool) -> Self {
        Self {
            revision_id,
            revision_date,
            is_modified,
        }
    }

    /// Get the ID (e.g. commit hash) of the revision.
    pub fn revision_id(&self) -> &str {
        &self.revision_id
    }

    /// Get the date the revision was created, as a string.
    pub fn revision_date(&self) -> &str {
        &self.revision_date
    }

    /// Check if the document has been edited since the revision was checked
    /// out.
    pub fn is_modified(&self) -> bool {
        self.is_modified
    }
}

/// A parsed metadata document, e.g. a masterlist or userlist.
///
/// A document is a YAML map with the top-level keys `globals` (a list of
/// messages), `plugins` (a list of plugin metadata entries) and `common` (a
/// scratch area for YAML anchors that is otherwise ignored). Plugin entries
/// with literal names must be unique; entries with regex names may overlap
/// each other and literal entries.
#[derive(Clone, Debug, Default)]
pub struct MetadataDocument {
    messages: Vec<Message>,
    plugins: HashMap<Filename, PluginMetadata>,
    regex_plugins: Vec<PluginMetadata>,
    revision: Option<MasterlistRevision>,
}

impl MetadataDocument {
    /// Loads a metadata document from the given file path, replacing any
    /// previously-loaded data.
    pub fn load(&mut self, file_path: &Path) -> Result<(), LoadMetadataError> {
        if !file_path.exists() {
            return Err(LoadMetadataError::new(
                file_path.into(),
                MetadataDocumentParsingError::PathNotFound,
            ));
        }

        logging::trace!("Loading file at \"{}\"", escape_ascii(file_path));

        let content = std::fs::read_to_string(file_path)
            .map_err(|e| LoadMetadataError::from_io_error(file_path.into(), e))?;

        self.load_from_str(&content)
            .map_err(|e| LoadMetadataError::new(file_path.into(), e))?;

        logging::trace!(
            "Successfully loaded metadata from file at \"{}\".",
            escape_ascii(file_path)
        );

        Ok(())
    }

    pub(crate) fn load_from_str(
        &mut self,
        string: &str,
    ) -> Result<(), MetadataDocumentParsingError> {
        let mut docs = MarkedYaml::load_from_str(string)?;

        let doc = docs.pop().ok_or(MetadataDocumentParsingError::NoDocuments)?;

        if !docs.is_empty() {
            return Err(MetadataDocumentParsingError::MoreThanOneDocument(
                docs.len() + 1,
            ));
        }

        let YamlData::Mapping(doc) = &doc.data else {
            return Err(ParseMetadataError::unexpected_type(
                doc.span.start,
                YamlObjectType::MetadataDocument,
                ExpectedType::Map,
            )
            .into());
        };

        // The common key exists only so that a document has somewhere to put
        // anchored values for reuse elsewhere; its content is not metadata.
        reject_unknown_keys(
            doc,
            &["globals", "plugins", "common"],
            YamlObjectType::MetadataDocument,
        )?;

        let mut plugins = HashMap::new();
        let mut regex_plugins = Vec::new();
        for plugin_yaml in get_as_slice(doc, "plugins", YamlObjectType::MetadataDocument)? {
            let plugin = PluginMetadata::try_from_yaml(plugin_yaml)?;

            if plugin.is_regex_plugin() {
                regex_plugins.push(plugin);
            } else {
                let filename = Filename::new(plugin.name().to_owned());
                if let Some(old) = plugins.insert(filename, plugin) {
                    return Err(ParseMetadataError::duplicate_entry(
                        plugin_yaml.span.start,
                        old.name().to_owned(),
                        YamlObjectType::PluginMetadata,
                    )
                    .into());
                }
            }
        }

        let messages = get_as_slice(doc, "globals", YamlObjectType::MetadataDocument)?
            .iter()
            .map(Message::try_from_yaml)
            .collect::<Result<Vec<_>, _>>()?;

        self.plugins = plugins;
        self.regex_plugins = regex_plugins;
        self.messages = messages;

        Ok(())
    }

    /// Get the document's global messages.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Get an iterator over the document's plugin metadata entries, with the
    /// literal-name entries before the regex-name entries.
    pub fn plugins_iter(&self) -> impl Iterator<Item = &PluginMetadata> {
        self.plugins.values().chain(self.regex_plugins.iter())
    }

    /// Get all the metadata that applies to the plugin with the given
    /// filename.
    ///
    /// Any entry with a literal name equal to the given name is merged first,
    /// then every regex entry whose regex matches the name, in document order.
    /// Returns `None` if no metadata beyond the name itself applies.
    pub fn find_plugin(&self, plugin_name: &str) -> Result<Option<PluginMetadata>, RegexError> {
        let mut metadata = match self.plugins.get(&Filename::new(plugin_name.to_owned())) {
            Some(m) => m.clone(),
            None => PluginMetadata::new(plugin_name)?,
        };

        for regex_plugin in &self.regex_plugins {
            if regex_plugin.name_matches(plugin_name) {
                metadata.merge_metadata(regex_plugin);
            }
        }

        if metadata.has_name_only() {
            Ok(None)
        } else {
            Ok(Some(metadata))
        }
    }

    /// Stores the given plugin metadata, replacing any existing entry with an
    /// equal name.
    pub fn set_plugin_metadata(&mut self, plugin_metadata: PluginMetadata) {
        if plugin_metadata.is_regex_plugin() {
            self.regex_plugins.push(plugin_metadata);
        } else {
            let filename = Filename::new(plugin_metadata.name().to_owned());
            self.plugins.insert(filename, plugin_metadata);
        }
    }

    /// Removes any metadata entry whose name is equal to the given plugin
    /// name.
    pub fn remove_plugin_metadata(&mut self, plugin_name: &str) {
        let filename = Filename::new(plugin_name.to_owned());
        let was_removed = self.plugins.remove(&filename).is_some();

        // Literal and regex entry names are mutually exclusive, so only
        // check the regex entries if no literal entry was removed.
        if !was_removed {
            self.regex_plugins
                .retain(|p| !unicase::eq(p.name(), plugin_name));
        }
    }

    /// Discards all loaded metadata.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.plugins.clear();
        self.regex_plugins.clear();
        self.revision = None;
    }

    /// Get the document's source control revision, if it has been set.
    pub fn revision(&self) -> Option<&MasterlistRevision> {
        self.revision.as_ref()
    }

    /// Record the document's source control revision, as reported by the
    /// masterlist updater.
    pub fn set_revision(&mut self, revision: MasterlistRevision) {
        self.revision = Some(revision);
    }
}
