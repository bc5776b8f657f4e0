//! Holds all types related to plugin metadata.
pub mod error;
mod file;
mod location;
mod message;
mod metadata_document;
mod plugin_cleaning_data;
mod plugin_metadata;
mod priority;
mod tag;
mod yaml;

pub use file::{File, Filename};
pub use location::Location;
pub use message::{Message, MessageContent, MessageType, select_message_content};
pub use metadata_document::{MasterlistRevision, MetadataDocument};
pub use plugin_cleaning_data::PluginCleaningData;
pub use plugin_metadata::PluginMetadata;
pub use priority::Priority;
pub use tag::{Tag, TagSuggestion};

pub(crate) use plugin_metadata::{GHOST_FILE_EXTENSION, iends_with_ascii, trim_dot_ghost};

#[cfg(test)]
fn parse(yaml: &str) -> saphyr::MarkedYaml {
    use saphyr::LoadableYamlNode;

    saphyr::MarkedYaml::load_from_str(yaml)
        .unwrap()
        .pop()
        .unwrap()
}
