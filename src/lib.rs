mod conditions;
mod database;
pub mod error;
mod game;
mod logging;
pub mod metadata;
mod plugin;
mod sorting;
mod version;

use std::{path::Path, slice::EscapeAscii};

use regress::{Error as RegexImplError, Regex};

pub use conditions::Expression;
pub use database::{Database, MasterlistUpdater};
pub use metadata::MasterlistRevision;
pub use game::{Game, GameType, SortResult, SortedPlugin};
pub use logging::{LogLevel, set_log_level, set_logging_callback};
pub use plugin::Plugin;
pub use sorting::vertex::{EdgeType, Vertex};
pub use version::{
    LOADSTONE_VERSION_MAJOR, LOADSTONE_VERSION_MINOR, LOADSTONE_VERSION_PATCH, Version,
    is_compatible, loadstone_version,
};

fn case_insensitive_regex(value: &str) -> Result<Regex, Box<RegexImplError>> {
    Regex::with_flags(value, "iu").map_err(Into::into)
}

fn regex_matches(regex: &Regex, value: &str) -> bool {
    regex.find(value).is_some()
}

fn escape_ascii(path: &Path) -> EscapeAscii<'_> {
    path.as_os_str().as_encoded_bytes().escape_ascii()
}
