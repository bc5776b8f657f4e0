use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use regress::Regex;

use crate::{
    case_insensitive_regex, escape_ascii, logging, regex_matches,
    version::{Version, loadstone_version},
};

use super::{Comparator, ConditionEvaluationError, ExpressionNode, Function, State};

/// The reserved path that refers to the running application itself rather
/// than a file in the game's data directory.
const SELF_PATH: &str = "LOOT";

pub(super) fn evaluate(
    node: &ExpressionNode,
    state: &State,
) -> Result<bool, ConditionEvaluationError> {
    match node {
        ExpressionNode::Any(nodes) => {
            for node in nodes {
                if evaluate(node, state)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        ExpressionNode::All(nodes) => {
            for node in nodes {
                if !evaluate(node, state)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        ExpressionNode::Not(node) => evaluate(node, state).map(|result| !result),
        ExpressionNode::Function(function) => evaluate_function(function, state),
    }
}

fn evaluate_function(
    function: &Function,
    state: &State,
) -> Result<bool, ConditionEvaluationError> {
    match function {
        Function::FilePath(path) => evaluate_file_path(path, state),
        Function::FileRegex(regex) => {
            Ok(count_directory_matches(regex, state, 1)? >= 1)
        }
        Function::Active(path) => Ok(evaluate_active(path, state)),
        Function::Checksum(path, expected_crc) => evaluate_checksum(path, *expected_crc, state),
        Function::Version(path, version, comparator) => {
            evaluate_version(path, version, *comparator, state)
        }
        Function::Many(regex) => Ok(count_directory_matches(regex, state, 2)? >= 2),
        Function::ManyActive(regex) => evaluate_many_active(regex, state),
    }
}

fn evaluate_file_path(path: &str, state: &State) -> Result<bool, ConditionEvaluationError> {
    logging::trace!("Checking to see if the file \"{path}\" exists.");

    if path == SELF_PATH {
        return Ok(true);
    }

    validate_path(path)?;

    let result = file_exists(state, path);

    if result {
        logging::trace!("The file does exist.");
    } else {
        logging::trace!("The file does not exist.");
    }

    Ok(result)
}

fn evaluate_active(path: &str, state: &State) -> bool {
    let result = if path == SELF_PATH {
        false
    } else {
        state.is_plugin_active(path)
    };

    logging::trace!("Active check result for \"{path}\": {result}");

    result
}

fn evaluate_checksum(
    path: &str,
    expected_crc: u32,
    state: &State,
) -> Result<bool, ConditionEvaluationError> {
    logging::trace!("Checking the CRC of the file \"{path}\".");

    if path != SELF_PATH {
        validate_path(path)?;
    }

    match crc_of(path, state)? {
        Some(crc) => Ok(crc == expected_crc),
        None => Ok(false),
    }
}

fn evaluate_version(
    path: &str,
    given_version: &str,
    comparator: Comparator,
    state: &State,
) -> Result<bool, ConditionEvaluationError> {
    logging::trace!("Checking the version of the file \"{path}\".");

    if path != SELF_PATH {
        validate_path(path)?;

        if !file_exists(state, path) {
            // A missing file has no version at all, which satisfies only the
            // comparators that a lower version would satisfy.
            return Ok(matches!(
                comparator,
                Comparator::NotEqual | Comparator::LessThan | Comparator::LessThanOrEqual
            ));
        }
    }

    let actual_version = if path == SELF_PATH {
        Version::new(&loadstone_version())
    } else {
        Version::new(state.plugin_version(path).unwrap_or(""))
    };

    logging::trace!("Version extracted: \"{actual_version}\"");

    let given_version = Version::new(given_version);

    let result = match comparator {
        Comparator::Equal => actual_version == given_version,
        Comparator::NotEqual => actual_version != given_version,
        Comparator::LessThan => actual_version < given_version,
        Comparator::GreaterThan => actual_version > given_version,
        Comparator::LessThanOrEqual => actual_version <= given_version,
        Comparator::GreaterThanOrEqual => actual_version >= given_version,
    };

    logging::trace!("Version check result: {result}");

    Ok(result)
}

fn evaluate_many_active(regex: &str, state: &State) -> Result<bool, ConditionEvaluationError> {
    let regex = compile_filename_regex(regex)?;

    let count = state
        .active_plugins()
        .iter()
        .filter(|name| regex_matches(&regex, name))
        .take(2)
        .count();

    Ok(count >= 2)
}

/// Count the files in the directory named by the regex whose filenames match
/// its last path component, stopping once `needed` matches have been found.
fn count_directory_matches(
    regex: &str,
    state: &State,
    needed: usize,
) -> Result<usize, ConditionEvaluationError> {
    logging::trace!("Counting files matching the regex \"{regex}\".");

    // Only the last path component may be a regex, as running a regex over
    // every path component could scan a large directory tree. Path separators
    // in the rest of the string are '/' or an escaped backslash.
    let (parent, filename) = split_regex_path(regex);

    if parent.contains("../..") {
        return Err(ConditionEvaluationError::InvalidPath(parent));
    }

    let regex = compile_filename_regex(&filename)?;

    let parent_path = state.data_path().join(&parent);
    if !parent_path.is_dir() {
        logging::trace!(
            "The path \"{}\" does not exist or is not a directory.",
            escape_ascii(&parent_path)
        );
        return Ok(0);
    }

    let count = std::fs::read_dir(&parent_path)?
        .filter_map(Result::ok)
        .filter(|entry| {
            let filename = entry.file_name();
            filename
                .to_str()
                .is_some_and(|filename| regex_matches(&regex, filename))
        })
        .take(needed)
        .count();

    Ok(count)
}

fn split_regex_path(regex: &str) -> (String, String) {
    let mut components: Vec<&str> = regex.split(['/']).flat_map(|c| c.split("\\\\")).collect();

    let filename = components.pop().unwrap_or("").to_owned();

    let mut parent = String::new();
    for component in components {
        if component == "." {
            continue;
        }
        parent.push_str(component);
        parent.push('/');
    }

    (parent, filename)
}

fn compile_filename_regex(regex: &str) -> Result<Regex, ConditionEvaluationError> {
    case_insensitive_regex(&format!("^{regex}$"))
        .map_err(|e| ConditionEvaluationError::InvalidRegex(regex.to_owned(), e))
}

/// Reject a path whose computed parent directory escapes the game's data
/// directory through directory traversal.
fn validate_path(path: &str) -> Result<(), ConditionEvaluationError> {
    logging::trace!("Checking to see if the path \"{path}\" is safe.");

    let mut components: Vec<&str> = path.split(['/', '\\']).collect();
    components.pop();

    let mut parent = String::new();
    for component in components {
        if component == "." {
            continue;
        }
        parent.push_str(component);
        parent.push('/');
    }

    if parent.contains("../..") {
        Err(ConditionEvaluationError::InvalidPath(path.to_owned()))
    } else {
        Ok(())
    }
}

fn is_plugin_filename(path: &str) -> bool {
    has_suffix_ignoring_ascii_case(path, ".esp") || has_suffix_ignoring_ascii_case(path, ".esm")
}

fn has_suffix_ignoring_ascii_case(string: &str, suffix: &str) -> bool {
    string.len() >= suffix.len()
        && string
            .as_bytes()
            .iter()
            .rev()
            .zip(suffix.as_bytes().iter().rev())
            .all(|(string_byte, suffix_byte)| string_byte.eq_ignore_ascii_case(suffix_byte))
}

fn file_exists(state: &State, path: &str) -> bool {
    let file_path = state.data_path().join(path);

    if file_path.is_file() {
        true
    } else if is_plugin_filename(path) {
        // A ghosted plugin counts as present.
        ghosted_path(&file_path).is_file()
    } else {
        false
    }
}

fn ghosted_path(path: &Path) -> PathBuf {
    match path.file_name() {
        Some(filename) => {
            let mut filename = filename.to_os_string();
            filename.push(".ghost");
            path.with_file_name(filename)
        }
        None => path.to_path_buf(),
    }
}

fn crc_of(path: &str, state: &State) -> Result<Option<u32>, ConditionEvaluationError> {
    let cache_key = path.to_lowercase();

    if let Some(crc) = state.cached_crc(&cache_key) {
        logging::trace!("Found cached CRC for \"{path}\": {crc:08X}");
        return Ok(Some(crc));
    }

    let file_path = if path == SELF_PATH {
        match std::env::current_exe() {
            Ok(p) => p,
            Err(_) => return Ok(None),
        }
    } else {
        let file_path = state.data_path().join(path);
        if file_path.is_file() {
            file_path
        } else if is_plugin_filename(path) && ghosted_path(&file_path).is_file() {
            ghosted_path(&file_path)
        } else {
            return Ok(None);
        }
    };

    let crc = calculate_crc(&file_path)?;
    state.cache_crc(cache_key, crc);

    Ok(Some(crc))
}

pub(crate) fn calculate_crc(path: &Path) -> std::io::Result<u32> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = crc32fast::Hasher::new();

    let mut buffer = reader.fill_buf()?;
    while !buffer.is_empty() {
        hasher.update(buffer);
        let length = buffer.len();
        reader.consume(length);

        buffer = reader.fill_buf()?;
    }

    Ok(hasher.finalize())
}
