//! The boolean expression language used to gate metadata on installed state.
mod eval;
mod parse;

use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
    str::FromStr,
    sync::{PoisonError, RwLock},
};

use regress::Error as RegexImplError;

use crate::logging;

pub use parse::ConditionParseError;

pub(crate) use eval::calculate_crc;

/// A parsed condition expression.
///
/// Parsing a condition only validates its syntax: evaluating it needs a
/// [State], which binds the expression to a game's installed files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expression {
    text: Box<str>,
    root: ExpressionNode,
}

impl Expression {
    /// Get the source text that this expression was parsed from.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn eval(&self, state: &State) -> Result<bool, ConditionEvaluationError> {
        let cache_key = self.text.to_lowercase();

        {
            let cache = state
                .condition_cache
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(result) = cache.get(&cache_key) {
                logging::trace!(
                    "Found cached result for condition \"{}\": {}",
                    self.text,
                    result
                );
                return Ok(*result);
            }
        }

        let result = eval::evaluate(&self.root, state)?;

        state
            .condition_cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(cache_key, result);

        Ok(result)
    }
}

impl FromStr for Expression {
    type Err = ConditionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let root = parse::parse_expression(s)?;

        Ok(Expression {
            text: s.into(),
            root,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ExpressionNode {
    Any(Vec<ExpressionNode>),
    All(Vec<ExpressionNode>),
    Not(Box<ExpressionNode>),
    Function(Function),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Function {
    FilePath(String),
    FileRegex(String),
    Active(String),
    Checksum(String, u32),
    Version(String, String, Comparator),
    Many(String),
    ManyActive(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Comparator {
    Equal,
    NotEqual,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
}

impl std::fmt::Display for Comparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Comparator::Equal => write!(f, "=="),
            Comparator::NotEqual => write!(f, "!="),
            Comparator::LessThan => write!(f, "<"),
            Comparator::GreaterThan => write!(f, ">"),
            Comparator::LessThanOrEqual => write!(f, "<="),
            Comparator::GreaterThanOrEqual => write!(f, ">="),
        }
    }
}

/// Holds the game state that conditions are evaluated against, and the caches
/// that evaluation fills.
#[derive(Debug, Default)]
pub(crate) struct State {
    data_path: PathBuf,
    active_plugins: HashSet<String>,
    plugin_versions: HashMap<String, String>,
    crc_cache: RwLock<HashMap<String, u32>>,
    condition_cache: RwLock<HashMap<String, bool>>,
}

impl State {
    pub fn new(data_path: PathBuf) -> Self {
        Self {
            data_path,
            ..Default::default()
        }
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    pub fn set_active_plugins(&mut self, plugin_names: &[&str]) {
        self.active_plugins = plugin_names.iter().map(|n| n.to_lowercase()).collect();
    }

    pub fn is_plugin_active(&self, plugin_name: &str) -> bool {
        self.active_plugins.contains(&plugin_name.to_lowercase())
    }

    pub(crate) fn active_plugins(&self) -> &HashSet<String> {
        &self.active_plugins
    }

    pub fn set_plugin_versions(&mut self, plugin_versions: &[(&str, &str)]) {
        self.plugin_versions = plugin_versions
            .iter()
            .map(|(name, version)| (name.to_lowercase(), (*version).to_owned()))
            .collect();
    }

    pub(crate) fn plugin_version(&self, plugin_name: &str) -> Option<&str> {
        self.plugin_versions
            .get(&plugin_name.to_lowercase())
            .map(String::as_str)
    }

    /// Prime the CRC cache with already-known checksums, e.g. those calculated
    /// while loading plugins.
    pub fn set_cached_crcs(&mut self, plugin_crcs: &[(&str, u32)]) {
        let mut cache = self
            .crc_cache
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        cache.clear();
        cache.extend(
            plugin_crcs
                .iter()
                .map(|(name, crc)| (name.to_lowercase(), *crc)),
        );
    }

    pub(crate) fn cached_crc(&self, key: &str) -> Option<u32> {
        self.crc_cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .copied()
    }

    pub(crate) fn cache_crc(&self, key: String, crc: u32) {
        self.crc_cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, crc);
    }

    /// Clear the condition cache. This must be done whenever the installed
    /// state that conditions are evaluated against changes.
    pub fn clear_condition_cache(&mut self) {
        self.condition_cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Represents an error that occurred while evaluating a condition.
#[derive(Debug)]
#[non_exhaustive]
pub enum ConditionEvaluationError {
    ParseError(ConditionParseError),
    InvalidPath(String),
    InvalidRegex(String, Box<RegexImplError>),
    IoError(std::io::Error),
}

impl std::fmt::Display for ConditionEvaluationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ParseError(_) => write!(f, "failed to parse the condition"),
            Self::InvalidPath(p) => write!(f, "the path \"{p}\" is invalid"),
            Self::InvalidRegex(r, _) => write!(f, "the regex \"{r}\" is invalid"),
            Self::IoError(_) => write!(f, "an I/O error occurred during condition evaluation"),
        }
    }
}

impl std::error::Error for ConditionEvaluationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ParseError(e) => Some(e),
            Self::InvalidRegex(_, e) => Some(e),
            Self::IoError(e) => Some(e),
            Self::InvalidPath(_) => None,
        }
    }
}

impl From<ConditionParseError> for ConditionEvaluationError {
    fn from(value: ConditionParseError) -> Self {
        ConditionEvaluationError::ParseError(value)
    }
}

impl From<std::io::Error> for ConditionEvaluationError {
    fn from(value: std::io::Error) -> Self {
        ConditionEvaluationError::IoError(value)
    }
}

/// Parse and evaluate a condition string against the given state.
pub(crate) fn evaluate_condition(
    condition: &str,
    state: &State,
) -> Result<bool, ConditionEvaluationError> {
    Expression::from_str(condition)?.eval(state)
}
