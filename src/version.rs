use std::{cmp::Ordering, sync::LazyLock};

use regress::Regex;

use crate::case_insensitive_regex;

/// loadstone's major version number.
pub const LOADSTONE_VERSION_MAJOR: u32 = parse_u32(env!("CARGO_PKG_VERSION_MAJOR"));

/// loadstone's minor version number.
pub const LOADSTONE_VERSION_MINOR: u32 = parse_u32(env!("CARGO_PKG_VERSION_MINOR"));

/// loadstone's patch version number.
pub const LOADSTONE_VERSION_PATCH: u32 = parse_u32(env!("CARGO_PKG_VERSION_PATCH"));

/// Get the library version in the form "major.minor.patch".
pub fn loadstone_version() -> String {
    env!("CARGO_PKG_VERSION").to_owned()
}

/// Checks whether the loaded API is compatible with the given version of the
/// API, abstracting API stability policy away from clients. The version
/// numbering used is major.minor.patch.
pub fn is_compatible(major: u32, minor: u32, _patch: u32) -> bool {
    if major > 0 {
        major == LOADSTONE_VERSION_MAJOR
    } else {
        minor == LOADSTONE_VERSION_MINOR
    }
}

const fn parse_u32(value: &str) -> u32 {
    let bytes = value.as_bytes();
    let mut acc: u32 = 0;
    let mut i = 0;
    while i < bytes.len() {
        acc = acc * 10 + (bytes[i] - b'0') as u32;
        i += 1;
    }
    acc
}

/// A plugin or file version string, compared using version semantics.
///
/// If both strings are sequences of dot-separated unsigned integers they are
/// compared component by component, with any missing components treated as
/// zero. Anything else is compared using a natural sort: each string is split
/// into maximal runs of digits and non-digits, digit runs compare numerically
/// and non-digit runs compare lexicographically.
#[derive(Clone, Debug, Default)]
pub struct Version {
    string: Box<str>,
}

impl Version {
    /// Create a value wrapping the given version string.
    #[must_use]
    pub fn new(version: &str) -> Self {
        Self {
            string: version.into(),
        }
    }

    /// Get the version as the string it was created from.
    pub fn as_str(&self) -> &str {
        &self.string
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.string.fmt(f)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        if is_dotted_integers(&self.string) && is_dotted_integers(&other.string) {
            compare_dotted_integers(&self.string, &other.string)
        } else {
            natural_cmp(&self.string, &other.string)
        }
    }
}

fn is_dotted_integers(string: &str) -> bool {
    !string.is_empty()
        && string
            .split('.')
            .all(|c| !c.is_empty() && c.bytes().all(|b| b.is_ascii_digit()))
}

fn compare_dotted_integers(lhs: &str, rhs: &str) -> Ordering {
    let mut lhs_components = lhs.split('.');
    let mut rhs_components = rhs.split('.');

    loop {
        match (lhs_components.next(), rhs_components.next()) {
            (None, None) => return Ordering::Equal,
            (lhs, rhs) => {
                let ordering = compare_digit_runs(lhs.unwrap_or("0"), rhs.unwrap_or("0"));
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

/// Compare two strings of ASCII digits numerically, without parsing them into
/// fixed-width integers that version strings found in the wild can overflow.
fn compare_digit_runs(lhs: &str, rhs: &str) -> Ordering {
    let lhs = lhs.trim_start_matches('0');
    let rhs = rhs.trim_start_matches('0');

    lhs.len().cmp(&rhs.len()).then_with(|| lhs.cmp(rhs))
}

fn natural_cmp(lhs: &str, rhs: &str) -> Ordering {
    let mut lhs = lhs;
    let mut rhs = rhs;

    while !lhs.is_empty() && !rhs.is_empty() {
        let (lhs_run, lhs_is_digits, lhs_rest) = split_run(lhs);
        let (rhs_run, rhs_is_digits, rhs_rest) = split_run(rhs);

        let ordering = if lhs_is_digits && rhs_is_digits {
            compare_digit_runs(lhs_run, rhs_run)
        } else {
            lhs_run.cmp(rhs_run)
        };

        if ordering != Ordering::Equal {
            return ordering;
        }

        lhs = lhs_rest;
        rhs = rhs_rest;
    }

    lhs.len().cmp(&rhs.len())
}

fn split_run(string: &str) -> (&str, bool, &str) {
    let is_digits = string.starts_with(|c: char| c.is_ascii_digit());

    let end = string
        .find(|c: char| c.is_ascii_digit() != is_digits)
        .unwrap_or(string.len());

    let (run, rest) = string.split_at(end);
    (run, is_digits, rest)
}

/// The ordered list of regexes used to find a version substring inside a
/// plugin description. Each expression is tried in turn and the first match
/// wins; the earlier expressions anchor on explicit markers ("version",
/// "revision", "ver", "rev", "v", "Updated:") and the later ones are
/// progressively looser last resorts.
static VERSION_REGEXES: LazyLock<Box<[Regex]>> = LazyLock::new(|| {
    [
        r"^(?:\bversion\b[ ]*(?:[:.\-]?)|\brevision\b(?:[:.\-]?))[ ]*((?:alpha|beta|test|debug)?\s*[-0-9a-zA-Z._+]+\s*(?:alpha|beta|test|debug)?\s*(?:[0-9]*))$",
        r"(?:\bversion\b(?:[ :]?)|\brevision\b(?:[:.\-]?))[ ]*([0-9][-0-9a-zA-Z._]+\+?)",
        r"(?:\bver(?:[:.]?)|\brev(?:[:.]?))\s*([0-9][-0-9a-zA-Z._]*\+?)",
        // Matches "Updated: <date>" for the Bashed Patch.
        r"(?:Updated:)\s*([-0-9aAmMpP/ :]+)$",
        // This incorrectly identifies "OBSE v19" where 19 is any integer.
        r"(?:(?:\bv|\br)(?:\s?)(?:[-.:])?(?:\s*))((?:(?:\balpha\b)?|(?:\bbeta\b)?)\s*[0-9]+([-._]*(?!esp|esm)[0-9a-zA-Z]+)*\+?)",
        // Matches isolated versions as a last resort.
        r"((?:(?:\balpha\b)?|(?:\bbeta\b)?)\s*\b[0-9][-0-9a-zA-Z._]*\+?)$",
        r"(^\bmark\b\s*\b[IVX0-9][-0-9a-zA-Z._+]*\s*(?:alpha|beta|test|debug)?\s*(?:[0-9]*)?)$",
    ]
    .iter()
    .map(|s| {
        case_insensitive_regex(s).unwrap_or_else(|e| {
            panic!("hardcoded version regex {s} should be valid: {e}");
        })
    })
    .collect()
});

/// Extract a version substring from a plugin description, trying each of the
/// known version patterns in turn. Returns `None` if no pattern matches.
pub(crate) fn extract_version(description: &str) -> Option<String> {
    for regex in &*VERSION_REGEXES {
        let version = regex.find(description).and_then(|m| {
            m.captures
                .iter()
                .flatten()
                .map(|range| description.get(range.clone()).unwrap_or("").trim())
                .find(|v| !v.is_empty())
                .map(ToOwned::to_owned)
        });

        if version.is_some() {
            return version;
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    mod is_compatible {
        use super::*;

        #[test]
        fn should_return_true_if_given_the_current_version() {
            assert!(is_compatible(
                LOADSTONE_VERSION_MAJOR,
                LOADSTONE_VERSION_MINOR,
                LOADSTONE_VERSION_PATCH
            ));
        }

        #[test]
        fn should_return_true_if_given_a_different_patch_version() {
            assert!(is_compatible(
                LOADSTONE_VERSION_MAJOR,
                LOADSTONE_VERSION_MINOR,
                LOADSTONE_VERSION_PATCH + 1
            ));
        }

        #[test]
        fn should_return_false_if_given_a_different_minor_version() {
            assert!(!is_compatible(
                LOADSTONE_VERSION_MAJOR,
                LOADSTONE_VERSION_MINOR + 1,
                LOADSTONE_VERSION_PATCH
            ));
        }
    }

    mod loadstone_version {
        use super::*;

        #[test]
        fn should_be_version_numbers_separated_by_periods() {
            let expected = format!(
                "{LOADSTONE_VERSION_MAJOR}.{LOADSTONE_VERSION_MINOR}.{LOADSTONE_VERSION_PATCH}"
            );

            assert_eq!(expected, loadstone_version());
        }
    }

    mod version_cmp {
        use super::*;

        fn version(string: &str) -> Version {
            Version::new(string)
        }

        #[test]
        fn should_compare_dotted_integer_versions_componentwise() {
            assert!(version("1.2.3") < version("1.2.4"));
            assert!(version("1.2.3") < version("1.10.0"));
            assert!(version("2.0") > version("1.9.9"));
        }

        #[test]
        fn should_treat_missing_components_as_zero() {
            assert_eq!(version("1.0"), version("1.0.0"));
            assert!(version("1.0") < version("1.0.1"));
        }

        #[test]
        fn should_ignore_leading_zeroes_in_components() {
            assert_eq!(version("1.02"), version("1.2"));
            assert!(version("1.02") < version("1.10"));
        }

        #[test]
        fn should_compare_versions_with_very_large_components() {
            assert!(version("1.18446744073709551616") > version("1.2"));
        }

        #[test]
        fn should_fall_back_to_natural_sort_for_other_formats() {
            assert!(version("1.0Alpha1") < version("1.0Alpha2"));
            assert!(version("0.99.xx") < version("0.100.xx"));
            assert!(version("1.0b") > version("1.0a"));
        }

        #[test]
        fn should_compare_digit_runs_numerically_in_natural_sort() {
            assert!(version("v2abc") < version("v10abc"));
        }

        #[test]
        fn should_treat_a_prefix_as_less_than_a_longer_string() {
            assert!(version("1.0a") < version("1.0alpha"));
            assert!(version("abc") < version("abcd"));
        }

        #[test]
        fn should_be_asymmetric() {
            let lesser = version("1.2.3");
            let greater = version("1.2.4");

            assert!(lesser < greater);
            assert!(!(greater < lesser));
        }

        #[test]
        fn should_be_transitive() {
            let a = version("1.0");
            let b = version("1.1");
            let c = version("2.0");

            assert!(a < b);
            assert!(b < c);
            assert!(a < c);
        }

        #[test]
        fn should_be_irreflexive() {
            let a = version("1.0.1");

            assert!(!(a < a));
            assert_eq!(a, a);
        }
    }

    mod extract_version {
        use super::*;

        #[test]
        fn should_extract_a_version_prefixed_by_the_version_marker() {
            assert_eq!(
                Some("1.2.3".to_owned()),
                extract_version("version: 1.2.3")
            );
        }

        #[test]
        fn should_extract_a_version_prefixed_by_the_ver_marker() {
            assert_eq!(Some("0.5".to_owned()), extract_version("ver. 0.5"));
        }

        #[test]
        fn should_extract_a_version_prefixed_by_v() {
            assert_eq!(Some("2.0".to_owned()), extract_version("My Mod v2.0"));
        }

        #[test]
        fn should_extract_an_updated_date() {
            assert_eq!(
                Some("2015/09/30".to_owned()),
                extract_version("Updated: 2015/09/30")
            );
        }

        #[test]
        fn should_extract_a_trailing_version_as_a_last_resort() {
            assert_eq!(
                Some("1.1".to_owned()),
                extract_version("A plugin description 1.1")
            );
        }

        #[test]
        fn should_return_none_if_there_is_no_version() {
            assert_eq!(None, extract_version("a description with no numbers"));
        }
    }
}
