//! Toggle parsing and layered toggle sources.
//!
//! A toggle file is a flat `KEY=VALUE` document in the style of a `.env`
//! file:
//!
//! ```text
//! # comment
//! export MODULE_ELUNA=1
//! MODULE_AHBOT="true"
//! MODULE_TRANSMOG='0'
//! ```
//!
//! Resolution consults an ordered list of [`ToggleLayer`]s; the first layer
//! that defines a key wins.

use std::collections::HashMap;
use std::path::PathBuf;

/// Values (compared case-insensitively, after trimming) treated as "on".
pub const TRUTHY_VALUES: [&str; 4] = ["1", "true", "yes", "on"];

/// Interprets a raw toggle value.
///
/// # Examples
///
/// ```
/// use module_manifest_core::is_truthy;
///
/// assert!(is_truthy("1"));
/// assert!(is_truthy(" YES "));
/// assert!(!is_truthy("0"));
/// assert!(!is_truthy("enabled"));
/// ```
pub fn is_truthy(raw: &str) -> bool {
    let value = raw.trim();
    TRUTHY_VALUES
        .iter()
        .any(|truthy| value.eq_ignore_ascii_case(truthy))
}

/// Insertion-ordered key/value map of raw toggle values.
///
/// Re-inserting a key replaces its value but keeps its original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToggleMap {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl ToggleMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.index.get(&key) {
            Some(&pos) => self.entries[pos].1 = value,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    /// Returns the raw value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.index
            .get(key)
            .map(|&pos| self.entries[pos].1.as_str())
    }

    /// Returns `true` if `key` is defined.
    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Keys in first-insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    /// Key/value pairs in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Number of defined keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no keys are defined.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ToggleMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

/// Why a toggle line was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The line has no `=` separator.
    MissingSeparator,
    /// The key before `=` is empty.
    EmptyKey,
}

/// A non-blank, non-comment line that did not yield a toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    /// 1-based line number.
    pub line: usize,
    /// The original line text.
    pub content: String,
    /// Why the line was ignored.
    pub reason: SkipReason,
}

/// Result of parsing a toggle document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedToggles {
    /// Parsed toggles.
    pub values: ToggleMap,
    /// Lines that were ignored.
    pub skipped: Vec<SkippedLine>,
}

/// Parses a `.env`-style toggle document.
///
/// Blank lines and `#` comments are ignored, a leading `export ` is stripped,
/// the line is split on the first `=`, key and value are trimmed, and one
/// layer of matching single or double quotes is removed from the value.
/// Malformed lines never fail the parse; they are reported in
/// [`ParsedToggles::skipped`].
///
/// # Examples
///
/// ```
/// use module_manifest_core::parse_toggles;
///
/// let parsed = parse_toggles("# modules\nexport MODULE_A=\"1\"\nMODULE_B='off'\nbogus\n");
/// assert_eq!(parsed.values.get("MODULE_A"), Some("1"));
/// assert_eq!(parsed.values.get("MODULE_B"), Some("off"));
/// assert_eq!(parsed.skipped.len(), 1);
/// ```
pub fn parse_toggles(content: &str) -> ParsedToggles {
    let mut parsed = ParsedToggles::default();

    for (idx, raw_line) in content.lines().enumerate() {
        let mut line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(rest) = line.strip_prefix("export ") {
            line = rest.trim();
        }

        let Some((key, value)) = line.split_once('=') else {
            parsed.skipped.push(SkippedLine {
                line: idx + 1,
                content: raw_line.to_string(),
                reason: SkipReason::MissingSeparator,
            });
            continue;
        };

        let key = key.trim();
        if key.is_empty() {
            parsed.skipped.push(SkippedLine {
                line: idx + 1,
                content: raw_line.to_string(),
                reason: SkipReason::EmptyKey,
            });
            continue;
        }

        parsed.values.insert(key, strip_quotes(value.trim()));
    }

    parsed
}

fn strip_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Where a toggle layer came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOrigin {
    /// A toggle file on disk.
    File(PathBuf),
    /// The ambient process environment.
    Process,
}

/// One source of toggle values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleLayer {
    /// Where the values came from.
    pub origin: ToggleOrigin,
    /// The values.
    pub values: ToggleMap,
}

impl ToggleLayer {
    /// Creates a layer for a toggle file.
    pub fn file(path: impl Into<PathBuf>, values: ToggleMap) -> Self {
        Self {
            origin: ToggleOrigin::File(path.into()),
            values,
        }
    }

    /// Creates a layer from process environment variables.
    pub fn process<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            origin: ToggleOrigin::Process,
            values: vars.into_iter().collect(),
        }
    }
}

/// Ordered list of toggle sources; earlier layers take precedence.
///
/// # Examples
///
/// ```
/// use module_manifest_core::{ToggleLayer, ToggleLayers, ToggleMap};
///
/// let file: ToggleMap = [("MODULE_A", "0")].into_iter().collect();
/// let layers = ToggleLayers::new()
///     .with_layer(ToggleLayer::file(".env", file))
///     .with_layer(ToggleLayer::process([("MODULE_A", "1"), ("MODULE_B", "1")]));
///
/// assert_eq!(layers.lookup("MODULE_A"), Some("0"));
/// assert_eq!(layers.lookup("MODULE_B"), Some("1"));
/// assert_eq!(layers.lookup("MODULE_C"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToggleLayers {
    layers: Vec<ToggleLayer>,
}

impl ToggleLayers {
    /// Creates an empty layer list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a lower-precedence layer.
    pub fn with_layer(mut self, layer: ToggleLayer) -> Self {
        self.layers.push(layer);
        self
    }

    /// Appends a lower-precedence layer in place.
    pub fn push(&mut self, layer: ToggleLayer) {
        self.layers.push(layer);
    }

    /// The layers, highest precedence first.
    pub fn layers(&self) -> &[ToggleLayer] {
        &self.layers
    }

    /// Returns the value from the first layer defining `key`.
    pub fn lookup(&self, key: &str) -> Option<&str> {
        self.layers.iter().find_map(|layer| layer.values.get(key))
    }

    /// Returns `true` if any layer defines `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    /// Keys defined by file layers, deduplicated, in layer then file order.
    pub fn file_keys(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.layers
            .iter()
            .filter(|layer| matches!(layer.origin, ToggleOrigin::File(_)))
            .flat_map(|layer| layer.values.keys())
            .filter(|key| seen.insert(*key))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_handles_comments_and_blank_lines() {
        let parsed = parse_toggles("\n# MODULE_A=1\n   \nMODULE_B=1\n");
        assert_eq!(parsed.values.len(), 1);
        assert_eq!(parsed.values.get("MODULE_B"), Some("1"));
        assert!(parsed.skipped.is_empty());
    }

    #[test]
    fn test_parse_strips_export_and_whitespace() {
        let parsed = parse_toggles("  export   MODULE_A =  yes  \n");
        assert_eq!(parsed.values.get("MODULE_A"), Some("yes"));
    }

    #[test]
    fn test_parse_splits_on_first_equals() {
        let parsed = parse_toggles("URL=http://host/?a=b\n");
        assert_eq!(parsed.values.get("URL"), Some("http://host/?a=b"));
    }

    #[test]
    fn test_parse_strips_one_layer_of_quotes() {
        let parsed = parse_toggles("A=\"'1'\"\nB='on'\nC=\"mismatched'\nD=\"\n");
        assert_eq!(parsed.values.get("A"), Some("'1'"));
        assert_eq!(parsed.values.get("B"), Some("on"));
        assert_eq!(parsed.values.get("C"), Some("\"mismatched'"));
        assert_eq!(parsed.values.get("D"), Some("\""));
    }

    #[test]
    fn test_parse_reports_malformed_lines() {
        let parsed = parse_toggles("MODULE_A=1\nnot a toggle\n=1\n");
        assert_eq!(parsed.values.len(), 1);
        assert_eq!(
            parsed.skipped,
            vec![
                SkippedLine {
                    line: 2,
                    content: "not a toggle".into(),
                    reason: SkipReason::MissingSeparator,
                },
                SkippedLine {
                    line: 3,
                    content: "=1".into(),
                    reason: SkipReason::EmptyKey,
                },
            ]
        );
    }

    #[test]
    fn test_later_duplicate_overrides_value_keeps_position() {
        let parsed = parse_toggles("MODULE_A=1\nMODULE_B=1\nMODULE_A=0\n");
        assert_eq!(parsed.values.get("MODULE_A"), Some("0"));
        assert_eq!(
            parsed.values.keys().collect::<Vec<_>>(),
            vec!["MODULE_A", "MODULE_B"]
        );
    }

    #[test]
    fn test_is_truthy_set() {
        for value in ["1", "true", "TRUE", "yes", "On"] {
            assert!(is_truthy(value), "{value} should be truthy");
        }
        for value in ["0", "false", "no", "off", "", "2", "y"] {
            assert!(!is_truthy(value), "{value} should be falsy");
        }
    }

    #[test]
    fn test_file_keys_ignore_process_layer() {
        let layers = ToggleLayers::new()
            .with_layer(ToggleLayer::file(
                ".env",
                [("MODULE_A", "1"), ("OTHER", "x")].into_iter().collect(),
            ))
            .with_layer(ToggleLayer::process([("MODULE_Z", "1")]));
        assert_eq!(layers.file_keys(), vec!["MODULE_A", "OTHER"]);
        assert!(layers.contains("MODULE_Z"));
    }
}
