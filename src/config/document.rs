//! In-memory kernel `.config` document.
//!
//! A `.config` is a flat list of lines in one of three shapes:
//!
//! ```text
//! CONFIG_FOO=y
//! # CONFIG_BAR is not set
//! # Anything else, kept verbatim
//! ```
//!
//! Edits never happen in place. An option is first removed wherever it
//! appears, then its new line is appended at the end of the document, so
//! touched options always end up at the tail.

use std::collections::BTreeMap;
use std::fmt;

/// Prefix shared by every kernel configuration symbol.
pub const CONFIG_PREFIX: &str = "CONFIG_";

const UNSET_PREFIX: &str = "# CONFIG_";
const UNSET_SUFFIX: &str = " is not set";

/// One line of a `.config` file.
///
/// Keys are stored without the `CONFIG_` prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLine {
    /// `CONFIG_<key>=<value>`
    Set { key: String, value: String },
    /// `# CONFIG_<key> is not set`
    Unset { key: String },
    /// Comments, blank lines and anything else.
    Other(String),
}

impl ConfigLine {
    pub fn parse(line: &str) -> Self {
        if let Some(rest) = line.strip_prefix(CONFIG_PREFIX) {
            if let Some((key, value)) = rest.split_once('=') {
                if is_symbol(key) {
                    return ConfigLine::Set {
                        key: key.to_string(),
                        value: value.to_string(),
                    };
                }
            }
        }

        if let Some(key) = line
            .strip_prefix(UNSET_PREFIX)
            .and_then(|rest| rest.strip_suffix(UNSET_SUFFIX))
        {
            if is_symbol(key) {
                return ConfigLine::Unset {
                    key: key.to_string(),
                };
            }
        }

        ConfigLine::Other(line.to_string())
    }

    /// Symbol this line assigns, if any.
    pub fn key(&self) -> Option<&str> {
        match self {
            ConfigLine::Set { key, .. } | ConfigLine::Unset { key } => Some(key),
            ConfigLine::Other(_) => None,
        }
    }

    /// Whether this line mentions `CONFIG_<key>` followed by `=` or a space.
    ///
    /// Assignments and `is not set` lines match on their own symbol only, so
    /// a value mentioning `CONFIG_FOO=` does not make the line a `FOO` line.
    /// Free-form lines are searched, so hand-edited variants such as
    /// `#CONFIG_FOO is not set` or `  CONFIG_FOO=y` are caught.
    pub fn references(&self, key: &str) -> bool {
        match self {
            ConfigLine::Set { key: k, .. } | ConfigLine::Unset { key: k } => k == key,
            ConfigLine::Other(text) => text_references(text, key),
        }
    }
}

impl fmt::Display for ConfigLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigLine::Set { key, value } => write!(f, "{CONFIG_PREFIX}{key}={value}"),
            ConfigLine::Unset { key } => write!(f, "{UNSET_PREFIX}{key}{UNSET_SUFFIX}"),
            ConfigLine::Other(text) => f.write_str(text),
        }
    }
}

/// Whether `s` is a valid symbol name: non-empty, ASCII alphanumerics and `_`.
pub(crate) fn is_symbol(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

fn text_references(text: &str, key: &str) -> bool {
    let needle = format!("{CONFIG_PREFIX}{key}");
    let bytes = text.as_bytes();

    text.match_indices(&needle).any(|(start, _)| {
        // CONFIG_MY_CONFIG_FOO must not count as a reference to FOO
        let boundary_before = start == 0 || {
            let b = bytes[start - 1];
            !(b.is_ascii_alphanumeric() || b == b'_')
        };
        let after = bytes.get(start + needle.len()).copied();
        boundary_before && matches!(after, Some(b'=') | Some(b' '))
    })
}

/// A whole `.config` file as an ordered list of lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDocument {
    lines: Vec<ConfigLine>,
}

impl ConfigDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Split `text` into lines. A trailing newline does not create an empty
    /// last line.
    pub fn parse(text: &str) -> Self {
        Self {
            lines: text.split_terminator('\n').map(ConfigLine::parse).collect(),
        }
    }

    /// Remove every line that references `key`.
    ///
    /// `key` is matched case-sensitively and without the `CONFIG_` prefix.
    /// Returns the number of removed lines; zero leaves the document untouched.
    pub fn delete_option(&mut self, key: &str) -> usize {
        let before = self.lines.len();
        self.lines.retain(|line| !line.references(key));
        before - self.lines.len()
    }

    pub fn append_line(&mut self, line: ConfigLine) {
        self.lines.push(line);
    }

    /// Render the document, every line terminated by `\n`.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(&line.to_string());
            out.push('\n');
        }
        out
    }

    pub fn lines(&self) -> &[ConfigLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Map from symbol to the indices of the lines assigning it.
    pub fn key_index(&self) -> BTreeMap<&str, Vec<usize>> {
        let mut index: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (i, line) in self.lines.iter().enumerate() {
            if let Some(key) = line.key() {
                index.entry(key).or_default().push(i);
            }
        }
        index
    }

    /// The last line assigning `key`.
    pub fn get(&self, key: &str) -> Option<&ConfigLine> {
        self.lines.iter().rev().find(|line| line.key() == Some(key))
    }

    /// Number of lines referencing `key`.
    pub fn occurrences(&self, key: &str) -> usize {
        self.lines.iter().filter(|line| line.references(key)).count()
    }

    /// Symbols assigned by more than one line.
    pub fn duplicate_keys(&self) -> Vec<&str> {
        self.key_index()
            .into_iter()
            .filter(|(_, idx)| idx.len() > 1)
            .map(|(key, _)| key)
            .collect()
    }
}
