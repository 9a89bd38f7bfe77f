//! Settings file lookup and parsing.
//!
//! A settings file names the config source script and lists the option
//! directives to apply on top of its output:
//!
//! ```text
//! [source]
//! archlinux
//!
//! [options]
//! # comments start with '#'
//! enable NAMESPACES USER_NS
//! disable MODULE_SIG
//! set LOCALVERSION="-custom"
//! ```
//!
//! The key/value delimiter is `|` so that `=` is free for `set` operands.
//! Anything after a `|` is ignored.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::OptionDirective;
use crate::error::{Error, Result};
use crate::paths::expand_tilde;
use crate::source::SourceCommand;

/// Name of the subdirectory searched in each config directory.
pub const SETTINGS_SUBDIR: &str = "kernelconfig";

/// Settings name used when none is given.
pub const DEFAULT_SETTINGS: &str = "default";

const SYSTEM_CONFIG_DIR: &str = "/etc";
const DELIMITER: char = '|';

/// Where settings files are searched for when given by name.
#[derive(Debug, Clone)]
pub struct SettingsLocator {
    search_dirs: Vec<PathBuf>,
}

impl Default for SettingsLocator {
    /// `~/.config/kernelconfig` (or `$XDG_CONFIG_HOME`), then `/etc/kernelconfig`.
    fn default() -> Self {
        let mut search_dirs = Vec::new();
        if let Some(config) = dirs::config_dir() {
            search_dirs.push(config.join(SETTINGS_SUBDIR));
        }
        search_dirs.push(Path::new(SYSTEM_CONFIG_DIR).join(SETTINGS_SUBDIR));
        Self { search_dirs }
    }
}

impl SettingsLocator {
    pub fn new(search_dirs: Vec<PathBuf>) -> Self {
        Self { search_dirs }
    }

    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    /// Resolve a settings name or path to an existing file.
    ///
    /// Absolute paths (after `~` expansion) are used as is. Anything else is
    /// looked up in each search directory in order.
    pub fn locate(&self, name: &str) -> Result<PathBuf> {
        let expanded = expand_tilde(Path::new(name));
        let candidates = if expanded.is_absolute() {
            vec![expanded]
        } else {
            self.search_dirs.iter().map(|dir| dir.join(name)).collect()
        };

        match candidates.iter().find(|path| path.is_file()) {
            Some(found) => Ok(found.clone()),
            None => Err(Error::SettingsNotFound {
                name: name.to_string(),
                searched: candidates,
            }),
        }
    }
}

/// A parsed settings file.
#[derive(Debug, Clone)]
pub struct Settings {
    path: PathBuf,
    source: SourceCommand,
    directives: Vec<OptionDirective>,
}

impl Settings {
    /// Locate a settings file by name or path and parse it.
    pub fn find(name: &str, locator: &SettingsLocator) -> Result<Self> {
        let path = locator.locate(name)?;
        tracing::info!("Using settings in {}", path.display());
        Self::load(&path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::io("reading settings", path, e))?;
        Self::parse(&text, path)
    }

    /// Parse settings text. `path` is recorded and used in error messages.
    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidSettings {
            path: path.to_path_buf(),
            reason,
        };

        let sections = parse_sections(text).map_err(invalid)?;

        let mut source_entries = None;
        let mut option_entries = Vec::new();
        for section in sections {
            match section.name.as_str() {
                "source" => source_entries = Some(section.keys),
                "options" => option_entries = section.keys,
                other => tracing::warn!(
                    "ignoring unknown section [{}] in {}",
                    other,
                    path.display()
                ),
            }
        }

        let source_entries =
            source_entries.ok_or_else(|| invalid("missing [source] section".into()))?;
        let source = match source_entries.as_slice() {
            [line] => SourceCommand::parse(line)
                .ok_or_else(|| invalid("empty command in [source] section".into()))?,
            [] => return Err(invalid("[source] section is empty".into())),
            _ => {
                return Err(invalid(format!(
                    "[source] section must contain exactly one entry, found {}",
                    source_entries.len()
                )))
            }
        };

        let directives = option_entries
            .iter()
            .map(|line| OptionDirective::parse(line))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            path: path.to_path_buf(),
            source,
            directives,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source(&self) -> &SourceCommand {
        &self.source
    }

    pub fn directives(&self) -> &[OptionDirective] {
        &self.directives
    }
}

#[derive(Debug)]
struct Section {
    name: String,
    keys: Vec<String>,
}

fn parse_sections(text: &str) -> std::result::Result<Vec<Section>, String> {
    let mut sections: Vec<Section> = Vec::new();
    let mut seen_sections = BTreeSet::new();
    let mut seen_keys = BTreeSet::new();

    for (idx, raw) in text.lines().enumerate() {
        let lineno = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            let name = name.trim().to_string();
            if !seen_sections.insert(name.clone()) {
                return Err(format!("line {lineno}: duplicate section [{name}]"));
            }
            seen_keys.clear();
            sections.push(Section {
                name,
                keys: Vec::new(),
            });
            continue;
        }

        let Some(section) = sections.last_mut() else {
            return Err(format!("line {lineno}: entry '{line}' before any section header"));
        };

        let key = match line.split_once(DELIMITER) {
            Some((key, _value)) => key.trim(),
            None => line,
        };
        if key.is_empty() {
            return Err(format!("line {lineno}: empty entry"));
        }
        if !seen_keys.insert(key.to_string()) {
            return Err(format!(
                "line {lineno}: duplicate entry '{key}' in [{}]",
                section.name
            ));
        }
        section.keys.push(key.to_string());
    }

    Ok(sections)
}
