//! Kernel source tree detection.
//!
//! Reads the version from the top-level `Makefile` and manages the
//! `.config` / `.config.old` pair in the source directory.
//!
//! # Usage
//!
//! ```rust,ignore
//! use kernelconfig::kernel::KernelTree;
//!
//! let tree = KernelTree::open(Path::new("/usr/src/linux"))?;
//! println!("{}", tree.version().full());
//! tree.backup_config()?;
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::paths::expand_tilde;

static VERSION_RE: Lazy<Regex> = Lazy::new(|| makefile_var("VERSION"));
static PATCHLEVEL_RE: Lazy<Regex> = Lazy::new(|| makefile_var("PATCHLEVEL"));
static SUBLEVEL_RE: Lazy<Regex> = Lazy::new(|| makefile_var("SUBLEVEL"));
static EXTRAVERSION_RE: Lazy<Regex> = Lazy::new(|| makefile_var("EXTRAVERSION"));
static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^NAME[ \t]*=[ \t]*(.*?)[ \t]*$").expect("Invalid NAME regex"));

fn makefile_var(name: &str) -> Regex {
    Regex::new(&format!(r"(?m)^{name}[ \t]*=[ \t]*(\S*)")).expect("Invalid Makefile variable regex")
}

/// Version information from a kernel Makefile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelVersion {
    pub version: String,
    pub patchlevel: String,
    pub sublevel: String,
    /// May be empty.
    pub extraversion: String,
    /// Release name (`NAME = ...`), purely informational.
    pub name: Option<String>,
}

impl KernelVersion {
    /// Parse Makefile text. `makefile` is only used for error messages.
    pub fn parse(text: &str, makefile: &Path) -> Result<Self> {
        Ok(Self {
            version: numeric_field(&VERSION_RE, "VERSION", text, makefile)?,
            patchlevel: numeric_field(&PATCHLEVEL_RE, "PATCHLEVEL", text, makefile)?,
            sublevel: numeric_field(&SUBLEVEL_RE, "SUBLEVEL", text, makefile)?,
            extraversion: capture(&EXTRAVERSION_RE, text).unwrap_or_default(),
            name: capture(&NAME_RE, text).filter(|n| !n.is_empty()),
        })
    }

    /// `<VERSION>.<PATCHLEVEL>`, e.g. `5.10`.
    pub fn major(&self) -> String {
        format!("{}.{}", self.version, self.patchlevel)
    }

    /// `<major>.<SUBLEVEL><EXTRAVERSION>`, e.g. `5.10.3-gentoo`.
    pub fn full(&self) -> String {
        format!("{}.{}{}", self.major(), self.sublevel, self.extraversion)
    }
}

fn numeric_field(re: &Regex, field: &'static str, text: &str, makefile: &Path) -> Result<String> {
    match capture(re, text) {
        Some(v) if !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit()) => Ok(v),
        _ => Err(Error::MalformedMakefile {
            path: makefile.to_path_buf(),
            field,
        }),
    }
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// A kernel source directory with a readable Makefile.
#[derive(Debug, Clone)]
pub struct KernelTree {
    dir: PathBuf,
    version: KernelVersion,
}

impl KernelTree {
    /// Open the kernel sources at `location` (`~` is expanded).
    pub fn open(location: &Path) -> Result<Self> {
        let location = expand_tilde(location);
        let makefile = location.join("Makefile");
        let text = fs::read_to_string(&makefile).map_err(|source| Error::KernelTreeNotFound {
            path: location.clone(),
            source,
        })?;

        // The config source script runs in a temporary directory, so every
        // path handed out from here must be absolute.
        let dir = fs::canonicalize(&location).map_err(|source| Error::KernelTreeNotFound {
            path: location.clone(),
            source,
        })?;

        let version = KernelVersion::parse(&text, &makefile)?;
        if let Some(name) = &version.name {
            tracing::info!("Kernel {} \"{}\"", version.full(), name);
        } else {
            tracing::info!("Kernel {}", version.full());
        }

        Ok(Self { dir, version })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn version(&self) -> &KernelVersion {
        &self.version
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.join(".config")
    }

    pub fn backup_path(&self) -> PathBuf {
        self.dir.join(".config.old")
    }

    /// Copy `.config` to `.config.old` if a `.config` exists.
    ///
    /// Returns whether a backup was written.
    pub fn backup_config(&self) -> Result<bool> {
        let config = self.config_path();
        if !config.is_file() {
            return Ok(false);
        }
        let backup = self.backup_path();
        fs::copy(&config, &backup).map_err(|e| Error::io("backing up", &config, e))?;
        tracing::debug!("backed up {} to {}", config.display(), backup.display());
        Ok(true)
    }
}
