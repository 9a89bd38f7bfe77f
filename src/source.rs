//! Config source scripts.
//!
//! A source script writes the base `.config` for a given architecture and
//! kernel version. It is called as
//!
//! ```text
//! <script> <path/to/.config> <arch> <version> [extra args from settings...]
//! ```
//!
//! from a fresh temporary directory and must exit zero.
//!
//! Script resolution order for a bare name:
//! 1. `KERNELCONFIG_SOURCES_DIR` env var (directory)
//! 2. `<user data dir>/kernelconfig/sources`
//! 3. `/usr/local/share/kernelconfig/sources`
//! 4. `/usr/share/kernelconfig/sources`
//! 5. System PATH (`which <script>`)

use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::process::Cmd;

pub const SOURCES_DIR_ENV: &str = "KERNELCONFIG_SOURCES_DIR";

const SOURCES_SUBDIR: &str = "kernelconfig/sources";
const SYSTEM_DATA_DIRS: &[&str] = &["/usr/local/share", "/usr/share"];

/// The `[source]` line of a settings file: a script name plus extra args.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCommand {
    script: String,
    args: Vec<String>,
}

impl SourceCommand {
    /// Split a command line on whitespace. Returns `None` for a blank line.
    pub fn parse(line: &str) -> Option<Self> {
        let mut tokens = line.split_whitespace().map(str::to_string);
        let script = tokens.next()?;
        Some(Self {
            script,
            args: tokens.collect(),
        })
    }

    pub fn script(&self) -> &str {
        &self.script
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// Directories searched for source scripts given by name.
#[derive(Debug, Clone)]
pub struct SourceResolver {
    search_dirs: Vec<PathBuf>,
    use_path: bool,
}

impl Default for SourceResolver {
    fn default() -> Self {
        let mut search_dirs = Vec::new();
        if let Some(dir) = env::var_os(SOURCES_DIR_ENV) {
            search_dirs.push(PathBuf::from(dir));
        }
        if let Some(data) = dirs::data_dir() {
            search_dirs.push(data.join(SOURCES_SUBDIR));
        }
        search_dirs.extend(
            SYSTEM_DATA_DIRS
                .iter()
                .map(|dir| Path::new(dir).join(SOURCES_SUBDIR)),
        );
        Self {
            search_dirs,
            use_path: true,
        }
    }
}

impl SourceResolver {
    /// Only search `search_dirs`, never `PATH`.
    pub fn new(search_dirs: Vec<PathBuf>) -> Self {
        Self {
            search_dirs,
            use_path: false,
        }
    }

    /// Find the executable for `script`.
    pub fn resolve(&self, script: &str) -> Result<PathBuf> {
        let path = Path::new(script);
        if path.is_absolute() {
            if is_executable(path) {
                return Ok(path.to_path_buf());
            }
            return Err(Error::GeneratorNotFound {
                script: script.to_string(),
                searched: vec![path.to_path_buf()],
            });
        }

        let candidates: Vec<PathBuf> = self.search_dirs.iter().map(|dir| dir.join(script)).collect();
        if let Some(found) = candidates.iter().find(|p| is_executable(p)) {
            return Ok(found.clone());
        }

        if self.use_path {
            if let Ok(found) = which::which(script) {
                return Ok(found);
            }
        }

        Err(Error::GeneratorNotFound {
            script: script.to_string(),
            searched: candidates,
        })
    }
}

/// Check that `path` is a regular file with an execute bit set.
fn is_executable(path: &Path) -> bool {
    match std::fs::metadata(path) {
        Ok(meta) => {
            if !meta.is_file() {
                return false;
            }
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if meta.permissions().mode() & 0o111 == 0 {
                    return false;
                }
            }
            true
        }
        Err(_) => false,
    }
}

/// Run the source script to produce the base `.config` at `config_path`.
///
/// `config_path` must be absolute: the script runs in a temporary directory
/// that is removed once it exits.
pub fn generate_base_config(
    command: &SourceCommand,
    resolver: &SourceResolver,
    config_path: &Path,
    arch: &str,
    version: &str,
) -> Result<()> {
    let script = resolver.resolve(command.script())?;
    tracing::info!(
        "Generating base config with {} (arch {}, version {})",
        script.display(),
        arch,
        version
    );

    let workdir = tempfile::Builder::new()
        .prefix("kernelconfig.")
        .tempdir()
        .map_err(|e| Error::io("creating temporary directory in", env::temp_dir(), e))?;

    Cmd::new(&script)
        .arg(config_path)
        .args([arch, version])
        .args(command.args())
        .dir(workdir.path())
        .error_msg("config source script failed")
        .run_interactive()
        .map_err(|e| Error::GeneratorFailed {
            script: script.clone(),
            reason: e.to_string(),
        })?;

    if !config_path.is_file() {
        return Err(Error::GeneratorFailed {
            script,
            reason: format!("no config was written to {}", config_path.display()),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();
        path
    }

    #[test]
    fn test_parse_source_command() {
        let cmd = SourceCommand::parse("archlinux  lts extra").unwrap();
        assert_eq!(cmd.script(), "archlinux");
        assert_eq!(cmd.args(), ["lts", "extra"]);
        assert!(SourceCommand::parse("   ").is_none());
    }

    #[test]
    fn test_resolve_in_search_dirs() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let script = write_script(second.path(), "fedora", "exit 0");
        // Not executable, must be skipped.
        fs::write(first.path().join("fedora"), "").unwrap();

        let resolver = SourceResolver::new(vec![first.path().into(), second.path().into()]);
        assert_eq!(resolver.resolve("fedora").unwrap(), script);
    }

    #[test]
    fn test_resolve_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = SourceResolver::new(vec![dir.path().into()]);
        let err = resolver.resolve("nope").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Environment);
        assert!(err.to_string().contains("'nope' not found"));
    }

    #[test]
    fn test_generate_passes_arguments() {
        let scripts = tempfile::tempdir().unwrap();
        let kernel = tempfile::tempdir().unwrap();
        write_script(
            scripts.path(),
            "echoargs",
            r##"config="$1"; shift; echo "# $*" > "$config"; echo "# cwd $(pwd)" >> "$config""##,
        );
        let config = kernel.path().join(".config");
        let resolver = SourceResolver::new(vec![scripts.path().into()]);
        let command = SourceCommand::parse("echoargs lts").unwrap();

        generate_base_config(&command, &resolver, &config, "x86_64", "5.10").unwrap();

        let out = fs::read_to_string(&config).unwrap();
        assert!(out.starts_with("# x86_64 5.10 lts\n"));
        assert!(out.contains("kernelconfig."));
    }

    #[test]
    fn test_generate_failure() {
        let scripts = tempfile::tempdir().unwrap();
        let kernel = tempfile::tempdir().unwrap();
        write_script(scripts.path(), "broken", "exit 3");
        let resolver = SourceResolver::new(vec![scripts.path().into()]);
        let command = SourceCommand::parse("broken").unwrap();

        let err = generate_base_config(
            &command,
            &resolver,
            &kernel.path().join(".config"),
            "x86_64",
            "5.10",
        )
        .unwrap_err();
        assert!(matches!(err, Error::GeneratorFailed { .. }));
    }

    #[test]
    fn test_generate_without_output() {
        let scripts = tempfile::tempdir().unwrap();
        let kernel = tempfile::tempdir().unwrap();
        write_script(scripts.path(), "lazy", "exit 0");
        let resolver = SourceResolver::new(vec![scripts.path().into()]);
        let command = SourceCommand::parse("lazy").unwrap();

        let err = generate_base_config(
            &command,
            &resolver,
            &kernel.path().join(".config"),
            "x86_64",
            "5.10",
        )
        .unwrap_err();
        assert!(err.to_string().contains("no config was written"));
    }
}
