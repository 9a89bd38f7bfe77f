//! The complete configuration run.
//!
//! ```text
//! Makefile -> version
//! settings -> source command + directives
//! .config  -> .config.old
//! source script -> base .config
//! directives applied -> .config
//! ```
//!
//! Everything that can be validated up front (kernel tree, settings,
//! directives) is checked before any file is touched.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{apply_directives, ApplySummary, ConfigDocument};
use crate::error::{Error, Result};
use crate::host;
use crate::kernel::{KernelTree, KernelVersion};
use crate::settings::{Settings, SettingsLocator, DEFAULT_SETTINGS};
use crate::source::{generate_base_config, SourceResolver};

/// Inputs for one run, as given on the command line.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Kernel source directory.
    pub kernel: PathBuf,
    /// Settings name or path.
    pub settings: String,
    /// Overrides the host architecture.
    pub arch: Option<String>,
    /// Overrides the detected major kernel version.
    pub version: Option<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            kernel: PathBuf::from("."),
            settings: DEFAULT_SETTINGS.to_string(),
            arch: None,
            version: None,
        }
    }
}

/// What a finished run did.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub kernel_version: KernelVersion,
    pub settings_path: PathBuf,
    pub config_path: PathBuf,
    pub arch: String,
    pub version: String,
    pub backup_taken: bool,
    pub summary: ApplySummary,
}

/// Lookup locations used by [`run`].
#[derive(Debug, Clone, Default)]
pub struct Environment {
    pub settings: SettingsLocator,
    pub sources: SourceResolver,
}

pub fn run(options: &RunOptions, env: &Environment) -> Result<RunReport> {
    let tree = KernelTree::open(&options.kernel)?;
    let settings = Settings::find(&options.settings, &env.settings)?;

    let backup_taken = tree.backup_config()?;

    let version = options
        .version
        .clone()
        .unwrap_or_else(|| tree.version().major());
    let arch = options.arch.clone().unwrap_or_else(host::machine_arch);

    let config_path = tree.config_path();
    generate_base_config(settings.source(), &env.sources, &config_path, &arch, &version)?;

    let summary = patch_config(&config_path, &settings)?;
    tracing::info!(
        "Wrote {} ({} enabled, {} disabled, {} modules, {} set)",
        config_path.display(),
        summary.enabled,
        summary.disabled,
        summary.modules,
        summary.set
    );

    Ok(RunReport {
        kernel_version: tree.version().clone(),
        settings_path: settings.path().to_path_buf(),
        config_path,
        arch,
        version,
        backup_taken,
        summary,
    })
}

/// Apply the settings' directives to the `.config` at `config_path`,
/// reading and writing the file once each.
pub fn patch_config(config_path: &Path, settings: &Settings) -> Result<ApplySummary> {
    let text = fs::read_to_string(config_path)
        .map_err(|e| Error::io("reading kernel config", config_path, e))?;
    let document = ConfigDocument::parse(&text);

    let duplicates = document.duplicate_keys();
    if !duplicates.is_empty() {
        tracing::warn!(
            "base config assigns some options more than once: {}",
            duplicates.join(", ")
        );
    }

    let (document, summary) = apply_directives(document, settings.directives());

    fs::write(config_path, document.serialize())
        .map_err(|e| Error::io("writing kernel config", config_path, e))?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::os::unix::fs::PermissionsExt;

    const MAKEFILE: &str = "VERSION = 5\nPATCHLEVEL = 10\nSUBLEVEL = 3\nEXTRAVERSION = -gentoo\n";

    // Writes a small base config and records its arguments.
    const SOURCE_SCRIPT: &str = r#"#!/bin/sh
config="$1"
cat > "$config" <<EOF
# Generated for $2 $3 $4
CONFIG_64BIT=y
# CONFIG_FOO is not set
CONFIG_BAR=y
CONFIG_HZ=1000
EOF
"#;

    struct Fixture {
        kernel: tempfile::TempDir,
        settings: tempfile::TempDir,
        sources: tempfile::TempDir,
    }

    impl Fixture {
        fn new(settings_text: &str) -> Self {
            let kernel = tempfile::tempdir().unwrap();
            fs::write(kernel.path().join("Makefile"), MAKEFILE).unwrap();

            let settings = tempfile::tempdir().unwrap();
            fs::write(settings.path().join("default"), settings_text).unwrap();

            let sources = tempfile::tempdir().unwrap();
            let script = sources.path().join("testsource");
            fs::write(&script, SOURCE_SCRIPT).unwrap();
            let mut perms = fs::metadata(&script).unwrap().permissions();
            perms.set_mode(0o755);
            fs::set_permissions(&script, perms).unwrap();

            Self {
                kernel,
                settings,
                sources,
            }
        }

        fn env(&self) -> Environment {
            Environment {
                settings: SettingsLocator::new(vec![self.settings.path().into()]),
                sources: SourceResolver::new(vec![self.sources.path().into()]),
            }
        }

        fn options(&self) -> RunOptions {
            RunOptions {
                kernel: self.kernel.path().into(),
                arch: Some("x86_64".into()),
                ..RunOptions::default()
            }
        }

        fn config(&self) -> String {
            fs::read_to_string(self.kernel.path().join(".config")).unwrap()
        }
    }

    #[test]
    fn test_full_run() {
        let fx = Fixture::new(
            "[source]\ntestsource extra\n\n[options]\nenable foo\ndisable bar\nset hz=300\n",
        );
        fs::write(fx.kernel.path().join(".config"), "CONFIG_OLD=y\n").unwrap();

        let report = run(&fx.options(), &fx.env()).unwrap();

        assert_eq!(
            fx.config(),
            "# Generated for x86_64 5.10 extra\n\
             CONFIG_64BIT=y\n\
             CONFIG_FOO=y\n\
             # CONFIG_BAR is not set\n\
             CONFIG_HZ=300\n"
        );
        assert_eq!(
            fs::read_to_string(fx.kernel.path().join(".config.old")).unwrap(),
            "CONFIG_OLD=y\n"
        );
        assert!(report.backup_taken);
        assert_eq!(report.version, "5.10");
        assert_eq!(report.kernel_version.full(), "5.10.3-gentoo");
        assert_eq!(report.summary.total(), 3);
    }

    #[test]
    fn test_version_override_and_no_backup() {
        let fx = Fixture::new("[source]\ntestsource\n");
        let options = RunOptions {
            version: Some("4.19".into()),
            ..fx.options()
        };

        let report = run(&options, &fx.env()).unwrap();

        assert!(fx.config().starts_with("# Generated for x86_64 4.19 \n"));
        assert!(!report.backup_taken);
        assert!(!fx.kernel.path().join(".config.old").exists());
    }

    #[test]
    fn test_missing_settings_fails_before_generator() {
        let fx = Fixture::new("[source]\ntestsource\n");
        fs::write(fx.kernel.path().join(".config"), "CONFIG_OLD=y\n").unwrap();
        let options = RunOptions {
            settings: "foo".into(),
            ..fx.options()
        };

        let err = run(&options, &fx.env()).unwrap_err();

        assert!(matches!(err, Error::SettingsNotFound { .. }));
        assert_eq!(fx.config(), "CONFIG_OLD=y\n");
        assert!(!fx.kernel.path().join(".config.old").exists());
    }

    #[test]
    fn test_bad_directive_fails_before_generator() {
        let fx = Fixture::new("[source]\ntestsource\n[options]\nfrobnicate FOO\n");
        let err = run(&fx.options(), &fx.env()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownDirective);
        assert!(!fx.kernel.path().join(".config").exists());
    }

    #[test]
    fn test_not_a_kernel_tree() {
        let fx = Fixture::new("[source]\ntestsource\n");
        fs::remove_file(fx.kernel.path().join("Makefile")).unwrap();
        let err = run(&fx.options(), &fx.env()).unwrap_err();
        assert!(matches!(err, Error::KernelTreeNotFound { .. }));
    }

    #[test]
    fn test_patch_config_twice_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join(".config");
        fs::write(&config, "CONFIG_A=y\n# CONFIG_B is not set\n").unwrap();
        let settings = Settings::parse(
            "[source]\nx\n[options]\nenable b\nmodule a\n",
            Path::new("settings"),
        )
        .unwrap();

        patch_config(&config, &settings).unwrap();
        let once = fs::read_to_string(&config).unwrap();
        patch_config(&config, &settings).unwrap();
        assert_eq!(fs::read_to_string(&config).unwrap(), once);
        assert_eq!(once, "CONFIG_B=y\nCONFIG_A=m\n");
    }
}
