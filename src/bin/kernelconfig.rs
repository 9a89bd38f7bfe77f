//! kernelconfig CLI
//!
//! Generates a kernel `.config` from a curated source and a settings file.
//!
//! # Usage
//!
//! ```bash
//! # Configure the kernel in the current directory with ~/.config/kernelconfig/default
//! kernelconfig
//!
//! # Cross-configure another tree with a named settings file
//! kernelconfig -k /usr/src/linux -a aarch64 -s server
//!
//! # Use an older curated config when the source has nothing for this kernel yet
//! kernelconfig -v 6.6
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kernelconfig::settings::DEFAULT_SETTINGS;
use kernelconfig::{Environment, RunOptions};

/// Generate custom kernel configurations from known curated sources.
#[derive(Parser, Debug)]
#[command(name = "kernelconfig", author, about, long_about = None)]
struct Cli {
    /// Force kernel configuration architecture (useful for cross-compiling)
    #[arg(short, long)]
    arch: Option<String>,

    /// Path to unpacked kernel source directory
    #[arg(short, long, default_value = ".")]
    kernel: PathBuf,

    /// Settings file name (searched in ~/.config/kernelconfig and /etc/kernelconfig) or absolute path
    #[arg(short, long, default_value = DEFAULT_SETTINGS)]
    settings: String,

    /// Force kernel configuration version (useful when the curated source has no matching major version)
    #[arg(short, long)]
    version: Option<String>,

    /// Enable debug output
    #[arg(long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time().with_target(false))
        .init();

    let options = RunOptions {
        kernel: cli.kernel,
        settings: cli.settings,
        arch: cli.arch,
        version: cli.version,
    };

    let report = kernelconfig::run(&options, &Environment::default()).with_context(|| {
        format!(
            "configuring kernel sources in '{}'",
            options.kernel.display()
        )
    })?;

    if report.backup_taken {
        println!(
            "Previous config saved as {}",
            report.config_path.with_file_name(".config.old").display()
        );
    }
    println!(
        "Configured Linux {} for {} ({} options from {})",
        report.kernel_version.full(),
        report.arch,
        report.summary.total(),
        report.settings_path.display()
    );

    Ok(())
}
