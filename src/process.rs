//! Small builder around [`std::process::Command`].
//!
//! ```rust,ignore
//! Cmd::new("/usr/share/kernelconfig/sources/archlinux")
//!     .args([config_path, arch, version])
//!     .dir(tmpdir.path())
//!     .error_msg("config source script failed")
//!     .run_interactive()?;
//! ```

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CmdError {
    #[error("{msg}: could not start {program}: {source}")]
    Spawn {
        msg: String,
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{msg}: {program} exited with {status}")]
    Status {
        msg: String,
        program: String,
        status: ExitStatus,
    },
}

#[derive(Debug, Clone)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    dir: Option<PathBuf>,
    error_msg: String,
}

impl Cmd {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        let program = program.as_ref().to_os_string();
        let error_msg = format!("{} failed", program.to_string_lossy());
        Self {
            program,
            args: Vec::new(),
            dir: None,
            error_msg,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Working directory for the child.
    pub fn dir(mut self, dir: &Path) -> Self {
        self.dir = Some(dir.to_path_buf());
        self
    }

    /// Prefix for the error reported when the command fails.
    pub fn error_msg(mut self, msg: impl Into<String>) -> Self {
        self.error_msg = msg.into();
        self
    }

    /// Run with inherited stdio, blocking until the child exits.
    ///
    /// A non-zero exit status is an error.
    pub fn run_interactive(&self) -> Result<(), CmdError> {
        tracing::debug!("running {}", self);

        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if let Some(dir) = &self.dir {
            command.current_dir(dir);
        }

        let status = command.status().map_err(|source| CmdError::Spawn {
            msg: self.error_msg.clone(),
            program: self.program.to_string_lossy().into_owned(),
            source,
        })?;

        if !status.success() {
            return Err(CmdError::Status {
                msg: self.error_msg.clone(),
                program: self.program.to_string_lossy().into_owned(),
                status,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}
