//! Generate custom kernel configurations from curated sources.
//!
//! A run detects the kernel version from the source tree's `Makefile`, asks a
//! config source script for a base `.config` matching the architecture and
//! version, then applies the option directives listed in a settings file.
//!
//! - **Kernel tree** - version detection and `.config` backup ([`kernel`])
//! - **Settings** - settings file lookup and parsing ([`settings`])
//! - **Config patching** - `.config` document and directive engine ([`config`])
//! - **Source scripts** - base config generation ([`source`])
//!
//! # Architecture
//!
//! ```text
//! kernelconfig (binary)
//!     │
//!     └── pipeline::run
//!             ├── kernel::KernelTree        Makefile -> version, .config.old
//!             ├── settings::Settings        [source] + [options]
//!             ├── source::generate_base_config
//!             └── config::DirectiveEngine   delete + append, last write wins
//! ```
//!
//! # Example
//!
//! ```rust
//! use kernelconfig::config::{apply_directives, ConfigDocument, OptionDirective};
//!
//! let doc = ConfigDocument::parse("CONFIG_A=y\n# CONFIG_FOO is not set\n");
//! let directives = vec![OptionDirective::parse("enable foo").unwrap()];
//! let (doc, _) = apply_directives(doc, &directives);
//! assert_eq!(doc.serialize(), "CONFIG_A=y\nCONFIG_FOO=y\n");
//! ```

pub mod config;
pub mod error;
pub mod host;
pub mod kernel;
pub mod paths;
pub mod pipeline;
pub mod process;
pub mod settings;
pub mod source;

pub use config::{Action, ConfigDocument, DirectiveEngine, OptionDirective};
pub use error::{Error, ErrorKind, Result};
pub use kernel::{KernelTree, KernelVersion};
pub use pipeline::{run, Environment, RunOptions, RunReport};
pub use settings::{Settings, SettingsLocator};
