//! Kernel `.config` patching.
//!
//! This module provides:
//! - [`document`] - line-indexed `.config` document
//! - [`directive`] - `enable`/`disable`/`module`/`set` directives
//! - [`engine`] - ordered application of directives to a document

pub mod directive;
pub mod document;
pub mod engine;

pub use directive::{Action, OptionDirective, Operand};
pub use document::{ConfigDocument, ConfigLine};
pub use engine::{apply_directives, ApplySummary, DirectiveEngine};
