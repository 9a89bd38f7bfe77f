//! Applies option directives to a `.config` document.

use crate::config::directive::{Action, OptionDirective};
use crate::config::document::ConfigDocument;

/// Number of options touched per action during one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub enabled: usize,
    pub disabled: usize,
    pub modules: usize,
    pub set: usize,
}

impl ApplySummary {
    pub fn total(&self) -> usize {
        self.enabled + self.disabled + self.modules + self.set
    }

    fn record(&mut self, action: Action) {
        match action {
            Action::Enable => self.enabled += 1,
            Action::Disable => self.disabled += 1,
            Action::Module => self.modules += 1,
            Action::Set => self.set += 1,
        }
    }
}

/// Owns a document while directives are applied to it, in order.
///
/// Each operand first removes every existing line for its option and then
/// appends the new line, so the last directive touching an option wins.
#[derive(Debug)]
pub struct DirectiveEngine {
    document: ConfigDocument,
    summary: ApplySummary,
}

impl DirectiveEngine {
    pub fn new(document: ConfigDocument) -> Self {
        Self {
            document,
            summary: ApplySummary::default(),
        }
    }

    pub fn apply(&mut self, directive: &OptionDirective) {
        if directive.operands().is_empty() {
            tracing::warn!("'{}' directive has no options, ignoring", directive.action());
            return;
        }

        for operand in directive.operands() {
            match directive.action() {
                Action::Enable => tracing::info!("Enabling {}", operand.key),
                Action::Disable => tracing::info!("Disabling {}", operand.key),
                Action::Module => tracing::info!("Setting {} as module", operand.key),
                Action::Set => tracing::info!(
                    "Setting {}={}",
                    operand.key,
                    operand.value.as_deref().unwrap_or_default()
                ),
            }

            let removed = self.document.delete_option(&operand.key);
            if removed > 1 {
                tracing::debug!("removed {} stale lines for {}", removed, operand.key);
            }
            self.document.append_line(directive.line_for(operand));
            self.summary.record(directive.action());
        }
    }

    pub fn apply_all<'a>(&mut self, directives: impl IntoIterator<Item = &'a OptionDirective>) {
        for directive in directives {
            self.apply(directive);
        }
    }

    pub fn document(&self) -> &ConfigDocument {
        &self.document
    }

    pub fn summary(&self) -> ApplySummary {
        self.summary
    }

    /// Release the patched document.
    pub fn finish(self) -> (ConfigDocument, ApplySummary) {
        (self.document, self.summary)
    }
}

/// Apply `directives` to `document` and return the patched result.
pub fn apply_directives(
    document: ConfigDocument,
    directives: &[OptionDirective],
) -> (ConfigDocument, ApplySummary) {
    let mut engine = DirectiveEngine::new(document);
    engine.apply_all(directives);
    engine.finish()
}
