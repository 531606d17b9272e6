//! Markdown report generation.
//!
//! Renders a [`ProgressReport`] as a human-readable Markdown document with
//! a summary section, a per-module table, and the checkpoints saved for
//! review.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::{ProgressReport, Result};

/// Markdown report generator.
#[derive(Debug)]
pub struct MarkdownGenerator<'a> {
    report: &'a ProgressReport,
}

impl<'a> MarkdownGenerator<'a> {
    /// Creates a generator for the given report.
    #[must_use]
    pub const fn new(report: &'a ProgressReport) -> Self {
        Self { report }
    }

    /// Renders the complete Markdown document.
    #[must_use]
    pub fn generate(&self) -> String {
        let mut out = String::new();
        self.render_header(&mut out);
        self.render_summary(&mut out);
        self.render_modules(&mut out);
        self.render_review(&mut out);
        out
    }

    /// Writes the rendered report to a file, creating parent directories
    /// as needed.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::Io` on filesystem failures.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;
        file.write_all(self.generate().as_bytes())?;
        Ok(())
    }

    fn render_header(&self, out: &mut String) {
        out.push_str("# Teaching Session Report\n\n");
        out.push_str(&format!(
            "**Knowledge base**: {}  \n**User**: {}  \n**Session**: {}\n\n",
            self.report.kb_id, self.report.user_id, self.report.session_id
        ));
    }

    fn render_summary(&self, out: &mut String) {
        out.push_str("## Summary\n\n");
        out.push_str(&format!("- **Status**: {}\n", self.report.status));
        out.push_str(&format!(
            "- **Overall progress**: {:.1}%\n",
            self.report.overall_percent
        ));
        out.push_str(&format!(
            "- **Content mode**: {}\n",
            self.report.adaptive_mode
        ));
        out.push_str(&format!(
            "- **Interactions**: {}\n",
            self.report.interactions
        ));
        out.push_str(&format!(
            "- **Started**: {}\n",
            self.report.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        out.push_str(&format!(
            "- **Last active**: {}\n\n",
            self.report.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
    }

    fn render_modules(&self, out: &mut String) {
        out.push_str("## Modules\n\n");
        if self.report.modules.is_empty() {
            out.push_str("No modules in this knowledge base.\n\n");
            return;
        }

        out.push_str("| Module | Concepts | Progress | Complete |\n");
        out.push_str("|--------|----------|----------|----------|\n");
        for module in &self.report.modules {
            out.push_str(&format!(
                "| {} | {}/{} | {:.1}% | {} |\n",
                module.title,
                module.completed_concepts,
                module.total_concepts,
                module.percent,
                if module.complete { "yes" } else { "no" }
            ));
        }
        out.push('\n');
    }

    fn render_review(&self, out: &mut String) {
        out.push_str("## Saved for review\n\n");
        if self.report.unresolved_checkpoints.is_empty() {
            out.push_str("No checkpoints hit the retry limit.\n");
            return;
        }
        for checkpoint in &self.report.unresolved_checkpoints {
            out.push_str(&format!("- `{checkpoint}`\n"));
        }
    }
}
