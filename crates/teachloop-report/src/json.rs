//! JSON report generation.
//!
//! Provides [`JsonGenerator`] for serializing progress reports to JSON,
//! either as compact single-line output or pretty-printed for humans.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::{ProgressReport, Result};

/// JSON report generator.
///
/// Wraps a [`ProgressReport`] reference and provides methods for
/// serializing it in various formats.
#[derive(Debug)]
pub struct JsonGenerator<'a> {
    report: &'a ProgressReport,
}

impl<'a> JsonGenerator<'a> {
    /// Creates a generator for the given report.
    #[must_use]
    pub const fn new(report: &'a ProgressReport) -> Self {
        Self { report }
    }

    /// Generates compact single-line JSON.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::Serialization` if the report cannot be
    /// serialized.
    pub fn generate(&self) -> Result<String> {
        Ok(serde_json::to_string(self.report)?)
    }

    /// Generates pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::Serialization` if the report cannot be
    /// serialized.
    pub fn generate_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self.report)?)
    }

    /// Writes the report to a file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::Io` on filesystem failures and
    /// `ReportError::Serialization` if the report cannot be serialized.
    pub fn write_to_file(&self, path: &Path, pretty: bool) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = if pretty {
            self.generate_pretty()?
        } else {
            self.generate()?
        };
        let mut file = File::create(path)?;
        file.write_all(contents.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use crate::{ContentMode, ModuleRow, SessionStatus};

    use super::*;

    fn sample_report() -> ProgressReport {
        ProgressReport {
            session_id: "s-1".to_string(),
            kb_id: "kb-1".to_string(),
            user_id: "u-1".to_string(),
            status: SessionStatus::Complete,
            adaptive_mode: ContentMode::Advanced,
            overall_percent: 100.0,
            modules: vec![ModuleRow {
                module_id: "m1".to_string(),
                title: "Ownership".to_string(),
                completed_concepts: 2,
                total_concepts: 2,
                percent: 100.0,
                complete: true,
            }],
            unresolved_checkpoints: vec![],
            interactions: 8,
            started_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_generate_compact() {
        let report = sample_report();
        let json = JsonGenerator::new(&report).generate().unwrap();

        assert!(!json.contains('\n'));
        assert!(json.contains(r#""kbId":"kb-1""#));
        assert!(json.contains(r#""status":"complete""#));
        assert!(json.contains(r#""adaptiveMode":"advanced""#));
    }

    #[test]
    fn test_generate_pretty() {
        let report = sample_report();
        let json = JsonGenerator::new(&report).generate_pretty().unwrap();

        assert!(json.contains('\n'));
        assert!(json.contains(r#""sessionId": "s-1""#));
    }

    #[test]
    fn test_generated_json_parses_back() {
        let report = sample_report();
        let json = JsonGenerator::new(&report).generate().unwrap();
        let restored: ProgressReport = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.session_id, "s-1");
        assert_eq!(restored.modules.len(), 1);
        assert!(restored.modules[0].complete);
    }

    #[test]
    fn test_write_to_file_creates_parent_dirs() {
        let report = sample_report();
        let dir = std::env::temp_dir().join("teachloop_report_json_test");
        let path = dir.join("nested").join("report.json");

        JsonGenerator::new(&report)
            .write_to_file(&path, true)
            .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("kb-1"));

        std::fs::remove_dir_all(&dir).ok();
    }
}
