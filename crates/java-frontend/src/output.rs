//! Diagnostics and output formatting.

use std::fmt;

use camino::Utf8Path;
use java_source_map::{LineIndex, Range};
use serde::{Deserialize, Serialize};

use crate::cli::OutputFormat;

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("Error"),
            Severity::Warning => f.write_str("Warning"),
        }
    }
}

/// Where a diagnostic on a generated file comes from in its template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    /// The template path, or its short name when the map has no path.
    pub file: String,
    /// First template line (1-based).
    pub start_line: u32,
    /// Last template line (1-based).
    pub end_line: u32,
}

/// A diagnostic found in one file. Columns are 0-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub message: String,
    pub range: Range,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Origin>,
}

/// A formatted diagnostic for JSON output.
#[derive(Debug, Serialize)]
pub struct FormattedDiagnostic {
    /// The diagnostic type (Error or Warning).
    #[serde(rename = "type")]
    pub diagnostic_type: String,
    /// The file path.
    pub filename: String,
    /// The start position.
    pub start: Position,
    /// The end position.
    pub end: Position,
    /// The message.
    pub message: String,
    /// The diagnostic code.
    pub code: String,
    /// The template location, for generated files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<Origin>,
}

/// A position in the source.
#[derive(Debug, Serialize)]
pub struct Position {
    /// 1-indexed line number.
    pub line: u32,
    /// 1-indexed column number.
    pub column: u32,
    /// Byte offset.
    pub offset: u32,
}

/// Formats diagnostics for output.
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    /// Creates a new formatter.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a collection of diagnostics.
    pub fn format(&self, diagnostics: &[Diagnostic], file_path: &Utf8Path, source: &str) -> String {
        match self.format {
            OutputFormat::Human => self.format_human(diagnostics, file_path),
            OutputFormat::HumanVerbose => self.format_human_verbose(diagnostics, file_path, source),
            OutputFormat::Json => self.format_json(diagnostics, file_path, source),
            OutputFormat::Machine => self.format_machine(diagnostics, file_path),
        }
    }

    fn format_human(&self, diagnostics: &[Diagnostic], file_path: &Utf8Path) -> String {
        let mut output = String::new();

        for diag in diagnostics {
            let start = diag.range.start;
            output.push_str(&format!(
                "{}:{}:{}\n{}: {} ({})\n",
                file_path,
                start.line,
                start.column_one_based(),
                diag.severity,
                diag.message,
                diag.code
            ));
            push_origin(&mut output, diag);
            output.push('\n');
        }

        output
    }

    fn format_human_verbose(&self, diagnostics: &[Diagnostic], file_path: &Utf8Path, source: &str) -> String {
        let line_index = LineIndex::new(source);
        let mut output = String::new();

        for diag in diagnostics {
            let start = diag.range.start;
            output.push_str(&format!(
                "{}:{}:{}\n{}: {} ({})\n",
                file_path,
                start.line,
                start.column_one_based(),
                diag.severity,
                diag.message,
                diag.code
            ));
            push_origin(&mut output, diag);

            // Add code snippet
            if let Some(line) = line_index.line_text(start.line) {
                output.push_str(&format!("  {} | {}\n", start.line, line));

                let padding = " ".repeat(start.column as usize);
                output.push_str(&format!(
                    "  {} | {}^\n",
                    " ".repeat(start.line.to_string().len()),
                    padding
                ));
            }

            output.push('\n');
        }

        output
    }

    fn format_json(&self, diagnostics: &[Diagnostic], file_path: &Utf8Path, source: &str) -> String {
        let formatted = Self::format_json_diagnostics(diagnostics, file_path, source);
        serde_json::to_string_pretty(&formatted).unwrap_or_default()
    }

    /// Formats diagnostics into JSON-ready structs.
    pub fn format_json_diagnostics(
        diagnostics: &[Diagnostic],
        file_path: &Utf8Path,
        source: &str,
    ) -> Vec<FormattedDiagnostic> {
        let line_index = LineIndex::new(source);
        let position = |p: java_source_map::Position| Position {
            line: p.line,
            column: p.column_one_based(),
            offset: line_index.offset(p).map(u32::from).unwrap_or(0),
        };

        diagnostics
            .iter()
            .map(|diag| FormattedDiagnostic {
                diagnostic_type: diag.severity.to_string(),
                filename: file_path.to_string(),
                start: position(diag.range.start),
                end: position(diag.range.end),
                message: diag.message.clone(),
                code: diag.code.clone(),
                origin: diag.origin.clone(),
            })
            .collect()
    }

    fn format_machine(&self, diagnostics: &[Diagnostic], file_path: &Utf8Path) -> String {
        let mut output = String::new();

        for diag in diagnostics {
            let Range { start, end } = diag.range;
            let severity = match diag.severity {
                Severity::Error => "ERROR",
                Severity::Warning => "WARNING",
            };

            output.push_str(&format!(
                "{} {}:{}:{}:{}:{} {} ({})\n",
                severity,
                file_path,
                start.line,
                start.column_one_based(),
                end.line,
                end.column_one_based(),
                diag.message,
                diag.code
            ));
        }

        output
    }
}

fn push_origin(output: &mut String, diag: &Diagnostic) {
    if let Some(origin) = &diag.origin {
        output.push_str(&format!(
            "  generated from {}:{}-{}\n",
            origin.file, origin.start_line, origin.end_line
        ));
    }
}

/// Summary of a check run.
#[derive(Debug, Default)]
pub struct CheckSummary {
    /// Number of files checked.
    pub file_count: usize,
    /// Number of errors.
    pub error_count: usize,
    /// Number of warnings.
    pub warning_count: usize,
    /// Whether to fail on warnings.
    pub fail_on_warnings: bool,
}

impl CheckSummary {
    /// Returns true if the run should exit with a failure status.
    pub fn failed(&self) -> bool {
        self.error_count > 0 || (self.warning_count > 0 && self.fail_on_warnings)
    }

    /// Formats the summary line.
    pub fn format(&self) -> String {
        let error_word = if self.error_count == 1 { "error" } else { "errors" };
        let warning_word = if self.warning_count == 1 { "warning" } else { "warnings" };
        let file_word = if self.file_count == 1 { "file" } else { "files" };

        format!(
            "====================================\njava-frontend found {} {} and {} {} in {} {}",
            self.error_count, error_word, self.warning_count, warning_word, self.file_count, file_word
        )
    }
}
