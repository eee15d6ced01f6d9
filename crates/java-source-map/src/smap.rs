//! JSR-045 source map (SMAP) decoding for JSP-generated Java files.
//!
//! Only the `JSP` stratum is accepted:
//!
//! ```text
//! SMAP
//! index_jsp.java
//! JSP
//! *S JSP
//! *F
//! + 0 index.jsp
//! WEB-INF/jsp/index.jsp
//! *L
//! 1,5:116,0
//! *E
//! ```

use std::collections::BTreeMap;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

const STRATUM_SECTION: &str = "*S JSP";
const FILE_SECTION: &str = "*F";
const LINE_SECTION: &str = "*L";
const END_SECTION: &str = "*E";

/// Fatal errors raised while reading a source map.
#[derive(Debug, Error)]
pub enum SmapError {
    /// The text does not start with the `SMAP` header.
    #[error("Not a source map")]
    NotASourceMap,

    /// The default stratum is not `JSP`.
    #[error("Not a JSP source map")]
    NotJspSourceMap,

    /// A mandatory section header is missing.
    #[error("Section {0} not found")]
    SectionNotFound(&'static str),

    /// The source map file could not be read.
    #[error("failed to read source map {path}: {source}")]
    Io {
        /// The file that failed to load.
        path: Utf8PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// An entry of the `*F` section.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FileInfo {
    /// The id referenced by line entries.
    pub file_id: u32,
    /// The short source name (`index.jsp`).
    pub source_name: String,
    /// The path given on the line following a `+` entry.
    pub source_path: Option<String>,
}

/// An entry of the `*L` section.
///
/// Maps output lines `output_start_line + i * output_line_increment` (for
/// `i` in `0..repeat_count`) back to input line `input_start_line + i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LineInfo {
    /// First input (template) line.
    pub input_start_line: u32,
    /// Id of the input file in the `*F` section.
    pub line_file_id: u32,
    /// Number of consecutive input lines covered.
    pub repeat_count: u32,
    /// First output (generated) line.
    pub output_start_line: u32,
    /// Number of output lines produced per input line.
    pub output_line_increment: u32,
}

impl LineInfo {
    /// Returns the input line that produced `output_line`, if this entry covers it.
    ///
    /// Input lines beyond `u32::MAX` are not covered.
    pub fn input_line(&self, output_line: u32) -> Option<u32> {
        if self.repeat_count == 0 || output_line < self.output_start_line {
            return None;
        }
        let delta = output_line - self.output_start_line;
        if self.output_line_increment == 0 {
            return (delta == 0).then_some(self.input_start_line);
        }
        let index = delta / self.output_line_increment;
        if index >= self.repeat_count {
            return None;
        }
        self.input_start_line.checked_add(index)
    }

    /// Parses `inputStartLine[#lineFileId][,repeatCount]:outputStartLine[,outputLineIncrement]`.
    fn parse(line: &str, last_file_id: u32) -> Option<LineInfo> {
        let (input, output) = line.split_once(':')?;

        let (input, repeat_count) = match input.split_once(',') {
            Some((input, repeat)) => (input, number(repeat)?),
            None => (input, 1),
        };
        let (input_start_line, line_file_id) = match input.split_once('#') {
            Some((start, file_id)) => (number(start)?, number(file_id)?),
            None => (number(input)?, last_file_id),
        };
        let (output_start_line, output_line_increment) = match output.split_once(',') {
            Some((start, increment)) => (number(start)?, number(increment)?),
            None => (number(output)?, 1),
        };

        Some(LineInfo {
            input_start_line,
            line_file_id,
            repeat_count,
            output_start_line,
            output_line_increment,
        })
    }
}

/// A location in the original template, resolved from generated lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation<'a> {
    /// The file the start line belongs to.
    pub file_id: u32,
    /// The `*F` entry for `file_id`, if declared.
    pub file: Option<&'a FileInfo>,
    /// First template line.
    pub start_line: u32,
    /// Last template line.
    pub end_line: u32,
}

/// A decoded source map.
#[derive(Debug, Clone)]
pub struct SmapFile {
    generated_file: Utf8PathBuf,
    file_section: BTreeMap<u32, FileInfo>,
    line_section: Vec<LineInfo>,
}

impl SmapFile {
    /// Reads a source map from disk.
    ///
    /// The generated file is resolved against the directory containing the map.
    pub fn from_path(path: &Utf8Path) -> Result<Self, SmapError> {
        let text = fs::read_to_string(path).map_err(|source| SmapError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let root_dir = path.parent().unwrap_or_else(|| Utf8Path::new(""));
        Self::parse(root_dir, &text)
    }

    /// Parses source map text. The generated file name is resolved against `root_dir`.
    pub fn parse(root_dir: &Utf8Path, text: &str) -> Result<Self, SmapError> {
        let mut lines = text.lines().map(str::trim_end);

        if lines.next() != Some("SMAP") {
            return Err(SmapError::NotASourceMap);
        }
        let generated_name = lines.next().ok_or(SmapError::NotASourceMap)?;
        if lines.next() != Some("JSP") {
            return Err(SmapError::NotJspSourceMap);
        }
        if lines.next() != Some(STRATUM_SECTION) {
            return Err(SmapError::SectionNotFound(STRATUM_SECTION));
        }
        if lines.next() != Some(FILE_SECTION) {
            return Err(SmapError::SectionNotFound(FILE_SECTION));
        }

        let mut file_section = BTreeMap::new();
        let mut next_section = None;
        while let Some(line) = lines.next() {
            if line.starts_with('*') {
                next_section = Some(line);
                break;
            }
            if line.trim().is_empty() {
                continue;
            }
            let source_path = if line.starts_with('+') {
                lines.next().map(|path| path.trim().to_string())
            } else {
                None
            };
            let implicit_id = file_section.len() as u32;
            match parse_file_info(line, implicit_id, source_path) {
                Some(info) => {
                    file_section.insert(info.file_id, info);
                }
                None => warn!("Invalid file info `{}`", line),
            }
        }
        if next_section != Some(LINE_SECTION) {
            return Err(SmapError::SectionNotFound(LINE_SECTION));
        }

        let mut line_section = Vec::new();
        let mut last_file_id = 0;
        for line in lines {
            if line == END_SECTION || line.starts_with('*') {
                break;
            }
            if line.trim().is_empty() {
                continue;
            }
            match LineInfo::parse(line.trim(), last_file_id) {
                Some(info) => {
                    last_file_id = info.line_file_id;
                    line_section.push(info);
                }
                None => warn!("Invalid line info `{}`", line),
            }
        }

        debug!(
            generated = generated_name,
            files = file_section.len(),
            lines = line_section.len(),
            "decoded source map"
        );

        Ok(Self {
            generated_file: root_dir.join(generated_name),
            file_section,
            line_section,
        })
    }

    /// Returns the path of the generated Java file.
    pub fn generated_file(&self) -> &Utf8Path {
        &self.generated_file
    }

    /// Returns the `*F` entries keyed by file id.
    pub fn file_section(&self) -> &BTreeMap<u32, FileInfo> {
        &self.file_section
    }

    /// Returns the `*L` entries in declaration order.
    pub fn line_section(&self) -> &[LineInfo] {
        &self.line_section
    }

    /// Maps generated lines `output_start_line..=output_end_line` back to the template.
    ///
    /// Both boundaries must be covered by a line entry; there is no partial
    /// mapping. The file of the result is the one of the start line.
    pub fn get_location(&self, output_start_line: u32, output_end_line: u32) -> Option<SourceLocation<'_>> {
        let (start_info, start_line) = self.input_line(output_start_line)?;
        let (_, end_line) = self.input_line(output_end_line)?;

        Some(SourceLocation {
            file_id: start_info.line_file_id,
            file: self.file_section.get(&start_info.line_file_id),
            start_line,
            end_line,
        })
    }

    fn input_line(&self, output_line: u32) -> Option<(&LineInfo, u32)> {
        self.line_section
            .iter()
            .find_map(|info| info.input_line(output_line).map(|line| (info, line)))
    }
}

/// Parses `[+ ]fileId fileName`; a bare `fileName` gets the next sequential id.
fn parse_file_info(line: &str, implicit_id: u32, source_path: Option<String>) -> Option<FileInfo> {
    let entry = line.strip_prefix('+').unwrap_or(line).trim();
    let (first, rest) = match entry.split_once(char::is_whitespace) {
        Some((first, rest)) => (first, rest.trim()),
        None => (entry, ""),
    };

    let (file_id, source_name) = match number(first) {
        Some(id) if !rest.is_empty() => (id, rest),
        Some(_) => return None,
        None if line.starts_with('+') => return None,
        None => (implicit_id, entry),
    };

    Some(FileInfo {
        file_id,
        source_name: source_name.to_string(),
        source_path,
    })
}

fn number(text: &str) -> Option<u32> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}
