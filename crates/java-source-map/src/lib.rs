//! Source positions and source-map decoding for java-frontend.
//!
//! This crate converts byte offsets to line/column positions (honoring
//! `\n`, `\r` and `\r\n` terminators) and decodes JSR-045 source maps so that
//! locations in JSP-generated Java files can be reported against the
//! original templates.

mod generated;
mod line_index;
mod position;
mod smap;
mod span;

pub use generated::GeneratedFile;
pub use line_index::LineIndex;
pub use position::{Position, Range};
pub use smap::{FileInfo, LineInfo, SmapError, SmapFile, SourceLocation};
pub use span::{ByteOffset, Span};
