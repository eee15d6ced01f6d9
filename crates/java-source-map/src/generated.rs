//! Generated Java files and the source maps pointing back to their templates.

use std::collections::BTreeMap;

use camino::{Utf8Path, Utf8PathBuf};

use crate::smap::{SmapFile, SourceLocation};

/// A Java file produced from a template (e.g. a JSP page).
#[derive(Debug, Clone)]
pub struct GeneratedFile {
    path: Utf8PathBuf,
    source_maps: Vec<SmapFile>,
}

impl GeneratedFile {
    /// Creates a generated file with no source maps attached yet.
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            source_maps: Vec::new(),
        }
    }

    /// Groups source maps by the generated file they describe.
    pub fn from_source_maps(source_maps: impl IntoIterator<Item = SmapFile>) -> Vec<GeneratedFile> {
        let mut by_path: BTreeMap<Utf8PathBuf, GeneratedFile> = BTreeMap::new();
        for smap in source_maps {
            by_path
                .entry(smap.generated_file().to_path_buf())
                .or_insert_with_key(|path| GeneratedFile::new(path.clone()))
                .add_source_map(smap);
        }
        by_path.into_values().collect()
    }

    /// Returns the path of the generated file.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Attaches a source map.
    pub fn add_source_map(&mut self, smap: SmapFile) {
        self.source_maps.push(smap);
    }

    /// Returns the attached source maps.
    pub fn source_maps(&self) -> &[SmapFile] {
        &self.source_maps
    }

    /// Maps a range of generated lines to the template, using the first
    /// source map that covers both ends.
    pub fn original_location(&self, start_line: u32, end_line: u32) -> Option<SourceLocation<'_>> {
        self.source_maps
            .iter()
            .find_map(|smap| smap.get_location(start_line, end_line))
    }
}
