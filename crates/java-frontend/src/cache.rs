//! On-disk cache of per-file reports.
//!
//! An entry is keyed by the file's workspace-relative path and stores the
//! fingerprint it was computed for. A fingerprint mismatch or an unreadable
//! entry is a miss.

use std::fs;
use std::io;

use blake3::Hasher;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::Settings;
use crate::output::Diagnostic;

/// Computes the fingerprint of a file under the given settings.
///
/// Covers the content, the Java version and the classpath. Classpath
/// entries are sorted first so their order does not matter.
pub fn cache_key(content: &str, settings: &Settings) -> String {
    let mut hasher = Hasher::new();
    hasher.update(content.as_bytes());
    hasher.update(&[0]);
    hasher.update(settings.java_version.to_string().as_bytes());
    hasher.update(&[0]);

    let mut classpath: Vec<&str> = settings.classpath.iter().map(String::as_str).collect();
    classpath.sort_unstable();
    for entry in classpath {
        hasher.update(entry.as_bytes());
        hasher.update(&[0]);
    }

    hasher.finalize().to_hex().to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    key: String,
    diagnostics: Vec<Diagnostic>,
}

/// A directory of cached reports.
#[derive(Debug, Clone)]
pub struct ReportCache {
    dir: Utf8PathBuf,
}

impl ReportCache {
    pub fn new(dir: impl Into<Utf8PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn entry_path(&self, relative_path: &Utf8Path) -> Utf8PathBuf {
        let name = blake3::hash(relative_path.as_str().as_bytes()).to_hex();
        self.dir.join(format!("{name}.json"))
    }

    /// Returns the cached diagnostics of a file if they were computed for `key`.
    pub fn read(&self, relative_path: &Utf8Path, key: &str) -> Option<Vec<Diagnostic>> {
        let path = self.entry_path(relative_path);
        let content = fs::read_to_string(&path).ok()?;
        let entry: CacheEntry = match serde_json::from_str(&content) {
            Ok(entry) => entry,
            Err(e) => {
                debug!(path = %path, error = %e, "unreadable cache entry");
                return None;
            }
        };
        if entry.key != key {
            trace!(file = %relative_path, "stale cache entry");
            return None;
        }
        Some(entry.diagnostics)
    }

    /// Stores the diagnostics of a file under `key`.
    pub fn write(&self, relative_path: &Utf8Path, key: &str, diagnostics: &[Diagnostic]) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let entry = CacheEntry {
            key: key.to_string(),
            diagnostics: diagnostics.to_vec(),
        };
        let json = serde_json::to_string(&entry)?;
        fs::write(self.entry_path(relative_path), json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Severity;
    use java_source_map::{Position, Range};
    use java_tree::JavaVersion;
    use pretty_assertions::assert_eq;

    fn settings(classpath: &[&str]) -> Settings {
        Settings {
            classpath: classpath.iter().map(|s| s.to_string()).collect(),
            ..Settings::default()
        }
    }

    fn diagnostic() -> Diagnostic {
        Diagnostic {
            severity: Severity::Warning,
            code: "redundant-cast".to_string(),
            message: "Unnecessary cast from int to int".to_string(),
            range: Range::new(Position::new(3, 4), Position::new(3, 13)),
            origin: None,
        }
    }

    #[test]
    fn test_key_is_stable_hex() {
        let key = cache_key("class A {}", &settings(&[]));
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(key, cache_key("class A {}", &settings(&[])));
    }

    #[test]
    fn test_key_covers_content_version_and_classpath() {
        let base = cache_key("class A {}", &settings(&["a.jar"]));
        assert_ne!(base, cache_key("class B {}", &settings(&["a.jar"])));
        assert_ne!(base, cache_key("class A {}", &settings(&["b.jar"])));

        let newer = Settings {
            java_version: JavaVersion(21),
            ..settings(&["a.jar"])
        };
        assert_ne!(base, cache_key("class A {}", &newer));
    }

    #[test]
    fn test_classpath_order_does_not_matter() {
        assert_eq!(
            cache_key("class A {}", &settings(&["a.jar", "b.jar"])),
            cache_key("class A {}", &settings(&["b.jar", "a.jar"]))
        );
    }

    #[test]
    fn test_hit_and_stale_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ReportCache::new(Utf8PathBuf::try_from(dir.path().join("cache")).unwrap());
        let file = Utf8Path::new("src/A.java");

        assert_eq!(cache.read(file, "k1"), None);
        cache.write(file, "k1", &[diagnostic()]).unwrap();
        assert_eq!(cache.read(file, "k1"), Some(vec![diagnostic()]));
        assert_eq!(cache.read(file, "k2"), None);
        assert_eq!(cache.read(Utf8Path::new("src/B.java"), "k1"), None);
    }

    #[test]
    fn test_corrupt_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ReportCache::new(Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap());
        let file = Utf8Path::new("A.java");
        cache.write(file, "k", &[]).unwrap();
        fs::write(cache.entry_path(file), "{ not json").unwrap();
        assert_eq!(cache.read(file, "k"), None);
    }
}
