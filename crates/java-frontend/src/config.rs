//! Configuration loading.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use java_tree::JavaVersion;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::cli::Args;

/// Name of the optional project file at the workspace root.
pub const CONFIG_FILE: &str = "java-frontend.json";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The project file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: Utf8PathBuf,
        source: std::io::Error,
    },

    /// The project file is not valid JSON.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: Utf8PathBuf,
        source: serde_json::Error,
    },

    /// The Java version in the project file is malformed.
    #[error("{0}")]
    InvalidJavaVersion(String),
}

/// Contents of `java-frontend.json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    /// Language level, as a number (`17`) or a string (`"1.8"`).
    #[serde(default)]
    pub java_version: Option<VersionValue>,

    /// Classpath entries.
    #[serde(default)]
    pub classpath: Vec<String>,

    /// Glob patterns to exclude.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// File extensions to process.
    #[serde(default)]
    pub extensions: Vec<String>,
}

/// A Java version as written in the project file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum VersionValue {
    Number(u32),
    Text(String),
}

impl VersionValue {
    fn resolve(&self) -> Result<JavaVersion, ConfigError> {
        match self {
            VersionValue::Number(n) => Ok(JavaVersion(*n)),
            VersionValue::Text(text) => text.parse().map_err(ConfigError::InvalidJavaVersion),
        }
    }
}

impl ProjectConfig {
    /// Loads a project file, tolerating `//` and `/* */` comments.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let content = remove_json_comments(&content);
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Finds and loads the project file of a workspace, if there is one.
    pub fn find(project_root: &Utf8Path) -> Result<Option<(Utf8PathBuf, Self)>, ConfigError> {
        let path = project_root.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let config = Self::load(&path)?;
        debug!(path = %path, "loaded project configuration");
        Ok(Some((path, config)))
    }
}

/// Effective settings of a run: the project file overridden by CLI flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub java_version: JavaVersion,
    pub classpath: Vec<String>,
    pub exclude: Vec<String>,
    pub extensions: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            java_version: JavaVersion::DEFAULT,
            classpath: Vec::new(),
            exclude: Vec::new(),
            extensions: Vec::new(),
        }
    }
}

impl Settings {
    /// Merges CLI arguments over the project file.
    ///
    /// A CLI Java version or classpath replaces the file's; `--ignore`
    /// patterns are added to the file's `exclude` list.
    pub fn resolve(args: &Args, project: Option<&ProjectConfig>) -> Result<Self, ConfigError> {
        let project = project.cloned().unwrap_or_default();
        let java_version = match (args.java_version, &project.java_version) {
            (Some(version), _) => version,
            (None, Some(value)) => value.resolve()?,
            (None, None) => JavaVersion::DEFAULT,
        };
        let classpath = if args.classpath.is_empty() {
            project.classpath
        } else {
            args.classpath.clone()
        };
        let mut exclude = project.exclude;
        exclude.extend(args.ignore.iter().cloned());

        Ok(Self {
            java_version,
            classpath,
            exclude,
            extensions: project.extensions,
        })
    }

    /// Returns the file extensions to process.
    pub fn file_extensions(&self) -> Vec<&str> {
        if self.extensions.is_empty() {
            vec![".java"]
        } else {
            self.extensions.iter().map(|s| s.as_str()).collect()
        }
    }
}

/// Removes single-line and multi-line comments from JSON.
fn remove_json_comments(json: &str) -> String {
    let mut result = String::with_capacity(json.len());
    let mut chars = json.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            result.push(c);
            if c == '"' {
                in_string = false;
            } else if c == '\\' {
                if let Some(next) = chars.next() {
                    result.push(next);
                }
            }
        } else if c == '"' {
            result.push(c);
            in_string = true;
        } else if c == '/' {
            match chars.peek() {
                Some('/') => {
                    chars.next();
                    while let Some(&next) = chars.peek() {
                        if next == '\n' {
                            break;
                        }
                        chars.next();
                    }
                }
                Some('*') => {
                    chars.next();
                    while let Some(next) = chars.next() {
                        if next == '*' && chars.peek() == Some(&'/') {
                            chars.next();
                            break;
                        }
                    }
                }
                _ => result.push(c),
            }
        } else {
            result.push(c);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    fn write_config(dir: &tempfile::TempDir, content: &str) -> Utf8PathBuf {
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        fs::write(root.join(CONFIG_FILE), content).unwrap();
        root
    }

    #[test]
    fn test_remove_comments() {
        let json = r#"{
            // comment
            "classpath": ["lib/*.jar"], /* inline */
            "url": "http://example.com"
        }"#;

        let cleaned = remove_json_comments(json);
        assert!(!cleaned.contains("// comment"));
        assert!(!cleaned.contains("/* inline */"));
        assert!(cleaned.contains("\"lib/*.jar\""));
        assert!(cleaned.contains("\"http://example.com\""));
    }

    #[test]
    fn test_load_project_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = write_config(
            &dir,
            r#"{
                // language level
                "javaVersion": "1.8",
                "classpath": ["lib/a.jar"],
                "exclude": ["**/generated/**"],
                "extensions": [".java", ".jav"]
            }"#,
        );

        let (path, config) = ProjectConfig::find(&root).unwrap().unwrap();
        assert_eq!(path, root.join(CONFIG_FILE));
        assert_eq!(config.java_version, Some(VersionValue::Text("1.8".to_string())));
        assert_eq!(config.classpath, vec!["lib/a.jar"]);
        assert_eq!(config.exclude, vec!["**/generated/**"]);
        assert_eq!(config.extensions, vec![".java", ".jav"]);
    }

    #[test]
    fn test_missing_project_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        assert!(ProjectConfig::find(&root).unwrap().is_none());
    }

    #[test]
    fn test_malformed_project_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = write_config(&dir, "{ \"classpath\": ");
        let error = ProjectConfig::find(&root).unwrap_err();
        assert!(matches!(error, ConfigError::Parse { .. }), "{error}");
    }

    #[test]
    fn test_cli_overrides_project_file() {
        let project = ProjectConfig {
            java_version: Some(VersionValue::Number(11)),
            classpath: vec!["from-file.jar".to_string()],
            exclude: vec!["**/gen/**".to_string()],
            extensions: Vec::new(),
        };

        let args = Args::parse_from(["java-frontend"]);
        let settings = Settings::resolve(&args, Some(&project)).unwrap();
        assert_eq!(settings.java_version, JavaVersion(11));
        assert_eq!(settings.classpath, vec!["from-file.jar"]);

        let args = Args::parse_from([
            "java-frontend",
            "--java-version",
            "21",
            "--classpath",
            "cli.jar",
            "--ignore",
            "**/tmp/**",
        ]);
        let settings = Settings::resolve(&args, Some(&project)).unwrap();
        assert_eq!(settings.java_version, JavaVersion(21));
        assert_eq!(settings.classpath, vec!["cli.jar"]);
        assert_eq!(settings.exclude, vec!["**/gen/**", "**/tmp/**"]);
    }

    #[test]
    fn test_invalid_version_in_file() {
        let project = ProjectConfig {
            java_version: Some(VersionValue::Text("latest".to_string())),
            ..ProjectConfig::default()
        };
        let args = Args::parse_from(["java-frontend"]);
        let error = Settings::resolve(&args, Some(&project)).unwrap_err();
        assert_eq!(error.to_string(), "invalid Java version `latest`");
    }

    #[test]
    fn test_default_extensions() {
        let settings = Settings::default();
        assert_eq!(settings.file_extensions(), vec![".java"]);
        assert_eq!(settings.java_version, JavaVersion::DEFAULT);
    }
}
