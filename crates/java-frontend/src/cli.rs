//! CLI argument parsing.

use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum};
use java_tree::JavaVersion;

/// Parses Java sources, reports compiler-style warnings and dumps control-flow graphs.
#[derive(Debug, Parser)]
#[command(name = "java-frontend")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Working directory for the check
    #[arg(long, default_value = ".")]
    pub workspace: Utf8PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value = "human")]
    pub output: OutputFormat,

    /// Java language level (e.g. 17 or 1.8)
    #[arg(long = "java-version")]
    pub java_version: Option<JavaVersion>,

    /// Classpath entries, separated by `:` or given repeatedly
    #[arg(long, value_delimiter = ':')]
    pub classpath: Vec<String>,

    /// Glob patterns to ignore
    #[arg(long)]
    pub ignore: Vec<String>,

    /// Print the control-flow graph of every method body
    #[arg(long = "emit-cfg")]
    pub emit_cfg: bool,

    /// Directory searched for `*.smap` files of generated sources
    #[arg(long = "smap-dir")]
    pub smap_dir: Option<Utf8PathBuf>,

    /// Directory holding cached per-file reports
    #[arg(long = "cache-dir")]
    pub cache_dir: Option<Utf8PathBuf>,

    /// Exit with error on warnings
    #[arg(long = "fail-on-warnings")]
    pub fail_on_warnings: bool,
}

/// Output format options.
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    #[default]
    Human,
    /// Human-readable with code snippets
    HumanVerbose,
    /// JSON output
    Json,
    /// Machine-readable (one line per diagnostic)
    Machine,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_args() {
        let args = Args::parse_from(["java-frontend"]);
        assert_eq!(args.workspace.as_str(), ".");
        assert_eq!(args.output, OutputFormat::Human);
        assert_eq!(args.java_version, None);
        assert!(args.classpath.is_empty());
        assert!(!args.emit_cfg);
        assert!(!args.fail_on_warnings);
    }

    #[test]
    fn test_custom_workspace() {
        let args = Args::parse_from(["java-frontend", "--workspace", "/path/to/project"]);
        assert_eq!(args.workspace.as_str(), "/path/to/project");
    }

    #[test]
    fn test_output_formats() {
        let args = Args::parse_from(["java-frontend", "--output", "json"]);
        assert_eq!(args.output, OutputFormat::Json);

        let args = Args::parse_from(["java-frontend", "--output", "human-verbose"]);
        assert_eq!(args.output, OutputFormat::HumanVerbose);
    }

    #[test]
    fn test_java_version_spellings() {
        let args = Args::parse_from(["java-frontend", "--java-version", "1.8"]);
        assert_eq!(args.java_version, Some(JavaVersion(8)));

        let args = Args::parse_from(["java-frontend", "--java-version", "21"]);
        assert_eq!(args.java_version, Some(JavaVersion(21)));

        assert!(Args::try_parse_from(["java-frontend", "--java-version", "next"]).is_err());
    }

    #[test]
    fn test_classpath_entries() {
        let args = Args::parse_from([
            "java-frontend",
            "--classpath",
            "lib/a.jar:lib/b.jar",
            "--classpath",
            "classes",
        ]);
        assert_eq!(args.classpath, vec!["lib/a.jar", "lib/b.jar", "classes"]);
    }
}
