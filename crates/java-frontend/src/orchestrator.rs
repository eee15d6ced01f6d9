//! Main orchestration logic.

use std::collections::HashMap;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};

use camino::{Utf8Path, Utf8PathBuf};
use globset::{Glob, GlobSet, GlobSetBuilder};
use java_analysis::{Cfg, CfgError, WarningMapper};
use java_source_map::{GeneratedFile, SmapFile};
use java_tree::{parse_with_options, Kind, NodeData, ParseOptions, SyntaxTree};
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

use crate::cache::{cache_key, ReportCache};
use crate::cli::{Args, OutputFormat};
use crate::config::{ConfigError, ProjectConfig, Settings};
use crate::output::{CheckSummary, Diagnostic, FormattedDiagnostic, Formatter, Origin, Severity};

/// Orchestration errors.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The workspace directory cannot be used.
    #[error("invalid workspace: {0}")]
    InvalidWorkspace(String),

    /// Invalid glob pattern.
    #[error("invalid glob pattern: {0}")]
    InvalidGlob(String),

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

const DEFAULT_IGNORES: [&str; 4] = ["**/target/**", "**/build/**", "**/.git/**", "**/node_modules/**"];

/// The outcome of analyzing one source file.
#[derive(Debug, Default)]
pub struct Analysis {
    pub diagnostics: Vec<Diagnostic>,
    /// Debug dumps of every method body, when requested.
    pub cfg_dump: Option<String>,
}

/// Runs the check on all files.
pub fn run(args: &Args) -> Result<CheckSummary, OrchestratorError> {
    let workspace = resolve_workspace(&args.workspace)?;

    let project = ProjectConfig::find(&workspace)?;
    let settings = Settings::resolve(args, project.as_ref().map(|(_, config)| config))?;
    let ignore_set = build_ignore_set(&settings.exclude)?;
    let files = discover_files(&workspace, &settings, &ignore_set);
    debug!(workspace = %workspace, files = files.len(), "discovered source files");

    let generated = match &args.smap_dir {
        Some(dir) => load_generated_files(&workspace.join(dir)),
        None => HashMap::new(),
    };
    let cache = args
        .cache_dir
        .as_ref()
        .map(|dir| ReportCache::new(workspace.join(dir)));

    let formatter = Formatter::new(args.output);
    let output_json = args.output == OutputFormat::Json;
    let error_count = AtomicUsize::new(0);
    let warning_count = AtomicUsize::new(0);

    struct FileOutput {
        text: Option<String>,
        json: Vec<FormattedDiagnostic>,
        cfg_dump: Option<String>,
    }

    let outputs: Vec<FileOutput> = files
        .par_iter()
        .filter_map(|file_path| {
            let source = match fs::read_to_string(file_path) {
                Ok(s) => s,
                Err(e) => {
                    warn!("failed to read {}: {}", file_path, e);
                    return None;
                }
            };
            let relative_path = file_path.strip_prefix(&workspace).unwrap_or(file_path);
            let key = cache_key(&source, &settings);

            // CFG dumps need the tree, so they always bypass the cache.
            let cached = match &cache {
                Some(cache) if !args.emit_cfg => cache.read(relative_path, &key),
                _ => None,
            };
            let (mut diagnostics, cfg_dump) = match cached {
                Some(diagnostics) => {
                    trace!(file = %relative_path, "cache hit");
                    (diagnostics, None)
                }
                None => {
                    let analysis = analyze(&source, &settings, args.emit_cfg);
                    if let Some(cache) = &cache {
                        if let Err(e) = cache.write(relative_path, &key, &analysis.diagnostics) {
                            warn!("failed to write cache entry for {}: {}", relative_path, e);
                        }
                    }
                    (analysis.diagnostics, analysis.cfg_dump)
                }
            };

            if let Some(generated) = generated.get(file_path) {
                map_origins(&mut diagnostics, generated);
            }

            for diag in &diagnostics {
                match diag.severity {
                    Severity::Error => error_count.fetch_add(1, Ordering::Relaxed),
                    Severity::Warning => warning_count.fetch_add(1, Ordering::Relaxed),
                };
            }

            let cfg_dump = cfg_dump.map(|dump| format!("=== CFG for {} ===\n{}", relative_path, dump));
            if diagnostics.is_empty() && cfg_dump.is_none() {
                return None;
            }
            Some(FileOutput {
                text: if output_json || diagnostics.is_empty() {
                    None
                } else {
                    Some(formatter.format(&diagnostics, relative_path, &source))
                },
                json: if output_json {
                    Formatter::format_json_diagnostics(&diagnostics, relative_path, &source)
                } else {
                    Vec::new()
                },
                cfg_dump,
            })
        })
        .collect();

    let mut json_output = Vec::new();
    for output in outputs {
        if let Some(dump) = output.cfg_dump {
            eprint!("{}", dump);
        }
        if let Some(text) = output.text {
            print!("{}", text);
        }
        json_output.extend(output.json);
    }

    let summary = CheckSummary {
        file_count: files.len(),
        error_count: error_count.load(Ordering::Relaxed),
        warning_count: warning_count.load(Ordering::Relaxed),
        fail_on_warnings: args.fail_on_warnings,
    };

    if output_json {
        let json = serde_json::to_string_pretty(&json_output).unwrap_or_else(|_| "[]".to_string());
        println!("{}", json);
    } else {
        println!("{}", summary.format());
    }

    Ok(summary)
}

/// Parses one file and collects its parse errors and mapped warnings.
pub fn analyze(source: &str, settings: &Settings, emit_cfg: bool) -> Analysis {
    let options = ParseOptions {
        resolve_bindings: true,
        java_version: settings.java_version,
    };
    let result = parse_with_options(source, options);

    let mut diagnostics: Vec<Diagnostic> = result
        .errors
        .iter()
        .map(|error| Diagnostic {
            severity: Severity::Error,
            code: "parse-error".to_string(),
            message: error.to_string(),
            range: error.range,
            origin: None,
        })
        .collect();

    for warning in WarningMapper::warnings(&result.tree, &result.problems) {
        if warning.syntax_tree().is_none() {
            trace!(message = warning.message(), "dropping unmapped warning");
            continue;
        }
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            code: warning.warning_type().to_string(),
            message: warning.message().to_string(),
            range: warning.range(),
            origin: None,
        });
    }

    Analysis {
        diagnostics,
        cfg_dump: emit_cfg.then(|| render_cfgs(&result.tree)),
    }
}

/// Renders the CFG of every method and constructor body, in source order.
fn render_cfgs(tree: &SyntaxTree) -> String {
    let mut methods: Vec<_> = tree
        .nodes()
        .filter(|(_, node)| matches!(node.kind, Kind::Method | Kind::Constructor))
        .map(|(id, _)| id)
        .collect();
    methods.sort_by_key(|&id| tree.range(id).map(|range| range.start));

    let mut output = String::new();
    for method in methods {
        let name = match tree.data(method) {
            NodeData::Method { name, .. } => tree.name(*name).unwrap_or_default(),
            _ => "",
        };
        match Cfg::build_method(tree, method) {
            Ok(cfg) => output.push_str(&format!("--- {} ---\n{}", name, cfg)),
            Err(CfgError::MissingBody { .. }) => trace!(method = name, "no body"),
            Err(e) => debug!("skipping {}: {}", name, e),
        }
    }
    output
}

/// Attaches template locations to diagnostics of a generated file.
fn map_origins(diagnostics: &mut [Diagnostic], generated: &GeneratedFile) {
    for diag in diagnostics {
        let location = generated.original_location(diag.range.start.line, diag.range.end.line);
        diag.origin = location.map(|location| Origin {
            file: match location.file {
                Some(info) => info.source_path.clone().unwrap_or_else(|| info.source_name.clone()),
                None => format!("#{}", location.file_id),
            },
            start_line: location.start_line,
            end_line: location.end_line,
        });
    }
}

fn resolve_workspace(workspace: &Utf8Path) -> Result<Utf8PathBuf, OrchestratorError> {
    if !workspace.is_relative() {
        return Ok(workspace.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| OrchestratorError::InvalidWorkspace(e.to_string()))?;
    let cwd = Utf8PathBuf::try_from(cwd).map_err(|e| OrchestratorError::InvalidWorkspace(e.to_string()))?;
    Ok(cwd.join(workspace))
}

fn build_ignore_set(patterns: &[String]) -> Result<GlobSet, OrchestratorError> {
    let mut ignore_builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| OrchestratorError::InvalidGlob(e.to_string()))?;
        ignore_builder.add(glob);
    }

    for pattern in DEFAULT_IGNORES {
        if let Ok(glob) = Glob::new(pattern) {
            ignore_builder.add(glob);
        }
    }

    ignore_builder
        .build()
        .map_err(|e| OrchestratorError::InvalidGlob(e.to_string()))
}

fn discover_files(workspace: &Utf8Path, settings: &Settings, ignore_set: &GlobSet) -> Vec<Utf8PathBuf> {
    let extensions = settings.file_extensions();
    WalkDir::new(workspace)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| Utf8PathBuf::try_from(e.into_path()).ok())
        .filter(|p| {
            let file_name = p.file_name().unwrap_or("");
            extensions.iter().any(|ext| file_name.ends_with(ext))
        })
        .filter(|p| {
            let relative = p.strip_prefix(workspace).unwrap_or(p);
            !ignore_set.is_match(relative.as_str())
        })
        .collect()
}

/// Loads every `*.smap` file below `dir`, grouped by generated file.
///
/// Unreadable or malformed maps are skipped with a warning.
fn load_generated_files(dir: &Utf8Path) -> HashMap<Utf8PathBuf, GeneratedFile> {
    let maps = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| Utf8PathBuf::try_from(e.into_path()).ok())
        .filter(|p| p.extension() == Some("smap"))
        .filter_map(|path| match SmapFile::from_path(&path) {
            Ok(smap) => Some(smap),
            Err(e) => {
                warn!("skipping source map {}: {}", path, e);
                None
            }
        });

    GeneratedFile::from_source_maps(maps)
        .into_iter()
        .map(|generated| (generated.path().to_path_buf(), generated))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SOURCE: &str = "import java.util.List;
class A {
    int x;
    void f() {
        x = x;
        if (x > 0) { g(); }
    }
    abstract void g();
}
";

    fn workspace(dir: &tempfile::TempDir) -> Utf8PathBuf {
        Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap()
    }

    #[test]
    fn test_relative_workspace() {
        let resolved = resolve_workspace(Utf8Path::new("project")).unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("project"));
        assert_eq!(resolve_workspace(Utf8Path::new("/abs")).unwrap(), Utf8PathBuf::from("/abs"));
    }

    #[test]
    fn test_analyze_reports_mapped_warnings() {
        let analysis = analyze(SOURCE, &Settings::default(), false);
        let codes: Vec<(&str, Severity)> = analysis
            .diagnostics
            .iter()
            .map(|d| (d.code.as_str(), d.severity))
            .collect();
        assert_eq!(
            codes,
            vec![
                ("assignment-has-no-effect", Severity::Warning),
                ("unused-import", Severity::Warning),
            ]
        );
        assert_eq!(analysis.diagnostics[0].range.start.line, 5);
        assert!(analysis.cfg_dump.is_none());
    }

    #[test]
    fn test_analyze_reports_parse_errors() {
        let analysis = analyze("class A { void f() { int x = ; } }", &Settings::default(), false);
        assert!(!analysis.diagnostics.is_empty());
        assert!(analysis
            .diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error && d.code == "parse-error"));
    }

    #[test]
    fn test_cfg_dump_skips_bodiless_methods() {
        let analysis = analyze(SOURCE, &Settings::default(), true);
        let dump = analysis.cfg_dump.unwrap();
        assert!(dump.starts_with("--- f ---\nStarts at B"), "{dump}");
        assert!(!dump.contains("--- g ---"), "{dump}");
        assert!(dump.contains("B0 (Exit):"), "{dump}");
    }

    #[test]
    fn test_discovery_honors_extensions_and_ignores() {
        let dir = tempfile::tempdir().unwrap();
        let root = workspace(&dir);
        for path in ["src/A.java", "src/B.txt", "target/C.java", "gen/D.java"] {
            let path = root.join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "class X {}").unwrap();
        }

        let settings = Settings::default();
        let ignore_set = build_ignore_set(&["gen/**".to_string()]).unwrap();
        let files: Vec<String> = discover_files(&root, &settings, &ignore_set)
            .iter()
            .map(|p| p.strip_prefix(&root).unwrap().to_string())
            .collect();
        assert_eq!(files, vec!["src/A.java"]);
    }

    #[test]
    fn test_invalid_glob() {
        let error = build_ignore_set(&["a[".to_string()]).unwrap_err();
        assert!(matches!(error, OrchestratorError::InvalidGlob(_)));
    }

    #[test]
    fn test_generated_files_get_origins() {
        let dir = tempfile::tempdir().unwrap();
        let root = workspace(&dir);
        fs::write(
            root.join("index_jsp.java.smap"),
            "SMAP\nindex_jsp.java\nJSP\n*S JSP\n*F\n+ 0 index.jsp\nWEB-INF/index.jsp\n*L\n1,3:5\n*E\n",
        )
        .unwrap();
        fs::write(root.join("broken.smap"), "not a map").unwrap();

        let generated = load_generated_files(&root);
        assert_eq!(generated.len(), 1);
        let file = &generated[&root.join("index_jsp.java")];

        let mut diagnostics = analyze(SOURCE, &Settings::default(), false).diagnostics;
        map_origins(&mut diagnostics, file);
        assert_eq!(
            diagnostics[0].origin,
            Some(Origin {
                file: "WEB-INF/index.jsp".to_string(),
                start_line: 1,
                end_line: 1,
            })
        );
        // line 1 is not produced by the template
        assert_eq!(diagnostics[1].origin, None);
    }
}
