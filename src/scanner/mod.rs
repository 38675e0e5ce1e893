//! Usage Scanner
//!
//! Discovers which exported identifiers a local Go source tree uses from
//! each external package. The scan is purely syntactic: files are parsed,
//! imports are read per file and qualified references are attributed to
//! the import they name.

pub mod refs;

use crate::golang::loader::find_module_dir;
use crate::golang::{names, GoParser, ImportName};
use crate::models::{AmbiguousReference, PackageUsage, UsageIndex};
use anyhow::{Context, Result};
use ignore::WalkBuilder;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory names never scanned
const SKIPPED_DIRS: &[&str] = &["vendor", "testdata"];

/// What to scan
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Also scan `_test.go` files
    pub include_tests: bool,
    /// Additional directory names to skip
    pub exclude_dirs: Vec<String>,
}

/// Outcome of a scan
#[derive(Debug, Default)]
pub struct ScanResult {
    pub index: UsageIndex,
    /// References left out because their qualifier is shadowed
    pub ambiguous: Vec<AmbiguousReference>,
    /// Number of Go files examined
    pub files: usize,
    /// Module path of the scanned tree, if a `go.mod` was found
    pub module: Option<String>,
}

pub struct UsageScanner {
    parser: GoParser,
    options: ScanOptions,
    generated: Regex,
}

impl UsageScanner {
    pub fn new(options: ScanOptions) -> Result<Self> {
        Ok(Self {
            parser: GoParser::new()?,
            options,
            generated: generated_marker()?,
        })
    }

    /// Scan every Go file under `root`
    pub fn scan(&mut self, root: &Path) -> Result<ScanResult> {
        if !root.is_dir() {
            anyhow::bail!("{} is not a directory", root.display());
        }

        let module = match find_module_dir(root) {
            Some(dir) => {
                let go_mod = dir.join("go.mod");
                let content = fs::read_to_string(&go_mod)
                    .with_context(|| format!("Failed to read {}", go_mod.display()))?;
                module_path(&content)?
            }
            None => None,
        };

        let mut packages: BTreeMap<String, PackageUsage> = BTreeMap::new();
        let mut ambiguous = Vec::new();
        let mut files = 0;

        for path in self.source_files(root)? {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            if is_generated(&self.generated, &content) {
                tracing::debug!(file = %path.display(), "skipping generated file");
                continue;
            }
            files += 1;

            let file = self.parser.parse_file(&path, content)?;
            let imports: HashMap<String, String> = file
                .imports()
                .into_iter()
                .filter(|spec| is_external(&spec.path, module.as_deref()))
                .filter_map(|spec| {
                    if matches!(spec.name, ImportName::Dot) {
                        tracing::warn!(
                            file = %path.display(),
                            line = spec.line,
                            package = %spec.path,
                            "dot import cannot be attributed"
                        );
                    }
                    spec.local_name().map(|name| (name, spec.path))
                })
                .collect();
            if imports.is_empty() {
                continue;
            }

            let found = refs::collect(&file, &imports);
            let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
            for reference in found.references {
                let usage = packages.entry(reference.package).or_default();
                if reference.as_type {
                    usage.types.insert(reference.name);
                } else {
                    usage.values.insert(reference.name);
                }
                usage.dirs.insert(dir.clone());
            }
            ambiguous.extend(found.ambiguous);
        }

        let index = UsageIndex::from_packages(packages);
        tracing::info!(
            files,
            packages = index.len(),
            ambiguous = ambiguous.len(),
            "scan complete"
        );

        Ok(ScanResult {
            index,
            ambiguous,
            files,
            module,
        })
    }

    /// Go files under `root` in sorted order, honoring ignore files
    fn source_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let exclude = self.options.exclude_dirs.clone();
        let walker = WalkBuilder::new(root)
            .standard_filters(true)
            .filter_entry(move |entry| {
                let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
                if !is_dir || entry.depth() == 0 {
                    return true;
                }
                let name = entry.file_name().to_string_lossy();
                let name: &str = &name;
                !(SKIPPED_DIRS.contains(&name)
                    || name.starts_with('_')
                    || name.starts_with('.')
                    || exclude.iter().any(|e| e.as_str() == name))
            })
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() || path.extension().map(|e| e != "go").unwrap_or(true) {
                continue;
            }
            let is_test = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.ends_with("_test.go"))
                .unwrap_or(false);
            if is_test && !self.options.include_tests {
                continue;
            }
            files.push(entry.into_path());
        }
        files.sort();
        Ok(files)
    }
}

/// Module path declared by a `go.mod` file
pub fn module_path(go_mod: &str) -> Result<Option<String>> {
    let re = Regex::new(r#"(?m)^\s*module\s+"?([^\s"]+)"?"#)
        .context("Failed to compile module regex")?;
    Ok(re.captures(go_mod).map(|c| c[1].to_string()))
}

/// Whether an import path names a package outside both the standard library
/// and the local module
pub fn is_external(path: &str, module: Option<&str>) -> bool {
    if names::is_standard_library(path) {
        return false;
    }
    match module {
        Some(module) => !(path == module || path.starts_with(&format!("{}/", module))),
        None => true,
    }
}

/// The standard `// Code generated ... DO NOT EDIT.` marker line
pub fn generated_marker() -> Result<Regex> {
    Regex::new(r"^// Code generated .* DO NOT EDIT\.$").context("Failed to compile marker regex")
}

/// Whether a marker line appears before the package clause
pub fn is_generated(marker: &Regex, content: &str) -> bool {
    content
        .lines()
        .take_while(|line| !line.starts_with("package "))
        .any(|line| marker.is_match(line.trim_end()))
}
