//! Package Loaders
//!
//! A loader turns an import path into the list of source files that make up
//! the package. The default loader asks the Go toolchain (`go list`), so
//! build constraints, module resolution and GOROOT are handled exactly as
//! the consumer's build would handle them.

use crate::models::{StubError, StubResult};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// A located package, before parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedPackage {
    pub import_path: String,
    /// Package clause name when the loader knows it
    pub name: Option<String>,
    pub dir: PathBuf,
    /// Root of the module that contains the package, if any
    pub module_dir: Option<PathBuf>,
    /// Source files in a stable order
    pub files: Vec<PathBuf>,
}

/// Common interface for package loaders
///
/// Loading is a single synchronous call with no retry: a failure aborts
/// generation for the package.
pub trait PackageLoader {
    /// Locate the package with the given import path
    ///
    /// # Errors
    /// Returns `StubError::Resolution` if the package cannot be found or has
    /// no Go files.
    fn load(&self, import_path: &str) -> StubResult<LoadedPackage>;

    /// Get the name of this loader for display purposes
    fn name(&self) -> &'static str;
}

/// `go list -json` output, restricted to the fields we use
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GoListPackage {
    #[serde(default)]
    import_path: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    dir: PathBuf,
    #[serde(default)]
    go_files: Vec<String>,
    #[serde(default)]
    cgo_files: Vec<String>,
    module: Option<GoListModule>,
    error: Option<GoListError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GoListModule {
    dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GoListError {
    err: String,
}

/// Loads packages through the Go toolchain
#[derive(Debug, Clone)]
pub struct GoListLoader {
    go_command: String,
    work_dir: Option<PathBuf>,
}

impl GoListLoader {
    pub fn new(go_command: impl Into<String>) -> Self {
        Self {
            go_command: go_command.into(),
            work_dir: None,
        }
    }

    /// Run `go list` from this directory (module context)
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    fn parse_output(import_path: &str, stdout: &[u8]) -> StubResult<LoadedPackage> {
        let listed: GoListPackage = serde_json::from_slice(stdout).map_err(|e| {
            StubError::resolution(import_path, format!("unreadable go list output: {}", e))
        })?;

        if let Some(err) = listed.error {
            return Err(StubError::resolution(import_path, err.err.trim()));
        }

        let mut files: Vec<PathBuf> = listed
            .go_files
            .iter()
            .chain(listed.cgo_files.iter())
            .map(|f| listed.dir.join(f))
            .collect();
        files.sort();
        files.dedup();

        if files.is_empty() {
            return Err(StubError::resolution(import_path, "no Go source files"));
        }

        Ok(LoadedPackage {
            import_path: if listed.import_path.is_empty() {
                import_path.to_string()
            } else {
                listed.import_path
            },
            name: (!listed.name.is_empty()).then_some(listed.name),
            dir: listed.dir,
            module_dir: listed.module.and_then(|m| m.dir),
            files,
        })
    }
}

impl Default for GoListLoader {
    fn default() -> Self {
        Self::new("go")
    }
}

impl PackageLoader for GoListLoader {
    fn load(&self, import_path: &str) -> StubResult<LoadedPackage> {
        let mut command = Command::new(&self.go_command);
        command.args(["list", "-e", "-json", import_path]);
        if let Some(dir) = &self.work_dir {
            command.current_dir(dir);
        }

        tracing::debug!(package = import_path, command = %self.go_command, "running go list");

        let output = command.output().map_err(|e| {
            StubError::resolution(
                import_path,
                format!("failed to run `{} list`: {}", self.go_command, e),
            )
        })?;

        if !output.status.success() && output.stdout.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(StubError::resolution(import_path, stderr.trim()));
        }

        Self::parse_output(import_path, &output.stdout)
    }

    fn name(&self) -> &'static str {
        "go-list"
    }
}

/// Loads packages from plain directories
///
/// Import paths are mapped to directories explicitly; anything unmapped goes
/// to the fallback loader when one is configured.
#[derive(Default)]
pub struct DirectoryLoader {
    packages: BTreeMap<String, PathBuf>,
    fallback: Option<Box<dyn PackageLoader>>,
}

impl DirectoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `import_path` from `dir`
    pub fn with_package(mut self, import_path: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        self.packages.insert(import_path.into(), dir.into());
        self
    }

    pub fn with_fallback(mut self, fallback: Box<dyn PackageLoader>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    fn list_dir(import_path: &str, dir: &Path) -> StubResult<LoadedPackage> {
        let entries = fs::read_dir(dir).map_err(|e| {
            StubError::resolution(import_path, format!("cannot read {}: {}", dir.display(), e))
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| StubError::resolution(import_path, e.to_string()))?
                .path();
            let is_source = path.is_file()
                && path.extension().map(|e| e == "go").unwrap_or(false)
                && !path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.ends_with("_test.go"))
                    .unwrap_or(true);
            if is_source && !is_ignored_by_build_tag(&path) {
                files.push(path);
            }
        }
        files.sort();

        if files.is_empty() {
            return Err(StubError::resolution(
                import_path,
                format!("no Go source files in {}", dir.display()),
            ));
        }

        Ok(LoadedPackage {
            import_path: import_path.to_string(),
            name: None,
            dir: dir.to_path_buf(),
            module_dir: find_module_dir(dir),
            files,
        })
    }
}

impl PackageLoader for DirectoryLoader {
    fn load(&self, import_path: &str) -> StubResult<LoadedPackage> {
        match (self.packages.get(import_path), &self.fallback) {
            (Some(dir), _) => Self::list_dir(import_path, dir),
            (None, Some(fallback)) => fallback.load(import_path),
            (None, None) => Err(StubError::resolution(
                import_path,
                "package is not mapped to a directory",
            )),
        }
    }

    fn name(&self) -> &'static str {
        "directory"
    }
}

/// Files excluded from every build with `//go:build ignore`
fn is_ignored_by_build_tag(path: &Path) -> bool {
    let Ok(content) = fs::read_to_string(path) else {
        return false;
    };
    content
        .lines()
        .take_while(|l| !l.trim_start().starts_with("package "))
        .any(|l| {
            let l = l.trim();
            l == "//go:build ignore" || l == "// +build ignore"
        })
}

/// Nearest ancestor directory holding a `go.mod`
pub fn find_module_dir(dir: &Path) -> Option<PathBuf> {
    dir.ancestors()
        .find(|d| d.join("go.mod").is_file())
        .map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_go_list_output() {
        let json = br#"{
            "Dir": "/go/pkg/mod/github.com/!masterminds/squirrel@v1.5.4",
            "ImportPath": "github.com/Masterminds/squirrel",
            "Name": "squirrel",
            "GoFiles": ["where.go", "expr.go"],
            "Module": {"Path": "github.com/Masterminds/squirrel", "Dir": "/go/pkg/mod/github.com/!masterminds/squirrel@v1.5.4"}
        }"#;

        let pkg = GoListLoader::parse_output("github.com/Masterminds/squirrel", json).unwrap();
        assert_eq!(pkg.name.as_deref(), Some("squirrel"));
        assert_eq!(pkg.files.len(), 2);
        assert!(pkg.files[0].ends_with("expr.go"));
        assert!(pkg.module_dir.is_some());
    }

    #[test]
    fn test_parse_go_list_error() {
        let json = br#"{
            "ImportPath": "example.com/missing",
            "Error": {"Err": "cannot find module providing package example.com/missing"}
        }"#;

        let err = GoListLoader::parse_output("example.com/missing", json).unwrap_err();
        assert!(matches!(err, StubError::Resolution { .. }));
        assert!(err.to_string().contains("cannot find module"));
    }

    #[test]
    fn test_directory_loader_filters_files() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        fs::write(dir.join("a.go"), "package p\n").unwrap();
        fs::write(dir.join("a_test.go"), "package p\n").unwrap();
        fs::write(dir.join("gen.go"), "//go:build ignore\n\npackage main\n").unwrap();
        fs::write(dir.join("README.md"), "# p\n").unwrap();

        let loader = DirectoryLoader::new().with_package("example.com/p", dir);
        let pkg = loader.load("example.com/p").unwrap();
        assert_eq!(pkg.files, vec![dir.join("a.go")]);
    }

    #[test]
    fn test_directory_loader_unmapped() {
        let loader = DirectoryLoader::new();
        let err = loader.load("example.com/unknown").unwrap_err();
        assert_eq!(err.package(), "example.com/unknown");
    }

    #[test]
    fn test_directory_loader_fallback() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("io.go"), "package io\n").unwrap();

        let fallback = DirectoryLoader::new().with_package("io", temp_dir.path());
        let loader = DirectoryLoader::new().with_fallback(Box::new(fallback));
        assert!(loader.load("io").is_ok());
    }

    #[test]
    fn test_find_module_dir() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(temp_dir.path().join("go.mod"), "module example.com/m\n").unwrap();

        assert_eq!(find_module_dir(&nested), Some(temp_dir.path().to_path_buf()));
    }
}
