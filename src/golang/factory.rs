use crate::golang::loader::{DirectoryLoader, GoListLoader, PackageLoader};
use crate::models::StubConfig;
use std::path::Path;

/// Factory for creating package loader instances
///
/// Provides a centralized way to pick a loader from configuration and
/// command-line overrides.
pub struct LoaderFactory;

impl LoaderFactory {
    /// Create a loader for a generation run
    ///
    /// # Arguments
    /// * `config` - Loaded configuration (Go command)
    /// * `work_dir` - Directory `go list` runs in
    /// * `source` - Optional `(import path, directory)` override that serves
    ///   one package from a local directory; every other package still goes
    ///   through the Go toolchain
    pub fn create(
        config: &StubConfig,
        work_dir: &Path,
        source: Option<(&str, &Path)>,
    ) -> Box<dyn PackageLoader> {
        let go_list = GoListLoader::new(config.go_command.clone()).in_dir(work_dir);

        match source {
            Some((import_path, dir)) => Box::new(
                DirectoryLoader::new()
                    .with_package(import_path, dir)
                    .with_fallback(Box::new(go_list)),
            ),
            None => Box::new(go_list),
        }
    }
}
