//! Explicit mode: stub named symbols of one package

use super::output::{Emitter, OutputArgs};
use crate::golang::LoaderFactory;
use crate::models::{StubConfig, SymbolRequest};
use crate::stubgen::Orchestrator;
use crate::Result;
use anyhow::Context;
use colored::Colorize;
use std::path::Path;

/// Run `depstub gen <package> [types] [values]`
///
/// `package` may be `.` for the package in `work_dir`.
pub fn run(
    package: &str,
    types: Option<&str>,
    values: Option<&str>,
    output: &OutputArgs,
    config: &StubConfig,
    work_dir: &Path,
) -> Result<()> {
    let request = SymbolRequest::from_lists(package, types.unwrap_or(""), values.unwrap_or(""));
    if request.is_empty() {
        eprintln!(
            "{}",
            format!("No symbols requested; the stub for {} will be empty", package).yellow()
        );
    }

    let src_dir = output.src.as_ref().map(|dir| work_dir.join(dir));
    let loader = LoaderFactory::create(config, work_dir, src_dir.as_deref().map(|dir| (package, dir)));
    tracing::debug!(loader = loader.name(), package, "loading package");

    let generated = Orchestrator::new(loader.as_ref())
        .generate(&request)
        .with_context(|| format!("Failed generating stub for {}", package))?;

    Emitter::new(output, config, work_dir)?.emit(&[generated])
}
