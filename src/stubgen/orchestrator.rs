//! Generation sequencing
//!
//! One extract-then-render pass per package, strictly one after another.
//! Each pass gets a fresh [`Extractor`], so nothing loaded for one package
//! is visible to the next.

use super::extract::Extractor;
use super::render::{render, RenderedStub};
use crate::golang::PackageLoader;
use crate::models::{StubResult, SymbolRequest};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::rc::Rc;

/// Result of one generation pass
#[derive(Debug, Clone)]
pub struct GeneratedStub {
    pub request: SymbolRequest,
    pub stub: RenderedStub,
    /// Directory the stubbed package was loaded from
    pub package_dir: PathBuf,
    /// Module root of the stubbed package, if it lives in a module
    pub module_dir: Option<PathBuf>,
}

pub struct Orchestrator<'l> {
    loader: &'l dyn PackageLoader,
}

impl<'l> Orchestrator<'l> {
    pub fn new(loader: &'l dyn PackageLoader) -> Self {
        Self { loader }
    }

    /// Extract and render the stub for a single request
    pub fn generate(&self, request: &SymbolRequest) -> StubResult<GeneratedStub> {
        let extractor = Extractor::new(self.loader);
        let target = extractor.load(&request.package)?;
        let extraction = extractor.extract_from(request, Rc::clone(&target))?;
        let stub = render(&extraction)?;

        tracing::info!(
            package = %stub.package,
            symbols = extraction.records.len(),
            "generated stub"
        );

        Ok(GeneratedStub {
            request: request.clone(),
            stub,
            package_dir: target.dir.clone(),
            module_dir: target.module_dir.clone(),
        })
    }

    /// Generate every request in package path order, stopping at the first error
    ///
    /// Requests for the same package are merged first. `on_done` is called
    /// after each successful pass.
    pub fn generate_all(
        &self,
        requests: &[SymbolRequest],
        mut on_done: impl FnMut(&GeneratedStub),
    ) -> StubResult<Vec<GeneratedStub>> {
        let mut generated = Vec::new();
        for request in merge_requests(requests) {
            let stub = self.generate(&request)?;
            on_done(&stub);
            generated.push(stub);
        }
        Ok(generated)
    }
}

/// Deduplicate requests by package path, sorted by path
pub fn merge_requests(requests: &[SymbolRequest]) -> Vec<SymbolRequest> {
    let mut merged: BTreeMap<&str, (Vec<&str>, Vec<&str>)> = BTreeMap::new();
    for request in requests {
        let entry = merged.entry(request.package.as_str()).or_default();
        entry.0.extend(request.types.iter().map(String::as_str));
        entry.1.extend(request.values.iter().map(String::as_str));
    }
    merged
        .into_iter()
        .map(|(package, (types, values))| SymbolRequest::new(package, types, values))
        .collect()
}
