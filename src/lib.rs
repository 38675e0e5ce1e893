// depstub - behavior-free stubs of Go dependencies
// Extracts the exported shape of a package and renders a compile-only stand-in

pub mod cli;
pub mod golang;
pub mod logging;
pub mod models;
pub mod scanner;
pub mod stubgen;

pub use anyhow::{Context, Result};
pub use colored::Colorize;

// Re-export commonly used types
pub use models::{StubConfig, StubError, StubResult, SymbolRequest, UsageIndex};
pub use scanner::{ScanOptions, ScanResult, UsageScanner};
pub use stubgen::{GeneratedStub, Orchestrator, RenderedStub};
