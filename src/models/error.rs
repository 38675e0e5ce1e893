//! Error taxonomy shared by the extractor, synthesizer and scanner.

use std::path::PathBuf;

/// Result type for stub generation
pub type StubResult<T> = Result<T, StubError>;

/// Fatal errors raised while extracting or rendering a stub
///
/// Every variant names the package it concerns; symbol-level failures also
/// name the symbol so the caller can report exactly what went wrong.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StubError {
    #[error("cannot load package {package}: {reason}")]
    Resolution { package: String, reason: String },

    #[error("symbol {symbol} not found in package {package}")]
    SymbolNotFound { package: String, symbol: String },

    #[error("cannot render {package}.{symbol}: {reason}")]
    Render {
        package: String,
        symbol: String,
        reason: String,
    },
}

impl StubError {
    pub fn resolution(package: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Resolution {
            package: package.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(package: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self::SymbolNotFound {
            package: package.into(),
            symbol: symbol.into(),
        }
    }

    pub fn render(
        package: impl Into<String>,
        symbol: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Render {
            package: package.into(),
            symbol: symbol.into(),
            reason: reason.into(),
        }
    }

    /// Package path the error refers to
    pub fn package(&self) -> &str {
        match self {
            Self::Resolution { package, .. }
            | Self::SymbolNotFound { package, .. }
            | Self::Render { package, .. } => package,
        }
    }

    /// Offending symbol, if the failure is tied to one
    pub fn symbol(&self) -> Option<&str> {
        match self {
            Self::Resolution { .. } => None,
            Self::SymbolNotFound { symbol, .. } | Self::Render { symbol, .. } => Some(symbol),
        }
    }
}

/// A qualified reference the usage scanner could not attribute with certainty
///
/// Not fatal: the occurrence is left out of the usage index and reported
/// alongside it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("ambiguous reference {qualifier}.{name} at {}:{line}: {reason}", file.display())]
pub struct AmbiguousReference {
    pub file: PathBuf,
    pub line: usize,
    pub qualifier: String,
    pub name: String,
    pub reason: String,
}
