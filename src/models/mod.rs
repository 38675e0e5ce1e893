pub mod config;
pub mod error;
pub mod request;
pub mod shape;
pub mod usage;

pub use config::StubConfig;
pub use error::{AmbiguousReference, StubError, StubResult};
pub use request::SymbolRequest;
pub use shape::{
    ArrayLen, BasicKind, ChanDir, Extraction, FieldShape, FuncShape, ImportSet, InterfaceShape,
    MethodRecord, MethodShape, ShapeKind, ShapeRecord, TypeExpr, TypeParam,
};
pub use usage::{PackageUsage, UsageIndex};
