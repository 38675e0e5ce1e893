pub mod factory;
pub mod index;
pub mod loader;
pub mod names;
pub mod parser;

pub use factory::LoaderFactory;
pub use index::PackageIndex;
pub use loader::{DirectoryLoader, GoListLoader, LoadedPackage, PackageLoader};
pub use parser::{GoFile, GoParser, ImportName, ImportSpec, ParseError};
