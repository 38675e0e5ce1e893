pub mod auto;
pub mod generate;
pub mod module_txt;
pub mod output;
pub mod print;

pub use output::{Destination, Emitter, OutputArgs};
