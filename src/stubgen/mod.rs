pub mod extract;
pub mod orchestrator;
pub mod render;

pub use extract::Extractor;
pub use orchestrator::{merge_requests, GeneratedStub, Orchestrator};
pub use render::{render, RenderedStub};
