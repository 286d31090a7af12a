mod http;
mod memory;

pub use http::HttpNoteService;
pub use memory::{Fault, MemoryNoteService};
