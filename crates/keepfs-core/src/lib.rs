pub mod backends;
mod error;
mod note;
mod traits;

pub use backends::{Fault, HttpNoteService, MemoryNoteService};
pub use error::StoreError;
pub use note::{Note, NoteTimestamps};
pub use traits::NoteService;
