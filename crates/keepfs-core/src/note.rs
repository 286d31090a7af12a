use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-managed timestamps of a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteTimestamps {
    /// When the note was first created.
    pub created: DateTime<Utc>,
    /// Last time the title or text changed.
    pub edited: DateTime<Utc>,
    /// Last time the note was committed to the store.
    pub updated: DateTime<Utc>,
}

impl NoteTimestamps {
    /// All three timestamps set to the same instant.
    pub fn at(instant: DateTime<Utc>) -> Self {
        NoteTimestamps {
            created: instant,
            edited: instant,
            updated: instant,
        }
    }
}

/// A remotely stored note.
///
/// Notes are never removed from view; they are flagged `trashed` (user-facing
/// soft delete) and/or `deleted` (store-level removal) instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Opaque stable identifier, never reused.
    pub id: String,
    pub title: String,
    pub text: String,
    pub timestamps: NoteTimestamps,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub trashed: bool,
}

impl Note {
    /// Create a live note with all timestamps set to now.
    pub fn new(id: impl Into<String>, title: impl Into<String>, text: impl Into<String>) -> Self {
        Note {
            id: id.into(),
            title: title.into(),
            text: text.into(),
            timestamps: NoteTimestamps::at(Utc::now()),
            deleted: false,
            trashed: false,
        }
    }

    /// The name this note has in the filesystem: its title, or its id when
    /// the title is empty.
    pub fn fs_name(&self) -> &str {
        if self.title.is_empty() {
            &self.id
        } else {
            &self.title
        }
    }

    /// Length of the UTF-8 encoded text in bytes.
    pub fn byte_len(&self) -> u64 {
        self.text.len() as u64
    }
}
