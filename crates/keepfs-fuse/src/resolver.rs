//! Path to note resolution.

use keepfs_core::Note;
use tracing::debug;

use crate::async_bridge::FuseResult;
use crate::store::NoteStoreAdapter;

/// Strip the leading separator from a path to get the lookup key.
pub fn key_from_path(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

/// Maps filesystem paths to notes.
///
/// Lookup is by id first, then by exact title among the store's search
/// results. Duplicate titles resolve to whichever note the store returns
/// first, so only one of them is reachable by path.
#[derive(Clone)]
pub struct PathResolver {
    store: NoteStoreAdapter,
}

impl PathResolver {
    pub fn new(store: NoteStoreAdapter) -> Self {
        PathResolver { store }
    }

    /// A note is hidden from path lookup only when it is both deleted and
    /// trashed. Listing is stricter, see `DirectoryLister::is_listed`.
    pub fn is_visible(note: &Note) -> bool {
        !(note.deleted && note.trashed)
    }

    /// Resolve `path` to a note, or `None` if nothing visible matches.
    pub fn resolve(&self, path: &str) -> FuseResult<Option<Note>> {
        let key = key_from_path(path);

        let note = match self.store.get(key)? {
            Some(note) => Some(note),
            None => self
                .store
                .find_by_title(key)?
                .into_iter()
                .find(|n| n.title == key),
        };

        match note {
            Some(note) if Self::is_visible(&note) => Ok(Some(note)),
            Some(note) => {
                debug!("resolve {}: note {} is deleted and trashed", path, note.id);
                Ok(None)
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::async_bridge::init_runtime;
    use keepfs_core::MemoryNoteService;
    use std::sync::Arc;

    fn resolver_with(notes: Vec<Note>) -> PathResolver {
        init_runtime().unwrap();
        let service = Arc::new(MemoryNoteService::new());
        for note in notes {
            service.insert(note);
        }
        PathResolver::new(NoteStoreAdapter::new(service))
    }

    fn flagged(id: &str, title: &str, deleted: bool, trashed: bool) -> Note {
        let mut note = Note::new(id, title, "");
        note.deleted = deleted;
        note.trashed = trashed;
        note
    }

    #[test]
    fn test_key_from_path() {
        assert_eq!(key_from_path("/todo"), "todo");
        assert_eq!(key_from_path("todo"), "todo");
        assert_eq!(key_from_path("/"), "");
    }

    #[test]
    fn test_resolve_by_title() {
        let resolver = resolver_with(vec![Note::new("n1", "shopping", "eggs")]);
        let note = resolver.resolve("/shopping").unwrap().unwrap();
        assert_eq!(note.id, "n1");
    }

    #[test]
    fn test_resolve_by_id() {
        let resolver = resolver_with(vec![Note::new("n1", "", "untitled")]);
        let note = resolver.resolve("/n1").unwrap().unwrap();
        assert_eq!(note.text, "untitled");
    }

    #[test]
    fn test_id_lookup_wins_over_title() {
        let resolver = resolver_with(vec![
            Note::new("alpha", "other", ""),
            Note::new("n2", "alpha", ""),
        ]);
        let note = resolver.resolve("/alpha").unwrap().unwrap();
        assert_eq!(note.id, "alpha");
    }

    #[test]
    fn test_title_must_match_exactly() {
        let resolver = resolver_with(vec![Note::new("n1", "shopping list", "")]);
        assert!(resolver.resolve("/shopping").unwrap().is_none());
    }

    #[test]
    fn test_text_match_is_not_a_title_match() {
        let resolver = resolver_with(vec![Note::new("n1", "groceries", "shopping")]);
        assert!(resolver.resolve("/shopping").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_titles_first_match_wins() {
        let resolver = resolver_with(vec![
            Note::new("first", "dup", "one"),
            Note::new("second", "dup", "two"),
        ]);
        let note = resolver.resolve("/dup").unwrap().unwrap();
        assert_eq!(note.id, "first");
    }

    #[test]
    fn test_hidden_only_when_deleted_and_trashed() {
        let resolver = resolver_with(vec![
            flagged("t", "trashed-only", false, true),
            flagged("d", "deleted-only", true, false),
            flagged("b", "both", true, true),
        ]);

        assert!(resolver.resolve("/trashed-only").unwrap().is_some());
        assert!(resolver.resolve("/deleted-only").unwrap().is_some());
        assert!(resolver.resolve("/both").unwrap().is_none());
        assert!(resolver.resolve("/b").unwrap().is_none());
    }

    #[test]
    fn test_missing_note() {
        let resolver = resolver_with(vec![]);
        assert!(resolver.resolve("/nothing").unwrap().is_none());
    }
}
