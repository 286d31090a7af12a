use async_trait::async_trait;

use crate::error::StoreError;
use crate::note::Note;

/// Trait for remote note service implementations.
///
/// Mutations (`create_note`, `update_note`, `trash_note`) change only the
/// service's local view until `sync` commits them.
#[async_trait]
pub trait NoteService: Send + Sync + 'static {
    /// Authenticate against the service.
    async fn login(&self, user: &str, password: &str) -> Result<(), StoreError>;

    /// Look a note up by id.
    async fn get(&self, key: &str) -> Result<Option<Note>, StoreError>;

    /// Notes whose title or text contains `query`, in store order.
    async fn find(&self, query: &str) -> Result<Vec<Note>, StoreError>;

    /// Every known note, including trashed and deleted ones, in store order.
    async fn list_all(&self) -> Result<Vec<Note>, StoreError>;

    /// Create a note locally. Visible to lookups immediately, durable after `sync`.
    async fn create_note(&self, title: &str, text: &str) -> Result<Note, StoreError>;

    /// Replace a note's title and text locally.
    async fn update_note(&self, id: &str, title: &str, text: &str) -> Result<(), StoreError>;

    /// Set a note's `trashed` flag locally.
    async fn trash_note(&self, id: &str) -> Result<(), StoreError>;

    /// Push pending local changes and pull remote ones.
    async fn sync(&self) -> Result<(), StoreError>;
}
