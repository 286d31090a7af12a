use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::MemoryNoteService;
use crate::{Note, NoteService, StoreError};

#[derive(Serialize)]
struct LoginRequest<'a> {
    user: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

/// Note service speaking JSON over HTTP.
///
/// Lookups and mutations run against a local mirror. `sync` pushes every
/// dirty note with `PUT /notes/{id}` and then refreshes the mirror from
/// `GET /notes`.
pub struct HttpNoteService {
    client: Client,
    endpoint: String,
    token: RwLock<Option<String>>,
    mirror: MemoryNoteService,
}

impl HttpNoteService {
    /// Create a client for the service rooted at `endpoint`.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| StoreError::Other(format!("Failed to build HTTP client: {}", e)))?;

        Ok(HttpNoteService {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token: RwLock::new(None),
            mirror: MemoryNoteService::new(),
        })
    }

    /// The local mirror backing lookups.
    pub fn mirror(&self) -> &MemoryNoteService {
        &self.mirror
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    async fn bearer(&self) -> Result<String, StoreError> {
        self.token
            .read()
            .await
            .clone()
            .ok_or_else(|| StoreError::AuthExpired("not logged in".to_string()))
    }

    async fn push(&self, note: &Note) -> Result<(), StoreError> {
        let token = self.bearer().await?;
        let url = self.url(&format!("/notes/{}", note.id));
        debug!("PUT {}", url);

        let response = self
            .client
            .put(&url)
            .bearer_auth(token)
            .json(note)
            .send()
            .await
            .map_err(request_error)?;

        check_status(response.status(), &url)
    }

    async fn pull(&self) -> Result<Vec<Note>, StoreError> {
        let token = self.bearer().await?;
        let url = self.url("/notes");
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(request_error)?;
        check_status(response.status(), &url)?;

        response
            .json::<Vec<Note>>()
            .await
            .map_err(|e| StoreError::Protocol(format!("Invalid note list from {}: {}", url, e)))
    }
}

/// Map an HTTP status to a store error, if it is not a success.
fn check_status(status: StatusCode, url: &str) -> Result<(), StoreError> {
    if status.is_success() {
        return Ok(());
    }
    let context = format!("{} returned {}", url, status);
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::AuthExpired(context),
        StatusCode::NOT_FOUND => StoreError::NotFound(context),
        s if s.is_server_error() => StoreError::RemoteUnavailable(context),
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            StoreError::RemoteUnavailable(context)
        }
        _ => StoreError::Protocol(context),
    })
}

fn request_error(e: reqwest::Error) -> StoreError {
    if e.is_connect() || e.is_timeout() || e.is_request() {
        StoreError::RemoteUnavailable(e.to_string())
    } else if e.is_decode() {
        StoreError::Protocol(e.to_string())
    } else {
        StoreError::Other(e.to_string())
    }
}

#[async_trait]
impl NoteService for HttpNoteService {
    async fn login(&self, user: &str, password: &str) -> Result<(), StoreError> {
        let url = self.url("/login");
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .json(&LoginRequest { user, password })
            .send()
            .await
            .map_err(request_error)?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(StoreError::AuthFailed(user.to_string()));
            }
            status => check_status(status, &url)?,
        }

        let login: LoginResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Protocol(format!("Invalid login response: {}", e)))?;
        *self.token.write().await = Some(login.token);

        let notes = self.pull().await?;
        info!("Logged in as {}, {} notes", user, notes.len());
        self.mirror.replace_all(notes);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Note>, StoreError> {
        self.mirror.get(key).await
    }

    async fn find(&self, query: &str) -> Result<Vec<Note>, StoreError> {
        self.mirror.find(query).await
    }

    async fn list_all(&self) -> Result<Vec<Note>, StoreError> {
        self.mirror.list_all().await
    }

    async fn create_note(&self, title: &str, text: &str) -> Result<Note, StoreError> {
        self.mirror.create_note(title, text).await
    }

    async fn update_note(&self, id: &str, title: &str, text: &str) -> Result<(), StoreError> {
        self.mirror.update_note(id, title, text).await
    }

    async fn trash_note(&self, id: &str) -> Result<(), StoreError> {
        self.mirror.trash_note(id).await
    }

    async fn sync(&self) -> Result<(), StoreError> {
        let dirty = self.mirror.dirty_notes();
        let mut pushed = Vec::with_capacity(dirty.len());
        for note in &dirty {
            if let Err(e) = self.push(note).await {
                warn!("Failed to push note {}: {}", note.id, e);
                self.mirror.mark_clean(&pushed);
                return Err(e);
            }
            pushed.push(note.id.clone());
        }
        self.mirror.mark_clean(&pushed);

        let notes = self.pull().await?;
        debug!("sync: pushed {}, pulled {}", pushed.len(), notes.len());
        self.mirror.replace_all(notes);
        Ok(())
    }
}
