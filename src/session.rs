use crate::error::AppError;
use crate::models::{ChapterMap, ChatEntry, DocumentKind};
use crate::services::chapterizer::{detect_chapters, select_chapter_text};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Everything one user has built up: the uploaded document, its chapters,
/// generated content and chat history.
#[derive(Debug, Default)]
pub struct Session {
    kind: DocumentKind,
    filename: Option<String>,
    extracted_text: Option<String>,
    chapters: ChapterMap,
    chat_history: Vec<ChatEntry>,
    generated: Vec<String>,
    /// Bumped whenever the document is replaced or the session is reset.
    epoch: u64,
}

impl Session {
    /// Replaces the current document. Chapters are only detected for books.
    pub fn load_document(&mut self, filename: &str, kind: DocumentKind, text: String) {
        self.epoch += 1;
        self.chapters = match kind {
            DocumentKind::Book => detect_chapters(&text),
            DocumentKind::Syllabus => ChapterMap::new(),
        };
        self.kind = kind;
        self.filename = Some(filename.to_string());
        self.extracted_text = Some(text);
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn text(&self) -> Result<&str, AppError> {
        self.extracted_text.as_deref().ok_or(AppError::NoDocument)
    }

    pub fn chapters(&self) -> &ChapterMap {
        &self.chapters
    }

    /// Identifies the document currently loaded. Results computed from an
    /// older epoch must not be recorded.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Text a task or question should be answered from: one chapter of a
    /// book when `chapter` is given, otherwise the whole document.
    pub fn context_for(&self, chapter: Option<u32>) -> Result<String, AppError> {
        let text = self.text()?;
        match chapter {
            None => Ok(text.to_string()),
            Some(number) if self.chapters.contains_key(&number) => {
                Ok(select_chapter_text(text, number, &self.chapters))
            }
            Some(number) => Err(AppError::BadRequest(format!(
                "chapter {} was not detected in this document",
                number
            ))),
        }
    }

    pub fn record_generated(&mut self, epoch: u64, content: String) -> Result<(), AppError> {
        self.ensure_epoch(epoch)?;
        self.generated.push(content);
        Ok(())
    }

    pub fn generated(&self) -> &[String] {
        &self.generated
    }

    /// All generated content as one document, entries separated by a blank line.
    pub fn generated_document(&self) -> String {
        self.generated.join("\n\n")
    }

    pub fn record_chat(&mut self, epoch: u64, entry: ChatEntry) -> Result<(), AppError> {
        self.ensure_epoch(epoch)?;
        self.chat_history.push(entry);
        Ok(())
    }

    /// Chat history in the order it was asked.
    pub fn chat_history(&self) -> &[ChatEntry] {
        &self.chat_history
    }

    /// Clears everything. The epoch keeps counting so in-flight results
    /// for the old document are still refused.
    pub fn reset(&mut self) {
        let epoch = self.epoch + 1;
        *self = Session::default();
        self.epoch = epoch;
    }

    fn ensure_epoch(&self, epoch: u64) -> Result<(), AppError> {
        if epoch == self.epoch {
            Ok(())
        } else {
            Err(AppError::DocumentChanged)
        }
    }
}

struct Entry {
    session: Session,
    last_used: Instant,
}

/// Sessions by id. A session untouched for longer than the idle TTL is
/// dropped.
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, Entry>>,
    idle_ttl: Duration,
}

impl SessionStore {
    pub fn new(idle_ttl: Duration) -> Self {
        SessionStore {
            sessions: Mutex::new(HashMap::new()),
            idle_ttl,
        }
    }

    pub fn idle_ttl(&self) -> Duration {
        self.idle_ttl
    }

    pub fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        let mut sessions = self.lock();
        Self::evict(&mut sessions, self.idle_ttl);
        sessions.insert(
            id,
            Entry {
                session: Session::default(),
                last_used: Instant::now(),
            },
        );
        tracing::info!("created session {} ({} live)", id, sessions.len());
        id
    }

    /// Runs `f` against one session while holding the store lock and marks
    /// the session as used.
    ///
    /// `f` must not block; generator calls happen outside of it.
    pub fn with_session<R>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut Session) -> R,
    ) -> Result<R, AppError> {
        let mut sessions = self.lock();
        let now = Instant::now();
        let expired = match sessions.get(&id) {
            None => return Err(AppError::SessionNotFound),
            Some(entry) => now.duration_since(entry.last_used) > self.idle_ttl,
        };
        if expired {
            sessions.remove(&id);
            tracing::info!("session {} expired", id);
            return Err(AppError::SessionNotFound);
        }
        let entry = sessions.get_mut(&id).ok_or(AppError::SessionNotFound)?;
        entry.last_used = now;
        Ok(f(&mut entry.session))
    }

    pub fn remove(&self, id: Uuid) -> bool {
        self.lock().remove(&id).is_some()
    }

    /// Drops every idle session and returns how many were removed.
    pub fn evict_idle(&self) -> usize {
        Self::evict(&mut self.lock(), self.idle_ttl)
    }

    fn evict(sessions: &mut HashMap<Uuid, Entry>, idle_ttl: Duration) -> usize {
        let before = sessions.len();
        let now = Instant::now();
        sessions.retain(|_, entry| now.duration_since(entry.last_used) <= idle_ttl);
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::info!("evicted {} idle sessions", evicted);
        }
        evicted
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Entry>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
