//! Chat sessions.
//!
//! Each session owns its transcript and history flag. The manager hands
//! out `Arc<Mutex<Session>>` so turns within one session serialize while
//! independent sessions never contend.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::history::Transcript;

#[derive(Debug)]
pub struct Session {
    pub id: String,
    pub use_history: bool,
    /// Whether turns fetch document context at all; off means the model
    /// answers from a plain question/answer prompt.
    pub use_rag: bool,
    pub transcript: Transcript,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(use_history: bool, use_rag: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            use_history,
            use_rag,
            transcript: Transcript::new(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub use_history: bool,
    pub use_rag: bool,
    pub turns: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, use_history: bool, use_rag: bool) -> SessionSummary {
        let session = Session::new(use_history, use_rag);
        let summary = SessionSummary {
            id: session.id.clone(),
            use_history,
            use_rag,
            turns: 0,
            created_at: session.created_at,
        };
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), Arc::new(Mutex::new(session)));
        summary
    }

    pub async fn get(&self, id: &str) -> Option<Arc<Mutex<Session>>> {
        self.sessions.read().await.get(id).cloned()
    }

    pub async fn list(&self) -> Vec<SessionSummary> {
        let sessions = self.sessions.read().await;
        let mut summaries = Vec::with_capacity(sessions.len());
        for session in sessions.values() {
            let session = session.lock().await;
            summaries.push(SessionSummary {
                id: session.id.clone(),
                use_history: session.use_history,
                use_rag: session.use_rag,
                turns: session.transcript.len(),
                created_at: session.created_at,
            });
        }
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        summaries
    }

    pub async fn remove(&self, id: &str) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Turn;

    #[tokio::test]
    async fn create_get_remove() {
        let manager = SessionManager::new();
        let summary = manager.create(true, true).await;

        let session = manager.get(&summary.id).await.expect("session exists");
        assert!(session.lock().await.use_history);

        assert!(manager.remove(&summary.id).await);
        assert!(manager.get(&summary.id).await.is_none());
        assert!(!manager.remove(&summary.id).await);
    }

    #[tokio::test]
    async fn clearing_a_session_empties_only_its_transcript() {
        let manager = SessionManager::new();
        let a = manager.create(true, true).await;
        let b = manager.create(true, true).await;

        for id in [&a.id, &b.id] {
            let session = manager.get(id).await.unwrap();
            session.lock().await.transcript.append(Turn::user("hello"));
        }

        manager.get(&a.id).await.unwrap().lock().await.transcript.clear();

        assert!(manager.get(&a.id).await.unwrap().lock().await.transcript.is_empty());
        assert_eq!(manager.get(&b.id).await.unwrap().lock().await.transcript.len(), 1);
    }

    #[tokio::test]
    async fn list_reports_turn_counts() {
        let manager = SessionManager::new();
        let summary = manager.create(false, true).await;
        let session = manager.get(&summary.id).await.unwrap();
        session.lock().await.transcript.append(Turn::user("q"));
        session.lock().await.transcript.append(Turn::assistant("a"));

        let listed = manager.list().await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].turns, 2);
        assert!(!listed[0].use_history);
        assert!(listed[0].use_rag);
    }
}
