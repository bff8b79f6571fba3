//! One form per page load.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

use crate::clipboard::Clipboard;
use crate::controller::FormController;
use crate::webhook::Analyzer;

struct Session<A> {
    controller: Arc<FormController<A>>,
    last_seen: Instant,
}

/// Hands out a fresh [`FormController`] for every page load and finds it
/// again by id. Sessions idle for longer than `ttl` are dropped the next time
/// a page is served.
pub struct FormSessions<A> {
    analyzer: Arc<A>,
    clipboard: Arc<dyn Clipboard>,
    ttl: Duration,
    sessions: Mutex<HashMap<Uuid, Session<A>>>,
}

impl<A: Analyzer> FormSessions<A> {
    pub fn new(analyzer: A, clipboard: Arc<dyn Clipboard>, ttl: Duration) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
            clipboard,
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub async fn open(&self) -> Uuid {
        let mut sessions = self.sessions.lock().await;

        let before = sessions.len();
        sessions.retain(|_, s| s.last_seen.elapsed() <= self.ttl);
        let expired = before - sessions.len();
        if expired > 0 {
            tracing::info!(expired, "idle form sessions dropped");
        }

        let id = Uuid::new_v4();
        let controller = FormController::new(Arc::clone(&self.analyzer), Arc::clone(&self.clipboard));
        sessions.insert(
            id,
            Session {
                controller: Arc::new(controller),
                last_seen: Instant::now(),
            },
        );
        tracing::debug!(session = %id, active = sessions.len(), "form session opened");
        id
    }

    pub async fn get(&self, id: Uuid) -> Option<Arc<FormController<A>>> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get_mut(&id)?;
        session.last_seen = Instant::now();
        Some(Arc::clone(&session.controller))
    }
}
