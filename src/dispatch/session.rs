use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::campaign::CampaignId;

/// Operator-side state of one campaign's dispatch run. Nothing here is
/// persisted; a lost session is rebuilt from the recipient statuses.
#[derive(Debug)]
pub struct Session {
    pub cursor: usize,
    pub auto_advance: bool,
    generation: u64,
    repeat: Option<JoinHandle<()>>,
    closed: bool,
}

impl Session {
    pub fn new(cursor: usize) -> Session {
        Session {
            cursor,
            auto_advance: false,
            generation: 0,
            repeat: None,
            closed: false,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Invalidates any scheduled repeat. Returns whether one was pending.
    pub fn cancel_repeat(&mut self) -> bool {
        self.generation += 1;
        match self.repeat.take() {
            Some(handle) => {
                let pending = !handle.is_finished();
                handle.abort();
                pending
            }
            None => false,
        }
    }

    pub fn set_repeat(&mut self, handle: JoinHandle<()>) {
        self.repeat = Some(handle);
    }

    pub(crate) fn clear_repeat(&mut self) {
        self.repeat = None;
    }

    /// Marks the session as torn down. Whoever still holds its handle must
    /// fetch a fresh one from the registry. A running repeat sees the bumped
    /// generation and stops.
    pub fn close(&mut self) {
        self.closed = true;
        self.generation += 1;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn repeat_pending(&self) -> bool {
        self.repeat
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }
}

pub type SharedSession = Arc<Mutex<Session>>;

#[derive(Clone, Debug, Default)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<CampaignId, SharedSession>>>,
}

impl SessionRegistry {
    pub fn new() -> SessionRegistry {
        SessionRegistry::default()
    }

    pub async fn get(&self, campaign_id: CampaignId) -> Option<SharedSession> {
        self.sessions.lock().await.get(&campaign_id).cloned()
    }

    /// Registers `session` unless another caller got there first, and returns
    /// whichever is registered.
    pub async fn insert(&self, campaign_id: CampaignId, session: Session) -> SharedSession {
        self.sessions
            .lock()
            .await
            .entry(campaign_id)
            .or_insert_with(|| Arc::new(Mutex::new(session)))
            .clone()
    }

    /// Unregisters `session` only if it is still the one registered.
    pub async fn remove_if(&self, campaign_id: CampaignId, session: &SharedSession) -> bool {
        let mut sessions = self.sessions.lock().await;
        match sessions.get(&campaign_id) {
            Some(registered) if Arc::ptr_eq(registered, session) => {
                sessions.remove(&campaign_id);
                true
            }
            _ => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn drain(&self) -> Vec<(CampaignId, SharedSession)> {
        self.sessions.lock().await.drain().collect()
    }
}
