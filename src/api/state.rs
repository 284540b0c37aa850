use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use anyhow::{Error, anyhow};
use tokio::sync::Mutex;

use crate::ai::ProviderRegistry;
use crate::ai::chat::ChatSession;
use crate::core::AppConfig;

/// A session is only ever driven by one exchange at a time, the lock
/// is held for the whole turn so overlapping requests queue up.
pub type SharedSession = Arc<Mutex<ChatSession>>;

pub type SharedState = Arc<RwLock<AppState>>;

struct SessionEntry {
    session: SharedSession,
    last_used: Instant,
}

pub struct AppState {
    pub config: AppConfig,
    pub registry: ProviderRegistry,
    // Live sessions keyed by ID, removed when the client ends them or
    // when they sit idle for longer than `config.session_idle_timeout`
    sessions: HashMap<String, SessionEntry>,
}

impl AppState {
    pub fn new(config: AppConfig, registry: ProviderRegistry) -> Self {
        Self {
            config,
            registry,
            sessions: HashMap::new(),
        }
    }

    pub fn insert_session(&mut self, session: ChatSession) -> SharedSession {
        let id = session.id().to_string();
        let session = Arc::new(Mutex::new(session));
        self.sessions.insert(
            id,
            SessionEntry {
                session: Arc::clone(&session),
                last_used: Instant::now(),
            },
        );
        session
    }

    /// Look up a session and mark it as used
    pub fn session(&mut self, id: &str) -> Option<SharedSession> {
        let entry = self.sessions.get_mut(id)?;
        entry.last_used = Instant::now();
        Some(Arc::clone(&entry.session))
    }

    pub fn remove_session(&mut self, id: &str) -> bool {
        self.sessions.remove(id).is_some()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Drop sessions unused for at least `max_idle` as of `now`. A
    /// session still referenced by an in-flight request is kept.
    /// Returns the IDs that were removed.
    pub fn evict_idle(&mut self, now: Instant, max_idle: Duration) -> Vec<String> {
        let idle: Vec<String> = self
            .sessions
            .iter()
            .filter(|(_, entry)| {
                now.saturating_duration_since(entry.last_used) >= max_idle
                    && Arc::strong_count(&entry.session) == 1
            })
            .map(|(id, _)| id.clone())
            .collect();
        for id in &idle {
            self.sessions.remove(id);
        }
        idle
    }
}

/// Poisoning means a handler panicked mid-update, surface it as an
/// error instead of taking down every later request
pub fn read_state(state: &RwLock<AppState>) -> Result<RwLockReadGuard<'_, AppState>, Error> {
    state
        .read()
        .map_err(|_| anyhow!("Shared state lock is poisoned"))
}

pub fn write_state(state: &RwLock<AppState>) -> Result<RwLockWriteGuard<'_, AppState>, Error> {
    state
        .write()
        .map_err(|_| anyhow!("Shared state lock is poisoned"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::ProviderKind;
    use crate::core::ProviderConfig;

    fn state() -> AppState {
        let config = AppConfig {
            providers: vec![ProviderConfig {
                kind: ProviderKind::Groq,
                api_key: "test-key".to_string(),
                api_hostname: "http://localhost".to_string(),
                models: vec!["llama-a".to_string()],
            }],
            system_message: "You are a DJ.".to_string(),
            web_ui_path: "./web-ui".to_string(),
            session_idle_timeout: Duration::from_secs(60),
        };
        let registry = ProviderRegistry::from_config(&config).unwrap();
        AppState::new(config, registry)
    }

    fn new_session(state: &mut AppState, id: &str) {
        let session = ChatSession::new(id, "You are a DJ.", state.registry.default_selection());
        state.insert_session(session);
    }

    #[test]
    fn test_idle_session_is_evicted() {
        let mut state = state();
        new_session(&mut state, "a");
        let max_idle = Duration::from_secs(60);

        assert!(state.evict_idle(Instant::now(), max_idle).is_empty());
        assert_eq!(state.session_count(), 1);

        let later = Instant::now() + Duration::from_secs(61);
        assert_eq!(state.evict_idle(later, max_idle), vec!["a".to_string()]);
        assert!(state.session("a").is_none());
    }

    #[test]
    fn test_recent_use_keeps_session() {
        let mut state = state();
        new_session(&mut state, "old");
        new_session(&mut state, "used");
        let max_idle = Duration::from_secs(60);

        let created = Instant::now();
        // Touching moves `last_used` forward
        std::thread::sleep(Duration::from_millis(20));
        assert!(state.session("used").is_some());

        let now = created + max_idle + Duration::from_millis(10);
        assert_eq!(state.evict_idle(now, max_idle), vec!["old".to_string()]);
        assert!(state.session("used").is_some());
    }

    #[test]
    fn test_session_in_use_is_not_evicted() {
        let mut state = state();
        new_session(&mut state, "busy");
        let in_flight = state.session("busy").unwrap();

        let later = Instant::now() + Duration::from_secs(3600);
        assert!(state.evict_idle(later, Duration::from_secs(60)).is_empty());

        drop(in_flight);
        assert_eq!(state.evict_idle(later, Duration::from_secs(60)).len(), 1);
    }

    #[test]
    fn test_remove_session() {
        let mut state = state();
        new_session(&mut state, "a");
        assert!(state.remove_session("a"));
        assert!(!state.remove_session("a"));
        assert_eq!(state.session_count(), 0);
    }

    #[test]
    fn test_poisoned_lock_is_an_error() {
        let shared: SharedState = Arc::new(RwLock::new(state()));
        let poisoner = Arc::clone(&shared);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.write().unwrap();
            panic!("handler panicked");
        })
        .join();

        assert!(read_state(&shared).is_err());
        assert!(write_state(&shared).is_err());
    }
}
