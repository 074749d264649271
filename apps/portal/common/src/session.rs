use actix_web::HttpRequest;
use actix_web::cookie::{Cookie, SameSite};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "portal_session";

pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_MAX_SESSIONS: usize = 500;

struct Entry<T> {
    state: Arc<Mutex<T>>,
    last_seen: Instant,
    /// Bumped on every lookup; the lowest value is the least recently used.
    tick: u64,
}

struct Sessions<T> {
    entries: HashMap<String, Entry<T>>,
    tick: u64,
}

impl<T> Sessions<T> {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn touch(&mut self, id: &str, now: Instant) -> Option<Arc<Mutex<T>>> {
        let tick = self.next_tick();
        let entry = self.entries.get_mut(id)?;
        entry.last_seen = now;
        entry.tick = tick;
        Some(entry.state.clone())
    }

    fn insert(&mut self, id: String, state: Arc<Mutex<T>>, now: Instant) {
        let tick = self.next_tick();
        self.entries.insert(
            id,
            Entry {
                state,
                last_seen: now,
                tick,
            },
        );
    }

    fn evict_idle(&mut self, now: Instant, idle_timeout: Duration) {
        let before = self.entries.len();
        self.entries
            .retain(|_, e| now.duration_since(e.last_seen) < idle_timeout);
        if self.entries.len() < before {
            debug!("Evicted {} idle sessions", before - self.entries.len());
        }
    }

    fn evict_oldest(&mut self, max_sessions: usize) {
        while self.entries.len() > max_sessions {
            let Some(oldest) = self
                .entries
                .iter()
                .min_by_key(|(_, e)| e.tick)
                .map(|(id, _)| id.clone())
            else {
                break;
            };
            self.entries.remove(&oldest);
            debug!("Evicted least recently used session");
        }
    }
}

/// Per-browser state, keyed by the session cookie. Sessions idle for longer
/// than the timeout are dropped, and the registry never holds more than
/// `max_sessions` entries.
pub struct SessionRegistry<T> {
    sessions: Mutex<Sessions<T>>,
    idle_timeout: Duration,
    max_sessions: usize,
}

pub struct SessionHandle<T> {
    pub id: String,
    pub state: Arc<Mutex<T>>,
    /// True when the session was created by this lookup and the cookie must be set.
    pub is_new: bool,
}

impl<T> SessionRegistry<T> {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_IDLE_TIMEOUT, DEFAULT_MAX_SESSIONS)
    }

    pub fn with_limits(idle_timeout: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: Mutex::new(Sessions {
                entries: HashMap::new(),
                tick: 0,
            }),
            idle_timeout,
            max_sessions: max_sessions.max(1),
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.entries.len()
    }

    /// Returns the session for `id`, or builds a fresh one with `init` when the
    /// id is missing, unknown or expired.
    pub async fn resolve<F, Fut, E>(&self, id: Option<&str>, init: F) -> Result<SessionHandle<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        {
            let mut sessions = self.sessions.lock().await;
            sessions.evict_idle(Instant::now(), self.idle_timeout);
            if let Some(id) = id
                && let Some(state) = sessions.touch(id, Instant::now())
            {
                return Ok(SessionHandle {
                    id: id.to_string(),
                    state,
                    is_new: false,
                });
            }
        }

        let state = Arc::new(Mutex::new(init().await?));
        let id = Uuid::new_v4().to_string();
        let mut sessions = self.sessions.lock().await;
        sessions.insert(id.clone(), state.clone(), Instant::now());
        sessions.evict_oldest(self.max_sessions);

        Ok(SessionHandle {
            id,
            state,
            is_new: true,
        })
    }
}

impl<T> Default for SessionRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

pub fn session_id(req: &HttpRequest) -> Option<String> {
    req.cookie(SESSION_COOKIE).map(|c| c.value().to_string())
}

pub fn session_cookie(id: &str) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, id.to_string())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish()
}
