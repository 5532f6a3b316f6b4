//! Per-user conversation state with time-to-live eviction
//!
//! A [`SessionStore`] is created once and handed to the [`Assistant`]; nothing
//! in this crate keeps sessions in a global. A session expires when it has
//! not been touched for `ttl_secs`. Expired sessions are dropped lazily when
//! their user next shows up, by [`SessionStore::evict_expired`], or by the
//! optional background reaper.
//!
//! [`Assistant`]: crate::Assistant

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Options shown after test cases are generated.
pub const MENU_OPTIONS: [&str; 3] = [
    "🔄 Extract another feature",
    "📄 Upload new documents",
    "❌ End session",
];

/// Where a user is in the load, specify, generate flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStep {
    #[default]
    AwaitingSpecification,
    AwaitingTestCases,
    AwaitingFeature,
    AwaitingGeneration,
    AwaitingMenuChoice,
}

impl ConversationStep {
    /// What the assistant expects from the user at this step.
    pub fn prompt(&self) -> String {
        match self {
            Self::AwaitingSpecification => {
                "Awaiting for a link to Specification document".to_string()
            }
            Self::AwaitingTestCases => "Awaiting for a link to Test Cases document.".to_string(),
            Self::AwaitingFeature => "Awaiting for specifying a feature name.".to_string(),
            Self::AwaitingGeneration => "Awaiting for generating test cases.".to_string(),
            Self::AwaitingMenuChoice => {
                let options = MENU_OPTIONS
                    .iter()
                    .map(|option| format!("'{option}'"))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("Awaiting for user to select one of the menu options: [{options}]")
            }
        }
    }
}

impl fmt::Display for ConversationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prompt())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub at: DateTime<Utc>,
}

/// Conversation state for one user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub step: ConversationStep,
    pub spec_doc_link: Option<String>,
    pub test_cases_doc_link: Option<String>,
    pub feature: Option<String>,
    pub documents_loaded: bool,
    pub history: VecDeque<ChatMessage>,
    pub last_active: DateTime<Utc>,
}

impl Session {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            step: ConversationStep::default(),
            spec_doc_link: None,
            test_cases_doc_link: None,
            feature: None,
            documents_loaded: false,
            history: VecDeque::new(),
            last_active: now,
        }
    }

    /// Forget links, feature and step while keeping the chat history.
    pub fn reset_context(&mut self) {
        self.step = ConversationStep::AwaitingSpecification;
        self.spec_doc_link = None;
        self.test_cases_doc_link = None;
        self.feature = None;
        self.documents_loaded = false;
    }

    /// History as `Role: content` lines.
    pub fn transcript(&self) -> String {
        self.history
            .iter()
            .map(|m| format!("{}: {}\n", m.role.label(), m.content))
            .collect()
    }
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            millis: AtomicI64::new(start.timestamp_millis()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let millis = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst)).unwrap_or_default()
    }
}

/// Session lifetime settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Idle time after which a session is dropped
    pub ttl_secs: u64,
    /// Messages kept per session; the oldest go first
    pub max_history: usize,
    /// Period of the background reaper, if one is started
    pub reap_interval_secs: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 60 * 60,
            max_history: 100,
            reap_interval_secs: Some(5 * 60),
        }
    }
}

impl SessionConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Owner of every user's [`Session`].
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
}

impl SessionStore {
    pub fn new(config: SessionConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: SessionConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            clock,
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn is_expired(&self, session: &Session, now: DateTime<Utc>) -> bool {
        // A clock that went backwards yields a negative span, which never expires
        (now - session.last_active)
            .to_std()
            .map(|idle| idle > self.config.ttl())
            .unwrap_or(false)
    }

    /// Copy of the user's live session, if any. Does not refresh it.
    pub async fn get(&self, user_id: &str) -> Option<Session> {
        let now = self.clock.now();
        {
            let sessions = self.sessions.read().await;
            match sessions.get(user_id) {
                None => return None,
                Some(session) if !self.is_expired(session, now) => return Some(session.clone()),
                Some(_) => {}
            }
        }

        let mut sessions = self.sessions.write().await;
        if sessions
            .get(user_id)
            .is_some_and(|session| self.is_expired(session, now))
        {
            sessions.remove(user_id);
            debug!("Session for user {} expired", user_id);
        }
        None
    }

    /// The user's step, or the first step when they have no session.
    pub async fn current_step(&self, user_id: &str) -> ConversationStep {
        self.get(user_id)
            .await
            .map(|session| session.step)
            .unwrap_or_default()
    }

    /// Run `f` on the user's session, creating a fresh one if it is missing or
    /// expired, and mark it active.
    pub async fn update<F, R>(&self, user_id: &str, f: F) -> R
    where
        F: FnOnce(&mut Session) -> R,
    {
        let now = self.clock.now();
        let mut sessions = self.sessions.write().await;
        if sessions
            .get(user_id)
            .is_some_and(|session| self.is_expired(session, now))
        {
            sessions.remove(user_id);
            debug!("Session for user {} expired", user_id);
        }

        let session = sessions
            .entry(user_id.to_string())
            .or_insert_with(|| Session::new(now));
        session.last_active = now;
        f(session)
    }

    /// Append one user message and the reply to it.
    pub async fn record_exchange(&self, user_id: &str, user_message: &str, reply: &str) {
        let now = self.clock.now();
        let max_history = self.config.max_history;
        self.update(user_id, |session| {
            for (role, content) in [(Role::User, user_message), (Role::Assistant, reply)] {
                session.history.push_back(ChatMessage {
                    role,
                    content: content.to_string(),
                    at: now,
                });
            }
            while session.history.len() > max_history {
                session.history.pop_front();
            }
        })
        .await
    }

    /// Drop the user's session. Returns whether one existed.
    pub async fn clear(&self, user_id: &str) -> bool {
        self.sessions.write().await.remove(user_id).is_some()
    }

    /// Drop every expired session and return how many went.
    pub async fn evict_expired(&self) -> usize {
        let now = self.clock.now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !self.is_expired(session, now));
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!("Evicted {} expired sessions, {} remain", evicted, sessions.len());
        }
        evicted
    }

    /// Number of stored sessions, expired ones included until evicted.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Evict expired sessions every `every` until the store is dropped.
    pub fn spawn_reaper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let store: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    debug!("Session store dropped, stopping reaper");
                    break;
                };
                store.evict_expired().await;
            }
        })
    }
}
