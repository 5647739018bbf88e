//! In-memory session store with TTL expiry and revocation.

use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::{debug, info};

use super::user::User;
use crate::clock::{Clock, SystemClock};
use crate::error::{Result, TurnstileError};
use crate::sweep::Sweep;

/// A live session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// The authenticated user
    pub user: User,
    /// Expiry in epoch milliseconds
    pub expires_at: u64,
}

impl Session {
    /// Whether the session has expired at `now_millis`.
    pub fn is_expired(&self, now_millis: u64) -> bool {
        now_millis >= self.expires_at
    }
}

/// What `create` hands back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionGrant {
    /// Opaque token identifying the session
    pub session_id: String,
    /// Expiry in epoch milliseconds
    pub expires_at: u64,
}

/// Source of unguessable session tokens.
pub trait TokenGenerator: Send + Sync {
    /// Mint a new token.
    fn generate(&self) -> Result<String>;
}

/// Tokens are 122 random bits from the OS CSPRNG, rendered as a v4 UUID.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsTokenGenerator;

impl TokenGenerator for OsTokenGenerator {
    fn generate(&self) -> Result<String> {
        let mut bytes = [0u8; 16];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| TurnstileError::TokenGeneration(e.to_string()))?;
        Ok(uuid::Builder::from_random_bytes(bytes).into_uuid().to_string())
    }
}

/// Maps opaque tokens to users until they expire or are revoked.
///
/// Expired and revoked sessions are indistinguishable from ones that never
/// existed. Every operation touches a single key under its shard lock.
pub struct SessionStore {
    sessions: DashMap<String, Session>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    tokens: Box<dyn TokenGenerator>,
}

impl SessionStore {
    /// Create a store whose sessions live for `ttl`, using the system clock.
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    /// Create a store with an explicit time source.
    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
            clock,
            tokens: Box::new(OsTokenGenerator),
        }
    }

    /// Replace the token source.
    pub fn with_token_generator(mut self, tokens: impl TokenGenerator + 'static) -> Self {
        self.tokens = Box::new(tokens);
        self
    }

    /// Session lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Open a new session for `user`.
    ///
    /// Fails only when no token can be generated.
    pub fn create(&self, user: User) -> Result<SessionGrant> {
        let session_id = self.tokens.generate()?;
        let expires_at = self
            .clock
            .now_millis()
            .saturating_add(self.ttl.as_millis() as u64);

        info!(user_id = %user.id, expires_at = expires_at, "Session created");
        self.sessions
            .insert(session_id.clone(), Session { user, expires_at });

        Ok(SessionGrant {
            session_id,
            expires_at,
        })
    }

    /// The user behind `session_id`, if the session is live.
    ///
    /// An expired session is removed by this call.
    pub fn lookup(&self, session_id: &str) -> Option<User> {
        let now = self.clock.now_millis();

        match self.sessions.entry(session_id.to_owned()) {
            Entry::Vacant(_) => None,
            Entry::Occupied(occupied) if occupied.get().is_expired(now) => {
                let (_, session) = occupied.remove_entry();
                debug!(user_id = %session.user.id, "Session expired");
                None
            }
            Entry::Occupied(occupied) => Some(occupied.get().user.clone()),
        }
    }

    /// Remove a session. Unknown ids are ignored.
    pub fn revoke(&self, session_id: &str) {
        if let Some((_, session)) = self.sessions.remove(session_id) {
            info!(user_id = %session.user.id, "Session revoked");
        }
    }

    /// Remove every expired session. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now_millis();
        let mut removed = 0;
        self.sessions.retain(|_, session| {
            let keep = !session.is_expired(now);
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// Number of stored sessions, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the store holds no sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("sessions", &self.sessions.len())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl Sweep for SessionStore {
    fn sweep(&self) -> usize {
        self.purge_expired()
    }
}
