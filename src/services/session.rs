//! Server-side session table.
//!
//! The cookie carries only an opaque id; the user id lives here and expires
//! after the configured TTL.

use std::time::{Duration, Instant};

use axum::http::{header, HeaderMap};
use dashmap::DashMap;
use uuid::Uuid;

use crate::config::schema::SessionConfig;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("unknown session")]
    Unknown,
    #[error("session expired")]
    Expired,
}

#[derive(Debug, Clone)]
struct Session {
    user_id: String,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<String, Session>,
    ttl: Duration,
    cookie_name: String,
    secure: bool,
}

impl SessionStore {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl: Duration::from_secs(config.ttl_secs),
            cookie_name: config.cookie_name.clone(),
            secure: config.secure,
        }
    }

    /// Start a session for `user_id` and return its id.
    pub fn create(&self, user_id: &str) -> String {
        let id = Uuid::new_v4().simple().to_string();
        self.sessions.insert(
            id.clone(),
            Session {
                user_id: user_id.to_string(),
                expires_at: Instant::now() + self.ttl,
            },
        );
        id
    }

    /// User id bound to a live session. Expired sessions are removed.
    pub fn resolve(&self, session_id: &str) -> Result<String, SessionError> {
        let expired = match self.sessions.get(session_id) {
            None => return Err(SessionError::Unknown),
            Some(session) if session.expires_at > Instant::now() => {
                return Ok(session.user_id.clone())
            }
            Some(_) => true,
        };
        if expired {
            self.sessions.remove(session_id);
        }
        Err(SessionError::Expired)
    }

    pub fn destroy(&self, session_id: &str) {
        self.sessions.remove(session_id);
    }

    /// Drop every session of `user_id` except `keep`; returns how many were
    /// dropped.
    pub fn destroy_user(&self, user_id: &str, keep: Option<&str>) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|id, s| s.user_id != user_id || Some(id.as_str()) == keep);
        before - self.sessions.len()
    }

    /// Remove expired sessions; returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.expires_at > now);
        before - self.sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// `Set-Cookie` value issuing `session_id`.
    pub fn session_cookie(&self, session_id: &str) -> String {
        self.cookie(session_id, self.ttl.as_secs())
    }

    /// `Set-Cookie` value that clears the session cookie.
    pub fn clear_cookie(&self) -> String {
        self.cookie("", 0)
    }

    fn cookie(&self, value: &str, max_age: u64) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Strict; Max-Age={}",
            self.cookie_name, value, max_age
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    /// Session id from the request's `Cookie` headers, if present.
    pub fn session_id_from_headers(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.cookie_name)
            .map(|(_, value)| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn store(ttl_secs: u64) -> SessionStore {
        SessionStore::new(&SessionConfig {
            cookie_name: "blog_session".into(),
            ttl_secs,
            secure: false,
        })
    }

    #[test]
    fn test_create_resolve_destroy() {
        let sessions = store(60);
        let id = sessions.create("user-1");
        assert_eq!(sessions.resolve(&id), Ok("user-1".to_string()));
        sessions.destroy(&id);
        assert_eq!(sessions.resolve(&id), Err(SessionError::Unknown));
    }

    #[test]
    fn test_destroy_user_keeps_current_session() {
        let sessions = store(60);
        let current = sessions.create("user-1");
        sessions.create("user-1");
        let other_user = sessions.create("user-2");
        assert_eq!(sessions.destroy_user("user-1", Some(&current)), 1);
        assert!(sessions.resolve(&current).is_ok());
        assert!(sessions.resolve(&other_user).is_ok());
        assert_eq!(sessions.destroy_user("user-1", None), 1);
        assert_eq!(sessions.len(), 1);
    }

    #[test]
    fn test_zero_ttl_expires_immediately() {
        let sessions = store(0);
        let id = sessions.create("user-1");
        assert_eq!(sessions.resolve(&id), Err(SessionError::Expired));
        assert!(sessions.is_empty());
    }

    #[test]
    fn test_purge_expired() {
        let sessions = store(0);
        sessions.create("a");
        sessions.create("b");
        assert_eq!(sessions.purge_expired(), 2);
    }

    #[test]
    fn test_cookie_round_trip() {
        let sessions = store(3600);
        let id = sessions.create("user-1");
        let cookie = sessions.session_cookie(&id);
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=3600"));
        assert!(!cookie.contains("Secure"));

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; blog_session={id}")).unwrap(),
        );
        assert_eq!(sessions.session_id_from_headers(&headers), Some(id));

        assert!(sessions.clear_cookie().contains("Max-Age=0"));
    }
}
