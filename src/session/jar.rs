//! Per-session cookie storage.
//!
//! The store is the only state in the relay that outlives a single call.
//! It maps an opaque session id to an isolated jar; within a jar, cookies
//! are keyed by origin (scheme+host+port) and then by name. A jar exists
//! implicitly from the first write and is never expired.
//!
//! This is a deliberate simplification of cookie semantics: no domain,
//! path, expiry, SameSite or HttpOnly scoping is retained, and the last
//! write for a (session, origin, name) triple wins.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;

/// origin -> cookie name -> cookie value. BTreeMap keeps the serialized
/// Cookie header stable across repeated reads.
type Jar = HashMap<String, BTreeMap<String, String>>;

/// Thread-safe store of per-session cookie jars.
///
/// Operations against the same session id are serialized through that
/// session's mutex; operations against different sessions take different
/// entries and proceed independently. There is no global lock.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<String, Arc<Mutex<Jar>>>,
}

impl SessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the `Cookie` header value for an origin under a session:
    /// `name=value; name2=value2`, empty string if nothing is stored.
    ///
    /// Unknown sessions and origins are treated as empty, never as errors.
    pub fn cookie_header(&self, sid: &str, origin: &str) -> String {
        let Some(jar) = self.sessions.get(sid) else {
            return String::new();
        };
        let jar = jar.lock().expect("session jar mutex poisoned");
        match jar.get(origin) {
            Some(cookies) => cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; "),
            None => String::new(),
        }
    }

    /// Merge raw `Set-Cookie` values into the jar for (session, origin).
    ///
    /// Each value is parsed as `name=value` up to the first `;`; attributes
    /// are ignored. Unparsable entries are silently skipped. Valid entries
    /// overwrite any existing value for that name.
    pub fn merge_set_cookies(&self, sid: &str, origin: &str, raw_values: &[String]) {
        if raw_values.is_empty() {
            return;
        }
        let jar = self
            .sessions
            .entry(sid.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Jar::new())))
            .clone();
        let mut jar = jar.lock().expect("session jar mutex poisoned");
        let cookies = jar.entry(origin.to_string()).or_default();
        for raw in raw_values {
            if let Some((name, value)) = parse_set_cookie(raw) {
                cookies.insert(name, value);
            }
        }
    }

    /// Number of sessions holding at least one jar.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

/// Extract the `name=value` pair from a raw `Set-Cookie` value, ignoring
/// `;`-separated attributes. Returns `None` when there is no `=` before
/// the first `;` or the name is empty.
fn parse_set_cookie(raw: &str) -> Option<(String, String)> {
    let pair = raw.split(';').next().unwrap_or("");
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: &str = "https://a.example";

    #[test]
    fn test_unknown_session_and_origin_read_empty() {
        let store = SessionStore::new();
        assert_eq!(store.cookie_header("nope", ORIGIN), "");

        store.merge_set_cookies("s1", ORIGIN, &["a=1".into()]);
        assert_eq!(store.cookie_header("s1", "https://other.example"), "");
    }

    #[test]
    fn test_merge_and_read() {
        let store = SessionStore::new();
        store.merge_set_cookies(
            "s1",
            ORIGIN,
            &["a=1; Path=/; HttpOnly".into(), "b=2; Secure".into()],
        );
        assert_eq!(store.cookie_header("s1", ORIGIN), "a=1; b=2");
    }

    #[test]
    fn test_last_write_wins() {
        let store = SessionStore::new();
        store.merge_set_cookies("s1", ORIGIN, &["a=1".into()]);
        store.merge_set_cookies("s1", ORIGIN, &["a=2".into()]);
        assert_eq!(store.cookie_header("s1", ORIGIN), "a=2");
    }

    #[test]
    fn test_unparsable_entries_skipped() {
        let store = SessionStore::new();
        store.merge_set_cookies(
            "s1",
            ORIGIN,
            &[
                "garbage".into(),
                "; Path=/".into(),
                "=orphan".into(),
                "good=yes".into(),
            ],
        );
        assert_eq!(store.cookie_header("s1", ORIGIN), "good=yes");
    }

    #[test]
    fn test_session_isolation() {
        let store = SessionStore::new();
        store.merge_set_cookies("session-a", ORIGIN, &["a=1".into()]);
        assert_eq!(store.cookie_header("session-a", ORIGIN), "a=1");
        assert_eq!(store.cookie_header("session-b", ORIGIN), "");
    }

    #[test]
    fn test_value_with_equals_preserved() {
        let store = SessionStore::new();
        store.merge_set_cookies("s1", ORIGIN, &["tok=abc=def==".into()]);
        assert_eq!(store.cookie_header("s1", ORIGIN), "tok=abc=def==");
    }
}
