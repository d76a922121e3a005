use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use super::model::Session;

/// All sessions keyed by id, kept in insertion (creation) order.
///
/// Serialises as a single JSON object `id -> Session`; document order is
/// preserved in both directions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionCollection {
    sessions: Vec<Session>,
}

impl SessionCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Session> {
        self.sessions.iter_mut().find(|s| s.id == id)
    }

    /// Insert a session. An existing entry with the same id is replaced in
    /// place (last write wins, original position kept).
    pub fn insert(&mut self, session: Session) {
        match self.position(&session.id) {
            Some(index) => self.sessions[index] = session,
            None => self.sessions.push(session),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.iter()
    }

    /// The most recently created `limit` sessions, oldest first.
    pub fn recent(&self, limit: usize) -> &[Session] {
        let start = self.sessions.len().saturating_sub(limit);
        &self.sessions[start..]
    }

    pub fn latest(&self) -> Option<&Session> {
        self.sessions.last()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.sessions.iter().position(|s| s.id == id)
    }
}

impl Serialize for SessionCollection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.sessions.len()))?;
        for session in &self.sessions {
            map.serialize_entry(&session.id, session)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SessionCollection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CollectionVisitor;

        impl<'de> Visitor<'de> for CollectionVisitor {
            type Value = SessionCollection;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of session id to session")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut collection = SessionCollection::new();
                while let Some((key, session)) = access.next_entry::<String, Session>()? {
                    if key != session.id {
                        return Err(serde::de::Error::custom(format!(
                            "session stored under key {key} has id {}",
                            session.id
                        )));
                    }
                    if collection.contains(&key) {
                        return Err(serde::de::Error::custom(format!(
                            "duplicate session id {key}"
                        )));
                    }
                    collection.sessions.push(session);
                }
                Ok(collection)
            }
        }

        deserializer.deserialize_map(CollectionVisitor)
    }
}

impl<'a> IntoIterator for &'a SessionCollection {
    type Item = &'a Session;
    type IntoIter = std::slice::Iter<'a, Session>;

    fn into_iter(self) -> Self::IntoIter {
        self.sessions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(id: &str) -> Session {
        Session::new(id, "2024-01-01T12:00:00+00:00")
    }

    #[test]
    fn test_insert_keeps_creation_order() {
        let mut sessions = SessionCollection::new();
        sessions.insert(session("b"));
        sessions.insert(session("a"));
        sessions.insert(session("c"));

        let ids: Vec<&str> = sessions.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_insert_same_id_overwrites_in_place() {
        let mut sessions = SessionCollection::new();
        sessions.insert(session("a"));
        sessions.insert(session("b"));

        let mut replacement = session("a");
        replacement.last_message = "replaced".to_string();
        sessions.insert(replacement);

        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions.iter().next().unwrap().last_message, "replaced");
    }

    #[test]
    fn test_recent_takes_tail() {
        let mut sessions = SessionCollection::new();
        for i in 0..15 {
            sessions.insert(session(&format!("s{i:02}")));
        }

        let recent = sessions.recent(10);
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].id, "s05");
        assert_eq!(recent[9].id, "s14");
        assert_eq!(sessions.recent(50).len(), 15);
        assert_eq!(sessions.latest().unwrap().id, "s14");
    }

    #[test]
    fn test_deserialize_preserves_document_order() {
        let json = r#"{
            "zeta": {"id": "zeta", "created_at": "t", "history": []},
            "alpha": {"id": "alpha", "created_at": "t", "history": []}
        }"#;
        let sessions: SessionCollection = serde_json::from_str(json).unwrap();
        let ids: Vec<&str> = sessions.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_deserialize_rejects_key_id_mismatch() {
        let json = r#"{"one": {"id": "two", "created_at": "t", "history": []}}"#;
        let err = serde_json::from_str::<SessionCollection>(json).unwrap_err();
        assert!(err.to_string().contains("has id two"));
    }

    #[test]
    fn test_deserialize_rejects_non_map() {
        assert!(serde_json::from_str::<SessionCollection>("[]").is_err());
    }
}
