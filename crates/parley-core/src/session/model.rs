use chrono::{DateTime, NaiveDateTime};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::llm::{Message, Role};

const PREVIEW_CHARS: usize = 35;

/// The persisted record of one conversation.
///
/// `message_count` is not stored on the struct: it is derived from `history`
/// whenever the record is written, and the value found on disk is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "SessionRecord")]
pub struct Session {
    pub id: String,
    pub created_at: String,
    pub history: Vec<Message>,
    pub first_message: String,
    pub last_message: String,
}

/// On-disk shape, validated before it becomes a [`Session`].
#[derive(Deserialize)]
struct SessionRecord {
    id: String,
    created_at: String,
    history: Vec<Message>,
    #[serde(default)]
    first_message: String,
    #[serde(default)]
    last_message: String,
    #[serde(default)]
    #[allow(dead_code)]
    message_count: usize,
}

impl TryFrom<SessionRecord> for Session {
    type Error = String;

    fn try_from(record: SessionRecord) -> Result<Self, Self::Error> {
        if record.history.len() % 2 != 0 {
            return Err(format!(
                "session {} has an odd number of turns ({})",
                record.id,
                record.history.len()
            ));
        }
        for (i, turn) in record.history.iter().enumerate() {
            let expected = if i % 2 == 0 { Role::User } else { Role::Assistant };
            if turn.role != expected {
                return Err(format!(
                    "session {}: turn {} should be {:?}, found {:?}",
                    record.id, i, expected, turn.role
                ));
            }
        }

        Ok(Self {
            id: record.id,
            created_at: record.created_at,
            history: record.history,
            first_message: record.first_message,
            last_message: record.last_message,
        })
    }
}

impl Serialize for Session {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Session", 6)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("created_at", &self.created_at)?;
        state.serialize_field("history", &self.history)?;
        state.serialize_field("first_message", &self.first_message)?;
        state.serialize_field("last_message", &self.last_message)?;
        state.serialize_field("message_count", &self.message_count())?;
        state.end()
    }
}

impl Session {
    pub fn new(id: impl Into<String>, created_at: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: created_at.into(),
            history: Vec::new(),
            first_message: String::new(),
            last_message: String::new(),
        }
    }

    /// Completed request/response pairs.
    pub fn message_count(&self) -> usize {
        self.history.len() / 2
    }

    /// Write the controller's working copy back into this record after a
    /// completed exchange whose user turn was `user_input`.
    pub fn commit_exchange(&mut self, history: &[Message], user_input: &str) {
        if self.history.is_empty() && self.first_message.is_empty() {
            self.first_message = user_input.to_string();
        }
        self.history = history.to_vec();
        self.last_message = user_input.to_string();
    }

    /// Creation time as `HH:MM:SS`, or the raw value when it does not parse.
    pub fn created_time(&self) -> String {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&self.created_at) {
            return dt.format("%H:%M:%S").to_string();
        }
        // Timestamps written without an offset.
        if let Ok(dt) = NaiveDateTime::parse_from_str(&self.created_at, "%Y-%m-%dT%H:%M:%S%.f") {
            return dt.format("%H:%M:%S").to_string();
        }
        self.created_at.clone()
    }

    /// One-line description used by the session picker.
    pub fn summary_label(&self) -> String {
        format!(
            "[{}] Messages: {:2} | First: {:<38} | Last: {}",
            self.created_time(),
            self.message_count(),
            preview(&self.first_message),
            preview(&self.last_message),
        )
    }
}

fn preview(text: &str) -> String {
    if text.is_empty() {
        return "...".to_string();
    }
    if text.chars().count() > PREVIEW_CHARS {
        let head: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}
