use std::fmt;

use crate::error::Result;

/// One entry of a single-choice prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub label: String,
    pub value: String,
}

impl Choice {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Collects user input.
///
/// `Ok(None)` means the user dismissed the widget. An interrupt must surface
/// as [`ParleyError::Aborted`](crate::ParleyError::Aborted); a terminal that cannot
/// prompt at all as [`ParleyError::Input`](crate::ParleyError::Input).
pub trait Prompter {
    fn text(&mut self, message: &str) -> Result<Option<String>>;

    /// Returns the `value` of the chosen entry.
    fn select(&mut self, message: &str, choices: &[Choice]) -> Result<Option<String>>;
}

/// Displays the conversation.
pub trait Renderer {
    fn banner(&mut self, title: &str);

    /// A past or just-sent user turn.
    fn user_turn(&mut self, content: &str);

    /// A complete assistant turn, rendered as markdown.
    fn assistant_turn(&mut self, name: &str, content: &str);

    /// Header printed before a streamed reply.
    fn reply_start(&mut self, name: &str);

    fn fragment(&mut self, text: &str);

    fn reply_end(&mut self);

    /// Show the working indicator. Cleared by [`Renderer::idle`].
    fn busy(&mut self, message: &str);

    /// Hide the working indicator. Safe to call when it is not shown.
    fn idle(&mut self);

    fn notice(&mut self, message: &str);

    fn error(&mut self, message: &str);
}
