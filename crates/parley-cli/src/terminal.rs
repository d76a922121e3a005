use std::io;

use console::Term;
use inquire::InquireError;
use parley_core::{Choice, ParleyError, Prompter, Renderer, Result};

use crate::markdown::render_markdown;
use crate::theme::Theme;

// ── Prompts ─────────────────────────────────────────────────────────────

/// Prompts through `inquire`. Esc dismisses a widget, Ctrl-C aborts the run.
#[derive(Default)]
pub struct InquirePrompter;

impl InquirePrompter {
    pub fn new() -> Self {
        Self
    }
}

fn map_inquire_error(err: InquireError) -> ParleyError {
    match err {
        InquireError::OperationInterrupted => ParleyError::Aborted,
        other => ParleyError::Input(other.to_string()),
    }
}

impl Prompter for InquirePrompter {
    fn text(&mut self, message: &str) -> Result<Option<String>> {
        inquire::Text::new(message)
            .prompt_skippable()
            .map_err(map_inquire_error)
    }

    fn select(&mut self, message: &str, choices: &[Choice]) -> Result<Option<String>> {
        let picked = inquire::Select::new(message, choices.to_vec())
            .with_page_size(choices.len().clamp(1, 12))
            .prompt_skippable()
            .map_err(map_inquire_error)?;
        Ok(picked.map(|choice| choice.value))
    }
}

// ── Output ──────────────────────────────────────────────────────────────

/// Writes the conversation to stdout with `console` styling.
pub struct ConsoleRenderer {
    term: Term,
    theme: Theme,
    busy: bool,
}

impl ConsoleRenderer {
    pub fn new(theme: Theme) -> Self {
        Self {
            term: Term::stdout(),
            theme,
            busy: false,
        }
    }

    fn line(&self, text: &str) {
        written(self.term.write_line(text));
    }
}

/// Terminal writes are best effort; a failure is only logged.
fn written(result: io::Result<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!("Terminal write failed: {}", e);
            false
        }
    }
}

impl Renderer for ConsoleRenderer {
    fn banner(&mut self, title: &str) {
        self.line(&self.theme.title.apply_to(title).to_string());
    }

    fn user_turn(&mut self, content: &str) {
        self.line("");
        self.line(&self.theme.user.apply_to("You").to_string());
        self.line(content);
    }

    fn assistant_turn(&mut self, name: &str, content: &str) {
        self.line("");
        self.line(&self.theme.assistant.apply_to(name).to_string());
        self.line(&render_markdown(content, &self.theme));
    }

    fn reply_start(&mut self, name: &str) {
        self.line("");
        self.line(&self.theme.assistant.apply_to(name).to_string());
    }

    fn fragment(&mut self, text: &str) {
        written(self.term.write_str(text));
    }

    fn reply_end(&mut self) {
        self.line("");
    }

    fn busy(&mut self, message: &str) {
        written(
            self.term
                .write_str(&self.theme.busy.apply_to(message).to_string()),
        );
        self.busy = true;
    }

    fn idle(&mut self) {
        if self.busy {
            written(self.term.clear_line());
            self.busy = false;
        }
    }

    fn notice(&mut self, message: &str) {
        self.line("");
        self.line(&self.theme.notice.apply_to(message).to_string());
    }

    fn error(&mut self, message: &str) {
        self.line("");
        self.line(
            &self
                .theme
                .error
                .apply_to(format!("Error: {message}"))
                .to_string(),
        );
    }
}
