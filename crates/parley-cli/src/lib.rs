// Library interface for parley-cli
// This allows integration tests to access the terminal front end.

pub mod app;
pub mod markdown;
pub mod terminal;
pub mod theme;

// Re-export commonly used items for easier testing
pub use app::{session_lines, StartAt};
pub use markdown::render_markdown;
pub use theme::Theme;
