pub mod error;
pub mod llm;
pub mod session;
pub mod chat;
pub mod config;

// Re-export key types
pub use error::{ParleyError, Result};
pub use llm::{ClaudeClient, LlmClient, Message, Role, StreamEvent};
pub use session::{Session, SessionCollection, SessionStore};
pub use chat::{aggregate, ChatState, Choice, ConversationController, Prompter, Renderer};
pub use config::Settings;
