mod aggregator;
mod controller;
mod io;

pub use aggregator::aggregate;
pub use controller::{ChatState, ConversationController};
pub use io::{Choice, Prompter, Renderer};
