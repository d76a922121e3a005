mod traits;
mod claude;

pub use traits::*;
pub use claude::{parse_sse_line, ClaudeClient};
