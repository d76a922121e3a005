use futures::{Stream, StreamExt};

use crate::error::{ParleyError, Result};
use crate::llm::StreamEvent;

/// Collect a streamed reply into one string, handing each fragment to
/// `on_fragment` as it arrives.
///
/// Fragments are concatenated in arrival order; empty ones are skipped. The
/// stream must finish with [`StreamEvent::Done`]: an error event, or the
/// producer going away early, discards the partial text and returns an error.
pub async fn aggregate<S, F>(mut stream: S, mut on_fragment: F) -> Result<String>
where
    S: Stream<Item = StreamEvent> + Unpin,
    F: FnMut(&str),
{
    let mut content = String::new();

    while let Some(event) = stream.next().await {
        match event {
            StreamEvent::TextDelta(delta) => {
                if delta.is_empty() {
                    continue;
                }
                on_fragment(&delta);
                content.push_str(&delta);
            }
            StreamEvent::Done => return Ok(content),
            StreamEvent::Error(err) => return Err(ParleyError::Llm(err)),
        }
    }

    Err(ParleyError::Llm(
        "response stream closed before completion".to_string(),
    ))
}
