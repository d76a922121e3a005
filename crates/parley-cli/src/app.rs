use anyhow::Result;
use parley_core::{ConversationController, SessionCollection, SessionStore, Settings};

use crate::terminal::{ConsoleRenderer, InquirePrompter};
use crate::theme::Theme;

/// Which session the loop starts on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StartAt {
    /// A fresh session.
    #[default]
    New,
    /// The most recently created session, or a fresh one if there is none.
    Latest,
    /// A specific session id.
    Session(String),
}

// ── Interactive chat ────────────────────────────────────────────────────

pub async fn run_chat(settings: Settings, start: StartAt, theme: &str) -> Result<()> {
    // The credential is checked before any session is touched.
    let llm = settings.build_llm_client()?;
    let store = SessionStore::new(settings.sessions_file()?);
    tracing::info!(model = llm.model(), store = %store.path().display(), "Starting chat");

    let mut controller = ConversationController::new(
        Box::new(llm),
        store,
        Box::new(InquirePrompter::new()),
        Box::new(ConsoleRenderer::new(Theme::by_name(theme))),
        settings.chat.clone(),
    )?;

    match start {
        StartAt::New => {}
        StartAt::Latest => {
            if !controller.resume_latest()? {
                tracing::info!("No saved sessions, starting a new one");
            }
        }
        StartAt::Session(id) => controller.resume(&id)?,
    }

    controller.run().await?;
    Ok(())
}

// ── Session listing ─────────────────────────────────────────────────────

pub fn list_sessions(settings: &Settings) -> Result<()> {
    let store = SessionStore::new(settings.sessions_file()?);
    let sessions = store.load()?;
    if sessions.is_empty() {
        println!("No saved sessions in {}", store.path().display());
        return Ok(());
    }
    for line in session_lines(&sessions) {
        println!("{line}");
    }
    Ok(())
}

/// `<id>  <summary>` for every session, oldest first.
pub fn session_lines(sessions: &SessionCollection) -> Vec<String> {
    sessions
        .iter()
        .map(|s| format!("{}  {}", s.id, s.summary_label()))
        .collect()
}
