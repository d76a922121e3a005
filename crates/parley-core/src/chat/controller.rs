use chrono::Local;

use crate::chat::aggregate;
use crate::chat::io::{Choice, Prompter, Renderer};
use crate::config::ChatSettings;
use crate::error::{ParleyError, Result};
use crate::llm::{LlmClient, Message, Role};
use crate::session::{create_new_session, Session, SessionCollection, SessionStore};

const NEW_SESSION: &str = "new";

/// Where the interaction loop is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatState {
    NoActiveSession,
    AwaitingInput,
    /// A user turn is in flight; nothing about it has been committed yet.
    AwaitingResponse(String),
    Updating { user_input: String, reply: String },
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intent {
    Send,
    Switch,
    New,
    Exit,
}

/// Runs the chat loop over one active session at a time.
///
/// The controller owns the loaded [`SessionCollection`] and a working copy of
/// the current session's history; the two are reconciled before every save.
pub struct ConversationController {
    llm: Box<dyn LlmClient>,
    store: SessionStore,
    sessions: SessionCollection,
    current: Option<String>,
    history: Vec<Message>,
    prompter: Box<dyn Prompter>,
    renderer: Box<dyn Renderer>,
    settings: ChatSettings,
}

impl ConversationController {
    /// Load the collection from `store`. An unreadable store is fatal.
    pub fn new(
        llm: Box<dyn LlmClient>,
        store: SessionStore,
        prompter: Box<dyn Prompter>,
        renderer: Box<dyn Renderer>,
        settings: ChatSettings,
    ) -> Result<Self> {
        let sessions = store.load()?;
        Ok(Self {
            llm,
            store,
            sessions,
            current: None,
            history: Vec::new(),
            prompter,
            renderer,
            settings,
        })
    }

    pub fn sessions(&self) -> &SessionCollection {
        &self.sessions
    }

    pub fn current_session(&self) -> Option<&Session> {
        self.current.as_deref().and_then(|id| self.sessions.get(id))
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Make `id` the active session before the loop starts.
    pub fn resume(&mut self, id: &str) -> Result<()> {
        let session = self
            .sessions
            .get(id)
            .ok_or_else(|| ParleyError::Config(format!("Unknown session: {id}")))?;
        self.history = session.history.clone();
        self.current = Some(id.to_string());
        Ok(())
    }

    /// Resume the most recently created session, if there is one.
    pub fn resume_latest(&mut self) -> Result<bool> {
        let Some(id) = self.sessions.latest().map(|s| s.id.clone()) else {
            return Ok(false);
        };
        self.resume(&id)?;
        Ok(true)
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut state = if self.current.is_some() {
            ChatState::AwaitingInput
        } else {
            ChatState::NoActiveSession
        };

        self.renderer.banner("Terminal Chat");
        self.replay_history();

        while state != ChatState::Terminated {
            state = match self.step(state).await {
                Ok(next) => next,
                Err(ParleyError::Aborted) => {
                    self.renderer.notice("Exiting...");
                    ChatState::Terminated
                }
                Err(e @ ParleyError::Input(_)) => return Err(e),
                Err(e) => {
                    tracing::warn!("Turn failed: {}", e);
                    self.renderer.error(&e.to_string());
                    ChatState::AwaitingInput
                }
            };
        }

        Ok(())
    }

    /// Advance the state machine by one transition.
    pub async fn step(&mut self, state: ChatState) -> Result<ChatState> {
        match state {
            ChatState::NoActiveSession => {
                self.start_new_session()?;
                Ok(ChatState::AwaitingInput)
            }
            ChatState::AwaitingInput => self.await_input(),
            ChatState::AwaitingResponse(user_input) => self.request_reply(user_input).await,
            ChatState::Updating { user_input, reply } => {
                self.commit_turn(&user_input, reply)?;
                Ok(ChatState::AwaitingInput)
            }
            ChatState::Terminated => Ok(ChatState::Terminated),
        }
    }

    fn await_input(&mut self) -> Result<ChatState> {
        let Some(message) = self.prompter.text("You")? else {
            return Ok(ChatState::AwaitingInput);
        };

        let actions = [
            Choice::new("Send", "send"),
            Choice::new("Switch Session", "switch"),
            Choice::new("New Session", "new"),
            Choice::new("Exit", "exit"),
        ];
        let intent = match self.prompter.select("Actions", &actions)?.as_deref() {
            Some("send") => Intent::Send,
            Some("switch") => Intent::Switch,
            Some("new") => Intent::New,
            Some("exit") => Intent::Exit,
            _ => return Ok(ChatState::AwaitingInput),
        };

        match intent {
            Intent::Send => Ok(ChatState::AwaitingResponse(message)),
            Intent::Switch => {
                self.switch_session()?;
                Ok(ChatState::AwaitingInput)
            }
            Intent::New => {
                self.start_new_session()?;
                Ok(ChatState::AwaitingInput)
            }
            Intent::Exit => Ok(ChatState::Terminated),
        }
    }

    fn switch_session(&mut self) -> Result<()> {
        let mut choices: Vec<Choice> = self
            .sessions
            .recent(self.settings.recent_sessions)
            .iter()
            .map(|s| Choice::new(s.summary_label(), s.id.clone()))
            .collect();
        choices.push(Choice::new("Create New Session", NEW_SESSION));

        match self.prompter.select("Select a session", &choices)? {
            Some(value) if value == NEW_SESSION => self.start_new_session(),
            Some(id) => {
                self.resume(&id)?;
                self.replay_history();
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// The new session becomes current before it is saved, so a failed save
    /// leaves it active in memory for the next successful write to persist.
    fn start_new_session(&mut self) -> Result<()> {
        let session = create_new_session(&mut self.sessions, Local::now());
        tracing::debug!(id = %session.id, "Created session");
        self.current = Some(session.id);
        self.history.clear();
        self.store.save(&self.sessions)
    }

    async fn request_reply(&mut self, user_input: String) -> Result<ChatState> {
        let mut request = self.history.clone();
        request.push(Message::user(user_input.as_str()));

        let name = self.settings.assistant_name.clone();
        self.renderer.reply_start(&name);
        self.renderer.busy(&format!("{name} is thinking..."));

        let result = tokio::select! {
            reply = self.stream_reply(&request) => reply,
            _ = interrupted() => Err(ParleyError::Aborted),
        };
        self.renderer.idle();

        match result {
            Ok(reply) => {
                self.renderer.reply_end();
                Ok(ChatState::Updating { user_input, reply })
            }
            Err(ParleyError::Aborted) => Err(ParleyError::Aborted),
            Err(e) => {
                tracing::warn!("Request failed, dropping turn: {}", e);
                self.renderer.error(&e.to_string());
                Ok(ChatState::AwaitingInput)
            }
        }
    }

    async fn stream_reply(&mut self, request: &[Message]) -> Result<String> {
        let stream = self.llm.chat_stream(request).await?;

        let renderer = &mut self.renderer;
        let mut waiting = true;
        aggregate(stream, |fragment| {
            if waiting {
                renderer.idle();
                waiting = false;
            }
            renderer.fragment(fragment);
        })
        .await
    }

    fn commit_turn(&mut self, user_input: &str, reply: String) -> Result<()> {
        let id = self
            .current
            .clone()
            .ok_or_else(|| ParleyError::Other("No active session".to_string()))?;
        let session = self
            .sessions
            .get_mut(&id)
            .ok_or_else(|| ParleyError::Other(format!("Active session {id} is missing")))?;

        self.history.push(Message::user(user_input));
        self.history.push(Message::assistant(reply));
        session.commit_exchange(&self.history, user_input);

        self.store.save(&self.sessions)
    }

    fn replay_history(&mut self) {
        let Some(session) = self.current.as_deref().and_then(|id| self.sessions.get(id)) else {
            return;
        };
        for turn in &session.history {
            match turn.role {
                Role::User => self.renderer.user_turn(&turn.content),
                Role::Assistant => self
                    .renderer
                    .assistant_turn(&self.settings.assistant_name, &turn.content),
            }
        }
    }
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
///
/// The first call replaces the default SIGINT action for the rest of the
/// process. From then on Ctrl-C only ends the run while a reply is streaming
/// or while a prompt is open (the prompter reports it as `Aborted`); a press
/// between those points is consumed without effect.
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
