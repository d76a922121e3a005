use futures::channel::mpsc::{unbounded, UnboundedReceiver};
use parley_core::config::ChatSettings;
use parley_core::*;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Mock LLM that returns pre-programmed stream event sequences, in order.
/// `None` makes the request itself fail before any fragment is produced.
struct MockLlm {
    responses: Arc<Mutex<VecDeque<Option<Vec<StreamEvent>>>>>,
    requests: Arc<Mutex<Vec<Vec<Message>>>>,
}

impl MockLlm {
    fn new(responses: Vec<Option<Vec<StreamEvent>>>) -> (Self, Arc<Mutex<Vec<Vec<Message>>>>) {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let llm = Self {
            responses: Arc::new(Mutex::new(responses.into())),
            requests: requests.clone(),
        };
        (llm, requests)
    }
}

#[async_trait::async_trait]
impl LlmClient for MockLlm {
    async fn chat_stream(
        &self,
        messages: &[Message],
    ) -> Result<UnboundedReceiver<StreamEvent>> {
        self.requests.lock().unwrap().push(messages.to_vec());

        let events = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Some(vec![StreamEvent::Done]));
        let Some(events) = events else {
            return Err(ParleyError::Llm("Claude API error (529): overloaded".into()));
        };

        let (tx, rx) = unbounded();
        for event in events {
            tx.unbounded_send(event).unwrap();
        }
        Ok(rx)
    }
}

/// Answers prompts from a script; an exhausted script behaves like Ctrl-C.
struct ScriptedPrompter {
    answers: VecDeque<Option<String>>,
    selections: Arc<Mutex<Vec<Vec<Choice>>>>,
}

impl ScriptedPrompter {
    fn new(answers: &[Option<&str>]) -> (Self, Arc<Mutex<Vec<Vec<Choice>>>>) {
        let selections = Arc::new(Mutex::new(Vec::new()));
        let prompter = Self {
            answers: answers.iter().map(|a| a.map(str::to_string)).collect(),
            selections: selections.clone(),
        };
        (prompter, selections)
    }

    fn next(&mut self) -> Result<Option<String>> {
        self.answers.pop_front().ok_or(ParleyError::Aborted)
    }
}

impl Prompter for ScriptedPrompter {
    fn text(&mut self, _message: &str) -> Result<Option<String>> {
        self.next()
    }

    fn select(&mut self, _message: &str, choices: &[Choice]) -> Result<Option<String>> {
        self.selections.lock().unwrap().push(choices.to_vec());
        self.next()
    }
}

#[derive(Clone, Default)]
struct RecordingRenderer {
    events: Arc<Mutex<Vec<String>>>,
}

impl RecordingRenderer {
    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl Renderer for RecordingRenderer {
    fn banner(&mut self, title: &str) {
        self.push(format!("banner:{title}"));
    }
    fn user_turn(&mut self, content: &str) {
        self.push(format!("user:{content}"));
    }
    fn assistant_turn(&mut self, name: &str, content: &str) {
        self.push(format!("{name}:{content}"));
    }
    fn reply_start(&mut self, name: &str) {
        self.push(format!("reply_start:{name}"));
    }
    fn fragment(&mut self, text: &str) {
        self.push(format!("fragment:{text}"));
    }
    fn reply_end(&mut self) {
        self.push("reply_end".into());
    }
    fn busy(&mut self, message: &str) {
        self.push(format!("busy:{message}"));
    }
    fn idle(&mut self) {
        self.push("idle".into());
    }
    fn notice(&mut self, message: &str) {
        self.push(format!("notice:{message}"));
    }
    fn error(&mut self, message: &str) {
        self.push(format!("error:{message}"));
    }
}

fn reply(parts: &[&str]) -> Option<Vec<StreamEvent>> {
    let mut events: Vec<StreamEvent> = parts
        .iter()
        .map(|p| StreamEvent::TextDelta(p.to_string()))
        .collect();
    events.push(StreamEvent::Done);
    Some(events)
}

fn send(text: &'static str) -> [Option<&'static str>; 2] {
    [Some(text), Some("send")]
}

struct Harness {
    _dir: TempDir,
    store_path: std::path::PathBuf,
    renderer: RecordingRenderer,
    requests: Arc<Mutex<Vec<Vec<Message>>>>,
    selections: Arc<Mutex<Vec<Vec<Choice>>>>,
    controller: ConversationController,
}

fn harness(
    dir: TempDir,
    responses: Vec<Option<Vec<StreamEvent>>>,
    answers: &[Option<&str>],
) -> Harness {
    let store_path = dir.path().join("sessions.json");
    harness_at(dir, store_path, responses, answers)
}

fn harness_at(
    dir: TempDir,
    store_path: std::path::PathBuf,
    responses: Vec<Option<Vec<StreamEvent>>>,
    answers: &[Option<&str>],
) -> Harness {
    let (llm, requests) = MockLlm::new(responses);
    let (prompter, selections) = ScriptedPrompter::new(answers);
    let renderer = RecordingRenderer::default();

    let controller = ConversationController::new(
        Box::new(llm),
        SessionStore::new(&store_path),
        Box::new(prompter),
        Box::new(renderer.clone()),
        ChatSettings::default(),
    )
    .unwrap();

    Harness {
        _dir: dir,
        store_path,
        renderer,
        requests,
        selections,
        controller,
    }
}

// ========================================================================
// Conversation loop
// ========================================================================

#[tokio::test]
async fn test_first_turn_scenario() {
    let mut answers = send("hi").to_vec();
    answers.extend([Some(""), Some("exit")]);
    let mut h = harness(TempDir::new().unwrap(), vec![reply(&["Hel", "lo"])], &answers);

    h.controller.run().await.unwrap();

    let expected = vec![Message::user("hi"), Message::assistant("Hello")];
    assert_eq!(h.controller.history(), expected.as_slice());

    let reloaded = SessionStore::new(&h.store_path).load().unwrap();
    assert_eq!(reloaded.len(), 1);
    let session = reloaded.iter().next().unwrap();
    assert_eq!(session.history, expected);
    assert_eq!(session.first_message, "hi");
    assert_eq!(session.last_message, "hi");
    assert_eq!(session.message_count(), 1);

    let events = h.renderer.events();
    assert_eq!(events[0], "banner:Terminal Chat");
    assert!(events.contains(&"fragment:Hel".to_string()));
    assert!(events.contains(&"fragment:lo".to_string()));
    assert!(events.contains(&"busy:Claude is thinking...".to_string()));
}

#[tokio::test]
async fn test_request_carries_full_history() {
    let mut answers = send("one").to_vec();
    answers.extend(send("two"));
    let mut h = harness(
        TempDir::new().unwrap(),
        vec![reply(&["first"]), reply(&["second"])],
        &answers,
    );

    h.controller.run().await.unwrap();

    let requests = h.requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0], vec![Message::user("one")]);
    assert_eq!(
        requests[1],
        vec![
            Message::user("one"),
            Message::assistant("first"),
            Message::user("two"),
        ]
    );

    let session = h.controller.current_session().unwrap();
    assert_eq!(session.first_message, "one");
    assert_eq!(session.last_message, "two");
    assert_eq!(session.message_count(), 2);
    assert_eq!(session.history.len() % 2, 0);
}

#[tokio::test]
async fn test_failed_request_drops_turn_without_writing() {
    let mut h = harness(TempDir::new().unwrap(), vec![None], &send("doomed"));

    // Session creation writes the file; remove it to observe any later write.
    h.controller.step(ChatState::NoActiveSession).await.unwrap();
    std::fs::remove_file(&h.store_path).unwrap();

    let state = h.controller.step(ChatState::AwaitingInput).await.unwrap();
    assert_eq!(state, ChatState::AwaitingResponse("doomed".into()));
    let state = h.controller.step(state).await.unwrap();

    assert_eq!(state, ChatState::AwaitingInput);
    assert!(h.controller.history().is_empty());
    assert!(!h.store_path.exists(), "failed turn must not persist");
    let session = h.controller.current_session().unwrap();
    assert_eq!(session.first_message, "");
    assert!(h
        .renderer
        .events()
        .iter()
        .any(|e| e.starts_with("error:") && e.contains("overloaded")));
}

#[tokio::test]
async fn test_mid_stream_failure_drops_partial_reply() {
    let partial = Some(vec![
        StreamEvent::TextDelta("half a ".into()),
        StreamEvent::Error("connection reset".into()),
    ]);
    let mut answers = send("first").to_vec();
    answers.extend(send("second"));
    let mut h = harness(
        TempDir::new().unwrap(),
        vec![reply(&["ok"]), partial],
        &answers,
    );

    h.controller.run().await.unwrap();

    let expected = vec![Message::user("first"), Message::assistant("ok")];
    assert_eq!(h.controller.history(), expected.as_slice());
    let reloaded = SessionStore::new(&h.store_path).load().unwrap();
    let session = reloaded.iter().next().unwrap();
    assert_eq!(session.history, expected);
    assert_eq!(session.last_message, "first");
}

#[tokio::test]
async fn test_empty_message_is_forwarded() {
    let mut h = harness(TempDir::new().unwrap(), vec![reply(&["?"])], &send(""));

    h.controller.run().await.unwrap();

    assert_eq!(h.requests.lock().unwrap()[0], vec![Message::user("")]);
    assert_eq!(h.controller.current_session().unwrap().message_count(), 1);
}

#[tokio::test]
async fn test_dismissed_prompts_reprompt() {
    let answers = [None, Some("hello"), None, Some("hi"), Some("send")];
    let mut h = harness(TempDir::new().unwrap(), vec![reply(&["yo"])], &answers);

    h.controller.run().await.unwrap();

    let requests = h.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0], vec![Message::user("hi")]);
}

#[tokio::test]
async fn test_exit_and_interrupt_terminate() {
    let mut h = harness(TempDir::new().unwrap(), vec![], &[Some(""), Some("exit")]);
    h.controller.run().await.unwrap();
    assert!(!h.renderer.events().contains(&"notice:Exiting...".to_string()));

    // Script runs dry immediately: behaves like Ctrl-C at the prompt.
    let mut h = harness(TempDir::new().unwrap(), vec![], &[]);
    h.controller.run().await.unwrap();
    assert!(h.renderer.events().contains(&"notice:Exiting...".to_string()));
    assert_eq!(h.controller.sessions().len(), 1);
}

// ========================================================================
// Session management
// ========================================================================

#[tokio::test]
async fn test_unwritable_store_keeps_new_session_active() {
    let dir = TempDir::new().unwrap();
    // A regular file where the sessions directory should be.
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "").unwrap();
    let store_path = blocker.join("sessions.json");

    let mut h = harness_at(dir, store_path, vec![reply(&["Hello"])], &send("hi"));
    h.controller.run().await.unwrap();

    assert_eq!(h.requests.lock().unwrap().len(), 1);
    assert_eq!(h.controller.sessions().len(), 1);
    let current = h.controller.current_session().expect("session stays active");
    assert_eq!(current.message_count(), 1);
    assert_eq!(current.first_message, "hi");
    assert_eq!(
        h.controller.history(),
        &[Message::user("hi"), Message::assistant("Hello")]
    );

    let errors: Vec<String> = h
        .renderer
        .events()
        .into_iter()
        .filter(|e| e.starts_with("error:"))
        .collect();
    // Creation and the committed turn each fail to save; nothing else goes wrong.
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|e| e.contains("Persistence error")));
}

#[tokio::test]
async fn test_new_intent_switches_even_when_save_fails() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "").unwrap();

    let mut answers = send("hi").to_vec();
    answers.extend([Some(""), Some("new")]);
    let mut h = harness_at(dir, blocker.join("sessions.json"), vec![reply(&["Hello"])], &answers);
    h.controller.run().await.unwrap();

    let sessions: Vec<String> = h.controller.sessions().iter().map(|s| s.id.clone()).collect();
    assert_eq!(sessions.len(), 2);
    assert_eq!(h.controller.current_session().unwrap().id, sessions[1]);
    assert!(h.controller.history().is_empty());
}

#[tokio::test]
async fn test_new_session_intent_creates_and_persists() {
    let mut answers = send("hi").to_vec();
    answers.extend([Some(""), Some("new")]);
    let mut h = harness(TempDir::new().unwrap(), vec![reply(&["Hello"])], &answers);

    h.controller.run().await.unwrap();

    assert!(h.controller.history().is_empty());
    let reloaded = SessionStore::new(&h.store_path).load().unwrap();
    assert_eq!(reloaded.len(), 2);
    let latest = reloaded.latest().unwrap();
    assert_eq!(latest.id, h.controller.current_session().unwrap().id);
    assert_eq!(latest.message_count(), 0);
}

#[tokio::test]
async fn test_switch_loads_history_and_continues() {
    let dir = TempDir::new().unwrap();
    let store = SessionStore::new(dir.path().join("sessions.json"));
    let mut sessions = SessionCollection::new();
    let old = store.create_session(&mut sessions).unwrap();
    {
        let session = sessions.get_mut(&old.id).unwrap();
        let history = vec![Message::user("earlier"), Message::assistant("reply")];
        session.commit_exchange(&history, "earlier");
    }
    store.save(&sessions).unwrap();

    let mut answers = vec![Some(""), Some("switch"), Some(old.id.as_str())];
    answers.extend(send("again"));
    let mut h = harness(dir, vec![reply(&["sure"])], &answers);

    h.controller.run().await.unwrap();

    // The picker listed both sessions plus the create entry.
    let selections = h.selections.lock().unwrap();
    let picker = &selections[1];
    assert_eq!(picker.len(), 3);
    assert_eq!(picker[0].value, old.id);
    assert_eq!(picker[2].value, "new");
    assert!(picker[0].label.contains("Messages:  1"));

    assert!(h.renderer.events().contains(&"user:earlier".to_string()));
    assert!(h.renderer.events().contains(&"Claude:reply".to_string()));

    assert_eq!(
        h.requests.lock().unwrap()[0],
        vec![
            Message::user("earlier"),
            Message::assistant("reply"),
            Message::user("again"),
        ]
    );

    let reloaded = store.load().unwrap();
    let resumed = reloaded.get(&old.id).unwrap();
    assert_eq!(resumed.message_count(), 2);
    assert_eq!(resumed.first_message, "earlier");
    assert_eq!(resumed.last_message, "again");
    assert_eq!(reloaded.len(), 2);
}

#[tokio::test]
async fn test_switch_picker_limits_to_recent_sessions() {
    let dir = TempDir::new().unwrap();
    let store = SessionStore::new(dir.path().join("sessions.json"));
    let mut sessions = SessionCollection::new();
    for _ in 0..12 {
        store.create_session(&mut sessions).unwrap();
    }
    let ids: Vec<String> = sessions.iter().map(|s| s.id.clone()).collect();

    let mut h = harness(dir, vec![], &[Some(""), Some("switch"), None]);
    h.controller.run().await.unwrap();

    let selections = h.selections.lock().unwrap();
    let picker = &selections[1];
    assert_eq!(picker.len(), 11);
    // Twelve loaded plus the one created at startup; the newest ten are offered.
    assert_eq!(picker[0].value, ids[3]);
    assert_eq!(picker[8].value, ids[11]);
}

#[tokio::test]
async fn test_resume_replays_transcript() {
    let dir = TempDir::new().unwrap();
    let store = SessionStore::new(dir.path().join("sessions.json"));
    let mut sessions = SessionCollection::new();
    let session = store.create_session(&mut sessions).unwrap();
    sessions
        .get_mut(&session.id)
        .unwrap()
        .commit_exchange(&[Message::user("q"), Message::assistant("**a**")], "q");
    store.save(&sessions).unwrap();

    let mut h = harness(dir, vec![], &[]);
    assert!(h.controller.resume_latest().unwrap());
    h.controller.run().await.unwrap();

    let events = h.renderer.events();
    assert_eq!(&events[..3], &["banner:Terminal Chat", "user:q", "Claude:**a**"]);
    assert_eq!(h.controller.sessions().len(), 1, "resuming must not create a session");
}

#[tokio::test]
async fn test_resume_unknown_session_is_config_error() {
    let mut h = harness(TempDir::new().unwrap(), vec![], &[]);
    let err = h.controller.resume("19990101_000000_000-dead").unwrap_err();
    assert!(matches!(err, ParleyError::Config(_)));
}

#[tokio::test]
async fn test_corrupt_store_fails_construction() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sessions.json");
    std::fs::write(&path, "[1, 2, 3]").unwrap();

    let (llm, _) = MockLlm::new(vec![]);
    let (prompter, _) = ScriptedPrompter::new(&[]);
    let result = ConversationController::new(
        Box::new(llm),
        SessionStore::new(&path),
        Box::new(prompter),
        Box::new(RecordingRenderer::default()),
        ChatSettings::default(),
    );
    assert!(matches!(result, Err(ParleyError::Persistence(_))));
}
