//! Client Stream Consumer.
//!
//! A `ChatSession` owns the message history and drives one turn at a time:
//! it opens the stream, feeds bytes through the shared `FrameDecoder`, and
//! finalizes exactly one assistant message when the turn completes, is
//! cancelled with partial text, or fails.

use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use folio_wire::{FrameDecoder, PresentationTag, StreamFrame};
use futures::future::{AbortHandle, AbortRegistration, Abortable, Aborted};
use futures::StreamExt;
use serde_json::{json, Value};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::message::{ChatMessage, HistoryTurn};
use crate::transport::{ChatPayload, ChatTransport, TransportError};

/// Messages sent back to the server with each request.
pub const HISTORY_LIMIT: usize = 10;
pub const APOLOGY: &str = "Sorry, something went wrong. Please try again!";
pub const DEFAULT_GREETING: &str = "Hi there! Ask me anything about my work, projects or skills.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TurnState {
    #[default]
    Idle,
    Requesting,
    Streaming,
    Completed,
    Cancelled,
    Errored,
}

impl TurnState {
    pub fn is_in_flight(self) -> bool {
        matches!(self, TurnState::Requesting | TurnState::Streaming)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Completed,
    Cancelled,
    Errored,
    /// Empty input, a turn already in flight, or a greeting after history exists.
    Ignored,
}

/// Live updates for a renderer; the finalized message lands in history.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Component(PresentationTag),
    Text(String),
    /// Canned text appended without streaming (apology, default greeting).
    Notice(String),
}

#[derive(Debug, Clone, Default)]
pub struct ModelChoice {
    pub provider: Option<String>,
    pub model: Option<String>,
}

#[derive(Default)]
struct Inner {
    state: TurnState,
    /// Bumped per turn so a superseded turn can never touch the session.
    turn: u64,
    messages: Vec<ChatMessage>,
    component: Option<(PresentationTag, Value)>,
    streaming: String,
    abort: Option<AbortHandle>,
}

impl Inner {
    fn begin(&mut self) -> (u64, AbortRegistration) {
        let (handle, registration) = AbortHandle::new_pair();
        self.turn += 1;
        self.state = TurnState::Requesting;
        self.component = None;
        self.streaming.clear();
        self.abort = Some(handle);
        (self.turn, registration)
    }

    fn is_current(&self, turn: u64) -> bool {
        self.turn == turn && self.state.is_in_flight()
    }

    fn finish(&mut self, state: TurnState) -> (String, Option<(PresentationTag, Value)>) {
        self.state = state;
        self.abort = None;
        (mem::take(&mut self.streaming), self.component.take())
    }
}

enum TurnKind {
    Chat(ChatPayload),
    Greeting,
}

#[derive(Clone)]
pub struct ChatSession {
    transport: Arc<dyn ChatTransport>,
    model: ModelChoice,
    inner: Arc<Mutex<Inner>>,
    events: Option<UnboundedSender<SessionEvent>>,
}

impl ChatSession {
    pub fn new(transport: Arc<dyn ChatTransport>, model: ModelChoice) -> Self {
        Self {
            transport,
            model,
            inner: Arc::new(Mutex::new(Inner::default())),
            events: None,
        }
    }

    pub fn with_events(mut self, events: UnboundedSender<SessionEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn state(&self) -> TurnState {
        self.lock().state
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.lock().messages.clone()
    }

    pub fn streaming_text(&self) -> String {
        self.lock().streaming.clone()
    }

    /// Sends one user message and resolves when the turn ends.
    pub async fn send(&self, text: &str) -> SendOutcome {
        if text.trim().is_empty() {
            return SendOutcome::Ignored;
        }

        let (turn, registration, payload) = {
            let mut inner = self.lock();
            if inner.state.is_in_flight() {
                debug!("Send ignored: a turn is already in flight");
                return SendOutcome::Ignored;
            }
            let skip = inner.messages.len().saturating_sub(HISTORY_LIMIT);
            let history = inner.messages[skip..].iter().map(HistoryTurn::from).collect();
            inner.messages.push(ChatMessage::user(text));
            let (turn, registration) = inner.begin();
            let payload = ChatPayload {
                message: text.to_string(),
                history,
                model_provider: self.model.provider.clone(),
                model_name: self.model.model.clone(),
            };
            (turn, registration, payload)
        };

        self.run(turn, TurnKind::Chat(payload), registration).await
    }

    /// Streams the server greeting into an empty session.
    pub async fn load_greeting(&self) -> SendOutcome {
        let (turn, registration) = {
            let mut inner = self.lock();
            if inner.state.is_in_flight() || !inner.messages.is_empty() {
                return SendOutcome::Ignored;
            }
            inner.begin()
        };

        self.run(turn, TurnKind::Greeting, registration).await
    }

    /// Aborts the in-flight turn, keeping any text received so far.
    /// Returns false when nothing was in flight.
    pub fn cancel(&self) -> bool {
        let mut inner = self.lock();
        if !inner.state.is_in_flight() {
            return false;
        }
        if let Some(handle) = inner.abort.take() {
            handle.abort();
        }

        let (text, component) = inner.finish(TurnState::Cancelled);
        if !text.trim().is_empty() {
            inner
                .messages
                .push(ChatMessage::assistant(text, displayed(component)));
        }
        info!("Turn {} cancelled", inner.turn);
        true
    }

    async fn run(&self, turn: u64, kind: TurnKind, registration: AbortRegistration) -> SendOutcome {
        let greeting = matches!(kind, TurnKind::Greeting);
        match Abortable::new(self.drive(turn, kind), registration).await {
            Err(Aborted) => SendOutcome::Cancelled,
            Ok(Ok(())) => self.complete(turn, greeting),
            Ok(Err(e)) => self.fail(turn, greeting, e),
        }
    }

    async fn drive(&self, turn: u64, kind: TurnKind) -> Result<(), TransportError> {
        let mut body = match &kind {
            TurnKind::Chat(payload) => self.transport.chat(payload).await?,
            TurnKind::Greeting => self.transport.greeting().await?,
        };

        let mut decoder = FrameDecoder::new();
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            let frames = decoder.feed(&chunk);
            self.apply(turn, frames);
            if decoder.is_done() {
                return Ok(());
            }
        }

        decoder.finish();
        debug!("Stream closed without a done marker");
        Ok(())
    }

    fn apply(&self, turn: u64, frames: Vec<StreamFrame>) {
        let mut inner = self.lock();
        if !inner.is_current(turn) {
            return;
        }
        inner.state = TurnState::Streaming;

        for frame in frames {
            match frame {
                StreamFrame::Metadata {
                    component_type,
                    data,
                } => {
                    if inner.component.is_some() {
                        warn!("Ignoring repeated metadata frame ({component_type})");
                        continue;
                    }
                    inner.component = Some((component_type, data));
                    self.emit(SessionEvent::Component(component_type));
                }
                StreamFrame::Text { content } => {
                    inner.streaming.push_str(&content);
                    self.emit(SessionEvent::Text(content));
                }
            }
        }
    }

    fn complete(&self, turn: u64, greeting: bool) -> SendOutcome {
        let mut inner = self.lock();
        if !inner.is_current(turn) {
            return SendOutcome::Cancelled;
        }

        let (text, component) = inner.finish(TurnState::Completed);
        let component = displayed(component);
        let message = if greeting {
            let text = if text.trim().is_empty() {
                self.emit(SessionEvent::Notice(DEFAULT_GREETING.to_string()));
                DEFAULT_GREETING.to_string()
            } else {
                text
            };
            let component = component.or_else(|| Some((PresentationTag::GreetingCard, json!({}))));
            ChatMessage::assistant(text, component)
        } else {
            ChatMessage::assistant(text, component)
        };
        inner.messages.push(message);
        SendOutcome::Completed
    }

    fn fail(&self, turn: u64, greeting: bool, error: TransportError) -> SendOutcome {
        let mut inner = self.lock();
        if !inner.is_current(turn) {
            return SendOutcome::Cancelled;
        }
        warn!("Turn {turn} failed: {error}");

        inner.finish(TurnState::Errored);
        let text = if greeting { DEFAULT_GREETING } else { APOLOGY };
        inner.messages.push(ChatMessage::assistant(text, None));
        self.emit(SessionEvent::Notice(text.to_string()));
        SendOutcome::Errored
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(events) = &self.events {
            // A closed receiver just means nobody is rendering.
            let _ = events.send(event);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// `chat-response` is the plain-text default and is never stored on a message.
fn displayed(component: Option<(PresentationTag, Value)>) -> Option<(PresentationTag, Value)> {
    component.filter(|(tag, _)| *tag != PresentationTag::ChatResponse)
}
