//! `ProviderStream`: raw provider bytes in, normalized events out.

use std::collections::VecDeque;
use std::time::Duration;

use bytes::Bytes;
use folio_wire::LineBuffer;
use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt};
use tracing::{debug, warn};

use crate::llm_client::shapes::decode_line;
use crate::llm_client::{LlmError, ModelProvider};

/// Provider-independent stream event. Exactly one `Done` ends every stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Text(String),
    Done,
}

pub struct ProviderStream {
    shape: ModelProvider,
    body: BoxStream<'static, Result<Bytes, LlmError>>,
    idle_timeout: Option<Duration>,
}

impl ProviderStream {
    pub fn new<S>(shape: ModelProvider, body: S) -> Self
    where
        S: Stream<Item = Result<Bytes, LlmError>> + Send + 'static,
    {
        Self {
            shape,
            body: body.boxed(),
            idle_timeout: None,
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = Some(idle_timeout);
        self
    }

    pub fn shape(&self) -> ModelProvider {
        self.shape
    }

    /// Normalized events. Ends after the first `Done`; a body that closes without
    /// a completion signal still gets one. Transport errors and idle timeouts end
    /// the stream with an `Err` item instead.
    pub fn events(self) -> BoxStream<'static, Result<StreamEvent, LlmError>> {
        let state = DecodeState {
            shape: self.shape,
            body: self.body,
            idle_timeout: self.idle_timeout,
            lines: LineBuffer::new(),
            pending: VecDeque::new(),
            saw_done: false,
            finished: false,
        };
        stream::unfold(state, |mut st| async move {
            let item = st.next_item().await?;
            Some((item, st))
        })
        .boxed()
    }
}

struct DecodeState {
    shape: ModelProvider,
    body: BoxStream<'static, Result<Bytes, LlmError>>,
    idle_timeout: Option<Duration>,
    lines: LineBuffer,
    pending: VecDeque<StreamEvent>,
    saw_done: bool,
    finished: bool,
}

impl DecodeState {
    async fn next_item(&mut self) -> Option<Result<StreamEvent, LlmError>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                if event == StreamEvent::Done {
                    self.finished = true;
                    self.pending.clear();
                }
                return Some(Ok(event));
            }
            if self.finished {
                return None;
            }

            match self.next_chunk().await {
                Ok(Some(chunk)) => {
                    for line in self.lines.push(&chunk) {
                        self.accept_line(&line);
                    }
                }
                Ok(None) => {
                    if let Some(rest) = self.lines.finish() {
                        self.accept_line(&rest);
                    }
                    if !self.saw_done {
                        debug!("{} stream closed without completion signal", self.shape);
                        self.pending.push_back(StreamEvent::Done);
                        self.saw_done = true;
                    }
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
    }

    async fn next_chunk(&mut self) -> Result<Option<Bytes>, LlmError> {
        let next = match self.idle_timeout {
            Some(limit) => tokio::time::timeout(limit, self.body.next())
                .await
                .map_err(|_| LlmError::Timeout(limit))?,
            None => self.body.next().await,
        };
        next.transpose()
    }

    fn accept_line(&mut self, line: &str) {
        if self.saw_done {
            return;
        }
        match decode_line(self.shape, line) {
            Ok(events) => {
                for event in events {
                    let done = event == StreamEvent::Done;
                    self.pending.push_back(event);
                    if done {
                        self.saw_done = true;
                        break;
                    }
                }
            }
            Err(LlmError::Parse(e)) => {
                let preview: String = line.chars().take(200).collect();
                warn!("Dropping malformed {} line: {e}; line: {preview}", self.shape);
            }
            Err(e) => {
                warn!("{} stream error: {e}", self.shape);
                self.pending.push_back(StreamEvent::Done);
                self.saw_done = true;
            }
        }
    }
}
