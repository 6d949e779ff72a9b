//! Scripted mock provider for tests.

use super::{
    ChatProvider, CompletionRequest, CompletionStream, ProviderError, StreamEvent,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Mock chat provider. Blocking replies are popped from a script queue
/// (falling back to a canned reply when the queue is empty); a stream
/// script, when set, is consumed by the next streaming call. Every
/// request received is recorded for assertions.
#[derive(Default)]
pub struct MockChatProvider {
    replies: Mutex<VecDeque<Result<String, ProviderError>>>,
    stream_script: Mutex<Option<Vec<Result<StreamEvent, ProviderError>>>>,
    stream_open_error: Mutex<Option<ProviderError>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockChatProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_reply(&self, text: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(text.to_string()));
    }

    pub fn push_error(&self, error: ProviderError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    /// Script the next streaming call. Without a script the stream yields
    /// three fragments and a terminator.
    pub fn set_stream_script(&self, events: Vec<Result<StreamEvent, ProviderError>>) {
        *self.stream_script.lock().unwrap() = Some(events);
    }

    /// Make the next streaming call fail before any event is produced.
    pub fn fail_stream_open(&self, error: ProviderError) {
        *self.stream_open_error.lock().unwrap() = Some(error);
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    fn record(&self, request: &CompletionRequest) {
        self.requests.lock().unwrap().push(request.clone());
    }
}

#[async_trait]
impl ChatProvider for MockChatProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        self.record(request);

        match self.replies.lock().unwrap().pop_front() {
            Some(result) => result,
            None => Ok("Mock reply".to_string()),
        }
    }

    async fn complete_stream(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionStream, ProviderError> {
        self.record(request);

        if let Some(error) = self.stream_open_error.lock().unwrap().take() {
            return Err(error);
        }

        let events = self.stream_script.lock().unwrap().take().unwrap_or_else(|| {
            vec![
                Ok(StreamEvent::Delta("Mock".to_string())),
                Ok(StreamEvent::Delta(" streaming".to_string())),
                Ok(StreamEvent::Delta(" reply".to_string())),
                Ok(StreamEvent::Done),
            ]
        });

        Ok(Box::pin(tokio_stream::iter(events)) as CompletionStream)
    }
}
