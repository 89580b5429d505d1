//! Scripted JSON transport.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::ports::{JsonRequest, JsonTransport, TransportError};

/// Transport that records requests and answers from a script.
///
/// Replies are consumed in order; an exhausted script answers `null`.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    replies: Mutex<VecDeque<Result<Value, TransportError>>>,
    requests: Mutex<Vec<JsonRequest>>,
}

impl RecordingTransport {
    /// Transport with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply.
    pub fn reply(self, body: Value) -> Self {
        self.push(Ok(body));
        self
    }

    /// Queue a failure.
    pub fn fail(self, error: TransportError) -> Self {
        self.push(Err(error));
        self
    }

    /// Queue a reply on a shared transport.
    pub fn push(&self, reply: Result<Value, TransportError>) {
        match self.replies.lock() {
            Ok(mut replies) => replies.push_back(reply),
            Err(_) => panic!("replies mutex"),
        }
    }

    /// Requests seen so far.
    pub fn requests(&self) -> Vec<JsonRequest> {
        match self.requests.lock() {
            Ok(requests) => requests.clone(),
            Err(_) => panic!("requests mutex"),
        }
    }

    /// Most recent request.
    ///
    /// # Panics
    ///
    /// Panics when nothing was sent.
    pub fn last_request(&self) -> JsonRequest {
        match self.requests().pop() {
            Some(request) => request,
            None => panic!("no request was sent"),
        }
    }
}

#[async_trait]
impl JsonTransport for RecordingTransport {
    async fn send(&self, request: JsonRequest) -> Result<Value, TransportError> {
        match self.requests.lock() {
            Ok(mut requests) => requests.push(request),
            Err(_) => panic!("requests mutex"),
        }
        match self.replies.lock() {
            Ok(mut replies) => replies.pop_front().unwrap_or(Ok(Value::Null)),
            Err(_) => panic!("replies mutex"),
        }
    }
}
