//! Recording doubles for the notification, waiver and token ports.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::ports::{Notifier, NotifyError, WaiverError, WaiverRenderer};
use crate::domain::{Entity, LoginToken, Member, TokenSource};

/// Message captured by [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    /// Recipient.
    pub address: String,
    /// Subject line.
    pub subject: String,
    /// Body text.
    pub body: String,
}

/// Notifier that keeps every message, optionally failing delivery.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentMessage>>,
    failing: bool,
}

impl RecordingNotifier {
    /// Notifier whose deliveries always fail after being recorded.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    /// Messages in send order.
    pub fn sent(&self) -> Vec<SentMessage> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(_) => panic!("notifier mutex"),
        }
    }

    /// Body of the most recent message.
    pub fn last_body(&self) -> Option<String> {
        self.sent().pop().map(|message| message.body)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, address: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        match self.sent.lock() {
            Ok(mut sent) => sent.push(SentMessage {
                address: address.to_owned(),
                subject: subject.to_owned(),
                body: body.to_owned(),
            }),
            Err(_) => panic!("notifier mutex"),
        }
        if self.failing {
            return Err(NotifyError::delivery("mailbox unavailable"));
        }
        Ok(())
    }
}

/// Renderer returning a link derived from the member's email.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticWaiverRenderer;

#[async_trait]
impl WaiverRenderer for StaticWaiverRenderer {
    async fn render(
        &self,
        member: &Entity<Member>,
        _signed_at: DateTime<Utc>,
    ) -> Result<String, WaiverError> {
        Ok(format!(
            "https://waivers.test/{}.pdf",
            member.body().email_address().as_str()
        ))
    }
}

/// Token source replaying a fixed sequence, then repeating the last token.
#[derive(Debug)]
pub struct FixedTokenSource(Mutex<VecDeque<LoginToken>>);

impl FixedTokenSource {
    /// Source yielding `tokens` in order.
    ///
    /// # Panics
    ///
    /// Panics when a token is not six digits or the list is empty.
    pub fn new<'a>(tokens: impl IntoIterator<Item = &'a str>) -> Self {
        let tokens: VecDeque<LoginToken> = tokens
            .into_iter()
            .map(|raw| match LoginToken::new(raw) {
                Ok(token) => token,
                Err(error) => panic!("fixture token `{raw}`: {error}"),
            })
            .collect();
        assert!(!tokens.is_empty(), "at least one fixture token");
        Self(Mutex::new(tokens))
    }
}

impl TokenSource for FixedTokenSource {
    fn next_token(&self) -> LoginToken {
        let mut tokens = match self.0.lock() {
            Ok(tokens) => tokens,
            Err(_) => panic!("token mutex"),
        };
        if tokens.len() > 1 {
            if let Some(token) = tokens.pop_front() {
                return token;
            }
        }
        match tokens.front() {
            Some(token) => token.clone(),
            None => panic!("token source exhausted"),
        }
    }
}
