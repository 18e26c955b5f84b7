//! Test utilities for integration tests
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE};
use reqwest::StatusCode;
use tokio::sync::Notify;

use onleave::error::{MailError, Result};
use onleave::mailbox::{
    Label, LabelVisibility, Mailbox, Message, MessageHeader, MessageRef, Thread,
};

pub const MY_EMAIL: &str = "me@example.com";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Calls {
    pub list_unread: usize,
    pub get_message: usize,
    pub get_thread: usize,
    pub send_message: usize,
    pub list_labels: usize,
    pub create_label: usize,
    pub modify_message: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub raw: String,
    pub thread_id: String,
}

impl SentMessage {
    pub fn decoded(&self) -> String {
        let bytes = URL_SAFE
            .decode(self.raw.as_bytes())
            .expect("raw should be base64url");
        String::from_utf8(bytes).expect("raw should be utf-8")
    }
}

#[derive(Default)]
pub struct FakeState {
    pub unread: Vec<MessageRef>,
    pub messages: HashMap<String, Message>,
    pub threads: HashMap<String, Thread>,
    pub labels: Vec<Label>,
    pub sent: Vec<SentMessage>,
    pub modified: Vec<(String, Vec<String>)>,
    pub created_labels: Vec<(String, LabelVisibility)>,
    pub calls: Calls,
    /// Message ids whose fetch fails with a server error
    pub failing_messages: HashSet<String>,
    /// Message ids whose fetch fails with an expired token
    pub unauthorized_messages: HashSet<String>,
    /// Sends fail with a server error
    pub failing_sends: bool,
    /// Label listing, creation and message modify fail with a rate limit
    pub failing_label_ops: bool,
    /// When set, `list_unread` waits for a notification before returning
    pub list_gate: Option<Arc<Notify>>,
}

/// In-memory mailbox that records every call made against it.
#[derive(Default)]
pub struct FakeMailbox {
    state: Mutex<FakeState>,
}

impl FakeMailbox {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn calls(&self) -> Calls {
        self.state().calls.clone()
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.state().sent.clone()
    }

    /// Add an unread message with the usual headers. The thread is
    /// created with this message as its only entry unless it exists.
    pub fn add_unread(&self, id: &str, thread_id: &str, from: &str) {
        self.add_unread_with_headers(
            id,
            thread_id,
            vec![
                MessageHeader::new("From", from),
                MessageHeader::new("To", MY_EMAIL),
                MessageHeader::new("Subject", &format!("Subject of {}", id)),
            ],
        );
    }

    pub fn add_unread_with_headers(&self, id: &str, thread_id: &str, headers: Vec<MessageHeader>) {
        let message = Message {
            id: id.to_string(),
            thread_id: thread_id.to_string(),
            headers,
        };
        let mut state = self.state();
        state.unread.push(MessageRef {
            id: id.to_string(),
            thread_id: thread_id.to_string(),
        });
        state
            .threads
            .entry(thread_id.to_string())
            .or_insert_with(|| Thread {
                id: thread_id.to_string(),
                messages: Vec::new(),
            })
            .messages
            .push(message.clone());
        state.messages.insert(id.to_string(), message);
    }

    /// Append a reply to an existing thread.
    pub fn add_thread_reply(&self, thread_id: &str) {
        let mut state = self.state();
        let thread = state
            .threads
            .get_mut(thread_id)
            .expect("thread should exist");
        let n = thread.messages.len();
        thread.messages.push(Message {
            id: format!("{}_reply_{}", thread_id, n),
            thread_id: thread_id.to_string(),
            headers: vec![MessageHeader::new("From", MY_EMAIL)],
        });
    }

    /// Delete a label the way a user would from the Gmail UI.
    pub fn remove_label(&self, name: &str) {
        self.state().labels.retain(|l| l.name != name);
    }

    pub fn add_label(&self, id: &str, name: &str) {
        self.state().labels.push(Label {
            id: id.to_string(),
            name: name.to_string(),
        });
    }
}

fn rate_limited() -> MailError {
    MailError::Api {
        status: StatusCode::TOO_MANY_REQUESTS,
        body: "rateLimitExceeded".to_string(),
    }
}

#[async_trait]
impl Mailbox for FakeMailbox {
    async fn list_unread(&self) -> Result<Vec<MessageRef>> {
        let gate = {
            let mut state = self.state();
            state.calls.list_unread += 1;
            state.list_gate.clone()
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Ok(self.state().unread.clone())
    }

    async fn get_message(&self, id: &str) -> Result<Message> {
        let mut state = self.state();
        state.calls.get_message += 1;
        if state.unauthorized_messages.contains(id) {
            return Err(MailError::Auth {
                status: StatusCode::UNAUTHORIZED,
                body: "invalid credentials".to_string(),
            });
        }
        if state.failing_messages.contains(id) {
            return Err(MailError::Api {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: "backend error".to_string(),
            });
        }
        state.messages.get(id).cloned().ok_or(MailError::Api {
            status: StatusCode::NOT_FOUND,
            body: format!("no message {}", id),
        })
    }

    async fn get_thread(&self, thread_id: &str) -> Result<Thread> {
        let mut state = self.state();
        state.calls.get_thread += 1;
        state.threads.get(thread_id).cloned().ok_or(MailError::Api {
            status: StatusCode::NOT_FOUND,
            body: format!("no thread {}", thread_id),
        })
    }

    async fn send_message(&self, raw: &str, thread_id: &str) -> Result<()> {
        let mut state = self.state();
        state.calls.send_message += 1;
        if state.failing_sends {
            return Err(MailError::Api {
                status: StatusCode::SERVICE_UNAVAILABLE,
                body: "backendError".to_string(),
            });
        }
        state.sent.push(SentMessage {
            raw: raw.to_string(),
            thread_id: thread_id.to_string(),
        });
        Ok(())
    }

    async fn list_labels(&self) -> Result<Vec<Label>> {
        let mut state = self.state();
        state.calls.list_labels += 1;
        if state.failing_label_ops {
            return Err(rate_limited());
        }
        Ok(state.labels.clone())
    }

    async fn create_label(&self, name: &str, visibility: &LabelVisibility) -> Result<Label> {
        let mut state = self.state();
        state.calls.create_label += 1;
        if state.failing_label_ops {
            return Err(rate_limited());
        }
        // Gmail never hands out the id of a deleted label again
        let id = (state.created_labels.len() + 1..)
            .map(|n| format!("Label_{}", n))
            .find(|id| !state.labels.iter().any(|l| &l.id == id))
            .unwrap_or_default();
        let label = Label {
            id,
            name: name.to_string(),
        };
        state.labels.push(label.clone());
        state
            .created_labels
            .push((name.to_string(), visibility.clone()));
        Ok(label)
    }

    async fn modify_message(&self, id: &str, add_label_ids: &[String]) -> Result<()> {
        let mut state = self.state();
        state.calls.modify_message += 1;
        if state.failing_label_ops {
            return Err(rate_limited());
        }
        if let Some(missing) = add_label_ids
            .iter()
            .find(|id| !state.labels.iter().any(|l| &l.id == *id))
        {
            return Err(MailError::Api {
                status: StatusCode::BAD_REQUEST,
                body: format!("Invalid label: {}", missing),
            });
        }
        state
            .modified
            .push((id.to_string(), add_label_ids.to_vec()));
        Ok(())
    }
}
