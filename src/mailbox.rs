//! The capabilities the reply engine needs from a mail provider.

use async_trait::async_trait;

use crate::error::Result;

/// An entry from an unread listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef {
    pub id: String,
    pub thread_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    pub name: String,
    pub value: String,
}

impl MessageHeader {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub thread_id: String,
    pub headers: Vec<MessageHeader>,
}

impl Message {
    /// First header with a matching name, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    pub fn from(&self) -> Option<&str> {
        self.header("From")
    }

    pub fn to(&self) -> Option<&str> {
        self.header("To")
    }

    pub fn subject(&self) -> Option<&str> {
        self.header("Subject")
    }

    pub fn message_id(&self) -> Option<&str> {
        self.header("Message-ID")
    }
}

/// A conversation, messages in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thread {
    pub id: String,
    pub messages: Vec<Message>,
}

impl Thread {
    /// Everything after the original message counts as a reply.
    pub fn has_replies(&self) -> bool {
        self.messages.len() > 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelVisibility {
    pub label_list_visibility: String,
    pub message_list_visibility: String,
}

impl Default for LabelVisibility {
    fn default() -> Self {
        Self {
            label_list_visibility: "labelShow".to_string(),
            message_list_visibility: "show".to_string(),
        }
    }
}

#[async_trait]
pub trait Mailbox: Send + Sync {
    /// All unread messages in the mailbox.
    async fn list_unread(&self) -> Result<Vec<MessageRef>>;

    async fn get_message(&self, id: &str) -> Result<Message>;

    async fn get_thread(&self, thread_id: &str) -> Result<Thread>;

    /// Send an already encoded raw message, filed into `thread_id`.
    async fn send_message(&self, raw: &str, thread_id: &str) -> Result<()>;

    async fn list_labels(&self) -> Result<Vec<Label>>;

    async fn create_label(&self, name: &str, visibility: &LabelVisibility) -> Result<Label>;

    async fn modify_message(&self, id: &str, add_label_ids: &[String]) -> Result<()>;
}
