//! Out of office reply engine.
//!
//! Each scan walks the unread messages in the mailbox and sends one
//! auto reply per sender. A sender is skipped when they were already
//! replied to by this process, and a message is skipped when its
//! thread already has a reply in it. Messages that get a reply are
//! tagged with the marker label.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{MailError, Result};
use crate::mailbox::{Mailbox, MessageRef};

pub mod compose;
pub mod labels;

use compose::Reply;
use labels::LabelResolver;

pub const MARKER_LABEL: &str = "onLeave";

/// What happened to a single unread message during a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    SkippedDuplicateSender,
    SkippedThreadHasReply,
    Replied,
    /// The reply went out but the marker label couldn't be applied
    RepliedWithoutLabel,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub unread: usize,
    pub replied: usize,
    pub skipped_duplicate_sender: usize,
    pub skipped_thread_has_reply: usize,
    pub failed: usize,
    pub label_failed: usize,
}

impl ScanReport {
    fn record(&mut self, outcome: MessageOutcome) {
        match outcome {
            MessageOutcome::SkippedDuplicateSender => self.skipped_duplicate_sender += 1,
            MessageOutcome::SkippedThreadHasReply => self.skipped_thread_has_reply += 1,
            MessageOutcome::Replied => self.replied += 1,
            MessageOutcome::RepliedWithoutLabel => {
                self.replied += 1;
                self.label_failed += 1;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Completed(ScanReport),
    /// Another scan was still in flight so this one did nothing
    AlreadyRunning,
}

/// Senders that got an auto reply during this process's lifetime.
/// Entries are never removed.
#[derive(Debug, Default)]
pub struct ReplySet {
    senders: HashSet<String>,
}

impl ReplySet {
    pub fn contains(&self, sender: &str) -> bool {
        self.senders.contains(sender)
    }

    pub fn insert(&mut self, sender: String) -> bool {
        self.senders.insert(sender)
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}

/// Normalize a From header to the bare lowercase address so that
/// `Alice <A@X.com>` and `a@x.com` count as the same sender.
pub fn sender_address(from: &str) -> String {
    let from = from.trim();
    let address = match (from.rfind('<'), from.rfind('>')) {
        (Some(start), Some(end)) if start < end => &from[start + 1..end],
        _ => from,
    };
    address.trim().to_lowercase()
}

/// Clears the in-flight flag when the scan finishes, errors or is
/// dropped.
struct ScanGuard<'a>(&'a AtomicBool);

impl<'a> ScanGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ScanGuard(flag))
    }
}

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ReplyEngine {
    mailbox: Arc<dyn Mailbox>,
    labels: LabelResolver,
    my_email: String,
    label_name: String,
    replied: Mutex<ReplySet>,
    // Threads seen with a reply in them. Message counts only grow so
    // there is no need to fetch these again.
    answered_threads: Mutex<HashSet<String>>,
    scanning: AtomicBool,
}

impl ReplyEngine {
    pub fn new(mailbox: Arc<dyn Mailbox>, my_email: &str) -> Self {
        Self {
            labels: LabelResolver::new(Arc::clone(&mailbox)),
            mailbox,
            my_email: my_email.to_string(),
            label_name: MARKER_LABEL.to_string(),
            replied: Mutex::new(ReplySet::default()),
            answered_threads: Mutex::new(HashSet::new()),
            scanning: AtomicBool::new(false),
        }
    }

    /// Process every unread message once. Returns
    /// [`ScanOutcome::AlreadyRunning`] without touching the mailbox if
    /// a previous scan hasn't finished.
    ///
    /// A failure on one message is logged and counted and the scan
    /// moves on to the next one. Listing failures and authentication
    /// failures abort the scan.
    pub async fn scan(&self) -> Result<ScanOutcome> {
        let Some(_guard) = ScanGuard::acquire(&self.scanning) else {
            tracing::warn!("Previous scan still running, skipping");
            return Ok(ScanOutcome::AlreadyRunning);
        };

        let refs = self.mailbox.list_unread().await?;
        let mut report = ScanReport {
            unread: refs.len(),
            ..Default::default()
        };
        if refs.is_empty() {
            tracing::debug!("No unread messages");
            return Ok(ScanOutcome::Completed(report));
        }

        for message_ref in &refs {
            match self.process_message(message_ref).await {
                Ok(outcome) => report.record(outcome),
                Err(e) if e.is_auth() => return Err(e),
                Err(e) => {
                    tracing::error!("Failed to process message {}: {}", message_ref.id, e);
                    report.failed += 1;
                }
            }
        }

        Ok(ScanOutcome::Completed(report))
    }

    async fn process_message(&self, message_ref: &MessageRef) -> Result<MessageOutcome> {
        let message = self.mailbox.get_message(&message_ref.id).await?;
        let from = message.from().ok_or(MailError::MissingHeader("From"))?;
        let sender = sender_address(from);
        tracing::info!("Email came from: {}", from);

        if self.has_replied_to(&sender) {
            tracing::info!("Already replied to: {}", from);
            return Ok(MessageOutcome::SkippedDuplicateSender);
        }

        if self.thread_answered(&message.thread_id) {
            tracing::info!("Already replied to (thread): {}", from);
            return Ok(MessageOutcome::SkippedThreadHasReply);
        }
        let thread = self.mailbox.get_thread(&message.thread_id).await?;
        if thread.has_replies() {
            tracing::info!("Already replied to (thread): {}", from);
            self.answered_threads
                .lock()
                .unwrap()
                .insert(message.thread_id.clone());
            return Ok(MessageOutcome::SkippedThreadHasReply);
        }

        let reply = Reply {
            from: message.to().unwrap_or(self.my_email.as_str()),
            to: from,
            subject: message.subject().unwrap_or_default(),
            in_reply_to: message.message_id(),
        };
        self.mailbox
            .send_message(&reply.encode(), &message.thread_id)
            .await?;
        self.replied.lock().unwrap().insert(sender);
        tracing::info!("Sent reply to: {}", from);

        // Only auth failures while labeling stop the scan
        match self.label_message(&message.id).await {
            Ok(()) => Ok(MessageOutcome::Replied),
            Err(e) if e.is_auth() => Err(e),
            Err(e) => {
                tracing::error!("Failed to label message {}: {}", message.id, e);
                Ok(MessageOutcome::RepliedWithoutLabel)
            }
        }
    }

    /// Apply the marker label. A client error on modify usually means
    /// the cached label was deleted, so resolve it again and retry once.
    async fn label_message(&self, message_id: &str) -> Result<()> {
        let label_id = self.labels.resolve(&self.label_name).await?;
        match self.mailbox.modify_message(message_id, &[label_id]).await {
            Err(MailError::Api { status, body }) if status.is_client_error() => {
                tracing::warn!(
                    "Labeling {} failed ({} {}), resolving {} again",
                    message_id,
                    status,
                    body,
                    self.label_name
                );
                self.labels.forget(&self.label_name);
                let label_id = self.labels.resolve(&self.label_name).await?;
                self.mailbox.modify_message(message_id, &[label_id]).await
            }
            res => res,
        }
    }

    pub fn has_replied_to(&self, sender: &str) -> bool {
        self.replied.lock().unwrap().contains(&sender_address(sender))
    }

    pub fn replied_count(&self) -> usize {
        self.replied.lock().unwrap().len()
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::Acquire)
    }

    fn thread_answered(&self, thread_id: &str) -> bool {
        self.answered_threads.lock().unwrap().contains(thread_id)
    }
}
