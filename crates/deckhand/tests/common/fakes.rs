//! Mail-provider and queue fakes with injectable failures.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use deckhand::email::{AttachmentRef, MailError, MailProvider, MessageDetail, MessageSummary};
use deckhand::queue::{DispatchQueue, JobMessage, QueueError, SqliteQueue};

/// One mailbox message held by `FakeMailProvider`.
#[derive(Debug, Clone)]
pub struct FakeMessage {
    pub id: String,
    pub subject: String,
    pub from: String,
    pub unread: bool,
    pub attachments: Vec<FakeAttachment>,
}

#[derive(Debug, Clone)]
pub struct FakeAttachment {
    pub id: String,
    pub filename: String,
    pub data: Vec<u8>,
}

impl FakeMessage {
    pub fn unread(id: &str, subject: &str, from: &str) -> Self {
        Self {
            id: id.to_string(),
            subject: subject.to_string(),
            from: from.to_string(),
            unread: true,
            attachments: Vec::new(),
        }
    }

    pub fn read(id: &str, subject: &str, from: &str) -> Self {
        Self {
            unread: false,
            ..Self::unread(id, subject, from)
        }
    }

    pub fn with_attachment(mut self, id: &str, filename: &str, data: &[u8]) -> Self {
        self.attachments.push(FakeAttachment {
            id: id.to_string(),
            filename: filename.to_string(),
            data: data.to_vec(),
        });
        self
    }
}

/// In-memory mail provider honoring the sweep query semantics the way the
/// real mailbox would: `is:unread` filters read messages, `subject:` terms
/// must match one of, `filename:pdf` requires at least one PDF attachment.
#[derive(Default)]
pub struct FakeMailProvider {
    messages: Vec<FakeMessage>,
    /// Message ids whose next `get_message` call fails once.
    message_failures: Mutex<HashSet<String>>,
    /// Remaining `get_attachment` failures per attachment id.
    attachment_failures: Mutex<HashMap<String, u32>>,
    /// Total `get_attachment` calls, successful or not.
    pub attachment_fetches: AtomicU32,
}

impl FakeMailProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_message(mut self, message: FakeMessage) -> Self {
        self.messages.push(message);
        self
    }

    /// The next `get_message` for this id fails once, then succeeds.
    pub fn fail_message_once(self, id: &str) -> Self {
        self.message_failures
            .lock()
            .expect("message_failures lock")
            .insert(id.to_string());
        self
    }

    /// The next `times` `get_attachment` calls for this id fail.
    pub fn fail_attachment(self, attachment_id: &str, times: u32) -> Self {
        self.attachment_failures
            .lock()
            .expect("attachment_failures lock")
            .insert(attachment_id.to_string(), times);
        self
    }

    fn find(&self, id: &str) -> Option<&FakeMessage> {
        self.messages.iter().find(|m| m.id == id)
    }
}

fn subject_terms(query: &str) -> Vec<String> {
    query
        .split(|c: char| c.is_whitespace() || c == '(' || c == ')')
        .filter_map(|token| token.strip_prefix("subject:"))
        .map(|term| term.to_ascii_lowercase())
        .collect()
}

fn matches_query(message: &FakeMessage, query: &str) -> bool {
    if query.contains("is:unread") && !message.unread {
        return false;
    }
    if query.contains("filename:pdf")
        && !message
            .attachments
            .iter()
            .any(|a| a.filename.to_ascii_lowercase().ends_with(".pdf"))
    {
        return false;
    }
    let terms = subject_terms(query);
    if !terms.is_empty() {
        let subject = message.subject.to_ascii_lowercase();
        if !terms.iter().any(|t| subject.contains(t)) {
            return false;
        }
    }
    true
}

#[async_trait]
impl MailProvider for FakeMailProvider {
    async fn list_messages(
        &self,
        query: &str,
        max: u32,
    ) -> Result<Vec<MessageSummary>, MailError> {
        Ok(self
            .messages
            .iter()
            .filter(|m| matches_query(m, query))
            .take(max as usize)
            .map(|m| MessageSummary { id: m.id.clone() })
            .collect())
    }

    async fn get_message(&self, id: &str) -> Result<MessageDetail, MailError> {
        if self
            .message_failures
            .lock()
            .expect("message_failures lock")
            .remove(id)
        {
            return Err(MailError::ApiStatus {
                status: 500,
                body: "backend flaked".to_string(),
            });
        }

        let message = self
            .find(id)
            .ok_or_else(|| MailError::InvalidResponse(format!("no such message: {}", id)))?;
        Ok(MessageDetail {
            id: message.id.clone(),
            subject: Some(message.subject.clone()),
            from: Some(message.from.clone()),
            attachments: message
                .attachments
                .iter()
                .map(|a| AttachmentRef {
                    attachment_id: a.id.clone(),
                    filename: a.filename.clone(),
                    mime_type: None,
                })
                .collect(),
        })
    }

    async fn get_attachment(
        &self,
        message_id: &str,
        attachment_id: &str,
    ) -> Result<Vec<u8>, MailError> {
        self.attachment_fetches.fetch_add(1, Ordering::SeqCst);

        let mut failures = self
            .attachment_failures
            .lock()
            .expect("attachment_failures lock");
        if let Some(left) = failures.get_mut(attachment_id) {
            if *left > 0 {
                *left -= 1;
                return Err(MailError::ApiStatus {
                    status: 503,
                    body: "attachment backend flaked".to_string(),
                });
            }
        }
        drop(failures);

        let message = self
            .find(message_id)
            .ok_or_else(|| MailError::InvalidResponse(format!("no such message: {}", message_id)))?;
        message
            .attachments
            .iter()
            .find(|a| a.id == attachment_id)
            .map(|a| a.data.clone())
            .ok_or_else(|| {
                MailError::InvalidResponse(format!("no such attachment: {}", attachment_id))
            })
    }

    async fn profile(&self) -> Result<String, MailError> {
        Ok("analyst@fund.example".to_string())
    }
}

/// Queue that fails a fixed number of enqueues before delegating to a real
/// SQLite-backed queue.
pub struct FlakyQueue {
    inner: SqliteQueue,
    failures_left: AtomicU32,
    pub attempts: AtomicU32,
}

impl FlakyQueue {
    pub fn new(inner: SqliteQueue, failures: u32) -> Self {
        Self {
            inner,
            failures_left: AtomicU32::new(failures),
            attempts: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl DispatchQueue for FlakyQueue {
    async fn enqueue(&self, message: &JobMessage) -> Result<(), QueueError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let should_fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(QueueError::Transport("transient broker fault".to_string()));
        }
        self.inner.enqueue(message).await
    }

    async fn length(&self) -> Result<u64, QueueError> {
        self.inner.length().await
    }
}

/// Queue whose every enqueue fails.
pub struct DeadQueue;

#[async_trait]
impl DispatchQueue for DeadQueue {
    async fn enqueue(&self, _message: &JobMessage) -> Result<(), QueueError> {
        Err(QueueError::Transport("broker unreachable".to_string()))
    }

    async fn length(&self) -> Result<u64, QueueError> {
        Ok(0)
    }
}
