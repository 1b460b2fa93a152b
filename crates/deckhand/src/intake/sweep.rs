//! Inbox sweep: turns unread mail with PDF attachments into candidate
//! documents.
//!
//! The scanner reads the processed-message ledger to skip messages an
//! earlier sweep already handled, but never writes it. Recording a
//! message is the ingest loop's call, made only after every document
//! scanned out of it has landed (see `IntakeService::sweep_inbox`), so
//! a staging or record fault leaves the message to be swept again. A
//! message whose detail fetch fails is likewise left unrecorded and
//! retried on the next sweep.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::config::SweepConfig;
use crate::db::{message_ledger, Database};
use crate::email::{MailProvider, MessageDetail};

use super::candidate::{ByteSource, CandidateDocument, DocumentSource, SourceTag};
use super::error::IntakeError;

/// Candidates scanned out of one mailbox message, keyed by the provider
/// message id so the caller can record the message once they all land.
#[derive(Debug)]
pub struct SweptMessage {
    pub message_id: String,
    pub candidates: Vec<CandidateDocument>,
}

pub struct MailboxScanner {
    provider: Arc<dyn MailProvider>,
    config: SweepConfig,
    db: Database,
}

impl MailboxScanner {
    pub fn new(provider: Arc<dyn MailProvider>, config: SweepConfig, db: Database) -> Self {
        Self {
            provider,
            config,
            db,
        }
    }

    /// Scans the mailbox and returns new candidates grouped per message.
    ///
    /// Messages already in the ledger are skipped. A message whose
    /// detail fetch fails is dropped from this scan and picked up again
    /// on the next one. Attachment fetches run under the sweep retry
    /// policy; an attachment that still fails is logged and skipped,
    /// and its message is returned without it.
    pub async fn scan(&self) -> Result<Vec<SweptMessage>, IntakeError> {
        let query = build_query(&self.config.subject_keywords);
        let summaries = self
            .provider
            .list_messages(&query, self.config.max_results)
            .await?;
        tracing::info!(matched = summaries.len(), "inbox sweep started");

        let mut swept = Vec::new();
        for summary in summaries {
            if message_ledger::is_processed(&self.db, &summary.id)? {
                tracing::debug!(message_id = %summary.id, "message already ingested, skipping");
                continue;
            }

            let detail = match self.provider.get_message(&summary.id).await {
                Ok(detail) => detail,
                Err(e) => {
                    tracing::warn!(message_id = %summary.id, error = %e, "message fetch failed, will retry next sweep");
                    continue;
                }
            };

            let mut candidates = Vec::new();
            for attachment in &detail.attachments {
                if !is_pdf_filename(&attachment.filename) {
                    continue;
                }
                match self
                    .fetch_attachment(&detail.id, &attachment.attachment_id)
                    .await
                {
                    Ok(data) => {
                        candidates.push(candidate_from(&detail, data, &attachment.filename));
                    }
                    Err(e) => {
                        tracing::warn!(
                            message_id = %detail.id,
                            filename = %attachment.filename,
                            error = %e,
                            "attachment fetch failed, skipping"
                        );
                    }
                }
            }

            tracing::debug!(
                message_id = %detail.id,
                subject = detail.subject.as_deref().unwrap_or(""),
                candidates = candidates.len(),
                "message scanned"
            );
            swept.push(SweptMessage {
                message_id: detail.id,
                candidates,
            });
        }

        if swept.is_empty() {
            tracing::info!("inbox sweep found nothing new");
        }
        Ok(swept)
    }

    async fn fetch_attachment(
        &self,
        message_id: &str,
        attachment_id: &str,
    ) -> Result<Vec<u8>, crate::email::MailError> {
        self.config
            .retry
            .run("mail attachment fetch", || {
                self.provider.get_attachment(message_id, attachment_id)
            })
            .await
    }
}

fn candidate_from(detail: &MessageDetail, data: Vec<u8>, filename: &str) -> CandidateDocument {
    CandidateDocument {
        filename: filename.to_string(),
        investor_id: None,
        source: SourceTag::Email,
        source_metadata: Some(json!({
            "message_id": detail.id,
            "subject": detail.subject,
            "from": detail.from,
        })),
        bytes: ByteSource::Buffered(data),
    }
}

#[async_trait]
impl DocumentSource for MailboxScanner {
    async fn extract(self) -> Result<Vec<CandidateDocument>, IntakeError> {
        let swept = self.scan().await?;
        Ok(swept.into_iter().flat_map(|m| m.candidates).collect())
    }
}

/// Builds the mailbox search query from the configured subject keywords.
fn build_query(keywords: &[String]) -> String {
    let subjects = keywords
        .iter()
        .map(|k| format!("subject:{}", k))
        .collect::<Vec<_>>()
        .join(" OR ");
    format!("is:unread has:attachment filename:pdf ({})", subjects)
}

fn is_pdf_filename(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".pdf")
}
