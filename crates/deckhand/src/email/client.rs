//! Gmail REST API client.
//!
//! Implements `MailProvider` over the Gmail v1 REST surface using a
//! bearer token resolved through the secrets layer. Only the read
//! operations the sweep needs are bound.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use log::debug;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::{MailError, Result};
use super::{AttachmentRef, MailProvider, MessageDetail, MessageSummary};
use crate::config::MailConfig;

/// Gmail REST base for the authenticated user.
const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

/// Default connect timeout for HTTP requests (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default request timeout for HTTP requests (30 seconds).
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum length for error bodies echoed into error messages.
const MAX_ERROR_BODY_LENGTH: usize = 200;

/// Truncates an API error body to a reasonable length before it lands
/// in error messages and logs.
fn truncate_error_body(body: &str) -> String {
    if body.len() > MAX_ERROR_BODY_LENGTH {
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated)", &body[..end])
    } else {
        body.to_string()
    }
}

/// Creates an HTTP client with appropriate timeouts.
fn create_http_client() -> Result<Client> {
    let client = Client::builder()
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .timeout(DEFAULT_REQUEST_TIMEOUT)
        .build()?;
    Ok(client)
}

/// Gmail-backed mail provider.
pub struct GmailClient {
    client: Client,
    token: SecretString,
    base_url: String,
}

impl GmailClient {
    pub fn new(token: SecretString) -> Result<Self> {
        Ok(Self {
            client: create_http_client()?,
            token,
            base_url: GMAIL_API_BASE.to_string(),
        })
    }

    /// Builds a client from configuration, resolving the bearer token
    /// through the secrets layer.
    pub fn from_config(config: &MailConfig) -> Result<Self> {
        let token = config
            .resolve_token()
            .map_err(|e| MailError::CredentialsMissing(e.to_string()))?
            .ok_or_else(|| {
                MailError::CredentialsMissing("no Gmail token configured".to_string())
            })?;
        Self::new(token)
    }

    /// Overrides the API base URL. Intended for tests against a stub server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let response = self
            .client
            .get(url)
            .bearer_auth(self.token.expose_secret())
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::ApiStatus {
                status: status.as_u16(),
                body: truncate_error_body(&body),
            });
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl MailProvider for GmailClient {
    async fn list_messages(&self, query: &str, max: u32) -> Result<Vec<MessageSummary>> {
        let url = format!("{}/messages", self.base_url);
        let max = max.to_string();
        let response: ListResponse = self
            .get_json(&url, &[("q", query), ("maxResults", &max)])
            .await?;
        debug!("Inbox query matched {} messages", response.messages.len());
        Ok(response
            .messages
            .into_iter()
            .map(|m| MessageSummary { id: m.id })
            .collect())
    }

    async fn get_message(&self, id: &str) -> Result<MessageDetail> {
        let url = format!("{}/messages/{}", self.base_url, id);
        let response: MessageResponse = self.get_json(&url, &[("format", "full")]).await?;

        let payload = response.payload.ok_or_else(|| {
            MailError::InvalidResponse(format!("message {} has no payload", response.id))
        })?;

        let mut attachments = Vec::new();
        collect_attachments(&payload, &mut attachments);

        Ok(MessageDetail {
            id: response.id,
            subject: header_value(&payload, "Subject"),
            from: header_value(&payload, "From"),
            attachments,
        })
    }

    async fn get_attachment(&self, message_id: &str, attachment_id: &str) -> Result<Vec<u8>> {
        let url = format!(
            "{}/messages/{}/attachments/{}",
            self.base_url, message_id, attachment_id
        );
        let response: AttachmentResponse = self.get_json(&url, &[]).await?;
        let data = response.data.ok_or_else(|| {
            MailError::InvalidResponse("attachment response carried no data".to_string())
        })?;
        decode_attachment_data(&data)
    }

    async fn profile(&self) -> Result<String> {
        let url = format!("{}/profile", self.base_url);
        let response: ProfileResponse = self.get_json(&url, &[]).await?;
        Ok(response.email_address)
    }
}

/// Walks a message part tree and collects every part that names a file
/// and carries a downloadable attachment id.
fn collect_attachments(part: &Part, found: &mut Vec<AttachmentRef>) {
    if let (Some(filename), Some(body)) = (&part.filename, &part.body) {
        if !filename.is_empty() {
            if let Some(attachment_id) = &body.attachment_id {
                found.push(AttachmentRef {
                    attachment_id: attachment_id.clone(),
                    filename: filename.clone(),
                    mime_type: part.mime_type.clone(),
                });
            }
        }
    }
    for child in &part.parts {
        collect_attachments(child, found);
    }
}

fn header_value(part: &Part, name: &str) -> Option<String> {
    part.headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.clone())
}

/// Decodes base64url attachment data. Gmail omits padding, but some
/// proxies re-pad, so padding is stripped first.
fn decode_attachment_data(data: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(data.trim_end_matches('='))
        .map_err(|e| MailError::AttachmentDecode(e.to_string()))
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    messages: Vec<MessageId>,
}

#[derive(Debug, Deserialize)]
struct MessageId {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    id: String,
    payload: Option<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    headers: Vec<Header>,
    #[serde(default)]
    body: Option<PartBody>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartBody {
    #[serde(default)]
    attachment_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Header {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct AttachmentResponse {
    #[serde(default)]
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileResponse {
    email_address: String,
}
