//! Gmail API client for listing unread mail, fetching threads, sending
//! replies and managing labels.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::oauth::{OAuthCredentials, TokenCache};
use crate::core::AppConfig;
use crate::error::{MailError, Result};
use crate::mailbox::{self, Label, LabelVisibility, Mailbox, MessageRef};

/// Headers requested when fetching message metadata
const METADATA_HEADERS: [&str; 4] = ["From", "To", "Subject", "Message-ID"];

/// Message and thread structures from Gmail API documentation
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MessageResponse {
    pub id: String,
    #[serde(rename = "threadId")]
    pub thread_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ListMessagesResponse {
    pub messages: Option<Vec<MessageResponse>>,
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    #[serde(default)]
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(rename = "threadId")]
    pub thread_id: String,
    pub payload: Option<MessagePayload>,
    #[serde(rename = "labelIds")]
    pub label_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePayload {
    pub headers: Option<Vec<MessageHeader>>,
    #[serde(rename = "mimeType")]
    pub mimetype: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageHeader {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct ListLabelsResponse {
    pub labels: Option<Vec<LabelResponse>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LabelResponse {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLabelRequest<'a> {
    pub name: &'a str,
    pub label_list_visibility: &'a str,
    pub message_list_visibility: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyMessageRequest<'a> {
    pub add_label_ids: &'a [String],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest<'a> {
    pub raw: &'a str,
    pub thread_id: &'a str,
}

impl From<Message> for mailbox::Message {
    fn from(message: Message) -> Self {
        let headers = message
            .payload
            .and_then(|p| p.headers)
            .unwrap_or_default()
            .into_iter()
            .map(|h| mailbox::MessageHeader {
                name: h.name,
                value: h.value,
            })
            .collect();
        mailbox::Message {
            id: message.id,
            thread_id: message.thread_id,
            headers,
        }
    }
}

impl From<Thread> for mailbox::Thread {
    fn from(thread: Thread) -> Self {
        mailbox::Thread {
            id: thread.id,
            messages: thread.messages.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<LabelResponse> for Label {
    fn from(label: LabelResponse) -> Self {
        Label {
            id: label.id,
            name: label.name,
        }
    }
}

/// Gmail REST client acting on behalf of a single mailbox.
pub struct GmailClient {
    client: Client,
    base_url: String,
    user_id: String,
    tokens: TokenCache,
}

impl GmailClient {
    pub fn new(config: &AppConfig) -> Self {
        let client = Client::new();
        let tokens = TokenCache::new(client.clone(), OAuthCredentials::from(config));
        Self {
            client,
            base_url: config.gmail_api_url.clone(),
            user_id: config.my_email.clone(),
            tokens,
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/gmail/v1/users/{}/{}",
            self.base_url,
            urlencoding::encode(&self.user_id),
            path
        )
    }

    /// Authorize and send a request, returning the response body on
    /// success.
    async fn send(&self, request: RequestBuilder) -> Result<String> {
        let access_token = self.tokens.access_token().await?;
        let res = request.bearer_auth(access_token).send().await?;
        let status = res.status();
        let text = res.text().await.unwrap_or_default();
        if !status.is_success() {
            let err = MailError::from_status(status, text);
            if err.is_auth() {
                self.tokens.invalidate().await;
            }
            return Err(err);
        }
        Ok(text)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let text = self.send(request).await?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl Mailbox for GmailClient {
    async fn list_unread(&self) -> Result<Vec<MessageRef>> {
        let url = self.url("messages");
        let mut refs = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.client.get(&url).query(&[("q", "is:unread")]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }
            let page: ListMessagesResponse = self.send_json(request).await?;
            refs.extend(page.messages.unwrap_or_default().into_iter().map(|m| {
                MessageRef {
                    id: m.id,
                    thread_id: m.thread_id,
                }
            }));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(refs)
    }

    async fn get_message(&self, id: &str) -> Result<mailbox::Message> {
        let mut query = vec![("format", "metadata")];
        query.extend(METADATA_HEADERS.iter().map(|h| ("metadataHeaders", *h)));
        let request = self
            .client
            .get(self.url(&format!("messages/{}", id)))
            .query(&query);
        let message: Message = self.send_json(request).await?;
        Ok(message.into())
    }

    async fn get_thread(&self, thread_id: &str) -> Result<mailbox::Thread> {
        let request = self
            .client
            .get(self.url(&format!("threads/{}", thread_id)))
            .query(&[("format", "minimal")]);
        let thread: Thread = self.send_json(request).await?;
        Ok(thread.into())
    }

    async fn send_message(&self, raw: &str, thread_id: &str) -> Result<()> {
        let body = SendMessageRequest { raw, thread_id };
        let request = self.client.post(self.url("messages/send")).json(&body);
        self.send(request).await?;
        Ok(())
    }

    async fn list_labels(&self) -> Result<Vec<Label>> {
        let request = self.client.get(self.url("labels"));
        let res: ListLabelsResponse = self.send_json(request).await?;
        Ok(res
            .labels
            .unwrap_or_default()
            .into_iter()
            .map(Into::into)
            .collect())
    }

    async fn create_label(&self, name: &str, visibility: &LabelVisibility) -> Result<Label> {
        let body = CreateLabelRequest {
            name,
            label_list_visibility: &visibility.label_list_visibility,
            message_list_visibility: &visibility.message_list_visibility,
        };
        let request = self.client.post(self.url("labels")).json(&body);
        let label: LabelResponse = self.send_json(request).await?;
        Ok(label.into())
    }

    async fn modify_message(&self, id: &str, add_label_ids: &[String]) -> Result<()> {
        let body = ModifyMessageRequest { add_label_ids };
        let request = self
            .client
            .post(self.url(&format!("messages/{}/modify", id)))
            .json(&body);
        self.send(request).await?;
        Ok(())
    }
}
