//! Builds the raw auto reply message handed to the mail API.

use base64::{Engine as _, engine::general_purpose::URL_SAFE};

pub const REPLY_BODY: &str = "Hay, Thanks for your message. Actually, I'm unavailable right now, but will respond as soon as possible...";

/// Headers of the auto reply. `from` is the address the original was
/// sent to and `to` is whoever sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply<'a> {
    pub from: &'a str,
    pub to: &'a str,
    pub subject: &'a str,
    pub in_reply_to: Option<&'a str>,
}

impl Reply<'_> {
    /// The full message text: headers, a blank line, then the fixed body.
    pub fn compose(&self) -> String {
        let mut text = format!(
            "From: {}\r\nTo: {}\r\nSubject: {}\r\n",
            self.from, self.to, self.subject
        );
        if let Some(message_id) = self.in_reply_to {
            text.push_str(&format!(
                "In-Reply-To: {}\r\nReferences: {}\r\n",
                message_id, message_id
            ));
        }
        text.push_str("\r\n");
        text.push_str(REPLY_BODY);
        text
    }

    pub fn encode(&self) -> String {
        encode_raw(&self.compose())
    }
}

/// Base64url encode with padding, the format Gmail expects in `raw`.
pub fn encode_raw(text: &str) -> String {
    URL_SAFE.encode(text.as_bytes())
}
