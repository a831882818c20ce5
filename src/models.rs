//! Data models and structures
//!
//! Defines the inbound chat request (raw wire shape and its validated form),
//! conversation turns, uploaded attachments, credentials, and the outbound
//! response envelope.

use crate::{Error, Result};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    /// Parse a wire role name. `assistant` is accepted as an alias for `model`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "user" => Some(Role::User),
            "model" | "assistant" => Some(Role::Model),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Model => "Model",
        }
    }
}

/// One prior message in the conversation. Order in the history is chronological.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// Decoded upload: declared media type plus the raw file bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub media_type: String,
    pub raw_bytes: Vec<u8>,
}

/// Upload as received on the wire, with any `data:` URL framing removed but
/// the payload still encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedAttachment {
    pub media_type: String,
    pub base64: String,
    /// `false` for a `data:` URL without `;base64,`; such a payload is never decoded.
    pub is_base64: bool,
}

#[derive(thiserror::Error, Debug)]
pub enum AttachmentDecodeError {
    #[error("upload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("upload data URL is not base64 encoded")]
    NotBase64,
}

impl EncodedAttachment {
    pub fn new(media_type: impl Into<String>, base64: impl Into<String>) -> Self {
        Self {
            media_type: media_type.into(),
            base64: base64.into(),
            is_base64: true,
        }
    }

    /// Split a `data:<type>;base64,<payload>` URL or raw base64 string.
    ///
    /// An explicit `mime_type` takes precedence over the data URL's type.
    /// Returns `None` when neither names a media type: an untyped upload is
    /// ignored rather than failing the turn.
    pub fn from_upload(file_data: &str, mime_type: Option<&str>) -> Option<Self> {
        let explicit = mime_type.map(str::trim).filter(|m| !m.is_empty());

        let (url_type, payload, is_base64) = match file_data.strip_prefix("data:") {
            Some(rest) => match rest.split_once(";base64,") {
                Some((header, payload)) => (Some(header), payload, true),
                None => match rest.split_once(',') {
                    Some((header, payload)) => (Some(header), payload, false),
                    None => (None, rest, false),
                },
            },
            None => (None, file_data, true),
        };
        let url_type = url_type.map(str::trim).filter(|h| !h.is_empty());

        let Some(media_type) = explicit.or(url_type) else {
            warn!("Ignoring fileData sent without a mimeType");
            return None;
        };

        Some(Self {
            media_type: media_type.to_string(),
            base64: payload.to_string(),
            is_base64,
        })
    }

    pub fn decode(&self) -> std::result::Result<Attachment, AttachmentDecodeError> {
        if !self.is_base64 {
            return Err(AttachmentDecodeError::NotBase64);
        }

        let compact: String = self
            .base64
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let raw_bytes = base64::engine::general_purpose::STANDARD.decode(compact)?;

        Ok(Attachment {
            media_type: self.media_type.clone(),
            raw_bytes,
        })
    }
}

/// Provider API key. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Short identifier safe for logs: the last four characters of long keys.
    pub fn fingerprint(&self) -> String {
        let count = self.0.chars().count();
        if count < 8 {
            return "****".to_string();
        }
        let tail: String = self.0.chars().skip(count - 4).collect();
        format!("…{}", tail)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({})", self.fingerprint())
    }
}

// Inbound wire format
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawChatRequest {
    #[serde(default)]
    pub history: Option<Vec<RawHistoryEntry>>,
    pub message: String,
    pub file_data: Option<String>,
    pub mime_type: Option<String>,
    pub user_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawHistoryEntry {
    Plain(String),
    Turn {
        role: Option<String>,
        text: Option<String>,
        #[serde(default)]
        parts: Option<Vec<RawPart>>,
    },
}

#[derive(Debug, Deserialize)]
pub struct RawPart {
    pub text: Option<String>,
}

/// Validated chat request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub history: Vec<ConversationTurn>,
    pub message: String,
    pub attachment: Option<EncodedAttachment>,
    pub user_name: Option<String>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            history: Vec::new(),
            message: message.into(),
            attachment: None,
            user_name: None,
        }
    }

    pub fn from_json(body: &str) -> Result<Self> {
        let raw: RawChatRequest = serde_json::from_str(body)
            .map_err(|e| Error::InvalidRequest(format!("Malformed request body: {}", e)))?;
        Self::try_from(raw)
    }
}

impl TryFrom<RawChatRequest> for ChatRequest {
    type Error = Error;

    fn try_from(raw: RawChatRequest) -> Result<Self> {
        let history = raw
            .history
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(index, entry)| match entry {
                RawHistoryEntry::Plain(text) => Ok(ConversationTurn::user(text)),
                RawHistoryEntry::Turn { role, text, parts } => {
                    let role = match role.as_deref() {
                        None => Role::User,
                        Some(name) => Role::parse(name).ok_or_else(|| {
                            Error::InvalidRequest(format!(
                                "history[{}] has unknown role '{}'",
                                index, name
                            ))
                        })?,
                    };
                    let text = text
                        .or_else(|| {
                            parts
                                .and_then(|parts| parts.into_iter().next())
                                .and_then(|part| part.text)
                        })
                        .unwrap_or_default();
                    Ok(ConversationTurn { role, text })
                }
            })
            .collect::<Result<Vec<_>>>()?;

        let attachment = match raw.file_data.as_deref().map(str::trim) {
            Some(data) if !data.is_empty() => {
                EncodedAttachment::from_upload(data, raw.mime_type.as_deref())
            }
            _ => None,
        };

        let user_name = raw
            .user_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());

        Ok(Self {
            history,
            message: raw.message,
            attachment,
            user_name,
        })
    }
}

// Outbound envelope
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ResponseBody {
    Reply {
        reply: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    Error {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatResponse {
    pub status: u16,
    pub body: ResponseBody,
}

impl ChatResponse {
    pub fn reply(reply: impl Into<String>, title: Option<String>) -> Self {
        Self {
            status: 200,
            body: ResponseBody::Reply {
                reply: reply.into(),
                title,
            },
        }
    }

    pub fn error(status: u16, error: impl Into<String>, detail: Option<String>) -> Self {
        Self {
            status,
            body: ResponseBody::Error {
                error: error.into(),
                detail,
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}
