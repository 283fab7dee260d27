use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest handle Telegram accepts for a public username.
const MAX_HANDLE_LEN: usize = 32;

/// Identifier of a broadcast target.
///
/// Numeric chat ids and `@handles` live in separate namespaces: `Numeric(42)`
/// never equals `Handle("42")`. Handles are stored normalized (lowercase,
/// without the leading `@`) so equality is the registry's uniqueness key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationId {
    Numeric(i64),
    Handle(String),
}

impl DestinationId {
    /// Build a handle identifier, normalizing case and stripping the `@`.
    pub fn handle(raw: &str) -> Result<Self, ParseIdentifierError> {
        let name = raw.trim().trim_start_matches('@');
        if name.is_empty() {
            return Err(ParseIdentifierError::Empty);
        }
        if name.len() > MAX_HANDLE_LEN {
            return Err(ParseIdentifierError::TooLong { len: name.len() });
        }
        if let Some(bad) = name.chars().find(|c| !(c.is_ascii_alphanumeric() || *c == '_')) {
            return Err(ParseIdentifierError::InvalidChar { ch: bad });
        }
        Ok(Self::Handle(name.to_ascii_lowercase()))
    }

    /// Build a numeric identifier. Zero is never a valid chat id.
    pub fn numeric(id: i64) -> Result<Self, ParseIdentifierError> {
        if id == 0 {
            return Err(ParseIdentifierError::Zero);
        }
        Ok(Self::Numeric(id))
    }

    pub fn is_handle(&self) -> bool {
        matches!(self, Self::Handle(_))
    }
}

impl fmt::Display for DestinationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(id) => write!(f, "{id}"),
            Self::Handle(name) => write!(f, "@{name}"),
        }
    }
}

/// Parses `@name`, `name` or a signed integer such as `-1001234567890`.
impl FromStr for DestinationId {
    type Err = ParseIdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ParseIdentifierError::Empty);
        }
        if trimmed.starts_with('@') {
            return Self::handle(trimmed);
        }
        match trimmed.parse::<i64>() {
            Ok(id) => Self::numeric(id),
            // A leading sign or digit means the caller meant a number.
            Err(_) if trimmed.starts_with(|c: char| c == '-' || c == '+' || c.is_ascii_digit()) => {
                Err(ParseIdentifierError::InvalidNumber(trimmed.to_string()))
            }
            Err(_) => Self::handle(trimmed),
        }
    }
}

/// Reasons a piece of operator text is not a usable destination identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseIdentifierError {
    #[error("identifier is empty")]
    Empty,

    #[error("handle is {len} characters long (max 32)")]
    TooLong { len: usize },

    #[error("handle contains invalid character {ch:?}")]
    InvalidChar { ch: char },

    #[error("not a valid numeric chat id: {0}")]
    InvalidNumber(String),

    #[error("chat id 0 is not valid")]
    Zero,
}

/// One registered broadcast target.
///
/// Equality and hashing only consider [`Destination::id`]; `added_at` is
/// informational.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Destination {
    pub id: DestinationId,
    pub added_at: DateTime<Utc>,
}

impl Destination {
    pub fn new(id: DestinationId) -> Self {
        Self {
            id,
            added_at: Utc::now(),
        }
    }
}

impl PartialEq for Destination {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Destination {}

impl Hash for Destination {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.id.fmt(f)
    }
}

impl From<DestinationId> for Destination {
    fn from(id: DestinationId) -> Self {
        Self::new(id)
    }
}

/// What kind of content a [`Message`] carries.
///
/// Open-ended: transports that understand a new kind can match on
/// [`MessageKind::Other`] without a breaking change here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    Photo,
    Video,
    Document,
    Audio,
    Voice,
    Sticker,
    Animation,
    Other(String),
}

impl MessageKind {
    pub fn is_media(&self) -> bool {
        !matches!(self, Self::Text)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Photo => write!(f, "photo"),
            Self::Video => write!(f, "video"),
            Self::Document => write!(f, "document"),
            Self::Audio => write!(f, "audio"),
            Self::Voice => write!(f, "voice"),
            Self::Sticker => write!(f, "sticker"),
            Self::Animation => write!(f, "animation"),
            Self::Other(tag) => write!(f, "{tag}"),
        }
    }
}

/// An outbound broadcast payload. Immutable once built.
///
/// For [`MessageKind::Text`] the payload is the body; for media kinds it is
/// the transport's file reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    kind: MessageKind,
    payload: String,
    caption: Option<String>,
    /// Transport-native formatting spans for the body or caption, passed
    /// through untouched. Offsets refer to the text they were captured with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    entities: Option<serde_json::Value>,
}

impl Message {
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Text,
            payload: body.into(),
            caption: None,
            entities: None,
        }
    }

    pub fn media(kind: MessageKind, file_ref: impl Into<String>) -> Self {
        Self {
            kind,
            payload: file_ref.into(),
            caption: None,
            entities: None,
        }
    }

    /// Attach a caption. Ignored for text messages, where the body is the content.
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        if self.kind.is_media() {
            self.caption = Some(caption.into());
        }
        self
    }

    /// Attach formatting spans. They apply to the body of a text message and
    /// to the caption of a media message.
    pub fn with_entities(mut self, entities: serde_json::Value) -> Self {
        self.entities = Some(entities);
        self
    }

    pub fn kind(&self) -> &MessageKind {
        &self.kind
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn caption(&self) -> Option<&str> {
        self.caption.as_deref()
    }

    pub fn entities(&self) -> Option<&serde_json::Value> {
        self.entities.as_ref()
    }
}

/// Why a single delivery failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The bot lacks the rights to post in the destination.
    NotAdmin,
    /// The destination was deleted or the bot was removed from it.
    DestinationGone,
    /// The transport throttled us, or the run's backoff ceiling was reached.
    RateLimited,
    /// Transport error, timeout or anything unclassified.
    Unknown,
    /// The run was cancelled before this destination was attempted.
    Cancelled,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotAdmin => "not_admin",
            Self::DestinationGone => "destination_gone",
            Self::RateLimited => "rate_limited",
            Self::Unknown => "unknown",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "reason")]
pub enum DeliveryStatus {
    Success,
    Failure(FailureReason),
}

/// Terminal result of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryOutcome {
    pub destination: Destination,
    pub status: DeliveryStatus,
    /// Transport error text for failures, when there was one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl DeliveryOutcome {
    pub fn success(destination: Destination) -> Self {
        Self {
            destination,
            status: DeliveryStatus::Success,
            detail: None,
        }
    }

    pub fn failure(destination: Destination, reason: FailureReason) -> Self {
        Self {
            destination,
            status: DeliveryStatus::Failure(reason),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self.status {
            DeliveryStatus::Success => None,
            DeliveryStatus::Failure(reason) => Some(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_normalize_case_and_at_sign() {
        let a: DestinationId = "@MyChannel".parse().unwrap();
        let b: DestinationId = "mychannel".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "@mychannel");
    }

    #[test]
    fn numeric_ids_parse_with_sign() {
        let id: DestinationId = "-1001234567890".parse().unwrap();
        assert_eq!(id, DestinationId::Numeric(-1001234567890));
    }

    #[test]
    fn numeric_and_handle_namespaces_do_not_collide() {
        let numeric = DestinationId::Numeric(12345);
        let handle = DestinationId::handle("@12345").unwrap();
        assert_ne!(numeric, handle);
    }

    #[test]
    fn rejects_bad_identifiers() {
        assert_eq!("".parse::<DestinationId>(), Err(ParseIdentifierError::Empty));
        assert_eq!("@".parse::<DestinationId>(), Err(ParseIdentifierError::Empty));
        assert_eq!("0".parse::<DestinationId>(), Err(ParseIdentifierError::Zero));
        assert!(matches!(
            "-12abc".parse::<DestinationId>(),
            Err(ParseIdentifierError::InvalidNumber(_))
        ));
        assert!(matches!(
            "@bad-name".parse::<DestinationId>(),
            Err(ParseIdentifierError::InvalidChar { ch: '-' })
        ));
        let long = format!("@{}", "a".repeat(40));
        assert!(matches!(
            long.parse::<DestinationId>(),
            Err(ParseIdentifierError::TooLong { len: 40 })
        ));
    }

    #[test]
    fn destination_equality_ignores_added_at() {
        let id = DestinationId::Numeric(-100);
        let mut later = Destination::new(id.clone());
        later.added_at += chrono::Duration::seconds(30);
        assert_eq!(Destination::new(id), later);
    }

    #[test]
    fn text_messages_drop_captions() {
        let msg = Message::text("hello").with_caption("ignored");
        assert_eq!(msg.caption(), None);

        let photo = Message::media(MessageKind::Photo, "file-1").with_caption("look");
        assert_eq!(photo.caption(), Some("look"));
        assert!(photo.kind().is_media());
    }

    #[test]
    fn failure_outcome_exposes_reason() {
        let dest = Destination::new(DestinationId::Numeric(-1));
        assert_eq!(DeliveryOutcome::success(dest.clone()).failure_reason(), None);
        assert_eq!(
            DeliveryOutcome::failure(dest, FailureReason::NotAdmin).failure_reason(),
            Some(FailureReason::NotAdmin)
        );
    }

    #[test]
    fn entities_survive_serialization_and_are_omitted_when_absent() {
        let plain = serde_json::to_value(Message::text("hi")).unwrap();
        assert!(plain.get("entities").is_none());

        let spans = serde_json::json!([{ "type": "bold", "offset": 0, "length": 2 }]);
        let msg = Message::text("hi").with_entities(spans.clone());
        let back: Message = serde_json::from_value(serde_json::to_value(&msg).unwrap()).unwrap();
        assert_eq!(back.entities(), Some(&spans));
    }

    #[test]
    fn failure_detail_is_optional() {
        let dest = Destination::new(DestinationId::Numeric(-1));
        let outcome = DeliveryOutcome::failure(dest, FailureReason::Unknown).with_detail("timeout");
        assert_eq!(outcome.detail.as_deref(), Some("timeout"));

        let back: DeliveryOutcome = serde_json::from_str(
            r#"{"destination":{"id":{"numeric":-1},"added_at":"2026-01-01T00:00:00Z"},"status":{"status":"success"}}"#,
        )
        .unwrap();
        assert_eq!(back.detail, None);
    }
}
