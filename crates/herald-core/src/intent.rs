//! Validated operator intents: the only input the broadcast engine accepts.
//!
//! The command surface turns raw operator text into one of these; ownership
//! has already been checked by the time an `Intent` exists.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::{DestinationId, Message, ParseIdentifierError};

/// Selects one registered destination for removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selector {
    /// 1-based position in the current listing order.
    Position(usize),
    Id(DestinationId),
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Position(n) => write!(f, "#{n}"),
            Self::Id(id) => id.fmt(f),
        }
    }
}

/// `#3` and bare positive integers select by position; anything else is an identifier.
///
/// Channel and supergroup ids are always negative, so a positive number is
/// never a plausible broadcast target.
impl FromStr for Selector {
    type Err = ParseIdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
        if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
            return match digits.parse::<usize>() {
                Ok(n) if n > 0 => Ok(Self::Position(n)),
                _ => Err(ParseIdentifierError::InvalidNumber(trimmed.to_string())),
            };
        }
        trimmed.parse().map(Self::Id)
    }
}

/// One operator request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "intent")]
pub enum Intent {
    AddDestination { id: DestinationId },
    RemoveDestination { selector: Selector },
    ClearDestinations,
    ListDestinations,
    Broadcast { message: Message },
    QueryStats,
    /// Stop starting new sends in every running broadcast.
    CancelBroadcasts,
}

impl Intent {
    /// Short name used in log fields.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddDestination { .. } => "add_destination",
            Self::RemoveDestination { .. } => "remove_destination",
            Self::ClearDestinations => "clear_destinations",
            Self::ListDestinations => "list_destinations",
            Self::Broadcast { .. } => "broadcast",
            Self::QueryStats => "query_stats",
            Self::CancelBroadcasts => "cancel_broadcasts",
        }
    }
}
