//! Operator command parsing.
//!
//! Turns `/command args` text into a validated [`Intent`], or into a direct
//! reply when the text is help, a usage error or an unconfirmed clear.

use herald_core::{DestinationId, Intent, Selector};

/// Shown for `/start`, `/help` and unknown commands.
pub const HELP_TEXT: &str = "\
📢 Channel Broadcaster

Send any text, photo, video, document, audio, voice note, sticker or animation \
and it is forwarded to every registered channel.

Commands:
/add_channel <@username | -100id> - register a channel
/remove_channel <position | @username | -100id> - unregister a channel
/list_channels - show registered channels
/clear_channels confirm - remove all channels
/stats - delivery statistics
/test - send a test message to every channel
/cancel - stop running broadcasts
/myid - show your Telegram user id
/help - this message

The bot must be an administrator with post rights in each channel.";

/// Body of the `/test` broadcast.
pub const TEST_MESSAGE: &str = "🧪 Test Message\nThis is a test broadcast from the bot.";

/// Result of parsing one command message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    Intent(Intent),
    /// Answer directly without touching the broadcast service.
    Reply(String),
    /// Broadcast [`TEST_MESSAGE`] with a live status message.
    TestBroadcast,
    /// Tell the sender their user id; allowed for anyone.
    WhoAmI,
}

/// Parse `text` as a command. Returns `None` when it is not a command at all.
pub fn parse(text: &str) -> Option<Parsed> {
    let text = text.trim();
    let rest = text.strip_prefix('/')?;
    let (head, args) = match rest.split_once(char::is_whitespace) {
        Some((head, args)) => (head, args.trim()),
        None => (rest, ""),
    };
    // `/list_channels@MyBot` in group chats.
    let command = head.split('@').next().unwrap_or(head).to_ascii_lowercase();

    let parsed = match command.as_str() {
        "start" | "help" => Parsed::Reply(HELP_TEXT.to_string()),
        "add_channel" | "add" => match first_arg(args) {
            None => usage("/add_channel @channel_username or /add_channel -1001234567890"),
            Some(arg) => match arg.parse::<DestinationId>() {
                Ok(id) => Parsed::Intent(Intent::AddDestination { id }),
                Err(e) => Parsed::Reply(format!("❌ Invalid channel identifier {arg:?}: {e}")),
            },
        },
        "remove_channel" | "remove" => match first_arg(args) {
            None => usage("/remove_channel <position from /list_channels, @username or id>"),
            Some(arg) => match arg.parse::<Selector>() {
                Ok(selector) => Parsed::Intent(Intent::RemoveDestination { selector }),
                Err(e) => Parsed::Reply(format!("❌ Invalid channel selector {arg:?}: {e}")),
            },
        },
        "list_channels" | "list" => Parsed::Intent(Intent::ListDestinations),
        "clear_channels" | "clear" => {
            if first_arg(args).is_some_and(|a| a.eq_ignore_ascii_case("confirm")) {
                Parsed::Intent(Intent::ClearDestinations)
            } else {
                Parsed::Reply(
                    "⚠️ This removes every registered channel. Send /clear_channels confirm to proceed."
                        .to_string(),
                )
            }
        }
        "stats" => Parsed::Intent(Intent::QueryStats),
        "cancel" => Parsed::Intent(Intent::CancelBroadcasts),
        "test" => Parsed::TestBroadcast,
        "myid" => Parsed::WhoAmI,
        other => Parsed::Reply(format!("Unknown command /{other}.\n\n{HELP_TEXT}")),
    };
    Some(parsed)
}

fn first_arg(args: &str) -> Option<&str> {
    args.split_whitespace().next()
}

fn usage(example: &str) -> Parsed {
    Parsed::Reply(format!("Usage: {example}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent(text: &str) -> Intent {
        match parse(text) {
            Some(Parsed::Intent(intent)) => intent,
            other => panic!("expected intent for {text:?}, got {other:?}"),
        }
    }

    fn reply(text: &str) -> String {
        match parse(text) {
            Some(Parsed::Reply(reply)) => reply,
            other => panic!("expected reply for {text:?}, got {other:?}"),
        }
    }

    #[test]
    fn plain_text_is_not_a_command() {
        assert_eq!(parse("hello channels"), None);
    }

    #[test]
    fn add_accepts_handles_and_numeric_ids() {
        assert_eq!(
            intent("/add_channel @News"),
            Intent::AddDestination {
                id: DestinationId::Handle("news".into())
            }
        );
        assert_eq!(
            intent("/add -1001234567890"),
            Intent::AddDestination {
                id: DestinationId::Numeric(-1001234567890)
            }
        );
    }

    #[test]
    fn add_without_argument_shows_usage() {
        assert!(reply("/add_channel").starts_with("Usage:"));
    }

    #[test]
    fn add_with_bad_identifier_is_answered_not_dispatched() {
        assert!(reply("/add_channel @bad!name").starts_with("❌"));
    }

    #[test]
    fn remove_by_position_or_id() {
        assert_eq!(
            intent("/remove_channel 2"),
            Intent::RemoveDestination {
                selector: Selector::Position(2)
            }
        );
        assert_eq!(
            intent("/remove_channel -1001"),
            Intent::RemoveDestination {
                selector: Selector::Id(DestinationId::Numeric(-1001))
            }
        );
    }

    #[test]
    fn clear_requires_confirmation() {
        assert!(reply("/clear_channels").contains("confirm"));
        assert_eq!(intent("/clear_channels confirm"), Intent::ClearDestinations);
    }

    #[test]
    fn bot_mention_suffix_is_ignored() {
        assert_eq!(intent("/list_channels@HeraldBot"), Intent::ListDestinations);
        assert_eq!(intent("/STATS"), Intent::QueryStats);
        assert_eq!(intent("/cancel"), Intent::CancelBroadcasts);
    }

    #[test]
    fn test_and_myid_are_recognised() {
        assert_eq!(parse("/test"), Some(Parsed::TestBroadcast));
        assert_eq!(parse("/myid@HeraldBot"), Some(Parsed::WhoAmI));
        assert!(HELP_TEXT.contains("/test"));
        assert!(HELP_TEXT.contains("/myid"));
    }

    #[test]
    fn help_and_unknown_commands_reply_with_help() {
        assert_eq!(reply("/start"), HELP_TEXT);
        assert!(reply("/frobnicate").contains("Unknown command /frobnicate"));
    }
}
