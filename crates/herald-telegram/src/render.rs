//! Plain-text rendering of replies for the operator chat.

use std::fmt::Write as _;

use herald_core::{BroadcastReport, Completion, Destination, DestinationId, HeraldError, Progress};
use herald_dispatch::{IntentReply, StatsSnapshot};

use crate::error::TelegramError;

/// Bot API message limit is 4096 characters; leave a little slack.
const CHUNK_MAX: usize = 4090;

/// Failed channels listed individually in a report; the rest are counted.
const LISTED_FAILURES: usize = 5;

/// Render the reply to one intent. `registered` is the registry size after it ran.
pub fn reply(reply: &IntentReply, registered: usize) -> String {
    match reply {
        IntentReply::Added(d) => format!(
            "✅ Channel {} has been added.\n• Total channels: {registered}",
            d.id
        ),
        IntentReply::Removed(d) => format!(
            "✅ Channel {} removed.\n• Remaining channels: {registered}",
            d.id
        ),
        IntentReply::Cleared(0) => "No channels to clear.".to_string(),
        IntentReply::Cleared(n) => format!("✅ All {n} channels have been cleared."),
        IntentReply::Listed(list) => listing(list),
        IntentReply::Broadcast(report) => broadcast_report(report),
        IntentReply::Stats(stats) => stats_text(stats),
        IntentReply::Cancelled => {
            "🛑 Running broadcasts will stop once in-flight sends finish.".to_string()
        }
    }
}

pub fn error(err: &HeraldError) -> String {
    match err {
        HeraldError::DuplicateDestination { id } => {
            format!("⚠️ Channel {id} is already registered.")
        }
        HeraldError::NotFound { selector } => {
            format!("❌ No registered channel matches {selector}. See /list_channels.")
        }
        other => format!("❌ {other}"),
    }
}

/// Reply for a channel that failed the add-time check.
pub fn verify_error(err: &TelegramError) -> String {
    match err {
        TelegramError::NotChannelAdmin { chat } => format!(
            "❌ Bot is not an administrator in {chat}.\nAdd the bot as administrator with post rights first."
        ),
        TelegramError::ChannelNotFound { id, reason } => format!(
            "❌ Could not find channel {id}: {reason}\nCheck the username or id and that the bot is a member."
        ),
        other => format!("❌ {other}"),
    }
}

pub fn my_id(user_id: u64) -> String {
    format!("Your Telegram user id: {user_id}")
}

pub fn unauthorized(user_id: u64) -> String {
    format!("⚠️ You are not authorized to use this bot.\nYour user id: {user_id}")
}

pub fn no_destinations() -> String {
    "No channels registered yet. Use /add_channel first.".to_string()
}

pub fn broadcast_started(total: usize) -> String {
    format!("📤 Broadcasting to {total} channels...")
}

pub fn progress(p: &Progress) -> String {
    format!(
        "📤 Broadcasting... {}/{}\n• ✅ {} sent\n• ❌ {} failed",
        p.done(),
        p.total,
        p.succeeded,
        p.failed
    )
}

fn listing(list: &[Destination]) -> String {
    if list.is_empty() {
        return no_destinations();
    }
    let mut out = String::from("📊 Registered Channels:\n\n");
    for (i, d) in list.iter().enumerate() {
        let kind = match d.id {
            DestinationId::Numeric(_) => "id",
            DestinationId::Handle(_) => "username",
        };
        let _ = writeln!(
            out,
            "{}. {} ({kind}, added {})",
            i + 1,
            d.id,
            d.added_at.format("%Y-%m-%d %H:%M UTC")
        );
    }
    let _ = write!(out, "\nTotal: {} channels", list.len());
    out
}

fn broadcast_report(report: &BroadcastReport) -> String {
    let headline = match report.completion {
        Completion::Exhausted => "✅ Broadcast completed!",
        Completion::BackoffCeiling => "⚠️ Broadcast stopped: Telegram kept rate limiting.",
        Completion::Cancelled => "🛑 Broadcast cancelled.",
    };
    let mut out = format!(
        "{headline}\n\n• ✅ Successful: {}\n• ❌ Failed: {}\n• 📊 Total: {}",
        report.succeeded, report.failed, report.total
    );
    if !report.failure_breakdown.is_empty() {
        out.push_str("\n\nFailures:");
        for (reason, count) in &report.failure_breakdown {
            let _ = write!(out, "\n• {reason}: {count}");
        }
    }
    if !report.failures.is_empty() {
        out.push_str("\n\nErrors:");
        for failure in report.failures.iter().take(LISTED_FAILURES) {
            let reason = failure
                .failure_reason()
                .map_or_else(String::new, |r| r.to_string());
            match &failure.detail {
                Some(detail) => {
                    let _ = write!(out, "\n• {}: {reason} ({detail})", failure.destination);
                }
                None => {
                    let _ = write!(out, "\n• {}: {reason}", failure.destination);
                }
            }
        }
        if report.failures.len() > LISTED_FAILURES {
            let _ = write!(
                out,
                "\n...and {} more",
                report.failures.len() - LISTED_FAILURES
            );
        }
    }
    out
}

fn stats_text(stats: &StatsSnapshot) -> String {
    let mut out = format!(
        "📈 Bot Statistics\n\nChannels:\n• Currently registered: {}\n\nBroadcasts:\n• Runs: {}\n• Delivered: {}\n• Failed: {}",
        stats.registered_destinations,
        stats.broadcasts,
        stats.deliveries_succeeded,
        stats.deliveries_failed
    );
    if let Some(last) = &stats.last_broadcast {
        let _ = write!(
            out,
            "\n• Last run: {}/{} at {}",
            last.succeeded,
            last.total,
            last.finished_at.format("%Y-%m-%d %H:%M UTC")
        );
    }
    out.push_str("\n\nStorage:\n• Channels are kept in memory\n• They reset when the bot restarts");
    out
}

/// Split `text` on line boundaries into chunks Telegram will accept.
pub fn split_chunks(text: &str) -> Vec<String> {
    if text.chars().count() <= CHUNK_MAX {
        return vec![text.to_string()];
    }
    let mut chunks = Vec::new();
    let mut current = String::new();
    for line in text.split('\n') {
        if !current.is_empty() && current.chars().count() + 1 + line.chars().count() > CHUNK_MAX {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);
        // a single overlong line is hard-split
        while current.chars().count() > CHUNK_MAX {
            let cut = current
                .char_indices()
                .nth(CHUNK_MAX)
                .map_or(current.len(), |(i, _)| i);
            let tail = current.split_off(cut);
            chunks.push(std::mem::replace(&mut current, tail));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;
    use herald_core::{DeliveryOutcome, FailureReason, RunId};

    use super::*;

    fn report(completion: Completion) -> BroadcastReport {
        BroadcastReport {
            run_id: RunId::new(),
            total: 5,
            succeeded: 3,
            failed: 2,
            failure_breakdown: BTreeMap::from([
                (FailureReason::NotAdmin, 1),
                (FailureReason::RateLimited, 1),
            ]),
            failures: Vec::new(),
            completion,
            started_at: Utc::now(),
            finished_at: Utc::now(),
        }
    }

    #[test]
    fn report_shows_counts_and_breakdown() {
        let text = reply(&IntentReply::Broadcast(report(Completion::Exhausted)), 5);
        assert!(text.starts_with("✅ Broadcast completed!"));
        assert!(text.contains("Successful: 3"));
        assert!(text.contains("Failed: 2"));
        assert!(text.contains("not_admin: 1"));
        assert!(text.contains("rate_limited: 1"));
    }

    #[test]
    fn report_lists_failed_channels_with_errors() {
        let mut r = report(Completion::Exhausted);
        r.failures = (1..=7)
            .map(|i| {
                DeliveryOutcome::failure(
                    Destination::new(DestinationId::Numeric(-1000 - i)),
                    FailureReason::NotAdmin,
                )
                .with_detail("no rights")
            })
            .collect();
        let text = reply(&IntentReply::Broadcast(r), 7);
        assert!(text.contains("• -1001: not_admin (no rights)"));
        assert!(text.contains("• -1005: not_admin"));
        assert!(!text.contains("-1006"));
        assert!(text.ends_with("...and 2 more"));
    }

    #[test]
    fn verify_errors_explain_the_fix() {
        let not_admin = TelegramError::NotChannelAdmin {
            chat: "Daily (@daily)".into(),
        };
        assert!(verify_error(&not_admin).contains("not an administrator in Daily (@daily)"));

        let missing = TelegramError::ChannelNotFound {
            id: "@nope".into(),
            reason: "chat not found".into(),
        };
        assert!(verify_error(&missing).starts_with("❌ Could not find channel @nope"));
        assert_eq!(my_id(42), "Your Telegram user id: 42");
    }

    #[test]
    fn ceiling_and_cancel_have_distinct_headlines() {
        let ceiling = reply(&IntentReply::Broadcast(report(Completion::BackoffCeiling)), 5);
        let cancelled = reply(&IntentReply::Broadcast(report(Completion::Cancelled)), 5);
        assert!(ceiling.contains("rate limiting"));
        assert!(cancelled.contains("cancelled"));
    }

    #[test]
    fn listing_is_numbered_in_order() {
        let list = vec![
            Destination::new(DestinationId::Handle("news".into())),
            Destination::new(DestinationId::Numeric(-1001)),
        ];
        let text = reply(&IntentReply::Listed(list), 2);
        let first = text.find("1. @news").unwrap();
        let second = text.find("2. -1001").unwrap();
        assert!(first < second);
        assert!(text.ends_with("Total: 2 channels"));
    }

    #[test]
    fn empty_listing_points_at_add() {
        assert_eq!(reply(&IntentReply::Listed(Vec::new()), 0), no_destinations());
        assert_eq!(reply(&IntentReply::Cleared(0), 0), "No channels to clear.");
    }

    #[test]
    fn duplicate_error_is_friendly() {
        let err = HeraldError::DuplicateDestination {
            id: "@news".to_string(),
        };
        assert_eq!(error(&err), "⚠️ Channel @news is already registered.");
    }

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(split_chunks("hello"), vec!["hello".to_string()]);
    }

    #[test]
    fn long_listing_splits_on_lines() {
        let line = "x".repeat(100);
        let text = vec![line.as_str(); 100].join("\n");
        let chunks = split_chunks(&text);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= CHUNK_MAX));
        assert_eq!(chunks.join("\n"), text);
    }

    #[test]
    fn overlong_line_is_hard_split() {
        let text = "y".repeat(CHUNK_MAX * 2 + 10);
        let chunks = split_chunks(&text);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.concat(), text);
    }
}
