//! Turn an inbound operator message into a broadcast payload.
//!
//! Media is forwarded by Telegram file id, so nothing is downloaded.
//! Formatting (bold, links, ...) travels as the message's entities.

use teloxide::prelude::*;
use teloxide::types::MessageEntity;

use herald_core::{Message as Outbound, MessageKind};

/// Build the outbound payload for `msg`, or `None` when it carries nothing
/// broadcastable.
pub fn extract(msg: &Message) -> Option<Outbound> {
    let caption = msg.caption().filter(|c| !c.trim().is_empty());
    let caption_spans = encode_entities(msg.caption_entities());
    let attach = |kind: MessageKind, file_id: &str| {
        let outbound = Outbound::media(kind, file_id);
        match (caption, caption_spans.clone()) {
            (Some(c), Some(spans)) => outbound.with_caption(c).with_entities(spans),
            (Some(c), None) => outbound.with_caption(c),
            (None, _) => outbound,
        }
    };

    // photo: highest resolution is the last size
    if let Some(photo) = msg.photo().and_then(|sizes| sizes.last()) {
        return Some(attach(MessageKind::Photo, &photo.file.id));
    }
    // animations also carry a document; check them first
    if let Some(animation) = msg.animation() {
        return Some(attach(MessageKind::Animation, &animation.file.id));
    }
    if let Some(video) = msg.video() {
        return Some(attach(MessageKind::Video, &video.file.id));
    }
    if let Some(document) = msg.document() {
        return Some(attach(MessageKind::Document, &document.file.id));
    }
    if let Some(audio) = msg.audio() {
        return Some(attach(MessageKind::Audio, &audio.file.id));
    }
    if let Some(voice) = msg.voice() {
        return Some(attach(MessageKind::Voice, &voice.file.id));
    }
    if let Some(sticker) = msg.sticker() {
        return Some(Outbound::media(MessageKind::Sticker, sticker.file.id.as_str()));
    }

    let text = msg.text().filter(|t| !t.trim().is_empty())?;
    let outbound = Outbound::text(text);
    Some(match encode_entities(msg.entities()) {
        Some(spans) => outbound.with_entities(spans),
        None => outbound,
    })
}

/// Serialize formatting spans; `None` when there are none.
fn encode_entities(entities: Option<&[MessageEntity]>) -> Option<serde_json::Value> {
    let entities = entities.filter(|e| !e.is_empty())?;
    serde_json::to_value(entities).ok()
}

#[cfg(test)]
mod tests {
    use teloxide::types::MessageEntityKind;

    use super::*;

    #[test]
    fn no_spans_encode_to_nothing() {
        assert_eq!(encode_entities(None), None);
        assert_eq!(encode_entities(Some(&[])), None);
    }

    #[test]
    fn spans_encode_in_bot_api_shape() {
        let spans = [MessageEntity::new(MessageEntityKind::Bold, 0, 4)];
        let value = encode_entities(Some(&spans)).unwrap();
        assert_eq!(value[0]["type"], "bold");
        assert_eq!(value[0]["offset"], 0);
        assert_eq!(value[0]["length"], 4);
    }
}
