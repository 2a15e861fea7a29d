//! Message content classification.

use grammers_client::types::{Media, Message};

/// What a fetched post carries, in dispatch priority order: album membership
/// wins over media, media over text, text over empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Content {
    /// Part of a media album; handled by the group fan-out path.
    Grouped,
    Photo,
    Video,
    Audio,
    Document,
    /// Text or caption only.
    Text,
    /// Nothing downloadable and nothing to say.
    Empty,
}

impl Content {
    pub fn is_empty(self) -> bool {
        matches!(self, Content::Empty)
    }
}

/// Classify a fetched message. Total and deterministic over all inputs.
pub fn classify(msg: &Message) -> Content {
    let media = msg.media().and_then(|m| media_kind(&m));
    resolve(msg.grouped_id().is_some(), media, !msg.text().is_empty())
}

/// Media kind alone, ignoring album membership and text.
pub(crate) fn media_kind(media: &Media) -> Option<Content> {
    match media {
        Media::Photo(_) => Some(Content::Photo),
        Media::Document(doc) => {
            let mime = doc.mime_type().unwrap_or_default();
            if mime.starts_with("video/") {
                Some(Content::Video)
            } else if mime.starts_with("audio/") {
                Some(Content::Audio)
            } else {
                Some(Content::Document)
            }
        }
        Media::Sticker(_) => Some(Content::Document),
        // Link previews, polls, geo points and the like are not downloadable
        // payloads; a message carrying only those falls through to Text/Empty.
        _ => None,
    }
}

pub(crate) fn resolve(grouped: bool, media: Option<Content>, has_text: bool) -> Content {
    if grouped {
        return Content::Grouped;
    }
    if let Some(kind) = media {
        return kind;
    }
    if has_text {
        Content::Text
    } else {
        Content::Empty
    }
}

/// Definite media size in bytes when one is known ahead of the transfer.
/// Only documents (and therefore video/audio) report a size; photos do not.
pub fn known_size(msg: &Message) -> u64 {
    match msg.media() {
        Some(Media::Document(doc)) => doc.size().max(0) as u64,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_membership_wins() {
        assert_eq!(resolve(true, Some(Content::Photo), true), Content::Grouped);
        assert_eq!(resolve(true, None, false), Content::Grouped);
    }

    #[test]
    fn test_media_wins_over_caption() {
        // A photo with a caption classifies as Photo, not Text.
        assert_eq!(resolve(false, Some(Content::Photo), true), Content::Photo);
        assert_eq!(resolve(false, Some(Content::Video), true), Content::Video);
        assert_eq!(resolve(false, Some(Content::Audio), false), Content::Audio);
        assert_eq!(
            resolve(false, Some(Content::Document), true),
            Content::Document
        );
    }

    #[test]
    fn test_text_then_empty() {
        assert_eq!(resolve(false, None, true), Content::Text);
        assert_eq!(resolve(false, None, false), Content::Empty);
    }
}
