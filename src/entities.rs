//! Fixed-width column groups pulled from a status's entity sub-lists
//! (`entities.urls`, `entities.hashtags`, `entities.user_mentions`).

use crate::field_path::lookup;
use crate::record::Record;

/// Entity sub-list kinds, in the order their columns are emitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    Url,
    Hashtag,
    UserMention,
}

impl EntityKind {
    pub fn source_path(self) -> &'static str {
        match self {
            EntityKind::Url => "entities.urls",
            EntityKind::Hashtag => "entities.hashtags",
            EntityKind::UserMention => "entities.user_mentions",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Url => "url",
            EntityKind::Hashtag => "hashtag",
            EntityKind::UserMention => "user_mention",
        }
    }

    /// Column text for one list item. Urls prefer the expanded form over the short link.
    pub fn item_text(self, item: &Record) -> String {
        let text_of = |key: &str| {
            item.get(key)
                .and_then(Record::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let text = match self {
            EntityKind::Url => text_of("expanded_url").or_else(|| text_of("url")),
            EntityKind::Hashtag => text_of("text"),
            EntityKind::UserMention => text_of("screen_name"),
        };
        text.unwrap_or_default()
    }
}

/// One configured entity group: `width` columns, padded with `""`, overflow dropped.
#[derive(Clone, Copy, Debug)]
pub struct EntityColumns {
    pub kind: EntityKind,
    pub width: usize,
}

impl EntityColumns {
    pub fn new(kind: EntityKind, width: usize) -> Self {
        Self { kind, width }
    }

    pub fn labels(&self) -> impl Iterator<Item = String> + '_ {
        (1..=self.width).map(move |i| format!("{}_{}", self.kind.label(), i))
    }

    pub fn extract(&self, status: &Record) -> Vec<String> {
        let items = lookup(status, self.kind.source_path())
            .and_then(Record::as_list)
            .unwrap_or(&[]);
        (0..self.width)
            .map(|i| items.get(i).map(|item| self.kind.item_text(item)).unwrap_or_default())
            .collect()
    }
}

/// The non-empty groups for the given widths, in emission order (urls, hashtags, mentions).
pub fn configured_groups(urls: usize, hashtags: usize, mentions: usize) -> Vec<EntityColumns> {
    [
        (EntityKind::Url, urls),
        (EntityKind::Hashtag, hashtags),
        (EntityKind::UserMention, mentions),
    ]
    .into_iter()
    .filter(|(_, width)| *width > 0)
    .map(|(kind, width)| EntityColumns::new(kind, width))
    .collect()
}
