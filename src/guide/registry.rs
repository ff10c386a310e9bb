//! First-seen deduplication of channels and events
//!
//! Both registries apply the same two gates in order: the favorites filter,
//! then the identity check. A channel rejected by the favorites filter is
//! not remembered as seen.

use std::collections::HashSet;
use tracing::debug;

use super::document::GuideDocument;
use super::programme::{build_channel, ProgrammeBuilder};
use crate::models::{GridChannel, GridEvent};

/// Channel id allow-list; an empty list allows every channel
#[derive(Debug, Clone, Default)]
pub struct FavoritesFilter {
    channel_ids: HashSet<String>,
}

impl FavoritesFilter {
    pub fn new(channel_ids: HashSet<String>) -> Self {
        Self { channel_ids }
    }

    pub fn is_unrestricted(&self) -> bool {
        self.channel_ids.is_empty()
    }

    pub fn allows(&self, channel_id: &str) -> bool {
        self.is_unrestricted() || self.channel_ids.contains(channel_id)
    }
}

/// Identity of a broadcast: the same channel, start and end is the same event
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventKey {
    pub channel_id: String,
    pub start_time: String,
    pub end_time: String,
}

impl EventKey {
    pub fn new(channel_id: &str, event: &GridEvent) -> Self {
        Self {
            channel_id: channel_id.to_string(),
            start_time: event.start_time.clone(),
            end_time: event.end_time.clone(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ChannelRegistry {
    favorites: FavoritesFilter,
    seen: HashSet<String>,
}

impl ChannelRegistry {
    pub fn new(favorites: FavoritesFilter) -> Self {
        Self {
            favorites,
            seen: HashSet::new(),
        }
    }

    /// Append a channel block the first time `channel` is seen
    pub fn add_if_new(&mut self, channel: &GridChannel, document: &mut GuideDocument) -> bool {
        if !self.favorites.allows(&channel.channel_id) {
            return false;
        }
        if self.seen.contains(&channel.channel_id) {
            debug!("Duplicate Channel: {}", channel.channel_id);
            return false;
        }

        document.push_channel(build_channel(channel));
        self.seen.insert(channel.channel_id.clone());
        true
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[derive(Debug)]
pub struct EventRegistry {
    favorites: FavoritesFilter,
    builder: ProgrammeBuilder,
    seen: HashSet<EventKey>,
}

impl EventRegistry {
    pub fn new(favorites: FavoritesFilter, builder: ProgrammeBuilder) -> Self {
        Self {
            favorites,
            builder,
            seen: HashSet::new(),
        }
    }

    /// Append a programme block the first time the event's identity is seen
    ///
    /// The first occurrence wins even when later copies carry different
    /// details.
    pub fn add_if_new(
        &mut self,
        event: &GridEvent,
        channel_id: &str,
        document: &mut GuideDocument,
    ) -> bool {
        if !self.favorites.allows(channel_id) {
            return false;
        }

        let key = EventKey::new(channel_id, event);
        if self.seen.contains(&key) {
            return false;
        }

        document.push_programme(self.builder.build(event, channel_id));
        self.seen.insert(key);
        true
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
