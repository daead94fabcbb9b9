//! Notification log reader
//!
//! Walks the total order of all events across all stacks. The caller owns
//! the cursor: every read names its own start position, and the reader
//! keeps no state between reads.

use crate::types::RecordedEvent;

use super::store::{EventStore, EventStoreResult};

/// Default number of events fetched from the store per section
pub const DEFAULT_SECTION_SIZE: usize = 10;

/// Sequential reader over an event store's global ordering
pub struct NotificationLogReader<'a, S: EventStore + ?Sized> {
    store: &'a S,
    section_size: usize,
}

impl<'a, S: EventStore + ?Sized> NotificationLogReader<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            section_size: DEFAULT_SECTION_SIZE,
        }
    }

    /// Fetch `size` events per store read (at least 1)
    pub fn with_section_size(mut self, size: usize) -> Self {
        self.section_size = size.max(1);
        self
    }

    /// Lazily read every event at or after `start`, in position order.
    ///
    /// Position 0 reads from the beginning. The sequence ends at the last
    /// position the store held when `read` was called, so events appended
    /// while iterating are left for the next read.
    pub fn read(&self, start: u64) -> EventStoreResult<Notifications<'a, S>> {
        Ok(Notifications {
            store: self.store,
            section_size: self.section_size,
            next: start.max(1),
            end: self.store.last_position()?,
            section: Vec::new().into_iter(),
            failed: false,
        })
    }
}

/// Iterator returned by [`NotificationLogReader::read`]
pub struct Notifications<'a, S: EventStore + ?Sized> {
    store: &'a S,
    section_size: usize,
    next: u64,
    end: u64,
    section: std::vec::IntoIter<RecordedEvent>,
    failed: bool,
}

impl<S: EventStore + ?Sized> Notifications<'_, S> {
    fn fetch_section(&mut self) -> EventStoreResult<()> {
        let remaining = self.end + 1 - self.next;
        let limit = usize::try_from(remaining)
            .unwrap_or(usize::MAX)
            .min(self.section_size);

        let section = self.store.read_from(self.next, limit)?;
        self.section = section.into_iter();
        Ok(())
    }
}

impl<S: EventStore + ?Sized> Iterator for Notifications<'_, S> {
    type Item = EventStoreResult<RecordedEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        if let Some(event) = self.section.next() {
            self.next = event.position + 1;
            return Some(Ok(event));
        }

        if self.next > self.end {
            return None;
        }

        if let Err(e) = self.fetch_section() {
            self.failed = true;
            return Some(Err(e));
        }

        let event = self.section.next()?;
        self.next = event.position + 1;
        Some(Ok(event))
    }
}
