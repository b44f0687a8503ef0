use crate::entry::{EntryKind, ProfileBufferEntry};

/// A read-only window onto the live part of the profiler buffer.
///
/// Buffer positions are logical and keep increasing as the buffer wraps
/// around: the entry at `entries[i]` has position `range_start + i`.
#[derive(Debug, Clone, Copy)]
pub struct BufferView<'a> {
    range_start: u64,
    entries: &'a [ProfileBufferEntry],
}

impl<'a> BufferView<'a> {
    pub fn new(range_start: u64, entries: &'a [ProfileBufferEntry]) -> Self {
        Self {
            range_start,
            entries,
        }
    }

    /// The position of the oldest entry that is still in the buffer.
    /// Everything before it has been evicted.
    pub fn range_start(&self) -> u64 {
        self.range_start
    }

    /// The position that the next entry will be written to.
    pub fn range_end(&self) -> u64 {
        self.range_start + self.entries.len() as u64
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &'a [ProfileBufferEntry] {
        self.entries
    }

    pub fn get(&self, position: u64) -> Option<&'a ProfileBufferEntry> {
        let offset = position.checked_sub(self.range_start)?;
        self.entries.get(usize::try_from(offset).ok()?)
    }

    pub fn iter(&self) -> EntryCursor<'a> {
        EntryCursor {
            view: *self,
            offset: 0,
        }
    }

    /// A cursor starting at `position`, clamped to the view.
    pub fn iter_from(&self, position: u64) -> EntryCursor<'a> {
        let offset = position.saturating_sub(self.range_start);
        EntryCursor {
            view: *self,
            offset: usize::try_from(offset).unwrap_or(usize::MAX).min(self.entries.len()),
        }
    }

    /// Calls `consumer` with the address of every JitReturnAddr entry that
    /// belongs to a sample of thread `tid`, starting at `position`.
    pub fn for_each_jit_address(&self, position: u64, tid: i32, consumer: &mut dyn FnMut(u64)) {
        let mut current_tid = None;
        for (_, entry) in self.iter_from(position) {
            match *entry {
                ProfileBufferEntry::ThreadId(entry_tid) => current_tid = Some(entry_tid),
                ProfileBufferEntry::JitReturnAddr(address) if current_tid == Some(tid) => {
                    consumer(address)
                }
                _ => {}
            }
        }
    }
}

/// Walks a [`BufferView`], yielding `(position, entry)` pairs.
#[derive(Debug, Clone)]
pub struct EntryCursor<'a> {
    view: BufferView<'a>,
    offset: usize,
}

impl<'a> EntryCursor<'a> {
    /// The position of the entry that `next` will return.
    pub fn position(&self) -> u64 {
        self.view.range_start + self.offset as u64
    }

    pub fn peek(&self) -> Option<(u64, &'a ProfileBufferEntry)> {
        let entry = self.view.entries.get(self.offset)?;
        Some((self.position(), entry))
    }

    /// Consumes the next entry if it has the given kind.
    pub fn next_if_kind(&mut self, kind: EntryKind) -> Option<&'a ProfileBufferEntry> {
        let (_, entry) = self.peek()?;
        if !entry.is_kind(kind) {
            return None;
        }
        self.offset += 1;
        Some(entry)
    }
}

impl<'a> Iterator for EntryCursor<'a> {
    type Item = (u64, &'a ProfileBufferEntry);

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.peek()?;
        self.offset += 1;
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_start_at_range_start() {
        let entries = [
            ProfileBufferEntry::ThreadId(1),
            ProfileBufferEntry::Time(1.0),
            ProfileBufferEntry::JitReturnAddr(0xabc),
        ];
        let view = BufferView::new(1000, &entries);
        assert_eq!(view.range_end(), 1003);
        assert_eq!(view.get(1002), Some(&entries[2]));
        assert_eq!(view.get(999), None);
        assert_eq!(view.get(1003), None);

        let positions: Vec<u64> = view.iter().map(|(position, _)| position).collect();
        assert_eq!(positions, vec![1000, 1001, 1002]);

        let mut cursor = view.iter_from(1001);
        assert!(cursor.next_if_kind(EntryKind::ThreadId).is_none());
        assert_eq!(
            cursor.next_if_kind(EntryKind::Time),
            Some(&ProfileBufferEntry::Time(1.0))
        );
        assert_eq!(cursor.position(), 1002);
    }

    #[test]
    fn jit_addresses_are_filtered_by_thread() {
        let entries = [
            ProfileBufferEntry::ThreadId(1),
            ProfileBufferEntry::JitReturnAddr(0x10),
            ProfileBufferEntry::ThreadId(2),
            ProfileBufferEntry::JitReturnAddr(0x20),
            ProfileBufferEntry::ThreadId(1),
            ProfileBufferEntry::JitReturnAddr(0x30),
        ];
        let view = BufferView::new(0, &entries);
        let mut addresses = Vec::new();
        view.for_each_jit_address(0, 1, &mut |address| addresses.push(address));
        assert_eq!(addresses, vec![0x10, 0x30]);

        addresses.clear();
        view.for_each_jit_address(2, 1, &mut |address| addresses.push(address));
        assert_eq!(addresses, vec![0x30]);
    }
}
