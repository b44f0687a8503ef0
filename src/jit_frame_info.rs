use serde_json::Value;

use crate::fast_hash_map::{FastHashMap, FastHashSet};
use crate::frame::CategoryPair;
use crate::frame_table::FrameRow;
use crate::string_table::UniqueStrings;

/// One (possibly inlined) frame at a JIT code address.
#[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub struct JitFrameKey {
    pub canonical_address: u64,
    pub depth: u32,
}

/// What a [`JitAddressResolver`] knows about one frame at an address.
#[derive(Debug, Clone, PartialEq)]
pub struct JitFrameDescriptor {
    /// The start address of the JIT code that contains this frame. Return
    /// addresses inside the same code share a canonical address.
    pub canonical_address: u64,
    pub label: String,
    /// The JIT tier, for example "baseline" or "ion".
    pub implementation: Option<String>,
    pub optimizations: Option<Value>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub category: Option<CategoryPair>,
    pub relevant_for_js: bool,
}

/// Looks up the frames for a JIT return address, while the JIT code that
/// contains it is still alive.
pub trait JitAddressResolver {
    /// Returns the frames at `address`, outermost first. The position of a
    /// frame in the returned list is its inline depth. An empty list means
    /// the address is not JIT code known to the resolver.
    fn frames_for_address(&mut self, address: u64) -> Vec<JitFrameDescriptor>;
}

impl<F> JitAddressResolver for F
where
    F: FnMut(u64) -> Vec<JitFrameDescriptor>,
{
    fn frames_for_address(&mut self, address: u64) -> Vec<JitFrameDescriptor> {
        self(address)
    }
}

/// The JIT frame information that is valid for JitReturnAddr entries at
/// buffer positions in `range_start..range_end`.
///
/// Every return address maps to one or more [`JitFrameKey`]s, and every
/// key maps to the frame table row for that frame. The rows reference
/// strings in the string table of the owning [`JitFrameInfo`].
#[derive(Debug)]
pub struct JitFrameInfoForBufferRange {
    pub range_start: u64,
    /// The first position for which this info is no longer valid.
    pub range_end: u64,
    address_to_frames: FastHashMap<u64, Vec<JitFrameKey>>,
    frame_to_row: FastHashMap<JitFrameKey, FrameRow>,
}

impl JitFrameInfoForBufferRange {
    fn new(range_start: u64, range_end: u64) -> Self {
        Self {
            range_start,
            range_end,
            address_to_frames: FastHashMap::default(),
            frame_to_row: FastHashMap::default(),
        }
    }

    pub fn contains_position(&self, buffer_position: u64) -> bool {
        self.range_start <= buffer_position && buffer_position < self.range_end
    }

    pub fn frames_for_address(&self, address: u64) -> Option<&[JitFrameKey]> {
        self.address_to_frames.get(&address).map(Vec::as_slice)
    }

    pub fn frame_row(&self, key: &JitFrameKey) -> Option<&FrameRow> {
        self.frame_to_row.get(key)
    }

    pub fn address_count(&self) -> usize {
        self.address_to_frames.len()
    }

    /// Copies all address and frame maps.
    pub fn deep_copy(&self) -> Self {
        Self {
            range_start: self.range_start,
            range_end: self.range_end,
            address_to_frames: self.address_to_frames.clone(),
            frame_to_row: self.frame_to_row.clone(),
        }
    }
}

/// JIT frame information for multiple buffer ranges, and the string table
/// used by the frame rows in those ranges.
#[derive(Debug, Default)]
pub struct JitFrameInfo {
    /// In insertion order. Sorted and non-overlapping unless
    /// `has_overlapping_ranges` is set.
    ranges: Vec<JitFrameInfoForBufferRange>,
    has_overlapping_ranges: bool,
    unique_strings: UniqueStrings,
}

impl JitFrameInfo {
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds a range of JIT frame information for `range_start..range_end`.
    ///
    /// `address_provider` is called once, synchronously. It must call the
    /// consumer it is given for every JIT return address in the range;
    /// calling it repeatedly with the same address is fine.
    pub fn add_info_for_range<R, P>(
        &mut self,
        range_start: u64,
        range_end: u64,
        resolver: &mut R,
        address_provider: P,
    ) where
        R: JitAddressResolver + ?Sized,
        P: FnOnce(&mut dyn FnMut(u64)),
    {
        if let Some(previous) = self
            .ranges
            .iter()
            .find(|range| range_start < range.range_end)
        {
            log::warn!(
                "JIT info range {range_start}..{range_end} overlaps the previous range {}..{}",
                previous.range_start,
                previous.range_end
            );
            self.has_overlapping_ranges = true;
        }

        let mut range = JitFrameInfoForBufferRange::new(range_start, range_end);
        let strings = &mut self.unique_strings;
        let mut seen_addresses = FastHashSet::default();
        address_provider(&mut |address| {
            if !seen_addresses.insert(address) {
                return;
            }
            let descriptors = resolver.frames_for_address(address);
            if descriptors.is_empty() {
                return;
            }
            let mut keys = Vec::with_capacity(descriptors.len());
            for (depth, descriptor) in descriptors.into_iter().enumerate() {
                let key = JitFrameKey {
                    canonical_address: descriptor.canonical_address,
                    depth: depth as u32,
                };
                range
                    .frame_to_row
                    .entry(key)
                    .or_insert_with(|| render_jit_frame(descriptor, strings));
                keys.push(key);
            }
            range.address_to_frames.insert(address, keys);
        });
        self.ranges.push(range);
    }

    /// Whether none of the information is relevant to entries at or after
    /// `current_buffer_range_start` any more. No information at all counts
    /// as expired.
    pub fn has_expired(&self, current_buffer_range_start: u64) -> bool {
        match self.ranges.last() {
            None => true,
            Some(last) => last.range_end <= current_buffer_range_start,
        }
    }

    /// Drops the ranges that end at or before `current_buffer_range_start`.
    /// The string table is kept whole, since indices must stay stable.
    ///
    /// This shifts range indices, so it must not be called on info that a
    /// [`UniqueStacks`](crate::UniqueStacks) was already built from.
    pub fn discard_expired_ranges(&mut self, current_buffer_range_start: u64) {
        self.ranges
            .retain(|range| range.range_end > current_buffer_range_start);
        self.has_overlapping_ranges = self
            .ranges
            .iter()
            .enumerate()
            .any(|(i, range)| {
                self.ranges[..i]
                    .iter()
                    .any(|earlier| range.range_start < earlier.range_end)
            });
    }

    /// Finds the range covering `buffer_position` and the frames registered
    /// for `address` in it. Among overlapping ranges, the earliest added
    /// range that knows the address wins.
    pub fn lookup(&self, address: u64, buffer_position: u64) -> Option<(u32, &[JitFrameKey])> {
        lookup_in_ranges(
            &self.ranges,
            self.has_overlapping_ranges,
            address,
            buffer_position,
        )
    }

    pub fn has_overlapping_ranges(&self) -> bool {
        self.has_overlapping_ranges
    }

    pub fn ranges(&self) -> &[JitFrameInfoForBufferRange] {
        &self.ranges
    }

    pub fn unique_strings(&self) -> &UniqueStrings {
        &self.unique_strings
    }

    /// Copies the ranges and the string table, so that the copy can be
    /// extended without affecting this object.
    pub fn deep_copy(&self) -> Self {
        Self {
            ranges: self
                .ranges
                .iter()
                .map(JitFrameInfoForBufferRange::deep_copy)
                .collect(),
            has_overlapping_ranges: self.has_overlapping_ranges,
            unique_strings: self.unique_strings.clone(),
        }
    }

    pub fn into_parts(self) -> (Vec<JitFrameInfoForBufferRange>, UniqueStrings) {
        (self.ranges, self.unique_strings)
    }
}

pub(crate) fn lookup_in_ranges(
    ranges: &[JitFrameInfoForBufferRange],
    has_overlapping_ranges: bool,
    address: u64,
    buffer_position: u64,
) -> Option<(u32, &[JitFrameKey])> {
    if has_overlapping_ranges {
        // The binary search needs monotonic range ends.
        return ranges.iter().enumerate().find_map(|(range_index, range)| {
            if !range.contains_position(buffer_position) {
                return None;
            }
            let frames = range.frames_for_address(address)?;
            Some((range_index as u32, frames))
        });
    }

    let range_index = ranges.partition_point(|range| range.range_end <= buffer_position);
    let range = ranges.get(range_index)?;
    if !range.contains_position(buffer_position) {
        return None;
    }
    let frames = range.frames_for_address(address)?;
    Some((range_index as u32, frames))
}

fn render_jit_frame(descriptor: JitFrameDescriptor, strings: &mut UniqueStrings) -> FrameRow {
    FrameRow {
        location: strings.index_for_string(&descriptor.label),
        implementation: descriptor
            .implementation
            .as_deref()
            .map(|implementation| strings.index_for_string(implementation)),
        optimizations: descriptor.optimizations,
        line: descriptor.line,
        column: descriptor.column,
        category: descriptor.category,
        relevant_for_js: descriptor.relevant_for_js,
    }
}
