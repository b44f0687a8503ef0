use serde::ser::SerializeSeq;

use crate::frame::{FrameKey, JitFrameData};
use crate::frame_table::{FrameRow, FrameTable};
use crate::jit_frame_info::{lookup_in_ranges, JitFrameInfo, JitFrameInfoForBufferRange, JitFrameKey};
use crate::stack_table::{StackKey, StackTable};
use crate::string_table::UniqueStrings;

/// Deduplicates frames and stacks into a frame table and a stack table.
///
/// The string table and the JIT ranges are taken over from the
/// [`JitFrameInfo`] this is created from, so that the pre-rendered JIT
/// frame rows keep referencing the right strings.
#[derive(Debug)]
pub struct UniqueStacks {
    unique_strings: UniqueStrings,
    frame_table: FrameTable,
    stack_table: StackTable,
    jit_info_ranges: Vec<JitFrameInfoForBufferRange>,
    jit_info_ranges_overlap: bool,
}

impl Default for UniqueStacks {
    fn default() -> Self {
        Self::new(JitFrameInfo::new())
    }
}

impl UniqueStacks {
    pub fn new(jit_frame_info: JitFrameInfo) -> Self {
        let jit_info_ranges_overlap = jit_frame_info.has_overlapping_ranges();
        let (jit_info_ranges, unique_strings) = jit_frame_info.into_parts();
        Self {
            unique_strings,
            frame_table: FrameTable::new(),
            stack_table: StackTable::new(),
            jit_info_ranges,
            jit_info_ranges_overlap,
        }
    }

    /// Returns a stack key for `frame` as the stack's root frame.
    #[must_use]
    pub fn begin_stack(&mut self, frame: &FrameKey) -> StackKey {
        StackKey::root(self.get_or_add_frame_index(frame))
    }

    /// Returns the stack key for `stack` with `frame` appended.
    #[must_use]
    pub fn append_frame(&mut self, stack: &StackKey, frame: &FrameKey) -> StackKey {
        let prefix_stack_index = self.get_or_add_stack_index(stack);
        let frame_index = self.get_or_add_frame_index(frame);
        StackKey::with_prefix(stack, prefix_stack_index, frame_index)
    }

    /// Looks up the frames for a JitReturnAddr entry at `buffer_position`.
    /// Returns `None` if no JIT info covers that position, or if the
    /// covering info doesn't know the address.
    #[must_use]
    pub fn lookup_frames_for_jit_address_from_buffer_pos(
        &self,
        jit_address: u64,
        buffer_position: u64,
    ) -> Option<Vec<FrameKey>> {
        let (range_index, jit_frame_keys) = lookup_in_ranges(
            &self.jit_info_ranges,
            self.jit_info_ranges_overlap,
            jit_address,
            buffer_position,
        )?;
        Some(
            jit_frame_keys
                .iter()
                .map(|key| FrameKey::new_jit(key.canonical_address, key.depth, range_index))
                .collect(),
        )
    }

    #[must_use]
    pub fn get_or_add_frame_index(&mut self, frame: &FrameKey) -> u32 {
        let strings = &mut self.unique_strings;
        let ranges = &self.jit_info_ranges;
        self.frame_table.index_for_frame(frame, || match frame {
            FrameKey::Normal(data) => FrameRow::for_normal_frame(data, strings),
            FrameKey::Jit(data) => jit_frame_row(ranges, data, strings),
        })
    }

    #[must_use]
    pub fn get_or_add_stack_index(&mut self, stack: &StackKey) -> u32 {
        self.stack_table.index_for_stack(stack)
    }

    pub fn unique_strings(&self) -> &UniqueStrings {
        &self.unique_strings
    }

    pub fn unique_strings_mut(&mut self) -> &mut UniqueStrings {
        &mut self.unique_strings
    }

    pub fn frame_table(&self) -> &FrameTable {
        &self.frame_table
    }

    pub fn stack_table(&self) -> &StackTable {
        &self.stack_table
    }

    pub fn splice_frame_table_elements<Q: SerializeSeq>(&self, seq: &mut Q) -> Result<(), Q::Error> {
        self.frame_table.splice_elements(seq)
    }

    pub fn splice_stack_table_elements<Q: SerializeSeq>(&self, seq: &mut Q) -> Result<(), Q::Error> {
        self.stack_table.splice_elements(seq)
    }

    pub fn splice_string_table_elements<Q: SerializeSeq>(&self, seq: &mut Q) -> Result<(), Q::Error> {
        self.unique_strings.splice_string_table_elements(seq)
    }
}

fn jit_frame_row(
    ranges: &[JitFrameInfoForBufferRange],
    data: &JitFrameData,
    strings: &mut UniqueStrings,
) -> FrameRow {
    let key = JitFrameKey {
        canonical_address: data.canonical_address,
        depth: data.depth,
    };
    match ranges
        .get(data.range_index as usize)
        .and_then(|range| range.frame_row(&key))
    {
        Some(row) => row.clone(),
        None => {
            log::warn!(
                "No JIT frame info for {:#x} at depth {} in range {}",
                data.canonical_address,
                data.depth,
                data.range_index
            );
            FrameRow::for_address(data.canonical_address, strings)
        }
    }
}
