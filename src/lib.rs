//! This crate turns the entries of a Gecko-style sampling profiler buffer
//! into the per-thread JSON that the
//! [Firefox Profiler](https://profiler.firefox.com/) loads.
//!
//! The buffer is a sequence of [`ProfileBufferEntry`] values, each stored
//! as a 9-byte record: a kind tag followed by an 8-byte payload. Samples,
//! markers, counters and memory readings are all written into it as
//! short runs of entries.
//!
//! Streaming a thread deduplicates its frames and stacks into a frame
//! table and a prefix-linked stack table. JIT return addresses are
//! resolved into one or more (possibly inlined) frames with the help of a
//! [`JitAddressResolver`], using [`JitFrameInfo`] collected for the buffer
//! range the address was sampled in. [`ProfiledThreadData`] keeps that
//! information alive after the JS context that could resolve the addresses
//! is gone.
//!
//! ## Example
//!
//! ```
//! use gecko_profile_buffer::{
//!     label_entries, BufferView, FrameFlags, NoMarkers, ProfileBufferEntry,
//!     ProfiledThreadData, StreamingProps,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut entries = vec![
//!     ProfileBufferEntry::ThreadId(7),
//!     ProfileBufferEntry::Time(10.0),
//! ];
//! entries.extend(label_entries("main", FrameFlags::empty()));
//! entries.push(ProfileBufferEntry::NativeLeafAddr(0x1234));
//!
//! let view = BufferView::new(0, &entries);
//! let mut thread = ProfiledThreadData::new(7);
//! let profile = thread.stream_json(&view, None, &NoMarkers, &StreamingProps::default());
//!
//! let json = serde_json::to_value(&profile)?;
//! assert_eq!(json["samples"]["data"][0][0], 2);
//! # Ok(())
//! # }
//! ```

mod buffer_view;
mod counters;
mod entry;
mod error;
mod fast_hash_map;
mod frame;
mod frame_table;
mod jit_frame_info;
mod markers;
mod process;
mod profiled_thread_data;
mod props;
mod sample_table;
mod serialization_helpers;
mod stack_table;
mod string_fragments;
mod string_table;
mod thread;
mod unique_stacks;

pub use buffer_view::{BufferView, EntryCursor};
pub use counters::{
    stream_counters, stream_memory, Counter, CounterDescription, CounterSample,
    CounterSampleGroup, MemorySample, MemoryTable, COUNTER_SAMPLES_SCHEMA, MEMORY_SAMPLES_SCHEMA,
};
pub use entry::{
    decode_entries, encode_entries, EntryKind, ProfileBufferEntry, ENTRY_SIZE, PAYLOAD_SIZE,
};
pub use error::Error;
pub use fast_hash_map::{FastHashMap, FastHashSet};
pub use frame::{CategoryPair, FrameFlags, FrameKey, JitFrameData, NormalFrameData};
pub use frame_table::{FrameRow, FrameTable, FRAME_TABLE_SCHEMA};
pub use jit_frame_info::{
    JitAddressResolver, JitFrameDescriptor, JitFrameInfo, JitFrameInfoForBufferRange, JitFrameKey,
};
pub use markers::{
    stream_markers, MarkerLookup, MarkerRef, MarkerRow, MarkerTable, NoMarkers, ProfilerMarker,
    MARKER_TABLE_SCHEMA,
};
pub use process::ProcessProfile;
pub use profiled_thread_data::ProfiledThreadData;
pub use props::StreamingProps;
pub use sample_table::{
    stream_paused_ranges, stream_profiler_overhead, stream_samples, OverheadSample, PausedRange,
    ProfilerOverheadTable, Sample, SampleTable, OVERHEAD_TABLE_SCHEMA,
    PAUSED_REASON_COLLECTING, PAUSED_REASON_PROFILER_PAUSED, SAMPLE_TABLE_SCHEMA,
};
pub use stack_table::{StackKey, StackRow, StackTable, STACK_TABLE_SCHEMA};
pub use string_fragments::{
    fragments_for_string, label_entries, string_from_fragments, DynamicStringBuilder,
};
pub use string_table::{StringIndex, UniqueStrings};
pub use thread::ThreadProfile;
pub use unique_stacks::UniqueStacks;
