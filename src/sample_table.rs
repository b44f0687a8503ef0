use serde::ser::{Serialize, SerializeMap, SerializeTuple, Serializer};

use crate::buffer_view::{BufferView, EntryCursor};
use crate::entry::{EntryKind, ProfileBufferEntry};
use crate::frame::{CategoryPair, FrameFlags, FrameKey};
use crate::props::StreamingProps;
use crate::serialization_helpers::SerializableSchemaTable;
use crate::stack_table::StackKey;
use crate::string_fragments::DynamicStringBuilder;
use crate::unique_stacks::UniqueStacks;

pub const SAMPLE_TABLE_SCHEMA: &[&str] = &["stack", "time", "responsiveness"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub stack: Option<u32>,
    pub time: f64,
    pub responsiveness: Option<f64>,
}

impl Serialize for Sample {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut row = serializer.serialize_tuple(SAMPLE_TABLE_SCHEMA.len())?;
        row.serialize_element(&self.stack)?;
        row.serialize_element(&self.time)?;
        row.serialize_element(&self.responsiveness)?;
        row.end()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SampleTable {
    samples: Vec<Sample>,
}

impl SampleTable {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn add_sample(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl Serialize for SampleTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        SerializableSchemaTable {
            schema: SAMPLE_TABLE_SCHEMA,
            data: &self.samples,
        }
        .serialize(serializer)
    }
}

/// Reads the rest of a label frame whose `Label(len)` entry has just been
/// consumed: optional flags, the text fragments, then optional line,
/// column and category pair.
fn read_label_frame(len: u64, cursor: &mut EntryCursor) -> FrameKey {
    let flags = cursor
        .next_if_kind(EntryKind::FrameFlags)
        .map(|entry| FrameFlags::from_bits_truncate(entry.get_uint64()))
        .unwrap_or(FrameFlags::empty());

    let len = usize::try_from(len).unwrap_or(usize::MAX);
    let mut builder = DynamicStringBuilder::with_len(len);
    while !builder.is_complete() {
        match cursor.next_if_kind(EntryKind::DynamicStringFragment) {
            Some(entry) => {
                builder.push_fragment(&entry.get_chars());
            }
            None => break,
        }
    }
    let location = builder.finish();

    // Out-of-range values become absent cells.
    let line = cursor
        .next_if_kind(EntryKind::LineNumber)
        .and_then(|entry| u32::try_from(entry.get_int()).ok());
    let column = cursor
        .next_if_kind(EntryKind::ColumnNumber)
        .and_then(|entry| u32::try_from(entry.get_int()).ok());
    let category_pair = cursor
        .next_if_kind(EntryKind::CategoryPair)
        .and_then(|entry| u32::try_from(entry.get_int()).ok())
        .map(CategoryPair);

    FrameKey::new_normal(
        location,
        flags.is_relevant_for_js(),
        line,
        column,
        category_pair,
    )
}

/// Reads the frames of one sample and returns the stack of its leaf frame.
fn read_sample_stack(
    cursor: &mut EntryCursor,
    unique_stacks: &mut UniqueStacks,
    root_frame: &FrameKey,
) -> StackKey {
    let mut stack = unique_stacks.begin_stack(root_frame);
    while let Some((position, entry)) = cursor.peek() {
        match *entry {
            ProfileBufferEntry::Label(len) => {
                cursor.next();
                let frame = read_label_frame(len, cursor);
                stack = unique_stacks.append_frame(&stack, &frame);
            }
            ProfileBufferEntry::JitReturnAddr(address) => {
                cursor.next();
                match unique_stacks.lookup_frames_for_jit_address_from_buffer_pos(address, position)
                {
                    Some(frames) => {
                        for frame in &frames {
                            stack = unique_stacks.append_frame(&stack, frame);
                        }
                    }
                    None => {
                        stack = unique_stacks.append_frame(&stack, &FrameKey::from_address(address));
                    }
                }
            }
            ProfileBufferEntry::NativeLeafAddr(address) => {
                cursor.next();
                stack = unique_stacks.append_frame(&stack, &FrameKey::from_address(address));
            }
            _ => break,
        }
    }
    stack
}

/// Builds the sample table of thread `tid`, interning the sampled stacks
/// into `unique_stacks`.
///
/// A sample is `ThreadId`, `Time`, then its frames from the outermost to
/// the innermost, optionally followed by `Responsiveness`.
pub fn stream_samples(
    tid: i32,
    view: &BufferView,
    unique_stacks: &mut UniqueStacks,
    props: &StreamingProps,
) -> SampleTable {
    let mut table = SampleTable::new();
    let root_frame = FrameKey::from_label(&props.root_frame_label);
    let mut cursor = view.iter();
    while let Some((position, entry)) = cursor.next() {
        let ProfileBufferEntry::ThreadId(sample_tid) = *entry else {
            continue;
        };
        if sample_tid != tid {
            continue;
        }
        let Some(time) = cursor.next_if_kind(EntryKind::Time).map(|e| e.get_double()) else {
            log::debug!("Sample at buffer position {position} has no time, skipping");
            continue;
        };
        if !props.includes_time(time) {
            continue;
        }

        let stack = read_sample_stack(&mut cursor, unique_stacks, &root_frame);
        let responsiveness = cursor
            .next_if_kind(EntryKind::Responsiveness)
            .map(|e| e.get_double());
        table.add_sample(Sample {
            stack: Some(unique_stacks.get_or_add_stack_index(&stack)),
            time,
            responsiveness,
        });
    }
    table
}

pub const OVERHEAD_TABLE_SCHEMA: &[&str] = &[
    "time",
    "locking",
    "expiredMarkerCleaning",
    "counters",
    "threads",
];

/// Profiler overhead for one sampling loop iteration, in ms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverheadSample {
    pub time: f64,
    pub durations: [Option<f64>; 4],
}

impl Serialize for OverheadSample {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut row = serializer.serialize_tuple(OVERHEAD_TABLE_SCHEMA.len())?;
        row.serialize_element(&self.time)?;
        for duration in &self.durations {
            row.serialize_element(duration)?;
        }
        row.end()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProfilerOverheadTable {
    samples: Vec<OverheadSample>,
}

impl ProfilerOverheadTable {
    pub fn samples(&self) -> &[OverheadSample] {
        &self.samples
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl Serialize for ProfilerOverheadTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(
            "samples",
            &SerializableSchemaTable {
                schema: OVERHEAD_TABLE_SCHEMA,
                data: &self.samples,
            },
        )?;
        map.end()
    }
}

/// `ProfilerOverheadTime(t)` followed by up to four
/// `ProfilerOverheadDuration` entries: locking, expired marker cleaning,
/// counters, threads.
pub fn stream_profiler_overhead(view: &BufferView, props: &StreamingProps) -> ProfilerOverheadTable {
    let mut table = ProfilerOverheadTable::default();
    let mut cursor = view.iter();
    while let Some((_, entry)) = cursor.next() {
        let ProfileBufferEntry::ProfilerOverheadTime(time) = *entry else {
            continue;
        };
        let mut durations = [None; 4];
        for duration in &mut durations {
            match cursor.next_if_kind(EntryKind::ProfilerOverheadDuration) {
                Some(entry) => *duration = Some(entry.get_double()),
                None => break,
            }
        }
        if props.includes_time(time) {
            table.samples.push(OverheadSample { time, durations });
        }
    }
    table
}

pub const PAUSED_REASON_PROFILER_PAUSED: &str = "profiler-paused";
pub const PAUSED_REASON_COLLECTING: &str = "collecting";

/// A time range during which no samples were taken.
#[derive(Debug, Clone, PartialEq)]
pub struct PausedRange {
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
    pub reason: &'static str,
}

impl Serialize for PausedRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("startTime", &self.start_time)?;
        map.serialize_entry("endTime", &self.end_time)?;
        map.serialize_entry("reason", self.reason)?;
        map.end()
    }
}

/// Pairs `Pause`/`Resume` and `CollectionStart`/`CollectionEnd` entries.
/// A range that is still open at the end of the buffer has no end time;
/// an end without a start in the buffer has no start time.
pub fn stream_paused_ranges(view: &BufferView) -> Vec<PausedRange> {
    let mut ranges = Vec::new();
    let mut paused_start: Option<f64> = None;
    let mut collection_start: Option<f64> = None;
    for (_, entry) in view.iter() {
        match *entry {
            ProfileBufferEntry::Pause(time) => paused_start = Some(time),
            ProfileBufferEntry::Resume(time) => ranges.push(PausedRange {
                start_time: paused_start.take(),
                end_time: Some(time),
                reason: PAUSED_REASON_PROFILER_PAUSED,
            }),
            ProfileBufferEntry::CollectionStart(time) => collection_start = Some(time),
            ProfileBufferEntry::CollectionEnd(time) => ranges.push(PausedRange {
                start_time: collection_start.take(),
                end_time: Some(time),
                reason: PAUSED_REASON_COLLECTING,
            }),
            _ => {}
        }
    }
    if let Some(start_time) = paused_start {
        ranges.push(PausedRange {
            start_time: Some(start_time),
            end_time: None,
            reason: PAUSED_REASON_PROFILER_PAUSED,
        });
    }
    if let Some(start_time) = collection_start {
        ranges.push(PausedRange {
            start_time: Some(start_time),
            end_time: None,
            reason: PAUSED_REASON_COLLECTING,
        });
    }
    ranges
}
