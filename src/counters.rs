use serde::ser::{Serialize, SerializeMap, SerializeTuple, Serializer};

use crate::buffer_view::BufferView;
use crate::entry::{EntryKind, ProfileBufferEntry};
use crate::fast_hash_map::FastHashMap;
use crate::props::StreamingProps;
use crate::serialization_helpers::SerializableSchemaTable;

pub const COUNTER_SAMPLES_SCHEMA: &[&str] = &["time", "number", "count"];
pub const MEMORY_SAMPLES_SCHEMA: &[&str] = &["time", "rss", "uss"];

/// The static description of a counter, keyed by the id stored in
/// `CounterId` entries.
#[derive(Debug, Clone, PartialEq, Eq, serde_derive::Serialize, serde_derive::Deserialize)]
pub struct CounterDescription {
    pub name: String,
    pub category: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CounterSample {
    pub time: f64,
    pub number: Option<u64>,
    pub count: i64,
}

impl Serialize for CounterSample {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut row = serializer.serialize_tuple(COUNTER_SAMPLES_SCHEMA.len())?;
        row.serialize_element(&self.time)?;
        row.serialize_element(&self.number)?;
        row.serialize_element(&self.count)?;
        row.end()
    }
}

/// The samples of one counter for one key.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterSampleGroup {
    pub id: u64,
    pub samples: Vec<CounterSample>,
}

impl Serialize for CounterSampleGroup {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry(
            "samples",
            &SerializableSchemaTable {
                schema: COUNTER_SAMPLES_SCHEMA,
                data: &self.samples,
            },
        )?;
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Counter {
    pub counter_id: u64,
    pub description: CounterDescription,
    pub sample_groups: Vec<CounterSampleGroup>,
    group_index_for_key: FastHashMap<u64, usize>,
}

impl Counter {
    fn new(counter_id: u64, description: CounterDescription) -> Self {
        Self {
            counter_id,
            description,
            sample_groups: Vec::new(),
            group_index_for_key: FastHashMap::default(),
        }
    }

    fn add_sample(&mut self, key: u64, sample: CounterSample) {
        let groups = &mut self.sample_groups;
        let group_index = *self.group_index_for_key.entry(key).or_insert_with(|| {
            groups.push(CounterSampleGroup {
                id: key,
                samples: Vec::new(),
            });
            groups.len() - 1
        });
        self.sample_groups[group_index].samples.push(sample);
    }
}

impl Serialize for Counter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry("name", &self.description.name)?;
        map.serialize_entry("category", &self.description.category)?;
        map.serialize_entry("description", &self.description.description)?;
        map.serialize_entry("sample_groups", &self.sample_groups)?;
        map.end()
    }
}

/// Collects counter samples, grouped by counter and then by key, both in
/// order of first appearance. Counters without samples in the time range
/// are left out.
///
/// The layout is `CounterId(id) Time(t)` followed by any number of
/// `CounterKey(k) Count(c) [Number(n)]` groups.
pub fn stream_counters(
    view: &BufferView,
    descriptions: &FastHashMap<u64, CounterDescription>,
    props: &StreamingProps,
) -> Vec<Counter> {
    let mut counters: Vec<Counter> = Vec::new();
    let mut counter_index_for_id: FastHashMap<u64, usize> = FastHashMap::default();
    let mut cursor = view.iter();
    while let Some((position, entry)) = cursor.next() {
        let ProfileBufferEntry::CounterId(counter_id) = *entry else {
            continue;
        };
        let Some(time) = cursor.next_if_kind(EntryKind::Time).map(|e| e.get_double()) else {
            log::debug!("Counter sample at buffer position {position} has no time, skipping");
            continue;
        };
        while let Some(key_entry) = cursor.next_if_kind(EntryKind::CounterKey) {
            let key = key_entry.get_uint64();
            let Some(count) = cursor.next_if_kind(EntryKind::Count).map(|e| e.get_int64()) else {
                log::debug!("Counter key {key} at time {time} has no count");
                break;
            };
            let number = cursor
                .next_if_kind(EntryKind::Number)
                .map(|e| e.get_uint64());
            if !props.includes_time(time) {
                continue;
            }
            let counter_index = *counter_index_for_id.entry(counter_id).or_insert_with(|| {
                let description = descriptions.get(&counter_id).cloned().unwrap_or_else(|| {
                    log::debug!("No description for counter {counter_id:#x}");
                    CounterDescription {
                        name: format!("{counter_id:#x}"),
                        category: String::new(),
                        description: String::new(),
                    }
                });
                counters.push(Counter::new(counter_id, description));
                counters.len() - 1
            });
            counters[counter_index].add_sample(key, CounterSample { time, number, count });
        }
    }
    counters
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemorySample {
    pub time: f64,
    pub rss: f64,
    pub uss: Option<u64>,
}

impl Serialize for MemorySample {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut row = serializer.serialize_tuple(MEMORY_SAMPLES_SCHEMA.len())?;
        row.serialize_element(&self.time)?;
        row.serialize_element(&self.rss)?;
        row.serialize_element(&self.uss)?;
        row.end()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryTable {
    /// The resident memory of the first memory sample in the buffer.
    pub initial_heap: f64,
    pub samples: Vec<MemorySample>,
}

impl Serialize for MemoryTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("initial_heap", &self.initial_heap)?;
        map.serialize_entry(
            "samples",
            &SerializableSchemaTable {
                schema: MEMORY_SAMPLES_SCHEMA,
                data: &self.samples,
            },
        )?;
        map.end()
    }
}

/// Collects `ResidentMemory(rss) [UnsharedMemory(uss)]` readings, each
/// timed by the closest preceding `Time` entry. Returns `None` if the
/// buffer has no memory readings.
pub fn stream_memory(view: &BufferView, props: &StreamingProps) -> Option<MemoryTable> {
    let mut samples = Vec::new();
    let mut last_time = None;
    let mut cursor = view.iter();
    while let Some((position, entry)) = cursor.next() {
        match *entry {
            ProfileBufferEntry::Time(time) => last_time = Some(time),
            ProfileBufferEntry::ResidentMemory(rss) => {
                let uss = cursor
                    .next_if_kind(EntryKind::UnsharedMemory)
                    .map(|e| e.get_uint64());
                match last_time {
                    Some(time) if props.includes_time(time) => {
                        samples.push(MemorySample { time, rss, uss })
                    }
                    Some(_) => {}
                    None => log::debug!(
                        "Memory reading at buffer position {position} has no time, skipping"
                    ),
                }
            }
            _ => {}
        }
    }
    let initial_heap = samples.first()?.rss;
    Some(MemoryTable {
        initial_heap,
        samples,
    })
}
