use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::buffer_view::BufferView;
use crate::counters::{stream_counters, stream_memory, Counter, CounterDescription, MemoryTable};
use crate::fast_hash_map::FastHashMap;
use crate::props::StreamingProps;
use crate::sample_table::{stream_profiler_overhead, ProfilerOverheadTable};
use crate::thread::ThreadProfile;

/// The JSON object for a process: its threads plus the process-wide
/// counter, memory and profiler overhead tables.
#[derive(Debug)]
pub struct ProcessProfile {
    name: String,
    pid: u32,
    threads: Vec<ThreadProfile>,
    counters: Vec<Counter>,
    memory: Option<MemoryTable>,
    profiler_overhead: Option<ProfilerOverheadTable>,
}

impl ProcessProfile {
    pub fn new(name: &str, pid: u32) -> Self {
        Self {
            name: name.to_string(),
            pid,
            threads: Vec::new(),
            counters: Vec::new(),
            memory: None,
            profiler_overhead: None,
        }
    }

    pub fn add_thread(&mut self, thread: ThreadProfile) {
        self.threads.push(thread);
    }

    pub fn threads(&self) -> &[ThreadProfile] {
        &self.threads
    }

    pub fn counters(&self) -> &[Counter] {
        &self.counters
    }

    pub fn memory(&self) -> Option<&MemoryTable> {
        self.memory.as_ref()
    }

    /// Streams the counter, memory and profiler overhead tables from
    /// `view`, replacing any previously streamed ones.
    pub fn stream_process_tables(
        &mut self,
        view: &BufferView,
        counter_descriptions: &FastHashMap<u64, CounterDescription>,
        props: &StreamingProps,
    ) {
        self.counters = stream_counters(view, counter_descriptions, props);
        self.memory = stream_memory(view, props);
        let overhead = stream_profiler_overhead(view, props);
        self.profiler_overhead = (!overhead.is_empty()).then_some(overhead);
    }
}

impl Serialize for ProcessProfile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("name", &self.name)?;
        map.serialize_entry("pid", &self.pid)?;
        map.serialize_entry("threads", &self.threads)?;
        map.serialize_entry("counters", &self.counters)?;
        if let Some(memory) = &self.memory {
            map.serialize_entry("memory", memory)?;
        }
        if let Some(overhead) = &self.profiler_overhead {
            map.serialize_entry("profilerOverhead", overhead)?;
        }
        map.end()
    }
}
