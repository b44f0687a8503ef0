use std::borrow::Cow;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::buffer_view::BufferView;
use crate::markers::{stream_markers, MarkerLookup, MarkerTable};
use crate::props::StreamingProps;
use crate::sample_table::{stream_paused_ranges, stream_samples, PausedRange, SampleTable};
use crate::unique_stacks::UniqueStacks;

/// The JSON object for one thread: its samples and markers, plus the
/// deduplicated stack, frame and string tables they reference.
#[derive(Debug)]
pub struct ThreadProfile {
    tid: i32,
    name: Option<String>,
    process_type: String,
    paused_ranges: Vec<PausedRange>,
    samples: SampleTable,
    markers: MarkerTable,
    unique_stacks: UniqueStacks,
}

impl ThreadProfile {
    /// Streams the samples and markers of thread `tid` in `view`. All
    /// strings, frames and stacks end up in `unique_stacks`, which this
    /// object takes over.
    pub fn from_buffer(
        tid: i32,
        view: &BufferView,
        mut unique_stacks: UniqueStacks,
        marker_lookup: &dyn MarkerLookup,
        props: &StreamingProps,
    ) -> Self {
        let samples = stream_samples(tid, view, &mut unique_stacks, props);
        let markers = stream_markers(
            tid,
            view,
            marker_lookup,
            unique_stacks.unique_strings_mut(),
            props,
        );
        let paused_ranges = stream_paused_ranges(view);
        ThreadProfile {
            tid,
            name: props.thread_name.clone(),
            process_type: props.process_type.clone(),
            paused_ranges,
            samples,
            markers,
            unique_stacks,
        }
    }

    pub fn tid(&self) -> i32 {
        self.tid
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = Some(name.to_string());
    }

    pub fn samples(&self) -> &SampleTable {
        &self.samples
    }

    pub fn markers(&self) -> &MarkerTable {
        &self.markers
    }

    pub fn paused_ranges(&self) -> &[PausedRange] {
        &self.paused_ranges
    }

    pub fn unique_stacks(&self) -> &UniqueStacks {
        &self.unique_stacks
    }
}

impl Serialize for ThreadProfile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let name: Cow<str> = match &self.name {
            Some(name) => name.into(),
            None => format!("Thread <{}>", self.tid).into(),
        };

        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("name", &name)?;
        map.serialize_entry("tid", &self.tid)?;
        map.serialize_entry("processType", &self.process_type)?;
        map.serialize_entry("pausedRanges", &self.paused_ranges)?;
        map.serialize_entry("samples", &self.samples)?;
        map.serialize_entry("markers", &self.markers)?;
        map.serialize_entry("stackTable", self.unique_stacks.stack_table())?;
        map.serialize_entry("frameTable", self.unique_stacks.frame_table())?;
        map.serialize_entry("stringTable", self.unique_stacks.unique_strings())?;
        map.end()
    }
}
