use std::collections::HashMap;
use std::hash::BuildHasher;

use serde::ser::{Serialize, SerializeTuple, Serializer};
use serde_json::Value;

use crate::buffer_view::BufferView;
use crate::entry::ProfileBufferEntry;
use crate::props::StreamingProps;
use crate::serialization_helpers::SerializableSchemaTable;
use crate::string_table::{StringIndex, UniqueStrings};

pub const MARKER_TABLE_SCHEMA: &[&str] = &["name", "time", "data"];

/// An opaque reference to a marker that lives outside the buffer, as
/// stored in `Marker` entries.
#[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub struct MarkerRef(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub struct ProfilerMarker {
    pub name: String,
    pub time: f64,
    pub data: Option<Value>,
}

/// Resolves marker references found in the buffer.
pub trait MarkerLookup {
    fn marker(&self, marker: MarkerRef) -> Option<&ProfilerMarker>;
}

impl<S: BuildHasher> MarkerLookup for HashMap<MarkerRef, ProfilerMarker, S> {
    fn marker(&self, marker: MarkerRef) -> Option<&ProfilerMarker> {
        self.get(&marker)
    }
}

/// For buffers without markers.
pub struct NoMarkers;

impl MarkerLookup for NoMarkers {
    fn marker(&self, _marker: MarkerRef) -> Option<&ProfilerMarker> {
        None
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerRow {
    pub name: StringIndex,
    pub time: f64,
    pub data: Option<Value>,
}

impl Serialize for MarkerRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut row = serializer.serialize_tuple(MARKER_TABLE_SCHEMA.len())?;
        row.serialize_element(&self.name)?;
        row.serialize_element(&self.time)?;
        row.serialize_element(&self.data)?;
        row.end()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MarkerTable {
    rows: Vec<MarkerRow>,
}

impl MarkerTable {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn add_marker(&mut self, marker: &ProfilerMarker, strings: &mut UniqueStrings) {
        self.rows.push(MarkerRow {
            name: strings.index_for_string(&marker.name),
            time: marker.time,
            data: marker.data.clone(),
        });
    }

    pub fn rows(&self) -> &[MarkerRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Serialize for MarkerTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        SerializableSchemaTable {
            schema: MARKER_TABLE_SCHEMA,
            data: &self.rows,
        }
        .serialize(serializer)
    }
}

/// Collects the markers of thread `tid`. A `Marker` entry belongs to the
/// thread of the closest preceding `ThreadId` entry.
pub fn stream_markers(
    tid: i32,
    view: &BufferView,
    lookup: &dyn MarkerLookup,
    strings: &mut UniqueStrings,
    props: &StreamingProps,
) -> MarkerTable {
    let mut table = MarkerTable::new();
    let mut current_tid = None;
    for (position, entry) in view.iter() {
        match *entry {
            ProfileBufferEntry::ThreadId(entry_tid) => current_tid = Some(entry_tid),
            ProfileBufferEntry::Marker(marker_ref) if current_tid == Some(tid) => {
                match lookup.marker(marker_ref) {
                    Some(marker) if props.includes_time(marker.time) => {
                        table.add_marker(marker, strings)
                    }
                    Some(_) => {}
                    None => log::warn!(
                        "Unknown marker {:#x} at buffer position {position}",
                        marker_ref.0
                    ),
                }
            }
            _ => {}
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn markers_follow_the_preceding_thread_id() {
        let entries = [
            ProfileBufferEntry::Marker(MarkerRef(1)),
            ProfileBufferEntry::ThreadId(1),
            ProfileBufferEntry::Marker(MarkerRef(2)),
            ProfileBufferEntry::Marker(MarkerRef(3)),
            ProfileBufferEntry::ThreadId(2),
            ProfileBufferEntry::Marker(MarkerRef(1)),
        ];
        let mut lookup = HashMap::new();
        for (id, name, time) in [(1, "A", 1.0), (2, "B", 2.0), (3, "C", 0.5)] {
            lookup.insert(
                MarkerRef(id),
                ProfilerMarker {
                    name: name.to_string(),
                    time,
                    data: None,
                },
            );
        }
        let props = StreamingProps {
            since_time: Some(1.0),
            ..Default::default()
        };
        let view = BufferView::new(0, &entries);
        let mut strings = UniqueStrings::new();
        let table = stream_markers(1, &view, &lookup, &mut strings, &props);

        assert_eq!(table.len(), 1);
        assert_eq!(strings.get_string(table.rows()[0].name), Some("B"));
        assert_eq!(
            serde_json::to_value(&table).unwrap(),
            json!({
                "schema": { "name": 0, "time": 1, "data": 2 },
                "data": [[0, 2.0, null]]
            })
        );
    }

    #[test]
    fn unknown_markers_are_skipped() {
        let entries = [
            ProfileBufferEntry::ThreadId(1),
            ProfileBufferEntry::Marker(MarkerRef(9)),
        ];
        let view = BufferView::new(0, &entries);
        let mut strings = UniqueStrings::new();
        let table = stream_markers(
            1,
            &view,
            &NoMarkers,
            &mut strings,
            &StreamingProps::default(),
        );
        assert!(table.is_empty());
        assert!(strings.is_empty());
    }
}
