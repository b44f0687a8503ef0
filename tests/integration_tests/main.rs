use std::collections::HashMap;

use assert_json_diff::assert_json_eq;
use gecko_profile_buffer::{
    decode_entries, encode_entries, label_entries, BufferView, CategoryPair, CounterDescription,
    Error, FastHashMap, FrameFlags, JitAddressResolver, JitFrameDescriptor, MarkerRef, NoMarkers,
    ProcessProfile, ProfileBufferEntry, ProfiledThreadData, ProfilerMarker, StreamingProps,
};
use serde::ser::{SerializeSeq, Serializer};
use serde_json::json;

fn label_frame(label: &str, flags: FrameFlags, line: i32, category: i32) -> Vec<ProfileBufferEntry> {
    let mut entries = label_entries(label, flags);
    entries.push(ProfileBufferEntry::LineNumber(line));
    entries.push(ProfileBufferEntry::CategoryPair(category));
    entries
}

fn ion_frame(
    canonical_address: u64,
    label: &str,
    line: u32,
    column: Option<u32>,
) -> JitFrameDescriptor {
    JitFrameDescriptor {
        canonical_address,
        label: label.to_string(),
        implementation: Some("ion".to_string()),
        optimizations: None,
        line: Some(line),
        column,
        category: Some(CategoryPair(1)),
        relevant_for_js: false,
    }
}

fn frame_schema() -> serde_json::Value {
    json!({
        "location": 0,
        "implementation": 1,
        "optimizations": 2,
        "line": 3,
        "column": 4,
        "category": 5,
        "relevantForJS": 6
    })
}

#[test]
fn thread_with_jit_frames_and_markers() {
    let mut entries = vec![
        ProfileBufferEntry::ThreadId(3),
        ProfileBufferEntry::Time(1.5),
    ];
    entries.extend(label_frame("main", FrameFlags::IS_RELEVANT_FOR_JS, 10, 2));
    entries.extend([
        ProfileBufferEntry::JitReturnAddr(0xabc),
        ProfileBufferEntry::NativeLeafAddr(0x1000),
        ProfileBufferEntry::Responsiveness(0.5),
        ProfileBufferEntry::Pause(1.8),
        ProfileBufferEntry::Resume(2.0),
        ProfileBufferEntry::ThreadId(3),
        ProfileBufferEntry::Time(2.5),
    ]);
    entries.extend(label_frame("main", FrameFlags::IS_RELEVANT_FOR_JS, 10, 2));
    entries.extend([
        ProfileBufferEntry::JitReturnAddr(0xdef),
        ProfileBufferEntry::Marker(MarkerRef(1)),
        ProfileBufferEntry::ThreadId(4),
        ProfileBufferEntry::Time(3.0),
        ProfileBufferEntry::Marker(MarkerRef(2)),
    ]);

    let mut markers = HashMap::new();
    markers.insert(
        MarkerRef(1),
        ProfilerMarker {
            name: "DOMEvent".to_string(),
            time: 2.6,
            data: Some(json!({ "type": "tracing" })),
        },
    );
    markers.insert(
        MarkerRef(2),
        ProfilerMarker {
            name: "OtherThread".to_string(),
            time: 3.0,
            data: None,
        },
    );

    let mut resolver = |address: u64| match address {
        0xabc => vec![
            ion_frame(0xab0, "js_outer", 5, None),
            ion_frame(0xab0, "js_inner", 7, Some(3)),
        ],
        _ => vec![],
    };

    let props = StreamingProps {
        thread_name: Some("GeckoMain".to_string()),
        ..Default::default()
    };
    let view = BufferView::new(0, &entries);
    let mut thread = ProfiledThreadData::new(3);
    thread.notify_received_js_context(0);
    let profile = thread.stream_json(
        &view,
        Some(&mut resolver as &mut dyn JitAddressResolver),
        &markers,
        &props,
    );

    assert_json_eq!(
        profile,
        json!({
            "name": "GeckoMain",
            "tid": 3,
            "processType": "default",
            "pausedRanges": [
                { "startTime": 1.8, "endTime": 2.0, "reason": "profiler-paused" }
            ],
            "samples": {
                "schema": { "stack": 0, "time": 1, "responsiveness": 2 },
                "data": [
                    [4, 1.5, 0.5],
                    [5, 2.5, null]
                ]
            },
            "markers": {
                "schema": { "name": 0, "time": 1, "data": 2 },
                "data": [
                    [7, 2.6, { "type": "tracing" }]
                ]
            },
            "stackTable": {
                "schema": { "prefix": 0, "frame": 1 },
                "data": [
                    [null, 0],
                    [0, 1],
                    [1, 2],
                    [2, 3],
                    [3, 4],
                    [1, 5]
                ]
            },
            "frameTable": {
                "schema": frame_schema(),
                "data": [
                    [3, null, null, null, null, null, false],
                    [4, null, null, 10, null, 2, true],
                    [0, 1, null, 5, null, 1, false],
                    [2, 1, null, 7, 3, 1, false],
                    [5, null, null, null, null, null, false],
                    [6, null, null, null, null, null, false]
                ]
            },
            "stringTable": [
                "js_outer",
                "ion",
                "js_inner",
                "(root)",
                "main",
                "0x1000",
                "0xdef",
                "DOMEvent"
            ]
        })
    );
}

#[test]
fn process_with_counters_memory_and_overhead() {
    let entries = vec![
        ProfileBufferEntry::CounterId(0x10),
        ProfileBufferEntry::Time(1.0),
        ProfileBufferEntry::CounterKey(0),
        ProfileBufferEntry::Count(100),
        ProfileBufferEntry::Number(1),
        ProfileBufferEntry::CounterKey(1),
        ProfileBufferEntry::Count(-5),
        ProfileBufferEntry::CounterId(0x20),
        ProfileBufferEntry::Time(1.0),
        ProfileBufferEntry::CounterKey(0),
        ProfileBufferEntry::Count(7),
        ProfileBufferEntry::Time(2.0),
        ProfileBufferEntry::ResidentMemory(1024.0),
        ProfileBufferEntry::UnsharedMemory(512),
        ProfileBufferEntry::CounterId(0x10),
        ProfileBufferEntry::Time(3.0),
        ProfileBufferEntry::CounterKey(0),
        ProfileBufferEntry::Count(150),
        ProfileBufferEntry::Time(4.0),
        ProfileBufferEntry::ResidentMemory(2048.0),
        ProfileBufferEntry::ProfilerOverheadTime(4.5),
        ProfileBufferEntry::ProfilerOverheadDuration(0.1),
        ProfileBufferEntry::ProfilerOverheadDuration(0.2),
        ProfileBufferEntry::ProfilerOverheadDuration(0.3),
        ProfileBufferEntry::ProfilerOverheadDuration(0.4),
    ];

    let mut descriptions = FastHashMap::default();
    descriptions.insert(
        0x10,
        CounterDescription {
            name: "malloc".to_string(),
            category: "Memory".to_string(),
            description: "Amount of allocated memory".to_string(),
        },
    );

    let props = StreamingProps::default();
    let view = BufferView::new(0, &entries);
    let mut process = ProcessProfile::new("Web Content", 9);
    process.stream_process_tables(&view, &descriptions, &props);
    let mut thread = ProfiledThreadData::new(9);
    process.add_thread(thread.stream_json(&view, None, &NoMarkers, &props));

    let counter_schema = json!({ "time": 0, "number": 1, "count": 2 });
    assert_json_eq!(
        process,
        json!({
            "name": "Web Content",
            "pid": 9,
            "threads": [
                {
                    "name": "Thread <9>",
                    "tid": 9,
                    "processType": "default",
                    "pausedRanges": [],
                    "samples": {
                        "schema": { "stack": 0, "time": 1, "responsiveness": 2 },
                        "data": []
                    },
                    "markers": {
                        "schema": { "name": 0, "time": 1, "data": 2 },
                        "data": []
                    },
                    "stackTable": {
                        "schema": { "prefix": 0, "frame": 1 },
                        "data": []
                    },
                    "frameTable": {
                        "schema": frame_schema(),
                        "data": []
                    },
                    "stringTable": []
                }
            ],
            "counters": [
                {
                    "name": "malloc",
                    "category": "Memory",
                    "description": "Amount of allocated memory",
                    "sample_groups": [
                        {
                            "id": 0,
                            "samples": {
                                "schema": counter_schema,
                                "data": [[1.0, 1, 100], [3.0, null, 150]]
                            }
                        },
                        {
                            "id": 1,
                            "samples": {
                                "schema": counter_schema,
                                "data": [[1.0, null, -5]]
                            }
                        }
                    ]
                },
                {
                    "name": "0x20",
                    "category": "",
                    "description": "",
                    "sample_groups": [
                        {
                            "id": 0,
                            "samples": {
                                "schema": counter_schema,
                                "data": [[1.0, null, 7]]
                            }
                        }
                    ]
                }
            ],
            "memory": {
                "initial_heap": 1024.0,
                "samples": {
                    "schema": { "time": 0, "rss": 1, "uss": 2 },
                    "data": [[2.0, 1024.0, 512], [4.0, 2048.0, null]]
                }
            },
            "profilerOverhead": {
                "samples": {
                    "schema": {
                        "time": 0,
                        "locking": 1,
                        "expiredMarkerCleaning": 2,
                        "counters": 3,
                        "threads": 4
                    },
                    "data": [[4.5, 0.1, 0.2, 0.3, 0.4]]
                }
            }
        })
    );
}

#[test]
fn since_time_skips_early_samples() {
    let mut entries = vec![ProfileBufferEntry::ThreadId(1), ProfileBufferEntry::Time(1.0)];
    entries.extend(label_frame("early", FrameFlags::empty(), 1, 0));
    entries.extend([ProfileBufferEntry::ThreadId(1), ProfileBufferEntry::Time(3.0)]);
    entries.extend(label_frame("late", FrameFlags::empty(), 2, 0));

    let props = StreamingProps {
        since_time: Some(2.0),
        ..Default::default()
    };
    let view = BufferView::new(0, &entries);
    let profile = ProfiledThreadData::new(1).stream_json(&view, None, &NoMarkers, &props);
    let json = serde_json::to_value(&profile).unwrap();

    assert_json_eq!(
        json["samples"]["data"],
        json!([[1, 3.0, null]])
    );
    assert_json_eq!(json["stringTable"], json!(["(root)", "late"]));
    assert_json_eq!(
        json["frameTable"]["data"],
        json!([
            [0, null, null, null, null, null, false],
            [1, null, null, 2, null, 0, false]
        ])
    );
}

#[test]
fn jit_info_outlives_the_js_context_until_it_expires() {
    let mut entries = Vec::new();
    for time in [1.0, 2.0] {
        entries.extend([
            ProfileBufferEntry::ThreadId(1),
            ProfileBufferEntry::Time(time),
            ProfileBufferEntry::JitReturnAddr(0x500),
        ]);
    }

    let mut thread = ProfiledThreadData::new(1);
    thread.notify_received_js_context(0);
    let mut resolver = |address: u64| vec![ion_frame(address, "f", 1, None)];
    let first_sample = BufferView::new(0, &entries[..3]);
    thread.notify_about_to_lose_js_context(&first_sample, &mut resolver);

    // The buffer still contains the sample from the lost context, and a
    // later one that no JIT info covers.
    let view = BufferView::new(0, &entries);
    let props = StreamingProps::default();
    let profile = thread.stream_json(&view, None, &NoMarkers, &props);
    let json = serde_json::to_value(&profile).unwrap();
    assert_json_eq!(json["stringTable"], json!(["f", "ion", "(root)", "0x500"]));
    assert_json_eq!(json["samples"]["data"], json!([[1, 1.0, null], [2, 2.0, null]]));

    // Once the buffer has moved past the first sample, the info is gone.
    let later = BufferView::new(3, &entries[3..]);
    let profile = thread.stream_json(&later, None, &NoMarkers, &props);
    assert!(thread.jit_frame_info_for_previous_js_contexts().is_none());
    let json = serde_json::to_value(&profile).unwrap();
    assert_json_eq!(json["stringTable"], json!(["(root)", "0x500"]));
}

#[test]
fn entries_read_back_from_bytes() {
    let mut entries = vec![ProfileBufferEntry::ThreadId(2), ProfileBufferEntry::Time(5.0)];
    entries.extend(label_frame(
        "a label longer than one fragment",
        FrameFlags::empty(),
        4,
        1,
    ));
    let bytes = encode_entries(&entries);
    assert_eq!(bytes.len(), entries.len() * 9);

    let decoded = decode_entries(&bytes).unwrap();
    let view = BufferView::new(0, &decoded);
    let profile =
        ProfiledThreadData::new(2).stream_json(&view, None, &NoMarkers, &StreamingProps::default());
    let json = serde_json::to_value(&profile).unwrap();
    assert_json_eq!(
        json["stringTable"],
        json!(["(root)", "a label longer than one fragment"])
    );

    assert!(matches!(
        decode_entries(&bytes[..bytes.len() - 1]),
        Err(Error::TruncatedEntry { .. })
    ));
}

#[test]
fn tables_can_be_spliced_into_another_array() {
    let mut entries = vec![ProfileBufferEntry::ThreadId(1), ProfileBufferEntry::Time(1.0)];
    entries.extend(label_frame("spliced", FrameFlags::empty(), 3, 0));
    let view = BufferView::new(0, &entries);
    let profile =
        ProfiledThreadData::new(1).stream_json(&view, None, &NoMarkers, &StreamingProps::default());

    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::new(&mut out);
    let mut seq = (&mut serializer).serialize_seq(None).unwrap();
    seq.serialize_element("first").unwrap();
    profile
        .unique_stacks()
        .splice_string_table_elements(&mut seq)
        .unwrap();
    SerializeSeq::end(seq).unwrap();

    let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_json_eq!(json, json!(["first", "(root)", "spliced"]));
}
