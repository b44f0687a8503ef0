use serde::ser::{Serialize, SerializeSeq, SerializeTuple, Serializer};
use serde_json::Value;

use crate::fast_hash_map::FastHashMap;
use crate::frame::{CategoryPair, FrameKey, NormalFrameData};
use crate::serialization_helpers::SerializableSchemaTable;
use crate::string_table::{StringIndex, UniqueStrings};

pub const FRAME_TABLE_SCHEMA: &[&str] = &[
    "location",
    "implementation",
    "optimizations",
    "line",
    "column",
    "category",
    "relevantForJS",
];

/// One row of the frame table. Serializes as a positional array with one
/// cell per [`FRAME_TABLE_SCHEMA`] column; absent values are `null`.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRow {
    pub location: StringIndex,
    pub implementation: Option<StringIndex>,
    pub optimizations: Option<Value>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub category: Option<CategoryPair>,
    pub relevant_for_js: bool,
}

impl FrameRow {
    pub fn for_normal_frame(data: &NormalFrameData, strings: &mut UniqueStrings) -> Self {
        FrameRow {
            location: strings.index_for_string(&data.location),
            implementation: None,
            optimizations: None,
            line: data.line,
            column: data.column,
            category: data.category_pair,
            relevant_for_js: data.relevant_for_js,
        }
    }

    pub fn for_address(address: u64, strings: &mut UniqueStrings) -> Self {
        FrameRow {
            location: strings.index_for_string(&format!("{address:#x}")),
            implementation: None,
            optimizations: None,
            line: None,
            column: None,
            category: None,
            relevant_for_js: false,
        }
    }
}

impl Serialize for FrameRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut row = serializer.serialize_tuple(FRAME_TABLE_SCHEMA.len())?;
        row.serialize_element(&self.location)?;
        row.serialize_element(&self.implementation)?;
        row.serialize_element(&self.optimizations)?;
        row.serialize_element(&self.line)?;
        row.serialize_element(&self.column)?;
        row.serialize_element(&self.category)?;
        row.serialize_element(&self.relevant_for_js)?;
        row.end()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FrameTable {
    rows: Vec<FrameRow>,
    frame_key_to_frame_index: FastHashMap<FrameKey, u32>,
}

impl FrameTable {
    pub fn new() -> Self {
        Default::default()
    }

    /// Returns the index of the row for `frame`, calling `make_row` to
    /// build the row if this key has not been seen before.
    pub fn index_for_frame(&mut self, frame: &FrameKey, make_row: impl FnOnce() -> FrameRow) -> u32 {
        if let Some(index) = self.frame_key_to_frame_index.get(frame) {
            return *index;
        }

        let frame_index = self.rows.len() as u32;
        self.rows.push(make_row());
        self.frame_key_to_frame_index
            .insert(frame.clone(), frame_index);
        frame_index
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[FrameRow] {
        &self.rows
    }

    pub fn splice_elements<Q: SerializeSeq>(&self, seq: &mut Q) -> Result<(), Q::Error> {
        for row in &self.rows {
            seq.serialize_element(row)?;
        }
        Ok(())
    }
}

impl Serialize for FrameTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        SerializableSchemaTable {
            schema: FRAME_TABLE_SCHEMA,
            data: &self.rows,
        }
        .serialize(serializer)
    }
}
