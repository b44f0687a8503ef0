use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;
use serde::ser::{Serialize, SerializeSeq, SerializeTuple, Serializer};

use crate::fast_hash_map::FastHashMap;
use crate::serialization_helpers::SerializableSchemaTable;

pub const STACK_TABLE_SCHEMA: &[&str] = &["prefix", "frame"];

fn hash_frame_index(frame_index: u32) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write_u32(frame_index);
    hasher.finish()
}

fn add_to_hash(hash: u64, frame_index: u32) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write_u64(hash);
    hasher.write_u32(frame_index);
    hasher.finish()
}

/// A stack: either a root frame, or a prefix stack plus one frame.
///
/// The hash is carried along and derived from the prefix's hash, so that
/// hashing a deep stack does not walk the whole chain.
#[derive(Debug, Clone, Copy)]
pub struct StackKey {
    prefix_stack_index: Option<u32>,
    frame_index: u32,
    hash: u64,
}

impl StackKey {
    pub fn root(frame_index: u32) -> Self {
        StackKey {
            prefix_stack_index: None,
            frame_index,
            hash: hash_frame_index(frame_index),
        }
    }

    pub fn with_prefix(prefix: &StackKey, prefix_stack_index: u32, frame_index: u32) -> Self {
        StackKey {
            prefix_stack_index: Some(prefix_stack_index),
            frame_index,
            hash: add_to_hash(prefix.hash, frame_index),
        }
    }

    pub fn prefix_stack_index(&self) -> Option<u32> {
        self.prefix_stack_index
    }

    pub fn frame_index(&self) -> u32 {
        self.frame_index
    }

    pub fn hash_value(&self) -> u64 {
        self.hash
    }
}

impl PartialEq for StackKey {
    fn eq(&self, other: &Self) -> bool {
        self.prefix_stack_index == other.prefix_stack_index && self.frame_index == other.frame_index
    }
}

impl Eq for StackKey {}

impl Hash for StackKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

/// One row of the stack table, `[prefix, frame]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackRow {
    pub prefix: Option<u32>,
    pub frame: u32,
}

impl Serialize for StackRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut row = serializer.serialize_tuple(STACK_TABLE_SCHEMA.len())?;
        row.serialize_element(&self.prefix)?;
        row.serialize_element(&self.frame)?;
        row.end()
    }
}

#[derive(Debug, Clone, Default)]
pub struct StackTable {
    rows: Vec<StackRow>,
    index: FastHashMap<StackKey, u32>,
}

impl StackTable {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn index_for_stack(&mut self, stack: &StackKey) -> u32 {
        match self.index.get(stack) {
            Some(stack_index) => *stack_index,
            None => {
                let stack_index = self.rows.len() as u32;
                self.rows.push(StackRow {
                    prefix: stack.prefix_stack_index,
                    frame: stack.frame_index,
                });
                self.index.insert(*stack, stack_index);
                stack_index
            }
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[StackRow] {
        &self.rows
    }

    pub fn splice_elements<Q: SerializeSeq>(&self, seq: &mut Q) -> Result<(), Q::Error> {
        for row in &self.rows {
            seq.serialize_element(row)?;
        }
        Ok(())
    }
}

impl Serialize for StackTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        SerializableSchemaTable {
            schema: STACK_TABLE_SCHEMA,
            data: &self.rows,
        }
        .serialize(serializer)
    }
}
