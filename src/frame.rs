use bitflags::bitflags;
use serde::ser::{Serialize, Serializer};

/// A profiling category pair, as recorded in `CategoryPair` entries.
#[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub struct CategoryPair(pub u32);

impl Serialize for CategoryPair {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.0)
    }
}

bitflags! {
    /// Flags for a label frame, as recorded in `FrameFlags` entries.
    #[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
    pub struct FrameFlags: u64 {
        /// Set on frames which are JavaScript functions.
        const IS_JS = 0b00000001;

        /// Set on frames which are not strictly JavaScript functions but which
        /// should be included in the JS-only call tree, such as DOM API calls.
        const IS_RELEVANT_FOR_JS = 0b00000010;
    }
}

impl FrameFlags {
    pub fn is_relevant_for_js(self) -> bool {
        self.intersects(FrameFlags::IS_JS | FrameFlags::IS_RELEVANT_FOR_JS)
    }
}

/// The identity of a frame in the frame table. Two frames are the same
/// frame table entry iff their keys are equal, variant included.
#[derive(Debug, Clone, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub enum FrameKey {
    Normal(NormalFrameData),
    Jit(JitFrameData),
}

#[derive(Debug, Clone, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub struct NormalFrameData {
    pub location: String,
    pub relevant_for_js: bool,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub category_pair: Option<CategoryPair>,
}

/// A frame whose row was rendered ahead of time by the JIT frame info of
/// range `range_index`.
#[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub struct JitFrameData {
    pub canonical_address: u64,
    pub depth: u32,
    pub range_index: u32,
}

impl FrameKey {
    pub fn from_label(location: &str) -> Self {
        FrameKey::Normal(NormalFrameData {
            location: location.to_string(),
            relevant_for_js: false,
            line: None,
            column: None,
            category_pair: None,
        })
    }

    /// An opaque frame for a code address that could not be resolved.
    pub fn from_address(address: u64) -> Self {
        Self::from_label(&format!("{address:#x}"))
    }

    pub fn new_normal(
        location: String,
        relevant_for_js: bool,
        line: Option<u32>,
        column: Option<u32>,
        category_pair: Option<CategoryPair>,
    ) -> Self {
        FrameKey::Normal(NormalFrameData {
            location,
            relevant_for_js,
            line,
            column,
            category_pair,
        })
    }

    pub fn new_jit(canonical_address: u64, depth: u32, range_index: u32) -> Self {
        FrameKey::Jit(JitFrameData {
            canonical_address,
            depth,
            range_index,
        })
    }
}
