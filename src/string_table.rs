use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::fast_hash_map::FastIndexSet;

#[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub struct StringIndex(pub(crate) u32);

impl StringIndex {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl Serialize for StringIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.0)
    }
}

/// The string table of a thread. Strings are referenced by index from
/// every other table; the index of a string is its position in the
/// serialized `stringTable` array.
///
/// Cloning produces an independent copy with identical indices.
#[derive(Debug, Clone, Default)]
pub struct UniqueStrings {
    strings: FastIndexSet<String>,
}

impl UniqueStrings {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn index_for_string(&mut self, s: &str) -> StringIndex {
        if let Some(index) = self.strings.get_index_of(s) {
            return StringIndex(index as u32);
        }
        let (index, _) = self.strings.insert_full(s.to_string());
        StringIndex(index as u32)
    }

    pub fn get_string(&self, index: StringIndex) -> Option<&str> {
        self.strings.get_index(index.0 as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Writes `name: <index of s>` into a map that is being serialized.
    pub fn write_property<M: SerializeMap>(
        &mut self,
        map: &mut M,
        name: &str,
        s: &str,
    ) -> Result<(), M::Error> {
        let index = self.index_for_string(s);
        map.serialize_entry(name, &index)
    }

    /// Writes the index of `s` as the next element of a sequence.
    pub fn write_element<Q: SerializeSeq>(&mut self, seq: &mut Q, s: &str) -> Result<(), Q::Error> {
        let index = self.index_for_string(s);
        seq.serialize_element(&index)
    }

    /// Appends all strings, in index order, to a sequence that is being
    /// serialized. Strings added afterwards are not part of that sequence.
    pub fn splice_string_table_elements<Q: SerializeSeq>(&self, seq: &mut Q) -> Result<(), Q::Error> {
        for s in &self.strings {
            seq.serialize_element(s)?;
        }
        Ok(())
    }
}

impl Serialize for UniqueStrings {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.strings.len()))?;
        self.splice_string_table_elements(&mut seq)?;
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn indices_follow_first_occurrence() {
        let mut strings = UniqueStrings::new();
        let root = strings.index_for_string("(root)");
        let foo = strings.index_for_string("foo.js");
        assert_eq!(root.get(), 0);
        assert_eq!(foo.get(), 1);
        assert_eq!(strings.index_for_string("(root)"), root);
        assert_eq!(strings.index_for_string(&String::from("foo.js")), foo);
        assert_eq!(strings.index_for_string("baseline").get(), 2);
        assert_eq!(strings.len(), 3);
        assert_eq!(strings.get_string(foo), Some("foo.js"));
        assert_eq!(strings.get_string(StringIndex(3)), None);
    }

    #[test]
    fn clone_is_independent() {
        let mut strings = UniqueStrings::new();
        strings.index_for_string("a");
        strings.index_for_string("b");
        let mut copy = strings.clone();
        assert_eq!(copy.index_for_string("b").get(), 1);
        assert_eq!(copy.index_for_string("c").get(), 2);
        assert_eq!(strings.len(), 2);
        assert_eq!(strings.index_for_string("d").get(), 2);
    }

    #[test]
    fn serializes_as_array() {
        let mut strings = UniqueStrings::new();
        strings.index_for_string("(root)");
        strings.index_for_string("foo.js");
        assert_eq!(
            serde_json::to_value(&strings).unwrap(),
            json!(["(root)", "foo.js"])
        );
    }

    #[test]
    fn write_property_and_element_emit_indices() {
        struct Row<'a>(std::cell::RefCell<&'a mut UniqueStrings>);
        impl Serialize for Row<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut strings = self.0.borrow_mut();
                let mut map = serializer.serialize_map(None)?;
                strings.write_property(&mut map, "name", "example marker")?;
                strings.write_property(&mut map, "other", "(root)")?;
                map.end()
            }
        }

        let mut strings = UniqueStrings::new();
        strings.index_for_string("(root)");
        let value = serde_json::to_value(Row(std::cell::RefCell::new(&mut strings))).unwrap();
        assert_eq!(value, json!({ "name": 1, "other": 0 }));

        let mut out = Vec::new();
        let mut serializer = serde_json::Serializer::new(&mut out);
        let mut seq = serializer.serialize_seq(None).unwrap();
        strings.write_element(&mut seq, "example marker").unwrap();
        strings.write_element(&mut seq, "new string").unwrap();
        SerializeSeq::end(seq).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "[1,2]");
    }
}
