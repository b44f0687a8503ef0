use serde::ser::{Serialize, SerializeMap, Serializer};

/// Serializes as `{"name0": 0, "name1": 1, ...}`.
pub struct SerializableSchema<'a>(pub &'a [&'a str]);

impl Serialize for SerializableSchema<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (index, name) in self.0.iter().enumerate() {
            map.serialize_entry(name, &index)?;
        }
        map.end()
    }
}

/// A table in the `{"schema": {...}, "data": [[...], ...]}` shape. Each
/// element of `data` must serialize as a positional array with one cell
/// per schema column.
pub struct SerializableSchemaTable<'a, D: Serialize> {
    pub schema: &'a [&'a str],
    pub data: D,
}

impl<D: Serialize> Serialize for SerializableSchemaTable<'_, D> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("schema", &SerializableSchema(self.schema))?;
        map.serialize_entry("data", &self.data)?;
        map.end()
    }
}
