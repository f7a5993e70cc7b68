//! Grouping attributes into per-divisor vertex buffers.
//!
//! Every attribute is read at some rate: once per vertex (divisor 0), once
//! per instance (divisor 1) or once every N instances. Attributes that share
//! a divisor are interleaved into the same buffer, so a geometry gets one
//! buffer per distinct divisor.
//!
//! A group is *streaming* when any of its attributes is expected to change
//! every frame. Streaming groups are re-uploaded on every sync.
//!
//! # Example
//!
//! ```ignore
//! // Quad corners are shared, sprite data is per instance and static
//! let layout = GeometryLayout::new()
//!     .with_attribute("corner", AttributeConfig::per_vertex().with_stream(false))
//!     .with_attribute("transform", AttributeConfig::per_instance().with_stream(false));
//!
//! let schema = VertexArraySchema::new(shader.attribute_schema(), &layout)?;
//! assert_eq!(schema.group_name(0), "vert");
//! assert_eq!(schema.group_name(1), "inst");
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::error::GraphicsResult;

use super::schema::{AttributeSchema, ELEMENT_BYTES, RecordSchema};

/// One attribute slot pointed at an interleaved buffer.
///
/// All values are what the device's attribute pointer call expects:
/// `stride` and `offset` are in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributeBinding {
    /// Attribute slot (shader location plus column for matrices).
    pub slot: u32,
    /// Number of `f32` components read by this slot.
    pub element_count: u32,
    /// Bytes between consecutive records.
    pub stride: u32,
    /// Byte offset of the first component within a record.
    pub offset: u32,
    /// Instances per record, or 0 for per-vertex data.
    pub divisor: u32,
}

/// Derive the attribute bindings for a record layout.
///
/// Each field binds one slot per column: a `mat3` at location 4 binds slots
/// 4, 5 and 6, each reading three floats.
pub fn attribute_bindings(schema: &RecordSchema, divisor: u32) -> Vec<AttributeBinding> {
    let stride = schema.stride_bytes() as u32;
    let mut bindings = Vec::new();
    for field in schema.fields() {
        let info = field.ty.descriptor();
        let per_slot = info.elements_per_slot();
        for column in 0..info.slot_span {
            bindings.push(AttributeBinding {
                slot: field.location + column as u32,
                element_count: per_slot as u32,
                stride,
                offset: ((field.offset + column * per_slot) * ELEMENT_BYTES) as u32,
                divisor,
            });
        }
    }
    bindings
}

/// How one attribute is fed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributeConfig {
    /// Instances per record, or 0 for per-vertex data.
    pub divisor: u32,
    /// Whether the attribute is rewritten every frame.
    pub stream: bool,
}

impl Default for AttributeConfig {
    fn default() -> Self {
        Self {
            divisor: 1,
            stream: true,
        }
    }
}

impl AttributeConfig {
    /// Per-vertex streaming attribute.
    pub fn per_vertex() -> Self {
        Self {
            divisor: 0,
            ..Default::default()
        }
    }

    /// Per-instance streaming attribute.
    pub fn per_instance() -> Self {
        Self::default()
    }

    pub fn with_divisor(mut self, divisor: u32) -> Self {
        self.divisor = divisor;
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }
}

/// Per-attribute configuration for building a [`VertexArraySchema`].
///
/// Attributes without an entry use [`AttributeConfig::default`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeometryLayout {
    attributes: HashMap<String, AttributeConfig>,
}

impl GeometryLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure one attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, config: AttributeConfig) -> Self {
        self.attributes.insert(name.into(), config);
        self
    }

    /// Configuration for `name`, falling back to the default.
    pub fn config(&self, name: &str) -> AttributeConfig {
        self.attributes.get(name).copied().unwrap_or_default()
    }

    fn configured_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }
}

/// One divisor group of a [`VertexArraySchema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSchema {
    pub divisor: u32,
    pub stream: bool,
    pub record: Arc<RecordSchema>,
}

impl GroupSchema {
    /// Display name of the group: `vert`, `inst` or `d{N}`.
    pub fn name(&self) -> String {
        group_name(self.divisor)
    }

    /// Records needed to cover `instances` instances at this divisor.
    ///
    /// Per-vertex groups are sized by vertex count instead, so callers pass
    /// that directly and it is returned unchanged.
    pub fn records_for(&self, count: usize) -> usize {
        match self.divisor {
            0 => count,
            d => count.div_ceil(d as usize),
        }
    }
}

fn group_name(divisor: u32) -> String {
    match divisor {
        0 => "vert".to_string(),
        1 => "inst".to_string(),
        d => format!("d{d}"),
    }
}

/// Attribute schema split into divisor groups, sorted by ascending divisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexArraySchema {
    attributes: AttributeSchema,
    groups: Vec<GroupSchema>,
}

impl VertexArraySchema {
    /// Group the attributes of `schema` according to `layout`.
    pub fn new(schema: &AttributeSchema, layout: &GeometryLayout) -> GraphicsResult<Self> {
        for name in layout.configured_names() {
            if !schema.contains(name) {
                log::warn!("Layout configures attribute {name}, which the schema does not have");
            }
        }

        let mut by_divisor: BTreeMap<u32, (Vec<&str>, bool)> = BTreeMap::new();
        for name in schema.names() {
            let config = layout.config(name);
            let (names, stream) = by_divisor.entry(config.divisor).or_default();
            names.push(name);
            *stream |= config.stream;
        }

        let groups = by_divisor
            .into_iter()
            .map(|(divisor, (names, stream))| -> GraphicsResult<GroupSchema> {
                let subschema = schema.subschema(names)?;
                Ok(GroupSchema {
                    divisor,
                    stream,
                    record: Arc::new(RecordSchema::new(&subschema)?),
                })
            })
            .collect::<GraphicsResult<Vec<_>>>()?;

        Ok(Self {
            attributes: schema.clone(),
            groups,
        })
    }

    pub fn attributes(&self) -> &AttributeSchema {
        &self.attributes
    }

    pub fn groups(&self) -> &[GroupSchema] {
        &self.groups
    }

    pub fn group(&self, index: usize) -> Option<&GroupSchema> {
        self.groups.get(index)
    }

    /// Index of the group with the given divisor.
    pub fn group_index(&self, divisor: u32) -> Option<usize> {
        self.groups.iter().position(|g| g.divisor == divisor)
    }

    /// Index of the group holding the named attribute.
    pub fn group_of(&self, attribute: &str) -> Option<usize> {
        self.groups
            .iter()
            .position(|g| g.record.field(attribute).is_some())
    }

    /// Display name of group `index`, or an empty string when out of range.
    pub fn group_name(&self, index: usize) -> String {
        self.groups.get(index).map(GroupSchema::name).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl fmt::Display for VertexArraySchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for group in &self.groups {
            writeln!(
                f,
                "[{}] divisor {}{}",
                group.name(),
                group.divisor,
                if group.stream { ", streaming" } else { "" }
            )?;
            write!(f, "{}", group.record)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttributeType;
    use crate::vertex::AttributeInfo;

    fn schema() -> AttributeSchema {
        AttributeSchema::new([
            AttributeInfo::new("corner", AttributeType::FloatVec2, 0),
            AttributeInfo::new("color", AttributeType::FloatVec4, 1),
            AttributeInfo::new("transform", AttributeType::FloatMat3, 2),
            AttributeInfo::new("tint", AttributeType::FloatVec4, 5),
        ])
        .unwrap()
    }

    #[test]
    fn test_mat3_binds_three_slots() {
        let attributes =
            AttributeSchema::new([AttributeInfo::new("m", AttributeType::FloatMat3, 4)]).unwrap();
        let record = RecordSchema::new(&attributes).unwrap();
        let bindings = attribute_bindings(&record, 1);
        assert_eq!(
            bindings,
            [
                AttributeBinding { slot: 4, element_count: 3, stride: 36, offset: 0, divisor: 1 },
                AttributeBinding { slot: 5, element_count: 3, stride: 36, offset: 12, divisor: 1 },
                AttributeBinding { slot: 6, element_count: 3, stride: 36, offset: 24, divisor: 1 },
            ]
        );
    }

    #[test]
    fn test_bindings_follow_field_offsets() {
        let attributes = AttributeSchema::new([
            AttributeInfo::new("p", AttributeType::FloatVec2, 0),
            AttributeInfo::new("c", AttributeType::FloatVec4, 3),
        ])
        .unwrap();
        let bindings = attribute_bindings(&RecordSchema::new(&attributes).unwrap(), 0);
        assert_eq!(bindings.len(), 2);
        assert_eq!((bindings[1].slot, bindings[1].offset, bindings[1].stride), (3, 8, 24));
        assert!(bindings.iter().all(|b| b.divisor == 0));
    }

    #[test]
    fn test_groups_sorted_numerically() {
        let layout = GeometryLayout::new()
            .with_attribute("corner", AttributeConfig::per_vertex().with_stream(false))
            .with_attribute("color", AttributeConfig::default().with_divisor(10))
            .with_attribute("tint", AttributeConfig::default().with_divisor(2));
        let schema = VertexArraySchema::new(&schema(), &layout).unwrap();

        let divisors: Vec<u32> = schema.groups().iter().map(|g| g.divisor).collect();
        assert_eq!(divisors, [0, 1, 2, 10]);
        let names: Vec<String> = (0..schema.len()).map(|i| schema.group_name(i)).collect();
        assert_eq!(names, ["vert", "inst", "d2", "d10"]);
        assert_eq!(schema.group_of("transform"), Some(1));
        assert_eq!(schema.group_index(10), Some(3));
    }

    #[test]
    fn test_group_streams_if_any_attribute_streams() {
        let layout = GeometryLayout::new()
            .with_attribute("corner", AttributeConfig::per_vertex().with_stream(false))
            .with_attribute("color", AttributeConfig::per_vertex().with_stream(true))
            .with_attribute("transform", AttributeConfig::per_instance().with_stream(false))
            .with_attribute("tint", AttributeConfig::per_instance().with_stream(false));
        let schema = VertexArraySchema::new(&schema(), &layout).unwrap();
        assert!(schema.groups()[0].stream);
        assert!(!schema.groups()[1].stream);
    }

    #[test]
    fn test_unconfigured_attributes_default_to_streaming_instances() {
        let schema = VertexArraySchema::new(&schema(), &GeometryLayout::new()).unwrap();
        assert_eq!(schema.len(), 1);
        assert_eq!(schema.groups()[0].divisor, 1);
        assert!(schema.groups()[0].stream);
        assert_eq!(schema.groups()[0].record.stride(), 19);
    }

    #[test]
    fn test_records_for_rounds_up() {
        let layout = GeometryLayout::new().with_attribute(
            "corner",
            AttributeConfig::default().with_divisor(3),
        );
        let attributes = schema().subschema(["corner"]).unwrap();
        let schema = VertexArraySchema::new(&attributes, &layout).unwrap();
        assert_eq!(schema.groups()[0].records_for(7), 3);
        assert_eq!(schema.groups()[0].records_for(6), 2);
    }
}
