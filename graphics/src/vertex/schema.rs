//! Attribute schemas and their packed record layouts.

use std::collections::HashSet;
use std::fmt;

use crate::error::{GraphicsError, GraphicsResult};
use crate::table::write_table;
use crate::types::AttributeType;

use super::layout::{AttributeBinding, attribute_bindings};

/// Largest interleaved record the device accepts, in bytes.
pub const MAX_STRIDE_BYTES: usize = 255;

/// Size of one packed element. Records store only `f32`.
pub const ELEMENT_BYTES: usize = 4;

/// One vertex attribute as reported by shader reflection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeInfo {
    pub name: String,
    pub ty: AttributeType,
    pub location: u32,
}

impl AttributeInfo {
    pub fn new(name: impl Into<String>, ty: AttributeType, location: u32) -> Self {
        Self {
            name: name.into(),
            ty,
            location,
        }
    }
}

/// An ordered set of uniquely named vertex attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeSchema {
    attributes: Vec<AttributeInfo>,
}

impl AttributeSchema {
    /// Build a schema, rejecting duplicate attribute names.
    pub fn new(attributes: impl IntoIterator<Item = AttributeInfo>) -> GraphicsResult<Self> {
        let attributes: Vec<AttributeInfo> = attributes.into_iter().collect();
        let mut seen = HashSet::new();
        for attribute in &attributes {
            if !seen.insert(attribute.name.as_str()) {
                return Err(GraphicsError::DuplicateAttribute(attribute.name.clone()));
            }
        }
        Ok(Self { attributes })
    }

    pub fn attributes(&self) -> &[AttributeInfo] {
        &self.attributes
    }

    pub fn get(&self, name: &str) -> Option<&AttributeInfo> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|a| a.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Restrict the schema to the named attributes.
    ///
    /// The result keeps this schema's attribute order, not the order of
    /// `names`. Naming an attribute that is not present is an error.
    pub fn subschema<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> GraphicsResult<Self> {
        let wanted: HashSet<&str> = names.into_iter().collect();
        if let Some(unknown) = wanted.iter().find(|name| !self.contains(name)) {
            return Err(GraphicsError::UnknownAttribute((*unknown).to_string()));
        }
        Ok(Self {
            attributes: self
                .attributes
                .iter()
                .filter(|a| wanted.contains(a.name.as_str()))
                .cloned()
                .collect(),
        })
    }
}

impl fmt::Display for AttributeSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows: Vec<Vec<String>> = self
            .attributes
            .iter()
            .map(|a| vec![a.location.to_string(), a.name.clone(), a.ty.to_string()])
            .collect();
        write_table(f, "Attribute Schema", &["LOC", "NAME", "TYPE"], &rows)
    }
}

/// Index of a field within a [`RecordSchema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldId(pub(crate) usize);

impl FieldId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One attribute's place inside a packed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordField {
    pub name: String,
    pub ty: AttributeType,
    pub location: u32,
    /// First element of the field, in `f32` elements from the record start.
    pub offset: usize,
    /// Field length in `f32` elements.
    pub size: usize,
}

/// Packed `f32` layout for one record of an [`AttributeSchema`].
///
/// Fields are laid out in schema order with no padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSchema {
    fields: Vec<RecordField>,
    stride: usize,
}

impl RecordSchema {
    /// Compute the packed layout of `schema`.
    ///
    /// Fails for sampler types and for records wider than
    /// [`MAX_STRIDE_BYTES`].
    pub fn new(schema: &AttributeSchema) -> GraphicsResult<Self> {
        let mut fields = Vec::with_capacity(schema.len());
        let mut stride = 0;
        for attribute in schema.attributes() {
            let info = attribute.ty.descriptor();
            if info.is_sampler || !info.element_kind.is_float() {
                return Err(GraphicsError::InvalidAttributeType {
                    name: attribute.name.clone(),
                    ty: attribute.ty,
                });
            }
            fields.push(RecordField {
                name: attribute.name.clone(),
                ty: attribute.ty,
                location: attribute.location,
                offset: stride,
                size: info.element_count,
            });
            stride += info.element_count;
        }

        let stride_bytes = stride * ELEMENT_BYTES;
        if stride_bytes > MAX_STRIDE_BYTES {
            return Err(GraphicsError::SchemaTooLarge {
                stride_bytes,
                max_bytes: MAX_STRIDE_BYTES,
            });
        }

        Ok(Self { fields, stride })
    }

    pub fn fields(&self) -> &[RecordField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<FieldId> {
        self.fields.iter().position(|f| f.name == name).map(FieldId)
    }

    pub fn field_info(&self, id: FieldId) -> Option<&RecordField> {
        self.fields.get(id.0)
    }

    /// Record width in `f32` elements.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Record width in bytes.
    pub fn stride_bytes(&self) -> usize {
        self.stride * ELEMENT_BYTES
    }

    /// Elements needed to store `count` records.
    pub fn elements_for(&self, count: usize) -> usize {
        self.stride * count
    }

    /// Attribute bindings reading this layout at the given divisor.
    pub fn bindings(&self, divisor: u32) -> Vec<AttributeBinding> {
        attribute_bindings(self, divisor)
    }
}

impl fmt::Display for RecordSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows: Vec<Vec<String>> = self
            .fields
            .iter()
            .enumerate()
            .map(|(i, field)| {
                vec![
                    i.to_string(),
                    field.name.clone(),
                    field.size.to_string(),
                    field.offset.to_string(),
                    field.ty.to_string(),
                    field.location.to_string(),
                ]
            })
            .collect();
        write_table(
            f,
            &format!("Record Schema (stride {} bytes)", self.stride_bytes()),
            &["ID", "NAME", "SIZE", "OFFSET", "TYPE", "ATTR.LOC."],
            &rows,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sprite_attributes() -> AttributeSchema {
        AttributeSchema::new([
            AttributeInfo::new("position", AttributeType::FloatVec2, 0),
            AttributeInfo::new("color", AttributeType::FloatVec4, 1),
            AttributeInfo::new("transform", AttributeType::FloatMat3, 2),
        ])
        .unwrap()
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = AttributeSchema::new([
            AttributeInfo::new("a", AttributeType::Float, 0),
            AttributeInfo::new("a", AttributeType::FloatVec2, 1),
        ]);
        assert_eq!(result, Err(GraphicsError::DuplicateAttribute("a".into())));
    }

    #[test]
    fn test_subschema_keeps_parent_order() {
        let schema = sprite_attributes();
        let sub = schema.subschema(["transform", "position"]).unwrap();
        let names: Vec<&str> = sub.names().collect();
        assert_eq!(names, ["position", "transform"]);
    }

    #[test]
    fn test_subschema_unknown_name() {
        let schema = sprite_attributes();
        assert_eq!(
            schema.subschema(["normal"]),
            Err(GraphicsError::UnknownAttribute("normal".into()))
        );
    }

    #[test]
    fn test_record_offsets_are_packed() {
        let record = RecordSchema::new(&sprite_attributes()).unwrap();
        let offsets: Vec<(usize, usize)> =
            record.fields().iter().map(|f| (f.offset, f.size)).collect();
        assert_eq!(offsets, [(0, 2), (2, 4), (6, 9)]);
        assert_eq!(record.stride(), 15);
        assert_eq!(record.stride_bytes(), 60);
        assert_eq!(record.elements_for(3), 45);
        assert_eq!(record.field("color"), Some(FieldId(1)));
        assert_eq!(record.field("normal"), None);
    }

    #[rstest]
    #[case::fits(3, true)]
    #[case::one_too_many(4, false)]
    fn test_stride_limit(#[case] matrices: u32, #[case] fits: bool) {
        // Three mat4 and a vec3 fit in 204 bytes. A fourth mat4 overflows.
        let mut attributes: Vec<AttributeInfo> = (0..matrices)
            .map(|i| AttributeInfo::new(format!("m{i}"), AttributeType::FloatMat4, i * 4))
            .collect();
        attributes.push(AttributeInfo::new("x", AttributeType::FloatVec3, 16));
        let result = RecordSchema::new(&AttributeSchema::new(attributes).unwrap());
        if fits {
            assert_eq!(result.unwrap().stride_bytes(), 204);
        } else {
            assert_eq!(
                result,
                Err(GraphicsError::SchemaTooLarge {
                    stride_bytes: 268,
                    max_bytes: MAX_STRIDE_BYTES
                })
            );
        }
    }

    #[rstest]
    #[case(AttributeType::Sampler2d)]
    #[case(AttributeType::IntVec2)]
    fn test_non_float_attributes_rejected(#[case] ty: AttributeType) {
        let schema = AttributeSchema::new([AttributeInfo::new("bad", ty, 0)]).unwrap();
        assert_eq!(
            RecordSchema::new(&schema),
            Err(GraphicsError::InvalidAttributeType {
                name: "bad".into(),
                ty
            })
        );
    }

    #[test]
    fn test_empty_schema_has_zero_stride() {
        let record = RecordSchema::new(&AttributeSchema::default()).unwrap();
        assert_eq!(record.stride(), 0);
        assert!(record.bindings(0).is_empty());
    }

    #[test]
    fn test_display_lists_fields() {
        let text = RecordSchema::new(&sprite_attributes()).unwrap().to_string();
        assert!(text.starts_with("Record Schema (stride 60 bytes)"));
        assert!(text.contains("transform"));
        assert!(text.contains("FLOAT_MAT3"));
    }
}
