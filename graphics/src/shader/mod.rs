//! Linked shader programs and their reflected interface.
//!
//! # Overview
//!
//! The shader system consists of:
//! - [`Shader`] - a linked program with its attribute schema, value uniforms
//!   and sampler-to-texture-unit assignments
//! - [`ShaderLibrary`] - compiles named stage sources into named shaders
//!
//! Sampler uniforms are bound to a fixed texture unit once, when the shader
//! is built. Render passes then change which texture a sampler reads by
//! binding textures to units, never by re-uploading the sampler uniform.
//!
//! # Example
//!
//! ```ignore
//! let sources = ShaderSources::new()
//!     .with_vertex("sprite", SPRITE_VS)
//!     .with_fragment("flat", FLAT_FS)
//!     .with_program("sprites", "sprite", "flat");
//!
//! let library = ShaderLibrary::compile(device, &sources);
//! let shader = library.get("sprites").expect("sprite shader");
//! println!("{shader}");
//! ```

pub mod library;

use std::collections::HashMap;
use std::fmt;

use crate::backend::{Device, UniformValue};
use crate::error::{GraphicsError, GraphicsResult};
use crate::table::write_table;
use crate::types::{AttributeType, ProgramHandle, UniformFunction, UniformLocation};
use crate::vertex::{AttributeInfo, AttributeSchema, GeometryLayout, VertexArraySchema};

pub use library::{ShaderLibrary, ShaderSources, format_compile_errors};

/// A programmable pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
        })
    }
}

/// An active attribute reported by program introspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveAttribute {
    pub name: String,
    pub ty: AttributeType,
    pub location: u32,
}

/// An active uniform reported by program introspection.
///
/// Arrays are reported once, as `name[0]` with `size` elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveUniform {
    pub name: String,
    pub ty: AttributeType,
    pub size: u32,
}

/// Everything program introspection reports about a linked program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramReflection {
    pub attributes: Vec<ActiveAttribute>,
    pub uniforms: Vec<ActiveUniform>,
}

impl ProgramReflection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, name: impl Into<String>, ty: AttributeType, location: u32) -> Self {
        self.attributes.push(ActiveAttribute {
            name: name.into(),
            ty,
            location,
        });
        self
    }

    pub fn with_uniform(self, name: impl Into<String>, ty: AttributeType) -> Self {
        self.with_uniform_array(name, ty, 1)
    }

    /// Add an array uniform. `name` should end in `[0]`.
    pub fn with_uniform_array(mut self, name: impl Into<String>, ty: AttributeType, size: u32) -> Self {
        self.uniforms.push(ActiveUniform {
            name: name.into(),
            ty,
            size,
        });
        self
    }

    /// Every uniform name the program accepts, with arrays expanded to
    /// `name[0]` .. `name[size-1]`.
    pub fn uniform_elements(&self) -> Vec<(String, AttributeType)> {
        let mut elements = Vec::new();
        for uniform in &self.uniforms {
            match uniform.name.strip_suffix("[0]") {
                Some(base) => {
                    for i in 0..uniform.size {
                        elements.push((format!("{base}[{i}]"), uniform.ty));
                    }
                }
                None => {
                    if uniform.size != 1 {
                        log::warn!(
                            "Uniform {} has size {} but is not named as an array",
                            uniform.name,
                            uniform.size
                        );
                    }
                    elements.push((uniform.name.clone(), uniform.ty));
                }
            }
        }
        elements
    }
}

/// A value uniform of a shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderUniform {
    pub location: UniformLocation,
    pub ty: AttributeType,
}

impl ShaderUniform {
    /// Setter used to upload this uniform.
    pub fn function(&self) -> UniformFunction {
        self.ty.descriptor().uniform_function
    }
}

/// A linked shader program.
///
/// A shader remembers the uniforms set on it between uses, so it is also the
/// natural owner of uniform type information and sampler unit assignments.
#[derive(Debug)]
pub struct Shader {
    name: String,
    program: ProgramHandle,
    attributes: AttributeSchema,
    uniforms: HashMap<String, ShaderUniform>,
    uniform_order: Vec<String>,
    samplers: Vec<(String, u32)>,
}

impl Shader {
    /// Wrap a linked program, reflecting its interface.
    ///
    /// Sampler uniforms are assigned texture units and set once here, so the
    /// program is left current on return.
    pub fn new(
        device: &mut dyn Device,
        program: ProgramHandle,
        name: impl Into<String>,
    ) -> GraphicsResult<Self> {
        let name = name.into();
        let reflection = device.reflect_program(program);

        let attributes = AttributeSchema::new(
            reflection
                .attributes
                .iter()
                .map(|a| AttributeInfo::new(a.name.clone(), a.ty, a.location)),
        )?;

        let mut uniforms = HashMap::new();
        let mut uniform_order = Vec::new();
        let mut sampler_locations = Vec::new();
        for (element, ty) in reflection.uniform_elements() {
            let Some(location) = device.uniform_location(program, &element) else {
                log::warn!("Shader {name}: uniform {element} has no location");
                continue;
            };
            if ty.is_sampler() {
                sampler_locations.push((element, location));
            } else {
                uniform_order.push(element.clone());
                uniforms.insert(element, ShaderUniform { location, ty });
            }
        }

        let sampler_names: Vec<&str> = sampler_locations.iter().map(|(n, _)| n.as_str()).collect();
        let units = assign_image_units(&sampler_names, device.max_texture_units())?;

        device.use_shader_program(program);
        for ((sampler, location), unit) in sampler_locations.iter().zip(&units) {
            log::trace!("Shader {name}: sampler {sampler} on texture unit {unit}");
            device.set_uniform(
                *location,
                UniformFunction::Int1,
                UniformValue::Int(&[*unit as i32]),
                false,
            );
        }

        let samplers = sampler_locations
            .into_iter()
            .map(|(sampler, _)| sampler)
            .zip(units)
            .collect();

        Ok(Self {
            name,
            program,
            attributes,
            uniforms,
            uniform_order,
            samplers,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn program(&self) -> ProgramHandle {
        self.program
    }

    pub fn attribute_schema(&self) -> &AttributeSchema {
        &self.attributes
    }

    /// Whether `name` is a value uniform of this shader.
    pub fn has_uniform(&self, name: &str) -> bool {
        self.uniforms.contains_key(name)
    }

    pub fn uniform(&self, name: &str) -> Option<&ShaderUniform> {
        self.uniforms.get(name)
    }

    /// Value uniforms in reflection order.
    pub fn uniforms(&self) -> impl Iterator<Item = (&str, &ShaderUniform)> {
        self.uniform_order
            .iter()
            .filter_map(|name| self.uniforms.get(name).map(|u| (name.as_str(), u)))
    }

    /// Samplers and their fixed texture units.
    pub fn samplers(&self) -> impl Iterator<Item = (&str, u32)> {
        self.samplers.iter().map(|(name, unit)| (name.as_str(), *unit))
    }

    pub fn has_sampler(&self, name: &str) -> bool {
        self.sampler_unit(name).is_some()
    }

    /// Texture unit assigned to a sampler.
    pub fn sampler_unit(&self, name: &str) -> Option<u32> {
        self.samplers
            .iter()
            .find(|(sampler, _)| sampler == name)
            .map(|(_, unit)| *unit)
    }

    /// Group this shader's attributes into a vertex array schema.
    pub fn geometry_schema(&self, layout: &GeometryLayout) -> GraphicsResult<VertexArraySchema> {
        VertexArraySchema::new(&self.attributes, layout)
    }

    /// Delete the device program.
    pub fn destroy(self, device: &mut dyn Device) {
        device.delete_program(self.program);
    }
}

impl fmt::Display for Shader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Shader `{}`", self.name)?;
        write!(f, "{}", self.attributes)?;
        let uniforms: Vec<Vec<String>> = self
            .uniforms()
            .map(|(name, u)| vec![name.to_string(), u.ty.to_string()])
            .collect();
        write_table(f, "Uniforms", &["NAME", "UNIFORM TYPE"], &uniforms)?;
        let samplers: Vec<Vec<String>> = self
            .samplers()
            .map(|(name, unit)| vec![name.to_string(), unit.to_string()])
            .collect();
        write_table(f, "Samplers", &["NAME", "IMAGE UNIT"], &samplers)
    }
}

/// djb2 string hash over UTF-8 bytes.
fn djb2(text: &str) -> u32 {
    text.bytes()
        .fold(0u32, |hash, byte| hash.wrapping_mul(33).wrapping_add(byte as u32))
}

/// Assign each sampler a distinct texture unit in `0..max_units`.
///
/// A sampler's first choice is its name hash modulo the unit count; taken
/// units are skipped by linear probing. The result is parallel to `samplers`
/// and depends only on the names and their order.
pub fn assign_image_units(samplers: &[&str], max_units: u32) -> GraphicsResult<Vec<u32>> {
    if samplers.len() > max_units as usize {
        return Err(GraphicsError::TooManySamplers {
            samplers: samplers.len(),
            units: max_units,
        });
    }
    let mut taken = vec![false; max_units as usize];
    let mut units = Vec::with_capacity(samplers.len());
    for sampler in samplers {
        let mut unit = djb2(sampler) % max_units;
        while taken[unit as usize] {
            unit = (unit + 1) % max_units;
        }
        taken[unit as usize] = true;
        units.push(unit);
    }
    Ok(units)
}
