//! Naming the objects a pass sequence refers to.
//!
//! Depointerization replaces every object reference in a pass sequence with a
//! string key into an [`Environment`]. The resulting [`CompiledPass`]es are
//! plain data: they can be compared, diffed and printed without touching any
//! live object.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::resources::{ImageRef, Variable};
use crate::shader::Shader;

use super::{Diagnostic, DrawCallback, PassField, RenderPass};

/// Name of the default canvas in every environment.
pub const CANVAS: &str = "CANVAS";

struct NameEntry<T> {
    name: String,
    identity: usize,
    value: T,
}

/// Objects of one class keyed by unique names.
///
/// Names are handed out first-use-wins: an object keeps the first name it was
/// registered under, and a taken default name gets the smallest free numeric
/// suffix (`atlas`, `atlas1`, `atlas2`, ...).
pub struct NameTable<T> {
    entries: Vec<NameEntry<T>>,
    by_identity: HashMap<usize, usize>,
    by_name: HashMap<String, usize>,
}

impl<T> Default for NameTable<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            by_identity: HashMap::new(),
            by_name: HashMap::new(),
        }
    }
}

impl<T> NameTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an object and return the name it is known by.
    ///
    /// `identity` distinguishes objects; registering the same identity again
    /// returns the existing name and ignores `value`. An empty default name
    /// becomes `0`.
    pub fn add(&mut self, identity: usize, value: T, default_name: &str) -> &str {
        let index = match self.by_identity.get(&identity) {
            Some(&index) => index,
            None => {
                let mut name = if default_name.is_empty() {
                    "0".to_string()
                } else {
                    default_name.to_string()
                };
                let mut suffix = 1;
                while self.by_name.contains_key(&name) {
                    name = format!("{default_name}{suffix}");
                    suffix += 1;
                }
                let index = self.entries.len();
                self.by_identity.insert(identity, index);
                self.by_name.insert(name.clone(), index);
                self.entries.push(NameEntry {
                    name,
                    identity,
                    value,
                });
                index
            }
        };
        &self.entries[index].name
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.by_name.get(name).map(|&index| &self.entries[index].value)
    }

    /// Name registered for an identity.
    pub fn name_of(&self, identity: usize) -> Option<&str> {
        self.by_identity
            .get(&identity)
            .map(|&index| self.entries[index].name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries
            .iter()
            .map(|entry| (entry.name.as_str(), &entry.value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Tables are equal when they assign the same names to the same objects.
impl<T> PartialEq for NameTable<T> {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(&other.entries)
                .all(|(a, b)| a.name == b.name && a.identity == b.identity)
    }
}

impl<T> fmt::Debug for NameTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

fn arc_identity<T: ?Sized>(value: &Arc<T>) -> usize {
    Arc::as_ptr(value) as *const () as usize
}

/// Named objects referenced by a compiled pass sequence.
///
/// The canvas is always present as [`CANVAS`].
#[derive(Debug, PartialEq)]
pub struct Environment {
    shaders: NameTable<Arc<Shader>>,
    variables: NameTable<Arc<Variable>>,
    textures: NameTable<ImageRef>,
    surfaces: NameTable<ImageRef>,
    callbacks: NameTable<DrawCallback>,
}

impl Default for Environment {
    fn default() -> Self {
        let mut surfaces = NameTable::new();
        surfaces.add(ImageRef::Canvas.identity(), ImageRef::Canvas, CANVAS);
        Self {
            shaders: NameTable::new(),
            variables: NameTable::new(),
            textures: NameTable::new(),
            surfaces,
            callbacks: NameTable::new(),
        }
    }
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shaders(&self) -> &NameTable<Arc<Shader>> {
        &self.shaders
    }

    pub fn variables(&self) -> &NameTable<Arc<Variable>> {
        &self.variables
    }

    pub fn textures(&self) -> &NameTable<ImageRef> {
        &self.textures
    }

    pub fn surfaces(&self) -> &NameTable<ImageRef> {
        &self.surfaces
    }

    pub fn callbacks(&self) -> &NameTable<DrawCallback> {
        &self.callbacks
    }

    pub fn shader(&self, name: &str) -> Option<&Arc<Shader>> {
        self.shaders.get(name)
    }

    pub fn variable(&self, name: &str) -> Option<&Arc<Variable>> {
        self.variables.get(name)
    }

    pub fn texture(&self, name: &str) -> Option<&ImageRef> {
        self.textures.get(name)
    }

    pub fn surface(&self, name: &str) -> Option<&ImageRef> {
        self.surfaces.get(name)
    }

    pub fn callback(&self, name: &str) -> Option<&DrawCallback> {
        self.callbacks.get(name)
    }
}

/// Shader state a compiled pass requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledShaderBinding {
    pub shader: String,
    /// Uniform name to variable name. `None` keeps the previous value.
    pub uniforms: Vec<(String, Option<String>)>,
    /// Texture unit to texture name. `None` keeps the previous texture.
    pub samplers: Vec<(u32, Option<String>)>,
}

/// A render pass with every object reference replaced by its environment name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPass {
    pub name: String,
    pub callback: Option<String>,
    /// `None` draws into whatever surface is bound.
    pub surface: Option<String>,
    /// `None` leaves shader, uniforms and samplers untouched.
    pub shader: Option<CompiledShaderBinding>,
}

/// Name every object referenced by `passes`.
///
/// Passes should have been accepted by
/// [`typecheck_pass`](super::typecheck_pass). Bindings the pass's shader does
/// not use are dropped with a warning: drivers routinely optimize unused
/// uniforms away. A missing shader is treated like a don't-care one.
pub fn depointerize<'a>(
    passes: impl IntoIterator<Item = &'a RenderPass>,
    diagnostics: &mut Vec<Diagnostic>,
) -> (Vec<CompiledPass>, Environment) {
    let mut env = Environment::new();
    let mut compiled = Vec::new();

    for pass in passes {
        let surface = match &pass.target {
            PassField::Present(target) => Some(
                env.surfaces
                    .add(target.identity(), target.clone(), &pass.name)
                    .to_string(),
            ),
            _ => None,
        };

        let callback = pass.draw.present().map(|draw| {
            env.callbacks
                .add(arc_identity(draw), draw.clone(), &pass.name)
                .to_string()
        });

        let shader = pass.shader.present().map(|shader| {
            let shader_name = env
                .shaders
                .add(arc_identity(shader), shader.clone(), shader.name())
                .to_string();

            let mut uniforms = Vec::new();
            for (uniform, variable) in &pass.uniforms {
                if !shader.has_uniform(uniform) {
                    diagnostics.push(Diagnostic::warning(
                        &pass.name,
                        format!("shader {} has no uniform {uniform}", shader.name()),
                    ));
                    continue;
                }
                let variable = variable.as_ref().map(|variable| {
                    env.variables
                        .add(arc_identity(variable), variable.clone(), uniform)
                        .to_string()
                });
                uniforms.push((uniform.clone(), variable));
            }

            let mut samplers = Vec::new();
            for (sampler, image) in &pass.samplers {
                let Some(unit) = shader.sampler_unit(sampler) else {
                    diagnostics.push(Diagnostic::warning(
                        &pass.name,
                        format!("shader {} has no sampler {sampler}", shader.name()),
                    ));
                    continue;
                };
                let texture = image.as_ref().map(|image| {
                    env.textures
                        .add(image.identity(), image.clone(), sampler)
                        .to_string()
                });
                samplers.push((unit, texture));
            }

            CompiledShaderBinding {
                shader: shader_name,
                uniforms,
                samplers,
            }
        });

        compiled.push(CompiledPass {
            name: pass.name.clone(),
            callback,
            surface,
            shader,
        });
    }

    (compiled, env)
}
