//! Recording compiled passes into a minimal instruction stream.
//!
//! Passes must run in order, so the only optimization available is not
//! repeating state changes. The recorder tracks what each instruction it has
//! emitted leaves bound and skips bindings that are already in place.

use std::collections::HashMap;

use archimedes_core::profiling::profile_scope;

use crate::backend::Device;
use crate::resources::ImageRef;
use crate::types::PixelRect;

use super::environment::{CompiledPass, Environment, depointerize};
use super::typecheck::typecheck_pass;
use super::{Diagnostic, RenderPass};

/// One step of a recorded render procedure. Every name is an environment key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// Bind a target surface and fit viewport and scissor to it.
    BindSurface { surface: String },
    /// Make a shader's program current.
    UseShader { shader: String },
    /// Upload a variable's current value to a uniform of the current shader.
    SetUniform {
        shader: String,
        uniform: String,
        variable: String,
    },
    /// Bind a texture to a texture unit.
    BindTexture { unit: u32, texture: String },
    /// Invoke a pass's draw callback.
    Draw { pass: String, callback: String },
}

/// Replays compiled passes, tracking bound state.
#[derive(Debug, Default)]
pub struct PassRecorder {
    instructions: Vec<Instruction>,
    surface: Option<String>,
    shader: Option<String>,
    /// Shader to (uniform to variable) last uploaded.
    uniforms: HashMap<String, HashMap<String, String>>,
    /// Texture unit to bound texture.
    textures: HashMap<u32, String>,
}

impl PassRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check a compiled pass against an environment.
    ///
    /// Returns warnings for a pass that can be recorded, or the errors that
    /// prevent recording it. Uniforms the shader does not declare are not
    /// errors: they were already dropped during depointerization.
    pub fn typecheck(
        &self,
        pass: &CompiledPass,
        env: &Environment,
    ) -> Result<Vec<String>, Vec<String>> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if let Some(binding) = &pass.shader {
            match env.shader(&binding.shader) {
                None => errors.push(format!("shader {} is not in the environment", binding.shader)),
                Some(shader) => {
                    for (uniform, declared) in shader.uniforms() {
                        let Some((_, variable)) =
                            binding.uniforms.iter().find(|(name, _)| name == uniform)
                        else {
                            errors.push(format!(
                                "shader {} requires uniform {uniform}, which the pass does not set",
                                binding.shader
                            ));
                            continue;
                        };
                        let Some(variable) = variable else {
                            let ever_set = self
                                .uniforms
                                .get(&binding.shader)
                                .is_some_and(|set| set.contains_key(uniform));
                            if !ever_set {
                                warnings.push(format!(
                                    "uniform {uniform} is don't-care but no earlier pass sets it"
                                ));
                            }
                            continue;
                        };
                        let Some(value) = env.variable(variable) else {
                            errors.push(format!(
                                "uniform {uniform} points to variable {variable}, which is not in the environment"
                            ));
                            continue;
                        };
                        let data = value.read();
                        let descriptor = declared.ty.descriptor();
                        if data.is_float() != descriptor.element_kind.is_float() {
                            errors.push(format!(
                                "uniform {uniform} has type {}, but variable {variable} holds {} data",
                                declared.ty,
                                if data.is_float() { "float" } else { "integer" }
                            ));
                        } else if data.len() != descriptor.element_count {
                            errors.push(format!(
                                "uniform {uniform} set to a variable with {} elements, but it needs {}",
                                data.len(),
                                descriptor.element_count
                            ));
                        }
                    }
                }
            }

            for (unit, texture) in &binding.samplers {
                let Some(texture) = texture else { continue };
                match env.texture(texture) {
                    Some(image) if image.is_texture() => {}
                    Some(image) => errors.push(format!(
                        "texture {texture} on unit {unit} is a {}, which cannot be sampled",
                        image.kind()
                    )),
                    None => errors.push(format!(
                        "texture {texture} on unit {unit} is not in the environment"
                    )),
                }
            }
        }

        match &pass.callback {
            Some(callback) if env.callback(callback).is_some() => {}
            Some(callback) => errors.push(format!("callback {callback} is not in the environment")),
            None => errors.push("pass has no draw callback".to_string()),
        }

        if let Some(surface) = &pass.surface {
            match env.surface(surface) {
                Some(image) if image.is_surface() => {}
                Some(image) => errors.push(format!(
                    "surface {surface} is a {}, which cannot be drawn into",
                    image.kind()
                )),
                None => errors.push(format!("surface {surface} is not in the environment")),
            }
        }

        if errors.is_empty() { Ok(warnings) } else { Err(errors) }
    }

    /// Record a pass that passed [`typecheck`](Self::typecheck).
    pub fn record(&mut self, pass: &CompiledPass) {
        if let Some(surface) = &pass.surface {
            if self.surface.as_ref() != Some(surface) {
                self.surface = Some(surface.clone());
                self.instructions.push(Instruction::BindSurface {
                    surface: surface.clone(),
                });
            }
        }

        if let Some(binding) = &pass.shader {
            if self.shader.as_ref() != Some(&binding.shader) {
                self.shader = Some(binding.shader.clone());
                self.instructions.push(Instruction::UseShader {
                    shader: binding.shader.clone(),
                });
            }

            let set = self.uniforms.entry(binding.shader.clone()).or_default();
            for (uniform, variable) in &binding.uniforms {
                let Some(variable) = variable else { continue };
                if set.get(uniform) != Some(variable) {
                    set.insert(uniform.clone(), variable.clone());
                    self.instructions.push(Instruction::SetUniform {
                        shader: binding.shader.clone(),
                        uniform: uniform.clone(),
                        variable: variable.clone(),
                    });
                }
            }

            for (unit, texture) in &binding.samplers {
                let Some(texture) = texture else { continue };
                if self.textures.get(unit) != Some(texture) {
                    self.textures.insert(*unit, texture.clone());
                    self.instructions.push(Instruction::BindTexture {
                        unit: *unit,
                        texture: texture.clone(),
                    });
                }
            }
        }

        if let Some(callback) = &pass.callback {
            self.instructions.push(Instruction::Draw {
                pass: pass.name.clone(),
                callback: callback.clone(),
            });
        }
    }

    /// Instructions recorded so far.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn finish(self) -> RenderProcedure {
        RenderProcedure {
            instructions: self.instructions,
        }
    }
}

/// A recorded instruction stream, executable against its environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderProcedure {
    instructions: Vec<Instruction>,
}

impl RenderProcedure {
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Execute every instruction. Names missing from `env` are skipped.
    pub fn run(&self, device: &mut dyn Device, env: &Environment) {
        profile_scope!("render_procedure");

        for instruction in &self.instructions {
            match instruction {
                Instruction::BindSurface { surface } => match env.surface(surface) {
                    Some(ImageRef::Canvas) => {
                        device.bind_target_surface(None);
                        let (width, height) = device.drawing_buffer_size();
                        let rect = PixelRect::from_dimensions(width, height);
                        device.set_viewport(rect);
                        device.set_scissor(rect);
                    }
                    Some(ImageRef::Framebuffer(framebuffer)) => {
                        device.bind_target_surface(Some(framebuffer.handle()));
                        let rect = PixelRect::from_dimensions(framebuffer.width(), framebuffer.height());
                        device.set_viewport(rect);
                        device.set_scissor(rect);
                    }
                    _ => log::warn!("Render procedure: no surface named {surface}"),
                },
                Instruction::UseShader { shader } => match env.shader(shader) {
                    Some(shader) => device.use_shader_program(shader.program()),
                    None => log::warn!("Render procedure: no shader named {shader}"),
                },
                Instruction::SetUniform {
                    shader,
                    uniform,
                    variable,
                } => {
                    let target = env.shader(shader).and_then(|s| s.uniform(uniform));
                    match (target, env.variable(variable)) {
                        (Some(target), Some(variable)) => {
                            let data = variable.read();
                            device.set_uniform(
                                target.location,
                                target.function(),
                                data.as_value(),
                                false,
                            );
                        }
                        _ => log::warn!(
                            "Render procedure: cannot set {shader}.{uniform} from {variable}"
                        ),
                    }
                }
                Instruction::BindTexture { unit, texture } => {
                    match env.texture(texture).and_then(ImageRef::texture_handle) {
                        Some(handle) => device.bind_texture_to_unit(*unit, handle),
                        None => log::warn!("Render procedure: no texture named {texture}"),
                    }
                }
                Instruction::Draw { pass, callback } => match env.callback(callback) {
                    Some(draw) => draw(&mut *device),
                    None => log::warn!("Render procedure: pass {pass} has no callback {callback}"),
                },
            }
        }
    }
}

/// A compiled pass sequence: its procedure, environment and findings.
#[derive(Debug)]
pub struct CompiledRenderer {
    pub procedure: RenderProcedure,
    pub environment: Environment,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompiledRenderer {
    /// Render one frame.
    pub fn run(&self, device: &mut dyn Device) {
        self.procedure.run(device, &self.environment);
    }

    /// Whether any pass was dropped.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Compile a pass sequence into an executable renderer.
///
/// Malformed passes are logged and dropped; everything else still renders.
/// Every call produces an independent procedure with its own state cache.
pub fn compile_renderer(passes: &[RenderPass]) -> CompiledRenderer {
    profile_scope!("compile_renderer");

    let mut diagnostics = Vec::new();
    let accepted: Vec<&RenderPass> = passes
        .iter()
        .filter(|pass| {
            let good = typecheck_pass(pass, &mut diagnostics);
            if !good {
                log::error!("Dropping pass `{}`: it does not typecheck", pass.name);
            }
            good
        })
        .collect();

    let (compiled, environment) = depointerize(accepted, &mut diagnostics);

    let mut recorder = PassRecorder::new();
    for pass in &compiled {
        match recorder.typecheck(pass, &environment) {
            Ok(warnings) => {
                diagnostics.extend(warnings.into_iter().map(|m| Diagnostic::warning(&pass.name, m)));
                recorder.record(pass);
            }
            Err(errors) => {
                log::error!("Skipping pass `{}` due to errors", pass.name);
                diagnostics.extend(errors.into_iter().map(|m| Diagnostic::error(&pass.name, m)));
            }
        }
    }

    for diagnostic in &diagnostics {
        diagnostic.log();
    }

    let procedure = recorder.finish();
    log::debug!(
        "Compiled {} of {} passes into {} instructions",
        compiled.len(),
        passes.len(),
        procedure.instructions().len()
    );

    CompiledRenderer {
        procedure,
        environment,
        diagnostics,
    }
}
