//! Declarative render passes and their compiler.
//!
//! A frame is described as an ordered list of [`RenderPass`]es. Each pass
//! names a target surface, a shader with its uniform and sampler bindings, and
//! a draw callback. [`compile_renderer`] turns the list into a
//! [`CompiledRenderer`] in three stages:
//!
//! 1. **Typecheck** - passes with missing or ill-typed bindings are dropped
//! 2. **Depointerize** - every referenced object gets a stable name in an
//!    [`Environment`], producing [`CompiledPass`]es that only hold names
//! 3. **Record** - a [`PassRecorder`] replays the compiled passes against a
//!    cache of bound state and emits only the bindings that change
//!
//! Problems never abort compilation. They are collected as [`Diagnostic`]s,
//! logged, and the offending pass is skipped.
//!
//! # Example
//!
//! ```ignore
//! let passes = vec![
//!     RenderPass::clear("clear", ClearColor::TRANSPARENT),
//!     RenderPass::draw_to_canvas("sprites")
//!         .with_shader(sprite_shader.clone())
//!         .with_uniform("camera", camera.clone())
//!         .with_sampler("atlas", atlas.clone())
//!         .with_draw(move |device| geometry.draw(device, PrimitiveMode::TriangleStrip)),
//! ];
//! let renderer = compile_renderer(&passes);
//!
//! // Each frame
//! renderer.run(&mut device);
//! ```

mod environment;
#[cfg(test)]
mod fixtures;
mod recorder;
mod typecheck;

pub use environment::{
    CANVAS, CompiledPass, CompiledShaderBinding, Environment, NameTable, depointerize,
};
pub use recorder::{
    CompiledRenderer, Instruction, PassRecorder, RenderProcedure, compile_renderer,
};
pub use typecheck::typecheck_pass;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::backend::Device;
use crate::resources::{ImageRef, Variable};
use crate::shader::Shader;
use crate::types::ClearColor;

/// Callback issuing a pass's draw calls once its state is bound.
pub type DrawCallback = Arc<dyn Fn(&mut dyn Device)>;

/// A required pass field.
///
/// `DontCare` leaves whatever state a previous pass bound. `Missing` is the
/// state of a field nobody set, and fails typechecking wherever the field is
/// required.
#[derive(Clone)]
pub enum PassField<T> {
    Present(T),
    DontCare,
    Missing,
}

impl<T> Default for PassField<T> {
    fn default() -> Self {
        Self::Missing
    }
}

impl<T> PassField<T> {
    /// The value, if present.
    pub fn present(&self) -> Option<&T> {
        match self {
            Self::Present(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    pub fn is_dont_care(&self) -> bool {
        matches!(self, Self::DontCare)
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

impl<T: fmt::Debug> fmt::Debug for PassField<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present(value) => f.debug_tuple("Present").field(value).finish(),
            Self::DontCare => f.write_str("DontCare"),
            Self::Missing => f.write_str("Missing"),
        }
    }
}

/// One step of a frame: bind a surface and a shader, then draw.
///
/// Uniforms and samplers map to `None` when the pass does not care about
/// their value and leaves whatever an earlier pass set.
#[derive(Clone, Default)]
pub struct RenderPass {
    pub name: String,
    pub target: PassField<ImageRef>,
    pub shader: PassField<Arc<Shader>>,
    pub uniforms: BTreeMap<String, Option<Arc<Variable>>>,
    pub samplers: BTreeMap<String, Option<ImageRef>>,
    pub draw: PassField<DrawCallback>,
}

impl RenderPass {
    /// Create an empty pass. Target, shader and draw callback start missing.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// A pass that clears the canvas without touching shader state.
    pub fn clear(name: impl Into<String>, color: ClearColor) -> Self {
        Self::new(name)
            .with_canvas_target()
            .with_shader_dont_care()
            .with_draw(move |device: &mut dyn Device| device.clear(color))
    }

    /// A pass drawing to the canvas, waiting for a shader and draw callback.
    pub fn draw_to_canvas(name: impl Into<String>) -> Self {
        Self::new(name).with_canvas_target()
    }

    pub fn with_target(mut self, target: impl Into<ImageRef>) -> Self {
        self.target = PassField::Present(target.into());
        self
    }

    pub fn with_canvas_target(mut self) -> Self {
        self.target = PassField::Present(ImageRef::Canvas);
        self
    }

    /// Draw into whatever surface is currently bound.
    pub fn with_target_dont_care(mut self) -> Self {
        self.target = PassField::DontCare;
        self
    }

    pub fn with_shader(mut self, shader: Arc<Shader>) -> Self {
        self.shader = PassField::Present(shader);
        self
    }

    /// Skip shader, uniform and sampler binding entirely.
    pub fn with_shader_dont_care(mut self) -> Self {
        self.shader = PassField::DontCare;
        self
    }

    pub fn with_uniform(mut self, name: impl Into<String>, variable: Arc<Variable>) -> Self {
        self.uniforms.insert(name.into(), Some(variable));
        self
    }

    pub fn with_uniform_dont_care(mut self, name: impl Into<String>) -> Self {
        self.uniforms.insert(name.into(), None);
        self
    }

    pub fn with_sampler(mut self, name: impl Into<String>, image: impl Into<ImageRef>) -> Self {
        self.samplers.insert(name.into(), Some(image.into()));
        self
    }

    pub fn with_sampler_dont_care(mut self, name: impl Into<String>) -> Self {
        self.samplers.insert(name.into(), None);
        self
    }

    pub fn with_draw<F>(mut self, draw: F) -> Self
    where
        F: Fn(&mut dyn Device) + 'static,
    {
        self.draw = PassField::Present(Arc::new(draw));
        self
    }
}

impl fmt::Debug for RenderPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shader = match &self.shader {
            PassField::Present(shader) => shader.name(),
            PassField::DontCare => "<don't care>",
            PassField::Missing => "<missing>",
        };
        let draw = match &self.draw {
            PassField::Present(_) => "<callback>",
            PassField::DontCare => "<don't care>",
            PassField::Missing => "<missing>",
        };
        f.debug_struct("RenderPass")
            .field("name", &self.name)
            .field("target", &self.target)
            .field("shader", &shader)
            .field("uniforms", &self.uniforms.keys().collect::<Vec<_>>())
            .field("samplers", &self.samplers)
            .field("draw", &draw)
            .finish()
    }
}

/// How serious a compiler finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// The pass still runs.
    Warning,
    /// The pass was dropped.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => f.write_str("warning"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// A finding from compiling a pass sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub pass: String,
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(pass: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            pass: pass.into(),
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn error(pass: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            pass: pass.into(),
            severity: Severity::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Emit through the `log` facade at the matching level.
    pub fn log(&self) {
        match self.severity {
            Severity::Warning => log::warn!("{self}"),
            Severity::Error => log::error!("{self}"),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in pass `{}`: {}", self.severity, self.pass, self.message)
    }
}
