//! Compiling named stage sources into a library of shaders.
//!
//! Compilation never fails as a whole. Every problem (a program naming a
//! missing stage, a stage that does not compile, a link failure) is logged
//! and the affected program is left out of the library, so an application
//! with one broken shader still runs everything else.
//!
//! Stage compile errors are reformatted with the offending source lines:
//!
//! ```text
//! ===================================================
//! When compiling vertex shader "sprite":
//!
//! void main() {
//!     vec2 p = corner * scale ◀◀◀ MISSING SOMETHING?
//!     gl_Position = vec4(p, 0.0, 1.0);
//!     ▀▀▀▀▀▀▀▀▀▀▀
//! ERROR: 0:12: 'gl_Position' : syntax error
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use archimedes_core::profiling::profile_scope;

use crate::backend::Device;
use crate::types::StageHandle;

use super::{Shader, ShaderStage};

/// Named stage sources and the programs to link from them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderSources {
    vertex: BTreeMap<String, String>,
    fragment: BTreeMap<String, String>,
    /// Program name to (vertex stage name, fragment stage name).
    programs: BTreeMap<String, (String, String)>,
}

impl ShaderSources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vertex(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.vertex.insert(name.into(), source.into());
        self
    }

    pub fn with_fragment(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.fragment.insert(name.into(), source.into());
        self
    }

    /// Declare a program linking the named vertex and fragment stages.
    pub fn with_program(
        mut self,
        name: impl Into<String>,
        vertex: impl Into<String>,
        fragment: impl Into<String>,
    ) -> Self {
        self.programs
            .insert(name.into(), (vertex.into(), fragment.into()));
        self
    }

    fn sources(&self, stage: ShaderStage) -> &BTreeMap<String, String> {
        match stage {
            ShaderStage::Vertex => &self.vertex,
            ShaderStage::Fragment => &self.fragment,
        }
    }
}

/// The shaders that compiled and linked successfully, by program name.
#[derive(Debug, Default)]
pub struct ShaderLibrary {
    shaders: BTreeMap<String, Arc<Shader>>,
    error_count: usize,
}

impl ShaderLibrary {
    /// Compile every stage and link every program in `sources`.
    pub fn compile(device: &mut dyn Device, sources: &ShaderSources) -> Self {
        profile_scope!("compile_shaders");

        let mut errors = 0;

        let mut programs = BTreeMap::new();
        for (name, (vertex, fragment)) in &sources.programs {
            let has_vertex = sources.vertex.contains_key(vertex);
            let has_fragment = sources.fragment.contains_key(fragment);
            if !has_vertex {
                log::error!("Program \"{name}\" requires missing vertex shader \"{vertex}\".");
            }
            if !has_fragment {
                log::error!("Program \"{name}\" requires missing fragment shader \"{fragment}\".");
            }
            if has_vertex && has_fragment {
                programs.insert(name, (vertex, fragment));
            } else {
                errors += 1;
            }
        }

        let vertex_stages = compile_stages(device, sources, ShaderStage::Vertex);
        let fragment_stages = compile_stages(device, sources, ShaderStage::Fragment);

        let mut linked = Vec::new();
        for (name, (vertex, fragment)) in programs {
            let (Some(Ok(vs)), Some(Ok(fs))) = (vertex_stages.get(vertex), fragment_stages.get(fragment))
            else {
                continue;
            };
            match device.link_program(*vs, *fs) {
                Ok(program) => linked.push((name.clone(), program)),
                Err(info_log) => {
                    log::error!("Error linking shader program \"{name}\":\n{info_log}");
                    errors += 1;
                }
            }
        }

        // Stage errors are logged after link errors so they end up last in the log.
        for (stage, stages) in [
            (ShaderStage::Vertex, &vertex_stages),
            (ShaderStage::Fragment, &fragment_stages),
        ] {
            for (name, result) in stages {
                if let Err(info_log) = result {
                    let source = sources.sources(stage).get(name).map_or("", String::as_str);
                    log::error!(
                        "{}",
                        format_compile_errors(&format!("{stage} shader \"{name}\""), source, info_log)
                    );
                    errors += 1;
                }
            }
        }

        for stage in vertex_stages.values().chain(fragment_stages.values()).flatten() {
            device.delete_stage(*stage);
        }

        let mut shaders = BTreeMap::new();
        for (name, program) in linked {
            match Shader::new(device, program, name.clone()) {
                Ok(shader) => {
                    shaders.insert(name, Arc::new(shader));
                }
                Err(e) => {
                    log::error!("Cannot use shader program \"{name}\": {e}");
                    device.delete_program(program);
                    errors += 1;
                }
            }
        }

        if errors > 0 {
            log::error!(
                "Finished shader compilation with {errors} error(s) and {} complete shader program(s).",
                shaders.len()
            );
        } else {
            log::info!("Compiled {} shader program(s)", shaders.len());
        }

        Self {
            shaders,
            error_count: errors,
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<Shader>> {
        self.shaders.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.shaders.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.shaders.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.shaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty()
    }

    /// Number of problems logged during compilation.
    pub fn error_count(&self) -> usize {
        self.error_count
    }
}

fn compile_stages(
    device: &mut dyn Device,
    sources: &ShaderSources,
    stage: ShaderStage,
) -> BTreeMap<String, Result<StageHandle, String>> {
    sources
        .sources(stage)
        .iter()
        .map(|(name, source)| (name.clone(), device.compile_stage(stage, source)))
        .collect()
}

/// Reformat a stage's compile log, one report per non-empty log line.
///
/// Lines shaped like `ERROR: 0:LINE: 'token' : message` get the surrounding
/// source, an underline under `token` and, when the previous statement looks
/// unterminated, a marker on that line. Anything else is passed through.
pub fn format_compile_errors(name: &str, source: &str, log: &str) -> String {
    log.lines()
        .filter(|line| !line.is_empty())
        .map(|line| format_compile_error(name, source, line))
        .collect::<Vec<_>>()
        .join("\n")
}

const CONTEXT_LINES: usize = 3;
const MISSING_MARKER: &str = " ◀◀◀ MISSING SOMETHING?";

fn format_compile_error(name: &str, source: &str, error: &str) -> String {
    let fallback = || format!("When compiling {name}: {error}");
    let lines: Vec<&str> = source.lines().collect();

    let parts: Vec<&str> = error.splitn(4, ':').collect();
    if parts.len() < 3 || parts[0] != "ERROR" || parts[1].trim() != "0" {
        return fallback();
    }
    let Some(line) = parts[2]
        .trim()
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .filter(|n| *n < lines.len())
    else {
        return fallback();
    };

    let token = parts
        .get(3)
        .map(|rest| rest.trim().trim_matches(|c| c == '\'' || c == '"'))
        .and_then(|rest| rest.split(['\'', '"']).next())
        .unwrap_or("");
    let token_index = (!token.is_empty()).then(|| lines[line].find(token)).flatten();

    let unterminated = (0..line)
        .rev()
        .map(|i| (i, lines[i]))
        .find(|(_, l)| !is_blank(l))
        .filter(|(_, l)| !is_terminated(l))
        .map(|(i, _)| i);
    let suspect = unterminated.filter(|_| {
        token_index.is_some_and(|index| lines[line][..index].trim().is_empty())
    });

    let mut start = (line + 1).saturating_sub(CONTEXT_LINES);
    if let Some(i) = unterminated {
        start = start.min(i);
    }

    let mut message = vec![format!("When compiling {name}:"), String::new()];
    for (i, text) in lines.iter().enumerate().take(line + 1).skip(start) {
        if Some(i) == suspect {
            message.push(format!("{text}{MISSING_MARKER}"));
        } else {
            message.push(text.to_string());
        }
    }
    if let Some(index) = token_index {
        message.push(format!("{}{}", " ".repeat(index), "▀".repeat(token.chars().count())));
    }
    message.push(error.to_string());

    let longest = message.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    message.insert(0, "=".repeat(longest + 1));
    message.join("\n")
}

fn strip_comment(line: &str) -> &str {
    line.split("//").next().unwrap_or("").trim_end()
}

fn is_blank(line: &str) -> bool {
    strip_comment(line).trim().is_empty()
}

fn is_terminated(line: &str) -> bool {
    strip_comment(line).ends_with([';', '{', '}'])
}
