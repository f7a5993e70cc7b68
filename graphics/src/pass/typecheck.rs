//! Shape checking of declarative passes before they are named.

use super::{Diagnostic, PassField, RenderPass};

/// Check that a pass can be depointerized.
///
/// Pushes one error per problem and returns whether the pass is usable. A
/// pass with a don't-care shader only needs a valid target and callback:
/// its uniforms and samplers are never bound.
pub fn typecheck_pass(pass: &RenderPass, diagnostics: &mut Vec<Diagnostic>) -> bool {
    let mut good = true;
    let mut fail = |message: String| {
        diagnostics.push(Diagnostic::error(&pass.name, message));
        good = false;
    };

    match &pass.draw {
        PassField::Present(_) => {}
        PassField::DontCare => fail("draw callback cannot be don't-care".to_string()),
        PassField::Missing => fail("missing draw callback".to_string()),
    }

    match &pass.target {
        PassField::Present(target) if !target.is_surface() => fail(format!(
            "target set to a {}, which cannot be drawn into",
            target.kind()
        )),
        PassField::Missing => fail("missing target surface".to_string()),
        _ => {}
    }

    let shader = match &pass.shader {
        PassField::Present(shader) => shader,
        PassField::DontCare => return good,
        PassField::Missing => {
            fail("missing shader".to_string());
            return good;
        }
    };

    for (uniform, _) in shader.uniforms() {
        if !pass.uniforms.contains_key(uniform) {
            fail(format!(
                "shader {} requires uniform {uniform}, which the pass does not set",
                shader.name()
            ));
        }
    }

    for (sampler, image) in &pass.samplers {
        let Some(image) = image else { continue };
        if let PassField::Present(target) = &pass.target {
            if image.same_image(target) {
                fail(format!("render target is also bound to sampler {sampler}"));
                continue;
            }
        }
        if !image.is_texture() {
            fail(format!(
                "sampler {sampler} set to a {}, which cannot be sampled",
                image.kind()
            ));
        }
    }

    for (sampler, _) in shader.samplers() {
        if !pass.samplers.contains_key(sampler) {
            fail(format!(
                "shader {} requires sampler {sampler}, which the pass does not set",
                shader.name()
            ));
        }
    }

    good
}
