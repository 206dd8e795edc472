use std::borrow::Cow;

use wgpu::naga::ShaderStage;

use crate::error::{PipelineStage, RendererError};

/// Compiles one of the embedded GLSL stages, converting wgpu's validation
/// report into a typed diagnostic with the offending stage and log text.
pub(crate) fn compile_shader(
    device: &wgpu::Device,
    source: &'static str,
    stage: PipelineStage,
) -> Result<wgpu::ShaderModule, RendererError> {
    let (naga_stage, label) = match stage {
        PipelineStage::Vertex => (ShaderStage::Vertex, "quad vertex"),
        PipelineStage::Fragment => (ShaderStage::Fragment, "quad fragment"),
    };

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(source),
            stage: naga_stage,
            defines: &[],
        },
    });
    if let Some(error) = pollster::block_on(device.pop_error_scope()) {
        return Err(RendererError::Compile {
            stage,
            log: error.to_string(),
        });
    }
    Ok(module)
}

/// Position passthrough: the two static attribute buffers land unchanged in
/// clip space, texture coordinates ride along to the fragment stage.
pub(crate) const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) in vec2 a_position;
layout(location = 1) in vec2 a_tex_coord;
layout(location = 0) out vec2 v_tex_coord;

void main() {
    v_tex_coord = a_tex_coord;
    gl_Position = vec4(a_position, 0.0, 1.0);
}
";

/// Single texture sample of the streamed image.
pub(crate) const FRAGMENT_SHADER_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_tex_coord;
layout(location = 0) out vec4 out_color;

layout(set = 0, binding = 0) uniform texture2D u_frame;
layout(set = 0, binding = 1) uniform sampler u_sampler;

void main() {
    out_color = texture(sampler2D(u_frame, u_sampler), v_tex_coord);
}
";
