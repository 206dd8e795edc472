use compute::RenderResolution;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::dpi::PhysicalSize;

use crate::error::RendererError;
use crate::types::FilterMode;

use super::context::GpuContext;
use super::pipeline::QuadPipeline;
use super::texture::StreamingTexture;

/// Everything GPU-side for one streaming session: surface, quad program,
/// and the streaming texture, wired into a single bind group.
pub(crate) struct GpuState {
    context: GpuContext,
    pipeline: QuadPipeline,
    stream: StreamingTexture,
    frame_bind_group: wgpu::BindGroup,
}

impl GpuState {
    pub(crate) fn new<T>(
        target: &T,
        surface_size: PhysicalSize<u32>,
        render_resolution: RenderResolution,
        filter: FilterMode,
    ) -> Result<Self, RendererError>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(target, surface_size)?;
        let pipeline = QuadPipeline::new(&context.device, context.surface_format, filter)?;
        let stream = StreamingTexture::allocate(&context.device, render_resolution);
        let frame_bind_group = pipeline.bind_frame(&context.device, stream.view());

        tracing::info!(
            "initialised {}x{} surface streaming at {} ({} filtering)",
            context.size.width,
            context.size.height,
            render_resolution,
            filter
        );

        Ok(Self {
            context,
            pipeline,
            stream,
            frame_bind_group,
        })
    }

    pub(crate) fn size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    /// Physical surface resize; the streaming texture is untouched because
    /// the logical resolution is independent of the surface size.
    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.context.resize(new_size);
    }

    /// Writes one frame's pixels into the streaming texture.
    pub(crate) fn upload(&self, buffer: &[u8]) -> Result<(), RendererError> {
        self.stream.update(&self.context.queue, buffer)
    }

    /// Draws the quad and presents.
    pub(crate) fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let frame = self.context.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("stream encoder"),
                });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("stream pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            self.pipeline.draw(&mut pass, &self.frame_bind_group);
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}
