use compute::RenderResolution;

use crate::error::RendererError;

const BYTES_PER_PIXEL: u32 = 4;

/// GPU image the compute output streams into.
///
/// Storage is allocated once per render resolution; every accepted frame is
/// a full-extent rewrite through the queue. Changing the resolution means
/// dropping the texture and allocating a fresh one, never resizing in
/// place.
pub(crate) struct StreamingTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    resolution: RenderResolution,
}

impl StreamingTexture {
    pub(crate) fn allocate(device: &wgpu::Device, resolution: RenderResolution) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("stream texture"),
            size: wgpu::Extent3d {
                width: resolution.width(),
                height: resolution.height(),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            resolution,
        }
    }

    pub(crate) fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    /// Replaces the whole image with `buffer`. Rejects mismatched lengths
    /// before touching the queue, so the previous contents survive a bad
    /// frame.
    pub(crate) fn update(
        &self,
        queue: &wgpu::Queue,
        buffer: &[u8],
    ) -> Result<(), RendererError> {
        check_extent(self.resolution, buffer.len())?;

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            buffer,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(self.resolution.width() * BYTES_PER_PIXEL),
                rows_per_image: Some(self.resolution.height()),
            },
            wgpu::Extent3d {
                width: self.resolution.width(),
                height: self.resolution.height(),
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }
}

fn check_extent(resolution: RenderResolution, actual: usize) -> Result<(), RendererError> {
    let expected = resolution.byte_len();
    if actual != expected {
        return Err(RendererError::SizeMismatch { expected, actual });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extent_check_accepts_exact_lengths_only() {
        let resolution = RenderResolution::new(1024, 1024).unwrap();
        assert!(check_extent(resolution, 1024 * 1024 * 4).is_ok());

        let short = check_extent(resolution, 1024 * 1024 * 4 - 1);
        assert!(matches!(
            short,
            Err(RendererError::SizeMismatch { expected, actual })
                if expected == 1024 * 1024 * 4 && actual == 1024 * 1024 * 4 - 1
        ));
        assert!(check_extent(resolution, 0).is_err());
    }
}
