//! Reading rendered frames back to the CPU

use image::RgbaImage;
use twinview_core::{Error, Result};

use crate::device::GpuContext;

const BYTES_PER_PIXEL: u32 = 4;

/// Row pitch of a texture-to-buffer copy, padded to wgpu's alignment
pub fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * BYTES_PER_PIXEL;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Strip the row padding from a mapped copy
pub fn unpad_rows(data: &[u8], width: u32, height: u32, padded_bytes_per_row: u32) -> Vec<u8> {
    let row = (width * BYTES_PER_PIXEL) as usize;
    data.chunks(padded_bytes_per_row as usize)
        .take(height as usize)
        .flat_map(|chunk| &chunk[..row.min(chunk.len())])
        .copied()
        .collect()
}

/// Copy an RGBA8 texture into an image, blocking until the GPU is done.
///
/// sRGB textures are returned as stored, which is what image files expect.
pub fn read_texture_rgba(gpu: &GpuContext, texture: &wgpu::Texture) -> Result<RgbaImage> {
    match texture.format() {
        wgpu::TextureFormat::Rgba8Unorm | wgpu::TextureFormat::Rgba8UnormSrgb => {}
        other => return Err(Error::Gpu(format!("Cannot capture texture format {:?}", other))),
    }

    let (width, height) = (texture.width(), texture.height());
    let padded = padded_bytes_per_row(width);

    let staging_buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Capture Staging Buffer"),
        size: padded as u64 * height as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Capture Encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::ImageCopyTexture {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::ImageCopyBuffer {
            buffer: &staging_buffer,
            layout: wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(padded),
                rows_per_image: Some(height),
            },
        },
        texture.size(),
    );
    gpu.queue.submit(std::iter::once(encoder.finish()));

    let buffer_slice = staging_buffer.slice(..);
    let (sender, receiver) = flume::bounded(1);
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });

    gpu.device.poll(wgpu::Maintain::Wait);
    receiver
        .recv()
        .map_err(|_| Error::Gpu("Failed to receive mapping result".into()))?
        .map_err(|e| Error::Gpu(format!("Buffer mapping failed: {:?}", e)))?;

    let data = buffer_slice.get_mapped_range();
    let pixels = unpad_rows(&data, width, height, padded);
    drop(data);
    staging_buffer.unmap();

    RgbaImage::from_raw(width, height, pixels)
        .ok_or_else(|| Error::Gpu("Captured frame has the wrong size".into()))
}
