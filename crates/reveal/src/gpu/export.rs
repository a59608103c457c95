use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use image::{ImageBuffer, RgbaImage};

use crate::panel::Bounds;
use crate::scene::{NodeId, NodeKind, SceneGraph};
use crate::shader::{RevealUniforms, UNIFORM_BOUNDING_BOX, UNIFORM_TIME, UNIFORM_TIME_EASED};

use super::context::{HeadlessContext, TARGET_FORMAT};
use super::pipeline::{self, CardPipeline, CardUniforms, RevealPipeline};

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.02,
    g: 0.02,
    b: 0.03,
    a: 1.0,
};

/// Offscreen renderer turning a [`SceneGraph`] into still images.
pub struct StillRenderer {
    context: HeadlessContext,
    reveal: RevealPipeline,
    cards: CardPipeline,
}

impl StillRenderer {
    pub fn new() -> Result<Self> {
        let context = HeadlessContext::new()?;
        let reveal = RevealPipeline::new(&context.device);
        let cards = CardPipeline::new(&context.device, &context.queue);
        Ok(Self {
            context,
            reveal,
            cards,
        })
    }

    /// Renders the panel under `root` and every textured surface beneath it.
    pub fn render(&self, scene: &SceneGraph, root: NodeId, size: (u32, u32)) -> Result<RgbaImage> {
        let (width, height) = size;
        self.context.check_size(width, height)?;
        let device = &self.context.device;

        let panel = scene
            .program(root)
            .ok_or_else(|| anyhow!("scene root is not a shader surface"))?;
        let bounds = panel
            .uniforms
            .get(UNIFORM_BOUNDING_BOX)
            .and_then(|value| value.as_vec4())
            .map(|[x, y, w, h]| Bounds {
                min: [x, y],
                size: [w, h],
            })
            .unwrap_or_else(|| panel.geometry.bounds());
        let view_proj = pipeline::view_projection(bounds, width, height);

        let mut reveal_uniforms = RevealUniforms::new(bounds);
        reveal_uniforms.set_view_proj(view_proj);
        reveal_uniforms.time = float_uniform(scene, root, UNIFORM_TIME);
        reveal_uniforms.time_eased = float_uniform(scene, root, UNIFORM_TIME_EASED);
        let panel_draw = self.reveal.prepare(device, &panel.geometry, &reveal_uniforms);

        let mut textures: HashMap<*const RgbaImage, wgpu::TextureView> = HashMap::new();
        let mut card_draws = Vec::new();
        for id in scene.descendants(root) {
            let Some(node) = scene.node(id) else {
                continue;
            };
            let NodeKind::Textured(surface) = &node.kind else {
                continue;
            };
            if surface.opacity <= 0.0 {
                continue;
            }
            let Some(world) = scene.world_transform(id) else {
                continue;
            };
            let view = surface.texture.as_ref().map(|image| {
                textures
                    .entry(Arc::as_ptr(image))
                    .or_insert_with(|| {
                        pipeline::upload_texture(
                            device,
                            &self.context.queue,
                            &node.label,
                            image.width(),
                            image.height(),
                            image.as_raw(),
                        )
                    })
                    .clone()
            });
            let uniforms = CardUniforms {
                view_proj,
                model: world.matrix(),
                size: surface.size,
                opacity: surface.opacity,
                _padding: 0.0,
            };
            card_draws.push(self.cards.prepare(device, &uniforms, view.as_ref()));
        }

        let target = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("still target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let target_view = target.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("still encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("still pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target_view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            self.reveal.draw(&mut pass, &panel_draw);
            for bind_group in &card_draws {
                self.cards.draw(&mut pass, bind_group);
            }
        }

        let bytes_per_row = padded_bytes_per_row(width);
        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("still readback"),
            size: u64::from(bytes_per_row) * u64::from(height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &target,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.context.queue.submit(std::iter::once(encoder.finish()));

        let slice = readback.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        device
            .poll(wgpu::PollType::Wait)
            .context("failed to wait for the GPU")?;
        rx.recv()
            .context("failed to receive buffer map result")?
            .context("failed to map readback buffer")?;

        let data = slice.get_mapped_range();
        let row_len = (width * 4) as usize;
        let mut pixels = Vec::with_capacity(row_len * height as usize);
        for row in data.chunks(bytes_per_row as usize).take(height as usize) {
            pixels.extend_from_slice(&row[..row_len]);
        }
        drop(data);
        readback.unmap();

        let image: RgbaImage = ImageBuffer::from_raw(width, height, pixels)
            .ok_or_else(|| anyhow!("readback produced a short buffer"))?;
        tracing::debug!(width, height, quads = card_draws.len(), "rendered still");
        Ok(image)
    }
}

/// Renders a single still of `scene` and writes it as PNG to `path`.
pub fn render_still(
    scene: &SceneGraph,
    root: NodeId,
    size: (u32, u32),
    path: &Path,
) -> Result<PathBuf> {
    let renderer = StillRenderer::new()?;
    let image = renderer.render(scene, root, size)?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    image
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("failed to write still to {}", path.display()))?;
    tracing::info!(path = %path.display(), width = size.0, height = size.1, "exported still");
    Ok(path.to_path_buf())
}

fn float_uniform(scene: &SceneGraph, node: NodeId, name: &str) -> f32 {
    scene
        .uniform(node, name)
        .and_then(|value| value.as_float())
        .unwrap_or(0.0)
}

fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_pad_to_copy_alignment() {
        assert_eq!(padded_bytes_per_row(64), 256);
        assert_eq!(padded_bytes_per_row(65), 512);
        assert_eq!(padded_bytes_per_row(1), 256);
    }
}
