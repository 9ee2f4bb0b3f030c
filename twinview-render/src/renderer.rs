//! Pane rendering
//!
//! A [`SceneRenderer`] draws one [`Scene`] through one [`Camera`]. The wgpu
//! implementation, [`PaneRenderer`], renders off-screen into a texture the UI
//! then displays inside its pane.

use std::collections::HashMap;
use std::sync::Arc;

use image::RgbaImage;
use twinview_core::{Error, Result};

use crate::background::GradientBackground;
use crate::capture::read_texture_rgba;
use crate::camera::Camera;
use crate::device::GpuContext;
use crate::material::FaceSide;
use crate::mesh::{mesh_to_point_instances, mesh_to_vertices, MaterialUniform, MeshVertex, PointInstance, SceneUniform};
use crate::scene::{ObjectId, Scene, SceneMesh};

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Draws a scene through a camera into some output
pub trait SceneRenderer {
    /// Ratio between physical and logical pixels
    fn set_pixel_ratio(&mut self, pixel_ratio: f32);

    fn pixel_ratio(&self) -> f32;

    /// Output size in logical pixels
    fn set_size(&mut self, width: f32, height: f32);

    fn size(&self) -> (f32, f32);

    fn render(&mut self, scene: &Scene, camera: &Camera) -> Result<()>;

    /// Output size in physical pixels
    fn drawing_buffer_size(&self) -> (u32, u32) {
        let (width, height) = self.size();
        let ratio = self.pixel_ratio();
        (
            (width * ratio).round().max(0.0) as u32,
            (height * ratio).round().max(0.0) as u32,
        )
    }
}

/// Rendering configuration
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Point sprite size in physical pixels
    pub point_size: f32,
    /// 1 disables anti-aliasing
    pub msaa_samples: u32,
    pub output_format: wgpu::TextureFormat,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            point_size: 3.0,
            msaa_samples: 4,
            output_format: wgpu::TextureFormat::Rgba8UnormSrgb,
        }
    }
}

struct PaneTargets {
    size: (u32, u32),
    multisampled: Option<wgpu::TextureView>,
    output: wgpu::Texture,
    output_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
}

enum GpuGeometry {
    Triangles {
        vertices: wgpu::Buffer,
        indices: wgpu::Buffer,
        index_count: u32,
    },
    Points {
        instances: wgpu::Buffer,
        instance_count: u32,
    },
}

struct GpuMesh {
    geometry: GpuGeometry,
    side: FaceSide,
    material_bind_group: wgpu::BindGroup,
    // Keeps the uniform alive alongside its bind group
    _material_buffer: wgpu::Buffer,
}

struct GpuBackground {
    source: GradientBackground,
    bind_group: wgpu::BindGroup,
}

struct Pipelines {
    mesh_front: wgpu::RenderPipeline,
    mesh_double: wgpu::RenderPipeline,
    points: wgpu::RenderPipeline,
    background: wgpu::RenderPipeline,
}

/// Off-screen wgpu renderer for one pane
pub struct PaneRenderer {
    gpu: Arc<GpuContext>,
    config: RenderConfig,
    size: (f32, f32),
    pixel_ratio: f32,
    targets: Option<PaneTargets>,
    output_revision: u64,
    pipelines: Pipelines,
    scene_buffer: wgpu::Buffer,
    scene_bind_group: wgpu::BindGroup,
    material_layout: wgpu::BindGroupLayout,
    background_layout: wgpu::BindGroupLayout,
    background_sampler: wgpu::Sampler,
    background: Option<GpuBackground>,
    meshes: HashMap<ObjectId, GpuMesh>,
}

impl PaneRenderer {
    /// Create a renderer with the given logical size and pixel ratio
    pub fn new(gpu: Arc<GpuContext>, config: RenderConfig, width: f32, height: f32, pixel_ratio: f32) -> Self {
        let uniform_entry = |visibility| wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let scene_layout = gpu.create_bind_group_layout(
            "scene_bind_group_layout",
            &[uniform_entry(wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT)],
        );
        let material_layout = gpu.create_bind_group_layout(
            "material_bind_group_layout",
            &[uniform_entry(wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT)],
        );
        let background_layout = gpu.create_bind_group_layout(
            "background_bind_group_layout",
            &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        );

        let scene_buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Scene Uniform Buffer"),
            size: std::mem::size_of::<SceneUniform>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let scene_bind_group = gpu.create_bind_group(
            "scene_bind_group",
            &scene_layout,
            &[wgpu::BindGroupEntry {
                binding: 0,
                resource: scene_buffer.as_entire_binding(),
            }],
        );

        let background_sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Background Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let pipelines = create_pipelines(&gpu, &config, &scene_layout, &material_layout, &background_layout);

        Self {
            gpu,
            config,
            size: (width, height),
            pixel_ratio,
            targets: None,
            output_revision: 0,
            pipelines,
            scene_buffer,
            scene_bind_group,
            material_layout,
            background_layout,
            background_sampler,
            background: None,
            meshes: HashMap::new(),
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// The resolved output of the last render, if anything was rendered yet
    pub fn output_view(&self) -> Option<&wgpu::TextureView> {
        self.targets.as_ref().map(|t| &t.output_view)
    }

    pub fn output_texture(&self) -> Option<&wgpu::Texture> {
        self.targets.as_ref().map(|t| &t.output)
    }

    /// Read the last rendered frame back as an image
    pub fn capture(&self) -> Result<RgbaImage> {
        let texture = self
            .output_texture()
            .ok_or_else(|| Error::Gpu("Nothing has been rendered yet".into()))?;
        read_texture_rgba(&self.gpu, texture)
    }

    /// Bumped every time the output texture is recreated
    pub fn output_revision(&self) -> u64 {
        self.output_revision
    }

    fn ensure_targets(&mut self, size: (u32, u32)) {
        if self.targets.as_ref().is_some_and(|t| t.size == size) {
            return;
        }

        let device = &self.gpu.device;
        let extent = wgpu::Extent3d {
            width: size.0,
            height: size.1,
            depth_or_array_layers: 1,
        };
        let samples = self.config.msaa_samples.max(1);

        let output = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Pane Output Texture"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.config.output_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });

        let multisampled = (samples > 1).then(|| {
            device
                .create_texture(&wgpu::TextureDescriptor {
                    label: Some("Pane MSAA Texture"),
                    size: extent,
                    mip_level_count: 1,
                    sample_count: samples,
                    dimension: wgpu::TextureDimension::D2,
                    format: self.config.output_format,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    view_formats: &[],
                })
                .create_view(&wgpu::TextureViewDescriptor::default())
        });

        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Pane Depth Texture"),
            size: extent,
            mip_level_count: 1,
            sample_count: samples,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        tracing::debug!(width = size.0, height = size.1, samples, "Recreating pane targets");

        self.targets = Some(PaneTargets {
            size,
            multisampled,
            output_view: output.create_view(&wgpu::TextureViewDescriptor::default()),
            output,
            depth_view: depth.create_view(&wgpu::TextureViewDescriptor::default()),
        });
        self.output_revision += 1;
    }

    fn ensure_background(&mut self, background: &GradientBackground) {
        if self.background.as_ref().is_some_and(|b| &b.source == background) {
            return;
        }

        let image = background.to_image();
        let (width, height) = image.dimensions();
        let extent = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = self.gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Background Texture"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.gpu.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            image.as_raw(),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            extent,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self.gpu.create_bind_group(
            "background_bind_group",
            &self.background_layout,
            &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.background_sampler),
                },
            ],
        );

        self.background = Some(GpuBackground {
            source: background.clone(),
            bind_group,
        });
    }

    /// Upload meshes new to the scene and drop the ones it no longer holds
    fn sync_meshes(&mut self, scene: &Scene) {
        self.meshes.retain(|id, _| scene.contains(*id));

        for (id, mesh) in scene.meshes() {
            if !self.meshes.contains_key(&id) {
                let uploaded = self.upload_mesh(mesh);
                self.meshes.insert(id, uploaded);
            }
        }
    }

    fn upload_mesh(&self, mesh: &SceneMesh) -> GpuMesh {
        let geometry = if mesh.geometry.is_point_cloud() {
            let instances = mesh_to_point_instances(mesh);
            GpuGeometry::Points {
                instance_count: instances.len() as u32,
                instances: self.gpu.create_buffer_init(
                    "Point Instance Buffer",
                    &instances,
                    wgpu::BufferUsages::VERTEX,
                ),
            }
        } else {
            let (vertices, indices) = mesh_to_vertices(mesh);
            GpuGeometry::Triangles {
                index_count: indices.len() as u32,
                vertices: self.gpu.create_buffer_init("Mesh Vertex Buffer", &vertices, wgpu::BufferUsages::VERTEX),
                indices: self.gpu.create_buffer_init("Mesh Index Buffer", &indices, wgpu::BufferUsages::INDEX),
            }
        };

        let material_buffer = self.gpu.create_buffer_init(
            "Material Uniform Buffer",
            &[MaterialUniform::from(&mesh.material)],
            wgpu::BufferUsages::UNIFORM,
        );
        let material_bind_group = self.gpu.create_bind_group(
            "material_bind_group",
            &self.material_layout,
            &[wgpu::BindGroupEntry {
                binding: 0,
                resource: material_buffer.as_entire_binding(),
            }],
        );

        tracing::debug!(
            vertices = mesh.geometry.vertex_count(),
            faces = mesh.geometry.face_count(),
            "Uploaded mesh"
        );

        GpuMesh {
            geometry,
            side: mesh.material.side,
            material_bind_group,
            _material_buffer: material_buffer,
        }
    }
}

impl SceneRenderer for PaneRenderer {
    fn set_pixel_ratio(&mut self, pixel_ratio: f32) {
        if pixel_ratio.is_finite() && pixel_ratio > 0.0 {
            self.pixel_ratio = pixel_ratio;
        }
    }

    fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    fn set_size(&mut self, width: f32, height: f32) {
        self.size = (width.max(0.0), height.max(0.0));
    }

    fn size(&self) -> (f32, f32) {
        self.size
    }

    fn render(&mut self, scene: &Scene, camera: &Camera) -> Result<()> {
        let size = self.drawing_buffer_size();
        if size.0 == 0 || size.1 == 0 {
            return Ok(());
        }
        let max_dimension = self.gpu.device.limits().max_texture_dimension_2d;
        if size.0 > max_dimension || size.1 > max_dimension {
            return Err(Error::Gpu(format!(
                "Pane size {}x{} exceeds the device limit of {}",
                size.0, size.1, max_dimension
            )));
        }

        self.ensure_targets(size);
        self.ensure_background(&scene.background);
        self.sync_meshes(scene);

        let uniform = SceneUniform::new(camera, &scene.lights, size, self.config.point_size);
        self.gpu.queue.write_buffer(&self.scene_buffer, 0, bytemuck::bytes_of(&uniform));

        let (Some(targets), Some(background)) = (&self.targets, &self.background) else {
            return Err(Error::Gpu("Pane targets were not created".to_string()));
        };

        let mut encoder = self.gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Pane Render Encoder"),
        });

        {
            let (view, resolve_target) = match &targets.multisampled {
                Some(msaa) => (msaa, Some(&targets.output_view)),
                None => (&targets.output_view, None),
            };
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Pane Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &targets.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(&self.pipelines.background);
            render_pass.set_bind_group(0, &background.bind_group, &[]);
            render_pass.draw(0..3, 0..1);

            for mesh in self.meshes.values() {
                render_pass.set_bind_group(0, &self.scene_bind_group, &[]);
                render_pass.set_bind_group(1, &mesh.material_bind_group, &[]);
                match &mesh.geometry {
                    GpuGeometry::Triangles {
                        vertices,
                        indices,
                        index_count,
                    } => {
                        let pipeline = match mesh.side {
                            FaceSide::Front => &self.pipelines.mesh_front,
                            FaceSide::Double => &self.pipelines.mesh_double,
                        };
                        render_pass.set_pipeline(pipeline);
                        render_pass.set_vertex_buffer(0, vertices.slice(..));
                        render_pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                        render_pass.draw_indexed(0..*index_count, 0, 0..1);
                    }
                    GpuGeometry::Points {
                        instances,
                        instance_count,
                    } => {
                        render_pass.set_pipeline(&self.pipelines.points);
                        render_pass.set_vertex_buffer(0, instances.slice(..));
                        render_pass.draw(0..4, 0..*instance_count);
                    }
                }
            }
        }

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }
}

fn create_pipelines(
    gpu: &GpuContext,
    config: &RenderConfig,
    scene_layout: &wgpu::BindGroupLayout,
    material_layout: &wgpu::BindGroupLayout,
    background_layout: &wgpu::BindGroupLayout,
) -> Pipelines {
    let device = &gpu.device;
    let mesh_shader = gpu.create_shader_module("Mesh Shader", include_str!("shaders/mesh.wgsl"));
    let points_shader = gpu.create_shader_module("Points Shader", include_str!("shaders/points.wgsl"));
    let background_shader = gpu.create_shader_module("Background Shader", include_str!("shaders/background.wgsl"));

    let geometry_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Geometry Pipeline Layout"),
        bind_group_layouts: &[scene_layout, material_layout],
        push_constant_ranges: &[],
    });
    let background_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Background Pipeline Layout"),
        bind_group_layouts: &[background_layout],
        push_constant_ranges: &[],
    });

    let targets = [Some(wgpu::ColorTargetState {
        format: config.output_format,
        blend: Some(wgpu::BlendState::REPLACE),
        write_mask: wgpu::ColorWrites::ALL,
    })];
    let multisample = wgpu::MultisampleState {
        count: config.msaa_samples.max(1),
        mask: !0,
        alpha_to_coverage_enabled: false,
    };
    let depth = |write: bool, compare| {
        Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: write,
            depth_compare: compare,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        })
    };

    let mesh_pipeline = |label: &str, cull_mode: Option<wgpu::Face>| {
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&geometry_layout),
            vertex: wgpu::VertexState {
                module: &mesh_shader,
                entry_point: "vs_main",
                buffers: &[MeshVertex::desc()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &mesh_shader,
                entry_point: "fs_main",
                targets: &targets,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: depth(true, wgpu::CompareFunction::Less),
            multisample,
            multiview: None,
        })
    };

    let points = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Points Pipeline"),
        layout: Some(&geometry_layout),
        vertex: wgpu::VertexState {
            module: &points_shader,
            entry_point: "vs_main",
            buffers: &[PointInstance::desc()],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &points_shader,
            entry_point: "fs_main",
            targets: &targets,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleStrip,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: depth(true, wgpu::CompareFunction::Less),
        multisample,
        multiview: None,
    });

    let background = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Background Pipeline"),
        layout: Some(&background_pipeline_layout),
        vertex: wgpu::VertexState {
            module: &background_shader,
            entry_point: "vs_main",
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &background_shader,
            entry_point: "fs_main",
            targets: &targets,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: depth(false, wgpu::CompareFunction::Always),
        multisample,
        multiview: None,
    });

    Pipelines {
        mesh_front: mesh_pipeline("Mesh Pipeline (front)", Some(wgpu::Face::Back)),
        mesh_double: mesh_pipeline("Mesh Pipeline (double)", None),
        points,
        background,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RenderConfig::default();
        assert_eq!(config.point_size, 3.0);
        assert_eq!(config.msaa_samples, 4);
        assert!(config.output_format.is_srgb());
    }
}
