//! Scene rendering.
//!
//! One frame is two render passes into the surface texture:
//!
//! 1. the mesh pass clears to the background color and draws the object
//!    with depth testing;
//! 2. the overlay pass draws the recorded [`Draw2d`] calls on top, without
//!    depth.
//!
//! Bind groups:
//! - **Group 0**: camera uniforms (view-projection)
//! - **Group 1**: model uniforms (model matrix, material color and opacity)
//! - **Group 2**: the material's color map and sampler
//!
//! Pipelines differ by cull mode, blending and topology, so they are built
//! lazily per [`PipelineKey`] and cached.

use std::collections::HashMap;

use crate::camera::Camera;
use crate::draw2d::Draw2d;
use crate::gpu::GpuContext;
use crate::loader::TextureLoader;
use crate::mesh::{MeshStore, Vertex3d};
use crate::scene::{FaceMode, Material, Scene};
use crate::texture::{Texture, TextureKey};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to acquire surface texture: {0}")]
    Surface(#[from] wgpu::SurfaceError),
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct CameraUniforms {
    view_proj: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct ModelUniforms {
    model: [[f32; 4]; 4],
    color: [f32; 4],
}

/// The material state a pipeline is specialised for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub side: FaceMode,
    pub transparent: bool,
    pub wireframe: bool,
}

impl PipelineKey {
    pub fn for_material(material: &Material) -> Self {
        Self {
            side: material.side,
            transparent: material.transparent,
            wireframe: material.wireframe,
        }
    }

    pub fn topology(&self) -> wgpu::PrimitiveTopology {
        if self.wireframe {
            wgpu::PrimitiveTopology::LineList
        } else {
            wgpu::PrimitiveTopology::TriangleList
        }
    }

    /// Lines have no facing, so wireframes never cull.
    pub fn cull_mode(&self) -> Option<wgpu::Face> {
        if self.wireframe {
            None
        } else {
            self.side.cull_mode()
        }
    }

    pub fn blend(&self) -> wgpu::BlendState {
        if self.transparent {
            wgpu::BlendState::ALPHA_BLENDING
        } else {
            wgpu::BlendState::REPLACE
        }
    }
}

/// Which texture the material bind group currently points at.
struct MaterialBinding {
    key: TextureKey,
    version: u64,
    /// False while bound to the white fallback.
    ready: bool,
    bind_group: wgpu::BindGroup,
}

/// Everything one frame needs to read.
pub struct FrameInput<'a> {
    pub scene: &'a Scene,
    pub camera: &'a Camera,
    pub aspect: f32,
    pub meshes: &'a MeshStore,
    pub textures: &'a TextureLoader<Texture>,
    pub overlay: &'a Draw2d,
    /// Seconds since startup.
    pub now: f64,
}

pub struct Renderer {
    shader: wgpu::ShaderModule,
    pipeline_layout: wgpu::PipelineLayout,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    model_buffer: wgpu::Buffer,
    model_bind_group: wgpu::BindGroup,
    texture_bind_group_layout: wgpu::BindGroupLayout,
    white: Texture,
    material_binding: Option<MaterialBinding>,
    depth_view: wgpu::TextureView,
    depth_size: (u32, u32),
}

impl Renderer {
    pub fn new(gpu: &GpuContext) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Mesh Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/mesh.wgsl").into()),
        });

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Camera Uniforms"),
            size: std::mem::size_of::<CameraUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let camera_bind_group_layout = uniform_layout(gpu, "Camera Bind Group Layout");
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera Bind Group"),
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let model_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Model Uniforms"),
            size: std::mem::size_of::<ModelUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let model_bind_group_layout = uniform_layout(gpu, "Model Bind Group Layout");
        let model_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Model Bind Group"),
            layout: &model_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: model_buffer.as_entire_binding(),
            }],
        });

        let texture_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Texture Bind Group Layout"),
                entries: &[
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
            });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh Pipeline Layout"),
            bind_group_layouts: &[
                &camera_bind_group_layout,
                &model_bind_group_layout,
                &texture_bind_group_layout,
            ],
            push_constant_ranges: &[],
        });

        let depth_view = create_depth_view(gpu);

        Self {
            shader,
            pipeline_layout,
            pipelines: HashMap::new(),
            camera_buffer,
            camera_bind_group,
            model_buffer,
            model_bind_group,
            texture_bind_group_layout,
            white: Texture::white(gpu),
            material_binding: None,
            depth_view,
            depth_size: (gpu.width(), gpu.height()),
        }
    }

    /// Ensures the depth buffer matches the current surface size.
    pub fn ensure_depth_size(&mut self, gpu: &GpuContext) {
        if self.depth_size != (gpu.width(), gpu.height()) {
            self.depth_view = create_depth_view(gpu);
            self.depth_size = (gpu.width(), gpu.height());
        }
    }

    fn ensure_pipeline(&mut self, gpu: &GpuContext, key: PipelineKey) {
        if self.pipelines.contains_key(&key) {
            return;
        }
        log::debug!("building mesh pipeline for {key:?}");

        let pipeline = gpu
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Mesh Pipeline"),
                layout: Some(&self.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &self.shader,
                    entry_point: Some("vs"),
                    buffers: &[Vertex3d::LAYOUT],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &self.shader,
                    entry_point: Some("fs"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: gpu.config.format,
                        blend: Some(key.blend()),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: key.topology(),
                    cull_mode: key.cull_mode(),
                    front_face: wgpu::FrontFace::Ccw,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });

        self.pipelines.insert(key, pipeline);
    }

    fn create_texture_bind_group(&self, gpu: &GpuContext, texture: &Texture) -> wgpu::BindGroup {
        gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Mesh Texture Bind Group"),
            layout: &self.texture_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&texture.sampler),
                },
            ],
        })
    }

    /// Rebind the color map when the material changed or its texture finished loading.
    fn ensure_material_binding(
        &mut self,
        gpu: &GpuContext,
        material: &Material,
        textures: &TextureLoader<Texture>,
    ) {
        let texture = textures.get(material.map);
        let ready = texture.is_some();

        let current = self.material_binding.as_ref().is_some_and(|b| {
            b.key == material.map && b.version == material.version && b.ready == ready
        });
        if current {
            return;
        }

        let bind_group = self.create_texture_bind_group(gpu, texture.unwrap_or(&self.white));
        self.material_binding = Some(MaterialBinding {
            key: material.map,
            version: material.version,
            ready,
            bind_group,
        });
    }

    /// Draw one frame: the scene, then the overlay, then present.
    ///
    /// A lost or outdated surface is reconfigured and the frame skipped; any
    /// other surface error is returned.
    pub fn render(&mut self, gpu: &GpuContext, frame: FrameInput<'_>) -> Result<(), RenderError> {
        self.ensure_depth_size(gpu);

        let output = match gpu.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("surface lost or outdated, reconfiguring");
                gpu.reconfigure();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("surface acquire timed out, skipping frame");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let scene = frame.scene;
        let material = &scene.object.material;
        let key = PipelineKey::for_material(material);
        self.ensure_pipeline(gpu, key);
        self.ensure_material_binding(gpu, material, frame.textures);

        let camera_uniforms = CameraUniforms {
            view_proj: frame.camera.view_projection(frame.aspect).to_cols_array_2d(),
        };
        gpu.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::cast_slice(&[camera_uniforms]));

        let color = if gpu.is_srgb() {
            material.color.to_linear()
        } else {
            material.color
        };
        let model_uniforms = ModelUniforms {
            model: scene.transform(frame.now).matrix().to_cols_array_2d(),
            color: color.with_alpha(material.effective_opacity()).to_array(),
        };
        gpu.queue
            .write_buffer(&self.model_buffer, 0, bytemuck::cast_slice(&[model_uniforms]));

        let background = if gpu.is_srgb() {
            scene.background.to_linear()
        } else {
            scene.background
        };

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Mesh Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: background.r as f64,
                            g: background.g as f64,
                            b: background.b as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let mesh = frame.meshes.get(scene.object.mesh);
            if let (true, Some(mesh), Some(pipeline), Some(binding)) = (
                scene.object.visible,
                mesh,
                self.pipelines.get(&key),
                self.material_binding.as_ref(),
            ) {
                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, &self.camera_bind_group, &[]);
                pass.set_bind_group(1, &self.model_bind_group, &[]);
                pass.set_bind_group(2, &binding.bind_group, &[]);
                pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                if key.wireframe {
                    pass.set_index_buffer(mesh.edge_buffer.slice(..), wgpu::IndexFormat::Uint32);
                    pass.draw_indexed(0..mesh.edge_count, 0, 0..1);
                } else {
                    pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                    pass.draw_indexed(0..mesh.index_count, 0, 0..1);
                }
            }
        }

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Overlay Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            frame.overlay.render(gpu, &mut pass);
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

fn uniform_layout(gpu: &GpuContext, label: &str) -> wgpu::BindGroupLayout {
    gpu.device
        .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(label),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        })
}

fn create_depth_view(gpu: &GpuContext) -> wgpu::TextureView {
    let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: gpu.width(),
            height: gpu.height(),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}
