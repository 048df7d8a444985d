use crate::assets::{Assets, FontId};
use crate::color::{Color, Rect};
use crate::gpu::GpuContext;

/// Vertex for 2D quad/text rendering.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex2d {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex2d {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex2d>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            // position
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x2,
            },
            // uv
            wgpu::VertexAttribute {
                offset: 8,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x2,
            },
            // color
            wgpu::VertexAttribute {
                offset: 16,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x4,
            },
        ],
    };
}

/// Uniforms for 2D rendering.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct Draw2dUniforms {
    resolution: [f32; 2],
    _padding: [f32; 2],
}

const MAX_VERTICES: usize = 16384;

/// A contiguous range of vertices drawn with one pipeline.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Run {
    /// `None` for flat-colored quads, otherwise the font atlas to sample.
    font: Option<FontId>,
    start: usize,
    len: usize,
}

/// Immediate-mode 2D drawing for quads and text.
///
/// Draw calls are recorded into one vertex list and rendered in submission
/// order, so later calls paint over earlier ones. Coordinates are surface
/// pixels with the origin at the top-left.
pub struct Draw2d {
    colored_pipeline: wgpu::RenderPipeline,
    textured_pipeline: wgpu::RenderPipeline,

    vertex_buffer: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    texture_bind_group_layout: wgpu::BindGroupLayout,

    // Per-font bind groups (cached)
    font_bind_groups: Vec<Option<wgpu::BindGroup>>,

    vertices: Vec<Vertex2d>,
    runs: Vec<Run>,
    /// Convert sRGB colors to linear before writing, for sRGB targets.
    linearize: bool,
}

impl Draw2d {
    pub fn new(gpu: &GpuContext) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Draw2d Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/draw2d.wgsl").into()),
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw2d Uniforms"),
            size: std::mem::size_of::<Draw2dUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // Uniform bind group layout (group 0)
        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Draw2d Uniform Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Draw2d Uniform Bind Group"),
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        // Texture bind group layout (group 1)
        let texture_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Draw2d Texture Layout"),
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

        let colored_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Draw2d Colored Pipeline Layout"),
                bind_group_layouts: &[&uniform_bind_group_layout],
                push_constant_ranges: &[],
            });

        let textured_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Draw2d Textured Pipeline Layout"),
                bind_group_layouts: &[&uniform_bind_group_layout, &texture_bind_group_layout],
                push_constant_ranges: &[],
            });

        let colored_pipeline = create_pipeline(
            gpu,
            &shader,
            &colored_pipeline_layout,
            "fs_colored",
            "Draw2d Colored Pipeline",
        );
        let textured_pipeline = create_pipeline(
            gpu,
            &shader,
            &textured_pipeline_layout,
            "fs_textured",
            "Draw2d Textured Pipeline",
        );

        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw2d Vertex Buffer"),
            size: (MAX_VERTICES * std::mem::size_of::<Vertex2d>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            colored_pipeline,
            textured_pipeline,
            vertex_buffer,
            uniform_buffer,
            uniform_bind_group,
            texture_bind_group_layout,
            font_bind_groups: Vec::new(),
            vertices: Vec::with_capacity(4096),
            runs: Vec::new(),
            linearize: gpu.is_srgb(),
        }
    }

    /// Clear all draw calls for the new frame.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.runs.clear();
    }

    fn vertex_color(&self, color: Color) -> [f32; 4] {
        if self.linearize {
            color.to_linear().to_array()
        } else {
            color.to_array()
        }
    }

    /// Append a quad to the run for `font`, starting a new run if the last one differs.
    fn push_quad(&mut self, font: Option<FontId>, rect: Rect, uv: [f32; 4], color: [f32; 4]) {
        match self.runs.last_mut() {
            Some(run) if run.font == font => run.len += 6,
            _ => self.runs.push(Run {
                font,
                start: self.vertices.len(),
                len: 6,
            }),
        }

        let [u0, v0, u1, v1] = uv;
        let (x0, y0, x1, y1) = (rect.x, rect.y, rect.right(), rect.bottom());
        self.vertices.extend_from_slice(&[
            Vertex2d {
                position: [x0, y0],
                uv: [u0, v0],
                color,
            },
            Vertex2d {
                position: [x1, y0],
                uv: [u1, v0],
                color,
            },
            Vertex2d {
                position: [x0, y1],
                uv: [u0, v1],
                color,
            },
            Vertex2d {
                position: [x1, y0],
                uv: [u1, v0],
                color,
            },
            Vertex2d {
                position: [x1, y1],
                uv: [u1, v1],
                color,
            },
            Vertex2d {
                position: [x0, y1],
                uv: [u0, v1],
                color,
            },
        ]);
    }

    pub fn fill(&mut self, rect: Rect, color: Color) {
        if rect.width <= 0.0 || rect.height <= 0.0 {
            return;
        }
        let c = self.vertex_color(color);
        self.push_quad(None, rect, [0.0; 4], c);
    }

    /// A rectangle outline `thickness` pixels wide, drawn inside `rect`.
    pub fn outline(&mut self, rect: Rect, thickness: f32, color: Color) {
        let t = thickness.min(rect.width / 2.0).min(rect.height / 2.0);
        self.fill(Rect::new(rect.x, rect.y, rect.width, t), color);
        self.fill(Rect::new(rect.x, rect.bottom() - t, rect.width, t), color);
        self.fill(Rect::new(rect.x, rect.y + t, t, rect.height - 2.0 * t), color);
        self.fill(Rect::new(rect.right() - t, rect.y + t, t, rect.height - 2.0 * t), color);
    }

    /// Draw text with its line top at `y`.
    pub fn text(
        &mut self,
        assets: &Assets,
        font_id: FontId,
        x: f32,
        y: f32,
        text: &str,
        color: Color,
    ) {
        let Some(font) = assets.font(font_id) else {
            return;
        };

        let c = self.vertex_color(color);
        let mut cursor_x = x;
        let baseline_y = (y + font.ascent()).round();

        for ch in text.chars() {
            let Some(glyph) = font.glyph(ch) else {
                cursor_x += font.size() * 0.5; // Fallback advance for missing glyphs
                continue;
            };

            if glyph.width > 0 && glyph.height > 0 {
                let gx = (cursor_x + glyph.offset_x).round();
                // fontdue's ymin is the distance from the baseline to the bottom of the glyph
                let gy = baseline_y - glyph.offset_y - glyph.height as f32;
                let rect = Rect::new(gx, gy, glyph.width as f32, glyph.height as f32);
                let uv = [
                    glyph.uv[0],
                    glyph.uv[1],
                    glyph.uv[0] + glyph.uv[2],
                    glyph.uv[1] + glyph.uv[3],
                ];
                self.push_quad(Some(font_id), rect, uv, c);
            }

            cursor_x += glyph.advance;
        }
    }

    /// Ensure we have bind groups for all loaded fonts.
    pub fn update_font_bind_groups(&mut self, gpu: &GpuContext, assets: &Assets) {
        if self.font_bind_groups.len() < assets.fonts.len() {
            self.font_bind_groups.resize_with(assets.fonts.len(), || None);
        }

        for (i, font) in assets.fonts.iter().enumerate() {
            if self.font_bind_groups[i].is_none() {
                let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Font Bind Group"),
                    layout: &self.texture_bind_group_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(&font.view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::Sampler(&font.sampler),
                        },
                    ],
                });
                self.font_bind_groups[i] = Some(bind_group);
            }
        }
    }

    /// Drop cached font bind groups, after the fonts they point to were replaced.
    pub fn forget_fonts(&mut self) {
        self.font_bind_groups.clear();
    }

    /// Render all recorded draw calls in order.
    pub fn render(&self, gpu: &GpuContext, render_pass: &mut wgpu::RenderPass) {
        if self.vertices.is_empty() {
            return;
        }

        let uniforms = Draw2dUniforms {
            resolution: [gpu.width() as f32, gpu.height() as f32],
            _padding: [0.0, 0.0],
        };
        gpu.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        let count = self.vertices.len().min(MAX_VERTICES);
        if count < self.vertices.len() {
            log::warn!(
                "2d overlay truncated: {} vertices over the {MAX_VERTICES} limit",
                self.vertices.len() - count
            );
        }
        gpu.queue.write_buffer(
            &self.vertex_buffer,
            0,
            bytemuck::cast_slice(&self.vertices[..count]),
        );

        render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));

        for run in &self.runs {
            let end = (run.start + run.len).min(count);
            if run.start >= end {
                break;
            }

            match run.font {
                None => render_pass.set_pipeline(&self.colored_pipeline),
                Some(font_id) => {
                    let Some(bind_group) = self
                        .font_bind_groups
                        .get(font_id.0)
                        .and_then(|bg| bg.as_ref())
                    else {
                        continue;
                    };
                    render_pass.set_pipeline(&self.textured_pipeline);
                    render_pass.set_bind_group(1, bind_group, &[]);
                }
            }

            render_pass.draw(run.start as u32..end as u32, 0..1);
        }
    }
}

fn create_pipeline(
    gpu: &GpuContext,
    shader: &wgpu::ShaderModule,
    layout: &wgpu::PipelineLayout,
    fragment_entry: &str,
    label: &str,
) -> wgpu::RenderPipeline {
    // Straight alpha blending
    let blend_state = wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::SrcAlpha,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
    };

    gpu.device
        .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some("vs"),
                buffers: &[Vertex2d::LAYOUT],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some(fragment_entry),
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.config.format,
                    blend: Some(blend_state),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
}
