//! GPU-resident meshes and the object transform.
//!
//! - [`Vertex3d`]: the vertex format shared by every primitive
//! - [`Mesh`]: vertex buffer plus triangle and edge index buffers
//! - [`MeshStore`]: slot storage addressed by [`MeshId`]
//! - [`GpuMeshes`]: the wgpu-backed [`GeometryBackend`]
//! - [`Transform`]: position, rotation and scale for placing the object
//!
//! # Vertex Layout
//!
//! | Attribute | Format    | Offset | Shader Location |
//! |-----------|-----------|--------|-----------------|
//! | position  | Float32x3 | 0      | 0               |
//! | normal    | Float32x3 | 12     | 1               |
//! | uv        | Float32x2 | 24     | 2               |

use crate::geometry::{GeometryBackend, MeshId, RawGeometry};
use crate::gpu::GpuContext;
use glam::{Mat4, Quat, Vec3};
use wgpu::util::DeviceExt;

/// A vertex with position, normal, and texture coordinates.
///
/// `#[repr(C)]` plus [`bytemuck::Pod`] so slices can be uploaded directly.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex3d {
    /// Model-space position.
    pub position: [f32; 3],
    /// Unit surface normal.
    pub normal: [f32; 3],
    /// Texture coordinates, `v = 0` at the bottom of the image.
    pub uv: [f32; 2],
}

impl Vertex3d {
    /// The wgpu vertex buffer layout for this vertex type.
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex3d>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            // position
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            // normal
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x3,
            },
            // uv
            wgpu::VertexAttribute {
                offset: 24,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x2,
            },
        ],
    };

    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// GPU-resident geometry.
///
/// Holds two index buffers over the same vertices: a triangle list for solid
/// drawing and a line list of unique edges for wireframe drawing.
#[derive(Debug)]
pub struct Mesh {
    pub(crate) vertex_buffer: wgpu::Buffer,
    pub(crate) index_buffer: wgpu::Buffer,
    pub(crate) index_count: u32,
    pub(crate) edge_buffer: wgpu::Buffer,
    pub(crate) edge_count: u32,
}

impl Mesh {
    /// Upload `geometry` into fresh GPU buffers.
    pub fn new(gpu: &GpuContext, geometry: &RawGeometry) -> Self {
        let edges = geometry.edges();

        let vertex_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Vertex Buffer"),
                contents: bytemuck::cast_slice(&geometry.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });

        let index_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Index Buffer"),
                contents: bytemuck::cast_slice(&geometry.indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        let edge_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Edge Buffer"),
                contents: bytemuck::cast_slice(&edges),
                usage: wgpu::BufferUsages::INDEX,
            });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: geometry.indices.len() as u32,
            edge_buffer,
            edge_count: edges.len() as u32,
        }
    }

    /// Free the GPU memory now instead of waiting for the last handle to drop.
    pub fn destroy(self) {
        self.vertex_buffer.destroy();
        self.index_buffer.destroy();
        self.edge_buffer.destroy();
    }
}

/// Slot storage for uploaded meshes.
///
/// Released slots are reused, so a scene that keeps swapping shapes does not
/// grow the table.
#[derive(Debug, Default)]
pub struct MeshStore {
    slots: Vec<Option<Mesh>>,
}

impl MeshStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, mesh: Mesh) -> MeshId {
        if let Some(index) = self.slots.iter().position(Option::is_none) {
            self.slots[index] = Some(mesh);
            MeshId(index)
        } else {
            self.slots.push(Some(mesh));
            MeshId(self.slots.len() - 1)
        }
    }

    pub fn get(&self, id: MeshId) -> Option<&Mesh> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub fn remove(&mut self, id: MeshId) -> Option<Mesh> {
        self.slots.get_mut(id.0).and_then(Option::take)
    }

    /// Number of meshes currently alive.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// [`GeometryBackend`] that uploads into a [`MeshStore`] through wgpu.
pub struct GpuMeshes<'a> {
    pub gpu: &'a GpuContext,
    pub store: &'a mut MeshStore,
}

impl GeometryBackend for GpuMeshes<'_> {
    fn upload(&mut self, geometry: &RawGeometry) -> MeshId {
        self.store.insert(Mesh::new(self.gpu, geometry))
    }

    fn release(&mut self, mesh: MeshId) {
        match self.store.remove(mesh) {
            Some(mesh) => mesh.destroy(),
            None => log::warn!("release of unknown mesh {mesh:?}"),
        }
    }
}

/// Position, rotation, and scale of the displayed object.
///
/// ```
/// use shape_lab::{Transform, Vec3};
///
/// let transform = Transform::new()
///     .position(Vec3::new(1.0, 0.0, 0.0))
///     .scale(Vec3::new(2.0, 1.0, 1.0));
/// assert_eq!(transform.matrix().transform_point3(Vec3::ONE), Vec3::new(3.0, 1.0, 1.0));
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// The model matrix, applied in scale, rotate, translate order.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}
