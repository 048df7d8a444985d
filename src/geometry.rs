//! CPU-side tessellation for the three primitives the viewer can show.
//!
//! Geometry is generated as [`RawGeometry`] (vertices + triangle indices) and
//! handed to a [`GeometryBackend`], which owns the GPU copy. Keeping the two
//! apart lets the scene swap shapes without touching wgpu directly, and lets
//! tests count uploads and releases without a device.
//!
//! | Kind   | Parameters                                         |
//! |--------|----------------------------------------------------|
//! | Cube   | 1 × 1 × 1, 2 × 2 × 2 segments per face             |
//! | Sphere | radius 1, 32 width × 32 height segments            |
//! | Torus  | radius 1, tube 0.4, 16 radial × 100 tubular        |
//!
//! All generators emit counter-clockwise front faces, outward normals and
//! UVs with `v = 0` at the bottom edge of the image.

use std::collections::HashSet;
use std::f32::consts::{PI, TAU};

use glam::Vec3;

use crate::mesh::Vertex3d;

/// Type-safe handle to geometry owned by a [`GeometryBackend`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshId(pub(crate) usize);

/// Owner of uploaded geometry.
///
/// `release` must free the resource immediately; the scene relies on this to
/// guarantee that at most one geometry is alive at a time.
pub trait GeometryBackend {
    /// Upload geometry and return a handle to it.
    fn upload(&mut self, geometry: &RawGeometry) -> MeshId;
    /// Free a previously uploaded geometry.
    fn release(&mut self, mesh: MeshId);
}

/// The primitive shapes selectable from the control panel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    #[default]
    Cube,
    Sphere,
    Torus,
}

impl GeometryKind {
    pub const ALL: [GeometryKind; 3] = [
        GeometryKind::Cube,
        GeometryKind::Sphere,
        GeometryKind::Torus,
    ];

    /// Labels shown in the shape dropdown, in [`GeometryKind::ALL`] order.
    pub const LABELS: [&'static str; 3] = ["Cube", "Sphere", "Torus"];

    pub fn label(self) -> &'static str {
        Self::LABELS[self.index()]
    }

    pub fn index(self) -> usize {
        match self {
            GeometryKind::Cube => 0,
            GeometryKind::Sphere => 1,
            GeometryKind::Torus => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Tessellate this shape with its fixed parameters.
    pub fn build(self) -> RawGeometry {
        match self {
            GeometryKind::Cube => RawGeometry::cuboid(Vec3::ONE, [2, 2, 2]),
            GeometryKind::Sphere => RawGeometry::sphere(1.0, 32, 32),
            GeometryKind::Torus => RawGeometry::torus(1.0, 0.4, 16, 100),
        }
    }
}

/// Geometry data before GPU upload.
#[derive(Clone, Debug, Default)]
pub struct RawGeometry {
    /// Vertex positions, normals, and UVs.
    pub vertices: Vec<Vertex3d>,
    /// Triangle list indices.
    pub indices: Vec<u32>,
}

impl RawGeometry {
    pub fn new(vertices: Vec<Vertex3d>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Axis-aligned bounds as `(min, max)`.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);

        for v in &self.vertices {
            let p = Vec3::from(v.position);
            min = min.min(p);
            max = max.max(p);
        }

        (min, max)
    }

    /// Unique triangle edges as a line-list index buffer.
    ///
    /// Used for wireframe drawing: every edge of every triangle is emitted
    /// once, in the order it is first seen.
    pub fn edges(&self) -> Vec<u32> {
        let mut seen = HashSet::with_capacity(self.indices.len());
        let mut lines = Vec::with_capacity(self.indices.len() * 2);

        for tri in self.indices.chunks_exact(3) {
            for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
                if seen.insert((a.min(b), a.max(b))) {
                    lines.push(a);
                    lines.push(b);
                }
            }
        }

        lines
    }

    /// A box centered on the origin, each face subdivided into a grid.
    ///
    /// `segments` is the number of subdivisions along x, y and z.
    pub fn cuboid(size: Vec3, segments: [u32; 3]) -> Self {
        let mut geometry = Self::default();
        let [sx, sy, sz] = segments.map(|s| s.max(1));

        // (u axis, v axis, w axis, u dir, v dir, plane width, plane height, depth, grid x, grid y)
        #[rustfmt::skip]
        let faces = [
            ([2, 1, 0], -1.0, -1.0, size.z, size.y,  size.x, sz, sy), // +x
            ([2, 1, 0],  1.0, -1.0, size.z, size.y, -size.x, sz, sy), // -x
            ([0, 2, 1],  1.0,  1.0, size.x, size.z,  size.y, sx, sz), // +y
            ([0, 2, 1],  1.0, -1.0, size.x, size.z, -size.y, sx, sz), // -y
            ([0, 1, 2],  1.0, -1.0, size.x, size.y,  size.z, sx, sy), // +z
            ([0, 1, 2], -1.0, -1.0, size.x, size.y, -size.z, sx, sy), // -z
        ];

        for (axes, udir, vdir, width, height, depth, grid_x, grid_y) in faces {
            geometry.push_plane(axes, udir, vdir, width, height, depth, grid_x, grid_y);
        }

        geometry
    }

    #[allow(clippy::too_many_arguments)]
    fn push_plane(
        &mut self,
        axes: [usize; 3],
        udir: f32,
        vdir: f32,
        width: f32,
        height: f32,
        depth: f32,
        grid_x: u32,
        grid_y: u32,
    ) {
        let [u, v, w] = axes;
        let start = self.vertices.len() as u32;
        let seg_w = width / grid_x as f32;
        let seg_h = height / grid_y as f32;
        let facing = if depth > 0.0 { 1.0 } else { -1.0 };

        for iy in 0..=grid_y {
            let y = iy as f32 * seg_h - height / 2.0;
            for ix in 0..=grid_x {
                let x = ix as f32 * seg_w - width / 2.0;

                let mut position = [0.0; 3];
                position[u] = x * udir;
                position[v] = y * vdir;
                position[w] = depth / 2.0;

                let mut normal = [0.0; 3];
                normal[w] = facing;

                let uv = [ix as f32 / grid_x as f32, 1.0 - iy as f32 / grid_y as f32];
                self.vertices.push(Vertex3d::new(position, normal, uv));
            }
        }

        let row = grid_x + 1;
        for iy in 0..grid_y {
            for ix in 0..grid_x {
                let a = start + ix + row * iy;
                let b = start + ix + row * (iy + 1);
                let c = start + ix + 1 + row * (iy + 1);
                let d = start + ix + 1 + row * iy;
                self.indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }
    }

    /// A latitude/longitude sphere centered on the origin.
    pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        let ws = width_segments.max(3);
        let hs = height_segments.max(2);
        let mut vertices = Vec::with_capacity(((ws + 1) * (hs + 1)) as usize);
        let mut indices = Vec::new();

        for iy in 0..=hs {
            let v = iy as f32 / hs as f32;
            // Pole vertices sample the middle of their segment to avoid a pinched seam.
            let u_offset = if iy == 0 {
                0.5 / ws as f32
            } else if iy == hs {
                -0.5 / ws as f32
            } else {
                0.0
            };

            for ix in 0..=ws {
                let u = ix as f32 / ws as f32;
                let (phi, theta) = (u * TAU, v * PI);
                let position = Vec3::new(
                    -radius * phi.cos() * theta.sin(),
                    radius * theta.cos(),
                    radius * phi.sin() * theta.sin(),
                );
                let normal = position.normalize_or_zero();
                vertices.push(Vertex3d::new(
                    position.into(),
                    normal.into(),
                    [u + u_offset, 1.0 - v],
                ));
            }
        }

        let row = ws + 1;
        for iy in 0..hs {
            for ix in 0..ws {
                let a = iy * row + ix + 1;
                let b = iy * row + ix;
                let c = (iy + 1) * row + ix;
                let d = (iy + 1) * row + ix + 1;

                if iy != 0 {
                    indices.extend_from_slice(&[a, b, d]);
                }
                if iy != hs - 1 {
                    indices.extend_from_slice(&[b, c, d]);
                }
            }
        }

        Self::new(vertices, indices)
    }

    /// A torus lying in the XY plane, centered on the origin.
    pub fn torus(radius: f32, tube: f32, radial_segments: u32, tubular_segments: u32) -> Self {
        let radial = radial_segments.max(3);
        let tubular = tubular_segments.max(3);
        let mut vertices = Vec::with_capacity(((radial + 1) * (tubular + 1)) as usize);
        let mut indices = Vec::with_capacity((radial * tubular * 6) as usize);

        for j in 0..=radial {
            for i in 0..=tubular {
                let u = i as f32 / tubular as f32 * TAU;
                let v = j as f32 / radial as f32 * TAU;

                let position = Vec3::new(
                    (radius + tube * v.cos()) * u.cos(),
                    (radius + tube * v.cos()) * u.sin(),
                    tube * v.sin(),
                );
                let center = Vec3::new(radius * u.cos(), radius * u.sin(), 0.0);
                let normal = (position - center).normalize_or_zero();

                vertices.push(Vertex3d::new(
                    position.into(),
                    normal.into(),
                    [i as f32 / tubular as f32, j as f32 / radial as f32],
                ));
            }
        }

        let row = tubular + 1;
        for j in 1..=radial {
            for i in 1..=tubular {
                let a = row * j + i - 1;
                let b = row * (j - 1) + i - 1;
                let c = row * (j - 1) + i;
                let d = row * j + i;
                indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }

        Self::new(vertices, indices)
    }
}
