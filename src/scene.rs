//! The scene model: one object, its material, the background and the spin state.
//!
//! Every property has its own setter. Setters are synchronous and only touch
//! plain data, except [`Scene::set_geometry_kind`], which goes through a
//! [`GeometryBackend`] to swap the uploaded geometry.

use std::f32::consts::TAU;

use glam::{Quat, Vec2, Vec3};

use crate::animation::{SpinTween, Tweens};
use crate::color::Color;
use crate::geometry::{GeometryBackend, GeometryKind, MeshId};
use crate::mesh::Transform;
use crate::texture::TextureKey;

/// Clear color behind the object.
pub const BACKGROUND: Color = Color::from_hex(0xf68002);

/// Which triangle windings are drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FaceMode {
    #[default]
    Front,
    Back,
    Double,
}

impl FaceMode {
    pub const ALL: [FaceMode; 3] = [FaceMode::Front, FaceMode::Back, FaceMode::Double];
    pub const LABELS: [&'static str; 3] = ["Front", "Back", "Double"];

    pub fn index(self) -> usize {
        match self {
            FaceMode::Front => 0,
            FaceMode::Back => 1,
            FaceMode::Double => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// The face the rasterizer discards for this mode.
    pub fn cull_mode(self) -> Option<wgpu::Face> {
        match self {
            FaceMode::Front => Some(wgpu::Face::Back),
            FaceMode::Back => Some(wgpu::Face::Front),
            FaceMode::Double => None,
        }
    }
}

/// Surface appearance of the object.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub color: Color,
    pub map: TextureKey,
    pub transparent: bool,
    pub opacity: f32,
    pub side: FaceMode,
    pub wireframe: bool,
    /// Bumped whenever the color map changes so the renderer rebinds it.
    pub version: u64,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            map: TextureKey::Space,
            transparent: false,
            opacity: 1.0,
            side: FaceMode::Front,
            wireframe: false,
            version: 0,
        }
    }
}

impl Material {
    /// Alpha written by the shader; opacity only counts when transparent.
    pub fn effective_opacity(&self) -> f32 {
        if self.transparent { self.opacity } else { 1.0 }
    }
}

#[derive(Clone, Debug)]
pub struct SceneObject {
    pub kind: GeometryKind,
    pub mesh: MeshId,
    pub material: Material,
    pub visible: bool,
    /// x is horizontal, y is vertical; the object stays on the z = 0 plane.
    pub position: Vec2,
    pub scale: Vec3,
    /// Settled rotation about +Y in `[0, 2π)`, excluding in-flight tweens.
    pub rotation_y: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationState {
    pub is_spinning: bool,
    /// Radians added per frame while spinning.
    pub spin_speed: f32,
}

impl Default for AnimationState {
    fn default() -> Self {
        Self {
            is_spinning: false,
            spin_speed: 0.01,
        }
    }
}

pub struct Scene {
    pub object: SceneObject,
    pub background: Color,
    pub animation: AnimationState,
    tweens: Tweens,
}

impl Scene {
    /// A white, textured cube at the origin.
    pub fn new(backend: &mut dyn GeometryBackend) -> Self {
        let kind = GeometryKind::Cube;
        let mesh = backend.upload(&kind.build());
        Self {
            object: SceneObject {
                kind,
                mesh,
                material: Material::default(),
                visible: true,
                position: Vec2::ZERO,
                scale: Vec3::ONE,
                rotation_y: 0.0,
            },
            background: BACKGROUND,
            animation: AnimationState::default(),
            tweens: Tweens::default(),
        }
    }

    pub fn set_position_x(&mut self, x: f32) {
        self.object.position.x = x;
    }

    pub fn set_position_y(&mut self, y: f32) {
        self.object.position.y = y;
    }

    pub fn set_scale_x(&mut self, x: f32) {
        self.object.scale.x = x;
    }

    pub fn set_scale_y(&mut self, y: f32) {
        self.object.scale.y = y;
    }

    pub fn set_scale_z(&mut self, z: f32) {
        self.object.scale.z = z;
    }

    pub fn set_transparent(&mut self, transparent: bool) {
        self.object.material.transparent = transparent;
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        self.object.material.opacity = opacity.clamp(0.0, 1.0);
    }

    pub fn set_face_mode(&mut self, side: FaceMode) {
        self.object.material.side = side;
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.object.visible = visible;
    }

    pub fn set_wireframe(&mut self, wireframe: bool) {
        self.object.material.wireframe = wireframe;
    }

    pub fn set_color(&mut self, color: Color) {
        self.object.material.color = color.with_alpha(1.0);
    }

    pub fn set_spinning(&mut self, spinning: bool) {
        self.animation.is_spinning = spinning;
    }

    pub fn set_spin_speed(&mut self, speed: f32) {
        self.animation.spin_speed = speed;
    }

    /// Point the color map at `key`. The previous texture stays cached.
    pub fn set_texture(&mut self, key: TextureKey) {
        let material = &mut self.object.material;
        material.map = key;
        material.version += 1;
    }

    /// Swap the geometry. The old geometry is released before the new one is uploaded.
    pub fn set_geometry_kind(&mut self, kind: GeometryKind, backend: &mut dyn GeometryBackend) {
        backend.release(self.object.mesh);
        self.object.mesh = backend.upload(&kind.build());
        self.object.kind = kind;
    }

    /// Start a one-shot full turn, independent of auto-spin.
    pub fn start_spin(&mut self, now: f64) {
        self.tweens.push(SpinTween::full_turn(now));
    }

    pub fn active_tweens(&self) -> usize {
        self.tweens.len()
    }

    /// Per-frame update: auto-spin first, then fold finished tweens in.
    ///
    /// The settled angle is kept within one turn so the per-frame step keeps
    /// full `f32` precision however long the session runs.
    pub fn advance_frame(&mut self, now: f64) {
        let mut rotation = self.object.rotation_y;
        if self.animation.is_spinning {
            rotation += self.animation.spin_speed;
        }
        rotation += self.tweens.settle(now);
        self.object.rotation_y = rotation.rem_euclid(TAU);
    }

    /// Rotation to draw at `now`, including in-flight tweens.
    pub fn rotation_y(&self, now: f64) -> f32 {
        self.object.rotation_y + self.tweens.offset(now)
    }

    pub fn transform(&self, now: f64) -> Transform {
        Transform::new()
            .position(self.object.position.extend(0.0))
            .rotation(Quat::from_rotation_y(self.rotation_y(now)))
            .scale(self.object.scale)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashSet;

    use crate::geometry::{GeometryBackend, MeshId, RawGeometry};

    #[derive(Debug, PartialEq)]
    pub enum Op {
        Upload(MeshId, usize),
        Release(MeshId),
    }

    /// Records uploads and releases without a GPU.
    #[derive(Default)]
    pub struct CountingBackend {
        next: usize,
        pub live: HashSet<MeshId>,
        pub ops: Vec<Op>,
        pub peak_live: usize,
    }

    impl GeometryBackend for CountingBackend {
        fn upload(&mut self, geometry: &RawGeometry) -> MeshId {
            let id = MeshId(self.next);
            self.next += 1;
            self.live.insert(id);
            self.peak_live = self.peak_live.max(self.live.len());
            self.ops.push(Op::Upload(id, geometry.vertices.len()));
            id
        }

        fn release(&mut self, mesh: MeshId) {
            assert!(self.live.remove(&mesh), "double release of {mesh:?}");
            self.ops.push(Op::Release(mesh));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{CountingBackend, Op};
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn starts_as_white_textured_cube() {
        let mut backend = CountingBackend::default();
        let scene = Scene::new(&mut backend);
        assert_eq!(scene.object.kind, GeometryKind::Cube);
        assert_eq!(scene.object.material, Material::default());
        assert_eq!(scene.background.to_hex(), 0xf68002);
        assert!(!scene.animation.is_spinning);
        assert_eq!(backend.live.len(), 1);
    }

    #[test]
    fn shape_switches_never_leak_geometry() {
        let mut backend = CountingBackend::default();
        let mut scene = Scene::new(&mut backend);

        for i in 0..50 {
            let kind = GeometryKind::ALL[i % 3];
            scene.set_geometry_kind(kind, &mut backend);
            assert_eq!(backend.live.len(), 1);
            assert!(backend.live.contains(&scene.object.mesh));
        }
        assert_eq!(backend.peak_live, 1);
    }

    #[test]
    fn release_happens_before_upload() {
        let mut backend = CountingBackend::default();
        let mut scene = Scene::new(&mut backend);
        let first = scene.object.mesh;

        scene.set_geometry_kind(GeometryKind::Sphere, &mut backend);

        assert_eq!(backend.ops[1], Op::Release(first));
        assert_eq!(backend.ops[2], Op::Upload(scene.object.mesh, 33 * 33));
    }

    #[test]
    fn shape_change_keeps_material() {
        let mut backend = CountingBackend::default();
        let mut scene = Scene::new(&mut backend);
        scene.set_texture(TextureKey::Earth);
        scene.set_geometry_kind(GeometryKind::Sphere, &mut backend);
        assert_eq!(scene.object.kind, GeometryKind::Sphere);
        assert_eq!(scene.object.material.map, TextureKey::Earth);
    }

    #[test]
    fn texture_change_bumps_version() {
        let mut backend = CountingBackend::default();
        let mut scene = Scene::new(&mut backend);
        let before = scene.object.material.version;
        scene.set_texture(TextureKey::Normal);
        assert_eq!(scene.object.material.version, before + 1);
    }

    #[test]
    fn face_modes_map_to_culling() {
        assert_eq!(FaceMode::Front.cull_mode(), Some(wgpu::Face::Back));
        assert_eq!(FaceMode::Back.cull_mode(), Some(wgpu::Face::Front));
        assert_eq!(FaceMode::Double.cull_mode(), None);
    }

    #[test]
    fn opacity_only_counts_when_transparent() {
        let mut backend = CountingBackend::default();
        let mut scene = Scene::new(&mut backend);
        scene.set_opacity(0.3);
        assert_eq!(scene.object.material.effective_opacity(), 1.0);
        scene.set_transparent(true);
        assert_relative_eq!(scene.object.material.effective_opacity(), 0.3);
    }

    #[test]
    fn auto_spin_adds_speed_per_frame() {
        let mut backend = CountingBackend::default();
        let mut scene = Scene::new(&mut backend);
        scene.set_spinning(true);
        scene.set_spin_speed(0.05);

        for frame in 0..120 {
            // Frame timing is irrelevant to auto-spin.
            scene.advance_frame(frame as f64 * 0.123);
        }
        assert_relative_eq!(scene.object.rotation_y, 120.0 * 0.05, epsilon = 1e-4);
    }

    #[test]
    fn idle_scene_does_not_rotate() {
        let mut backend = CountingBackend::default();
        let mut scene = Scene::new(&mut backend);
        for frame in 0..10 {
            scene.advance_frame(frame as f64);
        }
        assert_eq!(scene.object.rotation_y, 0.0);
    }

    #[test]
    fn spin_action_turns_exactly_once_over_one_second() {
        let mut backend = CountingBackend::default();
        let mut scene = Scene::new(&mut backend);
        scene.start_spin(10.0);

        scene.advance_frame(10.5);
        assert!(scene.rotation_y(10.5) > 0.0 && scene.rotation_y(10.5) < TAU);
        assert_eq!(scene.object.rotation_y, 0.0);

        // A whole turn lands back on the starting angle.
        scene.advance_frame(11.0);
        assert_relative_eq!(scene.object.rotation_y, 0.0, epsilon = 1e-5);
        assert_relative_eq!(scene.rotation_y(11.0), 0.0, epsilon = 1e-5);
        assert_eq!(scene.active_tweens(), 0);
    }

    #[test]
    fn spin_action_stacks_with_auto_spin() {
        let mut backend = CountingBackend::default();
        let mut scene = Scene::new(&mut backend);
        scene.set_spinning(true);
        scene.start_spin(0.0);

        for frame in 1..=10 {
            scene.advance_frame(frame as f64 * 0.1);
        }
        assert_relative_eq!(scene.object.rotation_y, 10.0 * 0.01, epsilon = 1e-5);
    }

    #[test]
    fn auto_spin_step_holds_after_a_long_session() {
        let mut backend = CountingBackend::default();
        let mut scene = Scene::new(&mut backend);
        scene.set_spinning(true);
        scene.set_spin_speed(0.1);
        // Roughly five hours of spinning at 60 fps.
        scene.object.rotation_y = 108_000.0;
        scene.advance_frame(18_000.0);
        assert!((0.0..TAU).contains(&scene.object.rotation_y));

        let mut gained = 0.0;
        for frame in 1..=600 {
            let before = scene.object.rotation_y;
            scene.advance_frame(18_000.0 + frame as f64 / 60.0);
            let step = (scene.object.rotation_y - before).rem_euclid(TAU);
            assert_relative_eq!(step, 0.1, epsilon = 1e-5);
            gained += step;
        }
        assert_relative_eq!(gained, 60.0, epsilon = 1e-2);
        assert!((0.0..TAU).contains(&scene.object.rotation_y));
    }

    #[test]
    fn transform_uses_position_scale_and_rotation() {
        let mut backend = CountingBackend::default();
        let mut scene = Scene::new(&mut backend);
        scene.set_position_x(1.0);
        scene.set_position_y(-2.0);
        scene.set_scale_z(4.0);

        let t = scene.transform(0.0);
        assert_eq!(t.position, Vec3::new(1.0, -2.0, 0.0));
        assert_eq!(t.scale, Vec3::new(1.0, 1.0, 4.0));
        assert_eq!(t.rotation, Quat::from_rotation_y(0.0));
    }
}
