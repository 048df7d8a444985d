use std::f32::consts::{PI, TAU};

use glam::{Vec2, Vec3};
use winit::event::MouseButton;

use crate::camera::Camera;
use crate::input::Input;

/// Keeps the polar angle away from the poles so `look_at` stays defined.
const POLAR_EPSILON: f32 = 1e-6;

/// Spherical coordinates around the target, y up.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Spherical {
    radius: f32,
    /// Azimuth, measured from +z towards +x.
    theta: f32,
    /// Polar angle from +y.
    phi: f32,
}

impl Spherical {
    fn from_offset(offset: Vec3) -> Self {
        let radius = offset.length();
        if radius == 0.0 {
            return Self {
                radius,
                theta: 0.0,
                phi: 0.0,
            };
        }
        Self {
            radius,
            theta: offset.x.atan2(offset.z),
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    fn to_offset(self) -> Vec3 {
        let sin_phi = self.phi.sin();
        Vec3::new(
            self.radius * sin_phi * self.theta.sin(),
            self.radius * self.phi.cos(),
            self.radius * sin_phi * self.theta.cos(),
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Drag {
    Rotate,
    Pan,
}

/// Damped orbit controls around a target point.
///
/// Pointer input only accumulates deltas; [`OrbitCamera::update`] applies a
/// `damping` fraction of them each call and decays the rest, so motion
/// continues smoothly after the pointer stops and the camera never moves
/// unless `update` runs.
///
/// | Input                 | Effect |
/// |-----------------------|--------|
/// | left drag / 1 finger  | orbit  |
/// | right drag            | pan    |
/// | wheel / pinch         | dolly  |
/// | 2 fingers             | pan    |
#[derive(Clone, Debug)]
pub struct OrbitCamera {
    pub target: Vec3,
    spherical: Spherical,
    /// Vertical field of view in radians.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    /// Fraction of the pending motion applied per update.
    pub damping: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pending_rotation: Vec2,
    pending_pan: Vec3,
    pending_scale: f32,
    drag: Option<Drag>,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        let camera = Camera::default();
        Self {
            target: camera.target,
            spherical: Spherical::from_offset(camera.position - camera.target),
            fov: camera.fov,
            near: camera.near,
            far: camera.far,
            damping: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            pending_rotation: Vec2::ZERO,
            pending_pan: Vec3::ZERO,
            pending_scale: 1.0,
            drag: None,
        }
    }
}

impl OrbitCamera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current eye position.
    pub fn position(&self) -> Vec3 {
        self.target + self.spherical.to_offset()
    }

    pub fn distance(&self) -> f32 {
        self.spherical.radius
    }

    pub fn azimuth(&self) -> f32 {
        self.spherical.theta
    }

    pub fn polar(&self) -> f32 {
        self.spherical.phi
    }

    /// Whether a drag that began on the viewport is in progress.
    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Orbit by a pointer movement of `delta` pixels on a viewport `height` pixels tall.
    pub fn rotate(&mut self, delta: Vec2, height: f32) {
        if height <= 0.0 {
            return;
        }
        self.pending_rotation += TAU * delta * self.rotate_speed / height;
    }

    /// Pan so the target follows a pointer movement of `delta` pixels.
    pub fn pan(&mut self, delta: Vec2, height: f32) {
        if height <= 0.0 {
            return;
        }
        let offset = self.spherical.to_offset();
        let visible_half_height = offset.length() * (self.fov / 2.0).tan();
        let forward = (-offset).normalize_or(Vec3::NEG_Z);
        let right = forward.cross(Vec3::Y).normalize_or(Vec3::X);
        let up = right.cross(forward);

        let scale = 2.0 * visible_half_height / height * self.pan_speed;
        self.pending_pan += -right * delta.x * scale + up * delta.y * scale;
    }

    /// Move toward (`steps > 0`) or away from the target by wheel steps.
    pub fn dolly(&mut self, steps: f32) {
        self.pending_scale *= 0.95f32.powf(self.zoom_speed * steps);
    }

    /// Scale the distance directly, for pinch gestures.
    pub fn dolly_by(&mut self, ratio: f32) {
        if ratio.is_finite() && ratio > 0.0 {
            self.pending_scale *= ratio.powf(self.zoom_speed);
        }
    }

    /// Feed this frame's input in and advance the camera one step.
    ///
    /// `pointer_captured` is true when the panel owns the pointer this frame;
    /// new drags and wheel input are then ignored. Must be called once per frame.
    pub fn update(&mut self, input: &Input, height: f32, pointer_captured: bool) {
        self.handle_input(input, height, pointer_captured);
        self.step();
    }

    fn handle_input(&mut self, input: &Input, height: f32, pointer_captured: bool) {
        if self.drag.is_none() && !pointer_captured {
            if input.mouse_pressed(MouseButton::Left) {
                self.drag = Some(Drag::Rotate);
            } else if input.mouse_pressed(MouseButton::Right) {
                self.drag = Some(Drag::Pan);
            }
        }

        match self.drag {
            Some(Drag::Rotate) if input.mouse_down(MouseButton::Left) => {
                self.rotate(input.mouse_delta(), height);
            }
            Some(Drag::Pan) if input.mouse_down(MouseButton::Right) => {
                self.pan(input.mouse_delta(), height);
            }
            Some(_) => self.drag = None,
            None => {}
        }

        if pointer_captured {
            return;
        }

        let scroll = input.scroll_delta().y;
        if scroll != 0.0 {
            self.dolly(scroll);
        }

        match input.touch_count() {
            1 => self.rotate(input.touch_delta(), height),
            2 => {
                if let Some(ratio) = input.pinch_ratio() {
                    self.dolly_by(ratio);
                }
                self.pan(input.touch_delta(), height);
            }
            _ => {}
        }
    }

    /// Apply one damped step of the pending motion.
    pub fn step(&mut self) {
        let d = self.damping;

        self.spherical.theta -= self.pending_rotation.x * d;
        self.spherical.phi -= self.pending_rotation.y * d;
        self.spherical.phi = self.spherical.phi.clamp(POLAR_EPSILON, PI - POLAR_EPSILON);

        self.spherical.radius = (self.spherical.radius * self.pending_scale)
            .clamp(self.min_distance, self.max_distance);
        self.target += self.pending_pan * d;

        self.pending_rotation *= 1.0 - d;
        self.pending_pan *= 1.0 - d;
        self.pending_scale = 1.0;
    }

    /// The camera for the current orbit state.
    pub fn camera(&self) -> Camera {
        Camera {
            position: self.position(),
            target: self.target,
            up: Vec3::Y,
            fov: self.fov,
            near: self.near,
            far: self.far,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;
    use std::time::Instant;

    #[test]
    fn default_matches_the_fixed_camera() {
        let orbit = OrbitCamera::new();
        let camera = orbit.camera();
        assert_relative_eq!(camera.position.z, 3.0, epsilon = 1e-5);
        assert_relative_eq!(camera.position.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(orbit.polar(), FRAC_PI_2, epsilon = 1e-5);
        assert_eq!(camera, Camera::default().at(camera.position));
    }

    #[test]
    fn does_not_move_without_update() {
        let mut orbit = OrbitCamera::new();
        let before = orbit.camera();
        orbit.rotate(Vec2::new(100.0, 0.0), 600.0);
        assert_eq!(orbit.camera(), before);
    }

    #[test]
    fn damped_rotation_converges_to_the_drag() {
        let mut orbit = OrbitCamera::new();
        // A quarter of the viewport height is a quarter turn.
        orbit.rotate(Vec2::new(150.0, 0.0), 600.0);

        orbit.step();
        assert_relative_eq!(orbit.azimuth(), -FRAC_PI_2 * 0.05, epsilon = 1e-5);

        for _ in 0..500 {
            orbit.step();
        }
        assert_relative_eq!(orbit.azimuth(), -FRAC_PI_2, epsilon = 1e-4);
        assert_relative_eq!(orbit.distance(), 3.0, epsilon = 1e-4);
    }

    #[test]
    fn polar_angle_stays_inside_the_poles() {
        let mut orbit = OrbitCamera::new();
        orbit.rotate(Vec2::new(0.0, 10_000.0), 100.0);
        for _ in 0..200 {
            orbit.step();
        }
        assert!(orbit.polar() > 0.0);
        assert!(orbit.polar() < PI);
        assert!(orbit.camera().position.is_finite());
    }

    #[test]
    fn wheel_up_dollies_in() {
        let mut orbit = OrbitCamera::new();
        orbit.dolly(1.0);
        orbit.step();
        assert_relative_eq!(orbit.distance(), 3.0 * 0.95, epsilon = 1e-5);

        orbit.dolly(-2.0);
        orbit.step();
        assert_relative_eq!(orbit.distance(), 3.0 / 0.95, epsilon = 1e-4);
    }

    #[test]
    fn pan_moves_the_target_in_screen_plane() {
        let mut orbit = OrbitCamera::new();
        orbit.pan(Vec2::new(-100.0, 0.0), 600.0);
        for _ in 0..500 {
            orbit.step();
        }
        assert!(orbit.target.x > 0.0);
        assert_relative_eq!(orbit.target.y, 0.0, epsilon = 1e-5);
        assert_relative_eq!(orbit.target.z, 0.0, epsilon = 1e-5);
        assert_relative_eq!(orbit.distance(), 3.0, epsilon = 1e-4);
    }

    #[test]
    fn captured_pointer_does_not_start_a_drag() {
        let mut orbit = OrbitCamera::new();
        let mut input = Input::new();
        input.press_button(MouseButton::Left, Instant::now());
        input.move_cursor(Vec2::new(100.0, 0.0));

        orbit.update(&input, 600.0, true);
        assert!(!orbit.is_dragging());
        for _ in 0..100 {
            orbit.step();
        }
        assert_relative_eq!(orbit.azimuth(), 0.0);
    }

    #[test]
    fn drag_from_viewport_rotates() {
        let mut orbit = OrbitCamera::new();
        let mut input = Input::new();
        input.press_button(MouseButton::Left, Instant::now());
        input.move_cursor(Vec2::new(60.0, 0.0));

        orbit.update(&input, 600.0, false);
        assert!(orbit.is_dragging());
        assert!(orbit.azimuth() < 0.0);

        input.begin_frame();
        input.release_button(MouseButton::Left);
        orbit.update(&input, 600.0, false);
        assert!(!orbit.is_dragging());
    }
}
