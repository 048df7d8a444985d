use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use glam::Vec2;
use winit::event::{ElementState, MouseButton, TouchPhase, WindowEvent};
use winit::keyboard::{Key, KeyCode, PhysicalKey};

/// Longest gap between two left presses that still counts as a double click.
pub const DOUBLE_CLICK_TIME: Duration = Duration::from_millis(300);
/// Furthest the pointer may move between the two presses of a double click.
const DOUBLE_CLICK_SLOP: f32 = 6.0;

/// Tracks input state for keyboard, mouse and touch.
///
/// Positions are window coordinates in physical pixels.
#[derive(Default)]
pub struct Input {
    keys_down: HashSet<KeyCode>,
    keys_pressed: HashSet<KeyCode>,
    typed: Vec<String>,
    mouse_buttons_down: HashSet<MouseButton>,
    mouse_buttons_pressed: HashSet<MouseButton>,
    mouse_position: Vec2,
    mouse_delta: Vec2,
    scroll_delta: Vec2,
    touches: HashMap<u64, Vec2>,
    previous_touches: HashMap<u64, Vec2>,
    last_click: Option<(Instant, Vec2)>,
    double_clicked: bool,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call at the start of each frame to reset per-frame state.
    pub fn begin_frame(&mut self) {
        self.keys_pressed.clear();
        self.typed.clear();
        self.mouse_buttons_pressed.clear();
        self.mouse_delta = Vec2::ZERO;
        self.scroll_delta = Vec2::ZERO;
        self.previous_touches = self.touches.clone();
        self.double_clicked = false;
    }

    /// Process a window event and update input state.
    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => {
                            if !self.keys_down.contains(&key) {
                                self.keys_pressed.insert(key);
                            }
                            self.keys_down.insert(key);
                        }
                        ElementState::Released => {
                            self.keys_down.remove(&key);
                        }
                    }
                }
                if event.state == ElementState::Pressed && !event.repeat {
                    if let Key::Character(text) = &event.logical_key {
                        self.typed.push(text.to_string());
                    }
                }
            }
            WindowEvent::MouseInput { state, button, .. } => match state {
                ElementState::Pressed => self.press_button(*button, Instant::now()),
                ElementState::Released => self.release_button(*button),
            },
            WindowEvent::CursorMoved { position, .. } => {
                self.move_cursor(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let d = match delta {
                    winit::event::MouseScrollDelta::LineDelta(x, y) => Vec2::new(*x, *y),
                    winit::event::MouseScrollDelta::PixelDelta(pos) => {
                        Vec2::new(pos.x as f32, pos.y as f32) / 120.0
                    }
                };
                self.scroll(d);
            }
            WindowEvent::Touch(touch) => {
                let position = Vec2::new(touch.location.x as f32, touch.location.y as f32);
                self.touch(touch.id, touch.phase, position);
            }
            WindowEvent::Focused(false) => {
                self.keys_down.clear();
                self.mouse_buttons_down.clear();
                self.touches.clear();
            }
            _ => {}
        }
    }

    pub(crate) fn press_button(&mut self, button: MouseButton, now: Instant) {
        if !self.mouse_buttons_down.contains(&button) {
            self.mouse_buttons_pressed.insert(button);
        }
        self.mouse_buttons_down.insert(button);

        if button == MouseButton::Left {
            let position = self.mouse_position;
            match self.last_click {
                Some((at, last_position))
                    if now.saturating_duration_since(at) <= DOUBLE_CLICK_TIME
                        && at <= now
                        && last_position.distance(position) <= DOUBLE_CLICK_SLOP =>
                {
                    self.double_clicked = true;
                    self.last_click = None;
                }
                _ => self.last_click = Some((now, position)),
            }
        }
    }

    pub(crate) fn release_button(&mut self, button: MouseButton) {
        self.mouse_buttons_down.remove(&button);
    }

    pub(crate) fn move_cursor(&mut self, position: Vec2) {
        self.mouse_delta += position - self.mouse_position;
        self.mouse_position = position;
    }

    pub(crate) fn scroll(&mut self, delta: Vec2) {
        self.scroll_delta += delta;
    }

    pub(crate) fn touch(&mut self, id: u64, phase: TouchPhase, position: Vec2) {
        match phase {
            TouchPhase::Started | TouchPhase::Moved => {
                self.touches.insert(id, position);
            }
            TouchPhase::Ended | TouchPhase::Cancelled => {
                self.touches.remove(&id);
                self.previous_touches.remove(&id);
            }
        }
    }

    /// Returns true if the key was pressed this frame.
    pub fn key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    /// Characters typed this frame, one entry per key press.
    pub fn typed(&self) -> &[String] {
        &self.typed
    }

    /// Returns true if the mouse button is currently held down.
    pub fn mouse_down(&self, button: MouseButton) -> bool {
        self.mouse_buttons_down.contains(&button)
    }

    /// Returns true if the mouse button was pressed this frame.
    pub fn mouse_pressed(&self, button: MouseButton) -> bool {
        self.mouse_buttons_pressed.contains(&button)
    }

    /// Current mouse position in window coordinates.
    pub fn mouse_position(&self) -> Vec2 {
        self.mouse_position
    }

    /// Mouse movement delta this frame.
    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }

    /// Scroll wheel delta this frame (in "lines").
    pub fn scroll_delta(&self) -> Vec2 {
        self.scroll_delta
    }

    /// Whether a left double click completed this frame.
    pub fn double_clicked(&self) -> bool {
        self.double_clicked
    }

    pub fn touch_count(&self) -> usize {
        self.touches.len()
    }

    /// Movement of the touch centroid since last frame, over fingers present in both frames.
    pub fn touch_delta(&self) -> Vec2 {
        let pairs = self.tracked_touches();
        if pairs.is_empty() {
            return Vec2::ZERO;
        }
        let n = pairs.len() as f32;
        let now: Vec2 = pairs.iter().map(|(_, now)| *now).sum::<Vec2>() / n;
        let before: Vec2 = pairs.iter().map(|(before, _)| *before).sum::<Vec2>() / n;
        now - before
    }

    /// Ratio of the previous to current two-finger spread; above 1 when pinching in.
    pub fn pinch_ratio(&self) -> Option<f32> {
        let pairs = self.tracked_touches();
        if pairs.len() != 2 {
            return None;
        }
        let before = pairs[0].0.distance(pairs[1].0);
        let now = pairs[0].1.distance(pairs[1].1);
        if before <= f32::EPSILON || now <= f32::EPSILON {
            return None;
        }
        Some(before / now)
    }

    fn tracked_touches(&self) -> Vec<(Vec2, Vec2)> {
        let mut ids: Vec<_> = self
            .touches
            .keys()
            .filter(|id| self.previous_touches.contains_key(id))
            .copied()
            .collect();
        ids.sort_unstable();
        ids.iter()
            .map(|id| (self.previous_touches[id], self.touches[id]))
            .collect()
    }
}
