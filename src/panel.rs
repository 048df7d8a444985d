//! The control panel model: folders of widgets bound to scene properties.
//!
//! Every widget is a [`Binding`]: a getter that reads the current value from
//! the [`Scene`], a typed setter, and the widget description that validates
//! incoming values (numeric range and step, dropdown options). Pointer input
//! from the panel view and keyboard shortcuts both end up in
//! [`Panel::dispatch`], so they cannot disagree about the resulting state.

use crate::color::Color;
use crate::geometry::{GeometryBackend, GeometryKind};
use crate::scene::{FaceMode, Scene};
use crate::texture::TextureKey;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ControlError {
    #[error("{control:?} expects a {expected} value, got {got}")]
    WrongKind {
        control: Control,
        expected: &'static str,
        got: &'static str,
    },
    #[error("option {index} is out of range for {control:?} ({len} options)")]
    OutOfRange {
        control: Control,
        index: usize,
        len: usize,
    },
}

/// Slider bounds. Values snap to `step`, then clamp to `[min, max]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NumericRange {
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

impl NumericRange {
    pub const fn new(min: f32, max: f32, step: f32) -> Self {
        Self { min, max, step }
    }

    /// The value a slider actually commits for a requested `value`.
    pub fn commit(&self, value: f32) -> f32 {
        if value.is_nan() {
            return self.min;
        }
        let snapped = if self.step > 0.0 {
            (value / self.step).round() * self.step
        } else {
            value
        };
        snapped.clamp(self.min, self.max)
    }

    /// Position of `value` along the track, in `[0, 1]`.
    pub fn fraction(&self, value: f32) -> f32 {
        if self.max <= self.min {
            return 0.0;
        }
        ((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
    }

    pub fn lerp(&self, fraction: f32) -> f32 {
        self.min + (self.max - self.min) * fraction.clamp(0.0, 1.0)
    }

    /// Decimal places needed to show a value on this step.
    pub fn decimals(&self) -> usize {
        let mut step = self.step;
        let mut decimals = 0;
        while decimals < 4 && (step - step.round()).abs() > 1e-4 {
            step *= 10.0;
            decimals += 1;
        }
        decimals
    }
}

/// A value read from or written to a widget.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    Number(f32),
    Bool(bool),
    /// Index into a dropdown's options.
    Choice(usize),
    Color(Color),
    /// Button press; buttons have no state to read back.
    Trigger,
}

impl Value {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Bool(_) => "bool",
            Value::Choice(_) => "choice",
            Value::Color(_) => "color",
            Value::Trigger => "trigger",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Widget {
    Slider(NumericRange),
    Toggle,
    Dropdown(&'static [&'static str]),
    ColorPicker,
    Button,
}

/// Every property or action the panel can drive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Control {
    PositionY,
    PositionX,
    ScaleX,
    ScaleY,
    ScaleZ,
    Transparent,
    Opacity,
    Face,
    Shape,
    Texture,
    Visible,
    Wireframe,
    Color,
    Spin,
    AutoSpin,
    SpinSpeed,
}

impl Control {
    /// Every control, in binding-table order.
    pub const ALL: [Control; 16] = [
        Control::PositionY,
        Control::PositionX,
        Control::ScaleX,
        Control::ScaleY,
        Control::ScaleZ,
        Control::Transparent,
        Control::Opacity,
        Control::Face,
        Control::Shape,
        Control::Texture,
        Control::Visible,
        Control::Wireframe,
        Control::Color,
        Control::Spin,
        Control::AutoSpin,
        Control::SpinSpeed,
    ];

    /// Slot in the binding table.
    pub fn index(self) -> usize {
        match self {
            Control::PositionY => 0,
            Control::PositionX => 1,
            Control::ScaleX => 2,
            Control::ScaleY => 3,
            Control::ScaleZ => 4,
            Control::Transparent => 5,
            Control::Opacity => 6,
            Control::Face => 7,
            Control::Shape => 8,
            Control::Texture => 9,
            Control::Visible => 10,
            Control::Wireframe => 11,
            Control::Color => 12,
            Control::Spin => 13,
            Control::AutoSpin => 14,
            Control::SpinSpeed => 15,
        }
    }
}

/// What a setter may touch.
pub struct ControlTarget<'a> {
    pub scene: &'a mut Scene,
    pub meshes: &'a mut dyn GeometryBackend,
    /// Seconds since startup, for actions that start animations.
    pub now: f64,
}

/// Typed write side of a binding; the variant fixes the accepted [`Value`] kind.
#[derive(Clone, Copy)]
pub enum Setter {
    Number(fn(&mut Scene, f32)),
    Bool(fn(&mut Scene, bool)),
    Choice(fn(&mut ControlTarget<'_>, usize)),
    Color(fn(&mut Scene, Color)),
    Action(fn(&mut ControlTarget<'_>)),
}

impl Setter {
    fn expects(&self) -> &'static str {
        match self {
            Setter::Number(_) => "number",
            Setter::Bool(_) => "bool",
            Setter::Choice(_) => "choice",
            Setter::Color(_) => "color",
            Setter::Action(_) => "trigger",
        }
    }
}

#[derive(Clone, Copy)]
pub struct Binding {
    pub control: Control,
    pub label: &'static str,
    pub widget: Widget,
    pub get: fn(&Scene) -> Value,
    pub set: Setter,
}

impl Binding {
    /// Check `value` against the widget and normalise it to what will be committed.
    pub fn validate(&self, value: Value) -> Result<Value, ControlError> {
        let wrong_kind = || ControlError::WrongKind {
            control: self.control,
            expected: self.set.expects(),
            got: value.kind_name(),
        };

        match (self.set, value) {
            (Setter::Number(_), Value::Number(x)) => match self.widget {
                Widget::Slider(range) => Ok(Value::Number(range.commit(x))),
                _ => Ok(value),
            },
            (Setter::Choice(_), Value::Choice(index)) => match self.widget {
                Widget::Dropdown(options) if index >= options.len() => {
                    Err(ControlError::OutOfRange {
                        control: self.control,
                        index,
                        len: options.len(),
                    })
                }
                _ => Ok(value),
            },
            (Setter::Bool(_), Value::Bool(_))
            | (Setter::Color(_), Value::Color(_))
            | (Setter::Action(_), Value::Trigger) => Ok(value),
            _ => Err(wrong_kind()),
        }
    }

    fn apply(&self, value: Value, target: &mut ControlTarget<'_>) {
        match (self.set, value) {
            (Setter::Number(set), Value::Number(x)) => set(target.scene, x),
            (Setter::Bool(set), Value::Bool(b)) => set(target.scene, b),
            (Setter::Choice(set), Value::Choice(i)) => set(target, i),
            (Setter::Color(set), Value::Color(c)) => set(target.scene, c),
            (Setter::Action(run), Value::Trigger) => run(target),
            // validate() rejects every other pairing
            _ => {}
        }
    }
}

#[derive(Clone, Debug)]
pub struct Folder {
    pub title: &'static str,
    pub open: bool,
    pub controls: Vec<Control>,
}

/// Keyboard shortcuts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shortcut {
    TogglePanel,
    ToggleWireframe,
    ToggleVisible,
    SelectShape(GeometryKind),
}

impl Shortcut {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "h" => Some(Shortcut::TogglePanel),
            "w" => Some(Shortcut::ToggleWireframe),
            "v" => Some(Shortcut::ToggleVisible),
            "1" => Some(Shortcut::SelectShape(GeometryKind::Cube)),
            "2" => Some(Shortcut::SelectShape(GeometryKind::Sphere)),
            "3" => Some(Shortcut::SelectShape(GeometryKind::Torus)),
            _ => None,
        }
    }
}

pub struct Panel {
    pub title: &'static str,
    /// Whether the root panel is expanded.
    pub open: bool,
    /// Hidden panels are neither drawn nor hit-tested.
    pub hidden: bool,
    pub folders: Vec<Folder>,
    bindings: [Binding; 16],
}

impl Default for Panel {
    fn default() -> Self {
        Self::new()
    }
}

impl Panel {
    pub fn new() -> Self {
        let folders = vec![
            Folder {
                title: "Position",
                open: false,
                controls: vec![Control::PositionY, Control::PositionX],
            },
            Folder {
                title: "Scale",
                open: false,
                controls: vec![Control::ScaleX, Control::ScaleY, Control::ScaleZ],
            },
            Folder {
                title: "Transparency & Face View",
                open: false,
                controls: vec![Control::Transparent, Control::Opacity, Control::Face],
            },
            Folder {
                title: "Shape, Texture, Visibility, Color",
                open: false,
                controls: vec![
                    Control::Shape,
                    Control::Texture,
                    Control::Visible,
                    Control::Wireframe,
                    Control::Color,
                    Control::Spin,
                ],
            },
            Folder {
                title: "Animation",
                open: false,
                controls: vec![Control::AutoSpin, Control::SpinSpeed],
            },
        ];

        Self {
            title: "Controls",
            open: false,
            hidden: false,
            folders,
            bindings: Control::ALL.map(binding_for),
        }
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn binding(&self, control: Control) -> &Binding {
        &self.bindings[control.index()]
    }

    /// The value a widget displays, read back from the scene.
    pub fn value(&self, control: Control, scene: &Scene) -> Value {
        (self.binding(control).get)(scene)
    }

    /// Validate `value` and apply it. Returns the committed value.
    pub fn dispatch(
        &self,
        control: Control,
        value: Value,
        target: &mut ControlTarget<'_>,
    ) -> Result<Value, ControlError> {
        let binding = self.binding(control);
        let committed = binding.validate(value)?;
        binding.apply(committed, target);
        log::debug!("{} <- {committed:?}", binding.label);
        Ok(committed)
    }

    /// Run a keyboard shortcut through the same table the widgets use.
    pub fn shortcut(
        &mut self,
        shortcut: Shortcut,
        target: &mut ControlTarget<'_>,
    ) -> Result<(), ControlError> {
        match shortcut {
            Shortcut::TogglePanel => {
                self.hidden = !self.hidden;
            }
            Shortcut::ToggleWireframe => self.toggle(Control::Wireframe, target)?,
            Shortcut::ToggleVisible => self.toggle(Control::Visible, target)?,
            Shortcut::SelectShape(kind) => {
                self.dispatch(Control::Shape, Value::Choice(kind.index()), target)?;
            }
        }
        Ok(())
    }

    fn toggle(&self, control: Control, target: &mut ControlTarget<'_>) -> Result<(), ControlError> {
        let current = match self.value(control, target.scene) {
            Value::Bool(b) => b,
            other => {
                return Err(ControlError::WrongKind {
                    control,
                    expected: "bool",
                    got: other.kind_name(),
                });
            }
        };
        self.dispatch(control, Value::Bool(!current), target)?;
        Ok(())
    }
}

fn binding_for(control: Control) -> Binding {
    match control {
        Control::PositionY => Binding {
            control,
            label: "Vertical",
            widget: Widget::Slider(NumericRange::new(-3.0, 3.0, 0.01)),
            get: |s| Value::Number(s.object.position.y),
            set: Setter::Number(Scene::set_position_y),
        },
        Control::PositionX => Binding {
            control,
            label: "Horizontal",
            widget: Widget::Slider(NumericRange::new(-3.0, 3.0, 0.01)),
            get: |s| Value::Number(s.object.position.x),
            set: Setter::Number(Scene::set_position_x),
        },
        Control::ScaleX => Binding {
            control,
            label: "Scale X",
            widget: Widget::Slider(NumericRange::new(0.1, 3.0, 0.01)),
            get: |s| Value::Number(s.object.scale.x),
            set: Setter::Number(Scene::set_scale_x),
        },
        Control::ScaleY => Binding {
            control,
            label: "Scale Y",
            widget: Widget::Slider(NumericRange::new(0.1, 3.0, 0.01)),
            get: |s| Value::Number(s.object.scale.y),
            set: Setter::Number(Scene::set_scale_y),
        },
        Control::ScaleZ => Binding {
            control,
            label: "Scale Z",
            widget: Widget::Slider(NumericRange::new(0.1, 10.0, 0.05)),
            get: |s| Value::Number(s.object.scale.z),
            set: Setter::Number(Scene::set_scale_z),
        },
        Control::Transparent => Binding {
            control,
            label: "Enable Transparency",
            widget: Widget::Toggle,
            get: |s| Value::Bool(s.object.material.transparent),
            set: Setter::Bool(Scene::set_transparent),
        },
        Control::Opacity => Binding {
            control,
            label: "Opacity",
            widget: Widget::Slider(NumericRange::new(0.1, 1.0, 0.1)),
            get: |s| Value::Number(s.object.material.opacity),
            set: Setter::Number(Scene::set_opacity),
        },
        Control::Face => Binding {
            control,
            label: "Select Face",
            widget: Widget::Dropdown(&FaceMode::LABELS),
            get: |s| Value::Choice(s.object.material.side.index()),
            set: Setter::Choice(|t, i| {
                if let Some(side) = FaceMode::from_index(i) {
                    t.scene.set_face_mode(side);
                }
            }),
        },
        Control::Shape => Binding {
            control,
            label: "Select Shape",
            widget: Widget::Dropdown(&GeometryKind::LABELS),
            get: |s| Value::Choice(s.object.kind.index()),
            set: Setter::Choice(|t, i| {
                if let Some(kind) = GeometryKind::from_index(i) {
                    t.scene.set_geometry_kind(kind, t.meshes);
                }
            }),
        },
        Control::Texture => Binding {
            control,
            label: "Select Texture",
            widget: Widget::Dropdown(&TextureKey::LABELS),
            get: |s| Value::Choice(s.object.material.map.index()),
            set: Setter::Choice(|t, i| {
                if let Some(key) = TextureKey::from_index(i) {
                    t.scene.set_texture(key);
                }
            }),
        },
        Control::Visible => Binding {
            control,
            label: "visible",
            widget: Widget::Toggle,
            get: |s| Value::Bool(s.object.visible),
            set: Setter::Bool(Scene::set_visible),
        },
        Control::Wireframe => Binding {
            control,
            label: "wireframe",
            widget: Widget::Toggle,
            get: |s| Value::Bool(s.object.material.wireframe),
            set: Setter::Bool(Scene::set_wireframe),
        },
        Control::Color => Binding {
            control,
            label: "color",
            widget: Widget::ColorPicker,
            get: |s| Value::Color(s.object.material.color),
            set: Setter::Color(Scene::set_color),
        },
        Control::Spin => Binding {
            control,
            label: "Spin",
            widget: Widget::Button,
            get: |_| Value::Trigger,
            set: Setter::Action(|t| t.scene.start_spin(t.now)),
        },
        Control::AutoSpin => Binding {
            control,
            label: "Enable Spin",
            widget: Widget::Toggle,
            get: |s| Value::Bool(s.animation.is_spinning),
            set: Setter::Bool(Scene::set_spinning),
        },
        Control::SpinSpeed => Binding {
            control,
            label: "Spin Speed",
            widget: Widget::Slider(NumericRange::new(0.01, 0.1, 0.01)),
            get: |s| Value::Number(s.animation.spin_speed),
            set: Setter::Number(Scene::set_spin_speed),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::test_support::CountingBackend;
    use approx::assert_relative_eq;

    /// A panel wired to a scene over the counting backend.
    struct Bench {
        panel: Panel,
        scene: Scene,
        backend: CountingBackend,
    }

    impl Bench {
        fn new() -> Self {
            let mut backend = CountingBackend::default();
            let scene = Scene::new(&mut backend);
            Self {
                panel: Panel::new(),
                scene,
                backend,
            }
        }

        fn set(&mut self, control: Control, value: Value) -> Result<Value, ControlError> {
            let mut target = ControlTarget {
                scene: &mut self.scene,
                meshes: &mut self.backend,
                now: 0.0,
            };
            self.panel.dispatch(control, value, &mut target)
        }

        fn key(&mut self, shortcut: Shortcut) -> Result<(), ControlError> {
            let mut target = ControlTarget {
                scene: &mut self.scene,
                meshes: &mut self.backend,
                now: 0.0,
            };
            self.panel.shortcut(shortcut, &mut target)
        }
    }

    #[test]
    fn sliders_snap_then_clamp() {
        let mut bench = Bench::new();

        let z = bench.set(Control::ScaleZ, Value::Number(15.0)).unwrap();
        assert_eq!(z, Value::Number(10.0));
        assert_eq!(bench.scene.object.scale.z, 10.0);

        bench.set(Control::ScaleX, Value::Number(-1.0)).unwrap();
        assert_relative_eq!(bench.scene.object.scale.x, 0.1);

        bench.set(Control::Opacity, Value::Number(0.34)).unwrap();
        assert_relative_eq!(bench.scene.object.material.opacity, 0.3, epsilon = 1e-6);

        bench.set(Control::ScaleZ, Value::Number(2.03)).unwrap();
        assert_relative_eq!(bench.scene.object.scale.z, 2.05, epsilon = 1e-5);
    }

    #[test]
    fn nan_commits_the_minimum() {
        let range = NumericRange::new(0.01, 0.1, 0.01);
        assert_eq!(range.commit(f32::NAN), 0.01);
        assert_eq!(range.commit(f32::INFINITY), 0.1);
    }

    #[test]
    fn slider_decimals_follow_step() {
        assert_eq!(NumericRange::new(0.0, 1.0, 0.1).decimals(), 1);
        assert_eq!(NumericRange::new(0.0, 1.0, 0.05).decimals(), 2);
        assert_eq!(NumericRange::new(0.0, 10.0, 1.0).decimals(), 0);
    }

    #[test]
    fn wrong_kind_is_rejected_without_side_effects() {
        let mut bench = Bench::new();

        let err = bench.set(Control::Wireframe, Value::Number(1.0)).unwrap_err();
        assert_eq!(
            err,
            ControlError::WrongKind {
                control: Control::Wireframe,
                expected: "bool",
                got: "number"
            }
        );
        assert!(!bench.scene.object.material.wireframe);
    }

    #[test]
    fn out_of_range_choice_is_rejected() {
        let mut bench = Bench::new();

        let err = bench.set(Control::Shape, Value::Choice(7)).unwrap_err();
        assert!(matches!(err, ControlError::OutOfRange { len: 3, .. }));
        assert_eq!(bench.scene.object.kind, GeometryKind::Cube);
        assert_eq!(bench.backend.ops.len(), 1);
    }

    #[test]
    fn getters_mirror_the_scene() {
        let mut bench = Bench::new();
        let (panel, scene) = (&bench.panel, &mut bench.scene);

        scene.set_face_mode(FaceMode::Double);
        scene.set_position_y(1.5);
        assert_eq!(panel.value(Control::Face, scene), Value::Choice(2));
        assert_eq!(panel.value(Control::PositionY, scene), Value::Number(1.5));
        assert_eq!(panel.value(Control::SpinSpeed, scene), Value::Number(0.01));
        assert_eq!(panel.value(Control::Color, scene), Value::Color(Color::WHITE));
    }

    #[test]
    fn every_folder_control_has_a_binding() {
        let panel = Panel::new();
        let listed: usize = panel.folders.iter().map(|f| f.controls.len()).sum();
        assert_eq!(listed, panel.bindings().len());
        for folder in &panel.folders {
            assert!(!folder.open);
            for control in &folder.controls {
                assert_eq!(panel.binding(*control).control, *control);
            }
        }
        for (slot, control) in Control::ALL.into_iter().enumerate() {
            assert_eq!(control.index(), slot);
            assert_eq!(panel.bindings()[slot].control, control);
        }
        assert!(!panel.open);
        assert!(!panel.hidden);
    }

    #[test]
    fn texture_then_shape_keeps_both() {
        let mut bench = Bench::new();

        bench.set(Control::Texture, Value::Choice(1)).unwrap();
        bench.set(Control::Shape, Value::Choice(1)).unwrap();

        assert_eq!(bench.scene.object.kind, GeometryKind::Sphere);
        assert_eq!(bench.scene.object.material.map, TextureKey::Earth);
        assert!(bench.backend.live.contains(&bench.scene.object.mesh));
        assert_eq!(bench.backend.live.len(), 1);
    }

    #[test]
    fn shortcuts_match_widgets() {
        let mut by_widget = Bench::new();
        for (control, value) in [
            (Control::Wireframe, Value::Bool(true)),
            (Control::Visible, Value::Bool(false)),
            (Control::Shape, Value::Choice(2)),
        ] {
            by_widget.set(control, value).unwrap();
        }

        let mut by_key = Bench::new();
        for key in ["w", "v", "3"] {
            by_key.key(Shortcut::from_key(key).unwrap()).unwrap();
        }

        let (by_key, by_widget) = (&by_key.scene.object, &by_widget.scene.object);
        assert_eq!(by_key.material, by_widget.material);
        assert_eq!(by_key.visible, by_widget.visible);
        assert_eq!(by_key.kind, GeometryKind::Torus);
        assert_eq!(by_key.kind, by_widget.kind);
    }

    #[test]
    fn h_toggles_panel_visibility() {
        let mut bench = Bench::new();

        bench.key(Shortcut::TogglePanel).unwrap();
        assert!(bench.panel.hidden);
        bench.key(Shortcut::TogglePanel).unwrap();
        assert!(!bench.panel.hidden);
        assert_eq!(Shortcut::from_key("x"), None);
    }

    #[test]
    fn shortcuts_match_lowercase_keys_only() {
        assert_eq!(Shortcut::from_key("h"), Some(Shortcut::TogglePanel));
        assert_eq!(Shortcut::from_key("w"), Some(Shortcut::ToggleWireframe));
        assert_eq!(Shortcut::from_key("v"), Some(Shortcut::ToggleVisible));
        for key in ["H", "W", "V"] {
            assert_eq!(Shortcut::from_key(key), None);
        }
    }

    #[test]
    fn spin_button_starts_a_tween() {
        let mut bench = Bench::new();
        bench.set(Control::Spin, Value::Trigger).unwrap();
        assert_eq!(bench.scene.active_tweens(), 1);
        assert!(!bench.scene.animation.is_spinning);
    }
}
