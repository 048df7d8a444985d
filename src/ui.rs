//! The on-screen control panel.
//!
//! [`PanelView`] lays the [`Panel`] model out as a column of fixed-height rows
//! anchored to the top-right corner, hit-tests pointer input against those
//! rows, and draws them with [`Draw2d`]. Layout is recomputed from the panel
//! state every frame so hit-testing and drawing always agree.

use glam::Vec2;
use winit::event::MouseButton;

use crate::assets::{Assets, FontId};
use crate::color::{Color, Rect};
use crate::draw2d::Draw2d;
use crate::input::Input;
use crate::panel::{Control, ControlTarget, Panel, Value, Widget};
use crate::scene::Scene;

/// Panel width in logical pixels.
pub const PANEL_WIDTH: f32 = 245.0;
/// Row height in logical pixels.
pub const ROW_HEIGHT: f32 = 24.0;
/// Share of a row given to the label.
const LABEL_FRACTION: f32 = 0.4;
const PADDING: f32 = 4.0;

const TITLE_BG: Color = Color::from_hex(0x111111);
const FOLDER_BG: Color = Color::from_hex(0x1f1f1f);
const WIDGET_BG: Color = Color::from_hex(0x424242);
const ACCENT: Color = Color::from_hex(0x2cc9ff);
const TEXT: Color = Color::from_hex(0xebebeb);
const MUTED: Color = Color::from_hex(0xb8b8b8);

const CHANNELS: [&str; 3] = ["R", "G", "B"];

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RowKind {
    Title,
    Folder(usize),
    Control(Control),
    /// One of an open dropdown's options.
    Option(Control, usize),
    /// An RGB slider under an expanded color picker.
    Channel(Control, usize),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Row {
    pub rect: Rect,
    pub kind: RowKind,
}

/// Which slider the pointer is holding.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Drag {
    Slider(Control),
    Channel(Control, usize),
}

pub struct PanelView {
    scale: f32,
    open_dropdown: Option<Control>,
    open_color: Option<Control>,
    drag: Option<Drag>,
}

impl PanelView {
    /// A view drawn at `scale` device pixels per logical pixel.
    pub fn new(scale: f32) -> Self {
        Self {
            scale,
            open_dropdown: None,
            open_color: None,
            drag: None,
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Rows from top to bottom for a surface `surface_width` pixels wide.
    pub fn layout(&self, panel: &Panel, surface_width: f32) -> Vec<Row> {
        if panel.hidden {
            return Vec::new();
        }

        let width = PANEL_WIDTH * self.scale;
        let height = ROW_HEIGHT * self.scale;
        let x = (surface_width - width).max(0.0);
        let mut rows = Vec::new();
        let mut push = |kind| {
            let y = rows.len() as f32 * height;
            rows.push(Row {
                rect: Rect::new(x, y, width, height),
                kind,
            });
        };

        push(RowKind::Title);
        if !panel.open {
            return rows;
        }

        for (i, folder) in panel.folders.iter().enumerate() {
            push(RowKind::Folder(i));
            if !folder.open {
                continue;
            }
            for &control in &folder.controls {
                push(RowKind::Control(control));
                match panel.binding(control).widget {
                    Widget::Dropdown(options) if self.open_dropdown == Some(control) => {
                        for index in 0..options.len() {
                            push(RowKind::Option(control, index));
                        }
                    }
                    Widget::ColorPicker if self.open_color == Some(control) => {
                        for channel in 0..CHANNELS.len() {
                            push(RowKind::Channel(control, channel));
                        }
                    }
                    _ => {}
                }
            }
        }
        rows
    }

    /// The widget area of a control row, right of its label.
    fn widget_rect(&self, row: Rect) -> Rect {
        let label = row.width * LABEL_FRACTION;
        let pad = PADDING * self.scale;
        Rect::new(
            row.x + label,
            row.y + pad,
            (row.width - label - pad).max(0.0),
            (row.height - 2.0 * pad).max(0.0),
        )
    }

    /// Handle this frame's pointer input, with `pointer` in surface pixels.
    /// Returns true when the panel owns the pointer, so the camera should
    /// ignore it.
    pub fn update(
        &mut self,
        panel: &mut Panel,
        input: &Input,
        pointer: Vec2,
        target: &mut ControlTarget<'_>,
        surface_width: f32,
    ) -> bool {
        if panel.hidden {
            self.drag = None;
            return false;
        }

        let rows = self.layout(panel, surface_width);

        if let Some(drag) = self.drag {
            if input.mouse_down(MouseButton::Left) {
                if let Some(row) = rows.iter().find(|row| drag.matches(row.kind)) {
                    self.drag_to(panel, drag, row.rect, pointer.x, target);
                }
            } else {
                self.drag = None;
            }
            return true;
        }

        let hovered = rows.iter().find(|row| row.rect.contains(pointer)).copied();

        if input.mouse_pressed(MouseButton::Left) {
            match hovered {
                Some(row) => self.click(panel, row, pointer, target),
                None => self.open_dropdown = None,
            }
        }

        hovered.is_some()
    }

    fn click(
        &mut self,
        panel: &mut Panel,
        row: Row,
        pointer: Vec2,
        target: &mut ControlTarget<'_>,
    ) {
        match row.kind {
            RowKind::Title => {
                panel.open = !panel.open;
            }
            RowKind::Folder(index) => {
                if let Some(folder) = panel.folders.get_mut(index) {
                    folder.open = !folder.open;
                }
            }
            RowKind::Control(control) => match panel.binding(control).widget {
                Widget::Slider(_) => {
                    let drag = Drag::Slider(control);
                    self.drag = Some(drag);
                    self.drag_to(panel, drag, row.rect, pointer.x, target);
                }
                Widget::Toggle => {
                    if let Value::Bool(on) = panel.value(control, target.scene) {
                        send(panel, control, Value::Bool(!on), target);
                    }
                }
                Widget::Dropdown(_) => {
                    self.open_dropdown = match self.open_dropdown {
                        Some(open) if open == control => None,
                        _ => Some(control),
                    };
                }
                Widget::ColorPicker => {
                    self.open_color = match self.open_color {
                        Some(open) if open == control => None,
                        _ => Some(control),
                    };
                }
                Widget::Button => send(panel, control, Value::Trigger, target),
            },
            RowKind::Option(control, index) => {
                send(panel, control, Value::Choice(index), target);
                self.open_dropdown = None;
            }
            RowKind::Channel(control, channel) => {
                let drag = Drag::Channel(control, channel);
                self.drag = Some(drag);
                self.drag_to(panel, drag, row.rect, pointer.x, target);
            }
        }
    }

    fn drag_to(
        &self,
        panel: &Panel,
        drag: Drag,
        row: Rect,
        pointer_x: f32,
        target: &mut ControlTarget<'_>,
    ) {
        let track = self.widget_rect(row);
        let fraction = if track.width > 0.0 {
            ((pointer_x - track.x) / track.width).clamp(0.0, 1.0)
        } else {
            0.0
        };

        match drag {
            Drag::Slider(control) => {
                if let Widget::Slider(range) = panel.binding(control).widget {
                    send(panel, control, Value::Number(range.lerp(fraction)), target);
                }
            }
            Drag::Channel(control, channel) => {
                if let Value::Color(mut color) = panel.value(control, target.scene) {
                    let level = (fraction * 255.0).round() / 255.0;
                    match channel {
                        0 => color.r = level,
                        1 => color.g = level,
                        _ => color.b = level,
                    }
                    send(panel, control, Value::Color(color), target);
                }
            }
        }
    }

    /// Record the panel into `draw`.
    pub fn draw(
        &self,
        panel: &Panel,
        scene: &Scene,
        draw: &mut Draw2d,
        assets: &Assets,
        font: Option<FontId>,
        surface_width: f32,
    ) {
        let rows = self.layout(panel, surface_width);
        let (Some(first), Some(last)) = (rows.first(), rows.last()) else {
            return;
        };

        let frame = Rect::new(
            first.rect.x,
            first.rect.y,
            first.rect.width,
            last.rect.bottom() - first.rect.y,
        );
        draw.fill(frame, Color::PANEL_BG);

        let text = |draw: &mut Draw2d, x: f32, row: Rect, label: &str, color: Color| {
            let Some(font) = font else {
                return;
            };
            let line = assets.font(font).map_or(row.height, |f| f.line_height());
            let y = (row.y + (row.height - line) / 2.0).round();
            draw.text(assets, font, x, y, label, color);
        };

        let pad = PADDING * self.scale;
        for row in &rows {
            let r = row.rect;
            match row.kind {
                RowKind::Title => {
                    draw.fill(r, TITLE_BG);
                    let marker = if panel.open { "v " } else { "> " };
                    text(draw, r.x + pad, r, &format!("{marker}{}", panel.title), TEXT);
                }
                RowKind::Folder(index) => {
                    let Some(folder) = panel.folders.get(index) else {
                        continue;
                    };
                    draw.fill(r.inset(1.0), FOLDER_BG);
                    let marker = if folder.open { "v " } else { "> " };
                    text(draw, r.x + pad, r, &format!("{marker}{}", folder.title), TEXT);
                }
                RowKind::Control(control) => {
                    let binding = panel.binding(control);
                    let widget = self.widget_rect(r);
                    if binding.widget != Widget::Button {
                        text(draw, r.x + 2.0 * pad, r, binding.label, MUTED);
                    }
                    match (binding.widget, (binding.get)(scene)) {
                        (Widget::Slider(range), Value::Number(value)) => {
                            draw.fill(widget, WIDGET_BG);
                            let filled = Rect::new(
                                widget.x,
                                widget.y,
                                widget.width * range.fraction(value),
                                widget.height,
                            );
                            draw.fill(filled, ACCENT.with_alpha(0.6));
                            let shown = format!("{:.*}", range.decimals(), value);
                            text(draw, widget.x + pad, r, &shown, TEXT);
                        }
                        (Widget::Toggle, Value::Bool(on)) => {
                            let side = widget.height;
                            let check = Rect::new(widget.x, widget.y, side, side);
                            draw.fill(check, WIDGET_BG);
                            if on {
                                draw.fill(check.inset(side * 0.25), ACCENT);
                            }
                        }
                        (Widget::Dropdown(options), Value::Choice(index)) => {
                            draw.fill(widget, WIDGET_BG);
                            let current = options.get(index).copied().unwrap_or("");
                            text(draw, widget.x + pad, r, current, TEXT);
                        }
                        (Widget::ColorPicker, Value::Color(color)) => {
                            let swatch =
                                Rect::new(widget.x, widget.y, widget.height * 2.0, widget.height);
                            draw.fill(swatch, color.with_alpha(1.0));
                            let hex = format!("#{:06x}", color.to_hex());
                            text(draw, swatch.right() + pad, r, &hex, TEXT);
                        }
                        (Widget::Button, _) => {
                            let button = Rect::new(
                                r.x + 2.0 * pad,
                                widget.y,
                                r.width - 3.0 * pad,
                                widget.height,
                            );
                            draw.fill(button, WIDGET_BG);
                            text(draw, button.x + pad, r, binding.label, TEXT);
                        }
                        _ => {}
                    }
                }
                RowKind::Option(control, index) => {
                    let binding = panel.binding(control);
                    let Widget::Dropdown(options) = binding.widget else {
                        continue;
                    };
                    let widget = self.widget_rect(r);
                    let selected = (binding.get)(scene) == Value::Choice(index);
                    let bg = if selected { ACCENT.with_alpha(0.4) } else { FOLDER_BG };
                    draw.fill(widget, bg);
                    text(draw, widget.x + pad, r, options.get(index).copied().unwrap_or(""), TEXT);
                }
                RowKind::Channel(control, channel) => {
                    let Value::Color(color) = panel.value(control, scene) else {
                        continue;
                    };
                    let level = [color.r, color.g, color.b][channel.min(2)];
                    let widget = self.widget_rect(r);
                    text(draw, r.x + 3.0 * pad, r, CHANNELS[channel.min(2)], MUTED);
                    draw.fill(widget, WIDGET_BG);
                    draw.fill(
                        Rect::new(widget.x, widget.y, widget.width * level, widget.height),
                        ACCENT.with_alpha(0.6),
                    );
                    let shown = format!("{}", (level * 255.0).round() as u8);
                    text(draw, widget.x + pad, r, &shown, TEXT);
                }
            }
        }

        draw.outline(frame, 1.0, Color::PANEL_BORDER);
    }
}

impl Drag {
    fn matches(self, kind: RowKind) -> bool {
        match (self, kind) {
            (Drag::Slider(a), RowKind::Control(b)) => a == b,
            (Drag::Channel(a, i), RowKind::Channel(b, j)) => a == b && i == j,
            _ => false,
        }
    }
}

fn send(panel: &Panel, control: Control, value: Value, target: &mut ControlTarget<'_>) {
    if let Err(err) = panel.dispatch(control, value, target) {
        log::warn!("panel: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::GeometryKind;
    use crate::scene::test_support::CountingBackend;
    use approx::assert_relative_eq;
    use std::time::Instant;

    const SURFACE_WIDTH: f32 = 800.0;

    fn row_of(view: &PanelView, panel: &Panel, kind: RowKind) -> Rect {
        view.layout(panel, SURFACE_WIDTH)
            .into_iter()
            .find(|row| row.kind == kind)
            .map(|row| row.rect)
            .unwrap()
    }

    fn click(
        view: &mut PanelView,
        panel: &mut Panel,
        scene: &mut Scene,
        backend: &mut CountingBackend,
        at: Vec2,
    ) -> bool {
        let mut input = Input::new();
        input.move_cursor(at);
        input.press_button(MouseButton::Left, Instant::now());
        let mut target = ControlTarget {
            scene,
            meshes: backend,
            now: 0.0,
        };
        let captured = view.update(panel, &input, at, &mut target, SURFACE_WIDTH);
        input.release_button(MouseButton::Left);
        input.begin_frame();
        view.update(panel, &input, at, &mut target, SURFACE_WIDTH);
        captured
    }

    fn centre(rect: Rect) -> Vec2 {
        Vec2::new(rect.x + rect.width / 2.0, rect.y + rect.height / 2.0)
    }

    #[test]
    fn starts_collapsed_at_the_top_right() {
        let view = PanelView::new(1.0);
        let panel = Panel::new();
        let rows = view.layout(&panel, SURFACE_WIDTH);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kind, RowKind::Title);
        assert_eq!(rows[0].rect, Rect::new(555.0, 0.0, 245.0, 24.0));
    }

    #[test]
    fn rows_scale_with_pixel_ratio() {
        let view = PanelView::new(2.0);
        let panel = Panel::new();
        let rows = view.layout(&panel, SURFACE_WIDTH);
        assert_eq!(rows[0].rect, Rect::new(310.0, 0.0, 490.0, 48.0));
    }

    #[test]
    fn title_and_folders_expand_on_click() {
        let mut backend = CountingBackend::default();
        let mut scene = Scene::new(&mut backend);
        let mut panel = Panel::new();
        let mut view = PanelView::new(1.0);

        let title = row_of(&view, &panel, RowKind::Title);
        assert!(click(&mut view, &mut panel, &mut scene, &mut backend, centre(title)));
        assert!(panel.open);
        assert_eq!(view.layout(&panel, SURFACE_WIDTH).len(), 1 + panel.folders.len());

        let folder = row_of(&view, &panel, RowKind::Folder(1));
        click(&mut view, &mut panel, &mut scene, &mut backend, centre(folder));
        assert!(panel.folders[1].open);
        let kinds: Vec<RowKind> = view
            .layout(&panel, SURFACE_WIDTH)
            .iter()
            .map(|row| row.kind)
            .collect();
        assert_eq!(kinds[3], RowKind::Control(Control::ScaleX));
        assert_eq!(kinds[5], RowKind::Control(Control::ScaleZ));
    }

    #[test]
    fn slider_click_sets_the_value_under_the_pointer() {
        let mut backend = CountingBackend::default();
        let mut scene = Scene::new(&mut backend);
        let mut panel = Panel::new();
        panel.open = true;
        panel.folders[0].open = true;
        let mut view = PanelView::new(1.0);

        let row = row_of(&view, &panel, RowKind::Control(Control::PositionX));
        let track = view.widget_rect(row);
        let right_end = Vec2::new(track.right() + 2.0, centre(row).y);
        click(&mut view, &mut panel, &mut scene, &mut backend, right_end);
        assert_relative_eq!(scene.object.position.x, 3.0);

        let middle = Vec2::new(track.x + track.width / 2.0, centre(row).y);
        click(&mut view, &mut panel, &mut scene, &mut backend, middle);
        assert_relative_eq!(scene.object.position.x, 0.0, epsilon = 1e-4);
        assert!(!view.is_dragging());
    }

    #[test]
    fn dropdown_option_selects_a_shape() {
        let mut backend = CountingBackend::default();
        let mut scene = Scene::new(&mut backend);
        let mut panel = Panel::new();
        panel.open = true;
        panel.folders[3].open = true;
        let mut view = PanelView::new(1.0);

        let shape = row_of(&view, &panel, RowKind::Control(Control::Shape));
        click(&mut view, &mut panel, &mut scene, &mut backend, centre(shape));
        let torus = row_of(&view, &panel, RowKind::Option(Control::Shape, 2));
        click(&mut view, &mut panel, &mut scene, &mut backend, centre(torus));

        assert_eq!(scene.object.kind, GeometryKind::Torus);
        assert!(
            !view
                .layout(&panel, SURFACE_WIDTH)
                .iter()
                .any(|row| matches!(row.kind, RowKind::Option(..)))
        );
    }

    #[test]
    fn toggles_flip_and_buttons_fire() {
        let mut backend = CountingBackend::default();
        let mut scene = Scene::new(&mut backend);
        let mut panel = Panel::new();
        panel.open = true;
        panel.folders[3].open = true;
        let mut view = PanelView::new(1.0);

        let wireframe = row_of(&view, &panel, RowKind::Control(Control::Wireframe));
        click(&mut view, &mut panel, &mut scene, &mut backend, centre(wireframe));
        assert!(scene.object.material.wireframe);

        let spin = row_of(&view, &panel, RowKind::Control(Control::Spin));
        click(&mut view, &mut panel, &mut scene, &mut backend, centre(spin));
        assert_eq!(scene.active_tweens(), 1);
    }

    #[test]
    fn color_channels_edit_one_component() {
        let mut backend = CountingBackend::default();
        let mut scene = Scene::new(&mut backend);
        let mut panel = Panel::new();
        panel.open = true;
        panel.folders[3].open = true;
        let mut view = PanelView::new(1.0);

        let picker = row_of(&view, &panel, RowKind::Control(Control::Color));
        click(&mut view, &mut panel, &mut scene, &mut backend, centre(picker));
        let green = row_of(&view, &panel, RowKind::Channel(Control::Color, 1));
        let track = view.widget_rect(green);
        click(&mut view, &mut panel, &mut scene, &mut backend, Vec2::new(track.x, centre(green).y));

        assert_eq!(scene.object.material.color, Color::rgb(1.0, 0.0, 1.0));
    }

    #[test]
    fn pointer_outside_is_not_captured() {
        let mut backend = CountingBackend::default();
        let mut scene = Scene::new(&mut backend);
        let mut panel = Panel::new();
        let mut view = PanelView::new(1.0);

        assert!(!click(&mut view, &mut panel, &mut scene, &mut backend, Vec2::new(10.0, 300.0)));
        assert!(!panel.open);

        panel.hidden = true;
        let title = Vec2::new(700.0, 10.0);
        assert!(!click(&mut view, &mut panel, &mut scene, &mut backend, title));
        assert!(!panel.open);
    }
}
