//! Frame timing and the FPS overlay.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::assets::{Assets, FontId};
use crate::color::{Color, Rect};
use crate::draw2d::Draw2d;

/// Frames are counted over windows at least this long before FPS is published.
const FPS_WINDOW: Duration = Duration::from_secs(1);
/// Number of bars in the graph.
const HISTORY: usize = 74;

/// One measured quantity with its extremes and a short history.
#[derive(Clone, Debug)]
pub struct Series {
    pub current: f32,
    pub min: f32,
    pub max: f32,
    history: VecDeque<f32>,
}

impl Default for Series {
    fn default() -> Self {
        Self {
            current: 0.0,
            min: f32::INFINITY,
            max: 0.0,
            history: VecDeque::with_capacity(HISTORY),
        }
    }
}

impl Series {
    pub fn push(&mut self, value: f32) {
        self.current = value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        if self.history.len() == HISTORY {
            self.history.pop_front();
        }
        self.history.push_back(value);
    }

    pub fn history(&self) -> impl Iterator<Item = f32> + '_ {
        self.history.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

/// Rolling frame statistics.
///
/// Call [`FrameStats::update`] once per frame. Frame deltas are recorded every
/// frame; FPS is published whenever at least one second has passed since the
/// last publication.
#[derive(Clone, Debug, Default)]
pub struct FrameStats {
    last_frame: Option<Instant>,
    window_start: Option<Instant>,
    frames: u32,
    pub fps: Series,
    pub frame_ms: Series,
}

impl FrameStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, now: Instant) {
        if let Some(last) = self.last_frame {
            let dt = now.saturating_duration_since(last);
            self.frame_ms.push(dt.as_secs_f32() * 1000.0);
        }
        self.last_frame = Some(now);

        // The first frame only opens the window; it completes no interval.
        let Some(start) = self.window_start else {
            self.window_start = Some(now);
            return;
        };
        self.frames = self.frames.saturating_add(1);

        let elapsed = now.saturating_duration_since(start);
        if elapsed >= FPS_WINDOW {
            let fps = self.frames as f32 / elapsed.as_secs_f32();
            self.fps.push(fps.round());
            self.frames = 0;
            self.window_start = Some(now);
        }
    }

    /// Readout text, e.g. `60 FPS (58-61)`.
    pub fn label(&self) -> String {
        if self.fps.is_empty() {
            return "-- FPS".to_string();
        }
        format!(
            "{:.0} FPS ({:.0}-{:.0})",
            self.fps.current, self.fps.min, self.fps.max
        )
    }

    /// Draw the overlay at the top-left corner, `scale` times its base size.
    pub fn draw(&self, draw: &mut Draw2d, assets: &Assets, font: Option<FontId>, scale: f32) {
        const BG: Color = Color::from_hex(0x000022);
        const FG: Color = Color::from_hex(0x00ffff);
        const GRAPH_BG: Color = Color::from_hex(0x002233);

        let panel = Rect::new(0.0, 0.0, 80.0 * scale, 48.0 * scale);
        draw.fill(panel, BG.with_alpha(0.9));

        if let Some(font) = font {
            draw.text(assets, font, 3.0 * scale, 2.0 * scale, &self.label(), FG);
        }

        let graph = Rect::new(3.0 * scale, 15.0 * scale, 74.0 * scale, 30.0 * scale);
        draw.fill(graph, GRAPH_BG);

        let top = self.fps.max.max(1.0);
        let bar_width = graph.width / HISTORY as f32;
        let count = self.fps.history.len();
        for (i, value) in self.fps.history().enumerate() {
            let x = graph.right() - (count - i) as f32 * bar_width;
            let height = (value / top).clamp(0.0, 1.0) * graph.height;
            draw.fill(
                Rect::new(x, graph.bottom() - height, bar_width, height),
                FG,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn run_frames(stats: &mut FrameStats, start: Instant, count: u32, step: Duration) -> Instant {
        let mut now = start;
        for _ in 0..count {
            now += step;
            stats.update(now);
        }
        now
    }

    #[test]
    fn fps_waits_for_a_full_second() {
        let mut stats = FrameStats::new();
        let t0 = Instant::now();
        stats.update(t0);
        run_frames(&mut stats, t0, 30, Duration::from_millis(20));
        assert!(stats.fps.is_empty());
        assert_eq!(stats.label(), "-- FPS");
    }

    #[test]
    fn steady_frames_report_their_rate() {
        let mut stats = FrameStats::new();
        let t0 = Instant::now();
        stats.update(t0);
        // 50 frames, 20 ms apart: the window closes on the 50th
        run_frames(&mut stats, t0, 50, Duration::from_millis(20));

        assert_eq!(stats.fps.current, 50.0);
        assert_relative_eq!(stats.frame_ms.current, 20.0, epsilon = 1e-3);
        assert_eq!(stats.label(), "50 FPS (50-50)");
    }

    #[test]
    fn min_and_max_track_changes() {
        let mut stats = FrameStats::new();
        let t0 = Instant::now();
        stats.update(t0);
        let t1 = run_frames(&mut stats, t0, 100, Duration::from_millis(10));
        run_frames(&mut stats, t1, 40, Duration::from_millis(25));

        assert_eq!(stats.fps.max, 100.0);
        assert_eq!(stats.fps.min, 40.0);
        assert_eq!(stats.fps.history().count(), 2);
    }

    #[test]
    fn history_is_bounded() {
        let mut series = Series::default();
        for i in 0..500 {
            series.push(i as f32);
        }
        assert_eq!(series.history().count(), HISTORY);
        assert_eq!(series.history().last(), Some(499.0));
        assert_eq!(series.min, 0.0);
    }
}
