//! Easing curves and the one-shot spin tween.

use std::f32::consts::TAU;

/// Easing functions for tweens.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Easing {
    /// Start fast, decelerate.
    #[default]
    EaseOut,
}

impl Easing {
    /// Apply the easing function to a linear progress value (0.0 to 1.0).
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
        }
    }
}

/// An eased rotation of `amount` radians that starts at `start` (seconds).
///
/// Times are `f64` seconds since startup so progress stays smooth in long
/// sessions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpinTween {
    pub start: f64,
    pub duration: f64,
    pub amount: f32,
    pub easing: Easing,
}

impl SpinTween {
    /// One full turn over one second, decelerating.
    pub fn full_turn(start: f64) -> Self {
        Self {
            start,
            duration: 1.0,
            amount: TAU,
            easing: Easing::EaseOut,
        }
    }

    pub fn progress(&self, now: f64) -> f32 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        ((now - self.start) / self.duration).clamp(0.0, 1.0) as f32
    }

    /// Rotation contributed so far.
    pub fn offset(&self, now: f64) -> f32 {
        self.easing.apply(self.progress(now)) * self.amount
    }

    pub fn is_finished(&self, now: f64) -> bool {
        self.progress(now) >= 1.0
    }
}

/// Concurrently running spin tweens.
///
/// Tweens stack: starting a second spin while one is running adds another
/// full turn on top instead of restarting.
#[derive(Clone, Debug, Default)]
pub struct Tweens {
    active: Vec<SpinTween>,
}

impl Tweens {
    pub fn push(&mut self, tween: SpinTween) {
        self.active.push(tween);
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Combined in-flight rotation of every unfinished tween.
    pub fn offset(&self, now: f64) -> f32 {
        self.active
            .iter()
            .filter(|t| !t.is_finished(now))
            .map(|t| t.offset(now))
            .sum()
    }

    /// Drop finished tweens and return the total rotation they completed.
    pub fn settle(&mut self, now: f64) -> f32 {
        let mut done = 0.0;
        self.active.retain(|t| {
            if t.is_finished(now) {
                done += t.amount;
                false
            } else {
                true
            }
        });
        done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn ease_out_decelerates() {
        let e = Easing::EaseOut;
        assert_relative_eq!(e.apply(0.0), 0.0);
        assert_relative_eq!(e.apply(0.5), 0.75);
        assert_relative_eq!(e.apply(1.0), 1.0);
        assert_relative_eq!(e.apply(2.0), 1.0);
    }

    #[test]
    fn full_turn_spans_one_second() {
        let tween = SpinTween::full_turn(2.0);
        assert_relative_eq!(tween.offset(2.0), 0.0);
        assert!(!tween.is_finished(2.5));
        assert!(tween.offset(2.5) > TAU / 2.0);
        assert!(tween.is_finished(3.0));
        assert_relative_eq!(tween.offset(3.0), TAU);
    }

    #[test]
    fn progress_stays_smooth_after_days_of_uptime() {
        let start = 3.0 * 86_400.0;
        let tween = SpinTween::full_turn(start);
        assert_relative_eq!(tween.progress(start + 0.25), 0.25, epsilon = 1e-6);
        assert_relative_eq!(tween.progress(start + 0.75), 0.75, epsilon = 1e-6);
        assert!(!tween.is_finished(start + 0.999));
    }

    #[test]
    fn settle_moves_finished_turns_out_of_the_offset() {
        let mut tweens = Tweens::default();
        tweens.push(SpinTween::full_turn(0.0));
        tweens.push(SpinTween::full_turn(0.5));

        assert_relative_eq!(tweens.settle(0.9), 0.0);
        assert_eq!(tweens.len(), 2);

        assert_relative_eq!(tweens.settle(1.0), TAU);
        assert_eq!(tweens.len(), 1);
        assert_relative_eq!(tweens.offset(1.0), SpinTween::full_turn(0.5).offset(1.0));

        assert_relative_eq!(tweens.settle(1.5), TAU);
        assert!(tweens.is_empty());
    }
}
