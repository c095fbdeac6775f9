//! Keystroke, scroll and pointer pacing plans.
//!
//! A plan is just numbers: the page driver replays it, interleaving the
//! pauses with its own key presses, scroll calls or pointer moves.

use crate::timing::{random_delay, uniform_ms, with_distraction};
use rand::Rng;
use std::time::Duration;

const PUNCTUATION_PAUSE: Duration = Duration::from_millis(50);
const THINKING_PROBABILITY: f64 = 0.05;
const SCROLL_BACK_PROBABILITY: f64 = 0.15;
const CONTROL_JITTER_PX: f64 = 25.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// The intended character.
    Char(char),
    /// A wrong letter, always followed by a [`KeyAction::Backspace`].
    Typo(char),
    Backspace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStroke {
    pub action: KeyAction,
    /// Pause after the key.
    pub pause: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypingPlan {
    /// Pause after focusing the field, before the first key.
    pub lead_in: Duration,
    pub strokes: Vec<KeyStroke>,
    /// Pause after the last key.
    pub tail: Duration,
}

impl TypingPlan {
    pub fn total_pause(&self) -> Duration {
        self.lead_in + self.strokes.iter().map(|k| k.pause).sum::<Duration>() + self.tail
    }

    /// What ends up in the field once every stroke is replayed.
    pub fn typed_text(&self) -> String {
        let mut out = String::new();
        for stroke in &self.strokes {
            match stroke.action {
                KeyAction::Char(c) | KeyAction::Typo(c) => out.push(c),
                KeyAction::Backspace => {
                    out.pop();
                }
            }
        }
        out
    }
}

/// Key events for typing `text`, each key pause drawn from `[min_ms, max_ms)`.
///
/// Spaces, periods and commas linger a little longer, and now and then a
/// keystroke is followed by a thinking pause. With `typo_probability` a
/// letter is preceded by a wrong one, a 200–499 ms pause to notice it and
/// a backspace. The last character is never mistyped.
pub fn typing_plan<R: Rng + ?Sized>(
    rng: &mut R,
    text: &str,
    min_ms: u64,
    max_ms: u64,
    typo_probability: f64,
) -> TypingPlan {
    let lead_in = uniform_ms(rng, 100, 200);
    let count = text.chars().count();
    let mut strokes = Vec::with_capacity(count);

    for (i, ch) in text.chars().enumerate() {
        if typo_probability > 0.0 && i + 1 < count && rng.gen::<f64>() < typo_probability {
            strokes.push(KeyStroke {
                action: KeyAction::Typo(wrong_letter(rng, ch)),
                pause: random_delay(rng, min_ms, max_ms) + uniform_ms(rng, 200, 300),
            });
            strokes.push(KeyStroke {
                action: KeyAction::Backspace,
                pause: uniform_ms(rng, 50, 100),
            });
        }

        let mut pause = random_delay(rng, min_ms, max_ms);
        if matches!(ch, ' ' | '.' | ',') {
            pause += PUNCTUATION_PAUSE;
        }
        strokes.push(KeyStroke {
            action: KeyAction::Char(ch),
            pause: with_distraction(rng, pause, THINKING_PROBABILITY, 300, 500),
        });
    }

    TypingPlan {
        lead_in,
        strokes,
        tail: uniform_ms(rng, 200, 300),
    }
}

fn wrong_letter<R: Rng + ?Sized>(rng: &mut R, intended: char) -> char {
    let mut letter = rng.gen_range(b'a'..=b'y');
    if char::from(letter) == intended.to_ascii_lowercase() {
        letter = b'z';
    }
    char::from(letter)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollStep {
    /// Pixels to scroll in this step; negative scrolls up.
    pub offset: f64,
    /// Pause after the step.
    pub pause: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScrollPlan {
    pub steps: Vec<ScrollStep>,
    /// Optional small correction in the opposite direction, after a pause.
    pub scroll_back: Option<ScrollStep>,
}

impl ScrollPlan {
    pub fn total_offset(&self) -> f64 {
        self.steps.iter().map(|s| s.offset).sum::<f64>()
            + self.scroll_back.map_or(0.0, |s| s.offset)
    }

    pub fn total_pause(&self) -> Duration {
        self.steps.iter().map(|s| s.pause).sum::<Duration>()
            + self.scroll_back.map_or(Duration::ZERO, |s| s.pause)
    }
}

/// Split a scroll of `distance` pixels into 5–14 eased steps: speeding up
/// over the first 30%, slowing down over the last 30%.
pub fn scroll_plan<R: Rng + ?Sized>(rng: &mut R, distance: f64) -> ScrollPlan {
    let count: u32 = 5 + rng.gen_range(0..10);
    let step = distance / f64::from(count);

    let steps = (0..count)
        .map(|i| {
            let progress = f64::from(i) / f64::from(count);
            let speed = if progress < 0.3 {
                progress * 3.0
            } else if progress > 0.7 {
                (1.0 - progress) * 3.0
            } else {
                1.0
            };
            ScrollStep {
                offset: step * (0.5 + speed),
                pause: uniform_ms(rng, 30, 50),
            }
        })
        .collect();

    let scroll_back = (rng.gen::<f64>() < SCROLL_BACK_PROBABILITY).then(|| ScrollStep {
        offset: -distance * 0.1,
        pause: uniform_ms(rng, 200, 300),
    });

    ScrollPlan { steps, scroll_back }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseStep {
    pub x: f64,
    pub y: f64,
    /// Pause after moving here.
    pub pause: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MousePath {
    pub steps: Vec<MouseStep>,
}

impl MousePath {
    pub fn total_pause(&self) -> Duration {
        self.steps.iter().map(|s| s.pause).sum()
    }
}

/// A cubic Bézier from `from` to `to` sampled at 15–24 points.
///
/// Control points sit a quarter and three quarters of the way along,
/// each nudged by up to 25 px. Moves are slow near the ends (15–24 ms)
/// and quick in the middle (5–9 ms).
pub fn mouse_path<R: Rng + ?Sized>(rng: &mut R, from: (f64, f64), to: (f64, f64)) -> MousePath {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let mut control = |share: f64| {
        (
            from.0 + dx * share + rng.gen_range(-CONTROL_JITTER_PX..CONTROL_JITTER_PX),
            from.1 + dy * share + rng.gen_range(-CONTROL_JITTER_PX..CONTROL_JITTER_PX),
        )
    };
    let (c1, c2) = (control(0.25), control(0.75));

    let count: u32 = 15 + rng.gen_range(0..10);
    let steps = (0..count)
        .map(|i| {
            let t = f64::from(i) / f64::from(count - 1);
            let (x, y) = bezier(from, c1, c2, to, t);
            let progress = f64::from(i) / f64::from(count);
            let pause = if progress < 0.2 || progress > 0.8 {
                uniform_ms(rng, 15, 10)
            } else {
                uniform_ms(rng, 5, 5)
            };
            MouseStep { x, y, pause }
        })
        .collect();

    MousePath { steps }
}

fn bezier(p0: (f64, f64), p1: (f64, f64), p2: (f64, f64), p3: (f64, f64), t: f64) -> (f64, f64) {
    let u = 1.0 - t;
    let (a, b, c, d) = (u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t);
    (
        a * p0.0 + b * p1.0 + c * p2.0 + d * p3.0,
        a * p0.1 + b * p1.1 + c * p2.1 + d * p3.1,
    )
}
