use cadence_schedule::timing::{exponential_backoff, human_delay, random_break};
use cadence_schedule::{ActivityScheduler, mouse_path, scroll_plan, typing_plan};
use rand::Rng;
use serde::Serialize;
use std::time::Duration;

const SAMPLE_NOTE: &str = "Thanks, talk soon.";
const TYPO_PROBABILITY: f64 = 0.02;

/// One draw from every delay generator, in milliseconds unless named otherwise.
#[derive(Debug, Serialize)]
pub struct Sample {
    pub think_ms: u64,
    pub typing_ms: u64,
    pub scroll_ms: u64,
    pub page_load_ms: u64,
    pub action_interval_secs: u64,
    pub rhythm_ms: u64,
    pub break_minutes: u64,
    pub human_delay_ms: u64,
    pub random_break_minutes: Option<u64>,
    pub backoff_ms: Vec<u64>,
    pub note_typing_ms: u64,
    pub note_keystrokes: usize,
    pub scroll_steps: usize,
    pub mouse_points: usize,
}

fn ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

pub fn draw<R: Rng + ?Sized>(scheduler: &ActivityScheduler, rng: &mut R) -> Sample {
    let backoff_ms = (0..5)
        .map(|attempt| {
            ms(exponential_backoff(
                rng,
                attempt,
                Duration::from_millis(500),
                Duration::from_secs(30),
            ))
        })
        .collect();
    let note = typing_plan(rng, SAMPLE_NOTE, 50, 200, TYPO_PROBABILITY);

    Sample {
        think_ms: ms(scheduler.think_time()),
        typing_ms: ms(scheduler.typing_delay()),
        scroll_ms: ms(scheduler.scroll_delay()),
        page_load_ms: ms(scheduler.page_load_wait()),
        action_interval_secs: scheduler.action_interval().as_secs(),
        rhythm_ms: ms(scheduler.simulate_human_rhythm()),
        break_minutes: scheduler.break_duration().as_secs() / 60,
        human_delay_ms: ms(human_delay(rng, 300, 900)),
        random_break_minutes: random_break(rng).map(|d| d.as_secs() / 60),
        backoff_ms,
        note_typing_ms: ms(note.total_pause()),
        note_keystrokes: note.strokes.len(),
        scroll_steps: scroll_plan(rng, 800.0).steps.len(),
        mouse_points: mouse_path(rng, (40.0, 60.0), (720.0, 480.0)).steps.len(),
    }
}
