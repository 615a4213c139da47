use tracing::warn;

/// Turns variable frame deltas into a whole number of fixed steps.
#[derive(Clone, Debug)]
pub struct TimeAccumulator {
    accumulated_time: f32,
    frame_number: u64,
    num_steps: u32,
    max_steps: u32,
    step_secs: f32,
}

impl TimeAccumulator {
    pub fn new(step_secs: f32, max_steps: u32) -> Self {
        TimeAccumulator {
            accumulated_time: 0.0,
            frame_number: 0,
            num_steps: 0,
            max_steps: max_steps.max(1),
            step_secs,
        }
    }

    /// Adds `delta` seconds and works out how many steps are due.
    pub fn update(&mut self, delta: f32) -> u32 {
        self.frame_number += 1;
        if delta.is_finite() && delta > 0.0 {
            self.accumulated_time += delta;
        }
        self.num_steps = (self.accumulated_time / self.step_secs).floor() as u32;
        if self.num_steps > self.max_steps {
            warn!(
                steps = self.num_steps,
                delta,
                accumulated = self.accumulated_time,
                rate = self.step_secs,
                "capping physics steps"
            );
            self.accumulated_time = 0.0;
            self.num_steps = self.max_steps;
        } else {
            self.accumulated_time -= self.step_secs * self.num_steps as f32;
            // float drift can leave a hair below zero
            self.accumulated_time = self.accumulated_time.max(0.0);
        }
        self.num_steps
    }

    pub fn step_secs(&self) -> f32 {
        self.step_secs
    }

    pub fn set_step_secs(&mut self, step_secs: f32) {
        self.step_secs = step_secs;
    }

    pub fn set_max_steps(&mut self, max_steps: u32) {
        self.max_steps = max_steps.max(1);
    }

    pub fn num_steps(&self) -> u32 {
        self.num_steps
    }

    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Time carried over to the next update, in seconds.
    pub fn remainder(&self) -> f32 {
        self.accumulated_time
    }

    pub fn reset(&mut self) {
        self.accumulated_time = 0.0;
        self.num_steps = 0;
    }
}
