use crate::physics::STEP_MS;

/// Longest gap a single tick will catch up on, so a backgrounded tab does not
/// replay seconds of physics at once.
const MAX_CATCH_UP_MS: f64 = 100.0;

/// Fixed-timestep driver for the physics loop.
#[derive(Debug)]
pub struct Runner {
    delta_ms: f64,
    accumulator: f64,
    last_time: Option<f64>,
    running: bool,
    steps: u64,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new(STEP_MS as f64)
    }
}

impl Runner {
    pub fn new(delta_ms: f64) -> Self {
        Self {
            delta_ms,
            accumulator: 0.0,
            last_time: None,
            running: true,
            steps: 0,
        }
    }

    /// Feed the current clock time; calls `step` once per elapsed fixed delta.
    /// Returns how many steps ran.
    pub fn tick(&mut self, now_ms: f64, mut step: impl FnMut()) -> u32 {
        if !self.running {
            return 0;
        }
        let elapsed = match self.last_time.replace(now_ms) {
            Some(last) => (now_ms - last).clamp(0.0, MAX_CATCH_UP_MS),
            None => self.delta_ms,
        };
        self.accumulator += elapsed;

        let mut count = 0;
        while self.accumulator >= self.delta_ms {
            self.accumulator -= self.delta_ms;
            step();
            count += 1;
        }
        self.steps += count as u64;
        count
    }

    pub fn stop(&mut self) {
        self.running = false;
        self.accumulator = 0.0;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }
}
