use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerState {
    Running,
    Paused,
    Expired,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    Continue(Duration),
    Expired,
    Idle,
}

/// Per-question countdown. The caller drives it with `tick`; it never
/// schedules anything itself.
#[derive(Clone, Debug)]
pub struct Countdown {
    limit: Duration,
    remaining: Duration,
    state: TimerState,
}

impl Countdown {
    pub fn new(limit: Duration) -> Self {
        Self {
            limit,
            remaining: limit,
            state: TimerState::Running,
        }
    }

    pub fn from_secs(secs: u32) -> Option<Self> {
        (secs > 0).then(|| Self::new(Duration::from_secs(secs as u64)))
    }

    pub fn tick(&mut self, elapsed: Duration) -> Tick {
        if self.state != TimerState::Running {
            return Tick::Idle;
        }
        self.remaining = self.remaining.saturating_sub(elapsed);
        if self.remaining.is_zero() {
            self.state = TimerState::Expired;
            Tick::Expired
        } else {
            Tick::Continue(self.remaining)
        }
    }

    pub fn pause(&mut self) {
        if self.state == TimerState::Running {
            self.state = TimerState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.state == TimerState::Paused {
            self.state = TimerState::Running;
        }
    }

    /// Full time again, for the next question.
    pub fn restart(&mut self) {
        self.remaining = self.limit;
        self.state = TimerState::Running;
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_expired(&self) -> bool {
        self.state == TimerState::Expired
    }
}
