use types::Tick;

/// Instruction-counting clock with a periodic timer.
#[derive(Debug, Clone)]
pub struct Clock {
    now: Tick,
    timer_interval: Tick,
    next_timer: Tick,
}

impl Clock {
    pub fn new(timer_interval: Tick) -> Self {
        let interval = timer_interval.max(1);
        Self {
            now: 0,
            timer_interval: interval,
            next_timer: interval,
        }
    }

    pub fn now(&self) -> Tick {
        self.now
    }

    pub fn tick(&mut self) -> Tick {
        self.now += 1;
        self.now
    }

    /// Move the clock forward without executing anything.
    pub fn advance(&mut self, ticks: Tick) -> Tick {
        self.now += ticks;
        self.now
    }

    /// True once per elapsed timer interval.
    pub fn timer_due(&mut self) -> bool {
        if self.now < self.next_timer {
            return false;
        }
        while self.next_timer <= self.now {
            self.next_timer += self.timer_interval;
        }
        true
    }

    pub fn timer_interval(&self) -> Tick {
        self.timer_interval
    }
}
