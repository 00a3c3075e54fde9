//! Clock — счётчики тиков
//!
//! `ticks` сбрасывается блокировкой и бустом, отдаётся `uptime`.
//! `jiffies` монотонен и служит для `sleep(n)`.
//! `ticks` is reset by lock acquisition and boosting and is what `uptime`
//! reports. `jiffies` never goes back and drives timed sleep.

#[derive(Debug, Default)]
pub struct Clock {
    ticks: u32,
    jiffies: u64,
}

impl Clock {
    pub const fn new() -> Self {
        Self { ticks: 0, jiffies: 0 }
    }

    /// Один тик таймера / One timer tick.
    pub fn tick(&mut self) {
        self.ticks = self.ticks.wrapping_add(1);
        self.jiffies += 1;
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn jiffies(&self) -> u64 {
        self.jiffies
    }

    pub fn reset(&mut self) {
        self.ticks = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_keeps_jiffies() {
        let mut c = Clock::new();
        for _ in 0..5 {
            c.tick();
        }
        c.reset();
        c.tick();
        assert_eq!(c.ticks(), 1);
        assert_eq!(c.jiffies(), 6);
    }
}
