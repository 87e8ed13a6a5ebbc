//! Performance-counter seam sampled around each pipeline stage.
use serde::Serialize;
use std::time::Instant;

/// Counter values accumulated between a `start` and the matching `stop`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct CounterSample {
    pub cycles: u64,
    pub instructions: u64,
    pub l1_misses: u64,
}

impl CounterSample {
    pub fn accumulate(&mut self, other: &CounterSample) {
        self.cycles += other.cycles;
        self.instructions += other.instructions;
        self.l1_misses += other.l1_misses;
    }
}

/// Per-thread counter set. Each worker owns its own instance.
pub trait PerfCounters: Send {
    fn start(&mut self);
    fn stop(&mut self) -> CounterSample;
}

/// Derives cycle counts from wall-clock time at a nominal clock rate.
///
/// Instruction and L1-miss counts need hardware sampling and are reported as
/// zero.
#[derive(Debug)]
pub struct WallClockCounters {
    proc_freq_hz: f64,
    started: Option<Instant>,
}

impl WallClockCounters {
    pub fn new(proc_freq_hz: f64) -> Self {
        Self {
            proc_freq_hz,
            started: None,
        }
    }
}

impl PerfCounters for WallClockCounters {
    fn start(&mut self) {
        self.started = Some(Instant::now());
    }

    fn stop(&mut self) -> CounterSample {
        let elapsed = self
            .started
            .take()
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        CounterSample {
            cycles: (elapsed * self.proc_freq_hz).round() as u64,
            ..CounterSample::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn wall_clock_counts_cycles_at_nominal_rate() {
        let mut counters = WallClockCounters::new(1.0e9);
        counters.start();
        std::thread::sleep(Duration::from_millis(2));
        let sample = counters.stop();
        assert!(sample.cycles >= 2_000_000, "cycles={}", sample.cycles);
        assert_eq!(sample.instructions, 0);
        assert_eq!(sample.l1_misses, 0);
    }

    #[test]
    fn stop_without_start_is_zero() {
        let mut counters = WallClockCounters::new(1.0e9);
        assert_eq!(counters.stop(), CounterSample::default());
    }
}
