//! Per-frame performance accumulators and the end-of-run report.
//!
//! [`PipelineStats`] is owned by the controller and advanced once per
//! completed frame. [`StatsReport`] derives the summary figures and renders
//! them as the `mt_perf.csv` text layout or as JSON.
use super::counters::CounterSample;
use crate::diagnostics::TimingBreakdown;
use crate::image::io::{write_json_file, write_text_file};
use log::warn;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;

/// Nominal platform constants used to turn cycle counts into rates and energy.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PerfModel {
    pub proc_freq_hz: f64,
    /// Power drawn by one active core, in watts.
    pub core_power_watts: f64,
    pub cores: u32,
}

impl Default for PerfModel {
    fn default() -> Self {
        Self {
            proc_freq_hz: 1.2e9,
            core_power_watts: 0.5,
            cores: 2,
        }
    }
}

/// Counter readings of one worker for one frame, split by stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct FrameSample {
    pub capture: CounterSample,
    pub grayscale: CounterSample,
    pub sobel: CounterSample,
    pub display: CounterSample,
}

impl FrameSample {
    pub fn total(&self) -> CounterSample {
        let mut total = self.capture;
        for stage in [&self.grayscale, &self.sobel, &self.display] {
            total.accumulate(stage);
        }
        total
    }
}

/// Run-long accumulators. Values only grow.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PipelineStats {
    frames: u64,
    capture_cycles: f64,
    grayscale_cycles: f64,
    sobel_cycles: f64,
    display_cycles: f64,
    instructions: f64,
    l1_misses: f64,
    fps_sum: f64,
    ipc_sum: f64,
    /// Frames with a non-zero cycle count; the per-frame rate averages run
    /// over these only.
    timed_frames: u64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Fold one completed frame into the accumulators.
    pub fn record(&mut self, sample: &FrameSample, model: &PerfModel) {
        let total = sample.total();
        self.capture_cycles += sample.capture.cycles as f64;
        self.grayscale_cycles += sample.grayscale.cycles as f64;
        self.sobel_cycles += sample.sobel.cycles as f64;
        self.display_cycles += sample.display.cycles as f64;
        self.instructions += total.instructions as f64;
        self.l1_misses += total.l1_misses as f64;
        if total.cycles > 0 {
            let cycles = total.cycles as f64;
            self.fps_sum += model.proc_freq_hz / cycles;
            self.ipc_sum += total.instructions as f64 / cycles;
            self.timed_frames += 1;
        } else {
            warn!(
                "PipelineStats frame {} has no cycles; left out of the rate averages",
                self.frames + 1
            );
        }
        self.frames += 1;
    }

    /// Controller time per stage in milliseconds, at the model's clock rate.
    pub fn timing(&self, model: &PerfModel, total_ms: f64) -> TimingBreakdown {
        let to_ms = |cycles: f64| ratio(cycles, model.proc_freq_hz).unwrap_or(0.0) * 1000.0;
        let mut timing = TimingBreakdown::with_total(total_ms);
        timing.push("capture", to_ms(self.capture_cycles));
        timing.push("grayscale", to_ms(self.grayscale_cycles));
        timing.push("sobel", to_ms(self.sobel_cycles));
        timing.push("display", to_ms(self.display_cycles));
        timing
    }

    pub fn report(&self, model: &PerfModel) -> StatsReport {
        let frames = self.frames as f64;
        let total_cycles =
            self.capture_cycles + self.grayscale_cycles + self.sobel_cycles + self.display_cycles;
        let share = |part: f64| ratio(part, total_cycles).map(|r| r * 100.0);
        let fps = ratio(self.fps_sum, self.timed_frames as f64);
        let energy_per_frame_mj = fps
            .and_then(|fps| ratio(model.core_power_watts * f64::from(model.cores), fps))
            .map(|joules| joules * 1000.0);

        StatsReport {
            capture_pct: share(self.capture_cycles),
            grayscale_pct: share(self.grayscale_cycles),
            sobel_pct: share(self.sobel_cycles),
            display_pct: share(self.display_cycles),
            frames_per_second: fps,
            cycles_per_frame: ratio(total_cycles, frames),
            energy_per_frame_mj,
            total_frames: self.frames,
            instructions_per_cycle: ratio(self.ipc_sum, self.timed_frames as f64),
            l1_misses_per_frame: ratio(self.l1_misses, frames),
            l1_misses_per_instruction: ratio(self.l1_misses, self.instructions),
            instructions_per_frame: ratio(self.instructions, frames),
        }
    }
}

/// `num / den`, or `None` when the quotient is undefined.
#[inline]
fn ratio(num: f64, den: f64) -> Option<f64> {
    (den != 0.0 && den.is_finite()).then(|| num / den)
}

/// Summary figures; `None` marks a quantity with a zero denominator.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsReport {
    pub capture_pct: Option<f64>,
    pub grayscale_pct: Option<f64>,
    pub sobel_pct: Option<f64>,
    pub display_pct: Option<f64>,
    pub frames_per_second: Option<f64>,
    pub cycles_per_frame: Option<f64>,
    pub energy_per_frame_mj: Option<f64>,
    pub total_frames: u64,
    pub instructions_per_cycle: Option<f64>,
    pub l1_misses_per_frame: Option<f64>,
    pub l1_misses_per_instruction: Option<f64>,
    pub instructions_per_frame: Option<f64>,
}

impl StatsReport {
    /// Render the report in the `mt_perf.csv` layout.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        let mut line = |label: &str, value: String| {
            let _ = writeln!(out, "{label}, {value}");
        };
        let pct = |v: Option<f64>| match v {
            Some(v) => format!("{}%", format_general(v)),
            None => "N/A".to_string(),
        };
        let num = |v: Option<f64>| v.map_or_else(|| "N/A".to_string(), format_general);

        line("Percent of time per function\nCapture", pct(self.capture_pct));
        line("Grayscale", pct(self.grayscale_pct));
        line("Sobel", pct(self.sobel_pct));
        line("Display", pct(self.display_pct));
        line("\nSummary\nFrames per second", num(self.frames_per_second));
        line("Cycles per frame", num(self.cycles_per_frame));
        line("Energy per frames (mJ)", num(self.energy_per_frame_mj));
        line("Total frames", self.total_frames.to_string());
        line(
            "\nHardware Stats (Cap + Gray + Sobel + Display)\nInstructions per cycle",
            num(self.instructions_per_cycle),
        );
        line("L1 misses per frame", num(self.l1_misses_per_frame));
        line("L1 misses per instruction", num(self.l1_misses_per_instruction));
        line("Instruction count per frame", num(self.instructions_per_frame));
        out
    }

    pub fn write_csv(&self, path: &Path) -> Result<(), String> {
        write_text_file(path, &self.to_csv())
    }

    pub fn write_json(&self, path: &Path) -> Result<(), String> {
        write_json_file(path, self)
    }
}

/// Format like a default-configured C++ output stream (`%g`, 6 significant
/// digits, trailing zeros removed).
pub fn format_general(v: f64) -> String {
    const PRECISION: i32 = 6;
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if v == 0.0 {
        return "0".to_string();
    }

    // Exponent after rounding to the target precision.
    let sci = format!("{:.*e}", (PRECISION - 1) as usize, v);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if exp < -4 || exp >= PRECISION {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_fraction(mantissa), exp.abs())
    } else {
        let decimals = (PRECISION - 1 - exp).max(0) as usize;
        trim_fraction(&format!("{v:.decimals$}")).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(cap: u64, gray: u64, sobel: u64, disp: u64, ic: u64, l1: u64) -> FrameSample {
        let c = |cycles| CounterSample {
            cycles,
            instructions: ic / 4,
            l1_misses: l1 / 4,
        };
        FrameSample {
            capture: c(cap),
            grayscale: c(gray),
            sobel: c(sobel),
            display: c(disp),
        }
    }

    #[test]
    fn general_format_matches_iostream_defaults() {
        assert_eq!(format_general(0.0), "0");
        assert_eq!(format_general(25.0), "25");
        assert_eq!(format_general(33.333333333), "33.3333");
        assert_eq!(format_general(1_200_000.0), "1.2e+06");
        assert_eq!(format_general(999_999.4), "999999");
        assert_eq!(format_general(999_999.6), "1e+06");
        assert_eq!(format_general(0.000_123_456_7), "0.000123457");
        assert_eq!(format_general(0.000_012_5), "1.25e-05");
        assert_eq!(format_general(-2.5), "-2.5");
        assert_eq!(format_general(f64::NAN), "nan");
    }

    #[test]
    fn zero_frames_report_is_all_sentinels() {
        let report = PipelineStats::new().report(&PerfModel::default());
        assert_eq!(report.total_frames, 0);
        assert!(report.frames_per_second.is_none());
        assert!(report.energy_per_frame_mj.is_none());
        let csv = report.to_csv();
        assert!(!csv.contains("NaN") && !csv.contains("nan") && !csv.contains("inf"));
        assert!(csv.contains("Capture, N/A\n"));
        assert!(csv.contains("Total frames, 0\n"));
    }

    #[test]
    fn csv_layout_is_stable() {
        let model = PerfModel {
            proc_freq_hz: 1000.0,
            core_power_watts: 0.5,
            cores: 2,
        };
        let mut stats = PipelineStats::new();
        stats.record(&sample(10, 20, 60, 10, 400, 40), &model);
        stats.record(&sample(10, 20, 60, 10, 400, 40), &model);
        let csv = stats.report(&model).to_csv();
        let expected = "\
Percent of time per function
Capture, 10%
Grayscale, 20%
Sobel, 60%
Display, 10%

Summary
Frames per second, 10
Cycles per frame, 100
Energy per frames (mJ), 100
Total frames, 2

Hardware Stats (Cap + Gray + Sobel + Display)
Instructions per cycle, 4
L1 misses per frame, 40
L1 misses per instruction, 0.1
Instruction count per frame, 400
";
        assert_eq!(csv, expected);
    }

    #[test]
    fn accumulators_only_grow() {
        let model = PerfModel::default();
        let mut stats = PipelineStats::new();
        let mut last = stats.report(&model);
        for i in 1..5u64 {
            stats.record(&sample(i, i, i, i, 4 * i, 4), &model);
            let next = stats.report(&model);
            assert!(next.total_frames > last.total_frames);
            last = next;
        }
        assert_eq!(stats.frames(), 4);
    }

    #[test]
    fn untimed_frames_do_not_dilute_rates() {
        let model = PerfModel {
            proc_freq_hz: 1000.0,
            ..PerfModel::default()
        };
        let mut stats = PipelineStats::new();
        stats.record(&sample(10, 20, 60, 10, 400, 40), &model);
        stats.record(&sample(0, 0, 0, 0, 0, 0), &model);
        let report = stats.report(&model);
        assert_eq!(report.total_frames, 2);
        assert_eq!(report.frames_per_second, Some(10.0));
        assert_eq!(report.instructions_per_cycle, Some(4.0));
        assert_eq!(report.cycles_per_frame, Some(50.0));

        let mut untimed = PipelineStats::new();
        untimed.record(&sample(0, 0, 0, 0, 0, 0), &model);
        assert_eq!(untimed.frames(), 1);
        assert!(untimed.report(&model).frames_per_second.is_none());
    }

    #[test]
    fn timing_converts_cycles_to_milliseconds() {
        let model = PerfModel {
            proc_freq_hz: 1000.0,
            ..PerfModel::default()
        };
        let mut stats = PipelineStats::new();
        stats.record(&sample(10, 20, 60, 10, 0, 0), &model);
        let timing = stats.timing(&model, 150.0);
        assert_eq!(timing.total_ms, 150.0);
        let labels: Vec<&str> = timing.stages.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, ["capture", "grayscale", "sobel", "display"]);
        assert!((timing.stages[2].elapsed_ms - 60.0).abs() < 1e-9);
    }

    #[test]
    fn json_report_uses_null_for_missing_values() {
        let report = PipelineStats::new().report(&PerfModel::default());
        let json = serde_json::to_value(&report).unwrap();
        assert!(json["framesPerSecond"].is_null());
        assert_eq!(json["totalFrames"], 0);
    }
}
