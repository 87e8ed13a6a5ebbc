use log::{debug, warn};
use serde::Serialize;
use sobel_stream::diagnostics::TimingBreakdown;
use sobel_stream::edges::{GradientMethod, SobelWorkspace};
use sobel_stream::image::Plane;
use sobel_stream::lanes::LaneKind;
use sobel_stream::luma::{self, LumaMethod};
use sobel_stream::pipeline::{SyntheticPattern, SyntheticSource};
use std::env;
use std::time::Instant;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct KernelReport {
    width: usize,
    height: usize,
    iterations: usize,
    /// Per-iteration mean time of each kernel, in milliseconds.
    timing: TimingBreakdown,
    /// Kernels whose output differs from the scalar oracle.
    mismatches: Vec<String>,
}

fn run() -> Result<(), String> {
    let mut args = env::args().skip(1);
    let width = parse_arg(args.next(), "width", 640)?;
    let height = parse_arg(args.next(), "height", 480)?;
    let iterations = parse_arg(args.next(), "iterations", 50)?.max(1);

    let frame = SyntheticSource::new(width, height, SyntheticPattern::Checkerboard)
        .with_cell_size(7)
        .render(0);
    let started = Instant::now();
    let mut timing = TimingBreakdown::default();
    let mut mismatches = Vec::new();

    let mut reference = Plane::new(width, height);
    luma::convert_frame(
        LumaMethod::Scalar,
        LaneKind::Scalar,
        &frame.view(),
        &mut reference.view_mut(),
    );

    for method in LumaMethod::ALL {
        for lanes in LaneKind::ALL {
            let label = format!("luma/{}/{}", method.name(), lanes.name());
            let mut out = Plane::new(width, height);
            let elapsed = mean_ms(iterations, || {
                luma::convert_frame(method, lanes, &frame.view(), &mut out.view_mut());
            });
            let worst = out
                .data()
                .iter()
                .zip(reference.data())
                .map(|(&a, &b)| a.abs_diff(b))
                .max()
                .unwrap_or(0);
            if worst > 1 {
                warn!("{label} deviates from the reference by {worst} levels");
                mismatches.push(label.clone());
            }
            debug!("{label}: {elapsed:.3} ms");
            timing.push(label, elapsed);
        }
    }

    let mut oracle = reference.clone();
    let mut workspace = SobelWorkspace::with_size(width, height);
    GradientMethod::Scalar.kernel(LaneKind::Scalar).apply(
        &reference.view(),
        &mut oracle.view_mut(),
        &mut workspace,
    );

    for method in GradientMethod::ALL {
        for lanes in LaneKind::ALL {
            let label = format!("sobel/{}/{}", method.name(), lanes.name());
            let kernel = method.kernel(lanes);
            let mut out = reference.clone();
            let elapsed = mean_ms(iterations, || {
                kernel.apply(&reference.view(), &mut out.view_mut(), &mut workspace);
            });
            if out != oracle {
                warn!("{label} differs from the scalar oracle");
                mismatches.push(label.clone());
            }
            debug!("{label}: {elapsed:.3} ms");
            timing.push(label, elapsed);
        }
    }

    timing.total_ms = started.elapsed().as_secs_f64() * 1000.0;
    let report = KernelReport {
        width,
        height,
        iterations,
        timing,
        mismatches,
    };
    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| format!("Failed to serialize report: {e}"))?;
    println!("{json}");

    if report.mismatches.is_empty() {
        Ok(())
    } else {
        Err(format!("{} kernels disagree with the reference", report.mismatches.len()))
    }
}

fn mean_ms(iterations: usize, mut f: impl FnMut()) -> f64 {
    let start = Instant::now();
    for _ in 0..iterations {
        f();
    }
    start.elapsed().as_secs_f64() * 1000.0 / iterations as f64
}

fn parse_arg(arg: Option<String>, name: &str, default: usize) -> Result<usize, String> {
    match arg {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|e| format!("Invalid {name} {value:?}: {e}\n{}", usage())),
    }
}

fn usage() -> String {
    "Usage: kernel_timing [width] [height] [iterations]".to_string()
}
