//! Two-worker, barrier-synchronised frame loop.
//!
//! Both workers run the same loop. The first to reach the election becomes the
//! controller (top half); the other processes the bottom half. Per frame:
//!
//! 1. acquire  – controller pulls a frame from the source and validates it;
//! 2. convert  – each worker converts its half to luminance;
//! 3. gradient – each worker seeds its output half and runs the kernel;
//! 4. finalize – controller stacks the halves, presents the plane, records
//!    statistics and decides whether to stop.
//!
//! Every stage ends at a barrier, and both workers count the barriers they
//! cross. A stop decided on the way to barrier N records N as the stop point;
//! each worker compares it with the barrier it has just crossed, so both
//! leave the loop together right after barrier N. A worker that unwinds
//! outside a stage records its failure the same way and still meets its
//! peer at the barrier it owes.
use super::counters::{PerfCounters, WallClockCounters};
use super::role::{Role, RoleElection};
use super::sink::FrameSink;
use super::source::FrameSource;
use super::stats::{FrameSample, PerfModel, PipelineStats, StatsReport};
use super::PipelineError;
use crate::diagnostics::TimingBreakdown;
use crate::edges::{BorderFill, GradientMethod, SobelWorkspace};
use crate::image::{Frame, Plane};
use crate::lanes::LaneKind;
use crate::luma::{self, LumaMethod};
use log::{debug, info, warn};
use serde::Serialize;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{
    Arc, Barrier, Mutex, MutexGuard, OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard,
};
use std::thread;
use std::time::Instant;

const WORKERS: usize = 2;

/// Static parameters of a pipeline run.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOptions {
    pub width: usize,
    pub height: usize,
    pub luma: LumaMethod,
    pub gradient: GradientMethod,
    pub lanes: LaneKind,
    pub border: BorderFill,
    /// Stop after this many frames; 0 runs until the source is exhausted or a
    /// stop is requested.
    pub max_frames: u64,
    pub perf: PerfModel,
}

impl PipelineOptions {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            luma: LumaMethod::default(),
            gradient: GradientMethod::default(),
            lanes: LaneKind::default(),
            border: BorderFill::default(),
            max_frames: 0,
            perf: PerfModel::default(),
        }
    }

    pub fn with_max_frames(mut self, frames: u64) -> Self {
        self.max_frames = frames;
        self
    }

    pub fn with_kernels(mut self, luma: LumaMethod, gradient: GradientMethod, lanes: LaneKind) -> Self {
        self.luma = luma;
        self.gradient = gradient;
        self.lanes = lanes;
        self
    }

    pub fn with_border(mut self, border: BorderFill) -> Self {
        self.border = border;
        self
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.width == 0 || self.height == 0 {
            return Err(PipelineError::InvalidConfig(format!(
                "frame size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if !(self.perf.proc_freq_hz > 0.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "proc_freq_hz must be positive, got {}",
                self.perf.proc_freq_hz
            )));
        }
        Ok(())
    }
}

/// Cooperative stop request observed by the controller once per frame.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Why a successful run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    FrameLimit,
    SourceExhausted,
    StopRequested,
}

/// Result of a completed run.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub frames: u64,
    pub exit: ExitReason,
    pub report: StatsReport,
    pub timing: TimingBreakdown,
}

/// Frame pipeline driving two workers over a source and a sink.
#[derive(Clone, Debug)]
pub struct SobelPipeline {
    options: PipelineOptions,
    stop: StopHandle,
}

impl SobelPipeline {
    pub fn new(options: PipelineOptions) -> Self {
        Self {
            options,
            stop: StopHandle::new(),
        }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Handle that ends the run after the frame in flight.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Run with wall-clock derived counters.
    pub fn run<S, K>(&self, source: &mut S, sink: &mut K) -> Result<RunSummary, PipelineError>
    where
        S: FrameSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        let freq = self.options.perf.proc_freq_hz;
        self.run_with_counters(source, sink, || WallClockCounters::new(freq))
    }

    /// Run with a counter set created per worker by `make_counters`.
    pub fn run_with_counters<S, K, C, F>(
        &self,
        source: &mut S,
        sink: &mut K,
        make_counters: F,
    ) -> Result<RunSummary, PipelineError>
    where
        S: FrameSource + ?Sized,
        K: FrameSink + ?Sized,
        C: PerfCounters,
        F: Fn() -> C + Sync,
    {
        self.options.validate()?;
        info!(
            "SobelPipeline::run {}x{} luma={} gradient={} lanes={} max_frames={}",
            self.options.width,
            self.options.height,
            self.options.luma.name(),
            self.options.gradient.name(),
            self.options.lanes.name(),
            self.options.max_frames
        );

        let started = Instant::now();
        let shared = Shared::new(&self.options, self.stop.clone(), source, sink);
        let (shared_ref, make_counters) = (&shared, &make_counters);
        thread::scope(|s| -> Result<(), PipelineError> {
            let spawn = move |index: usize| {
                thread::Builder::new()
                    .name(format!("sobel-worker-{index}"))
                    .spawn_scoped(s, move || shared_ref.worker_main(make_counters))
            };
            let first = spawn(0)?;
            let second = match spawn(1) {
                Ok(handle) => Some(handle),
                Err(err) => {
                    // Stand in for the missing worker at the start gate.
                    shared.fail(PipelineError::Io(err), START);
                    shared.barriers.start.wait();
                    None
                }
            };
            for handle in std::iter::once(first).chain(second) {
                if let Err(payload) = handle.join() {
                    shared.fail(
                        PipelineError::WorkerPanicked(panic_message(payload.as_ref())),
                        u64::MAX,
                    );
                }
            }
            Ok(())
        })?;

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        if let Some(err) = shared.failure.into_inner() {
            return Err(err);
        }
        let exit = shared.exit.into_inner().ok_or_else(|| {
            PipelineError::WorkerPanicked("workers stopped without an exit reason".to_string())
        })?;
        let stats = shared
            .stats
            .into_inner()
            .map_err(|_| poisoned("statistics"))?;

        let summary = RunSummary {
            frames: stats.frames(),
            exit,
            report: stats.report(&self.options.perf),
            timing: stats.timing(&self.options.perf, elapsed_ms),
        };
        info!(
            "SobelPipeline::run finished after {} frames ({:?}) in {:.1} ms",
            summary.frames, summary.exit, elapsed_ms
        );
        Ok(summary)
    }
}

/// Position of the start gate in the barrier sequence.
const START: u64 = 0;

struct Barriers {
    start: Barrier,
    acquired: Barrier,
    converted: Barrier,
    gradient_done: Barrier,
    frame_end: Barrier,
}

impl Barriers {
    fn new() -> Self {
        Self {
            start: Barrier::new(WORKERS),
            acquired: Barrier::new(WORKERS),
            converted: Barrier::new(WORKERS),
            gradient_done: Barrier::new(WORKERS),
            frame_end: Barrier::new(WORKERS),
        }
    }

    /// Barrier at position `phase` of the run: the start gate, then the four
    /// per-frame barriers in turn.
    fn at(&self, phase: u64) -> &Barrier {
        match phase {
            START => &self.start,
            n => match (n - 1) % 4 {
                0 => &self.acquired,
                1 => &self.converted,
                2 => &self.gradient_done,
                _ => &self.frame_end,
            },
        }
    }
}

struct ControllerIo<'a, S: ?Sized, K: ?Sized> {
    source: &'a mut S,
    sink: &'a mut K,
}

/// State shared by the two workers for the duration of a run.
struct Shared<'a, S: ?Sized, K: ?Sized> {
    options: &'a PipelineOptions,
    stop: StopHandle,
    election: RoleElection,
    barriers: Barriers,
    /// Position of the barrier after which both workers leave the loop.
    stop_at: AtomicU64,
    exit: OnceLock<ExitReason>,
    failure: OnceLock<PipelineError>,
    frame: RwLock<Option<Frame>>,
    /// Edge-magnitude output of the top and bottom half.
    halves: [Mutex<Plane>; 2],
    stats: Mutex<PipelineStats>,
    io: Mutex<ControllerIo<'a, S, K>>,
}

impl<'a, S, K> Shared<'a, S, K>
where
    S: FrameSource + ?Sized,
    K: FrameSink + ?Sized,
{
    fn new(options: &'a PipelineOptions, stop: StopHandle, source: &'a mut S, sink: &'a mut K) -> Self {
        Self {
            options,
            stop,
            election: RoleElection::new(),
            barriers: Barriers::new(),
            stop_at: AtomicU64::new(u64::MAX),
            exit: OnceLock::new(),
            failure: OnceLock::new(),
            frame: RwLock::new(None),
            halves: [Mutex::new(Plane::default()), Mutex::new(Plane::default())],
            stats: Mutex::new(PipelineStats::new()),
            io: Mutex::new(ControllerIo { source, sink }),
        }
    }

    /// Stop both workers right after barrier `phase`.
    ///
    /// `phase` must be the next barrier the calling worker crosses. The peer
    /// compares against the stop point only after crossing a barrier, and it
    /// cannot cross `phase` before the caller arrives there, so both workers
    /// leave at the same barrier.
    fn stop_after(&self, phase: u64) {
        self.stop_at.fetch_min(phase, Ordering::AcqRel);
    }

    fn finish(&self, reason: ExitReason, phase: u64) {
        let _ = self.exit.set(reason);
        self.stop_after(phase);
    }

    /// The first failure wins and outranks any exit reason.
    fn fail(&self, err: PipelineError, phase: u64) {
        warn!("SobelPipeline aborting: {err}");
        let _ = self.failure.set(err);
        self.stop_after(phase);
    }

    /// Wait at `barrier`, the next one in the sequence, and report whether
    /// the run goes on past it.
    fn sync(&self, barrier: &Barrier, phase: &mut u64) -> bool {
        debug_assert!(std::ptr::eq(barrier, self.barriers.at(*phase)));
        barrier.wait();
        let crossed = *phase;
        *phase += 1;
        self.stop_at.load(Ordering::Acquire) > crossed
    }

    /// Run one stage body; errors and panics become the run's failure.
    fn guarded<T>(
        &self,
        stage: &str,
        phase: u64,
        body: impl FnOnce() -> Result<T, PipelineError>,
    ) -> Option<T> {
        match panic::catch_unwind(AssertUnwindSafe(body)) {
            Ok(Ok(value)) => Some(value),
            Ok(Err(err)) => {
                self.fail(err, phase);
                None
            }
            Err(payload) => {
                self.fail(
                    PipelineError::WorkerPanicked(format!(
                        "{stage} stage: {}",
                        panic_message(payload.as_ref())
                    )),
                    phase,
                );
                None
            }
        }
    }

    fn worker_main<C, F>(&self, make_counters: &F)
    where
        C: PerfCounters,
        F: Fn() -> C,
    {
        let role = self.election.claim();
        debug!(
            "SobelPipeline {} elected {:?}",
            thread::current().name().unwrap_or("worker"),
            role
        );
        let mut phase = START;
        let run = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut counters = make_counters();
            if self.sync(&self.barriers.start, &mut phase) {
                self.frame_loop(role, &mut counters, &mut phase);
            }
        }));
        if let Err(payload) = run {
            self.fail(
                PipelineError::WorkerPanicked(format!(
                    "{role:?} outside a stage: {}",
                    panic_message(payload.as_ref())
                )),
                phase,
            );
            // Unless the peer already left at a crossed barrier, it is
            // headed for `phase` and must not wait there alone.
            if self.stop_at.load(Ordering::Acquire) == phase {
                self.barriers.at(phase).wait();
            }
        }
    }

    fn frame_loop<C: PerfCounters>(&self, role: Role, counters: &mut C, phase: &mut u64) {
        let options = self.options;
        let half = role.half();
        let kernel = options.gradient.kernel(options.lanes);
        let mut luma_plane = Plane::default();
        let mut workspace = SobelWorkspace::new();
        let mut output = Plane::default();

        loop {
            let mut sample = FrameSample::default();

            counters.start();
            if role.is_controller() {
                let at = *phase;
                self.guarded("acquire", at, || self.acquire(at));
            }
            let go = self.sync(&self.barriers.acquired, phase);
            sample.capture = counters.stop();
            if !go {
                break;
            }

            counters.start();
            self.guarded("grayscale", *phase, || {
                let frame = read(&self.frame, "frame")?;
                let frame = frame
                    .as_ref()
                    .ok_or_else(|| PipelineError::Source("no frame was acquired".to_string()))?;
                let src = frame.half(half);
                luma_plane.resize(src.w, src.h);
                luma::convert_frame(options.luma, options.lanes, &src, &mut luma_plane.view_mut());
                Ok(())
            });
            let go = self.sync(&self.barriers.converted, phase);
            sample.grayscale = counters.stop();
            if !go {
                break;
            }

            counters.start();
            self.guarded("sobel", *phase, || {
                let mut out = lock(&self.halves[half.index()], "output half")?;
                out.resize(luma_plane.width(), luma_plane.height());
                let src = luma_plane.view();
                let mut dst = out.view_mut();
                options.border.seed(&src, &mut dst);
                kernel.apply(&src, &mut dst, &mut workspace);
                Ok(())
            });
            let go = self.sync(&self.barriers.gradient_done, phase);
            sample.sobel = counters.stop();
            if !go {
                break;
            }

            if role.is_controller() {
                self.finalize(&mut output, &mut sample, counters, *phase);
            }
            if !self.sync(&self.barriers.frame_end, phase) {
                break;
            }
        }
    }

    fn acquire(&self, phase: u64) -> Result<(), PipelineError> {
        if self.stop.is_stop_requested() {
            self.finish(ExitReason::StopRequested, phase);
            return Ok(());
        }
        let next = lock(&self.io, "frame source")?.source.next_frame()?;
        let Some(frame) = next else {
            let frames = lock(&self.stats, "statistics")?.frames();
            if self.options.max_frames > frames {
                warn!(
                    "SobelPipeline source exhausted after {frames} of {} frames",
                    self.options.max_frames
                );
            } else {
                info!("SobelPipeline source exhausted after {frames} frames");
            }
            self.finish(ExitReason::SourceExhausted, phase);
            return Ok(());
        };
        let expected = (self.options.width, self.options.height);
        if frame.dimensions() != expected {
            return Err(PipelineError::DimensionMismatch {
                expected,
                actual: frame.dimensions(),
            });
        }
        *write(&self.frame, "frame")? = Some(frame);
        Ok(())
    }

    /// Stack the halves, present them and fold the frame into the statistics.
    fn finalize<C: PerfCounters>(
        &self,
        output: &mut Plane,
        sample: &mut FrameSample,
        counters: &mut C,
        phase: u64,
    ) {
        let stacked = self.guarded("display", phase, || {
            let top = lock(&self.halves[0], "top half")?;
            let bottom = lock(&self.halves[1], "bottom half")?;
            output.vconcat_from(&top.view(), &bottom.view());
            Ok(())
        });
        if stacked.is_none() {
            return;
        }
        counters.start();
        let presented = self.guarded("display", phase, || {
            lock(&self.io, "frame sink")?.sink.present(&*output)
        });
        sample.display = counters.stop();
        if presented.is_some() {
            self.guarded("stats", phase, || self.complete_frame(sample, phase));
        }
    }

    fn complete_frame(&self, sample: &FrameSample, phase: u64) -> Result<(), PipelineError> {
        let frames = {
            let mut stats = lock(&self.stats, "statistics")?;
            stats.record(sample, &self.options.perf);
            stats.frames()
        };
        debug!(
            "SobelPipeline frame {} cycles capture={} gray={} sobel={} display={}",
            frames,
            sample.capture.cycles,
            sample.grayscale.cycles,
            sample.sobel.cycles,
            sample.display.cycles
        );
        if self.options.max_frames > 0 && frames >= self.options.max_frames {
            self.finish(ExitReason::FrameLimit, phase);
        } else if self.stop.is_stop_requested() {
            self.finish(ExitReason::StopRequested, phase);
        }
        Ok(())
    }
}

fn poisoned(what: &str) -> PipelineError {
    PipelineError::WorkerPanicked(format!("{what} lock poisoned by an earlier panic"))
}

fn lock<'m, T>(mutex: &'m Mutex<T>, what: &str) -> Result<MutexGuard<'m, T>, PipelineError> {
    mutex.lock().map_err(|_| poisoned(what))
}

fn read<'m, T>(lock: &'m RwLock<T>, what: &str) -> Result<RwLockReadGuard<'m, T>, PipelineError> {
    lock.read().map_err(|_| poisoned(what))
}

fn write<'m, T>(lock: &'m RwLock<T>, what: &str) -> Result<RwLockWriteGuard<'m, T>, PipelineError> {
    lock.write().map_err(|_| poisoned(what))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{
        CollectSink, CounterSample, NullSink, SyntheticPattern, SyntheticSource, VecSource,
    };
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc::{self, RecvTimeoutError};
    use std::time::Duration;

    const REPEATS: usize = 300;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn frame_limit_stops_an_unbounded_source() {
        init_logger();
        let options = PipelineOptions::new(32, 16).with_max_frames(5);
        let mut source = SyntheticSource::new(32, 16, SyntheticPattern::Checkerboard);
        let mut sink = CollectSink::default();
        let summary = SobelPipeline::new(options).run(&mut source, &mut sink).unwrap();
        assert_eq!(summary.exit, ExitReason::FrameLimit);
        assert_eq!(summary.frames, 5);
        assert_eq!(summary.report.total_frames, 5);
        assert_eq!(sink.planes.len(), 5);
        assert!(sink.planes.iter().all(|p| (p.width(), p.height()) == (32, 16)));
    }

    #[test]
    fn exhausted_source_ends_cleanly() {
        init_logger();
        let frames: Vec<Frame> = (0..3).map(|_| Frame::new(8, 8)).collect();
        let mut source = VecSource::new(frames);
        let summary = SobelPipeline::new(PipelineOptions::new(8, 8))
            .run(&mut source, &mut NullSink)
            .unwrap();
        assert_eq!(summary.exit, ExitReason::SourceExhausted);
        assert_eq!(summary.frames, 3);
    }

    #[test]
    fn empty_source_reports_zero_frames() {
        let mut source = VecSource::default();
        let summary = SobelPipeline::new(PipelineOptions::new(8, 8))
            .run(&mut source, &mut NullSink)
            .unwrap();
        assert_eq!(summary.frames, 0);
        assert!(summary.report.frames_per_second.is_none());
        assert!(summary.report.to_csv().contains("Total frames, 0"));
    }

    #[test]
    fn wrong_frame_size_is_fatal() {
        let mut source = VecSource::new([Frame::new(8, 8), Frame::new(4, 4)]);
        let mut sink = CollectSink::default();
        let err = SobelPipeline::new(PipelineOptions::new(8, 8))
            .run(&mut source, &mut sink)
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::DimensionMismatch {
                expected: (8, 8),
                actual: (4, 4)
            }
        ));
        assert_eq!(sink.planes.len(), 1);
    }

    #[test]
    fn stop_request_ends_the_run() {
        let pipeline = SobelPipeline::new(PipelineOptions::new(16, 8));
        pipeline.stop_handle().request_stop();
        let mut source = SyntheticSource::new(16, 8, SyntheticPattern::Bars);
        let summary = pipeline.run(&mut source, &mut NullSink).unwrap();
        assert_eq!(summary.exit, ExitReason::StopRequested);
        assert_eq!(summary.frames, 0);
    }

    struct FailingSink;

    impl FrameSink for FailingSink {
        fn present(&mut self, _plane: &Plane) -> Result<(), PipelineError> {
            Err(PipelineError::Sink("display closed".to_string()))
        }
    }

    #[test]
    fn sink_failure_aborts_both_workers() {
        let mut source = SyntheticSource::new(16, 8, SyntheticPattern::Gradient);
        let err = SobelPipeline::new(PipelineOptions::new(16, 8))
            .run(&mut source, &mut FailingSink)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Sink(_)));
    }

    struct PanickingSource;

    impl FrameSource for PanickingSource {
        fn next_frame(&mut self) -> Result<Option<Frame>, PipelineError> {
            panic!("capture device vanished");
        }
    }

    #[test]
    fn panic_in_a_stage_is_reported() {
        let err = SobelPipeline::new(PipelineOptions::new(8, 8))
            .run(&mut PanickingSource, &mut NullSink)
            .unwrap_err();
        match err {
            PipelineError::WorkerPanicked(msg) => assert!(msg.contains("capture device vanished")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn zero_sized_frames_are_rejected_up_front() {
        let err = SobelPipeline::new(PipelineOptions::new(0, 8))
            .run(&mut VecSource::default(), &mut NullSink)
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
    }

    /// Run `f` on its own thread; a run that never returns fails the test
    /// instead of hanging the suite.
    fn within_deadline<T: Send + 'static>(f: impl FnOnce() -> T + Send + 'static) -> T {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(f());
        });
        match rx.recv_timeout(Duration::from_secs(30)) {
            Ok(value) => value,
            Err(RecvTimeoutError::Timeout) => panic!("pipeline runs did not finish in time"),
            Err(RecvTimeoutError::Disconnected) => panic!("pipeline runs panicked"),
        }
    }

    #[test]
    fn single_frame_limit_terminates_every_time() {
        let frames = within_deadline(|| {
            (0..REPEATS)
                .map(|_| {
                    let mut source = SyntheticSource::new(8, 6, SyntheticPattern::Bars);
                    let summary = SobelPipeline::new(PipelineOptions::new(8, 6).with_max_frames(1))
                        .run(&mut source, &mut NullSink)
                        .unwrap();
                    assert_eq!(summary.exit, ExitReason::FrameLimit);
                    summary.frames
                })
                .sum::<u64>()
        });
        assert_eq!(frames, REPEATS as u64);
    }

    #[test]
    fn one_frame_source_terminates_every_time() {
        let frames = within_deadline(|| {
            (0..REPEATS)
                .map(|_| {
                    let mut source = VecSource::new([Frame::new(8, 6)]);
                    let summary = SobelPipeline::new(PipelineOptions::new(8, 6))
                        .run(&mut source, &mut NullSink)
                        .unwrap();
                    assert_eq!(summary.exit, ExitReason::SourceExhausted);
                    summary.frames
                })
                .sum::<u64>()
        });
        assert_eq!(frames, REPEATS as u64);
    }

    /// Requests a stop from inside the display stage.
    struct StoppingSink(StopHandle);

    impl FrameSink for StoppingSink {
        fn present(&mut self, _plane: &Plane) -> Result<(), PipelineError> {
            self.0.request_stop();
            Ok(())
        }
    }

    #[test]
    fn stop_during_a_frame_terminates_every_time() {
        within_deadline(|| {
            for _ in 0..REPEATS {
                let pipeline = SobelPipeline::new(PipelineOptions::new(8, 6));
                let mut sink = StoppingSink(pipeline.stop_handle());
                let mut source = SyntheticSource::new(8, 6, SyntheticPattern::Gradient);
                let summary = pipeline.run(&mut source, &mut sink).unwrap();
                assert_eq!(summary.exit, ExitReason::StopRequested);
                assert_eq!(summary.frames, 1);
            }
        });
    }

    #[test]
    fn stop_before_start_terminates_every_time() {
        within_deadline(|| {
            for _ in 0..REPEATS {
                let pipeline = SobelPipeline::new(PipelineOptions::new(8, 6));
                pipeline.stop_handle().request_stop();
                let mut source = SyntheticSource::new(8, 6, SyntheticPattern::Bars);
                let summary = pipeline.run(&mut source, &mut NullSink).unwrap();
                assert_eq!(summary.exit, ExitReason::StopRequested);
                assert_eq!(summary.frames, 0);
            }
        });
    }

    #[test]
    fn failures_terminate_every_time() {
        within_deadline(|| {
            for _ in 0..REPEATS / 3 {
                let mut source = VecSource::new([Frame::new(8, 6), Frame::new(6, 8)]);
                let err = SobelPipeline::new(PipelineOptions::new(8, 6))
                    .run(&mut source, &mut NullSink)
                    .unwrap_err();
                assert!(matches!(err, PipelineError::DimensionMismatch { .. }));

                let mut source = SyntheticSource::new(8, 6, SyntheticPattern::Bars);
                let err = SobelPipeline::new(PipelineOptions::new(8, 6))
                    .run(&mut source, &mut FailingSink)
                    .unwrap_err();
                assert!(matches!(err, PipelineError::Sink(_)));

                let err = SobelPipeline::new(PipelineOptions::new(8, 6))
                    .run(&mut PanickingSource, &mut NullSink)
                    .unwrap_err();
                assert!(matches!(err, PipelineError::WorkerPanicked(_)));
            }
        });
    }

    /// Counter set that panics on its `nth` call to `start` or `stop`.
    struct FaultyCounters {
        calls: usize,
        panic_on_start: Option<usize>,
        panic_on_stop: Option<usize>,
    }

    impl FaultyCounters {
        fn healthy() -> Self {
            Self {
                calls: 0,
                panic_on_start: None,
                panic_on_stop: None,
            }
        }
    }

    impl PerfCounters for FaultyCounters {
        fn start(&mut self) {
            self.calls += 1;
            if self.panic_on_start == Some(self.calls) {
                panic!("counter overflow in start");
            }
        }

        fn stop(&mut self) -> CounterSample {
            if self.panic_on_stop == Some(self.calls) {
                panic!("counter overflow in stop");
            }
            CounterSample::default()
        }
    }

    /// Only the second counter set handed out is faulty.
    fn second_faulty(
        faulty: impl Fn() -> FaultyCounters + Sync,
    ) -> impl Fn() -> FaultyCounters + Sync {
        let created = AtomicUsize::new(0);
        move || {
            if created.fetch_add(1, Ordering::SeqCst) == 1 {
                faulty()
            } else {
                FaultyCounters::healthy()
            }
        }
    }

    #[test]
    fn counter_panic_in_any_stage_aborts_both_workers() {
        within_deadline(|| {
            for nth in 1..=6 {
                for _ in 0..20 {
                    let mut source = SyntheticSource::new(8, 6, SyntheticPattern::Checkerboard);
                    let err = SobelPipeline::new(PipelineOptions::new(8, 6))
                        .run_with_counters(
                            &mut source,
                            &mut NullSink,
                            second_faulty(move || FaultyCounters {
                                panic_on_start: Some(nth),
                                ..FaultyCounters::healthy()
                            }),
                        )
                        .unwrap_err();
                    match err {
                        PipelineError::WorkerPanicked(msg) => {
                            assert!(msg.contains("counter overflow in start"), "{msg}")
                        }
                        other => panic!("unexpected error {other:?}"),
                    }
                }
            }
        });
    }

    #[test]
    fn counter_panic_after_the_last_barrier_is_still_reported() {
        within_deadline(|| {
            for _ in 0..50 {
                let pipeline = SobelPipeline::new(PipelineOptions::new(8, 6));
                pipeline.stop_handle().request_stop();
                let mut source = SyntheticSource::new(8, 6, SyntheticPattern::Bars);
                let err = pipeline
                    .run_with_counters(
                        &mut source,
                        &mut NullSink,
                        second_faulty(|| FaultyCounters {
                            panic_on_stop: Some(1),
                            ..FaultyCounters::healthy()
                        }),
                    )
                    .unwrap_err();
                assert!(matches!(err, PipelineError::WorkerPanicked(_)));
            }
        });
    }

    #[test]
    fn counter_factory_panic_releases_the_start_gate() {
        within_deadline(|| {
            for _ in 0..50 {
                let created = AtomicUsize::new(0);
                let mut source = SyntheticSource::new(8, 6, SyntheticPattern::Bars);
                let err = SobelPipeline::new(PipelineOptions::new(8, 6))
                    .run_with_counters(&mut source, &mut NullSink, || {
                        if created.fetch_add(1, Ordering::SeqCst) == 1 {
                            panic!("no counters available");
                        }
                        FaultyCounters::healthy()
                    })
                    .unwrap_err();
                assert!(matches!(err, PipelineError::WorkerPanicked(_)));
            }
        });
    }

    #[test]
    fn poisoned_lock_maps_to_worker_panicked() {
        let mutex = Mutex::new(0u32);
        let _ = thread::scope(|s| {
            s.spawn(|| {
                let _guard = mutex.lock();
                panic!("poison");
            })
            .join()
        });
        assert!(mutex.is_poisoned());
        match lock(&mutex, "statistics") {
            Err(PipelineError::WorkerPanicked(msg)) => assert!(msg.contains("statistics")),
            other => panic!("unexpected result {:?}", other.map(|g| *g)),
        };
    }

    #[test]
    fn barrier_positions_cycle_through_the_frame() {
        let barriers = Barriers::new();
        assert!(std::ptr::eq(barriers.at(START), &barriers.start));
        for frame in 0..3u64 {
            let base = 1 + 4 * frame;
            assert!(std::ptr::eq(barriers.at(base), &barriers.acquired));
            assert!(std::ptr::eq(barriers.at(base + 1), &barriers.converted));
            assert!(std::ptr::eq(barriers.at(base + 2), &barriers.gradient_done));
            assert!(std::ptr::eq(barriers.at(base + 3), &barriers.frame_end));
        }
    }
}
