use crate::alert::AlertDispatcher;
use crate::capture::FrameSource;
use crate::config::DecisionConfig;
use crate::decision::{aggregate, AlertState, CooldownController, FrameResult, Reason, Verdict};
use crate::detection::{DetectionModel, FrameSize};
use crate::output::DisplaySink;
use crate::stop::StopSignal;
use std::time::{Duration, Instant};

/// Number of frames between timing reports
const STATS_INTERVAL: u64 = 30;

/// Source of session time in seconds
pub trait Clock {
    fn now(&self) -> f64;
}

/// Monotonic seconds since the session started
pub struct SessionClock {
    start: Instant,
}

impl SessionClock {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Clock for SessionClock {
    fn now(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped,
}

#[derive(Debug, Clone, Default)]
pub struct LoopOptions {
    /// Upper bound on processed frames per second, 0 for unlimited
    pub target_fps: u32,
    /// Stop after this many frames
    pub max_frames: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub frames: u64,
    pub frames_with_detections: u64,
    pub confirmed_frames: u64,
    pub alerts: u64,
}

#[derive(Default)]
struct Timings {
    capture: Duration,
    inference: Duration,
    decision: Duration,
    render: Duration,
}

/// Drives capture, detection, gating, alerting and display frame by frame
pub struct StreamLoop<'a> {
    source: &'a mut dyn FrameSource,
    model: &'a mut dyn DetectionModel,
    display: &'a mut dyn DisplaySink,
    dispatcher: &'a AlertDispatcher,
    clock: &'a dyn Clock,
    stop: StopSignal,
    config: DecisionConfig,
    options: LoopOptions,
    cooldown: CooldownController,
    alert_state: AlertState,
    state: LoopState,
    summary: SessionSummary,
    timings: Timings,
}

impl<'a> StreamLoop<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: &'a mut dyn FrameSource,
        model: &'a mut dyn DetectionModel,
        display: &'a mut dyn DisplaySink,
        dispatcher: &'a AlertDispatcher,
        clock: &'a dyn Clock,
        stop: StopSignal,
        config: DecisionConfig,
        options: LoopOptions,
    ) -> Self {
        let cooldown = CooldownController::new(config.cooldown_secs);
        Self {
            source,
            model,
            display,
            dispatcher,
            clock,
            stop,
            config,
            options,
            cooldown,
            alert_state: AlertState::new(),
            state: LoopState::Running,
            summary: SessionSummary::default(),
            timings: Timings::default(),
        }
    }

    /// Run until stopped or the source runs dry
    pub fn run(&mut self) -> SessionSummary {
        tracing::info!("Starting detection loop");
        if let Some((width, height)) = self.source.resolution() {
            tracing::info!("Frame source reports {}x{}", width, height);
        }

        while self.state == LoopState::Running {
            self.state = self.step();
        }

        tracing::info!(
            "Detection loop stopped after {} frames ({} confirmed, {} alerts)",
            self.summary.frames,
            self.summary.confirmed_frames,
            self.summary.alerts
        );
        self.summary.clone()
    }

    /// Process one frame and report whether to keep going
    pub fn step(&mut self) -> LoopState {
        if self.stop.is_stopped() {
            return LoopState::Stopped;
        }
        if let Some(max) = self.options.max_frames {
            if self.summary.frames >= max {
                tracing::info!("Reached frame limit of {}", max);
                return LoopState::Stopped;
            }
        }

        let loop_start = Instant::now();

        let frame = match self.source.next_frame() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::info!("Frame source ended: {}", e);
                return LoopState::Stopped;
            }
        };
        let capture_done = Instant::now();

        let raw = match self
            .model
            .infer(&frame, self.config.display_floor, self.config.nms_iou)
        {
            Ok(detections) => detections,
            Err(e) => {
                tracing::warn!("Inference failed, treating frame as empty: {:#}", e);
                Vec::new()
            }
        };
        let inference_done = Instant::now();

        let result = aggregate(&raw, FrameSize::of(&frame), &self.config);
        self.log_dispositions(&result);

        if self
            .cooldown
            .should_alert(&result, self.clock.now(), &mut self.alert_state)
        {
            if let Some(best) = &result.best_confirmed {
                tracing::info!(
                    "{} detected! Confidence: {:.2}",
                    self.config.target_label,
                    best.confidence
                );
            }
            self.dispatcher.fire_alert();
            self.summary.alerts += 1;
        } else if result.best_confirmed.is_some() {
            tracing::debug!(
                "Alert suppressed by cooldown (last at {:.1}s)",
                self.alert_state.last_alert_time()
            );
        }
        let decision_done = Instant::now();

        let status = result.status();
        self.display.render(frame, &result.dispositions, &status);
        let render_done = Instant::now();

        self.summary.frames += 1;
        if result.any_detection {
            self.summary.frames_with_detections += 1;
        }
        if result.best_confirmed.is_some() {
            self.summary.confirmed_frames += 1;
        }

        self.timings.capture += capture_done - loop_start;
        self.timings.inference += inference_done - capture_done;
        self.timings.decision += decision_done - inference_done;
        self.timings.render += render_done - decision_done;
        if self.summary.frames % STATS_INTERVAL == 0 {
            self.log_timings();
        }

        // Frame rate limiting
        if self.options.target_fps > 0 {
            let frame_duration = Duration::from_secs_f32(1.0 / self.options.target_fps as f32);
            let elapsed = loop_start.elapsed();
            if elapsed < frame_duration {
                std::thread::sleep(frame_duration - elapsed);
            }
        }

        LoopState::Running
    }

    fn log_dispositions(&self, result: &FrameResult) {
        for gated in &result.dispositions {
            let detection = &gated.detection;
            match (gated.disposition.verdict, gated.disposition.reason) {
                (Verdict::Rejected, Reason::HumanShape) => tracing::debug!(
                    "Rejected {} ({:.2}): likely human shape",
                    detection.class_label,
                    detection.confidence
                ),
                (Verdict::Uncertain, reason) => tracing::debug!(
                    "Possible {} ({:.2}) but {} (ratio {:.1}, size {:.3})",
                    detection.class_label,
                    detection.confidence,
                    reason,
                    gated.features.aspect_ratio,
                    gated.features.relative_size
                ),
                (verdict, reason) => tracing::trace!(
                    "{:?} {} ({:.2}): {}",
                    verdict,
                    detection.class_label,
                    detection.confidence,
                    reason
                ),
            }
        }
    }

    fn log_timings(&self) {
        let frames = self.summary.frames as f64;
        let avg_ms = |d: Duration| d.as_secs_f64() * 1000.0 / frames;

        let capture_ms = avg_ms(self.timings.capture);
        let inference_ms = avg_ms(self.timings.inference);
        let decision_ms = avg_ms(self.timings.decision);
        let render_ms = avg_ms(self.timings.render);
        let total_ms = capture_ms + inference_ms + decision_ms + render_ms;
        let fps = if total_ms > 0.0 { 1000.0 / total_ms } else { 0.0 };

        tracing::info!(
            "Frame {}: capture={:.1}ms, inference={:.1}ms, decision={:.2}ms, render={:.1}ms, total={:.1}ms, fps={:.1}",
            self.summary.frames,
            capture_ms,
            inference_ms,
            decision_ms,
            render_ms,
            total_ms,
            fps
        );
    }
}
