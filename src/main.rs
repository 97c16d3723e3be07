mod alert;
mod capture;
mod config;
mod decision;
mod detection;
mod error;
mod output;
mod pipeline;
mod stop;

use alert::{AlertDispatcher, AplayBackend, SoundHandle};
use anyhow::{Context, Result};
use capture::{FrameSource, ImageDirectory, WebcamCapture};
use clap::Parser;
use config::DecisionConfig;
use output::{DisplaySink, HeadlessDisplay, OutputSink, OverlayDisplay, V4L2Output};
use output::{load_font, DEFAULT_FONT_PATH};
use pipeline::{LoopOptions, SessionClock, StreamLoop};
use std::path::PathBuf;
use std::sync::Arc;
use stop::StopSignal;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input webcam device index
    #[arg(short, long, default_value_t = 0)]
    input_device: u32,

    /// Replay still images from this directory instead of the webcam
    #[arg(long)]
    images: Option<PathBuf>,

    /// Loop over the image directory instead of stopping at its end
    #[arg(long, requires = "images")]
    repeat: bool,

    /// Output v4l2loopback device path for the annotated stream
    /// If not provided, runs headless and only logs status changes
    #[arg(short, long)]
    output_device: Option<String>,

    /// Output resolution width
    #[arg(long, default_value_t = 640)]
    output_width: u32,

    /// Output resolution height
    #[arg(long, default_value_t = 480)]
    output_height: u32,

    /// TrueType font for box captions and status text on the output stream
    #[arg(long, default_value = DEFAULT_FONT_PATH)]
    font: PathBuf,

    /// Upper bound on processed frames per second (0 = unlimited)
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Stop after this many frames
    #[arg(long)]
    max_frames: Option<u64>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Path to the detection model (ONNX file, YOLOv8 output layout)
    #[arg(long)]
    model: String,

    /// Square input resolution the model was exported with
    #[arg(long, default_value_t = 640)]
    input_size: u32,

    /// Comma-separated class names by id; read from the model metadata if omitted
    #[arg(long, value_delimiter = ',')]
    class_names: Option<Vec<String>>,

    /// Class label to alert on
    #[arg(long, default_value = config::TARGET_LABEL)]
    target_label: String,

    /// WAV file played when the target is confirmed
    /// If not provided or not playable, alerts are visual only
    #[arg(long)]
    alert_sound: Option<PathBuf>,

    /// Detections at or below this confidence are ignored
    #[arg(long, default_value_t = config::DISPLAY_FLOOR)]
    display_floor: f32,

    /// Target detections must exceed this confidence to be confirmed
    #[arg(long, default_value_t = config::CONFIRMATION_FLOOR)]
    confirmation_floor: f32,

    /// IoU threshold for non-maximum suppression
    #[arg(long, default_value_t = config::NMS_IOU)]
    nms_iou: f32,

    /// Maximum detections gated per frame
    #[arg(long, default_value_t = config::MAX_GATED_PER_FRAME)]
    max_per_frame: usize,

    /// Minimum seconds between alerts
    #[arg(long, default_value_t = config::ALERT_COOLDOWN_SECS)]
    cooldown: f64,
}

impl Args {
    fn decision_config(&self) -> DecisionConfig {
        DecisionConfig {
            target_label: self.target_label.trim().to_string(),
            display_floor: self.display_floor,
            confirmation_floor: self.confirmation_floor,
            nms_iou: self.nms_iou,
            max_gated_per_frame: self.max_per_frame,
            cooldown_secs: self.cooldown,
            ..DecisionConfig::default()
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    tracing::info!("komodo-watch starting");

    let config = args.decision_config();
    config.validate().context("Invalid configuration")?;
    tracing::info!(
        "Target '{}': display floor {}, confirmation floor {}, cooldown {}s",
        config.target_label,
        config.display_floor,
        config.confirmation_floor,
        config.cooldown_secs
    );

    // Initialize frame source
    let mut source: Box<dyn FrameSource> = match &args.images {
        Some(dir) => Box::new(
            ImageDirectory::new(dir, args.repeat).context("Failed to open image directory")?,
        ),
        None => Box::new(
            WebcamCapture::new(args.input_device).context("Failed to initialize webcam capture")?,
        ),
    };

    // Initialize detection model
    let class_names = args.class_names.as_ref().map(|names| {
        names
            .iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect::<Vec<_>>()
    });
    let mut model = detection::create_default_model(&args.model, args.input_size, class_names)
        .context("Failed to load detection model")?;
    if !model
        .class_labels()
        .iter()
        .any(|label| label.eq_ignore_ascii_case(&config.target_label))
    {
        tracing::warn!(
            "Model classes {:?} do not include '{}'; nothing will be confirmed",
            model.class_labels(),
            config.target_label
        );
    }

    // Initialize display
    let mut display: Box<dyn DisplaySink> = match &args.output_device {
        Some(device) => {
            let output = V4L2Output::new(device, args.output_width, args.output_height)
                .context("Failed to initialize v4l2loopback output")?;
            let (width, height) = output.resolution();
            tracing::info!("Annotated stream: {}x{}", width, height);
            let font = match load_font(&args.font) {
                Ok(font) => Some(font),
                Err(e) => {
                    tracing::warn!("{:#}; overlay will have no text", e);
                    None
                }
            };
            Box::new(OverlayDisplay::new(output, config.target_label.clone(), font))
        }
        None => {
            tracing::info!("No output device, running headless");
            Box::new(HeadlessDisplay::new(config.target_label.clone()))
        }
    };

    let dispatcher = create_dispatcher(args.alert_sound.as_ref());
    if dispatcher.is_audible() {
        tracing::info!("Audible alerts enabled");
    } else {
        tracing::warn!("No audible alert will fire; confirmations are shown and logged only");
    }

    let stop = StopSignal::new();
    stop.install_ctrlc()?;
    stop.watch_stdin();
    tracing::info!("Press Ctrl+C or type 'q' and Enter to stop");

    let clock = SessionClock::start();
    let options = LoopOptions {
        target_fps: args.fps,
        max_frames: args.max_frames,
    };

    let summary = StreamLoop::new(
        source.as_mut(),
        model.as_mut(),
        display.as_mut(),
        &dispatcher,
        &clock,
        stop,
        config,
        options,
    )
    .run();

    tracing::info!(
        "Session finished: {} frames, {} with detections, {} confirmed, {} alerts",
        summary.frames,
        summary.frames_with_detections,
        summary.confirmed_frames,
        summary.alerts
    );

    Ok(())
}

/// Set up audible alerts, degrading to visual only when audio is unavailable
fn create_dispatcher(alert_sound: Option<&PathBuf>) -> AlertDispatcher {
    let Some(path) = alert_sound else {
        tracing::info!("No --alert-sound given, so no sound will play on confirmation");
        return AlertDispatcher::visual_only();
    };

    let sound = match SoundHandle::preload(path) {
        Ok(sound) => sound,
        Err(e) => {
            tracing::warn!("{}", e);
            return AlertDispatcher::visual_only();
        }
    };

    let backend = AplayBackend::new();
    if let Err(e) = backend.probe() {
        tracing::warn!("Audio unavailable: {}", e);
        return AlertDispatcher::visual_only();
    }

    tracing::info!("Alert sound loaded from {}", path.display());
    AlertDispatcher::new(Arc::new(backend), sound)
}
