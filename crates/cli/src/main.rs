use std::cell::Cell;
use std::path::PathBuf;
use std::process;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;

use scanline_core::acquisition::domain::frame_source::{FrameSource, GrabStatus, SourceError};
use scanline_core::acquisition::infrastructure::image_file_source::ImageFileSource;
use scanline_core::decoding::domain::barcode_decoder::BarcodeDecoder;
use scanline_core::pipeline::config::{PipelineConfig, StreamMode};
use scanline_core::pipeline::decode_path::{DecodePath, DecodePathFactory};
use scanline_core::pipeline::driver::Pipeline;
use scanline_core::shared::bounding_box::BoundingBox;
use scanline_core::shared::decode_result::{CodeResult, Symbology};
use scanline_core::shared::frame_buffer::FrameBuffer;

/// Barcode scanning pipeline benchmark and soak harness.
#[derive(Parser)]
#[command(name = "scanline")]
struct Cli {
    /// Image files to scan instead of synthetic frames.
    images: Vec<PathBuf>,

    /// Worker threads (0 = decode inline on the driver thread).
    #[arg(long, default_value = "2")]
    workers: usize,

    /// Number of synthetic frames to generate.
    #[arg(long, default_value = "100")]
    frames: u32,

    /// Synthetic frame width.
    #[arg(long, default_value = "640")]
    width: u32,

    /// Synthetic frame height.
    #[arg(long, default_value = "480")]
    height: u32,

    /// Simulated decode latency per frame in milliseconds.
    #[arg(long, default_value = "5")]
    decode_ms: u64,

    /// Every Nth synthetic frame carries a decodable symbol.
    #[arg(long, default_value = "10")]
    detect_every: u32,

    /// Pace the run like a live camera instead of free-running.
    #[arg(long)]
    live: bool,

    /// Tick interval in milliseconds when --live is set.
    #[arg(long, default_value = "16")]
    tick_ms: u64,
}

/// Generates gray gradient frames; every Nth frame carries a marker byte
/// the bench decoder treats as a symbol.
struct SyntheticSource {
    remaining: u32,
    counter: u32,
    detect_every: u32,
    width: u32,
    height: u32,
}

impl FrameSource for SyntheticSource {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn grab_into(&mut self, buffer: &mut FrameBuffer) -> Result<GrabStatus, SourceError> {
        if self.remaining == 0 {
            return Ok(GrabStatus::Ended);
        }
        self.remaining -= 1;
        self.counter += 1;
        buffer.data_mut().fill((self.counter % 251) as u8);
        buffer.data_mut()[0] = u8::from(self.counter % self.detect_every == 0);
        Ok(GrabStatus::NewFrame)
    }
}

/// Burns the configured latency per frame and reports a symbol whenever
/// the frame's marker byte is set.
struct BenchDecoder {
    latency: Duration,
}

impl BarcodeDecoder for BenchDecoder {
    fn decode_from_boxes(
        &mut self,
        frame: &FrameBuffer,
        _boxes: &[BoundingBox],
    ) -> Option<CodeResult> {
        std::thread::sleep(self.latency);
        (frame.data()[0] != 0).then(|| CodeResult {
            code: format!("{:013}", frame.len()),
            symbology: Symbology::Ean13,
        })
    }

    fn set_readers(&mut self, _readers: &[Symbology]) {}
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let source: Box<dyn FrameSource> = if cli.images.is_empty() {
        Box::new(SyntheticSource {
            remaining: cli.frames,
            counter: 0,
            detect_every: cli.detect_every,
            width: cli.width,
            height: cli.height,
        })
    } else {
        Box::new(ImageFileSource::open(cli.images.clone())?)
    };

    let latency = Duration::from_millis(cli.decode_ms);
    let factory: DecodePathFactory = Arc::new(move |w, h| {
        DecodePath::new(
            None,
            Box::new(BenchDecoder { latency }),
            BoundingBox::scan_band(w, h),
        )
    });

    let mut config = PipelineConfig {
        num_workers: cli.workers,
        locate: false,
        ..PipelineConfig::default()
    };
    if cli.live {
        config.stream.mode = StreamMode::Live;
        config.stream.tick = Duration::from_millis(cli.tick_ms);
    }

    let mut pipeline = Pipeline::new(config);
    pipeline.initialize(source, factory)?;

    let processed = Rc::new(Cell::new(0u64));
    let detected = Rc::new(Cell::new(0u64));
    {
        let processed = processed.clone();
        let stop = pipeline.stop_handle();
        let live = cli.live;
        let frames = u64::from(cli.frames);
        pipeline.on_processed(move |_| {
            processed.set(processed.get() + 1);
            // A live run has no natural end; stop once every generated
            // frame has come back.
            if live && processed.get() >= frames {
                stop.request_stop();
            }
        });
    }
    {
        let detected = detected.clone();
        pipeline.on_detected(move |payload| {
            detected.set(detected.get() + 1);
            if let Some(code) = payload.and_then(|r| r.code_result.as_ref()) {
                log::info!("detected {:?} {}", code.symbology, code.code);
            }
        });
    }

    let started = Instant::now();
    pipeline.start()?;
    let elapsed = started.elapsed();
    let dropped = pipeline.frames_dropped();
    pipeline.stop();

    let fps = processed.get() as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
    println!(
        "processed {} frames in {:.2}s ({fps:.1} fps), {} detected, {dropped} dropped",
        processed.get(),
        elapsed.as_secs_f64(),
        detected.get(),
    );
    Ok(())
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    for path in &cli.images {
        if !path.exists() {
            return Err(format!("Input file not found: {}", path.display()).into());
        }
    }
    if cli.width == 0 || cli.height == 0 {
        return Err(format!(
            "Frame dimensions must be positive, got {}x{}",
            cli.width, cli.height
        )
        .into());
    }
    if cli.detect_every == 0 {
        return Err("--detect-every must be at least 1".into());
    }
    if cli.live && cli.images.is_empty() && cli.frames == 0 {
        return Err("--live needs at least one frame to scan".into());
    }
    Ok(())
}
