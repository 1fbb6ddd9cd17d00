use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::acquisition::domain::frame_source::{FrameSource, GrabStatus, SourceError};
use crate::events::event_bus::{EventBus, TOPIC_DETECTED, TOPIC_PROCESSED};
use crate::pipeline::config::{PipelineConfig, StreamMode};
use crate::pipeline::decode_path::{DecodePath, DecodePathFactory};
use crate::pipeline::worker_pool::{PoolError, WorkerPool};
use crate::shared::decode_result::{DecodeResult, Symbology};
use crate::shared::frame_buffer::FrameBuffer;

/// Idle wait between ticks while draining in-flight jobs after a finite
/// source is exhausted.
const DRAIN_WAIT: Duration = Duration::from_millis(1);

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(
        "image dimensions {width}x{height} do not comply with the current settings: \
         both must tile evenly by the patch size {patch_size}"
    )]
    IncompatibleDimensions {
        width: u32,
        height: u32,
        patch_size: u32,
    },
    #[error("frame acquisition failed: {0}")]
    Acquisition(#[source] SourceError),
    #[error("worker pool initialization failed: {0}")]
    Pool(#[from] PoolError),
    #[error("operation not valid in pipeline state {state:?}")]
    InvalidState { state: PipelineState },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    Uninitialized,
    Ready,
    Running,
    Paused,
    Stopped,
}

/// Cooperative stop requester.
///
/// Clonable into subscriber callbacks or other threads; the run loop
/// checks the flag at the top of every iteration and never interrupts
/// in-flight work.
#[derive(Clone)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn request_stop(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// The per-frame control loop and lifecycle owner.
///
/// One pipeline owns its frame source, its worker pool (or the inline
/// decode path when `num_workers == 0`), and its event bus; instances are
/// fully independent of each other. Each `update` tick grabs at most one
/// frame and either hands it to a free worker slot or decodes it inline.
/// When every slot is busy the frame is dropped, not queued: freshness
/// over completeness.
pub struct Pipeline {
    config: PipelineConfig,
    state: PipelineState,
    source: Option<Box<dyn FrameSource>>,
    pool: Option<WorkerPool>,
    inline_path: Option<DecodePath>,
    inline_buffer: Option<FrameBuffer>,
    bus: EventBus<DecodeResult>,
    stop: Arc<AtomicBool>,
    source_ended: bool,
    frames_dropped: u64,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            state: PipelineState::Uninitialized,
            source: None,
            pool: None,
            inline_path: None,
            inline_buffer: None,
            bus: EventBus::new(),
            stop: Arc::new(AtomicBool::new(false)),
            source_ended: false,
            frames_dropped: 0,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Frames skipped because every worker slot was busy. Dropped frames
    /// are never redelivered; the next tick grabs a fresh one.
    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            flag: self.stop.clone(),
        }
    }

    /// Subscribes to every processed frame. The payload is empty when the
    /// locator found no candidate regions.
    pub fn on_processed(&mut self, callback: impl FnMut(Option<&DecodeResult>) + 'static) {
        self.bus.subscribe(TOPIC_PROCESSED, callback);
    }

    /// Subscribes to frames that yielded a decoded symbol.
    pub fn on_detected(&mut self, callback: impl FnMut(Option<&DecodeResult>) + 'static) {
        self.bus.subscribe(TOPIC_DETECTED, callback);
    }

    /// Acquires the frame source and brings up the decode capacity.
    ///
    /// With locating enabled the source dimensions must tile evenly by the
    /// locator patch size; incompatible dimensions are auto-corrected via
    /// [`FrameSource::try_set_dimensions`] where the source allows it and
    /// are a fatal configuration error otherwise. With `num_workers > 0`
    /// this blocks until every worker slot reports ready.
    pub fn initialize(
        &mut self,
        mut source: Box<dyn FrameSource>,
        factory: DecodePathFactory,
    ) -> Result<(), PipelineError> {
        if !matches!(
            self.state,
            PipelineState::Uninitialized | PipelineState::Stopped
        ) {
            return Err(PipelineError::InvalidState { state: self.state });
        }

        if self.config.locate {
            self.check_dimension_constraints(source.as_mut())?;
        }
        let (width, height) = (source.width(), source.height());

        if self.config.num_workers > 0 {
            self.pool = Some(WorkerPool::initialize(
                self.config.num_workers,
                width,
                height,
                &factory,
            )?);
            self.inline_path = None;
            self.inline_buffer = None;
            log::info!("pipeline ready, {} workers", self.config.num_workers);
        } else {
            self.pool = None;
            self.inline_path = Some(factory(width, height));
            self.inline_buffer = Some(FrameBuffer::new(width, height));
            log::info!("pipeline ready, inline mode");
        }

        self.source = Some(source);
        self.source_ended = false;
        self.frames_dropped = 0;
        self.stop.store(false, Ordering::Relaxed);
        self.state = PipelineState::Ready;
        Ok(())
    }

    fn check_dimension_constraints(
        &self,
        source: &mut dyn FrameSource,
    ) -> Result<(), PipelineError> {
        let patch = self.config.locator.patch_size;
        let scale = if self.config.locator.half_sample { 2 } else { 1 };
        let (width, height) = (source.width(), source.height());

        let fits = |w: u32, h: u32| {
            let (ew, eh) = (w / scale, h / scale);
            ew >= patch && eh >= patch && ew % patch == 0 && eh % patch == 0
        };
        if fits(width, height) {
            return Ok(());
        }

        let target_w = width / scale / patch * patch * scale;
        let target_h = height / scale / patch * patch * scale;
        if target_w > 0
            && target_h > 0
            && source.try_set_dimensions(target_w, target_h)
            && fits(source.width(), source.height())
        {
            log::debug!("source dimensions adjusted to {target_w}x{target_h} for patch size {patch}");
            return Ok(());
        }

        Err(PipelineError::IncompatibleDimensions {
            width,
            height,
            patch_size: patch,
        })
    }

    /// Runs one driver tick.
    ///
    /// Surfaces any completed worker results, then grabs at most one new
    /// frame: dispatched to a free slot in pool mode (fire-and-forget),
    /// decoded synchronously in inline mode. With every slot busy the tick
    /// returns immediately and the frame is dropped.
    pub fn update(&mut self) -> Result<(), PipelineError> {
        self.pump_results();

        let Some(source) = self.source.as_mut() else {
            return Err(PipelineError::InvalidState { state: self.state });
        };

        match self.pool.as_mut() {
            Some(pool) if !pool.is_empty() => {
                let Some(slot) = pool.find_free() else {
                    self.frames_dropped += 1;
                    log::trace!("all workers busy, frame dropped");
                    return Ok(());
                };
                let Some(mut buffer) = pool.take_buffer(slot) else {
                    debug_assert!(false, "free slot {slot} had no buffer");
                    return Ok(());
                };
                let status = match source.grab_into(&mut buffer) {
                    Ok(status) => status,
                    Err(e) => {
                        pool.restore_buffer(slot, buffer);
                        return Err(PipelineError::Acquisition(e));
                    }
                };
                match status {
                    GrabStatus::NewFrame => pool.dispatch(slot, buffer),
                    GrabStatus::Pending => pool.restore_buffer(slot, buffer),
                    GrabStatus::Ended => {
                        pool.restore_buffer(slot, buffer);
                        self.source_ended = true;
                    }
                }
            }
            _ => {
                let (Some(path), Some(buffer)) =
                    (self.inline_path.as_mut(), self.inline_buffer.as_mut())
                else {
                    return Err(PipelineError::InvalidState { state: self.state });
                };
                let status = source
                    .grab_into(buffer)
                    .map_err(PipelineError::Acquisition)?;
                match status {
                    GrabStatus::NewFrame => {
                        let result = path.locate_and_decode(buffer);
                        Self::publish_result(&mut self.bus, result.as_ref());
                    }
                    GrabStatus::Pending => {}
                    GrabStatus::Ended => self.source_ended = true,
                }
            }
        }
        Ok(())
    }

    fn pump_results(&mut self) {
        let Some(pool) = self.pool.as_mut() else {
            return;
        };
        let results = pool.drain_results();
        for result in &results {
            Self::publish_result(&mut self.bus, result.as_ref());
        }
    }

    fn publish_result(bus: &mut EventBus<DecodeResult>, result: Option<&DecodeResult>) {
        bus.publish(TOPIC_PROCESSED, result);
        if result.is_some_and(|r| r.code_result.is_some()) {
            bus.publish(TOPIC_DETECTED, result);
        }
    }

    /// Runs the cooperative run loop on the calling thread.
    ///
    /// The stop flag is checked at the top of every iteration; setting it
    /// (via [`pause`](Self::pause), [`stop`](Self::stop) before a restart,
    /// or a [`StopHandle`]) lets the current iteration finish and then
    /// exits the loop, leaving the pool intact and the pipeline paused.
    /// Sources that declare themselves live are ticked at the configured
    /// interval regardless of the configured mode; finite sources run
    /// unthrottled until exhausted and fully drained.
    pub fn start(&mut self) -> Result<(), PipelineError> {
        if !matches!(self.state, PipelineState::Ready | PipelineState::Paused) {
            return Err(PipelineError::InvalidState { state: self.state });
        }
        let live = self.config.stream.mode == StreamMode::Live
            || self.source.as_ref().map_or(false, |s| s.is_live());
        self.stop.store(false, Ordering::Relaxed);
        self.state = PipelineState::Running;
        log::debug!("pipeline running");

        loop {
            if self.stop.load(Ordering::Relaxed) {
                break;
            }
            if let Err(e) = self.update() {
                self.state = PipelineState::Paused;
                return Err(e);
            }
            if live {
                std::thread::sleep(self.config.stream.tick);
            } else if self.source_ended {
                if self.pool.as_ref().map_or(true, |p| p.busy_count() == 0) {
                    break;
                }
                std::thread::sleep(DRAIN_WAIT);
            }
        }

        if self.state == PipelineState::Running {
            self.state = PipelineState::Paused;
        }
        Ok(())
    }

    /// Requests a cooperative halt after the current iteration; the worker
    /// pool is left intact and idle.
    pub fn pause(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if self.state == PipelineState::Running {
            self.state = PipelineState::Paused;
        }
    }

    /// Halts the loop, terminates every worker slot, and releases the
    /// frame source. Idempotent. A subsequent `start` requires
    /// `initialize` to be run again.
    pub fn stop(&mut self) {
        if matches!(
            self.state,
            PipelineState::Stopped | PipelineState::Uninitialized
        ) {
            return;
        }
        self.stop.store(true, Ordering::Relaxed);
        if let Some(mut pool) = self.pool.take() {
            pool.terminate();
        }
        self.inline_path = None;
        self.inline_buffer = None;
        if let Some(mut source) = self.source.take() {
            source.release();
        }
        self.state = PipelineState::Stopped;
        log::debug!("pipeline stopped");
    }

    /// Reconfigures the active symbologies on the local decoder or on
    /// every worker slot.
    pub fn set_readers(&mut self, readers: &[Symbology]) {
        if let Some(path) = self.inline_path.as_mut() {
            path.set_readers(readers);
        } else if let Some(pool) = self.pool.as_mut() {
            pool.set_readers(readers);
        }
    }

    /// One-shot decode: runs the pipeline until the first "detected" event
    /// or until the source is exhausted, then tears everything down.
    ///
    /// `callback` receives the first detected result. If nothing decodes
    /// before the source ends, the callback is never invoked.
    pub fn decode_single(
        mut config: PipelineConfig,
        source: Box<dyn FrameSource>,
        factory: DecodePathFactory,
        callback: impl FnOnce(&DecodeResult) + 'static,
    ) -> Result<(), PipelineError> {
        config.stream.mode = StreamMode::Sequence;
        let mut pipeline = Pipeline::new(config);
        pipeline.initialize(source, factory)?;

        let stop = pipeline.stop_handle();
        let mut callback = Some(callback);
        pipeline.bus.subscribe_once(TOPIC_DETECTED, move |payload| {
            stop.request_stop();
            if let (Some(callback), Some(result)) = (callback.take(), payload) {
                callback(result);
            }
        });

        pipeline.start()?;
        pipeline.stop();
        Ok(())
    }
}
