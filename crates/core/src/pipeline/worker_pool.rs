use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use thiserror::Error;

use crate::pipeline::decode_path::DecodePathFactory;
use crate::shared::decode_result::{DecodeResult, Symbology};
use crate::shared::frame_buffer::FrameBuffer;

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("worker exited before reporting ready")]
    WorkerExited,
}

enum WorkerCommand {
    Process(FrameBuffer),
    SetReaders(Vec<Symbology>),
    Shutdown,
}

enum WorkerEvent {
    Initialized {
        slot: usize,
        buffer: FrameBuffer,
    },
    Processed {
        slot: usize,
        buffer: FrameBuffer,
        result: Option<DecodeResult>,
    },
}

/// One unit of parallel decode capacity.
///
/// The slot owns a reusable frame buffer while idle; on dispatch the
/// buffer moves to the worker thread and comes back with the result.
/// `busy` flips true exactly when a job is dispatched and false exactly
/// when its result is drained.
struct WorkerSlot {
    busy: bool,
    buffer: Option<FrameBuffer>,
    commands: Sender<WorkerCommand>,
    handle: Option<JoinHandle<()>>,
}

/// A fixed-size collection of worker slots.
///
/// Parallelism is fire-and-forget with asynchronous results: the driver
/// dispatches without waiting and collects completions via
/// [`drain_results`](Self::drain_results). All cross-thread communication
/// is message passing; no image buffer is ever addressable from two
/// threads at once.
pub struct WorkerPool {
    slots: Vec<WorkerSlot>,
    events: Receiver<WorkerEvent>,
}

impl WorkerPool {
    /// Spawns `size` workers, each with its own frame buffer and its own
    /// decode path built from `factory` on the worker thread.
    ///
    /// Blocks until every slot has reported ready. A worker that never
    /// reports ready blocks indefinitely; callers wanting a bound must
    /// apply their own timeout around initialization.
    pub fn initialize(
        size: usize,
        width: u32,
        height: u32,
        factory: &DecodePathFactory,
    ) -> Result<Self, PoolError> {
        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        let mut slots = Vec::with_capacity(size);

        for id in 0..size {
            let (cmd_tx, cmd_rx) = crossbeam_channel::unbounded();
            let buffer = FrameBuffer::new(width, height);
            let factory = factory.clone();
            let event_tx = event_tx.clone();
            let handle = std::thread::Builder::new()
                .name(format!("decode-worker-{id}"))
                .spawn(move || worker_loop(id, buffer, factory, cmd_rx, event_tx))
                .map_err(PoolError::Spawn)?;
            slots.push(WorkerSlot {
                busy: true,
                buffer: None,
                commands: cmd_tx,
                handle: Some(handle),
            });
        }
        // Only workers hold senders now; if they all die before reporting
        // ready, recv below disconnects instead of blocking forever.
        drop(event_tx);

        let mut pool = Self {
            slots,
            events: event_rx,
        };
        let mut ready = 0;
        while ready < size {
            match pool.events.recv() {
                Ok(WorkerEvent::Initialized { slot, buffer }) => {
                    pool.slots[slot].busy = false;
                    pool.slots[slot].buffer = Some(buffer);
                    ready += 1;
                    log::debug!("worker {slot} initialized");
                }
                // Processed cannot arrive before all Initialized events.
                Ok(WorkerEvent::Processed { .. }) => {}
                Err(_) => return Err(PoolError::WorkerExited),
            }
        }
        Ok(pool)
    }

    pub fn size(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn busy_count(&self) -> usize {
        self.slots.iter().filter(|s| s.busy).count()
    }

    /// First idle slot, if any. A stable linear scan: slot order acts as
    /// an implicit priority among otherwise-equivalent workers.
    pub fn find_free(&self) -> Option<usize> {
        self.slots.iter().position(|s| !s.busy)
    }

    /// Moves an idle slot's buffer out so the frame source can write into
    /// it. Returns `None` while the slot is busy (its buffer is on the
    /// worker thread).
    pub fn take_buffer(&mut self, slot: usize) -> Option<FrameBuffer> {
        let slot = self.slots.get_mut(slot)?;
        if slot.busy {
            return None;
        }
        slot.buffer.take()
    }

    /// Returns a buffer taken with [`take_buffer`](Self::take_buffer)
    /// when no frame arrived and nothing was dispatched.
    pub fn restore_buffer(&mut self, slot: usize, buffer: FrameBuffer) {
        if let Some(slot) = self.slots.get_mut(slot) {
            slot.buffer = Some(buffer);
        }
    }

    /// Marks the slot busy and hands the frame to its worker.
    ///
    /// Precondition: the slot is idle. Dispatching to a busy slot would
    /// break the one-job-per-slot invariant.
    pub fn dispatch(&mut self, slot: usize, buffer: FrameBuffer) {
        let slot = &mut self.slots[slot];
        debug_assert!(!slot.busy, "dispatch to a busy slot");
        slot.busy = true;
        // Send fails only if the worker exited; the job is then dropped
        // like any other backpressured frame.
        if slot.commands.send(WorkerCommand::Process(buffer)).is_err() {
            log::warn!("worker exited, frame dropped");
        }
    }

    /// Collects completed jobs without blocking, in arrival order.
    ///
    /// Each completion frees its slot and restores the slot's buffer.
    /// Results for slots that no longer exist (terminated pool) are
    /// discarded.
    pub fn drain_results(&mut self) -> Vec<Option<DecodeResult>> {
        let mut results = Vec::new();
        for event in self.events.try_iter() {
            if let WorkerEvent::Processed {
                slot,
                buffer,
                result,
            } = event
            {
                match self.slots.get_mut(slot) {
                    Some(slot) => {
                        slot.busy = false;
                        slot.buffer = Some(buffer);
                        results.push(result);
                    }
                    None => log::trace!("discarding result from terminated worker {slot}"),
                }
            }
        }
        results
    }

    /// Forwards a reader reconfiguration to every worker.
    pub fn set_readers(&mut self, readers: &[Symbology]) {
        for slot in &self.slots {
            let _ = slot.commands.send(WorkerCommand::SetReaders(readers.to_vec()));
        }
    }

    /// Stops every worker and releases its resources; the pool is empty
    /// afterwards. Safe to call with jobs in flight: their results land in
    /// the event channel and are discarded. A job whose decode never
    /// returns will hold up the join (no per-job timeout exists).
    pub fn terminate(&mut self) {
        for slot in &mut self.slots {
            let _ = slot.commands.send(WorkerCommand::Shutdown);
        }
        for slot in &mut self.slots {
            if let Some(handle) = slot.handle.take() {
                let _ = handle.join();
            }
            log::debug!("worker terminated");
        }
        self.slots.clear();
    }
}

fn worker_loop(
    id: usize,
    buffer: FrameBuffer,
    factory: DecodePathFactory,
    commands: Receiver<WorkerCommand>,
    events: Sender<WorkerEvent>,
) {
    let mut path = factory(buffer.width(), buffer.height());
    if events
        .send(WorkerEvent::Initialized { slot: id, buffer })
        .is_err()
    {
        return;
    }

    for command in commands {
        match command {
            WorkerCommand::Process(frame) => {
                let result = path.locate_and_decode(&frame);
                let sent = events.send(WorkerEvent::Processed {
                    slot: id,
                    buffer: frame,
                    result,
                });
                if sent.is_err() {
                    break;
                }
            }
            WorkerCommand::SetReaders(readers) => path.set_readers(&readers),
            WorkerCommand::Shutdown => break,
        }
    }
}
