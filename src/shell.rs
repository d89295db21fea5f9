//! Async Engine Shell - ring-fed worker thread around the matching engine.
//!
//! Callers enqueue [`CmdEnvelope`]s into an SPSC ring; a dedicated worker
//! thread drains the ring in FIFO order into a [`MatchingEngine`] and
//! fulfils a one-shot reply slot per envelope. The engine therefore sees
//! commands in exactly the order the producer submitted them.
//!
//! Synchronisation choice (of the two the design permits): the engine sits
//! behind a `parking_lot::RwLock`. The worker takes the write lock around
//! every mutating call; `snapshot`/`metrics` are served directly to the
//! reader side under the read lock rather than through the queue. The ring
//! remains the only synchronisation on the command path.
//!
//! Submission methods take `&mut self`, so the single-producer discipline of
//! the ring is a compile-time property of the shell as well.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex, RwLock};
use tracing::{debug, trace};

use crate::command::{AddResult, Id, OrderCmd, OrderStatus, Snapshot};
use crate::engine::{Engine, EngineConfig, MatchingEngine, Metrics};
use crate::ring::{Consumer, Producer, SpscRing};

/// Envelopes carried by the submission ring.
pub enum CmdEnvelope {
    /// Admit an order; the result is published into `reply`.
    Add {
        cmd: OrderCmd,
        reply: ReplySlot<AddResult>,
    },
    /// Cancel a resting order; the outcome is published into `reply`.
    Cancel { id: Id, reply: ReplySlot<bool> },
    /// Shut the worker down after draining the ring.
    Stop,
}

// ============================================================================
// One-shot reply slots
// ============================================================================

struct Slot<T> {
    value: Mutex<Option<T>>,
    ready: Condvar,
}

/// Fulfilment half of a one-shot reply. Held by the worker.
pub struct ReplySlot<T>(Arc<Slot<T>>);

/// Waiting half of a one-shot reply. Held by the submitter.
pub struct ReplyHandle<T>(Arc<Slot<T>>);

/// Create a connected (fulfil, wait) pair.
pub fn reply_pair<T>() -> (ReplySlot<T>, ReplyHandle<T>) {
    let slot = Arc::new(Slot {
        value: Mutex::new(None),
        ready: Condvar::new(),
    });
    (ReplySlot(Arc::clone(&slot)), ReplyHandle(slot))
}

impl<T> ReplySlot<T> {
    /// Publish the value and wake the waiter. Consumes the slot; every
    /// enqueued envelope is fulfilled exactly once, including at shutdown.
    pub fn fulfil(self, value: T) {
        let mut guard = self.0.value.lock();
        *guard = Some(value);
        drop(guard);
        self.0.ready.notify_one();
    }
}

impl<T> ReplyHandle<T> {
    /// Block until the worker publishes, then take the value.
    pub fn wait(self) -> T {
        let mut guard = self.0.value.lock();
        loop {
            if let Some(value) = guard.take() {
                return value;
            }
            self.0.ready.wait(&mut guard);
        }
    }

    /// Take the value if it has already been published.
    pub fn try_take(&mut self) -> Option<T> {
        self.0.value.lock().take()
    }
}

// ============================================================================
// Shell
// ============================================================================

/// Shell configuration, fixed at construction.
#[derive(Clone, Copy, Debug)]
pub struct ShellConfig {
    /// Ring capacity; must be a power of two >= 2
    pub ring_capacity: usize,
    /// Pin the worker to the last CPU core
    pub pin_worker: bool,
    /// Configuration for the engine the worker owns
    pub engine: EngineConfig,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            ring_capacity: 1 << 16,
            pin_worker: false,
            engine: EngineConfig::default(),
        }
    }
}

/// Read-only view onto the shell's engine, cloneable across threads.
///
/// Reads take the engine read lock, so a snapshot is never interleaved with
/// a partially applied admission.
#[derive(Clone)]
pub struct ShellMonitor {
    engine: Arc<RwLock<MatchingEngine>>,
}

impl ShellMonitor {
    /// Aggregated depth, `depth` levels per side.
    pub fn snapshot(&self, depth: i32) -> Snapshot {
        self.engine.read().snapshot(depth)
    }

    /// Current counters and latency stats.
    pub fn metrics(&self) -> Metrics {
        self.engine.read().metrics()
    }
}

/// Owns the submission ring and the worker thread that drains it.
///
/// Dropping the shell enqueues [`CmdEnvelope::Stop`] and joins the worker;
/// any envelopes still queued behind the stop marker are fulfilled with
/// terminal results (`Reject` for adds, `false` for cancels).
pub struct AsyncEngineShell {
    producer: Producer<CmdEnvelope>,
    engine: Arc<RwLock<MatchingEngine>>,
    worker: Option<JoinHandle<()>>,
}

/// Envelopes drained per wakeup of the worker.
const WORKER_BATCH: usize = 256;

impl AsyncEngineShell {
    /// Create a shell with the default configuration.
    pub fn new() -> Self {
        Self::with_config(ShellConfig::default())
    }

    /// Create a shell with an explicit configuration.
    pub fn with_config(config: ShellConfig) -> Self {
        let (producer, consumer) = SpscRing::with_capacity(config.ring_capacity).split();
        let engine = Arc::new(RwLock::new(MatchingEngine::with_config(config.engine)));

        let worker_engine = Arc::clone(&engine);
        let pin = config.pin_worker;
        let worker = thread::Builder::new()
            .name("tickmatch-worker".into())
            .spawn(move || worker_loop(consumer, worker_engine, pin))
            .expect("failed to spawn engine worker");

        Self {
            producer,
            engine,
            worker: Some(worker),
        }
    }

    /// Enqueue an add and return a handle to await the result.
    pub fn submit(&mut self, cmd: OrderCmd) -> ReplyHandle<AddResult> {
        let (slot, handle) = reply_pair();
        self.push_retrying(CmdEnvelope::Add { cmd, reply: slot });
        handle
    }

    /// Enqueue a cancel and return a handle to await the outcome.
    pub fn submit_cancel(&mut self, id: Id) -> ReplyHandle<bool> {
        let (slot, handle) = reply_pair();
        self.push_retrying(CmdEnvelope::Cancel { id, reply: slot });
        handle
    }

    /// Submit an add and block for the result.
    pub fn add_order(&mut self, cmd: OrderCmd) -> AddResult {
        self.submit(cmd).wait()
    }

    /// Submit a cancel and block for the outcome.
    pub fn cancel_order(&mut self, id: Id) -> bool {
        self.submit_cancel(id).wait()
    }

    /// Aggregated depth, read directly under the engine read lock.
    pub fn snapshot(&self, depth: i32) -> Snapshot {
        self.engine.read().snapshot(depth)
    }

    /// Current counters, read directly under the engine read lock.
    pub fn metrics(&self) -> Metrics {
        self.engine.read().metrics()
    }

    /// A cloneable read-only view for monitor threads.
    pub fn monitor(&self) -> ShellMonitor {
        ShellMonitor {
            engine: Arc::clone(&self.engine),
        }
    }

    /// Busy-push with a yield on transient full.
    fn push_retrying(&mut self, envelope: CmdEnvelope) {
        let mut pending = envelope;
        loop {
            match self.producer.push(pending) {
                Ok(()) => return,
                Err(back) => {
                    pending = back;
                    thread::yield_now();
                }
            }
        }
    }
}

impl Default for AsyncEngineShell {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AsyncEngineShell {
    fn drop(&mut self) {
        self.push_retrying(CmdEnvelope::Stop);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

// ============================================================================
// Worker
// ============================================================================

fn worker_loop(mut rx: Consumer<CmdEnvelope>, engine: Arc<RwLock<MatchingEngine>>, pin: bool) {
    if pin {
        pin_to_last_core();
    }
    trace!("engine worker started");

    let mut batch = Vec::with_capacity(WORKER_BATCH);
    loop {
        if rx.try_pop_n(&mut batch, WORKER_BATCH) == 0 {
            std::hint::spin_loop();
            thread::yield_now();
            continue;
        }

        let mut stopping = false;
        for envelope in batch.drain(..) {
            if stopping {
                terminal_reply(envelope);
                continue;
            }
            match envelope {
                CmdEnvelope::Add { cmd, reply } => {
                    reply.fulfil(engine.write().add_order(cmd));
                }
                CmdEnvelope::Cancel { id, reply } => {
                    reply.fulfil(engine.write().cancel_order(id));
                }
                CmdEnvelope::Stop => stopping = true,
            }
        }

        if stopping {
            drain_after_stop(&mut rx);
            debug!("engine worker stopped");
            return;
        }
    }
}

/// Fulfil everything still queued behind a stop marker with terminal results.
fn drain_after_stop(rx: &mut Consumer<CmdEnvelope>) {
    let mut rejected = 0u64;
    while let Some(envelope) = rx.pop() {
        terminal_reply(envelope);
        rejected += 1;
    }
    if rejected > 0 {
        debug!(rejected, "rejected commands queued behind shutdown");
    }
}

fn terminal_reply(envelope: CmdEnvelope) {
    match envelope {
        CmdEnvelope::Add { cmd, reply } => {
            reply.fulfil(AddResult::rejected(OrderStatus::Reject, 0, cmd.qty));
        }
        CmdEnvelope::Cancel { reply, .. } => reply.fulfil(false),
        CmdEnvelope::Stop => {}
    }
}

/// Pin the current thread to the last available CPU core.
///
/// The last core is the one most often isolated from OS interrupts.
fn pin_to_last_core() {
    if let Some(core_ids) = core_affinity::get_core_ids() {
        if let Some(last_core) = core_ids.last() {
            core_affinity::set_for_current(*last_core);
        }
    }
}
