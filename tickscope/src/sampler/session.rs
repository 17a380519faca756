//! Sampling session lifecycle and scheduling.
//!
//! One background task per session drives the capture→accumulate loop on
//! the host's runtime. That task is the *only* writer of the bucket map
//! while the session runs; everyone else (status queries, live exports)
//! reads. The task captures on the blocking pool under a time budget so a
//! stalled backend can never wedge the scheduler, and a fault in any single
//! tick is counted and skipped, never fatal.
//!
//! ```text
//!  Pending ──start()──▶ Running ──stop() / auto-end──▶ Stopped (terminal)
//! ```

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime};

use log::{debug, warn};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::calltree::{BucketMap, ThreadBucket};
use crate::capture::CaptureBackend;
use crate::domain::CaptureError;
use crate::platform::HostPlatform;
use crate::sampler::disambiguator::MethodDisambiguator;
use crate::sampler::dumper::ThreadDumper;
use crate::sampler::grouper::ThreadGrouper;

/// Ceiling for one capture attempt. An overrun abandons the tick; the next
/// scheduled tick retries naturally.
const CAPTURE_BUDGET: Duration = Duration::from_millis(250);

const STATUS_PENDING: u8 = 0;
const STATUS_RUNNING: u8 = 1;
const STATUS_STOPPED: u8 = 2;

/// Lifecycle state of a session. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerStatus {
    Pending,
    Running,
    Stopped,
}

impl SamplerStatus {
    fn from_raw(raw: u8) -> Self {
        match raw {
            STATUS_PENDING => SamplerStatus::Pending,
            STATUS_RUNNING => SamplerStatus::Running,
            _ => SamplerStatus::Stopped,
        }
    }
}

/// Runtime counters for a session. Capture faults are only ever visible
/// here and in logs — they never interrupt sampling.
#[derive(Debug, Clone, Copy, Default)]
pub struct SamplerStats {
    /// Ticks whose capture completed and was accumulated.
    pub captures: u64,
    /// Ticks abandoned to a backend fault or budget overrun.
    pub capture_faults: u64,
    /// Individual thread stacks folded into buckets.
    pub samples: u64,
}

#[derive(Debug)]
pub(crate) struct SamplerConfig {
    pub interval: Duration,
    pub complete_after: Option<Duration>,
    pub dumper: ThreadDumper,
    pub grouper: ThreadGrouper,
}

struct Inner {
    interval: Duration,
    grouper: ThreadGrouper,
    dumper: Arc<ThreadDumper>,
    backend: Arc<dyn CaptureBackend>,
    disambiguator: MethodDisambiguator,
    buckets: RwLock<BucketMap>,
    status: AtomicU8,
    start_time: SystemTime,
    auto_end_time: Option<SystemTime>,
    complete_after: Option<Duration>,
    stop_tx: watch::Sender<bool>,
    done_tx: watch::Sender<bool>,
    // Held so the completion send always has a receiver and therefore
    // always updates the stored value, even before anyone waits.
    done_rx: watch::Receiver<bool>,
    captures: AtomicU64,
    capture_faults: AtomicU64,
    samples: AtomicU64,
}

impl Inner {
    fn finish(&self) {
        self.status.store(STATUS_STOPPED, Ordering::Release);
        let _ = self.done_tx.send(true);
    }

    fn count_fault(&self) {
        self.capture_faults.fetch_add(1, Ordering::Relaxed);
    }
}

/// A sampling session. Cheap to clone; all clones share one session.
#[derive(Clone)]
pub struct Sampler {
    inner: Arc<Inner>,
}

impl Sampler {
    /// Build the session and immediately begin sampling on the platform's
    /// scheduler. The first capture is scheduled right away, subsequent
    /// ones at a fixed cadence (late ticks are skipped, not bursted, so
    /// elapsed-time statistics don't absorb drift).
    pub(crate) fn start(
        config: SamplerConfig,
        backend: Arc<dyn CaptureBackend>,
        disambiguator: MethodDisambiguator,
        platform: &Arc<dyn HostPlatform>,
    ) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        let (done_tx, done_rx) = watch::channel(false);
        let start_time = SystemTime::now();

        let inner = Arc::new(Inner {
            interval: config.interval,
            grouper: config.grouper,
            dumper: Arc::new(config.dumper),
            backend,
            disambiguator,
            buckets: RwLock::new(BucketMap::new()),
            status: AtomicU8::new(STATUS_PENDING),
            start_time,
            auto_end_time: config.complete_after.map(|d| start_time + d),
            complete_after: config.complete_after,
            stop_tx,
            done_tx,
            done_rx,
            captures: AtomicU64::new(0),
            capture_faults: AtomicU64::new(0),
            samples: AtomicU64::new(0),
        });

        inner.status.store(STATUS_RUNNING, Ordering::Release);
        platform
            .scheduler()
            .spawn(run_loop(Arc::clone(&inner), stop_rx));

        Sampler { inner }
    }

    pub fn status(&self) -> SamplerStatus {
        SamplerStatus::from_raw(self.inner.status.load(Ordering::Acquire))
    }

    pub fn is_done(&self) -> bool {
        self.status() == SamplerStatus::Stopped
    }

    /// Request the session stop. Idempotent; a no-op once stopped. The
    /// pending tick is cancelled, but an in-flight capture finishes first —
    /// call [`wait_until_done`](Self::wait_until_done) before exporting if
    /// a fully consistent bucket set is required.
    pub fn stop(&self) {
        let _ = self.inner.stop_tx.send(true);
    }

    /// Suspend until the session reaches `Stopped` (explicitly or via its
    /// auto-end time). Does not poll; returns immediately if already done.
    pub async fn wait_until_done(&self) {
        if self.is_done() {
            return;
        }
        let mut done_rx = self.inner.done_rx.clone();
        while !*done_rx.borrow_and_update() {
            if done_rx.changed().await.is_err() {
                break;
            }
        }
    }

    pub fn start_time(&self) -> SystemTime {
        self.inner.start_time
    }

    /// When the session will stop on its own; `None` when only an explicit
    /// `stop()` ends it.
    pub fn auto_end_time(&self) -> Option<SystemTime> {
        self.inner.auto_end_time
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    pub fn backend_name(&self) -> &'static str {
        self.inner.backend.name()
    }

    pub fn stats(&self) -> SamplerStats {
        SamplerStats {
            captures: self.inner.captures.load(Ordering::Relaxed),
            capture_faults: self.inner.capture_faults.load(Ordering::Relaxed),
            samples: self.inner.samples.load(Ordering::Relaxed),
        }
    }

    /// Copy the current bucket set.
    ///
    /// After `Stopped` this is the final, consistent accumulation. While
    /// `Running` it is a live view: each bucket is individually consistent,
    /// the cross-bucket cut is best-effort.
    pub fn snapshot_buckets(&self) -> BucketMap {
        match self.inner.buckets.read() {
            Ok(buckets) => buckets.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

/// The session's one background task.
async fn run_loop(inner: Arc<Inner>, mut stop_rx: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(inner.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let deadline = inner.complete_after;
    let auto_end = async move {
        match deadline {
            Some(after) => tokio::time::sleep(after).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(auto_end);

    loop {
        tokio::select! {
            _ = stop_rx.changed() => {
                debug!("sampler stop requested");
                break;
            }
            () = &mut auto_end => {
                debug!("sampler reached its auto-end time");
                break;
            }
            _ = ticker.tick() => {
                capture_once(&inner).await;
            }
        }
    }

    inner.finish();
}

/// One tick: capture on the blocking pool under the budget, then fold the
/// result into the buckets. Any fault is logged, counted and skipped.
async fn capture_once(inner: &Arc<Inner>) {
    let dumper = Arc::clone(&inner.dumper);
    let backend = Arc::clone(&inner.backend);
    let capture = tokio::task::spawn_blocking(move || dumper.capture(backend.as_ref()));

    let dumps = match tokio::time::timeout(CAPTURE_BUDGET, capture).await {
        Err(_elapsed) => {
            let err = CaptureError::BudgetExceeded {
                budget_ms: CAPTURE_BUDGET.as_millis() as u64,
            };
            warn!("abandoning capture tick: {err}");
            inner.count_fault();
            return;
        }
        Ok(Err(join_err)) => {
            warn!("capture task failed: {join_err}");
            inner.count_fault();
            return;
        }
        Ok(Ok(Err(err))) => {
            warn!("capture fault: {err}");
            inner.count_fault();
            return;
        }
        Ok(Ok(Ok(dumps))) => dumps,
    };

    // An empty dump is a normal tick: the capture succeeded and matched no
    // threads.
    let Ok(mut buckets) = inner.buckets.write() else {
        inner.count_fault();
        return;
    };
    for dump in &dumps {
        let key = inner.grouper.group_key(&dump.thread);
        let bucket = buckets
            .entry(key.clone())
            .or_insert_with(|| ThreadBucket::new(key));
        bucket.accumulate(&dump.frames, |frame| inner.disambiguator.resolve(frame));
        inner.samples.fetch_add(1, Ordering::Relaxed);
    }
    drop(buckets);

    inner.captures.fetch_add(1, Ordering::Relaxed);
}
