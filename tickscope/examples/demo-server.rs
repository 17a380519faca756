//! Demo host for tickscope.
//!
//! Simulates a tiny game server with two worker threads that alternate
//! between pathfinding and persistence work, wires up a host platform whose
//! backend reads each worker's current phase, then profiles the "server"
//! for two seconds and prints the snapshot JSON.
//!
//! ```bash
//! cargo run --example demo-server
//! ```

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tickscope::capture::{CaptureBackend, ThreadDump};
use tickscope::domain::{CaptureError, StackFrame, ThreadId, ThreadInfo};
use tickscope::export::ExportProps;
use tickscope::platform::HostPlatform;
use tickscope::sampler::{SamplerBuilder, ThreadGrouper};

const PHASE_PATHFIND: u8 = 0;
const PHASE_PERSIST: u8 = 1;

struct Worker {
    info: ThreadInfo,
    phase: Arc<AtomicU8>,
}

/// Backend that reconstructs each worker's stack from the phase it
/// published. A real host would walk actual thread stacks here.
struct PhaseBackend {
    workers: Vec<Worker>,
}

impl CaptureBackend for PhaseBackend {
    fn name(&self) -> &'static str {
        "phase-board"
    }

    fn dump(&self) -> Result<Vec<ThreadDump>, CaptureError> {
        Ok(self
            .workers
            .iter()
            .map(|worker| {
                let leaf = match worker.phase.load(Ordering::Relaxed) {
                    PHASE_PATHFIND => StackFrame::new("demo.world.Pathfinder", "search", Some(88)),
                    _ => StackFrame::new("demo.storage.ChunkStore", "flush", Some(141)),
                };
                ThreadDump::new(
                    worker.info.clone(),
                    vec![
                        StackFrame::new("demo.server.GameLoop", "run", Some(30)),
                        StackFrame::new("demo.server.GameLoop", "tick", Some(57)),
                        leaf,
                    ],
                )
            })
            .collect())
    }
}

struct DemoPlatform {
    backend: Arc<PhaseBackend>,
}

impl HostPlatform for DemoPlatform {
    fn scheduler(&self) -> tokio::runtime::Handle {
        tokio::runtime::Handle::current()
    }

    fn fallback_backend(&self) -> Option<Arc<dyn CaptureBackend>> {
        Some(self.backend.clone())
    }
}

fn spawn_worker(id: u64, shutdown: Arc<AtomicBool>) -> Worker {
    let phase = Arc::new(AtomicU8::new(PHASE_PATHFIND));
    let cell = Arc::clone(&phase);
    let name = format!("Worker-{id}");
    std::thread::Builder::new()
        .name(name.clone())
        .spawn(move || {
            while !shutdown.load(Ordering::Relaxed) {
                cell.store(PHASE_PATHFIND, Ordering::Relaxed);
                std::thread::sleep(Duration::from_millis(7));
                cell.store(PHASE_PERSIST, Ordering::Relaxed);
                std::thread::sleep(Duration::from_millis(3));
            }
        })
        .expect("spawn worker");
    Worker {
        info: ThreadInfo::new(ThreadId(id), name),
        phase,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let shutdown = Arc::new(AtomicBool::new(false));
    let workers = (1u64..=2).map(|id| spawn_worker(id, shutdown.clone())).collect();
    let platform: Arc<dyn HostPlatform> = Arc::new(DemoPlatform {
        backend: Arc::new(PhaseBackend { workers }),
    });

    println!("profiling demo server for 2s at 10ms...");
    let sampler = SamplerBuilder::new()
        .thread_grouper(ThreadGrouper::ByPool)
        .sampling_interval(Duration::from_millis(10))
        .complete_after(Duration::from_secs(2))
        .start(&platform)?;

    sampler.wait_until_done().await;
    shutdown.store(true, Ordering::Relaxed);

    let stats = sampler.stats();
    println!(
        "captured {} ticks ({} stacks, {} faults)",
        stats.captures, stats.samples, stats.capture_faults
    );

    let snapshot = sampler.export(
        &ExportProps::new().creator(serde_json::json!({ "name": "demo-server" })),
    );
    snapshot.write_json(std::io::stdout().lock())?;
    println!();
    Ok(())
}
