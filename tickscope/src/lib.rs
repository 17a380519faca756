//! # tickscope — embedded stack-sampling profiler for game servers
//!
//! tickscope lives inside a long-running host process and answers "where is
//! the server spending its time" without materially changing how the server
//! runs. A background task periodically captures thread call stacks through
//! a pluggable backend, folds them into weighted call trees, and hands out
//! immutable, mergeable snapshots for export.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 Host process (game server)               │
//! │   HostPlatform: scheduler + capture backends + metadata  │
//! └───────────────────────────┬──────────────────────────────┘
//!                             │ thread dumps (best effort)
//!                             ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │                    Sampling session                      │
//! │                                                          │
//! │  ThreadDumper ──▶ ThreadGrouper ──▶ CallTree buckets     │
//! │   (selection)      (bucketing)       (accumulation)      │
//! │                        │                                 │
//! │                        ▼                                 │
//! │              MethodDisambiguator                         │
//! │              (overload identity, cached)                 │
//! └───────────────────────────┬──────────────────────────────┘
//!                             │ merge mode, attribution
//!                             ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │        SamplerSnapshot (immutable, serializable)         │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`sampler`]: the engine — selection/grouping policies, overload
//!   disambiguation, the session builder, and the session itself
//!   (lifecycle, scheduling, fault handling)
//! - [`calltree`]: weighted call-tree accumulation and the merge algebra
//!   used at export and when combining runs
//! - [`capture`]: the capture backend contract and backend selection
//! - [`export`]: snapshot construction and JSON serialization
//! - [`platform`]: the one handle the host supplies; no ambient globals
//! - [`command`]: token parsing + tab completion for host command systems
//! - [`domain`]: shared value types and the error taxonomy
//!
//! ## Typical Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tickscope::export::ExportProps;
//! use tickscope::platform::HostPlatform;
//! use tickscope::sampler::{SamplerBuilder, ThreadGrouper};
//!
//! # async fn profile(platform: Arc<dyn HostPlatform>) -> anyhow::Result<()> {
//! let sampler = SamplerBuilder::new()
//!     .thread_grouper(ThreadGrouper::ByPool)
//!     .sampling_interval(Duration::from_millis(10))
//!     .complete_after(Duration::from_secs(30))
//!     .start(&platform)?;
//!
//! sampler.wait_until_done().await;
//! let snapshot = sampler.export(&ExportProps::new());
//! snapshot.write_json(std::io::stdout())?;
//! # Ok(())
//! # }
//! ```

pub mod calltree;
pub mod capture;
pub mod command;
pub mod domain;
pub mod export;
pub mod platform;
pub mod sampler;

pub use calltree::MergeMode;
pub use domain::{MethodIdentity, StackFrame, ThreadId, ThreadInfo};
pub use export::{ExportProps, SamplerSnapshot};
pub use platform::HostPlatform;
pub use sampler::{Sampler, SamplerBuilder, ThreadDumper, ThreadGrouper};
