//! Session configuration surface.
//!
//! All options are set before `start()`; `start()` validates, picks the
//! capture backend, and hands back an already-running [`Sampler`] bound to
//! the given host platform.

use std::sync::Arc;
use std::time::Duration;

use crate::capture::select_backend;
use crate::domain::StartError;
use crate::platform::HostPlatform;
use crate::sampler::disambiguator::MethodDisambiguator;
use crate::sampler::dumper::ThreadDumper;
use crate::sampler::grouper::ThreadGrouper;
use crate::sampler::session::{Sampler, SamplerConfig};

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug)]
pub struct SamplerBuilder {
    thread_dumper: ThreadDumper,
    thread_grouper: ThreadGrouper,
    sampling_interval: Duration,
    force_fallback_backend: bool,
    complete_after: Option<Duration>,
}

impl Default for SamplerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SamplerBuilder {
    pub fn new() -> Self {
        Self {
            thread_dumper: ThreadDumper::All,
            thread_grouper: ThreadGrouper::ByPool,
            sampling_interval: DEFAULT_INTERVAL,
            force_fallback_backend: false,
            complete_after: None,
        }
    }

    /// Which threads to sample. Defaults to all live threads.
    #[must_use]
    pub fn thread_dumper(mut self, dumper: ThreadDumper) -> Self {
        self.thread_dumper = dumper;
        self
    }

    /// How sampled threads are bucketed. Defaults to pool grouping.
    #[must_use]
    pub fn thread_grouper(mut self, grouper: ThreadGrouper) -> Self {
        self.thread_grouper = grouper;
        self
    }

    /// Time between captures. Defaults to 10ms.
    #[must_use]
    pub fn sampling_interval(mut self, interval: Duration) -> Self {
        self.sampling_interval = interval;
        self
    }

    /// Use the runtime-provided backend even when a native one exists.
    #[must_use]
    pub fn force_fallback_backend(mut self, force: bool) -> Self {
        self.force_fallback_backend = force;
        self
    }

    /// Stop automatically this long after starting. Unbounded by default.
    #[must_use]
    pub fn complete_after(mut self, duration: Duration) -> Self {
        self.complete_after = Some(duration);
        self
    }

    /// Validate the configuration and start sampling.
    ///
    /// Fails fast — before any scheduling — on a zero interval, an empty
    /// thread selection, or a platform with no capture backend.
    pub fn start(self, platform: &Arc<dyn HostPlatform>) -> Result<Sampler, StartError> {
        if self.sampling_interval.is_zero() {
            return Err(StartError::ZeroInterval);
        }
        if self.thread_dumper.is_empty_selection() {
            return Err(StartError::EmptyThreadSelection);
        }

        let backend = select_backend(platform.as_ref(), self.force_fallback_backend)?;
        let disambiguator = MethodDisambiguator::new(platform.class_metadata());

        let config = SamplerConfig {
            interval: self.sampling_interval,
            complete_after: self.complete_after,
            dumper: self.thread_dumper,
            grouper: self.thread_grouper,
        };
        Ok(Sampler::start(config, backend, disambiguator, platform))
    }
}
