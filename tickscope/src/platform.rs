//! Host platform seam.
//!
//! The sampler never reaches for process-wide state: everything it needs
//! from the embedding server — a scheduler to run its periodic task on,
//! the capture backends the platform ships, class metadata for overload
//! disambiguation — arrives through this one handle, passed explicitly at
//! `start()`.

use std::sync::Arc;

use crate::capture::CaptureBackend;
use crate::sampler::disambiguator::ClassMetadata;

/// Services the embedding host provides to a sampling session.
pub trait HostPlatform: Send + Sync {
    /// Runtime the session's periodic capture task is spawned on.
    ///
    /// This is the host's scheduling contract: timers, periodic callbacks
    /// and off-main-thread execution all come from this handle.
    fn scheduler(&self) -> tokio::runtime::Handle;

    /// The native (signal/instrumentation) backend, when this platform has
    /// one. `None` on platforms where only the runtime-provided mechanism
    /// exists.
    fn native_backend(&self) -> Option<Arc<dyn CaptureBackend>> {
        None
    }

    /// The always-available runtime-provided backend. A platform returning
    /// `None` here *and* from [`native_backend`](Self::native_backend)
    /// cannot be sampled at all.
    fn fallback_backend(&self) -> Option<Arc<dyn CaptureBackend>>;

    /// Class metadata used to split overloaded method names. Optional —
    /// without it, overloads are separated by call-site line instead.
    fn class_metadata(&self) -> Option<Arc<dyn ClassMetadata>> {
        None
    }
}
