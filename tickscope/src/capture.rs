//! Capture backend contract and backend selection.
//!
//! A backend is the mechanism that actually walks thread stacks — either the
//! host runtime's built-in thread-dump facility (always available, modest
//! precision) or a native signal/instrumentation profiler (better precision,
//! not present on every platform). Both sit behind [`CaptureBackend`]; the
//! sampler core never knows which one it is driving.

use std::sync::Arc;

use log::warn;

use crate::domain::{CaptureError, StackFrame, StartError, ThreadInfo};
use crate::platform::HostPlatform;

/// One thread's captured stack, outermost frame first.
#[derive(Debug, Clone)]
pub struct ThreadDump {
    pub thread: ThreadInfo,
    pub frames: Vec<StackFrame>,
}

impl ThreadDump {
    pub fn new(thread: ThreadInfo, frames: Vec<StackFrame>) -> Self {
        Self { thread, frames }
    }
}

/// A source of raw thread stacks.
///
/// `dump` is best-effort: a thread that cannot be walked right now is
/// omitted from the result, not an error. `Ok(vec![])` means the capture
/// succeeded and matched nothing; `Err` means the backend itself faulted
/// this tick and the sampler should count it and retry next tick.
pub trait CaptureBackend: Send + Sync {
    /// Short stable name used in logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Capture every live thread the backend can see.
    fn dump(&self) -> Result<Vec<ThreadDump>, CaptureError>;
}

/// Pick the backend a session will run with.
///
/// The native backend is preferred when the platform has one and the caller
/// did not force the fallback. A missing native backend is a warning, not an
/// error; a platform with no backend at all cannot sample.
pub fn select_backend(
    platform: &dyn HostPlatform,
    force_fallback: bool,
) -> Result<Arc<dyn CaptureBackend>, StartError> {
    if !force_fallback {
        if let Some(native) = platform.native_backend() {
            return Ok(native);
        }
        if platform.fallback_backend().is_some() {
            warn!("native capture backend unavailable on this platform, using fallback");
        }
    }
    platform
        .fallback_backend()
        .ok_or(StartError::UnsupportedPlatform)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ThreadId;

    struct Fixed(&'static str);

    impl CaptureBackend for Fixed {
        fn name(&self) -> &'static str {
            self.0
        }

        fn dump(&self) -> Result<Vec<ThreadDump>, CaptureError> {
            Ok(vec![ThreadDump::new(
                ThreadInfo::new(ThreadId(1), "main"),
                vec![StackFrame::new("Server", "run", Some(10))],
            )])
        }
    }

    struct FakePlatform {
        native: Option<Arc<dyn CaptureBackend>>,
        fallback: Option<Arc<dyn CaptureBackend>>,
    }

    impl HostPlatform for FakePlatform {
        fn scheduler(&self) -> tokio::runtime::Handle {
            tokio::runtime::Handle::current()
        }

        fn native_backend(&self) -> Option<Arc<dyn CaptureBackend>> {
            self.native.clone()
        }

        fn fallback_backend(&self) -> Option<Arc<dyn CaptureBackend>> {
            self.fallback.clone()
        }
    }

    #[test]
    fn prefers_native_backend() {
        let platform = FakePlatform {
            native: Some(Arc::new(Fixed("native"))),
            fallback: Some(Arc::new(Fixed("fallback"))),
        };
        let backend = select_backend(&platform, false).unwrap();
        assert_eq!(backend.name(), "native");
    }

    #[test]
    fn force_fallback_skips_native() {
        let platform = FakePlatform {
            native: Some(Arc::new(Fixed("native"))),
            fallback: Some(Arc::new(Fixed("fallback"))),
        };
        let backend = select_backend(&platform, true).unwrap();
        assert_eq!(backend.name(), "fallback");
    }

    #[test]
    fn missing_native_falls_back() {
        let platform = FakePlatform {
            native: None,
            fallback: Some(Arc::new(Fixed("fallback"))),
        };
        let backend = select_backend(&platform, false).unwrap();
        assert_eq!(backend.name(), "fallback");
    }

    #[test]
    fn no_backend_at_all_is_unsupported() {
        let platform = FakePlatform {
            native: None,
            fallback: None,
        };
        assert!(matches!(
            select_backend(&platform, false),
            Err(StartError::UnsupportedPlatform)
        ));
    }
}
