//! Thread selection policy: which threads a session samples.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::capture::{CaptureBackend, ThreadDump};
use crate::domain::{CaptureError, ThreadId};

/// Predicate over thread names, re-evaluated on every capture.
pub type NameFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Policy selecting which of a backend's threads reach accumulation.
#[derive(Clone, Default)]
pub enum ThreadDumper {
    /// Every live thread the backend can see.
    #[default]
    All,
    /// A fixed set of thread ids resolved once at construction. Threads
    /// that die mid-session simply stop appearing in captures.
    Specific(HashSet<ThreadId>),
    /// Threads whose name matches the filter. Evaluated fresh each tick so
    /// dynamically spawned pool threads are picked up.
    Filtered(NameFilter),
}

impl ThreadDumper {
    pub fn specific(threads: impl IntoIterator<Item = ThreadId>) -> Self {
        ThreadDumper::Specific(threads.into_iter().collect())
    }

    pub fn filtered(filter: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        ThreadDumper::Filtered(Arc::new(filter))
    }

    /// True for a `Specific` selection that can never match anything.
    pub(crate) fn is_empty_selection(&self) -> bool {
        matches!(self, ThreadDumper::Specific(ids) if ids.is_empty())
    }

    /// Run one capture through the backend and apply this selection.
    ///
    /// An individual unavailable thread is the backend's problem (it omits
    /// the thread); only a backend-level fault propagates.
    pub fn capture(&self, backend: &dyn CaptureBackend) -> Result<Vec<ThreadDump>, CaptureError> {
        let dumps = backend.dump()?;
        Ok(match self {
            ThreadDumper::All => dumps,
            ThreadDumper::Specific(ids) => dumps
                .into_iter()
                .filter(|d| ids.contains(&d.thread.id))
                .collect(),
            ThreadDumper::Filtered(filter) => dumps
                .into_iter()
                .filter(|d| filter(&d.thread.name))
                .collect(),
        })
    }
}

impl fmt::Debug for ThreadDumper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadDumper::All => f.write_str("ThreadDumper::All"),
            ThreadDumper::Specific(ids) => {
                write!(f, "ThreadDumper::Specific({} threads)", ids.len())
            }
            ThreadDumper::Filtered(_) => f.write_str("ThreadDumper::Filtered(..)"),
        }
    }
}
