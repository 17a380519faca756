//! Shared fixtures: a scripted capture backend and a host platform stub.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tickscope::capture::{CaptureBackend, ThreadDump};
use tickscope::domain::{CaptureError, StackFrame, ThreadId, ThreadInfo};
use tickscope::platform::HostPlatform;
use tickscope::sampler::{ClassMetadata, MethodDescription};

pub fn frame(class: &str, method: &str, line: u32) -> StackFrame {
    StackFrame::new(class, method, Some(line))
}

pub fn thread(id: u64, name: &str) -> ThreadInfo {
    ThreadInfo::new(ThreadId(id), name)
}

/// Backend that cycles through a scripted sequence of dumps, one entry per
/// capture tick.
pub struct ScriptedBackend {
    label: &'static str,
    script: Vec<Vec<ThreadDump>>,
    cursor: AtomicUsize,
}

impl ScriptedBackend {
    pub fn cycling(label: &'static str, script: Vec<Vec<ThreadDump>>) -> Arc<Self> {
        assert!(!script.is_empty(), "script must have at least one tick");
        Arc::new(Self {
            label,
            script,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Same dumps on every tick.
    pub fn fixed(label: &'static str, dumps: Vec<ThreadDump>) -> Arc<Self> {
        Self::cycling(label, vec![dumps])
    }
}

impl CaptureBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        self.label
    }

    fn dump(&self) -> Result<Vec<ThreadDump>, CaptureError> {
        let tick = self.cursor.fetch_add(1, Ordering::Relaxed);
        Ok(self.script[tick % self.script.len()].clone())
    }
}

/// Backend whose every capture faults.
pub struct FaultyBackend;

impl CaptureBackend for FaultyBackend {
    fn name(&self) -> &'static str {
        "faulty"
    }

    fn dump(&self) -> Result<Vec<ThreadDump>, CaptureError> {
        Err(CaptureError::BackendFailed {
            backend: "faulty",
            reason: "thread list unavailable".into(),
        })
    }
}

/// Metadata stub that reports exactly one overload for every method, so
/// identities resolve without disambiguator tags.
pub struct SingleOverloadMetadata;

impl ClassMetadata for SingleOverloadMetadata {
    fn methods_named(
        &self,
        _class_name: &str,
        method_name: &str,
    ) -> anyhow::Result<Vec<MethodDescription>> {
        Ok(vec![MethodDescription {
            descriptor: format!("{method_name}()V"),
            lines: None,
        }])
    }
}

pub struct TestPlatform {
    pub native: Option<Arc<dyn CaptureBackend>>,
    pub fallback: Option<Arc<dyn CaptureBackend>>,
    pub metadata: Option<Arc<dyn ClassMetadata>>,
}

impl TestPlatform {
    /// Platform with only the runtime-provided backend, the common case in
    /// these tests.
    pub fn with_fallback(backend: Arc<dyn CaptureBackend>) -> Arc<dyn HostPlatform> {
        Arc::new(Self {
            native: None,
            fallback: Some(backend),
            metadata: Some(Arc::new(SingleOverloadMetadata)),
        })
    }
}

impl HostPlatform for TestPlatform {
    fn scheduler(&self) -> tokio::runtime::Handle {
        tokio::runtime::Handle::current()
    }

    fn native_backend(&self) -> Option<Arc<dyn CaptureBackend>> {
        self.native.clone()
    }

    fn fallback_backend(&self) -> Option<Arc<dyn CaptureBackend>> {
        self.fallback.clone()
    }

    fn class_metadata(&self) -> Option<Arc<dyn ClassMetadata>> {
        self.metadata.clone()
    }
}
