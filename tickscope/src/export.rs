//! Snapshot export.
//!
//! Walks a session's finalized (or live) buckets, applies a merge mode and
//! optional class-source attribution, and produces an immutable
//! [`SamplerSnapshot`] — a plain serde tree, independent of the live
//! session, ready for serialization. Export never mutates the session's
//! trees: the merge runs into fresh nodes.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::calltree::{merge_forest, BucketMap, CallTreeNode, MergeMode};
use crate::domain::ExportError;
use crate::sampler::Sampler;

/// Bumped when the snapshot schema changes shape.
pub const FORMAT_VERSION: u32 = 1;

/// Maps a class name to the name of the component (plugin, module, library)
/// that owns it. Supplied by the host; a lookup error just leaves the class
/// unattributed.
pub trait ClassSourceLookup: Send + Sync {
    fn source_of(&self, class_name: &str) -> anyhow::Result<Option<String>>;
}

/// Options for one export request.
pub struct ExportProps {
    creator: serde_json::Value,
    merge_mode: MergeMode,
    class_source_lookup: Option<Arc<dyn ClassSourceLookup>>,
}

impl Default for ExportProps {
    fn default() -> Self {
        Self::new()
    }
}

impl ExportProps {
    pub fn new() -> Self {
        Self {
            creator: serde_json::Value::Null,
            merge_mode: MergeMode::SeparateMethod,
            class_source_lookup: None,
        }
    }

    /// Opaque identity of whoever requested the export; passed through to
    /// the snapshot untouched.
    #[must_use]
    pub fn creator(mut self, creator: serde_json::Value) -> Self {
        self.creator = creator;
        self
    }

    #[must_use]
    pub fn merge_mode(mut self, mode: MergeMode) -> Self {
        self.merge_mode = mode;
        self
    }

    #[must_use]
    pub fn class_source_lookup(mut self, lookup: Arc<dyn ClassSourceLookup>) -> Self {
        self.class_source_lookup = Some(lookup);
        self
    }
}

/// One node of an exported tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotNode {
    pub class_name: String,
    pub method_name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub line_number: Option<u32>,
    pub sample_count: u64,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub children: Vec<SnapshotNode>,
}

/// One thread group and its merged forest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadEntry {
    pub name: String,
    pub nodes: Vec<SnapshotNode>,
}

/// Immutable copy-on-export view of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerSnapshot {
    pub format_version: u32,
    pub creator: serde_json::Value,
    pub start_time_ms: u64,
    pub end_time_ms: u64,
    pub interval_micros: u64,
    pub backend: String,
    pub threads: Vec<ThreadEntry>,
    /// Class name → owning component, for every observed class the lookup
    /// could resolve.
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub class_sources: BTreeMap<String, String>,
}

impl SamplerSnapshot {
    /// Serialize as pretty JSON to any writer.
    pub fn write_json<W: Write>(&self, writer: W) -> Result<(), ExportError> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn to_json_string(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Sampler {
    /// Produce a snapshot of this session under the given export options.
    ///
    /// Safe to call while the session is still running (live view) or after
    /// it stopped (final, consistent view); the session is never mutated
    /// and keeps running either way.
    pub fn export(&self, props: &ExportProps) -> SamplerSnapshot {
        let buckets = self.snapshot_buckets();
        let threads = thread_entries(&buckets, props.merge_mode);
        let class_sources = props
            .class_source_lookup
            .as_deref()
            .map(|lookup| attribute_classes(&buckets, lookup))
            .unwrap_or_default();

        SamplerSnapshot {
            format_version: FORMAT_VERSION,
            creator: props.creator.clone(),
            start_time_ms: unix_millis(self.start_time()),
            end_time_ms: unix_millis(SystemTime::now()),
            interval_micros: self.interval().as_micros() as u64,
            backend: self.backend_name().to_string(),
            threads,
            class_sources,
        }
    }
}

/// Merge every bucket's forest under `mode` and convert to wire nodes,
/// deterministically ordered (buckets by name, siblings by weight).
pub fn thread_entries(buckets: &BucketMap, mode: MergeMode) -> Vec<ThreadEntry> {
    let mut threads: Vec<ThreadEntry> = buckets
        .values()
        .map(|bucket| {
            let merged = merge_forest(mode, bucket.roots());
            let mut nodes: Vec<SnapshotNode> = merged.iter().map(convert_node).collect();
            sort_siblings(&mut nodes);
            ThreadEntry {
                name: bucket.group_key().to_string(),
                nodes,
            }
        })
        .collect();
    threads.sort_by(|a, b| a.name.cmp(&b.name));
    threads
}

fn convert_node(node: &CallTreeNode) -> SnapshotNode {
    let mut children: Vec<SnapshotNode> = node.children().map(convert_node).collect();
    sort_siblings(&mut children);
    SnapshotNode {
        class_name: node.identity().class_name.clone(),
        method_name: node.identity().method_name.clone(),
        line_number: node.line_number(),
        sample_count: node.total_samples(),
        children,
    }
}

fn sort_siblings(nodes: &mut [SnapshotNode]) {
    nodes.sort_by(|a, b| {
        b.sample_count
            .cmp(&a.sample_count)
            .then_with(|| a.class_name.cmp(&b.class_name))
            .then_with(|| a.method_name.cmp(&b.method_name))
            .then_with(|| a.line_number.cmp(&b.line_number))
    });
}

fn attribute_classes(buckets: &BucketMap, lookup: &dyn ClassSourceLookup) -> BTreeMap<String, String> {
    let mut classes = BTreeSet::new();
    for bucket in buckets.values() {
        for root in bucket.roots() {
            collect_classes(root, &mut classes);
        }
    }

    let mut sources = BTreeMap::new();
    for class in classes {
        match lookup.source_of(&class) {
            Ok(Some(source)) => {
                sources.insert(class, source);
            }
            Ok(None) => {}
            Err(err) => {
                // The class is simply exported without attribution.
                warn!("class source lookup failed for {class}: {err}");
            }
        }
    }
    sources
}

fn collect_classes(node: &CallTreeNode, out: &mut BTreeSet<String>) {
    out.insert(node.identity().class_name.clone());
    for child in node.children() {
        collect_classes(child, out);
    }
}

fn unix_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
